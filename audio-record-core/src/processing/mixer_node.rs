use crate::models::audio_models::{AudioLevels, StreamFormat};

/// Input tap that converts live audio into the recording format.
///
/// The engine delivers interleaved f32 blocks at whatever rate and channel
/// count the device runs at. The mixer node maps channels, resamples and
/// finally quantizes to PCM bytes. Resampling keeps its read position
/// between blocks, so one node must see a single continuous stream.
#[derive(Debug, Clone)]
pub struct MixerNode {
    format: StreamFormat,
    resampler: Resampler,
}

impl MixerNode {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            format,
            resampler: Resampler::new(format.channels.max(1) as usize, format.sample_rate as f64),
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Convert one input block to the target channel layout and rate.
    ///
    /// Output is interleaved f32 at `format.sample_rate` with
    /// `format.channels` channels.
    pub fn tap(&mut self, samples: &[f32], source_rate: f64, source_channels: u16) -> Vec<f32> {
        let mapped = map_channels(samples, source_channels as usize, self.format.channels as usize);
        self.resampler.process(&mapped, source_rate)
    }

    /// Forget the stream position, e.g. before a new recording.
    pub fn reset(&mut self) {
        self.resampler.reset();
    }

    /// Quantize f32 samples `[-1.0, 1.0]` to little-endian PCM in the target
    /// bit depth. Out-of-range values are clamped.
    ///
    /// 8-bit WAV is unsigned with silence at 128.
    pub fn to_pcm(&self, samples: &[f32]) -> Vec<u8> {
        match self.format.bits_per_sample {
            8 => samples
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * 127.0 + 128.0) as u8)
                .collect(),
            _ => {
                let mut data = Vec::with_capacity(samples.len() * 2);
                for &sample in samples {
                    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    data.extend_from_slice(&value.to_le_bytes());
                }
                data
            }
        }
    }

    /// RMS and peak of a block.
    pub fn levels(samples: &[f32]) -> AudioLevels {
        AudioLevels {
            level: Self::rms_level(samples),
            peak_level: Self::peak_level(samples),
        }
    }

    pub fn rms_level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    pub fn peak_level(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}

/// Streaming linear-interpolation resampler for interleaved audio.
///
/// The fractional read position and the last input frame carry over from
/// one block to the next. Output length therefore tracks the true rate
/// ratio over the whole stream, and interpolation runs across block
/// boundaries instead of restarting at every block.
#[derive(Debug, Clone)]
pub struct Resampler {
    channels: usize,
    target_rate: f64,
    source_rate: f64,
    /// Next output position in source frames, relative to the carried frame.
    position: f64,
    /// Last frame of the previous block, empty at the start of a stream.
    previous: Vec<f32>,
}

impl Resampler {
    pub fn new(channels: usize, target_rate: f64) -> Self {
        Self {
            channels: channels.max(1),
            target_rate,
            source_rate: 0.0,
            position: 0.0,
            previous: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.previous.clear();
    }

    /// Resample one block at `source_rate`. Blocks at the target rate pass
    /// through unchanged. A change of source rate restarts the stream.
    pub fn process(&mut self, samples: &[f32], source_rate: f64) -> Vec<f32> {
        if source_rate <= 0.0 || (source_rate - self.target_rate).abs() < 0.01 {
            self.reset();
            return samples.to_vec();
        }
        if source_rate != self.source_rate {
            self.reset();
            self.source_rate = source_rate;
        }

        let channels = self.channels;
        let block_frames = samples.len() / channels;
        if block_frames == 0 {
            return Vec::new();
        }

        let carried = self.previous.len() / channels;
        let frames = carried + block_frames;
        let previous = &self.previous;
        let at = |frame: usize, ch: usize| -> f32 {
            if frame < carried {
                previous[frame * channels + ch]
            } else {
                samples[(frame - carried) * channels + ch]
            }
        };

        let step = source_rate / self.target_rate;
        let last = (frames - 1) as f64;
        let mut position = self.position;
        let mut output = Vec::with_capacity(((last - position).max(0.0) / step) as usize * channels + channels);

        while position < last {
            let index = position as usize;
            let fraction = (position - index as f64) as f32;
            for ch in 0..channels {
                output.push(at(index, ch) * (1.0 - fraction) + at(index + 1, ch) * fraction);
            }
            position += step;
        }

        // The last frame becomes index 0 of the next block.
        self.position = position - last;
        let tail = (block_frames - 1) * channels;
        self.previous.clear();
        self.previous.extend_from_slice(&samples[tail..tail + channels]);
        output
    }
}

/// Remap interleaved audio from `from` to `to` channels.
///
/// Downmixing to mono averages every channel of a frame. Mono is duplicated
/// into both sides of a stereo target. Wider layouts keep their first two
/// channels when recording stereo.
pub fn map_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }

    let frame_count = samples.len() / from;
    let mut out = Vec::with_capacity(frame_count * to);

    if to == 1 {
        let scale = 1.0 / from as f32;
        for frame in samples.chunks_exact(from) {
            out.push(frame.iter().sum::<f32>() * scale);
        }
    } else if from == 1 {
        for &s in samples {
            out.extend(std::iter::repeat(s).take(to));
        }
    } else {
        for frame in samples.chunks_exact(from) {
            for ch in 0..to {
                out.push(if ch < from { frame[ch] } else { 0.0 });
            }
        }
    }
    out
}
