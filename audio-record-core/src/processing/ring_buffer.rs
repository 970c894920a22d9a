/// Circular sample buffer between the engine's tap callback and the
/// processing thread.
///
/// Not synchronized on its own; the session shares it as
/// `Arc<parking_lot::Mutex<RingBuffer>>`.
///
/// On overflow the oldest samples are dropped so the recording keeps up with
/// live input rather than stalling the audio thread.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    read_index: usize,
    available: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_index: 0,
            read_index: 0,
            available: 0,
        }
    }

    /// Append samples, returning how many older samples were overwritten.
    ///
    /// If `samples` is longer than the capacity only its tail is kept.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        if samples.is_empty() {
            return 0;
        }
        let capacity = self.capacity();

        let (samples, truncated) = if samples.len() > capacity {
            (&samples[samples.len() - capacity..], samples.len() - capacity)
        } else {
            (samples, 0)
        };

        let overflow = (self.available + samples.len()).saturating_sub(capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % capacity;
            self.available -= overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % capacity;
        }
        self.available += samples.len();
        overflow + truncated
    }

    /// Remove and return up to `count` samples.
    pub fn read(&mut self, count: usize) -> Vec<f32> {
        let to_read = count.min(self.available);
        if to_read == 0 {
            return Vec::new();
        }
        let capacity = self.capacity();

        let mut result = Vec::with_capacity(to_read);
        for i in 0..to_read {
            result.push(self.buffer[(self.read_index + i) % capacity]);
        }
        self.read_index = (self.read_index + to_read) % capacity;
        self.available -= to_read;
        result
    }

    /// Remove and return everything buffered, trimmed to whole frames of
    /// `channels` samples. A trailing partial frame stays buffered.
    pub fn drain_frames(&mut self, channels: usize) -> Vec<f32> {
        let channels = channels.max(1);
        let whole = self.available - self.available % channels;
        self.read(whole)
    }

    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
