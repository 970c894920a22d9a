use crate::models::audio_models::StreamFormat;

/// Number of buffers cycled by the queue.
pub const NUM_BUFFERS: usize = 3;

/// One filled buffer handed out by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Position of this packet among all packets of the recording, from 0.
    pub sequence: u64,
    /// Frame offset of the first frame in this packet.
    pub start_packet: i64,
    pub frames: usize,
    pub data: &'a [u8],
}

/// Fixed-count buffer queue that slices a PCM byte stream into packets.
///
/// PCM is appended to the buffer currently being filled. When that buffer
/// reaches `buffer_byte_size` it is handed to the caller's sink as a
/// [`Packet`], and filling moves on to the next of the [`NUM_BUFFERS`]
/// buffers. `current_packet` counts frames handed out so far, so each
/// packet knows its offset in the recording.
#[derive(Debug)]
pub struct BufferQueue {
    format: StreamFormat,
    buffers: [Vec<u8>; NUM_BUFFERS],
    buffer_byte_size: usize,
    fill_index: usize,
    current_packet: i64,
    next_sequence: u64,
    is_running: bool,
}

impl BufferQueue {
    /// `buffer_byte_size` is rounded down to whole frames (at least one).
    pub fn new(format: StreamFormat, buffer_byte_size: usize) -> Self {
        let frame = format.bytes_per_frame().max(1);
        let buffer_byte_size = (buffer_byte_size / frame).max(1) * frame;
        Self {
            format,
            buffers: std::array::from_fn(|_| Vec::with_capacity(buffer_byte_size)),
            buffer_byte_size,
            fill_index: 0,
            current_packet: 0,
            next_sequence: 0,
            is_running: false,
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn buffer_byte_size(&self) -> usize {
        self.buffer_byte_size
    }

    pub fn frames_per_buffer(&self) -> usize {
        self.buffer_byte_size / self.format.bytes_per_frame().max(1)
    }

    pub fn current_packet(&self) -> i64 {
        self.current_packet
    }

    pub fn packets_emitted(&self) -> u64 {
        self.next_sequence
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Bytes waiting in the buffer that is being filled.
    pub fn pending_bytes(&self) -> usize {
        self.buffers[self.fill_index].len()
    }

    pub fn start(&mut self) {
        self.is_running = true;
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// Append PCM, handing every buffer that fills up to `sink`.
    ///
    /// Ignored while the queue is stopped.
    pub fn push<F>(&mut self, mut pcm: &[u8], mut sink: F)
    where
        F: FnMut(Packet<'_>),
    {
        if !self.is_running {
            return;
        }
        while !pcm.is_empty() {
            let room = self.buffer_byte_size - self.buffers[self.fill_index].len();
            let take = room.min(pcm.len());
            self.buffers[self.fill_index].extend_from_slice(&pcm[..take]);
            pcm = &pcm[take..];

            if self.buffers[self.fill_index].len() == self.buffer_byte_size {
                self.complete_buffer(&mut sink);
            }
        }
    }

    /// Hand out the partially filled buffer, if any.
    pub fn flush<F>(&mut self, mut sink: F)
    where
        F: FnMut(Packet<'_>),
    {
        if !self.buffers[self.fill_index].is_empty() {
            self.complete_buffer(&mut sink);
        }
    }

    /// Drop all buffered data and rewind the counters.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.fill_index = 0;
        self.current_packet = 0;
        self.next_sequence = 0;
    }

    fn complete_buffer<F>(&mut self, sink: &mut F)
    where
        F: FnMut(Packet<'_>),
    {
        let frame = self.format.bytes_per_frame().max(1);
        let index = self.fill_index;
        let frames = self.buffers[index].len() / frame;

        sink(Packet {
            sequence: self.next_sequence,
            start_packet: self.current_packet,
            frames,
            data: &self.buffers[index],
        });

        self.current_packet += frames as i64;
        self.next_sequence += 1;
        self.fill_index = (index + 1) % NUM_BUFFERS;
        self.buffers[self.fill_index].clear();
    }
}
