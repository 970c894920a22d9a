pub mod buffer_queue;
pub mod mixer_node;
pub mod ring_buffer;
pub mod wav_format;
