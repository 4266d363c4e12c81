//! Sample buffering: the capture transport ring and the seekable delay
//! window.
//!
//! Two buffers with different jobs:
//!
//! - the **capture ring** (`ringbuf::HeapRb<f32>`) is a plain lock-free SPSC
//!   queue whose wait-free `push_slice` is safe to call from the real-time
//!   input callback; it only decouples callback jitter from the ingest loop.
//! - the [`delay::DelayBuffer`] is the time-shift window itself: writes
//!   overwrite the oldest data, and the read cursor can be seeked through
//!   the buffered past.

pub mod chunk;
pub mod delay;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

/// Producer half of the capture ring — held by the audio input callback.
pub type CaptureProducer = ringbuf::HeapProd<f32>;

/// Consumer half of the capture ring — held by the ingest loop.
pub type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Capture ring capacity: 2^19 = 524 288 f32 samples ≈ 10.9 s at 48 kHz.
/// Plenty for ingest stalls; the long-term window lives in the DelayBuffer.
pub const CAPTURE_RING_CAPACITY: usize = 1 << 19;

/// Create a matched producer/consumer pair for the capture transport.
pub fn create_capture_ring() -> (CaptureProducer, CaptureConsumer) {
    HeapRb::<f32>::new(CAPTURE_RING_CAPACITY).split()
}
