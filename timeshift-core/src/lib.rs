//! # timeshift-core
//!
//! Live audio time-shift engine: capture a live mono stream, keep a rolling
//! window of it, and play it back at a user-controlled, seekable delay.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SPSC capture ring → Ingest(spawn_blocking)
//!                                                       │ resample
//!                                                       ▼
//!                                                  DelayBuffer
//!                                   (write cursor ──────── read cursor)
//!                                                       ▲
//! Speaker ← AudioOutput callback ← DelayReader ◄── SeekCommand channel
//! ```
//!
//! Both audio callbacks are lock-free. The delay buffer's cursors are
//! single-word atomics, so write and render sides never share a lock; the
//! only cross-thread control path is the seek command channel, drained by
//! the render callback itself.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod engine;
pub mod error;
pub mod events;

// Convenience re-exports for downstream crates
pub use buffering::chunk::AudioChunk;
pub use buffering::delay::{
    DelayBuffer, DelayConfig, DelayReader, DelayStats, DelayWriter, ReadOutcome,
};
pub use engine::{EngineConfig, SeekCommand, TimeShiftEngine};
pub use error::TimeshiftError;
pub use events::{PlayheadEvent, TransportStatus, TransportStatusEvent};
