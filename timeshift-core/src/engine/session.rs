//! Blocking ingest loop.
//!
//! ## Stages (per iteration)
//!
//! ```text
//! 1. Drain capture ring → &[f32] (one chunk per iteration)
//! 2. Resample from the capture rate to the buffer rate
//! 3. DelayWriter::write_chunk (never blocks, overwrites oldest on wrap)
//! 4. Periodically broadcast a PlayheadEvent snapshot
//! ```
//!
//! The loop runs inside `spawn_blocking`, keeping the Tokio executor free
//! for host I/O. The render side runs independently in the output stream's
//! callback; the two only meet through the delay buffer's atomic cursors.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::{
    audio::resample::RateConverter,
    buffering::{delay::DelayWriter, CaptureConsumer, Consumer},
    events::PlayheadEvent,
};

/// Chunk size drained from the capture ring per iteration.
/// 20 ms at 48 kHz = 960 samples — small enough to keep ingest latency low,
/// large enough to amortize the resampler call.
const DRAIN_CHUNK: usize = 960;

/// Sleep when the ring is empty (avoids busy-wait burning a core).
const SLEEP_EMPTY_MS: u64 = 5;

/// Emit a playhead event every this many written chunks (≈ 0.5 s).
const PLAYHEAD_EVERY_CHUNKS: u64 = 25;

/// Ingest counters. Written with relaxed atomics from the loop, snapshotted
/// from host threads.
pub struct SessionDiagnostics {
    pub chunks_in: AtomicUsize,
    pub samples_in: AtomicUsize,
    pub samples_written: AtomicUsize,
    pub playhead_events: AtomicUsize,
}

impl Default for SessionDiagnostics {
    fn default() -> Self {
        Self {
            chunks_in: AtomicUsize::new(0),
            samples_in: AtomicUsize::new(0),
            samples_written: AtomicUsize::new(0),
            playhead_events: AtomicUsize::new(0),
        }
    }
}

impl SessionDiagnostics {
    pub fn reset(&self) {
        self.chunks_in.store(0, Ordering::Relaxed);
        self.samples_in.store(0, Ordering::Relaxed);
        self.samples_written.store(0, Ordering::Relaxed);
        self.playhead_events.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            chunks_in: self.chunks_in.load(Ordering::Relaxed),
            samples_in: self.samples_in.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            playhead_events: self.playhead_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub chunks_in: usize,
    pub samples_in: usize,
    pub samples_written: usize,
    pub playhead_events: usize,
}

/// All context the ingest loop needs, passed as one struct so the
/// spawn_blocking closure stays tidy.
pub struct SessionContext {
    pub capture_sample_rate: u32,
    pub buffer_sample_rate: u32,
    pub consumer: CaptureConsumer,
    pub writer: DelayWriter,
    pub running: Arc<AtomicBool>,
    pub playhead_tx: broadcast::Sender<PlayheadEvent>,
    pub diagnostics: Arc<SessionDiagnostics>,
}

/// Run the blocking ingest loop until `ctx.running` becomes false.
pub fn run(mut ctx: SessionContext) {
    info!("ingest loop started");

    // Passthrough when the capture device already runs at the buffer rate.
    let mut resampler = match RateConverter::new(
        ctx.capture_sample_rate,
        ctx.buffer_sample_rate,
        DRAIN_CHUNK,
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("failed to create resampler: {e}");
            return;
        }
    };

    // Scratch buffer, reused each iteration.
    let mut raw = vec![0f32; DRAIN_CHUNK];
    let mut written_chunks: u64 = 0;
    let mut playhead_seq: u64 = 0;

    loop {
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        let n = ctx.consumer.pop_slice(&mut raw);
        if n == 0 {
            // Nothing captured yet — yield instead of spinning.
            std::thread::sleep(Duration::from_millis(SLEEP_EMPTY_MS));
            continue;
        }
        ctx.diagnostics.chunks_in.fetch_add(1, Ordering::Relaxed);
        ctx.diagnostics.samples_in.fetch_add(n, Ordering::Relaxed);

        let resampled = resampler.process(&raw[..n]);
        if resampled.is_empty() {
            // Partial chunk — rubato is still accumulating input.
            continue;
        }

        ctx.writer.write_chunk(&resampled);
        ctx.diagnostics
            .samples_written
            .fetch_add(resampled.len(), Ordering::Relaxed);

        written_chunks += 1;
        if written_chunks % PLAYHEAD_EVERY_CHUNKS == 0 {
            let stats = ctx.writer.stats();
            debug!(
                delay_secs = stats.delay_secs(),
                re_anchors = stats.re_anchors,
                "playhead update"
            );
            let _ = ctx.playhead_tx.send(PlayheadEvent {
                seq: playhead_seq,
                delay_secs: stats.delay_secs(),
                buffered_secs: stats.buffered_secs(),
                re_anchors: stats.re_anchors,
                underruns: stats.underruns,
                clamped_seeks: stats.clamped_seeks,
            });
            playhead_seq = playhead_seq.saturating_add(1);
            ctx.diagnostics
                .playhead_events
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    info!("ingest loop stopped");
}
