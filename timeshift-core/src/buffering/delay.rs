//! Seekable delay buffer over a live mono sample stream.
//!
//! `DelayBuffer` is a fixed-capacity circular store with two independently
//! advancing cursors: the write cursor fed by the live capture path, and a
//! read cursor that trails it by a user-controlled delay and can be jumped
//! forward or backward in time. Writes never block and never fail; when the
//! reader falls a full window behind, the next read re-anchors it just
//! inside the valid region instead of returning overwritten data.
//!
//! ## Cursor bookkeeping
//!
//! Both cursors are monotonically increasing u64 *total sample* counters.
//! Storage indices are `total % capacity`; elapsed whole seconds are
//! `total / sample_rate`. Keeping one atomic word per cursor means a reader
//! on another thread can never observe a torn (index, elapsed) pair.
//!
//! ## Single-writer / single-reader contract
//!
//! `split()` hands out exclusive `DelayWriter` and `DelayReader` halves.
//! Cursors use acquire/release atomics; sample slots are `AtomicU32` f32
//! bit-patterns with relaxed ordering. Overwrite of slots the reader is
//! lagging on is an accepted race — each slot is individually atomic, so a
//! torn sample cannot be observed, and the stale-cursor re-anchor keeps the
//! reader out of the overwrite zone. The write path never locks, never
//! allocates, and runs in O(chunk length).
//!
//! Seeks mutate only read-side state. They must be serialized with the
//! reader (call them from the render thread, or route them there — see
//! `engine`); concurrent seeks from multiple control threads are not
//! supported.

use std::path::Path;
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

use tracing::debug;

use crate::{
    buffering::chunk::AudioChunk,
    error::{Result, TimeshiftError},
};

/// Construction parameters for [`DelayBuffer`].
#[derive(Debug, Clone)]
pub struct DelayConfig {
    /// Sample rate of the buffered stream (Hz).
    pub sample_rate: u32,
    /// Buffer depth in seconds — how far back the stream stays reachable.
    pub window_secs: u32,
    /// Minimum temporal distance (seconds) the read cursor keeps from the
    /// write cursor, forward and backward. Must satisfy
    /// `0 < margin_secs < window_secs`.
    pub margin_secs: u32,
    /// Samples returned by [`DelayBuffer::read_next_window`].
    /// Defaults to one second of audio.
    pub frame_len: usize,
}

impl DelayConfig {
    /// Config with the default one-second read window.
    pub fn new(sample_rate: u32, window_secs: u32, margin_secs: u32) -> Self {
        Self {
            sample_rate,
            window_secs,
            margin_secs,
            frame_len: sample_rate as usize,
        }
    }

    fn capacity(&self) -> usize {
        self.sample_rate as usize * self.window_secs as usize
    }

    fn margin_samples(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.margin_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(TimeshiftError::InvalidConfig(
                "sample_rate must be positive".into(),
            ));
        }
        if self.window_secs == 0 {
            return Err(TimeshiftError::InvalidConfig(
                "window_secs must be positive".into(),
            ));
        }
        if self.margin_secs == 0 || self.margin_secs >= self.window_secs {
            return Err(TimeshiftError::InvalidConfig(format!(
                "margin_secs must satisfy 0 < margin < window ({} vs {})",
                self.margin_secs, self.window_secs
            )));
        }
        if self.frame_len == 0 {
            return Err(TimeshiftError::InvalidConfig(
                "frame_len must be positive".into(),
            ));
        }
        if self.frame_len as u64 > self.capacity() as u64 - self.margin_samples() {
            return Err(TimeshiftError::InvalidConfig(format!(
                "frame_len {} exceeds usable window ({} samples)",
                self.frame_len,
                self.capacity() as u64 - self.margin_samples()
            )));
        }
        Ok(())
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self::new(48_000, 120, 2)
    }
}

/// What a read call actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The frame was filled with buffered samples and the cursor advanced.
    Played,
    /// Not enough written data ahead of the cursor — the frame is zeroed
    /// and the cursor held (stream start, or the reader caught up to live).
    Silence,
    /// The cursor had gone stale and was re-anchored behind the write
    /// cursor before the frame was filled.
    Recovered,
}

/// Counter snapshot for observability. Not an atomic whole — individual
/// fields may be skewed by one in-flight operation.
#[derive(Debug, Clone, Copy)]
pub struct DelayStats {
    /// Total samples accepted by the write path.
    pub samples_written: u64,
    /// Total samples handed out by the read path.
    pub samples_read: u64,
    /// Stale-cursor recoveries performed.
    pub re_anchors: u64,
    /// Reads answered with silence because too little data was ahead.
    pub underruns: u64,
    /// Seek requests that hit a margin clamp.
    pub clamped_seeks: u64,
    /// Sample rate of the stream (Hz).
    pub sample_rate: u32,
    /// Total sample slots in the window.
    pub capacity: usize,
}

impl DelayStats {
    /// Current distance between the cursors, in seconds.
    pub fn delay_secs(&self) -> f64 {
        self.samples_written.saturating_sub(self.samples_read) as f64
            / f64::from(self.sample_rate)
    }

    /// Seconds of valid audio currently held in the window.
    pub fn buffered_secs(&self) -> f64 {
        self.samples_written.min(self.capacity as u64) as f64 / f64::from(self.sample_rate)
    }
}

/// Fixed-capacity circular sample store with a live write cursor and a
/// delayed, seekable read cursor. See the module docs for the concurrency
/// contract.
pub struct DelayBuffer {
    /// f32 bit-patterns; one atomic slot per sample.
    storage: Box<[AtomicU32]>,
    capacity: usize,
    sample_rate: u32,
    frame_len: usize,
    margin_samples: u64,
    /// Total samples ever written. Single writer; published with Release.
    written: AtomicU64,
    /// Total samples ever read. Single reader (seeks included).
    read: AtomicU64,
    re_anchors: AtomicU64,
    underruns: AtomicU64,
    clamped_seeks: AtomicU64,
}

impl DelayBuffer {
    /// Create a pre-zeroed buffer.
    ///
    /// # Errors
    /// `TimeshiftError::InvalidConfig` when the config violates
    /// `0 < margin < window` or the frame length does not fit the usable
    /// window. This is the only failure the buffer can ever report; every
    /// operation after construction is total.
    pub fn new(config: DelayConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity();
        let storage = (0..capacity)
            .map(|_| AtomicU32::new(0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            storage,
            capacity,
            sample_rate: config.sample_rate,
            frame_len: config.frame_len,
            margin_samples: config.margin_samples(),
            written: AtomicU64::new(0),
            read: AtomicU64::new(0),
            re_anchors: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            clamped_seeks: AtomicU64::new(0),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Append samples at the write cursor, wrapping silently. Overwriting
    /// slots the reader has not caught up on is the intended steady-state
    /// under lag; the read path recovers lazily.
    pub fn write_chunk(&mut self, samples: &[f32]) {
        self.write_inner(samples);
    }

    /// Fill `out` from the read cursor and advance it. `out` may be any
    /// length up to the usable window; the render callback passes its own
    /// frame size here.
    pub fn read_frame_into(&mut self, out: &mut [f32]) -> ReadOutcome {
        self.read_inner(out)
    }

    /// Read the configured window (one second by default).
    pub fn read_next_window(&mut self) -> AudioChunk {
        let mut samples = vec![0f32; self.frame_len];
        self.read_inner(&mut samples);
        AudioChunk::new(samples, self.sample_rate)
    }

    /// Jump the read cursor forward, clamped to `margin_secs` behind the
    /// write cursor. Total: out-of-range requests are clamped, never
    /// rejected. `0` is a no-op.
    pub fn seek_forward(&mut self, secs: u64) {
        self.seek_forward_inner(secs);
    }

    /// Jump the read cursor backward, clamped to `margin_secs` past the
    /// oldest still-valid sample. Total; `0` is a no-op.
    pub fn seek_backward(&mut self, secs: u64) {
        self.seek_backward_inner(secs);
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DelayStats {
        DelayStats {
            samples_written: self.written.load(Ordering::Acquire),
            samples_read: self.read.load(Ordering::Acquire),
            re_anchors: self.re_anchors.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            clamped_seeks: self.clamped_seeks.load(Ordering::Relaxed),
            sample_rate: self.sample_rate,
            capacity: self.capacity,
        }
    }

    /// Chronological copy of the newest `n` written samples, without moving
    /// the read cursor. Allocates — diagnostics use only.
    pub fn peek_recent(&self, n: usize) -> AudioChunk {
        let w = self.written.load(Ordering::Acquire);
        let valid = w.min(self.capacity as u64);
        let n = (n as u64).min(valid);
        let mut samples = Vec::with_capacity(n as usize);
        let start = w - n;
        let mut idx = (start % self.capacity as u64) as usize;
        for _ in 0..n {
            samples.push(f32::from_bits(self.storage[idx].load(Ordering::Relaxed)));
            idx += 1;
            if idx == self.capacity {
                idx = 0;
            }
        }
        AudioChunk::new(samples, self.sample_rate)
    }

    /// Dump the newest `seconds` of the window to a mono float WAV file.
    pub fn snapshot_to_wav(&self, path: &Path, seconds: u32) -> Result<()> {
        let tail = self.peek_recent(self.sample_rate as usize * seconds as usize);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &tail.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Split into exclusive writer/reader halves for cross-thread use.
    pub fn split(self) -> (DelayWriter, DelayReader) {
        let shared = Arc::new(self);
        (
            DelayWriter {
                shared: Arc::clone(&shared),
            },
            DelayReader { shared },
        )
    }

    // ── Shared implementations (single writer / single reader) ──────────

    fn write_inner(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let w = self.written.load(Ordering::Relaxed);
        let mut idx = (w % self.capacity as u64) as usize;
        for &s in samples {
            self.storage[idx].store(s.to_bits(), Ordering::Relaxed);
            idx += 1;
            if idx == self.capacity {
                idx = 0;
            }
        }
        // Publish after the slots so the reader never sees unwritten data.
        self.written
            .store(w + samples.len() as u64, Ordering::Release);
    }

    fn read_inner(&self, out: &mut [f32]) -> ReadOutcome {
        let needed = out.len() as u64;
        let w = self.written.load(Ordering::Acquire);
        let mut r = self.read.load(Ordering::Relaxed);

        // Stale cursor: the slot at `r` has been overwritten. Re-anchor to
        // `margin` past the oldest still-valid sample rather than advancing
        // through garbage.
        let recovered = if w.saturating_sub(r) >= self.capacity as u64 {
            let anchor = w - self.capacity as u64 + self.margin_samples;
            debug!(
                behind = r,
                anchor, "read cursor went stale, re-anchoring"
            );
            self.re_anchors.fetch_add(1, Ordering::Relaxed);
            r = anchor;
            true
        } else {
            false
        };

        // Collision guard: never expose slots the writer has not reached.
        // The frame is silence and the cursor holds (the re-anchor, if one
        // happened, is kept).
        if r + needed > w {
            out.fill(0.0);
            if recovered {
                self.read.store(r, Ordering::Release);
            }
            self.underruns.fetch_add(1, Ordering::Relaxed);
            return ReadOutcome::Silence;
        }

        let mut idx = (r % self.capacity as u64) as usize;
        for slot in out.iter_mut() {
            *slot = f32::from_bits(self.storage[idx].load(Ordering::Relaxed));
            idx += 1;
            if idx == self.capacity {
                idx = 0;
            }
        }
        self.read.store(r + needed, Ordering::Release);

        if recovered {
            ReadOutcome::Recovered
        } else {
            ReadOutcome::Played
        }
    }

    fn seek_forward_inner(&self, secs: u64) {
        if secs == 0 {
            return;
        }
        let w = self.written.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Relaxed);
        let limit = w.saturating_sub(self.margin_samples);
        let target = r.saturating_add(secs * u64::from(self.sample_rate));
        // Never past the margin, never backward.
        let new = target.min(limit).max(r);
        if target > limit {
            self.clamped_seeks.fetch_add(1, Ordering::Relaxed);
            debug!(requested = secs, "forward seek clamped at safety margin");
        }
        self.read.store(new, Ordering::Release);
    }

    fn seek_backward_inner(&self, secs: u64) {
        if secs == 0 {
            return;
        }
        let w = self.written.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Relaxed);
        // Oldest reachable position: `margin` past the trailing edge of the
        // window (or stream start while the window is still filling).
        let floor = w.saturating_sub(self.capacity as u64 - self.margin_samples);
        let target = r.saturating_sub(secs * u64::from(self.sample_rate));
        let new = target.max(floor);
        if target < floor {
            self.clamped_seeks.fetch_add(1, Ordering::Relaxed);
            debug!(requested = secs, "backward seek clamped at oldest valid data");
        }
        self.read.store(new, Ordering::Release);
    }
}

/// Write half of a split [`DelayBuffer`]. Exactly one exists per buffer;
/// hold it on the producer thread.
pub struct DelayWriter {
    shared: Arc<DelayBuffer>,
}

impl DelayWriter {
    /// See [`DelayBuffer::write_chunk`]. Lock-free and allocation-free —
    /// safe to call from a real-time callback.
    pub fn write_chunk(&mut self, samples: &[f32]) {
        self.shared.write_inner(samples);
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    pub fn stats(&self) -> DelayStats {
        self.shared.stats()
    }
}

/// Read half of a split [`DelayBuffer`]. Exactly one exists per buffer;
/// hold it on the consumer thread. Seeks go through this handle too, which
/// serializes them with reads by construction.
pub struct DelayReader {
    shared: Arc<DelayBuffer>,
}

impl DelayReader {
    /// See [`DelayBuffer::read_frame_into`].
    pub fn read_frame_into(&mut self, out: &mut [f32]) -> ReadOutcome {
        self.shared.read_inner(out)
    }

    /// See [`DelayBuffer::read_next_window`].
    pub fn read_next_window(&mut self) -> AudioChunk {
        let mut samples = vec![0f32; self.shared.frame_len];
        self.shared.read_inner(&mut samples);
        AudioChunk::new(samples, self.shared.sample_rate)
    }

    /// See [`DelayBuffer::seek_forward`].
    pub fn seek_forward(&mut self, secs: u64) {
        self.shared.seek_forward_inner(secs);
    }

    /// See [`DelayBuffer::seek_backward`].
    pub fn seek_backward(&mut self, secs: u64) {
        self.shared.seek_backward_inner(secs);
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    pub fn stats(&self) -> DelayStats {
        self.shared.stats()
    }

    /// See [`DelayBuffer::peek_recent`].
    pub fn peek_recent(&self, n: usize) -> AudioChunk {
        self.shared.peek_recent(n)
    }

    /// See [`DelayBuffer::snapshot_to_wav`].
    pub fn snapshot_to_wav(&self, path: &Path, seconds: u32) -> Result<()> {
        self.shared.snapshot_to_wav(path, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(rate: u32, window: u32, margin: u32) -> DelayBuffer {
        DelayBuffer::new(DelayConfig::new(rate, window, margin)).unwrap()
    }

    /// One second of samples all carrying the chunk's tag value.
    fn tagged_second(rate: u32, tag: f32) -> Vec<f32> {
        vec![tag; rate as usize]
    }

    #[test]
    fn fresh_buffer_reads_silence_and_holds() {
        let mut buf = buffer(128, 10, 2);
        let window = buf.read_next_window();
        assert_eq!(window.samples.len(), 128);
        assert!(window.samples.iter().all(|&s| s == 0.0));

        let mut frame = [1.0f32; 128];
        assert_eq!(buf.read_frame_into(&mut frame), ReadOutcome::Silence);
        assert!(frame.iter().all(|&s| s == 0.0));

        let stats = buf.stats();
        assert_eq!(stats.samples_read, 0, "silence must not advance the cursor");
        assert_eq!(stats.underruns, 2);
    }

    #[test]
    fn read_reflects_write_in_order() {
        let mut buf = buffer(128, 10, 2);
        let chunk: Vec<f32> = (0..128).map(|i| i as f32).collect();
        buf.write_chunk(&chunk);

        let window = buf.read_next_window();
        assert_eq!(window.samples, chunk);
        assert_eq!(buf.stats().samples_read, 128);
    }

    #[test]
    fn wraparound_overwrites_oldest_chunk() {
        let rate = 64;
        let mut buf = buffer(rate, 10, 1);
        for tag in 0..11 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }

        // Chunk 0 is gone; the window now holds chunks 1..=10 in order.
        let tail = buf.peek_recent(buf.capacity());
        assert_eq!(tail.samples.len(), buf.capacity());
        for (i, &s) in tail.samples.iter().enumerate() {
            let expected = (i / rate as usize + 1) as f32;
            assert_eq!(s, expected, "sample {i}");
        }
    }

    #[test]
    fn read_spans_the_wrap_boundary() {
        let rate = 100;
        let mut buf = buffer(rate, 4, 1);
        for tag in 0..5 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        // Storage has wrapped: chunk 4 sits in slots 0..100.
        buf.seek_forward(3);
        let mut frame = vec![0f32; 150];
        assert_eq!(buf.read_frame_into(&mut frame), ReadOutcome::Played);
        assert!(frame[..100].iter().all(|&s| s == 3.0));
        assert!(frame[100..].iter().all(|&s| s == 4.0));
    }

    #[test]
    fn forward_seek_lands_on_requested_second() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        for tag in 0..10 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        buf.seek_forward(4);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 4.0));
        assert_eq!(buf.stats().clamped_seeks, 0);
    }

    #[test]
    fn forward_seek_clamps_to_margin_behind_writer() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        for tag in 0..10 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        // 10 s written, margin 2 s: the cursor may reach second 8 at most.
        buf.seek_forward(10);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 8.0));
        assert_eq!(buf.stats().clamped_seeks, 1);
    }

    #[test]
    fn backward_seek_rewinds_by_requested_seconds() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        for tag in 0..10 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        for _ in 0..4 {
            buf.read_next_window();
        }
        buf.seek_backward(2);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 2.0));
    }

    #[test]
    fn backward_seek_clamps_past_oldest_valid_data() {
        let rate = 50;
        let mut buf = buffer(rate, 10, 2);
        for tag in 0..12 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        // Oldest surviving sample is second 2; the clamp adds the margin.
        buf.seek_backward(1_000);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 4.0));
        assert_eq!(buf.stats().clamped_seeks, 1);
    }

    #[test]
    fn stale_cursor_re_anchors_deterministically() {
        let rate = 50;
        let mut buf = buffer(rate, 10, 2);
        for tag in 0..15 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }

        // Reader never moved; its position was overwritten 5 s ago.
        let mut frame = vec![0f32; rate as usize];
        assert_eq!(buf.read_frame_into(&mut frame), ReadOutcome::Recovered);
        assert!(frame.iter().all(|&s| s == 7.0), "anchor = write - window + margin");

        // Back to normal tracking afterwards.
        assert_eq!(buf.read_frame_into(&mut frame), ReadOutcome::Played);
        assert!(frame.iter().all(|&s| s == 8.0));
        assert_eq!(buf.stats().re_anchors, 1);
    }

    #[test]
    fn zero_second_seeks_are_noops() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        for tag in 0..6 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        buf.seek_forward(0);
        buf.seek_backward(0);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 0.0));
        assert_eq!(buf.stats().samples_read, u64::from(rate));
    }

    #[test]
    fn repeated_reads_advance_the_cursor() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        for tag in 0..6 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        let first = buf.read_next_window();
        let second = buf.read_next_window();
        assert!(first.samples.iter().all(|&s| s == 0.0));
        assert!(second.samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn collision_guard_holds_until_enough_data() {
        let rate = 100;
        let mut buf = buffer(rate, 10, 2);
        let first_half: Vec<f32> = (0..50).map(|i| i as f32).collect();
        let second_half: Vec<f32> = (50..100).map(|i| i as f32).collect();

        buf.write_chunk(&first_half);
        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 0.0));
        assert_eq!(buf.stats().underruns, 1);

        buf.write_chunk(&second_half);
        let window = buf.read_next_window();
        let expected: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(window.samples, expected);
    }

    #[test]
    fn peek_does_not_advance_the_cursor() {
        let rate = 50;
        let mut buf = buffer(rate, 12, 2);
        buf.write_chunk(&tagged_second(rate, 1.0));
        buf.write_chunk(&tagged_second(rate, 2.0));

        let tail = buf.peek_recent(rate as usize);
        assert!(tail.samples.iter().all(|&s| s == 2.0));

        let window = buf.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn split_halves_share_one_stream() {
        let rate = 50;
        let buf = buffer(rate, 12, 2);
        let (mut writer, mut reader) = buf.split();

        writer.write_chunk(&tagged_second(rate, 3.0));
        let window = reader.read_next_window();
        assert!(window.samples.iter().all(|&s| s == 3.0));

        assert_eq!(writer.stats().samples_written, u64::from(rate));
        assert_eq!(reader.stats().samples_read, u64::from(rate));
    }

    #[test]
    fn rejects_impossible_configs() {
        let cases = [
            DelayConfig::new(0, 10, 2),
            DelayConfig::new(48_000, 0, 2),
            DelayConfig::new(48_000, 10, 0),
            DelayConfig::new(48_000, 10, 10),
            DelayConfig::new(48_000, 10, 11),
            DelayConfig {
                frame_len: 0,
                ..DelayConfig::new(48_000, 10, 2)
            },
            DelayConfig {
                // Larger than the usable (window - margin) region.
                frame_len: 48_000 * 9,
                ..DelayConfig::new(48_000, 10, 2)
            },
        ];
        for config in cases {
            let err = DelayBuffer::new(config.clone()).err();
            assert!(
                matches!(err, Some(TimeshiftError::InvalidConfig(_))),
                "config should be rejected: {config:?}"
            );
        }
    }

    #[test]
    fn stats_delay_tracks_cursor_distance() {
        let rate = 100;
        let mut buf = buffer(rate, 10, 2);
        for tag in 0..5 {
            buf.write_chunk(&tagged_second(rate, tag as f32));
        }
        buf.read_next_window();
        let stats = buf.stats();
        assert_eq!(stats.samples_written, 500);
        assert_eq!(stats.samples_read, 100);
        assert!((stats.delay_secs() - 4.0).abs() < 1e-9);
        assert!((stats.buffered_secs() - 5.0).abs() < 1e-9);
    }
}
