//! `TimeShiftEngine` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! TimeShiftEngine::new()
//!     └─► start()        → devices open, ingest loop spawned, status = Shifting
//!         ├─► seek_forward() / seek_backward()   (any thread, clamped)
//!         └─► stop()     → running=false, streams dropped, status = Stopped
//! ```
//!
//! `start()`/`stop()` are guarded: calling them in the wrong state returns
//! an error rather than panicking.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread
//! affinity). Both streams are therefore created *inside* the
//! `spawn_blocking` closure so they never cross a thread boundary. A sync
//! oneshot channel propagates any open-device error back to the `start()`
//! caller.
//!
//! Seek calls do not touch the read cursor directly: they enqueue a
//! [`SeekCommand`] that the render callback drains before its next fill, so
//! the cursor keeps a single mutating thread.

pub mod session;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    audio::{AudioCapture, AudioOutput},
    buffering::{
        create_capture_ring,
        delay::{DelayBuffer, DelayConfig},
    },
    error::{Result, TimeshiftError},
    events::{PlayheadEvent, TransportStatus, TransportStatusEvent},
};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// A read-cursor jump, delivered to the render callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekCommand {
    /// Skip ahead by whole seconds, clamped at the safety margin behind live.
    Forward(u64),
    /// Rewind by whole seconds, clamped at the oldest still-valid data.
    Backward(u64),
}

/// Configuration for [`TimeShiftEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay window parameters (rate, depth, safety margin, read frame).
    pub delay: DelayConfig,
    /// Input device by name; `None` selects the system default.
    pub preferred_input_device: Option<String>,
    /// Output device by name; `None` selects the system default.
    pub preferred_output_device: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay: DelayConfig::default(),
            preferred_input_device: None,
            preferred_output_device: None,
        }
    }
}

/// The top-level engine handle.
///
/// `TimeShiftEngine` is `Send + Sync` — all fields use interior mutability.
/// Wrap in `Arc<TimeShiftEngine>` to share between host state and
/// event-forwarding tasks.
pub struct TimeShiftEngine {
    config: EngineConfig,
    /// `true` while capture + ingest + render are active.
    running: Arc<AtomicBool>,
    /// Canonical status (written via Mutex, read from host commands).
    status: Mutex<TransportStatus>,
    status_tx: broadcast::Sender<TransportStatusEvent>,
    playhead_tx: broadcast::Sender<PlayheadEvent>,
    /// Seek command sender for the active session, if any.
    seek_tx: Mutex<Option<crossbeam_channel::Sender<SeekCommand>>>,
    /// Shared ingest diagnostics counters.
    diagnostics: Arc<session::SessionDiagnostics>,
}

impl TimeShiftEngine {
    /// Create a new engine. Does not open devices — call `start()`.
    pub fn new(config: EngineConfig) -> Self {
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (playhead_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(TransportStatus::Idle),
            status_tx,
            playhead_tx,
            seek_tx: Mutex::new(None),
            diagnostics: Arc::new(session::SessionDiagnostics::default()),
        }
    }

    /// Start capture, the ingest loop, and delayed render.
    ///
    /// Blocks until both audio devices are confirmed open (or fail), then
    /// returns. The session continues in a background blocking thread.
    ///
    /// # Errors
    /// - `TimeshiftError::AlreadyRunning` if already started.
    /// - `TimeshiftError::InvalidConfig` for an impossible delay config.
    /// - Device/stream errors from either side of the audio graph.
    pub fn start(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(TimeshiftError::AlreadyRunning);
        }

        let buffer = DelayBuffer::new(self.config.delay.clone())?;
        let (writer, reader) = buffer.split();
        let (capture_producer, capture_consumer) = create_capture_ring();
        let (seek_tx, seek_rx) = crossbeam_channel::unbounded();

        self.diagnostics.reset();
        self.running.store(true, Ordering::SeqCst);
        self.set_status(TransportStatus::Priming, None);
        *self.seek_tx.lock() = Some(seek_tx);

        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let playhead_tx = self.playhead_tx.clone();
        let diagnostics = Arc::clone(&self.diagnostics);

        // Sync oneshot: the session thread signals open success/failure.
        // Carries the actual capture sample rate on success.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        tokio::task::spawn_blocking(move || {
            // ── Open devices (on THIS thread — cpal::Stream is !Send) ────
            let capture = match AudioCapture::open_with_preference(
                capture_producer,
                Arc::clone(&running),
                config.preferred_input_device.as_deref(),
            ) {
                Ok(c) => c,
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let output = match AudioOutput::open_with_preference(
                reader,
                seek_rx,
                Arc::clone(&running),
                config.preferred_output_device.as_deref(),
            ) {
                Ok(o) => o,
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let _ = open_tx.send(Ok(capture.sample_rate));

            // ── Run ingest until stop() ──────────────────────────────────
            session::run(session::SessionContext {
                capture_sample_rate: capture.sample_rate,
                buffer_sample_rate: config.delay.sample_rate,
                consumer: capture_consumer,
                writer,
                running: Arc::clone(&running),
                playhead_tx,
                diagnostics,
            });

            // Streams drop here, releasing both devices on this thread.
            drop(output);
            drop(capture);
        });

        // Block start() until device open is confirmed.
        match open_rx.recv() {
            Ok(Ok(capture_rate)) => {
                info!(capture_rate, "engine started — shifting");
                self.set_status(TransportStatus::Shifting, None);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                *self.seek_tx.lock() = None;
                self.set_status(TransportStatus::Error, Some(e.to_string()));
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent.
                self.running.store(false, Ordering::SeqCst);
                *self.seek_tx.lock() = None;
                self.set_status(TransportStatus::Error, Some("session failed to start".into()));
                Err(TimeshiftError::Other(anyhow::anyhow!(
                    "session task died unexpectedly"
                )))
            }
        }
    }

    /// Stop capture, ingest, and render.
    ///
    /// # Errors
    /// - `TimeshiftError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TimeshiftError::NotRunning);
        }

        self.running.store(false, Ordering::SeqCst);
        *self.seek_tx.lock() = None;
        self.set_status(TransportStatus::Stopped, None);
        info!("engine stop requested");
        Ok(())
    }

    /// Skip the playback cursor ahead by `secs`, clamped at the margin.
    pub fn seek_forward(&self, secs: u64) -> Result<()> {
        self.send_seek(SeekCommand::Forward(secs))
    }

    /// Rewind the playback cursor by `secs`, clamped at the oldest data.
    pub fn seek_backward(&self, secs: u64) -> Result<()> {
        self.send_seek(SeekCommand::Backward(secs))
    }

    /// Current transport status (snapshot).
    pub fn status(&self) -> TransportStatus {
        *self.status.lock()
    }

    /// Subscribe to transport status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<TransportStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Subscribe to periodic playhead events.
    pub fn subscribe_playhead(&self) -> broadcast::Receiver<PlayheadEvent> {
        self.playhead_tx.subscribe()
    }

    /// Snapshot of ingest counters for observability.
    pub fn diagnostics_snapshot(&self) -> session::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn send_seek(&self, cmd: SeekCommand) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(TimeshiftError::NotRunning);
        }
        let guard = self.seek_tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(TimeshiftError::NotRunning);
        };
        tx.send(cmd).map_err(|_| TimeshiftError::NotRunning)
    }

    fn set_status(&self, new_status: TransportStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(TransportStatusEvent {
            status: new_status,
            detail,
        });
    }
}
