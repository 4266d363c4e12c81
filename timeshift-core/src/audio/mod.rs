//! Audio capture and render via the cpal backend.
//!
//! # Design constraints
//!
//! Both cpal callbacks run on OS audio threads at elevated priority. They
//! **must not**:
//! - Allocate heap memory (beyond the first-callback warm-up resize)
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! The capture callback satisfies that by writing into the lock-free SPSC
//! capture ring; the render callback reads the delay buffer through its
//! atomic cursors and drains pending seek commands with a non-blocking
//! `try_recv`.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio
//! on macOS). `AudioCapture` and `AudioOutput` must each be created and
//! dropped on the same thread. The engine accomplishes this by opening both
//! inside `spawn_blocking`.

pub mod device;
pub mod resample;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use crate::{
    buffering::{delay::DelayReader, CaptureProducer, Producer},
    engine::SeekCommand,
    error::{Result, TimeshiftError},
};
use crossbeam_channel::Receiver;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};

/// Handle to an active audio capture stream.
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
}

#[cfg(feature = "audio-cpal")]
impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available device. The stream
    /// downmixes to mono f32 and pushes into `producer` from the callback.
    ///
    /// # Errors
    /// `TimeshiftError::NoDefaultInputDevice` when no microphone exists, or
    /// `TimeshiftError::AudioStream` when cpal fails to build the stream.
    pub fn open_with_preference(
        producer: CaptureProducer,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let device = match preferred_device_name {
            Some(preferred) => match find_input_by_name(&host, preferred) {
                Some(d) => d,
                None => {
                    warn!("preferred input device '{preferred}' not found, falling back");
                    default_or_first_input(&host)?
                }
            },
            None => default_or_first_input(&host)?,
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| TimeshiftError::AudioDevice(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        info!(sample_rate, channels = config.channels, "capture config selected");

        let flag = Arc::clone(&running);
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_capture_stream::<f32>(&device, &config, producer, flag, |s| s),
            SampleFormat::I16 => build_capture_stream::<i16>(&device, &config, producer, flag, |s| {
                f32::from(s) / 32_768.0
            }),
            SampleFormat::U16 => build_capture_stream::<u16>(&device, &config, producer, flag, |s| {
                (f32::from(s) - 32_768.0) / 32_768.0
            }),
            fmt => {
                return Err(TimeshiftError::AudioStream(format!(
                    "unsupported capture sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| TimeshiftError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| TimeshiftError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
        })
    }

    /// Open the system default microphone.
    pub fn open_default(producer: CaptureProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }
}

impl AudioCapture {
    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Handle to an active audio render stream pulling from a [`DelayReader`].
///
/// **Not `Send`** — same thread-affinity rules as [`AudioCapture`].
pub struct AudioOutput {
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    running: Arc<AtomicBool>,
    /// Render sample rate (Hz) — always the delay buffer's rate.
    pub sample_rate: u32,
}

#[cfg(feature = "audio-cpal")]
impl AudioOutput {
    /// Open an output device and start pulling delayed frames.
    ///
    /// The stream is requested at the delay buffer's own `sample_rate`; the
    /// render path performs no rate conversion (the ingest side already
    /// normalized the stream). Pending [`SeekCommand`]s are applied by the
    /// callback before each fill, which keeps all read-cursor mutation on
    /// the single consumer.
    ///
    /// # Errors
    /// `TimeshiftError::NoDefaultOutputDevice` when no output exists, or
    /// `TimeshiftError::AudioStream` when the device rejects the rate or
    /// cpal fails to build the stream.
    pub fn open_with_preference(
        reader: DelayReader,
        seeks: Receiver<SeekCommand>,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let device = match preferred_device_name {
            Some(preferred) => match find_output_by_name(&host, preferred) {
                Some(d) => d,
                None => {
                    warn!("preferred output device '{preferred}' not found, falling back");
                    host.default_output_device()
                        .ok_or(TimeshiftError::NoDefaultOutputDevice)?
                }
            },
            None => host
                .default_output_device()
                .ok_or(TimeshiftError::NoDefaultOutputDevice)?,
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening output device"
        );

        let sample_rate = reader.sample_rate();
        let supported = device
            .default_output_config()
            .map_err(|e| TimeshiftError::AudioDevice(e.to_string()))?;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        info!(sample_rate, channels = config.channels, "render config selected");

        let flag = Arc::clone(&running);
        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_render_stream::<f32>(&device, &config, reader, seeks, flag, |s| s)
            }
            SampleFormat::I16 => {
                build_render_stream::<i16>(&device, &config, reader, seeks, flag, |s| {
                    (s.clamp(-1.0, 1.0) * 32_767.0) as i16
                })
            }
            fmt => {
                return Err(TimeshiftError::AudioStream(format!(
                    "unsupported render sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| TimeshiftError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| TimeshiftError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
        })
    }
}

impl AudioOutput {
    /// Stop: the callback fills silence from its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Build an input stream for one concrete sample format, downmixing
/// interleaved frames to mono with `convert` applied per sample.
#[cfg(feature = "audio-cpal")]
fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: CaptureProducer,
    running: Arc<AtomicBool>,
    convert: impl Fn(T) -> f32 + Send + 'static,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
{
    let channels = usize::from(config.channels);
    let mut mono: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _info: &cpal::InputCallbackInfo| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            let frames = data.len() / channels;
            mono.resize(frames, 0.0);
            for (frame, slot) in data.chunks_exact(channels).zip(mono.iter_mut()) {
                let mut sum = 0f32;
                for &s in frame {
                    sum += convert(s);
                }
                *slot = sum / channels as f32;
            }
            let pushed = producer.push_slice(&mono[..frames]);
            if pushed < frames {
                warn!("capture ring full: dropped {} frames", frames - pushed);
            }
        },
        |err| error!("input stream error: {err}"),
        None,
    )
}

/// Build an output stream for one concrete sample format. The mono delayed
/// signal is fanned out to every device channel.
#[cfg(feature = "audio-cpal")]
fn build_render_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut reader: DelayReader,
    seeks: Receiver<SeekCommand>,
    running: Arc<AtomicBool>,
    convert: impl Fn(f32) -> T + Send + 'static,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
{
    let channels = usize::from(config.channels);
    let mut mono: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
            if !running.load(Ordering::Relaxed) {
                data.fill(convert(0.0));
                return;
            }
            // Apply control-path seeks here so the read cursor has exactly
            // one mutating thread.
            while let Ok(cmd) = seeks.try_recv() {
                match cmd {
                    SeekCommand::Forward(secs) => reader.seek_forward(secs),
                    SeekCommand::Backward(secs) => reader.seek_backward(secs),
                }
            }
            let frames = data.len() / channels;
            mono.resize(frames, 0.0);
            let _ = reader.read_frame_into(&mut mono[..frames]);
            for (frame, &s) in data.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(convert(s));
            }
        },
        |err| error!("output stream error: {err}"),
        None,
    )
}

#[cfg(feature = "audio-cpal")]
fn find_input_by_name(host: &cpal::Host, name: &str) -> Option<cpal::Device> {
    use cpal::traits::HostTrait;
    match host.input_devices() {
        Ok(mut devices) => devices.find(|d| d.name().map(|n| n == name).unwrap_or(false)),
        Err(e) => {
            warn!("failed to list input devices while resolving preference: {e}");
            None
        }
    }
}

#[cfg(feature = "audio-cpal")]
fn find_output_by_name(host: &cpal::Host, name: &str) -> Option<cpal::Device> {
    use cpal::traits::HostTrait;
    match host.output_devices() {
        Ok(mut devices) => devices.find(|d| d.name().map(|n| n == name).unwrap_or(false)),
        Err(e) => {
            warn!("failed to list output devices while resolving preference: {e}");
            None
        }
    }
}

#[cfg(feature = "audio-cpal")]
fn default_or_first_input(host: &cpal::Host) -> Result<cpal::Device> {
    use cpal::traits::HostTrait;
    if let Some(default) = host.default_input_device() {
        return Ok(default);
    }
    let mut devices = host
        .input_devices()
        .map_err(|e| TimeshiftError::AudioDevice(e.to_string()))?;
    let fallback = devices.next().ok_or(TimeshiftError::NoDefaultInputDevice)?;
    warn!("no default input device, falling back to first available input");
    Ok(fallback)
}

/// Stubs when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _producer: CaptureProducer,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(TimeshiftError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    pub fn open_default(producer: CaptureProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }
}

#[cfg(not(feature = "audio-cpal"))]
impl AudioOutput {
    pub fn open_with_preference(
        _reader: DelayReader,
        _seeks: Receiver<SeekCommand>,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(TimeshiftError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
