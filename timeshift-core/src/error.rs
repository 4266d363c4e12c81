use thiserror::Error;

/// All errors produced by timeshift-core.
///
/// The delay buffer itself is total after construction — every runtime
/// operation clamps or recovers instead of failing. Errors here come from
/// construction-time misconfiguration, device handling, and engine
/// lifecycle misuse.
#[derive(Debug, Error)]
pub enum TimeshiftError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("WAV snapshot error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TimeshiftError>;
