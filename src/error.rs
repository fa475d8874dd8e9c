use thiserror::Error;

use crate::recorder::RecorderState;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Audio capture and encoding errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Failed to get audio device: {0}")]
    DeviceError(String),

    #[error("Failed to get audio config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("WAV error: {0}")]
    WavError(String),
}

/// Take recorder state errors
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: RecorderState,
        action: &'static str,
    },

    #[error("Nothing was recorded")]
    NothingRecorded,

    #[error("Failed to encode take: {0}")]
    Encode(#[from] AudioError),
}

/// Collection server and contribution flow errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Invalid participant details: {0}")]
    Validation(String),

    #[error("Cannot {action} during {phase}")]
    WrongPhase {
        phase: &'static str,
        action: &'static str,
    },

    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// IPC communication errors
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Socket error: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to send command: {0}")]
    SendError(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Connection refused")]
    ConnectionRefused,
}

pub type Result<T> = std::result::Result<T, AppError>;
