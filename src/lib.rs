pub mod app;
pub mod archive;
pub mod audio;
pub mod config;
pub mod error;
pub mod ipc;
pub mod recorder;
pub mod session;

pub use app::App;
pub use audio::encode_wav;
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use recorder::{Recorder, RecorderState};
