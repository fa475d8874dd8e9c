use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub session: SessionConfig,
    pub participant: ParticipantConfig,
    pub archive: ArchiveConfig,
    pub ipc: IpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Collection server root (or use VOICE_COLLECT_SERVER env var)
    pub base_url: String,
    /// Per-request timeout (seconds); finalizing uploads the whole session
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name (empty = default)
    pub input_device: Option<String>,
    /// Rate of the submitted WAV files
    pub sample_rate: u32,
    /// Capture backlog in samples; sets how many chunks may queue between the device and the recorder
    pub buffer_size: usize,
    /// Maximum take length (seconds)
    pub max_duration: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            sample_rate: 44100,
            buffer_size: 4096,
            max_duration: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Takes per session; must match the server
    pub prompts_per_session: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompts_per_session: 5,
        }
    }
}

/// Pre-filled registration details; command-line flags take precedence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Keep a local copy of every submitted take
    pub enabled: bool,
    /// Archive directory (default: data dir/recordings)
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/voice-collect.sock)
    pub socket_path: Option<PathBuf>,
}
