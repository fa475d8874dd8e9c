use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::session::Prompt;

/// Local time down to milliseconds, e.g. `20240131-154502-077`
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// Local copies of submitted takes: `<stamp>_<prompt-stem>.wav` next to a `.txt`
/// holding the prompt text
#[derive(Debug, Clone)]
pub struct Archive {
    dir: Option<PathBuf>,
}

impl Archive {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Write the take. Archiving is best effort, so errors are only logged.
    pub fn store(&self, wav: &[u8], prompt: &Prompt) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        match write_take(dir, wav, prompt) {
            Ok(path) => {
                debug!("Archived take to {:?}", path);
                Some(path)
            }
            Err(e) => {
                warn!("Failed to archive take in {:?}: {}", dir, e);
                None
            }
        }
    }
}

fn write_take(dir: &Path, wav: &[u8], prompt: &Prompt) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let stem = format!("{}_{}", Local::now().format(STAMP_FORMAT), file_stem(&prompt.id));
    let wav_path = dir.join(format!("{}.wav", stem));
    std::fs::write(&wav_path, wav)?;
    std::fs::write(dir.join(format!("{}.txt", stem)), &prompt.text)?;

    Ok(wav_path)
}

/// Filesystem-safe name derived from a prompt id such as `prompts/standard/p_17.txt`
fn file_stem(prompt_id: &str) -> String {
    let base = Path::new(prompt_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(prompt_id);

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "prompt".to_string()
    } else {
        cleaned
    }
}
