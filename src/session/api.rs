use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Participant details sent once per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub age: u32,
    pub gender: String,
    pub location: String,
    pub state: String,
}

impl UserInfo {
    /// Every field is required by the server; check before sending
    pub fn validate(&self) -> SessionResult<()> {
        if self.age == 0 {
            return Err(SessionError::Validation("age must be a positive number".into()));
        }
        for (field, value) in [
            ("gender", &self.gender),
            ("location", &self.location),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    /// Form fields for `POST /submit_user_info`
    pub fn form_fields(&self) -> [(&'static str, String); 4] {
        [
            ("age", self.age.to_string()),
            ("gender", self.gender.trim().to_string()),
            ("location", self.location.trim().to_string()),
            ("state", self.state.trim().to_string()),
        ]
    }
}

/// Reply to the registration form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrationReply {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A sentence to read aloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Opaque server identifier, echoed back on submission
    pub id: String,
    pub text: String,
    /// Latin-script transliteration, when the server has one
    pub english_text: Option<String>,
    /// Takes already saved in this session
    pub completed: u32,
}

/// Outcome of asking for the next prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Prompt(Prompt),
    /// Every prompt of the session has been recorded
    Complete { completed: u32 },
    /// The server ran out of prompts
    NoPrompts { completed: u32 },
}

/// `GET /api/prompt` body as sent by the server
#[derive(Debug, Deserialize)]
pub(crate) struct RawPromptReply {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    english_text: Option<String>,
    #[serde(default)]
    completed: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl RawPromptReply {
    /// `session_len` stands in for a missing count on a finished session
    pub(crate) fn into_response(self, session_len: u32) -> SessionResult<PromptResponse> {
        if self.done {
            if self.error.as_deref() == Some("no_prompts") {
                return Ok(PromptResponse::NoPrompts {
                    completed: self.completed.unwrap_or(0),
                });
            }
            return Ok(PromptResponse::Complete {
                completed: self.completed.unwrap_or(session_len),
            });
        }

        let id = match self.id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            other => {
                return Err(SessionError::UnexpectedResponse(format!(
                    "prompt without a usable id: {:?}",
                    other
                )))
            }
        };
        let text = self
            .text
            .ok_or_else(|| SessionError::UnexpectedResponse("prompt without text".into()))?;

        Ok(PromptResponse::Prompt(Prompt {
            id,
            text: text.trim().to_string(),
            english_text: self.english_text.filter(|t| !t.trim().is_empty()),
            completed: self.completed.unwrap_or(0),
        }))
    }
}

/// One recorded take on its way to the server
#[derive(Debug, Clone)]
pub struct Submission {
    /// Encoded 16-bit PCM WAV
    pub wav: Vec<u8>,
    /// Prompt text the contributor read
    pub text: String,
    pub prompt_id: String,
}

/// Outcome of asking the server to upload the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Uploaded(u32),
    /// Nothing was pending on the server side
    NoUploads(String),
    Failed(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFinalizeReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    uploaded: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawFinalizeReply> for FinalizeOutcome {
    fn from(raw: RawFinalizeReply) -> Self {
        match raw.status.as_deref() {
            Some("success") => FinalizeOutcome::Uploaded(raw.uploaded.unwrap_or(0)),
            Some("no_uploads") => FinalizeOutcome::NoUploads(raw.message.unwrap_or_default()),
            Some(other) => FinalizeOutcome::Failed(raw.message.unwrap_or_else(|| other.to_string())),
            None => FinalizeOutcome::Failed(raw.message.unwrap_or_else(|| "no status".to_string())),
        }
    }
}

/// The collection server, as seen by the contribution flow
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    async fn submit_user_info(&self, info: &UserInfo) -> SessionResult<RegistrationReply>;

    async fn next_prompt(&self) -> SessionResult<PromptResponse>;

    async fn submit_recording(&self, submission: Submission) -> SessionResult<()>;

    async fn finalize_session(&self) -> SessionResult<FinalizeOutcome>;

    async fn new_session(&self) -> SessionResult<()>;
}
