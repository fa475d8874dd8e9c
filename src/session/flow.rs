use tracing::{info, warn};

use crate::error::SessionError;
use crate::session::{
    CollectionBackend, FinalizeOutcome, Progress, Prompt, PromptResponse, SessionResult,
    Submission, UserInfo,
};

/// Where the contributor is in the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Welcome,
    Registration,
    /// Registered or just saved a take; the next prompt has not arrived yet
    AwaitingPrompt,
    Prompting(Prompt),
    /// All takes saved, waiting for the upload confirmation
    Complete { completed: u32 },
    NoPrompts { completed: u32 },
    Uploaded { uploaded: u32 },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::Registration => "registration",
            Phase::AwaitingPrompt => "awaiting-prompt",
            Phase::Prompting(_) => "prompting",
            Phase::Complete { .. } => "complete",
            Phase::NoPrompts { .. } => "no-prompts",
            Phase::Uploaded { .. } => "uploaded",
        }
    }
}

/// One contributor's pass through the prompts, driven against a backend
pub struct Session {
    backend: Box<dyn CollectionBackend>,
    phase: Phase,
    completed: u32,
    total: u32,
}

impl Session {
    pub fn new(backend: Box<dyn CollectionBackend>, total: u32) -> Self {
        Self {
            backend,
            phase: Phase::Welcome,
            completed: 0,
            total,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.completed, self.total)
    }

    pub fn current_prompt(&self) -> Option<&Prompt> {
        match &self.phase {
            Phase::Prompting(prompt) => Some(prompt),
            _ => None,
        }
    }

    /// Leave the welcome screen
    pub fn begin(&mut self) -> SessionResult<()> {
        self.require(matches!(self.phase, Phase::Welcome), "begin")?;
        self.phase = Phase::Registration;
        Ok(())
    }

    /// Send the participant details, then fetch the first prompt
    pub async fn register(&mut self, info: &UserInfo) -> SessionResult<&Phase> {
        self.require(matches!(self.phase, Phase::Registration), "register")?;
        info.validate()?;

        let reply = self.backend.submit_user_info(info).await?;
        if !reply.success {
            let reason = reply.error.unwrap_or_else(|| "Unknown error".to_string());
            warn!("Registration rejected: {}", reason);
            return Err(SessionError::Rejected(reason));
        }

        info!("Registered with {} backend", self.backend.name());
        self.completed = 0;
        self.phase = Phase::AwaitingPrompt;
        self.load_prompt().await
    }

    /// Ask the server what to read next
    pub async fn load_prompt(&mut self) -> SessionResult<&Phase> {
        self.require(
            matches!(self.phase, Phase::AwaitingPrompt | Phase::Prompting(_)),
            "load a prompt",
        )?;

        self.phase = match self.backend.next_prompt().await? {
            PromptResponse::Prompt(prompt) => {
                self.completed = prompt.completed;
                info!("{}: {}", self.progress().status_line(), prompt.text);
                Phase::Prompting(prompt)
            }
            PromptResponse::Complete { completed } => {
                self.completed = completed;
                info!("Session complete ({} takes), confirm to upload", completed);
                Phase::Complete { completed }
            }
            PromptResponse::NoPrompts { completed } => {
                self.completed = completed;
                warn!("Server has no prompts available");
                Phase::NoPrompts { completed }
            }
        };
        Ok(&self.phase)
    }

    /// Submit a take for the current prompt. On failure nothing changes and
    /// the same take can be submitted again.
    pub async fn submit_take(&mut self, wav: Vec<u8>) -> SessionResult<()> {
        let prompt = self
            .current_prompt()
            .ok_or(SessionError::WrongPhase {
                phase: self.phase.name(),
                action: "save a take",
            })?;

        let submission = Submission {
            wav,
            text: prompt.text.clone(),
            prompt_id: prompt.id.clone(),
        };
        self.backend.submit_recording(submission).await?;

        self.completed += 1;
        self.phase = Phase::AwaitingPrompt;
        Ok(())
    }

    /// Submit a take and move on to the next prompt
    pub async fn save(&mut self, wav: Vec<u8>) -> SessionResult<&Phase> {
        self.submit_take(wav).await?;
        self.load_prompt().await
    }

    /// Confirm the session so the server uploads it.
    ///
    /// A `no_uploads` reply counts as done with zero recordings rather than
    /// as a failed upload: the server has nothing left to send, so retrying
    /// cannot change the outcome.
    pub async fn finalize(&mut self) -> SessionResult<u32> {
        self.require(matches!(self.phase, Phase::Complete { .. }), "finalize")?;

        let uploaded = match self.backend.finalize_session().await? {
            FinalizeOutcome::Uploaded(n) => n,
            FinalizeOutcome::NoUploads(message) => {
                warn!("Nothing to upload: {}", message);
                0
            }
            FinalizeOutcome::Failed(reason) => return Err(SessionError::UploadFailed(reason)),
        };

        info!("Upload successful, {} recordings", uploaded);
        self.phase = Phase::Uploaded { uploaded };
        Ok(uploaded)
    }

    /// Reset the server session and start over from the welcome screen
    pub async fn new_session(&mut self) -> SessionResult<()> {
        self.backend.new_session().await?;
        self.phase = Phase::Welcome;
        self.completed = 0;
        Ok(())
    }

    fn require(&self, ok: bool, action: &'static str) -> SessionResult<()> {
        if ok {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                phase: self.phase.name(),
                action,
            })
        }
    }
}
