#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use voice_collect::error::SessionError;
use voice_collect::session::{
    CollectionBackend, FinalizeOutcome, Prompt, PromptResponse, RegistrationReply, SessionResult,
    Submission, UserInfo,
};

/// What the fake server has seen and will answer
#[derive(Debug, Default)]
pub struct FakeState {
    pub prompts: Vec<String>,
    pub session_len: u32,
    pub completed: u32,
    pub registered: Option<UserInfo>,
    pub reject_registration: Option<String>,
    pub submissions: Vec<Submission>,
    pub fail_submits: u32,
    pub fail_prompt_loads: u32,
    pub finalize: Option<FinalizeOutcome>,
    pub finalize_calls: u32,
    pub resets: u32,
}

/// In-memory collection server that hands out `prompts` in order
#[derive(Clone)]
pub struct FakeBackend {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new(prompts: &[&str], session_len: u32) -> Self {
        let state = FakeState {
            prompts: prompts.iter().map(|p| p.to_string()).collect(),
            session_len,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn boxed(&self) -> Box<dyn CollectionBackend> {
        Box::new(self.clone())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

pub fn participant() -> UserInfo {
    UserInfo {
        age: 29,
        gender: "female".into(),
        location: "Hyderabad".into(),
        state: "Telangana".into(),
    }
}

fn unavailable() -> SessionError {
    SessionError::Server {
        status: 503,
        body: "unavailable".into(),
    }
}

#[async_trait]
impl CollectionBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn submit_user_info(&self, info: &UserInfo) -> SessionResult<RegistrationReply> {
        self.with(|s| {
            if let Some(reason) = s.reject_registration.clone() {
                return Ok(RegistrationReply {
                    success: false,
                    error: Some(reason),
                });
            }
            s.registered = Some(info.clone());
            s.completed = 0;
            Ok(RegistrationReply {
                success: true,
                error: None,
            })
        })
    }

    async fn next_prompt(&self) -> SessionResult<PromptResponse> {
        self.with(|s| {
            if s.fail_prompt_loads > 0 {
                s.fail_prompt_loads -= 1;
                return Err(unavailable());
            }
            if s.completed >= s.session_len {
                return Ok(PromptResponse::Complete {
                    completed: s.completed,
                });
            }
            match s.prompts.get(s.completed as usize) {
                Some(text) => Ok(PromptResponse::Prompt(Prompt {
                    id: format!("prompts/standard/p{}.txt", s.completed + 1),
                    text: text.clone(),
                    english_text: None,
                    completed: s.completed,
                })),
                None => Ok(PromptResponse::NoPrompts {
                    completed: s.completed,
                }),
            }
        })
    }

    async fn submit_recording(&self, submission: Submission) -> SessionResult<()> {
        self.with(|s| {
            if s.fail_submits > 0 {
                s.fail_submits -= 1;
                return Err(unavailable());
            }
            s.submissions.push(submission);
            s.completed += 1;
            Ok(())
        })
    }

    async fn finalize_session(&self) -> SessionResult<FinalizeOutcome> {
        self.with(|s| {
            s.finalize_calls += 1;
            Ok(s
                .finalize
                .clone()
                .unwrap_or(FinalizeOutcome::Uploaded(s.submissions.len() as u32)))
        })
    }

    async fn new_session(&self) -> SessionResult<()> {
        self.with(|s| {
            s.resets += 1;
            s.completed = 0;
            s.submissions.clear();
            s.registered = None;
            Ok(())
        })
    }
}
