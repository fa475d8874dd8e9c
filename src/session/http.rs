use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::SessionError;
use crate::session::api::{RawFinalizeReply, RawPromptReply};
use crate::session::{
    CollectionBackend, FinalizeOutcome, PromptResponse, RegistrationReply, SessionResult,
    Submission, UserInfo,
};

/// Collection server reached over HTTP. The server tracks progress in a
/// session cookie, so one client must be used for the whole session.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session_len: u32,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> SessionResult<Self> {
        Self::with_base_url(
            &config.server_url(),
            Duration::from_secs(config.server.timeout_secs),
            config.session.prompts_per_session,
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration, session_len: u32) -> SessionResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            session_len,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fail on non-2xx, keeping the body for the error message
    async fn checked(response: Response) -> SessionResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SessionError::Server {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> SessionResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SessionError::UnexpectedResponse(format!("{}: {}", e, body)))
    }
}

#[async_trait]
impl CollectionBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn submit_user_info(&self, info: &UserInfo) -> SessionResult<RegistrationReply> {
        let response = self
            .client
            .post(self.url("/submit_user_info"))
            .form(&info.form_fields())
            .send()
            .await?;

        // Validation failures come back as 400 with a JSON explanation
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<RegistrationReply>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(SessionError::Server {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(SessionError::UnexpectedResponse(format!("{}: {}", e, body))),
        }
    }

    async fn next_prompt(&self) -> SessionResult<PromptResponse> {
        let response = self.client.get(self.url("/api/prompt")).send().await?;
        let raw: RawPromptReply = Self::json(Self::checked(response).await?).await?;
        raw.into_response(self.session_len)
    }

    async fn submit_recording(&self, submission: Submission) -> SessionResult<()> {
        debug!(
            "Submitting {} bytes for prompt {}",
            submission.wav.len(),
            submission.prompt_id
        );

        let audio = Part::bytes(submission.wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")?;

        let form = Form::new()
            .part("audio", audio)
            .text("text", submission.text)
            .text("prompt_id", submission.prompt_id);

        let response = self
            .client
            .post(self.url("/submit"))
            .multipart(form)
            .send()
            .await?;

        let reply: serde_json::Value = Self::json(Self::checked(response).await?).await?;
        debug!("Submission reply: {}", reply);
        Ok(())
    }

    async fn finalize_session(&self) -> SessionResult<FinalizeOutcome> {
        info!("Asking server to upload the session");
        let response = self
            .client
            .post(self.url("/finalize_session"))
            .send()
            .await?;

        let raw: RawFinalizeReply = Self::json(Self::checked(response).await?).await?;
        Ok(raw.into())
    }

    async fn new_session(&self) -> SessionResult<()> {
        let response = self.client.post(self.url("/new_session")).send().await?;
        Self::checked(response).await?;
        Ok(())
    }
}
