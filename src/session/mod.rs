pub mod api;
pub mod flow;
pub mod http;
pub mod progress;

pub use api::{
    CollectionBackend, FinalizeOutcome, Prompt, PromptResponse, RegistrationReply, SessionResult,
    Submission, UserInfo,
};
pub use flow::{Phase, Session};
pub use http::HttpBackend;
pub use progress::Progress;

use crate::config::AppConfig;

/// Create the backend described by the configuration
pub fn create_backend(config: &AppConfig) -> SessionResult<Box<dyn CollectionBackend>> {
    let backend = HttpBackend::new(config)?;
    Ok(Box::new(backend))
}
