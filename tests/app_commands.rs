mod common;

use common::{participant, FakeBackend};
use voice_collect::error::{AppError, RecorderError, SessionError};
use voice_collect::ipc::IpcCommand;
use voice_collect::{App, AppConfig};

fn app(backend: &FakeBackend) -> App {
    App::new(AppConfig::default(), participant(), backend.boxed())
}

#[tokio::test]
async fn start_registers_and_shows_first_prompt() {
    let backend = FakeBackend::new(&["read me first", "second"], 5);
    let app = app(&backend);

    let line = app.start().await.unwrap();
    assert_eq!(line, "CONTRIBUTION 1 OF 5 ○○○○○: read me first");
    assert_eq!(backend.with(|s| s.registered.clone()), Some(participant()));

    let status = app.handle_command(IpcCommand::Status).await.unwrap();
    assert!(status.starts_with("OK phase=prompting recorder=idle"), "{}", status);
    assert!(status.contains("read me first"));
}

#[tokio::test]
async fn take_commands_need_a_stopped_take() {
    let backend = FakeBackend::new(&["a"], 5);
    let app = app(&backend);
    app.start().await.unwrap();

    assert!(matches!(
        app.handle_command(IpcCommand::Save).await,
        Err(AppError::Recorder(RecorderError::InvalidTransition { .. }))
    ));
    assert!(matches!(
        app.handle_command(IpcCommand::Retake).await,
        Err(AppError::Recorder(RecorderError::InvalidTransition { .. }))
    ));
    assert!(backend.with(|s| s.submissions.is_empty()));
}

#[tokio::test]
async fn finalize_before_completion_is_refused() {
    let backend = FakeBackend::new(&["a"], 5);
    let app = app(&backend);
    app.start().await.unwrap();

    assert!(matches!(
        app.handle_command(IpcCommand::Finalize).await,
        Err(AppError::Session(SessionError::WrongPhase { .. }))
    ));
    assert_eq!(backend.with(|s| s.finalize_calls), 0);
}

#[tokio::test]
async fn record_without_prompt_is_refused() {
    let backend = FakeBackend::new(&[], 5);
    let app = app(&backend);

    let line = app.start().await.unwrap();
    assert!(line.starts_with("sorry, no prompts"), "{}", line);

    assert!(matches!(
        app.handle_command(IpcCommand::Record).await,
        Err(AppError::Session(SessionError::WrongPhase { phase: "no-prompts", .. }))
    ));
}

#[tokio::test]
async fn reload_recovers_from_prompt_failure() {
    let backend = FakeBackend::new(&["a"], 5);
    backend.with(|s| s.fail_prompt_loads = 1);
    let app = app(&backend);

    assert!(app.start().await.is_err());
    let reply = app.handle_command(IpcCommand::Reload).await.unwrap();
    assert_eq!(reply, "OK CONTRIBUTION 1 OF 5 ○○○○○: a");
}

#[tokio::test]
async fn new_session_registers_again() {
    let backend = FakeBackend::new(&["a", "b"], 5);
    let app = app(&backend);
    app.start().await.unwrap();

    let reply = app.handle_command(IpcCommand::NewSession).await.unwrap();
    assert!(reply.starts_with("OK new session | CONTRIBUTION 1 OF 5"), "{}", reply);
    assert_eq!(backend.with(|s| s.resets), 1);
    assert_eq!(backend.with(|s| s.registered.clone()), Some(participant()));
}

#[tokio::test]
async fn shutdown_without_capture_is_clean() {
    let backend = FakeBackend::new(&["a"], 5);
    let app = app(&backend);
    app.start().await.unwrap();

    assert_eq!(
        app.handle_command(IpcCommand::Shutdown).await.unwrap(),
        "OK shutting down"
    );
}

#[tokio::test]
async fn closing_timed_out_capture_leaves_idle_recorder_alone() {
    let backend = FakeBackend::new(&["a"], 5);
    let app = app(&backend);
    app.start().await.unwrap();

    app.close_timed_out_capture().await;
    let status = app.handle_command(IpcCommand::Status).await.unwrap();
    assert!(status.starts_with("OK phase=prompting recorder=idle"), "{}", status);
}
