use cpal::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::archive::Archive;
use crate::audio::{AudioCapture, CaptureConfig};
use crate::config::AppConfig;
use crate::error::{RecorderError, Result, SessionError};
use crate::ipc::IpcCommand;
use crate::recorder::{Recorder, RecorderState};
use crate::session::{CollectionBackend, Phase, Progress, Session, UserInfo};

/// How long a stopped capture gets to hand over its last chunks
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Main application
pub struct App {
    config: AppConfig,
    participant: UserInfo,
    session: Mutex<Session>,
    recorder: Arc<Mutex<Recorder>>,
    archive: Archive,
    audio_capture: Mutex<Option<AudioCapture>>,
    // cpal streams are not Send, so this one stays behind a std Mutex on the main task
    audio_stream: std::sync::Mutex<Option<Stream>>,
    audio_task: Mutex<Option<JoinHandle<()>>>,
    timeout_signal: Arc<Notify>,
}

impl App {
    pub fn new(config: AppConfig, participant: UserInfo, backend: Box<dyn CollectionBackend>) -> Self {
        let archive = if config.archive.enabled {
            Archive::new(config.archive_dir())
        } else {
            Archive::disabled()
        };

        Self {
            session: Mutex::new(Session::new(backend, config.session.prompts_per_session)),
            recorder: Arc::new(Mutex::new(Recorder::new(config.audio.sample_rate))),
            participant,
            archive,
            audio_capture: Mutex::new(None),
            audio_stream: std::sync::Mutex::new(None),
            audio_task: Mutex::new(None),
            timeout_signal: Arc::new(Notify::new()),
            config,
        }
    }

    /// Register the participant and fetch the first prompt
    pub async fn start(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        session.begin()?;
        let phase = session.register(&self.participant).await?.clone();
        Ok(describe(&phase, session.progress()))
    }

    /// Handle an IPC command, returning the reply line
    pub async fn handle_command(&self, cmd: IpcCommand) -> Result<String> {
        match cmd {
            IpcCommand::Record => self.toggle_recording().await,
            IpcCommand::Retake => self.retake().await,
            IpcCommand::Save => self.save().await,
            IpcCommand::Reload => {
                let mut session = self.session.lock().await;
                let phase = session.load_prompt().await?.clone();
                Ok(format!("OK {}", describe(&phase, session.progress())))
            }
            IpcCommand::Finalize => {
                let uploaded = self.session.lock().await.finalize().await?;
                Ok(format!(
                    "OK upload successful ({} recordings), thank you for your contribution",
                    uploaded
                ))
            }
            IpcCommand::NewSession => self.new_session().await,
            IpcCommand::Status => Ok(self.status().await),
            IpcCommand::Shutdown => {
                self.release_capture().await;
                Ok("OK shutting down".to_string())
            }
        }
    }

    /// One-line summary of the session and the recorder
    pub async fn status(&self) -> String {
        let session = self.session.lock().await;
        let recorder = self.recorder.lock().await;
        format!(
            "OK phase={} recorder={} progress={} | {}",
            session.phase().name(),
            recorder.state(),
            session.progress(),
            describe(session.phase(), session.progress())
        )
    }

    async fn toggle_recording(&self) -> Result<String> {
        let state = self.recorder.lock().await.state();
        match state {
            RecorderState::Idle => self.start_recording().await,
            RecorderState::Recording => self.stop_recording().await,
            from => Err(RecorderError::InvalidTransition {
                from,
                action: "record",
            }
            .into()),
        }
    }

    async fn start_recording(&self) -> Result<String> {
        {
            let session = self.session.lock().await;
            if session.current_prompt().is_none() {
                return Err(SessionError::WrongPhase {
                    phase: session.phase().name(),
                    action: "record",
                }
                .into());
            }
        }

        self.release_capture().await;

        let capture_config = CaptureConfig {
            sample_rate: self.config.audio.sample_rate,
            device_name: self.config.audio.input_device.clone(),
            buffer_size: self.config.audio.buffer_size,
        };
        let capture = AudioCapture::new(capture_config)?;
        let (stream, rx) = capture.start()?;

        self.recorder.lock().await.start()?;

        let capture_live = capture.recording_flag();
        *self.audio_capture.lock().await = Some(capture);
        self.set_stream(Some(stream));

        let max_duration = Duration::from_secs(self.config.audio.max_duration as u64);
        let task = tokio::spawn(collect_chunks(
            rx,
            self.recorder.clone(),
            max_duration,
            capture_live,
            self.timeout_signal.clone(),
        ));
        *self.audio_task.lock().await = Some(task);

        info!("Recording");
        Ok("OK recording, send 'record' again to stop".to_string())
    }

    async fn stop_recording(&self) -> Result<String> {
        // Release first: the collector needs the recorder lock to drain
        self.release_capture().await;

        let mut recorder = self.recorder.lock().await;
        if recorder.state() == RecorderState::Recording {
            recorder.stop()?;
        }

        match recorder.take() {
            Some(_) => Ok(format!(
                "OK stopped after {:.1}s, send 'save' or 'retake'",
                recorder.recorded().as_secs_f32()
            )),
            None => {
                warn!("No audio recorded");
                Ok("OK stopped, nothing was recorded, send 'retake'".to_string())
            }
        }
    }

    async fn retake(&self) -> Result<String> {
        self.release_capture().await;
        self.recorder.lock().await.retake()?;
        Ok("OK ready to record".to_string())
    }

    async fn save(&self) -> Result<String> {
        self.release_capture().await;

        let wav = self.recorder.lock().await.begin_save()?;
        let mut session = self.session.lock().await;
        let prompt = session.current_prompt().cloned();

        info!("Saving take ({} bytes)", wav.len());
        let submitted = session.submit_take(wav.clone()).await;
        self.recorder.lock().await.finish_save(submitted.is_ok())?;
        submitted?;

        if let Some(prompt) = prompt {
            self.archive.store(&wav, &prompt);
        }

        match session.load_prompt().await {
            Ok(phase) => {
                let phase = phase.clone();
                Ok(format!("OK saved | {}", describe(&phase, session.progress())))
            }
            Err(e) => {
                warn!("Saved, but loading the next prompt failed: {}", e);
                Ok(format!(
                    "OK saved, but the next prompt could not be loaded ({}), send 'reload'",
                    e
                ))
            }
        }
    }

    async fn new_session(&self) -> Result<String> {
        self.release_capture().await;
        self.recorder.lock().await.reset();
        self.session.lock().await.new_session().await?;
        info!("Started a new session");
        self.start().await.map(|line| format!("OK new session | {}", line))
    }

    /// Resolves when a take hits the maximum duration; follow up with
    /// [`App::close_timed_out_capture`] on the task that owns the stream.
    pub async fn take_timed_out(&self) {
        self.timeout_signal.notified().await
    }

    /// Close the device after a timed-out take. A take started since then
    /// keeps its capture.
    pub async fn close_timed_out_capture(&self) {
        if self.recorder.lock().await.state() == RecorderState::Recording {
            return;
        }
        self.release_capture().await;
    }

    /// Stop the device, drop the stream and let the collector drain
    async fn release_capture(&self) {
        if let Some(capture) = self.audio_capture.lock().await.take() {
            capture.stop();
        }

        // Dropping the stream drops the sender, which ends the collector
        self.set_stream(None);

        if let Some(task) = self.audio_task.lock().await.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(DRAIN_TIMEOUT, task).await.is_err() {
                warn!("Audio collection task did not finish, aborting it");
                abort.abort();
            }
        }
    }

    fn set_stream(&self, stream: Option<Stream>) {
        let mut slot = self
            .audio_stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = stream;
    }
}

/// Move captured chunks into the recorder until the capture ends, the take
/// is stopped elsewhere, or the take hits its maximum length
async fn collect_chunks(
    mut rx: mpsc::Receiver<Vec<f32>>,
    recorder: Arc<Mutex<Recorder>>,
    max_duration: Duration,
    capture_live: Arc<AtomicBool>,
    timed_out: Arc<Notify>,
) {
    let deadline = tokio::time::sleep(max_duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => {
                    if !recorder.lock().await.push_chunk(chunk) {
                        debug!("Recorder no longer recording, collector exiting");
                        break;
                    }
                }
                None => {
                    debug!("Audio channel closed");
                    break;
                }
            },
            _ = &mut deadline => {
                warn!("Max recording duration reached, stopping take");
                capture_live.store(false, Ordering::SeqCst);
                if let Err(e) = recorder.lock().await.stop() {
                    warn!("Could not stop take: {}", e);
                }
                timed_out.notify_one();
                break;
            }
        }
    }

    debug!("Audio collection task finished");
}

/// What the contributor should see for a phase
pub fn describe(phase: &Phase, progress: Progress) -> String {
    match phase {
        Phase::Welcome | Phase::Registration => "not registered".to_string(),
        Phase::AwaitingPrompt => "waiting for the next prompt, send 'reload'".to_string(),
        Phase::Prompting(prompt) => {
            let mut line = format!("{} {}: {}", progress.status_line(), progress.dots(), prompt.text);
            if let Some(ref english) = prompt.english_text {
                line.push_str(&format!(" ({})", english));
            }
            line
        }
        Phase::Complete { .. } => {
            "session completed, send 'finalize' to upload your recordings".to_string()
        }
        Phase::NoPrompts { .. } => {
            "sorry, no prompts available at the moment, please try again later".to_string()
        }
        Phase::Uploaded { uploaded } => format!(
            "{} recordings uploaded, send 'new-session' to start again",
            uploaded
        ),
    }
}
