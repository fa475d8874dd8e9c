use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::error::IpcError;

/// Commands that can be sent via IPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcCommand {
    /// Start recording, or stop the running take
    Record,
    /// Discard the stopped take
    Retake,
    /// Submit the stopped take and fetch the next prompt
    Save,
    /// Fetch the next prompt again after a failed request
    Reload,
    /// Confirm the finished session so the server uploads it
    Finalize,
    /// Reset the server session and register again
    NewSession,
    /// Get current status
    Status,
    /// Shutdown the application
    Shutdown,
}

impl IpcCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "record" | "toggle" => Some(Self::Record),
            "retake" => Some(Self::Retake),
            "save" => Some(Self::Save),
            "reload" => Some(Self::Reload),
            "finalize" | "upload" => Some(Self::Finalize),
            "new-session" | "new_session" => Some(Self::NewSession),
            "status" => Some(Self::Status),
            "shutdown" | "quit" | "exit" => Some(Self::Shutdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Retake => "retake",
            Self::Save => "save",
            Self::Reload => "reload",
            Self::Finalize => "finalize",
            Self::NewSession => "new-session",
            Self::Status => "status",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A command together with the channel its one-line reply goes back on
#[derive(Debug)]
pub struct IpcRequest {
    pub command: IpcCommand,
    pub reply: oneshot::Sender<String>,
}

/// IPC server that listens for commands
pub struct IpcServer {
    socket_path: PathBuf,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Start the IPC server and return a receiver for requests
    pub async fn start(&self) -> Result<mpsc::Receiver<IpcRequest>, IpcError> {
        // Clean up old socket
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!("IPC server listening on {:?}", self.socket_path);

        let (tx, rx) = mpsc::channel::<IpcRequest>(32);

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_client(stream, tx).await {
                                warn!("IPC client error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("IPC accept error: {}", e);
                    }
                }
            }
        });

        Ok(rx)
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn handle_client(
    mut stream: UnixStream,
    tx: mpsc::Sender<IpcRequest>,
) -> Result<(), IpcError> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;
    debug!("IPC received: {}", line.trim());

    let response = dispatch(&line, &tx)
        .await
        .unwrap_or_else(|e| format!("ERROR: {}", e));

    writer.write_all(response.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Hand one command line to the session loop and wait for its reply
async fn dispatch(line: &str, tx: &mpsc::Sender<IpcRequest>) -> Result<String, IpcError> {
    let command =
        IpcCommand::parse(line).ok_or_else(|| IpcError::InvalidCommand(line.trim().to_string()))?;

    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(IpcRequest {
        command,
        reply: reply_tx,
    })
    .await
    .map_err(|_| IpcError::SendError("session loop has stopped".to_string()))?;

    reply_rx
        .await
        .map_err(|_| IpcError::SendError("no reply from the session loop".to_string()))
}

/// IPC client for sending commands
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Send a command to the server and wait for its reply
    pub async fn send(&self, command: IpcCommand) -> Result<String, IpcError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| IpcError::ConnectionRefused)?;

        stream.write_all(command.as_str().as_bytes()).await?;
        stream.write_all(b"\n").await?;

        let (reader, _) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response.trim().to_string())
    }
}
