use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use voice_collect::audio::{inspect_wav, AudioCapture};
use voice_collect::config::{self, AppConfig, ParticipantConfig};
use voice_collect::ipc::{IpcClient, IpcCommand, IpcServer};
use voice_collect::session;
use voice_collect::App;

#[derive(Parser)]
#[command(name = "voice-collect")]
#[command(about = "Read prompts aloud and contribute the recordings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register and start a contribution session (default)
    Run(ParticipantArgs),

    /// Send a command to the running session
    #[command(subcommand)]
    Trigger(TriggerCommands),

    /// List available audio devices
    Devices,

    /// Show the format of a recorded WAV file
    Inspect {
        /// WAV file to read
        file: PathBuf,
    },

    /// Generate example configuration file
    InitConfig,
}

/// Registration details; anything omitted comes from the [participant] config section
#[derive(Args, Default)]
struct ParticipantArgs {
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    state: Option<String>,
}

#[derive(Subcommand)]
enum TriggerCommands {
    /// Start recording, or stop the running take
    Record,
    /// Discard the take
    Retake,
    /// Submit the take and load the next prompt
    Save,
    /// Retry loading the next prompt
    Reload,
    /// Confirm and upload the completed session
    Finalize,
    /// Reset the session and register again
    NewSession,
    /// Show current status
    Status,
    /// Stop the running session
    Shutdown,
}

impl From<TriggerCommands> for IpcCommand {
    fn from(cmd: TriggerCommands) -> Self {
        match cmd {
            TriggerCommands::Record => IpcCommand::Record,
            TriggerCommands::Retake => IpcCommand::Retake,
            TriggerCommands::Save => IpcCommand::Save,
            TriggerCommands::Reload => IpcCommand::Reload,
            TriggerCommands::Finalize => IpcCommand::Finalize,
            TriggerCommands::NewSession => IpcCommand::NewSession,
            TriggerCommands::Status => IpcCommand::Status,
            TriggerCommands::Shutdown => IpcCommand::Shutdown,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("voice_collect=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voice_collect=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);

    match cli.command.unwrap_or_else(|| Commands::Run(ParticipantArgs::default())) {
        Commands::Run(participant) => {
            let config = config::load_config_from(&config_path)?;
            run_app(config, participant).await?
        }
        Commands::Trigger(cmd) => {
            let config = config::load_config_from(&config_path)?;
            run_trigger(config, cmd.into()).await?
        }
        Commands::Devices => list_devices()?,
        Commands::Inspect { file } => inspect(&file)?,
        Commands::InitConfig => init_config(&config_path)?,
    }

    Ok(())
}

async fn run_app(config: AppConfig, args: ParticipantArgs) -> anyhow::Result<()> {
    info!("Starting voice-collect against {}", config.server_url());

    config::init_dirs()?;

    let participant = config.participant(&ParticipantConfig {
        age: args.age,
        gender: args.gender,
        location: args.location,
        state: args.state,
    })?;

    let backend = session::create_backend(&config)?;
    let app = App::new(config.clone(), participant, backend);

    match app.start().await {
        Ok(line) => info!("{}", line),
        Err(e) => {
            error!("Failed to start the session: {}", e);
            error!("Hint: is the collection server reachable at {}?", config.server_url());
            return Err(e.into());
        }
    }

    let ipc_server = IpcServer::new(config.socket_path());
    let mut requests = ipc_server.start().await?;

    info!(
        "Ready! Drive the session with: voice-collect trigger record|save|retake|status"
    );

    loop {
        tokio::select! {
            Some(request) = requests.recv() => {
                let command = request.command;
                let reply = match app.handle_command(command).await {
                    Ok(reply) => {
                        info!("{}", reply);
                        reply
                    }
                    Err(e) => {
                        error!("Command '{}' failed: {}", command.as_str(), e);
                        format!("ERROR: {}", e)
                    }
                };
                let _ = request.reply.send(reply);

                if command == IpcCommand::Shutdown {
                    info!("Shutting down");
                    break;
                }
            }
            _ = app.take_timed_out() => {
                app.close_timed_out_capture().await;
                info!("Take stopped at the maximum duration, send 'save' or 'retake'");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                app.handle_command(IpcCommand::Shutdown).await?;
                break;
            }
        }
    }

    Ok(())
}

async fn run_trigger(config: AppConfig, command: IpcCommand) -> anyhow::Result<()> {
    let client = IpcClient::new(config.socket_path());

    match client.send(command).await {
        Ok(response) => {
            println!("{}", response);
            if response.starts_with("ERROR") {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}. Is a session running?", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn list_devices() -> anyhow::Result<()> {
    println!("Available audio input devices:");
    for device in AudioCapture::list_devices()? {
        println!("  - {}", device);
    }
    Ok(())
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let summary = inspect_wav(file)?;
    println!("{}", file.display());
    println!("  sample rate:     {} Hz", summary.sample_rate);
    println!("  channels:        {}", summary.channels);
    println!("  bits per sample: {}", summary.bits_per_sample);
    println!("  samples:         {}", summary.samples);
    println!("  duration:        {:.2}s", summary.duration().as_secs_f32());
    Ok(())
}

fn init_config(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        eprintln!("Configuration file already exists at {:?}", config_path);
        std::process::exit(1);
    }

    config::init_dirs()?;
    config::save_config(&AppConfig::default(), config_path)?;

    println!("Configuration file created at {:?}", config_path);
    println!("\nNext steps:");
    println!("1. Point [server] base_url at the collection server.");
    println!("2. Fill in the [participant] section, or pass --age/--gender/--location/--state to `run`.");
    println!("3. Start a session and drive it from another terminal or a hotkey:");
    println!("   voice-collect run");
    println!("   voice-collect trigger record");

    Ok(())
}
