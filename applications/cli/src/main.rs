//! voxfx - real-time effects engine driven by UI and remote commands
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxfx_audio::WavSink;
use voxfx_control::{
    command_schema, ChannelObserver, Command, Engine, PlaybackAction, RemoteSession,
};

mod config;
mod render;

use config::VoxfxConfig;

#[derive(Parser)]
#[command(name = "voxfx")]
#[command(about = "Audio effects engine controlled by JSON commands", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./voxfx.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a file and accept line-delimited JSON commands on stdin
    Run {
        /// Audio file to load
        file: PathBuf,
        /// Start playing as soon as the file is decoded
        #[arg(long)]
        play: bool,
        /// Also write engine events (progress, parameter and state changes) to stdout
        #[arg(long)]
        events: bool,
        /// Stream the live graph output into this WAV file
        #[arg(long, value_name = "WAV")]
        record: Option<PathBuf>,
    },
    /// Render a file through the effect graph to a WAV file
    Render {
        /// Audio file to render
        input: PathBuf,
        /// WAV file to write
        output: PathBuf,
        /// Timed command script, one `{"at": seconds, "name": ..., "arguments": ...}` per line
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Print the command schema as JSON
    Schema,
    /// Print the effect catalog as JSON
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for command responses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxfx_cli=info,voxfx_control=info,voxfx_audio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = VoxfxConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            file,
            play,
            events,
            record,
        } => {
            run(&config, &file, play, events, record.as_deref()).await?;
        }
        Commands::Render {
            input,
            output,
            script,
        } => {
            render(&config, input, output, script).await?;
        }
        Commands::Schema => {
            let catalog = config.load_catalog()?;
            println!("{}", serde_json::to_string_pretty(&command_schema(&catalog))?);
        }
        Commands::Catalog => {
            let catalog = config.load_catalog()?;
            println!("{}", serde_json::to_string_pretty(&catalog.to_json())?);
        }
    }

    Ok(())
}

async fn run(
    config: &VoxfxConfig,
    file: &Path,
    play: bool,
    events: bool,
    record: Option<&Path>,
) -> anyhow::Result<()> {
    let catalog = Arc::new(config.load_catalog().context("Failed to load effect catalog")?);
    let (observer, event_rx) = ChannelObserver::new();
    let (mut engine, handle) = Engine::new(catalog, config.engine_config(), Box::new(observer))?;
    if let Some(path) = record {
        let sink = WavSink::create(path, config.engine.sample_rate)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        engine = engine.with_sink(Box::new(sink));
    }
    let engine_task = tokio::spawn(engine.run());

    let duration = handle
        .load_audio(file.to_path_buf())
        .await
        .with_context(|| format!("Failed to load {}", file.display()))?;
    tracing::info!("Loaded {} ({:.1}s)", file.display(), duration);

    if play {
        let response = handle
            .dispatch(Command::playback(PlaybackAction::Play))
            .await?;
        if !response.success {
            tracing::warn!("Autoplay failed: {:?}", response.error);
        }
    }

    let session = RemoteSession::spawn(
        tokio::io::stdin(),
        tokio::io::stdout(),
        handle.clone(),
        events.then_some(event_rx),
    );

    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted");
            cancel.cancel();
        }
    });

    let summary = session.join().await;
    tracing::info!(
        "Session closed: {} commands, {} failed",
        summary.commands,
        summary.failures
    );

    handle.shutdown().await?;
    engine_task.await?;
    Ok(())
}

async fn render(
    config: &VoxfxConfig,
    input: PathBuf,
    output: PathBuf,
    script: Option<PathBuf>,
) -> anyhow::Result<()> {
    let script = match script {
        Some(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            render::parse_script(&text)?
        }
        None => Vec::new(),
    };

    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || {
        render::render_file(&config, &input, &output, script)
    })
    .await??;

    tracing::info!(
        "Rendered {:.2}s ({} commands applied, {} rejected)",
        report.seconds,
        report.commands_applied,
        report.commands_failed
    );
    Ok(())
}
