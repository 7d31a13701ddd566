mod config;
mod terminal_output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info};

use logging::{init_logger, LogFormat};
use photolens_client::description::PanelState;
use photolens_client::{render_report, run_analysis, AnalysisEvent, CaptureSession, NoCamera, PhotoClient};
use photolens_core::{PhotoError, VisionProvider};
use photolens_gateway::{start_server, GatewayState};
use photolens_providers::{LlamaProvider, MockVisionProvider};

use config::{Config, ProviderKind};
use terminal_output::{
    note_error, note_info, note_success, note_warn, render_extraction, render_key_values, stream_write,
    supports_color,
};

#[derive(Parser)]
#[command(name = "photolens")]
#[command(about = "PhotoLens: describe photos and extract structured data with a vision model")]
#[command(version)]
struct Cli {
    /// Console log format: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Vision provider backing the relay
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,
    },
    /// Analyze an image file through a running relay
    Analyze {
        /// Image to analyze
        file: PathBuf,
        /// Relay base URL
        #[arg(long)]
        server: Option<String>,
        /// Also write an HTML report here
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Query a relay's health endpoint
    Status {
        /// Relay base URL
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    init_logger(
        &config.log_level,
        LogFormat::parse(&cli.log_format),
        config.log_dir.as_deref(),
    );

    match cli.command {
        Commands::Serve { port, provider } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                provider: provider.unwrap_or(config.provider),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Analyze { file, server, html } => {
            let server = server.unwrap_or_else(|| config.local_server_url());
            analyze(&file, server, html.as_deref()).await?;
        }
        Commands::Status { server } => {
            let server = server.unwrap_or_else(|| config.local_server_url());
            status(server).await;
        }
    }

    Ok(())
}

fn build_provider(config: &Config) -> Result<Arc<dyn VisionProvider>> {
    match config.provider {
        ProviderKind::Llama => {
            let Some(api_key) = &config.llama_api_key else {
                return Err(PhotoError::ConfigError(
                    "LLAMA_API_KEY must be set to use the llama provider (or pass --provider mock)".to_string(),
                )
                .into());
            };
            let provider = LlamaProvider::new(api_key.as_str())
                .with_base_url(&config.llama_base_url)
                .with_model(&config.llama_model);
            info!(model = %provider.model(), "Using Llama provider");
            Ok(Arc::new(provider))
        }
        ProviderKind::Mock => {
            info!("Using scripted mock provider");
            Ok(Arc::new(
                MockVisionProvider::default().with_chunk_delay(Duration::from_millis(40)),
            ))
        }
    }
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        provider = ?config.provider,
        "Starting PhotoLens relay"
    );

    let provider = build_provider(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind_address, config.port))?;

    start_server(addr, GatewayState::new(provider)).await
}

async fn analyze(file: &Path, server: String, html: Option<&Path>) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mime_type = media::resolve_mime_type(file, &bytes);

    let mut session = CaptureSession::new(Box::new(NoCamera));
    let Some(ticket) = session.accept_file(mime_type, &bytes) else {
        bail!("{} is not an image ({mime_type})", file.display());
    };
    debug!(mime_type, bytes = bytes.len(), "Accepted upload");

    let client = PhotoClient::new(server);
    note_info(&format!("Analyzing {} via {}", file.display(), client.base_url()));

    let (tx, mut rx) = mpsc::channel(64);
    let driver = tokio::spawn({
        let client = client.clone();
        let ticket = ticket.clone();
        async move { run_analysis(&client, &ticket, &tx).await }
    });

    let mut stdout = std::io::stdout();
    println!();
    while let Some(event) = rx.recv().await {
        if let AnalysisEvent::DescriptionChunk { bytes, .. } = &event {
            stream_write(&mut stdout, bytes)?;
        }
        session.apply(event);
    }
    driver.await.context("analysis task panicked")?;
    println!();

    match session.description().state() {
        PanelState::Failed => note_error("Failed to analyze image. Please try again."),
        PanelState::Done if session.description().text().is_empty() => {
            note_warn("The description came back empty")
        }
        _ => {}
    }

    if let Some(view) = session.extraction().view() {
        print!("\n{}", render_extraction(view, supports_color()));
    } else if session.extraction().has_failed() {
        note_error("Failed to extract data. Please try again.");
    }

    if let Some(path) = html {
        tokio::fs::write(path, render_report(&session))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        note_success(&format!("Report written to {}", path.display()));
    }

    Ok(())
}

async fn status(server: String) {
    let client = PhotoClient::new(server);
    match client.health().await {
        Ok(health) => {
            note_success(&format!("PhotoLens relay is up at {}", client.base_url()));
            let rows: Vec<(String, String)> = health
                .as_object()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.as_str().map_or_else(|| v.to_string(), str::to_string)))
                        .collect()
                })
                .unwrap_or_default();
            print!("{}", render_key_values(&rows));
        }
        Err(e) => note_error(&format!("PhotoLens relay is not reachable at {}: {e}", client.base_url())),
    }
}
