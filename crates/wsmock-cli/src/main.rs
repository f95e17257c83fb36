//! wsmock - AsyncAPI WebSocket mock server
//!
//! 1. 仕様とイベントドキュメントを読み込む
//! 2. channel ごとに WebSocket のルートを生やす
//! 3. strict モードの終了要求か Ctrl-C が来るまで待つ

mod server;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wsmock_core::domain::EventDocument;
use wsmock_core::engine::{ChainContext, CommandEngine, InvalidationClock};
use wsmock_core::events::EventIndex;
use wsmock_core::impls::SubscriberRegistry;
use wsmock_core::load::{load_events, load_specification};
use wsmock_core::ports::{SystemClock, UlidGenerator};
use wsmock_core::{Dispatcher, ExitStatus, Fatal, FatalReceiver, FatalSender, MockConfig};

#[derive(Debug, Parser)]
#[command(name = "wsmock", version, about = "Mock WebSocket server driven by an AsyncAPI document")]
struct Cli {
    /// AsyncAPI specification (YAML or JSON)
    #[arg(env = "WSMOCK_SPEC")]
    file: PathBuf,

    /// Event document binding received messages to command chains
    #[arg(short, long, env = "WSMOCK_EVENTS")]
    events: Option<PathBuf>,

    #[arg(short, long, env = "WSMOCK_PORT", default_value_t = 8080)]
    port: u16,

    #[arg(long, env = "WSMOCK_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Terminate on unmatched messages and invalid examples
    #[arg(long, env = "WSMOCK_STRICT")]
    strict: bool,

    /// Used when RUST_LOG is not set
    #[arg(long, env = "WSMOCK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> MockConfig {
        MockConfig {
            strict: self.strict,
            host: self.host.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = &cli.log_level;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("wsmock={level},wsmock_core={level}"))
        }))
        .init();

    match run(cli).await {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(fatal)) => exit_code(fatal.status),
        Err(err) => {
            error!(error = ?err, "mock server failed to start");
            exit_code(ExitStatus::Startup)
        }
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    ExitCode::from(exit_byte(status))
}

fn exit_byte(status: ExitStatus) -> u8 {
    u8::try_from(status.code()).unwrap_or(1)
}

/// Serve until a fatal signal (returned) or Ctrl-C (`None`).
async fn run(cli: Cli) -> Result<Option<Fatal>> {
    let config = cli.config();

    let document = load_specification(&cli.file)
        .with_context(|| format!("cannot load specification {}", cli.file.display()))?;
    let events = match &cli.events {
        Some(path) => read_events(path)?,
        None => EventDocument::default(),
    };

    let subscribers = Arc::new(SubscriberRegistry::new());
    let (fatal, mut fatal_rx) = FatalSender::channel();
    let ctx = ChainContext {
        document,
        broadcaster: subscribers.clone(),
        invalidation: Arc::new(InvalidationClock::new()),
        clock: Arc::new(SystemClock),
        strict: config.strict,
        fatal,
    };
    let engine = CommandEngine::new(ctx, Arc::new(UlidGenerator::new(SystemClock)));
    let dispatcher = Dispatcher::new(EventIndex::new(events), engine.clone());

    let listener = tokio::net::TcpListener::bind(config.listen_address())
        .await
        .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?;
    let app = server::router(dispatcher, subscribers)?;

    info!(host = %config.host, port = config.port, strict = config.strict, "mock server listening");

    let outcome = serve_until(fatal_rx, axum::serve(listener, app).into_future()).await;
    engine.supervisor().abort_all();
    outcome
}

/// Drive `server` until it stops, a fatal request arrives or Ctrl-C is pressed.
async fn serve_until<S>(mut fatal_rx: FatalReceiver, server: S) -> Result<Option<Fatal>>
where
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        served = server => {
            served.context("server stopped")?;
            Ok(None)
        }
        Some(fatal) = fatal_rx.recv() => Ok(Some(fatal)),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(None)
        }
    }
}

fn read_events(path: &Path) -> Result<EventDocument> {
    if !path.exists() {
        warn!(path = %path.display(), "event document not found, no events will fire");
        return Ok(EventDocument::default());
    }
    load_events(path).with_context(|| format!("cannot load events {}", path.display()))
}
