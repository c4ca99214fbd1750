use anyhow::{Context, Result};
use clap::Parser;
use engine::{EngineConfig, Validator};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use gateway::{router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 5000)]
    port: u16,
    /// YAML engine config (timeout, probe mode, markers, origin override)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load engine config")?;
    let validator = Validator::from_config(&config).context("Failed to build validator")?;

    info!(
        services = validator.registry().len(),
        timeout_secs = config.timeout_secs,
        mode = ?config.mode,
        "🗺️  Map key gateway v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(origin) = &config.origin_override {
        info!(origin = %origin, "All probes redirected to origin override");
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Gateway listening on {}", addr);
    axum::serve(listener, router(AppState::new(validator)))
        .await
        .context("Server error")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "engine=info,gateway=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
