//! Binary entrypoint for the frame server.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use photo_frame_server::config::Configuration;
use photo_frame_server::pipeline::FramePipeline;
use photo_frame_server::web;

#[derive(Debug, Parser)]
#[command(
    name = "photo-frame-server",
    version,
    about = "Serves a rotating picture frame over HTTP"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory that contains html and will be served
    #[arg(long, value_name = "DIR")]
    html_dir: Option<PathBuf>,

    /// Directory that contains media files
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,

    /// Address that the server will listen at
    #[arg(long, value_name = "ADDR")]
    addr: Option<SocketAddr>,

    /// Deterministic rotation shuffle seed
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("photo_frame_server={level}").parse()?)
        .add_directive("tower_http=info".parse()?);
    fmt().with_env_filter(filter).with_target(true).compact().init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)?,
        None => Configuration::default(),
    };
    if let Some(dir) = &cli.html_dir {
        cfg.html_dir = dir.clone();
    }
    if let Some(dir) = &cli.media_dir {
        cfg.media_dir = dir.clone();
    }
    if let Some(addr) = cli.addr {
        cfg.listen_addr = addr;
    }
    if cli.seed.is_some() {
        cfg.rotation_seed = cli.seed;
    }
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    info!(
        html_dir = %cfg.html_dir.display(),
        media_dir = %cfg.media_dir.display(),
        geocode = cfg.geocode.enabled,
        geocode_timeout = %humantime::format_duration(cfg.geocode.timeout),
        "configuration loaded"
    );

    // Scan before binding so an empty library never starts serving.
    let pipeline = Arc::new(FramePipeline::from_config(&cfg)?);

    let listener = TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    let router = web::router(pipeline, &cfg.html_dir);
    web::serve(listener, router, web::shutdown_signal()).await
}
