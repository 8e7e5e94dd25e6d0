// crates/server/src/main.rs
//! Audiocut server binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use audiocut_core::AudioConfig;
use audiocut_server::{create_app, init_metrics};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// Default port for the server.
const DEFAULT_PORT: u16 = 47893;

#[derive(Debug, Parser)]
#[command(name = "audiocut", version, about = "Audio library and ffmpeg cut job server")]
struct Cli {
    /// Root of the audio library; subfolders are collections.
    #[arg(long, env = "AUDIOCUT_LIBRARY_DIR")]
    library_dir: Option<PathBuf>,
    /// Root of produced cuts, one folder per day.
    #[arg(long, env = "AUDIOCUT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg_path: String,
    #[arg(long, env = "AUDIOCUT_HOST", default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, env = "AUDIOCUT_PORT")]
    port: Option<u16>,
    /// Skip the duration probe; progress then counts against the requested duration.
    #[arg(long, env = "AUDIOCUT_NO_PROBE")]
    no_probe: bool,
    #[arg(long, env = "AUDIOCUT_PROBE_TIMEOUT_SECS", default_value_t = 10)]
    probe_timeout_secs: u64,
    /// Percent per progress line when no output length is known.
    #[arg(long, env = "AUDIOCUT_FIXED_STEP_PERCENT", default_value_t = 10)]
    fixed_step_percent: u8,
}

impl Cli {
    fn config(&self) -> AudioConfig {
        let defaults = AudioConfig::default();
        AudioConfig {
            library_dir: self.library_dir.clone().unwrap_or(defaults.library_dir),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            ffmpeg_path: self.ffmpeg_path.clone(),
            probe_duration: !self.no_probe,
            probe_timeout_secs: self.probe_timeout_secs,
            fixed_step_percent: self.fixed_step_percent,
        }
    }

    /// `--port`/`AUDIOCUT_PORT`, then `PORT`, then the default.
    fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).init();

    let cli = Cli::parse();
    let config = cli.config();

    init_metrics();

    std::fs::create_dir_all(&config.library_dir).with_context(|| {
        format!("creating library directory {}", config.library_dir.display())
    })?;
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("creating output directory {}", config.output_dir.display())
    })?;

    tracing::info!(
        library_dir = %config.library_dir.display(),
        output_dir = %config.output_dir.display(),
        ffmpeg = %config.ffmpeg_path,
        probe = config.probe_duration,
        "starting audiocut v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app = create_app(config);

    let addr = SocketAddr::new(cli.host, cli.port());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
