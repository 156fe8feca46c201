use clap::Parser;
use scoria_config::ScoriaConfig;
use scoria_engine::Service;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tephra_icc::CancelToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "scoria",
    version,
    about = "Ground-station telemetry service: UDP ingress, shared-memory fan-out"
)]
struct Args {
    /// Path of the service TOML config
    #[arg(long, short, default_value = "data/config/scoria.toml")]
    config: PathBuf,

    /// Override the shared-memory directory from the config file
    #[arg(long)]
    shm_dir: Option<PathBuf>,

    /// Override the telemetry schema YAML path from the config file
    #[arg(long)]
    telemetry_config: Option<PathBuf>,

    /// Also feed each port's frames to an in-process forwarder
    #[arg(long, default_value_t = false)]
    forward_frames: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match ScoriaConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("scoria: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(shm_dir) = args.shm_dir {
        config.shm_dir = shm_dir;
    }
    if let Some(telemetry_config) = args.telemetry_config {
        config.telemetry_config = telemetry_config;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let schema_yaml = match std::fs::read(&config.telemetry_config) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %config.telemetry_config.display(), error = %e, "cannot read telemetry schema");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown signal received");
        signal_cancel.cancel();
    }) {
        error!(error = %e, "cannot install signal handler");
        return ExitCode::FAILURE;
    }

    let service = match Service::start(
        &config.shm_dir,
        &schema_yaml,
        cancel.clone(),
        args.forward_frames,
    ) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(shm_dir = %config.shm_dir.display(), "service running");

    while !cancel.is_cancelled() {
        std::thread::sleep(Duration::from_millis(100));
    }

    // caught INT/TERM: clean teardown is success
    service.shutdown();
    ExitCode::SUCCESS
}
