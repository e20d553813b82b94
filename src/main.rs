//! Blob snapshot sample CLI.
//!
//! Runs the snapshot sample against the in-memory blob service. Any single
//! argument deletes the sample container first.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use blob_snapshot_sample::{
    Args, Config, MemoryBlobService, SampleError, SnapshotSample, SNAPSHOT_SEQUENCE,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Set up logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SampleError> {
    let config = Config::try_from(args)?;
    let service = MemoryBlobService::from_config(&config)
        .map_err(|e| SampleError::service("CreateService", e))?;

    info!("Using the container {}", config.container);
    let reset = config.reset_container;
    let mut sample = SnapshotSample::new(Arc::new(service), config);
    if reset {
        sample.reset().await?;
    }

    let outputs = sample.run(&SNAPSHOT_SEQUENCE).await?;
    sample.verify_outcome(&outputs)?;

    info!("Snapshot sample completed");
    Ok(())
}
