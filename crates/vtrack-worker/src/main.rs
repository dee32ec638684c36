//! Job runner binary: a single worker processing one analyze-video job at a
//! time, pulled from the shared job queue (§4.8, §5).

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtrack_worker::{JobRunner, Services, WorkerConfig};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vtrack=info".parse().unwrap()))
        .init();

    info!("starting vtrack-worker");

    let config = WorkerConfig::from_env();
    let services = match Services::from_env(config).await {
        Ok(services) => services,
        Err(e) => {
            error!(error = %e, "failed to initialize services");
            std::process::exit(1);
        }
    };

    let runner = JobRunner::new(services);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = runner.run(shutdown_rx).await {
        error!(error = %e, "job runner exited with error");
        std::process::exit(1);
    }

    signal_task.abort();
    info!("vtrack-worker shutdown complete");
}
