pub mod analysis;
pub mod camera;
pub mod cli;
pub mod config;
pub mod controls;
pub mod dashboard;
pub mod device;
pub mod error;
pub mod logging;
pub mod notification;
pub mod poller;
pub mod storage;
pub mod theme;
pub mod workflow;
pub use error::{AppError, AppResult};

/// Entrypoint used by the binary and other front ends.
pub async fn run(cli: cli::Cli) -> AppResult<()> {
    logging::init(cli.verbose);
    tracing::info!("starting SmartFarm");
    cli::execute(cli).await
}
