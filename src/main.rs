use clap::Parser;
use tracing::info;

use configsync_core::config::{Cli, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    configsync_core::util::init_logging();

    let config = ServiceConfig::from_cli(Cli::parse())?;

    info!(
        "Starting configsync on {} (repo {}, branch {})",
        config.listen,
        config.git_path.display(),
        config.branch
    );

    configsync_core::server::run_server(config).await
}
