use clap::Parser;
use tracing::{error, info};

use marketsync::adapter::inbound::cli::command::Cli;
use marketsync::adapter::inbound::cli::{self, output};
use marketsync::infrastructure::config::settings::Config;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            output::error(&format!("Failed to load config: {e}"));
            std::process::exit(1);
        }
    };

    config.logging.init();
    info!(command = ?cli.command, "marketsync starting");

    if let Err(e) = cli::execute(&cli.command, &config).await {
        error!(error = %e, "Command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
