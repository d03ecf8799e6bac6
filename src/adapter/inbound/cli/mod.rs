//! CLI module graph and dispatch.

pub mod assets;
pub mod command;
pub mod history;
pub mod migrate;
pub mod output;
pub mod run;
pub mod sync;

use command::Commands;

use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Execute a parsed subcommand against a loaded configuration.
pub async fn execute(command: &Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run => run::execute(config).await,
        Commands::Sync(args) => sync::execute(args, config).await,
        Commands::Assets(args) => assets::execute(args, config).await,
        Commands::History(args) => history::execute(args, config).await,
        Commands::Migrate => migrate::execute(config),
    }
}
