//! Handler for the `migrate` command.

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

pub fn execute(config: &Config) -> Result<()> {
    bootstrap::open_store(config)?;
    output::success(&format!("Database {} is up to date", config.database));
    Ok(())
}
