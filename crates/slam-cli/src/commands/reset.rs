//! Reset command.

use anyhow::{Result, bail};
use slam_core::{Config, SteamClientLibrary};

use crate::cli_utils;

/// Reset every stat of the app, and its achievements too when asked.
pub fn run(config: &Config, app_id: u32, achievements: bool) -> Result<()> {
    let mut library = SteamClientLibrary::new(config.locator());
    let client = cli_utils::open_session(&mut library, app_id)?;
    cli_utils::wait_for_stats(&client, config)?;

    if !client.user_stats()?.reset_all_stats(achievements) {
        bail!("Steam refused to reset the stats of app {}", app_id);
    }
    cli_utils::store_stats(&client, config)?;

    if achievements {
        println!("Reset all stats and achievements of app {}", app_id);
    } else {
        println!("Reset all stats of app {}", app_id);
    }
    Ok(())
}
