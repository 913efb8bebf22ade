//! Stat command: read or write one stat.

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use slam_core::{Config, SteamClientLibrary};

use crate::cli_utils;

/// Run the stat command
pub fn run(config: &Config, app_id: u32, name: &str, float: bool, set: Option<&str>) -> Result<()> {
    let mut library = SteamClientLibrary::new(config.locator());
    let client = cli_utils::open_session(&mut library, app_id)?;
    cli_utils::wait_for_stats(&client, config)?;
    let stats = client.user_stats()?;

    let current = if float {
        stats.get_stat_f32(name).map(|v| v.to_string())
    } else {
        stats.get_stat_i32(name).map(|v| v.to_string())
    };
    let Some(current) = current else {
        bail!("Stat {} not found for app {}", name, app_id);
    };

    let Some(value) = set else {
        println!("{} = {}", name.bold(), current);
        return Ok(());
    };

    let accepted = if float {
        let value: f32 = value
            .parse()
            .with_context(|| format!("{} is not a float", value))?;
        stats.set_stat_f32(name, value)
    } else {
        let value: i32 = value
            .parse()
            .with_context(|| format!("{} is not an integer", value))?;
        stats.set_stat_i32(name, value)
    };
    if !accepted {
        bail!("Steam rejected {} for stat {}", value, name);
    }

    cli_utils::store_stats(&client, config)?;
    println!("{} = {} (was {})", name.bold(), value.green(), current);
    Ok(())
}
