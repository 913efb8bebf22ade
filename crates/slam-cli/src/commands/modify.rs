//! Unlock and lock commands.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use slam_core::{AchievementDefinition, Config, SteamClientLibrary};
use tracing::warn;

use crate::cli_utils;

/// Set (`achieved`) or clear every named achievement, then store.
pub fn run(config: &Config, app_id: u32, names: &[String], achieved: bool, force: bool) -> Result<()> {
    let mut library = SteamClientLibrary::new(config.locator());
    let client = cli_utils::open_session(&mut library, app_id)?;
    cli_utils::wait_for_stats(&client, config)?;

    let language = cli_utils::language(config, &client);
    let definitions = cli_utils::load_definitions(&client, &language)?;
    if definitions.iter().any(AchievementDefinition::is_protected) && !force {
        bail!(
            "Achievements of app {} are protected and can only be changed by the game; \
             use --force to try anyway",
            app_id
        );
    }

    let stats = client.user_stats()?;
    let verb = if achieved { "unlocked" } else { "locked" };
    let mut changed = 0;
    let mut failed = Vec::new();
    for name in names {
        if !definitions.is_empty() && !definitions.iter().any(|d| &d.id == name) {
            warn!("{} is not in the schema of app {}", name, app_id);
        }
        if stats.set_achievement_state(name, achieved) {
            println!("{} {}", "✓".green(), name);
            changed += 1;
        } else {
            println!("{} {}", "✗".red(), name);
            failed.push(name.as_str());
        }
    }

    if changed > 0 {
        cli_utils::store_stats(&client, config)?;
        println!("{} {} achievement(s)", verb, changed);
    }
    if !failed.is_empty() {
        bail!("Could not change: {}", failed.join(", "));
    }
    Ok(())
}
