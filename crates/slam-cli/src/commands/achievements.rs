//! Achievements command: show every achievement of an app with its state.

use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;
use slam_core::{Config, Snapshot, SteamClientLibrary, snapshot};

use crate::cli_utils;

/// Run the achievements command
pub fn run(config: &Config, app_id: u32, json: bool) -> Result<()> {
    let mut library = SteamClientLibrary::new(config.locator());
    let client = cli_utils::open_session(&mut library, app_id)?;
    cli_utils::wait_for_stats(&client, config)?;
    cli_utils::wait_for_global_percentages(&client, config)?;

    let language = cli_utils::language(config, &client);
    let definitions = cli_utils::load_definitions(&client, &language)?;
    let snap = snapshot(client.user_stats()?, &definitions, app_id);

    if json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        print_snapshot(&snap);
    }
    Ok(())
}

fn print_snapshot(snap: &Snapshot) {
    println!(
        "App {}: {}/{} achievements unlocked",
        snap.app_id.bold(),
        snap.unlocked_count(),
        snap.achievements.len()
    );
    if snap.protected {
        println!(
            "{}",
            "Achievements of this app are protected and can only be changed by the game.".yellow()
        );
    }
    println!();

    for achievement in &snap.achievements {
        let mark = if achievement.achieved {
            format!("{}", "[x]".green())
        } else {
            format!("{}", "[ ]".dimmed())
        };
        let percent = achievement
            .global_percent
            .map(|p| format!(" {:.1}%", p))
            .unwrap_or_default();
        let hidden = if achievement.hidden { " (hidden)" } else { "" };

        println!(
            "{} {}{}{}",
            mark,
            achievement.id.bold(),
            hidden.dimmed(),
            percent.cyan()
        );
        println!("    {}", achievement.name);
        if !achievement.description.is_empty() {
            println!("    {}", achievement.description.dimmed());
        }
        if let Some(time) = achievement.unlock_time {
            println!(
                "    unlocked {}",
                time.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
    }
}
