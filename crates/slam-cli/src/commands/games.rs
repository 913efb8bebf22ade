//! Games command: list apps from the local catalog.

use anyhow::Result;
use owo_colors::OwoColorize;
use slam_core::{Config, read_games};

use crate::cli_utils;

/// Run the games command
pub fn run(config: &Config, json: bool, all: bool) -> Result<()> {
    let install = cli_utils::install_path(config)?;
    let mut games = read_games(&install)?;
    if !all {
        games.retain(|game| game.has_achievements);
    }
    games.sort_by_key(|game| game.name.to_lowercase());

    if json {
        println!("{}", serde_json::to_string_pretty(&games)?);
        return Ok(());
    }

    for game in &games {
        println!(
            "{}  {}  {}",
            format!("{:>8}", game.id).bold(),
            format!("{:<4}", game.kind).dimmed(),
            game.name
        );
    }
    eprintln!("{} apps", games.len());
    Ok(())
}
