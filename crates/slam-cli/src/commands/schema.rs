//! Schema command: dump definitions without a Steam session.

use anyhow::Result;
use owo_colors::OwoColorize;
use slam_core::schema::DEFAULT_LANGUAGE;
use slam_core::{Config, load_achievement_definitions};

use crate::cli_utils;

/// Run the schema command
pub fn run(config: &Config, app_id: u32, language: Option<&str>, json: bool) -> Result<()> {
    let install = cli_utils::install_path(config)?;
    let language = language
        .or(config.language.as_deref())
        .unwrap_or(DEFAULT_LANGUAGE);
    let definitions = load_achievement_definitions(&install, app_id, language)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    for def in &definitions {
        let flags = match (def.hidden, def.is_protected()) {
            (true, true) => " [hidden, protected]",
            (true, false) => " [hidden]",
            (false, true) => " [protected]",
            (false, false) => "",
        };
        println!("{}{}", def.id.bold(), flags.yellow());
        println!("    {}", def.name);
        if !def.description.is_empty() {
            println!("    {}", def.description.dimmed());
        }
    }
    eprintln!("{} achievements", definitions.len());
    Ok(())
}
