mod cli;
mod cli_utils;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use slam_core::Config;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_filter = if args.verbose {
        "slam_cli=debug,slam_core=debug"
    } else {
        "slam_cli=info,slam_core=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(&args.config)?;

    match args.command {
        Command::Games { json, all } => commands::games::run(&config, json, all),
        Command::Achievements { app_id, json } => commands::achievements::run(&config, app_id, json),
        Command::Unlock {
            app_id,
            names,
            force,
        } => commands::modify::run(&config, app_id, &names, true, force),
        Command::Lock {
            app_id,
            names,
            force,
        } => commands::modify::run(&config, app_id, &names, false, force),
        Command::Stat {
            app_id,
            name,
            float,
            set,
        } => commands::stat::run(&config, app_id, &name, float, set.as_deref()),
        Command::Reset {
            app_id,
            achievements,
        } => commands::reset::run(&config, app_id, achievements),
        Command::Schema {
            app_id,
            language,
            json,
        } => commands::schema::run(&config, app_id, language.as_deref(), json),
    }
}
