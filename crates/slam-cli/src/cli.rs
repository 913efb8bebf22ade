//! CLI argument definitions for slam.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slam")]
#[command(about = "Steam achievement manager", version)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "slam.toml", env = "SLAM_CONFIG")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List apps from the local app catalog
    Games {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Include apps without achievements
        #[arg(long)]
        all: bool,
    },
    /// Show achievements and their state for an app
    Achievements {
        /// App id
        app_id: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Unlock achievements
    Unlock {
        /// App id
        app_id: u32,
        /// Achievement ids
        #[arg(required = true)]
        names: Vec<String>,
        /// Change achievements even when the app protects them
        #[arg(long)]
        force: bool,
    },
    /// Lock (clear) achievements
    Lock {
        /// App id
        app_id: u32,
        /// Achievement ids
        #[arg(required = true)]
        names: Vec<String>,
        /// Change achievements even when the app protects them
        #[arg(long)]
        force: bool,
    },
    /// Read or write a stat
    Stat {
        /// App id
        app_id: u32,
        /// Stat name
        name: String,
        /// Treat the stat as a float instead of an integer
        #[arg(long)]
        float: bool,
        /// New value to store
        #[arg(long, allow_hyphen_values = true)]
        set: Option<String>,
    },
    /// Reset all stats of an app
    Reset {
        /// App id
        app_id: u32,
        /// Also lock every achievement
        #[arg(long)]
        achievements: bool,
    },
    /// Dump achievement definitions from the cached schema
    Schema {
        /// App id
        app_id: u32,
        /// Language of names and descriptions
        #[arg(long)]
        language: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
