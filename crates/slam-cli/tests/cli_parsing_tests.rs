//! CLI argument parsing tests.
//!
//! These tests verify that command-line arguments are parsed correctly
//! without actually executing the commands (which would require Steam).

use std::path::PathBuf;

use clap::Parser;

// Re-create Args structure for testing since it's not publicly exported
#[derive(Parser)]
#[command(name = "slam")]
struct Args {
    #[arg(short, long, default_value = "slam.toml")]
    config: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    Games {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        all: bool,
    },
    Achievements {
        app_id: u32,
        #[arg(long)]
        json: bool,
    },
    Unlock {
        app_id: u32,
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    Lock {
        app_id: u32,
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    Stat {
        app_id: u32,
        name: String,
        #[arg(long)]
        float: bool,
        #[arg(long, allow_hyphen_values = true)]
        set: Option<String>,
    },
    Reset {
        app_id: u32,
        #[arg(long)]
        achievements: bool,
    },
    Schema {
        app_id: u32,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[test]
fn test_parse_no_args_fails() {
    assert!(Args::try_parse_from(["slam"]).is_err());
}

#[test]
fn test_parse_games_defaults() {
    let args = Args::try_parse_from(["slam", "games"]).unwrap();
    assert_eq!(args.config, PathBuf::from("slam.toml"));
    assert!(!args.verbose);
    match args.command {
        Command::Games { json, all } => {
            assert!(!json);
            assert!(!all);
        }
        _ => panic!("Expected Games command"),
    }
}

#[test]
fn test_parse_global_flags() {
    let args = Args::try_parse_from(["slam", "-v", "--config", "other.toml", "games", "--all"]).unwrap();
    assert!(args.verbose);
    assert_eq!(args.config, PathBuf::from("other.toml"));
    assert!(matches!(args.command, Command::Games { all: true, .. }));
}

#[test]
fn test_parse_achievements_with_json() {
    let args = Args::try_parse_from(["slam", "achievements", "480", "--json"]).unwrap();
    match args.command {
        Command::Achievements { app_id, json } => {
            assert_eq!(app_id, 480);
            assert!(json);
        }
        _ => panic!("Expected Achievements command"),
    }
}

#[test]
fn test_parse_unlock_many() {
    let args =
        Args::try_parse_from(["slam", "unlock", "480", "ACH_WIN_ONE_GAME", "ACH_TRAVEL_FAR_ACCUM"])
            .unwrap();
    match args.command {
        Command::Unlock {
            app_id,
            names,
            force,
        } => {
            assert_eq!(app_id, 480);
            assert_eq!(names, vec!["ACH_WIN_ONE_GAME", "ACH_TRAVEL_FAR_ACCUM"]);
            assert!(!force);
        }
        _ => panic!("Expected Unlock command"),
    }
}

#[test]
fn test_parse_lock_with_force() {
    let args = Args::try_parse_from(["slam", "lock", "480", "ACH_WIN_ONE_GAME", "--force"]).unwrap();
    match args.command {
        Command::Lock { names, force, .. } => {
            assert_eq!(names.len(), 1);
            assert!(force);
        }
        _ => panic!("Expected Lock command"),
    }
}

#[test]
fn test_unlock_requires_names() {
    assert!(Args::try_parse_from(["slam", "unlock", "480"]).is_err());
}

#[test]
fn test_parse_stat_read() {
    let args = Args::try_parse_from(["slam", "stat", "480", "NumGames"]).unwrap();
    match args.command {
        Command::Stat {
            name, float, set, ..
        } => {
            assert_eq!(name, "NumGames");
            assert!(!float);
            assert!(set.is_none());
        }
        _ => panic!("Expected Stat command"),
    }
}

#[test]
fn test_parse_stat_negative_float() {
    let args =
        Args::try_parse_from(["slam", "stat", "480", "FeetTraveled", "--float", "--set", "-2.5"])
            .unwrap();
    match args.command {
        Command::Stat { float, set, .. } => {
            assert!(float);
            assert_eq!(set.as_deref(), Some("-2.5"));
        }
        _ => panic!("Expected Stat command"),
    }
}

#[test]
fn test_parse_reset() {
    let args = Args::try_parse_from(["slam", "reset", "480", "--achievements"]).unwrap();
    assert!(matches!(
        args.command,
        Command::Reset {
            app_id: 480,
            achievements: true
        }
    ));
}

#[test]
fn test_parse_schema_language() {
    let args = Args::try_parse_from(["slam", "schema", "480", "--language", "german"]).unwrap();
    match args.command {
        Command::Schema {
            language, json, ..
        } => {
            assert_eq!(language.as_deref(), Some("german"));
            assert!(!json);
        }
        _ => panic!("Expected Schema command"),
    }
}

#[test]
fn test_invalid_app_id_fails() {
    assert!(Args::try_parse_from(["slam", "achievements", "spacewar"]).is_err());
}

#[test]
fn test_invalid_command_fails() {
    assert!(Args::try_parse_from(["slam", "invalid-command"]).is_err());
}
