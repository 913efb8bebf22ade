pub mod achievement;
pub mod appinfo;
pub mod bytes;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod keyvalue;
pub mod native;
pub mod schema;
pub mod session;

pub use achievement::{Achievement, AchievementSource, Snapshot, snapshot};
pub use appinfo::{AppType, GameInfo, read_games};
pub use config::{Config, FixedInstallPath, InstallLocator, SteamInstall};
pub use error::{Error, InitFailure, Result};
pub use interfaces::{
    AccountType, AchievementState, CallHandle, SteamApps001, SteamApps008, SteamClient018,
    SteamUser012, SteamUserStats013, SteamUtils005,
};
pub use keyvalue::{KeyValue, KvType, KvValue, StringTableBuilder};
pub use native::{NativeLibrary, SteamClientLibrary};
pub use schema::{AchievementDefinition, load_achievement_definitions};
pub use session::{
    AppDataChanged, Callback, CallbackPump, Client, GlobalPercentagesReady, ListenerId,
    SessionState, UserItemsReceived, UserStatsReceived, UserStatsStored,
};
