//! Per-app achievement schema reader.
//!
//! The client caches each app's stats schema as a binary KeyValue file under
//! `appcache/stats`. Only achievement definitions are extracted.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::{Display, FromRepr};
use tracing::debug;

use crate::config::paths;
use crate::error::{Error, Result};
use crate::keyvalue::KeyValue;

/// Fallback language of localized schema strings.
pub const DEFAULT_LANGUAGE: &str = "english";

/// `type` of a stat entry in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(i32)]
pub enum UserStatType {
    Invalid = 0,
    Integer = 1,
    Float = 2,
    AverageRate = 3,
    Achievements = 4,
    GroupAchievements = 5,
}

impl UserStatType {
    pub fn holds_achievements(&self) -> bool {
        matches!(self, Self::Achievements | Self::GroupAchievements)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon_normal: String,
    pub icon_locked: String,
    pub permission: i32,
    pub hidden: bool,
}

impl AchievementDefinition {
    /// Protected achievements can only be changed by the game's servers.
    pub fn is_protected(&self) -> bool {
        self.permission > 0
    }
}

pub fn schema_path(install: &Path, app_id: u32) -> PathBuf {
    let mut path = install.to_path_buf();
    path.extend(paths::STATS_DIR);
    path.join(format!("UserGameStatsSchema_{}.bin", app_id))
}

/// Read the achievement definitions of `app_id` from the cached schema.
pub fn load_achievement_definitions(
    install: &Path,
    app_id: u32,
    language: &str,
) -> Result<Vec<AchievementDefinition>> {
    let kv = KeyValue::load_binary(schema_path(install, app_id))?;
    parse_achievement_definitions(&kv, app_id, language)
}

/// Extract achievement definitions from a decoded schema tree.
pub fn parse_achievement_definitions(
    kv: &KeyValue,
    app_id: u32,
    language: &str,
) -> Result<Vec<AchievementDefinition>> {
    let stats = &kv[app_id.to_string().as_str()]["stats"];
    if !stats.is_valid() {
        return Err(Error::MissingSchemaStats(app_id));
    }

    let mut definitions = Vec::new();
    for stat in stats.children() {
        let kind = UserStatType::from_repr(stat["type"].as_integer(0)).unwrap_or(UserStatType::Invalid);
        if !kind.holds_achievements() {
            continue;
        }

        let groups = stat
            .children()
            .iter()
            .filter(|child| child.name().eq_ignore_ascii_case("bits"));
        for bit in groups.flat_map(|bits| bits.children()) {
            let id = bit["name"].as_string("");
            let display = &bit["display"];
            definitions.push(AchievementDefinition {
                name: localized(&display["name"], language, &id),
                description: localized(&display["desc"], language, ""),
                icon_normal: display["icon"].as_string(""),
                icon_locked: display["icon_gray"].as_string(""),
                permission: bit["permission"].as_integer(0),
                hidden: display["hidden"].as_integer(0) == 1,
                id,
            });
        }
    }

    debug!("Schema for app {} defines {} achievements", app_id, definitions.len());
    Ok(definitions)
}

/// A localized string node: `language`, then English, then the node's own
/// value, then `default`.
fn localized(kv: &KeyValue, language: &str, default: &str) -> String {
    let value = kv[language].as_string("");
    if !value.is_empty() {
        return value;
    }
    if language != DEFAULT_LANGUAGE {
        let value = kv[DEFAULT_LANGUAGE].as_string("");
        if !value.is_empty() {
            return value;
        }
    }
    kv.as_string(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyvalue::KvValue;

    fn text(name: &str, value: &str) -> KeyValue {
        KeyValue::leaf(name, KvValue::String(value.to_string()))
    }

    fn schema() -> KeyValue {
        let bit = KeyValue::node("0")
            .with_child(text("name", "ACH_WIN"))
            .with_child(KeyValue::leaf("permission", KvValue::Int32(0)))
            .with_child(
                KeyValue::node("display")
                    .with_child(
                        KeyValue::node("name")
                            .with_child(text("english", "Winner"))
                            .with_child(text("german", "Gewinner")),
                    )
                    .with_child(KeyValue::node("desc").with_child(text("english", "Win a game")))
                    .with_child(text("icon", "win.jpg"))
                    .with_child(text("icon_gray", "win_gray.jpg"))
                    .with_child(KeyValue::leaf("hidden", KvValue::Int32(1))),
            );
        let achievements = KeyValue::node("1")
            .with_child(KeyValue::leaf("type", KvValue::Int32(4)))
            .with_child(KeyValue::node("bits").with_child(bit));
        let plain = KeyValue::node("2")
            .with_child(KeyValue::leaf("type", KvValue::Int32(1)))
            .with_child(text("name", "NumGames"));

        KeyValue::root().with_child(
            KeyValue::node("480").with_child(
                KeyValue::node("stats")
                    .with_child(achievements)
                    .with_child(plain),
            ),
        )
    }

    #[test]
    fn test_parse_definitions() {
        let defs = parse_achievement_definitions(&schema(), 480, "english").unwrap();
        assert_eq!(defs.len(), 1);
        let def = &defs[0];
        assert_eq!(def.id, "ACH_WIN");
        assert_eq!(def.name, "Winner");
        assert_eq!(def.description, "Win a game");
        assert_eq!(def.icon_locked, "win_gray.jpg");
        assert!(def.hidden);
        assert!(!def.is_protected());
    }

    #[test]
    fn test_localization_falls_back_to_english() {
        let defs = parse_achievement_definitions(&schema(), 480, "german").unwrap();
        assert_eq!(defs[0].name, "Gewinner");
        assert_eq!(defs[0].description, "Win a game");

        let defs = parse_achievement_definitions(&schema(), 480, "french").unwrap();
        assert_eq!(defs[0].name, "Winner");
    }

    #[test]
    fn test_missing_stats_section() {
        let result = parse_achievement_definitions(&schema(), 440, "english");
        assert!(matches!(result, Err(Error::MissingSchemaStats(440))));
    }

    #[test]
    fn test_schema_path() {
        let path = schema_path(Path::new("steam"), 480);
        assert!(path.ends_with("appcache/stats/UserGameStatsSchema_480.bin"));
    }

    #[test]
    fn test_stat_type_from_repr() {
        assert_eq!(UserStatType::from_repr(5), Some(UserStatType::GroupAchievements));
        assert!(UserStatType::from_repr(4).unwrap().holds_achievements());
        assert!(!UserStatType::Float.holds_achievements());
    }
}
