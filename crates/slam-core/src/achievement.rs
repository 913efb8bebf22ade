//! Joins schema definitions with live achievement state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interfaces::{AchievementState, SteamUserStats013};
use crate::schema::AchievementDefinition;

/// Base URL of achievement icons; `<base>/<app id>/<icon file>`.
pub const ICON_BASE_URL: &str = "https://cdn.steamstatic.com/steamcommunity/public/images/apps";

/// Permission given to every achievement of a set that contains a
/// protected one.
pub const PROTECTED_PERMISSION: i32 = 3;

/// Where live achievement state comes from.
pub trait AchievementSource {
    fn achievement_state(&self, id: &str) -> Option<AchievementState>;
    fn achieved_percent(&self, id: &str) -> Option<f32>;
}

impl AchievementSource for SteamUserStats013 {
    fn achievement_state(&self, id: &str) -> Option<AchievementState> {
        self.get_achievement_and_unlock_time(id)
    }

    fn achieved_percent(&self, id: &str) -> Option<f32> {
        self.get_achievement_achieved_percent(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub achieved: bool,
    pub unlock_time: Option<DateTime<Utc>>,
    pub global_percent: Option<f32>,
    pub icon_url: String,
    pub hidden: bool,
    pub permission: i32,
}

impl Achievement {
    pub fn is_protected(&self) -> bool {
        self.permission > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub app_id: u32,
    /// Any achievement protected means none may be changed.
    pub protected: bool,
    pub achievements: Vec<Achievement>,
}

impl Snapshot {
    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.achieved).count()
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }
}

pub fn icon_url(app_id: u32, icon: &str) -> String {
    format!("{}/{}/{}", ICON_BASE_URL, app_id, icon)
}

/// Current state of every defined achievement the client knows about.
/// Definitions the client has no state for are left out.
pub fn snapshot<S: AchievementSource + ?Sized>(
    source: &S,
    definitions: &[AchievementDefinition],
    app_id: u32,
) -> Snapshot {
    let protected = definitions.iter().any(AchievementDefinition::is_protected);

    let achievements = definitions
        .iter()
        .filter_map(|def| {
            let state = source.achievement_state(&def.id)?;
            let icon = if state.achieved {
                &def.icon_normal
            } else {
                &def.icon_locked
            };
            Some(Achievement {
                id: def.id.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                achieved: state.achieved,
                unlock_time: state.unlock_time.filter(|_| state.achieved),
                global_percent: source.achieved_percent(&def.id),
                icon_url: icon_url(app_id, icon),
                hidden: def.hidden,
                permission: if protected {
                    PROTECTED_PERMISSION
                } else {
                    def.permission
                },
            })
        })
        .collect();

    Snapshot {
        app_id,
        protected,
        achievements,
    }
}
