use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interfaces::{CallHandle, native_interface};
use crate::native::strings::{from_native, to_native};

/// Virtual table layout of `STEAMUSERSTATS_INTERFACE_VERSION013`.
///
/// The vendor compiler groups overloads in reverse declaration order, which
/// is why the float `GetStat`/`SetStat` come before the integer ones.
pub mod slots {
    use std::ffi::c_char;

    use crate::native::vtable::{Slot, member_fn};

    pub type RequestCurrentStatsFn = member_fn!(fn() -> u8);
    pub type GetStatFloatFn = member_fn!(fn(*const c_char, *mut f32) -> u8);
    pub type GetStatIntFn = member_fn!(fn(*const c_char, *mut i32) -> u8);
    pub type SetStatFloatFn = member_fn!(fn(*const c_char, f32) -> u8);
    pub type SetStatIntFn = member_fn!(fn(*const c_char, i32) -> u8);
    pub type GetAchievementFn = member_fn!(fn(*const c_char, *mut u8) -> u8);
    pub type NamedActionFn = member_fn!(fn(*const c_char) -> u8);
    pub type GetAchievementAndUnlockTimeFn =
        member_fn!(fn(*const c_char, *mut u8, *mut u32) -> u8);
    pub type StoreStatsFn = member_fn!(fn() -> u8);
    pub type GetAchievementIconFn = member_fn!(fn(*const c_char) -> i32);
    pub type GetAchievementDisplayAttributeFn =
        member_fn!(fn(*const c_char, *const c_char) -> *const c_char);
    pub type GetNumAchievementsFn = member_fn!(fn() -> u32);
    pub type GetAchievementNameFn = member_fn!(fn(u32) -> *const c_char);
    pub type RequestUserStatsFn = member_fn!(fn(u64) -> u64);
    pub type ResetAllStatsFn = member_fn!(fn(u8) -> u8);
    pub type RequestGlobalAchievementPercentagesFn = member_fn!(fn() -> u64);
    pub type GetAchievementAchievedPercentFn = member_fn!(fn(*const c_char, *mut f32) -> u8);

    pub const REQUEST_CURRENT_STATS: Slot<RequestCurrentStatsFn> =
        Slot::new(0, "RequestCurrentStats");
    pub const GET_STAT_FLOAT: Slot<GetStatFloatFn> = Slot::new(1, "GetStat(float)");
    pub const GET_STAT_INT: Slot<GetStatIntFn> = Slot::new(2, "GetStat(int32)");
    pub const SET_STAT_FLOAT: Slot<SetStatFloatFn> = Slot::new(3, "SetStat(float)");
    pub const SET_STAT_INT: Slot<SetStatIntFn> = Slot::new(4, "SetStat(int32)");
    pub const GET_ACHIEVEMENT: Slot<GetAchievementFn> = Slot::new(6, "GetAchievement");
    pub const SET_ACHIEVEMENT: Slot<NamedActionFn> = Slot::new(7, "SetAchievement");
    pub const CLEAR_ACHIEVEMENT: Slot<NamedActionFn> = Slot::new(8, "ClearAchievement");
    pub const GET_ACHIEVEMENT_AND_UNLOCK_TIME: Slot<GetAchievementAndUnlockTimeFn> =
        Slot::new(9, "GetAchievementAndUnlockTime");
    pub const STORE_STATS: Slot<StoreStatsFn> = Slot::new(10, "StoreStats");
    pub const GET_ACHIEVEMENT_ICON: Slot<GetAchievementIconFn> =
        Slot::new(11, "GetAchievementIcon");
    pub const GET_ACHIEVEMENT_DISPLAY_ATTRIBUTE: Slot<GetAchievementDisplayAttributeFn> =
        Slot::new(12, "GetAchievementDisplayAttribute");
    pub const GET_NUM_ACHIEVEMENTS: Slot<GetNumAchievementsFn> =
        Slot::new(14, "GetNumAchievements");
    pub const GET_ACHIEVEMENT_NAME: Slot<GetAchievementNameFn> =
        Slot::new(15, "GetAchievementName");
    pub const REQUEST_USER_STATS: Slot<RequestUserStatsFn> = Slot::new(16, "RequestUserStats");
    pub const RESET_ALL_STATS: Slot<ResetAllStatsFn> = Slot::new(21, "ResetAllStats");
    pub const REQUEST_GLOBAL_ACHIEVEMENT_PERCENTAGES: Slot<RequestGlobalAchievementPercentagesFn> =
        Slot::new(34, "RequestGlobalAchievementPercentages");
    pub const GET_ACHIEVEMENT_ACHIEVED_PERCENT: Slot<GetAchievementAchievedPercentFn> =
        Slot::new(37, "GetAchievementAchievedPercent");

    pub const COUNT: usize = 38;
}

/// Achievement flag plus the time it was unlocked, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementState {
    pub achieved: bool,
    pub unlock_time: Option<DateTime<Utc>>,
}

impl AchievementState {
    fn from_native(achieved: u8, unlock_time: u32) -> Self {
        Self {
            achieved: achieved != 0,
            unlock_time: match unlock_time {
                0 => None,
                secs => DateTime::from_timestamp(i64::from(secs), 0),
            },
        }
    }
}

native_interface!(
    /// Stats and achievements of the current app for the attached user.
    SteamUserStats013,
    "STEAMUSERSTATS_INTERFACE_VERSION013"
);

impl SteamUserStats013 {
    /// Ask the client to (re)send the local user's stats. The reply arrives
    /// as a `UserStatsReceived` callback.
    pub fn request_current_stats(&self) -> bool {
        let f = self.vtable.function(&slots::REQUEST_CURRENT_STATS);
        // SAFETY: slot signature per the UserStats013 layout.
        unsafe { f(self.vtable.object()) != 0 }
    }

    pub fn get_stat_i32(&self, name: &str) -> Option<i32> {
        let name = to_native(name)?;
        let mut value = 0i32;
        let f = self.vtable.function(&slots::GET_STAT_INT);
        // SAFETY: as above; `name` and `value` outlive the call.
        let ok = unsafe { f(self.vtable.object(), name.as_ptr(), &mut value) };
        (ok != 0).then_some(value)
    }

    pub fn get_stat_f32(&self, name: &str) -> Option<f32> {
        let name = to_native(name)?;
        let mut value = 0f32;
        let f = self.vtable.function(&slots::GET_STAT_FLOAT);
        // SAFETY: as above.
        let ok = unsafe { f(self.vtable.object(), name.as_ptr(), &mut value) };
        (ok != 0).then_some(value)
    }

    pub fn set_stat_i32(&self, name: &str, value: i32) -> bool {
        let Some(name) = to_native(name) else {
            return false;
        };
        let f = self.vtable.function(&slots::SET_STAT_INT);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), name.as_ptr(), value) != 0 }
    }

    pub fn set_stat_f32(&self, name: &str, value: f32) -> bool {
        let Some(name) = to_native(name) else {
            return false;
        };
        let f = self.vtable.function(&slots::SET_STAT_FLOAT);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), name.as_ptr(), value) != 0 }
    }

    /// Whether the achievement is unlocked; `None` when it does not exist or
    /// stats have not been received yet.
    pub fn get_achievement(&self, name: &str) -> Option<bool> {
        let name = to_native(name)?;
        let mut achieved = 0u8;
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT);
        // SAFETY: as above.
        let ok = unsafe { f(self.vtable.object(), name.as_ptr(), &mut achieved) };
        (ok != 0).then_some(achieved != 0)
    }

    pub fn set_achievement(&self, name: &str) -> bool {
        self.named_action(&slots::SET_ACHIEVEMENT, name)
    }

    pub fn clear_achievement(&self, name: &str) -> bool {
        self.named_action(&slots::CLEAR_ACHIEVEMENT, name)
    }

    /// Unlock or lock, depending on `achieved`. Takes effect on `store_stats`.
    pub fn set_achievement_state(&self, name: &str, achieved: bool) -> bool {
        if achieved {
            self.set_achievement(name)
        } else {
            self.clear_achievement(name)
        }
    }

    pub fn get_achievement_and_unlock_time(&self, name: &str) -> Option<AchievementState> {
        let name = to_native(name)?;
        let mut achieved = 0u8;
        let mut unlock_time = 0u32;
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT_AND_UNLOCK_TIME);
        // SAFETY: as above; both out-slots are valid for the call.
        let ok = unsafe {
            f(
                self.vtable.object(),
                name.as_ptr(),
                &mut achieved,
                &mut unlock_time,
            )
        };
        (ok != 0).then(|| AchievementState::from_native(achieved, unlock_time))
    }

    /// Commit pending stat and achievement writes.
    pub fn store_stats(&self) -> bool {
        let f = self.vtable.function(&slots::STORE_STATS);
        // SAFETY: as above.
        unsafe { f(self.vtable.object()) != 0 }
    }

    /// Image handle of the achievement's current icon. 0 means none yet.
    pub fn get_achievement_icon(&self, name: &str) -> i32 {
        let Some(name) = to_native(name) else {
            return 0;
        };
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT_ICON);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), name.as_ptr()) }
    }

    /// A display attribute such as `"name"`, `"desc"` or `"hidden"`.
    pub fn get_achievement_display_attribute(&self, name: &str, key: &str) -> Option<String> {
        let name = to_native(name)?;
        let key = to_native(key)?;
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT_DISPLAY_ATTRIBUTE);
        // SAFETY: as above; the returned string is owned by the client and
        // copied before the next call.
        unsafe {
            let value = f(self.vtable.object(), name.as_ptr(), key.as_ptr());
            from_native(value)
        }
    }

    pub fn get_num_achievements(&self) -> u32 {
        let f = self.vtable.function(&slots::GET_NUM_ACHIEVEMENTS);
        // SAFETY: as above.
        unsafe { f(self.vtable.object()) }
    }

    pub fn get_achievement_name(&self, index: u32) -> Option<String> {
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT_NAME);
        // SAFETY: as above.
        unsafe { from_native(f(self.vtable.object(), index)) }
    }

    /// Names of all achievements known for the current app.
    pub fn achievement_names(&self) -> Vec<String> {
        (0..self.get_num_achievements())
            .filter_map(|index| self.get_achievement_name(index))
            .collect()
    }

    /// Request another user's stats. The reply arrives as a
    /// `UserStatsReceived` callback carrying the returned handle's result.
    pub fn request_user_stats(&self, steam_id: u64) -> CallHandle {
        let f = self.vtable.function(&slots::REQUEST_USER_STATS);
        // SAFETY: as above.
        CallHandle(unsafe { f(self.vtable.object(), steam_id) })
    }

    /// Reset every stat, and the achievements too when asked.
    pub fn reset_all_stats(&self, achievements_too: bool) -> bool {
        let f = self.vtable.function(&slots::RESET_ALL_STATS);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), u8::from(achievements_too)) != 0 }
    }

    pub fn request_global_achievement_percentages(&self) -> CallHandle {
        let f = self.vtable.function(&slots::REQUEST_GLOBAL_ACHIEVEMENT_PERCENTAGES);
        // SAFETY: as above.
        CallHandle(unsafe { f(self.vtable.object()) })
    }

    /// Share of all players that unlocked the achievement, in percent.
    pub fn get_achievement_achieved_percent(&self, name: &str) -> Option<f32> {
        let name = to_native(name)?;
        let mut percent = 0f32;
        let f = self.vtable.function(&slots::GET_ACHIEVEMENT_ACHIEVED_PERCENT);
        // SAFETY: as above.
        let ok = unsafe { f(self.vtable.object(), name.as_ptr(), &mut percent) };
        (ok != 0).then_some(percent)
    }

    fn named_action(
        &self,
        slot: &crate::native::vtable::Slot<slots::NamedActionFn>,
        name: &str,
    ) -> bool {
        let Some(name) = to_native(name) else {
            return false;
        };
        let f = self.vtable.function(slot);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), name.as_ptr()) != 0 }
    }
}
