use crate::interfaces::native_interface;
use crate::native::strings::{from_buffer, from_native, to_native};

/// Fixed size of the value buffer passed to `GetAppData`.
pub const APP_DATA_BUFFER_SIZE: usize = 1024;

/// Virtual table layouts of the two apps interface versions in use.
pub mod slots {
    use std::ffi::c_char;

    use crate::native::vtable::{Slot, member_fn};

    pub type GetAppDataFn = member_fn!(fn(u32, *const c_char, *mut c_char, i32) -> i32);
    pub type IsSubscribedFn = member_fn!(fn() -> u8);
    pub type GetLanguageFn = member_fn!(fn() -> *const c_char);
    pub type IsSubscribedAppFn = member_fn!(fn(u32) -> u8);

    /// `STEAMAPPS_INTERFACE_VERSION001`
    pub const GET_APP_DATA: Slot<GetAppDataFn> = Slot::new(0, "GetAppData");
    pub const COUNT_001: usize = 1;

    /// `STEAMAPPS_INTERFACE_VERSION008`
    pub const IS_SUBSCRIBED: Slot<IsSubscribedFn> = Slot::new(0, "BIsSubscribed");
    pub const GET_CURRENT_GAME_LANGUAGE: Slot<GetLanguageFn> =
        Slot::new(4, "GetCurrentGameLanguage");
    pub const GET_AVAILABLE_GAME_LANGUAGES: Slot<GetLanguageFn> =
        Slot::new(5, "GetAvailableGameLanguages");
    pub const IS_SUBSCRIBED_APP: Slot<IsSubscribedAppFn> = Slot::new(6, "BIsSubscribedApp");
    pub const COUNT_008: usize = 7;
}

native_interface!(
    /// Legacy apps interface, only used for per-app metadata strings.
    SteamApps001,
    "STEAMAPPS_INTERFACE_VERSION001"
);

impl SteamApps001 {
    /// Metadata string `key` of `app_id`, such as `"name"`.
    ///
    /// Returns `None` when the client reports failure. Values are truncated
    /// to [`APP_DATA_BUFFER_SIZE`] bytes including the terminator.
    pub fn get_app_data(&self, app_id: u32, key: &str) -> Option<String> {
        let key = to_native(key)?;
        let mut buffer = vec![0u8; APP_DATA_BUFFER_SIZE];
        let f = self.vtable.function(&slots::GET_APP_DATA);
        // SAFETY: slot signature per the Apps001 layout; `buffer` holds the
        // declared number of bytes.
        let written = unsafe {
            f(
                self.vtable.object(),
                app_id,
                key.as_ptr(),
                buffer.as_mut_ptr().cast(),
                APP_DATA_BUFFER_SIZE as i32,
            )
        };
        (written != 0).then(|| from_buffer(&buffer))
    }
}

native_interface!(
    /// Ownership and language queries.
    SteamApps008,
    "STEAMAPPS_INTERFACE_VERSION008"
);

impl SteamApps008 {
    /// Whether the user owns the running app.
    pub fn is_subscribed(&self) -> bool {
        let f = self.vtable.function(&slots::IS_SUBSCRIBED);
        // SAFETY: slot signature per the Apps008 layout.
        unsafe { f(self.vtable.object()) != 0 }
    }

    pub fn is_subscribed_app(&self, app_id: u32) -> bool {
        let f = self.vtable.function(&slots::IS_SUBSCRIBED_APP);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), app_id) != 0 }
    }

    /// The client's current language, e.g. `"english"`.
    pub fn get_current_game_language(&self) -> Option<String> {
        let f = self.vtable.function(&slots::GET_CURRENT_GAME_LANGUAGE);
        // SAFETY: as above.
        unsafe { from_native(f(self.vtable.object())) }
    }

    /// Languages the running app supports.
    pub fn get_available_game_languages(&self) -> Vec<String> {
        let f = self.vtable.function(&slots::GET_AVAILABLE_GAME_LANGUAGES);
        // SAFETY: as above.
        let list = unsafe { from_native(f(self.vtable.object())) }.unwrap_or_default();
        list.split(',')
            .map(str::trim)
            .filter(|language| !language.is_empty())
            .map(String::from)
            .collect()
    }
}
