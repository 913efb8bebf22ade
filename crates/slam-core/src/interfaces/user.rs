use crate::interfaces::native_interface;
use crate::native::library::HSteamUser;

/// Virtual table layout of `SteamUser012`.
pub mod slots {
    use crate::native::library::HSteamUser;
    use crate::native::vtable::{Slot, member_fn};

    pub type GetHSteamUserFn = member_fn!(fn() -> HSteamUser);
    pub type LoggedOnFn = member_fn!(fn() -> u8);
    // The id is returned through a hidden out-pointer.
    pub type GetSteamIdFn = member_fn!(fn(*mut u64));

    pub const GET_HSTEAM_USER: Slot<GetHSteamUserFn> = Slot::new(0, "GetHSteamUser");
    pub const LOGGED_ON: Slot<LoggedOnFn> = Slot::new(1, "BLoggedOn");
    pub const GET_STEAM_ID: Slot<GetSteamIdFn> = Slot::new(2, "GetSteamID");

    pub const COUNT: usize = 3;
}

native_interface!(
    /// The attached local user.
    SteamUser012,
    "SteamUser012"
);

impl SteamUser012 {
    pub fn get_hsteam_user(&self) -> HSteamUser {
        let f = self.vtable.function(&slots::GET_HSTEAM_USER);
        // SAFETY: slot signature per the SteamUser012 layout.
        unsafe { f(self.vtable.object()) }
    }

    pub fn is_logged_on(&self) -> bool {
        let f = self.vtable.function(&slots::LOGGED_ON);
        // SAFETY: as above.
        unsafe { f(self.vtable.object()) != 0 }
    }

    /// The user's persistent 64-bit account id.
    pub fn steam_id(&self) -> u64 {
        let mut steam_id = 0u64;
        let f = self.vtable.function(&slots::GET_STEAM_ID);
        // SAFETY: as above; `steam_id` is a valid out-slot.
        unsafe { f(self.vtable.object(), &mut steam_id) };
        steam_id
    }
}
