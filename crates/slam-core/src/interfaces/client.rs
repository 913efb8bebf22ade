use std::ffi::c_void;
use std::ptr::NonNull;

use crate::interfaces::{
    Interface, SteamApps001, SteamApps008, SteamUser012, SteamUserStats013, SteamUtils005,
    native_interface,
};
use crate::native::library::{HSteamPipe, HSteamUser};
use crate::native::strings::to_native;
use crate::native::vtable::Slot;

/// Account type passed to `CreateLocalUser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AccountType {
    Invalid = 0,
    Individual = 1,
    Multiset = 2,
    GameServer = 3,
    AnonGameServer = 4,
    Pending = 5,
    ContentServer = 6,
    Clan = 7,
    Chat = 8,
    P2PSuperSeeder = 9,
}

/// Virtual table layout of `SteamClient018`.
pub mod slots {
    use std::ffi::{c_char, c_void};

    use crate::native::library::{HSteamPipe, HSteamUser};
    use crate::native::vtable::{Slot, member_fn};

    pub type CreateSteamPipeFn = member_fn!(fn() -> HSteamPipe);
    pub type ReleaseSteamPipeFn = member_fn!(fn(HSteamPipe) -> u8);
    pub type ConnectToGlobalUserFn = member_fn!(fn(HSteamPipe) -> HSteamUser);
    pub type CreateLocalUserFn = member_fn!(fn(*mut HSteamPipe, i32) -> HSteamUser);
    pub type ReleaseUserFn = member_fn!(fn(HSteamPipe, HSteamUser));
    pub type SetLocalIpBindingFn = member_fn!(fn(u32, u16));
    pub type GetUserInterfaceFn = member_fn!(fn(HSteamUser, HSteamPipe, *const c_char) -> *mut c_void);
    pub type GetPipeInterfaceFn = member_fn!(fn(HSteamPipe, *const c_char) -> *mut c_void);

    pub const CREATE_STEAM_PIPE: Slot<CreateSteamPipeFn> = Slot::new(0, "CreateSteamPipe");
    pub const RELEASE_STEAM_PIPE: Slot<ReleaseSteamPipeFn> = Slot::new(1, "BReleaseSteamPipe");
    pub const CONNECT_TO_GLOBAL_USER: Slot<ConnectToGlobalUserFn> =
        Slot::new(2, "ConnectToGlobalUser");
    pub const CREATE_LOCAL_USER: Slot<CreateLocalUserFn> = Slot::new(3, "CreateLocalUser");
    pub const RELEASE_USER: Slot<ReleaseUserFn> = Slot::new(4, "ReleaseUser");
    pub const GET_ISTEAM_USER: Slot<GetUserInterfaceFn> = Slot::new(5, "GetISteamUser");
    pub const SET_LOCAL_IP_BINDING: Slot<SetLocalIpBindingFn> = Slot::new(7, "SetLocalIPBinding");
    pub const GET_ISTEAM_UTILS: Slot<GetPipeInterfaceFn> = Slot::new(9, "GetISteamUtils");
    pub const GET_ISTEAM_USER_STATS: Slot<GetUserInterfaceFn> =
        Slot::new(13, "GetISteamUserStats");
    pub const GET_ISTEAM_APPS: Slot<GetUserInterfaceFn> = Slot::new(15, "GetISteamApps");

    /// Number of slots the wrapper needs to exist in the table.
    pub const COUNT: usize = 16;
}

native_interface!(
    /// The root client interface: pipes, users and sub-interface lookup.
    SteamClient018,
    "SteamClient018"
);

impl SteamClient018 {
    /// Open a communication pipe. Returns 0 on failure.
    pub fn create_steam_pipe(&self) -> HSteamPipe {
        let f = self.vtable.function(&slots::CREATE_STEAM_PIPE);
        // SAFETY: slot signature per the SteamClient018 layout.
        unsafe { f(self.vtable.object()) }
    }

    pub fn release_steam_pipe(&self, pipe: HSteamPipe) -> bool {
        let f = self.vtable.function(&slots::RELEASE_STEAM_PIPE);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), pipe) != 0 }
    }

    /// Attach the logged in user to `pipe`. Returns 0 on failure.
    pub fn connect_to_global_user(&self, pipe: HSteamPipe) -> HSteamUser {
        let f = self.vtable.function(&slots::CONNECT_TO_GLOBAL_USER);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), pipe) }
    }

    /// Create a local user; the native side may replace `pipe`.
    pub fn create_local_user(&self, pipe: &mut HSteamPipe, account_type: AccountType) -> HSteamUser {
        let f = self.vtable.function(&slots::CREATE_LOCAL_USER);
        // SAFETY: as above; `pipe` is a valid in/out slot for the call.
        unsafe { f(self.vtable.object(), pipe, account_type as i32) }
    }

    pub fn release_user(&self, pipe: HSteamPipe, user: HSteamUser) {
        let f = self.vtable.function(&slots::RELEASE_USER);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), pipe, user) }
    }

    pub fn set_local_ip_binding(&self, host: u32, port: u16) {
        let f = self.vtable.function(&slots::SET_LOCAL_IP_BINDING);
        // SAFETY: as above.
        unsafe { f(self.vtable.object(), host, port) }
    }

    pub fn get_steam_user012(&self, user: HSteamUser, pipe: HSteamPipe) -> Option<SteamUser012> {
        self.user_interface(&slots::GET_ISTEAM_USER, user, pipe)
    }

    pub fn get_steam_user_stats013(
        &self,
        user: HSteamUser,
        pipe: HSteamPipe,
    ) -> Option<SteamUserStats013> {
        self.user_interface(&slots::GET_ISTEAM_USER_STATS, user, pipe)
    }

    pub fn get_steam_apps001(&self, user: HSteamUser, pipe: HSteamPipe) -> Option<SteamApps001> {
        self.user_interface(&slots::GET_ISTEAM_APPS, user, pipe)
    }

    pub fn get_steam_apps008(&self, user: HSteamUser, pipe: HSteamPipe) -> Option<SteamApps008> {
        self.user_interface(&slots::GET_ISTEAM_APPS, user, pipe)
    }

    pub fn get_steam_utils005(&self, pipe: HSteamPipe) -> Option<SteamUtils005> {
        let version = to_native(SteamUtils005::VERSION)?;
        let f = self.vtable.function(&slots::GET_ISTEAM_UTILS);
        // SAFETY: as above; the version buffer outlives the call.
        let object = unsafe { f(self.vtable.object(), pipe, version.as_ptr()) };
        wrap(object)
    }

    fn user_interface<T: Interface>(
        &self,
        slot: &Slot<slots::GetUserInterfaceFn>,
        user: HSteamUser,
        pipe: HSteamPipe,
    ) -> Option<T> {
        let version = to_native(T::VERSION)?;
        let f = self.vtable.function(slot);
        // SAFETY: as above; the version buffer outlives the call.
        let object = unsafe { f(self.vtable.object(), user, pipe, version.as_ptr()) };
        wrap(object)
    }
}

fn wrap<T: Interface>(object: *mut c_void) -> Option<T> {
    let object = NonNull::new(object)?;
    // SAFETY: the client returned this object for T::VERSION; it stays valid
    // for the lifetime of the pipe/user it was requested with.
    Some(unsafe { T::from_raw(object) })
}
