//! Session lifecycle.
//!
//! A [`Client`] walks the native setup sequence (load, client interface,
//! pipe, user, sub-interfaces) and owns the teardown. It borrows the library
//! mutably for its whole life, so the library cannot be unloaded or handed
//! to a second session while one is alive.

pub mod callbacks;

pub use callbacks::{
    AppDataChanged, Callback, CallbackPump, GlobalPercentagesReady, ListenerId, UserItemsReceived,
    UserStatsReceived, UserStatsStored,
};

use strum::Display;
use tracing::{debug, info};

use crate::config::paths;
use crate::error::{Error, InitFailure, Result};
use crate::interfaces::{
    Interface, SteamApps001, SteamApps008, SteamClient018, SteamUser012, SteamUserStats013,
    SteamUtils005, create_interface,
};
use crate::native::library::{HSteamPipe, HSteamUser, NativeLibrary};

/// Lifecycle state of a [`Client`]. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SessionState {
    Uninitialized,
    LibraryLoaded,
    PipeOpen,
    UserConnected,
    InterfacesReady,
    Disposed,
}

struct Interfaces {
    user: SteamUser012,
    user_stats: SteamUserStats013,
    utils: SteamUtils005,
    apps001: SteamApps001,
    apps008: SteamApps008,
}

/// One native session for one app id.
///
/// To switch apps, drop (or [`dispose`](Self::dispose)) this value and
/// build a new one; a disposed client never comes back.
pub struct Client<'a, L: NativeLibrary + ?Sized> {
    library: &'a mut L,
    state: SessionState,
    app_id: u32,
    pipe: HSteamPipe,
    user: HSteamUser,
    steam_client: Option<SteamClient018>,
    interfaces: Option<Interfaces>,
    callbacks: CallbackPump,
}

impl<'a, L: NativeLibrary + ?Sized> Client<'a, L> {
    pub fn new(library: &'a mut L) -> Self {
        Self {
            library,
            state: SessionState::Uninitialized,
            app_id: 0,
            pipe: 0,
            user: 0,
            steam_client: None,
            interfaces: None,
            callbacks: CallbackPump::new(),
        }
    }

    /// Run the setup sequence for `app_id` (0 for no specific app).
    ///
    /// Fails with an [`Error::Initialize`] naming the first step that did not
    /// succeed. Anything acquired before the failure is released and the
    /// client ends up `Disposed`, so a later `dispose` is a no-op.
    pub fn initialize(&mut self, app_id: u32) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            return Err(Error::initialize(
                InitFailure::Unknown,
                format!("session cannot be initialized from state {}", self.state),
            ));
        }

        match self.try_initialize(app_id) {
            Ok(()) => {
                info!("Steam session ready (app {}, pipe {}, user {})", app_id, self.pipe, self.user);
                Ok(())
            }
            Err(e) => {
                debug!("Initialization stopped in state {}: {}", self.state, e);
                self.release();
                self.state = SessionState::Disposed;
                Err(e)
            }
        }
    }

    fn try_initialize(&mut self, app_id: u32) -> Result<()> {
        if self.library.install_path().is_none() {
            return Err(Error::initialize(
                InitFailure::GetInstallPath,
                "Steam install path not found",
            ));
        }

        if app_id != 0 {
            debug!("Publishing {}={}", paths::APP_ID_ENV, app_id);
            // SAFETY: sessions are driven from a single owner thread, and the
            // variable is written before the vendor library reads it.
            unsafe { std::env::set_var(paths::APP_ID_ENV, app_id.to_string()) };
        }

        self.library
            .load()
            .map_err(|e| Error::initialize(InitFailure::Load, e.to_string()))?;
        self.state = SessionState::LibraryLoaded;

        let steam_client = create_interface::<SteamClient018, L>(&*self.library).ok_or_else(|| {
            Error::initialize(
                InitFailure::CreateSteamClient,
                format!("{} is not available", SteamClient018::VERSION),
            )
        })?;
        let steam_client = self.steam_client.insert(steam_client);

        let pipe = steam_client.create_steam_pipe();
        if pipe == 0 {
            return Err(Error::initialize(
                InitFailure::CreateSteamPipe,
                "CreateSteamPipe returned 0",
            ));
        }
        self.pipe = pipe;
        self.state = SessionState::PipeOpen;
        debug!("Opened pipe {}", pipe);

        let user = steam_client.connect_to_global_user(pipe);
        if user == 0 {
            return Err(Error::initialize(
                InitFailure::ConnectToGlobalUser,
                "ConnectToGlobalUser returned 0",
            ));
        }
        self.user = user;
        self.state = SessionState::UserConnected;
        debug!("Connected user {}", user);

        let utils = required(steam_client.get_steam_utils005(pipe))?;
        if app_id != 0 {
            let running = utils.get_app_id();
            if running != app_id {
                return Err(Error::initialize(
                    InitFailure::AppIdMismatch,
                    format!("expected app {}, Steam reports {}", app_id, running),
                ));
            }
        }

        self.interfaces = Some(Interfaces {
            user: required(steam_client.get_steam_user012(user, pipe))?,
            user_stats: required(steam_client.get_steam_user_stats013(user, pipe))?,
            utils,
            apps001: required(steam_client.get_steam_apps001(user, pipe))?,
            apps008: required(steam_client.get_steam_apps008(user, pipe))?,
        });
        self.app_id = app_id;
        self.state = SessionState::InterfacesReady;
        Ok(())
    }

    /// Detach the user and release the pipe. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == SessionState::Disposed {
            return;
        }
        debug!("Disposing session in state {}", self.state);
        self.release();
        self.state = SessionState::Disposed;
    }

    fn release(&mut self) {
        self.interfaces = None;
        if let Some(steam_client) = self.steam_client.take() {
            if self.user != 0 {
                steam_client.release_user(self.pipe, self.user);
                self.user = 0;
            }
            if self.pipe != 0 {
                steam_client.release_steam_pipe(self.pipe);
                self.pipe = 0;
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// App id the session was initialized for; 0 when none.
    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    pub fn pipe(&self) -> HSteamPipe {
        self.pipe
    }

    pub fn user_handle(&self) -> HSteamUser {
        self.user
    }

    pub fn library(&self) -> &L {
        &*self.library
    }

    fn ready(&self) -> Result<&Interfaces> {
        match &self.interfaces {
            Some(interfaces) if self.state == SessionState::InterfacesReady => Ok(interfaces),
            _ => Err(Error::SessionNotReady(self.state)),
        }
    }

    pub fn steam_client(&self) -> Result<&SteamClient018> {
        self.ready()?;
        self.steam_client
            .as_ref()
            .ok_or(Error::SessionNotReady(self.state))
    }

    pub fn user(&self) -> Result<&SteamUser012> {
        Ok(&self.ready()?.user)
    }

    pub fn user_stats(&self) -> Result<&SteamUserStats013> {
        Ok(&self.ready()?.user_stats)
    }

    pub fn utils(&self) -> Result<&SteamUtils005> {
        Ok(&self.ready()?.utils)
    }

    pub fn apps001(&self) -> Result<&SteamApps001> {
        Ok(&self.ready()?.apps001)
    }

    pub fn apps008(&self) -> Result<&SteamApps008> {
        Ok(&self.ready()?.apps008)
    }

    pub fn callback_pump(&self) -> &CallbackPump {
        &self.callbacks
    }

    /// Register a typed listener. It lives as long as the session unless
    /// removed with [`unregister`](Self::unregister).
    pub fn register<C: Callback + 'static>(&self, handler: impl FnMut(C) + 'static) -> ListenerId {
        self.callbacks.register(handler)
    }

    pub fn register_raw(
        &self,
        id: i32,
        server: bool,
        handler: impl FnMut(&[u8]) + 'static,
    ) -> ListenerId {
        self.callbacks.register_raw(id, server, handler)
    }

    pub fn unregister(&self, listener: ListenerId) -> bool {
        self.callbacks.unregister(listener)
    }

    /// Drain pending native messages on the session's pipe. Returns the
    /// number of messages drained; 0 when no pipe is open.
    pub fn run_callbacks(&self, server: bool) -> usize {
        if self.pipe == 0 {
            return 0;
        }
        self.callbacks.run(&*self.library, self.pipe, server)
    }
}

impl<L: NativeLibrary + ?Sized> Drop for Client<'_, L> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn required<T: Interface>(interface: Option<T>) -> Result<T> {
    interface.ok_or_else(|| {
        Error::initialize(
            InitFailure::GetInterface,
            format!("{} is not available", T::VERSION),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::mock::MockSteam;

    #[test]
    fn test_new_client_is_uninitialized() {
        let mut steam = MockSteam::new();
        let client = Client::new(&mut steam);
        assert_eq!(client.state(), SessionState::Uninitialized);
        assert!(matches!(
            client.user_stats(),
            Err(Error::SessionNotReady(SessionState::Uninitialized))
        ));
        assert_eq!(client.run_callbacks(false), 0);
    }

    #[test]
    fn test_initialize_twice_is_refused() {
        let mut steam = MockSteam::new();
        let mut client = Client::new(&mut steam);
        client.initialize(0).unwrap();

        let err = client.initialize(0).unwrap_err();
        assert_eq!(err.init_failure(), Some(InitFailure::Unknown));
        assert_eq!(client.state(), SessionState::InterfacesReady);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut steam = MockSteam::new();
        let probe = steam.clone();
        let mut client = Client::new(&mut steam);
        client.initialize(0).unwrap();

        client.dispose();
        client.dispose();
        assert_eq!(client.state(), SessionState::Disposed);
        assert_eq!(probe.released_pipes(), 1);
        assert_eq!(probe.released_users(), 1);
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::InterfacesReady.to_string(), "InterfacesReady");
    }
}
