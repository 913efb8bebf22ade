//! Common CLI utility functions shared across commands.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use slam_core::config::InstallLocator;
use slam_core::schema::{self, DEFAULT_LANGUAGE};
use slam_core::{
    AchievementDefinition, Callback, Client, Config, GlobalPercentagesReady, ListenerId,
    NativeLibrary, SteamUserStats013, UserStatsReceived, UserStatsStored,
};
use tracing::{debug, warn};

/// Steam install directory from the config or automatic discovery.
pub fn install_path(config: &Config) -> Result<PathBuf> {
    config
        .locator()
        .install_path()
        .context("Could not find the Steam install location; set `steam_path` in the config file")
}

/// Start a session for `app_id`, turning initialization failures into their
/// user-facing explanation.
pub fn open_session<L: NativeLibrary + ?Sized>(library: &mut L, app_id: u32) -> Result<Client<'_, L>> {
    let mut client = Client::new(library);
    if let Err(e) = client.initialize(app_id) {
        return Err(match e.init_failure() {
            Some(failure) => anyhow!("{}\n{}", e, failure.user_message()),
            None => e.into(),
        });
    }

    if !client.user()?.is_logged_on() {
        bail!("The Steam user is not logged on");
    }
    if !client.apps008()?.is_subscribed_app(app_id) {
        warn!("App {} is not owned by the current user", app_id);
    }
    Ok(client)
}

/// Pump callbacks until `done` holds or the stats timeout passes. Returns
/// whether `done` held.
pub fn pump_until<L: NativeLibrary + ?Sized>(
    client: &Client<'_, L>,
    config: &Config,
    done: impl Fn() -> bool,
) -> bool {
    let deadline = Instant::now() + config.stats_timeout();
    loop {
        client.run_callbacks(false);
        if done() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(config.callback_interval());
    }
}

/// A listener removed from the session when dropped.
struct Subscription<'c, 'a, L: NativeLibrary + ?Sized> {
    client: &'c Client<'a, L>,
    listener: ListenerId,
}

impl<L: NativeLibrary + ?Sized> Drop for Subscription<'_, '_, L> {
    fn drop(&mut self) {
        self.client.unregister(self.listener);
    }
}

/// Listen for the first `C` reply about the session's app.
fn await_reply<'c, 'a, L, C>(
    client: &'c Client<'a, L>,
    game_id: impl Fn(&C) -> u64 + 'static,
) -> (Subscription<'c, 'a, L>, Rc<Cell<Option<C>>>)
where
    L: NativeLibrary + ?Sized,
    C: Callback + Copy + 'static,
{
    let app_id = u64::from(client.app_id());
    let reply = Rc::new(Cell::new(None));
    let sink = Rc::clone(&reply);
    let listener = client.register::<C>(move |param| {
        if game_id(&param) == app_id {
            sink.set(Some(param));
        }
    });
    (Subscription { client, listener }, reply)
}

/// Request the user's stats for the session's app and wait for the reply.
pub fn wait_for_stats<L: NativeLibrary + ?Sized>(client: &Client<'_, L>, config: &Config) -> Result<()> {
    let app_id = client.app_id();
    let (_listener, reply) = await_reply(client, |stats: &UserStatsReceived| stats.game_id);

    let steam_id = client.user()?.steam_id();
    if !client.user_stats()?.request_user_stats(steam_id).is_valid() {
        bail!("Steam refused the stats request for app {}", app_id);
    }
    debug!("Requested stats of app {} for {}", app_id, steam_id);

    if !pump_until(client, config, || reply.get().is_some()) {
        bail!(
            "Timed out after {:?} waiting for the stats of app {}",
            config.stats_timeout(),
            app_id
        );
    }
    match reply.get() {
        Some(stats) if stats.succeeded() => Ok(()),
        Some(stats) => bail!("Steam failed to return stats for app {} (result {})", app_id, stats.result),
        None => bail!("No stats reply for app {}", app_id),
    }
}

/// Ask for global unlock percentages and wait for them, best effort.
/// Returns whether they arrived.
pub fn wait_for_global_percentages<L: NativeLibrary + ?Sized>(
    client: &Client<'_, L>,
    config: &Config,
) -> Result<bool> {
    let (_listener, reply) = await_reply(client, |ready: &GlobalPercentagesReady| ready.game_id);

    if !client.user_stats()?.request_global_achievement_percentages().is_valid() {
        warn!("Steam refused the global achievement percentages request");
        return Ok(false);
    }
    if !pump_until(client, config, || reply.get().is_some()) {
        warn!("Global achievement percentages did not arrive in time");
        return Ok(false);
    }
    Ok(reply.get().is_some_and(|ready| ready.succeeded()))
}

/// Commit pending changes and wait for Steam to confirm them.
pub fn store_stats<L: NativeLibrary + ?Sized>(client: &Client<'_, L>, config: &Config) -> Result<()> {
    let app_id = client.app_id();
    let (_listener, reply) = await_reply(client, |stored: &UserStatsStored| stored.game_id);

    if !client.user_stats()?.store_stats() {
        bail!("Steam refused to store the stats of app {}", app_id);
    }
    if !pump_until(client, config, || reply.get().is_some()) {
        warn!("Steam did not confirm storing the stats of app {}", app_id);
        return Ok(());
    }
    match reply.get() {
        Some(stored) if !stored.succeeded() => {
            bail!("Steam failed to store stats for app {} (result {})", app_id, stored.result)
        }
        _ => Ok(()),
    }
}

/// Language for schema strings: config, then Steam's game language.
pub fn language<L: NativeLibrary + ?Sized>(config: &Config, client: &Client<'_, L>) -> String {
    config
        .language
        .clone()
        .or_else(|| client.apps008().ok()?.get_current_game_language())
        .filter(|language| !language.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Achievement definitions from the cached schema, or, when the schema is
/// unreadable, from what the client itself reports.
pub fn load_definitions<L: NativeLibrary + ?Sized>(
    client: &Client<'_, L>,
    language: &str,
) -> Result<Vec<AchievementDefinition>> {
    let app_id = client.app_id();
    let from_schema = client
        .library()
        .install_path()
        .context("Steam install path not found")
        .and_then(|install| {
            Ok(schema::load_achievement_definitions(&install, app_id, language)?)
        });

    match from_schema {
        Ok(definitions) => Ok(definitions),
        Err(e) => {
            warn!("Could not read the schema of app {}: {:#}", app_id, e);
            Ok(definitions_from_client(client.user_stats()?))
        }
    }
}

fn definitions_from_client(stats: &SteamUserStats013) -> Vec<AchievementDefinition> {
    stats
        .achievement_names()
        .into_iter()
        .map(|id| {
            let attribute = |key: &str| stats.get_achievement_display_attribute(&id, key);
            AchievementDefinition {
                name: attribute("name").unwrap_or_else(|| id.clone()),
                description: attribute("desc").unwrap_or_default(),
                icon_normal: String::new(),
                icon_locked: String::new(),
                permission: 0,
                hidden: attribute("hidden").as_deref() == Some("1"),
                id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slam_core::native::mock::MockSteam;

    use super::*;

    const APP_ID: u32 = 480;

    fn fast_config() -> Config {
        Config {
            callback_interval_ms: 1,
            stats_timeout_secs: 5,
            ..Config::default()
        }
    }

    fn steam() -> MockSteam {
        MockSteam::builder()
            .running_app_id(APP_ID)
            .achievement("ACH_WIN_ONE_GAME", false, 0)
            .achievement_percent("ACH_WIN_ONE_GAME", 42.5)
            .build()
    }

    #[test]
    fn test_global_percentages_arrive_before_timeout() {
        let mut steam = steam();
        let probe = steam.clone();
        let config = fast_config();
        let client = open_session(&mut steam, APP_ID).unwrap();

        let started = Instant::now();
        assert!(wait_for_global_percentages(&client, &config).unwrap());
        assert!(started.elapsed() < config.stats_timeout());
        assert_eq!(probe.pending_callbacks(), 0);
        assert_eq!(probe.freed_callbacks(), 1);
        assert_eq!(client.callback_pump().listener_count(), 0);
        assert_eq!(
            client.user_stats().unwrap().get_achievement_achieved_percent("ACH_WIN_ONE_GAME"),
            Some(42.5)
        );
    }

    #[test]
    fn test_stats_round_trip_leaves_no_listeners() {
        let mut steam = steam();
        let probe = steam.clone();
        let config = fast_config();
        let client = open_session(&mut steam, APP_ID).unwrap();

        wait_for_stats(&client, &config).unwrap();
        assert!(client.user_stats().unwrap().set_achievement("ACH_WIN_ONE_GAME"));
        store_stats(&client, &config).unwrap();

        assert_eq!(probe.store_count(), 1);
        assert_eq!(client.callback_pump().listener_count(), 0);
    }

    #[test]
    fn test_pump_until_times_out() {
        let mut steam = steam();
        let config = Config {
            stats_timeout_secs: 0,
            ..fast_config()
        };
        let client = open_session(&mut steam, APP_ID).unwrap();

        assert!(!pump_until(&client, &config, || false));
        assert!(pump_until(&client, &config, || true));
        assert_eq!(config.callback_interval(), Duration::from_millis(1));
    }
}
