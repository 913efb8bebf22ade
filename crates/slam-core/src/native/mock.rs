//! In-process fake of the vendor client library for testing.
//!
//! [`MockSteam`] implements [`NativeLibrary`] and hands out real objects whose
//! virtual tables point at Rust functions with the member calling
//! convention, so the binder, the typed wrappers, the session and the
//! callback pump run unchanged against it. Clones share state, which lets a
//! test keep a probe while a session borrows the library.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;
use std::path::PathBuf;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interfaces::{
    Interface, SteamApps001, SteamApps008, SteamClient018, SteamUser012, SteamUserStats013,
    SteamUtils005, apps, client, user, user_stats, utils,
};
use crate::native::library::{CallbackMsg, HSteamPipe, HSteamUser, NativeLibrary};
use crate::native::vtable::{InterfacePtr, Slot, member_fns};

/// Callback id the fake posts after a stats request.
pub const USER_STATS_RECEIVED: i32 = 1101;
/// Callback id the fake posts after a store.
pub const USER_STATS_STORED: i32 = 1102;
/// Callback id the fake posts after a global percentages request.
pub const GLOBAL_PERCENTAGES_READY: i32 = 1110;

const OK_RESULT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MockAchievement {
    achieved: bool,
    unlock_time: u32,
    percent: Option<f32>,
}

#[derive(Debug, Default)]
struct MockState {
    install_path: Option<PathBuf>,
    fail_load: bool,
    pipe: HSteamPipe,
    user: HSteamUser,
    running_app_id: u32,
    steam_id: u64,
    logged_on: bool,
    language: String,
    available_languages: String,
    ip_country: String,
    refused: HashSet<String>,
    achievements: BTreeMap<String, MockAchievement>,
    int_stats: BTreeMap<String, i32>,
    float_stats: BTreeMap<String, f32>,
    display: HashMap<(String, String), String>,
    app_data: HashMap<(u32, String), String>,
    owned: HashSet<u32>,
    images: HashMap<i32, (u32, u32, Vec<u8>)>,

    loaded: bool,
    loads: usize,
    interfaces: HashMap<&'static str, usize>,
    open_pipes: Vec<HSteamPipe>,
    released_pipes: usize,
    open_users: Vec<HSteamUser>,
    released_users: usize,
    local_ip_binding: Option<(u32, u16)>,
    queue: VecDeque<(i32, Vec<u8>)>,
    current: Option<Vec<u8>>,
    polled: usize,
    freed: usize,
    stores: usize,
    resets: Vec<bool>,
    next_call: u64,
    // Keeps strings handed to native callers alive.
    retained: Vec<CString>,
}

impl MockState {
    fn interface(&self, version: &str) -> *mut c_void {
        if !self.loaded || self.refused.contains(version) {
            return ptr::null_mut();
        }
        self.interfaces
            .get(version)
            .map_or(ptr::null_mut(), |&address| address as *mut c_void)
    }

    fn retain(&mut self, value: &str) -> *const c_char {
        let value = CString::new(value).unwrap_or_default();
        let pointer = value.as_ptr();
        self.retained.push(value);
        pointer
    }

    fn current_user(&self) -> HSteamUser {
        self.open_users.last().copied().unwrap_or(0)
    }

    fn post_stats_received(&mut self, steam_id: u64) {
        let mut param = Vec::with_capacity(20);
        param.extend_from_slice(&u64::from(self.running_app_id).to_le_bytes());
        param.extend_from_slice(&OK_RESULT.to_le_bytes());
        param.extend_from_slice(&steam_id.to_le_bytes());
        self.queue.push_back((USER_STATS_RECEIVED, param));
    }

    fn post_stats_stored(&mut self) {
        let mut param = Vec::with_capacity(12);
        param.extend_from_slice(&u64::from(self.running_app_id).to_le_bytes());
        param.extend_from_slice(&OK_RESULT.to_le_bytes());
        self.queue.push_back((USER_STATS_STORED, param));
    }

    fn post_global_percentages(&mut self) {
        let mut param = Vec::with_capacity(12);
        param.extend_from_slice(&u64::from(self.running_app_id).to_le_bytes());
        param.extend_from_slice(&OK_RESULT.to_le_bytes());
        self.queue.push_back((GLOBAL_PERCENTAGES_READY, param));
    }

    fn next_call(&mut self) -> u64 {
        self.next_call += 1;
        self.next_call
    }
}

/// A fake native object: a virtual table pointer followed by the state
/// every fake member function reaches through `this`.
#[repr(C)]
struct MockObject {
    vtable: *const *const c_void,
    state: *const RefCell<MockState>,
}

struct Shared {
    // Boxed so object back-pointers stay valid when `Shared` moves.
    state: Box<RefCell<MockState>>,
    _objects: Vec<Box<MockObject>>,
    _tables: Vec<Box<[*const c_void]>>,
}

/// Fake vendor library. See the module docs.
#[derive(Clone)]
pub struct MockSteam {
    shared: Rc<Shared>,
}

impl fmt::Debug for MockSteam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MockSteam")
            .field("loaded", &state.loaded)
            .field("open_pipes", &state.open_pipes)
            .field("open_users", &state.open_users)
            .field("pending_callbacks", &state.queue.len())
            .finish()
    }
}

impl Default for MockSteam {
    fn default() -> Self {
        MockSteamBuilder::new().build()
    }
}

impl MockSteam {
    /// A fake with a healthy environment: install found, pipe 1, user 1.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MockSteamBuilder {
        MockSteamBuilder::new()
    }

    fn state(&self) -> Ref<'_, MockState> {
        self.shared.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, MockState> {
        self.shared.state.borrow_mut()
    }

    /// Queue a raw callback message for the next pump.
    pub fn push_callback(&self, id: i32, param: Vec<u8>) {
        self.state_mut().queue.push_back((id, param));
    }

    /// Change the app id the fake reports as running.
    pub fn set_running_app_id(&self, app_id: u32) {
        self.state_mut().running_app_id = app_id;
    }

    /// Number of loads actually performed.
    pub fn load_count(&self) -> usize {
        self.state().loads
    }

    pub fn open_pipes(&self) -> Vec<HSteamPipe> {
        self.state().open_pipes.clone()
    }

    pub fn released_pipes(&self) -> usize {
        self.state().released_pipes
    }

    pub fn open_users(&self) -> Vec<HSteamUser> {
        self.state().open_users.clone()
    }

    pub fn released_users(&self) -> usize {
        self.state().released_users
    }

    pub fn pending_callbacks(&self) -> usize {
        self.state().queue.len()
    }

    pub fn polled_callbacks(&self) -> usize {
        self.state().polled
    }

    pub fn freed_callbacks(&self) -> usize {
        self.state().freed
    }

    pub fn store_count(&self) -> usize {
        self.state().stores
    }

    /// Arguments of every `ResetAllStats` call, in order.
    pub fn reset_calls(&self) -> Vec<bool> {
        self.state().resets.clone()
    }

    pub fn local_ip_binding(&self) -> Option<(u32, u16)> {
        self.state().local_ip_binding
    }

    pub fn achievement(&self, name: &str) -> Option<bool> {
        self.state().achievements.get(name).map(|a| a.achieved)
    }

    pub fn stat_i32(&self, name: &str) -> Option<i32> {
        self.state().int_stats.get(name).copied()
    }

    pub fn stat_f32(&self, name: &str) -> Option<f32> {
        self.state().float_stats.get(name).copied()
    }
}

impl NativeLibrary for MockSteam {
    fn install_path(&self) -> Option<PathBuf> {
        self.state().install_path.clone()
    }

    fn load(&mut self) -> Result<()> {
        let mut state = self.state_mut();
        if state.loaded {
            return Ok(());
        }
        let path = state.install_path.clone().ok_or(Error::InstallPathNotFound)?;
        if state.fail_load {
            return Err(Error::LibraryLoad {
                path,
                message: "mock load failure".to_string(),
            });
        }
        state.loaded = true;
        state.loads += 1;
        Ok(())
    }

    fn unload(&mut self) {
        self.state_mut().loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    fn create_interface(&self, version: &str) -> Option<InterfacePtr> {
        NonNull::new(self.state().interface(version))
    }

    fn get_callback(&self, pipe: HSteamPipe) -> Option<CallbackMsg> {
        let mut state = self.state_mut();
        if !state.loaded || !state.open_pipes.contains(&pipe) {
            return None;
        }
        let (id, param) = state.queue.pop_front()?;
        state.polled += 1;
        let user = state.current_user();
        let current = state.current.insert(param);
        Some(CallbackMsg {
            user,
            id,
            param: current.as_mut_ptr(),
            param_size: current.len() as i32,
        })
    }

    fn free_last_callback(&self, _pipe: HSteamPipe) -> bool {
        let mut state = self.state_mut();
        if state.current.take().is_some() {
            state.freed += 1;
            true
        } else {
            false
        }
    }
}

/// Builder for [`MockSteam`].
#[derive(Debug)]
pub struct MockSteamBuilder {
    state: MockState,
}

impl Default for MockSteamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSteamBuilder {
    pub fn new() -> Self {
        Self {
            state: MockState {
                install_path: Some(PathBuf::from("mock-steam")),
                pipe: 1,
                user: 1,
                steam_id: 76_561_197_960_287_930,
                logged_on: true,
                language: "english".to_string(),
                available_languages: "english,german".to_string(),
                ip_country: "US".to_string(),
                ..MockState::default()
            },
        }
    }

    pub fn install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state.install_path = Some(path.into());
        self
    }

    pub fn without_install_path(mut self) -> Self {
        self.state.install_path = None;
        self
    }

    /// Make `load` fail as if the library file were unusable.
    pub fn fail_load(mut self) -> Self {
        self.state.fail_load = true;
        self
    }

    /// Make the factory return null for the client interface.
    pub fn without_client(self) -> Self {
        self.refuse_interface(SteamClient018::VERSION)
    }

    /// Make the factory and the client return null for `version`.
    pub fn refuse_interface(mut self, version: &str) -> Self {
        self.state.refused.insert(version.to_string());
        self
    }

    /// Pipe id handed out by `CreateSteamPipe`; 0 makes it fail.
    pub fn pipe(mut self, pipe: HSteamPipe) -> Self {
        self.state.pipe = pipe;
        self
    }

    /// User id handed out by `ConnectToGlobalUser`; 0 makes it fail.
    pub fn user(mut self, user: HSteamUser) -> Self {
        self.state.user = user;
        self
    }

    pub fn running_app_id(mut self, app_id: u32) -> Self {
        self.state.running_app_id = app_id;
        self
    }

    pub fn steam_id(mut self, steam_id: u64) -> Self {
        self.state.steam_id = steam_id;
        self
    }

    pub fn logged_on(mut self, logged_on: bool) -> Self {
        self.state.logged_on = logged_on;
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.state.language = language.to_string();
        self
    }

    pub fn achievement(mut self, name: &str, achieved: bool, unlock_time: u32) -> Self {
        let entry = self
            .state
            .achievements
            .entry(name.to_string())
            .or_insert(MockAchievement {
                achieved,
                unlock_time,
                percent: None,
            });
        entry.achieved = achieved;
        entry.unlock_time = unlock_time;
        self
    }

    pub fn achievement_percent(mut self, name: &str, percent: f32) -> Self {
        if let Some(entry) = self.state.achievements.get_mut(name) {
            entry.percent = Some(percent);
        }
        self
    }

    pub fn display_attribute(mut self, name: &str, key: &str, value: &str) -> Self {
        self.state
            .display
            .insert((name.to_string(), key.to_string()), value.to_string());
        self
    }

    pub fn stat_i32(mut self, name: &str, value: i32) -> Self {
        self.state.int_stats.insert(name.to_string(), value);
        self
    }

    pub fn stat_f32(mut self, name: &str, value: f32) -> Self {
        self.state.float_stats.insert(name.to_string(), value);
        self
    }

    pub fn app_data(mut self, app_id: u32, key: &str, value: &str) -> Self {
        self.state
            .app_data
            .insert((app_id, key.to_string()), value.to_string());
        self
    }

    pub fn owns(mut self, app_id: u32) -> Self {
        self.state.owned.insert(app_id);
        self
    }

    pub fn image(mut self, handle: i32, width: u32, height: u32, rgba: Vec<u8>) -> Self {
        self.state.images.insert(handle, (width, height, rgba));
        self
    }

    pub fn build(self) -> MockSteam {
        let state = Box::new(RefCell::new(self.state));
        let state_ptr: *const RefCell<MockState> = &*state;

        let tables = vec![
            client_table(),
            user_table(),
            user_stats_table(),
            utils_table(),
            apps001_table(),
            apps008_table(),
        ];
        let versions = [
            SteamClient018::VERSION,
            SteamUser012::VERSION,
            SteamUserStats013::VERSION,
            SteamUtils005::VERSION,
            SteamApps001::VERSION,
            SteamApps008::VERSION,
        ];

        let objects: Vec<Box<MockObject>> = tables
            .iter()
            .map(|table| {
                Box::new(MockObject {
                    vtable: table.as_ptr(),
                    state: state_ptr,
                })
            })
            .collect();

        {
            let mut state = state.borrow_mut();
            for (version, object) in versions.into_iter().zip(&objects) {
                let address = &**object as *const MockObject as usize;
                state.interfaces.insert(version, address);
            }
        }

        MockSteam {
            shared: Rc::new(Shared {
                state,
                _objects: objects,
                _tables: tables,
            }),
        }
    }
}

struct TableBuilder(Vec<*const c_void>);

impl TableBuilder {
    fn new(count: usize) -> Self {
        Self(vec![ptr::null(); count])
    }

    fn set<F: Copy>(mut self, slot: &Slot<F>, function: F) -> Self {
        const {
            assert!(std::mem::size_of::<F>() == std::mem::size_of::<*const c_void>());
        }
        // SAFETY: F is a function pointer type of pointer size.
        self.0[slot.index()] = unsafe { std::mem::transmute_copy(&function) };
        self
    }

    fn build(self) -> Box<[*const c_void]> {
        self.0.into_boxed_slice()
    }
}

fn client_table() -> Box<[*const c_void]> {
    use client::slots::*;
    TableBuilder::new(COUNT)
        .set(&CREATE_STEAM_PIPE, client_create_steam_pipe)
        .set(&RELEASE_STEAM_PIPE, client_release_steam_pipe)
        .set(&CONNECT_TO_GLOBAL_USER, client_connect_to_global_user)
        .set(&CREATE_LOCAL_USER, client_create_local_user)
        .set(&RELEASE_USER, client_release_user)
        .set(&GET_ISTEAM_USER, client_get_user_interface)
        .set(&SET_LOCAL_IP_BINDING, client_set_local_ip_binding)
        .set(&GET_ISTEAM_UTILS, client_get_pipe_interface)
        .set(&GET_ISTEAM_USER_STATS, client_get_user_interface)
        .set(&GET_ISTEAM_APPS, client_get_user_interface)
        .build()
}

fn user_table() -> Box<[*const c_void]> {
    use user::slots::*;
    TableBuilder::new(COUNT)
        .set(&GET_HSTEAM_USER, user_get_hsteam_user)
        .set(&LOGGED_ON, user_logged_on)
        .set(&GET_STEAM_ID, user_get_steam_id)
        .build()
}

fn user_stats_table() -> Box<[*const c_void]> {
    use user_stats::slots::*;
    TableBuilder::new(COUNT)
        .set(&REQUEST_CURRENT_STATS, stats_request_current_stats)
        .set(&GET_STAT_FLOAT, stats_get_stat_float)
        .set(&GET_STAT_INT, stats_get_stat_int)
        .set(&SET_STAT_FLOAT, stats_set_stat_float)
        .set(&SET_STAT_INT, stats_set_stat_int)
        .set(&GET_ACHIEVEMENT, stats_get_achievement)
        .set(&SET_ACHIEVEMENT, stats_set_achievement)
        .set(&CLEAR_ACHIEVEMENT, stats_clear_achievement)
        .set(&GET_ACHIEVEMENT_AND_UNLOCK_TIME, stats_get_achievement_and_unlock_time)
        .set(&STORE_STATS, stats_store_stats)
        .set(&GET_ACHIEVEMENT_ICON, stats_get_achievement_icon)
        .set(&GET_ACHIEVEMENT_DISPLAY_ATTRIBUTE, stats_get_display_attribute)
        .set(&GET_NUM_ACHIEVEMENTS, stats_get_num_achievements)
        .set(&GET_ACHIEVEMENT_NAME, stats_get_achievement_name)
        .set(&REQUEST_USER_STATS, stats_request_user_stats)
        .set(&RESET_ALL_STATS, stats_reset_all_stats)
        .set(
            &REQUEST_GLOBAL_ACHIEVEMENT_PERCENTAGES,
            stats_request_global_percentages,
        )
        .set(&GET_ACHIEVEMENT_ACHIEVED_PERCENT, stats_get_achieved_percent)
        .build()
}

fn utils_table() -> Box<[*const c_void]> {
    use utils::slots::*;
    TableBuilder::new(COUNT)
        .set(&GET_CONNECTED_UNIVERSE, utils_get_connected_universe)
        .set(&GET_IP_COUNTRY, utils_get_ip_country)
        .set(&GET_IMAGE_SIZE, utils_get_image_size)
        .set(&GET_IMAGE_RGBA, utils_get_image_rgba)
        .set(&GET_APP_ID, utils_get_app_id)
        .build()
}

fn apps001_table() -> Box<[*const c_void]> {
    use apps::slots::*;
    TableBuilder::new(COUNT_001)
        .set(&GET_APP_DATA, apps_get_app_data)
        .build()
}

fn apps008_table() -> Box<[*const c_void]> {
    use apps::slots::*;
    TableBuilder::new(COUNT_008)
        .set(&IS_SUBSCRIBED, apps_is_subscribed)
        .set(&GET_CURRENT_GAME_LANGUAGE, apps_get_current_game_language)
        .set(&GET_AVAILABLE_GAME_LANGUAGES, apps_get_available_game_languages)
        .set(&IS_SUBSCRIBED_APP, apps_is_subscribed_app)
        .build()
}

/// # Safety
///
/// `this` must be a [`MockObject`] built by [`MockSteamBuilder::build`] whose
/// [`MockSteam`] is still alive.
unsafe fn mock<'a>(this: *mut c_void) -> &'a RefCell<MockState> {
    // SAFETY: guaranteed by the caller.
    unsafe { &*(*(this as *const MockObject)).state }
}

/// # Safety
///
/// `pointer` must be null or a null-terminated string.
unsafe fn text(pointer: *const c_char) -> String {
    if pointer.is_null() {
        return String::new();
    }
    // SAFETY: guaranteed by the caller.
    unsafe { CStr::from_ptr(pointer) }
        .to_string_lossy()
        .into_owned()
}

// Every function below is only reachable through the tables built above, so
// `this` is always a live `MockObject`. None of them may panic.
member_fns! {
    fn client_create_steam_pipe(this: *mut c_void) -> HSteamPipe {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let pipe = state.pipe;
        if pipe != 0 {
            state.open_pipes.push(pipe);
        }
        pipe
    }

    fn client_release_steam_pipe(this: *mut c_void, pipe: HSteamPipe) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let Some(index) = state.open_pipes.iter().position(|&p| p == pipe) else {
            return 0;
        };
        state.open_pipes.remove(index);
        state.released_pipes += 1;
        1
    }

    fn client_connect_to_global_user(this: *mut c_void, pipe: HSteamPipe) -> HSteamUser {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let user = state.user;
        if user == 0 || !state.open_pipes.contains(&pipe) {
            return 0;
        }
        state.open_users.push(user);
        user
    }

    fn client_create_local_user(
        this: *mut c_void,
        pipe: *mut HSteamPipe,
        _account_type: i32,
    ) -> HSteamUser {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let user = state.user;
        if user == 0 || pipe.is_null() {
            return 0;
        }
        // SAFETY: non-null in/out slot provided by the caller.
        unsafe { *pipe = state.pipe };
        state.open_users.push(user);
        user
    }

    fn client_release_user(this: *mut c_void, _pipe: HSteamPipe, user: HSteamUser) {
        let mut state = unsafe { mock(this) }.borrow_mut();
        if let Some(index) = state.open_users.iter().position(|&u| u == user) {
            state.open_users.remove(index);
            state.released_users += 1;
        }
    }

    fn client_set_local_ip_binding(this: *mut c_void, host: u32, port: u16) {
        unsafe { mock(this) }.borrow_mut().local_ip_binding = Some((host, port));
    }

    fn client_get_user_interface(
        this: *mut c_void,
        user: HSteamUser,
        pipe: HSteamPipe,
        version: *const c_char,
    ) -> *mut c_void {
        let state = unsafe { mock(this) }.borrow();
        if !state.open_users.contains(&user) || !state.open_pipes.contains(&pipe) {
            return ptr::null_mut();
        }
        state.interface(&unsafe { text(version) })
    }

    fn client_get_pipe_interface(
        this: *mut c_void,
        pipe: HSteamPipe,
        version: *const c_char,
    ) -> *mut c_void {
        let state = unsafe { mock(this) }.borrow();
        if !state.open_pipes.contains(&pipe) {
            return ptr::null_mut();
        }
        state.interface(&unsafe { text(version) })
    }

    fn user_get_hsteam_user(this: *mut c_void) -> HSteamUser {
        unsafe { mock(this) }.borrow().current_user()
    }

    fn user_logged_on(this: *mut c_void) -> u8 {
        u8::from(unsafe { mock(this) }.borrow().logged_on)
    }

    fn user_get_steam_id(this: *mut c_void, steam_id: *mut u64) {
        let value = unsafe { mock(this) }.borrow().steam_id;
        if !steam_id.is_null() {
            // SAFETY: non-null out-slot provided by the caller.
            unsafe { *steam_id = value };
        }
    }

    fn stats_request_current_stats(this: *mut c_void) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let steam_id = state.steam_id;
        state.post_stats_received(steam_id);
        1
    }

    fn stats_get_stat_float(this: *mut c_void, name: *const c_char, value: *mut f32) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.float_stats.get(&unsafe { text(name) }) {
            Some(&stat) if !value.is_null() => {
                unsafe { *value = stat };
                1
            }
            _ => 0,
        }
    }

    fn stats_get_stat_int(this: *mut c_void, name: *const c_char, value: *mut i32) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.int_stats.get(&unsafe { text(name) }) {
            Some(&stat) if !value.is_null() => {
                unsafe { *value = stat };
                1
            }
            _ => 0,
        }
    }

    fn stats_set_stat_float(this: *mut c_void, name: *const c_char, value: f32) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        match state.float_stats.get_mut(&unsafe { text(name) }) {
            Some(stat) => {
                *stat = value;
                1
            }
            None => 0,
        }
    }

    fn stats_set_stat_int(this: *mut c_void, name: *const c_char, value: i32) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        match state.int_stats.get_mut(&unsafe { text(name) }) {
            Some(stat) => {
                *stat = value;
                1
            }
            None => 0,
        }
    }

    fn stats_get_achievement(this: *mut c_void, name: *const c_char, achieved: *mut u8) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.achievements.get(&unsafe { text(name) }) {
            Some(entry) if !achieved.is_null() => {
                unsafe { *achieved = u8::from(entry.achieved) };
                1
            }
            _ => 0,
        }
    }

    fn stats_set_achievement(this: *mut c_void, name: *const c_char) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        match state.achievements.get_mut(&unsafe { text(name) }) {
            Some(entry) => {
                entry.achieved = true;
                1
            }
            None => 0,
        }
    }

    fn stats_clear_achievement(this: *mut c_void, name: *const c_char) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        match state.achievements.get_mut(&unsafe { text(name) }) {
            Some(entry) => {
                entry.achieved = false;
                entry.unlock_time = 0;
                1
            }
            None => 0,
        }
    }

    fn stats_get_achievement_and_unlock_time(
        this: *mut c_void,
        name: *const c_char,
        achieved: *mut u8,
        unlock_time: *mut u32,
    ) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.achievements.get(&unsafe { text(name) }) {
            Some(entry) if !achieved.is_null() && !unlock_time.is_null() => {
                unsafe {
                    *achieved = u8::from(entry.achieved);
                    *unlock_time = entry.unlock_time;
                }
                1
            }
            _ => 0,
        }
    }

    fn stats_store_stats(this: *mut c_void) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        state.stores += 1;
        state.post_stats_stored();
        1
    }

    fn stats_get_achievement_icon(_this: *mut c_void, _name: *const c_char) -> i32 {
        0
    }

    fn stats_get_display_attribute(
        this: *mut c_void,
        name: *const c_char,
        key: *const c_char,
    ) -> *const c_char {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let lookup = unsafe { (text(name), text(key)) };
        match state.display.get(&lookup).cloned() {
            Some(value) => state.retain(&value),
            None => ptr::null(),
        }
    }

    fn stats_get_num_achievements(this: *mut c_void) -> u32 {
        unsafe { mock(this) }.borrow().achievements.len() as u32
    }

    fn stats_get_achievement_name(this: *mut c_void, index: u32) -> *const c_char {
        let mut state = unsafe { mock(this) }.borrow_mut();
        match state.achievements.keys().nth(index as usize).cloned() {
            Some(name) => state.retain(&name),
            None => ptr::null(),
        }
    }

    fn stats_request_user_stats(this: *mut c_void, steam_id: u64) -> u64 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        state.post_stats_received(steam_id);
        state.next_call()
    }

    fn stats_reset_all_stats(this: *mut c_void, achievements_too: u8) -> u8 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let achievements_too = achievements_too != 0;
        state.resets.push(achievements_too);
        state.int_stats.values_mut().for_each(|value| *value = 0);
        state.float_stats.values_mut().for_each(|value| *value = 0.0);
        if achievements_too {
            for entry in state.achievements.values_mut() {
                entry.achieved = false;
                entry.unlock_time = 0;
            }
        }
        1
    }

    fn stats_request_global_percentages(this: *mut c_void) -> u64 {
        let mut state = unsafe { mock(this) }.borrow_mut();
        state.post_global_percentages();
        state.next_call()
    }

    fn stats_get_achieved_percent(this: *mut c_void, name: *const c_char, percent: *mut f32) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state
            .achievements
            .get(&unsafe { text(name) })
            .and_then(|entry| entry.percent)
        {
            Some(value) if !percent.is_null() => {
                unsafe { *percent = value };
                1
            }
            _ => 0,
        }
    }

    fn utils_get_connected_universe(_this: *mut c_void) -> i32 {
        1
    }

    fn utils_get_ip_country(this: *mut c_void) -> *const c_char {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let country = state.ip_country.clone();
        state.retain(&country)
    }

    fn utils_get_image_size(this: *mut c_void, image: i32, width: *mut u32, height: *mut u32) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.images.get(&image) {
            Some((w, h, _)) if !width.is_null() && !height.is_null() => {
                unsafe {
                    *width = *w;
                    *height = *h;
                }
                1
            }
            _ => 0,
        }
    }

    fn utils_get_image_rgba(this: *mut c_void, image: i32, buffer: *mut u8, size: i32) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        match state.images.get(&image) {
            Some((_, _, rgba)) if !buffer.is_null() && size >= 0 => {
                let count = rgba.len().min(size as usize);
                unsafe { ptr::copy_nonoverlapping(rgba.as_ptr(), buffer, count) };
                1
            }
            _ => 0,
        }
    }

    fn utils_get_app_id(this: *mut c_void) -> u32 {
        unsafe { mock(this) }.borrow().running_app_id
    }

    fn apps_get_app_data(
        this: *mut c_void,
        app_id: u32,
        key: *const c_char,
        buffer: *mut c_char,
        size: i32,
    ) -> i32 {
        let state = unsafe { mock(this) }.borrow();
        let lookup = (app_id, unsafe { text(key) });
        match state.app_data.get(&lookup) {
            Some(value) if !buffer.is_null() && size > 0 => {
                let count = value.len().min(size as usize - 1);
                unsafe {
                    ptr::copy_nonoverlapping(value.as_ptr(), buffer.cast::<u8>(), count);
                    *buffer.add(count) = 0;
                }
                count as i32 + 1
            }
            _ => 0,
        }
    }

    fn apps_is_subscribed(this: *mut c_void) -> u8 {
        let state = unsafe { mock(this) }.borrow();
        u8::from(state.owned.contains(&state.running_app_id))
    }

    fn apps_get_current_game_language(this: *mut c_void) -> *const c_char {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let language = state.language.clone();
        state.retain(&language)
    }

    fn apps_get_available_game_languages(this: *mut c_void) -> *const c_char {
        let mut state = unsafe { mock(this) }.borrow_mut();
        let languages = state.available_languages.clone();
        state.retain(&languages)
    }

    fn apps_is_subscribed_app(this: *mut c_void, app_id: u32) -> u8 {
        u8::from(unsafe { mock(this) }.borrow().owned.contains(&app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::create_interface;

    #[test]
    fn test_load_is_idempotent() {
        let mut steam = MockSteam::new();
        steam.load().unwrap();
        steam.load().unwrap();
        assert_eq!(steam.load_count(), 1);
        assert!(steam.is_loaded());
    }

    #[test]
    fn test_unload_before_load_is_noop() {
        let mut steam = MockSteam::new();
        steam.unload();
        assert!(!steam.is_loaded());
        assert_eq!(steam.load_count(), 0);
    }

    #[test]
    fn test_interfaces_require_loaded_library() {
        let mut steam = MockSteam::new();
        assert!(create_interface::<SteamClient018, _>(&steam).is_none());

        steam.load().unwrap();
        assert!(create_interface::<SteamClient018, _>(&steam).is_some());
        assert!(steam.create_interface("SteamClient999").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let steam = MockSteam::new();
        let probe = steam.clone();
        steam.push_callback(1001, vec![0; 5]);
        assert_eq!(probe.pending_callbacks(), 1);
    }

    #[test]
    fn test_client_calls_through_fake_tables() {
        let mut steam = MockSteam::builder().pipe(7).user(3).build();
        steam.load().unwrap();
        let client = create_interface::<SteamClient018, _>(&steam).unwrap();

        let pipe = client.create_steam_pipe();
        assert_eq!(pipe, 7);
        let user = client.connect_to_global_user(pipe);
        assert_eq!(user, 3);
        assert_eq!(steam.open_users(), vec![3]);

        client.set_local_ip_binding(0x7F00_0001, 27015);
        assert_eq!(steam.local_ip_binding(), Some((0x7F00_0001, 27015)));

        client.release_user(pipe, user);
        assert!(client.release_steam_pipe(pipe));
        assert!(!client.release_steam_pipe(pipe));
        assert_eq!(steam.released_pipes(), 1);
        assert_eq!(steam.released_users(), 1);
    }
}
