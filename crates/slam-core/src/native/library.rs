//! Native library handle.
//!
//! The vendor ships no header or import library, so the client library is
//! opened at runtime and its three C exports are resolved by name. Sessions
//! talk to it through the [`NativeLibrary`] trait, which lets tests swap in
//! an in-process fake.

use std::ffi::{c_char, c_void};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use libloading::Library;
use tracing::debug;

use crate::config::InstallLocator;
use crate::config::paths;
use crate::error::{Error, Result};
use crate::native::strings::to_native;
use crate::native::vtable::InterfacePtr;

/// Handle of a communication pipe. 0 is invalid.
pub type HSteamPipe = i32;

/// Handle of an attached local user. 0 is invalid.
pub type HSteamUser = i32;

/// One message drained from the native callback queue.
///
/// `param` points into storage owned by the native library; it stays valid
/// until the message is released with `free_last_callback`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CallbackMsg {
    pub user: HSteamUser,
    pub id: i32,
    pub param: *mut u8,
    pub param_size: i32,
}

impl Default for CallbackMsg {
    fn default() -> Self {
        Self {
            user: 0,
            id: 0,
            param: ptr::null_mut(),
            param_size: 0,
        }
    }
}

/// Trait for the process-wide vendor library.
///
/// At most one loaded instance should exist per process. Everything obtained
/// through it (interfaces, callback parameter pointers) becomes invalid once
/// it is unloaded.
pub trait NativeLibrary {
    /// Resolve the vendor install location from the configuration collaborator.
    fn install_path(&self) -> Option<PathBuf>;

    /// Load the library and resolve its exports. Idempotent.
    fn load(&mut self) -> Result<()>;

    /// Release the library and forget all exports. No-op when not loaded.
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    /// Mint an interface by version string. `None` when the library does not
    /// know the version (or is not loaded).
    fn create_interface(&self, version: &str) -> Option<InterfacePtr>;

    /// Poll the next pending callback message on `pipe`.
    fn get_callback(&self, pipe: HSteamPipe) -> Option<CallbackMsg>;

    /// Release the most recently polled message on `pipe`.
    fn free_last_callback(&self, pipe: HSteamPipe) -> bool;
}

type CreateInterfaceFn = unsafe extern "C" fn(*const c_char, *mut i32) -> *mut c_void;
type GetCallbackFn = unsafe extern "C" fn(HSteamPipe, *mut CallbackMsg, *mut i32) -> u8;
type FreeLastCallbackFn = unsafe extern "C" fn(HSteamPipe) -> u8;

const CREATE_INTERFACE: &str = "CreateInterface";
const GET_CALLBACK: &str = "Steam_BGetCallback";
const FREE_LAST_CALLBACK: &str = "Steam_FreeLastCallback";

#[derive(Clone, Copy)]
struct Exports {
    create_interface: CreateInterfaceFn,
    get_callback: GetCallbackFn,
    free_last_callback: FreeLastCallbackFn,
}

impl Exports {
    /// # Safety
    ///
    /// The declared export signatures must match the vendor library.
    unsafe fn resolve(library: &Library) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        unsafe {
            Ok(Self {
                create_interface: resolve_export(library, CREATE_INTERFACE)?,
                get_callback: resolve_export(library, GET_CALLBACK)?,
                free_last_callback: resolve_export(library, FREE_LAST_CALLBACK)?,
            })
        }
    }
}

unsafe fn resolve_export<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let symbol_name = format!("{}\0", name);
    // SAFETY: T is the declared signature of the export; the symbol is
    // copied out and only used while the library stays loaded.
    let symbol = unsafe { library.get::<T>(symbol_name.as_bytes()) }.map_err(|e| {
        debug!("Export {} not found: {}", name, e);
        Error::MissingExport(name)
    })?;
    Ok(*symbol)
}

struct LoadedModule {
    exports: Exports,
    path: PathBuf,
    // Dropped last, after nothing else refers to the exports.
    _library: Library,
}

/// The real vendor client library, opened from the Steam install directory.
pub struct SteamClientLibrary {
    locator: Box<dyn InstallLocator>,
    module: Option<LoadedModule>,
}

impl SteamClientLibrary {
    pub fn new(locator: impl InstallLocator + 'static) -> Self {
        Self {
            locator: Box::new(locator),
            module: None,
        }
    }

    /// Path of the loaded library file, if loaded.
    pub fn loaded_path(&self) -> Option<&Path> {
        self.module.as_ref().map(|m| m.path.as_path())
    }
}

impl NativeLibrary for SteamClientLibrary {
    fn install_path(&self) -> Option<PathBuf> {
        self.locator.install_path()
    }

    fn load(&mut self) -> Result<()> {
        if self.module.is_some() {
            return Ok(());
        }

        let install = self.install_path().ok_or(Error::InstallPathNotFound)?;
        let path = install.join(paths::library_relative_path());
        debug!("Loading Steam client library from {}", path.display());

        let library = open_library(&install, &path)?;
        // SAFETY: the export signatures are the vendor's documented C ABI.
        let exports = unsafe { Exports::resolve(&library) }?;

        self.module = Some(LoadedModule {
            exports,
            path,
            _library: library,
        });
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(module) = self.module.take() {
            debug!("Unloading Steam client library {}", module.path.display());
        }
    }

    fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    fn create_interface(&self, version: &str) -> Option<InterfacePtr> {
        let module = self.module.as_ref()?;
        let version = to_native(version)?;
        // SAFETY: the library is loaded; the version buffer outlives the call
        // and the return code slot is allowed to be null.
        let pointer =
            unsafe { (module.exports.create_interface)(version.as_ptr(), ptr::null_mut()) };
        NonNull::new(pointer)
    }

    fn get_callback(&self, pipe: HSteamPipe) -> Option<CallbackMsg> {
        let module = self.module.as_ref()?;
        let mut message = CallbackMsg::default();
        let mut call = 0;
        // SAFETY: the library is loaded and both out-parameters are valid.
        let available = unsafe { (module.exports.get_callback)(pipe, &mut message, &mut call) };
        (available != 0).then_some(message)
    }

    fn free_last_callback(&self, pipe: HSteamPipe) -> bool {
        match self.module.as_ref() {
            // SAFETY: the library is loaded.
            Some(module) => unsafe { (module.exports.free_last_callback)(pipe) != 0 },
            None => false,
        }
    }
}

#[cfg(target_os = "windows")]
fn open_library(install: &Path, path: &Path) -> Result<Library> {
    use std::os::windows::ffi::OsStrExt;

    use libloading::os::windows::{LOAD_WITH_ALTERED_SEARCH_PATH, Library as WindowsLibrary};
    use windows::Win32::System::LibraryLoader::SetDllDirectoryW;
    use windows::core::PCWSTR;

    // The client library pulls in siblings from the install root and bin/.
    let search = format!("{};{}", install.display(), install.join("bin").display());
    let wide: Vec<u16> = std::ffi::OsStr::new(&search)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    // SAFETY: `wide` is a null-terminated UTF-16 buffer alive for the call.
    if let Err(e) = unsafe { SetDllDirectoryW(PCWSTR(wide.as_ptr())) } {
        tracing::warn!("SetDllDirectoryW failed: {}", e);
    }

    // SAFETY: loading the vendor library runs its initializers; there is no
    // way to load it without trusting them.
    let library = unsafe { WindowsLibrary::load_with_flags(path, LOAD_WITH_ALTERED_SEARCH_PATH) }
        .map_err(|e| Error::LibraryLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(library.into())
}

#[cfg(not(target_os = "windows"))]
fn open_library(_install: &Path, path: &Path) -> Result<Library> {
    // SAFETY: see the Windows variant.
    unsafe { Library::new(path) }.map_err(|e| Error::LibraryLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
