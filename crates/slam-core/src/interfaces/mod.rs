//! Typed wrappers over the vendor's versioned native interfaces.
//!
//! Each wrapper binds one interface version: its `slots` module is the
//! virtual table layout for that version and its methods marshal strings,
//! out-parameters and native booleans. A native call that "fails" returns
//! `false` / `None`; that is an expected outcome, not an error.

pub mod apps;
pub mod client;
pub mod user;
pub mod user_stats;
pub mod utils;

pub use apps::{SteamApps001, SteamApps008};
pub use client::{AccountType, SteamClient018};
pub use user::SteamUser012;
pub use user_stats::{AchievementState, SteamUserStats013};
pub use utils::SteamUtils005;

use crate::native::library::NativeLibrary;
use crate::native::vtable::InterfacePtr;

/// A native interface version this crate knows the layout of.
pub trait Interface: Sized {
    /// Version string the native factory recognizes.
    const VERSION: &'static str;

    /// Wrap a raw interface pointer.
    ///
    /// # Safety
    ///
    /// `object` must be a live object implementing exactly [`Self::VERSION`],
    /// and must outlive the wrapper.
    unsafe fn from_raw(object: InterfacePtr) -> Self;
}

/// Handle of an asynchronous native request. 0 is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallHandle(pub u64);

impl CallHandle {
    pub const INVALID: CallHandle = CallHandle(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Create a top-level interface through the library's factory export.
///
/// Returns `None` when the library does not recognize the version.
pub fn create_interface<T: Interface, L: NativeLibrary + ?Sized>(library: &L) -> Option<T> {
    let object = library.create_interface(T::VERSION)?;
    // SAFETY: the factory returned an object for exactly T::VERSION; it lives
    // as long as the library stays loaded.
    Some(unsafe { T::from_raw(object) })
}

/// Declares a wrapper struct bound to one interface version.
macro_rules! native_interface {
    ($(#[$meta:meta])* $name:ident, $version:literal) => {
        $(#[$meta])*
        pub struct $name {
            vtable: $crate::native::vtable::VirtualTable,
        }

        impl $crate::interfaces::Interface for $name {
            const VERSION: &'static str = $version;

            unsafe fn from_raw(object: $crate::native::vtable::InterfacePtr) -> Self {
                Self {
                    // SAFETY: forwarded from the caller.
                    vtable: unsafe { $crate::native::vtable::VirtualTable::bind(object) },
                }
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(
                    f,
                    "Steam Interface<{}> #{:08X}",
                    stringify!($name),
                    self.vtable.address()
                )
            }
        }
    };
}

pub(crate) use native_interface;
