//! Native boundary: library loading, virtual call binding and string
//! marshaling.

pub mod library;
pub mod strings;
pub mod vtable;

#[doc(hidden)]
pub mod mock;

pub use library::{CallbackMsg, HSteamPipe, HSteamUser, NativeLibrary, SteamClientLibrary};
pub use vtable::{InterfacePtr, Slot, VirtualTable};
