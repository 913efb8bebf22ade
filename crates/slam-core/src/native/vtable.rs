//! Virtual call binder.
//!
//! The vendor interfaces are C++ objects whose first machine word points at
//! an array of function pointers. There is no header to link against, so each
//! wrapper declares a [`Slot`] table (index + signature) and calls through a
//! [`VirtualTable`] bound to the raw object pointer.
//!
//! Slot indices and signatures are a structural contract with the vendor
//! library version. Nothing here can verify them at runtime; a wrong entry is
//! undefined behavior at the native boundary.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use tracing::trace;

/// Address of a native interface object.
pub type InterfacePtr = NonNull<c_void>;

/// Function pointer type of a native member function.
///
/// The object pointer is always the first argument. 32-bit Windows uses the
/// MSVC `thiscall` convention; everywhere else the C convention already
/// passes `this` as the first argument.
#[cfg(all(target_arch = "x86", target_os = "windows"))]
macro_rules! member_fn {
    (fn($($arg:ty),* $(,)?) $(-> $ret:ty)?) => {
        unsafe extern "thiscall" fn(*mut ::std::ffi::c_void $(, $arg)*) $(-> $ret)?
    };
}

#[cfg(not(all(target_arch = "x86", target_os = "windows")))]
macro_rules! member_fn {
    (fn($($arg:ty),* $(,)?) $(-> $ret:ty)?) => {
        unsafe extern "C" fn(*mut ::std::ffi::c_void $(, $arg)*) $(-> $ret)?
    };
}

/// Defines Rust functions callable through a native virtual table.
///
/// Used by the in-process fake of the vendor library.
#[cfg(all(target_arch = "x86", target_os = "windows"))]
macro_rules! member_fns {
    ($($vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? $body:block)*) => {
        $($vis unsafe extern "thiscall" fn $name($($arg: $ty),*) $(-> $ret)? $body)*
    };
}

#[cfg(not(all(target_arch = "x86", target_os = "windows")))]
macro_rules! member_fns {
    ($($vis:vis fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)? $body:block)*) => {
        $($vis unsafe extern "C" fn $name($($arg: $ty),*) $(-> $ret)? $body)*
    };
}

pub(crate) use member_fn;
pub(crate) use member_fns;

/// One entry of a wrapper's slot table: where the function lives in the
/// virtual table and what signature it is called with.
pub struct Slot<F> {
    index: usize,
    name: &'static str,
    _signature: PhantomData<F>,
}

impl<F> Slot<F> {
    pub const fn new(index: usize, name: &'static str) -> Self {
        Self {
            index,
            name,
            _signature: PhantomData,
        }
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// A native object bound to its virtual table.
///
/// Converted function pointers are memoized per raw function pointer value,
/// so repeated calls through the same slot reuse the first conversion.
pub struct VirtualTable {
    object: InterfacePtr,
    table: *const *const c_void,
    cache: RefCell<HashMap<usize, Box<dyn Any>>>,
}

impl VirtualTable {
    /// Binds an object by reading its virtual table pointer.
    ///
    /// # Safety
    ///
    /// `object` must point at a live native object whose first machine word
    /// is a pointer to its virtual table, and must stay valid for as long as
    /// the returned value is used.
    pub unsafe fn bind(object: InterfacePtr) -> Self {
        // SAFETY: guaranteed by the caller; the first word of the object is
        // the virtual table pointer.
        let table = unsafe { *(object.as_ptr() as *const *const *const c_void) };
        Self {
            object,
            table,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The bound object pointer, passed as the first argument of every call.
    pub fn object(&self) -> *mut c_void {
        self.object.as_ptr()
    }

    pub fn address(&self) -> usize {
        self.object.as_ptr() as usize
    }

    /// Raw function pointer stored in the given slot.
    pub fn slot_pointer(&self, index: usize) -> *const c_void {
        // SAFETY: slot indices come from the wrapper's slot table, which
        // describes the vendor's layout for this interface version.
        unsafe { *self.table.add(index) }
    }

    /// Returns the callable for `slot`, converting and caching it on first use.
    pub fn function<F: Copy + 'static>(&self, slot: &Slot<F>) -> F {
        const {
            assert!(std::mem::size_of::<F>() == std::mem::size_of::<*const c_void>());
        }

        let pointer = self.slot_pointer(slot.index);
        let key = pointer as usize;
        let mut cache = self.cache.borrow_mut();

        if let Some(function) = cache.get(&key).and_then(|f| f.downcast_ref::<F>()) {
            return *function;
        }

        trace!(
            "Binding slot {} ({}) of object {:#x} to {:#x}",
            slot.index,
            slot.name,
            self.address(),
            key
        );
        // SAFETY: F is a function pointer type of pointer size (checked
        // above). Whether the signature matches the native function is the
        // slot table's contract.
        let function: F = unsafe { std::mem::transmute_copy(&pointer) };
        cache.insert(key, Box::new(function));
        function
    }

    /// Number of distinct function pointers converted so far.
    pub fn bound_count(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl fmt::Debug for VirtualTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTable")
            .field("object", &format_args!("{:#x}", self.address()))
            .field("table", &format_args!("{:#x}", self.table as usize))
            .finish()
    }
}
