//! Callback pump and the typed callback parameter shapes.
//!
//! Asynchronous native replies are queued by the vendor library per pipe.
//! [`CallbackPump::run`] drains that queue, fans each message out to the
//! listeners registered for its id and scope, and releases the native
//! storage of every drained message exactly once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use tracing::{trace, warn};

use crate::bytes::ByteBuffer;
use crate::error::{Error, Result};
use crate::native::library::{CallbackMsg, HSteamPipe, NativeLibrary};

/// Result code the vendor uses for success.
pub const RESULT_OK: i32 = 1;

/// A callback parameter shape, decoded from the packed little-endian block.
pub trait Callback: Sized {
    /// Numeric id the vendor tags the message with.
    const ID: i32;
    /// Whether the callback belongs to the server scope.
    const IS_SERVER: bool = false;
    /// Size of the packed parameter block.
    const SIZE: usize;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self>;

    /// Decode a raw parameter block, refusing blocks shorter than [`Self::SIZE`].
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::CallbackParamTooShort {
                id: Self::ID,
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Self::decode(&mut ByteBuffer::new(bytes))
    }
}

/// App metadata changed, e.g. after a license update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppDataChanged {
    pub app_id: u32,
    pub result: bool,
}

impl Callback for AppDataChanged {
    const ID: i32 = 1001;
    const SIZE: usize = 5;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            app_id: buffer.read_u32()?,
            result: buffer.read_bool()?,
        })
    }
}

/// Reply to a stats request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStatsReceived {
    pub game_id: u64,
    pub result: i32,
    pub steam_id: u64,
}

impl UserStatsReceived {
    pub fn succeeded(&self) -> bool {
        self.result == RESULT_OK
    }
}

impl Callback for UserStatsReceived {
    const ID: i32 = 1101;
    const SIZE: usize = 20;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            game_id: buffer.read_u64()?,
            result: buffer.read_i32()?,
            steam_id: buffer.read_u64()?,
        })
    }
}

/// Reply to `StoreStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStatsStored {
    pub game_id: u64,
    pub result: i32,
}

impl UserStatsStored {
    pub fn succeeded(&self) -> bool {
        self.result == RESULT_OK
    }
}

impl Callback for UserStatsStored {
    const ID: i32 = 1102;
    const SIZE: usize = 12;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            game_id: buffer.read_u64()?,
            result: buffer.read_i32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserItemsReceived {
    pub game_id: u64,
    pub unknown: i32,
    pub item_count: i32,
}

impl Callback for UserItemsReceived {
    const ID: i32 = 1201;
    const SIZE: usize = 16;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            game_id: buffer.read_u64()?,
            unknown: buffer.read_i32()?,
            item_count: buffer.read_i32()?,
        })
    }
}

/// Callback id of the global achievement percentages reply.
pub const GLOBAL_PERCENTAGES_READY: i32 = 1110;

/// Reply to a global achievement percentages request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalPercentagesReady {
    pub game_id: u64,
    pub result: i32,
}

impl GlobalPercentagesReady {
    pub fn succeeded(&self) -> bool {
        self.result == RESULT_OK
    }
}

impl Callback for GlobalPercentagesReady {
    const ID: i32 = GLOBAL_PERCENTAGES_READY;
    const SIZE: usize = 12;

    fn decode(buffer: &mut ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            game_id: buffer.read_u64()?,
            result: buffer.read_i32()?,
        })
    }
}

type Handler = Box<dyn FnMut(&[u8])>;

/// Handle to a registered listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    token: ListenerId,
    id: i32,
    server: bool,
    handler: RefCell<Handler>,
}

/// Dispatches drained native messages to registered listeners.
///
/// Single threaded. A nested [`run`](Self::run) from inside a listener is a
/// no-op, so listeners can never re-drain the queue mid-dispatch.
#[derive(Default)]
pub struct CallbackPump {
    running: Cell<bool>,
    next_token: Cell<u64>,
    listeners: RefCell<Vec<Rc<Listener>>>,
}

impl fmt::Debug for CallbackPump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPump")
            .field("running", &self.running.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl CallbackPump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener over the raw parameter block of `id`.
    pub fn register_raw(
        &self,
        id: i32,
        server: bool,
        handler: impl FnMut(&[u8]) + 'static,
    ) -> ListenerId {
        let token = ListenerId(self.next_token.get());
        self.next_token.set(token.0 + 1);
        trace!("Registering listener for callback {} (server: {})", id, server);
        self.listeners.borrow_mut().push(Rc::new(Listener {
            token,
            id,
            server,
            handler: RefCell::new(Box::new(handler)),
        }));
        token
    }

    /// Register a listener for a typed callback. Blocks that fail to decode
    /// are logged and skip this listener.
    pub fn register<C: Callback + 'static>(&self, mut handler: impl FnMut(C) + 'static) -> ListenerId {
        self.register_raw(C::ID, C::IS_SERVER, move |bytes| {
            match C::from_bytes(bytes) {
                Ok(param) => handler(param),
                Err(e) => warn!("Skipping listener for callback {}: {}", C::ID, e),
            }
        })
    }

    /// Remove a listener. Returns false when it was already removed.
    ///
    /// A dispatch already in progress still reaches the listener for the
    /// current message.
    pub fn unregister(&self, listener: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.token != listener);
        before != listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Drain every pending message on `pipe`, dispatching those whose scope
    /// matches `server`. Returns the number of messages drained.
    pub fn run<L: NativeLibrary + ?Sized>(&self, library: &L, pipe: HSteamPipe, server: bool) -> usize {
        if self.running.replace(true) {
            trace!("Callback pump already running, ignoring nested run");
            return 0;
        }
        let _running = RunningGuard(&self.running);

        let mut drained = 0;
        while let Some(message) = library.get_callback(pipe) {
            let _release = Release { library, pipe };
            drained += 1;
            self.dispatch(&message, server);
        }
        drained
    }

    fn dispatch(&self, message: &CallbackMsg, server: bool) {
        // Snapshot so listeners may register more listeners while running.
        let listeners: Vec<Rc<Listener>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.id == message.id && l.server == server)
            .cloned()
            .collect();

        trace!(
            "Callback {} ({} bytes) -> {} listener(s)",
            message.id,
            message.param_size,
            listeners.len()
        );
        if listeners.is_empty() {
            return;
        }

        // SAFETY: the message was just polled and is released only after
        // dispatch returns.
        let param = unsafe { param_bytes(message) };
        for listener in listeners {
            let mut handler = listener.handler.borrow_mut();
            (&mut **handler)(param);
        }
    }
}

/// # Safety
///
/// `message` must be polled and not yet released; the slice must not be used
/// after it is released.
unsafe fn param_bytes<'a>(message: &CallbackMsg) -> &'a [u8] {
    if message.param.is_null() || message.param_size <= 0 {
        return &[];
    }
    // SAFETY: guaranteed by the caller.
    unsafe { std::slice::from_raw_parts(message.param, message.param_size as usize) }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Frees the polled message even when a listener panics.
struct Release<'a, L: NativeLibrary + ?Sized> {
    library: &'a L,
    pipe: HSteamPipe,
}

impl<L: NativeLibrary + ?Sized> Drop for Release<'_, L> {
    fn drop(&mut self) {
        if !self.library.free_last_callback(self.pipe) {
            warn!("Failed to free callback message on pipe {}", self.pipe);
        }
    }
}
