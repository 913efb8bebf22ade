use std::path::PathBuf;

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::session::SessionState;

/// Step of client initialization that failed.
///
/// Each kind maps to a different recovery hint for the user, so they are
/// never collapsed into a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum InitFailure {
    Unknown,
    GetInstallPath,
    Load,
    CreateSteamClient,
    CreateSteamPipe,
    ConnectToGlobalUser,
    AppIdMismatch,
    GetInterface,
}

impl InitFailure {
    /// Actionable message shown to the user for this failure kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unknown => "Steam client initialization failed for an unknown reason.",
            Self::GetInstallPath => {
                "Could not find the Steam install location. Is Steam installed? \
                 Set `steam_path` in the config file to point at it."
            }
            Self::Load => {
                "Could not load the Steam client library. Make sure the Steam \
                 installation is complete and matches this program's architecture."
            }
            Self::CreateSteamClient => {
                "The Steam client library does not provide the expected client \
                 interface. Steam may have been updated; update this program."
            }
            Self::CreateSteamPipe => "Could not talk to Steam. Make sure Steam is running.",
            Self::ConnectToGlobalUser => {
                "Could not attach to the logged in Steam user. Make sure you are \
                 logged in to Steam."
            }
            Self::AppIdMismatch => {
                "Steam reported a different running app. Close other tools that \
                 use the Steam client and try again."
            }
            Self::GetInterface => {
                "Steam refused one of the required interfaces. Steam may have been \
                 updated; update this program."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Steam client initialization failed ({failure}): {message}")]
    Initialize {
        failure: InitFailure,
        message: String,
    },

    #[error("Steam install path not found")]
    InstallPathNotFound,

    #[error("Failed to load {path}: {message}")]
    LibraryLoad { path: PathBuf, message: String },

    #[error("Required export not found: {0}")]
    MissingExport(&'static str),

    #[error("Session is not ready (state: {0})")]
    SessionNotReady(SessionState),

    #[error("Unknown KeyValue type {tag} at position {position}")]
    UnknownKeyValueType { tag: u8, position: usize },

    #[error("Malformed data at position {position}: {message}")]
    MalformedData { position: usize, message: String },

    #[error("Schema has no stats section for app {0}")]
    MissingSchemaStats(u32),

    #[error("Invalid app info magic: {0:#010x}")]
    InvalidAppInfoMagic(u32),

    #[error("Callback {id} parameter too short: expected {expected} bytes, got {actual}")]
    CallbackParamTooShort {
        id: i32,
        expected: usize,
        actual: usize,
    },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn initialize(failure: InitFailure, message: impl Into<String>) -> Self {
        Error::Initialize {
            failure,
            message: message.into(),
        }
    }

    /// The initialization step that failed, if this is a setup fault.
    pub fn init_failure(&self) -> Option<InitFailure> {
        match self {
            Error::Initialize { failure, .. } => Some(*failure),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
