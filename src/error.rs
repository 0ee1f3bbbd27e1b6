// ── Central error type ────────────────────────────────────────────────────────
//
// Every store and launch primitive returns `error::Result<T>`.  Errors never
// leave the association subsystem: each component logs and drops them at its
// own boundary (see `association::orchestrator`).

use std::path::PathBuf;

use thiserror::Error;

/// Every error the association subsystem can produce.
#[derive(Debug, Error)]
pub enum AssocError {
    /// A Win32 or COM call returned a failure code.
    #[error("{function} failed (error {code:#010x})")]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code or HRESULT bits.
        code: u32,
    },

    /// A standard I/O error.  `winreg` reports registry failures this way.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON-backed store or an identity override could not be parsed.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The executable that command templates point at does not exist.
    #[error("executable not found: {}", .0.display())]
    MissingExecutable(PathBuf),

    /// The requested OS surface does not exist on this host.
    #[error("{0} is not available on this platform")]
    Unsupported(&'static str),

    /// The store refused an operation on `path`.
    #[error("store rejected {path}: {reason}")]
    Store { path: String, reason: &'static str },
}

// Lets `?` work on `windows::core::Result<T>` inside `platform::win32`.
#[cfg(windows)]
impl From<windows::core::Error> for AssocError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssocError>;
