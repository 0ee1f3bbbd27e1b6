// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except `platform::win32` (Win32 / COM
// FFI).  Each unsafe block in that module MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Per-user file association for Markdown_Z.
//!
//! At startup the host calls one entry point, which registers the app as a
//! `.md` handler, checks whether the shell already uses it as the default,
//! and otherwise offers once, ever, to open the OS "Default apps" settings.
//! No failure in here reaches the host.

pub mod association;
pub mod error;
pub mod platform;
