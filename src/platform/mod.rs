// ── Platform bindings ─────────────────────────────────────────────────────────
//
// Concrete implementations of the association seams.  No `unsafe` lives here;
// all Win32 FFI is confined to the `win32` sub-module and never leaks outward.

pub mod headless;
pub mod json_store;

#[cfg(windows)]
pub mod win32;
