// ── Win32 platform implementation ─────────────────────────────────────────────
//
// The only module tree in the crate where `unsafe` code is permitted.  Every
// `unsafe` block MUST carry a `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// Nothing in this module is `pub` beyond what callers genuinely need; keep the
// unsafe surface as small as possible.

#![allow(unsafe_code)]

// ── Sub-modules ───────────────────────────────────────────────────────────────

pub mod registry; // HKCU-backed RegistrationStore
pub mod shell; // ShellExecuteW + COM association dialog
pub mod window; // message-only window, UI scheduler, prompt, message loop

/// Null-terminated UTF-16 copy of `s` for `PCWSTR` parameters.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
