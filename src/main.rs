// Release builds run as a GUI application (no console window).
// Debug builds keep the console so that log output is visible.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![deny(unsafe_code)]

fn main() {
    #[cfg(debug_assertions)]
    env_logger::init();

    #[cfg(windows)]
    let result = mdz_assoc::platform::win32::window::run();
    #[cfg(not(windows))]
    let result = mdz_assoc::platform::headless::run();

    // Association is a convenience; a failure here never changes how the
    // application starts or exits.
    if let Err(e) = result {
        log::warn!("file association setup failed: {e}");
    }
}
