// ── UI thread plumbing ────────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined here):
//   • Initialise COM (apartment-threaded) for the shell and COM launch paths.
//   • Register and create a message-only window that owns the UI queue.
//   • Implement `UiScheduler` by queueing tasks and posting `WM_APP_RUN`.
//   • Show the Yes/No prompt with MessageBoxW.
//   • Run the message loop until scheduled work is done.

#![allow(unsafe_code)]

use std::{cell::RefCell, collections::VecDeque};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
        Globalization::GetUserDefaultUILanguage,
        System::{
            Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED},
            LibraryLoader::GetModuleHandleW,
        },
        UI::WindowsAndMessaging::{
            CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
            MessageBoxW, PostMessageW, RegisterClassExW, TranslateMessage,
            HWND_MESSAGE, IDYES, MB_ICONQUESTION, MB_YESNO, MSG, HMENU, WINDOW_EX_STYLE,
            WINDOW_STYLE, WM_APP, WNDCLASSEXW,
        },
    },
};

use super::{
    registry::RegistryStore,
    shell::{ComAssociationUi, ShellExecuteOpener},
    to_wide,
};
use crate::{
    association::{
        launcher::UiLauncher,
        orchestrator::{Orchestrator, UiScheduler, UiTask},
        prompt::{Prompt, PromptText},
        AppIdentity,
    },
    error::{AssocError, Result},
};

// ── Window identity ───────────────────────────────────────────────────────────

/// Atom name used to register the message-only window class.
const CLASS_NAME: PCWSTR = w!("MarkdownZAssociationQueue");

/// Posted to the queue window whenever a task is enqueued.
const WM_APP_RUN: u32 = WM_APP + 1;

/// Primary language id of Chinese in a LANGID.
const LANG_CHINESE: u16 = 0x04;

thread_local! {
    // Tasks belong to the UI thread; only `wnd_proc` on that thread drains it.
    static PENDING: RefCell<VecDeque<UiTask>> = RefCell::new(VecDeque::new());
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Run the startup association sequence with the real OS bindings and pump
/// messages until the prompt (if any) has been answered.
pub fn run() -> Result<()> {
    // Startup timing, debug builds only.
    #[cfg(debug_assertions)]
    let t0 = std::time::Instant::now();

    let _com = ComApartment::init()?;
    let hwnd = create_queue_window()?;

    let identity = AppIdentity::default();
    let store = RegistryStore::current_user();
    let scheduler = WindowScheduler { hwnd };
    let launcher = UiLauncher::new(Box::new(ShellExecuteOpener), Box::new(ComAssociationUi));
    let text = PromptText::localized(&identity, ui_language());

    let phases = Orchestrator::new(&identity, &store, Box::new(MessageBoxPrompt), launcher)
        .with_prompt_text(text)
        .run(&scheduler);

    #[cfg(debug_assertions)]
    log::debug!(
        "association startup finished in {:.1} ms ({:?})",
        t0.elapsed().as_secs_f64() * 1000.0,
        phases.current()
    );

    // Pump only while the prompt task is outstanding.  The loop is left from
    // here, never from a queued task: the MessageBox modal loop dispatches
    // this thread's messages too and would run such a task mid-dialog.
    pump_until(|| phases.current().is_done())?;

    // SAFETY: hwnd is our own window, created on this thread above.
    unsafe { DestroyWindow(hwnd) }.map_err(AssocError::from)?;
    Ok(())
}

/// The OS UI language as a BCP 47 primary tag (`"zh"` or `"en"`).
fn ui_language() -> &'static str {
    // SAFETY: GetUserDefaultUILanguage takes no arguments and cannot fail.
    let langid = unsafe { GetUserDefaultUILanguage() };
    if langid & 0x3FF == LANG_CHINESE {
        "zh"
    } else {
        "en"
    }
}

// ── COM apartment ─────────────────────────────────────────────────────────────

/// RAII guard: `CoUninitialize` on drop, balancing a successful init.
struct ComApartment;

impl ComApartment {
    fn init() -> Result<Self> {
        // SAFETY: first COM call on this thread; balanced by Drop below.
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok()?;
        Ok(Self)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        // SAFETY: paired with the successful CoInitializeEx in `init`, on the
        // same thread; all COM interfaces are released by now.
        unsafe { CoUninitialize() };
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

struct WindowScheduler {
    hwnd: HWND,
}

impl UiScheduler for WindowScheduler {
    fn schedule(&self, task: UiTask) -> Result<()> {
        PENDING.with(|q| q.borrow_mut().push_back(task));
        // SAFETY: hwnd is the queue window owned by this thread; PostMessageW
        // only enqueues and returns immediately.
        let posted = unsafe { PostMessageW(self.hwnd, WM_APP_RUN, WPARAM(0), LPARAM(0)) };
        if let Err(e) = posted {
            // Nothing will wake the queue for it; take it back.
            PENDING.with(|q| q.borrow_mut().pop_back());
            return Err(e.into());
        }
        Ok(())
    }
}

fn drain_pending() {
    loop {
        // Release the borrow before running: a task may schedule more.
        let next = PENDING.with(|q| q.borrow_mut().pop_front());
        match next {
            Some(task) => task(),
            None => break,
        }
    }
}

// ── Prompt ────────────────────────────────────────────────────────────────────

struct MessageBoxPrompt;

impl Prompt for MessageBoxPrompt {
    fn confirm(&self, text: &PromptText) -> bool {
        let body = to_wide(&text.body);
        let title = to_wide(&text.title);

        // SAFETY: body and title are valid null-terminated UTF-16 strings that
        // remain allocated for the duration of the MessageBoxW call.
        // HWND::default() (null) means the dialog has no owner window.
        let answer = unsafe {
            MessageBoxW(
                HWND::default(),
                PCWSTR(body.as_ptr()),
                PCWSTR(title.as_ptr()),
                MB_YESNO | MB_ICONQUESTION,
            )
        };
        answer == IDYES
    }
}

// ── Window creation ───────────────────────────────────────────────────────────

fn create_queue_window() -> Result<HWND> {
    // SAFETY: GetModuleHandleW(None) returns the .exe's own HMODULE, which is
    // always valid for the process lifetime.
    let hmodule = unsafe { GetModuleHandleW(None) }.map_err(AssocError::from)?;
    let hinstance = HINSTANCE(hmodule.0);

    let wndclass = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        lpfnWndProc: Some(wnd_proc),
        hInstance: hinstance,
        lpszClassName: CLASS_NAME,
        ..Default::default()
    };

    // SAFETY: wndclass is initialised with a valid instance and a static
    // null-terminated class name.
    let atom = unsafe { RegisterClassExW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassExW"));
    }

    // SAFETY: CLASS_NAME was just registered; HWND_MESSAGE as parent makes a
    // message-only window (never shown, no taskbar entry).
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            CLASS_NAME,
            PCWSTR::null(),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            HWND_MESSAGE,
            HMENU::default(),
            hinstance,
            None,
        )
    }
    .map_err(AssocError::from)?;

    Ok(hwnd)
}

// ── Message loop ──────────────────────────────────────────────────────────────

/// Dispatch messages until `done()` holds, checked before blocking and after
/// every dispatched message.  Returns at once when there is nothing to wait
/// for.
fn pump_until(done: impl Fn() -> bool) -> Result<()> {
    let mut msg = MSG::default();

    while !done() {
        // SAFETY: &mut msg is a valid MSG pointer; HWND::default() retrieves
        // messages for all windows on this thread; 0,0 filter accepts all.
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        match ret.0 {
            -1 => return Err(last_error("GetMessageW")),
            // WM_QUIT
            0 => break,
            _ => unsafe {
                // SAFETY: msg was populated by a successful GetMessageW call.
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            },
        }
    }

    Ok(())
}

// ── Window procedure ──────────────────────────────────────────────────────────

// SAFETY: wnd_proc is registered as lpfnWndProc in WNDCLASSEXW.
// Windows guarantees that hwnd, msg, wparam, and lparam are valid for the
// lifetime of this call.
unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_APP_RUN => {
            // Tasks catch their own panics; nothing unwinds across this frame.
            drain_pending();
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

// ── Error helpers ─────────────────────────────────────────────────────────────

/// Capture the current Win32 last-error code and wrap it in an `AssocError`.
///
/// Call immediately after the failing Win32 function; `GetLastError` reads
/// thread-local state that any later API call may overwrite.
fn last_error(function: &'static str) -> AssocError {
    // SAFETY: GetLastError reads thread-local state set by the last Win32 call.
    let code = unsafe { windows::Win32::Foundation::GetLastError() };
    AssocError::Win32 {
        function,
        code: code.0,
    }
}
