// ── Shell launch bindings ─────────────────────────────────────────────────────
//
// `ShellOpener` over `ShellExecuteW` and `AssociationUi` over the COM
// `IApplicationAssociationRegistrationUI` component.  Both are fire-and-forget:
// the only thing observed is whether the OS accepted the request.
//
// This is inside `platform::win32` so `unsafe` is permitted per crate policy.
// COM must already be initialised on the calling thread (see `window::run`).

#![allow(unsafe_code)]

use windows::{
    core::{w, GUID, PCWSTR},
    Win32::{
        Foundation::HWND,
        System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER},
        UI::{
            Shell::{IApplicationAssociationRegistrationUI, ShellExecuteW},
            WindowsAndMessaging::SW_SHOWNORMAL,
        },
    },
};

use super::to_wide;
use crate::{
    association::launcher::{AssociationUi, ShellOpener},
    error::{AssocError, Result},
};

/// CLSID of the ApplicationAssociationRegistrationUI coclass.
const CLSID_ASSOCIATION_UI: GUID = GUID::from_u128(0x1968106d_f3b5_44cf_890e_116fcb9ecef1);

/// `ShellExecuteW` reports success with any value greater than 32.
const SHELL_EXECUTE_OK: isize = 32;

pub struct ShellExecuteOpener;

impl ShellOpener for ShellExecuteOpener {
    fn open(&self, target: &str, args: Option<&str>) -> Result<()> {
        let file = to_wide(target);
        let params = args.map(to_wide);

        // SAFETY: `file` and `params` are null-terminated UTF-16 buffers that
        // outlive the call.  A null owner window is allowed.  ShellExecuteW
        // returns once the request is handed off; it does not wait on the
        // launched process.
        let result = unsafe {
            ShellExecuteW(
                HWND::default(),
                w!("open"),
                PCWSTR(file.as_ptr()),
                params.as_ref().map_or(PCWSTR::null(), |p| PCWSTR(p.as_ptr())),
                PCWSTR::null(),
                SW_SHOWNORMAL,
            )
        };

        let code = result.0 as isize;
        if code > SHELL_EXECUTE_OK {
            Ok(())
        } else {
            Err(AssocError::Win32 {
                function: "ShellExecuteW",
                code: code as u32,
            })
        }
    }
}

pub struct ComAssociationUi;

impl AssociationUi for ComAssociationUi {
    fn launch_advanced_association_ui(&self, app_name: &str) -> Result<i32> {
        // SAFETY: COM is initialised on this thread by `window::run`; the
        // CLSID names an in-process server shipped with Windows 7+.  Activation
        // failure comes back as an Err, never as a dangling interface.
        let ui: IApplicationAssociationRegistrationUI =
            unsafe { CoCreateInstance(&CLSID_ASSOCIATION_UI, None, CLSCTX_INPROC_SERVER) }?;

        let name = to_wide(app_name);
        // SAFETY: `name` is a null-terminated UTF-16 buffer alive for the call;
        // `ui` is a valid interface pointer released on drop.
        let status = match unsafe { ui.LaunchAdvancedAssociationUI(PCWSTR(name.as_ptr())) } {
            Ok(()) => 0,
            Err(e) => e.code().0,
        };
        Ok(status)
    }
}
