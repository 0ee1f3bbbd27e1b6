// ── Default-apps launcher ─────────────────────────────────────────────────────
//
// An ordered chain of ways to open the OS "Default apps" surface, most
// specific first.  Each target is tried until one is accepted by the OS;
// acceptance is all we observe, never whether the user finished the flow.
//
//   1. Settings, scoped to the extension      (Windows 10/11)
//   2. Settings, scoped to the app by name    (Windows 11 22H2+)
//   3. Settings, "by file type" tab
//   4. Advanced Associations dialog via COM   (Windows 7/8)
//   5. Control Panel "Default Programs"

use log::{debug, warn};

use crate::error::Result;

/// Opens a URI or program through the shell without waiting on it.
pub trait ShellOpener {
    /// `Ok` once the shell accepted the request.
    fn open(&self, target: &str, args: Option<&str>) -> Result<()>;
}

/// The legacy per-file-type association dialog.
pub trait AssociationUi {
    /// Returns the component's status code; negative values are failures.
    /// `Err` means the component could not be activated at all.
    fn launch_advanced_association_ui(&self, app_name: &str) -> Result<i32>;
}

/// One entry in the launch chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    ExtensionSettings { extension: String },
    AppSettings { app_name: String },
    ByFileTypeTab,
    AdvancedAssociationUi { app_name: String },
    ControlPanel,
}

impl LaunchTarget {
    /// The chain in priority order.
    pub fn chain(app_name: &str, extension: &str) -> [LaunchTarget; 5] {
        [
            Self::ExtensionSettings {
                extension: extension.to_owned(),
            },
            Self::AppSettings {
                app_name: app_name.to_owned(),
            },
            Self::ByFileTypeTab,
            Self::AdvancedAssociationUi {
                app_name: app_name.to_owned(),
            },
            Self::ControlPanel,
        ]
    }

    /// What to hand the shell, or `None` for the COM dialog.
    pub fn shell_command(&self) -> Option<(String, Option<&'static str>)> {
        match self {
            Self::ExtensionSettings { extension } => {
                Some((format!("ms-settings:defaultapps?filetype={extension}"), None))
            }
            Self::AppSettings { app_name } => {
                Some((format!("ms-settings:defaultapps?name={app_name}"), None))
            }
            Self::ByFileTypeTab => Some(("ms-settings:defaultapps?activetab=byfiletype".to_owned(), None)),
            Self::AdvancedAssociationUi { .. } => None,
            Self::ControlPanel => Some((
                "control.exe".to_owned(),
                Some("/name Microsoft.DefaultPrograms /page pageDefaultProgram"),
            )),
        }
    }
}

pub struct UiLauncher {
    shell: Box<dyn ShellOpener>,
    association_ui: Box<dyn AssociationUi>,
}

impl UiLauncher {
    pub fn new(shell: Box<dyn ShellOpener>, association_ui: Box<dyn AssociationUi>) -> Self {
        Self {
            shell,
            association_ui,
        }
    }

    /// Try each target in order; `true` as soon as one is accepted, `false`
    /// once all have failed.  Never surfaces an error.
    pub fn launch_default_apps_surface(&self, app_name: &str, extension: &str) -> bool {
        for target in LaunchTarget::chain(app_name, extension) {
            match self.try_launch(&target) {
                Ok(()) => {
                    debug!("opened default-apps surface via {target:?}");
                    return true;
                }
                Err(reason) => debug!("{target:?} unavailable: {reason}"),
            }
        }
        warn!("no default-apps surface could be opened");
        false
    }

    fn try_launch(&self, target: &LaunchTarget) -> std::result::Result<(), String> {
        if let LaunchTarget::AdvancedAssociationUi { app_name } = target {
            return match self.association_ui.launch_advanced_association_ui(app_name) {
                Ok(status) if status >= 0 => Ok(()),
                Ok(status) => Err(format!("status {status:#010x}")),
                Err(e) => Err(e.to_string()),
            };
        }
        match target.shell_command() {
            Some((file, args)) => self.shell.open(&file, args).map_err(|e| e.to_string()),
            None => Err("no shell command".to_owned()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
