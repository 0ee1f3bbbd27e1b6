// ── File association core ─────────────────────────────────────────────────────
//
// Registers the application as a per-user handler for its document extension,
// checks whether the shell currently treats it as the default, and offers the
// user (once, ever) a way to change that.  Pure Rust; every OS touch point is
// behind a trait so the whole sequence runs against an in-memory store in
// tests.
//
// Dependency order (leaves first):
//   store → registrar, detect, gate → launcher → orchestrator

use std::path::Path;

use crate::error::{AssocError, Result};

pub mod detect;
pub mod gate;
pub mod launcher;
pub mod orchestrator;
pub mod prompt;
pub mod registrar;
pub mod store;

#[cfg(test)]
pub(crate) mod fakes;

// ── Well-known store paths (relative to the per-user hive) ────────────────────

/// The per-user classes namespace.
pub const CLASSES_ROOT: &str = r"Software\Classes";

/// Apps listed here appear on the centralized "Default apps" page.
pub const REGISTERED_APPLICATIONS: &str = r"Software\RegisteredApplications";

/// Explorer's per-extension state, including the `UserChoice` override.
pub const FILE_EXTS: &str = r"Software\Microsoft\Windows\CurrentVersion\Explorer\FileExts";

/// Name of the DWORD under the app root that records a shown prompt.
pub const ASKED_VALUE: &str = "AskedDefault";

/// The unnamed ("default") value of a key.
pub const DEFAULT_VALUE: &str = "";

// ── Identity ──────────────────────────────────────────────────────────────────

/// Compile-time identity of the application as the shell sees it.
///
/// `prog_id` must stay the same across releases: re-registration overwrites
/// records under it rather than adding new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub prog_id: String,
    /// Name under `RegisteredApplications`; also passed to the settings
    /// deep-link and the legacy association dialog.
    pub app_name: String,
    /// Application-private key, e.g. `Software\Markdown_Z`.
    pub app_root: String,
    /// Extension including the leading dot.
    pub extension: String,
    pub display_name: String,
    pub description: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            prog_id: "Markdown_Z.md".to_owned(),
            app_name: "Markdown_Z".to_owned(),
            app_root: r"Software\Markdown_Z".to_owned(),
            extension: ".md".to_owned(),
            display_name: "Markdown_Z Markdown Document".to_owned(),
            description: "View and edit .md files".to_owned(),
        }
    }
}

impl AppIdentity {
    pub(crate) fn prog_id_key(&self) -> String {
        format!(r"{CLASSES_ROOT}\{}", self.prog_id)
    }

    pub(crate) fn capabilities_key(&self) -> String {
        format!(r"{}\Capabilities", self.app_root)
    }
}

pub(crate) fn extension_key(extension: &str) -> String {
    format!(r"{CLASSES_ROOT}\{extension}")
}

pub(crate) fn user_choice_key(extension: &str) -> String {
    format!(r"{FILE_EXTS}\{extension}\UserChoice")
}

// ── AssociationRecord ─────────────────────────────────────────────────────────

/// Everything the registrar writes, derived from the identity and the path of
/// the running executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRecord {
    pub identity: AppIdentity,
    /// Icon reference in shell syntax: `"<exe>",0`.
    pub icon: String,
    /// Open command with the target substituted for `%1`: `"<exe>" "%1"`.
    pub open_command: String,
    /// Bare file name of the executable, the key under `Applications`.
    pub exe_name: String,
}

impl AssociationRecord {
    /// Build the record for `exe`.
    ///
    /// Fails with `MissingExecutable` unless `exe` names an existing file;
    /// command templates pointing nowhere would break "Open with".
    pub fn for_executable(identity: &AppIdentity, exe: &Path) -> Result<Self> {
        if !exe.is_file() {
            return Err(AssocError::MissingExecutable(exe.to_path_buf()));
        }
        let exe_name = exe
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AssocError::MissingExecutable(exe.to_path_buf()))?;
        let quoted = format!("\"{}\"", exe.display());

        Ok(Self {
            identity: identity.clone(),
            icon: format!("{quoted},0"),
            open_command: format!("{quoted} \"%1\""),
            exe_name,
        })
    }
}

/// Case-insensitive comparison of two shell identifiers.
pub(crate) fn same_identifier(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
