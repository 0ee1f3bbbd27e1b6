// ── Registrar ─────────────────────────────────────────────────────────────────
//
// Writes the records that make the application an "Open with" candidate and a
// default-capable handler.  Runs on every startup: each write overwrites the
// previous one under the same ProgId, so repeated runs converge on one state.
//
// Record groups are written independently; a failure in one is logged and the
// next group is still attempted.

use std::path::Path;

use log::{debug, warn};

use super::{
    store::{RegValue, RegistrationStore},
    AppIdentity, AssociationRecord, CLASSES_ROOT, DEFAULT_VALUE, REGISTERED_APPLICATIONS,
};
use crate::error::Result;

/// One independently attempted block of writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordGroup {
    /// `Classes\<ProgId>`: display name, icon, open command.
    ProgId,
    /// `Classes\Applications\<exe>\shell\open\command`.
    ApplicationsAlias,
    /// `Classes\<ext>\OpenWithProgids`.
    OpenWith,
    /// `<AppRoot>\Capabilities` and its `FileAssociations`.
    Capabilities,
    /// Pointer under `RegisteredApplications`.
    RegisteredApplications,
}

impl RecordGroup {
    pub const ALL: [RecordGroup; 5] = [
        Self::ProgId,
        Self::ApplicationsAlias,
        Self::OpenWith,
        Self::Capabilities,
        Self::RegisteredApplications,
    ];
}

/// What `register` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The executable path did not resolve to a file; nothing was written.
    Skipped,
    /// Every group was attempted; `failed` lists the ones that did not stick.
    Completed { failed: Vec<RecordGroup> },
}

/// Write every record group for `exe`.  Never fails.
pub fn register(store: &dyn RegistrationStore, identity: &AppIdentity, exe: &Path) -> Registration {
    let record = match AssociationRecord::for_executable(identity, exe) {
        Ok(r) => r,
        Err(e) => {
            debug!("registration skipped: {e}");
            return Registration::Skipped;
        }
    };

    let failed = RecordGroup::ALL
        .into_iter()
        .filter(|&group| match write_group(store, &record, group) {
            Ok(()) => {
                debug!("registered {group:?}");
                false
            }
            Err(e) => {
                warn!("failed to register {group:?}: {e}");
                true
            }
        })
        .collect();

    Registration::Completed { failed }
}

fn write_group(store: &dyn RegistrationStore, record: &AssociationRecord, group: RecordGroup) -> Result<()> {
    let id = &record.identity;
    let command = RegValue::String(record.open_command.clone());
    let icon = RegValue::String(record.icon.clone());

    match group {
        RecordGroup::ProgId => {
            let key = id.prog_id_key();
            store.set_value(&key, DEFAULT_VALUE, &RegValue::String(id.display_name.clone()))?;
            store.set_value(&format!(r"{key}\DefaultIcon"), DEFAULT_VALUE, &icon)?;
            store.set_value(&format!(r"{key}\shell\open\command"), DEFAULT_VALUE, &command)
        }

        RecordGroup::ApplicationsAlias => {
            let key = format!(r"{CLASSES_ROOT}\Applications\{}\shell\open\command", record.exe_name);
            store.set_value(&key, DEFAULT_VALUE, &command)
        }

        RecordGroup::OpenWith => {
            let key = format!(r"{CLASSES_ROOT}\{}\OpenWithProgids", id.extension);
            // Zero-length REG_NONE is the conventional marker; an empty
            // string is accepted by the shell where REG_NONE is refused.
            store
                .set_value(&key, &id.prog_id, &RegValue::Empty)
                .or_else(|_| store.set_value(&key, &id.prog_id, &RegValue::String(String::new())))
        }

        RecordGroup::Capabilities => {
            let caps = id.capabilities_key();
            store.set_value(&caps, "ApplicationName", &RegValue::String(id.app_name.clone()))?;
            store.set_value(
                &caps,
                "ApplicationDescription",
                &RegValue::String(id.description.clone()),
            )?;
            store.set_value(&caps, "ApplicationIcon", &icon)?;
            store.set_value(
                &format!(r"{caps}\FileAssociations"),
                &id.extension,
                &RegValue::String(id.prog_id.clone()),
            )
        }

        RecordGroup::RegisteredApplications => store.set_value(
            REGISTERED_APPLICATIONS,
            &id.app_name,
            &RegValue::String(id.capabilities_key()),
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
