// ── Prompt gate ───────────────────────────────────────────────────────────────
//
// A single persistent DWORD under the app root records that the user has been
// offered the default-app change.  It is set just before the prompt is shown
// and never cleared, so the offer happens at most once whatever the answer.

use log::warn;

use super::{
    store::{RegValue, RegistrationStore},
    ASKED_VALUE,
};

pub struct PromptGate<'a> {
    store: &'a dyn RegistrationStore,
    app_root: &'a str,
}

impl<'a> PromptGate<'a> {
    pub fn new(store: &'a dyn RegistrationStore, app_root: &'a str) -> Self {
        Self { store, app_root }
    }

    /// `true` unless a non-zero flag is stored.  Unreadable means "ask".
    pub fn can_ask(&self) -> bool {
        match self.store.get_value(self.app_root, ASKED_VALUE) {
            Ok(Some(RegValue::Dword(v))) => v == 0,
            Ok(_) => true,
            Err(e) => {
                warn!("cannot read prompt flag: {e}");
                true
            }
        }
    }

    /// Persist the flag.  Only the orchestrator calls this, immediately before
    /// the prompt is scheduled.  A failed write means the user may be asked
    /// again next run.
    pub(super) fn mark_asked(&self) {
        if let Err(e) = self
            .store
            .set_value(self.app_root, ASKED_VALUE, &RegValue::Dword(1))
        {
            warn!("cannot persist prompt flag: {e}");
        }
    }
}
