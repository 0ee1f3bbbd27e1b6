// ── Default-handler detection ─────────────────────────────────────────────────
//
// Two tiers: Explorer's per-user `UserChoice` override is authoritative when
// present; otherwise the extension's own default value names the handler.

use log::{debug, warn};

use super::{
    extension_key, same_identifier,
    store::{RegValue, RegistrationStore},
    user_choice_key, DEFAULT_VALUE,
};
use crate::error::Result;

/// The identifier currently bound to `extension`, or `None` if nothing is
/// configured.  Blank values count as absent.
pub fn current_default(store: &dyn RegistrationStore, extension: &str) -> Result<Option<String>> {
    let user_choice = store.get_value(&user_choice_key(extension), "ProgId")?;
    if let Some(id) = non_blank(user_choice) {
        return Ok(Some(id));
    }
    let nominal = store.get_value(&extension_key(extension), DEFAULT_VALUE)?;
    Ok(non_blank(nominal))
}

fn non_blank(value: Option<RegValue>) -> Option<String> {
    match value {
        Some(RegValue::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Whether the shell opens `extension` with `prog_id`.  Read failures mean
/// "no".
pub fn is_default_handler(store: &dyn RegistrationStore, extension: &str, prog_id: &str) -> bool {
    match current_default(store, extension) {
        Ok(Some(current)) => {
            debug!("{extension} is bound to {current}");
            same_identifier(&current, prog_id)
        }
        Ok(None) => {
            debug!("{extension} has no default handler");
            false
        }
        Err(e) => {
            warn!("cannot read default handler for {extension}: {e}");
            false
        }
    }
}
