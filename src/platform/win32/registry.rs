// ── HKCU registration store ───────────────────────────────────────────────────
//
// `RegistrationStore` over the real per-user hive via `winreg`.  Writes use
// `create_subkey` (RegCreateKeyEx semantics: open-or-create); reads use
// `open_subkey` so that probing never leaves empty keys behind.

use std::io;

use winreg::{
    enums::{RegType, HKEY_CURRENT_USER},
    types::FromRegValue,
    RegKey,
};

use crate::{
    association::store::{RegValue, RegistrationStore},
    error::Result,
};

pub struct RegistryStore {
    root: RegKey,
}

impl RegistryStore {
    pub fn current_user() -> Self {
        Self {
            root: RegKey::predef(HKEY_CURRENT_USER),
        }
    }
}

/// Map `NotFound` to `None`, keep every other error.
fn optional<T>(r: io::Result<T>) -> io::Result<Option<T>> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

impl RegistrationStore for RegistryStore {
    fn create_key(&self, path: &str) -> Result<()> {
        self.root.create_subkey(path)?;
        Ok(())
    }

    fn set_value(&self, path: &str, name: &str, value: &RegValue) -> Result<()> {
        let (key, _) = self.root.create_subkey(path)?;
        match value {
            RegValue::String(s) => key.set_value(name, s)?,
            RegValue::Dword(d) => key.set_value(name, d)?,
            RegValue::Binary(bytes) => key.set_raw_value(
                name,
                &winreg::RegValue {
                    bytes: bytes.clone(),
                    vtype: RegType::REG_BINARY,
                },
            )?,
            RegValue::Empty => key.set_raw_value(
                name,
                &winreg::RegValue {
                    bytes: Vec::new(),
                    vtype: RegType::REG_NONE,
                },
            )?,
        }
        Ok(())
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegValue>> {
        let Some(key) = optional(self.root.open_subkey(path))? else {
            return Ok(None);
        };
        let Some(raw) = optional(key.get_raw_value(name))? else {
            return Ok(None);
        };

        let value = match raw.vtype {
            RegType::REG_SZ | RegType::REG_EXPAND_SZ => RegValue::String(String::from_reg_value(&raw)?),
            RegType::REG_DWORD => RegValue::Dword(u32::from_reg_value(&raw)?),
            RegType::REG_NONE if raw.bytes.is_empty() => RegValue::Empty,
            _ => RegValue::Binary(raw.bytes),
        };
        Ok(Some(value))
    }
}
