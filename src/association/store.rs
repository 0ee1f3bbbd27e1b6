// ── Registration store ────────────────────────────────────────────────────────
//
// The per-user, persistent key/value hierarchy the shell reads associations
// from.  Keys are backslash-separated paths relative to the user hive; value
// names are strings, `""` being the key's default value.  Like the real
// registry, both are case-insensitive.
//
// Production binds this to HKCU (`platform::win32::registry`) or to a JSON file
// (`platform::json_store`); tests use `MemoryStore`.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

use serde::{Deserialize, Serialize};

use crate::error::{AssocError, Result};

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegValue {
    /// `REG_SZ`.
    String(String),
    /// `REG_DWORD`.
    Dword(u32),
    /// Any other typed payload, kept verbatim.
    Binary(Vec<u8>),
    /// Zero-length `REG_NONE` marker, used by `OpenWithProgids`.
    Empty,
}

impl RegValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Per-user key/value hierarchy.
///
/// Methods take `&self`: the real registry is shared OS state, and the fakes
/// use interior mutability to match.
pub trait RegistrationStore {
    /// Create `path` and any missing parents.  Existing keys are left alone.
    fn create_key(&self, path: &str) -> Result<()>;

    /// Write `name` under `path`, creating the key first if needed.
    fn set_value(&self, path: &str, name: &str, value: &RegValue) -> Result<()>;

    /// Read `name` under `path`.  A missing key or value is `Ok(None)`; reads
    /// never create anything.
    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegValue>>;
}

/// Keys by lowercased path, values by lowercased name.
pub type Snapshot = BTreeMap<String, BTreeMap<String, RegValue>>;

fn fold(s: &str) -> String {
    s.trim_matches('\\').to_lowercase()
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// In-memory store with failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: RefCell<Snapshot>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    /// Writes under this (folded) prefix fail.
    fail_writes_under: RefCell<Option<String>>,
    reject_empty: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously captured contents.
    pub fn from_snapshot(keys: Snapshot) -> Self {
        Self {
            keys: RefCell::new(keys),
            ..Self::default()
        }
    }

    /// Copy of the current contents, for comparison and persistence.
    pub fn snapshot(&self) -> Snapshot {
        self.keys.borrow().clone()
    }

    pub fn key_exists(&self, path: &str) -> bool {
        self.keys.borrow().contains_key(&fold(path))
    }

    /// Make every read return an error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Make every write return an error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Make writes to `prefix` and everything below it fail.
    pub fn fail_writes_under(&self, prefix: &str) {
        *self.fail_writes_under.borrow_mut() = Some(fold(prefix));
    }

    /// Refuse `RegValue::Empty`, as some registry redirectors do.
    pub fn reject_empty_values(&self, reject: bool) {
        self.reject_empty.set(reject);
    }

    fn check_write(&self, path: &str) -> Result<String> {
        let folded = fold(path);
        let blocked = self.fail_writes.get()
            || self
                .fail_writes_under
                .borrow()
                .as_deref()
                .is_some_and(|p| folded == p || folded.starts_with(&format!("{p}\\")));
        if blocked {
            return Err(AssocError::Store {
                path: path.to_owned(),
                reason: "write denied",
            });
        }
        Ok(folded)
    }
}

impl RegistrationStore for MemoryStore {
    fn create_key(&self, path: &str) -> Result<()> {
        let folded = self.check_write(path)?;
        let mut keys = self.keys.borrow_mut();
        // Materialise every ancestor, like RegCreateKeyEx.
        let mut prefix = String::new();
        for part in folded.split('\\') {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(part);
            keys.entry(prefix.clone()).or_default();
        }
        Ok(())
    }

    fn set_value(&self, path: &str, name: &str, value: &RegValue) -> Result<()> {
        if self.reject_empty.get() && *value == RegValue::Empty {
            return Err(AssocError::Store {
                path: path.to_owned(),
                reason: "REG_NONE not supported",
            });
        }
        self.create_key(path)?;
        self.keys
            .borrow_mut()
            .entry(fold(path))
            .or_default()
            .insert(name.to_lowercase(), value.clone());
        Ok(())
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegValue>> {
        if self.fail_reads.get() {
            return Err(AssocError::Store {
                path: path.to_owned(),
                reason: "read denied",
            });
        }
        Ok(self
            .keys
            .borrow()
            .get(&fold(path))
            .and_then(|values| values.get(&name.to_lowercase()))
            .cloned())
    }
}
