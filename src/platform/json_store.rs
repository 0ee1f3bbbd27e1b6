// ── JSON-backed registration store ────────────────────────────────────────────
//
// Persists the key/value hierarchy to `<config dir>/<app>/registry.json` on
// hosts without a registry.  Every write is flushed immediately; the file is
// small and writes happen a handful of times per startup.
// No `unsafe`: pure safe Rust + serde_json.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    association::store::{MemoryStore, RegValue, RegistrationStore, Snapshot},
    error::Result,
};

// ── On-disk format ────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    keys: Snapshot,
}

const STORE_VERSION: u32 = 1;

// ── JsonStore ─────────────────────────────────────────────────────────────────

pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    /// `<config dir>/<app_name>/registry.json`, or `None` when the platform
    /// reports no config directory.
    pub fn default_path(app_name: &str) -> Option<PathBuf> {
        let mut p = dirs::config_dir()?;
        p.push(app_name);
        p.push("registry.json");
        Some(p)
    }

    /// Load `path`.  A missing, unreadable, malformed, or wrong-version file
    /// starts an empty store that replaces it on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = load(&path).unwrap_or_default();
        Self {
            path,
            inner: MemoryStore::from_snapshot(keys),
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = StoreFile {
            version: STORE_VERSION,
            keys: self.inner.snapshot(),
        };
        let out = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(out, &file)?;
        Ok(())
    }
}

fn load(path: &Path) -> Option<Snapshot> {
    let data = fs::read(path).ok()?;
    let file: StoreFile = match serde_json::from_slice(&data) {
        Ok(f) => f,
        Err(e) => {
            debug!("ignoring malformed store {}: {e}", path.display());
            return None;
        }
    };
    (file.version == STORE_VERSION).then_some(file.keys)
}

impl RegistrationStore for JsonStore {
    fn create_key(&self, path: &str) -> Result<()> {
        self.inner.create_key(path)?;
        self.save()
    }

    fn set_value(&self, path: &str, name: &str, value: &RegValue) -> Result<()> {
        self.inner.set_value(path, name, value)?;
        self.save()
    }

    fn get_value(&self, path: &str, name: &str) -> Result<Option<RegValue>> {
        self.inner.get_value(path, name)
    }
}
