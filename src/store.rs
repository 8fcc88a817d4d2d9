//! Durable key-value store for configuration and the cached brief.
//!
//! The store is the only shared mutable state between the background job
//! context and the foreground read path. All writes go through
//! [`PrefsStore::put_all`], an atomic multi-key commit, so a reader never
//! observes a torn write — config fields land together, and the cache
//! body/timestamp/error fields land together.
//!
//! Two implementations are provided: [`FilePrefsStore`] persists to a JSON
//! file under the platform config directory (whole-file write via temp file
//! + rename, so a commit is atomic on disk), and [`MemoryPrefsStore`] backs
//! tests.

use crate::config::RefreshConfig;
use crate::error::{BriefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Store identity. The durable file is named after it so state survives
/// alongside any prior persisted data under the same namespace.
pub const STORE_NAME: &str = "vcbrief.bg";

/// Persisted key: normalized brief API base URL (string).
pub const KEY_API_BASE: &str = "apiBase";
/// Persisted key: whether background refresh is enabled (bool).
pub const KEY_ENABLED: &str = "enabled";
/// Persisted key: last successfully fetched brief body (string).
pub const KEY_CACHED_JSON: &str = "cachedJson";
/// Persisted key: epoch millis of the last successful fetch (integer).
pub const KEY_CACHED_AT_MS: &str = "cachedAtMs";
/// Persisted key: last fetch error, empty when the last fetch succeeded (string).
pub const KEY_LAST_ERROR: &str = "lastError";

/// A single stored value.
///
/// Untagged so the persisted file reads as plain JSON
/// (`{"enabled": true, "cachedAtMs": 1733000000000, ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer (epoch millis).
    Int(i64),
    /// UTF-8 string.
    Str(String),
}

impl PrefValue {
    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Durable key-value capability.
///
/// `put_all` commits every entry or none — implementations must not expose
/// a state where only part of a commit is visible to readers.
pub trait PrefsStore: Send + Sync {
    /// Read a single value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<PrefValue>>;

    /// Atomically commit a group of values.
    fn put_all(&self, entries: &[(&str, PrefValue)]) -> Result<()>;
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryPrefsStore {
    map: Mutex<BTreeMap<String, PrefValue>>,
}

impl MemoryPrefsStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>> {
        let map = self
            .map
            .lock()
            .map_err(|e| BriefError::Store(format!("lock poisoned: {e}")))?;
        Ok(map.get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, PrefValue)]) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|e| BriefError::Store(format!("lock poisoned: {e}")))?;
        for (key, value) in entries {
            map.insert((*key).to_owned(), value.clone());
        }
        Ok(())
    }
}

/// JSON-file-backed store.
///
/// The file is loaded leniently: missing or unparseable contents start from
/// an empty map rather than failing, so a corrupt state file never wedges
/// the subsystem.
pub struct FilePrefsStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, PrefValue>>,
}

impl FilePrefsStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(BriefError::Store(format!(
                    "cannot read store file {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Open the store at its default platform location.
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| BriefError::Store("cannot determine config directory".to_owned()))?;
        Self::open(path)
    }

    /// Default store file path (`<config-dir>/vcbrief/vcbrief.bg.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vcbrief").join(format!("{STORE_NAME}.json")))
    }

    /// Path this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, map: &BTreeMap<String, PrefValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BriefError::Store(format!(
                    "cannot create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| BriefError::Store(format!("cannot serialize store: {e}")))?;

        // Temp file + rename keeps the multi-key commit atomic on disk.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| BriefError::Store(format!("cannot write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            BriefError::Store(format!("cannot commit {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

impl PrefsStore for FilePrefsStore {
    fn get(&self, key: &str) -> Result<Option<PrefValue>> {
        let map = self
            .map
            .lock()
            .map_err(|e| BriefError::Store(format!("lock poisoned: {e}")))?;
        Ok(map.get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, PrefValue)]) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|e| BriefError::Store(format!("lock poisoned: {e}")))?;
        let mut staged = map.clone();
        for (key, value) in entries {
            staged.insert((*key).to_owned(), value.clone());
        }
        // Persist first; only expose the new values once they are on disk.
        self.write_file(&staged)?;
        *map = staged;
        Ok(())
    }
}

/// The cached brief as seen by the foreground.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedBrief {
    /// Raw response body of the last successful fetch. Empty if never fetched.
    pub json: String,
    /// Epoch millis of the last successful fetch. Zero if never fetched.
    pub cached_at_ms: i64,
    /// Last fetch error marker. Empty if the last fetch succeeded.
    pub last_error: String,
}

/// Typed facade over a [`PrefsStore`].
///
/// Groups the persisted keys into their commit units: the config pair, the
/// success triple, and the lone failure marker. The cached body and
/// timestamp are only ever written by [`record_success`](Self::record_success),
/// which is what keeps the cache monotonic — failures can never regress it.
#[derive(Clone)]
pub struct BriefStore {
    prefs: Arc<dyn PrefsStore>,
}

impl BriefStore {
    /// Wrap a prefs store.
    pub fn new(prefs: Arc<dyn PrefsStore>) -> Self {
        Self { prefs }
    }

    /// Read the persisted configuration. Defaults: empty base, enabled.
    pub fn config(&self) -> Result<RefreshConfig> {
        let api_base = self
            .prefs
            .get(KEY_API_BASE)?
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let enabled = self
            .prefs
            .get(KEY_ENABLED)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(RefreshConfig { api_base, enabled })
    }

    /// Persist the configuration (one atomic commit).
    pub fn save_config(&self, config: &RefreshConfig) -> Result<()> {
        self.prefs.put_all(&[
            (KEY_API_BASE, PrefValue::Str(config.api_base.clone())),
            (KEY_ENABLED, PrefValue::Bool(config.enabled)),
        ])
    }

    /// Read the cached brief. Defaults: empty body, zero timestamp, no error.
    pub fn cached(&self) -> Result<CachedBrief> {
        let json = self
            .prefs
            .get(KEY_CACHED_JSON)?
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let cached_at_ms = self
            .prefs
            .get(KEY_CACHED_AT_MS)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let last_error = self
            .prefs
            .get(KEY_LAST_ERROR)?
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        Ok(CachedBrief {
            json,
            cached_at_ms,
            last_error,
        })
    }

    /// Commit a successful fetch: body, timestamp, and a cleared error,
    /// all in one atomic group.
    pub fn record_success(&self, body: &str, fetched_at_ms: i64) -> Result<()> {
        self.prefs.put_all(&[
            (KEY_CACHED_JSON, PrefValue::Str(body.to_owned())),
            (KEY_CACHED_AT_MS, PrefValue::Int(fetched_at_ms)),
            (KEY_LAST_ERROR, PrefValue::Str(String::new())),
        ])
    }

    /// Commit a failed fetch: only the error marker changes. The previous
    /// body and timestamp stay untouched.
    pub fn record_failure(&self, marker: &str) -> Result<()> {
        self.prefs
            .put_all(&[(KEY_LAST_ERROR, PrefValue::Str(marker.to_owned()))])
    }
}
