//! Durable, version-partitioned bug store
//!
//! On disk the store is a JSON object keyed by version, each value mapping
//! candidate name to recorded signature:
//!
//! ```json
//! { "0.8.1": { "2024-3-7_12:05:33:123_0.sol": "Error: undeclared identifier" } }
//! ```
//!
//! Loading ignores keys that are not versions and entries that are not
//! strings. Every flush rewrites the file through a temporary sibling and a
//! rename, so a crash mid-write leaves the previous contents intact.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, TriageError};
use crate::signature::Signature;
use crate::version::Version;

/// One recorded finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugRecord {
    pub version: Version,
    pub candidate: String,
    pub signature: Signature,
}

impl BugRecord {
    pub fn new(version: Version, candidate: impl Into<String>, signature: Signature) -> Self {
        Self {
            version,
            candidate: candidate.into(),
            signature,
        }
    }
}

/// Version → (candidate name → signature), bound to a file
#[derive(Debug, Clone)]
pub struct BugStore {
    path: PathBuf,
    bugs: BTreeMap<Version, BTreeMap<String, Signature>>,
}

/// Write `bytes` to `path` via a temporary file and rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        use std::io::Write;
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)
}

/// `<name>.corrupt` next to `path`, where unreadable files are set aside
pub(crate) fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

impl BugStore {
    /// Empty store that will flush to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bugs: BTreeMap::new(),
        }
    }

    /// Load the store, treating a missing file as empty
    ///
    /// # Errors
    /// [`TriageError::StoreCorruption`] if the file is not a JSON object.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no bug store yet, starting empty");
                return Ok(Self::new(path));
            }
            Err(e) => {
                return Err(TriageError::StoreCorruption {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let bugs = parse_store(&content).map_err(|reason| TriageError::StoreCorruption {
            path: path.clone(),
            reason,
        })?;
        Ok(Self { path, bugs })
    }

    /// Load the store, recovering from corruption with an empty store
    ///
    /// The unreadable file is renamed to `<name>.corrupt` first so the next
    /// flush cannot destroy whatever is still salvageable in it.
    pub fn load_or_recover(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::load(&path) {
            Ok(store) => Ok(store),
            Err(TriageError::StoreCorruption { reason, .. }) => {
                let quarantine = quarantine_path(&path);
                warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    %reason,
                    "bug store is corrupt, continuing with an empty store"
                );
                if path.exists() {
                    fs::rename(&path, &quarantine)?;
                }
                Ok(Self::new(path))
            }
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a record; returns false if this candidate is already recorded
    pub fn insert(&mut self, record: BugRecord) -> bool {
        let entries = self.bugs.entry(record.version).or_default();
        if entries.contains_key(&record.candidate) {
            return false;
        }
        entries.insert(record.candidate, record.signature);
        true
    }

    /// Recorded candidates for one version
    pub fn entries(&self, version: &Version) -> Option<&BTreeMap<String, Signature>> {
        self.bugs.get(version)
    }

    pub fn get(&self, version: &Version, candidate: &str) -> Option<&Signature> {
        self.bugs.get(version)?.get(candidate)
    }

    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.bugs.keys()
    }

    /// Distinct signatures already recorded for `version`
    pub fn signatures(&self, version: &Version) -> impl Iterator<Item = &Signature> {
        self.bugs.get(version).into_iter().flat_map(|m| m.values())
    }

    pub fn version_len(&self, version: &Version) -> usize {
        self.bugs.get(version).map_or(0, BTreeMap::len)
    }

    /// Total number of records across versions
    pub fn len(&self) -> usize {
        self.bugs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.bugs)?)
    }

    /// Persist atomically
    pub fn flush(&self) -> Result<()> {
        let json = self.to_json()?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), records = self.len(), "bug store flushed");
        Ok(())
    }
}

fn parse_store(content: &str) -> std::result::Result<BTreeMap<Version, BTreeMap<String, Signature>>, String> {
    let root: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(root) = root else {
        return Err("top level is not a JSON object".to_string());
    };

    let mut bugs = BTreeMap::new();
    for (key, value) in root {
        let Ok(version) = key.parse::<Version>() else {
            debug!(key = %key, "ignoring non-version key in bug store");
            continue;
        };
        let Value::Object(entries) = value else {
            warn!(version = %version, "ignoring bug store entry that is not an object");
            continue;
        };

        let recorded: &mut BTreeMap<String, Signature> = bugs.entry(version).or_default();
        for (candidate, signature) in entries {
            match signature {
                Value::String(text) => {
                    recorded.insert(candidate, Signature::from_canonical(text));
                }
                other => {
                    warn!(version = %version, candidate = %candidate, value = %other, "ignoring non-string signature");
                }
            }
        }
    }
    Ok(bugs)
}
