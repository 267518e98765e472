// Campaign state: catalog, seen-set, and bug store in one owner
//
// The seen-set is seeded from the persisted store, so deduplication holds
// across restarts. Records are staged in `pending` as they are observed and
// merged into the store (and flushed) once per version batch. A record whose
// candidate name is already taken for its version is staged under a
// `<stem>-<n>.<ext>` name, so a reused generator file name never displaces an
// earlier finding.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogBuilder};
use crate::compiler::Compiler;
use crate::config::CampaignConfig;
use crate::error::Result;
use crate::signature::Signature;
use crate::store::{BugRecord, BugStore};
use crate::version::Version;

/// Classification of one observed signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Known to the catalog and not yet recorded for this version; carries
    /// the name the record and its archived copy are stored under
    Interesting(String),
    /// Known, but already recorded for this version
    Duplicate,
    /// Not in the catalog for this version
    Unknown,
}

#[derive(Debug)]
pub struct CampaignState {
    catalog: Catalog,
    seen: BTreeMap<Version, BTreeSet<Signature>>,
    store: BugStore,
    pending: Vec<BugRecord>,
}

impl CampaignState {
    pub fn new(catalog: Catalog, store: BugStore) -> Self {
        let mut seen: BTreeMap<Version, BTreeSet<Signature>> = BTreeMap::new();
        for version in store.versions() {
            seen.entry(*version)
                .or_default()
                .extend(store.signatures(version).cloned());
        }
        Self {
            catalog,
            seen,
            store,
            pending: Vec::new(),
        }
    }

    /// Load-or-build the catalog, then load the store (recovering from corruption)
    pub fn load<C: Compiler>(config: &CampaignConfig, compiler: C, rebuild_catalog: bool) -> Result<Self> {
        let builder = CatalogBuilder::new(compiler, &config.benchmark_dir, &config.binary_name);
        let catalog = Catalog::load_or_build(config.catalog_cache_path(), &builder, rebuild_catalog)?;
        let store = BugStore::load_or_recover(config.store_path())?;
        info!(
            versions = catalog.len(),
            stored_bugs = store.len(),
            "campaign state loaded"
        );
        Ok(Self::new(catalog, store))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &BugStore {
        &self.store
    }

    pub fn pending(&self) -> &[BugRecord] {
        &self.pending
    }

    pub fn has_seen(&self, version: &Version, signature: &Signature) -> bool {
        self.seen
            .get(version)
            .is_some_and(|seen| seen.contains(signature))
    }

    pub fn seen_len(&self, version: &Version) -> usize {
        self.seen.get(version).map_or(0, BTreeSet::len)
    }

    fn is_name_taken(&self, version: &Version, name: &str) -> bool {
        self.store.get(version, name).is_some()
            || self
                .pending
                .iter()
                .any(|record| record.version == *version && record.candidate == name)
    }

    /// `candidate` if free for `version`, else the first free `<stem>-<n>.<ext>`
    pub fn record_name(&self, version: &Version, candidate: &str) -> String {
        if !self.is_name_taken(version, candidate) {
            return candidate.to_string();
        }
        let path = Path::new(candidate);
        let stem = path
            .file_stem()
            .map_or_else(|| candidate.into(), |s| s.to_string_lossy());
        let extension = path.extension().map(|e| e.to_string_lossy());
        let mut n = 1usize;
        loop {
            let name = match &extension {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            if !self.is_name_taken(version, &name) {
                return name;
            }
            n += 1;
        }
    }

    /// Classify without mutating anything
    pub fn classify(&self, version: &Version, candidate: &str, signature: &Signature) -> Verdict {
        if !self.catalog.is_known(version, signature.as_str()) {
            Verdict::Unknown
        } else if self.has_seen(version, signature) {
            Verdict::Duplicate
        } else {
            Verdict::Interesting(self.record_name(version, candidate))
        }
    }

    /// Classify and, if interesting, mark seen and stage a record
    pub fn observe(&mut self, version: Version, candidate: &str, signature: Signature) -> Verdict {
        let verdict = self.classify(&version, candidate, &signature);
        if let Verdict::Interesting(record_name) = &verdict {
            if record_name != candidate {
                warn!(
                    version = %version,
                    candidate,
                    record_name = %record_name,
                    "candidate name already recorded, storing under a new name"
                );
            }
            debug!(version = %version, candidate = %record_name, signature = %signature, "staging bug record");
            self.seen.entry(version).or_default().insert(signature.clone());
            self.pending
                .push(BugRecord::new(version, record_name.clone(), signature));
        }
        verdict
    }

    /// Merge staged records into the store and flush it
    ///
    /// Returns the number of records merged.
    pub fn commit(&mut self) -> Result<usize> {
        let mut merged = 0;
        for record in self.pending.drain(..) {
            if self.store.insert(record) {
                merged += 1;
            }
        }
        self.store.flush()?;
        Ok(merged)
    }
}
