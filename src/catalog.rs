//! Catalog of known failure signatures per version
//!
//! The catalog is built by running every version's binary over its slice of
//! the historical corpus. Every corpus file is known to be buggy, so a clean
//! compile means the corpus or the binary is wrong and the build aborts.
//!
//! Building is slow (hundreds of versions × corpus files), so the result is
//! cached as JSON next to the bug store:
//!
//! ```json
//! { "0.8.1": ["Error: undeclared identifier", "segfault"] }
//! ```
//!
//! Curators may edit the cache by hand to generalize entries with `#`. A
//! cache that no longer parses is moved to `<name>.corrupt` before the
//! rebuild, so a broken edit is never lost.
//! Staleness is not detected; rebuild explicitly after changing the corpus.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::compiler::Compiler;
use crate::error::{Result, TriageError};
use crate::pattern::is_known;
use crate::store::quarantine_path;
use crate::signature::classify_outcome;
use crate::store::write_atomic;
use crate::version::Version;

/// Known signatures (as wildcard patterns) per version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<Version, BTreeSet<String>>,
}

impl Catalog {
    pub fn new(entries: BTreeMap<Version, BTreeSet<String>>) -> Self {
        Self { entries }
    }

    /// Catalog from `(version, patterns)` pairs; handy for fixtures
    pub fn from_entries<I, P, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Version, P)>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(v, patterns)| (v, patterns.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Versions in ascending order
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.entries.keys()
    }

    pub fn entries(&self, version: &Version) -> Option<&BTreeSet<String>> {
        self.entries.get(version)
    }

    /// Does `signature` reproduce a known failure of `version`
    pub fn is_known(&self, version: &Version, signature: &str) -> bool {
        self.entries
            .get(version)
            .is_some_and(|patterns| is_known(signature, patterns))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let entries = serde_json::from_str(&content)?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(path.as_ref(), json.as_bytes())?;
        Ok(())
    }

    /// Use the cache at `cache` when present and readable, else build and cache
    pub fn load_or_build<C: Compiler>(
        cache: impl AsRef<Path>,
        builder: &CatalogBuilder<C>,
        rebuild: bool,
    ) -> Result<Self> {
        let cache = cache.as_ref();
        if !rebuild && cache.exists() {
            match Self::load(cache) {
                Ok(catalog) => {
                    info!(
                        cache = %cache.display(),
                        versions = catalog.len(),
                        "loaded catalog from cache"
                    );
                    return Ok(catalog);
                }
                Err(e) => {
                    // Set hand edits aside before rebuilding
                    let quarantine = quarantine_path(cache);
                    warn!(
                        cache = %cache.display(),
                        quarantine = %quarantine.display(),
                        error = %e,
                        "catalog cache unreadable, rebuilding"
                    );
                    fs::rename(cache, &quarantine)?;
                }
            }
        }

        let catalog = builder.build()?;
        catalog.save(cache)?;
        info!(cache = %cache.display(), versions = catalog.len(), "catalog built and cached");
        Ok(catalog)
    }
}

/// Builds a [`Catalog`] from a `<root>/<version>/{binary, corpus files...}` tree
pub struct CatalogBuilder<C> {
    compiler: C,
    benchmark_dir: PathBuf,
    binary_name: String,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

impl<C: Compiler> CatalogBuilder<C> {
    pub fn new(compiler: C, benchmark_dir: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            compiler,
            benchmark_dir: benchmark_dir.into(),
            binary_name: binary_name.into(),
        }
    }

    /// Run every corpus file of every version
    ///
    /// # Errors
    /// [`TriageError::Configuration`] when the corpus root is missing, a
    /// version directory name is malformed, a binary is missing or cannot run,
    /// or a corpus file compiles cleanly.
    pub fn build(&self) -> Result<Catalog> {
        if !self.benchmark_dir.is_dir() {
            return Err(TriageError::config(format!(
                "benchmark directory {} does not exist",
                self.benchmark_dir.display()
            )));
        }

        let mut entries = BTreeMap::new();
        for dir in sorted_entries(&self.benchmark_dir)? {
            if !dir.is_dir() {
                debug!(path = %dir.display(), "skipping non-directory in benchmark root");
                continue;
            }
            let name = dir.file_name().unwrap_or_default().to_string_lossy();
            let version: Version = name.parse()?;
            let signatures = self.build_version(&version, &dir)?;
            info!(version = %version, signatures = signatures.len(), "catalogued version");
            entries.insert(version, signatures);
        }

        if entries.is_empty() {
            return Err(TriageError::config(format!(
                "benchmark directory {} contains no version directories",
                self.benchmark_dir.display()
            )));
        }

        Ok(Catalog { entries })
    }

    fn build_version(&self, version: &Version, dir: &Path) -> Result<BTreeSet<String>> {
        let binary = dir.join(&self.binary_name);
        if !binary.is_file() {
            return Err(TriageError::config(format!(
                "version {} has no binary at {}",
                version,
                binary.display()
            )));
        }

        let mut signatures = BTreeSet::new();
        for file in sorted_entries(dir)? {
            if !file.is_file() || file.file_name() == Some(OsStr::new(&self.binary_name)) {
                continue;
            }

            let outcome = self.compiler.compile(&binary, &file).map_err(|e| {
                TriageError::config(format!(
                    "cannot catalog {} for version {}: {}",
                    file.display(),
                    version,
                    e
                ))
            })?;

            let Some(signature) = classify_outcome(&outcome) else {
                return Err(TriageError::config(format!(
                    "corpus file {} compiled cleanly with version {} (exit {}); the catalog is stale or misconfigured",
                    file.display(),
                    version,
                    outcome.status_code()
                )));
            };
            debug!(version = %version, file = %file.display(), signature = %signature, "corpus signature");
            signatures.insert(signature.as_str().to_string());
        }
        Ok(signatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ExitKind, RawOutcome};
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Outcome keyed by corpus file name; unknown files compile cleanly
    struct ScriptedCompiler(HashMap<String, RawOutcome>);

    impl Compiler for ScriptedCompiler {
        fn compile(&self, _binary: &Path, input: &Path) -> Result<RawOutcome> {
            let name = input.file_name().unwrap().to_string_lossy().to_string();
            Ok(self
                .0
                .get(&name)
                .cloned()
                .unwrap_or_else(|| RawOutcome::new("", "", ExitKind::Exited(0))))
        }
    }

    fn corpus(root: &Path, version: &str, files: &[&str]) {
        let dir = root.join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("solc-static-linux"), "").unwrap();
        for f in files {
            fs::write(dir.join(f), "contract C {}").unwrap();
        }
    }

    fn diag(text: &str) -> RawOutcome {
        RawOutcome::new("", text, ExitKind::Exited(1))
    }

    #[test]
    fn test_build_collects_signatures() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("benchmark");
        corpus(&root, "0.8.1", &["1.sol", "2.sol"]);
        corpus(&root, "0.4.26", &["3.sol"]);

        let compiler = ScriptedCompiler(HashMap::from([
            (
                "1.sol".to_string(),
                diag(&format!("{}/0.8.1/1.sol:3:1: Error: undeclared identifier\n", root.display())),
            ),
            ("2.sol".to_string(), RawOutcome::new("", "", ExitKind::Signaled(11))),
            ("3.sol".to_string(), diag("Internal compiler error")),
        ]));

        let catalog = CatalogBuilder::new(compiler, &root, "solc-static-linux").build().unwrap();
        let versions: Vec<String> = catalog.versions().map(|v| v.to_string()).collect();
        assert_eq!(versions, vec!["0.4.26", "0.8.1"]);

        let v081 = Version::new(0, 8, 1);
        let entries = catalog.entries(&v081).unwrap();
        assert!(entries.contains("Error: undeclared identifier"));
        assert!(entries.contains("segfault"));
        assert!(catalog.is_known(&v081, "segfault"));
        assert!(!catalog.is_known(&Version::new(0, 4, 26), "segfault"));
        assert!(!catalog.is_known(&Version::new(9, 9, 9), "segfault"));
    }

    #[test]
    fn test_clean_compile_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        corpus(dir.path(), "0.8.1", &["1.sol"]);

        let err = CatalogBuilder::new(ScriptedCompiler(HashMap::new()), dir.path(), "solc-static-linux")
            .build()
            .unwrap_err();
        assert!(matches!(err, TriageError::Configuration(_)));
        assert!(err.to_string().contains("compiled cleanly"));
    }

    #[test]
    fn test_malformed_version_directory() {
        let dir = TempDir::new().unwrap();
        corpus(dir.path(), "latest", &["1.sol"]);

        let err = CatalogBuilder::new(ScriptedCompiler(HashMap::new()), dir.path(), "solc-static-linux")
            .build()
            .unwrap_err();
        assert!(matches!(err, TriageError::Configuration(_)));
        assert!(err.to_string().contains("latest"));
    }

    #[test]
    fn test_missing_binary_and_missing_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("0.8.1")).unwrap();
        let builder = CatalogBuilder::new(ScriptedCompiler(HashMap::new()), dir.path(), "solc-static-linux");
        assert!(matches!(builder.build().unwrap_err(), TriageError::Configuration(_)));

        let builder = CatalogBuilder::new(
            ScriptedCompiler(HashMap::new()),
            dir.path().join("absent"),
            "solc-static-linux",
        );
        assert!(matches!(builder.build().unwrap_err(), TriageError::Configuration(_)));
    }

    #[test]
    fn test_cache_roundtrip_and_reuse() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("benchmark");
        corpus(&root, "0.8.1", &["1.sol"]);
        let cache = dir.path().join("out/catalog.json");

        let builder = CatalogBuilder::new(
            ScriptedCompiler(HashMap::from([("1.sol".to_string(), diag("Error: boom"))])),
            &root,
            "solc-static-linux",
        );
        let built = Catalog::load_or_build(&cache, &builder, false).unwrap();
        assert!(cache.exists());

        // Remove the corpus: a cached catalog must not touch it again
        fs::remove_dir_all(&root).unwrap();
        let cached = Catalog::load_or_build(&cache, &builder, false).unwrap();
        assert_eq!(built, cached);

        // Forced rebuild goes back to the (now missing) corpus
        assert!(Catalog::load_or_build(&cache, &builder, true).is_err());
    }

    #[test]
    fn test_hand_authored_wildcards_in_cache() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("catalog.json");
        fs::write(&cache, r#"{"0.8.1": ["Error: stack too deep#"]}"#).unwrap();

        let catalog = Catalog::load(&cache).unwrap();
        assert!(catalog.is_known(&Version::new(0, 8, 1), "Error: stack too deep in foo"));
    }

    #[test]
    fn test_unparsable_cache_is_set_aside_before_rebuild() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("benchmark");
        corpus(&root, "0.8.1", &["1.sol"]);
        let cache = dir.path().join("catalog.json");
        let edited = "{\"0.8.1\": [\"Error: stack too deep#\",]}";
        fs::write(&cache, edited).unwrap();

        let builder = CatalogBuilder::new(
            ScriptedCompiler(HashMap::from([("1.sol".to_string(), diag("Error: boom"))])),
            &root,
            "solc-static-linux",
        );
        let catalog = Catalog::load_or_build(&cache, &builder, false).unwrap();

        assert!(catalog.is_known(&Version::new(0, 8, 1), "Error: boom"));
        assert_eq!(
            fs::read_to_string(dir.path().join("catalog.json.corrupt")).unwrap(),
            edited
        );
        assert_eq!(Catalog::load(&cache).unwrap(), catalog);
    }
}
