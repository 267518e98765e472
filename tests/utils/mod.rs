// Integration test utilities
//
// Builds a throwaway campaign on disk: a `benchmark/<version>/` corpus with a
// shell-script compiler, and a shell-script generator that drops
// timestamp-named candidates into its output directory.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sigtriage::config::CampaignConfig;

pub const BINARY_NAME: &str = "solc-static-linux";

/// Compiler stand-in: crashes on `crash`, reports an undeclared identifier
/// on `undeclared`, hangs on `hang`, and compiles anything else cleanly.
const COMPILER_SCRIPT: &str = r#"#!/bin/sh
f="$1"
if grep -q crash "$f"; then
    kill -SEGV $$
fi
if grep -q hang "$f"; then
    sleep 30
fi
if grep -q undeclared "$f"; then
    echo "$f:3:1: Error: Undeclared identifier." >&2
    exit 1
fi
exit 0
"#;

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub struct CampaignFixture {
    pub tmp: TempDir,
}

impl CampaignFixture {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn benchmark_dir(&self) -> PathBuf {
        self.root().join("benchmark")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.root().join("generated_programs")
    }

    /// Add a version whose corpus files have the given contents
    pub fn add_version(&self, version: &str, corpus: &[&str]) {
        let dir = self.benchmark_dir().join(version);
        fs::create_dir_all(&dir).unwrap();
        write_script(&dir.join(BINARY_NAME), COMPILER_SCRIPT);
        for (i, content) in corpus.iter().enumerate() {
            fs::write(dir.join(format!("{}.sol", i + 1)), content).unwrap();
        }
    }

    /// Generator emitting one candidate per entry of `contents`
    pub fn write_generator(&self, contents: &[&str]) -> PathBuf {
        let out = self.generated_dir();
        let mut body = format!("#!/bin/sh\nmkdir -p '{}'\n", out.display());
        for (i, content) in contents.iter().enumerate() {
            body.push_str(&format!(
                "echo '{}' > '{}/2024-3-7_12:05:33:123_{}.sol'\n",
                content,
                out.display(),
                i
            ));
        }
        let path = self.root().join("generate.sh");
        write_script(&path, &body);
        path
    }

    /// Config pointing at this fixture, one round, no constructor gating
    pub fn config(&self, generator: PathBuf) -> CampaignConfig {
        let mut config = CampaignConfig {
            benchmark_dir: self.benchmark_dir(),
            output_dir: self.output_dir(),
            max_rounds: Some(1),
            compile_timeout_secs: Some(10),
            seed: Some(7),
            ..Default::default()
        };
        config.generator.program = generator;
        config.generator.output_dir = self.generated_dir();
        config.generator.constructor_flag = None;
        config.generator.timeout_secs = Some(10);
        config
    }

    /// Same config as TOML, for driving the binary
    pub fn write_config(&self, generator: PathBuf) -> PathBuf {
        let path = self.root().join("campaign.toml");
        let toml = toml::to_string(&self.config(generator)).unwrap();
        fs::write(&path, toml).unwrap();
        path
    }
}
