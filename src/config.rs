//! @ai:module:intent Configuration structs for the benchmarking harness
//! @ai:module:layer infrastructure
//! @ai:module:public_api HarnessConfig, RunConfig, PathConfig, FilterConfig
//! @ai:module:stateless true

use crate::toolchain::CommandToolchainSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// @ai:intent Main configuration for the harness
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub paths: PathConfig,
    /// Binary overrides for built-in toolchains, keyed by toolchain id
    #[serde(default)]
    pub binaries: BTreeMap<String, String>,
    #[serde(default)]
    pub custom_toolchains: Vec<CommandToolchainSpec>,
}

/// @ai:intent Run configuration for benchmark execution
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Maximum number of (toolchain, test) pairs measured at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// @ai:intent Path configuration for corpus, results and scratch space
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Load the corpus from TOML files here instead of the built-in programs
    #[serde(default)]
    pub corpus_dir: Option<PathBuf>,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Parent directory for per-trial workspaces; system temp dir when unset
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

/// @ai:intent Filter configuration for selecting toolchains and tests
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub toolchains: Option<Vec<String>>,
    pub tests: Option<Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            concurrency: default_concurrency(),
            build_timeout_secs: default_build_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            filter: FilterConfig::default(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            corpus_dir: None,
            results_dir: default_results_dir(),
            scratch_dir: None,
        }
    }
}

fn default_iterations() -> u32 {
    5
}

fn default_concurrency() -> usize {
    1
}

fn default_build_timeout() -> u64 {
    120
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl HarnessConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl RunConfig {
    /// @ai:intent Upper bound for a single build invocation
    /// @ai:effects pure
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// @ai:intent Upper bound for a version probe
    /// @ai:effects pure
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// @ai:intent Concurrency limit, never below one
    /// @ai:effects pure
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl FilterConfig {
    /// @ai:intent Check if a toolchain id passes the filter
    /// @ai:effects pure
    pub fn allows_toolchain(&self, id: &str) -> bool {
        self.toolchains
            .as_ref()
            .map(|t| t.iter().any(|allowed| allowed == id))
            .unwrap_or(true)
    }

    /// @ai:intent Check if a test id passes the filter
    /// @ai:effects pure
    pub fn allows_test(&self, id: &str) -> bool {
        self.tests
            .as_ref()
            .map(|t| t.iter().any(|allowed| allowed == id))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_allows_all_when_empty() {
        let filter = FilterConfig::default();
        assert!(filter.allows_toolchain("rust"));
        assert!(filter.allows_test("fibonacci"));
    }

    #[test]
    fn test_filter_restricts_toolchains() {
        let filter = FilterConfig {
            toolchains: Some(vec!["rust".to_string(), "go".to_string()]),
            ..Default::default()
        };
        assert!(filter.allows_toolchain("go"));
        assert!(!filter.allows_toolchain("cpp"));
        assert!(filter.allows_test("sorting"));
    }

    #[test]
    fn test_defaults_from_partial_toml() {
        let config: HarnessConfig = toml::from_str(
            r#"
[run]
iterations = 3

[binaries]
ea = "target/release/ea"
"#,
        )
        .unwrap();

        assert_eq!(config.run.iterations, 3);
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.run.build_timeout(), Duration::from_secs(120));
        assert_eq!(config.run.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.binaries.get("ea").map(String::as_str), Some("target/release/ea"));
        assert!(config.paths.corpus_dir.is_none());
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let run = RunConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(run.effective_concurrency(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bench.toml");

        let mut config = HarnessConfig::default();
        config.run.iterations = 7;
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.run.iterations, 7);
        assert_eq!(loaded.paths.results_dir, PathBuf::from("results"));
    }
}
