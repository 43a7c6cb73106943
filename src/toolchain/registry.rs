//! @ai:module:intent Registry of toolchains and host discovery
//! @ai:module:layer application
//! @ai:module:public_api ToolchainRegistry
//! @ai:module:stateless false

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::invoker::{ProcessInvokerTrait, ProcessOutcome};
use crate::toolchain::builtin::{CppToolchain, EaToolchain, GoToolchain, RustToolchain};
use crate::toolchain::command::CommandToolchain;
use crate::toolchain::{Toolchain, ToolchainInfo};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// @ai:intent Ordered set of toolchains, each registered under a unique id
pub struct ToolchainRegistry {
    toolchains: Vec<Arc<dyn Toolchain>>,
    discovered: OnceCell<BTreeMap<String, ToolchainInfo>>,
}

impl ToolchainRegistry {
    /// @ai:intent Create an empty registry
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            toolchains: Vec::new(),
            discovered: OnceCell::new(),
        }
    }

    /// @ai:intent Registry with the four built-in toolchains, honoring binary overrides
    /// @ai:effects pure
    pub fn with_builtins(binaries: &BTreeMap<String, String>) -> Self {
        let binary = |id: &str, default: &str| {
            binaries
                .get(id)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let toolchains: Vec<Arc<dyn Toolchain>> = vec![
            Arc::new(EaToolchain::new(binary(EaToolchain::ID, "ea"))) as Arc<dyn Toolchain>,
            Arc::new(RustToolchain::new(binary(RustToolchain::ID, "rustc"))),
            Arc::new(CppToolchain::new(binary(CppToolchain::ID, "g++"))),
            Arc::new(GoToolchain::new(binary(GoToolchain::ID, "go"))),
        ];

        Self {
            toolchains,
            discovered: OnceCell::new(),
        }
    }

    /// @ai:intent Built-ins plus every custom toolchain declared in config
    /// @ai:effects pure
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let mut registry = Self::with_builtins(&config.binaries);

        for spec in &config.custom_toolchains {
            registry.register(Arc::new(CommandToolchain::new(spec.clone())))?;
        }

        Ok(registry)
    }

    /// @ai:intent Add a toolchain; ids must be unique
    /// @ai:effects state:write
    pub fn register(&mut self, toolchain: Arc<dyn Toolchain>) -> Result<()> {
        if self.get(toolchain.id()).is_some() {
            return Err(HarnessError::DuplicateToolchain(toolchain.id().to_string()));
        }

        self.toolchains.push(toolchain);
        self.discovered = OnceCell::new();
        Ok(())
    }

    /// @ai:effects pure
    pub fn get(&self, id: &str) -> Option<Arc<dyn Toolchain>> {
        self.toolchains.iter().find(|t| t.id() == id).cloned()
    }

    /// @ai:intent Toolchain ids in registration order
    /// @ai:effects pure
    pub fn ids(&self) -> Vec<String> {
        self.toolchains.iter().map(|t| t.id().to_string()).collect()
    }

    /// @ai:intent Drop every toolchain the predicate rejects
    /// @ai:effects state:write
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.toolchains.retain(|t| keep(t.id()));
        self.discovered = OnceCell::new();
    }

    /// @ai:intent Probe every toolchain. Never fails: absence is recorded as data.
    ///            Safe to call repeatedly, e.g. after installing a toolchain.
    /// @ai:effects io
    pub async fn discover<I: ProcessInvokerTrait>(
        &self,
        invoker: &I,
        timeout: Duration,
    ) -> BTreeMap<String, ToolchainInfo> {
        let mut infos = BTreeMap::new();

        for toolchain in &self.toolchains {
            let info = probe(toolchain.as_ref(), invoker, timeout).await;
            infos.insert(info.id.clone(), info);
        }

        infos
    }

    /// @ai:intent Discover once and reuse the result for the registry's lifetime
    /// @ai:effects io
    pub async fn discovered<I: ProcessInvokerTrait>(
        &self,
        invoker: &I,
        timeout: Duration,
    ) -> &BTreeMap<String, ToolchainInfo> {
        self.discovered
            .get_or_init(|| self.discover(invoker, timeout))
            .await
    }

    /// @ai:intent Log a warning per unavailable toolchain
    /// @ai:effects io
    pub fn log_unavailable(infos: &BTreeMap<String, ToolchainInfo>) {
        for info in infos.values().filter(|i| !i.available) {
            tracing::warn!(
                "Toolchain '{}' ({}) not available - its trials will be recorded as unavailable",
                info.id,
                info.name
            );
        }
    }
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// @ai:intent Run one version probe and turn the outcome into a ToolchainInfo
/// @ai:effects io
async fn probe<I: ProcessInvokerTrait>(
    toolchain: &dyn Toolchain,
    invoker: &I,
    timeout: Duration,
) -> ToolchainInfo {
    let spec = toolchain.probe();
    let working_dir = std::env::temp_dir();
    let output = invoker.run(&spec.command, &working_dir, timeout).await;

    if output.success() {
        let version = spec.version.parse(&output.stdout);
        tracing::info!("Found {} {} (`{}`)", toolchain.name(), version, spec.command.program);

        return ToolchainInfo {
            id: toolchain.id().to_string(),
            name: toolchain.name().to_string(),
            version,
            available: true,
        };
    }

    match &output.outcome {
        ProcessOutcome::NotFound => {
            tracing::debug!("`{}` not found", spec.command.program);
        }
        ProcessOutcome::TimedOut => {
            tracing::warn!("Probe `{}` timed out after {:?}", spec.command, timeout);
        }
        ProcessOutcome::SpawnFailed(message) => {
            tracing::warn!("Probe `{}` could not start: {}", spec.command, message);
        }
        ProcessOutcome::Exited => {
            tracing::debug!("Probe `{}` exited with {:?}", spec.command, output.exit_code);
        }
    }

    ToolchainInfo::unavailable(toolchain.id(), toolchain.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{MockInvoker, ProcessInvoker, ProcessOutput};
    use crate::toolchain::{CommandToolchainSpec, VersionToken};
    use pretty_assertions::assert_eq;

    fn missing_binaries() -> BTreeMap<String, String> {
        ["ea", "rust", "cpp", "go"]
            .iter()
            .map(|id| (id.to_string(), format!("nonexistent_{id}_xyz")))
            .collect()
    }

    #[test]
    fn test_builtins_registered_in_order() {
        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());
        assert_eq!(registry.ids(), vec!["ea", "rust", "cpp", "go"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut config = HarnessConfig::default();
        config.custom_toolchains.push(CommandToolchainSpec {
            id: "rust".to_string(),
            name: "Rust again".to_string(),
            binary: "rustc".to_string(),
            probe_args: vec!["--version".to_string()],
            version_token: VersionToken::Word(1),
            extension: "rs".to_string(),
            build_args: vec![],
            artifact: None,
            artifact_required: false,
        });

        let err = ToolchainRegistry::from_config(&config).err();
        assert!(matches!(err, Some(HarnessError::DuplicateToolchain(id)) if id == "rust"));
    }

    #[tokio::test]
    async fn test_missing_binaries_are_unavailable_not_errors() {
        let registry = ToolchainRegistry::with_builtins(&missing_binaries());
        let infos = registry
            .discover(&ProcessInvoker::new(), Duration::from_secs(5))
            .await;

        assert_eq!(infos.len(), 4);
        assert!(infos.values().all(|i| !i.available));
        assert_eq!(infos["go"].version, "unknown");
    }

    #[tokio::test]
    async fn test_discover_parses_versions() {
        let mock = MockInvoker::new(MockInvoker::exited(1, Duration::ZERO));
        mock.push_responses([
            MockInvoker::with_stdout("ea 0.1.1\n"),
            MockInvoker::with_stdout("rustc 1.82.0 (f6e511eec 2024-10-15)\n"),
            MockInvoker::exited(127, Duration::ZERO),
            MockInvoker::with_stdout("go version go1.22.3 linux/amd64\n"),
        ]);

        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());
        let infos = registry.discover(&mock, Duration::from_secs(5)).await;

        assert_eq!(infos["ea"].version, "0.1.1");
        assert_eq!(infos["rust"].version, "1.82.0");
        assert!(!infos["cpp"].available);
        assert_eq!(infos["go"].version, "go1.22.3");
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let mock = MockInvoker::new(MockInvoker::with_stdout("tool 2.0.1\n"));
        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());

        let first = registry.discover(&mock, Duration::from_secs(5)).await;
        let second = registry.discover(&mock, Duration::from_secs(5)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_discovered_probes_only_once() {
        let mock = MockInvoker::new(MockInvoker::with_stdout("tool 2.0.1\n"));
        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());

        let first = registry.discovered(&mock, Duration::from_secs(5)).await.clone();
        let second = registry.discovered(&mock, Duration::from_secs(5)).await.clone();

        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_probe_success_without_version_is_available_unknown() {
        let mock = MockInvoker::new(ProcessOutput {
            stdout: "ok".to_string(),
            ..MockInvoker::exited(0, Duration::ZERO)
        });
        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());
        let infos = registry.discover(&mock, Duration::from_secs(5)).await;

        assert!(infos["cpp"].available);
        assert_eq!(infos["rust"].version, "unknown");
    }
}
