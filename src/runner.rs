//! @ai:module:intent Execute a single timed build of one test program
//! @ai:module:layer application
//! @ai:module:public_api BenchmarkRunner, TrialResult, TrialStatus
//! @ai:module:stateless false

use crate::corpus::ProgramCorpus;
use crate::error::{HarnessError, Result};
use crate::invoker::{ProcessInvokerTrait, ProcessOutcome, ProcessOutput};
use crate::toolchain::{BuildInvocation, ToolchainInfo, ToolchainRegistry};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// @ai:intent Why a trial ended the way it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStatus {
    Succeeded,
    /// The build exited non-zero (None when killed by a signal)
    BuildFailed { exit_code: Option<i32> },
    /// The build overran its bound and was killed
    TimedOut,
    /// Exit status zero but the required artifact was not produced
    MissingArtifact,
    /// The binary of an available toolchain could not be started
    SpawnFailed { message: String },
    /// The toolchain was not found at discovery; nothing was spawned
    Unavailable,
}

/// @ai:intent Outcome of one timed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub toolchain: String,
    pub test_identifier: String,
    /// Wall-clock latency of the build process, zero if nothing was spawned
    pub duration: Duration,
    pub success: bool,
    /// Size of the produced artifact; only recorded for successful trials
    pub artifact_size: Option<u64>,
    pub status: TrialStatus,
}

impl TrialResult {
    /// @ai:intent Synthesized failure for a toolchain that is not installed
    /// @ai:effects pure
    pub fn unavailable(toolchain: &str, test: &str) -> Self {
        Self {
            toolchain: toolchain.to_string(),
            test_identifier: test.to_string(),
            duration: Duration::ZERO,
            success: false,
            artifact_size: None,
            status: TrialStatus::Unavailable,
        }
    }
}

/// @ai:intent Runs single trials against discovered toolchains
pub struct BenchmarkRunner<I: ProcessInvokerTrait> {
    registry: Arc<ToolchainRegistry>,
    infos: BTreeMap<String, ToolchainInfo>,
    corpus: Arc<ProgramCorpus>,
    invoker: Arc<I>,
    build_timeout: Duration,
}

impl<I: ProcessInvokerTrait> BenchmarkRunner<I> {
    /// @ai:intent Create a runner; `infos` is the discovery snapshot
    /// @ai:effects pure
    pub fn new(
        registry: Arc<ToolchainRegistry>,
        infos: BTreeMap<String, ToolchainInfo>,
        corpus: Arc<ProgramCorpus>,
        invoker: Arc<I>,
        build_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            infos,
            corpus,
            invoker,
            build_timeout,
        }
    }

    /// @ai:effects pure
    pub fn infos(&self) -> &BTreeMap<String, ToolchainInfo> {
        &self.infos
    }

    /// @ai:intent Whether discovery found the toolchain
    /// @ai:effects pure
    pub fn is_available(&self, toolchain_id: &str) -> bool {
        self.infos
            .get(toolchain_id)
            .map(|info| info.available)
            .unwrap_or(false)
    }

    /// @ai:intent Build one test program once and time it.
    ///            Build problems are reported in the TrialResult; only harness
    ///            failures (unknown ids, no workspace) are errors.
    /// @ai:effects io, fs:write
    pub async fn run_once(&self, toolchain_id: &str, test_id: &str) -> Result<TrialResult> {
        let toolchain = self
            .registry
            .get(toolchain_id)
            .ok_or_else(|| HarnessError::UnknownToolchain(toolchain_id.to_string()))?;
        let source = self.corpus.get(test_id, toolchain_id)?;

        if !self.is_available(toolchain_id) {
            return Ok(TrialResult::unavailable(toolchain_id, test_id));
        }

        let workspace = self.invoker.workspace()?;
        let file_name = format!("{}.{}", test_id, toolchain.source_extension());
        let source_path = workspace.write_input(&file_name, source)?;

        let invocation = toolchain.build(&source_path, workspace.path());
        let output = self
            .invoker
            .run(&invocation.command, workspace.path(), self.build_timeout)
            .await;

        let artifact_size = collect_artifact(&invocation);
        let status = self.classify(toolchain_id, test_id, &invocation, &output, artifact_size);

        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove trial workspace: {}", e);
        }

        let success = status == TrialStatus::Succeeded;
        Ok(TrialResult {
            toolchain: toolchain_id.to_string(),
            test_identifier: test_id.to_string(),
            duration: output.duration,
            success,
            artifact_size: if success { artifact_size } else { None },
            status,
        })
    }

    /// @ai:intent Turn a process outcome into a trial status, logging failures
    /// @ai:effects io
    fn classify(
        &self,
        toolchain_id: &str,
        test_id: &str,
        invocation: &BuildInvocation,
        output: &ProcessOutput,
        artifact_size: Option<u64>,
    ) -> TrialStatus {
        match &output.outcome {
            ProcessOutcome::TimedOut => {
                tracing::warn!(
                    "{}/{} timed out after {:?} and was killed",
                    toolchain_id,
                    test_id,
                    self.build_timeout
                );
                TrialStatus::TimedOut
            }
            ProcessOutcome::NotFound => {
                tracing::warn!("{}/{}: `{}` not found", toolchain_id, test_id, invocation.command.program);
                TrialStatus::SpawnFailed {
                    message: format!("`{}` not found", invocation.command.program),
                }
            }
            ProcessOutcome::SpawnFailed(message) => {
                tracing::warn!("{}/{}: could not start build: {}", toolchain_id, test_id, message);
                TrialStatus::SpawnFailed {
                    message: message.clone(),
                }
            }
            ProcessOutcome::Exited if output.exit_code != Some(0) => {
                tracing::warn!(
                    "{}/{} build failed with exit code {:?}",
                    toolchain_id,
                    test_id,
                    output.exit_code
                );
                tracing::debug!("stderr: {}", output.stderr.trim());
                TrialStatus::BuildFailed {
                    exit_code: output.exit_code,
                }
            }
            ProcessOutcome::Exited if invocation.artifact_required && artifact_size.is_none() => {
                tracing::warn!("{}/{} exited cleanly but produced no artifact", toolchain_id, test_id);
                TrialStatus::MissingArtifact
            }
            ProcessOutcome::Exited => TrialStatus::Succeeded,
        }
    }
}

/// @ai:intent Stat the build artifact and delete it so nothing accumulates
/// @ai:effects fs:write
fn collect_artifact(invocation: &BuildInvocation) -> Option<u64> {
    let path = invocation.artifact.as_deref()?;
    let size = std::fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len());

    if size.is_some() {
        remove_artifact(path);
    }

    size
}

fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Failed to delete artifact {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::corpus::TestCase;
    use crate::invoker::MockInvoker;
    use crate::toolchain::{CommandToolchainSpec, VersionToken};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn infos(registry: &ToolchainRegistry, unavailable: &[&str]) -> BTreeMap<String, ToolchainInfo> {
        registry
            .ids()
            .into_iter()
            .map(|id| {
                let info = ToolchainInfo {
                    id: id.clone(),
                    name: id.clone(),
                    version: "1.0".to_string(),
                    available: !unavailable.contains(&id.as_str()),
                };
                (id, info)
            })
            .collect()
    }

    fn runner<I: ProcessInvokerTrait>(invoker: I, unavailable: &[&str]) -> BenchmarkRunner<I> {
        let registry = ToolchainRegistry::with_builtins(&BTreeMap::new());
        let infos = infos(&registry, unavailable);
        BenchmarkRunner::new(
            Arc::new(registry),
            infos,
            Arc::new(ProgramCorpus::builtin()),
            Arc::new(invoker),
            Duration::from_secs(10),
        )
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_unavailable_toolchain_never_spawns() {
        let runner = runner(MockInvoker::succeeding(), &["go"]);

        for test in ["fibonacci", "sorting"] {
            let trial = runner.run_once("go", test).await.unwrap();
            assert!(!trial.success);
            assert_eq!(trial.duration, Duration::ZERO);
            assert_eq!(trial.status, TrialStatus::Unavailable);
        }

        assert_eq!(runner.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_trial_records_duration() {
        let mock = MockInvoker::new(MockInvoker::exited(0, Duration::from_millis(12)));
        let runner = runner(mock, &[]);

        // ea leaves an optional artifact, so a clean exit is enough
        let trial = runner.run_once("ea", "fibonacci").await.unwrap();
        assert!(trial.success);
        assert_eq!(trial.status, TrialStatus::Succeeded);
        assert_eq!(trial.duration, Duration::from_millis(12));
        assert_eq!(trial.artifact_size, None);

        let command = &runner.invoker.commands()[0];
        assert_eq!(command.program, "ea");
        assert!(command.args[1].to_string_lossy().ends_with("fibonacci.ea"));
    }

    #[tokio::test]
    async fn test_missing_required_artifact_is_failure() {
        let runner = runner(MockInvoker::succeeding(), &[]);
        let trial = runner.run_once("rust", "sorting").await.unwrap();

        assert!(!trial.success);
        assert_eq!(trial.status, TrialStatus::MissingArtifact);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_build_failure() {
        let mock = MockInvoker::new(MockInvoker::exited(1, Duration::from_millis(3)));
        let runner = runner(mock, &[]);
        let trial = runner.run_once("cpp", "fibonacci").await.unwrap();

        assert!(!trial.success);
        assert_eq!(trial.status, TrialStatus::BuildFailed { exit_code: Some(1) });
        assert_eq!(trial.artifact_size, None);
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_failure() {
        let mock = MockInvoker::new(ProcessOutput {
            outcome: ProcessOutcome::TimedOut,
            exit_code: None,
            duration: Duration::from_secs(10),
            stdout: String::new(),
            stderr: String::new(),
        });
        let runner = runner(mock, &[]);
        let trial = runner.run_once("go", "sorting").await.unwrap();

        assert!(!trial.success);
        assert_eq!(trial.status, TrialStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_spawn_failure_of_available_toolchain_is_data() {
        let mock = MockInvoker::new(ProcessOutput::not_spawned(ProcessOutcome::NotFound));
        let runner = runner(mock, &[]);
        let trial = runner.run_once("rust", "fibonacci").await.unwrap();

        assert!(matches!(trial.status, TrialStatus::SpawnFailed { .. }));
        assert_eq!(trial.duration, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_errors() {
        let runner = runner(MockInvoker::succeeding(), &[]);

        let err = runner.run_once("zig", "fibonacci").await.unwrap_err();
        assert!(matches!(err, HarnessError::UnknownToolchain(id) if id == "zig"));

        let err = runner.run_once("rust", "matrix").await.unwrap_err();
        assert!(matches!(err, HarnessError::ProgramNotFound { .. }));
    }

    #[tokio::test]
    async fn test_workspace_removed_after_trial() {
        let scratch = TempDir::new().unwrap();
        let mock = MockInvoker::new(MockInvoker::exited(1, Duration::ZERO))
            .with_scratch_root(scratch.path().to_path_buf());
        let runner = runner(mock, &[]);

        runner.run_once("rust", "fibonacci").await.unwrap();
        runner.run_once("ea", "sorting").await.unwrap();

        assert_eq!(runner.invoker.call_count(), 2);
        assert!(dir_is_empty(scratch.path()));
    }

    #[cfg(unix)]
    mod real_process {
        use super::*;
        use crate::invoker::ProcessInvoker;
        use pretty_assertions::assert_eq;

        fn sh_toolchain(script: &str) -> CommandToolchainSpec {
            CommandToolchainSpec {
                id: "sh".to_string(),
                name: "Shell".to_string(),
                binary: "sh".to_string(),
                probe_args: vec!["-c".to_string(), "echo sh 1.0".to_string()],
                version_token: VersionToken::Word(1),
                extension: "sh".to_string(),
                build_args: vec!["-c".to_string(), script.to_string()],
                artifact: Some("{output_dir}/{stem}.out".to_string()),
                artifact_required: true,
            }
        }

        fn sh_runner(script: &str, scratch: &Path, timeout: Duration) -> BenchmarkRunner<ProcessInvoker> {
            let mut config = HarnessConfig::default();
            config.custom_toolchains.push(sh_toolchain(script));
            let registry = ToolchainRegistry::from_config(&config).unwrap();
            let infos = infos(&registry, &[]);

            let mut corpus = ProgramCorpus::new();
            corpus
                .insert(TestCase::new("noop").with_source("sh", "exit 0\n"))
                .unwrap();

            BenchmarkRunner::new(
                Arc::new(registry),
                infos,
                Arc::new(corpus),
                Arc::new(ProcessInvoker::with_scratch_root(scratch.to_path_buf())),
                timeout,
            )
        }

        #[tokio::test]
        async fn test_artifact_is_measured_then_deleted() {
            let scratch = TempDir::new().unwrap();
            let runner = sh_runner(
                "printf 'artifact' > noop.out",
                scratch.path(),
                Duration::from_secs(10),
            );

            let trial = runner.run_once("sh", "noop").await.unwrap();

            assert_eq!(trial.status, TrialStatus::Succeeded);
            assert_eq!(trial.artifact_size, Some(8));
            assert!(trial.duration > Duration::ZERO);
            assert!(dir_is_empty(scratch.path()));
        }

        #[tokio::test]
        async fn test_overrunning_build_is_killed_and_cleaned_up() {
            let scratch = TempDir::new().unwrap();
            let runner = sh_runner("sleep 30", scratch.path(), Duration::from_millis(200));

            let start = std::time::Instant::now();
            let trial = runner.run_once("sh", "noop").await.unwrap();

            assert_eq!(trial.status, TrialStatus::TimedOut);
            assert!(!trial.success);
            assert!(start.elapsed() < Duration::from_secs(10));
            assert!(dir_is_empty(scratch.path()));
        }

        #[tokio::test]
        async fn test_failing_build_leaves_nothing_behind() {
            let scratch = TempDir::new().unwrap();
            let runner = sh_runner(
                "printf 'partial' > noop.out; exit 2",
                scratch.path(),
                Duration::from_secs(10),
            );

            let trial = runner.run_once("sh", "noop").await.unwrap();

            assert_eq!(trial.status, TrialStatus::BuildFailed { exit_code: Some(2) });
            assert_eq!(trial.artifact_size, None);
            assert!(dir_is_empty(scratch.path()));
        }
    }
}
