//! @ai:module:intent Run external commands with a hard timeout and scoped temp files
//! @ai:module:layer infrastructure
//! @ai:module:public_api ProcessInvokerTrait, ProcessInvoker, CommandSpec, ProcessOutput, ProcessOutcome, ScopedWorkspace, MockInvoker
//! @ai:module:stateless true
//!
//! Durations reported here are whole-process wall-clock latency: the clock starts
//! right before spawn and stops once the exit is observed, so OS scheduling and
//! process-creation overhead are included. They are not in-process compute time.

use crate::error::{HarnessError, Result};
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// @ai:intent A program plus arguments, detached from any working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    /// @ai:intent Create a command with no arguments
    /// @ai:effects pure
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// @ai:intent Append one argument
    /// @ai:effects pure
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// @ai:intent Append several arguments
    /// @ai:effects pure
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;

        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// @ai:intent How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process ran to completion (any exit code)
    Exited,
    /// The process overran its bound and was killed
    TimedOut,
    /// The binary does not exist
    NotFound,
    /// Spawning failed for another reason
    SpawnFailed(String),
}

/// @ai:intent Captured result of one external invocation
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub outcome: ProcessOutcome,
    /// None when the process never exited normally (signal, timeout, spawn failure)
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// @ai:intent True only if the process exited with status zero
    /// @ai:effects pure
    pub fn success(&self) -> bool {
        self.outcome == ProcessOutcome::Exited && self.exit_code == Some(0)
    }

    /// @ai:intent Output for an invocation that never started
    /// @ai:effects pure
    pub fn not_spawned(outcome: ProcessOutcome) -> Self {
        Self {
            outcome,
            exit_code: None,
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// @ai:intent Trait for running external processes
pub trait ProcessInvokerTrait: Send + Sync {
    /// @ai:intent Run a command in a working directory, killing it after `timeout`.
    ///            Spawn problems are reported in the outcome, not as errors.
    fn run(
        &self,
        command: &CommandSpec,
        working_dir: &Path,
        timeout: Duration,
    ) -> impl Future<Output = ProcessOutput> + Send;

    /// @ai:intent Create a uniquely-named workspace for one trial
    fn workspace(&self) -> Result<ScopedWorkspace>;
}

/// @ai:intent Runs real processes through tokio
pub struct ProcessInvoker {
    scratch_root: Option<PathBuf>,
}

impl ProcessInvoker {
    /// @ai:intent Create an invoker using the system temp directory for workspaces
    /// @ai:effects pure
    pub fn new() -> Self {
        Self { scratch_root: None }
    }

    /// @ai:intent Create an invoker placing workspaces under `root`
    /// @ai:effects pure
    pub fn with_scratch_root(root: PathBuf) -> Self {
        Self {
            scratch_root: Some(root),
        }
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessInvokerTrait for ProcessInvoker {
    /// @ai:intent Spawn, wait with timeout, capture output
    /// @ai:effects io
    async fn run(&self, command: &CommandSpec, working_dir: &Path, timeout: Duration) -> ProcessOutput {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own group so descendants can be killed together with the child
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!("Invoking `{}` in {}", command, working_dir.display());

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProcessOutput::not_spawned(ProcessOutcome::NotFound);
            }
            Err(e) => {
                return ProcessOutput::not_spawned(ProcessOutcome::SpawnFailed(e.to_string()));
            }
        };

        let pid = child.id();
        let deadline = tokio::time::Instant::from_std(start) + timeout;
        let mut stdout_task = tokio::spawn(drain(child.stdout.take()));
        let mut stderr_task = tokio::spawn(drain(child.stderr.take()));

        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                let duration = start.elapsed();

                // A background descendant can keep the pipes open past the exit
                let drained = tokio::time::timeout_at(deadline, async {
                    let stdout = (&mut stdout_task).await.unwrap_or_default();
                    let stderr = (&mut stderr_task).await.unwrap_or_default();
                    (stdout, stderr)
                })
                .await;

                let (stdout, stderr) = match drained {
                    Ok(captured) => captured,
                    Err(_) => {
                        tracing::warn!(
                            "`{}` exited but its output stayed open until the deadline, killing leftover processes",
                            command.program
                        );
                        kill_process_group(pid);
                        stdout_task.abort();
                        stderr_task.abort();
                        (String::new(), String::new())
                    }
                };

                tracing::debug!(
                    "`{}` exited with {:?} after {:?} ({} bytes stdout, {} bytes stderr)",
                    command.program,
                    status.code(),
                    duration,
                    stdout.len(),
                    stderr.len()
                );

                ProcessOutput {
                    outcome: ProcessOutcome::Exited,
                    exit_code: status.code(),
                    duration,
                    stdout,
                    stderr,
                }
            }
            Ok(Err(e)) => {
                let duration = start.elapsed();
                kill_process_group(pid);
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();

                ProcessOutput {
                    outcome: ProcessOutcome::SpawnFailed(format!("wait failed: {e}")),
                    exit_code: None,
                    duration,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
            Err(_) => {
                let duration = start.elapsed();

                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    tracing::error!("Failed to kill overrunning `{}`: {}", command.program, e);
                }
                stdout_task.abort();
                stderr_task.abort();

                ProcessOutput {
                    outcome: ProcessOutcome::TimedOut,
                    exit_code: None,
                    duration,
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
        }
    }

    /// @ai:intent Create a workspace under the configured scratch root
    /// @ai:effects fs:write
    fn workspace(&self) -> Result<ScopedWorkspace> {
        match &self.scratch_root {
            Some(root) => ScopedWorkspace::create_in(root),
            None => ScopedWorkspace::create(),
        }
    }
}

/// @ai:intent SIGKILL every process in the group led by `pid`
/// @ai:effects process:kill
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };

    // A negative pid addresses the whole process group
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if ret == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!("Failed to kill process group {}: {}", pid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// @ai:intent Read a child pipe to completion
/// @ai:effects io
async fn drain<R: tokio::io::AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();

    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// @ai:intent Uniquely-named directory owned by exactly one trial.
///            Everything inside is deleted when the value is dropped,
///            on every exit path including early returns and timeouts.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: TempDir,
}

impl ScopedWorkspace {
    const PREFIX: &'static str = "compiler-bench-";

    /// @ai:intent Create a workspace in the system temp directory
    /// @ai:effects fs:write
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir()
            .map_err(HarnessError::Workspace)?;
        Ok(Self { dir })
    }

    /// @ai:intent Create a workspace under `root`, creating `root` if needed
    /// @ai:effects fs:write
    pub fn create_in(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(HarnessError::Workspace)?;
        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir_in(root)
            .map_err(HarnessError::Workspace)?;
        Ok(Self { dir })
    }

    /// @ai:effects pure
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// @ai:intent Write an input file into the workspace and return its path
    /// @ai:pre file_name is one plain path component
    /// @ai:effects fs:write
    pub fn write_input(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        if !is_plain_file_name(file_name) {
            return Err(HarnessError::Workspace(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{file_name}' would resolve outside the workspace"),
            )));
        }

        let path = self.dir.path().join(file_name);
        std::fs::write(&path, contents).map_err(HarnessError::Workspace)?;
        Ok(path)
    }

    /// @ai:intent Delete the workspace now, reporting any failure
    /// @ai:effects fs:write
    pub fn close(self) -> Result<()> {
        self.dir.close().map_err(HarnessError::Workspace)
    }
}

/// @ai:intent True when `name` is exactly one normal path component,
///            so joining it onto a directory stays inside that directory
/// @ai:effects pure
pub fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// @ai:intent Scripted invoker for tests: replays queued outputs and counts spawns
pub struct MockInvoker {
    responses: Mutex<VecDeque<ProcessOutput>>,
    fallback: ProcessOutput,
    calls: AtomicUsize,
    commands: Mutex<Vec<CommandSpec>>,
    scratch_root: Option<PathBuf>,
}

impl MockInvoker {
    /// @ai:intent Create a mock that answers every call with `fallback` once the queue is empty
    /// @ai:effects pure
    pub fn new(fallback: ProcessOutput) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            scratch_root: None,
        }
    }

    /// @ai:intent Mock whose processes all exit zero instantly
    /// @ai:effects pure
    pub fn succeeding() -> Self {
        Self::new(Self::exited(0, Duration::ZERO))
    }

    /// @ai:intent Place workspaces under `root`
    /// @ai:effects pure
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    /// @ai:intent Queue outputs returned in order before the fallback
    /// @ai:effects state:write
    pub fn push_responses(&self, outputs: impl IntoIterator<Item = ProcessOutput>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.extend(outputs);
        }
    }

    /// @ai:intent Build an output for a process that exited with `code`
    /// @ai:effects pure
    pub fn exited(code: i32, duration: Duration) -> ProcessOutput {
        ProcessOutput {
            outcome: ProcessOutcome::Exited,
            exit_code: Some(code),
            duration,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// @ai:intent Build a successful output with the given stdout
    /// @ai:effects pure
    pub fn with_stdout(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            ..Self::exited(0, Duration::ZERO)
        }
    }

    /// @ai:intent Number of processes "spawned" so far
    /// @ai:effects pure
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// @ai:intent Commands received so far
    /// @ai:effects pure
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl ProcessInvokerTrait for MockInvoker {
    async fn run(&self, command: &CommandSpec, _working_dir: &Path, _timeout: Duration) -> ProcessOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }

        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn workspace(&self) -> Result<ScopedWorkspace> {
        match &self.scratch_root {
            Some(root) => ScopedWorkspace::create_in(root),
            None => ScopedWorkspace::create(),
        }
    }
}
