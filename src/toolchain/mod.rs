//! @ai:module:intent Toolchain capability contract and discovery
//! @ai:module:layer domain
//! @ai:module:public_api Toolchain, ToolchainInfo, ProbeSpec, VersionToken, BuildInvocation, ToolchainRegistry, CommandToolchain
//! @ai:module:stateless true

pub mod builtin;
pub mod command;
pub mod registry;

pub use builtin::{CppToolchain, EaToolchain, GoToolchain, RustToolchain};
pub use command::{CommandToolchain, CommandToolchainSpec};
pub use registry::ToolchainRegistry;

use crate::invoker::CommandSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Version recorded when a probe succeeds but no version can be read
pub const UNKNOWN_VERSION: &str = "unknown";

/// @ai:intent Discovery result for one toolchain; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub available: bool,
}

impl ToolchainInfo {
    /// @ai:intent Info for a toolchain whose probe failed
    /// @ai:effects pure
    pub fn unavailable(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: UNKNOWN_VERSION.to_string(),
            available: false,
        }
    }
}

/// @ai:intent Where the version lives in probe stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum VersionToken {
    /// Zero-based whitespace-delimited token of the first line
    Word(usize),
    /// The whole first line
    FirstLine,
}

impl Default for VersionToken {
    fn default() -> Self {
        VersionToken::Word(1)
    }
}

impl VersionToken {
    /// @ai:intent Extract a version from probe output, "unknown" if nothing fits
    /// @ai:effects pure
    pub fn parse(&self, stdout: &str) -> String {
        let first_line = stdout.lines().map(str::trim).find(|l| !l.is_empty());

        let picked = first_line.and_then(|line| match self {
            VersionToken::Word(index) => line.split_whitespace().nth(*index),
            VersionToken::FirstLine => Some(line),
        });

        picked
            .or_else(|| first_version_like(stdout))
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }
}

/// @ai:intent Find the first dotted version number anywhere in the text
/// @ai:effects pure
fn first_version_like(text: &str) -> Option<&str> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

    PATTERN
        .get_or_init(|| Regex::new(r"\b\d+\.\d+(?:\.\d+)?\S*").ok())
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str())
}

/// @ai:intent Version probe command for a toolchain
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    pub command: CommandSpec,
    pub version: VersionToken,
}

/// @ai:intent Canonical single-shot build of one source file
#[derive(Debug, Clone)]
pub struct BuildInvocation {
    pub command: CommandSpec,
    /// Output the build is expected to leave behind, if any
    pub artifact: Option<PathBuf>,
    /// Whether a missing artifact turns a zero exit into a failure
    pub artifact_required: bool,
}

/// @ai:intent Capability set every benchmarked toolchain implements.
///            New toolchains are added by registering another implementation.
pub trait Toolchain: Send + Sync {
    /// Stable key used by the corpus and results
    fn id(&self) -> &str;

    /// Human-readable label
    fn name(&self) -> &str;

    /// File extension for sources, without the dot
    fn source_extension(&self) -> &str;

    /// @ai:intent Command that reports the toolchain version
    fn probe(&self) -> ProbeSpec;

    /// @ai:intent Build command for `source`, writing outputs into `output_dir`
    fn build(&self, source: &Path, output_dir: &Path) -> BuildInvocation;
}

/// @ai:intent Source file stem used to name artifacts
/// @ai:effects pure
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}
