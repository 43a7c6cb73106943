//! @ai:module:intent Error types for the benchmarking harness
//! @ai:module:layer domain
//! @ai:module:public_api HarnessError, MissingProgram, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent A (test case, toolchain) pair with no registered source program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingProgram {
    pub test: String,
    pub toolchain: String,
}

impl std::fmt::Display for MissingProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.test, self.toolchain)
    }
}

/// @ai:intent Errors that stop the harness itself from functioning.
///            Per-trial failures are data (TrialStatus), never one of these.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("No program registered for test '{test}' and toolchain '{toolchain}'")]
    ProgramNotFound { test: String, toolchain: String },

    #[error("Incomplete equivalence corpus, missing: {}", format_missing(.missing))]
    CorpusMissing { missing: Vec<MissingProgram> },

    #[error("Unknown toolchain: {0}")]
    UnknownToolchain(String),

    #[error("Unknown test case: {0}")]
    UnknownTest(String),

    #[error("Toolchain registered twice: {0}")]
    DuplicateToolchain(String),

    #[error("Test case defined twice: {0}")]
    DuplicateTest(String),

    #[error("Invalid test id '{0}': must be a single plain file name component")]
    InvalidTestId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to prepare trial workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Invalid corpus file {path}: {message}")]
    CorpusFile { path: PathBuf, message: String },

    #[error("Benchmark task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn format_missing(missing: &[MissingProgram]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_missing_lists_every_pair() {
        let err = HarnessError::CorpusMissing {
            missing: vec![
                MissingProgram {
                    test: "fibonacci".to_string(),
                    toolchain: "go".to_string(),
                },
                MissingProgram {
                    test: "sorting".to_string(),
                    toolchain: "cpp".to_string(),
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("fibonacci/go"));
        assert!(message.contains("sorting/cpp"));
    }
}
