//! @ai:module:intent Equivalence corpus: one source program per toolchain for each test case
//! @ai:module:layer domain
//! @ai:module:public_api TestCase, ProgramCorpus, CorpusLoader
//! @ai:module:stateless true
//!
//! Every variant of a test case must implement the same algorithm with the same
//! asymptotic behavior. That cannot be checked at runtime, so sources are kept
//! grouped by test id where they can be diffed side by side.

pub mod builtin;
pub mod loader;

pub use loader::{CorpusLoader, CorpusLoaderTrait};

use crate::error::{HarnessError, MissingProgram, Result};
use crate::invoker::is_plain_file_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// @ai:intent One logical benchmark program with a source per toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub identifier: String,
    /// Source text keyed by toolchain id
    pub sources: BTreeMap<String, String>,
}

impl TestCase {
    /// @ai:intent Create a test case with no sources yet
    /// @ai:effects pure
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            sources: BTreeMap::new(),
        }
    }

    /// @ai:intent Add the variant for one toolchain
    /// @ai:effects pure
    pub fn with_source(mut self, toolchain: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(toolchain.into(), source.into());
        self
    }

    /// @ai:intent Toolchain ids this test case has a program for, sorted
    /// @ai:effects pure
    pub fn toolchains(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// @ai:effects pure
    pub fn source(&self, toolchain: &str) -> Option<&str> {
        self.sources.get(toolchain).map(String::as_str)
    }
}

/// @ai:intent Test cases keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct ProgramCorpus {
    tests: BTreeMap<String, TestCase>,
}

impl ProgramCorpus {
    /// @ai:intent Create an empty corpus
    /// @ai:effects pure
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent The programs shipped with the harness
    /// @ai:effects pure
    pub fn builtin() -> Self {
        Self {
            tests: builtin::test_cases()
                .into_iter()
                .map(|t| (t.identifier.clone(), t))
                .collect(),
        }
    }

    /// @ai:intent Corpus from TOML files under `corpus_dir`, or the built-in one when unset
    /// @ai:effects fs:read
    pub fn load(corpus_dir: Option<&Path>) -> Result<Self> {
        match corpus_dir {
            Some(dir) => CorpusLoader::new().load_all(dir),
            None => Ok(Self::builtin()),
        }
    }

    /// @ai:intent Add a test case; identifiers must be unique and usable as a file stem
    /// @ai:effects state:write
    pub fn insert(&mut self, test: TestCase) -> Result<()> {
        if !is_plain_file_name(&test.identifier) {
            return Err(HarnessError::InvalidTestId(test.identifier));
        }

        if self.tests.contains_key(&test.identifier) {
            return Err(HarnessError::DuplicateTest(test.identifier));
        }

        self.tests.insert(test.identifier.clone(), test);
        Ok(())
    }

    /// @ai:intent Source text for a (test, toolchain) pair
    /// @ai:effects pure
    pub fn get(&self, test: &str, toolchain: &str) -> Result<&str> {
        self.tests
            .get(test)
            .and_then(|t| t.source(toolchain))
            .ok_or_else(|| HarnessError::ProgramNotFound {
                test: test.to_string(),
                toolchain: toolchain.to_string(),
            })
    }

    /// @ai:effects pure
    pub fn test(&self, identifier: &str) -> Option<&TestCase> {
        self.tests.get(identifier)
    }

    /// @ai:intent Test identifiers in sorted order
    /// @ai:effects pure
    pub fn test_ids(&self) -> Vec<String> {
        self.tests.keys().cloned().collect()
    }

    /// @ai:effects pure
    pub fn tests(&self) -> impl Iterator<Item = &TestCase> {
        self.tests.values()
    }

    /// @ai:effects pure
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// @ai:effects pure
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// @ai:intent Fail with every (test, toolchain) pair that has no program.
    ///            A test id absent from the corpus counts as missing for all toolchains.
    /// @ai:effects pure
    pub fn validate_complete(&self, tests: &[String], toolchains: &[String]) -> Result<()> {
        let missing: Vec<MissingProgram> = tests
            .iter()
            .flat_map(|test| {
                toolchains
                    .iter()
                    .filter(move |toolchain| self.get(test, toolchain).is_err())
                    .map(move |toolchain| MissingProgram {
                        test: test.clone(),
                        toolchain: toolchain.clone(),
                    })
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::CorpusMissing { missing })
        }
    }
}
