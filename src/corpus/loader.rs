//! @ai:module:intent TOML corpus loader for equivalence programs
//! @ai:module:layer infrastructure
//! @ai:module:public_api CorpusLoader, CorpusLoaderTrait
//! @ai:module:stateless true

use crate::corpus::{ProgramCorpus, TestCase};
use crate::error::{HarnessError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// @ai:intent Trait for loading an equivalence corpus
pub trait CorpusLoaderTrait: Send + Sync {
    /// @ai:intent Load every test case under the corpus directory
    fn load_all(&self, corpus_dir: &Path) -> Result<ProgramCorpus>;
}

/// On-disk layout of one test case file
#[derive(Debug, Deserialize)]
struct TestFile {
    test: TestSection,
    #[serde(default)]
    sources: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TestSection {
    id: String,
}

impl From<TestFile> for TestCase {
    fn from(file: TestFile) -> Self {
        TestCase {
            identifier: file.test.id,
            sources: file.sources,
        }
    }
}

/// @ai:intent Loads test cases from TOML files
/// @ai:effects pure (stateless)
pub struct CorpusLoader;

impl CorpusLoader {
    /// @ai:intent Create a new corpus loader
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Parse a single test case file
    /// @ai:effects fs:read
    fn parse_test_file(path: &Path) -> Result<TestCase> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::CorpusFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let file: TestFile = toml::from_str(&content).map_err(|e| HarnessError::CorpusFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if file.sources.is_empty() {
            return Err(HarnessError::CorpusFile {
                path: path.to_path_buf(),
                message: "no [sources] entries".to_string(),
            });
        }

        Ok(file.into())
    }

    /// @ai:intent Find all TOML files in directory, sorted for stable loading
    /// @ai:effects fs:read
    fn find_test_files(corpus_dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(corpus_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "toml")
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusLoaderTrait for CorpusLoader {
    /// @ai:intent Load every test case; any unreadable or invalid file fails the whole load
    /// @ai:effects fs:read
    fn load_all(&self, corpus_dir: &Path) -> Result<ProgramCorpus> {
        if !corpus_dir.is_dir() {
            return Err(HarnessError::CorpusFile {
                path: corpus_dir.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut corpus = ProgramCorpus::new();

        for path in Self::find_test_files(corpus_dir) {
            let test = Self::parse_test_file(&path)?;
            tracing::debug!(
                "Loaded test '{}' from {} ({} sources)",
                test.identifier,
                path.display(),
                test.sources.len()
            );
            corpus.insert(test)?;
        }

        tracing::info!("Loaded {} test cases from {}", corpus.len(), corpus_dir.display());
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const MATRIX: &str = r#"
[test]
id = "matrix"

[sources]
rust = "fn main() {}"
go = """
package main
func main() {}
"""
"#;

    #[test]
    fn test_load_nested_files() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "matrix.toml", MATRIX);
        create_test_file(
            temp.path(),
            "extra/loop.toml",
            "[test]\nid = \"loop\"\n\n[sources]\ncpp = \"int main() {}\"\n",
        );

        let corpus = CorpusLoader::new().load_all(temp.path()).unwrap();

        assert_eq!(corpus.test_ids(), vec!["loop".to_string(), "matrix".to_string()]);
        assert_eq!(corpus.get("matrix", "rust").unwrap(), "fn main() {}");
        assert!(corpus.get("matrix", "go").unwrap().contains("package main"));
    }

    #[test]
    fn test_non_toml_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "matrix.toml", MATRIX);
        create_test_file(temp.path(), "notes.md", "# not a test");

        let corpus = CorpusLoader::new().load_all(temp.path()).unwrap();
        assert_eq!(corpus.test_ids(), vec!["matrix".to_string()]);
    }

    #[test]
    fn test_malformed_file_fails_the_load() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "matrix.toml", MATRIX);
        create_test_file(temp.path(), "broken.toml", "[test\nid = ");

        let err = CorpusLoader::new().load_all(temp.path()).unwrap_err();
        match err {
            HarnessError::CorpusFile { path, .. } => assert_eq!(path, temp.path().join("broken.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_without_sources_fails_the_load() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "matrix.toml", MATRIX);
        create_test_file(temp.path(), "empty.toml", "[test]\nid = \"empty\"\n");

        let err = CorpusLoader::new().load_all(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no [sources] entries"));
        assert!(matches!(err, HarnessError::CorpusFile { ref path, .. } if path.ends_with("empty.toml")));
    }

    #[test]
    fn test_traversing_id_in_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        create_test_file(
            temp.path(),
            "evil.toml",
            "[test]\nid = \"../../tmp/pwn\"\n\n[sources]\nrust = \"fn main() {}\"\n",
        );

        let err = CorpusLoader::new().load_all(temp.path()).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidTestId(id) if id == "../../tmp/pwn"));
    }

    #[test]
    fn test_duplicate_ids_are_an_error() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "a.toml", MATRIX);
        create_test_file(temp.path(), "b.toml", MATRIX);

        let err = CorpusLoader::new().load_all(temp.path()).unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateTest(id) if id == "matrix"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = CorpusLoader::new().load_all(&temp.path().join("nope"));
        assert!(matches!(result, Err(HarnessError::CorpusFile { .. })));
    }
}
