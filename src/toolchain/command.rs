//! @ai:module:intent Toolchain declared entirely in configuration
//! @ai:module:layer infrastructure
//! @ai:module:public_api CommandToolchain, CommandToolchainSpec
//! @ai:module:stateless true

use crate::invoker::CommandSpec;
use crate::toolchain::{file_stem, BuildInvocation, ProbeSpec, Toolchain, VersionToken};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// @ai:intent Declarative toolchain definition.
///            `build_args` and `artifact` expand `{source}`, `{output_dir}` and `{stem}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandToolchainSpec {
    pub id: String,
    pub name: String,
    pub binary: String,
    #[serde(default = "default_probe_args")]
    pub probe_args: Vec<String>,
    #[serde(default)]
    pub version_token: VersionToken,
    pub extension: String,
    pub build_args: Vec<String>,
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default = "default_artifact_required")]
    pub artifact_required: bool,
}

fn default_probe_args() -> Vec<String> {
    vec!["--version".to_string()]
}

fn default_artifact_required() -> bool {
    true
}

/// @ai:intent Toolchain driven by a CommandToolchainSpec
pub struct CommandToolchain {
    spec: CommandToolchainSpec,
}

impl CommandToolchain {
    /// @ai:effects pure
    pub fn new(spec: CommandToolchainSpec) -> Self {
        Self { spec }
    }

    /// @ai:intent Substitute placeholders in one template
    /// @ai:effects pure
    fn expand(template: &str, source: &Path, output_dir: &Path) -> String {
        template
            .replace("{source}", &source.to_string_lossy())
            .replace("{output_dir}", &output_dir.to_string_lossy())
            .replace("{stem}", &file_stem(source))
    }
}

impl Toolchain for CommandToolchain {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn source_extension(&self) -> &str {
        &self.spec.extension
    }

    fn probe(&self) -> ProbeSpec {
        ProbeSpec {
            command: CommandSpec::new(&self.spec.binary).args(&self.spec.probe_args),
            version: self.spec.version_token,
        }
    }

    fn build(&self, source: &Path, output_dir: &Path) -> BuildInvocation {
        let args = self
            .spec
            .build_args
            .iter()
            .map(|a| Self::expand(a, source, output_dir));

        let artifact = self
            .spec
            .artifact
            .as_deref()
            .map(|a| PathBuf::from(Self::expand(a, source, output_dir)));

        BuildInvocation {
            command: CommandSpec::new(&self.spec.binary).args(args),
            artifact_required: self.spec.artifact_required && artifact.is_some(),
            artifact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clang_spec() -> CommandToolchainSpec {
        CommandToolchainSpec {
            id: "c".to_string(),
            name: "C (clang)".to_string(),
            binary: "clang".to_string(),
            probe_args: default_probe_args(),
            version_token: VersionToken::Word(2),
            extension: "c".to_string(),
            build_args: vec![
                "-O2".to_string(),
                "-c".to_string(),
                "-o".to_string(),
                "{output_dir}/{stem}.o".to_string(),
                "{source}".to_string(),
            ],
            artifact: Some("{output_dir}/{stem}.o".to_string()),
            artifact_required: true,
        }
    }

    #[test]
    fn test_expands_placeholders() {
        let toolchain = CommandToolchain::new(clang_spec());
        let invocation = toolchain.build(Path::new("/w/fibonacci.c"), Path::new("/w"));

        assert_eq!(
            invocation.command.to_string(),
            "clang -O2 -c -o /w/fibonacci.o /w/fibonacci.c"
        );
        assert_eq!(invocation.artifact, Some(PathBuf::from("/w/fibonacci.o")));
        assert!(invocation.artifact_required);
    }

    #[test]
    fn test_no_artifact_means_not_required() {
        let mut spec = clang_spec();
        spec.artifact = None;
        let invocation = CommandToolchain::new(spec).build(Path::new("/w/a.c"), Path::new("/w"));
        assert!(invocation.artifact.is_none());
        assert!(!invocation.artifact_required);
    }

    #[test]
    fn test_spec_from_toml_uses_defaults() {
        let spec: CommandToolchainSpec = toml::from_str(
            r#"
id = "zig"
name = "Zig"
binary = "zig"
extension = "zig"
build_args = ["build-exe", "-O", "ReleaseFast", "{source}"]
"#,
        )
        .unwrap();

        assert_eq!(spec.probe_args, vec!["--version".to_string()]);
        assert_eq!(spec.version_token, VersionToken::Word(1));
        assert!(spec.artifact.is_none());
        assert!(spec.artifact_required);
    }
}
