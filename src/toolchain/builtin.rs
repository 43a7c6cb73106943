//! @ai:module:intent Built-in toolchains: the subject compiler plus Rust, C++ and Go
//! @ai:module:layer infrastructure
//! @ai:module:public_api EaToolchain, RustToolchain, CppToolchain, GoToolchain
//! @ai:module:stateless true
//!
//! Every build enables optimizations so timings reflect production builds.

use crate::invoker::CommandSpec;
use crate::toolchain::{file_stem, BuildInvocation, ProbeSpec, Toolchain, VersionToken};
use std::path::Path;

/// @ai:intent The subject compiler, emitting LLVM IR beside its input
pub struct EaToolchain {
    binary: String,
}

impl EaToolchain {
    pub const ID: &'static str = "ea";

    /// @ai:effects pure
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for EaToolchain {
    fn default() -> Self {
        Self::new("ea")
    }
}

impl Toolchain for EaToolchain {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Eä"
    }

    fn source_extension(&self) -> &str {
        "ea"
    }

    fn probe(&self) -> ProbeSpec {
        ProbeSpec {
            command: CommandSpec::new(&self.binary).arg("--version"),
            version: VersionToken::Word(1),
        }
    }

    fn build(&self, source: &Path, _output_dir: &Path) -> BuildInvocation {
        // The compiler picks its own output path: <stem>.ll next to the source
        let artifact = source.with_extension("ll");

        BuildInvocation {
            command: CommandSpec::new(&self.binary).arg("--emit-llvm").arg(source),
            artifact: Some(artifact),
            artifact_required: false,
        }
    }
}

/// @ai:intent rustc producing optimized LLVM IR
pub struct RustToolchain {
    binary: String,
}

impl RustToolchain {
    pub const ID: &'static str = "rust";

    /// @ai:effects pure
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for RustToolchain {
    fn default() -> Self {
        Self::new("rustc")
    }
}

impl Toolchain for RustToolchain {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Rust"
    }

    fn source_extension(&self) -> &str {
        "rs"
    }

    fn probe(&self) -> ProbeSpec {
        ProbeSpec {
            command: CommandSpec::new(&self.binary).arg("--version"),
            version: VersionToken::Word(1),
        }
    }

    fn build(&self, source: &Path, output_dir: &Path) -> BuildInvocation {
        let artifact = output_dir.join(format!("{}.ll", file_stem(source)));

        BuildInvocation {
            command: CommandSpec::new(&self.binary)
                .arg("-O")
                .arg("--emit=llvm-ir")
                .arg("-o")
                .arg(&artifact)
                .arg(source),
            artifact: Some(artifact),
            artifact_required: true,
        }
    }
}

/// @ai:intent g++ producing optimized assembly
pub struct CppToolchain {
    binary: String,
}

impl CppToolchain {
    pub const ID: &'static str = "cpp";

    /// @ai:effects pure
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CppToolchain {
    fn default() -> Self {
        Self::new("g++")
    }
}

impl Toolchain for CppToolchain {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "C++"
    }

    fn source_extension(&self) -> &str {
        "cpp"
    }

    fn probe(&self) -> ProbeSpec {
        ProbeSpec {
            command: CommandSpec::new(&self.binary).arg("--version"),
            version: VersionToken::FirstLine,
        }
    }

    fn build(&self, source: &Path, output_dir: &Path) -> BuildInvocation {
        let artifact = output_dir.join(format!("{}.s", file_stem(source)));

        BuildInvocation {
            command: CommandSpec::new(&self.binary)
                .arg("-O2")
                .arg("-S")
                .arg("-o")
                .arg(&artifact)
                .arg(source),
            artifact: Some(artifact),
            artifact_required: true,
        }
    }
}

/// @ai:intent go build producing a native executable
pub struct GoToolchain {
    binary: String,
}

impl GoToolchain {
    pub const ID: &'static str = "go";

    /// @ai:effects pure
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new("go")
    }
}

impl Toolchain for GoToolchain {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Go"
    }

    fn source_extension(&self) -> &str {
        "go"
    }

    fn probe(&self) -> ProbeSpec {
        ProbeSpec {
            command: CommandSpec::new(&self.binary).arg("version"),
            version: VersionToken::Word(2),
        }
    }

    fn build(&self, source: &Path, output_dir: &Path) -> BuildInvocation {
        let artifact = output_dir.join(file_stem(source));

        BuildInvocation {
            command: CommandSpec::new(&self.binary)
                .arg("build")
                .arg("-o")
                .arg(&artifact)
                .arg(source),
            artifact: Some(artifact),
            artifact_required: true,
        }
    }
}
