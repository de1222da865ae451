use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use auto_impl::auto_impl;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::Artifacts;
use crate::{
    constants::driver::{BINARY_SUFFIX, DEFAULT_COMPILER, TEXT_SUFFIX},
    Result, SandboxError,
};

/// Optimization target passed to the compiler.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Unoptimized build with debug information.
    #[default]
    #[display("debug")]
    Debug,
    /// Optimized build.
    #[display("release")]
    Release,
}

/// Turns an ordered list of sources into [`Artifacts`].
#[auto_impl(&, Box)]
pub trait Compiler {
    /// Compiles `sources` as one unit.
    fn compile(&self, sources: &[PathBuf], target: TargetMode) -> Result<Artifacts>;
}

/// A compiler run as an external process.
///
/// The process is invoked as `program [args...] <sources...> --target <mode> --outFile
/// <dir>/<stem>.wasm --textFile <dir>/<stem>.wat` inside a fresh temporary directory, where
/// `<stem>` is the file stem of the first source. Every file left in that directory becomes an
/// artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for CommandCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILER)
    }
}

impl CommandCompiler {
    /// Creates a compiler running `program`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Arguments placed before the sources, e.g. `asc` when the program is `npx`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, sources: &[PathBuf], target: TargetMode) -> Result<Artifacts> {
        let first = sources
            .first()
            .ok_or_else(|| SandboxError::Compile { diagnostics: "no sources given".into() })?;
        let stem = first.file_stem().map_or_else(|| "module".into(), |s| s.to_string_lossy());

        let out_dir = tempfile::tempdir()?;
        let binary = out_dir.path().join(format!("{stem}{BINARY_SUFFIX}"));
        let text = out_dir.path().join(format!("{stem}{TEXT_SUFFIX}"));

        debug!(program = %self.program_name(), sources = sources.len(), %target, "Compiling");
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(sources)
            .arg("--target")
            .arg(target.to_string())
            .arg("--outFile")
            .arg(&binary)
            .arg("--textFile")
            .arg(&text)
            .output()
            .map_err(|e| SandboxError::Compile {
                diagnostics: format!("failed to start `{}`: {e}", self.program_name()),
            })?;

        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            trace!(status = %output.status, "Compiler failed");
            return Err(SandboxError::Compile { diagnostics });
        }

        let mut artifacts = Artifacts::new(diagnostics);
        collect_files(out_dir.path(), &mut artifacts)?;
        debug!(files = artifacts.files().len(), "Compilation finished");
        Ok(artifacts)
    }
}

fn collect_files(dir: &Path, artifacts: &mut Artifacts) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            artifacts.insert(name, std::fs::read(entry.path())?);
        }
    }
    Ok(())
}
