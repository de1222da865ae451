use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::{debug, info};
use wasmi::Engine;

use super::{Artifacts, Compiler, GuestModule, TargetMode};
use crate::{
    constants::driver::BINARY_SUFFIX,
    host::{GeneratedEvent, Sandbox},
    Result, SandboxConfig,
};

/// What a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    /// The sandbox in its final state.
    pub sandbox: Sandbox,
    /// Events generated during the run.
    pub events: Vec<GeneratedEvent>,
    /// Lines printed by the guest.
    pub printed: Vec<String>,
    /// Wall-clock time spent instantiating and running the module.
    pub elapsed: Duration,
}

/// Loads guest modules and runs their entry point, each against a fresh [`Sandbox`].
#[derive(Debug)]
pub struct Runner<C> {
    config: SandboxConfig,
    compiler: C,
    target: TargetMode,
    engine: Engine,
}

impl<C: Compiler> Runner<C> {
    /// Creates a runner for debug builds.
    pub fn new(config: SandboxConfig, compiler: C) -> Self {
        Self { config, compiler, target: TargetMode::Debug, engine: Engine::default() }
    }

    /// Sets the compiler target.
    pub const fn with_target(mut self, target: TargetMode) -> Self {
        self.target = target;
        self
    }

    /// The configuration each run's sandbox is built from.
    pub const fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Obtains the artifacts for `sources`.
    ///
    /// A single `.wasm` path is read as a prebuilt module; anything else is handed to the
    /// compiler as one unit. Textual artifacts are written to the configured directory, if any.
    pub fn load(&self, sources: &[PathBuf]) -> Result<Artifacts> {
        let artifacts = match sources {
            [path] if is_binary(path) => Artifacts::from_wasm_file(path)?,
            _ => self.compiler.compile(sources, self.target)?,
        };
        if let Some(dir) = &self.config.text_artifact_dir {
            artifacts.write_text_artifacts(dir)?;
        }
        Ok(artifacts)
    }

    /// Loads `sources` and runs the resulting module.
    pub fn run_sources(&self, sources: &[PathBuf]) -> Result<RunOutcome> {
        let artifacts = self.load(sources)?;
        self.run(artifacts.binary()?)
    }

    /// Instantiates `wasm` against a fresh sandbox and calls the configured entry export.
    ///
    /// Any error, including a guest abort, ends the run and is returned as raised.
    pub fn run(&self, wasm: &[u8]) -> Result<RunOutcome> {
        let started = Instant::now();
        let sandbox = Sandbox::new(self.config.clone());
        let mut module = GuestModule::instantiate(&self.engine, wasm, sandbox)?;
        module.call_entry(&self.config.entry)?;

        let sandbox = module.into_sandbox();
        let elapsed = started.elapsed();
        info!(
            entry = %self.config.entry,
            events = sandbox.events().len(),
            elapsed = ?elapsed,
            "Run finished"
        );
        Ok(RunOutcome {
            events: sandbox.events().to_vec(),
            printed: sandbox.printed().to_vec(),
            sandbox,
            elapsed,
        })
    }
}

/// Whether `path` names a prebuilt binary module.
pub fn is_binary(path: &Path) -> bool {
    let binary = path.to_string_lossy().ends_with(BINARY_SUFFIX);
    debug!(path = %path.display(), binary, "Classified source");
    binary
}
