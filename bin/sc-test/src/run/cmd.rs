use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sc_sandbox::{
    constants::driver::DEFAULT_COMPILER, is_binary, CommandCompiler, RunOutcome, Runner,
    SandboxConfig, TargetMode,
};
use tracing::{debug, info};

use crate::{common::LogArgs, Error};

/// Compiler target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Unoptimized build with debug information
    #[default]
    Debug,
    /// Optimized build
    Release,
}

impl From<Target> for TargetMode {
    fn from(target: Target) -> Self {
        match target {
            Target::Debug => Self::Debug,
            Target::Release => Self::Release,
        }
    }
}

/// Compile and run contract tests
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Source files. `.wasm` files run as prebuilt modules; all other files are compiled
    /// together, in the given order
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Compiler target
    #[arg(long = "target", value_enum, default_value_t = Target::Debug)]
    pub target: Target,

    /// Compiler program
    #[arg(long = "compiler", env = "SC_TEST_COMPILER", default_value = DEFAULT_COMPILER)]
    pub compiler: String,

    /// Extra argument passed to the compiler before the sources (repeatable)
    #[arg(long = "compiler-arg", allow_hyphen_values = true)]
    pub compiler_args: Vec<String>,

    /// JSON sandbox configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Entry export to call, overriding the configuration
    #[arg(long = "entry")]
    pub entry: Option<String>,

    /// Linear memory size in pages, overriding the configuration
    #[arg(long = "memory-pages")]
    pub memory_pages: Option<u32>,

    /// Directory to write textual module artifacts to, overriding the configuration
    #[arg(long = "text-dir")]
    pub text_dir: Option<PathBuf>,

    /// Logging configuration
    #[command(flatten)]
    pub log_args: LogArgs,
}

impl Cmd {
    /// Execute the run command
    pub fn run(&self) -> Result<(), Error> {
        self.log_args.init()?;

        // Step 1: Resolve configuration
        let config = self.load_config()?;

        // Step 2: Build the runner
        let compiler = CommandCompiler::new(&self.compiler).with_args(&self.compiler_args);
        let runner = Runner::new(config, compiler).with_target(self.target.into());

        // Step 3: Run every unit in a fresh sandbox, stopping at the first failure
        for unit in self.units() {
            let name = unit_name(&unit);
            info!(unit = %name, files = unit.len(), "Running");
            let outcome = runner.run_sources(&unit)?;
            report(&name, &outcome);
        }
        Ok(())
    }

    /// The configuration file, if any, with command-line overrides applied.
    pub fn load_config(&self) -> Result<SandboxConfig, Error> {
        let mut config = match &self.config {
            Some(path) => SandboxConfig::from_file(path)?,
            None => SandboxConfig::default(),
        };
        if let Some(entry) = &self.entry {
            config.entry = entry.clone();
        }
        if let Some(pages) = self.memory_pages {
            config.memory_pages = pages;
        }
        if let Some(dir) = &self.text_dir {
            config.text_artifact_dir = Some(dir.clone());
        }
        config.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(config)
    }

    /// Groups the files into run units: each `.wasm` file alone, all other files together at the
    /// position of the first of them.
    pub fn units(&self) -> Vec<Vec<PathBuf>> {
        let mut units: Vec<Vec<PathBuf>> = Vec::new();
        let mut sources: Option<usize> = None;
        for file in &self.files {
            if is_binary(file) {
                units.push(vec![file.clone()]);
            } else if let Some(index) = sources {
                units[index].push(file.clone());
            } else {
                sources = Some(units.len());
                units.push(vec![file.clone()]);
            }
        }
        units
    }
}

fn unit_name(unit: &[PathBuf]) -> String {
    unit.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

fn report(name: &str, outcome: &RunOutcome) {
    println!("== {name}");
    for line in &outcome.printed {
        println!("{line}");
    }
    for event in &outcome.events {
        println!("event [{}]: {}", event.emitter, event.data);
    }
    println!("ok ({:?})", outcome.elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sc_sandbox::{test_utils::GuestFixture, SandboxError};

    fn parse(args: &[&str]) -> Cmd {
        Cmd::try_parse_from(std::iter::once("run").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_units_group_sources() {
        let cmd = parse(&["a.wasm", "x.ts", "b.wasm", "y.ts"]);
        assert_eq!(
            cmd.units(),
            vec![
                vec![PathBuf::from("a.wasm")],
                vec![PathBuf::from("x.ts"), PathBuf::from("y.ts")],
                vec![PathBuf::from("b.wasm")],
            ]
        );
    }

    #[rstest]
    #[case(&["t.ts"], Target::Debug)]
    #[case(&["t.ts", "--target", "release"], Target::Release)]
    fn test_target_flag(#[case] args: &[&str], #[case] expected: Target) {
        assert_eq!(parse(args).target, expected);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox.json");
        std::fs::write(&path, r#"{ "entry": "main", "chainId": 9 }"#).unwrap();

        let cmd = parse(&[
            "t.ts",
            "--config",
            path.to_str().unwrap(),
            "--entry",
            "test",
            "--text-dir",
            "out",
        ]);
        let config = cmd.load_config().unwrap();
        assert_eq!(config.entry, "test");
        assert_eq!(config.chain_id, 9);
        assert_eq!(config.text_artifact_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cmd = parse(&["t.ts", "--memory-pages", "0"]);
        assert!(matches!(cmd.load_config(), Err(Error::Sandbox(SandboxError::Config(_)))));
    }

    #[test]
    fn test_abort_is_reported_with_location() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = GuestFixture::new();
        let message = fixture.string("expected 1, got 2");
        let file = fixture.string("assembly/__tests__/math.spec.ts");
        let wasm = fixture
            .start(&format!(
                "(call $abort (i32.const {message}) (i32.const {file}) (i32.const 10) (i32.const 3))"
            ))
            .build();
        let path = dir.path().join("math.wasm");
        std::fs::write(&path, wasm).unwrap();

        let cmd = parse(&[path.to_str().unwrap()]);
        let err = cmd.run().unwrap_err();
        assert_eq!(
            err.to_string(),
            "abort: expected 1, got 2 at assembly/__tests__/math.spec.ts:10:3"
        );
    }
}
