use clap::Parser;

/// Main command enumeration for the sc-test CLI tool
#[derive(Parser, Debug)]
#[command(infer_subcommands = true, version)]
pub enum MainCmd {
    /// Compile and run contract tests
    Run(crate::run::Cmd),
}

/// Error types for the main command system
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sandbox error, including guest aborts
    #[error("{0}")]
    Sandbox(#[from] sc_sandbox::SandboxError),
    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),
}

impl MainCmd {
    /// Execute the main command
    pub fn run(&self) -> Result<(), Error> {
        match self {
            Self::Run(cmd) => cmd.run(),
        }
    }
}
