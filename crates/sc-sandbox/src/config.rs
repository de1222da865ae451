//! Sandbox configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{driver, imports, ledger, memory},
    Result, SandboxError,
};

/// Configuration of a sandbox and of the runs driven against it.
///
/// Every field has a default, so a JSON file only needs to list the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Size of the fixed linear memory handed to the guest, in wasm pages.
    pub memory_pages: u32,
    /// Name of the entry export invoked by the driver.
    pub entry: String,
    /// Module name the sandbox imports are registered under.
    pub import_module: String,
    /// Prefix prepended to every sandbox import name.
    pub import_prefix: String,
    /// Chain identifier reported to the guest.
    pub chain_id: u64,
    /// Bottom of the default call stack; also a bootstrap account.
    pub default_caller: String,
    /// Top of the default call stack; also a bootstrap account.
    pub default_callee: String,
    /// Balance of each bootstrap account.
    pub bootstrap_balance: u64,
    /// Directory textual module artifacts are written to, if any.
    pub text_artifact_dir: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            memory_pages: driver::DEFAULT_MEMORY_PAGES,
            entry: driver::DEFAULT_ENTRY.to_string(),
            import_module: imports::DEFAULT_MODULE.to_string(),
            import_prefix: imports::DEFAULT_PREFIX.to_string(),
            chain_id: ledger::DEFAULT_CHAIN_ID,
            default_caller: ledger::DEFAULT_CALLER.to_string(),
            default_callee: ledger::DEFAULT_CALLEE.to_string(),
            bootstrap_balance: ledger::BOOTSTRAP_BALANCE,
            text_artifact_dir: None,
        }
    }
}

impl SandboxConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading sandbox config");
        let content = std::fs::read_to_string(path)
            .map_err(|e| SandboxError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| SandboxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the sandbox relies on.
    pub fn validate(&self) -> Result<()> {
        if self.memory_pages == 0 {
            return Err(SandboxError::Config("memoryPages must be at least 1".into()));
        }
        if self.memory_pages > memory::MAX_PAGES {
            return Err(SandboxError::Config(format!(
                "memoryPages cannot exceed {}",
                memory::MAX_PAGES
            )));
        }
        if self.default_caller == self.default_callee {
            return Err(SandboxError::Config("defaultCaller and defaultCallee must differ".into()));
        }
        if self.entry.is_empty() {
            return Err(SandboxError::Config("entry cannot be empty".into()));
        }
        Ok(())
    }

    /// The full import name for a sandbox import.
    pub fn import_name(&self, name: &str) -> String {
        format!("{}{name}", self.import_prefix)
    }
}
