use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    constants::driver::{BINARY_SUFFIX, TEXT_SUFFIX},
    Result, SandboxError,
};

/// The files one compilation produced, keyed by file name, plus the compiler's diagnostic text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    files: BTreeMap<String, Vec<u8>>,
    diagnostics: String,
}

impl Artifacts {
    /// Creates an empty artifact set carrying `diagnostics`.
    pub fn new(diagnostics: impl Into<String>) -> Self {
        Self { files: BTreeMap::new(), diagnostics: diagnostics.into() }
    }

    /// Wraps a prebuilt binary module read from `path`.
    pub fn from_wasm_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| SandboxError::Io(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("module{BINARY_SUFFIX}"));
        let mut artifacts = Self::default();
        artifacts.insert(name, bytes);
        Ok(artifacts)
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    /// All files, by name.
    pub const fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// Text captured from the compiler's output streams.
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }

    /// The binary module.
    ///
    /// Fails with [`SandboxError::NoArtifactProduced`] carrying the diagnostics verbatim when the
    /// compiler produced no `.wasm` file.
    pub fn binary(&self) -> Result<&[u8]> {
        self.files
            .iter()
            .find(|(name, _)| name.ends_with(BINARY_SUFFIX))
            .map(|(_, bytes)| bytes.as_slice())
            .ok_or_else(|| SandboxError::NoArtifactProduced { diagnostics: self.diagnostics.clone() })
    }

    /// Textual module files, by name.
    pub fn text_artifacts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .filter(|(name, _)| name.ends_with(TEXT_SUFFIX))
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Writes every textual module file to `dir` verbatim and returns the written paths.
    pub fn write_text_artifacts(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (name, bytes) in self.text_artifacts() {
            let path = dir.join(name);
            std::fs::write(&path, bytes)?;
            debug!(path = %path.display(), "Wrote text artifact");
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_selects_wasm() {
        let mut artifacts = Artifacts::new("ok");
        artifacts.insert("main.wat", b"(module)".to_vec());
        artifacts.insert("main.wasm", b"\0asm".to_vec());
        assert_eq!(artifacts.binary().unwrap(), b"\0asm");
    }

    #[test]
    fn test_missing_binary_keeps_diagnostics() {
        let mut artifacts = Artifacts::new("ERROR TS2304: Cannot find name 'x'.");
        artifacts.insert("main.wat", b"(module)".to_vec());
        assert_eq!(
            artifacts.binary().unwrap_err(),
            SandboxError::NoArtifactProduced {
                diagnostics: "ERROR TS2304: Cannot find name 'x'.".into()
            }
        );
    }

    #[test]
    fn test_write_text_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut artifacts = Artifacts::default();
        artifacts.insert("a.wat", b"(module $a)".to_vec());
        artifacts.insert("a.wasm", b"\0asm".to_vec());

        let written = artifacts.write_text_artifacts(dir.path().join("out")).unwrap();
        assert_eq!(written, vec![dir.path().join("out").join("a.wat")]);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"(module $a)");
        assert!(!dir.path().join("out").join("a.wasm").exists());
    }

    #[test]
    fn test_from_wasm_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prebuilt.wasm");
        std::fs::write(&path, b"\0asm\x01\0\0\0").unwrap();

        let artifacts = Artifacts::from_wasm_file(&path).unwrap();
        assert_eq!(artifacts.binary().unwrap(), b"\0asm\x01\0\0\0");
        assert!(matches!(
            Artifacts::from_wasm_file(dir.path().join("missing.wasm")),
            Err(SandboxError::Io(_))
        ));
    }
}
