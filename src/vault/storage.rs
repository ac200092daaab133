use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use log::info;
use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStorage {
    root: PathBuf,
    extension: String,
}

impl Default for VaultStorage {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for VaultStorage {
    fn from(config: &Config) -> Self {
        Self { root: config.storage_root(), extension: config.extension.clone() }
    }
}

impl VaultStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage directory if it is missing, including when it was
    /// removed after an earlier write.
    pub fn ensure_dir(&self) -> io::Result<&Path> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root)?;
            info!("Created vault directory {}", self.root.display());
        }
        Ok(&self.root)
    }

    /// `<root>/<source stem>.<extension>`, or `None` when the source has no file name.
    pub fn vault_path_for(&self, source: &Path) -> Option<PathBuf> {
        let mut name = source.file_stem()?.to_os_string();
        name.push(".");
        name.push(&self.extension);
        Some(self.root.join(name))
    }
}
