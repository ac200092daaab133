use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use num_bigint::BigInt;
use thiserror::Error;

pub mod codec;
pub mod storage;

pub use codec::*;
pub use storage::*;

use crate::rsa::{KeyError, RsaEngine};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Failed to write vault {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read vault {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to read source file {}: {source}", .path.display())]
    Source { path: PathBuf, source: io::Error },
    #[error("Source file {} has no file name", .0.display())]
    InvalidSource(PathBuf),
    #[error("Vault stream error: {0}")]
    Stream(#[from] io::Error),
    #[error("Ciphertext block {0} does not fit in a signed 4 byte block")]
    BlockOverflow(BigInt),
}

impl VaultError {
    fn at_write(self, path: &Path) -> Self {
        match self {
            VaultError::Stream(source) => VaultError::Write { path: path.to_path_buf(), source },
            other => other,
        }
    }

    fn at_read(self, path: &Path) -> Self {
        match self {
            VaultError::Stream(source) => VaultError::Read { path: path.to_path_buf(), source },
            other => other,
        }
    }
}

/// Encrypted text files on top of an [`RsaEngine`].
///
/// Nothing here locks: callers serialize access to a given vault file. A
/// failed write can leave a truncated file behind.
#[derive(Debug)]
pub struct Vault {
    engine: RsaEngine,
    storage: VaultStorage,
    current: Option<PathBuf>,
    progress: bool,
}

impl Vault {
    pub fn new(engine: RsaEngine, storage: VaultStorage) -> Self {
        Self { engine, storage, current: None, progress: false }
    }

    /// Stores under the configured default directory, `./vault`.
    pub fn with_default_storage(engine: RsaEngine) -> Self {
        Self::new(engine, VaultStorage::default())
    }

    pub fn engine(&self) -> &RsaEngine {
        &self.engine
    }

    pub fn storage(&self) -> &VaultStorage {
        &self.storage
    }

    /// The vault last produced by [`Vault::create_from_file`].
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn set_progress(&mut self, progress: bool) {
        self.progress = progress;
    }

    pub fn parse_key(key: &str) -> Result<(BigInt, BigInt, BigInt), KeyError> {
        crate::rsa::parse_key(key)
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.progress { return None; }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} blocks ({eta})") {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }

    pub fn encode(&self, plaintext: &str) -> Result<Vec<u8>, VaultError> {
        encode_to_vec(plaintext, &self.engine)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, VaultError> {
        decode(&mut io::Cursor::new(bytes), &self.engine, None)
    }

    /// Decrypts the vault at `path`. The storage directory is never created here.
    pub fn read(&self, path: &Path) -> Result<String, VaultError> {
        let file = File::open(path).map_err(|source| VaultError::Read { path: path.to_path_buf(), source })?;
        let len = file.metadata().map(|m| m.len() / BLOCK_SIZE as u64).unwrap_or(0);
        let pb = self.progress_bar(len);
        let mut reader = BufReader::new(file);
        let plaintext = decode(&mut reader, &self.engine, pb.as_ref()).map_err(|e| e.at_read(path))?;
        if let Some(pb) = &pb { pb.finish_and_clear(); }
        info!("Read {} characters from {}", plaintext.chars().count(), path.display());
        Ok(plaintext)
    }

    /// Replaces whatever is at `path` with the encrypted `data`.
    pub fn overwrite(&self, data: &str, path: &Path) -> Result<(), VaultError> {
        self.storage.ensure_dir()
            .map_err(|source| VaultError::Write { path: self.storage.root().to_path_buf(), source })?;
        let file = File::create(path).map_err(|source| VaultError::Write { path: path.to_path_buf(), source })?;
        let pb = self.progress_bar(data.chars().count() as u64 + 1);
        let mut writer = BufWriter::new(file);
        let blocks = encode(data, &self.engine, &mut writer, pb.as_ref()).map_err(|e| e.at_write(path))?;
        if let Some(pb) = &pb { pb.finish_and_clear(); }
        info!("Wrote {} blocks to {}", blocks, path.display());
        Ok(())
    }

    /// Same bytes as [`Vault::encode`]; the entry point for building a new vault.
    pub fn rebuild_from_source_file(&self, source_text: &str) -> Result<Vec<u8>, VaultError> {
        self.encode(source_text)
    }

    /// Encrypts the text file at `source` into `<storage>/<stem>.vault`,
    /// replacing any existing vault there, and makes it the current vault.
    pub fn create_from_file(&mut self, source: &Path) -> Result<PathBuf, VaultError> {
        let target = self.storage.vault_path_for(source)
            .ok_or_else(|| VaultError::InvalidSource(source.to_path_buf()))?;
        let data = fs::read_to_string(source)
            .map_err(|e| VaultError::Source { path: source.to_path_buf(), source: e })?;
        self.overwrite(&data, &target)?;
        self.current = Some(target.clone());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use super::*;

    fn textbook_vault(root: &Path) -> Vault {
        Vault::new(RsaEngine::new("17-2753-3233".parse().unwrap()), VaultStorage::new(root.join("vault")))
    }

    #[test]
    fn test_create_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, "secret notes\nline two").unwrap();
        let mut vault = textbook_vault(dir.path());
        assert!(vault.current().is_none());
        let path = vault.create_from_file(&source).unwrap();
        assert_eq!(path, dir.path().join("vault").join("notes.vault"));
        assert_eq!(vault.current(), Some(path.as_path()));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes, vault.rebuild_from_source_file("secret notes\nline two").unwrap());
        assert_eq!(vault.read(&path).unwrap(), "secret notes\nline two");
    }

    #[test]
    fn test_default_storage() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("rsa-vault-default-storage.txt");
        fs::write(&source, "kept under ./vault").unwrap();
        let mut vault = Vault::with_default_storage(RsaEngine::new("17-2753-3233".parse().unwrap()));
        assert_eq!(vault.storage().root(), Path::new("vault"));
        let path = vault.create_from_file(&source).unwrap();
        assert_eq!(path, PathBuf::from("vault").join("rsa-vault-default-storage.vault"));
        assert_eq!(vault.read(&path).unwrap(), "kept under ./vault");
        fs::remove_file(&path).unwrap();
        fs::remove_dir(vault.storage().root()).ok();
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let vault = textbook_vault(dir.path());
        let path = vault.storage().root().join("a.vault");
        vault.overwrite("a much longer first version", &path).unwrap();
        vault.overwrite("short", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), 6 * BLOCK_SIZE);
        assert_eq!(vault.read(&path).unwrap(), "short");
        vault.overwrite("short", &path).unwrap();
        assert_eq!(vault.read(&path).unwrap(), "short");
    }

    #[test]
    fn test_overwrite_recreates_storage() {
        let dir = tempfile::tempdir().unwrap();
        let vault = textbook_vault(dir.path());
        let path = vault.storage().root().join("b.vault");
        vault.overwrite("one", &path).unwrap();
        fs::remove_dir_all(vault.storage().root()).unwrap();
        vault.overwrite("two", &path).unwrap();
        assert_eq!(vault.read(&path).unwrap(), "two");
    }

    #[test]
    fn test_overwrite_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let vault = textbook_vault(dir.path());
        let path = dir.path().join("nowhere").join("c.vault");
        let res = vault.overwrite("data", &path);
        assert!(matches!(res, Err(VaultError::Write { path: p, .. }) if p == path));
    }

    #[test]
    fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = textbook_vault(dir.path());
        let path = vault.storage().root().join("missing.vault");
        let res = vault.read(&path);
        assert!(matches!(res, Err(VaultError::Read { .. })));
        assert!(!vault.storage().root().exists());
        let msg = vault.read(&path).unwrap_err().to_string();
        assert!(msg.contains("missing.vault"), "{}", msg);
    }

    #[test]
    fn test_create_from_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = textbook_vault(dir.path());
        let res = vault.create_from_file(&dir.path().join("absent.txt"));
        assert!(matches!(res, Err(VaultError::Source { .. })));
        assert!(vault.current().is_none());
        let res = vault.create_from_file(Path::new("/"));
        assert!(matches!(res, Err(VaultError::InvalidSource(_))));
    }

    #[test]
    fn test_encode_decode_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = textbook_vault(dir.path());
        assert_eq!(vault.encode("").unwrap().len(), BLOCK_SIZE);
        assert_eq!(vault.decode(&vault.encode("ab").unwrap()).unwrap(), "ab");
        let (e, d, n) = Vault::parse_key("17-2753-3233").unwrap();
        assert_eq!(vault.engine().keys(), &crate::rsa::KeySet::new(e, d, n).unwrap());
    }

    #[test]
    fn test_progress_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = textbook_vault(dir.path());
        vault.set_progress(true);
        let path = vault.storage().root().join("p.vault");
        vault.overwrite("with a progress bar", &path).unwrap();
        assert_eq!(vault.read(&path).unwrap(), "with a progress bar");
    }
}
