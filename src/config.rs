use std::path::PathBuf;
use lazy_static::lazy_static;

/// Parameters for key generation and vault storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Inclusive lower bound of the prime range.
    pub prime_min: u64,
    /// Exclusive upper bound of the prime range.
    pub prime_max: u64,
    /// Random Miller Rabin rounds for candidates above the deterministic witness bound.
    pub rounds: u32,
    /// Max time in milliseconds spent searching a single prime.
    pub time_max: i64,
    /// Treat a prime search timeout as a failed attempt instead of an error.
    pub retry: bool,
    /// Key generation attempts before giving up.
    pub attempts: u32,
    /// Vault storage directory.
    pub storage: String,
    /// Vault file extension, without the dot.
    pub extension: String,
}

lazy_static! {
    pub static ref CONFIG_DEF: Config = Config {
        prime_min: 1000,
        prime_max: 1 << 15,
        rounds: 10,
        time_max: 1000,
        retry: true,
        attempts: 16,
        storage: String::from("vault"),
        extension: String::from("vault"),
    };
}

impl Default for Config {
    fn default() -> Self {
        CONFIG_DEF.clone()
    }
}

impl Config {
    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.storage)
    }
}
