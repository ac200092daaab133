pub mod key_string;

pub use key_string::*;

use std::io;
use std::path::PathBuf;
use num_bigint::BigInt;
use num_traits::Signed;
use thiserror::Error;
use crate::rsa::prime_gen::PrimeError;

/// One half of a key pair: `base` is the exponent, `m` the modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub base: BigInt,
    pub m: BigInt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    pub public: Key,
    pub private: Key,
}

impl KeySet {
    /// Builds `(e, n)` / `(d, n)`. Only ranges are checked, not that `e` and
    /// `d` are actually inverse.
    pub fn new(e: BigInt, d: BigInt, n: BigInt) -> Result<Self, KeyError> {
        if n < BigInt::from(2) {
            return Err(KeyError::Range(format!("modulus {} must be at least 2", n)));
        }
        if e.is_negative() || d.is_negative() {
            return Err(KeyError::Range(format!("exponents {} and {} must not be negative", e, d)));
        }
        Ok(Self { public: Key { base: e, m: n.clone() }, private: Key { base: d, m: n } })
    }

    pub fn modulus(&self) -> &BigInt {
        &self.public.m
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Failed to parse the key: {0}")]
    Parse(String),
    #[error("Key out of range: {0}")]
    Range(String),
    #[error("No invertible exponent pair after {0} attempts")]
    Generation(u32),
    #[error(transparent)]
    Prime(#[from] PrimeError),
    #[error("Key file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}
