//! Textbook RSA over single characters and a file vault of encrypted
//! character blocks.
//!
//! Not secure: there is no padding and every character is encrypted on its
//! own.

pub mod config;
pub mod rsa;
pub mod vault;

pub use crate::config::{Config, CONFIG_DEF};
pub use crate::rsa::{KeyError, KeySet, RsaEngine};
pub use crate::vault::{Vault, VaultError, VaultStorage};
