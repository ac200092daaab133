use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use log::info;
use num_bigint::BigInt;
use crate::rsa::keys::{KeyError, KeySet};

const KEY_SPLIT: char = '-';

/// Parses `"e-d-N"` into its three integers. Spaces anywhere are ignored.
pub fn parse_key(key: &str) -> Result<(BigInt, BigInt, BigInt), KeyError> {
    let key = key.replace(' ', "");
    let values = key.split(KEY_SPLIT)
        .map(|t| BigInt::from_str(t).map_err(|_| KeyError::Parse(format!("`{}' is not an integer", t))))
        .collect::<Result<Vec<_>, _>>()?;
    match <[BigInt; 3]>::try_from(values) {
        Ok([e, d, n]) => Ok((e, d, n)),
        Err(values) => Err(KeyError::Parse(format!("expected 3 `{}' separated integers, got {}", KEY_SPLIT, values.len()))),
    }
}

impl FromStr for KeySet {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (e, d, n) = parse_key(s)?;
        KeySet::new(e, d, n)
    }
}

impl Display for KeySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}{}{}", self.public.base, KEY_SPLIT, self.private.base, KEY_SPLIT, self.public.m)
    }
}

impl KeySet {
    /// Writes the key string as a single line.
    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        fs::write(path, format!("{}\n", self))
            .map_err(|source| KeyError::Io { path: path.to_path_buf(), source })?;
        info!("Saved key to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let content = fs::read_to_string(path)
            .map_err(|source| KeyError::Io { path: path.to_path_buf(), source })?;
        content.trim().parse()
    }
}
