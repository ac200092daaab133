use log::{debug, info, warn};
use num::Integer;
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use rand::Rng;

pub mod prime_gen;
pub mod keys;

pub use keys::*;
pub use prime_gen::*;

use crate::config::Config;

/// Returned by [`RsaEngine::decrypt`] for code points that are not a valid `char`.
pub const GARBLED: char = '?';

pub fn euler(p: &BigInt, q: &BigInt) -> BigInt { (p - BigInt::one()) * (q - BigInt::one()) }

fn extended_euclid(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    if b.is_zero() {
        return (a.clone(), BigInt::one(), BigInt::zero());
    }
    let (d, x, y) = extended_euclid(b, &(a % b));
    let next = x - a / b * &y;
    (d, y, next)
}

/// Modular multiplicative inverse of `a` modulo `b`, if one exists.
pub fn mod_reverse(a: &BigInt, b: &BigInt) -> Option<BigInt> {
    let (d, x, _) = extended_euclid(a, b);
    if d.is_one() {
        Some(x.mod_floor(b))
    } else {
        None
    }
}

pub fn check_key_set(d: &BigInt, e: &BigInt, f: &BigInt) -> bool {
    let res = (d * e) % f;
    debug!("(d * e) % f = {} % {} = {}", d * e, f, res);
    res.is_one()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primes {
    pub p: BigInt,
    pub q: BigInt,
}

impl Config {
    pub fn generate_prime<R: Rng + ?Sized>(&self, low: &BigInt, high: &BigInt, rng: &mut R) -> Result<BigInt, PrimeError> {
        generate_prime(low, high, self.rounds, self.time_max, rng)
    }

    /// Draws `p`, `q` from `[prime_min, prime_max)` and a prime `e` from
    /// `[2, totient / 2)`, retrying up to `attempts` times when `e` has no
    /// inverse.
    pub fn generate_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(KeySet, Primes), KeyError> {
        let low = BigInt::from(self.prime_min);
        let high = BigInt::from(self.prime_max);
        for attempt in 1..=self.attempts {
            match self.try_generate_key(&low, &high, rng) {
                Ok(Some(generated)) => return Ok(generated),
                Ok(None) => warn!("Key attempt {}/{} gave no invertible exponent pair", attempt, self.attempts),
                Err(PrimeError::Timeout(time)) if self.retry => {
                    warn!("Key attempt {}/{} timed out after {} ms", attempt, self.attempts, time)
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(KeyError::Generation(self.attempts))
    }

    fn try_generate_key<R: Rng + ?Sized>(&self, low: &BigInt, high: &BigInt, rng: &mut R) -> Result<Option<(KeySet, Primes)>, PrimeError> {
        let (p, q) = (self.generate_prime(low, high, rng)?, self.generate_prime(low, high, rng)?);
        if p == q {
            debug!("Drew the same prime {} twice", p);
            return Ok(None);
        }
        let n = &p * &q;
        let f = euler(&p, &q);
        let e = self.generate_prime(&BigInt::from(2), &(&f >> 1), rng)?;
        let d = match mod_reverse(&e, &f) {
            Some(d) if check_key_set(&d, &e, &f) => d,
            _ => return Ok(None),
        };
        let keys = KeySet { public: Key { m: n.clone(), base: e }, private: Key { m: n, base: d } };
        Ok(Some((keys, Primes { p, q })))
    }
}

/// Textbook RSA over single characters.
#[derive(Debug, Clone)]
pub struct RsaEngine {
    keys: KeySet,
}

impl RsaEngine {
    pub fn new(keys: KeySet) -> Self {
        Self { keys }
    }

    pub fn generate(config: &Config) -> Result<Self, KeyError> {
        Self::generate_with(config, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self, KeyError> {
        let (keys, _) = config.generate_key(rng)?;
        Ok(Self::new(keys))
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Replaces the current key pair.
    pub fn generate_keys(&mut self, config: &Config) -> Result<(), KeyError> {
        self.generate_keys_with(config, &mut rand::thread_rng())
    }

    pub fn generate_keys_with<R: Rng + ?Sized>(&mut self, config: &Config, rng: &mut R) -> Result<(), KeyError> {
        let (keys, _) = config.generate_key(rng)?;
        info!("Generated {} bit modulus", keys.modulus().bits());
        self.keys = keys;
        Ok(())
    }

    pub fn set_keys(&mut self, e: BigInt, d: BigInt, n: BigInt) -> Result<(), KeyError> {
        self.keys = KeySet::new(e, d, n)?;
        Ok(())
    }

    pub fn encrypt(&self, symbol: char) -> BigInt {
        self.encrypt_code_point(symbol as u32)
    }

    /// Code points at or above the modulus are not rejected.
    pub fn encrypt_code_point(&self, code_point: u32) -> BigInt {
        fast_modular_exponent(&BigInt::from(code_point), &self.keys.public.base, &self.keys.public.m)
    }

    /// Never fails: anything that is not a valid `char` comes back as [`GARBLED`].
    pub fn decrypt(&self, block: &BigInt) -> char {
        fast_modular_exponent(block, &self.keys.private.base, &self.keys.private.m)
            .to_u32()
            .and_then(char::from_u32)
            .unwrap_or(GARBLED)
    }
}
