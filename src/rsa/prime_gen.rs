use chrono::Local;
use lazy_static::lazy_static;
use log::debug;
use num::Integer;
use num_bigint::{BigInt, RandBigInt};
use num_traits::{One, Signed};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrimeError {
    #[error("Generation timeout after {0} ms")]
    Timeout(i64),
    #[error("Empty prime range [{low}, {high})")]
    EmptyRange { low: BigInt, high: BigInt },
}

/// The first twelve primes are a complete witness set below this bound.
const WITNESSES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

lazy_static! {
    static ref DETERMINISTIC_LIMIT: BigInt = BigInt::from(3_317_044_064_679_887_385_961_981u128);
}

/// Square-and-multiply `base ^ exponent mod modulus`.
///
/// Negative bases are reduced into `[0, modulus)` first. A non-positive
/// exponent yields `1 mod modulus`.
pub fn fast_modular_exponent(base: &BigInt, exponent: &BigInt, modulus: &BigInt) -> BigInt {
    let mut a = base.mod_floor(modulus);
    let mut q = exponent.clone();
    let mut r = BigInt::one().mod_floor(modulus);
    while q.is_positive() {
        if q.bit(0) { r = (r * &a) % modulus; }
        q >>= 1;
        a = (&a * &a) % modulus;
    }
    r
}

/// Exact for `n` below ~3.3e24; larger candidates additionally get `rounds`
/// random witnesses.
pub fn miller_rabin<R: Rng + ?Sized>(n: &BigInt, rounds: u32, rng: &mut R) -> bool {
    let two = BigInt::from(2);
    if n < &two { return false; }
    for w in WITNESSES {
        let w = BigInt::from(w);
        if n == &w { return true; }
        if n.is_multiple_of(&w) { return false; }
    }
    let n_minus_one = n - BigInt::one();
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }
    let passes = |a: &BigInt| -> bool {
        let mut m = fast_modular_exponent(a, &d, n);
        if m.is_one() || m == n_minus_one { return true; }
        for _ in 1..s {
            m = (&m * &m) % n;
            if m == n_minus_one { return true; }
        }
        false
    };
    if !WITNESSES.iter().all(|w| passes(&BigInt::from(*w))) { return false; }
    if n < &*DETERMINISTIC_LIMIT { return true; }
    (0..rounds).all(|_| passes(&rng.gen_bigint_range(&two, &n_minus_one)))
}

/// Draws uniformly from `[low, high)` until a prime turns up.
///
/// Rejection sampling keeps the result uniform over the primes in range.
pub fn generate_prime<R: Rng + ?Sized>(low: &BigInt, high: &BigInt, rounds: u32, time_max: i64, rng: &mut R) -> Result<BigInt, PrimeError> {
    if low >= high {
        return Err(PrimeError::EmptyRange { low: low.clone(), high: high.clone() });
    }
    let epoch = 0xf;
    let start = Local::now().timestamp_millis();
    let mut try_times = 0;
    loop {
        try_times += epoch;
        for _ in 0..epoch {
            let test = rng.gen_bigint_range(low, high);
            if miller_rabin(&test, rounds, rng) {
                let time = Local::now().timestamp_millis() - start;
                debug!("Done generation in {} tries after {} ms", try_times, time);
                return Ok(test);
            }
        }
        let time = Local::now().timestamp_millis() - start;
        if time > time_max {
            debug!("Failed generation in {} tries after {} ms", try_times, time);
            return Err(PrimeError::Timeout(time));
        }
    }
}

#[cfg(test)]
mod tests {
    use num_traits::ToPrimitive;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use super::*;

    fn trial_division(n: u64) -> bool {
        n >= 2 && (2..).take_while(|i| i * i <= n).all(|i| n % i != 0)
    }

    #[test]
    fn test_miller_rabin_matches_trial_division() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in 0..5000u64 {
            assert_eq!(miller_rabin(&BigInt::from(n), 10, &mut rng), trial_division(n), "n = {}", n);
        }
    }

    #[test]
    fn test_miller_rabin_rejects_carmichael_numbers() {
        let mut rng = StdRng::seed_from_u64(2);
        for n in [561u64, 1105, 1729, 2465, 2821, 6601, 8911, 3_215_031_751] {
            assert!(!miller_rabin(&BigInt::from(n), 10, &mut rng), "n = {}", n);
        }
        assert!(miller_rabin(&BigInt::from(2_147_483_647u64), 10, &mut rng));
    }

    #[test]
    fn test_fast_modular_exponent() {
        let cases = [(4i64, 13i64, 497i64, 445i64), (65, 17, 3233, 2790), (2790, 2753, 3233, 65), (7, 0, 13, 1), (5, 3, 1, 0)];
        for (b, e, m, expected) in cases {
            let r = fast_modular_exponent(&BigInt::from(b), &BigInt::from(e), &BigInt::from(m));
            assert_eq!(r, BigInt::from(expected), "{}^{} mod {}", b, e, m);
        }
    }

    #[test]
    fn test_fast_modular_exponent_negative_base() {
        // (-2)^3 = -8 = 5 mod 13
        let r = fast_modular_exponent(&BigInt::from(-2), &BigInt::from(3), &BigInt::from(13));
        assert_eq!(r, BigInt::from(5));
        let big = BigInt::from(123_456_789u64);
        let m = BigInt::from(1_000_000_007u64);
        assert_eq!(fast_modular_exponent(&big, &BigInt::from(65537), &m), big.modpow(&BigInt::from(65537), &m));
    }

    #[test]
    fn gen_prime() {
        let mut rng = StdRng::seed_from_u64(3);
        let (low, high) = (BigInt::from(1000), BigInt::from(1 << 15));
        for _ in 0..50 {
            let prime = generate_prime(&low, &high, 10, 1000, &mut rng).unwrap();
            assert!(prime >= low && prime < high);
            assert!(trial_division(prime.to_u64().unwrap()));
        }
    }

    #[test]
    fn gen_prime_empty_range() {
        let mut rng = StdRng::seed_from_u64(4);
        let res = generate_prime(&BigInt::from(10), &BigInt::from(10), 10, 1000, &mut rng);
        assert!(matches!(res, Err(PrimeError::EmptyRange { .. })));
    }

    #[test]
    fn gen_prime_times_out_without_primes() {
        let mut rng = StdRng::seed_from_u64(5);
        let res = generate_prime(&BigInt::from(24), &BigInt::from(29), 10, 0, &mut rng);
        assert!(matches!(res, Err(PrimeError::Timeout(_))));
    }
}
