//! Sources of field primes.
//!
//! Primality is trusted to the source: the sharing code only relies on the
//! modulus being prime, it never proves it.

use num_bigint_dig::BigUint;
use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::RandPrime;
use rand::{CryptoRng, Rng};

use crate::shamir::ShamirError;

/// Miller-Rabin rounds used by [`is_probable_prime`].
const PRIMALITY_ROUNDS: usize = 20;

/// Something that can hand out a probable prime of a requested bit length.
pub trait PrimeSource {
    fn prime(&mut self, bits: usize) -> Result<BigUint, ShamirError>;
}

/// Draws random primes from a cryptographically secure RNG.
#[derive(Debug)]
pub struct RandomPrimes<R> {
    rng: R,
}

impl<R: Rng + CryptoRng> RandomPrimes<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + CryptoRng> PrimeSource for RandomPrimes<R> {
    fn prime(&mut self, bits: usize) -> Result<BigUint, ShamirError> {
        if bits < 2 {
            return Err(ShamirError::InvalidPrimeBits(bits));
        }
        let prime: BigUint = self.rng.gen_prime(bits);
        log::debug!("generated {}-bit prime", bits);
        Ok(prime)
    }
}

/// Probabilistic primality check.
pub fn is_probable_prime(candidate: &BigUint) -> bool {
    probably_prime(candidate, PRIMALITY_ROUNDS)
}
