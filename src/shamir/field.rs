use num_bigint_dig::{BigInt, BigUint, Sign, ToBigUint};
use num_traits::{One, Zero};
use std::mem;

use super::ShamirError;

/// Arithmetic modulo a prime. Every result is reduced into `[0, prime)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimeField {
    prime: BigUint,
}

impl PrimeField {
    /// Create a field over `prime`. Primality itself is trusted to the caller
    /// (see [`crate::prime`]); only moduli below 2 are rejected here.
    pub fn new(prime: BigUint) -> Result<Self, ShamirError> {
        if prime < BigUint::from(2u32) {
            return Err(ShamirError::InvalidModulus);
        }
        Ok(Self { prime })
    }

    pub fn prime(&self) -> &BigUint {
        &self.prime
    }

    /// Whether `value` is already a canonical field element.
    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.prime
    }

    pub fn reduce(&self, value: &BigUint) -> BigUint {
        value % &self.prime
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.prime
    }

    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let a = a % &self.prime;
        let b = b % &self.prime;
        if a >= b {
            a - b
        } else {
            &self.prime - b + a
        }
    }

    pub fn neg(&self, a: &BigUint) -> BigUint {
        self.sub(&BigUint::zero(), a)
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.prime
    }

    /// Multiplicative inverse via the extended Euclidean algorithm.
    ///
    /// Fails with [`ShamirError::NotInvertible`] when `a ≡ 0 (mod prime)`, or
    /// more generally when `a` shares a factor with the modulus.
    pub fn inv(&self, a: &BigUint) -> Result<BigUint, ShamirError> {
        let a = self.reduce(a);
        if a.is_zero() {
            return Err(ShamirError::NotInvertible);
        }

        let modulus = BigInt::from_biguint(Sign::Plus, self.prime.clone());
        let (gcd, x) = extended_gcd(BigInt::from_biguint(Sign::Plus, a), modulus.clone());
        if !gcd.is_one() {
            return Err(ShamirError::NotInvertible);
        }

        let x = ((x % &modulus) + &modulus) % &modulus;
        x.to_biguint().ok_or(ShamirError::NotInvertible)
    }

    pub fn div(&self, a: &BigUint, b: &BigUint) -> Result<BigUint, ShamirError> {
        Ok(self.mul(a, &self.inv(b)?))
    }
}

/// Returns `(gcd(a, b), s)` with `s * a ≡ gcd (mod b)`.
fn extended_gcd(a: BigInt, b: BigInt) -> (BigInt, BigInt) {
    let (mut r_prev, mut r) = (a, b);
    let (mut s_prev, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let quotient = &r_prev / &r;
        r_prev -= &quotient * &r;
        s_prev -= &quotient * &s;
        mem::swap(&mut r, &mut r_prev);
        mem::swap(&mut s, &mut s_prev);
    }

    (r_prev, s_prev)
}
