use num_bigint_dig::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::field::PrimeField;
use super::ShamirError;

/// A degree `threshold - 1` polynomial over a prime field whose constant
/// term is the shared secret.
///
/// Coefficients are overwritten with zeros when the polynomial is dropped and
/// are never included in its `Debug` output.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Polynomial {
    coefficients: Vec<BigUint>,
}

impl Polynomial {
    /// Build a polynomial with constant term `secret` and `threshold - 1`
    /// coefficients drawn uniformly from `[0, prime)`.
    pub fn new<R: Rng + CryptoRng + ?Sized>(
        secret: &BigUint,
        threshold: usize,
        field: &PrimeField,
        rng: &mut R,
    ) -> Result<Self, ShamirError> {
        if threshold == 0 {
            return Err(ShamirError::InvalidThreshold);
        }
        if !field.contains(secret) {
            return Err(ShamirError::SecretOutOfField);
        }

        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret.clone());
        for _ in 1..threshold {
            coefficients.push(rng.gen_biguint_below(field.prime()));
        }

        Ok(Self { coefficients })
    }

    /// Polynomial with explicit coefficients, lowest degree first.
    #[cfg(test)]
    pub(crate) fn from_coefficients(coefficients: Vec<BigUint>) -> Self {
        Self { coefficients }
    }

    /// Number of coefficients, i.e. the reconstruction threshold.
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }

    /// Evaluate at `x`, reducing after every addition and multiplication.
    pub fn evaluate(&self, x: &BigUint, field: &PrimeField) -> BigUint {
        let x = field.reduce(x);
        let mut result = BigUint::zero();
        let mut power = BigUint::one();

        for coefficient in &self.coefficients {
            result = field.add(&result, &field.mul(coefficient, &power));
            power = field.mul(&power, &x);
        }

        result
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polynomial")
            .field("threshold", &self.threshold())
            .finish_non_exhaustive()
    }
}
