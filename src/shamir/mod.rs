pub mod field;
pub mod polynomial;

use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub use field::PrimeField;
pub use polynomial::Polynomial;

#[derive(Debug, Error)]
pub enum ShamirError {
    #[error("share count must be at least 1")]
    InvalidShareCount,
    #[error("threshold must be at least 1")]
    InvalidThreshold,
    #[error("shares cannot be less than threshold")]
    SharesLessThanThreshold,
    #[error("secret must be smaller than the field prime")]
    SecretOutOfField,
    #[error("share count must be smaller than the field prime")]
    ShareCountExceedsField,
    #[error("modulus must be at least 2")]
    InvalidModulus,
    #[error("prime size must be at least 2 bits, got {0}")]
    InvalidPrimeBits(usize),
    #[error("value is not invertible modulo the field prime")]
    NotInvertible,
    #[error("shares must contain unique x-coordinates")]
    DuplicateShares,
    #[error("invalid share identifier")]
    InvalidShareIdentifier,
    #[error("not enough shares to reconstruct: got {provided}, need {required}")]
    InsufficientShares { provided: usize, required: usize },
    #[error("shares have different x-coordinates: expected {expected}, found {found}")]
    MixedCoordinates { expected: u64, found: u64 },
    #[error("secure sum needs one share per party: {parties} parties, {shares} shares")]
    PartyCountMismatch { parties: usize, shares: usize },
    #[error("share addressed to party {found} delivered to party {expected}")]
    MisroutedShare { expected: usize, found: usize },
    #[error("party {0} already delivered a share")]
    DuplicateSender(usize),
    #[error("unknown party {0}")]
    UnknownParty(usize),
    #[error("party {party} holds {received} of {expected} shares")]
    IncompleteInbox {
        party: usize,
        received: usize,
        expected: usize,
    },
    #[error("envelope encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// A single point `(x, y)` on a sharing polynomial.
///
/// A share is only meaningful together with the prime it was produced under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub x: u64,
    pub y: BigUint,
}

impl Share {
    pub fn new(x: u64, y: BigUint) -> Self {
        Self { x, y }
    }
}

/// Split `secret` into `total_shares` shares, any `threshold` of which
/// reconstruct it. Shares are evaluated at x = 1..=total_shares.
pub fn split<R: Rng + CryptoRng + ?Sized>(
    secret: &BigUint,
    total_shares: usize,
    threshold: usize,
    field: &PrimeField,
    rng: &mut R,
) -> Result<Vec<Share>, ShamirError> {
    check_parameters(total_shares, threshold, field)?;
    if threshold == 1 {
        log::warn!("threshold 1 makes every share equal to the secret");
    }

    let polynomial = Polynomial::new(secret, threshold, field, rng)?;

    let shares = (1..=total_shares as u64)
        .map(|x| Share::new(x, polynomial.evaluate(&BigUint::from(x), field)))
        .collect();

    log::debug!("split secret into {} shares, threshold {}", total_shares, threshold);
    Ok(shares)
}

/// Recover the constant term of the polynomial through `shares` by Lagrange
/// interpolation at x = 0.
///
/// No threshold is known here, so handing in fewer shares than the sharing
/// threshold still yields a value, just not the secret. Use
/// [`ShamirScheme::reconstruct`] or [`Quorum`] for a checked reconstruction.
pub fn reconstruct(shares: &[Share], field: &PrimeField) -> Result<BigUint, ShamirError> {
    if shares.is_empty() {
        return Err(ShamirError::InsufficientShares {
            provided: 0,
            required: 1,
        });
    }
    ensure_unique_coordinates(shares)?;

    let xs: Vec<BigUint> = shares.iter().map(|s| BigUint::from(s.x)).collect();
    let mut secret = BigUint::zero();

    for (i, share_i) in shares.iter().enumerate() {
        let mut numerator = BigUint::one();
        let mut denominator = BigUint::one();

        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = field.mul(&numerator, &field.neg(x_j));
            denominator = field.mul(&denominator, &field.sub(&xs[i], x_j));
        }

        let basis = field.div(&numerator, &denominator)?;
        let term = field.mul(&basis, &field.reduce(&share_i.y));
        secret = field.add(&secret, &term);
    }

    Ok(secret)
}

/// Add two shares taken at the same x-coordinate. The result is a share of
/// the sum of the two underlying secrets.
pub fn add_shares(a: &Share, b: &Share, field: &PrimeField) -> Result<Share, ShamirError> {
    if a.x != b.x {
        return Err(ShamirError::MixedCoordinates {
            expected: a.x,
            found: b.x,
        });
    }
    Ok(Share::new(a.x, field.add(&a.y, &b.y)))
}

/// Re-randomise `shares` in place without changing the secret they encode,
/// by adding evaluations of a fresh polynomial whose constant term is zero.
///
/// `threshold` must be the threshold the shares were split with: a larger
/// one silently raises the number of shares needed to reconstruct. Use
/// [`ShamirScheme::refresh`] to take it from the scheme instead.
///
/// Every x-coordinate must be non-zero and distinct mod prime, otherwise
/// the mask would shift the secret. Shares refreshed this way must not be
/// combined with shares from before the refresh.
pub fn refresh_shares<R: Rng + CryptoRng + ?Sized>(
    shares: &mut [Share],
    threshold: usize,
    field: &PrimeField,
    rng: &mut R,
) -> Result<(), ShamirError> {
    if shares.is_empty() {
        return Err(ShamirError::InvalidShareCount);
    }
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares.iter() {
        let x = field.reduce(&BigUint::from(share.x));
        if x.is_zero() {
            return Err(ShamirError::InvalidShareIdentifier);
        }
        if !seen.insert(x) {
            return Err(ShamirError::DuplicateShares);
        }
    }

    let mask = Polynomial::new(&BigUint::zero(), threshold, field, rng)?;
    for share in shares.iter_mut() {
        let delta = mask.evaluate(&BigUint::from(share.x), field);
        share.y = field.add(&share.y, &delta);
    }

    log::debug!("refreshed {} shares", shares.len());
    Ok(())
}

fn check_parameters(
    total_shares: usize,
    threshold: usize,
    field: &PrimeField,
) -> Result<(), ShamirError> {
    if total_shares == 0 {
        return Err(ShamirError::InvalidShareCount);
    }
    if threshold == 0 {
        return Err(ShamirError::InvalidThreshold);
    }
    if total_shares < threshold {
        return Err(ShamirError::SharesLessThanThreshold);
    }
    // x = 1..=total_shares must stay distinct and non-zero mod prime
    if BigUint::from(total_shares) >= *field.prime() {
        return Err(ShamirError::ShareCountExceedsField);
    }
    Ok(())
}

fn ensure_unique_coordinates(shares: &[Share]) -> Result<(), ShamirError> {
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if !seen.insert(share.x) {
            return Err(ShamirError::DuplicateShares);
        }
    }
    Ok(())
}

/// Validated sharing parameters: a field, a share count and a threshold.
#[derive(Clone, Debug)]
pub struct ShamirScheme {
    field: PrimeField,
    total_shares: usize,
    threshold: usize,
}

impl ShamirScheme {
    pub fn new(
        field: PrimeField,
        total_shares: usize,
        threshold: usize,
    ) -> Result<Self, ShamirError> {
        check_parameters(total_shares, threshold, &field)?;
        Ok(Self {
            field,
            total_shares,
            threshold,
        })
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn total_shares(&self) -> usize {
        self.total_shares
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn split<R: Rng + CryptoRng + ?Sized>(
        &self,
        secret: &BigUint,
        rng: &mut R,
    ) -> Result<Vec<Share>, ShamirError> {
        split(secret, self.total_shares, self.threshold, &self.field, rng)
    }

    /// Refresh shares produced by this scheme, masking with its threshold.
    pub fn refresh<R: Rng + CryptoRng + ?Sized>(
        &self,
        shares: &mut [Share],
        rng: &mut R,
    ) -> Result<(), ShamirError> {
        refresh_shares(shares, self.threshold, &self.field, rng)
    }

    /// Reconstruct after checking that `shares` form a quorum.
    pub fn reconstruct(&self, shares: &[Share]) -> Result<BigUint, ShamirError> {
        Quorum::new(shares.to_vec(), self.threshold)?.reconstruct(&self.field)
    }
}

/// At least `threshold` shares with distinct, non-zero x-coordinates.
#[derive(Clone, Debug)]
pub struct Quorum {
    shares: Vec<Share>,
}

impl Quorum {
    pub fn new(shares: Vec<Share>, threshold: usize) -> Result<Self, ShamirError> {
        if threshold == 0 {
            return Err(ShamirError::InvalidThreshold);
        }
        if shares.len() < threshold {
            return Err(ShamirError::InsufficientShares {
                provided: shares.len(),
                required: threshold,
            });
        }
        if shares.iter().any(|s| s.x == 0) {
            return Err(ShamirError::InvalidShareIdentifier);
        }
        ensure_unique_coordinates(&shares)?;

        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn reconstruct(&self, field: &PrimeField) -> Result<BigUint, ShamirError> {
        reconstruct(&self.shares, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn field(p: u32) -> PrimeField {
        PrimeField::new(BigUint::from(p)).unwrap()
    }

    fn mersenne_127() -> PrimeField {
        PrimeField::new((BigUint::one() << 127usize) - BigUint::one()).unwrap()
    }

    #[test]
    fn test_split_and_reconstruct() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let secret = BigUint::from(42u32);

        let shares = split(&secret, 5, 3, &f, &mut rng).unwrap();
        assert_eq!(shares.len(), 5);
        assert_eq!(
            shares.iter().map(|s| s.x).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );

        let first = vec![shares[0].clone(), shares[2].clone(), shares[4].clone()];
        assert_eq!(reconstruct(&first, &f).unwrap(), secret);

        let second = vec![shares[1].clone(), shares[3].clone(), shares[0].clone()];
        assert_eq!(reconstruct(&second, &f).unwrap(), secret);

        // Any superset of a quorum works too
        assert_eq!(reconstruct(&shares, &f).unwrap(), secret);
    }

    #[test]
    fn test_large_field() {
        let f = mersenne_127();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let secret = BigUint::parse_bytes(b"ffffffffffffffffffffffffffffffffffffff", 16).unwrap();

        let shares = split(&secret, 6, 4, &f, &mut rng).unwrap();
        assert_eq!(reconstruct(&shares[2..], &f).unwrap(), secret);
        assert_eq!(reconstruct(&shares[..4], &f).unwrap(), secret);
    }

    #[test]
    fn test_invalid_parameters() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let secret = BigUint::from(5u32);

        // No shares
        assert!(matches!(
            split(&secret, 0, 1, &f, &mut rng),
            Err(ShamirError::InvalidShareCount)
        ));

        // Zero threshold
        assert!(matches!(
            split(&secret, 3, 0, &f, &mut rng),
            Err(ShamirError::InvalidThreshold)
        ));

        // Shares less than threshold
        assert!(matches!(
            split(&secret, 3, 4, &f, &mut rng),
            Err(ShamirError::SharesLessThanThreshold)
        ));

        // Secret not inside the field
        assert!(matches!(
            split(&BigUint::from(97u32), 3, 2, &f, &mut rng),
            Err(ShamirError::SecretOutOfField)
        ));

        // More shares than non-zero field elements
        assert!(matches!(
            split(&secret, 97, 2, &f, &mut rng),
            Err(ShamirError::ShareCountExceedsField)
        ));
    }

    #[test]
    fn test_deterministic_generation() {
        let f = field(97);
        let secret = BigUint::from(13u32);

        let shares1 = split(&secret, 4, 2, &f, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        let shares2 = split(&secret, 4, 2, &f, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        assert_eq!(shares1, shares2);

        // A fresh draw gives a fresh polynomial for the same secret
        let wide = mersenne_127();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let a = split(&secret, 4, 2, &wide, &mut rng).unwrap();
        let b = split(&secret, 4, 2, &wide, &mut rng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_insufficient_shares() {
        let f = mersenne_127();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let trials = 50;

        let mut mismatches = 0;
        for i in 0..trials {
            let secret = BigUint::from(1000u32 + i);
            let shares = split(&secret, 5, 3, &f, &mut rng).unwrap();

            // The math will produce a value, just not the secret
            let recovered = reconstruct(&shares[..2], &f).unwrap();
            if recovered != secret {
                mismatches += 1;
            }
        }
        assert!(mismatches >= trials - 1);
    }

    #[test]
    fn test_reconstruct_rejects_duplicates() {
        let f = field(97);
        let shares = vec![
            Share::new(1, BigUint::from(3u32)),
            Share::new(1, BigUint::from(4u32)),
        ];
        assert!(matches!(
            reconstruct(&shares, &f),
            Err(ShamirError::DuplicateShares)
        ));

        // Distinct integers that collide modulo the prime
        let colliding = vec![
            Share::new(1, BigUint::from(3u32)),
            Share::new(98, BigUint::from(4u32)),
        ];
        assert!(matches!(
            reconstruct(&colliding, &f),
            Err(ShamirError::NotInvertible)
        ));

        assert!(reconstruct(&[], &f).is_err());
    }

    #[test]
    fn test_outputs_stay_in_field() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        for secret in 0..97u32 {
            let shares = split(&BigUint::from(secret), 6, 3, &f, &mut rng).unwrap();
            assert!(shares.iter().all(|s| s.x != 0 && f.contains(&s.y)));
            assert!(f.contains(&reconstruct(&shares[1..3], &f).unwrap()));
        }
    }

    #[test]
    fn test_threshold_one() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let shares = split(&BigUint::from(8u32), 3, 1, &f, &mut rng).unwrap();
        assert!(shares.iter().all(|s| s.y == BigUint::from(8u32)));
        assert_eq!(reconstruct(&shares[1..2], &f).unwrap(), BigUint::from(8u32));
    }

    #[test]
    fn test_add_shares() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(77);
        let a = split(&BigUint::from(60u32), 4, 3, &f, &mut rng).unwrap();
        let b = split(&BigUint::from(50u32), 4, 3, &f, &mut rng).unwrap();

        let summed: Vec<Share> = a
            .iter()
            .zip(&b)
            .map(|(sa, sb)| add_shares(sa, sb, &f).unwrap())
            .collect();

        // (60 + 50) mod 97
        assert_eq!(reconstruct(&summed[1..], &f).unwrap(), BigUint::from(13u32));

        assert!(matches!(
            add_shares(&a[0], &b[1], &f),
            Err(ShamirError::MixedCoordinates { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_refresh_keeps_secret() {
        let f = mersenne_127();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let secret = BigUint::from(777u32);
        let original = split(&secret, 5, 3, &f, &mut rng).unwrap();

        let mut refreshed = original.clone();
        refresh_shares(&mut refreshed, 3, &f, &mut rng).unwrap();

        assert_ne!(refreshed, original);
        assert_eq!(reconstruct(&refreshed[2..], &f).unwrap(), secret);

        assert!(refresh_shares(&mut [], 3, &f, &mut rng).is_err());
    }

    #[test]
    fn test_refresh_rejects_coordinates_that_touch_the_secret() {
        let f = field(97);
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let secret = BigUint::from(5u32);

        let mut with_zero = vec![
            Share::new(0, secret.clone()),
            Share::new(1, BigUint::from(9u32)),
        ];
        let before = with_zero.clone();
        assert!(matches!(
            refresh_shares(&mut with_zero, 2, &f, &mut rng),
            Err(ShamirError::InvalidShareIdentifier)
        ));
        assert_eq!(with_zero, before);

        // 97 is x = 0 in GF(97)
        let mut wraps_to_zero = vec![Share::new(97, secret.clone())];
        assert!(matches!(
            refresh_shares(&mut wraps_to_zero, 2, &f, &mut rng),
            Err(ShamirError::InvalidShareIdentifier)
        ));

        // 3 and 100 are the same point in GF(97)
        let mut aliased = vec![
            Share::new(3, BigUint::from(1u32)),
            Share::new(100, BigUint::from(1u32)),
        ];
        assert!(matches!(
            refresh_shares(&mut aliased, 2, &f, &mut rng),
            Err(ShamirError::DuplicateShares)
        ));
    }

    #[test]
    fn test_scheme_refresh_uses_its_threshold() {
        let scheme = ShamirScheme::new(mersenne_127(), 5, 3).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let secret = BigUint::from(4242u32);

        let mut shares = scheme.split(&secret, &mut rng).unwrap();
        for _ in 0..3 {
            scheme.refresh(&mut shares, &mut rng).unwrap();
        }

        assert_eq!(scheme.reconstruct(&shares[..3]).unwrap(), secret);
        assert_eq!(scheme.reconstruct(&shares[2..]).unwrap(), secret);
    }

    #[test]
    fn test_scheme_guards_quorum() {
        let scheme = ShamirScheme::new(field(97), 5, 3).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let shares = scheme.split(&BigUint::from(42u32), &mut rng).unwrap();

        assert_eq!(
            scheme.reconstruct(&shares[..3]).unwrap(),
            BigUint::from(42u32)
        );
        assert!(matches!(
            scheme.reconstruct(&shares[..2]),
            Err(ShamirError::InsufficientShares {
                provided: 2,
                required: 3
            })
        ));

        assert!(ShamirScheme::new(field(97), 2, 3).is_err());
    }

    #[test]
    fn test_quorum_validation() {
        let zero_x = vec![
            Share::new(0, BigUint::from(1u32)),
            Share::new(2, BigUint::from(1u32)),
        ];
        assert!(matches!(
            Quorum::new(zero_x, 2),
            Err(ShamirError::InvalidShareIdentifier)
        ));

        let duplicate = vec![
            Share::new(2, BigUint::from(1u32)),
            Share::new(2, BigUint::from(5u32)),
        ];
        assert!(matches!(
            Quorum::new(duplicate, 2),
            Err(ShamirError::DuplicateShares)
        ));

        let quorum = Quorum::new(vec![Share::new(1, BigUint::from(1u32))], 1).unwrap();
        assert_eq!(quorum.len(), 1);
        assert!(!quorum.is_empty());
    }
}
