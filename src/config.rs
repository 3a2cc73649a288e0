use anyhow::{anyhow, Context, Result};
use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::prime::{is_probable_prime, PrimeSource};
use crate::shamir::{PrimeField, ShamirError, ShamirScheme};

/// Sharing parameters for a run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SharingConfig {
    /// Number of shares to create, one per party in a secure sum (default: 3)
    pub total_shares: usize,
    /// Threshold required to reconstruct (default: 2)
    pub threshold: usize,
    /// Size of a freshly drawn prime when none is pinned (default: 128)
    pub prime_bits: usize,
    /// Fixed field prime; drawn from a prime source when absent. Written as
    /// a decimal string; a plain JSON number is accepted up to `u64::MAX`.
    #[serde(with = "decimal")]
    pub prime: Option<BigUint>,
}

/// Decimal text form of an optional big integer.
mod decimal {
    use num_bigint_dig::BigUint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.to_str_radix(10)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(n)) => Ok(Some(BigUint::from(n))),
            Some(Repr::Text(text)) => BigUint::parse_bytes(text.trim().as_bytes(), 10)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid decimal integer {:?}", text))),
        }
    }
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            total_shares: 3,
            threshold: 2,
            prime_bits: 128,
            prime: None,
        }
    }
}

impl SharingConfig {
    /// Parse configuration from a JSON document
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: SharingConfig =
            serde_json::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ShamirError> {
        if self.total_shares == 0 {
            return Err(ShamirError::InvalidShareCount);
        }
        if self.threshold == 0 {
            return Err(ShamirError::InvalidThreshold);
        }
        if self.total_shares < self.threshold {
            return Err(ShamirError::SharesLessThanThreshold);
        }
        if self.prime.is_none() && self.prime_bits < 2 {
            return Err(ShamirError::InvalidPrimeBits(self.prime_bits));
        }
        Ok(())
    }

    /// The field for this configuration. A pinned prime is checked for
    /// primality; otherwise a new one is drawn from `primes`.
    pub fn field<P: PrimeSource + ?Sized>(&self, primes: &mut P) -> Result<PrimeField> {
        self.validate()?;

        let prime = match &self.prime {
            Some(prime) => {
                if !is_probable_prime(prime) {
                    return Err(anyhow!("Configured modulus {} is not prime", prime));
                }
                prime.clone()
            }
            None => primes
                .prime(self.prime_bits)
                .context("Failed to generate field prime")?,
        };

        log::info!("using a {}-bit field prime", prime.bits());
        Ok(PrimeField::new(prime)?)
    }

    pub fn scheme<P: PrimeSource + ?Sized>(&self, primes: &mut P) -> Result<ShamirScheme> {
        let field = self.field(primes)?;
        Ok(ShamirScheme::new(field, self.total_shares, self.threshold)?)
    }
}
