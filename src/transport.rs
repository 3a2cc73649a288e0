use serde::{Deserialize, Serialize};

use crate::shamir::{ShamirError, Share};

/// A share in transit from one party to another.
///
/// Delivery and attribution are the carrier's job; this is only the shape
/// of what gets carried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: usize,
    pub to: usize,
    pub share: Share,
}

impl Envelope {
    pub fn new(from: usize, to: usize, share: Share) -> Self {
        Self { from, to, share }
    }

    /// Serialize to the compact binary form used on the wire
    pub fn encode(&self) -> Result<Vec<u8>, ShamirError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ShamirError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
