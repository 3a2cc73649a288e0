//! Secure summation on top of Shamir sharing.
//!
//! Every party splits its own secret, sends share `k` to party `k`, and adds
//! up what it receives. Because evaluation and field addition commute, the
//! per-party sums are themselves shares of the sum of all secrets, so any
//! quorum of them reveals the total and nothing else.
//!
//! The share count equals the number of parties, and party `k` always holds
//! the shares taken at x = `k + 1`.

use num_bigint_dig::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use std::collections::HashSet;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::shamir::{add_shares, PrimeField, ShamirError, ShamirScheme, Share};
use crate::transport::Envelope;

/// A participant and the secret it contributes. The secret is wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Party {
    #[zeroize(skip)]
    id: usize,
    secret: BigUint,
}

impl Party {
    pub fn new(id: usize, secret: BigUint) -> Self {
        Self { id, secret }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Split this party's secret and address share `k` to party `k`.
    pub fn share_out<R: Rng + CryptoRng + ?Sized>(
        &self,
        scheme: &ShamirScheme,
        rng: &mut R,
    ) -> Result<Vec<Envelope>, ShamirError> {
        let shares = scheme.split(&self.secret, rng)?;
        Ok(shares
            .into_iter()
            .enumerate()
            .map(|(to, share)| Envelope::new(self.id, to, share))
            .collect())
    }
}

impl std::fmt::Debug for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Party")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The x-coordinate whose shares party `party` collects.
pub fn coordinate_of(party: usize) -> u64 {
    party as u64 + 1
}

/// Shares delivered to one party, one from each sender.
#[derive(Clone, Debug)]
pub struct Inbox {
    owner: usize,
    parties: usize,
    senders: HashSet<usize>,
    shares: Vec<Share>,
}

impl Inbox {
    pub fn new(owner: usize, parties: usize) -> Self {
        Self {
            owner,
            parties,
            senders: HashSet::with_capacity(parties),
            shares: Vec::with_capacity(parties),
        }
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    pub fn x(&self) -> u64 {
        coordinate_of(self.owner)
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Whether a share from every party has arrived.
    pub fn is_complete(&self) -> bool {
        self.shares.len() == self.parties
    }

    pub fn deliver(&mut self, envelope: Envelope) -> Result<(), ShamirError> {
        if envelope.to != self.owner {
            return Err(ShamirError::MisroutedShare {
                expected: self.owner,
                found: envelope.to,
            });
        }
        if envelope.from >= self.parties {
            return Err(ShamirError::UnknownParty(envelope.from));
        }
        if envelope.share.x != self.x() {
            return Err(ShamirError::MixedCoordinates {
                expected: self.x(),
                found: envelope.share.x,
            });
        }
        if !self.senders.insert(envelope.from) {
            return Err(ShamirError::DuplicateSender(envelope.from));
        }

        self.shares.push(envelope.share);
        Ok(())
    }

    /// Field sum of every received share, kept at this inbox's x-coordinate.
    pub fn local_sum(&self, field: &PrimeField) -> Result<LocalSum, ShamirError> {
        if !self.is_complete() {
            return Err(ShamirError::IncompleteInbox {
                party: self.owner,
                received: self.shares.len(),
                expected: self.parties,
            });
        }

        let share = self
            .shares
            .iter()
            .try_fold(Share::new(self.x(), BigUint::zero()), |acc, share| {
                add_shares(&acc, share, field)
            })?;

        Ok(LocalSum {
            party: self.owner,
            share,
        })
    }
}

/// One party's summed share. Across all parties these are shares of the
/// total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSum {
    pub party: usize,
    pub share: Share,
}

/// Runs the secure-sum protocol for a fixed set of parameters.
#[derive(Clone, Debug)]
pub struct SecureSum {
    scheme: ShamirScheme,
}

impl SecureSum {
    /// The scheme's share count doubles as the number of parties.
    pub fn new(scheme: ShamirScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &ShamirScheme {
        &self.scheme
    }

    pub fn parties(&self) -> usize {
        self.scheme.total_shares()
    }

    /// Every party splits its secret. Splits run in parallel, each with its
    /// own ChaCha20 stream seeded from `rng`.
    pub fn distribute<R: Rng + CryptoRng + ?Sized>(
        &self,
        parties: &[Party],
        rng: &mut R,
    ) -> Result<Vec<Envelope>, ShamirError> {
        self.check_roster(parties)?;

        let seeds: Vec<Zeroizing<[u8; 32]>> = parties
            .iter()
            .map(|_| {
                let mut seed = Zeroizing::new([0u8; 32]);
                rng.fill(&mut seed[..]);
                seed
            })
            .collect();

        let outgoing: Vec<Vec<Envelope>> = parties
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(party, seed)| {
                let mut party_rng = ChaCha20Rng::from_seed(**seed);
                party.share_out(&self.scheme, &mut party_rng)
            })
            .collect::<Result<_, _>>()?;

        log::debug!("{} parties shared their secrets", parties.len());
        Ok(outgoing.into_iter().flatten().collect())
    }

    /// Route envelopes into one inbox per party.
    pub fn deliver(&self, envelopes: Vec<Envelope>) -> Result<Vec<Inbox>, ShamirError> {
        let parties = self.parties();
        let mut inboxes: Vec<Inbox> = (0..parties).map(|id| Inbox::new(id, parties)).collect();

        for envelope in envelopes {
            let to = envelope.to;
            inboxes
                .get_mut(to)
                .ok_or(ShamirError::UnknownParty(to))?
                .deliver(envelope)?;
        }

        Ok(inboxes)
    }

    pub fn local_sums(&self, inboxes: &[Inbox]) -> Result<Vec<LocalSum>, ShamirError> {
        inboxes
            .iter()
            .map(|inbox| inbox.local_sum(self.scheme.field()))
            .collect()
    }

    /// Reconstruct the total from a quorum of local sums.
    pub fn aggregate(&self, sums: &[LocalSum]) -> Result<BigUint, ShamirError> {
        let shares: Vec<Share> = sums.iter().map(|s| s.share.clone()).collect();
        self.scheme.reconstruct(&shares)
    }

    /// Share, route and sum: the local sums every party ends up with.
    pub fn compute_local_sums<R: Rng + CryptoRng + ?Sized>(
        &self,
        parties: &[Party],
        rng: &mut R,
    ) -> Result<Vec<LocalSum>, ShamirError> {
        let envelopes = self.distribute(parties, rng)?;
        let inboxes = self.deliver(envelopes)?;
        self.local_sums(&inboxes)
    }

    /// The whole protocol, reconstructing from the first `threshold` parties.
    pub fn run<R: Rng + CryptoRng + ?Sized>(
        &self,
        parties: &[Party],
        rng: &mut R,
    ) -> Result<BigUint, ShamirError> {
        log::info!(
            "running secure sum over {} parties, threshold {}",
            parties.len(),
            self.scheme.threshold()
        );
        let sums = self.compute_local_sums(parties, rng)?;
        self.aggregate(&sums[..self.scheme.threshold()])
    }

    fn check_roster(&self, parties: &[Party]) -> Result<(), ShamirError> {
        if parties.len() != self.parties() {
            return Err(ShamirError::PartyCountMismatch {
                parties: parties.len(),
                shares: self.parties(),
            });
        }

        let mut seen = HashSet::with_capacity(parties.len());
        for party in parties {
            if party.id >= self.parties() {
                return Err(ShamirError::UnknownParty(party.id));
            }
            if !seen.insert(party.id) {
                return Err(ShamirError::DuplicateSender(party.id));
            }
        }
        Ok(())
    }
}

/// The plain field sum of `secrets`, for checking a protocol run.
pub fn plain_sum<'a, I>(secrets: I, field: &PrimeField) -> BigUint
where
    I: IntoIterator<Item = &'a BigUint>,
{
    secrets
        .into_iter()
        .fold(BigUint::zero(), |acc, s| field.add(&acc, s))
}
