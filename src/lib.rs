//! Shamir secret sharing over prime fields, and a secure-sum protocol on top
//! of it.
//!
//! A secret is split into `n` shares with [`shamir::split`]; any `t` of them
//! give it back through [`shamir::reconstruct`]. [`secure_sum::SecureSum`]
//! lets a group of parties learn the sum of their secrets without any party
//! seeing another's.
//!
//! Moving shares between parties is left to the caller. [`transport::Envelope`]
//! is the shape they travel in.

pub mod config;
pub mod prime;
pub mod secure_sum;
pub mod shamir;
pub mod transport;

pub use config::SharingConfig;
pub use prime::{PrimeSource, RandomPrimes};
pub use secure_sum::{plain_sum, Inbox, LocalSum, Party, SecureSum};
pub use shamir::{
    add_shares, reconstruct, refresh_shares, split, PrimeField, Quorum, ShamirError,
    ShamirScheme, Share,
};
pub use transport::Envelope;
