//! Rules engine contract and the local Belka implementation.
//!
//! The orchestrator treats the signature as opaque apart from the shared
//! parser in [`signature`]; every transition goes through [`RulesEngine`].

use async_trait::async_trait;

use crate::errors::domain::DomainError;

pub mod belka;
pub mod cards;
pub mod signature;

pub use belka::BelkaEngine;
pub use cards::{Card, Face, Suit};
pub use signature::Signature;

#[async_trait]
pub trait RulesEngine: Send + Sync {
    /// Deal a fresh round from the current table signature (empty before the
    /// first round).
    async fn new_round(&self, signature: &str) -> Result<String, DomainError>;

    /// Play `card` for the seat whose turn it is. Fails with `InvalidMove` or
    /// `InvalidSignature` and never returns a partially applied state.
    async fn make_move(&self, signature: &str, card: &str) -> Result<String, DomainError>;
}
