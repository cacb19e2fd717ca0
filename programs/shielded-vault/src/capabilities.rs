//! External collaborators of the vault controller
//!
//! The controller never reaches into a verifier, oracle or token ledger
//! directly; it is handed implementations of these traits. Every call
//! returns a `Result`, and any error aborts the enclosing operation.

use anchor_lang::prelude::*;

use crate::crypto::{Groth16Proof, ZkPublicInputs};

/// Checks a membership proof over `[root, nullifier_hash]`.
pub trait ProofVerifier {
    fn verify(&self, proof: &Groth16Proof, public_inputs: &ZkPublicInputs) -> Result<bool>;
}

/// Source of the collateral/stable exchange rate.
pub trait PriceOracle {
    /// Latest price with `math::PRICE_DECIMALS` decimals.
    fn latest_price(&self) -> Result<u64>;
}

/// Stable-value token ledger the vault mints into and burns from.
///
/// Amounts are in working precision (see `math`).
pub trait StableLedger {
    fn mint(&mut self, account: &Pubkey, amount: u128) -> Result<()>;
    fn burn(&mut self, account: &Pubkey, amount: u128) -> Result<()>;
    fn balance_of(&self, account: &Pubkey) -> Result<u128>;
}

/// Custody of deposited collateral; performs the outward value transfer.
pub trait CollateralTreasury {
    /// Fails when `transfer(recipient, amount)` would fail. Called before
    /// any state or ledger change of a withdrawal.
    fn check_transfer(&self, recipient: &Pubkey, amount: u64) -> Result<()>;

    fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<()>;
}

/// Per-call environment supplied by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Account invoking the operation
    pub caller: Pubkey,

    /// Collateral moved into custody alongside the call
    pub attached_value: u64,

    /// Unix timestamp of the call
    pub timestamp: i64,
}

impl CallContext {
    pub fn new(caller: Pubkey, timestamp: i64) -> Self {
        Self {
            caller,
            attached_value: 0,
            timestamp,
        }
    }

    pub fn with_value(mut self, attached_value: u64) -> Self {
        self.attached_value = attached_value;
        self
    }
}
