//! Events for the Shielded Vault

use anchor_lang::prelude::*;

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub stable_mint: Pubkey,
    pub price_source: Pubkey,
    pub unit_deposit: u64,
    pub ratio: u64,
    pub tree_depth: u8,
    pub root_history_size: u16,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKeySet {
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub ic_length: u8,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceSourceUpdated {
    pub vault: Pubkey,
    pub old_source: Pubkey,
    pub new_source: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatioUpdated {
    pub vault: Pubkey,
    pub old_ratio: u64,
    pub new_ratio: u64,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositEvent {
    pub commitment: [u8; 32],
    pub leaf_index: u32,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BorrowEvent {
    pub recipient: Pubkey,
    pub nullifier_hash: [u8; 32],
    /// Working precision
    pub amount: u128,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalEvent {
    pub recipient: Pubkey,
    pub nullifier_hash: [u8; 32],
    pub collateral_released: u64,
    /// Working precision
    pub repayment_amount: u128,
}

/// Ordered record of the controller's state transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultEvent {
    Deposit(DepositEvent),
    Borrow(BorrowEvent),
    Withdrawal(WithdrawalEvent),
}
