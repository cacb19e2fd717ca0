//! Vault position keyed by nullifier hash
//!
//! A position is opened lazily by the first successful borrow against a
//! nullifier and is never closed. The nullifier names a persistent position,
//! not a one-shot spend: it may be borrowed against repeatedly up to its
//! ceiling and repaid in parts.
//!
//! # State Machine
//! `Uninitialized → Active` on first borrow, `Active → Active` afterwards.

use anchor_lang::prelude::*;

use crate::error::VaultError;
use crate::math;

/// Collateral/debt record for one nullifier.
///
/// PDA Seeds: `[b"position", vault_config.key().as_ref(), nullifier_hash.as_ref()]`
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Owning vault
    pub vault: Pubkey,

    /// Nullifier hash naming this position
    pub nullifier_hash: [u8; 32],

    /// Set by the first successful borrow
    pub initialized: bool,

    /// Declared for clients; no instruction transitions it yet
    pub fully_withdrawn: bool,

    /// Collateral still locked behind this position
    pub collateral_amount: u64,

    /// Outstanding stable debt in working precision
    pub debt_amount: u128,

    /// PDA bump seed
    pub bump: u8,
}

impl Position {
    /// Account space
    pub const LEN: usize = 8 // discriminator
        + 32 // vault
        + 32 // nullifier_hash
        + 1  // initialized
        + 1  // fully_withdrawn
        + 8  // collateral_amount
        + 16 // debt_amount
        + 1; // bump

    pub const SEED_PREFIX: &'static [u8] = b"position";

    /// Blank record for a nullifier that has never borrowed.
    pub fn uninitialized(vault: Pubkey, nullifier_hash: [u8; 32]) -> Self {
        Position {
            vault,
            nullifier_hash,
            ..Position::default()
        }
    }

    /// Debt used for ceiling checks (zero until opened).
    pub fn current_debt(&self) -> u128 {
        if self.initialized {
            self.debt_amount
        } else {
            0
        }
    }

    /// Apply a borrow of `amount` against this position.
    ///
    /// Opens the position with `unit_deposit` collateral on first use, then
    /// adds the debt. Nothing is mutated when the amount is above the
    /// ceiling `(unit_deposit * price - debt) * ratio / 100`.
    pub fn record_borrow(
        &mut self,
        unit_deposit: u64,
        price: u128,
        ratio: u64,
        amount: u128,
    ) -> Result<()> {
        require!(amount > 0, VaultError::InvalidAmount);

        let ceiling = math::max_borrow(unit_deposit, price, self.current_debt(), ratio)?;
        require!(amount <= ceiling, VaultError::ExceedsMaxBorrow);

        let new_debt = self
            .current_debt()
            .checked_add(amount)
            .ok_or(error!(VaultError::ArithmeticOverflow))?;

        if !self.initialized {
            self.initialized = true;
            self.collateral_amount = unit_deposit;
        }
        self.debt_amount = new_debt;

        Ok(())
    }

    /// Apply a repayment and return the collateral it releases.
    ///
    /// `released = repayment / price * 100 / ratio`, divided in that order.
    /// Nothing is mutated on error.
    pub fn record_repayment(&mut self, price: u128, ratio: u64, repayment: u128) -> Result<u64> {
        require!(repayment > 0, VaultError::InvalidAmount);
        require!(
            repayment <= self.current_debt(),
            VaultError::RepaymentExceedsDebt
        );

        let released = math::collateral_for_repayment(repayment, price, ratio)?;

        let new_collateral = self
            .collateral_amount
            .checked_sub(released)
            .ok_or(error!(VaultError::InsufficientCollateral))?;
        let new_debt = self
            .debt_amount
            .checked_sub(repayment)
            .ok_or(error!(VaultError::RepaymentExceedsDebt))?;

        self.collateral_amount = new_collateral;
        self.debt_amount = new_debt;

        Ok(released)
    }
}
