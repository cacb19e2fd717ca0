//! Vault configuration
//!
//! `VaultParams` is the construction-time configuration shared by the
//! in-memory controller and the on-chain vault; `VaultConfig` persists it
//! together with the authority and the external handles.

use anchor_lang::prelude::*;

use crate::crypto::HashKind;
use crate::error::VaultError;
use crate::math::{self, PRICE_SCALE};
use crate::state::merkle_tree::{
    DEFAULT_ROOT_HISTORY_SIZE, MAX_TREE_DEPTH, MIN_ROOT_HISTORY_SIZE, MIN_TREE_DEPTH,
};

/// Construction-time vault parameters.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VaultParams {
    /// Fixed collateral amount every deposit must attach
    pub unit_deposit: u64,

    /// Collateralization ratio in percent
    pub ratio: u64,

    pub tree_depth: u8,

    pub root_history_size: u16,

    /// Multiplier from raw oracle price to working precision
    pub price_scale: u128,

    pub hash_kind: HashKind,
}

impl VaultParams {
    /// Parameters with the default history size, price scale and Poseidon.
    pub fn new(unit_deposit: u64, ratio: u64, tree_depth: u8) -> Self {
        Self {
            unit_deposit,
            ratio,
            tree_depth,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            price_scale: PRICE_SCALE,
            hash_kind: HashKind::Poseidon,
        }
    }

    pub fn with_root_history_size(mut self, root_history_size: u16) -> Self {
        self.root_history_size = root_history_size;
        self
    }

    pub fn with_price_scale(mut self, price_scale: u128) -> Self {
        self.price_scale = price_scale;
        self
    }

    pub fn with_hash_kind(mut self, hash_kind: HashKind) -> Self {
        self.hash_kind = hash_kind;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require!(self.unit_deposit > 0, VaultError::InvalidUnitDeposit);
        math::check_ratio(self.ratio)?;
        require!(
            (MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&self.tree_depth),
            VaultError::InvalidTreeDepth
        );
        require!(
            self.root_history_size >= MIN_ROOT_HISTORY_SIZE,
            VaultError::InvalidRootHistorySize
        );
        require!(self.price_scale > 0, VaultError::InvalidPrice);
        Ok(())
    }
}

/// Main vault configuration account.
///
/// PDA Seeds: `[b"vault", stable_mint.key().as_ref()]`
#[account]
pub struct VaultConfig {
    /// Vault authority - the only signer for admin instructions
    pub authority: Pubkey,

    /// SPL mint of the stable token; its mint authority is this PDA
    pub stable_mint: Pubkey,

    /// Account the price is read from
    pub price_source: Pubkey,

    /// Merkle tree account address (cached for convenience)
    pub merkle_tree: Pubkey,

    /// Verification key account address (cached for convenience)
    pub verification_key: Pubkey,

    /// Fixed collateral (lamports) per deposit
    pub unit_deposit: u64,

    /// Collateralization ratio in percent
    pub ratio: u64,

    /// Multiplier from raw oracle price to working precision
    pub price_scale: u128,

    /// Merkle tree depth (immutable after init)
    pub tree_depth: u8,

    pub total_deposits: u64,
    pub total_borrows: u64,
    pub total_withdrawals: u64,

    /// Whether verification key has been set
    pub vk_configured: bool,

    /// PDA bump seed
    pub bump: u8,

    /// Bump of the collateral custody PDA
    pub collateral_bump: u8,

    /// Reserved space for future upgrades
    pub _reserved: [u8; 64],
}

impl VaultConfig {
    /// Account space calculation
    pub const LEN: usize = 8 // discriminator
        + 32 // authority
        + 32 // stable_mint
        + 32 // price_source
        + 32 // merkle_tree
        + 32 // verification_key
        + 8  // unit_deposit
        + 8  // ratio
        + 16 // price_scale
        + 1  // tree_depth
        + 8  // total_deposits
        + 8  // total_borrows
        + 8  // total_withdrawals
        + 1  // vk_configured
        + 1  // bump
        + 1  // collateral_bump
        + 64; // reserved

    pub const SEED_PREFIX: &'static [u8] = b"vault";

    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        &mut self,
        authority: Pubkey,
        stable_mint: Pubkey,
        price_source: Pubkey,
        merkle_tree: Pubkey,
        verification_key: Pubkey,
        params: &VaultParams,
        bump: u8,
        collateral_bump: u8,
    ) -> Result<()> {
        params.validate()?;

        self.authority = authority;
        self.stable_mint = stable_mint;
        self.price_source = price_source;
        self.merkle_tree = merkle_tree;
        self.verification_key = verification_key;
        self.unit_deposit = params.unit_deposit;
        self.ratio = params.ratio;
        self.price_scale = params.price_scale;
        self.tree_depth = params.tree_depth;
        self.total_deposits = 0;
        self.total_borrows = 0;
        self.total_withdrawals = 0;
        self.vk_configured = false;
        self.bump = bump;
        self.collateral_bump = collateral_bump;
        self._reserved = [0u8; 64];
        Ok(())
    }

    pub fn require_vk_configured(&self) -> Result<()> {
        require!(self.vk_configured, VaultError::VerificationKeyNotSet);
        Ok(())
    }

    pub fn set_vk_configured(&mut self, configured: bool) {
        self.vk_configured = configured;
    }

    pub fn set_price_source(&mut self, price_source: Pubkey) {
        self.price_source = price_source;
    }

    pub fn set_ratio(&mut self, ratio: u64) -> Result<()> {
        math::check_ratio(ratio)?;
        self.ratio = ratio;
        Ok(())
    }

    pub fn increment_deposits(&mut self) -> Result<()> {
        self.total_deposits = self
            .total_deposits
            .checked_add(1)
            .ok_or(error!(VaultError::ArithmeticOverflow))?;
        Ok(())
    }

    pub fn increment_borrows(&mut self) -> Result<()> {
        self.total_borrows = self
            .total_borrows
            .checked_add(1)
            .ok_or(error!(VaultError::ArithmeticOverflow))?;
        Ok(())
    }

    pub fn increment_withdrawals(&mut self) -> Result<()> {
        self.total_withdrawals = self
            .total_withdrawals
            .checked_add(1)
            .ok_or(error!(VaultError::ArithmeticOverflow))?;
        Ok(())
    }
}
