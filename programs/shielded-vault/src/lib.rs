//! Shielded Vault
//!
//! Over-collateralized stable-value vault with private positions. Deposits
//! append a commitment to an incremental Merkle tree; borrows and
//! withdrawals prove membership with a Groth16 proof and act on the
//! position named by the revealed nullifier hash.

use anchor_lang::prelude::*;

pub mod capabilities;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod events;
pub mod instructions;
pub mod math;
pub mod oracle;
pub mod state;

#[cfg(test)]
mod tests;

use instructions::*;
use state::VaultParams;

declare_id!("4sPCqik6sWTutYF8EQYzgERr99QnhzLc3vhJ3kArRpLc");

#[program]
pub mod shielded_vault {
    use super::*;

    pub fn initialize_vault(ctx: Context<InitializeVault>, params: VaultParams) -> Result<()> {
        instructions::initialize_vault::handler(ctx, params)
    }

    pub fn set_verification_key(
        ctx: Context<SetVerificationKey>,
        vk_alpha_g1: [u8; 64],
        vk_beta_g2: [u8; 128],
        vk_gamma_g2: [u8; 128],
        vk_delta_g2: [u8; 128],
        vk_ic: Vec<[u8; 64]>,
    ) -> Result<()> {
        instructions::set_verification_key::handler(
            ctx,
            vk_alpha_g1,
            vk_beta_g2,
            vk_gamma_g2,
            vk_delta_g2,
            vk_ic,
        )
    }

    pub fn deposit(ctx: Context<Deposit>, commitment: [u8; 32], amount: u64) -> Result<()> {
        instructions::deposit::handler(ctx, commitment, amount)
    }

    pub fn borrow(
        ctx: Context<Borrow>,
        proof_data: Vec<u8>,
        merkle_root: [u8; 32],
        nullifier_hash: [u8; 32],
        amount: u64,
    ) -> Result<()> {
        instructions::borrow::handler(ctx, proof_data, merkle_root, nullifier_hash, amount)
    }

    pub fn withdraw(
        ctx: Context<Withdraw>,
        proof_data: Vec<u8>,
        merkle_root: [u8; 32],
        nullifier_hash: [u8; 32],
        repayment_amount: u64,
    ) -> Result<()> {
        instructions::withdraw::handler(
            ctx,
            proof_data,
            merkle_root,
            nullifier_hash,
            repayment_amount,
        )
    }

    pub fn set_price_source(ctx: Context<SetPriceSource>, new_source: Pubkey) -> Result<()> {
        instructions::admin::set_price_source::handler(ctx, new_source)
    }

    pub fn set_ratio(ctx: Context<SetRatio>, new_ratio: u64) -> Result<()> {
        instructions::admin::set_ratio::handler(ctx, new_ratio)
    }
}
