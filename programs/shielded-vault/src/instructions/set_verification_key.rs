//! Set Verification Key Instruction
//!
//! Stores the Groth16 key for the membership circuit. Only the vault
//! authority may call it, and every point is checked before it is stored.

use anchor_lang::prelude::*;

use crate::crypto::curve_utils::{is_g1_identity, validate_g1_point, validate_g2_point};
use crate::error::VaultError;
use crate::events::VerificationKeySet;
use crate::state::{VaultConfig, VerificationKeyAccount};

#[derive(Accounts)]
pub struct SetVerificationKey<'info> {
    #[account(
        mut,
        seeds = [VaultConfig::SEED_PREFIX, vault_config.stable_mint.as_ref()],
        bump = vault_config.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [VerificationKeyAccount::SEED_PREFIX, vault_config.key().as_ref()],
        bump = verification_key.bump,
        constraint = verification_key.vault == vault_config.key() @ VaultError::Unauthorized,
    )]
    pub verification_key: Account<'info, VerificationKeyAccount>,

    pub authority: Signer<'info>,
}

pub fn handler(
    ctx: Context<SetVerificationKey>,
    vk_alpha_g1: [u8; 64],
    vk_beta_g2: [u8; 128],
    vk_gamma_g2: [u8; 128],
    vk_delta_g2: [u8; 128],
    vk_ic: Vec<[u8; 64]>,
) -> Result<()> {
    require!(
        !is_g1_identity(&vk_alpha_g1),
        VaultError::VerificationKeyNotSet
    );
    validate_g1_point(&vk_alpha_g1)?;
    validate_g2_point(&vk_beta_g2)?;
    validate_g2_point(&vk_gamma_g2)?;
    validate_g2_point(&vk_delta_g2)?;
    for point in &vk_ic {
        validate_g1_point(point)?;
    }

    let ic_length = vk_ic.len() as u8;
    ctx.accounts
        .verification_key
        .set_vk(vk_alpha_g1, vk_beta_g2, vk_gamma_g2, vk_delta_g2, vk_ic)?;

    let vault_config = &mut ctx.accounts.vault_config;
    vault_config.set_vk_configured(true);

    emit!(VerificationKeySet {
        vault: vault_config.key(),
        authority: ctx.accounts.authority.key(),
        ic_length,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Verification key set");
    msg!("IC points: {}", ic_length);
    Ok(())
}
