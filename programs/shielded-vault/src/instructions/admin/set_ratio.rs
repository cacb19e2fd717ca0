//! Set Ratio Instruction

use anchor_lang::prelude::*;

use crate::error::VaultError;
use crate::events::RatioUpdated;
use crate::state::VaultConfig;

#[derive(Accounts)]
pub struct SetRatio<'info> {
    #[account(
        mut,
        seeds = [VaultConfig::SEED_PREFIX, vault_config.stable_mint.as_ref()],
        bump = vault_config.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_config: Account<'info, VaultConfig>,

    pub authority: Signer<'info>,
}

/// # Arguments
/// * `new_ratio` - Collateralization ratio in percent (at least 100)
pub fn handler(ctx: Context<SetRatio>, new_ratio: u64) -> Result<()> {
    let vault_config = &mut ctx.accounts.vault_config;
    let old_ratio = vault_config.ratio;
    vault_config.set_ratio(new_ratio)?;

    emit!(RatioUpdated {
        vault: vault_config.key(),
        old_ratio,
        new_ratio,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Ratio updated: {}% -> {}%", old_ratio, new_ratio);

    Ok(())
}
