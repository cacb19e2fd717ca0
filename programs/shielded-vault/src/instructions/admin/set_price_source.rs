//! Set Price Source Instruction
//!
//! Points the vault at a different price account. Only callable by the
//! vault authority.

use anchor_lang::prelude::*;

use crate::error::VaultError;
use crate::events::PriceSourceUpdated;
use crate::state::VaultConfig;

#[derive(Accounts)]
pub struct SetPriceSource<'info> {
    #[account(
        mut,
        seeds = [VaultConfig::SEED_PREFIX, vault_config.stable_mint.as_ref()],
        bump = vault_config.bump,
        has_one = authority @ VaultError::Unauthorized,
    )]
    pub vault_config: Account<'info, VaultConfig>,

    pub authority: Signer<'info>,
}

pub fn handler(ctx: Context<SetPriceSource>, new_source: Pubkey) -> Result<()> {
    require!(
        new_source != Pubkey::default(),
        VaultError::PriceUnavailable
    );

    let vault_config = &mut ctx.accounts.vault_config;
    let old_source = vault_config.price_source;
    vault_config.set_price_source(new_source);

    emit!(PriceSourceUpdated {
        vault: vault_config.key(),
        old_source,
        new_source,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Price source updated");
    msg!("Old source: {}", old_source);
    msg!("New source: {}", new_source);

    Ok(())
}
