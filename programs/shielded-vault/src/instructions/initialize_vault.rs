//! Initialize Vault Instruction

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_lang::system_program::{self, Transfer};
use anchor_spl::token::{Mint, Token};

use crate::error::VaultError;
use crate::events::VaultInitialized;
use crate::math;
use crate::state::{MerkleTree, VaultConfig, VaultParams, VerificationKeyAccount};

#[derive(Accounts)]
#[instruction(params: VaultParams)]
pub struct InitializeVault<'info> {
    #[account(
        init,
        payer = authority,
        space = VaultConfig::LEN,
        seeds = [VaultConfig::SEED_PREFIX, stable_mint.key().as_ref()],
        bump
    )]
    pub vault_config: Box<Account<'info, VaultConfig>>,

    #[account(
        init,
        payer = authority,
        space = MerkleTree::space(params.tree_depth, params.root_history_size),
        seeds = [b"merkle_tree", vault_config.key().as_ref()],
        bump
    )]
    pub merkle_tree: Box<Account<'info, MerkleTree>>,

    #[account(
        init,
        payer = authority,
        space = VerificationKeyAccount::space(VerificationKeyAccount::DEFAULT_MAX_IC_POINTS),
        seeds = [VerificationKeyAccount::SEED_PREFIX, vault_config.key().as_ref()],
        bump
    )]
    pub verification_key: Box<Account<'info, VerificationKeyAccount>>,

    /// Lamport custody for deposited collateral.
    #[account(
        mut,
        seeds = [b"collateral", vault_config.key().as_ref()],
        bump
    )]
    pub collateral: SystemAccount<'info>,

    /// Stable token mint; its mint authority must already be the vault PDA.
    pub stable_mint: Box<Account<'info, Mint>>,

    /// CHECK: only the address is stored; the layout is checked when read.
    pub price_source: UncheckedAccount<'info>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<InitializeVault>, params: VaultParams) -> Result<()> {
    params.validate()?;
    math::token_unit_scale(params.price_scale, ctx.accounts.stable_mint.decimals)?;

    let vault_key = ctx.accounts.vault_config.key();
    require!(
        ctx.accounts.stable_mint.mint_authority == COption::Some(vault_key),
        VaultError::Unauthorized
    );

    // Custody PDA must stay rent-exempt, so seed it before any deposit.
    let reserve = Rent::get()?.minimum_balance(0);
    let missing = reserve.saturating_sub(ctx.accounts.collateral.lamports());
    if missing > 0 {
        system_program::transfer(
            CpiContext::new(
                ctx.accounts.system_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.authority.to_account_info(),
                    to: ctx.accounts.collateral.to_account_info(),
                },
            ),
            missing,
        )?;
    }

    let merkle_tree_key = ctx.accounts.merkle_tree.key();
    let verification_key_key = ctx.accounts.verification_key.key();

    let vault_config = &mut ctx.accounts.vault_config;
    vault_config.initialize(
        ctx.accounts.authority.key(),
        ctx.accounts.stable_mint.key(),
        ctx.accounts.price_source.key(),
        merkle_tree_key,
        verification_key_key,
        &params,
        ctx.bumps.vault_config,
        ctx.bumps.collateral,
    )?;

    ctx.accounts.merkle_tree.initialize(
        vault_key,
        params.tree_depth,
        params.root_history_size,
        params.hash_kind,
    )?;
    ctx.accounts
        .verification_key
        .initialize(vault_key, ctx.bumps.verification_key);

    emit!(VaultInitialized {
        vault: vault_key,
        authority: ctx.accounts.authority.key(),
        stable_mint: ctx.accounts.stable_mint.key(),
        price_source: ctx.accounts.price_source.key(),
        unit_deposit: params.unit_deposit,
        ratio: params.ratio,
        tree_depth: params.tree_depth,
        root_history_size: params.root_history_size,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Shielded vault initialized");
    msg!(
        "Unit deposit: {}, ratio: {}%, depth: {}",
        params.unit_deposit,
        params.ratio,
        params.tree_depth
    );
    Ok(())
}
