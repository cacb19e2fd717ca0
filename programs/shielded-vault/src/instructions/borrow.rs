//! Borrow Instruction
//!
//! Proves membership of a deposit under a recent root and mints stable
//! tokens against the position named by the revealed nullifier hash.
//! The position PDA is created on the first borrow and reused afterwards.
//!
//! `amount` is in base units of the stable mint; the position records it in
//! working precision (`math::token_unit_scale`).

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Mint, MintTo, Token, TokenAccount};

use crate::capabilities::PriceOracle;
use crate::controller::verify_membership;
use crate::crypto::{Groth16Proof, Groth16Verifier};
use crate::error::VaultError;
use crate::events::BorrowEvent;
use crate::math;
use crate::oracle::AccountPriceFeed;
use crate::state::{
    verification_key::VerificationKey, MerkleTree, Position, VaultConfig, VerificationKeyAccount,
};

#[derive(Accounts)]
#[instruction(proof_data: Vec<u8>, merkle_root: [u8; 32], nullifier_hash: [u8; 32])]
pub struct Borrow<'info> {
    #[account(
        mut,
        seeds = [VaultConfig::SEED_PREFIX, vault_config.stable_mint.as_ref()],
        bump = vault_config.bump,
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        seeds = [b"merkle_tree", vault_config.key().as_ref()],
        bump,
        constraint = merkle_tree.vault == vault_config.key() @ VaultError::Unauthorized,
    )]
    pub merkle_tree: Account<'info, MerkleTree>,

    #[account(
        seeds = [VerificationKeyAccount::SEED_PREFIX, vault_config.key().as_ref()],
        bump = verification_key.bump,
        constraint = verification_key.vault == vault_config.key() @ VaultError::Unauthorized,
        constraint = verification_key.is_initialized @ VaultError::VerificationKeyNotSet,
    )]
    pub verification_key: Account<'info, VerificationKeyAccount>,

    #[account(
        init_if_needed,
        payer = payer,
        space = Position::LEN,
        seeds = [Position::SEED_PREFIX, vault_config.key().as_ref(), nullifier_hash.as_ref()],
        bump
    )]
    pub position: Account<'info, Position>,

    /// CHECK: address pinned to the registered source; layout checked on read.
    #[account(address = vault_config.price_source @ VaultError::PriceUnavailable)]
    pub price_source: UncheckedAccount<'info>,

    #[account(
        mut,
        address = vault_config.stable_mint @ VaultError::Unauthorized,
    )]
    pub stable_mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = stable_mint,
    )]
    pub recipient_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<Borrow>,
    proof_data: Vec<u8>,
    merkle_root: [u8; 32],
    nullifier_hash: [u8; 32],
    amount: u64,
) -> Result<()> {
    let vault_config = &ctx.accounts.vault_config;

    // ========== VALIDATION CHECKS ==========

    vault_config.require_vk_configured()?;

    let proof = Groth16Proof::from_bytes(&proof_data)?;
    let verifier = Groth16Verifier::new(VerificationKey::from(&*ctx.accounts.verification_key));
    verify_membership(
        &ctx.accounts.merkle_tree,
        &verifier,
        &proof,
        &merkle_root,
        &nullifier_hash,
    )?;

    let feed = AccountPriceFeed::load(
        &ctx.accounts.price_source.to_account_info(),
        &vault_config.price_source,
    )?;
    let price = math::scale_price(feed.latest_price()?, vault_config.price_scale)?;
    let unit_scale =
        math::token_unit_scale(vault_config.price_scale, ctx.accounts.stable_mint.decimals)?;
    let working_amount = math::to_working_amount(amount, unit_scale)?;

    // ========== STATE UPDATES ==========

    let vault_key = vault_config.key();
    let unit_deposit = vault_config.unit_deposit;
    let ratio = vault_config.ratio;

    let position = &mut ctx.accounts.position;
    if !position.initialized {
        position.vault = vault_key;
        position.nullifier_hash = nullifier_hash;
        position.bump = ctx.bumps.position;
    }
    position.record_borrow(unit_deposit, price, ratio, working_amount)?;
    let debt = position.debt_amount;

    // ========== MINT ==========

    let stable_mint_key = ctx.accounts.vault_config.stable_mint;
    let vault_seeds = &[
        VaultConfig::SEED_PREFIX,
        stable_mint_key.as_ref(),
        &[ctx.accounts.vault_config.bump],
    ];
    let signer_seeds = &[&vault_seeds[..]];

    token::mint_to(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            MintTo {
                mint: ctx.accounts.stable_mint.to_account_info(),
                to: ctx.accounts.recipient_token_account.to_account_info(),
                authority: ctx.accounts.vault_config.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    ctx.accounts.vault_config.increment_borrows()?;

    emit!(BorrowEvent {
        recipient: ctx.accounts.recipient_token_account.owner,
        nullifier_hash,
        amount: working_amount,
    });

    msg!("Borrow successful");
    msg!("Amount: {}, outstanding debt: {}", amount, debt);

    Ok(())
}
