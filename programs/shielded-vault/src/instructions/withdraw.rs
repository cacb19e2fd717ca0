//! Withdraw Instruction
//!
//! Repays part or all of a position's debt by burning stable tokens from
//! the caller, and releases `repayment / price * 100 / ratio` lamports of
//! collateral to the recipient.
//!
//! `repayment_amount` is in base units of the stable mint and is compared
//! against the position's debt in working precision.
//!
//! # Flow
//! 1. Verify membership of the root and nullifier hash
//! 2. Check debt, caller balance and the custody balance left for release
//! 3. Update the position, burn the repayment
//! 4. Transfer collateral out of the custody PDA

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};
use anchor_spl::token::{self, Burn, Mint, Token, TokenAccount};

use crate::capabilities::PriceOracle;
use crate::controller::verify_membership;
use crate::crypto::{Groth16Proof, Groth16Verifier};
use crate::error::VaultError;
use crate::events::WithdrawalEvent;
use crate::math;
use crate::oracle::AccountPriceFeed;
use crate::state::{
    verification_key::VerificationKey, MerkleTree, Position, VaultConfig, VerificationKeyAccount,
};

#[derive(Accounts)]
#[instruction(proof_data: Vec<u8>, merkle_root: [u8; 32], nullifier_hash: [u8; 32])]
pub struct Withdraw<'info> {
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

    /// Must already exist: a position is only opened by a borrow.
    #[account(
        mut,
        seeds = [Position::SEED_PREFIX, vault_config.key().as_ref(), nullifier_hash.as_ref()],
        bump = position.bump,
        constraint = position.vault == vault_config.key() @ VaultError::Unauthorized,
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

    /// Caller's stable balance the repayment is burned from.
    #[account(
        mut,
        token::mint = stable_mint,
        token::authority = caller,
    )]
    pub caller_token_account: Account<'info, TokenAccount>,

    #[account(
        mut,
        seeds = [b"collateral", vault_config.key().as_ref()],
        bump = vault_config.collateral_bump,
    )]
    pub collateral: SystemAccount<'info>,

    /// CHECK: receives lamports only.
    #[account(mut)]
    pub recipient: UncheckedAccount<'info>,

    pub caller: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<Withdraw>,
    proof_data: Vec<u8>,
    merkle_root: [u8; 32],
    nullifier_hash: [u8; 32],
    repayment_amount: u64,
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

    let unit_scale = math::token_unit_scale(
        vault_config.price_scale,
        ctx.accounts.stable_mint.decimals,
    )?;
    let working_repayment = math::to_working_amount(repayment_amount, unit_scale)?;

    require!(repayment_amount > 0, VaultError::InvalidAmount);
    require!(
        working_repayment <= ctx.accounts.position.current_debt(),
        VaultError::RepaymentExceedsDebt
    );
    require!(
        ctx.accounts.caller_token_account.amount >= repayment_amount,
        VaultError::InsufficientBalance
    );

    let feed = AccountPriceFeed::load(
        &ctx.accounts.price_source.to_account_info(),
        &vault_config.price_source,
    )?;
    let price = math::scale_price(feed.latest_price()?, vault_config.price_scale)?;
    let ratio = vault_config.ratio;

    let mut position = (*ctx.accounts.position).clone();
    let collateral_released = position.record_repayment(price, ratio, working_repayment)?;

    // The custody PDA keeps its rent-exempt reserve.
    let reserve = Rent::get()?.minimum_balance(0);
    let available = ctx.accounts.collateral.lamports().saturating_sub(reserve);
    require!(
        available >= collateral_released,
        VaultError::TransferFailed
    );

    // ========== STATE UPDATES ==========

    ctx.accounts.position.set_inner(position);

    token::burn(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Burn {
                mint: ctx.accounts.stable_mint.to_account_info(),
                from: ctx.accounts.caller_token_account.to_account_info(),
                authority: ctx.accounts.caller.to_account_info(),
            },
        ),
        repayment_amount,
    )?;

    ctx.accounts.vault_config.increment_withdrawals()?;

    // ========== COLLATERAL TRANSFER ==========

    if collateral_released > 0 {
        let vault_key = ctx.accounts.vault_config.key();
        let collateral_seeds = &[
            b"collateral".as_ref(),
            vault_key.as_ref(),
            &[ctx.accounts.vault_config.collateral_bump],
        ];
        let signer_seeds = &[&collateral_seeds[..]];

        system_program::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.system_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.collateral.to_account_info(),
                    to: ctx.accounts.recipient.to_account_info(),
                },
                signer_seeds,
            ),
            collateral_released,
        )
        .map_err(|err| {
            msg!("Collateral transfer failed: {:?}", err);
            error!(VaultError::TransferFailed)
        })?;
    }

    emit!(WithdrawalEvent {
        recipient: ctx.accounts.recipient.key(),
        nullifier_hash,
        collateral_released,
        repayment_amount: working_repayment,
    });

    msg!("Withdrawal successful");
    msg!(
        "Repaid: {}, released: {}",
        repayment_amount,
        collateral_released
    );

    Ok(())
}
