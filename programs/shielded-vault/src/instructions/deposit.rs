//! Deposit Instruction
//!
//! Locks exactly one unit of collateral (lamports) in the vault's custody
//! PDA and appends the caller's commitment to the Merkle tree.
//!
//! The commitment is computed off-chain; the secret and nullifier preimage
//! never touch the chain. Losing them makes the position unreachable.

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};

use crate::crypto::is_zero_hash;
use crate::error::VaultError;
use crate::events::DepositEvent;
use crate::state::{CommitmentRecord, MerkleTree, VaultConfig};

#[derive(Accounts)]
#[instruction(commitment: [u8; 32])]
pub struct Deposit<'info> {
    #[account(
        mut,
        seeds = [VaultConfig::SEED_PREFIX, vault_config.stable_mint.as_ref()],
        bump = vault_config.bump,
    )]
    pub vault_config: Account<'info, VaultConfig>,

    #[account(
        mut,
        seeds = [b"merkle_tree", vault_config.key().as_ref()],
        bump,
        constraint = merkle_tree.vault == vault_config.key() @ VaultError::Unauthorized,
    )]
    pub merkle_tree: Account<'info, MerkleTree>,

    /// Marker for this commitment; `used` is already set on a repeat.
    #[account(
        init_if_needed,
        payer = depositor,
        space = CommitmentRecord::LEN,
        seeds = [CommitmentRecord::SEED_PREFIX, vault_config.key().as_ref(), commitment.as_ref()],
        bump
    )]
    pub commitment_record: Account<'info, CommitmentRecord>,

    #[account(
        mut,
        seeds = [b"collateral", vault_config.key().as_ref()],
        bump = vault_config.collateral_bump,
    )]
    pub collateral: SystemAccount<'info>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// # Arguments
/// * `commitment` - Pre-computed commitment hash (32 bytes)
/// * `amount` - Collateral attached to the call; must equal `unit_deposit`
pub fn handler(ctx: Context<Deposit>, commitment: [u8; 32], amount: u64) -> Result<()> {
    let vault_key = ctx.accounts.vault_config.key();

    // ========== VALIDATION ==========

    require!(
        !ctx.accounts.commitment_record.used,
        VaultError::DuplicateCommitment
    );
    require!(
        amount == ctx.accounts.vault_config.unit_deposit,
        VaultError::WrongDepositValue
    );
    require!(!is_zero_hash(&commitment), VaultError::InvalidCommitment);

    // ========== COLLATERAL TRANSFER ==========

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            Transfer {
                from: ctx.accounts.depositor.to_account_info(),
                to: ctx.accounts.collateral.to_account_info(),
            },
        ),
        amount,
    )?;

    // ========== MERKLE TREE UPDATE ==========

    let leaf_index = ctx.accounts.merkle_tree.insert_leaf(commitment)?;

    ctx.accounts.commitment_record.claim(
        vault_key,
        commitment,
        leaf_index,
        ctx.bumps.commitment_record,
    )?;
    ctx.accounts.vault_config.increment_deposits()?;

    emit!(DepositEvent {
        commitment,
        leaf_index,
        timestamp: Clock::get()?.unix_timestamp,
    });

    msg!("Deposit successful");
    msg!("Leaf index: {}", leaf_index);
    msg!("Commitment: {:?}", &commitment[..8]); // Only log first 8 bytes for privacy

    Ok(())
}
