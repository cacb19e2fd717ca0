//! Deposited commitment marker using per-commitment PDA pattern
//!
//! Each accepted commitment gets its own account so that a repeated
//! deposit of the same commitment can be detected with one lookup.

use anchor_lang::prelude::*;

use crate::error::VaultError;

/// PDA Seeds: `[b"commitment", vault_config.key().as_ref(), commitment.as_ref()]`
#[account]
pub struct CommitmentRecord {
    /// Reference to parent vault
    pub vault: Pubkey,

    pub commitment: [u8; 32],

    /// Set once the commitment has been inserted into the tree
    pub used: bool,

    /// Leaf position assigned on insertion
    pub leaf_index: u32,

    /// PDA bump seed
    pub bump: u8,
}

impl CommitmentRecord {
    pub const LEN: usize = 8 // discriminator
        + 32 // vault
        + 32 // commitment
        + 1  // used
        + 4  // leaf_index
        + 1; // bump

    pub const SEED_PREFIX: &'static [u8] = b"commitment";

    /// Claim this record for `commitment`; fails if it was claimed before.
    pub fn claim(
        &mut self,
        vault: Pubkey,
        commitment: [u8; 32],
        leaf_index: u32,
        bump: u8,
    ) -> Result<()> {
        require!(!self.used, VaultError::DuplicateCommitment);

        self.vault = vault;
        self.commitment = commitment;
        self.used = true;
        self.leaf_index = leaf_index;
        self.bump = bump;
        Ok(())
    }
}
