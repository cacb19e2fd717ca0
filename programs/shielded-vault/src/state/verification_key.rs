//! Verification Key storage for Groth16 membership proofs
//!
//! The key is written once by the vault authority and read by every
//! borrow and withdraw. A compromised key lets anyone forge membership.

use anchor_lang::prelude::*;

use crate::crypto::ZkPublicInputs;
use crate::error::VaultError;

/// Groth16 Verification Key account.
///
/// PDA Seeds: `[b"verification_key", vault_config.key().as_ref()]`
///
/// # Point Encodings
/// - G1 points: 64 bytes (32 bytes x, 32 bytes y) - uncompressed
/// - G2 points: 128 bytes (64 bytes x, 64 bytes y) - uncompressed
#[account]
pub struct VerificationKeyAccount {
    /// Reference to parent vault
    pub vault: Pubkey,

    /// α ∈ G1
    pub vk_alpha_g1: [u8; 64],

    /// β ∈ G2
    pub vk_beta_g2: [u8; 128],

    /// γ ∈ G2 - Used for public input accumulation
    pub vk_gamma_g2: [u8; 128],

    /// δ ∈ G2
    pub vk_delta_g2: [u8; 128],

    /// Number of IC points (= number of public inputs + 1)
    pub vk_ic_len: u8,

    /// IC points ∈ G1: `IC[0] + root·IC[1] + nullifier_hash·IC[2]`
    pub vk_ic: Vec<[u8; 64]>,

    pub is_initialized: bool,

    /// PDA bump seed
    pub bump: u8,
}

impl VerificationKeyAccount {
    pub const SEED_PREFIX: &'static [u8] = b"verification_key";

    /// Membership circuit: `[root, nullifier_hash]` + 1 base point.
    pub const MEMBERSHIP_IC_POINTS: u8 = (ZkPublicInputs::COUNT + 1) as u8;

    /// Room reserved at init so the circuit can grow without realloc.
    pub const DEFAULT_MAX_IC_POINTS: u8 = 8;

    /// Calculate space for VK account.
    pub fn space(max_ic_points: u8) -> usize {
        8                                   // discriminator
            + 32                            // vault
            + 64                            // vk_alpha_g1
            + 128                           // vk_beta_g2
            + 128                           // vk_gamma_g2
            + 128                           // vk_delta_g2
            + 1                             // vk_ic_len
            + 4 + (64 * max_ic_points as usize) // vk_ic (vec)
            + 1                             // is_initialized
            + 1                             // bump
    }

    /// Initialize the VK account (empty, not yet configured)
    pub fn initialize(&mut self, vault: Pubkey, bump: u8) {
        self.vault = vault;
        self.vk_alpha_g1 = [0u8; 64];
        self.vk_beta_g2 = [0u8; 128];
        self.vk_gamma_g2 = [0u8; 128];
        self.vk_delta_g2 = [0u8; 128];
        self.vk_ic_len = 0;
        self.vk_ic = Vec::new();
        self.is_initialized = false;
        self.bump = bump;
    }

    /// Store the verification key. The IC vector must match the membership
    /// circuit exactly.
    pub fn set_vk(
        &mut self,
        alpha_g1: [u8; 64],
        beta_g2: [u8; 128],
        gamma_g2: [u8; 128],
        delta_g2: [u8; 128],
        ic: Vec<[u8; 64]>,
    ) -> Result<()> {
        require!(
            ic.len() == Self::MEMBERSHIP_IC_POINTS as usize,
            VaultError::InvalidPublicInputs
        );

        self.vk_alpha_g1 = alpha_g1;
        self.vk_beta_g2 = beta_g2;
        self.vk_gamma_g2 = gamma_g2;
        self.vk_delta_g2 = delta_g2;
        self.vk_ic_len = Self::MEMBERSHIP_IC_POINTS;
        self.vk_ic = ic;
        self.is_initialized = true;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.is_initialized && self.vk_ic_len == Self::MEMBERSHIP_IC_POINTS
    }
}

/// Groth16 VK in the form the verifier consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    pub alpha_g1: [u8; 64],
    pub beta_g2: [u8; 128],
    pub gamma_g2: [u8; 128],
    pub delta_g2: [u8; 128],
    pub ic: Vec<[u8; 64]>,
}

impl From<&VerificationKeyAccount> for VerificationKey {
    fn from(account: &VerificationKeyAccount) -> Self {
        VerificationKey {
            alpha_g1: account.vk_alpha_g1,
            beta_g2: account.vk_beta_g2,
            gamma_g2: account.vk_gamma_g2,
            delta_g2: account.vk_delta_g2,
            ic: account.vk_ic.clone(),
        }
    }
}
