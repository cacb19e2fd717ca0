//! Node hashers for the commitment tree
//!
//! The accumulator hashes internal nodes with `hash(left, right)`. Which
//! primitive is used is fixed when the tree is created and stored alongside
//! it, so roots stay reproducible for the prover.
//!
//! ## Poseidon
//! BN254 scalar field, circom-compatible parameters (t = 3, RF = 8, RP = 57),
//! big-endian field encoding. Inputs must be canonical field elements.
//!
//! ## Keccak256
//! `Keccak256(left || right)` via the Solana syscall. No field constraint.

use anchor_lang::prelude::*;
use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonBytesHasher};
use solana_program::keccak;

use crate::crypto::curve_utils::is_valid_scalar;
use crate::error::VaultError;

/// Hash primitive used for internal tree nodes.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashKind {
    #[default]
    Poseidon,
    Keccak,
}

impl HashKind {
    /// Serialized size inside an account.
    pub const LEN: usize = 1;

    /// Hash two 32-byte children into their parent node.
    pub fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32]> {
        match self {
            HashKind::Poseidon => poseidon_hash_pair(left, right),
            HashKind::Keccak => Ok(keccak_hash_pair(left, right)),
        }
    }

    /// Whether `value` can be used as a leaf under this hash.
    pub fn accepts_leaf(&self, value: &[u8; 32]) -> bool {
        match self {
            HashKind::Poseidon => is_valid_scalar(value),
            HashKind::Keccak => true,
        }
    }
}

/// Poseidon(left, right) over BN254.
pub fn poseidon_hash_pair(left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32]> {
    require!(
        is_valid_scalar(left) && is_valid_scalar(right),
        VaultError::InvalidFieldElement
    );

    let mut hasher = Poseidon::<Fr>::new_circom(2).map_err(|e| {
        msg!("Poseidon setup failed: {:?}", e);
        error!(VaultError::InvalidFieldElement)
    })?;

    hasher
        .hash_bytes_be(&[left.as_ref(), right.as_ref()])
        .map_err(|e| {
            msg!("Poseidon hash failed: {:?}", e);
            error!(VaultError::InvalidFieldElement)
        })
}

/// Keccak256(left || right).
pub fn keccak_hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    keccak::hash(&combined).to_bytes()
}

/// Check if a 32-byte value is all zeros.
#[inline]
pub fn is_zero_hash(hash: &[u8; 32]) -> bool {
    hash.iter().all(|&b| b == 0)
}

/// Empty leaf value (all zeros).
#[inline]
pub fn empty_leaf_hash() -> [u8; 32] {
    [0u8; 32]
}
