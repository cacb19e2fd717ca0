//! Public inputs for the membership circuit
//!
//! The borrow and withdraw circuits share one statement: "I know a
//! commitment under `root` whose nullifier hashes to `nullifier_hash`".
//!
//! # Public Inputs (2 total)
//! 1. merkle_root - Tree root for membership proof
//! 2. nullifier_hash - Identifies the position being operated on
//!
//! Both are 32-byte big-endian elements of the BN254 scalar field.

use anchor_lang::prelude::*;

use crate::crypto::curve_utils::{is_valid_scalar, ScalarField};
use crate::crypto::hasher::is_zero_hash;
use crate::error::VaultError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZkPublicInputs {
    pub merkle_root: [u8; 32],
    pub nullifier_hash: [u8; 32],
}

impl ZkPublicInputs {
    /// Number of public inputs for verification
    pub const COUNT: usize = 2;

    pub fn new(merkle_root: [u8; 32], nullifier_hash: [u8; 32]) -> Self {
        Self {
            merkle_root,
            nullifier_hash,
        }
    }

    /// Reject values the circuit could never have produced.
    pub fn validate(&self) -> Result<()> {
        require!(!is_zero_hash(&self.merkle_root), VaultError::UnknownRoot);
        require!(
            !is_zero_hash(&self.nullifier_hash),
            VaultError::InvalidNullifier
        );
        require!(
            is_valid_scalar(&self.merkle_root) && is_valid_scalar(&self.nullifier_hash),
            VaultError::InvalidPublicInputs
        );
        Ok(())
    }

    /// Field elements in circuit order: `[root, nullifier_hash]`.
    pub fn to_field_elements(&self) -> [ScalarField; Self::COUNT] {
        [self.merkle_root, self.nullifier_hash]
    }
}
