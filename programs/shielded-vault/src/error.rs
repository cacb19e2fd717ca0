//! Unified error types for the Shielded Vault
//!
//! Error codes are stable across versions for client compatibility.
//! Every error aborts the operation that raised it; nothing is retried.

use anchor_lang::error::{Error, ERROR_CODE_OFFSET};
use anchor_lang::prelude::*;

#[error_code]
pub enum VaultError {
    // ========== Validation Errors ==========

    /// Commitment was already deposited
    #[msg("Commitment already exists in tree")]
    DuplicateCommitment, // 6000

    /// Attached value differs from the fixed unit deposit
    #[msg("Deposit value must equal the vault unit deposit")]
    WrongDepositValue, // 6001

    /// Commitment cannot be all zeros
    #[msg("Invalid commitment: cannot be all zeros")]
    InvalidCommitment, // 6002

    /// Leaf is not a canonical element of the hash field
    #[msg("Value is not a valid field element")]
    InvalidFieldElement, // 6003

    /// Nullifier identifier cannot be all zeros
    #[msg("Invalid nullifier: cannot be all zeros")]
    InvalidNullifier, // 6004

    /// Borrow and repayment amounts must be positive
    #[msg("Invalid amount: must be greater than zero")]
    InvalidAmount, // 6005

    // ========== Proof Errors ==========

    /// Root is neither current nor in the recent history
    #[msg("Merkle root not in recent history")]
    UnknownRoot, // 6006

    /// Proof verification failed
    #[msg("Invalid proof: verification failed")]
    InvalidProof, // 6007

    /// Proof data has incorrect length
    #[msg("Invalid proof format: expected 256 bytes (A: 64, B: 128, C: 64)")]
    InvalidProofFormat, // 6008

    /// Public inputs do not match the verification key
    #[msg("Invalid public inputs for proof verification")]
    InvalidPublicInputs, // 6009

    /// Verification key not set or malformed
    #[msg("Verification key not configured for this vault")]
    VerificationKeyNotSet, // 6010

    // ========== Accounting Errors ==========

    /// Borrow amount above the position's ceiling
    #[msg("Borrow amount exceeds maximum borrowable")]
    ExceedsMaxBorrow, // 6011

    /// Repayment larger than outstanding debt
    #[msg("Repayment exceeds outstanding debt")]
    RepaymentExceedsDebt, // 6012

    /// Caller cannot cover the repayment
    #[msg("Insufficient stable token balance")]
    InsufficientBalance, // 6013

    /// Released collateral larger than the position holds
    #[msg("Released collateral exceeds position collateral")]
    InsufficientCollateral, // 6014

    /// Price feed returned a non-positive price
    #[msg("Price feed returned an invalid price")]
    InvalidPrice, // 6015

    /// Price feed account could not be read
    #[msg("Price feed unavailable")]
    PriceUnavailable, // 6016

    // ========== Capacity Errors ==========

    /// Merkle tree has reached maximum capacity
    #[msg("Merkle tree is full")]
    MerkleTreeFull, // 6017

    // ========== Transfer Errors ==========

    /// Outward value transfer failed
    #[msg("Collateral transfer to recipient failed")]
    TransferFailed, // 6018

    /// Nested borrow/withdraw while a transfer is in flight
    #[msg("Re-entrant call rejected")]
    ReentrantCall, // 6019

    // ========== Configuration Errors ==========

    /// Collateralization ratio below 100 percent
    #[msg("Collateralization ratio must be at least 100 percent")]
    InvalidRatio, // 6020

    /// Unit deposit must be positive
    #[msg("Unit deposit must be greater than zero")]
    InvalidUnitDeposit, // 6021

    /// Invalid tree depth parameter
    #[msg("Tree depth must be between 1 and 31")]
    InvalidTreeDepth, // 6022

    /// Root history size too small
    #[msg("Root history size must be at least 1")]
    InvalidRootHistorySize, // 6023

    // ========== Authorization Errors ==========

    /// Operation not authorized for caller
    #[msg("Unauthorized: caller is not vault authority")]
    Unauthorized, // 6024

    // ========== Overflow / Computation Errors ==========

    /// Arithmetic overflow occurred
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow, // 6025

    // ========== Token Errors ==========

    /// Stable mint has more decimals than working precision can express
    #[msg("Stable mint decimals not supported")]
    InvalidTokenDecimals, // 6026
}

/// Coarse failure classes callers can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Proof,
    Accounting,
    Capacity,
    Transfer,
    Configuration,
    Authorization,
    Arithmetic,
}

impl VaultError {
    /// All variants in code order.
    pub const ALL: [VaultError; 27] = [
        VaultError::DuplicateCommitment,
        VaultError::WrongDepositValue,
        VaultError::InvalidCommitment,
        VaultError::InvalidFieldElement,
        VaultError::InvalidNullifier,
        VaultError::InvalidAmount,
        VaultError::UnknownRoot,
        VaultError::InvalidProof,
        VaultError::InvalidProofFormat,
        VaultError::InvalidPublicInputs,
        VaultError::VerificationKeyNotSet,
        VaultError::ExceedsMaxBorrow,
        VaultError::RepaymentExceedsDebt,
        VaultError::InsufficientBalance,
        VaultError::InsufficientCollateral,
        VaultError::InvalidPrice,
        VaultError::PriceUnavailable,
        VaultError::MerkleTreeFull,
        VaultError::TransferFailed,
        VaultError::ReentrantCall,
        VaultError::InvalidRatio,
        VaultError::InvalidUnitDeposit,
        VaultError::InvalidTreeDepth,
        VaultError::InvalidRootHistorySize,
        VaultError::Unauthorized,
        VaultError::ArithmeticOverflow,
        VaultError::InvalidTokenDecimals,
    ];

    pub fn category(&self) -> ErrorCategory {
        use VaultError::*;
        match self {
            DuplicateCommitment | WrongDepositValue | InvalidCommitment | InvalidFieldElement
            | InvalidNullifier | InvalidAmount => ErrorCategory::Validation,
            UnknownRoot | InvalidProof | InvalidProofFormat | InvalidPublicInputs
            | VerificationKeyNotSet => ErrorCategory::Proof,
            ExceedsMaxBorrow | RepaymentExceedsDebt | InsufficientBalance
            | InsufficientCollateral | InvalidPrice | PriceUnavailable => {
                ErrorCategory::Accounting
            }
            MerkleTreeFull => ErrorCategory::Capacity,
            TransferFailed | ReentrantCall => ErrorCategory::Transfer,
            InvalidRatio | InvalidUnitDeposit | InvalidTreeDepth | InvalidRootHistorySize
            | InvalidTokenDecimals => ErrorCategory::Configuration,
            Unauthorized => ErrorCategory::Authorization,
            ArithmeticOverflow => ErrorCategory::Arithmetic,
        }
    }

    /// Look up a variant by its on-chain error code.
    pub fn from_code(code: u32) -> Option<VaultError> {
        let index = code.checked_sub(ERROR_CODE_OFFSET)? as usize;
        VaultError::ALL.get(index).copied()
    }

    /// Recover the variant carried by an Anchor error, if it is one of ours.
    pub fn from_error(err: &Error) -> Option<VaultError> {
        match err {
            Error::AnchorError(anchor_err) => VaultError::from_code(anchor_err.error_code_number),
            Error::ProgramError(_) => None,
        }
    }
}

impl ErrorCategory {
    /// Classify an Anchor error raised by this program.
    pub fn of(err: &Error) -> Option<ErrorCategory> {
        VaultError::from_error(err).map(|e| e.category())
    }
}
