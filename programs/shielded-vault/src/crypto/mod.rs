//! Cryptographic primitives for the Shielded Vault
//!
//! Verification functions are fail-closed: malformed input is an error,
//! never an accepted proof.

pub mod curve_utils;
pub mod groth16_verifier;
pub mod hasher;
pub mod public_inputs;

pub use groth16_verifier::{verify_groth16_proof, Groth16Proof, Groth16Verifier};
pub use hasher::{is_zero_hash, HashKind};
pub use public_inputs::ZkPublicInputs;
