//! Groth16 Zero-Knowledge Proof Verifier
//!
//! ## Verification Equation
//! ```text
//! e(-A, B) · e(α, β) · e(vk_x, γ) · e(C, δ) = 1
//! vk_x = IC[0] + Σ(public_input[i] · IC[i+1])
//! ```
//!
//! Uses Solana's alt_bn128 precompiles for group operations and pairing.

use anchor_lang::prelude::*;

use crate::capabilities::ProofVerifier;
use crate::error::VaultError;
use crate::state::verification_key::VerificationKey;

use super::curve_utils::{
    compute_vk_x, is_g1_identity, is_g2_identity, make_pairing_element, negate_g1,
    validate_g1_point, validate_g2_point, verify_pairing, G1Point, G2Point, PairingElement,
};
use super::public_inputs::ZkPublicInputs;

/// Expected proof data length in bytes.
/// A = 64 bytes (G1 uncompressed)
/// B = 128 bytes (G2 uncompressed)
/// C = 64 bytes (G1 uncompressed)
pub const PROOF_DATA_LEN: usize = 256;

/// Groth16 proof `(A, B, C)` with `A, C ∈ G1` and `B ∈ G2`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

impl Groth16Proof {
    pub fn new(a: G1Point, b: G2Point, c: G1Point) -> Self {
        Self { a, b, c }
    }

    /// Parse proof from raw bytes.
    ///
    /// # Layout
    /// ```text
    /// [0..64]    - A (G1 point)
    /// [64..192]  - B (G2 point)
    /// [192..256] - C (G1 point)
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        require!(
            data.len() == PROOF_DATA_LEN,
            VaultError::InvalidProofFormat
        );

        let mut proof = Groth16Proof {
            a: [0u8; 64],
            b: [0u8; 128],
            c: [0u8; 64],
        };

        proof.a.copy_from_slice(&data[0..64]);
        proof.b.copy_from_slice(&data[64..192]);
        proof.c.copy_from_slice(&data[192..256]);

        Ok(proof)
    }

    pub fn to_bytes(&self) -> [u8; PROOF_DATA_LEN] {
        let mut bytes = [0u8; PROOF_DATA_LEN];
        bytes[0..64].copy_from_slice(&self.a);
        bytes[64..192].copy_from_slice(&self.b);
        bytes[192..256].copy_from_slice(&self.c);
        bytes
    }
}

/// Verify a Groth16 proof against a verification key.
///
/// Returns `Ok(false)` when the pairing check fails and `Err` when the
/// proof, key or inputs are malformed.
pub fn verify_groth16_proof(
    proof: &Groth16Proof,
    vk: &VerificationKey,
    public_inputs: &ZkPublicInputs,
) -> Result<bool> {
    validate_proof_points(proof)?;
    validate_verification_key(vk)?;
    public_inputs.validate()?;

    let encoded_inputs = public_inputs.to_field_elements();
    let vk_x = compute_vk_x(&vk.ic, &encoded_inputs)?;
    let neg_a = negate_g1(&proof.a)?;

    let pairing_elements: [PairingElement; 4] = [
        make_pairing_element(&neg_a, &proof.b),
        make_pairing_element(&vk.alpha_g1, &vk.beta_g2),
        make_pairing_element(&vk_x, &vk.gamma_g2),
        make_pairing_element(&proof.c, &vk.delta_g2),
    ];

    let result = verify_pairing(&pairing_elements)?;
    if !result {
        msg!("Groth16 pairing check failed");
    }

    Ok(result)
}

fn validate_proof_points(proof: &Groth16Proof) -> Result<()> {
    require!(!is_g1_identity(&proof.a), VaultError::InvalidProof);
    validate_g1_point(&proof.a)?;

    require!(!is_g2_identity(&proof.b), VaultError::InvalidProof);
    validate_g2_point(&proof.b)?;

    require!(!is_g1_identity(&proof.c), VaultError::InvalidProof);
    validate_g1_point(&proof.c)?;

    Ok(())
}

fn validate_verification_key(vk: &VerificationKey) -> Result<()> {
    require!(
        vk.ic.len() == ZkPublicInputs::COUNT + 1,
        VaultError::VerificationKeyNotSet
    );
    require!(
        !is_g1_identity(&vk.alpha_g1),
        VaultError::VerificationKeyNotSet
    );

    validate_g1_point(&vk.alpha_g1)?;
    validate_g2_point(&vk.beta_g2)?;
    validate_g2_point(&vk.gamma_g2)?;
    validate_g2_point(&vk.delta_g2)?;
    for point in &vk.ic {
        validate_g1_point(point)?;
    }

    Ok(())
}

/// Groth16 verifier bound to one verification key.
#[derive(Clone, Debug)]
pub struct Groth16Verifier {
    vk: VerificationKey,
}

impl Groth16Verifier {
    pub fn new(vk: VerificationKey) -> Self {
        Self { vk }
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &Groth16Proof, public_inputs: &ZkPublicInputs) -> Result<bool> {
        verify_groth16_proof(proof, &self.vk, public_inputs)
    }
}
