//! BN254 curve helpers for Groth16 verification
//!
//! Point encodings follow the alt_bn128 precompiles: big-endian, uncompressed.
//! - G1: `x || y` (64 bytes)
//! - G2: `x_c1 || x_c0 || y_c1 || y_c0` (128 bytes)
//!
//! Group operations go through `solana_program::alt_bn128`, which uses the
//! syscalls on-chain and an arkworks backend off-chain.

use anchor_lang::prelude::*;
use num_bigint::BigUint;
use num_traits::Zero;
use solana_program::alt_bn128::{
    prelude::{alt_bn128_addition, alt_bn128_multiplication, alt_bn128_pairing},
    AltBn128Error,
};

use crate::error::VaultError;

/// BN254 base field modulus (p), big-endian.
pub const BN254_FIELD_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29,
    0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x97, 0x81, 0x6a, 0x91, 0x68, 0x71, 0xca, 0x8d,
    0x3c, 0x20, 0x8c, 0x16, 0xd8, 0x7c, 0xfd, 0x47,
];

/// BN254 scalar field modulus (r), big-endian.
pub const BN254_SCALAR_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29,
    0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91,
    0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

/// G1 point in uncompressed form (64 bytes: x || y, big-endian).
pub type G1Point = [u8; 64];

/// G2 point in uncompressed form (128 bytes).
pub type G2Point = [u8; 128];

/// Scalar field element (32 bytes, big-endian).
pub type ScalarField = [u8; 32];

/// Input element for pairing operation (G1 || G2 = 192 bytes).
pub type PairingElement = [u8; 192];

pub const G1_IDENTITY: G1Point = [0u8; 64];
pub const G2_IDENTITY: G2Point = [0u8; 128];

pub fn is_g1_identity(point: &G1Point) -> bool {
    point.iter().all(|&b| b == 0)
}

pub fn is_g2_identity(point: &G2Point) -> bool {
    point.iter().all(|&b| b == 0)
}

/// Validate that a G1 point is on the curve `y² = x³ + 3 (mod p)`.
///
/// The identity is accepted.
pub fn validate_g1_point(point: &G1Point) -> Result<()> {
    if is_g1_identity(point) {
        return Ok(());
    }

    let x = BigUint::from_bytes_be(&point[0..32]);
    let y = BigUint::from_bytes_be(&point[32..64]);
    let p = BigUint::from_bytes_be(&BN254_FIELD_MODULUS);

    require!(x < p, VaultError::InvalidProof);
    require!(y < p, VaultError::InvalidProof);

    let y_squared = (&y * &y) % &p;
    let rhs = (&x * &x * &x + BigUint::from(3u32)) % &p;
    require!(y_squared == rhs, VaultError::InvalidProof);

    Ok(())
}

/// Range-check the four Fp coordinates of a G2 point.
///
/// Full subgroup membership is left to the pairing precompile.
pub fn validate_g2_point(point: &G2Point) -> Result<()> {
    if is_g2_identity(point) {
        return Ok(());
    }

    let p = BigUint::from_bytes_be(&BN254_FIELD_MODULUS);
    for chunk in point.chunks_exact(32) {
        require!(BigUint::from_bytes_be(chunk) < p, VaultError::InvalidProof);
    }

    Ok(())
}

/// Negate a G1 point: `-(x, y) = (x, p - y)`.
pub fn negate_g1(point: &G1Point) -> Result<G1Point> {
    if is_g1_identity(point) {
        return Ok(*point);
    }

    let y = BigUint::from_bytes_be(&point[32..64]);
    let p = BigUint::from_bytes_be(&BN254_FIELD_MODULUS);
    require!(y < p, VaultError::InvalidProof);

    let neg_y = if y.is_zero() { BigUint::zero() } else { &p - &y };

    let mut result = [0u8; 64];
    result[0..32].copy_from_slice(&point[0..32]);
    let neg_y_bytes = neg_y.to_bytes_be();
    result[64 - neg_y_bytes.len()..64].copy_from_slice(&neg_y_bytes);

    Ok(result)
}

/// `a + b` in G1.
pub fn g1_add(a: &G1Point, b: &G1Point) -> Result<G1Point> {
    let mut input = [0u8; 128];
    input[0..64].copy_from_slice(a);
    input[64..128].copy_from_slice(b);

    let result = alt_bn128_addition(&input).map_err(map_bn128_error)?;
    to_g1(&result)
}

/// `scalar · point` in G1.
pub fn g1_scalar_mul(point: &G1Point, scalar: &ScalarField) -> Result<G1Point> {
    let mut input = [0u8; 96];
    input[0..64].copy_from_slice(point);
    input[64..96].copy_from_slice(scalar);

    let result = alt_bn128_multiplication(&input).map_err(map_bn128_error)?;
    to_g1(&result)
}

/// Check `∏ e(G1[i], G2[i]) = 1`.
pub fn verify_pairing(elements: &[PairingElement]) -> Result<bool> {
    let mut input = Vec::with_capacity(elements.len() * 192);
    for element in elements {
        input.extend_from_slice(element);
    }

    let result = alt_bn128_pairing(&input).map_err(map_bn128_error)?;
    Ok(result.len() == 32 && result[31] == 1 && result[..31].iter().all(|&b| b == 0))
}

pub fn make_pairing_element(g1: &G1Point, g2: &G2Point) -> PairingElement {
    let mut element = [0u8; 192];
    element[0..64].copy_from_slice(g1);
    element[64..192].copy_from_slice(g2);
    element
}

/// `vk_x = IC[0] + Σ public_inputs[i] · IC[i+1]`.
pub fn compute_vk_x(ic: &[G1Point], public_inputs: &[ScalarField]) -> Result<G1Point> {
    require!(
        ic.len() == public_inputs.len() + 1,
        VaultError::InvalidPublicInputs
    );

    let mut acc = ic[0];
    for (input, point) in public_inputs.iter().zip(&ic[1..]) {
        let term = g1_scalar_mul(point, input)?;
        acc = g1_add(&acc, &term)?;
    }

    Ok(acc)
}

/// Whether `scalar < r`.
pub fn is_valid_scalar(scalar: &ScalarField) -> bool {
    BigUint::from_bytes_be(scalar) < BigUint::from_bytes_be(&BN254_SCALAR_MODULUS)
}

fn to_g1(bytes: &[u8]) -> Result<G1Point> {
    require!(bytes.len() == 64, VaultError::InvalidProof);
    let mut point = [0u8; 64];
    point.copy_from_slice(bytes);
    Ok(point)
}

fn map_bn128_error(e: AltBn128Error) -> anchor_lang::error::Error {
    msg!("BN254 operation failed: {:?}", e);
    error!(VaultError::InvalidProof)
}
