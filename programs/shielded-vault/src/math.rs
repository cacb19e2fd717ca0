//! Vault accounting arithmetic
//!
//! Stable amounts (borrows, repayments, debt) live in working precision as
//! `u128`: one unit is one lamport of collateral priced at 18 decimals.
//! Collateral amounts are lamports (`u64`). Every step is checked, and
//! integer division truncates toward zero, which always favors the vault.
//!
//! # Token Units
//! The on-chain mint holds whole token base units. A base unit of a mint
//! with `d` decimals is `price_scale * 10^(8 + 9 - d)` working units, see
//! [`token_unit_scale`].

use anchor_lang::prelude::*;

use crate::error::VaultError;

/// Decimals of the raw oracle price.
pub const PRICE_DECIMALS: u32 = 8;

/// Rescale applied to the raw oracle price (8 → 18 decimals).
pub const PRICE_SCALE: u128 = 10_000_000_000;

/// Decimals of the collateral unit (lamports per SOL).
pub const COLLATERAL_DECIMALS: u32 = 9;

/// Ratios are expressed in percent.
pub const RATIO_DENOMINATOR: u128 = 100;

/// Lowest accepted collateralization ratio. Below it repeated borrows could
/// add up past `unit_deposit * price * ratio / 100`.
pub const MIN_RATIO: u64 = 100;

pub fn check_ratio(ratio: u64) -> Result<()> {
    require!(ratio >= MIN_RATIO, VaultError::InvalidRatio);
    Ok(())
}

/// Convert a raw oracle price into working precision.
pub fn scale_price(raw_price: u64, price_scale: u128) -> Result<u128> {
    require!(raw_price > 0, VaultError::InvalidPrice);
    u128::from(raw_price)
        .checked_mul(price_scale)
        .ok_or(error!(VaultError::ArithmeticOverflow))
}

/// Working units per base unit of a stable mint with `mint_decimals`.
pub fn token_unit_scale(price_scale: u128, mint_decimals: u8) -> Result<u128> {
    let exponent = (PRICE_DECIMALS + COLLATERAL_DECIMALS)
        .checked_sub(u32::from(mint_decimals))
        .ok_or(error!(VaultError::InvalidTokenDecimals))?;

    10u128
        .checked_pow(exponent)
        .and_then(|factor| factor.checked_mul(price_scale))
        .ok_or(error!(VaultError::ArithmeticOverflow))
}

/// Token base units to working precision. Exact.
pub fn to_working_amount(token_amount: u64, unit_scale: u128) -> Result<u128> {
    u128::from(token_amount)
        .checked_mul(unit_scale)
        .ok_or(error!(VaultError::ArithmeticOverflow))
}

/// `(unit_deposit * price - current_debt) * ratio / 100`.
///
/// Once debt reaches the collateral value the ceiling is zero.
pub fn max_borrow(unit_deposit: u64, price: u128, current_debt: u128, ratio: u64) -> Result<u128> {
    let value = u128::from(unit_deposit)
        .checked_mul(price)
        .ok_or(error!(VaultError::ArithmeticOverflow))?;
    let headroom = value.saturating_sub(current_debt);

    Ok(headroom
        .checked_mul(u128::from(ratio))
        .ok_or(error!(VaultError::ArithmeticOverflow))?
        / RATIO_DENOMINATOR)
}

/// `repayment / price * 100 / ratio`, evaluated strictly left to right.
pub fn collateral_for_repayment(repayment: u128, price: u128, ratio: u64) -> Result<u64> {
    require!(price > 0, VaultError::InvalidPrice);
    require!(ratio > 0, VaultError::InvalidRatio);

    let released = (repayment / price)
        .checked_mul(RATIO_DENOMINATOR)
        .ok_or(error!(VaultError::ArithmeticOverflow))?
        / u128::from(ratio);
    u64::try_from(released).map_err(|_| error!(VaultError::InsufficientCollateral))
}

/// Collateral a repayment would buy back at `price`, ignoring the ratio.
pub fn estimate_collateral(repayment: u128, price: u128) -> Result<u128> {
    require!(price > 0, VaultError::InvalidPrice);
    Ok(repayment / price)
}

/// Stable-token value of `deposit_amount` collateral at `price`.
pub fn estimate_tokens(deposit_amount: u64, price: u128) -> Result<u128> {
    u128::from(deposit_amount)
        .checked_mul(price)
        .ok_or(error!(VaultError::ArithmeticOverflow))
}
