//! Price feed backed by an on-chain account
//!
//! # Layout
//! ```text
//! [0..8]   - header (discriminator, ignored)
//! [8..16]  - price, i64 little-endian, `math::PRICE_DECIMALS` decimals
//! ```

use anchor_lang::prelude::*;

use crate::capabilities::PriceOracle;
use crate::error::VaultError;

/// Snapshot of the registered price account taken at instruction start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountPriceFeed {
    price: i64,
}

impl AccountPriceFeed {
    pub const PRICE_OFFSET: usize = 8;
    pub const MIN_DATA_LEN: usize = Self::PRICE_OFFSET + 8;

    /// Read the feed from `account`, which must be the vault's registered
    /// price source.
    pub fn load(account: &AccountInfo, expected_source: &Pubkey) -> Result<Self> {
        require_keys_eq!(
            *account.key,
            *expected_source,
            VaultError::PriceUnavailable
        );
        let data = account.try_borrow_data()?;
        Self::from_data(&data)
    }

    pub fn from_data(data: &[u8]) -> Result<Self> {
        let bytes: [u8; 8] = data
            .get(Self::PRICE_OFFSET..Self::MIN_DATA_LEN)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(error!(VaultError::PriceUnavailable))?;

        Ok(Self {
            price: i64::from_le_bytes(bytes),
        })
    }
}

impl PriceOracle for AccountPriceFeed {
    fn latest_price(&self) -> Result<u64> {
        require!(self.price > 0, VaultError::InvalidPrice);
        u64::try_from(self.price).map_err(|_| error!(VaultError::InvalidPrice))
    }
}
