//! Admin Instructions for the Shielded Vault

pub mod set_price_source;
pub mod set_ratio;

pub use set_price_source::*;
pub use set_ratio::*;
