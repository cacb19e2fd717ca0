//! Instruction handlers for the Shielded Vault

pub mod admin;
pub mod borrow;
pub mod deposit;
pub mod initialize_vault;
pub mod set_verification_key;
pub mod withdraw;

pub use admin::*;
pub use borrow::*;
pub use deposit::*;
pub use initialize_vault::*;
pub use set_verification_key::*;
pub use withdraw::*;
