//! State account definitions for the Shielded Vault

pub mod commitment;
pub mod merkle_tree;
pub mod position;
pub mod vault_config;
pub mod verification_key;

pub use commitment::CommitmentRecord;
pub use merkle_tree::MerkleTree;
pub use position::Position;
pub use vault_config::{VaultConfig, VaultParams};
pub use verification_key::VerificationKeyAccount;
