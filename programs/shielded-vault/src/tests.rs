//! Test Suite for the Shielded Vault
//!
//! Drives the in-memory `VaultController` through its public operations
//! with fake collaborators.
//!
//! # Test Categories
//!
//! 1. **Deposit Tests**: uniqueness, fixed value, capacity
//! 2. **Borrow Tests**: root freshness, proof gate, debt ceiling
//! 3. **Withdraw Tests**: rounding, balances, atomic rollback
//! 4. **Admin Tests**: authority checks, ratio and price source updates
//! 5. **Property Tests**: randomized invariants with proptest

#[cfg(test)]
mod fakes {
    use std::collections::BTreeMap;

    use anchor_lang::prelude::*;

    use crate::capabilities::{
        CallContext, CollateralTreasury, PriceOracle, ProofVerifier, StableLedger,
    };
    use crate::controller::VaultController;
    use crate::crypto::{Groth16Proof, HashKind, ZkPublicInputs};
    use crate::error::VaultError;
    use crate::state::VaultParams;

    pub const UNIT: u64 = 1000;
    pub const RATIO: u64 = 150;
    pub const DEPTH: u8 = 4;
    pub const HISTORY: u16 = 4;
    pub const NOW: i64 = 1_700_000_000;

    /// One stable unit at the default price scale (18 decimals).
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    pub struct FakeVerifier {
        pub accept: bool,
    }

    impl ProofVerifier for FakeVerifier {
        fn verify(&self, _proof: &Groth16Proof, _inputs: &ZkPublicInputs) -> Result<bool> {
            Ok(self.accept)
        }
    }

    pub struct FixedPrice(pub u64);

    impl PriceOracle for FixedPrice {
        fn latest_price(&self) -> Result<u64> {
            Ok(self.0)
        }
    }

    pub struct BrokenPrice;

    impl PriceOracle for BrokenPrice {
        fn latest_price(&self) -> Result<u64> {
            err!(VaultError::PriceUnavailable)
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeLedger {
        pub balances: BTreeMap<Pubkey, u128>,
        pub total_supply: u128,
        pub mints: Vec<(Pubkey, u128)>,
        pub reject_mint: bool,
    }

    impl StableLedger for FakeLedger {
        fn mint(&mut self, account: &Pubkey, amount: u128) -> Result<()> {
            if self.reject_mint {
                return Err(ProgramError::Custom(1).into());
            }
            *self.balances.entry(*account).or_default() += amount;
            self.total_supply += amount;
            self.mints.push((*account, amount));
            Ok(())
        }

        fn burn(&mut self, account: &Pubkey, amount: u128) -> Result<()> {
            let balance = self.balances.entry(*account).or_default();
            *balance = balance
                .checked_sub(amount)
                .ok_or(error!(VaultError::InsufficientBalance))?;
            self.total_supply -= amount;
            Ok(())
        }

        fn balance_of(&self, account: &Pubkey) -> Result<u128> {
            Ok(self.balances.get(account).copied().unwrap_or(0))
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeTreasury {
        pub paid: BTreeMap<Pubkey, u64>,
        /// Refuse every transfer, up front
        pub reject: bool,
        /// Pass the up-front check, then fail the transfer itself
        pub fail_after_check: bool,
    }

    impl FakeTreasury {
        pub fn total_paid(&self) -> u64 {
            self.paid.values().sum()
        }
    }

    impl CollateralTreasury for FakeTreasury {
        fn check_transfer(&self, _recipient: &Pubkey, _amount: u64) -> Result<()> {
            if self.reject {
                return Err(ProgramError::Custom(7).into());
            }
            Ok(())
        }

        fn transfer(&mut self, recipient: &Pubkey, amount: u64) -> Result<()> {
            if self.reject || self.fail_after_check {
                return Err(ProgramError::Custom(7).into());
            }
            *self.paid.entry(*recipient).or_default() += amount;
            Ok(())
        }
    }

    pub type TestVault = VaultController<FakeVerifier, FakeLedger, FakeTreasury>;

    /// Price scale 1 so that prices read as plain integers.
    pub fn params() -> VaultParams {
        VaultParams::new(UNIT, RATIO, DEPTH)
            .with_root_history_size(HISTORY)
            .with_price_scale(1)
            .with_hash_kind(HashKind::Keccak)
    }

    pub fn vault_with(params: VaultParams, accept: bool, price: Box<dyn PriceOracle>) -> TestVault {
        VaultController::new(
            Pubkey::new_unique(),
            authority(),
            params,
            FakeVerifier { accept },
            price,
            FakeLedger::default(),
            FakeTreasury::default(),
        )
        .unwrap()
    }

    pub fn vault(price: u64) -> TestVault {
        vault_with(params(), true, Box::new(FixedPrice(price)))
    }

    pub fn authority() -> Pubkey {
        Pubkey::new_from_array([0xA0; 32])
    }

    pub fn ctx(caller: Pubkey) -> CallContext {
        CallContext::new(caller, NOW)
    }

    pub fn deposit_ctx() -> CallContext {
        ctx(Pubkey::new_unique()).with_value(UNIT)
    }

    pub fn commitment(tag: u64) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[24..].copy_from_slice(&tag.to_be_bytes());
        bytes
    }

    pub fn nullifier(tag: u8) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x02;
        bytes[31] = tag;
        bytes
    }

    pub fn proof() -> Groth16Proof {
        Groth16Proof::new([1u8; 64], [2u8; 128], [3u8; 64])
    }

    /// Deposit one commitment and return the root it produced.
    pub fn deposit_one(vault: &mut TestVault, tag: u64) -> [u8; 32] {
        vault.deposit(&deposit_ctx(), commitment(tag)).unwrap();
        vault.tree().get_current_root()
    }

    pub fn assert_vault_err<T: std::fmt::Debug>(result: Result<T>, expected: VaultError) {
        let err = result.expect_err("operation should fail");
        assert_eq!(
            VaultError::from_error(&err).map(u32::from),
            Some(u32::from(expected)),
            "unexpected error: {:?}",
            err
        );
    }
}

// ============================================================================
// DEPOSIT TESTS
// ============================================================================

#[cfg(test)]
mod deposit_tests {
    use anchor_lang::prelude::*;
    use rand::Rng;

    use super::fakes::*;
    use crate::crypto::HashKind;
    use crate::error::VaultError;
    use crate::events::VaultEvent;
    use crate::state::VaultParams;

    #[test]
    fn test_deposit_assigns_sequential_leaves() {
        let mut vault = vault(2);
        for tag in 0..3 {
            let leaf = vault.deposit(&deposit_ctx(), commitment(tag)).unwrap();
            assert_eq!(leaf, tag as u32);
        }
        assert_eq!(vault.tree().get_next_leaf_index(), 3);
        assert_eq!(vault.events().len(), 3);
    }

    #[test]
    fn test_deposit_emits_event_with_timestamp() {
        let mut vault = vault(2);
        vault.deposit(&deposit_ctx(), commitment(9)).unwrap();

        match &vault.events()[0] {
            VaultEvent::Deposit(event) => {
                assert_eq!(event.commitment, commitment(9));
                assert_eq!(event.leaf_index, 0);
                assert_eq!(event.timestamp, NOW);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_commitment_rejected() {
        let mut vault = vault(2);
        vault.deposit(&deposit_ctx(), commitment(1)).unwrap();
        let root = vault.tree().get_current_root();

        assert_vault_err(
            vault.deposit(&deposit_ctx(), commitment(1)),
            VaultError::DuplicateCommitment,
        );
        assert_eq!(vault.tree().get_current_root(), root);
        assert_eq!(vault.tree().get_next_leaf_index(), 1);
        assert_eq!(vault.events().len(), 1);
    }

    #[test]
    fn test_wrong_deposit_value_rejected() {
        let mut vault = vault(2);
        for value in [0, UNIT - 1, UNIT + 1] {
            let call = ctx(Pubkey::new_unique()).with_value(value);
            assert_vault_err(
                vault.deposit(&call, commitment(1)),
                VaultError::WrongDepositValue,
            );
        }
        assert!(!vault.is_spent_commitment(&commitment(1)));
        assert_eq!(vault.tree().get_next_leaf_index(), 0);
    }

    #[test]
    fn test_duplicate_checked_before_value() {
        let mut vault = vault(2);
        vault.deposit(&deposit_ctx(), commitment(1)).unwrap();
        let call = ctx(Pubkey::new_unique()).with_value(UNIT + 5);
        assert_vault_err(
            vault.deposit(&call, commitment(1)),
            VaultError::DuplicateCommitment,
        );
    }

    #[test]
    fn test_zero_commitment_rejected() {
        let mut vault = vault(2);
        assert_vault_err(
            vault.deposit(&deposit_ctx(), [0u8; 32]),
            VaultError::InvalidCommitment,
        );
    }

    #[test]
    fn test_full_tree_rejects_without_marking() {
        let mut vault = vault(2);
        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let mut leaf: [u8; 32] = rng.gen();
            leaf[0] |= 0x80;
            vault.deposit(&deposit_ctx(), leaf).unwrap();
        }
        assert!(vault.tree().is_full());

        assert_vault_err(
            vault.deposit(&deposit_ctx(), commitment(99)),
            VaultError::MerkleTreeFull,
        );
        assert!(!vault.is_spent_commitment(&commitment(99)));
    }

    #[test]
    fn test_poseidon_rejects_out_of_field_commitment() {
        let params = VaultParams::new(UNIT, RATIO, 3)
            .with_price_scale(1)
            .with_hash_kind(HashKind::Poseidon);
        let mut vault = vault_with(params, true, Box::new(FixedPrice(2)));

        assert_vault_err(
            vault.deposit(&deposit_ctx(), [0xFF; 32]),
            VaultError::InvalidFieldElement,
        );
        assert!(!vault.is_spent_commitment(&[0xFF; 32]));

        let mut leaf = [0u8; 32];
        leaf[31] = 42;
        assert_eq!(vault.deposit(&deposit_ctx(), leaf).unwrap(), 0);
    }
}

// ============================================================================
// BORROW TESTS
// ============================================================================

#[cfg(test)]
mod borrow_tests {
    use anchor_lang::prelude::*;

    use super::fakes::*;
    use crate::capabilities::StableLedger;
    use crate::controller::VaultController;
    use crate::crypto::Groth16Verifier;
    use crate::error::{ErrorCategory, VaultError};
    use crate::events::VaultEvent;
    use crate::math::PRICE_SCALE;
    use crate::state::verification_key::VerificationKey;

    #[test]
    fn test_first_borrow_opens_position() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 500)
            .unwrap();

        let position = vault.position(&nullifier(1)).unwrap();
        assert!(position.initialized);
        assert!(!position.fully_withdrawn);
        assert_eq!(position.collateral_amount, UNIT);
        assert_eq!(position.debt_amount, 500);
        assert_eq!(vault.ledger().balance_of(&recipient).unwrap(), 500);
        assert!(matches!(vault.events().last(), Some(VaultEvent::Borrow(e)) if e.amount == 500));
    }

    #[test]
    fn test_nullifier_is_reusable_position_key() {
        let mut vault = vault(1);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        // ceiling (1000 * 1 - 0) * 150 / 100 = 1500
        vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 600)
            .unwrap();
        // ceiling now (1000 - 600) * 150 / 100 = 600
        assert_eq!(vault.max_borrow(&nullifier(1)).unwrap(), 600);
        vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 600)
            .unwrap();

        assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, 1200);
        assert_eq!(vault.position(&nullifier(1)).unwrap().collateral_amount, UNIT);
    }

    #[test]
    fn test_borrow_above_ceiling_rejected() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_eq!(vault.max_borrow(&nullifier(1)).unwrap(), 3000);
        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 3001),
            VaultError::ExceedsMaxBorrow,
        );
        assert!(vault.position(&nullifier(1)).is_none());
        assert_eq!(vault.ledger().total_supply, 0);
    }

    #[test]
    fn test_borrow_with_unknown_root_rejected() {
        let mut vault = vault(2);
        deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), [0x33; 32], nullifier(1), recipient, 1),
            VaultError::UnknownRoot,
        );
        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), [0u8; 32], nullifier(1), recipient, 1),
            VaultError::UnknownRoot,
        );
    }

    #[test]
    fn test_evicted_root_rejected() {
        let mut vault = vault(2);
        let first = deposit_one(&mut vault, 0);
        let recipient = Pubkey::new_unique();

        for tag in 1..HISTORY as u64 {
            deposit_one(&mut vault, tag);
        }
        assert!(vault.tree().is_known_root(&first));

        deposit_one(&mut vault, HISTORY as u64);
        assert!(!vault.tree().is_known_root(&first));
        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), first, nullifier(1), recipient, 1),
            VaultError::UnknownRoot,
        );
    }

    #[test]
    fn test_rejected_proof() {
        let mut vault = vault_with(params(), false, Box::new(FixedPrice(2)));
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 1),
            VaultError::InvalidProof,
        );
        assert!(vault.position(&nullifier(1)).is_none());
    }

    #[test]
    fn test_malformed_proof_rejected_by_groth16_verifier() {
        let mut generator = [0u8; 64];
        generator[31] = 1;
        generator[63] = 2;
        let vk = VerificationKey {
            alpha_g1: generator,
            beta_g2: [0u8; 128],
            gamma_g2: [0u8; 128],
            delta_g2: [0u8; 128],
            ic: vec![generator; 3],
        };

        let mut vault = VaultController::new(
            Pubkey::new_unique(),
            authority(),
            params(),
            Groth16Verifier::new(vk),
            Box::new(FixedPrice(2)),
            FakeLedger::default(),
            FakeTreasury::default(),
        )
        .unwrap();
        vault.deposit(&deposit_ctx(), commitment(1)).unwrap();
        let root = vault.tree().get_current_root();
        let recipient = Pubkey::new_unique();

        let err = vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 1)
            .unwrap_err();
        assert!(matches!(ErrorCategory::of(&err), Some(ErrorCategory::Proof)));
        assert!(vault.position(&nullifier(1)).is_none());
    }

    #[test]
    fn test_zero_nullifier_rejected() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, [0u8; 32], recipient, 1),
            VaultError::InvalidNullifier,
        );
    }

    #[test]
    fn test_zero_borrow_rejected() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 0),
            VaultError::InvalidAmount,
        );
    }

    #[test]
    fn test_price_failure_aborts_borrow() {
        let mut vault = vault_with(params(), true, Box::new(BrokenPrice));
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 1),
            VaultError::PriceUnavailable,
        );
        assert_vault_err(vault.max_borrow(&nullifier(1)), VaultError::PriceUnavailable);
        assert!(vault.ledger().mints.is_empty());
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut vault = vault(0);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();

        assert_vault_err(
            vault.borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 1),
            VaultError::InvalidPrice,
        );
    }

    #[test]
    fn test_failed_mint_leaves_no_position() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let recipient = Pubkey::new_unique();
        vault.ledger_mut().reject_mint = true;

        assert!(vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 10)
            .is_err());
        assert!(vault.position(&nullifier(1)).is_none());

        vault.ledger_mut().reject_mint = false;
        vault
            .borrow(&ctx(recipient), &proof(), root, nullifier(1), recipient, 10)
            .unwrap();
        assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, 10);
    }

    #[test]
    fn test_default_price_scale() {
        let params = params().with_price_scale(PRICE_SCALE);
        let vault = vault_with(params, true, Box::new(FixedPrice(2)));

        assert_eq!(vault.price().unwrap(), 2 * PRICE_SCALE);
        // (1000 * 2e10 - 0) * 150 / 100
        assert_eq!(vault.max_borrow(&nullifier(1)).unwrap(), 30_000_000_000_000);
    }
}

// ============================================================================
// WITHDRAW TESTS
// ============================================================================

#[cfg(test)]
mod withdraw_tests {
    use anchor_lang::prelude::*;

    use super::fakes::*;
    use crate::capabilities::StableLedger;
    use crate::error::VaultError;
    use crate::events::VaultEvent;
    use crate::math::PRICE_SCALE;

    /// Deposit, then borrow `amount` to `holder` against `nullifier(1)`.
    fn opened(price: u64, amount: u128) -> (TestVault, [u8; 32], Pubkey) {
        let mut vault = vault(price);
        let root = deposit_one(&mut vault, 1);
        let holder = Pubkey::new_unique();
        vault
            .borrow(&ctx(holder), &proof(), root, nullifier(1), holder, amount)
            .unwrap();
        (vault, root, holder)
    }

    #[test]
    fn test_end_to_end_borrow_and_repay() {
        let mut vault = vault(2);
        let leaf = vault.deposit(&deposit_ctx(), commitment(1)).unwrap();
        assert_eq!(leaf, 0);
        let root = vault.tree().get_current_root();

        let holder = Pubkey::new_unique();
        vault
            .borrow(&ctx(holder), &proof(), root, nullifier(1), holder, 500)
            .unwrap();
        assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, 500);
        assert_eq!(vault.ledger().mints, vec![(holder, 500)]);

        let recipient = Pubkey::new_unique();
        let released = vault
            .withdraw(&ctx(holder), &proof(), root, nullifier(1), recipient, 500)
            .unwrap();

        // 500 / 2 * 100 / 150
        assert_eq!(released, 166);
        let position = vault.position(&nullifier(1)).unwrap();
        assert_eq!(position.debt_amount, 0);
        assert_eq!(position.collateral_amount, UNIT - 166);
        assert_eq!(vault.treasury().paid.get(&recipient), Some(&166));
        assert_eq!(vault.ledger().balance_of(&holder).unwrap(), 0);

        let kinds: Vec<&str> = vault
            .events()
            .iter()
            .map(|event| match event {
                VaultEvent::Deposit(_) => "deposit",
                VaultEvent::Borrow(_) => "borrow",
                VaultEvent::Withdrawal(_) => "withdrawal",
            })
            .collect();
        assert_eq!(kinds, vec!["deposit", "borrow", "withdrawal"]);

        match vault.events().last() {
            Some(VaultEvent::Withdrawal(event)) => {
                assert_eq!(event.recipient, recipient);
                assert_eq!(event.nullifier_hash, nullifier(1));
                assert_eq!(event.collateral_released, 166);
                assert_eq!(event.repayment_amount, 500);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_end_to_end_at_default_price_scale() {
        // 2.00000000 at 8 decimals
        let params = params().with_price_scale(PRICE_SCALE);
        let mut vault = vault_with(params, true, Box::new(FixedPrice(2_0000_0000)));
        let root = deposit_one(&mut vault, 1);
        let holder = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        assert_eq!(vault.price().unwrap(), 2 * WAD);
        assert_eq!(vault.max_borrow(&nullifier(1)).unwrap(), 3000 * WAD);

        vault
            .borrow(&ctx(holder), &proof(), root, nullifier(1), holder, 500 * WAD)
            .unwrap();
        let released = vault
            .withdraw(&ctx(holder), &proof(), root, nullifier(1), recipient, 500 * WAD)
            .unwrap();

        assert_eq!(released, 166);
        let position = vault.position(&nullifier(1)).unwrap();
        assert_eq!(position.debt_amount, 0);
        assert_eq!(position.collateral_amount, UNIT - 166);
        assert_eq!(vault.treasury().paid.get(&recipient), Some(&166));

        // Borrowing the whole ceiling and repaying it frees all collateral.
        vault
            .borrow(&ctx(holder), &proof(), root, nullifier(2), holder, 3000 * WAD)
            .unwrap();
        assert_vault_err(
            vault.borrow(&ctx(holder), &proof(), root, nullifier(2), holder, 1),
            VaultError::ExceedsMaxBorrow,
        );
        let released = vault
            .withdraw(&ctx(holder), &proof(), root, nullifier(2), recipient, 3000 * WAD)
            .unwrap();
        assert_eq!(released, UNIT);
        assert_eq!(vault.position(&nullifier(2)).unwrap().collateral_amount, 0);
        assert_eq!(vault.ledger().total_supply, 0);
    }

    #[test]
    fn test_rounding_divides_by_price_first() {
        let (mut vault, root, holder) = opened(10, 105);
        let released = vault
            .withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 105)
            .unwrap();
        assert_eq!(released, 6);
    }

    #[test]
    fn test_partial_repayments() {
        let (mut vault, root, holder) = opened(1, 900);
        let recipient = Pubkey::new_unique();

        // 300 / 1 * 100 / 150 = 200
        assert_eq!(
            vault
                .withdraw(&ctx(holder), &proof(), root, nullifier(1), recipient, 300)
                .unwrap(),
            200
        );
        assert_eq!(
            vault
                .withdraw(&ctx(holder), &proof(), root, nullifier(1), recipient, 600)
                .unwrap(),
            400
        );

        let position = vault.position(&nullifier(1)).unwrap();
        assert_eq!(position.debt_amount, 0);
        assert_eq!(position.collateral_amount, 400);
        assert_eq!(vault.treasury().total_paid(), 600);
    }

    #[test]
    fn test_repayment_above_debt_rejected() {
        let (mut vault, root, holder) = opened(2, 500);
        vault.ledger_mut().mint(&holder, 1).unwrap();

        assert_vault_err(
            vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 501),
            VaultError::RepaymentExceedsDebt,
        );
    }

    #[test]
    fn test_repayment_on_unknown_position_rejected() {
        let mut vault = vault(2);
        let root = deposit_one(&mut vault, 1);
        let caller = Pubkey::new_unique();

        assert_vault_err(
            vault.withdraw(&ctx(caller), &proof(), root, nullifier(1), caller, 1),
            VaultError::RepaymentExceedsDebt,
        );
        assert!(vault.position(&nullifier(1)).is_none());
    }

    #[test]
    fn test_caller_without_balance_rejected() {
        let (mut vault, root, _holder) = opened(2, 500);
        let stranger = Pubkey::new_unique();

        assert_vault_err(
            vault.withdraw(&ctx(stranger), &proof(), root, nullifier(1), stranger, 100),
            VaultError::InsufficientBalance,
        );
        assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, 500);
    }

    #[test]
    fn test_rejecting_recipient_rolls_back_everything() {
        let (mut vault, root, holder) = opened(2, 500);
        let before = vault.position(&nullifier(1)).cloned().unwrap();
        let events_before = vault.events().len();
        vault.treasury_mut().reject = true;

        assert_vault_err(
            vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 500),
            VaultError::TransferFailed,
        );

        assert_eq!(vault.position(&nullifier(1)), Some(&before));
        assert_eq!(vault.ledger().balance_of(&holder).unwrap(), 500);
        assert_eq!(vault.ledger().total_supply, 500);
        assert_eq!(vault.ledger().mints.len(), 1);
        assert_eq!(vault.treasury().total_paid(), 0);
        assert_eq!(vault.events().len(), events_before);

        // The guard is released after a failed call.
        vault.treasury_mut().reject = false;
        assert_eq!(
            vault
                .withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 500)
                .unwrap(),
            166
        );
    }

    #[test]
    fn test_refused_transfer_burns_nothing_even_if_mint_fails() {
        let (mut vault, root, holder) = opened(2, 500);
        let before = vault.position(&nullifier(1)).cloned().unwrap();
        vault.treasury_mut().reject = true;
        vault.ledger_mut().reject_mint = true;

        assert_vault_err(
            vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 500),
            VaultError::TransferFailed,
        );

        assert_eq!(vault.ledger().balance_of(&holder).unwrap(), 500);
        assert_eq!(vault.ledger().total_supply, 500);
        assert_eq!(vault.position(&nullifier(1)), Some(&before));
    }

    #[test]
    fn test_transfer_failing_after_check_is_compensated() {
        let (mut vault, root, holder) = opened(2, 500);
        let before = vault.position(&nullifier(1)).cloned().unwrap();
        vault.treasury_mut().fail_after_check = true;

        assert_vault_err(
            vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 500),
            VaultError::TransferFailed,
        );

        // Burned, then minted back.
        assert_eq!(vault.ledger().mints, vec![(holder, 500), (holder, 500)]);
        assert_eq!(vault.ledger().balance_of(&holder).unwrap(), 500);
        assert_eq!(vault.ledger().total_supply, 500);
        assert_eq!(vault.position(&nullifier(1)), Some(&before));
        assert_eq!(vault.treasury().total_paid(), 0);
    }

    #[test]
    fn test_release_above_collateral_rejected() {
        // ratio 1000%: ceiling (1000 - 0) * 1000 / 100 = 10_000
        let mut vault = vault(1);
        let root = deposit_one(&mut vault, 1);
        let authority = authority();
        vault.set_ratio(&ctx(authority), 1000).unwrap();

        let holder = Pubkey::new_unique();
        vault
            .borrow(&ctx(holder), &proof(), root, nullifier(1), holder, 5000)
            .unwrap();

        // Back to 150%: 5000 / 1 * 100 / 150 = 3333 > 1000 collateral
        vault.set_ratio(&ctx(authority), 150).unwrap();
        assert_vault_err(
            vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), holder, 5000),
            VaultError::InsufficientCollateral,
        );
        assert_eq!(vault.ledger().balance_of(&holder).unwrap(), 5000);
    }

    #[test]
    fn test_estimates() {
        let vault = vault(10);
        assert_eq!(vault.estimate_collateral(105).unwrap(), 10);
        assert_eq!(vault.estimate_tokens(UNIT).unwrap(), 10_000);
    }
}

// ============================================================================
// ADMIN TESTS
// ============================================================================

#[cfg(test)]
mod admin_tests {
    use anchor_lang::prelude::*;

    use super::fakes::*;
    use crate::error::VaultError;

    #[test]
    fn test_set_ratio_requires_authority() {
        let mut vault = vault(2);
        assert_vault_err(
            vault.set_ratio(&ctx(Pubkey::new_unique()), 200),
            VaultError::Unauthorized,
        );
        assert_eq!(vault.ratio(), RATIO);

        vault.set_ratio(&ctx(authority()), 200).unwrap();
        assert_eq!(vault.ratio(), 200);
        assert_eq!(vault.max_borrow(&nullifier(1)).unwrap(), 4000);
    }

    #[test]
    fn test_ratio_below_full_collateral_rejected() {
        let mut vault = vault(2);
        assert_vault_err(vault.set_ratio(&ctx(authority()), 0), VaultError::InvalidRatio);
        assert_vault_err(vault.set_ratio(&ctx(authority()), 99), VaultError::InvalidRatio);
        assert_eq!(vault.ratio(), RATIO);

        vault.set_ratio(&ctx(authority()), 100).unwrap();
        assert_eq!(vault.ratio(), 100);
    }

    #[test]
    fn test_set_price_source() {
        let mut vault = vault(2);
        assert_vault_err(
            vault.set_price_source(&ctx(Pubkey::new_unique()), Box::new(FixedPrice(5))),
            VaultError::Unauthorized,
        );
        assert_eq!(vault.price().unwrap(), 2);

        vault
            .set_price_source(&ctx(authority()), Box::new(FixedPrice(5)))
            .unwrap();
        assert_eq!(vault.price().unwrap(), 5);
        assert_eq!(vault.estimate_tokens(UNIT).unwrap(), 5000);
    }

    #[test]
    fn test_invalid_construction_params() {
        let result = crate::controller::VaultController::new(
            Pubkey::new_unique(),
            authority(),
            params().with_root_history_size(0),
            FakeVerifier { accept: true },
            Box::new(FixedPrice(1)),
            FakeLedger::default(),
            FakeTreasury::default(),
        );
        assert!(result.is_err());
        assert_eq!(vault(1).authority(), authority());
        assert_eq!(vault(1).unit_deposit(), UNIT);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS (using proptest)
// ============================================================================

#[cfg(test)]
mod property_tests {
    use anchor_lang::prelude::*;
    use proptest::prelude::*;

    use super::fakes::*;
    use crate::error::VaultError;
    use crate::math;

    proptest! {
        #[test]
        fn prop_commitment_accepted_once(tag in any::<u64>()) {
            let mut vault = vault(2);
            vault.deposit(&deposit_ctx(), commitment(tag)).unwrap();
            let second = vault.deposit(&deposit_ctx(), commitment(tag));
            prop_assert_eq!(
                second.err().as_ref().and_then(VaultError::from_error).map(u32::from),
                Some(u32::from(VaultError::DuplicateCommitment))
            );
            prop_assert_eq!(vault.tree().get_next_leaf_index(), 1);
        }

        #[test]
        fn prop_only_unit_deposit_accepted(value in any::<u64>(), tag in any::<u64>()) {
            prop_assume!(value != UNIT);
            let mut vault = vault(2);
            let root = vault.tree().get_current_root();
            let call = ctx(Pubkey::new_unique()).with_value(value);

            prop_assert!(vault.deposit(&call, commitment(tag)).is_err());
            prop_assert_eq!(vault.tree().get_current_root(), root);
            prop_assert!(!vault.is_spent_commitment(&commitment(tag)));
        }

        #[test]
        fn prop_latest_roots_stay_known(extra in 0u64..12) {
            let mut vault = vault(2);
            let mut roots = Vec::new();
            for tag in 0..=extra {
                roots.push(deposit_one(&mut vault, tag));
            }

            let window = HISTORY as usize;
            for (i, root) in roots.iter().enumerate() {
                let age = roots.len() - 1 - i;
                prop_assert_eq!(vault.tree().is_known_root(root), age < window);
            }
        }

        #[test]
        fn prop_borrow_respects_ceiling(
            price in 1u64..1_000,
            ratio in 100u64..400,
            amount in 1u128..5_000_000,
        ) {
            let mut vault = vault(price);
            vault.set_ratio(&ctx(authority()), ratio).unwrap();
            let root = deposit_one(&mut vault, 1);
            let holder = Pubkey::new_unique();

            let ceiling = vault.max_borrow(&nullifier(1)).unwrap();
            let result = vault.borrow(&ctx(holder), &proof(), root, nullifier(1), holder, amount);

            if amount <= ceiling {
                prop_assert!(result.is_ok());
                prop_assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, amount);
            } else {
                prop_assert_eq!(
                    result.err().as_ref().and_then(VaultError::from_error).map(u32::from),
                    Some(u32::from(VaultError::ExceedsMaxBorrow))
                );
                prop_assert!(vault.position(&nullifier(1)).is_none());
            }
        }

        #[test]
        fn prop_borrow_sequence_stays_under_cap(
            price in 1u64..50,
            ratio in 100u64..400,
            shares in prop::collection::vec(1u128..=100, 1..12),
        ) {
            let mut vault = vault(price);
            vault.set_ratio(&ctx(authority()), ratio).unwrap();
            let root = deposit_one(&mut vault, 1);
            let holder = Pubkey::new_unique();
            let cap = u128::from(UNIT) * u128::from(price) * u128::from(ratio) / 100;

            let mut accepted = 0u128;
            for share in shares {
                let ceiling = vault.max_borrow(&nullifier(1)).unwrap();
                let amount = (ceiling * share / 100).max(1);
                if vault.borrow(&ctx(holder), &proof(), root, nullifier(1), holder, amount).is_ok() {
                    accepted += amount;
                }
                prop_assert!(accepted <= cap);
            }
            if accepted > 0 {
                prop_assert_eq!(vault.position(&nullifier(1)).unwrap().debt_amount, accepted);
            }
            prop_assert_eq!(vault.ledger().total_supply, accepted);
        }

        #[test]
        fn prop_supply_and_collateral_conserved(
            price in 1u64..20,
            borrowed in 1u128..1_500,
            repay_share in 1u128..=100,
        ) {
            let mut vault = vault(price);
            let root = deposit_one(&mut vault, 1);
            let holder = Pubkey::new_unique();
            let recipient = Pubkey::new_unique();

            prop_assume!(borrowed <= vault.max_borrow(&nullifier(1)).unwrap());
            vault.borrow(&ctx(holder), &proof(), root, nullifier(1), holder, borrowed).unwrap();

            let repayment = (borrowed * repay_share / 100).max(1);
            let result = vault.withdraw(&ctx(holder), &proof(), root, nullifier(1), recipient, repayment);

            let position = vault.position(&nullifier(1)).unwrap();
            prop_assert_eq!(vault.ledger().total_supply, position.debt_amount);
            prop_assert_eq!(
                position.collateral_amount + vault.treasury().total_paid(),
                UNIT
            );
            if result.is_ok() {
                prop_assert_eq!(position.debt_amount, borrowed - repayment);
            } else {
                prop_assert_eq!(position.debt_amount, borrowed);
            }
        }

        #[test]
        fn prop_release_divides_left_to_right(
            repayment in any::<u64>(),
            price in 1u128..1_000_000,
            ratio in 1u64..1_000,
        ) {
            let expected = u128::from(repayment) / price * 100 / u128::from(ratio);
            prop_assert_eq!(
                u128::from(
                    math::collateral_for_repayment(u128::from(repayment), price, ratio).unwrap()
                ),
                expected
            );
        }
    }
}
