//! Host-agnostic vault controller
//!
//! Owns the commitment accumulator, the set of accepted commitments and the
//! position map, and drives the external collaborators it was built with.
//! The on-chain instructions run the same transitions against PDAs.
//!
//! # Ordering
//! Every mutating operation validates first, then commits internal state and
//! ledger changes, and only then performs the outward collateral transfer.
//! `withdraw` asks the treasury whether the transfer can go through before
//! it burns anything. A transfer that still fails restores the position and
//! re-mints the burned tokens. Every failure on that path is `TransferFailed`.
//!
//! Stable amounts are `u128` in working precision, collateral is `u64`.

use std::collections::{BTreeMap, BTreeSet};

use anchor_lang::prelude::*;

use crate::capabilities::{
    CallContext, CollateralTreasury, PriceOracle, ProofVerifier, StableLedger,
};
use crate::crypto::{is_zero_hash, Groth16Proof, ZkPublicInputs};
use crate::error::VaultError;
use crate::events::{BorrowEvent, DepositEvent, VaultEvent, WithdrawalEvent};
use crate::math;
use crate::state::{MerkleTree, Position, VaultParams};

/// Check that `root` is recent and that `proof` binds it to `nullifier_hash`.
pub fn verify_membership<V: ProofVerifier + ?Sized>(
    tree: &MerkleTree,
    verifier: &V,
    proof: &Groth16Proof,
    root: &[u8; 32],
    nullifier_hash: &[u8; 32],
) -> Result<()> {
    require!(tree.is_known_root(root), VaultError::UnknownRoot);
    require!(!is_zero_hash(nullifier_hash), VaultError::InvalidNullifier);

    let public_inputs = ZkPublicInputs::new(*root, *nullifier_hash);
    let valid = verifier.verify(proof, &public_inputs)?;
    require!(valid, VaultError::InvalidProof);

    Ok(())
}

pub struct VaultController<V, L, T> {
    vault: Pubkey,
    authority: Pubkey,
    unit_deposit: u64,
    ratio: u64,
    price_scale: u128,

    tree: MerkleTree,
    commitments: BTreeSet<[u8; 32]>,
    positions: BTreeMap<[u8; 32], Position>,

    verifier: V,
    price_source: Box<dyn PriceOracle>,
    ledger: L,
    treasury: T,

    events: Vec<VaultEvent>,
    entered: bool,
}

impl<V, L, T> VaultController<V, L, T>
where
    V: ProofVerifier,
    L: StableLedger,
    T: CollateralTreasury,
{
    /// Build an empty vault. `authority` is the only caller allowed to run
    /// the admin operations.
    pub fn new(
        vault: Pubkey,
        authority: Pubkey,
        params: VaultParams,
        verifier: V,
        price_source: Box<dyn PriceOracle>,
        ledger: L,
        treasury: T,
    ) -> Result<Self> {
        params.validate()?;
        let tree = MerkleTree::new(
            vault,
            params.tree_depth,
            params.root_history_size,
            params.hash_kind,
        )?;

        msg!(
            "Vault created: unit_deposit={} ratio={} depth={}",
            params.unit_deposit,
            params.ratio,
            params.tree_depth
        );

        Ok(Self {
            vault,
            authority,
            unit_deposit: params.unit_deposit,
            ratio: params.ratio,
            price_scale: params.price_scale,
            tree,
            commitments: BTreeSet::new(),
            positions: BTreeMap::new(),
            verifier,
            price_source,
            ledger,
            treasury,
            events: Vec::new(),
            entered: false,
        })
    }

    // ========================================================================
    // DEPOSIT
    // ========================================================================

    /// Accept exactly `unit_deposit` of collateral against a fresh commitment.
    ///
    /// Returns the leaf index the commitment was inserted at.
    pub fn deposit(&mut self, ctx: &CallContext, commitment: [u8; 32]) -> Result<u32> {
        require!(
            !self.commitments.contains(&commitment),
            VaultError::DuplicateCommitment
        );
        require!(
            ctx.attached_value == self.unit_deposit,
            VaultError::WrongDepositValue
        );
        require!(!is_zero_hash(&commitment), VaultError::InvalidCommitment);

        let leaf_index = self.tree.insert_leaf(commitment)?;
        self.commitments.insert(commitment);

        self.events.push(VaultEvent::Deposit(DepositEvent {
            commitment,
            leaf_index,
            timestamp: ctx.timestamp,
        }));

        msg!("Deposit accepted");
        msg!("Leaf index: {}", leaf_index);
        msg!("Commitment: {:?}", &commitment[..8]);

        Ok(leaf_index)
    }

    // ========================================================================
    // BORROW
    // ========================================================================

    /// Mint `amount` stable tokens to `recipient` against the position named
    /// by `nullifier_hash`.
    pub fn borrow(
        &mut self,
        ctx: &CallContext,
        proof: &Groth16Proof,
        root: [u8; 32],
        nullifier_hash: [u8; 32],
        recipient: Pubkey,
        amount: u128,
    ) -> Result<()> {
        self.enter()?;
        let result = self.borrow_guarded(ctx, proof, root, nullifier_hash, recipient, amount);
        self.entered = false;
        result
    }

    fn borrow_guarded(
        &mut self,
        _ctx: &CallContext,
        proof: &Groth16Proof,
        root: [u8; 32],
        nullifier_hash: [u8; 32],
        recipient: Pubkey,
        amount: u128,
    ) -> Result<()> {
        verify_membership(&self.tree, &self.verifier, proof, &root, &nullifier_hash)?;

        let price = self.price()?;
        let previous = self.positions.get(&nullifier_hash).cloned();
        let mut position = previous
            .clone()
            .unwrap_or_else(|| Position::uninitialized(self.vault, nullifier_hash));
        position.record_borrow(self.unit_deposit, price, self.ratio, amount)?;

        // ========== EFFECTS ==========
        self.positions.insert(nullifier_hash, position);

        // ========== INTERACTIONS ==========
        if let Err(err) = self.ledger.mint(&recipient, amount) {
            self.restore_position(nullifier_hash, previous);
            return Err(err);
        }

        self.events.push(VaultEvent::Borrow(BorrowEvent {
            recipient,
            nullifier_hash,
            amount,
        }));

        msg!("Borrow successful");
        msg!("Amount: {}", amount);

        Ok(())
    }

    // ========================================================================
    // WITHDRAW
    // ========================================================================

    /// Burn `repayment` stable tokens from the caller and release the
    /// matching collateral to `recipient`.
    ///
    /// Returns the collateral released.
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        proof: &Groth16Proof,
        root: [u8; 32],
        nullifier_hash: [u8; 32],
        recipient: Pubkey,
        repayment: u128,
    ) -> Result<u64> {
        self.enter()?;
        let result = self.withdraw_guarded(ctx, proof, root, nullifier_hash, recipient, repayment);
        self.entered = false;
        result
    }

    fn withdraw_guarded(
        &mut self,
        ctx: &CallContext,
        proof: &Groth16Proof,
        root: [u8; 32],
        nullifier_hash: [u8; 32],
        recipient: Pubkey,
        repayment: u128,
    ) -> Result<u64> {
        // ========== CHECKS ==========
        verify_membership(&self.tree, &self.verifier, proof, &root, &nullifier_hash)?;

        let previous = self.positions.get(&nullifier_hash).cloned();
        let mut position = previous
            .clone()
            .unwrap_or_else(|| Position::uninitialized(self.vault, nullifier_hash));

        require!(repayment > 0, VaultError::InvalidAmount);
        require!(
            repayment <= position.current_debt(),
            VaultError::RepaymentExceedsDebt
        );
        require!(
            self.ledger.balance_of(&ctx.caller)? >= repayment,
            VaultError::InsufficientBalance
        );

        let price = self.price()?;
        let released = position.record_repayment(price, self.ratio, repayment)?;

        if let Err(err) = self.treasury.check_transfer(&recipient, released) {
            msg!("Collateral transfer would fail: {:?}", err);
            return err!(VaultError::TransferFailed);
        }

        // ========== EFFECTS ==========
        self.positions.insert(nullifier_hash, position);
        if let Err(err) = self.ledger.burn(&ctx.caller, repayment) {
            self.restore_position(nullifier_hash, previous);
            return Err(err);
        }

        // ========== INTERACTIONS ==========
        if let Err(err) = self.treasury.transfer(&recipient, released) {
            msg!("Collateral transfer failed: {:?}", err);
            self.restore_position(nullifier_hash, previous);
            if let Err(mint_err) = self.ledger.mint(&ctx.caller, repayment) {
                msg!("Repayment re-mint failed: {:?}", mint_err);
            }
            return err!(VaultError::TransferFailed);
        }

        self.events.push(VaultEvent::Withdrawal(WithdrawalEvent {
            recipient,
            nullifier_hash,
            collateral_released: released,
            repayment_amount: repayment,
        }));

        msg!("Withdrawal successful");
        msg!("Repaid: {}, released: {}", repayment, released);

        Ok(released)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Remaining borrow ceiling for `nullifier_hash` at the current price.
    pub fn max_borrow(&self, nullifier_hash: &[u8; 32]) -> Result<u128> {
        let price = self.price()?;
        let debt = self
            .positions
            .get(nullifier_hash)
            .map(Position::current_debt)
            .unwrap_or(0);
        math::max_borrow(self.unit_deposit, price, debt, self.ratio)
    }

    pub fn estimate_collateral(&self, repayment: u128) -> Result<u128> {
        math::estimate_collateral(repayment, self.price()?)
    }

    pub fn estimate_tokens(&self, deposit_amount: u64) -> Result<u128> {
        math::estimate_tokens(deposit_amount, self.price()?)
    }

    /// Oracle price rescaled to working precision.
    pub fn price(&self) -> Result<u128> {
        let raw = self.price_source.latest_price()?;
        math::scale_price(raw, self.price_scale)
    }

    pub fn position(&self, nullifier_hash: &[u8; 32]) -> Option<&Position> {
        self.positions.get(nullifier_hash)
    }

    pub fn is_spent_commitment(&self, commitment: &[u8; 32]) -> bool {
        self.commitments.contains(commitment)
    }

    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    pub fn authority(&self) -> Pubkey {
        self.authority
    }

    pub fn ratio(&self) -> u64 {
        self.ratio
    }

    pub fn unit_deposit(&self) -> u64 {
        self.unit_deposit
    }

    // ========================================================================
    // ADMIN
    // ========================================================================

    pub fn set_price_source(
        &mut self,
        ctx: &CallContext,
        price_source: Box<dyn PriceOracle>,
    ) -> Result<()> {
        self.require_authority(ctx)?;
        self.price_source = price_source;
        msg!("Price source updated");
        Ok(())
    }

    pub fn set_ratio(&mut self, ctx: &CallContext, ratio: u64) -> Result<()> {
        self.require_authority(ctx)?;
        math::check_ratio(ratio)?;

        msg!("Ratio updated: {} -> {}", self.ratio, ratio);
        self.ratio = ratio;
        Ok(())
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    fn require_authority(&self, ctx: &CallContext) -> Result<()> {
        require_keys_eq!(ctx.caller, self.authority, VaultError::Unauthorized);
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        require!(!self.entered, VaultError::ReentrantCall);
        self.entered = true;
        Ok(())
    }

    fn restore_position(&mut self, nullifier_hash: [u8; 32], previous: Option<Position>) {
        match previous {
            Some(position) => {
                self.positions.insert(nullifier_hash, position);
            }
            None => {
                self.positions.remove(&nullifier_hash);
            }
        }
    }
}
