//! Incremental Merkle tree for commitment storage
//!
//! Append-only tree using the filled_subtrees pattern for O(depth) inserts.
//! A bounded circular buffer keeps the most recent roots so proofs built
//! against a slightly stale root still verify.

use anchor_lang::prelude::*;

use crate::crypto::hasher::{empty_leaf_hash, is_zero_hash, HashKind};
use crate::error::VaultError;

/// Maximum supported tree depth (2^31 leaves)
pub const MAX_TREE_DEPTH: u8 = 31;

/// Minimum supported tree depth
pub const MIN_TREE_DEPTH: u8 = 1;

/// Minimum root history size
pub const MIN_ROOT_HISTORY_SIZE: u16 = 1;

/// Root history size used when none is configured
pub const DEFAULT_ROOT_HISTORY_SIZE: u16 = 30;

/// Incremental Merkle tree state account.
///
/// PDA Seeds: `[b"merkle_tree", vault_config.key().as_ref()]`
#[account]
#[derive(Debug)]
pub struct MerkleTree {
    /// Owning vault
    pub vault: Pubkey,

    /// Tree depth (immutable after init)
    pub depth: u8,

    /// Node hash (immutable after init)
    pub hash_kind: HashKind,

    /// Next leaf index to be filled (also = total leaves inserted)
    pub next_leaf_index: u32,

    /// Current root hash
    pub current_root: [u8; 32],

    /// Recent roots (circular buffer)
    pub root_history: Vec<[u8; 32]>,

    /// Slot holding the current root in `root_history`
    pub root_history_index: u16,

    pub root_history_size: u16,

    /// Rightmost left-child hash at each level. Length = depth
    pub filled_subtrees: Vec<[u8; 32]>,

    /// zeros[0] = empty leaf, zeros[i] = hash(zeros[i-1], zeros[i-1]).
    /// Length = depth + 1
    pub zeros: Vec<[u8; 32]>,
}

impl MerkleTree {
    /// Account space for a tree of the given shape.
    pub fn space(depth: u8, root_history_size: u16) -> usize {
        let depth_usize = depth as usize;
        let history_usize = root_history_size as usize;

        8                                       // discriminator
            + 32                                // vault
            + 1                                 // depth
            + HashKind::LEN                     // hash_kind
            + 4                                 // next_leaf_index
            + 32                                // current_root
            + 4 + (32 * history_usize)          // root_history (vec)
            + 2                                 // root_history_index
            + 2                                 // root_history_size
            + 4 + (32 * depth_usize)            // filled_subtrees (vec)
            + 4 + (32 * (depth_usize + 1))      // zeros (vec)
    }

    /// Build an empty tree outside of an account.
    pub fn new(
        vault: Pubkey,
        depth: u8,
        root_history_size: u16,
        hash_kind: HashKind,
    ) -> Result<Self> {
        let mut tree = MerkleTree {
            vault,
            depth: 0,
            hash_kind,
            next_leaf_index: 0,
            current_root: [0u8; 32],
            root_history: Vec::new(),
            root_history_index: 0,
            root_history_size: 0,
            filled_subtrees: Vec::new(),
            zeros: Vec::new(),
        };
        tree.initialize(vault, depth, root_history_size, hash_kind)?;
        Ok(tree)
    }

    /// Initialize the tree with empty state.
    pub fn initialize(
        &mut self,
        vault: Pubkey,
        depth: u8,
        root_history_size: u16,
        hash_kind: HashKind,
    ) -> Result<()> {
        require!(
            (MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth),
            VaultError::InvalidTreeDepth
        );
        require!(
            root_history_size >= MIN_ROOT_HISTORY_SIZE,
            VaultError::InvalidRootHistorySize
        );

        self.vault = vault;
        self.depth = depth;
        self.hash_kind = hash_kind;
        self.next_leaf_index = 0;
        self.root_history_index = 0;
        self.root_history_size = root_history_size;

        self.zeros = Self::compute_zero_values(hash_kind, depth)?;
        self.filled_subtrees = self.zeros[..depth as usize].to_vec();

        self.current_root = self.zeros[depth as usize];
        self.root_history = vec![[0u8; 32]; root_history_size as usize];
        self.root_history[0] = self.current_root;

        Ok(())
    }

    /// Empty-subtree hash for every level, leaf level first.
    ///
    /// These must match the circuit's zero values exactly.
    pub fn compute_zero_values(hash_kind: HashKind, depth: u8) -> Result<Vec<[u8; 32]>> {
        let mut zeros = Vec::with_capacity(depth as usize + 1);
        zeros.push(empty_leaf_hash());

        for level in 1..=depth as usize {
            let prev = zeros[level - 1];
            zeros.push(hash_kind.hash_pair(&prev, &prev)?);
        }

        Ok(zeros)
    }

    /// Insert a leaf and return its index.
    ///
    /// # Errors
    /// * `MerkleTreeFull` if the tree already holds 2^depth leaves
    /// * `InvalidFieldElement` if the hash cannot absorb `leaf`
    pub fn insert_leaf(&mut self, leaf: [u8; 32]) -> Result<u32> {
        require!(!self.is_full(), VaultError::MerkleTreeFull);
        require!(
            self.hash_kind.accepts_leaf(&leaf),
            VaultError::InvalidFieldElement
        );

        let leaf_index = self.next_leaf_index;

        // Hash into a scratch copy so a failing hash leaves the tree untouched.
        let mut filled_subtrees = self.filled_subtrees.clone();
        let mut current_hash = leaf;
        let mut current_index = leaf_index;

        for level in 0..self.depth as usize {
            let is_right_child = (current_index & 1) == 1;
            current_index >>= 1;

            if is_right_child {
                current_hash = self
                    .hash_kind
                    .hash_pair(&filled_subtrees[level], &current_hash)?;
            } else {
                filled_subtrees[level] = current_hash;
                current_hash = self.hash_kind.hash_pair(&current_hash, &self.zeros[level])?;
            }
        }

        let next_leaf_index = self
            .next_leaf_index
            .checked_add(1)
            .ok_or(error!(VaultError::ArithmeticOverflow))?;

        self.filled_subtrees = filled_subtrees;
        self.current_root = current_hash;
        self.root_history_index = (self.root_history_index + 1) % self.root_history_size;
        self.root_history[self.root_history_index as usize] = current_hash;
        self.next_leaf_index = next_leaf_index;

        Ok(leaf_index)
    }

    /// Check if a root is the current root or in recent history.
    ///
    /// The zero value never matches, so unfilled history slots cannot be
    /// used as a forged root.
    pub fn is_known_root(&self, root: &[u8; 32]) -> bool {
        if is_zero_hash(root) {
            return false;
        }

        if *root == self.current_root {
            return true;
        }

        self.root_history.iter().any(|r| r == root)
    }

    pub fn get_current_root(&self) -> [u8; 32] {
        self.current_root
    }

    pub fn get_next_leaf_index(&self) -> u32 {
        self.next_leaf_index
    }

    /// Maximum number of leaves.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn is_full(&self) -> bool {
        u64::from(self.next_leaf_index) >= self.capacity()
    }

    /// Empty-subtree hash at `level`, if the level exists.
    pub fn zero_value(&self, level: u8) -> Option<[u8; 32]> {
        self.zeros.get(level as usize).copied()
    }
}
