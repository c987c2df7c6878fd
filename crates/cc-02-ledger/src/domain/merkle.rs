//! Merkle inclusion proofs over a sealed batch.
//!
//! ```text
//!              root
//!            /      \
//!        h(ab)      h(cc)       ← odd level: c is paired with itself
//!        /   \      /   \
//!       a     b    c    (c)
//! ```
//!
//! A proof lists, bottom-up, each sibling digest and which side it sits on.

use serde::{Deserialize, Serialize};
use shared_types::MempoolEntry;

use super::hashing::{leaf_hash, next_level, node_hash};

/// Position of a sibling relative to the running digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    pub side: SiblingSide,
}

/// Inclusion proof for one entry of a sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub leaf: String,
    pub steps: Vec<ProofStep>,
}

/// A proof tied to the block that sealed an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityProof {
    pub entity_id: String,
    pub block_id: String,
    pub merkle_root: String,
    pub proof: MerkleProof,
    /// False when the persisted transactions no longer reproduce the root,
    /// e.g. because an entry of that block was dropped during sealing.
    pub verified: bool,
}

/// Builds the proof for `entries[index]`, or `None` when out of range.
pub fn merkle_proof(entries: &[MempoolEntry], index: usize) -> Option<MerkleProof> {
    if index >= entries.len() {
        return None;
    }

    let mut level: Vec<String> = entries.iter().map(leaf_hash).collect();
    let leaf = level[index].clone();
    let mut position = index;
    let mut steps = Vec::new();

    while level.len() > 1 {
        let step = if position % 2 == 0 {
            // Last node of an odd level is its own sibling.
            let sibling = level.get(position + 1).unwrap_or(&level[position]);
            ProofStep {
                hash: sibling.clone(),
                side: SiblingSide::Right,
            }
        } else {
            ProofStep {
                hash: level[position - 1].clone(),
                side: SiblingSide::Left,
            }
        };
        steps.push(step);
        level = next_level(&level);
        position /= 2;
    }

    Some(MerkleProof {
        leaf_index: index,
        leaf,
        steps,
    })
}

/// Folds the proof and compares with `root`.
pub fn verify_merkle_proof(proof: &MerkleProof, root: &str) -> bool {
    let computed = proof
        .steps
        .iter()
        .fold(proof.leaf.clone(), |acc, step| match step.side {
            SiblingSide::Left => node_hash(&step.hash, &acc),
            SiblingSide::Right => node_hash(&acc, &step.hash),
        });
    computed == root
}
