//! Domain layer for the ledger: pure hashing, Merkle proofs, chain rules and
//! seal reports.

pub mod chain;
pub mod hashing;
pub mod merkle;
pub mod seal;

pub use chain::{check_block, ChainHead, LinkViolation};
pub use hashing::{
    find_nonce, hash_block, hash_transaction, leaf_hash, meets_target, merkle_root, sha256_hex,
    GENESIS_MERKLE_ROOT, POW_SUFFIX, ZERO_HASH,
};
pub use merkle::{merkle_proof, verify_merkle_proof, EntityProof, MerkleProof, ProofStep, SiblingSide};
pub use seal::{supports_backfill, DroppedEntry, SealReport, SealedEntry};
