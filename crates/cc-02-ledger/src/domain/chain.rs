//! Chain head pointer and linkage rules.

use parking_lot::RwLock;
use shared_types::Block;

use super::hashing::{hash_block, meets_target};

/// Read/write-locked pointer to the latest persisted block.
///
/// `None` until the ledger is initialized.
#[derive(Debug, Default)]
pub struct ChainHead {
    inner: RwLock<Option<Block>>,
}

impl ChainHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Block> {
        self.inner.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Replaces the head. Only the sealing task and initialization call this.
    pub fn set(&self, block: Block) {
        *self.inner.write() = Some(block);
    }
}

/// A broken chain rule, reported by [`check_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkViolation {
    IdMismatch { height: u64 },
    BadNonce { height: u64 },
    WrongParent { height: u64 },
    HeightGap { expected: u64, found: u64 },
    GenesisHasParent,
}

impl std::fmt::Display for LinkViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdMismatch { height } => write!(f, "block {height}: id does not match content"),
            Self::BadNonce { height } => write!(f, "block {height}: nonce misses target"),
            Self::WrongParent { height } => write!(f, "block {height}: previous id mismatch"),
            Self::HeightGap { expected, found } => {
                write!(f, "height gap: expected {expected}, found {found}")
            }
            Self::GenesisHasParent => write!(f, "genesis block has a previous id"),
        }
    }
}

/// Checks `block` against its content hash and against `parent`.
///
/// `parent` is `None` for genesis, which is exempt from the nonce target.
pub fn check_block(block: &Block, parent: Option<&Block>) -> Result<(), LinkViolation> {
    let expected_id = hash_block(
        block.previous_id.as_deref(),
        block.timestamp,
        &block.merkle_root,
        block.nonce,
    );
    if expected_id != block.id {
        return Err(LinkViolation::IdMismatch {
            height: block.height,
        });
    }

    match parent {
        None => {
            if block.previous_id.is_some() {
                return Err(LinkViolation::GenesisHasParent);
            }
            if block.height != 0 {
                return Err(LinkViolation::HeightGap {
                    expected: 0,
                    found: block.height,
                });
            }
        }
        Some(parent) => {
            if block.height != parent.height + 1 {
                return Err(LinkViolation::HeightGap {
                    expected: parent.height + 1,
                    found: block.height,
                });
            }
            if block.previous_id.as_deref() != Some(parent.id.as_str()) {
                return Err(LinkViolation::WrongParent {
                    height: block.height,
                });
            }
            if !meets_target(&block.id) {
                return Err(LinkViolation::BadNonce {
                    height: block.height,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hashing::{find_nonce, GENESIS_MERKLE_ROOT};

    fn genesis() -> Block {
        Block {
            id: hash_block(None, 10, GENESIS_MERKLE_ROOT, 0),
            previous_id: None,
            timestamp: 10,
            merkle_root: GENESIS_MERKLE_ROOT.into(),
            nonce: 0,
            height: 0,
        }
    }

    fn child_of(parent: &Block, ts: u64) -> Block {
        let nonce = find_nonce(&parent.id, ts, "root");
        Block {
            id: hash_block(Some(parent.id.as_str()), ts, "root", nonce),
            previous_id: Some(parent.id.clone()),
            timestamp: ts,
            merkle_root: "root".into(),
            nonce,
            height: parent.height + 1,
        }
    }

    #[test]
    fn test_head_starts_empty() {
        let head = ChainHead::new();
        assert!(!head.is_set());
        head.set(genesis());
        assert_eq!(head.get().map(|b| b.height), Some(0));
    }

    #[test]
    fn test_valid_links() {
        let g = genesis();
        let c = child_of(&g, 20);
        assert_eq!(check_block(&g, None), Ok(()));
        assert_eq!(check_block(&c, Some(&g)), Ok(()));
    }

    #[test]
    fn test_tampered_content_detected() {
        let g = genesis();
        let mut c = child_of(&g, 20);
        c.merkle_root = "other".into();
        assert_eq!(
            check_block(&c, Some(&g)),
            Err(LinkViolation::IdMismatch { height: 1 })
        );
    }

    #[test]
    fn test_height_gap_detected() {
        let g = genesis();
        let c = child_of(&g, 20);
        let mut orphan = child_of(&c, 30);
        orphan.height = 5;
        assert_eq!(
            check_block(&orphan, Some(&c)),
            Err(LinkViolation::HeightGap {
                expected: 2,
                found: 5
            })
        );
    }

    #[test]
    fn test_wrong_parent_detected() {
        let g = genesis();
        let c1 = child_of(&g, 20);
        let c2 = child_of(&g, 21);
        let grandchild = child_of(&c1, 30);
        assert_eq!(
            check_block(&grandchild, Some(&c2)),
            Err(LinkViolation::WrongParent { height: 2 })
        );
    }
}
