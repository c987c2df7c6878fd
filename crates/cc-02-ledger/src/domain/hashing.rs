//! HashChain primitives.
//!
//! Every digest is SHA-256 rendered as lowercase hex. Inputs are concatenated
//! as text with integers in decimal, so hashes can be recomputed from the
//! JSON form of a block.

use sha2::{Digest, Sha256};
use shared_types::{MempoolEntry, TransactionKind, UnixNanos};

/// Stand-in for a missing previous id, and the Merkle root of an empty batch.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Merkle root recorded on the genesis block.
pub const GENESIS_MERKLE_ROOT: &str = "genesis";

/// Required suffix of a sealed block id.
pub const POW_SUFFIX: &str = "00";

/// Compute SHA-256 of `data` as hex.
#[inline]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `sha256(previous_id ‖ timestamp ‖ merkle_root ‖ nonce)`.
pub fn hash_block(
    previous_id: Option<&str>,
    timestamp: UnixNanos,
    merkle_root: &str,
    nonce: u64,
) -> String {
    let prev = previous_id.unwrap_or(ZERO_HASH);
    sha256_hex(format!("{prev}{timestamp}{merkle_root}{nonce}").as_bytes())
}

/// `sha256(kind ‖ entity_id ‖ block_id ‖ timestamp)`.
///
/// The ledger passes the wall clock at persistence time, bumped by one
/// nanosecond when it has not advanced since the previous entry of the same
/// batch. Two seals of the same entry therefore never share a hash.
pub fn hash_transaction(
    kind: TransactionKind,
    entity_id: &str,
    block_id: &str,
    timestamp: UnixNanos,
) -> String {
    sha256_hex(format!("{}{entity_id}{block_id}{timestamp}", kind.as_str()).as_bytes())
}

/// Leaf digest of one mempool entry.
pub fn leaf_hash(entry: &MempoolEntry) -> String {
    sha256_hex(format!("{}{}{}", entry.kind.as_str(), entry.entity_id, entry.enqueued_at).as_bytes())
}

/// Parent digest of two hex children.
pub(crate) fn node_hash(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// Merkle root over a batch, duplicating the last node of odd levels.
///
/// Returns [`ZERO_HASH`] for an empty batch.
pub fn merkle_root(entries: &[MempoolEntry]) -> String {
    let mut level: Vec<String> = entries.iter().map(leaf_hash).collect();
    if level.is_empty() {
        return ZERO_HASH.to_string();
    }
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.swap_remove(0)
}

pub(crate) fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(left, right),
            [single] => node_hash(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// True when `hash` satisfies the fixed proof-of-work predicate.
#[inline]
pub fn meets_target(hash: &str) -> bool {
    hash.ends_with(POW_SUFFIX)
}

/// Smallest nonce whose block hash ends in `"00"`.
///
/// Linear and unbounded; about 256 attempts are expected. This is a
/// placeholder work function with no security value.
pub fn find_nonce(previous_id: &str, timestamp: UnixNanos, merkle_root: &str) -> u64 {
    (0u64..)
        .find(|nonce| meets_target(&hash_block(Some(previous_id), timestamp, merkle_root, *nonce)))
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(kind: TransactionKind, id: &str, at: u64) -> MempoolEntry {
        MempoolEntry::new(kind, id, at)
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_block_missing_previous_uses_zero_sentinel() {
        let with_none = hash_block(None, 42, "root", 7);
        let with_zero = hash_block(Some(ZERO_HASH), 42, "root", 7);
        assert_eq!(with_none, with_zero);
        assert_eq!(with_none.len(), 64);
    }

    #[test]
    fn test_hash_block_is_plain_concatenation() {
        let expected = sha256_hex(format!("{ZERO_HASH}42root7").as_bytes());
        assert_eq!(hash_block(None, 42, "root", 7), expected);
    }

    #[test]
    fn test_hash_transaction_depends_on_timestamp() {
        let a = hash_transaction(TransactionKind::DirectMessage, "m1", "b1", 1);
        let b = hash_transaction(TransactionKind::DirectMessage, "m1", "b1", 2);
        assert_ne!(a, b);
        assert_eq!(a, sha256_hex(b"messagem1b11"));
    }

    #[test]
    fn test_merkle_root_empty_batch() {
        assert_eq!(merkle_root(&[]), ZERO_HASH);
    }

    #[test]
    fn test_merkle_root_single_entry_is_leaf() {
        let e = entry(TransactionKind::ChannelMessage, "c1", 5);
        assert_eq!(merkle_root(std::slice::from_ref(&e)), leaf_hash(&e));
        assert_eq!(leaf_hash(&e), sha256_hex(b"channel_messagec15"));
    }

    #[test]
    fn test_merkle_root_odd_level_duplicates_last() {
        let a = entry(TransactionKind::DirectMessage, "a", 1);
        let b = entry(TransactionKind::DirectMessage, "b", 2);
        let c = entry(TransactionKind::DirectMessage, "c", 3);

        let ab = node_hash(&leaf_hash(&a), &leaf_hash(&b));
        let cc = node_hash(&leaf_hash(&c), &leaf_hash(&c));
        let expected = node_hash(&ab, &cc);

        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_merkle_root_depends_on_order() {
        let a = entry(TransactionKind::DirectMessage, "a", 1);
        let b = entry(TransactionKind::DirectMessage, "b", 2);
        assert_ne!(
            merkle_root(&[a.clone(), b.clone()]),
            merkle_root(&[b, a])
        );
    }

    #[test]
    fn test_find_nonce_meets_target() {
        let nonce = find_nonce("prev", 1_700_000_000_000_000_000, "root");
        let hash = hash_block(Some("prev"), 1_700_000_000_000_000_000, "root", nonce);
        assert!(hash.ends_with("00"));
    }

    #[test]
    fn test_find_nonce_returns_first_valid() {
        let nonce = find_nonce("prev", 99, "root");
        for smaller in 0..nonce {
            assert!(!meets_target(&hash_block(Some("prev"), 99, "root", smaller)));
        }
    }

    #[test]
    fn test_find_nonce_deterministic() {
        assert_eq!(find_nonce("p", 1, "r"), find_nonce("p", 1, "r"));
    }

    fn any_kind() -> impl Strategy<Value = TransactionKind> {
        (0usize..TransactionKind::ALL.len()).prop_map(|i| TransactionKind::ALL[i])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_merkle_root_deterministic(
            batch in proptest::collection::vec((any_kind(), "[a-z0-9]{1,8}", any::<u64>()), 1..12)
        ) {
            let entries: Vec<_> = batch.iter().map(|(k, id, at)| entry(*k, id, *at)).collect();
            let copy = entries.clone();
            prop_assert_eq!(merkle_root(&entries), merkle_root(&copy));
        }

        #[test]
        fn prop_merkle_root_sensitive_to_any_field(
            batch in proptest::collection::vec((any_kind(), "[a-z0-9]{1,8}", 0u64..u64::MAX), 1..12),
            pick in any::<prop::sample::Index>(),
            field in 0u8..3,
        ) {
            let entries: Vec<_> = batch.iter().map(|(k, id, at)| entry(*k, id, *at)).collect();
            let mut changed = entries.clone();
            let target = &mut changed[pick.index(entries.len())];
            match field {
                0 => {
                    target.kind = if target.kind == TransactionKind::DirectMessage {
                        TransactionKind::GroupJoin
                    } else {
                        TransactionKind::DirectMessage
                    };
                }
                1 => target.entity_id.push('x'),
                _ => target.enqueued_at += 1,
            }
            prop_assert_ne!(merkle_root(&entries), merkle_root(&changed));
        }

        #[test]
        fn prop_find_nonce_always_satisfies_predicate(ts in any::<u64>(), root in "[a-f0-9]{8}") {
            let nonce = find_nonce("head", ts, &root);
            prop_assert!(meets_target(&hash_block(Some("head"), ts, &root, nonce)));
        }
    }
}
