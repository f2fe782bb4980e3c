use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::crypto;
use super::transaction::Transaction;

/// Represents a block in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Creation instant in Unix nanoseconds
    pub timestamp: i64,

    /// Nonce that satisfied the proof-of-work predicate
    pub nonce: u64,

    /// Hash of the previous block
    #[serde(with = "hex::serde")]
    pub previous_hash: [u8; 32],

    /// Transactions included in this block
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Creates a new block stamped with the current time
    pub fn new(nonce: u64, previous_hash: [u8; 32], transactions: Vec<Transaction>) -> Self {
        Block {
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            nonce,
            previous_hash,
            transactions,
        }
    }

    /// Trial block used by the proof-of-work search.
    ///
    /// The timestamp is pinned to zero so the search depends only on the
    /// nonce, the linkage, and the transaction payload.
    pub(crate) fn trial(
        nonce: u64,
        previous_hash: [u8; 32],
        transactions: Vec<Transaction>,
    ) -> Self {
        Block {
            timestamp: 0,
            nonce,
            previous_hash,
            transactions,
        }
    }

    /// All-zero block whose hash seeds the genesis block's `previous_hash`.
    pub fn sentinel() -> Self {
        Block::trial(0, [0u8; 32], Vec::new())
    }

    /// Computes the block's hash on demand.
    ///
    /// The digest covers the canonical encoding of every stored field and
    /// never the hash itself, so bumping the nonce re-derives it.
    pub fn hash(&self) -> [u8; 32] {
        let data = serde_json::json!({
            "timestamp": self.timestamp,
            "nonce": self.nonce,
            "previous_hash": hex::encode(self.previous_hash),
            "transactions": self.transactions,
        });

        crypto::sha256(serde_json::to_string(&data).unwrap().as_bytes())
    }

    /// Hex encoding of the block's hash
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}
