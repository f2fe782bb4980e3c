use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

use super::crypto::{self, Address, DigitalSignature};

/// Sentinel sender address used for mining reward transactions.
pub const REWARD_SENDER: &str = "THE BLOCKCHAIN";

/// Represents an immutable value transfer between two addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address
    #[serde(rename = "sender_blockchain_address")]
    pub sender: Address,

    /// Recipient's address
    #[serde(rename = "recipient_blockchain_address")]
    pub recipient: Address,

    /// Amount being transferred
    pub value: f64,
}

impl Transaction {
    /// Creates a new transaction
    pub fn new(sender: Address, recipient: Address, value: f64) -> Self {
        Transaction {
            sender,
            recipient,
            value,
        }
    }

    /// Creates a mining reward transaction.
    ///
    /// Reward transactions carry the sentinel sender and are exempt from
    /// signature and balance checks.
    pub fn new_reward(recipient: Address, value: f64) -> Self {
        Transaction {
            sender: Address(REWARD_SENDER.to_string()),
            recipient,
            value,
        }
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender.0 == REWARD_SENDER
    }

    /// Canonical byte encoding used as the pre-image for hashing and
    /// signing.
    ///
    /// The encoding covers exactly the three logical fields; serde_json
    /// keeps map keys sorted, so identical field values always produce
    /// identical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let data = serde_json::json!({
            "sender_blockchain_address": self.sender.0,
            "recipient_blockchain_address": self.recipient.0,
            "value": self.value,
        });

        serde_json::to_vec(&data).unwrap()
    }

    /// Verifies a signature over this transaction against a public key.
    ///
    /// Fails closed: returns false rather than erroring on any mismatch.
    pub fn verify(&self, public_key: &VerifyingKey, signature: &DigitalSignature) -> bool {
        crypto::verify_signature(&self.to_bytes(), signature, public_key)
    }
}
