//! Payload shapes exchanged with the collaborators fronting the ledger.
//!
//! The transport itself (HTTP or otherwise) lives outside this crate; only
//! the data contract is defined here.

use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::crypto::{self, CryptoError};
use crate::blockchain::{Address, Block, DigitalSignature, Wallet};

/// Errors that can occur while validating an inbound payload
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Wallet creation result handed across the process boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    /// The wallet's private key (hex encoded)
    pub private_key: String,

    /// The wallet's public key (hex encoded, both coordinates)
    pub public_key: String,

    /// The wallet's derived Base58 address
    pub blockchain_address: String,
}

impl From<&Wallet> for WalletResponse {
    fn from(wallet: &Wallet) -> Self {
        WalletResponse {
            private_key: wallet.private_key_hex(),
            public_key: wallet.public_key_hex(),
            blockchain_address: wallet.address().0.clone(),
        }
    }
}

/// Transaction submission request.
///
/// Every field is optional at the decoding layer so that a missing field
/// surfaces as a validation rejection instead of a deserialization error;
/// `value` arrives as a string and is parsed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender_blockchain_address: Option<String>,
    pub recipient_blockchain_address: Option<String>,
    pub sender_public_key: Option<String>,
    pub value: Option<String>,
    pub signature: Option<String>,
}

/// A fully decoded transfer, ready to hand to the ledger
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    pub sender: Address,
    pub recipient: Address,
    pub value: f64,
    pub sender_public_key: VerifyingKey,
    pub signature: DigitalSignature,
}

impl TransactionRequest {
    /// Checks that every field is present and decodes the key, signature,
    /// and amount.
    ///
    /// Rejections happen here, before the ledger is consulted.
    pub fn validate(&self) -> Result<SignedTransfer, WireError> {
        let sender = self
            .sender_blockchain_address
            .as_deref()
            .ok_or(WireError::MissingField("sender_blockchain_address"))?;
        let recipient = self
            .recipient_blockchain_address
            .as_deref()
            .ok_or(WireError::MissingField("recipient_blockchain_address"))?;
        let public_key = self
            .sender_public_key
            .as_deref()
            .ok_or(WireError::MissingField("sender_public_key"))?;
        let value = self
            .value
            .as_deref()
            .ok_or(WireError::MissingField("value"))?;
        let signature = self
            .signature
            .as_deref()
            .ok_or(WireError::MissingField("signature"))?;

        let value: f64 = value
            .parse()
            .map_err(|_| WireError::InvalidValue(value.to_string()))?;
        let sender_public_key = crypto::public_key_from_hex(public_key)?;
        let signature = DigitalSignature::from_hex(signature)?;

        Ok(SignedTransfer {
            sender: Address(sender.to_string()),
            recipient: Address(recipient.to_string()),
            value,
            sender_public_key,
            signature,
        })
    }
}

/// Chain snapshot response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain, oldest first
    pub chain: Vec<Block>,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        ChainResponse {
            length: chain.len(),
            chain,
        }
    }
}

/// Outcome of a write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// Acknowledgment shape for write operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
}

impl StatusResponse {
    pub fn success() -> Self {
        StatusResponse {
            status: Status::Success,
        }
    }

    pub fn fail() -> Self {
        StatusResponse {
            status: Status::Fail,
        }
    }
}
