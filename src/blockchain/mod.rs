// Blockchain module
//
// This module contains the core ledger implementation including:
// - Hashing and signing primitives
// - Wallet and address derivation
// - Transaction structure and canonical encoding
// - Block structure
// - Proof of work and the ledger itself

pub mod block;
pub mod chain;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Blockchain, BlockchainError, CancelToken};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use transaction::Transaction;
