//! A minimal proof-of-work ledger: an append-only chain of blocks holding
//! signed value transfers, a pool of pending transactions, a brute-force
//! miner, and a P-256 wallet that derives a Base58 address and signs
//! transfers.
//!
//! The [`blockchain`] module is the core; [`wire`] carries the payload
//! shapes exchanged with whatever transport fronts the ledger.

pub mod blockchain;
pub mod wire;
