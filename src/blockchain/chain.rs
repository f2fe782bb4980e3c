use log::{info, warn};
use p256::ecdsa::VerifyingKey;
use thiserror::Error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::block::Block;
use super::crypto::{Address, DigitalSignature};
use super::transaction::Transaction;

/// Number of leading zero hex characters a block hash must carry.
pub const MINING_DIFFICULTY: usize = 2;

/// Amount credited to the owner address per mined block.
pub const MINING_REWARD: f64 = 1.0;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Missing public key or signature for sender {0}")]
    MissingCredentials(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Mining cancelled")]
    MiningCancelled,
}

/// Cooperative cancellation flag for the proof-of-work search.
///
/// Clones share the flag; cancelling any clone stops a search holding
/// another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The proof-of-work ledger: an append-only chain plus a pool of pending
/// transactions.
///
/// Cloning yields another handle onto the same chain and pool; all
/// mutation is serialized through the internal locks, so a single instance
/// may be shared across concurrent callers.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks; committed blocks never mutate
    chain: Arc<Mutex<Vec<Block>>>,

    /// Validated transactions waiting to be mined
    transaction_pool: Arc<Mutex<Vec<Transaction>>>,

    /// Mining rewards are paid to this address
    owner_address: Address,

    /// Leading zero hex characters required of a block hash
    difficulty: usize,
}

impl Blockchain {
    /// Creates a new ledger whose chain starts at the genesis block.
    ///
    /// The genesis block has nonce 0, an empty transaction list, and links
    /// to the hash of the all-zero sentinel block.
    pub fn new(owner_address: Address) -> Self {
        let genesis = Block::new(0, Block::sentinel().hash(), Vec::new());

        Blockchain {
            chain: Arc::new(Mutex::new(vec![genesis])),
            transaction_pool: Arc::new(Mutex::new(Vec::new())),
            owner_address,
            difficulty: MINING_DIFFICULTY,
        }
    }

    /// Gets the address mining rewards are paid to
    pub fn owner_address(&self) -> &Address {
        &self.owner_address
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Block {
        let chain = self.chain.lock().unwrap();
        chain.last().cloned().unwrap_or_else(Block::sentinel)
    }

    /// Gets a snapshot of the entire chain
    pub fn chain(&self) -> Vec<Block> {
        self.chain.lock().unwrap().clone()
    }

    /// Gets a defensive copy of the pending transaction pool
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.transaction_pool.lock().unwrap().clone()
    }

    /// Validates a transfer and admits it to the pool.
    ///
    /// Mining reward transactions (sender equal to the reward sentinel) are
    /// admitted unconditionally. Every other transfer needs the sender's
    /// public key and a signature over the transaction's canonical
    /// encoding, and the sender's chain-replay balance must cover the
    /// amount. Rejections leave the pool untouched.
    pub fn add_transaction(
        &self,
        sender: &Address,
        recipient: &Address,
        value: f64,
        sender_public_key: Option<&VerifyingKey>,
        signature: Option<&DigitalSignature>,
    ) -> Result<(), BlockchainError> {
        let transaction = Transaction::new(sender.clone(), recipient.clone(), value);

        if transaction.is_reward() {
            self.transaction_pool.lock().unwrap().push(transaction);
            return Ok(());
        }

        if value < 0.0 {
            return Err(BlockchainError::InvalidAmount(value));
        }

        let (public_key, signature) = match (sender_public_key, signature) {
            (Some(public_key), Some(signature)) => (public_key, signature),
            _ => return Err(BlockchainError::MissingCredentials(sender.0.clone())),
        };

        if !transaction.verify(public_key, signature) {
            warn!("rejected transfer {} -> {}: invalid signature", sender, recipient);
            return Err(BlockchainError::InvalidSignature);
        }

        let available = self.balance_of(sender);
        if available < value {
            warn!(
                "rejected transfer {} -> {}: insufficient funds ({} < {})",
                sender, recipient, available, value
            );
            return Err(BlockchainError::InsufficientFunds {
                required: value,
                available,
            });
        }

        self.transaction_pool.lock().unwrap().push(transaction);
        Ok(())
    }

    /// Checks the proof-of-work predicate for one nonce.
    pub fn valid_proof(
        nonce: u64,
        previous_hash: [u8; 32],
        transactions: &[Transaction],
        difficulty: usize,
    ) -> bool {
        let guess = Block::trial(nonce, previous_hash, transactions.to_vec());
        guess.hash_hex().starts_with(&"0".repeat(difficulty))
    }

    /// Brute-force search for the lowest nonce satisfying the proof-of-work
    /// predicate.
    ///
    /// Deterministic given identical inputs: the search always starts at
    /// nonce 0 and stops at the first hit. The trial block is built once
    /// and only its nonce mutates between hash trials.
    pub fn proof_of_work(
        previous_hash: [u8; 32],
        transactions: &[Transaction],
        difficulty: usize,
        cancel: &CancelToken,
    ) -> Result<u64, BlockchainError> {
        let target = "0".repeat(difficulty);
        let mut guess = Block::trial(0, previous_hash, transactions.to_vec());

        loop {
            if cancel.is_cancelled() {
                return Err(BlockchainError::MiningCancelled);
            }
            if guess.hash_hex().starts_with(&target) {
                return Ok(guess.nonce);
            }
            guess.nonce += 1;
        }
    }

    /// Mines the pending transactions into a new block.
    pub fn mine(&self) -> Result<Block, BlockchainError> {
        self.mine_cancellable(&CancelToken::new())
    }

    /// Mines the pending transactions into a new block, honoring a
    /// cancellation token.
    ///
    /// The pool is drained atomically before the search starts; transfers
    /// submitted while the search runs accumulate in the fresh pool and
    /// ride in the next block. No lock is held during the search itself.
    /// On cancellation the drained transfers return to the front of the
    /// pool.
    pub fn mine_cancellable(&self, cancel: &CancelToken) -> Result<Block, BlockchainError> {
        let mut transactions = std::mem::take(&mut *self.transaction_pool.lock().unwrap());
        transactions.push(Transaction::new_reward(
            self.owner_address.clone(),
            MINING_REWARD,
        ));
        let previous_hash = self.last_block().hash();

        match Self::proof_of_work(previous_hash, &transactions, self.difficulty, cancel) {
            Ok(nonce) => {
                let block = Block::new(nonce, previous_hash, transactions);
                self.chain.lock().unwrap().push(block.clone());
                info!(
                    "action=mining status=success nonce={} transactions={}",
                    nonce,
                    block.transactions.len()
                );
                Ok(block)
            }
            Err(err) => {
                // The reward never re-enters the pool
                transactions.pop();
                let mut pool = self.transaction_pool.lock().unwrap();
                transactions.append(&mut pool);
                *pool = transactions;
                Err(err)
            }
        }
    }

    /// Computes an address's balance by replaying every mined transaction.
    ///
    /// Pending pool transactions are excluded until mined.
    pub fn balance_of(&self, address: &Address) -> f64 {
        let chain = self.chain.lock().unwrap();
        let mut total = 0.0;

        for block in chain.iter() {
            for transaction in &block.transactions {
                if *address == transaction.recipient {
                    total += transaction.value;
                }
                if *address == transaction.sender {
                    total -= transaction.value;
                }
            }
        }

        total
    }

    /// Walks the chain confirming its integrity.
    ///
    /// The genesis block must match the sentinel linkage (nonce 0, empty
    /// transaction list, previous hash equal to the sentinel block's hash)
    /// and every later block's `previous_hash` must equal its
    /// predecessor's recomputed hash.
    pub fn validate(&self) -> bool {
        let chain = self.chain.lock().unwrap();

        let genesis = match chain.first() {
            Some(block) => block,
            None => return false,
        };
        if genesis.nonce != 0
            || !genesis.transactions.is_empty()
            || genesis.previous_hash != Block::sentinel().hash()
        {
            return false;
        }

        chain
            .windows(2)
            .all(|pair| pair[1].previous_hash == pair[0].hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;
    use crate::blockchain::transaction::REWARD_SENDER;

    fn signed_transfer(
        blockchain: &Blockchain,
        sender: &Wallet,
        recipient: &Address,
        value: f64,
    ) -> Result<(), BlockchainError> {
        let transaction =
            Transaction::new(sender.address().clone(), recipient.clone(), value);
        let signature = sender.sign(&transaction.to_bytes());

        blockchain.add_transaction(
            sender.address(),
            recipient,
            value,
            Some(sender.public_key()),
            Some(&signature),
        )
    }

    #[test]
    fn test_genesis_block() {
        let miner = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let chain = blockchain.chain();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].nonce, 0);
        assert!(chain[0].transactions.is_empty());
        assert_eq!(chain[0].previous_hash, Block::sentinel().hash());
        assert!(blockchain.validate());
    }

    #[test]
    fn test_reward_sentinel_is_admitted_unconditionally() {
        let miner = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let reward_sender = Address(REWARD_SENDER.to_string());
        blockchain
            .add_transaction(&reward_sender, miner.address(), 1.0, None, None)
            .unwrap();

        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let result =
            blockchain.add_transaction(alice.address(), miner.address(), 1.0, None, None);

        assert!(matches!(result, Err(BlockchainError::MissingCredentials(_))));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let mallory = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let transaction =
            Transaction::new(alice.address().clone(), miner.address().clone(), 1.0);
        // Signed by a key that does not match the submitted public key
        let signature = mallory.sign(&transaction.to_bytes());

        let result = blockchain.add_transaction(
            alice.address(),
            miner.address(),
            1.0,
            Some(alice.public_key()),
            Some(&signature),
        );

        assert!(matches!(result, Err(BlockchainError::InvalidSignature)));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        // Alice has no mined income at all
        let result = signed_transfer(&blockchain, &alice, miner.address(), 5.0);

        assert!(matches!(
            result,
            Err(BlockchainError::InsufficientFunds { required, available })
                if required == 5.0 && available == 0.0
        ));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let result = signed_transfer(&blockchain, &alice, miner.address(), -1.0);

        assert!(matches!(result, Err(BlockchainError::InvalidAmount(_))));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_proof_of_work_finds_lowest_nonce() {
        let miner = Wallet::new();
        let transactions = vec![Transaction::new_reward(miner.address().clone(), 1.0)];
        let previous_hash = Block::sentinel().hash();

        let nonce = Blockchain::proof_of_work(
            previous_hash,
            &transactions,
            MINING_DIFFICULTY,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(Blockchain::valid_proof(
            nonce,
            previous_hash,
            &transactions,
            MINING_DIFFICULTY
        ));
        for earlier in 0..nonce {
            assert!(!Blockchain::valid_proof(
                earlier,
                previous_hash,
                &transactions,
                MINING_DIFFICULTY
            ));
        }
    }

    #[test]
    fn test_mining_cancellation_restores_pool() {
        let miner = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let reward_sender = Address(REWARD_SENDER.to_string());
        blockchain
            .add_transaction(&reward_sender, miner.address(), 1.0, None, None)
            .unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();

        let result = blockchain.mine_cancellable(&cancel);

        assert!(matches!(result, Err(BlockchainError::MiningCancelled)));
        assert_eq!(blockchain.chain().len(), 1);
        // The drained transaction is back and no reward leaked in
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_mining_appends_block_and_clears_pool() {
        let miner = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        let block = blockchain.mine().unwrap();

        assert_eq!(blockchain.chain().len(), 2);
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_reward());
        assert!(blockchain.pending_transactions().is_empty());
        assert_eq!(blockchain.balance_of(miner.address()), MINING_REWARD);
        assert!(blockchain.validate());
    }

    #[test]
    fn test_end_to_end_transfer_scenario() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let bob = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        // Fund the miner, then route a coin to Alice
        blockchain.mine().unwrap();
        signed_transfer(&blockchain, &miner, alice.address(), 1.0).unwrap();
        blockchain.mine().unwrap();

        // Alice passes it on to Bob
        signed_transfer(&blockchain, &alice, bob.address(), 1.0).unwrap();
        blockchain.mine().unwrap();

        assert_eq!(blockchain.chain().len(), 4);
        assert_eq!(blockchain.balance_of(alice.address()), 0.0);
        assert_eq!(blockchain.balance_of(bob.address()), 1.0);
        // Three rewards earned, one coin given away
        assert_eq!(blockchain.balance_of(miner.address()), 2.0);
        assert!(blockchain.validate());
    }

    #[test]
    fn test_balance_conservation() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let bob = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        blockchain.mine().unwrap();
        signed_transfer(&blockchain, &miner, alice.address(), 0.6).unwrap();
        blockchain.mine().unwrap();
        signed_transfer(&blockchain, &alice, bob.address(), 0.5).unwrap();
        blockchain.mine().unwrap();

        // Everything in circulation came from mining rewards
        let minted = 3.0 * MINING_REWARD;
        let total = blockchain.balance_of(miner.address())
            + blockchain.balance_of(alice.address())
            + blockchain.balance_of(bob.address());
        assert!((total - minted).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_balance_is_spendable() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        blockchain.mine().unwrap();
        assert_eq!(blockchain.balance_of(miner.address()), MINING_REWARD);

        // Spending exactly the available balance is allowed
        signed_transfer(&blockchain, &miner, alice.address(), MINING_REWARD).unwrap();
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_transfers_submitted_mid_round_wait_for_next_block() {
        let miner = Wallet::new();
        let alice = Wallet::new();
        let blockchain = Blockchain::new(miner.address().clone());

        blockchain.mine().unwrap();
        blockchain.mine().unwrap();

        // Two transfers; only the first is pending when mining starts
        signed_transfer(&blockchain, &miner, alice.address(), 1.0).unwrap();
        let block = blockchain.mine().unwrap();
        signed_transfer(&blockchain, &miner, alice.address(), 1.0).unwrap();

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }
}
