use anyhow::Result;
use log::{info, warn};

use minichain::blockchain::chain::MINING_REWARD;
use minichain::blockchain::{Blockchain, Transaction, Wallet};
use minichain::wire::{ChainResponse, WalletResponse};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let miner = Wallet::new();
    let alice = Wallet::new();
    let bob = Wallet::new();

    info!(
        "miner wallet: {}",
        serde_json::to_string(&WalletResponse::from(&miner))?
    );

    let blockchain = Blockchain::new(miner.address().clone());

    // An unfunded transfer is rejected before it reaches the pool
    let transfer = Transaction::new(alice.address().clone(), bob.address().clone(), 1.0);
    let signature = alice.sign(&transfer.to_bytes());
    if let Err(err) = blockchain.add_transaction(
        alice.address(),
        bob.address(),
        1.0,
        Some(alice.public_key()),
        Some(&signature),
    ) {
        warn!("transfer rejected: {}", err);
    }

    // Mine once to fund the miner, then move a coin along
    blockchain.mine()?;

    let transfer = Transaction::new(
        miner.address().clone(),
        alice.address().clone(),
        MINING_REWARD,
    );
    let signature = miner.sign(&transfer.to_bytes());
    blockchain.add_transaction(
        miner.address(),
        alice.address(),
        MINING_REWARD,
        Some(miner.public_key()),
        Some(&signature),
    )?;
    blockchain.mine()?;

    println!(
        "{}",
        serde_json::to_string_pretty(&ChainResponse::new(blockchain.chain()))?
    );

    println!("miner {:.1}", blockchain.balance_of(miner.address()));
    println!("alice {:.1}", blockchain.balance_of(alice.address()));
    println!("bob   {:.1}", blockchain.balance_of(bob.address()));

    Ok(())
}
