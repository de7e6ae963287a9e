//! marketsync CLI — inspect ingestion configuration.
//!
//! Usage:
//! ```bash
//! marketsync info
//! marketsync topics
//! ```

use std::env;
use std::process;

use marketsync_core::IngestConfig;
use marketsync_evm::abi::{DEPOSIT_TOPIC, TRANSFER_TOPIC, WITHDRAWAL_TOPIC};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "info" => cmd_info(),
        "topics" => cmd_topics(),
        "version" | "--version" | "-V" => {
            println!("marketsync {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("marketsync {}", env!("CARGO_PKG_VERSION"));
    println!("Reorg-safe marketplace event ingestion engine\n");
    println!("USAGE:");
    println!("    marketsync <COMMAND>\n");
    println!("COMMANDS:");
    println!("    info     Show default ingestion configuration");
    println!("    topics   Print the tracked event signature hashes");
    println!("    version  Print version");
    println!("    help     Print this help");
}

fn cmd_info() {
    let cfg = IngestConfig::default();
    println!("MarketSync v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default chain: {}", cfg.chain);
    println!("  Default confirmation depth: {} blocks", cfg.confirmation_depth);
    println!("  Default batch size: {} blocks/call", cfg.batch_size);
    println!(
        "  Default checkpoint interval: every {} blocks",
        cfg.checkpoint_interval
    );
    println!(
        "  Accept orders: {} (off = indexing-only mode)",
        cfg.accept_orders
    );
    println!("  Storage backends: memory, SQLite (feature: sqlite), Postgres (feature: postgres)");
}

fn cmd_topics() {
    println!("Transfer(address,address,uint256)  {TRANSFER_TOPIC}");
    println!("Deposit(address,uint256)           {DEPOSIT_TOPIC}");
    println!("Withdrawal(address,uint256)        {WITHDRAWAL_TOPIC}");
}
