//! Transfer Ledger CLI
//!
//! Command-line interface for executing funds transfers from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy sync --accounts accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 \
//!     --accounts accounts.csv --transfers-out log.csv transfers.csv > balances.csv
//! cargo run -- --accounts accounts.csv --history 1 --history-out history.csv \
//!     transfers.csv > balances.csv
//! ```
//!
//! The program seeds the ledger from the accounts file, executes every transfer
//! through the engine using the selected processing strategy, and writes the
//! final balances to stdout. Logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success (individual rejected transfers do not change this)
//! - 1: Fatal error (missing file, unreadable CSV, output failure)

use std::fs::File;
use std::io::BufWriter;
use std::process;

use tracing::{error, info};

use transfer_ledger::cli;
use transfer_ledger::io::write_transfers_csv;
use transfer_ledger::logging::init_logging;
use transfer_ledger::strategy;
use transfer_ledger::LedgerError;

fn main() {
    let args = cli::parse_args();
    init_logging(&args.log_level);

    if let Err(e) = run(&args) {
        error!(error = %e, "Fatal error");
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), LedgerError> {
    let batch_config = match args.strategy {
        cli::StrategyType::Async => Some(args.to_batch_config()),
        cli::StrategyType::Sync => None,
    };
    let strategy = strategy::create_strategy(args.strategy, args.to_engine_config(), batch_config);

    info!(
        strategy = ?args.strategy,
        accounts = %args.accounts_file.display(),
        transfers = %args.transfers_file.display(),
        "Processing transfers"
    );

    let mut output = std::io::stdout();
    let report = strategy.process(&args.accounts_file, &args.transfers_file, &mut output)?;

    if let Some(path) = &args.transfers_out {
        let mut writer = BufWriter::new(File::create(path)?);
        write_transfers_csv(&report.transfers, &mut writer)?;
        info!(path = %path.display(), count = report.transfers.len(), "Transfer log written");
    }

    if let (Some(account), Some(path)) = (args.history, &args.history_out) {
        let history = report.history(account, args.history_take, args.history_skip);
        let mut writer = BufWriter::new(File::create(path)?);
        write_transfers_csv(&history, &mut writer)?;
        info!(account, path = %path.display(), count = history.len(), "Account history written");
    }

    Ok(())
}
