//! BIP-39 mnemonic recovery engine — library entry point.
//!
//! Assembles the seven core components (Wordlist, Candidate Resolver,
//! Combination Enumerator, Address Deriver, Balance Query Client, Progress
//! Tracker, Worker Pool Coordinator) behind a single [`run`] call, so
//! `main.rs` and integration tests share one code path.

pub mod balance;
pub mod combinatorics;
pub mod config;
pub mod coordinator;
pub mod deriver;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod wordlist;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::balance::{BalanceClient, HttpBalanceClient};
use crate::combinatorics::Enumerator;
use crate::config::Config;
use crate::coordinator::{Coordinator, RunOutcome};
use crate::progress::ProgressState;
use crate::resolver::ResolvedPhrase;
use crate::wordlist::Wordlist;

/// Run a full recovery pass for the given configuration.
///
/// Loads the wordlist, resolves the partial phrase, sizes the enumerator,
/// loads or initializes progress (honoring `--resume`), and drives the
/// Coordinator to completion or early termination.
pub fn run(config: Config, stop_flag: Arc<AtomicBool>) -> anyhow::Result<RunOutcome> {
    run_with_balance_client(config, stop_flag, None)
}

/// Same as [`run`], but lets callers (tests) inject a fake
/// [`BalanceClient`] instead of hitting a live endpoint.
pub fn run_with_balance_client(
    config: Config,
    stop_flag: Arc<AtomicBool>,
    balance_client: Option<Arc<dyn BalanceClient>>,
) -> anyhow::Result<RunOutcome> {
    let wordlist = Wordlist::load();
    let tokens = config.tokens();
    let resolved = ResolvedPhrase::resolve(&tokens, &wordlist)?;

    let (unknown, prefix) = resolved.counts();
    info!(
        "resolved phrase: {} fixed, {} unknown, {} prefix-narrowed positions",
        resolved.fixed_count(),
        unknown,
        prefix
    );

    let positions = resolved.unknown_positions(&wordlist);
    let fixed = resolved.fixed_words();
    let enumerator = Enumerator::new(positions, fixed, config.repeating_words);
    info!("combination space size: {}", enumerator.total());

    let progress_path = PathBuf::from(&config.progress_path);
    let progress = if config.resume {
        ProgressState::load(&progress_path).unwrap_or_else(|| ProgressState::fresh(enumerator.total()))
    } else {
        ProgressState::fresh(enumerator.total())
    };

    let balance_client = if config.query_balances {
        Some(balance_client.unwrap_or_else(|| {
            Arc::new(HttpBalanceClient::default_bitcoin(config.min_request_interval)) as Arc<dyn BalanceClient>
        }))
    } else {
        None
    };

    let total_for_bar = u64::try_from(enumerator.total()).unwrap_or(u64::MAX);
    let progress_bar = ProgressBar::new(total_for_bar);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) | ETA: {eta_precise} | {msg}",
        )
        .unwrap()
        .progress_chars("##-"),
    );
    progress_bar.set_position(u64::try_from(progress.resume_index()).unwrap_or(u64::MAX));

    let coordinator = Coordinator::new(
        config.workers,
        config.chunk_size,
        config.chain,
        config.public_key.clone(),
        config.query_balances,
        progress_path,
    )
    .with_progress_bar(progress_bar);

    let outcome = coordinator.run(enumerator, progress, balance_client, stop_flag)?;

    for m in &outcome.matches {
        info!("MATCH on {}: {} -> {}", m.chain, m.phrase.join(" "), m.address);
    }
    for w in &outcome.loaded_wallets {
        info!(
            "loaded wallet on {}: {} -> {} (balance {})",
            w.chain,
            w.phrase.join(" "),
            w.address,
            w.balance
        );
    }

    Ok(outcome)
}
