//! Worker Pool Coordinator (§4.7, §5) — dispatches chunks of the
//! Combination Enumerator to a fixed pool of OS threads, collects results,
//! and drives the Progress Tracker and early termination.
//!
//! True `std::thread`s + `crossbeam_channel` rather than `rayon`: rayon's
//! work-stealing pool doesn't expose "dispatch exactly when a worker goes
//! idle" as a primitive, which this component's chunk-ownership contract
//! needs. One bounded-to-1 channel per worker makes a `send` block until
//! that worker is free, which is the dispatch policy without any polling —
//! the same shape as `leeseer-bip39_recovery`'s rayon `par_iter` loop,
//! rebuilt on explicit channels.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indicatif::ProgressBar;
use log::{debug, info, warn};

use crate::balance::BalanceClient;
use crate::config::Chain;
use crate::deriver::AddressDeriver;
use crate::error::CoordinatorError;
use crate::progress::ProgressState;

/// A unit of dispatch: tuples already assembled into full phrases, tagged
/// with the global index their first element occupies.
struct Job {
    start: u128,
    phrases: Vec<Vec<&'static str>>,
}

/// The closed result taxonomy workers report back (§4.7).
enum ChunkOutcome {
    Complete { start: u128, end: u128, candidates_checked: u64 },
    Match { start: u128, end: u128, phrase: Vec<&'static str>, chain_label: &'static str, address: String },
    LoadedWallet { start: u128, end: u128, phrase: Vec<&'static str>, chain_label: &'static str, address: String, balance: u128 },
    Error { start: u128, end: u128, message: String },
}

pub struct MatchReport {
    pub phrase: Vec<&'static str>,
    pub chain: &'static str,
    pub address: String,
}

pub struct LoadedWalletReport {
    pub phrase: Vec<&'static str>,
    pub chain: &'static str,
    pub address: String,
    pub balance: u128,
}

pub struct RunOutcome {
    pub matches: Vec<MatchReport>,
    pub loaded_wallets: Vec<LoadedWalletReport>,
    pub candidates_checked: u64,
    pub completed: bool,
}

pub struct Coordinator {
    workers: usize,
    chunk_size: usize,
    chain: Chain,
    target_address: Option<String>,
    query_balances: bool,
    progress_path: PathBuf,
    progress_bar: Option<ProgressBar>,
}

impl Coordinator {
    pub fn new(
        workers: usize,
        chunk_size: usize,
        chain: Chain,
        target_address: Option<String>,
        query_balances: bool,
        progress_path: PathBuf,
    ) -> Self {
        Self {
            workers: workers.max(1),
            chunk_size,
            chain,
            target_address,
            query_balances,
            progress_path,
            progress_bar: None,
        }
    }

    /// Attach a CLI progress bar; positions/ETA are driven off the
    /// contiguous-prefix commit cursor, the same `indicatif::ProgressBar`
    /// the teacher drives off its batch loop.
    pub fn with_progress_bar(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = Some(progress_bar);
        self
    }

    /// Run the enumerator to exhaustion (or early termination on a match),
    /// updating `progress` as contiguous chunks commit.
    pub fn run(
        &self,
        mut enumerator: crate::combinatorics::Enumerator,
        mut progress: ProgressState,
        balance_client: Option<Arc<dyn BalanceClient>>,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<RunOutcome, CoordinatorError> {
        let (job_txs, job_rxs): (Vec<Sender<Job>>, Vec<Receiver<Job>>) = (0..self.workers)
            .map(|_| bounded::<Job>(1))
            .unzip();
        let (outcome_tx, outcome_rx): (Sender<ChunkOutcome>, Receiver<ChunkOutcome>) = unbounded();

        let worker_stop = Arc::clone(&stop_flag);
        let handles: Vec<JoinHandle<()>> = job_rxs
            .into_iter()
            .enumerate()
            .map(|(id, job_rx)| {
                let outcome_tx = outcome_tx.clone();
                let chain = self.chain;
                let target = self.target_address.clone();
                let query_balances = self.query_balances;
                let balance_client = balance_client.clone();
                let stop = Arc::clone(&worker_stop);
                std::thread::Builder::new()
                    .name(format!("recovery-worker-{id}"))
                    .spawn(move || worker_loop(job_rx, outcome_tx, chain, target, query_balances, balance_client, stop))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        drop(outcome_tx);

        let mut next_worker = 0usize;
        let mut cursor = progress.resume_index();
        enumerator.seek(cursor);

        let mut pending: BTreeMap<u128, u128> = BTreeMap::new();
        let mut next_expected_start = cursor;
        let mut candidates_checked = 0u64;
        let mut matches = Vec::new();
        let mut loaded_wallets = Vec::new();
        let mut enumerator_exhausted = false;
        let mut completed = false;
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.workers && !enumerator_exhausted && !stop_flag.load(Ordering::SeqCst) {
                match enumerator.next_chunk(self.chunk_size) {
                    Some(chunk) => {
                        let start = cursor;
                        cursor += chunk.len() as u128;
                        let worker = next_worker % self.workers;
                        if job_txs[worker].send(Job { start, phrases: chunk }).is_err() {
                            warn!("worker {worker} channel closed unexpectedly");
                        }
                        next_worker += 1;
                        in_flight += 1;
                    }
                    None => enumerator_exhausted = true,
                }
            }

            if in_flight == 0 {
                completed = enumerator_exhausted;
                break;
            }

            match outcome_rx.recv() {
                Ok(outcome) => {
                    in_flight -= 1;
                    match outcome {
                        ChunkOutcome::Complete { start, end, candidates_checked: n } => {
                            candidates_checked += n;
                            pending.insert(start, end);
                        }
                        ChunkOutcome::Match { start, end, phrase, chain_label, address } => {
                            candidates_checked += (end - start) as u64;
                            pending.insert(start, end);
                            matches.push(MatchReport { phrase, chain: chain_label, address });
                            info!("match found, signaling stop");
                            stop_flag.store(true, Ordering::SeqCst);
                        }
                        ChunkOutcome::LoadedWallet { start, end, phrase, chain_label, address, balance } => {
                            candidates_checked += (end - start) as u64;
                            pending.insert(start, end);
                            loaded_wallets.push(LoadedWalletReport { phrase, chain: chain_label, address, balance });
                        }
                        ChunkOutcome::Error { start, end, message } => {
                            warn!("chunk [{start}, {end}) failed: {message}");
                            pending.insert(start, end);
                        }
                    }

                    while let Some(&start) = pending.keys().next() {
                        if start != next_expected_start {
                            break;
                        }
                        let end = pending.remove(&start).unwrap();
                        next_expected_start = end;
                        progress.commit(end.saturating_sub(1));
                        progress.save_atomic(&self.progress_path)?;
                        if let Some(pb) = &self.progress_bar {
                            pb.set_position(u64::try_from(end).unwrap_or(u64::MAX));
                        }
                        debug!("progress committed through index {}", end.saturating_sub(1));
                    }
                }
                Err(_) => return Err(CoordinatorError::AllWorkersDied),
            }
        }

        drop(job_txs);
        for handle in handles {
            let _ = handle.join();
        }

        // Drain any outcomes emitted between the last recv and thread exit.
        while let Ok(outcome) = outcome_rx.try_recv() {
            match outcome {
                ChunkOutcome::Complete { start, end, candidates_checked: n } => {
                    candidates_checked += n;
                    pending.insert(start, end);
                }
                ChunkOutcome::Match { start, end, phrase, chain_label, address } => {
                    candidates_checked += (end - start) as u64;
                    pending.insert(start, end);
                    matches.push(MatchReport { phrase, chain: chain_label, address });
                }
                ChunkOutcome::LoadedWallet { start, end, phrase, chain_label, address, balance } => {
                    candidates_checked += (end - start) as u64;
                    pending.insert(start, end);
                    loaded_wallets.push(LoadedWalletReport { phrase, chain: chain_label, address, balance });
                }
                ChunkOutcome::Error { start, end, .. } => {
                    pending.insert(start, end);
                }
            }
        }
        while let Some(&start) = pending.keys().next() {
            if start != next_expected_start {
                break;
            }
            let end = pending.remove(&start).unwrap();
            next_expected_start = end;
            progress.commit(end.saturating_sub(1));
            if let Some(pb) = &self.progress_bar {
                pb.set_position(u64::try_from(end).unwrap_or(u64::MAX));
            }
        }

        if !matches.is_empty() {
            progress.mark_completed();
        } else if completed {
            progress.mark_completed();
        } else {
            progress.mark_paused();
        }
        progress.save_atomic(&self.progress_path)?;

        if let Some(pb) = &self.progress_bar {
            if !matches.is_empty() {
                pb.finish_with_message("match found");
            } else if completed {
                pb.finish_with_message("all candidates checked, no match");
            } else {
                pb.finish_with_message("stopped, progress saved");
            }
        }

        Ok(RunOutcome {
            matches,
            loaded_wallets,
            candidates_checked,
            completed: completed || stop_flag.load(Ordering::SeqCst),
        })
    }
}

fn worker_loop(
    job_rx: Receiver<Job>,
    outcome_tx: Sender<ChunkOutcome>,
    chain: Chain,
    target: Option<String>,
    query_balances: bool,
    balance_client: Option<Arc<dyn BalanceClient>>,
    stop: Arc<AtomicBool>,
) {
    let deriver = AddressDeriver::new();
    while let Ok(job) = job_rx.recv() {
        let Job { start, phrases } = job;
        let end = start + phrases.len() as u128;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            process_chunk(&deriver, &phrases, chain, target.as_deref(), query_balances, balance_client.as_deref(), &stop)
        }));

        let outcome = match result {
            Ok(ChunkResult::Complete { checked }) => ChunkOutcome::Complete { start, end, candidates_checked: checked },
            Ok(ChunkResult::Match { phrase, chain_label, address }) => {
                ChunkOutcome::Match { start, end, phrase, chain_label, address }
            }
            Ok(ChunkResult::LoadedWallet { phrase, chain_label, address, balance }) => {
                ChunkOutcome::LoadedWallet { start, end, phrase, chain_label, address, balance }
            }
            Err(panic_payload) => {
                let message = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                ChunkOutcome::Error { start, end, message }
            }
        };

        if outcome_tx.send(outcome).is_err() {
            break;
        }
    }
}

enum ChunkResult {
    Complete { checked: u64 },
    Match { phrase: Vec<&'static str>, chain_label: &'static str, address: String },
    LoadedWallet { phrase: Vec<&'static str>, chain_label: &'static str, address: String, balance: u128 },
}

fn process_chunk(
    deriver: &AddressDeriver,
    phrases: &[Vec<&'static str>],
    chain: Chain,
    target: Option<&str>,
    query_balances: bool,
    balance_client: Option<&dyn BalanceClient>,
    stop: &Arc<AtomicBool>,
) -> ChunkResult {
    let mut checked = 0u64;
    for phrase in phrases {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        checked += 1;
        let joined = phrase.join(" ");
        let derived = match deriver.derive(&joined, chain) {
            Ok(Some(d)) => d,
            Ok(None) => continue,
            Err(_) => continue,
        };

        if let Some(target) = target {
            if let Some((chain_label, address)) = derived.matches(target) {
                return ChunkResult::Match {
                    phrase: phrase.clone(),
                    chain_label,
                    address: address.to_string(),
                };
            }
        }

        if query_balances {
            if let Some(client) = balance_client {
                let candidates: Vec<(&'static str, String)> = match &derived {
                    crate::deriver::DerivedAddress::Bitcoin(a) => vec![("bitcoin", a.clone())],
                    crate::deriver::DerivedAddress::Ethereum(a) => vec![("ethereum", a.clone())],
                    crate::deriver::DerivedAddress::Both { bitcoin, ethereum } => {
                        vec![("bitcoin", bitcoin.clone()), ("ethereum", ethereum.clone())]
                    }
                };
                for (label, address) in candidates {
                    let queried_chain = if label == "bitcoin" { Chain::Bitcoin } else { Chain::Ethereum };
                    let balance = client.balance(&address, queried_chain);
                    if balance > 0 {
                        return ChunkResult::LoadedWallet {
                            phrase: phrase.clone(),
                            chain_label: label,
                            address,
                            balance,
                        };
                    }
                }
            }
        }
    }
    ChunkResult::Complete { checked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorics::Enumerator;
    use crate::progress::ProgressState;
    use crate::resolver::{PositionKind, UnknownPosition};
    use std::collections::HashSet;
    use std::env;

    fn temp_progress_path() -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, AtomicOrdering::SeqCst);
        let mut path = env::temp_dir();
        path.push(format!("coordinator-test-{}-{n}.json", std::process::id()));
        path
    }

    #[test]
    fn coordinator_scans_all_abandon_permutations_without_match() {
        let positions = vec![UnknownPosition {
            phrase_index: 11,
            kind: PositionKind::UnknownFull,
            candidates: vec!["about", "above"],
        }];
        let enumerator = Enumerator::new(positions, HashSet::new(), true);
        let total = enumerator.total();
        let progress = ProgressState::fresh(total);
        let path = temp_progress_path();

        let coordinator = Coordinator::new(2, 10, Chain::Bitcoin, None, false, path.clone());
        let stop = Arc::new(AtomicBool::new(false));
        let outcome = coordinator.run(enumerator, progress, None, stop).unwrap();

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.candidates_checked, total as u64);
        assert!(outcome.completed);

        let _ = std::fs::remove_file(&path);
    }
}
