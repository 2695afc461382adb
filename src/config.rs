//! CLI surface and environment-variable fallback (§6 — external interfaces,
//! out of scope for the core per spec.md §1 but required ambient plumbing).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

/// Target chain(s) for address derivation and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Both,
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "mainnet" | "ethereum" | "eth" | "evm" => Ok(Chain::Ethereum),
            "both" | "all" => Ok(Chain::Both),
            other => Err(ConfigError::InvalidChain(other.to_string())),
        }
    }
}

/// Default worker count, the same `num_cpus::get()` the teacher uses to
/// size its rayon thread pool.
fn default_worker_count() -> usize {
    num_cpus::get()
}

/// Recover a partial BIP-39 mnemonic by enumerating candidate completions.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Space-separated phrase with `*` for unknown words.
    #[arg(long)]
    pub mnemonic: Option<String>,

    /// Target chain id: bitcoin, mainnet, or both.
    #[arg(long)]
    pub chain: Option<String>,

    /// Target address; enables exact-match early termination.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Enable on-chain balance lookups against candidate addresses.
    #[arg(long)]
    pub query_balances: bool,

    /// Allow duplicate words across unknown positions when filling.
    #[arg(long)]
    pub repeating_words: bool,

    /// Worker thread count.
    #[arg(long, default_value_t = default_worker_count())]
    pub workers: usize,

    /// Tuples dispatched per chunk.
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Load prior progress and continue from where it left off.
    #[arg(long)]
    pub resume: bool,
}

/// Fully resolved run configuration, after CLI/env merging and validation.
#[derive(Debug, Clone)]
pub struct Config {
    pub mnemonic: String,
    pub chain: Chain,
    pub public_key: Option<String>,
    pub query_balances: bool,
    pub repeating_words: bool,
    pub workers: usize,
    pub chunk_size: usize,
    pub resume: bool,
    pub progress_path: String,
    pub min_request_interval: Duration,
}

fn parse_env_bool(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ConfigError::InvalidBoolean(other.to_string(), name)),
        },
        Err(_) => Ok(false),
    }
}

impl Config {
    /// Build a `Config` from parsed CLI flags, falling back to the
    /// `MNEMONIC`/`CHAIN`/`PUBLIC_KEY`/`REPEATING_WORDS`/`CHECK_BALANCES`
    /// environment variables for the fields the CLI leaves unset (§6).
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let mnemonic = cli
            .mnemonic
            .or_else(|| env::var("MNEMONIC").ok())
            .ok_or(ConfigError::MissingMnemonic)?;

        let chain_str = cli
            .chain
            .or_else(|| env::var("CHAIN").ok())
            .ok_or(ConfigError::MissingChain)?;
        let chain = Chain::from_str(&chain_str)?;

        let public_key = cli.public_key.or_else(|| env::var("PUBLIC_KEY").ok());

        let repeating_words = if cli.repeating_words {
            true
        } else {
            parse_env_bool("REPEATING_WORDS")?
        };

        let query_balances = if cli.query_balances {
            true
        } else {
            parse_env_bool("CHECK_BALANCES")?
        };

        Ok(Config {
            mnemonic,
            chain,
            public_key,
            query_balances,
            repeating_words,
            workers: cli.workers,
            chunk_size: cli.chunk_size,
            resume: cli.resume,
            progress_path: "recovery-progress.json".to_string(),
            min_request_interval: Duration::from_millis(250),
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        self.mnemonic
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_parsing_is_case_insensitive() {
        assert_eq!(Chain::from_str("Bitcoin").unwrap(), Chain::Bitcoin);
        assert_eq!(Chain::from_str("MAINNET").unwrap(), Chain::Ethereum);
        assert_eq!(Chain::from_str("both").unwrap(), Chain::Both);
        assert!(Chain::from_str("dogecoin").is_err());
    }
}
