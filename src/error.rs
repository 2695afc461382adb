use thiserror::Error;

/// Errors produced while resolving a partial mnemonic into word slots (§4.1).
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("word {0:?} is not a BIP-39 word and matches no wordlist entry by prefix")]
    InvalidWord(String),
    #[error("phrase has {0} words; only 12, 15, 18, 21, or 24 are valid BIP-39 lengths")]
    InvalidLength(usize),
}

/// Errors produced while deriving addresses from a validated candidate phrase (§4.4).
///
/// `InvalidMnemonic` (checksum failure) is not represented here — callers treat it
/// as an expected, silently-skipped outcome (`Ok(None)`), not an error.
#[derive(Debug, Error)]
pub enum DeriverError {
    #[error("cryptographic derivation failed: {0}")]
    Fatal(String),
}

/// User-input configuration errors, surfaced before any worker spawns (§7).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required option --mnemonic (or MNEMONIC environment variable)")]
    MissingMnemonic,
    #[error("missing required option --chain (or CHAIN environment variable)")]
    MissingChain,
    #[error("invalid chain identifier {0:?}; expected one of: bitcoin, mainnet, both")]
    InvalidChain(String),
    #[error("invalid boolean value {0:?} for {1}; expected \"true\" or \"false\"")]
    InvalidBoolean(String, &'static str),
}

/// Fatal Coordinator errors that propagate to the caller as a non-zero exit (§7, §4.7).
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to persist progress file: {0}")]
    ProgressWrite(#[from] std::io::Error),
    #[error("all workers exited unexpectedly")]
    AllWorkersDied,
}
