//! End-to-end scenarios, exercised against the library's `run()` entry
//! point rather than the CLI binary. Mirrors scenarios S1, S2, and S5 from
//! the testable-properties section: a single fully-fixed phrase with one
//! unknown final word, matched against a known Bitcoin address, a known
//! Ethereum address, and a non-existent address respectively.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use mnemonic_recover::config::{Chain, Config};

const ABANDON_ELEVEN: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon *";

fn base_config(mnemonic: &str, chain: Chain, public_key: Option<String>) -> Config {
    Config {
        mnemonic: mnemonic.to_string(),
        chain,
        public_key,
        query_balances: false,
        repeating_words: true,
        workers: 2,
        chunk_size: 16,
        resume: false,
        progress_path: format!("target-test-progress-{}.json", std::process::id()),
        min_request_interval: Duration::from_millis(1),
    }
}

#[test]
fn s1_finds_the_canonical_bitcoin_match() {
    let config = base_config(
        ABANDON_ELEVEN,
        Chain::Bitcoin,
        Some("bc1qhgv6v7jgxxpf0cpzxd9zga52mx9tuvcdnknlhn".to_string()),
    );
    let progress_path = config.progress_path.clone();
    let stop = Arc::new(AtomicBool::new(false));
    let outcome = mnemonic_recover::run(config, stop).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].phrase.last(), Some(&"about"));
    assert_eq!(outcome.matches[0].chain, "bitcoin");

    let _ = std::fs::remove_file(progress_path);
}

#[test]
fn s2_finds_the_canonical_ethereum_match() {
    let config = base_config(
        ABANDON_ELEVEN,
        Chain::Ethereum,
        Some("0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string()),
    );
    let progress_path = config.progress_path.clone();
    let stop = Arc::new(AtomicBool::new(false));
    let outcome = mnemonic_recover::run(config, stop).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].phrase.last(), Some(&"about"));
    assert_eq!(outcome.matches[0].chain, "ethereum");

    let _ = std::fs::remove_file(progress_path);
}

#[test]
fn s5_terminates_normally_with_no_match_against_a_nonexistent_address() {
    let config = base_config(
        ABANDON_ELEVEN,
        Chain::Bitcoin,
        Some("bc1q00000000000000000000000000000000000".to_string()),
    );
    let progress_path = config.progress_path.clone();
    let stop = Arc::new(AtomicBool::new(false));
    let outcome = mnemonic_recover::run(config, stop).unwrap();

    assert!(outcome.matches.is_empty());
    assert!(outcome.completed);
    assert_eq!(outcome.candidates_checked, 2048);

    let _ = std::fs::remove_file(progress_path);
}

#[test]
fn s6_without_repetition_never_reuses_the_fixed_word_or_duplicates_across_unknowns() {
    // Both unknown positions share the "ab" prefix, so without the
    // without-repetition pruning they could legally pick the same word (or
    // the fixed word "abandon", which also starts with "ab"). Narrowing via
    // a shared prefix also keeps the search small enough to enumerate
    // exhaustively in a unit test, unlike the full 2048-word pool.
    let mnemonic =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon ab ab about";
    let config = Config {
        mnemonic: mnemonic.to_string(),
        chain: Chain::Bitcoin,
        public_key: None,
        query_balances: false,
        repeating_words: false,
        workers: 2,
        chunk_size: 50,
        resume: false,
        progress_path: format!("target-test-progress-s6-{}.json", std::process::id()),
        min_request_interval: Duration::from_millis(1),
    };
    let progress_path = config.progress_path.clone();

    let wordlist = mnemonic_recover::wordlist::Wordlist::load();
    let tokens: Vec<String> = config.tokens();
    let resolved = mnemonic_recover::resolver::ResolvedPhrase::resolve(&tokens, &wordlist).unwrap();
    let positions = resolved.unknown_positions(&wordlist);
    let fixed = resolved.fixed_words();
    let mut enumerator = mnemonic_recover::combinatorics::Enumerator::new(positions, fixed, false);

    let mut seen_duplicate = false;
    let mut seen_fixed_reuse = false;
    let mut count = 0;
    while let Some(tuple) = enumerator.next() {
        count += 1;
        if tuple[0] == tuple[1] {
            seen_duplicate = true;
        }
        if tuple.contains(&"abandon") {
            seen_fixed_reuse = true;
        }
    }
    assert!(count > 0);
    assert!(!seen_duplicate);
    assert!(!seen_fixed_reuse);

    let _ = std::fs::remove_file(progress_path);
}
