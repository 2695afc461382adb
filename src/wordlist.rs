//! The fixed, 2048-word BIP-39 English wordlist (§2, item 1).
//!
//! Treated as an external black-box constant per spec.md's scope: the words
//! themselves come from the `bip39` crate rather than a bundled text file, but
//! a `PatriciaMap` index is built over them once so the Candidate Resolver can
//! do prefix lookups without a linear scan, the same tool
//! `leeseer-bip39_recovery`'s `Bip39Wordlist` uses for plain membership.

use bip39::Language;
use patricia_tree::PatriciaMap;

pub const WORDLIST_SIZE: usize = 2048;

pub struct Wordlist {
    words: &'static [&'static str; 2048],
    trie: PatriciaMap<u16>,
}

impl Wordlist {
    pub fn load() -> Self {
        let words = Language::English.word_list();
        let mut trie = PatriciaMap::new();
        for (i, word) in words.iter().enumerate() {
            trie.insert(word.as_bytes(), i as u16);
        }
        Self { words, trie }
    }

    /// Exact membership lookup, returning the canonical `'static` wordlist entry.
    pub fn exact(&self, word: &str) -> Option<&'static str> {
        self.trie.get(word.as_bytes()).map(|&i| self.words[i as usize])
    }

    /// Every wordlist entry starting with `prefix`, in wordlist (alphabetical) order.
    pub fn prefix_matches(&self, prefix: &str) -> Vec<&'static str> {
        self.trie
            .iter_prefix(prefix.as_bytes())
            .map(|(_, &i)| self.words[i as usize])
            .collect()
    }

    pub fn all(&self) -> &'static [&'static str; WORDLIST_SIZE] {
        self.words
    }
}
