//! Candidate Resolver (§4.1) — turns a user-supplied partial phrase into
//! word slots, and assembles a full phrase back out of a chosen tuple.

use std::collections::HashSet;

use crate::error::ResolverError;
use crate::wordlist::Wordlist;

pub const VALID_LENGTHS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordSlot {
    Fixed(&'static str),
    PrefixCandidates(Vec<&'static str>),
    Unknown,
}

/// Whether an unknown position draws from the full wordlist or from a
/// narrower set of prefix candidates — the distinction the non-repeating
/// upper-bound formula (§4.2) depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    UnknownFull,
    Prefix,
}

#[derive(Debug, Clone)]
pub struct UnknownPosition {
    pub phrase_index: usize,
    pub kind: PositionKind,
    pub candidates: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ResolvedPhrase {
    pub slots: Vec<WordSlot>,
}

impl ResolvedPhrase {
    /// Resolve raw tokens (`"*"` or a literal/partial word) into word slots.
    pub fn resolve(tokens: &[String], wordlist: &Wordlist) -> Result<Self, ResolverError> {
        if !VALID_LENGTHS.contains(&tokens.len()) {
            return Err(ResolverError::InvalidLength(tokens.len()));
        }

        let mut slots = Vec::with_capacity(tokens.len());
        for token in tokens {
            if token == "*" {
                slots.push(WordSlot::Unknown);
                continue;
            }
            if let Some(exact) = wordlist.exact(token) {
                slots.push(WordSlot::Fixed(exact));
                continue;
            }
            let matches = wordlist.prefix_matches(token);
            match matches.len() {
                0 => return Err(ResolverError::InvalidWord(token.clone())),
                1 => slots.push(WordSlot::Fixed(matches[0])),
                _ => slots.push(WordSlot::PrefixCandidates(matches)),
            }
        }
        Ok(Self { slots })
    }

    /// Number of (unknown, prefix-candidate) slots, for reporting to the user.
    pub fn counts(&self) -> (usize, usize) {
        let unknown = self
            .slots
            .iter()
            .filter(|s| matches!(s, WordSlot::Unknown))
            .count();
        let prefix = self
            .slots
            .iter()
            .filter(|s| matches!(s, WordSlot::PrefixCandidates(_)))
            .count();
        (unknown, prefix)
    }

    pub fn fixed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, WordSlot::Fixed(_)))
            .count()
    }

    pub fn fixed_words(&self) -> HashSet<&'static str> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                WordSlot::Fixed(w) => Some(*w),
                _ => None,
            })
            .collect()
    }

    /// The unknown-position vector (§3): one entry per non-Fixed slot,
    /// left-to-right, carrying its candidate list in wordlist order.
    pub fn unknown_positions(&self, wordlist: &Wordlist) -> Vec<UnknownPosition> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(phrase_index, slot)| match slot {
                WordSlot::Unknown => Some(UnknownPosition {
                    phrase_index,
                    kind: PositionKind::UnknownFull,
                    candidates: wordlist.all().to_vec(),
                }),
                WordSlot::PrefixCandidates(candidates) => Some(UnknownPosition {
                    phrase_index,
                    kind: PositionKind::Prefix,
                    candidates: candidates.clone(),
                }),
                WordSlot::Fixed(_) => None,
            })
            .collect()
    }

    /// Reassemble a full phrase from a tuple of picks, one per non-Fixed slot
    /// in left-to-right order.
    pub fn assemble(&self, tuple: &[&'static str]) -> Vec<&'static str> {
        let mut picks = tuple.iter();
        self.slots
            .iter()
            .map(|slot| match slot {
                WordSlot::Fixed(w) => *w,
                WordSlot::Unknown | WordSlot::PrefixCandidates(_) => {
                    *picks.next().expect("tuple length matches unknown slot count")
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn rejects_invalid_length() {
        let wl = Wordlist::load();
        let tokens = toks(&["abandon"; 11]);
        assert!(matches!(
            ResolvedPhrase::resolve(&tokens, &wl),
            Err(ResolverError::InvalidLength(11))
        ));
    }

    #[test]
    fn star_resolves_to_unknown() {
        let wl = Wordlist::load();
        let mut words = vec!["abandon".to_string(); 11];
        words.push("*".to_string());
        let resolved = ResolvedPhrase::resolve(&words, &wl).unwrap();
        assert_eq!(resolved.slots[11], WordSlot::Unknown);
        assert_eq!(resolved.counts(), (1, 0));
    }

    #[test]
    fn unique_prefix_collapses_to_fixed() {
        let wl = Wordlist::load();
        let mut words = vec!["abandon".to_string(); 11];
        words.push("zo".to_string()); // only "zone" and "zoo" start with "zo"... test ambiguous prefix below
        let resolved = ResolvedPhrase::resolve(&words, &wl).unwrap();
        assert_eq!(resolved.counts(), (0, 1));
    }

    #[test]
    fn unambiguous_prefix_collapses_to_fixed_exact() {
        let wl = Wordlist::load();
        let mut words = vec!["abandon".to_string(); 11];
        words.push("abando".to_string()); // only "abandon" starts with "abando"
        let resolved = ResolvedPhrase::resolve(&words, &wl).unwrap();
        assert_eq!(resolved.slots[11], WordSlot::Fixed("abandon"));
    }

    #[test]
    fn unmatched_prefix_is_an_error() {
        let wl = Wordlist::load();
        let mut words = vec!["abandon".to_string(); 11];
        words.push("zzzqqq".to_string());
        let err = ResolvedPhrase::resolve(&words, &wl).unwrap_err();
        assert!(matches!(err, ResolverError::InvalidWord(_)));
    }

    #[test]
    fn assemble_round_trips_a_fully_fixed_phrase() {
        let wl = Wordlist::load();
        let words = vec!["abandon".to_string(); 12];
        let resolved = ResolvedPhrase::resolve(&words, &wl).unwrap();
        let assembled = resolved.assemble(&[]);
        assert_eq!(assembled, vec!["abandon"; 12]);
    }

    #[test]
    fn assemble_substitutes_unknown_positions_in_order() {
        let wl = Wordlist::load();
        let mut words = vec!["abandon".to_string(); 10];
        words.push("*".to_string());
        words.push("*".to_string());
        let resolved = ResolvedPhrase::resolve(&words, &wl).unwrap();
        let assembled = resolved.assemble(&["ability", "about"]);
        assert_eq!(assembled[10], "ability");
        assert_eq!(assembled[11], "about");
    }
}
