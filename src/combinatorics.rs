//! Upper-bound calculator and Combination Enumerator (§4.2, §4.3).
//!
//! The Enumerator is a lazy, chunked, seekable stream of tuples — one word
//! per unknown position — produced in mixed-radix lexicographic order
//! without ever materializing the full space. This is the component the
//! spec weighs heaviest (≈25% of the implementation budget): it owns the
//! cursor, the without-repetition pruning, and the fast-forward/seek logic.

use std::collections::HashSet;

use crate::resolver::{PositionKind, UnknownPosition};
use crate::wordlist::WORDLIST_SIZE;

/// Exact combination count (with repetition) or tight upper bound (without
/// repetition), per the two formulas in §4.2.
pub fn upper_bound(positions: &[UnknownPosition], fixed_count: usize, repeating: bool) -> u128 {
    if repeating {
        return positions
            .iter()
            .map(|p| p.candidates.len() as u128)
            .product();
    }

    let prefix_product: u128 = positions
        .iter()
        .filter(|p| p.kind == PositionKind::Prefix)
        .map(|p| p.candidates.len() as u128)
        .product();

    let unknown_count = positions
        .iter()
        .filter(|p| p.kind == PositionKind::UnknownFull)
        .count() as u128;
    let w = WORDLIST_SIZE as u128;
    let f = fixed_count as u128;

    let mut pool_product = 1u128;
    for j in 0..unknown_count {
        // Saturate rather than panic: a resolver that somehow let fixed_count
        // exceed W (impossible for a 24-word phrase against a 2048-word
        // list) would otherwise underflow here.
        pool_product = pool_product.saturating_mul(w.saturating_sub(f).saturating_sub(j));
    }

    prefix_product * pool_product
}

fn decode_digits(mut index: u128, basis: &[usize]) -> Vec<usize> {
    let k = basis.len();
    let mut digits = vec![0usize; k];
    for i in (0..k).rev() {
        let b = basis[i] as u128;
        digits[i] = (index % b) as usize;
        index /= b;
    }
    digits
}

/// A chunked, resumable stream of candidate tuples over the unknown
/// positions, in mixed-radix lexicographic order.
pub struct Enumerator {
    positions: Vec<UnknownPosition>,
    fixed: HashSet<&'static str>,
    repeating: bool,
    total: u128,

    // with-repetition state: a plain odometer over mixed-radix digits.
    digits: Option<Vec<usize>>,
    basis: Vec<usize>,

    // without-repetition state: explicit-stack backtracking search.
    chosen: Vec<usize>,
    used: HashSet<&'static str>,

    // zero-unknown-position edge case (§8: "enumerator yields exactly one
    // tuple, the empty tuple").
    emitted_empty: bool,
}

impl Enumerator {
    pub fn new(
        positions: Vec<UnknownPosition>,
        fixed: HashSet<&'static str>,
        repeating: bool,
    ) -> Self {
        let basis: Vec<usize> = positions.iter().map(|p| p.candidates.len()).collect();
        let total = upper_bound(&positions, fixed.len(), repeating);
        let digits = if positions.is_empty() {
            Some(Vec::new())
        } else {
            Some(vec![0usize; positions.len()])
        };
        Self {
            positions,
            fixed,
            repeating,
            total,
            digits,
            basis,
            chosen: Vec::new(),
            used: HashSet::new(),
            emitted_empty: false,
        }
    }

    /// Exact (with-repetition) or upper-bound (without-repetition) total.
    pub fn total(&self) -> u128 {
        self.total
    }

    /// Reposition the stream so the next emission is the tuple at global
    /// index `start`. With repetition this is a direct O(K) mixed-radix
    /// decode; without repetition only fast-forward is exact (§4.3), so this
    /// re-walks the pruned search from scratch and discards `start` tuples.
    pub fn seek(&mut self, start: u128) {
        if self.repeating {
            if self.positions.is_empty() {
                self.emitted_empty = start == 0;
                return;
            }
            if start >= self.total {
                self.digits = None;
            } else {
                self.digits = Some(decode_digits(start, &self.basis));
            }
            return;
        }

        self.chosen.clear();
        self.used.clear();
        self.emitted_empty = false;
        let mut skipped = 0u128;
        while skipped < start {
            if self.next().is_none() {
                return;
            }
            skipped += 1;
        }
    }

    /// Pull the next tuple, or `None` once the stream is exhausted.
    pub fn next(&mut self) -> Option<Vec<&'static str>> {
        if self.positions.is_empty() {
            if self.emitted_empty {
                return None;
            }
            self.emitted_empty = true;
            return Some(Vec::new());
        }
        if self.repeating {
            self.next_repeating()
        } else {
            self.next_unique()
        }
    }

    /// Pull up to `chunk_size` tuples. Always strictly non-empty except
    /// possibly the final chunk (§4.3); returns `None` once exhausted.
    pub fn next_chunk(&mut self, chunk_size: usize) -> Option<Vec<Vec<&'static str>>> {
        let mut chunk = Vec::with_capacity(chunk_size);
        while chunk.len() < chunk_size {
            match self.next() {
                Some(tuple) => chunk.push(tuple),
                None => break,
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    fn next_repeating(&mut self) -> Option<Vec<&'static str>> {
        let digits = self.digits.take()?;
        let tuple: Vec<&'static str> = digits
            .iter()
            .enumerate()
            .map(|(i, &d)| self.positions[i].candidates[d])
            .collect();

        let mut next = digits;
        let mut i = next.len();
        loop {
            if i == 0 {
                self.digits = None;
                break;
            }
            i -= 1;
            next[i] += 1;
            if next[i] < self.positions[i].candidates.len() {
                self.digits = Some(next);
                break;
            }
            next[i] = 0;
        }
        Some(tuple)
    }

    fn next_unique(&mut self) -> Option<Vec<&'static str>> {
        let k = self.positions.len();

        let (mut depth, mut start_idx) = if self.chosen.len() == k {
            let last = self.chosen.pop().unwrap();
            let word = self.positions[k - 1].candidates[last];
            self.used.remove(word);
            (k - 1, last + 1)
        } else {
            (self.chosen.len(), 0usize)
        };

        loop {
            if depth == k {
                let tuple: Vec<&'static str> = self
                    .chosen
                    .iter()
                    .enumerate()
                    .map(|(i, &idx)| self.positions[i].candidates[idx])
                    .collect();
                return Some(tuple);
            }

            let candidates = &self.positions[depth].candidates;
            let found = (start_idx..candidates.len()).find(|&i| {
                let w = candidates[i];
                !self.fixed.contains(w) && !self.used.contains(w)
            });

            match found {
                Some(i) => {
                    self.used.insert(candidates[i]);
                    self.chosen.push(i);
                    depth += 1;
                    start_idx = 0;
                }
                None => {
                    if depth == 0 {
                        return None;
                    }
                    let popped = self.chosen.pop().unwrap();
                    let popped_word = self.positions[depth - 1].candidates[popped];
                    self.used.remove(popped_word);
                    depth -= 1;
                    start_idx = popped + 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(candidates: &[&'static str], kind: PositionKind) -> UnknownPosition {
        UnknownPosition {
            phrase_index: 0,
            kind,
            candidates: candidates.to_vec(),
        }
    }

    #[test]
    fn repeating_mode_is_a_bijection_with_mixed_radix_decode() {
        let positions = vec![
            position(&["a", "b", "c"], PositionKind::Prefix),
            position(&["x", "y"], PositionKind::Prefix),
        ];
        let mut enumerator = Enumerator::new(positions.clone(), HashSet::new(), true);
        assert_eq!(enumerator.total(), 6);

        let mut all = Vec::new();
        while let Some(t) = enumerator.next() {
            all.push(t);
        }
        assert_eq!(all.len(), 6);
        assert_eq!(
            all,
            vec![
                vec!["a", "x"],
                vec!["a", "y"],
                vec!["b", "x"],
                vec!["b", "y"],
                vec!["c", "x"],
                vec!["c", "y"],
            ]
        );

        for i in 0..6u128 {
            let mut e = Enumerator::new(positions.clone(), HashSet::new(), true);
            e.seek(i);
            assert_eq!(e.next().unwrap(), all[i as usize]);
        }
    }

    #[test]
    fn zero_unknown_positions_yields_exactly_one_empty_tuple() {
        let mut enumerator = Enumerator::new(Vec::new(), HashSet::new(), true);
        assert_eq!(enumerator.total(), 1);
        assert_eq!(enumerator.next(), Some(Vec::new()));
        assert_eq!(enumerator.next(), None);
    }

    #[test]
    fn chunking_respects_chunk_size_and_final_short_chunk() {
        let positions = vec![position(&["a", "b", "c", "d", "e"], PositionKind::Prefix)];
        let mut enumerator = Enumerator::new(positions, HashSet::new(), true);
        let c1 = enumerator.next_chunk(2).unwrap();
        assert_eq!(c1.len(), 2);
        let c2 = enumerator.next_chunk(2).unwrap();
        assert_eq!(c2.len(), 2);
        let c3 = enumerator.next_chunk(2).unwrap();
        assert_eq!(c3.len(), 1);
        assert!(enumerator.next_chunk(2).is_none());
    }

    #[test]
    fn without_repetition_never_repeats_a_fixed_or_sibling_word() {
        let positions = vec![
            position(&["a", "b", "c"], PositionKind::Prefix),
            position(&["a", "b", "c"], PositionKind::Prefix),
        ];
        let mut fixed = HashSet::new();
        fixed.insert("a");
        let mut enumerator = Enumerator::new(positions, fixed, false);
        let mut all = Vec::new();
        while let Some(t) = enumerator.next() {
            assert_ne!(t[0], "a");
            assert_ne!(t[1], "a");
            assert_ne!(t[0], t[1]);
            all.push(t);
        }
        // b,c permuted over 2 slots with 'a' excluded: exactly 2 tuples.
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn resume_at_last_index_emits_one_final_tuple_then_terminates() {
        let positions = vec![position(&["a", "b", "c"], PositionKind::Prefix)];
        let mut enumerator = Enumerator::new(positions, HashSet::new(), true);
        enumerator.seek(2);
        assert_eq!(enumerator.next(), Some(vec!["c"]));
        assert_eq!(enumerator.next(), None);
    }

    #[test]
    fn without_repetition_seek_fast_forwards_exactly() {
        let positions = vec![
            position(&["a", "b", "c"], PositionKind::Prefix),
            position(&["a", "b", "c"], PositionKind::Prefix),
        ];
        let mut full = Enumerator::new(positions.clone(), HashSet::new(), false);
        let mut all = Vec::new();
        while let Some(t) = full.next() {
            all.push(t);
        }
        assert_eq!(all.len(), 6); // 3*2 permutations without repetition

        for i in 0..all.len() {
            let mut e = Enumerator::new(positions.clone(), HashSet::new(), false);
            e.seek(i as u128);
            assert_eq!(e.next().unwrap(), all[i]);
        }
    }
}
