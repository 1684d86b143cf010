//! # Per-regex alphabets
//! The subset construction does not operate on the full code-point space.
//! Each regex gets a three-tier alphabet: the [singles](Alphabet::singles)
//! that appear literally, the sorted disjoint [ranges](Alphabet::ranges)
//! contributed by character classes, and an implicit *wild* element standing
//! for every code point in neither set. A DFA edge per alphabet element is
//! enough, because the alphabet is refined until every element is
//! indistinguishable to every NFA edge of that regex.
//!
//! Ranges are kept as `u32` code points: interval splitting needs `hi + 1` /
//! `lo − 1` arithmetic, and those neighbours may fall into the surrogate gap
//! where no `char` exists.

use crate::nfa::{EdgeKind, Nfa};
use std::collections::BTreeSet;

/// The alphabet of a single regex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alphabet {
    /// Code points that appear literally (rune edges, degenerate class
    /// entries, and ranges that collapsed to one point).
    pub singles: BTreeSet<char>,
    /// Sorted, pairwise disjoint closed intervals, also disjoint from
    /// `singles`.
    pub ranges: Vec<(u32, u32)>,
}

impl Alphabet {
    /// Collects the alphabet of an NFA: every `Rune` edge feeds `singles`,
    /// every class interval is inserted into `ranges` with overlap
    /// splitting, then the result is [normalized](Alphabet::normalize).
    pub fn of(nfa: &Nfa) -> Alphabet {
        let mut alphabet = Alphabet::default();
        for node in nfa.nodes() {
            for edge in node.edges() {
                match &edge.kind {
                    EdgeKind::Rune(c) => {
                        alphabet.singles.insert(*c);
                    }
                    EdgeKind::Class { intervals, .. } => {
                        for &(lo, hi) in intervals {
                            if lo == hi {
                                if let Some(c) = char::from_u32(lo) {
                                    alphabet.singles.insert(c);
                                }
                            } else {
                                alphabet.insert_range(lo, hi);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        alphabet.normalize();
        alphabet
    }

    /// Splitting insertion of `[l, r]`, keeping `ranges` sorted and
    /// disjoint. Overlapping intervals are cut at each other's bounds; a
    /// fully covered insertion is dropped.
    pub(crate) fn insert_range(&mut self, l: u32, r: u32) {
        // Degenerate [l, l] arguments arise from the recursive splits; they
        // stay in `ranges` until `normalize` migrates them to singles.
        debug_assert!(l <= r, "reversed range");
        let Some(i) = self.ranges.iter().position(|&(_, hi)| hi >= l) else {
            self.ranges.push((l, r));
            return;
        };
        let (lo, hi) = self.ranges[i];
        if r < lo {
            // No overlap with any existing interval.
            self.ranges.insert(i, (l, r));
        } else if l < lo {
            // Split off the prefix that lies before the existing interval.
            self.ranges.insert(i, (l, lo - 1));
            self.insert_range(lo, r);
        } else if l > lo {
            // Cut the existing interval at l, then retry.
            self.ranges[i] = (lo, l - 1);
            self.ranges.insert(i + 1, (l, hi));
            self.insert_range(l, r);
        } else if r == hi {
            // Exact duplicate.
        } else if r < hi {
            // Cut the existing interval at r; the insertion is covered.
            self.ranges[i] = (lo, r);
            self.ranges.insert(i + 1, (r + 1, hi));
        } else {
            // The existing interval covers the prefix; insert the rest.
            self.insert_range(hi + 1, r);
        }
    }

    /// Restores the invariants the subset-construction probe relies on: no
    /// range may contain a code point that is also a single (a range is
    /// probed by its lower bound, which must be indistinguishable from the
    /// rest of the interval to every edge), and single-point ranges are
    /// represented as singles.
    fn normalize(&mut self) {
        let singles: Vec<u32> = self.singles.iter().map(|&c| c as u32).collect();
        for s in singles {
            self.remove_point(s);
        }
        let mut i = 0;
        while i < self.ranges.len() {
            let (lo, hi) = self.ranges[i];
            if lo == hi {
                self.ranges.remove(i);
                // Endpoints in the surrogate gap denote no scalar value.
                if let Some(c) = char::from_u32(lo) {
                    self.singles.insert(c);
                }
            } else {
                i += 1;
            }
        }
    }

    fn remove_point(&mut self, p: u32) {
        if let Some(i) = self.ranges.iter().position(|&(lo, hi)| lo <= p && p <= hi) {
            let (lo, hi) = self.ranges.remove(i);
            if p < hi {
                self.ranges.insert(i, (p + 1, hi));
            }
            if lo < p {
                self.ranges.insert(i, (lo, p - 1));
            }
        }
    }

    /// Whether the sorted/disjoint/disjoint-from-singles invariants hold.
    pub fn is_normalized(&self) -> bool {
        let sorted = self.ranges.windows(2).all(|w| w[0].1 < w[1].0);
        let no_single_inside = self.singles.iter().all(|&c| {
            let p = c as u32;
            !self.ranges.iter().any(|&(lo, hi)| lo <= p && p <= hi)
        });
        sorted && no_single_inside
    }
}
