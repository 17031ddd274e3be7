use std::mem;

use aligned_vec::{AVec, ConstAlign};

use crate::board::Move;
use crate::constants::SCORE_MATE_IN_MAX_PLY;
use crate::types::{Depth, Score};

/// Entries sharing one index slot.
const CLUSTER_SIZE: usize = 4;

/// Alignment of the entry storage in bytes.
const TT_ALIGN: usize = 64;

/// How a stored score relates to the true negamax value.
///
/// `Lower` comes from a beta cutoff, `Upper` from a node where no move beat
/// alpha. `None` marks an empty slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    #[default]
    None = 0,
    Lower = 1,
    Upper = 2,
    Exact = 3,
}

impl Bound {
    /// Classifies a search result against the window it was searched with.
    ///
    /// # Arguments
    ///
    /// * `best_score` - Score returned by the node
    /// * `alpha` - Alpha at node entry, before any improvement
    /// * `beta` - Beta the node was searched with
    #[inline]
    pub fn classify(best_score: Score, alpha: Score, beta: Score) -> Bound {
        if best_score >= beta {
            Bound::Lower
        } else if best_score <= alpha {
            Bound::Upper
        } else {
            Bound::Exact
        }
    }
}

/// One cached search result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TTData {
    /// Full Zobrist key of the position
    pub key: u64,
    /// Score, with mate scores relative to this node
    pub score: Score,
    /// Best or refuting move found during search
    pub best_move: Option<Move>,
    pub bound: Bound,
    /// Remaining depth at which this position was searched
    pub depth: Depth,
    /// Search generation that wrote the entry
    pub generation: u8,
}

impl TTData {
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.bound != Bound::None
    }

    /// Searches elapsed since the entry was written.
    #[inline]
    fn relative_age(&self, generation: u8) -> i32 {
        generation.wrapping_sub(self.generation) as i32
    }

    /// Replacement score; lower values are evicted first.
    #[inline]
    fn replace_score(&self, generation: u8) -> i32 {
        if !self.is_occupied() {
            return i32::MIN;
        }
        self.depth as i32 - self.relative_age(generation) * 8
    }
}

/// Converts a score to its stored form, making mate scores node-relative.
#[inline]
pub fn score_to_tt(score: Score, ply: usize) -> Score {
    if score >= SCORE_MATE_IN_MAX_PLY {
        score + ply as Score
    } else if score <= -SCORE_MATE_IN_MAX_PLY {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`].
#[inline]
pub fn score_from_tt(score: Score, ply: usize) -> Score {
    if score >= SCORE_MATE_IN_MAX_PLY {
        score - ply as Score
    } else if score <= -SCORE_MATE_IN_MAX_PLY {
        score + ply as Score
    } else {
        score
    }
}

/// Clustered transposition table keyed by Zobrist hash.
pub struct TranspositionTable {
    entries: AVec<TTData, ConstAlign<TT_ALIGN>>,
    cluster_count: u64,
    generation: u8,
}

impl TranspositionTable {
    /// Allocates a table of roughly `mb_size` megabytes.
    ///
    /// Zero yields a minimal table of 16 clusters, handy in tests.
    pub fn new(mb_size: usize) -> Self {
        let cluster_count = if mb_size == 0 {
            16
        } else {
            let cluster_byte_size = mem::size_of::<TTData>() * CLUSTER_SIZE;
            ((mb_size as u64 * 1024 * 1024) / cluster_byte_size as u64).max(1)
        };
        let entries_size = cluster_count as usize * CLUSTER_SIZE;

        TranspositionTable {
            entries: AVec::from_iter(TT_ALIGN, (0..entries_size).map(|_| TTData::default())),
            cluster_count,
            generation: 0,
        }
    }

    /// Empties every slot and resets the generation.
    pub fn clear(&mut self) {
        self.entries.fill(TTData::default());
        self.generation = 0;
    }

    /// Advances the generation so entries from earlier searches age out.
    pub fn increment_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Looks up `key` in its cluster.
    ///
    /// # Returns
    ///
    /// The entry for `key` if present, and the slot a new result for `key`
    /// should be written to: the matching entry, else the cluster's weakest.
    pub fn probe(&self, key: u64) -> (Option<&TTData>, usize) {
        let base = self.cluster_index(key);
        let cluster = &self.entries[base..base + CLUSTER_SIZE];

        if let Some(i) = cluster.iter().position(|e| e.is_occupied() && e.key == key) {
            return (Some(&cluster[i]), base + i);
        }

        let mut replace_idx = 0;
        let mut replace_score = cluster[0].replace_score(self.generation);
        for (i, entry) in cluster.iter().enumerate().skip(1) {
            let score = entry.replace_score(self.generation);
            if score < replace_score {
                replace_score = score;
                replace_idx = i;
            }
        }

        (None, base + replace_idx)
    }

    /// Writes a search result to slot `entry_index`.
    ///
    /// An existing entry for the same key is only overwritten by an exact
    /// bound, an equal-or-deeper search, or when it is from an older search.
    /// Its best move is kept when the new result has none.
    ///
    /// # Arguments
    ///
    /// * `entry_index` - Slot obtained from [`TranspositionTable::probe`]
    /// * `key` - Zobrist key of the position
    /// * `score` - Score already converted with [`score_to_tt`]
    /// * `bound` - How `score` bounds the true value
    /// * `depth` - Remaining depth the node was searched to
    /// * `best_move` - Best or refuting move, if one was found
    pub fn store(
        &mut self,
        entry_index: usize,
        key: u64,
        score: Score,
        bound: Bound,
        depth: Depth,
        best_move: Option<Move>,
    ) {
        let generation = self.generation;
        let Some(entry) = self.entries.get_mut(entry_index) else {
            return;
        };

        let same_key = entry.is_occupied() && entry.key == key;
        if same_key
            && bound != Bound::Exact
            && depth < entry.depth
            && entry.relative_age(generation) == 0
        {
            return;
        }

        let best_move = match best_move {
            None if same_key => entry.best_move.take(),
            mv => mv,
        };
        *entry = TTData {
            key,
            score,
            best_move,
            bound,
            depth,
            generation,
        };
    }

    /// Returns the best move stored for `key`, if any.
    pub fn best_move(&self, key: u64) -> Option<Move> {
        self.probe(key).0.and_then(|data| data.best_move.clone())
    }

    /// First slot of the cluster owning `key`.
    #[inline(always)]
    fn cluster_index(&self, key: u64) -> usize {
        (Self::mul_hi64(key, self.cluster_count) as usize) * CLUSTER_SIZE
    }

    /// High half of the 128-bit product, maps a key uniformly onto `0..b`.
    #[inline(always)]
    fn mul_hi64(a: u64, b: u64) -> u64 {
        let product = (a as u128) * (b as u128);
        (product >> 64) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::constants::SCORE_MATE;

    fn some_move() -> Move {
        Board::new().parse_uci("e2e4").unwrap()
    }

    #[test]
    fn test_bound_classify() {
        assert_eq!(Bound::classify(50, 0, 40), Bound::Lower);
        assert_eq!(Bound::classify(-5, 0, 40), Bound::Upper);
        assert_eq!(Bound::classify(0, 0, 40), Bound::Upper);
        assert_eq!(Bound::classify(20, 0, 40), Bound::Exact);
    }

    #[test]
    fn test_probe_and_store() {
        let mut tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        let (found, idx) = tt.probe(key);
        assert!(found.is_none());

        tt.store(idx, key, 42, Bound::Exact, 5, Some(some_move()));
        let (found, idx2) = tt.probe(key);
        let data = found.unwrap();
        assert_eq!(idx, idx2);
        assert_eq!(data.score, 42);
        assert_eq!(data.depth, 5);
        assert_eq!(data.bound, Bound::Exact);
        assert_eq!(tt.best_move(key), Some(some_move()));
    }

    #[test]
    fn test_replacement_policy() {
        let mut tt = TranspositionTable::new(1);
        let key = 77;
        let (_, idx) = tt.probe(key);
        tt.store(idx, key, 10, Bound::Lower, 6, Some(some_move()));

        // Shallower non-exact result in the same search is ignored
        tt.store(idx, key, 20, Bound::Upper, 3, None);
        assert_eq!(tt.probe(key).0.unwrap().score, 10);

        // Deeper result replaces but keeps the move
        tt.store(idx, key, 30, Bound::Upper, 7, None);
        let data = tt.probe(key).0.unwrap();
        assert_eq!(data.score, 30);
        assert_eq!(data.best_move, Some(some_move()));

        // Older entries are always replaceable
        tt.increment_generation();
        tt.store(idx, key, 40, Bound::Upper, 1, None);
        assert_eq!(tt.probe(key).0.unwrap().score, 40);
    }

    #[test]
    fn test_cluster_replacement_prefers_shallow() {
        let mut tt = TranspositionTable::new(0);
        // Keys with equal high bits land in the same cluster
        let keys: Vec<u64> = (1..=5).collect();
        for (depth, &key) in keys.iter().take(4).enumerate() {
            let (_, idx) = tt.probe(key);
            tt.store(idx, key, 0, Bound::Exact, depth as Depth + 1, None);
        }
        let (found, idx) = tt.probe(keys[4]);
        assert!(found.is_none());
        tt.store(idx, keys[4], 0, Bound::Exact, 9, None);
        // Depth-1 entry was evicted
        assert!(tt.probe(keys[0]).0.is_none());
        assert!(tt.probe(keys[3]).0.is_some());
    }

    #[test]
    fn test_clear() {
        let mut tt = TranspositionTable::new(1);
        let (_, idx) = tt.probe(9);
        tt.store(idx, 9, 1, Bound::Exact, 1, None);
        tt.clear();
        assert!(tt.probe(9).0.is_none());
    }

    #[test]
    fn test_mate_score_round_trip_through_ply() {
        let mate_in_3 = SCORE_MATE - 3;
        let stored = score_to_tt(mate_in_3, 2);
        assert_eq!(stored, SCORE_MATE - 1);
        assert_eq!(score_from_tt(stored, 2), mate_in_3);
        assert_eq!(score_to_tt(150, 9), 150);
    }

    #[test]
    fn test_mul_hi64() {
        assert_eq!(TranspositionTable::mul_hi64(u64::MAX, 16), 15);
        assert_eq!(TranspositionTable::mul_hi64(0, 16), 0);
    }
}
