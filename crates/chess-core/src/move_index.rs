//! Bijection between move shapes and dense action ids.
//!
//! A move shape is an `(origin, destination, promotion)` triple. Every shape a
//! legal chess move can take is registered once at construction, in a fixed
//! order, so ids are identical across runs and usable as indices into a flat
//! policy vector. Legality is never implied by an id: [`MoveIndex::from_id`]
//! re-checks against the live position.

use shakmaty::uci::UciMove;
use shakmaty::CastlingMode;

use crate::board::{Board, Move, Role, Square};
use crate::types::ActionId;
use crate::util::bitset::BitSet;

/// Promotion slots in registration order.
const PROMOTIONS: [Option<Role>; 5] = [
    None,
    Some(Role::Queen),
    Some(Role::Rook),
    Some(Role::Bishop),
    Some(Role::Knight),
];

/// Legal-move mask over the action space.
pub type LegalMask = BitSet;

const LOOKUP_SIZE: usize = 64 * 64 * PROMOTIONS.len();

/// The `(origin, destination, promotion)` triple behind an action id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoveShape {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl MoveShape {
    fn to_uci(self) -> UciMove {
        UciMove::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }
}

/// Which shapes the index registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Every ordered square pair with every promotion slot.
    #[default]
    Full,
    /// Only shapes a chess piece can actually make.
    Compact,
}

/// Immutable move/id mapping. Cheap to share behind an `Arc`.
#[derive(Clone, Debug)]
pub struct MoveIndex {
    shapes: Vec<MoveShape>,
    lookup: Vec<ActionId>,
}

impl Default for MoveIndex {
    fn default() -> Self {
        MoveIndex::new()
    }
}

impl MoveIndex {
    /// Id returned for shapes that were never registered.
    pub const UNKNOWN: ActionId = ActionId::MAX;

    /// Registers all `64 * 63 * 5` square-pair/promotion combinations.
    pub fn new() -> Self {
        Self::build(|_, _, _| true)
    }

    /// Registers only queen-line and knight-jump shapes, plus promotions from
    /// the seventh to the eighth rank (or second to first) for each piece.
    pub fn compact() -> Self {
        Self::build(is_reachable_shape)
    }

    pub fn with_kind(kind: IndexKind) -> Self {
        match kind {
            IndexKind::Full => Self::new(),
            IndexKind::Compact => Self::compact(),
        }
    }

    fn build(accept: impl Fn(u32, u32, Option<Role>) -> bool) -> Self {
        let mut shapes = Vec::new();
        let mut lookup = vec![Self::UNKNOWN; LOOKUP_SIZE];

        for from in 0..64u32 {
            for to in 0..64u32 {
                if from == to {
                    continue;
                }
                for (slot, &promotion) in PROMOTIONS.iter().enumerate() {
                    if !accept(from, to, promotion) {
                        continue;
                    }
                    lookup[lookup_index(from, to, slot)] = shapes.len();
                    shapes.push(MoveShape {
                        from: Square::new(from),
                        to: Square::new(to),
                        promotion,
                    });
                }
            }
        }

        MoveIndex { shapes, lookup }
    }

    /// Total number of registered shapes.
    #[inline]
    pub fn action_space_size(&self) -> usize {
        self.shapes.len()
    }

    /// Returns the shape registered under `id`.
    #[inline]
    pub fn shape(&self, id: ActionId) -> Option<MoveShape> {
        self.shapes.get(id).copied()
    }

    /// Returns the id of a shape, or [`MoveIndex::UNKNOWN`].
    pub fn shape_id(&self, shape: MoveShape) -> ActionId {
        let Some(slot) = promotion_slot(shape.promotion) else {
            return Self::UNKNOWN;
        };
        let (from, to) = (u32::from(shape.from), u32::from(shape.to));
        if from == to {
            return Self::UNKNOWN;
        }
        self.lookup[lookup_index(from, to, slot)]
    }

    /// Returns the id of `mv`, or [`MoveIndex::UNKNOWN`] for malformed moves.
    ///
    /// Castling is identified by the king's two-square step (`e1g1`).
    pub fn to_id(&self, mv: &Move) -> ActionId {
        match mv.to_uci(CastlingMode::Standard) {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => self.shape_id(MoveShape {
                from,
                to,
                promotion,
            }),
            _ => Self::UNKNOWN,
        }
    }

    /// Reconstructs the move behind `id` if it is legal in `board`.
    ///
    /// # Arguments
    ///
    /// * `id` - Any integer; out-of-range ids yield `None`
    /// * `board` - Position to check legality against
    ///
    /// # Returns
    ///
    /// The legal move whose id is exactly `id`, or `None`.
    pub fn from_id(&self, id: ActionId, board: &Board) -> Option<Move> {
        let shape = self.shape(id)?;
        let mv = shape.to_uci().to_move(board.position()).ok()?;
        (self.to_id(&mv) == id).then_some(mv)
    }

    /// Bitset over the action space with the legal moves of `board` set.
    pub fn legal_mask(&self, board: &Board) -> LegalMask {
        let mut mask = LegalMask::new(self.action_space_size());
        for mv in &board.legal_moves() {
            mask.set(self.to_id(mv));
        }
        mask
    }

    /// Ids of the legal moves of `board`, in move generation order.
    pub fn legal_ids(&self, board: &Board) -> Vec<ActionId> {
        board
            .legal_moves()
            .iter()
            .map(|mv| self.to_id(mv))
            .filter(|&id| id != Self::UNKNOWN)
            .collect()
    }

    /// Zeroes illegal entries of a policy vector and renormalizes it.
    ///
    /// Falls back to a uniform distribution over legal moves when the policy
    /// has the wrong length or carries no usable mass on legal moves. Returns
    /// an all-zero vector when `board` has no legal moves.
    pub fn mask_policy(&self, policy: &[f32], board: &Board) -> Vec<f32> {
        let mut masked = vec![0.0; self.action_space_size()];
        for (mv, prior) in self.legal_priors(policy, board) {
            let id = self.to_id(&mv);
            if id != Self::UNKNOWN {
                masked[id] = prior;
            }
        }
        masked
    }

    /// Pairs each legal move with its renormalized prior from `policy`.
    ///
    /// Negative, NaN and infinite entries count as zero.
    pub fn legal_priors(&self, policy: &[f32], board: &Board) -> Vec<(Move, f32)> {
        let moves = board.legal_moves();
        if moves.is_empty() {
            return Vec::new();
        }

        let usable = policy.len() == self.action_space_size();
        let mut priors: Vec<(Move, f32)> = moves
            .iter()
            .map(|mv| {
                let p = match self.to_id(mv) {
                    id if usable && id != Self::UNKNOWN => policy[id],
                    _ => 0.0,
                };
                let p = if p.is_finite() && p > 0.0 { p } else { 0.0 };
                (mv.clone(), p)
            })
            .collect();

        let total: f32 = priors.iter().map(|(_, p)| p).sum();
        if total > 0.0 && total.is_finite() {
            for (_, p) in priors.iter_mut() {
                *p /= total;
            }
        } else {
            let uniform = 1.0 / priors.len() as f32;
            for (_, p) in priors.iter_mut() {
                *p = uniform;
            }
        }
        priors
    }
}

#[inline]
fn lookup_index(from: u32, to: u32, slot: usize) -> usize {
    (from as usize * 64 + to as usize) * PROMOTIONS.len() + slot
}

#[inline]
fn promotion_slot(promotion: Option<Role>) -> Option<usize> {
    PROMOTIONS.iter().position(|&p| p == promotion)
}

fn is_reachable_shape(from: u32, to: u32, promotion: Option<Role>) -> bool {
    let (from_file, from_rank) = ((from % 8) as i32, (from / 8) as i32);
    let (to_file, to_rank) = ((to % 8) as i32, (to / 8) as i32);
    let df = (from_file - to_file).abs();
    let dr = (from_rank - to_rank).abs();

    if promotion.is_some() {
        let white = from_rank == 6 && to_rank == 7;
        let black = from_rank == 1 && to_rank == 0;
        return df <= 1 && (white || black);
    }

    let queen_line = df == 0 || dr == 0 || df == dr;
    let knight_jump = (df == 1 && dr == 2) || (df == 2 && dr == 1);
    queen_line || knight_jump
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_space_sizes() {
        assert_eq!(MoveIndex::new().action_space_size(), 64 * 63 * 5);
        assert_eq!(MoveIndex::compact().action_space_size(), 1_968);
    }

    #[test]
    fn test_ids_are_stable() {
        let index = MoveIndex::new();
        let first = index.shape(0).unwrap();
        assert_eq!(first.from, Square::A1);
        assert_eq!(first.to, Square::B1);
        assert_eq!(first.promotion, None);
        assert_eq!(index.shape(1).unwrap().promotion, Some(Role::Queen));

        let again = MoveIndex::new();
        let board = Board::new();
        assert_eq!(index.legal_ids(&board), again.legal_ids(&board));
    }

    #[test]
    fn test_malformed_shapes_are_unknown() {
        let index = MoveIndex::new();
        let king_promo = MoveShape {
            from: Square::E7,
            to: Square::E8,
            promotion: Some(Role::King),
        };
        assert_eq!(index.shape_id(king_promo), MoveIndex::UNKNOWN);

        let null = MoveShape {
            from: Square::E2,
            to: Square::E2,
            promotion: None,
        };
        assert_eq!(index.shape_id(null), MoveIndex::UNKNOWN);

        let compact = MoveIndex::compact();
        let impossible = MoveShape {
            from: Square::A1,
            to: Square::B4,
            promotion: None,
        };
        assert_eq!(compact.shape_id(impossible), MoveIndex::UNKNOWN);
    }

    #[test]
    fn test_from_id_checks_legality() {
        let index = MoveIndex::new();
        let board = Board::new();
        let e2e5 = index.shape_id(MoveShape {
            from: Square::E2,
            to: Square::E5,
            promotion: None,
        });
        assert_ne!(e2e5, MoveIndex::UNKNOWN);
        assert_eq!(index.from_id(e2e5, &board), None);
        assert_eq!(index.from_id(MoveIndex::UNKNOWN, &board), None);
        assert_eq!(index.from_id(index.action_space_size(), &board), None);

        let e2e4 = board.parse_uci("e2e4").unwrap();
        assert_eq!(index.from_id(index.to_id(&e2e4), &board), Some(e2e4));
    }

    #[test]
    fn test_castling_and_promotion_ids() {
        let index = MoveIndex::compact();
        let board = Board::from_fen("r3k2r/1P6/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        for token in ["e1g1", "e1c1", "b7b8n", "b7a8q", "b7b8"] {
            let Ok(mv) = board.parse_uci(token) else {
                continue;
            };
            let id = index.to_id(&mv);
            assert_ne!(id, MoveIndex::UNKNOWN, "{token}");
            assert_eq!(index.from_id(id, &board), Some(mv), "{token}");
        }
    }

    #[test]
    fn test_legal_mask_matches_moves() {
        let index = MoveIndex::new();
        let board = Board::new();
        let mask = index.legal_mask(&board);
        assert_eq!(mask.count_ones(), 20);
        for mv in &board.legal_moves() {
            assert!(mask.contains(index.to_id(mv)));
        }
        assert_eq!(mask.iter_ones().count(), index.legal_ids(&board).len());
    }

    #[test]
    fn test_legal_priors_renormalize() {
        let index = MoveIndex::new();
        let board = Board::new();
        let e2e4 = board.parse_uci("e2e4").unwrap();
        let mut policy = vec![1.0; index.action_space_size()];
        policy[index.to_id(&e2e4)] = 19.0;

        let priors = index.legal_priors(&policy, &board);
        assert_eq!(priors.len(), 20);
        let sum: f32 = priors.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let (_, p) = priors.iter().find(|(m, _)| *m == e2e4).unwrap();
        assert!((p - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_policy_falls_back_to_uniform() {
        let index = MoveIndex::new();
        let board = Board::new();

        for policy in [
            vec![0.0; index.action_space_size()],
            vec![f32::NAN; index.action_space_size()],
            vec![1.0; 3],
        ] {
            let masked = index.mask_policy(&policy, &board);
            assert_eq!(masked.iter().filter(|&&p| p > 0.0).count(), 20);
            for id in index.legal_ids(&board) {
                assert!((masked[id] - 0.05).abs() < 1e-6);
            }
        }
    }
}
