//! Position handle over the `shakmaty` rules engine.
//!
//! This is the only module that talks to the rules engine directly. Searchers
//! see a narrow surface: legal move enumeration, make/unmake, terminal queries,
//! a Zobrist key and FEN serialization.

use std::fmt;
use std::ops::{Deref, DerefMut};

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};

pub use shakmaty::{Color, Move, MoveList, Piece, Role, Square};

use crate::error::{ChessError, Result};
use crate::types::Value;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Game-theoretic status of a position with no further play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// The side to move is checkmated.
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

impl Terminal {
    /// Outcome from the side to move's perspective.
    #[inline]
    pub fn value(self) -> Value {
        match self {
            Terminal::Checkmate => -1.0,
            Terminal::Stalemate | Terminal::InsufficientMaterial => 0.0,
        }
    }
}

/// Result of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Winner(Color),
    Draw,
}

/// A chess position with an undo stack.
#[derive(Clone, Debug, Default)]
pub struct Board {
    pos: Chess,
    history: Vec<Chess>,
}

impl Board {
    /// Creates the standard starting position.
    pub fn new() -> Board {
        Board::default()
    }

    /// Parses a position from FEN.
    ///
    /// # Arguments
    ///
    /// * `fen` - Position in Forsyth-Edwards notation
    ///
    /// # Returns
    ///
    /// The parsed board, or `ChessError::InvalidFen` when the string is
    /// malformed or describes an impossible position (e.g. a missing king).
    pub fn from_fen(fen: &str) -> Result<Board> {
        let invalid = |reason: String| ChessError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;

        Ok(Board {
            pos,
            history: Vec::new(),
        })
    }

    /// Serializes the current position to FEN.
    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    #[inline]
    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    #[inline]
    pub fn legal_moves(&self) -> MoveList {
        self.pos.legal_moves()
    }

    /// Returns the legal capturing moves, en passant included.
    pub fn captures(&self) -> MoveList {
        let mut moves = self.pos.legal_moves();
        moves.retain(|m| m.is_capture());
        moves
    }

    #[inline]
    pub fn is_capture(&self, mv: &Move) -> bool {
        mv.is_capture()
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.pos.board().piece_at(sq)
    }

    /// Number of pieces of the given color and role on the board.
    #[inline]
    pub fn count(&self, color: Color, role: Role) -> u32 {
        let board = self.pos.board();
        (board.by_role(role) & board.by_color(color)).count() as u32
    }

    #[inline]
    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    #[inline]
    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    #[inline]
    pub fn is_stalemate(&self) -> bool {
        self.pos.is_stalemate()
    }

    #[inline]
    pub fn is_insufficient_material(&self) -> bool {
        self.pos.is_insufficient_material()
    }

    /// Classifies the position as terminal, if it is.
    pub fn terminal(&self) -> Option<Terminal> {
        if self.pos.is_insufficient_material() {
            return Some(Terminal::InsufficientMaterial);
        }
        if self.pos.legal_moves().is_empty() {
            return Some(if self.pos.is_check() {
                Terminal::Checkmate
            } else {
                Terminal::Stalemate
            });
        }
        None
    }

    /// Like [`Board::terminal`] but reuses an already generated move list.
    pub fn terminal_with(&self, moves: &MoveList) -> Option<Terminal> {
        if self.pos.is_insufficient_material() {
            Some(Terminal::InsufficientMaterial)
        } else if moves.is_empty() {
            Some(if self.pos.is_check() {
                Terminal::Checkmate
            } else {
                Terminal::Stalemate
            })
        } else {
            None
        }
    }

    /// Game result, if the position is terminal.
    pub fn outcome(&self) -> Option<Outcome> {
        self.terminal().map(|terminal| match terminal {
            Terminal::Checkmate => Outcome::Winner(!self.turn()),
            Terminal::Stalemate | Terminal::InsufficientMaterial => Outcome::Draw,
        })
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.terminal().is_some()
    }

    /// Zobrist key of the current position.
    #[inline]
    pub fn key(&self) -> u64 {
        let hash: Zobrist64 = self.pos.zobrist_hash(EnPassantMode::Legal);
        hash.0
    }

    /// Number of moves currently on the undo stack.
    #[inline]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Plays `mv` and returns a guard that takes it back when dropped.
    ///
    /// `mv` must be legal in the current position.
    #[inline]
    pub fn push(&mut self, mv: &Move) -> MoveGuard<'_> {
        self.push_move(mv);
        MoveGuard { board: self }
    }

    /// Plays `mv` without a guard. Pair with [`Board::pop`].
    pub fn push_move(&mut self, mv: &Move) {
        self.history.push(self.pos.clone());
        self.pos.play_unchecked(mv);
    }

    /// Takes back the last move. Returns `false` if there was none.
    pub fn pop(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                self.pos = prev;
                true
            }
            None => false,
        }
    }

    /// Parses a UCI move token and checks it against the position.
    pub fn parse_uci(&self, token: &str) -> Result<Move> {
        let uci: UciMove = token
            .parse()
            .map_err(|_| ChessError::InvalidUci(token.to_string()))?;
        uci.to_move(&self.pos)
            .map_err(|_| ChessError::IllegalMove(token.to_string()))
    }

    /// Formats a move as a UCI token such as `e2e4` or `e7e8q`.
    pub fn uci(mv: &Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }

    pub(crate) fn position(&self) -> &Chess {
        &self.pos
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen())
    }
}

/// Scope guard returned by [`Board::push`].
pub struct MoveGuard<'a> {
    board: &'a mut Board,
}

impl Deref for MoveGuard<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        self.board.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position() {
        let board = Board::new();
        assert_eq!(board.fen(), START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.legal_moves().len(), 20);
        assert!(board.terminal().is_none());
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let mut board = Board::new();
        let key = board.key();
        let mv = board.parse_uci("e2e4").unwrap();
        {
            let child = board.push(&mv);
            assert_eq!(child.turn(), Color::Black);
            assert_ne!(child.key(), key);
            assert_eq!(child.ply(), 1);
        }
        assert_eq!(board.key(), key);
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn test_pop_on_empty_stack() {
        let mut board = Board::new();
        assert!(!board.pop());
    }

    #[test]
    fn test_missing_king_is_rejected() {
        let err = Board::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap_err();
        assert!(matches!(err, ChessError::InvalidFen { .. }));
    }

    #[test]
    fn test_garbage_fen_is_rejected() {
        assert!(Board::from_fen("not a fen").is_err());
    }

    #[test]
    fn test_terminal_states() {
        // Fool's mate
        let mate =
            Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert_eq!(mate.terminal(), Some(Terminal::Checkmate));
        assert!(mate.is_checkmate());
        assert_eq!(mate.outcome(), Some(Outcome::Winner(Color::Black)));

        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(stalemate.terminal(), Some(Terminal::Stalemate));
        assert_eq!(stalemate.outcome(), Some(Outcome::Draw));

        let kings = Board::from_fen("8/8/8/8/8/8/8/4K2k w - - 0 1").unwrap();
        assert_eq!(kings.terminal(), Some(Terminal::InsufficientMaterial));
        assert!(kings.is_game_over());
    }

    #[test]
    fn test_parse_uci_rejects_illegal() {
        let board = Board::new();
        assert!(matches!(
            board.parse_uci("e2e5"),
            Err(ChessError::IllegalMove(_))
        ));
        assert!(matches!(
            board.parse_uci("zz"),
            Err(ChessError::InvalidUci(_))
        ));
    }

    #[test]
    fn test_captures_include_en_passant() {
        let board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();
        let captures = board.captures();
        assert_eq!(captures.len(), 1);
        assert_eq!(Board::uci(&captures[0]), "e5f6");
    }

    #[test]
    fn test_piece_at_and_count() {
        let board = Board::new();
        assert_eq!(
            board.piece_at(Square::E1),
            Some(Piece {
                color: Color::White,
                role: Role::King
            })
        );
        assert_eq!(board.piece_at(Square::E4), None);
        assert_eq!(board.count(Color::Black, Role::Pawn), 8);
    }
}
