pub mod board;
pub mod config;
pub mod constants;
pub mod error;
pub mod eval;
pub mod logging;
pub mod move_index;
pub mod move_list;
pub mod oracle;
pub mod perft;
pub mod sampling;
pub mod search;
pub mod transposition_table;
pub mod types;
pub mod util;

pub use board::{Board, Move, Outcome, Terminal};
pub use config::EngineConfig;
pub use error::{ChessError, Result};
pub use move_index::{IndexKind, MoveIndex};
pub use oracle::{Oracle, Prediction};
pub use search::mcts::LeafEvaluator;
pub use search::search_result::SearchResult;
pub use search::{Engine, EngineKind, SearchLimits, Searcher};
