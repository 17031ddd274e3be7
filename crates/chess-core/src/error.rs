//! Error types shared across the crate.
//!
//! Search entry points never return these: they degrade to a weaker result
//! instead. Errors only surface from construction-time operations such as
//! parsing FEN strings, time controls and configuration files.

use thiserror::Error;

use crate::config::ConfigError;
use crate::search::mcts::MctsError;

#[derive(Debug, Error)]
pub enum ChessError {
    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("invalid UCI move '{0}'")]
    InvalidUci(String),

    #[error("illegal move '{0}' in this position")]
    IllegalMove(String),

    #[error("invalid time control '{0}'")]
    InvalidTimeControl(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mcts(#[from] MctsError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ChessError>;
