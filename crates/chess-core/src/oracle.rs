//! Policy/value predictor interface consumed by MCTS.
//!
//! The search never inspects an oracle's internals. Anything that maps a
//! position to a policy over the action space and a value in `[-1, 1]` fits.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::board::Board;
use crate::move_index::MoveIndex;
use crate::types::Value;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle failed: {0}")]
    Failed(String),

    #[error("policy has {got} entries, action space has {expected}")]
    PolicyLength { expected: usize, got: usize },

    #[error("oracle value {0} is not finite")]
    NonFiniteValue(f32),
}

/// Raw oracle output for one position.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// One weight per action id. Need not be normalized or masked.
    pub policy: Vec<f32>,
    /// Expected outcome for the side to move.
    pub value: Value,
}

impl Prediction {
    /// Rejects outputs the search cannot use and clamps the value into range.
    pub fn validate(mut self, action_space_size: usize) -> Result<Prediction, OracleError> {
        if self.policy.len() != action_space_size {
            return Err(OracleError::PolicyLength {
                expected: action_space_size,
                got: self.policy.len(),
            });
        }
        if !self.value.is_finite() {
            return Err(OracleError::NonFiniteValue(self.value));
        }
        self.value = self.value.clamp(-1.0, 1.0);
        Ok(self)
    }
}

pub trait Oracle: Send {
    /// Predicts a policy over `index`'s action space and a value for `board`.
    fn predict(&mut self, board: &Board, index: &MoveIndex) -> Result<Prediction, OracleError>;
}

/// Uniform policy and a neutral value.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformOracle;

impl Oracle for UniformOracle {
    fn predict(&mut self, _board: &Board, index: &MoveIndex) -> Result<Prediction, OracleError> {
        let n = index.action_space_size();
        Ok(Prediction {
            policy: vec![1.0 / n as f32; n],
            value: 0.0,
        })
    }
}

/// Uniform-random policy and value from a seeded stream.
///
/// Stands in for a trained network when exercising the search.
#[derive(Clone, Debug)]
pub struct RandomOracle {
    rng: ChaCha8Rng,
}

impl RandomOracle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Oracle for RandomOracle {
    fn predict(&mut self, _board: &Board, index: &MoveIndex) -> Result<Prediction, OracleError> {
        let policy = (0..index.action_space_size())
            .map(|_| self.rng.random::<f32>())
            .collect();
        Ok(Prediction {
            policy,
            value: self.rng.random_range(-1.0..=1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_oracle_shape() {
        let index = MoveIndex::compact();
        let prediction = UniformOracle.predict(&Board::new(), &index).unwrap();
        assert_eq!(prediction.policy.len(), index.action_space_size());
        assert_eq!(prediction.value, 0.0);
    }

    #[test]
    fn test_random_oracle_is_seeded() {
        let index = MoveIndex::compact();
        let board = Board::new();
        let a = RandomOracle::new(5).predict(&board, &index).unwrap();
        let b = RandomOracle::new(5).predict(&board, &index).unwrap();
        assert_eq!(a, b);
        assert!((-1.0..=1.0).contains(&a.value));
    }

    #[test]
    fn test_validate() {
        let ok = Prediction {
            policy: vec![0.0; 3],
            value: 4.0,
        };
        assert_eq!(ok.validate(3).unwrap().value, 1.0);

        let short = Prediction {
            policy: vec![0.0; 2],
            value: 0.0,
        };
        assert!(matches!(
            short.validate(3),
            Err(OracleError::PolicyLength { expected: 3, got: 2 })
        ));

        let nan = Prediction {
            policy: vec![0.0; 3],
            value: f32::NAN,
        };
        assert!(matches!(nan.validate(3), Err(OracleError::NonFiniteValue(_))));
    }
}
