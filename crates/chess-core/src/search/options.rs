use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_QUIESCENCE_DEPTH};
use crate::search::mcts::MctsError;
use crate::types::Depth;

/// Options of the alpha-beta searcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaBetaOptions {
    pub tt_mb_size: usize,
    /// Iterative deepening stops after this depth unless limits say otherwise.
    pub max_depth: Depth,
    /// Maximum capture plies explored past the horizon.
    pub quiescence_depth: Depth,
    /// Keep transposition table contents between searches.
    pub keep_tt: bool,
}

impl AlphaBetaOptions {
    /// Create search options with the desired transposition-table size while
    /// relying on defaults for other parameters.
    #[must_use]
    pub fn new(tt_mb_size: usize) -> Self {
        AlphaBetaOptions {
            tt_mb_size,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Depth) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    #[must_use]
    pub fn with_quiescence_depth(mut self, depth: Depth) -> Self {
        self.quiescence_depth = depth;
        self
    }

    /// Reuse the transposition table across calls. Faster on consecutive
    /// positions of one game, at the cost of call-to-call determinism.
    #[must_use]
    pub fn with_keep_tt(mut self, keep_tt: bool) -> Self {
        self.keep_tt = keep_tt;
        self
    }
}

impl Default for AlphaBetaOptions {
    fn default() -> Self {
        AlphaBetaOptions {
            tt_mb_size: 16,
            max_depth: DEFAULT_MAX_DEPTH,
            quiescence_depth: DEFAULT_QUIESCENCE_DEPTH,
            keep_tt: false,
        }
    }
}

/// Options of the MCTS searcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsOptions {
    /// Exploration constant of the PUCT formula.
    pub c_puct: f32,
    pub dirichlet_alpha: f32,
    /// Weight of the Dirichlet noise mixed into root priors.
    pub dirichlet_epsilon: f32,
    /// Mix Dirichlet noise into root priors (self-play exploration).
    pub root_noise: bool,
    /// Move selection temperature; zero picks the most visited move.
    pub temperature: f32,
    /// Ply cap of random rollouts.
    pub rollout_max_moves: u32,
    /// Ply cap of the reported principal variation.
    pub pv_max_len: usize,
    /// Seed of the search's random stream; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl MctsOptions {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_root_noise(mut self, enabled: bool) -> Self {
        self.root_noise = enabled;
        self
    }

    #[must_use]
    pub fn with_c_puct(mut self, c_puct: f32) -> Self {
        self.c_puct = c_puct;
        self
    }

    /// Rejects values the search cannot run with.
    pub fn validate(&self) -> Result<(), MctsError> {
        if !(self.c_puct.is_finite() && self.c_puct > 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "c_puct must be finite and > 0",
            });
        }
        if !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha > 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "dirichlet_alpha must be finite and > 0",
            });
        }
        if !(0.0..=1.0).contains(&self.dirichlet_epsilon) {
            return Err(MctsError::InvalidConfig {
                msg: "dirichlet_epsilon must be in [0, 1]",
            });
        }
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "temperature must be finite and >= 0",
            });
        }
        Ok(())
    }
}

impl Default for MctsOptions {
    fn default() -> Self {
        MctsOptions {
            c_puct: 1.5,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
            root_noise: false,
            temperature: 0.0,
            rollout_max_moves: 50,
            pv_max_len: 10,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ab = AlphaBetaOptions::default();
        assert_eq!(ab.max_depth, 10);
        assert_eq!(ab.quiescence_depth, 3);
        assert!(!ab.keep_tt);

        let mcts = MctsOptions::default();
        assert_eq!(mcts.c_puct, 1.5);
        assert_eq!(mcts.rollout_max_moves, 50);
        assert!(mcts.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let ab = AlphaBetaOptions::new(4).with_max_depth(0).with_keep_tt(true);
        assert_eq!(ab.tt_mb_size, 4);
        assert_eq!(ab.max_depth, 1);
        assert!(ab.keep_tt);

        let mcts = MctsOptions::default().with_seed(9).with_temperature(1.0);
        assert_eq!(mcts.seed, Some(9));
        assert_eq!(mcts.temperature, 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MctsOptions::default().with_c_puct(0.0).validate().is_err());
        assert!(MctsOptions::default().with_c_puct(f32::NAN).validate().is_err());
        assert!(MctsOptions::default().with_temperature(-1.0).validate().is_err());
        let eps = MctsOptions {
            dirichlet_epsilon: 1.5,
            ..Default::default()
        };
        assert!(eps.validate().is_err());
    }
}
