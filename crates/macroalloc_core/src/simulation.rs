//! Monte Carlo simulation over resampled historical returns
//!
//! A run draws one [`ScenarioSet`] (which historical periods each trial replays)
//! and every candidate is evaluated against it. Whole return rows are resampled,
//! so the cross-asset correlation of each historical period is preserved; block
//! resampling also keeps short-range serial correlation.
//!
//! Buy-and-hold portfolios never trade, so their value is a weighted sum of the
//! per-asset growth paths. Those are computed once per scenario set in
//! [`AssetPaths`] and shared by all candidates.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimulationError};
use crate::model::{CandidatePortfolio, ReturnHistory, SimulationPath};
use crate::rng::stream_rng;

/// How historical periods are sampled for a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resampling {
    /// Independent draws with replacement
    Iid,
    /// Circular block bootstrap with fixed block length
    Block { length: usize },
}

impl Default for Resampling {
    fn default() -> Self {
        Resampling::Block { length: 20 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rebalancing {
    /// Weights drift with returns
    #[default]
    BuyAndHold,
    /// Reset to target weights after every `every` periods
    Periodic { every: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Periods per trial
    pub horizon: usize,
    pub trials: usize,
    pub resampling: Resampling,
    pub rebalancing: Rebalancing,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            horizon: 252,
            trials: 30,
            resampling: Resampling::default(),
            rebalancing: Rebalancing::default(),
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "horizon",
                reason: "must be at least 1",
            });
        }
        if self.trials == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "trials",
                reason: "must be at least 1",
            });
        }
        if let Resampling::Block { length: 0 } = self.resampling {
            return Err(ConfigError::InvalidParameter {
                name: "block_length",
                reason: "must be at least 1",
            });
        }
        if let Rebalancing::Periodic { every: 0 } = self.rebalancing {
            return Err(ConfigError::InvalidParameter {
                name: "rebalance_every",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Historical period indices replayed by each trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSet {
    horizon: usize,
    trials: usize,
    /// Length of the history the indices were drawn from
    history_len: usize,
    /// periods[trial * horizon + t]
    periods: Vec<u32>,
}

impl ScenarioSet {
    /// Draw `config.trials` scenarios. Trial `i` uses stream `i` of `seed`.
    pub fn draw(
        history: &ReturnHistory,
        config: &MonteCarloConfig,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut periods = Vec::with_capacity(config.trials * config.horizon);
        for trial in 0..config.trials {
            let mut rng = stream_rng(seed, trial as u64);
            match config.resampling {
                Resampling::Iid => history.sample_periods(&mut rng, config.horizon, &mut periods),
                Resampling::Block { length } => {
                    history.block_bootstrap_periods(&mut rng, config.horizon, length, &mut periods)
                }
            }
        }
        Ok(Self {
            horizon: config.horizon,
            trials: config.trials,
            history_len: history.len(),
            periods,
        })
    }

    #[must_use]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[must_use]
    pub fn trials(&self) -> usize {
        self.trials
    }

    #[must_use]
    pub fn trial(&self, trial: usize) -> &[u32] {
        &self.periods[trial * self.horizon..(trial + 1) * self.horizon]
    }
}

/// Cumulative growth of every asset along every trial, starting at 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPaths {
    num_assets: usize,
    horizon: usize,
    trials: usize,
    /// growth[(trial * (horizon + 1) + t) * num_assets + asset]
    growth: Vec<f64>,
}

impl AssetPaths {
    /// Compound every asset's returns along each trial of `scenarios`.
    pub fn compute(
        history: &ReturnHistory,
        scenarios: &ScenarioSet,
    ) -> Result<Self, SimulationError> {
        check_scenarios(history, scenarios)?;
        let n = history.num_assets();
        let steps = scenarios.horizon + 1;
        let mut growth = Vec::with_capacity(scenarios.trials * steps * n);
        for trial in 0..scenarios.trials {
            let start = growth.len();
            growth.extend(std::iter::repeat_n(1.0, n));
            for (t, &period) in scenarios.trial(trial).iter().enumerate() {
                let prev = start + t * n;
                let row = history.row(period as usize);
                for (asset, r) in row.iter().enumerate() {
                    let value = growth[prev + asset] * (1.0 + r);
                    growth.push(value);
                }
            }
        }
        Ok(Self {
            num_assets: n,
            horizon: scenarios.horizon,
            trials: scenarios.trials,
            growth,
        })
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.num_assets
    }

    #[inline]
    fn step(&self, trial: usize, t: usize) -> &[f64] {
        let offset = (trial * (self.horizon + 1) + t) * self.num_assets;
        &self.growth[offset..offset + self.num_assets]
    }

    /// Per-asset growth path averaged over trials; `[asset][t]`.
    #[must_use]
    pub fn mean_paths(&self) -> Vec<Vec<f64>> {
        let mut means = vec![vec![0.0; self.horizon + 1]; self.num_assets];
        for trial in 0..self.trials {
            for t in 0..=self.horizon {
                for (asset, g) in self.step(trial, t).iter().enumerate() {
                    means[asset][t] += g;
                }
            }
        }
        let trials = self.trials as f64;
        for path in &mut means {
            for v in path.iter_mut() {
                *v /= trials;
            }
        }
        means
    }

    /// Buy-and-hold value paths for the given weights.
    fn weighted_paths(&self, weights: &[f64]) -> Vec<SimulationPath> {
        let held: Vec<(usize, f64)> = weights
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, w)| *w != 0.0)
            .collect();
        (0..self.trials)
            .map(|trial| SimulationPath {
                values: (0..=self.horizon)
                    .map(|t| {
                        let step = self.step(trial, t);
                        held.iter().map(|&(i, w)| w * step[i]).sum()
                    })
                    .collect(),
            })
            .collect()
    }
}

fn check_scenarios(history: &ReturnHistory, scenarios: &ScenarioSet) -> Result<(), SimulationError> {
    if scenarios.history_len != history.len() {
        return Err(SimulationError::ScenarioMismatch {
            expected: history.len(),
            found: scenarios.history_len,
        });
    }
    Ok(())
}

/// Simulates candidate portfolios against one return history
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator<'a> {
    history: &'a ReturnHistory,
    config: MonteCarloConfig,
}

impl<'a> MonteCarloSimulator<'a> {
    pub fn new(history: &'a ReturnHistory, config: MonteCarloConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { history, config })
    }

    #[must_use]
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub fn draw_scenarios(&self, seed: u64) -> Result<ScenarioSet, SimulationError> {
        ScenarioSet::draw(self.history, &self.config, seed)
    }

    pub fn asset_paths(&self, scenarios: &ScenarioSet) -> Result<AssetPaths, SimulationError> {
        AssetPaths::compute(self.history, scenarios)
    }

    /// Draw scenarios from `seed` and simulate one portfolio.
    pub fn simulate(
        &self,
        portfolio: &CandidatePortfolio,
        seed: u64,
    ) -> Result<Vec<SimulationPath>, SimulationError> {
        let scenarios = self.draw_scenarios(seed)?;
        self.simulate_scenarios(portfolio, &scenarios)
    }

    /// Simulate one portfolio over an existing scenario set.
    pub fn simulate_scenarios(
        &self,
        portfolio: &CandidatePortfolio,
        scenarios: &ScenarioSet,
    ) -> Result<Vec<SimulationPath>, SimulationError> {
        match self.config.rebalancing {
            Rebalancing::BuyAndHold => {
                let paths = self.asset_paths(scenarios)?;
                self.simulate_with_paths(portfolio, scenarios, &paths)
            }
            Rebalancing::Periodic { every } => {
                self.check_weights(portfolio)?;
                check_scenarios(self.history, scenarios)?;
                Ok(self.rebalanced_paths(&portfolio.weights, scenarios, every))
            }
        }
    }

    /// Simulate with shared precomputed asset paths. Periodic rebalancing
    /// trades along the way and replays the scenarios instead.
    pub fn simulate_with_paths(
        &self,
        portfolio: &CandidatePortfolio,
        scenarios: &ScenarioSet,
        asset_paths: &AssetPaths,
    ) -> Result<Vec<SimulationPath>, SimulationError> {
        self.check_weights(portfolio)?;
        check_scenarios(self.history, scenarios)?;
        match self.config.rebalancing {
            Rebalancing::BuyAndHold => {
                if asset_paths.num_assets != portfolio.weights.len() {
                    return Err(SimulationError::WeightMismatch {
                        expected: asset_paths.num_assets,
                        found: portfolio.weights.len(),
                    });
                }
                Ok(asset_paths.weighted_paths(&portfolio.weights))
            }
            Rebalancing::Periodic { every } => {
                Ok(self.rebalanced_paths(&portfolio.weights, scenarios, every))
            }
        }
    }

    fn check_weights(&self, portfolio: &CandidatePortfolio) -> Result<(), SimulationError> {
        if portfolio.weights.len() != self.history.num_assets() {
            return Err(SimulationError::WeightMismatch {
                expected: self.history.num_assets(),
                found: portfolio.weights.len(),
            });
        }
        Ok(())
    }

    fn rebalanced_paths(&self, weights: &[f64], scenarios: &ScenarioSet, every: usize) -> Vec<SimulationPath> {
        let mut holdings = vec![0.0; weights.len()];
        (0..scenarios.trials)
            .map(|trial| {
                holdings.copy_from_slice(weights);
                let mut values = Vec::with_capacity(scenarios.horizon + 1);
                values.push(holdings.iter().sum::<f64>());
                for (t, &period) in scenarios.trial(trial).iter().enumerate() {
                    let row = self.history.row(period as usize);
                    for (h, r) in holdings.iter_mut().zip(row) {
                        *h *= 1.0 + r;
                    }
                    let value: f64 = holdings.iter().sum();
                    values.push(value);
                    if (t + 1) % every == 0 {
                        for (h, w) in holdings.iter_mut().zip(weights) {
                            *h = value * w;
                        }
                    }
                }
                SimulationPath { values }
            })
            .collect()
    }
}
