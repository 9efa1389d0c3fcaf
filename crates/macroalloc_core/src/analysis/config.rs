//! Scoring configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Statistic taken over final values across trials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatistic {
    #[default]
    Mean,
    Median,
}

/// Weights of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Applied to the annualized return
    pub return_weight: f64,
    /// Applied to the Sharpe ratio (0 when undefined)
    pub sharpe_weight: f64,
    /// Subtracted per unit of mean max drawdown
    pub drawdown_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            return_weight: 0.9,
            sharpe_weight: 0.1,
            drawdown_weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Annual risk-free rate used in the Sharpe ratio
    pub risk_free_rate: f64,
    /// Simulation periods per year (252 for daily data, 12 for monthly)
    pub periods_per_year: f64,
    pub return_statistic: ReturnStatistic,
    pub weights: ScoreWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 252.0,
            return_statistic: ReturnStatistic::Mean,
            weights: ScoreWeights::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "risk_free_rate",
                reason: "must be finite",
            });
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "periods_per_year",
                reason: "must be finite and positive",
            });
        }
        let w = &self.weights;
        if ![w.return_weight, w.sharpe_weight, w.drawdown_weight]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::InvalidParameter {
                name: "weights",
                reason: "score weights must be finite",
            });
        }
        Ok(())
    }
}
