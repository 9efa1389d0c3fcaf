//! Simulation outputs: value paths, per-portfolio metrics and ranked results

use serde::{Deserialize, Serialize};

use super::ids::CandidateId;
use super::portfolio::CandidatePortfolio;

/// Portfolio value over one simulated trial, starting at 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPath {
    /// `horizon + 1` observations; `values[0] == 1.0`
    pub values: Vec<f64>,
}

impl SimulationPath {
    #[must_use]
    pub fn final_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(1.0)
    }

    /// Number of simulated periods.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// Per-period simple returns.
    pub fn period_returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.windows(2).map(|w| w[1] / w[0] - 1.0)
    }

    /// Largest peak-to-trough decline as a fraction of the peak.
    #[must_use]
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = f64::NEG_INFINITY;
        let mut worst = 0.0_f64;
        for &v in &self.values {
            peak = peak.max(v);
            if peak > 0.0 {
                worst = worst.max((peak - v) / peak);
            }
        }
        worst
    }
}

/// Metrics derived from all simulated paths of one portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Final value statistic across trials minus 1
    pub total_return: f64,
    /// Compound annual growth implied by the final value statistic
    pub annualized_return: f64,
    /// Mean per-period return scaled to a year
    pub annualized_mean_return: f64,
    /// Annualized standard deviation of per-period returns
    pub volatility: f64,
    /// (annualized mean return - risk-free rate) / volatility. The numerator is
    /// the arithmetic mean, not `annualized_return`. `None` when volatility is zero
    pub sharpe_ratio: Option<f64>,
    /// Mean over trials of the maximum drawdown
    pub max_drawdown: f64,
    /// Composite score used for ranking
    pub score: f64,
}

/// A candidate together with its metrics and final rank (1 = best)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPortfolio {
    pub portfolio: CandidatePortfolio,
    pub metrics: PortfolioMetrics,
    /// 0 until ranked
    pub rank: usize,
}

impl ScoredPortfolio {
    #[must_use]
    pub fn id(&self) -> CandidateId {
        self.portfolio.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Simulated returns have zero variance; Sharpe ratio is undefined
    ZeroVolatility,
}

/// Non-fatal condition recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationWarning {
    pub candidate: CandidateId,
    pub kind: WarningKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_returns_and_drawdown() {
        let path = SimulationPath {
            values: vec![1.0, 1.1, 0.88, 0.99, 1.2],
        };
        assert_eq!(path.horizon(), 4);
        assert_eq!(path.final_value(), 1.2);

        let returns: Vec<f64> = path.period_returns().collect();
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.2).abs() < 1e-12);

        // Peak 1.1, trough 0.88
        assert!((path.max_drawdown() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_path_has_no_drawdown() {
        let path = SimulationPath {
            values: vec![1.0, 1.01, 1.02],
        };
        assert_eq!(path.max_drawdown(), 0.0);
    }
}
