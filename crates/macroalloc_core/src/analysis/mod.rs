//! Simulation analysis and ranking
//!
//! Turns the simulated value paths of each candidate into [`PortfolioMetrics`]
//! and orders the candidates by composite score:
//!
//! ```ignore
//! use macroalloc_core::analysis::{ScoringConfig, SimulationAnalyzer};
//!
//! let analyzer = SimulationAnalyzer::new(ScoringConfig::default())?;
//! let (scored, warning) = analyzer.score(candidate, &paths);
//! let ranked = analyzer.rank(vec![scored, ...]);
//! assert_eq!(ranked[0].rank, 1);
//! ```
//!
//! Ranking is a total order: score descending, then Sharpe descending (an
//! undefined Sharpe ranks lowest), then volatility ascending, then candidate id
//! ascending. Ranking an already ranked list leaves it unchanged.

mod config;
mod metrics;

use std::cmp::Ordering;

pub use config::{ReturnStatistic, ScoreWeights, ScoringConfig};
pub use metrics::VOLATILITY_EPSILON;

use crate::error::ConfigError;
use crate::model::{
    CandidatePortfolio, PortfolioMetrics, ScoredPortfolio, SimulationPath, SimulationWarning,
    WarningKind,
};

#[derive(Debug, Clone)]
pub struct SimulationAnalyzer {
    config: ScoringConfig,
}

impl SimulationAnalyzer {
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Metrics over all trials of one portfolio.
    #[must_use]
    pub fn analyze(&self, paths: &[SimulationPath]) -> PortfolioMetrics {
        metrics::compute(paths, &self.config)
    }

    /// Analyze one candidate. Zero volatility is reported as a warning.
    #[must_use]
    pub fn score(
        &self,
        portfolio: CandidatePortfolio,
        paths: &[SimulationPath],
    ) -> (ScoredPortfolio, Option<SimulationWarning>) {
        let metrics = self.analyze(paths);
        let warning = metrics.sharpe_ratio.is_none().then_some(SimulationWarning {
            candidate: portfolio.id,
            kind: WarningKind::ZeroVolatility,
        });
        (
            ScoredPortfolio {
                portfolio,
                metrics,
                rank: 0,
            },
            warning,
        )
    }

    /// Sort best first and assign ranks starting at 1.
    #[must_use]
    pub fn rank(&self, scored: Vec<ScoredPortfolio>) -> Vec<ScoredPortfolio> {
        rank(scored)
    }
}

/// Best-first ordering of scored portfolios.
pub fn compare(a: &ScoredPortfolio, b: &ScoredPortfolio) -> Ordering {
    b.metrics
        .score
        .total_cmp(&a.metrics.score)
        .then_with(|| match (a.metrics.sharpe_ratio, b.metrics.sharpe_ratio) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.metrics.volatility.total_cmp(&b.metrics.volatility))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Sort best first and assign ranks starting at 1.
#[must_use]
pub fn rank(mut scored: Vec<ScoredPortfolio>) -> Vec<ScoredPortfolio> {
    scored.sort_by(compare);
    for (i, s) in scored.iter_mut().enumerate() {
        s.rank = i + 1;
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateId;

    fn scored(id: u32, score: f64, sharpe: Option<f64>, volatility: f64) -> ScoredPortfolio {
        ScoredPortfolio {
            portfolio: CandidatePortfolio {
                id: CandidateId(id),
                weights: vec![1.0],
            },
            metrics: PortfolioMetrics {
                total_return: 0.0,
                annualized_return: 0.0,
                annualized_mean_return: 0.0,
                volatility,
                sharpe_ratio: sharpe,
                max_drawdown: 0.0,
                score,
            },
            rank: 0,
        }
    }

    #[test]
    fn test_rank_tie_breaks() {
        let ranked = rank(vec![
            scored(4, 0.5, None, 0.0),
            scored(3, 0.5, Some(1.0), 0.2),
            scored(2, 0.5, Some(1.0), 0.1),
            scored(1, 0.9, Some(0.1), 0.3),
            scored(0, 0.5, Some(1.0), 0.1),
        ]);
        let ids: Vec<u32> = ranked.iter().map(|s| s.id().0).collect();
        assert_eq!(ids, vec![1, 0, 2, 3, 4]);
        let ranks: Vec<usize> = ranked.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let once = rank(vec![
            scored(0, 0.1, Some(0.5), 0.1),
            scored(1, 0.3, None, 0.0),
            scored(2, 0.2, Some(0.2), 0.2),
        ]);
        let twice = rank(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_flat_paths_warn_zero_volatility() {
        let analyzer = SimulationAnalyzer::new(ScoringConfig::default()).unwrap();
        let flat = SimulationPath {
            values: vec![1.0; 10],
        };
        let candidate = CandidatePortfolio {
            id: CandidateId(7),
            weights: vec![1.0],
        };
        let (scored, warning) = analyzer.score(candidate, &[flat.clone(), flat]);
        assert_eq!(scored.metrics.volatility, 0.0);
        assert_eq!(scored.metrics.sharpe_ratio, None);
        assert_eq!(
            warning,
            Some(SimulationWarning {
                candidate: CandidateId(7),
                kind: WarningKind::ZeroVolatility
            })
        );
    }

    #[test]
    fn test_invalid_scoring_config() {
        let config = ScoringConfig {
            periods_per_year: 0.0,
            ..Default::default()
        };
        assert!(SimulationAnalyzer::new(config).is_err());
    }
}
