//! Metric computations over simulated value paths.

use crate::model::{PortfolioMetrics, SimulationPath};

use super::config::{ReturnStatistic, ScoringConfig};

/// Volatility below this is reported as exactly zero.
pub const VOLATILITY_EPSILON: f64 = 1e-12;

/// Mean or median of `values`. Empty input yields `None`.
pub(crate) fn statistic(values: &mut [f64], stat: ReturnStatistic) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match stat {
        ReturnStatistic::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        ReturnStatistic::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                Some((values[mid - 1] + values[mid]) / 2.0)
            } else {
                Some(values[mid])
            }
        }
    }
}

/// Mean and population standard deviation of every per-period return of
/// every trial, pooled.
fn pooled_moments(paths: &[SimulationPath]) -> Option<(f64, f64)> {
    let mut n = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    // Welford
    for r in paths.iter().flat_map(SimulationPath::period_returns) {
        n += 1;
        let delta = r - mean;
        mean += delta / n as f64;
        m2 += delta * (r - mean);
    }
    (n > 0).then(|| (mean, (m2 / n as f64).max(0.0).sqrt()))
}

pub(crate) fn compute(paths: &[SimulationPath], config: &ScoringConfig) -> PortfolioMetrics {
    let horizon = paths.first().map_or(0, SimulationPath::horizon);
    let mut finals: Vec<f64> = paths.iter().map(SimulationPath::final_value).collect();

    let (Some(final_stat), Some((mean_return, std_dev))) = (
        statistic(&mut finals, config.return_statistic),
        pooled_moments(paths),
    ) else {
        return PortfolioMetrics {
            total_return: 0.0,
            annualized_return: 0.0,
            annualized_mean_return: 0.0,
            volatility: 0.0,
            sharpe_ratio: None,
            max_drawdown: 0.0,
            score: 0.0,
        };
    };

    let ppy = config.periods_per_year;
    let total_return = final_stat - 1.0;
    let annualized_return = if final_stat > 0.0 {
        final_stat.powf(ppy / horizon as f64) - 1.0
    } else {
        -1.0
    };
    let annualized_mean_return = mean_return * ppy;

    let volatility = std_dev * ppy.sqrt();
    let volatility = if volatility < VOLATILITY_EPSILON {
        0.0
    } else {
        volatility
    };
    let sharpe_ratio =
        (volatility > 0.0).then(|| (annualized_mean_return - config.risk_free_rate) / volatility);

    let max_drawdown =
        paths.iter().map(SimulationPath::max_drawdown).sum::<f64>() / paths.len() as f64;

    let w = &config.weights;
    let score = w.return_weight * annualized_return + w.sharpe_weight * sharpe_ratio.unwrap_or(0.0)
        - w.drawdown_weight * max_drawdown;

    PortfolioMetrics {
        total_return,
        annualized_return,
        annualized_mean_return,
        volatility,
        sharpe_ratio,
        max_drawdown,
        score,
    }
}
