//! End-to-end run: classify, allocate, generate, simulate, score, rank.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationRule, RuleTable};
use crate::analysis::{ScoringConfig, SimulationAnalyzer};
use crate::error::{DataError, RunError, SimulationError};
use crate::generator::{GeneratorConfig, PortfolioGenerator};
use crate::model::{
    AllocationTarget, AssetCatalog, CandidatePortfolio, MacroHistory, MacroVector, ReturnHistory,
    ScoredPortfolio, SimulationPath, SimulationWarning, Strategy,
};
use crate::regime::{
    Classification, ClassifierConfig, NearestPeriod, RegimeCentroid, RegimeClassifier,
};
use crate::rng::{GENERATION_STREAM, SCENARIO_STREAM, derive_seed};
use crate::simulation::{AssetPaths, MonteCarloConfig, MonteCarloSimulator, ScenarioSet};

/// Data a run reads. Nothing here is modified.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub macro_history: MacroHistory,
    /// Macro conditions to classify
    pub current: MacroVector,
    pub catalog: AssetCatalog,
    pub rules: Vec<AllocationRule>,
    /// Columns in catalog order
    pub returns: ReturnHistory,
    /// Replaces the rule table's bands when present
    pub custom_allocation: Option<AllocationTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    pub num_portfolios: usize,
    pub seed: u64,
    /// Use this strategy instead of the regime default
    pub strategy: Option<Strategy>,
    /// Historical periods to report as closest to the current conditions
    pub nearest_periods: usize,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            num_portfolios: 1000,
            seed: 42,
            strategy: None,
            nearest_periods: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub classifier: ClassifierConfig,
    pub generator: GeneratorConfig,
    pub monte_carlo: MonteCarloConfig,
    pub scoring: ScoringConfig,
    pub run: RunParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub classification: Classification,
    /// Named clusters, highest growth first
    pub regimes: Vec<RegimeCentroid>,
    pub nearest_periods: Vec<NearestPeriod>,
    pub strategy: Strategy,
    pub strategy_overridden: bool,
    /// `allocation` came from the caller instead of the rule table
    pub custom_allocation: bool,
    pub allocation: AllocationTarget,
    /// Asset symbols in weight order
    pub assets: Vec<String>,
    /// Best first
    pub ranked: Vec<ScoredPortfolio>,
    pub requested_candidates: usize,
    pub dropped_candidates: usize,
    pub warnings: Vec<SimulationWarning>,
    /// Best portfolio's value averaged over trials
    pub best_mean_path: Vec<f64>,
    /// `[asset][t]` growth averaged over trials
    pub asset_mean_paths: Vec<Vec<f64>>,
}

impl RunReport {
    #[must_use]
    pub fn best(&self) -> Option<&ScoredPortfolio> {
        self.ranked.first()
    }

    /// Candidates whose Sharpe ratio is undefined.
    #[must_use]
    pub fn degenerate_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Execute the full pipeline. Deterministic for a given `config.run.seed`.
pub fn run(inputs: &RunInputs, config: &RunConfig) -> Result<RunReport, RunError> {
    if inputs.catalog.len() != inputs.returns.num_assets() {
        return Err(DataError::MisalignedSeries {
            expected: inputs.catalog.len(),
            found: inputs.returns.num_assets(),
        }
        .into());
    }

    // 1. Regime
    let classifier = RegimeClassifier::train(&inputs.macro_history, &config.classifier)?;
    let classification = classifier.classify(&inputs.current)?;
    let nearest_periods = classifier.nearest_periods(&inputs.current, config.run.nearest_periods)?;
    tracing::info!(
        regime = %classification.regime,
        distance = classification.distance,
        "classified current macro conditions"
    );

    // 2. Allocation. A custom allocation replaces the rule table entirely.
    let (strategy, strategy_overridden, allocation) = match &inputs.custom_allocation {
        Some(custom) => {
            custom.validate("custom allocation")?;
            let strategy = config
                .run
                .strategy
                .unwrap_or_else(|| Strategy::for_regime(classification.regime));
            (strategy, config.run.strategy.is_some(), custom.clone())
        }
        None => {
            let table = RuleTable::from_rows(&inputs.rules, &classifier.regimes())?;
            let recommendation = table.recommend(classification.regime, config.run.strategy)?;
            (
                recommendation.strategy,
                recommendation.overridden,
                recommendation.target,
            )
        }
    };
    tracing::info!(
        %strategy,
        overridden = strategy_overridden,
        custom = inputs.custom_allocation.is_some(),
        "resolved allocation"
    );

    // 3. Candidates
    let generator = PortfolioGenerator::new(config.generator.clone());
    let population = generator.generate(
        &allocation,
        &inputs.catalog,
        config.run.num_portfolios,
        derive_seed(config.run.seed, GENERATION_STREAM),
    )?;
    tracing::info!(
        candidates = population.candidates.len(),
        dropped = population.dropped,
        "generated candidates"
    );

    // 4. Shared scenarios
    let simulator = MonteCarloSimulator::new(&inputs.returns, config.monte_carlo.clone())?;
    let scenarios = simulator.draw_scenarios(derive_seed(config.run.seed, SCENARIO_STREAM))?;
    let asset_paths = simulator.asset_paths(&scenarios)?;

    // 5. Simulate and score
    let analyzer = SimulationAnalyzer::new(config.scoring.clone())?;
    let evaluate = |candidate: CandidatePortfolio| {
        let paths = simulator.simulate_with_paths(&candidate, &scenarios, &asset_paths)?;
        Ok::<_, SimulationError>(analyzer.score(candidate, &paths))
    };

    #[cfg(feature = "parallel")]
    let outcomes = population
        .candidates
        .into_par_iter()
        .map(evaluate)
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(not(feature = "parallel"))]
    let outcomes = population
        .candidates
        .into_iter()
        .map(evaluate)
        .collect::<Result<Vec<_>, _>>()?;

    let mut scored = Vec::with_capacity(outcomes.len());
    let mut warnings = Vec::new();
    for (portfolio, warning) in outcomes {
        scored.push(portfolio);
        warnings.extend(warning);
    }
    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "candidates with zero volatility");
    }

    // 6. Rank
    let ranked = analyzer.rank(scored);
    let best_mean_path = match ranked.first() {
        Some(best) => mean_path(&simulator.simulate_with_paths(
            &best.portfolio,
            &scenarios,
            &asset_paths,
        )?),
        None => Vec::new(),
    };
    if let Some(best) = ranked.first() {
        tracing::info!(
            candidate = best.id().0,
            score = best.metrics.score,
            "best portfolio"
        );
    }

    Ok(RunReport {
        classification,
        regimes: classifier.centroids().to_vec(),
        nearest_periods,
        strategy,
        strategy_overridden,
        custom_allocation: inputs.custom_allocation.is_some(),
        allocation,
        assets: inputs.catalog.symbols(),
        ranked,
        requested_candidates: config.run.num_portfolios,
        dropped_candidates: population.dropped,
        warnings,
        best_mean_path,
        asset_mean_paths: asset_paths.mean_paths(),
    })
}

/// Draw the run's shared scenario set and asset paths without simulating any
/// candidate.
pub fn scenarios_for(
    returns: &ReturnHistory,
    config: &RunConfig,
) -> Result<(ScenarioSet, AssetPaths), SimulationError> {
    let simulator = MonteCarloSimulator::new(returns, config.monte_carlo.clone())?;
    let scenarios = simulator.draw_scenarios(derive_seed(config.run.seed, SCENARIO_STREAM))?;
    let paths = simulator.asset_paths(&scenarios)?;
    Ok((scenarios, paths))
}

fn mean_path(paths: &[SimulationPath]) -> Vec<f64> {
    let Some(first) = paths.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0; first.values.len()];
    for path in paths {
        for (m, v) in mean.iter_mut().zip(&path.values) {
            *m += v;
        }
    }
    let n = paths.len() as f64;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}
