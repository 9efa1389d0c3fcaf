//! Scenario files
//!
//! A scenario is a single YAML document holding everything a run needs: the
//! macro history, current conditions, asset catalog, price or return series,
//! allocation rules and optional configuration sections. Every configuration
//! section falls back to its defaults when omitted.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use macroalloc_core::allocation::{AllocationRule, RuleTable};
use macroalloc_core::analysis::ScoringConfig;
use macroalloc_core::generator::GeneratorConfig;
use macroalloc_core::model::{
    AllocationTarget, AssetCatalog, AssetSpec, FeatureSchema, MacroHistory, MacroVector, Regime,
    ReturnHistory, Strategy,
};
use macroalloc_core::pipeline::{RunConfig, RunInputs, RunParameters};
use macroalloc_core::regime::{ClassifierConfig, RegimeClassifier};
use macroalloc_core::simulation::MonteCarloConfig;

/// Default widening of custom allocation targets, in percentage points
const DEFAULT_CUSTOM_SLACK: f64 = 5.0;

fn default_custom_slack() -> f64 {
    DEFAULT_CUSTOM_SLACK
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRow {
    pub date: Date,
    /// Indicator values in `features` order
    pub values: Vec<f64>,
}

/// Current conditions, either in `features` order or by indicator name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurrentMacro {
    Values(Vec<f64>),
    Named(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: Date,
    /// One price per asset in catalog order; `null` marks a gap
    pub values: Vec<Option<f64>>,
}

/// On-disk scenario layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub features: Vec<String>,
    pub macro_history: Vec<MacroRow>,
    pub current: CurrentMacro,
    pub assets: Vec<AssetSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<PriceRow>,
    /// Per-period simple returns, one row per period in catalog order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<Vec<f64>>,
    pub allocation_rules: Vec<AllocationRule>,
    /// Category -> target percent, replacing the rule table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_allocation: Option<BTreeMap<String, f64>>,
    #[serde(default = "default_custom_slack")]
    pub custom_slack: f64,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub run: RunParameters,
}

/// Validated inputs and configuration ready for a run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub inputs: RunInputs,
    pub config: RunConfig,
}

impl ScenarioFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml(&content)
            .wrap_err_with(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Validate the data and build run inputs.
    pub fn into_scenario(self) -> Result<Scenario> {
        let schema = FeatureSchema::new(self.features).wrap_err("invalid feature list")?;
        let macro_history = MacroHistory::from_rows(
            schema.clone(),
            self.macro_history.into_iter().map(|r| (r.date, r.values)),
        )
        .wrap_err("invalid macro history")?;

        let current = match &self.current {
            CurrentMacro::Values(values) => MacroVector::new(&schema, values.clone()),
            CurrentMacro::Named(named) => MacroVector::from_named(&schema, named),
        }
        .wrap_err("invalid current macro conditions")?;

        let catalog = AssetCatalog::new(self.assets).wrap_err("invalid asset catalog")?;
        let returns = load_returns(catalog.len(), &self.prices, self.returns)?;

        let custom_allocation = self
            .custom_allocation
            .map(|targets| AllocationTarget::from_targets(&targets, self.custom_slack))
            .transpose()
            .wrap_err("invalid custom allocation")?;

        Ok(Scenario {
            inputs: RunInputs {
                macro_history,
                current,
                catalog,
                rules: self.allocation_rules,
                returns,
                custom_allocation,
            },
            config: RunConfig {
                classifier: self.classifier,
                generator: self.generator,
                monte_carlo: self.monte_carlo,
                scoring: self.scoring,
                run: self.run,
            },
        })
    }
}

fn load_returns(
    num_assets: usize,
    prices: &[PriceRow],
    returns: Vec<Vec<f64>>,
) -> Result<ReturnHistory> {
    match (prices.is_empty(), returns.is_empty()) {
        (false, false) => bail!("scenario lists both `prices` and `returns`; keep one"),
        (true, true) => bail!("scenario needs either `prices` or `returns`"),
        (false, true) => {
            if let Some(pair) = prices.windows(2).find(|w| w[1].date <= w[0].date) {
                bail!(
                    "price dates not increasing ({} then {})",
                    pair[0].date,
                    pair[1].date
                );
            }
            let rows: Vec<Vec<Option<f64>>> = prices.iter().map(|r| r.values.clone()).collect();
            ReturnHistory::from_prices(num_assets, &rows).wrap_err("invalid price history")
        }
        (true, false) => {
            ReturnHistory::from_returns(num_assets, returns).wrap_err("invalid return history")
        }
    }
}

/// Command line overrides of run parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub seed: Option<u64>,
    pub strategy: Option<Strategy>,
    pub portfolios: Option<usize>,
    pub trials: Option<usize>,
    pub horizon: Option<usize>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(strategy) = self.strategy {
            config.run.strategy = Some(strategy);
        }
        if let Some(portfolios) = self.portfolios {
            config.run.num_portfolios = portfolios;
        }
        if let Some(trials) = self.trials {
            config.monte_carlo.trials = trials;
        }
        if let Some(horizon) = self.horizon {
            config.monte_carlo.horizon = horizon;
        }
    }
}

/// What a scenario contains once every load-time check has passed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSummary {
    pub observations: usize,
    pub features: usize,
    pub assets: usize,
    pub periods: usize,
    pub regimes: Vec<Regime>,
    pub rule_pairs: usize,
}

/// Run every check short of simulating: data quality, classifier training and
/// rule table completeness for the regimes the classifier produces.
pub fn validate(scenario: &Scenario) -> Result<ValidationSummary> {
    let inputs = &scenario.inputs;
    if inputs.catalog.len() != inputs.returns.num_assets() {
        bail!(
            "return history has {} assets, catalog has {}",
            inputs.returns.num_assets(),
            inputs.catalog.len()
        );
    }
    scenario
        .config
        .monte_carlo
        .validate()
        .wrap_err("invalid monte_carlo section")?;
    scenario
        .config
        .scoring
        .validate()
        .wrap_err("invalid scoring section")?;

    let classifier = RegimeClassifier::train(&inputs.macro_history, &scenario.config.classifier)
        .wrap_err("classifier training failed")?;
    let regimes = classifier.regimes();
    // A custom allocation stands in for the rule table
    let rule_pairs = if inputs.custom_allocation.is_some() && inputs.rules.is_empty() {
        0
    } else {
        RuleTable::from_rows(&inputs.rules, &regimes)
            .wrap_err("invalid allocation rules")?
            .len()
    };

    Ok(ValidationSummary {
        observations: inputs.macro_history.len(),
        features: inputs.macro_history.schema().len(),
        assets: inputs.catalog.len(),
        periods: inputs.returns.len(),
        regimes,
        rule_pairs,
    })
}

/// Small two-regime scenario shared by unit tests
#[cfg(test)]
pub(crate) const SAMPLE_SCENARIO: &str = r#"
features: [GDP_Growth, Unemployment]
macro_history:
  - { date: 2019-01-01, values: [3.1, 3.9] }
  - { date: 2019-04-01, values: [2.9, 4.0] }
  - { date: 2019-07-01, values: [3.0, 4.1] }
  - { date: 2019-10-01, values: [-1.0, 8.8] }
  - { date: 2020-01-01, values: [-1.2, 9.1] }
  - { date: 2020-04-01, values: [-0.8, 9.0] }
current:
  GDP_Growth: 2.8
  Unemployment: 4.2
assets:
  - { symbol: SPY, category: Equities, name: S&P 500 }
  - { symbol: TLT, category: Bonds }
prices:
  - { date: 2020-01-02, values: [100.0, 50.0] }
  - { date: 2020-01-03, values: [101.0, 49.9] }
  - { date: 2020-01-06, values: [100.5, 50.2] }
  - { date: 2020-01-07, values: [102.0, 50.1] }
allocation_rules:
  - { regime: Boom, strategy: Conservative, category: Equities, min: 30, target: 40, max: 50 }
  - { regime: Boom, strategy: Conservative, category: Bonds, min: 50, target: 60, max: 70 }
  - { regime: Boom, strategy: Balanced, category: Equities, min: 50, target: 60, max: 70 }
  - { regime: Boom, strategy: Balanced, category: Bonds, min: 30, target: 40, max: 50 }
  - { regime: Boom, strategy: Growth, category: Equities, min: 70, target: 80, max: 90 }
  - { regime: Boom, strategy: Growth, category: Bonds, min: 10, target: 20, max: 30 }
  - { regime: Recession, strategy: Conservative, category: Equities, min: 10, target: 20, max: 30 }
  - { regime: Recession, strategy: Conservative, category: Bonds, min: 70, target: 80, max: 90 }
  - { regime: Recession, strategy: Balanced, category: Equities, min: 30, target: 40, max: 50 }
  - { regime: Recession, strategy: Balanced, category: Bonds, min: 50, target: 60, max: 70 }
  - { regime: Recession, strategy: Growth, category: Equities, min: 50, target: 60, max: 70 }
  - { regime: Recession, strategy: Growth, category: Bonds, min: 30, target: 40, max: 50 }
classifier:
  clusters: 2
monte_carlo:
  horizon: 10
  trials: 5
  resampling: { kind: iid }
run:
  num_portfolios: 40
  seed: 11
"#;
