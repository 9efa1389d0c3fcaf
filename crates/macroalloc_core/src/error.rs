use std::fmt;

use jiff::civil::Date;

use crate::model::{AssetId, Regime, Strategy};

/// Errors related to the quality of input data (macro history, prices, returns)
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    NonFiniteValue {
        feature: String,
        value: f64,
    },
    MissingFeature(String),
    SchemaMismatch {
        expected: usize,
        found: usize,
    },
    DatesNotIncreasing {
        previous: Date,
        current: Date,
    },
    InsufficientHistory {
        required: usize,
        available: usize,
    },
    MissingPrice {
        asset: AssetId,
        period: usize,
    },
    InvalidPrice {
        asset: AssetId,
        period: usize,
        value: f64,
    },
    NonFiniteReturn {
        asset: AssetId,
        period: usize,
    },
    MisalignedSeries {
        expected: usize,
        found: usize,
    },
    DuplicateAsset(String),
    UnknownAsset(String),
    CatalogTooLarge {
        limit: usize,
        found: usize,
    },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::NonFiniteValue { feature, value } => {
                write!(f, "indicator {feature} has non-finite value {value}")
            }
            DataError::MissingFeature(name) => write!(f, "indicator {name} is missing"),
            DataError::SchemaMismatch { expected, found } => {
                write!(f, "expected {expected} indicators, found {found}")
            }
            DataError::DatesNotIncreasing { previous, current } => {
                write!(f, "observation dates not increasing ({previous} then {current})")
            }
            DataError::InsufficientHistory {
                required,
                available,
            } => write!(
                f,
                "insufficient history: {required} observations required, {available} available"
            ),
            DataError::MissingPrice { asset, period } => {
                write!(f, "price for asset {asset:?} missing at period {period}")
            }
            DataError::InvalidPrice {
                asset,
                period,
                value,
            } => write!(
                f,
                "price for asset {asset:?} at period {period} is not positive and finite ({value})"
            ),
            DataError::NonFiniteReturn { asset, period } => {
                write!(f, "return for asset {asset:?} at period {period} is not finite")
            }
            DataError::MisalignedSeries { expected, found } => {
                write!(f, "series has {found} assets, catalog has {expected}")
            }
            DataError::DuplicateAsset(symbol) => write!(f, "asset {symbol} listed twice"),
            DataError::UnknownAsset(symbol) => write!(f, "asset {symbol} not in catalog"),
            DataError::CatalogTooLarge { limit, found } => {
                write!(f, "catalog lists {found} assets, at most {limit} supported")
            }
        }
    }
}

impl std::error::Error for DataError {}

/// Errors in static configuration: rule tables, allocation bands, tunables
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingRule {
        regime: Regime,
        strategy: Strategy,
    },
    MissingCategory {
        regime: Regime,
        strategy: Strategy,
        category: String,
    },
    DuplicateRule {
        regime: Regime,
        strategy: Strategy,
        category: String,
    },
    InvalidBand {
        category: String,
        min: f64,
        target: f64,
        max: f64,
    },
    TargetSum {
        context: String,
        sum: f64,
    },
    MinSumExceeds {
        context: String,
        sum: f64,
    },
    MaxSumBelow {
        context: String,
        sum: f64,
    },
    EmptyCategory(String),
    UnsupportedClusterCount(usize),
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRule { regime, strategy } => {
                write!(f, "no allocation rule for regime {regime} with strategy {strategy}")
            }
            ConfigError::MissingCategory {
                regime,
                strategy,
                category,
            } => write!(
                f,
                "allocation rule {regime}/{strategy} has no band for category {category}"
            ),
            ConfigError::DuplicateRule {
                regime,
                strategy,
                category,
            } => write!(
                f,
                "duplicate allocation rule {regime}/{strategy} for category {category}"
            ),
            ConfigError::InvalidBand {
                category,
                min,
                target,
                max,
            } => write!(
                f,
                "invalid band for {category}: min={min}, target={target}, max={max}"
            ),
            ConfigError::TargetSum { context, sum } => {
                write!(f, "{context}: targets sum to {sum}%, expected 100%")
            }
            ConfigError::MinSumExceeds { context, sum } => {
                write!(f, "{context}: minimums sum to {sum}%, more than 100%")
            }
            ConfigError::MaxSumBelow { context, sum } => {
                write!(f, "{context}: maximums sum to {sum}%, less than 100%")
            }
            ConfigError::EmptyCategory(category) => {
                write!(f, "category {category} has a positive band but no assets")
            }
            ConfigError::UnsupportedClusterCount(k) => {
                write!(f, "cluster count {k} not supported (expected 2..=6)")
            }
            ConfigError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while training or querying the regime classifier
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    Data(DataError),
    Config(ConfigError),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::Data(e) => write!(f, "{e}"),
            ClassifierError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifierError::Data(e) => Some(e),
            ClassifierError::Config(e) => Some(e),
        }
    }
}

impl From<DataError> for ClassifierError {
    fn from(e: DataError) -> Self {
        ClassifierError::Data(e)
    }
}

impl From<ConfigError> for ClassifierError {
    fn from(e: ConfigError) -> Self {
        ClassifierError::Config(e)
    }
}

/// Errors raised while generating candidate portfolios
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    Config(ConfigError),
    /// Too few candidates satisfied the allocation bands within the attempt bound
    Infeasible {
        requested: usize,
        produced: usize,
        min_required: usize,
        max_attempts: usize,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Config(e) => write!(f, "{e}"),
            GenerationError::Infeasible {
                requested,
                produced,
                min_required,
                max_attempts,
            } => write!(
                f,
                "infeasible allocation: {produced} of {requested} candidates produced \
                 ({min_required} required, {max_attempts} attempts each)"
            ),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Config(e) => Some(e),
            GenerationError::Infeasible { .. } => None,
        }
    }
}

impl From<ConfigError> for GenerationError {
    fn from(e: ConfigError) -> Self {
        GenerationError::Config(e)
    }
}

/// Errors raised by the Monte Carlo simulator
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Data(DataError),
    Config(ConfigError),
    /// Portfolio weight vector does not match the return history
    WeightMismatch {
        expected: usize,
        found: usize,
    },
    /// Scenario set was drawn against a history of a different length
    ScenarioMismatch {
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Data(e) => write!(f, "{e}"),
            SimulationError::Config(e) => write!(f, "{e}"),
            SimulationError::WeightMismatch { expected, found } => {
                write!(f, "portfolio has {found} weights, history has {expected} assets")
            }
            SimulationError::ScenarioMismatch { expected, found } => write!(
                f,
                "scenario set drawn for {found} periods, history has {expected}"
            ),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Data(e) => Some(e),
            SimulationError::Config(e) => Some(e),
            SimulationError::WeightMismatch { .. } | SimulationError::ScenarioMismatch { .. } => {
                None
            }
        }
    }
}

impl From<DataError> for SimulationError {
    fn from(e: DataError) -> Self {
        SimulationError::Data(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

/// Top-level error for a full pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    Data(DataError),
    Config(ConfigError),
    Generation(GenerationError),
    Simulation(SimulationError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Data(e) => write!(f, "data quality error: {e}"),
            RunError::Config(e) => write!(f, "configuration error: {e}"),
            RunError::Generation(e) => write!(f, "generation error: {e}"),
            RunError::Simulation(e) => write!(f, "simulation error: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Data(e) => Some(e),
            RunError::Config(e) => Some(e),
            RunError::Generation(e) => Some(e),
            RunError::Simulation(e) => Some(e),
        }
    }
}

impl From<DataError> for RunError {
    fn from(e: DataError) -> Self {
        RunError::Data(e)
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e)
    }
}

impl From<ClassifierError> for RunError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Data(e) => RunError::Data(e),
            ClassifierError::Config(e) => RunError::Config(e),
        }
    }
}

impl From<GenerationError> for RunError {
    fn from(e: GenerationError) -> Self {
        RunError::Generation(e)
    }
}

impl From<SimulationError> for RunError {
    fn from(e: SimulationError) -> Self {
        RunError::Simulation(e)
    }
}
