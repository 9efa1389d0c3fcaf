//! Macro-regime driven allocation and Monte Carlo portfolio scoring
//!
//! This crate provides the simulation core behind `macroalloc`:
//! - Regime classification (k-means over standardized macro indicators)
//! - A load-time validated (regime, strategy) allocation rule table
//! - Randomized candidate portfolio generation within category bands
//! - Block / i.i.d. bootstrap Monte Carlo simulation over historical returns
//! - Per-portfolio metrics, composite scoring and ranking
//!
//! # Pipeline
//!
//! ```ignore
//! use macroalloc_core::pipeline::{RunConfig, RunInputs, run};
//!
//! let inputs = RunInputs {
//!     macro_history,
//!     current,
//!     catalog,
//!     rules,
//!     returns,
//!     custom_allocation: None,
//! };
//! let report = run(&inputs, &RunConfig::default())?;
//! println!("{} -> {}", report.classification.regime, report.strategy);
//! for scored in report.ranked.iter().take(5) {
//!     println!("#{} score={:.4}", scored.rank, scored.metrics.score);
//! }
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod allocation;
pub mod analysis;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod regime;
pub mod rng;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use allocation::{AllocationRule, Recommendation, RuleTable};
pub use analysis::{ScoringConfig, SimulationAnalyzer};
pub use generator::{GeneratorConfig, PortfolioGenerator};
pub use pipeline::{RunConfig, RunInputs, RunParameters, RunReport, run};
pub use regime::{ClassifierConfig, RegimeClassifier};
pub use simulation::{MonteCarloConfig, MonteCarloSimulator};
