//! Macro-regime portfolio allocation CLI
//!
//! Loads a scenario file, runs the `macroalloc_core` pipeline and renders
//! the ranked portfolios to the terminal or to YAML/JSON report files.

pub mod logging;
pub mod report;
pub mod scenario;
pub mod util;

pub use logging::init_logging;
pub use report::{ReportView, write_report};
pub use scenario::{RunOverrides, Scenario, ScenarioFile, ValidationSummary, validate};
