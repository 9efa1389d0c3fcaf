//! Integration tests for the allocation engine
//!
//! Tests are organized by topic:
//! - `classification` - Regime clustering, naming and nearest periods
//! - `generation` - Candidate portfolios against allocation bands
//! - `simulation` - Monte Carlo reproducibility and degenerate returns
//! - `ranking` - Metric invariances and rank ordering
//! - `pipeline` - Full runs, determinism and error propagation
//!
//! Shared fixtures live in `fixtures`.

mod pipeline;
