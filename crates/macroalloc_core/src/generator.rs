//! Randomized candidate portfolio generation
//!
//! Each candidate visits the categories in a random order and draws every
//! weight uniformly from the part of its band that still leaves the remaining
//! categories feasible; the last category takes the remainder. Weights sum to
//! 1 by construction and stay inside their bands. Every category is then split
//! across its assets. Draws that break a per-asset bound are thrown away and
//! redrawn rather than clamped.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GenerationError};
use crate::model::{
    AllocationBand, AllocationTarget, AssetCatalog, AssetId, CandidateId, CandidatePortfolio,
    WEIGHT_TOLERANCE,
};
use crate::rng::stream_rng;

/// How a category's weight is divided among its assets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetSplit {
    /// Same weight for every asset in the category
    Equal,
    /// Symmetric Dirichlet via normalized Gamma(concentration, 1) draws
    Dirichlet { concentration: f64 },
}

impl Default for AssetSplit {
    fn default() -> Self {
        AssetSplit::Dirichlet { concentration: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Draws per candidate before it is dropped
    pub max_attempts: usize,
    pub split: AssetSplit,
    /// Lower bound for any asset that receives a non-zero weight (fraction)
    pub min_asset_weight: f64,
    /// Upper bound for any single asset (fraction)
    pub max_asset_weight: f64,
    /// Fewer survivors than this is an infeasible allocation
    pub min_candidates: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            split: AssetSplit::default(),
            min_asset_weight: 0.0,
            max_asset_weight: 1.0,
            min_candidates: 1,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_attempts",
                reason: "must be at least 1",
            });
        }
        if !(self.min_asset_weight.is_finite()
            && self.max_asset_weight.is_finite()
            && 0.0 <= self.min_asset_weight
            && self.min_asset_weight <= self.max_asset_weight
            && self.max_asset_weight <= 1.0)
        {
            return Err(ConfigError::InvalidParameter {
                name: "asset_weight_bounds",
                reason: "need 0 <= min_asset_weight <= max_asset_weight <= 1",
            });
        }
        Ok(())
    }
}

/// Candidates that satisfied every constraint, plus draw statistics
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPopulation {
    pub candidates: Vec<CandidatePortfolio>,
    /// Candidates that exhausted `max_attempts`
    pub dropped: usize,
    /// Total draws across all candidates
    pub attempts: usize,
}

#[derive(Debug, Clone)]
pub struct PortfolioGenerator {
    config: GeneratorConfig,
}

impl PortfolioGenerator {
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate `count` candidates for `target`. Candidate `i` draws from its
    /// own stream of `seed`, so the result does not depend on scheduling.
    pub fn generate(
        &self,
        target: &AllocationTarget,
        catalog: &AssetCatalog,
        count: usize,
        seed: u64,
    ) -> Result<GeneratedPopulation, GenerationError> {
        self.config.validate()?;
        if count == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "num_portfolios",
                reason: "must be at least 1",
            }
            .into());
        }
        let plan = DrawPlan::new(target, catalog, &self.config)?;

        let max_attempts = self.config.max_attempts;
        let generate_one = |index: usize| -> (Option<CandidatePortfolio>, usize) {
            let mut rng = stream_rng(seed, index as u64);
            for attempt in 1..=max_attempts {
                let Some(weights) = plan.draw(&mut rng) else {
                    continue;
                };
                let candidate = CandidatePortfolio {
                    id: CandidateId(index as u32),
                    weights,
                };
                if candidate.satisfies(target, catalog) {
                    return (Some(candidate), attempt);
                }
            }
            (None, max_attempts)
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<(Option<CandidatePortfolio>, usize)> =
            (0..count).into_par_iter().map(generate_one).collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<(Option<CandidatePortfolio>, usize)> =
            (0..count).map(generate_one).collect();

        let attempts = outcomes.iter().map(|(_, a)| a).sum();
        let candidates: Vec<CandidatePortfolio> =
            outcomes.into_iter().filter_map(|(c, _)| c).collect();
        let dropped = count - candidates.len();

        let min_required = self.config.min_candidates.clamp(1, count);
        if candidates.len() < min_required {
            return Err(GenerationError::Infeasible {
                requested: count,
                produced: candidates.len(),
                min_required,
                max_attempts,
            });
        }
        if dropped > 0 {
            tracing::warn!(dropped, requested = count, "candidates dropped after exhausting attempts");
        }
        tracing::debug!(produced = candidates.len(), attempts, "generated candidate portfolios");

        Ok(GeneratedPopulation {
            candidates,
            dropped,
            attempts,
        })
    }
}

struct CategoryPlan {
    band: AllocationBand,
    assets: Vec<AssetId>,
}

/// Target bands resolved against the catalog once per generation
struct DrawPlan {
    categories: Vec<CategoryPlan>,
    num_assets: usize,
    gamma: Option<Gamma<f64>>,
    min_asset_weight: f64,
    max_asset_weight: f64,
}

impl DrawPlan {
    fn new(
        target: &AllocationTarget,
        catalog: &AssetCatalog,
        config: &GeneratorConfig,
    ) -> Result<Self, ConfigError> {
        let by_category = catalog.by_category();
        let mut categories = Vec::with_capacity(target.bands().len());
        for (category, band) in target.bands() {
            if !band.is_well_formed() {
                return Err(ConfigError::InvalidBand {
                    category: category.clone(),
                    min: band.min,
                    target: band.target,
                    max: band.max,
                });
            }
            let assets = by_category.get(category.as_str()).cloned().unwrap_or_default();
            if assets.is_empty() && band.max > 0.0 {
                return Err(ConfigError::EmptyCategory(category.clone()));
            }
            categories.push(CategoryPlan { band: *band, assets });
        }

        let gamma = match config.split {
            AssetSplit::Equal => None,
            AssetSplit::Dirichlet { concentration } => Some(Gamma::new(concentration, 1.0).map_err(
                |_| ConfigError::InvalidParameter {
                    name: "concentration",
                    reason: "must be finite and positive",
                },
            )?),
        };

        Ok(Self {
            categories,
            num_assets: catalog.len(),
            gamma,
            min_asset_weight: config.min_asset_weight,
            max_asset_weight: config.max_asset_weight,
        })
    }

    /// Category weights (fractions) in plan order, summing to 1. `None` when
    /// the bands leave no room, which only happens if they contradict.
    fn category_weights<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<f64>> {
        let n = self.categories.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut min_rest: f64 = self.categories.iter().map(|c| c.band.min / 100.0).sum();
        let mut max_rest: f64 = self.categories.iter().map(|c| c.band.max / 100.0).sum();
        let mut remaining = 1.0;
        let mut weights = vec![0.0; n];
        for (pos, &i) in order.iter().enumerate() {
            let band = &self.categories[i].band;
            let (min, max) = (band.min / 100.0, band.max / 100.0);
            min_rest -= min;
            max_rest -= max;
            let w = if pos + 1 == n {
                remaining
            } else {
                let lo = min.max(remaining - max_rest);
                let hi = max.min(remaining - min_rest);
                if lo > hi + WEIGHT_TOLERANCE {
                    return None;
                }
                if hi > lo {
                    rng.random_range(lo..=hi)
                } else {
                    lo
                }
            };
            weights[i] = w.max(0.0);
            remaining -= weights[i];
        }

        let in_bands = self
            .categories
            .iter()
            .zip(&weights)
            .all(|(c, w)| c.band.contains_fraction(*w, WEIGHT_TOLERANCE));
        in_bands.then_some(weights)
    }

    /// One attempt; `None` when the bands contradict or an asset bound is broken.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<f64>> {
        let category_weights = self.category_weights(rng)?;

        let mut weights = vec![0.0; self.num_assets];
        for (category, &category_weight) in self.categories.iter().zip(&category_weights) {
            if category_weight <= 0.0 {
                continue;
            }
            let n = category.assets.len();
            match &self.gamma {
                Some(gamma) if n > 1 => {
                    let draws: Vec<f64> = (0..n).map(|_| gamma.sample(rng)).collect();
                    let sum: f64 = draws.iter().sum();
                    if !(sum > 0.0 && sum.is_finite()) {
                        return None;
                    }
                    for (asset, g) in category.assets.iter().zip(draws) {
                        weights[asset.index()] = category_weight * g / sum;
                    }
                }
                _ => {
                    let share = category_weight / n as f64;
                    for asset in &category.assets {
                        weights[asset.index()] = share;
                    }
                }
            }
        }

        let within_asset_bounds = weights.iter().all(|&w| {
            w == 0.0
                || (w >= self.min_asset_weight - WEIGHT_TOLERANCE
                    && w <= self.max_asset_weight + WEIGHT_TOLERANCE)
        });
        within_asset_bounds.then_some(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetSpec;

    fn spec(symbol: &str, category: &str) -> AssetSpec {
        AssetSpec {
            symbol: symbol.to_string(),
            category: category.to_string(),
            name: String::new(),
        }
    }

    fn catalog() -> AssetCatalog {
        AssetCatalog::new(vec![
            spec("SPY", "Equities"),
            spec("QQQ", "Equities"),
            spec("EFA", "Equities"),
            spec("TLT", "Bonds"),
            spec("IEF", "Bonds"),
            spec("GLD", "Gold"),
        ])
        .unwrap()
    }

    fn target() -> AllocationTarget {
        AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(40.0, 60.0, 80.0)),
            ("Bonds", AllocationBand::new(20.0, 40.0, 40.0)),
        ])
    }

    #[test]
    fn test_equal_split_and_uncovered_categories() {
        let generator = PortfolioGenerator::new(GeneratorConfig {
            split: AssetSplit::Equal,
            ..Default::default()
        });
        let population = generator.generate(&target(), &catalog(), 50, 3).unwrap();
        assert_eq!(population.candidates.len(), 50);
        for candidate in &population.candidates {
            let w = &candidate.weights;
            assert!((w[0] - w[1]).abs() < 1e-12 && (w[1] - w[2]).abs() < 1e-12);
            assert!((w[3] - w[4]).abs() < 1e-12);
            // Gold is not part of the target
            assert_eq!(w[5], 0.0);
        }
    }

    #[test]
    fn test_asset_bounds_respected() {
        let config = GeneratorConfig {
            min_asset_weight: 0.025,
            max_asset_weight: 0.3,
            ..Default::default()
        };
        let population = PortfolioGenerator::new(config)
            .generate(&target(), &catalog(), 100, 9)
            .unwrap();
        assert!(!population.candidates.is_empty());
        for candidate in &population.candidates {
            for (_, w) in candidate.holdings() {
                assert!((0.025 - 1e-6..=0.3 + 1e-6).contains(&w), "weight {w} out of bounds");
            }
        }
    }

    #[test]
    fn test_same_seed_same_candidates() {
        let generator = PortfolioGenerator::new(GeneratorConfig::default());
        let a = generator.generate(&target(), &catalog(), 20, 77).unwrap();
        let b = generator.generate(&target(), &catalog(), 20, 77).unwrap();
        assert_eq!(a, b);
        let c = generator.generate(&target(), &catalog(), 20, 78).unwrap();
        assert_ne!(a.candidates, c.candidates);
    }

    #[test]
    fn test_configuration_errors() {
        let generator = PortfolioGenerator::new(GeneratorConfig::default());

        let inverted = AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(80.0, 60.0, 40.0)),
            ("Bonds", AllocationBand::new(20.0, 40.0, 40.0)),
        ]);
        assert!(matches!(
            generator.generate(&inverted, &catalog(), 10, 1),
            Err(GenerationError::Config(ConfigError::InvalidBand { .. }))
        ));

        let commodities = AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(40.0, 60.0, 80.0)),
            ("Commodities", AllocationBand::new(0.0, 40.0, 50.0)),
        ]);
        assert_eq!(
            generator.generate(&commodities, &catalog(), 10, 1).unwrap_err(),
            GenerationError::Config(ConfigError::EmptyCategory("Commodities".to_string()))
        );

        assert!(generator.generate(&target(), &catalog(), 0, 1).is_err());

        let bad_split = PortfolioGenerator::new(GeneratorConfig {
            split: AssetSplit::Dirichlet { concentration: 0.0 },
            ..Default::default()
        });
        assert!(bad_split.generate(&target(), &catalog(), 10, 1).is_err());
    }
}
