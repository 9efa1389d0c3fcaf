use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::allocation::AllocationTarget;
use super::assets::AssetCatalog;
use super::ids::{AssetId, CandidateId};

/// Tolerance for the weight-sum and band checks
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A generated portfolio: one weight per catalog asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePortfolio {
    pub id: CandidateId,
    /// Weights indexed by [`AssetId`], summing to 1
    pub weights: Vec<f64>,
}

impl CandidatePortfolio {
    #[must_use]
    pub fn weight(&self, asset: AssetId) -> f64 {
        self.weights.get(asset.index()).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Non-zero holdings as `(asset, weight)` pairs.
    pub fn holdings(&self) -> impl Iterator<Item = (AssetId, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0.0)
            .map(|(i, w)| (AssetId(i as u16), *w))
    }

    /// Aggregated weight per category.
    #[must_use]
    pub fn category_weights(&self, catalog: &AssetCatalog) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for asset in catalog.assets() {
            *totals.entry(asset.category.clone()).or_insert(0.0) += self.weight(asset.id);
        }
        totals
    }

    /// Weights keyed by asset symbol, dropping zero weights.
    #[must_use]
    pub fn weights_by_symbol(&self, catalog: &AssetCatalog) -> BTreeMap<String, f64> {
        self.holdings()
            .filter_map(|(id, w)| catalog.get(id).map(|a| (a.symbol.clone(), w)))
            .collect()
    }

    /// Non-negative finite weights summing to 1, with every category of the
    /// target inside its band and no weight on categories the target omits.
    #[must_use]
    pub fn satisfies(&self, target: &AllocationTarget, catalog: &AssetCatalog) -> bool {
        if self.weights.len() != catalog.len() {
            return false;
        }
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return false;
        }
        if (self.total_weight() - 1.0).abs() > WEIGHT_TOLERANCE {
            return false;
        }
        let category_weights = self.category_weights(catalog);
        for (category, band) in target.bands() {
            let weight = category_weights.get(category).copied().unwrap_or(0.0);
            if !band.contains_fraction(weight, WEIGHT_TOLERANCE) {
                return false;
            }
        }
        category_weights
            .iter()
            .filter(|(category, _)| target.band(category).is_none())
            .all(|(_, w)| *w <= WEIGHT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AllocationBand, AssetSpec};

    fn catalog() -> AssetCatalog {
        AssetCatalog::new(vec![
            AssetSpec {
                symbol: "SPY".into(),
                category: "Equities".into(),
                name: String::new(),
            },
            AssetSpec {
                symbol: "TLT".into(),
                category: "Bonds".into(),
                name: String::new(),
            },
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
    fn test_satisfies_bands() {
        let ok = CandidatePortfolio {
            id: CandidateId(0),
            weights: vec![0.65, 0.35],
        };
        assert!(ok.satisfies(&target(), &catalog()));

        let bonds_heavy = CandidatePortfolio {
            id: CandidateId(1),
            weights: vec![0.55, 0.45],
        };
        assert!(!bonds_heavy.satisfies(&target(), &catalog()));

        let unnormalized = CandidatePortfolio {
            id: CandidateId(2),
            weights: vec![0.6, 0.3],
        };
        assert!(!unnormalized.satisfies(&target(), &catalog()));
    }

    #[test]
    fn test_weights_by_symbol() {
        let portfolio = CandidatePortfolio {
            id: CandidateId(0),
            weights: vec![1.0, 0.0],
        };
        let weights = portfolio.weights_by_symbol(&catalog());
        assert_eq!(weights.len(), 1);
        assert_eq!(weights["SPY"], 1.0);
    }
}
