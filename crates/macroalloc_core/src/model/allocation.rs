//! Category-level allocation bands
//!
//! All band values are percentages of the whole portfolio (0–100).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Allowed deviation of the target sum from 100%
pub const TARGET_SUM_TOLERANCE: f64 = 0.5;

/// (min%, target%, max%) for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationBand {
    pub min: f64,
    pub target: f64,
    pub max: f64,
}

impl AllocationBand {
    #[must_use]
    pub const fn new(min: f64, target: f64, max: f64) -> Self {
        Self { min, target, max }
    }

    /// Finite, within [0, 100] and ordered min ≤ target ≤ max.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        [self.min, self.target, self.max].iter().all(|v| v.is_finite())
            && self.min >= 0.0
            && self.max <= 100.0
            && self.min <= self.target
            && self.target <= self.max
    }

    /// Whether a portfolio fraction (0–1) lies inside the band.
    #[must_use]
    pub fn contains_fraction(&self, weight: f64, tolerance: f64) -> bool {
        weight >= self.min / 100.0 - tolerance && weight <= self.max / 100.0 + tolerance
    }
}

/// Target bands per category for one (regime, strategy) or a custom allocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationTarget {
    bands: BTreeMap<String, AllocationBand>,
}

impl AllocationTarget {
    /// Collect bands without validating them.
    ///
    /// Use [`AllocationTarget::validate`] for rule-table entries; the generator
    /// reports infeasible bands on its own.
    pub fn from_bands<I, S>(bands: I) -> Self
    where
        I: IntoIterator<Item = (S, AllocationBand)>,
        S: Into<String>,
    {
        Self {
            bands: bands.into_iter().map(|(c, b)| (c.into(), b)).collect(),
        }
    }

    /// Build a custom allocation from target percentages, widening each target
    /// by `slack` percentage points on both sides (clamped to [0, 100]).
    pub fn from_targets(
        targets: &BTreeMap<String, f64>,
        slack: f64,
    ) -> Result<Self, ConfigError> {
        if !slack.is_finite() || slack < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "custom_slack",
                reason: "must be finite and non-negative",
            });
        }
        let target = Self::from_bands(targets.iter().map(|(category, &t)| {
            (
                category.clone(),
                AllocationBand::new((t - slack).max(0.0), t, (t + slack).min(100.0)),
            )
        }));
        target.validate("custom allocation")?;
        Ok(target)
    }

    #[must_use]
    pub fn bands(&self) -> &BTreeMap<String, AllocationBand> {
        &self.bands
    }

    #[must_use]
    pub fn band(&self, category: &str) -> Option<&AllocationBand> {
        self.bands.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    #[must_use]
    pub fn target_sum(&self) -> f64 {
        self.bands.values().map(|b| b.target).sum()
    }

    #[must_use]
    pub fn min_sum(&self) -> f64 {
        self.bands.values().map(|b| b.min).sum()
    }

    #[must_use]
    pub fn max_sum(&self) -> f64 {
        self.bands.values().map(|b| b.max).sum()
    }

    /// Check band ordering and the sum constraints.
    pub fn validate(&self, context: &str) -> Result<(), ConfigError> {
        for (category, band) in &self.bands {
            if !band.is_well_formed() {
                return Err(ConfigError::InvalidBand {
                    category: category.clone(),
                    min: band.min,
                    target: band.target,
                    max: band.max,
                });
            }
        }
        let target_sum = self.target_sum();
        if (target_sum - 100.0).abs() > TARGET_SUM_TOLERANCE {
            return Err(ConfigError::TargetSum {
                context: context.to_string(),
                sum: target_sum,
            });
        }
        let min_sum = self.min_sum();
        if min_sum > 100.0 + TARGET_SUM_TOLERANCE {
            return Err(ConfigError::MinSumExceeds {
                context: context.to_string(),
                sum: min_sum,
            });
        }
        let max_sum = self.max_sum();
        if max_sum < 100.0 - TARGET_SUM_TOLERANCE {
            return Err(ConfigError::MaxSumBelow {
                context: context.to_string(),
                sum: max_sum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equities_bonds() -> AllocationTarget {
        AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(40.0, 60.0, 80.0)),
            ("Bonds", AllocationBand::new(20.0, 40.0, 40.0)),
        ])
    }

    #[test]
    fn test_validate_accepts_consistent_bands() {
        let target = equities_bonds();
        assert!(target.validate("test").is_ok());
        assert!((target.target_sum() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let target = AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(70.0, 60.0, 80.0)),
            ("Bonds", AllocationBand::new(20.0, 40.0, 40.0)),
        ]);
        assert!(matches!(
            target.validate("test"),
            Err(ConfigError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_sums() {
        let target = AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(40.0, 50.0, 80.0)),
            ("Bonds", AllocationBand::new(20.0, 40.0, 40.0)),
        ]);
        assert!(matches!(
            target.validate("test"),
            Err(ConfigError::TargetSum { .. })
        ));

        let target = AllocationTarget::from_bands([
            ("Equities", AllocationBand::new(60.0, 60.0, 80.0)),
            ("Bonds", AllocationBand::new(40.0, 40.0, 40.0)),
            ("Gold", AllocationBand::new(20.0, 0.0, 30.0)),
        ]);
        // Gold's band is inverted before the sums are looked at
        assert!(matches!(
            target.validate("test"),
            Err(ConfigError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_custom_targets_with_slack() {
        let targets = BTreeMap::from([
            ("Equities".to_string(), 70.0),
            ("Bonds".to_string(), 25.0),
            ("Gold".to_string(), 5.0),
        ]);
        let target = AllocationTarget::from_targets(&targets, 10.0).unwrap();
        assert_eq!(
            target.band("Gold"),
            Some(&AllocationBand::new(0.0, 5.0, 15.0))
        );
        assert_eq!(
            target.band("Equities"),
            Some(&AllocationBand::new(60.0, 70.0, 80.0))
        );

        let bad = BTreeMap::from([("Equities".to_string(), 90.0)]);
        assert!(AllocationTarget::from_targets(&bad, 5.0).is_err());
    }

    #[test]
    fn test_contains_fraction() {
        let band = AllocationBand::new(20.0, 40.0, 40.0);
        assert!(band.contains_fraction(0.2, 0.0));
        assert!(band.contains_fraction(0.4 + 1e-9, 1e-6));
        assert!(!band.contains_fraction(0.41, 1e-6));
    }
}
