//! Allocation rule table
//!
//! Maps every (regime, strategy) pair to category bands. The table is validated
//! once at load so lookups during a run cannot fail on a malformed entry.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{AllocationBand, AllocationTarget, Regime, Strategy};

/// One row of the rule table: a band for one category under one (regime, strategy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    pub regime: Regime,
    pub strategy: Strategy,
    pub category: String,
    pub min: f64,
    pub target: f64,
    pub max: f64,
}

/// Validated (regime, strategy) -> allocation target map
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleTable {
    targets: BTreeMap<(Regime, Strategy), AllocationTarget>,
}

/// Strategy chosen for a regime together with its resolved target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub regime: Regime,
    pub strategy: Strategy,
    /// The caller chose the strategy instead of the regime default
    pub overridden: bool,
    pub target: AllocationTarget,
}

impl RuleTable {
    /// Build and validate a table that must cover every strategy for each of
    /// `regimes`. Rows for other regimes are kept and validated too.
    pub fn from_rows(rows: &[AllocationRule], regimes: &[Regime]) -> Result<Self, ConfigError> {
        let mut grouped: BTreeMap<(Regime, Strategy), BTreeMap<String, AllocationBand>> =
            BTreeMap::new();
        for row in rows {
            let bands = grouped.entry((row.regime, row.strategy)).or_default();
            if bands.contains_key(&row.category) {
                return Err(ConfigError::DuplicateRule {
                    regime: row.regime,
                    strategy: row.strategy,
                    category: row.category.clone(),
                });
            }
            bands.insert(
                row.category.clone(),
                AllocationBand::new(row.min, row.target, row.max),
            );
        }

        for &regime in regimes {
            for strategy in Strategy::ALL {
                if !grouped.contains_key(&(regime, strategy)) {
                    return Err(ConfigError::MissingRule { regime, strategy });
                }
            }
        }

        // Every pair must list the same categories as the first one
        if let Some((&(ref_regime, ref_strategy), reference)) = grouped.iter().next() {
            let expected: BTreeSet<&String> = reference.keys().collect();
            for (&(regime, strategy), bands) in &grouped {
                if let Some(missing) = expected.iter().find(|c| !bands.contains_key(**c)) {
                    return Err(ConfigError::MissingCategory {
                        regime,
                        strategy,
                        category: (*missing).clone(),
                    });
                }
                if let Some(extra) = bands.keys().find(|c| !expected.contains(c)) {
                    return Err(ConfigError::MissingCategory {
                        regime: ref_regime,
                        strategy: ref_strategy,
                        category: extra.clone(),
                    });
                }
            }
        }

        let mut targets = BTreeMap::new();
        for ((regime, strategy), bands) in grouped {
            let target = AllocationTarget::from_bands(bands);
            target.validate(&format!("{regime}/{strategy}"))?;
            targets.insert((regime, strategy), target);
        }

        tracing::debug!(pairs = targets.len(), "loaded allocation rule table");
        Ok(Self { targets })
    }

    /// Look up the bands for a (regime, strategy) pair.
    pub fn resolve(&self, regime: Regime, strategy: Strategy) -> Result<&AllocationTarget, ConfigError> {
        self.targets
            .get(&(regime, strategy))
            .ok_or(ConfigError::MissingRule { regime, strategy })
    }

    /// Pick the strategy (override or regime default) and resolve its target.
    pub fn recommend(
        &self,
        regime: Regime,
        strategy_override: Option<Strategy>,
    ) -> Result<Recommendation, ConfigError> {
        let strategy = strategy_override.unwrap_or_else(|| Strategy::for_regime(regime));
        let target = self.resolve(regime, strategy)?.clone();
        Ok(Recommendation {
            regime,
            strategy,
            overridden: strategy_override.is_some(),
            target,
        })
    }

    /// Categories shared by every entry.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.targets
            .values()
            .next()
            .map(|t| t.categories().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(regime: Regime, strategy: Strategy, category: &str, band: [f64; 3]) -> AllocationRule {
        AllocationRule {
            regime,
            strategy,
            category: category.to_string(),
            min: band[0],
            target: band[1],
            max: band[2],
        }
    }

    /// Equities/Bonds rows for every strategy of `regimes`.
    fn rows(regimes: &[Regime]) -> Vec<AllocationRule> {
        let mut rows = Vec::new();
        for &regime in regimes {
            for strategy in Strategy::ALL {
                let equities = match strategy {
                    Strategy::Conservative => [20.0, 30.0, 40.0],
                    Strategy::Balanced => [40.0, 50.0, 60.0],
                    Strategy::Growth => [60.0, 70.0, 80.0],
                };
                let bonds = [100.0 - equities[2], 100.0 - equities[1], 100.0 - equities[0]];
                rows.push(rule(regime, strategy, "Equities", equities));
                rows.push(rule(regime, strategy, "Bonds", bonds));
            }
        }
        rows
    }

    const TWO: [Regime; 2] = [Regime::Boom, Regime::Recession];

    #[test]
    fn test_resolve_is_a_pure_lookup() {
        let table = RuleTable::from_rows(&rows(&TWO), &TWO).unwrap();
        assert_eq!(table.len(), 6);
        let a = table.resolve(Regime::Boom, Strategy::Growth).unwrap();
        let b = table.resolve(Regime::Boom, Strategy::Growth).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.band("Equities"), Some(&AllocationBand::new(60.0, 70.0, 80.0)));

        assert_eq!(
            table.resolve(Regime::Stagflation, Strategy::Growth).unwrap_err(),
            ConfigError::MissingRule {
                regime: Regime::Stagflation,
                strategy: Strategy::Growth
            }
        );
    }

    #[test]
    fn test_recommend_uses_regime_default_unless_overridden() {
        let table = RuleTable::from_rows(&rows(&TWO), &TWO).unwrap();

        let rec = table.recommend(Regime::Recession, None).unwrap();
        assert_eq!(rec.strategy, Strategy::Conservative);
        assert!(!rec.overridden);

        let rec = table.recommend(Regime::Recession, Some(Strategy::Growth)).unwrap();
        assert_eq!(rec.strategy, Strategy::Growth);
        assert!(rec.overridden);
        assert_eq!(rec.target.band("Equities").unwrap().target, 70.0);
    }

    #[test]
    fn test_incomplete_table_rejected() {
        let mut rows = rows(&TWO);
        rows.retain(|r| !(r.regime == Regime::Boom && r.strategy == Strategy::Balanced));
        assert_eq!(
            RuleTable::from_rows(&rows, &TWO).unwrap_err(),
            ConfigError::MissingRule {
                regime: Regime::Boom,
                strategy: Strategy::Balanced
            }
        );

        // Complete for two regimes, but a third is required
        let three = [Regime::Boom, Regime::Recovery, Regime::Recession];
        assert!(matches!(
            RuleTable::from_rows(&self::rows(&TWO), &three),
            Err(ConfigError::MissingRule {
                regime: Regime::Recovery,
                ..
            })
        ));
    }

    #[test]
    fn test_category_sets_must_match() {
        let mut rows = rows(&TWO);
        rows.retain(|r| {
            !(r.regime == Regime::Recession && r.strategy == Strategy::Growth && r.category == "Bonds")
        });
        assert!(matches!(
            RuleTable::from_rows(&rows, &TWO),
            Err(ConfigError::MissingCategory { ref category, .. }) if category == "Bonds"
        ));
    }

    #[test]
    fn test_duplicates_and_bad_bands_rejected() {
        let mut dup = rows(&TWO);
        dup.push(rule(Regime::Boom, Strategy::Growth, "Equities", [60.0, 70.0, 80.0]));
        assert!(matches!(
            RuleTable::from_rows(&dup, &TWO),
            Err(ConfigError::DuplicateRule { .. })
        ));

        let mut bad = rows(&TWO);
        bad[0].min = 35.0; // Boom/Conservative Equities: min above target
        assert!(matches!(
            RuleTable::from_rows(&bad, &TWO),
            Err(ConfigError::InvalidBand { .. })
        ));
    }
}
