//! Macro regime classification
//!
//! Historical macro observations are standardized and clustered with k-means.
//! Clusters are then named by ranking their centroids along a growth axis, so
//! the strongest-growth cluster is always `Boom` and the weakest `Recession`,
//! independent of the arbitrary cluster numbering k-means produces.

mod kmeans;
mod scaler;

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, ConfigError, DataError};
use crate::model::{FeatureSchema, MacroHistory, MacroVector, Regime, indicators};
use crate::rng::stream_rng;

pub use scaler::FeatureScaler;

/// Classifier tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of regimes (2..=6)
    pub clusters: usize,
    pub seed: u64,
    /// Independent k-means runs; lowest inertia wins
    pub restarts: usize,
    pub max_iterations: usize,
    /// Stop when no centroid moves more than this (squared distance)
    pub tolerance: f64,
    /// Standardized distance beyond which a classification is low confidence
    pub confidence_threshold: f64,
    /// Indicator name -> weight of the growth score used to name clusters
    pub growth_axis: BTreeMap<String, f64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            clusters: 4,
            seed: 42,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-6,
            confidence_threshold: 3.0,
            growth_axis: default_growth_axis(),
        }
    }
}

/// +GDP growth, -unemployment, +curve slope, -VIX, -inflation.
#[must_use]
pub fn default_growth_axis() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (indicators::GDP_GROWTH.to_string(), 1.0),
        (indicators::UNEMPLOYMENT.to_string(), -1.0),
        (indicators::YIELD_CURVE.to_string(), 0.5),
        (indicators::VIX.to_string(), -0.5),
        (indicators::INFLATION.to_string(), -0.25),
    ])
}

impl ClassifierConfig {
    fn validate(&self) -> Result<&'static [Regime], ConfigError> {
        let ladder =
            Regime::ladder(self.clusters).ok_or(ConfigError::UnsupportedClusterCount(self.clusters))?;
        if self.restarts == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "restarts",
                reason: "must be at least 1",
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1",
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "tolerance",
                reason: "must be finite and non-negative",
            });
        }
        if !self.confidence_threshold.is_finite() || self.confidence_threshold <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "confidence_threshold",
                reason: "must be finite and positive",
            });
        }
        if self.growth_axis.values().any(|w| !w.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                name: "growth_axis",
                reason: "weights must be finite",
            });
        }
        Ok(ladder)
    }
}

/// One named cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeCentroid {
    pub regime: Regime,
    /// Centroid in standardized units
    pub centroid: Vec<f64>,
    /// Centroid in indicator units
    pub levels: Vec<f64>,
    pub growth_score: f64,
    /// Training observations assigned to this cluster
    pub members: usize,
}

/// Result of classifying one macro vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub regime: Regime,
    /// Euclidean distance to the regime centroid in standardized units
    pub distance: f64,
    /// Distance exceeds the configured confidence threshold
    pub low_confidence: bool,
    /// At least one indicator lies outside the training range
    pub extrapolated: bool,
    /// Distance to every centroid, in growth order
    pub centroid_distances: Vec<(Regime, f64)>,
}

/// A historical observation close to a queried vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestPeriod {
    pub date: Date,
    pub regime: Regime,
    pub distance: f64,
}

/// A trained classifier. Immutable; retrain to pick up new history.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    schema: FeatureSchema,
    scaler: FeatureScaler,
    /// Highest growth score first
    centroids: Vec<RegimeCentroid>,
    dates: Vec<Date>,
    standardized: Vec<Vec<f64>>,
    labels: Vec<Regime>,
    confidence_threshold: f64,
    inertia: f64,
}

impl RegimeClassifier {
    /// Cluster the history and name the clusters.
    pub fn train(history: &MacroHistory, config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let ladder = config.validate()?;
        let k = config.clusters;
        let schema = history.schema().clone();

        if history.len() < k {
            return Err(DataError::InsufficientHistory {
                required: k,
                available: history.len(),
            }
            .into());
        }

        let axis: Vec<f64> = schema
            .names()
            .iter()
            .map(|name| config.growth_axis.get(name).copied().unwrap_or(0.0))
            .collect();
        if axis.iter().all(|w| *w == 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "growth_axis",
                reason: "no weighted indicator is present in the feature schema",
            }
            .into());
        }

        let observations = history.observations();
        let scaler = FeatureScaler::fit(observations.iter().map(|o| o.vector.values()), schema.len());
        let standardized: Vec<Vec<f64>> = observations
            .iter()
            .map(|o| scaler.transform(o.vector.values()))
            .collect();

        let mut best: Option<kmeans::KMeansFit> = None;
        for restart in 0..config.restarts {
            let mut rng = stream_rng(config.seed, restart as u64);
            let fit = kmeans::fit(
                &standardized,
                k,
                config.max_iterations,
                config.tolerance,
                &mut rng,
            );
            tracing::debug!(
                restart,
                inertia = fit.inertia,
                iterations = fit.iterations,
                "k-means restart finished"
            );
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        let Some(fit) = best else {
            return Err(ConfigError::InvalidParameter {
                name: "restarts",
                reason: "must be at least 1",
            }
            .into());
        };

        // Rank clusters by growth score, ties by cluster index
        let scores: Vec<f64> = fit
            .centroids
            .iter()
            .map(|c| c.iter().zip(&axis).map(|(x, w)| x * w).sum())
            .collect();
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut regime_of_cluster = vec![Regime::Boom; k];
        for (rank, &cluster) in order.iter().enumerate() {
            regime_of_cluster[cluster] = ladder[rank];
        }

        let mut members = vec![0usize; k];
        for &a in &fit.assignments {
            members[a] += 1;
        }

        let centroids: Vec<RegimeCentroid> = order
            .iter()
            .map(|&cluster| RegimeCentroid {
                regime: regime_of_cluster[cluster],
                levels: scaler.inverse(&fit.centroids[cluster]),
                centroid: fit.centroids[cluster].clone(),
                growth_score: scores[cluster],
                members: members[cluster],
            })
            .collect();
        let labels = fit.assignments.iter().map(|&a| regime_of_cluster[a]).collect();

        tracing::info!(
            clusters = k,
            observations = history.len(),
            inertia = fit.inertia,
            "trained regime classifier"
        );

        Ok(Self {
            schema,
            scaler,
            centroids,
            dates: observations.iter().map(|o| o.date).collect(),
            standardized,
            labels,
            confidence_threshold: config.confidence_threshold,
            inertia: fit.inertia,
        })
    }

    /// Assign a vector to the nearest regime centroid.
    pub fn classify(&self, vector: &MacroVector) -> Result<Classification, DataError> {
        let values = self.check(vector)?;
        let z = self.scaler.transform(values);

        let centroid_distances: Vec<(Regime, f64)> = self
            .centroids
            .iter()
            .map(|c| (c.regime, kmeans::squared_distance(&z, &c.centroid).sqrt()))
            .collect();

        // Strict comparison keeps the higher-growth regime on exact ties
        let mut nearest = centroid_distances[0];
        for &candidate in &centroid_distances[1..] {
            if candidate.1 < nearest.1 {
                nearest = candidate;
            }
        }

        let classification = Classification {
            regime: nearest.0,
            distance: nearest.1,
            low_confidence: nearest.1 > self.confidence_threshold,
            extrapolated: self.scaler.is_outside_range(values),
            centroid_distances,
        };
        if classification.low_confidence || classification.extrapolated {
            tracing::warn!(
                regime = %classification.regime,
                distance = classification.distance,
                extrapolated = classification.extrapolated,
                "macro vector is far from the training data"
            );
        }
        Ok(classification)
    }

    /// The `n` training observations closest to `vector`, nearest first.
    pub fn nearest_periods(
        &self,
        vector: &MacroVector,
        n: usize,
    ) -> Result<Vec<NearestPeriod>, DataError> {
        let z = self.scaler.transform(self.check(vector)?);
        let mut periods: Vec<NearestPeriod> = self
            .standardized
            .iter()
            .zip(self.dates.iter().zip(&self.labels))
            .map(|(point, (&date, &regime))| NearestPeriod {
                date,
                regime,
                distance: kmeans::squared_distance(&z, point).sqrt(),
            })
            .collect();
        periods.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.date.cmp(&b.date)));
        periods.truncate(n);
        Ok(periods)
    }

    /// Regime assigned to every training observation.
    pub fn regime_history(&self) -> impl Iterator<Item = (Date, Regime)> + '_ {
        self.dates.iter().copied().zip(self.labels.iter().copied())
    }

    #[must_use]
    pub fn centroids(&self) -> &[RegimeCentroid] {
        &self.centroids
    }

    /// Regimes this classifier can produce, highest growth first.
    #[must_use]
    pub fn regimes(&self) -> Vec<Regime> {
        self.centroids.iter().map(|c| c.regime).collect()
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    fn check<'a>(&self, vector: &'a MacroVector) -> Result<&'a [f64], DataError> {
        let values = vector.values();
        if values.len() != self.schema.len() {
            return Err(DataError::SchemaMismatch {
                expected: self.schema.len(),
                found: values.len(),
            });
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn schema() -> FeatureSchema {
        FeatureSchema::new([indicators::GDP_GROWTH, indicators::UNEMPLOYMENT]).unwrap()
    }

    /// Alternating strong / weak quarters.
    fn history() -> MacroHistory {
        let rows = (0..12i16).map(|i| {
            let d = date(2010 + i / 4, 1 + 3 * (i % 4) as i8, 1);
            let wiggle = f64::from(i) * 0.01;
            if i % 2 == 0 {
                (d, vec![3.0 + wiggle, 4.0 - wiggle])
            } else {
                (d, vec![-1.0 - wiggle, 9.0 + wiggle])
            }
        });
        MacroHistory::from_rows(schema(), rows).unwrap()
    }

    fn config(k: usize) -> ClassifierConfig {
        ClassifierConfig {
            clusters: k,
            ..Default::default()
        }
    }

    #[test]
    fn test_growth_axis_names_clusters() {
        let classifier = RegimeClassifier::train(&history(), &config(2)).unwrap();
        assert_eq!(classifier.regimes(), vec![Regime::Boom, Regime::Recession]);

        let boom = classifier.centroids()[0].clone();
        assert!(boom.levels[0] > 2.0, "boom centroid should carry high GDP growth");
        assert_eq!(boom.members, 6);

        for (d, regime) in classifier.regime_history() {
            let strong = (d.month() - 1) % 6 == 0;
            assert_eq!(regime, if strong { Regime::Boom } else { Regime::Recession });
        }
    }

    #[test]
    fn test_classify_flags_distant_vectors() {
        let classifier = RegimeClassifier::train(&history(), &config(2)).unwrap();
        let near = MacroVector::new(&schema(), vec![3.05, 3.95]).unwrap();
        let result = classifier.classify(&near).unwrap();
        assert_eq!(result.regime, Regime::Boom);
        assert!(!result.low_confidence);
        assert!(!result.extrapolated);
        assert_eq!(result.centroid_distances.len(), 2);

        let far = MacroVector::new(&schema(), vec![-20.0, 30.0]).unwrap();
        let result = classifier.classify(&far).unwrap();
        assert_eq!(result.regime, Regime::Recession);
        assert!(result.low_confidence);
        assert!(result.extrapolated);
    }

    #[test]
    fn test_nearest_periods_sorted() {
        let classifier = RegimeClassifier::train(&history(), &config(2)).unwrap();
        let vector = MacroVector::new(&schema(), vec![3.0, 4.0]).unwrap();
        let nearest = classifier.nearest_periods(&vector, 3).unwrap();
        assert_eq!(nearest.len(), 3);
        assert_eq!(nearest[0].date, date(2010, 1, 1));
        assert!(nearest.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(nearest.iter().all(|p| p.regime == Regime::Boom));
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert_eq!(
            RegimeClassifier::train(&history(), &config(7)).unwrap_err(),
            ClassifierError::Config(ConfigError::UnsupportedClusterCount(7))
        );

        let too_few = MacroHistory::from_rows(schema(), vec![(date(2020, 1, 1), vec![1.0, 2.0])])
            .unwrap();
        assert!(matches!(
            RegimeClassifier::train(&too_few, &config(2)),
            Err(ClassifierError::Data(DataError::InsufficientHistory { .. }))
        ));

        let no_axis = ClassifierConfig {
            clusters: 2,
            growth_axis: BTreeMap::from([("Other".to_string(), 1.0)]),
            ..Default::default()
        };
        assert!(matches!(
            RegimeClassifier::train(&history(), &no_axis),
            Err(ClassifierError::Config(ConfigError::InvalidParameter { name: "growth_axis", .. }))
        ));
    }

    #[test]
    fn test_classify_rejects_foreign_schema() {
        let classifier = RegimeClassifier::train(&history(), &config(2)).unwrap();
        let other = FeatureSchema::new(["A", "B", "C"]).unwrap();
        let vector = MacroVector::new(&other, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            classifier.classify(&vector),
            Err(DataError::SchemaMismatch { expected: 2, found: 3 })
        ));
    }
}
