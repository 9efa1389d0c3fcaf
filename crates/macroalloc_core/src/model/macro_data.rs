//! Macro feature store
//!
//! Cleaned, aligned macro indicator observations. Construction validates that
//! every indicator is present and finite, so downstream code never sees gaps.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::Serialize;

use crate::error::DataError;

/// Conventional indicator names used by the default growth axis.
pub mod indicators {
    pub const INFLATION: &str = "Inflation";
    pub const UNEMPLOYMENT: &str = "Unemployment";
    pub const GDP_GROWTH: &str = "GDP_Growth";
    pub const YIELD_CURVE: &str = "Yield_Curve_10Y_2Y";
    pub const TREASURY_10Y: &str = "Treasury_10Y";
    pub const TREASURY_2Y: &str = "Treasury_2Y";
    pub const VIX: &str = "VIX";
}

/// Ordered indicator names shared by every vector of a history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new<I, S>(names: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DataError::SchemaMismatch {
                expected: 1,
                found: 0,
            });
        }
        Ok(Self { names })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Indicator values at one point in time, in schema order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroVector {
    values: Vec<f64>,
}

impl MacroVector {
    /// Build a vector from values already in schema order.
    pub fn new(schema: &FeatureSchema, values: Vec<f64>) -> Result<Self, DataError> {
        if values.len() != schema.len() {
            return Err(DataError::SchemaMismatch {
                expected: schema.len(),
                found: values.len(),
            });
        }
        for (name, value) in schema.names().iter().zip(&values) {
            if !value.is_finite() {
                return Err(DataError::NonFiniteValue {
                    feature: name.clone(),
                    value: *value,
                });
            }
        }
        Ok(Self { values })
    }

    /// Build a vector from named values. Extra names are ignored, missing ones rejected.
    pub fn from_named(
        schema: &FeatureSchema,
        named: &BTreeMap<String, f64>,
    ) -> Result<Self, DataError> {
        let values = schema
            .names()
            .iter()
            .map(|name| {
                named
                    .get(name)
                    .copied()
                    .ok_or_else(|| DataError::MissingFeature(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(schema, values)
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroObservation {
    pub date: Date,
    pub vector: MacroVector,
}

/// Historical macro observations, strictly increasing by date
#[derive(Debug, Clone, Serialize)]
pub struct MacroHistory {
    schema: FeatureSchema,
    observations: Vec<MacroObservation>,
}

impl MacroHistory {
    pub fn new(
        schema: FeatureSchema,
        observations: Vec<MacroObservation>,
    ) -> Result<Self, DataError> {
        for obs in &observations {
            if obs.vector.values().len() != schema.len() {
                return Err(DataError::SchemaMismatch {
                    expected: schema.len(),
                    found: obs.vector.values().len(),
                });
            }
        }
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(DataError::DatesNotIncreasing {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }
        Ok(Self {
            schema,
            observations,
        })
    }

    /// Build a history from raw `(date, values)` rows in schema order.
    pub fn from_rows<I>(schema: FeatureSchema, rows: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = (Date, Vec<f64>)>,
    {
        let observations = rows
            .into_iter()
            .map(|(date, values)| {
                MacroVector::new(&schema, values).map(|vector| MacroObservation { date, vector })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(schema, observations)
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn observations(&self) -> &[MacroObservation] {
        &self.observations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Most recent observation, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&MacroObservation> {
        self.observations.last()
    }
}
