//! Asset catalog
//!
//! Assets are addressed by their position in the catalog; the same position is
//! the column index of the aligned return history.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

use super::ids::AssetId;

/// One catalog row as supplied by the data loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Ticker or other unique identifier
    pub symbol: String,
    /// Asset category (e.g. "Equities-US", "Bonds-Gov")
    pub category: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
    #[serde(skip)]
    by_symbol: FxHashMap<String, AssetId>,
}

impl AssetCatalog {
    pub fn new(specs: Vec<AssetSpec>) -> Result<Self, DataError> {
        let limit = usize::from(u16::MAX) + 1;
        if specs.len() > limit {
            return Err(DataError::CatalogTooLarge {
                limit,
                found: specs.len(),
            });
        }
        let mut assets = Vec::with_capacity(specs.len());
        let mut by_symbol = FxHashMap::default();
        for (idx, spec) in specs.into_iter().enumerate() {
            let id = AssetId(idx as u16);
            if by_symbol.insert(spec.symbol.clone(), id).is_some() {
                return Err(DataError::DuplicateAsset(spec.symbol));
            }
            assets.push(Asset {
                id,
                symbol: spec.symbol,
                category: spec.category,
                name: spec.name,
            });
        }
        Ok(Self { assets, by_symbol })
    }

    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.index())
    }

    pub fn lookup(&self, symbol: &str) -> Result<AssetId, DataError> {
        self.by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| DataError::UnknownAsset(symbol.to_string()))
    }

    /// Asset ids grouped by category, in catalog order within each category.
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<&str, Vec<AssetId>> {
        let mut groups: BTreeMap<&str, Vec<AssetId>> = BTreeMap::new();
        for asset in &self.assets {
            groups.entry(asset.category.as_str()).or_default().push(asset.id);
        }
        groups
    }

    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }
}
