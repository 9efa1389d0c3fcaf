//! Aligned historical per-period returns for every catalog asset.
//!
//! Row `t` holds the simple returns of all assets over period `t`, so
//! resampling whole rows keeps the cross-asset correlation of that period.

use rand::Rng;
use serde::Serialize;

use crate::error::DataError;

use super::ids::AssetId;

#[derive(Debug, Clone, Serialize)]
pub struct ReturnHistory {
    num_assets: usize,
    /// returns[period][asset]
    returns: Vec<Vec<f64>>,
}

impl ReturnHistory {
    /// Create a history from per-period simple returns with validation.
    pub fn from_returns(num_assets: usize, returns: Vec<Vec<f64>>) -> Result<Self, DataError> {
        if num_assets == 0 {
            return Err(DataError::MisalignedSeries {
                expected: 1,
                found: 0,
            });
        }
        if returns.is_empty() {
            return Err(DataError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        for (period, row) in returns.iter().enumerate() {
            if row.len() != num_assets {
                return Err(DataError::MisalignedSeries {
                    expected: num_assets,
                    found: row.len(),
                });
            }
            for (asset, r) in row.iter().enumerate() {
                // A return of -100% or worse would wipe out the asset for good
                if !r.is_finite() || *r <= -1.0 {
                    return Err(DataError::NonFiniteReturn {
                        asset: AssetId(asset as u16),
                        period,
                    });
                }
            }
        }
        Ok(Self {
            num_assets,
            returns,
        })
    }

    /// Derive simple returns from aligned price rows. `None` marks a gap, which
    /// is rejected rather than imputed.
    pub fn from_prices(num_assets: usize, prices: &[Vec<Option<f64>>]) -> Result<Self, DataError> {
        if prices.len() < 2 {
            return Err(DataError::InsufficientHistory {
                required: 2,
                available: prices.len(),
            });
        }
        let mut checked = Vec::with_capacity(prices.len());
        for (period, row) in prices.iter().enumerate() {
            if row.len() != num_assets {
                return Err(DataError::MisalignedSeries {
                    expected: num_assets,
                    found: row.len(),
                });
            }
            let mut values = Vec::with_capacity(num_assets);
            for (asset, price) in row.iter().enumerate() {
                let asset = AssetId(asset as u16);
                let price = price.ok_or(DataError::MissingPrice { asset, period })?;
                if !price.is_finite() || price <= 0.0 {
                    return Err(DataError::InvalidPrice {
                        asset,
                        period,
                        value: price,
                    });
                }
                values.push(price);
            }
            checked.push(values);
        }

        let returns = checked
            .windows(2)
            .map(|w| w[1].iter().zip(&w[0]).map(|(now, prev)| now / prev - 1.0).collect())
            .collect();
        Self::from_returns(num_assets, returns)
    }

    /// Number of historical periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.num_assets
    }

    #[must_use]
    pub fn row(&self, period: usize) -> &[f64] {
        &self.returns[period]
    }

    /// Sample `n` period indices with replacement (i.i.d. bootstrap).
    pub fn sample_periods<R: Rng + ?Sized>(&self, rng: &mut R, n: usize, out: &mut Vec<u32>) {
        let len = self.returns.len();
        out.extend((0..n).map(|_| rng.random_range(0..len) as u32));
    }

    /// Block bootstrap of period indices: contiguous blocks preserve
    /// autocorrelation. Blocks wrap around at the end of the series.
    pub fn block_bootstrap_periods<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
        block_size: usize,
        out: &mut Vec<u32>,
    ) {
        let len = self.returns.len();
        let target = out.len() + n;
        while out.len() < target {
            let start = rng.random_range(0..len);
            for i in 0..block_size {
                if out.len() >= target {
                    break;
                }
                out.push(((start + i) % len) as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn history() -> ReturnHistory {
        ReturnHistory::from_returns(
            2,
            vec![
                vec![0.10, 0.05],
                vec![0.20, -0.02],
                vec![-0.15, 0.08],
                vec![0.05, 0.03],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_prices_computes_simple_returns() {
        let prices = vec![
            vec![Some(100.0), Some(50.0)],
            vec![Some(110.0), Some(50.0)],
            vec![Some(99.0), Some(55.0)],
        ];
        let history = ReturnHistory::from_prices(2, &prices).unwrap();
        assert_eq!(history.len(), 2);
        assert!((history.row(0)[0] - 0.10).abs() < 1e-12);
        assert!((history.row(1)[0] + 0.10).abs() < 1e-12);
        assert!((history.row(1)[1] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_from_prices_rejects_gaps_and_bad_prices() {
        let gap = vec![vec![Some(100.0), None], vec![Some(101.0), Some(50.0)]];
        assert_eq!(
            ReturnHistory::from_prices(2, &gap).unwrap_err(),
            DataError::MissingPrice {
                asset: AssetId(1),
                period: 0
            }
        );

        let zero = vec![vec![Some(100.0)], vec![Some(0.0)]];
        assert!(matches!(
            ReturnHistory::from_prices(1, &zero),
            Err(DataError::InvalidPrice { .. })
        ));

        let short = vec![vec![Some(100.0)]];
        assert!(matches!(
            ReturnHistory::from_prices(1, &short),
            Err(DataError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_block_bootstrap_is_contiguous_and_circular() {
        let history = history();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut periods = Vec::new();
        history.block_bootstrap_periods(&mut rng, 10, 4, &mut periods);
        assert_eq!(periods.len(), 10);
        // Within each full block, successive periods advance by one (mod len)
        for block in periods.chunks(4).filter(|b| b.len() == 4) {
            for pair in block.windows(2) {
                assert_eq!(pair[1], (pair[0] + 1) % 4);
            }
        }
    }
}
