mod allocation;
mod assets;
mod history;
mod ids;
mod macro_data;
mod portfolio;
mod regime;
mod results;

pub use allocation::{AllocationBand, AllocationTarget, TARGET_SUM_TOLERANCE};
pub use assets::{Asset, AssetCatalog, AssetSpec};
pub use history::ReturnHistory;
pub use ids::{AssetId, CandidateId};
pub use macro_data::{FeatureSchema, MacroHistory, MacroObservation, MacroVector, indicators};
pub use portfolio::{CandidatePortfolio, WEIGHT_TOLERANCE};
pub use regime::{Regime, Strategy};
pub use results::{
    PortfolioMetrics, ScoredPortfolio, SimulationPath, SimulationWarning, WarningKind,
};
