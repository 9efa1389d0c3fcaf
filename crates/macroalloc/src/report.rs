//! Run report rendering: a terminal summary and YAML/JSON files.

use std::fmt;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};

use macroalloc_core::model::AssetCatalog;
use macroalloc_core::pipeline::{RunInputs, RunReport};

use crate::util::format::{format_growth, format_percent_points, format_percentage, format_ratio};
use crate::util::io::atomic_write;

/// Terminal rendering of a run report
pub struct ReportView<'a> {
    report: &'a RunReport,
    features: &'a [String],
    catalog: &'a AssetCatalog,
    top: usize,
}

impl<'a> ReportView<'a> {
    /// `top` limits the ranking table to the best N candidates.
    #[must_use]
    pub fn new(report: &'a RunReport, inputs: &'a RunInputs, top: usize) -> Self {
        Self {
            report,
            features: inputs.macro_history.schema().names(),
            catalog: &inputs.catalog,
            top,
        }
    }

    fn write_regime(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.report.classification;
        writeln!(
            f,
            "Current regime: {} (distance {:.3})",
            c.regime, c.distance
        )?;
        if c.low_confidence {
            writeln!(f, "  warning: far from every regime centroid")?;
        }
        if c.extrapolated {
            writeln!(f, "  warning: indicators outside the historical range")?;
        }

        writeln!(f)?;
        writeln!(f, "Regimes (k={}):", self.report.regimes.len())?;
        write!(f, "  {:<12} {:>8} {:>8}", "Regime", "Growth", "Members")?;
        for name in self.features {
            write!(f, " {name:>14}")?;
        }
        writeln!(f)?;
        for centroid in &self.report.regimes {
            write!(
                f,
                "  {:<12} {:>8.3} {:>8}",
                centroid.regime.label(),
                centroid.growth_score,
                centroid.members
            )?;
            for level in &centroid.levels {
                write!(f, " {level:>14.2}")?;
            }
            writeln!(f)?;
        }

        if !self.report.nearest_periods.is_empty() {
            writeln!(f)?;
            writeln!(f, "Closest historical periods:")?;
            for period in &self.report.nearest_periods {
                writeln!(
                    f,
                    "  {}  {:<12} {:.3}",
                    period.date,
                    period.regime.label(),
                    period.distance
                )?;
            }
        }
        Ok(())
    }

    fn write_allocation(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let source = if report.custom_allocation {
            "custom allocation"
        } else if report.strategy_overridden {
            "override"
        } else {
            "regime default"
        };
        writeln!(f)?;
        writeln!(f, "Strategy: {} ({source})", report.strategy)?;
        writeln!(f, "  {:<20} {:>7} {:>7} {:>7}", "Category", "Min", "Target", "Max")?;
        for (category, band) in report.allocation.bands() {
            writeln!(
                f,
                "  {:<20} {:>7} {:>7} {:>7}",
                category,
                format_percent_points(band.min),
                format_percent_points(band.target),
                format_percent_points(band.max)
            )?;
        }
        Ok(())
    }

    fn write_ranking(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f)?;
        writeln!(
            f,
            "Top {} of {} candidates ({} requested, {} dropped, {} with zero volatility):",
            self.top.min(report.ranked.len()),
            report.ranked.len(),
            report.requested_candidates,
            report.dropped_candidates,
            report.degenerate_count()
        )?;
        writeln!(
            f,
            "  {:>4} {:>6} {:>9} {:>9} {:>8} {:>9} {:>9} {:>8}",
            "Rank", "Id", "Return", "CAGR", "Sharpe", "Vol", "Drawdown", "Score"
        )?;
        for scored in report.ranked.iter().take(self.top) {
            let m = &scored.metrics;
            writeln!(
                f,
                "  {:>4} {:>6} {:>9} {:>9} {:>8} {:>9} {:>9} {:>8.4}",
                scored.rank,
                scored.id().0,
                format_percentage(m.total_return),
                format_percentage(m.annualized_return),
                format_ratio(m.sharpe_ratio),
                format_percentage(m.volatility),
                format_percentage(m.max_drawdown),
                m.score
            )?;
        }
        Ok(())
    }

    fn write_best(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(best) = self.report.best() else {
            return writeln!(f, "\nNo candidate portfolios.");
        };
        writeln!(f)?;
        writeln!(f, "Best portfolio (#{}):", best.id().0)?;
        for asset in self.catalog.assets() {
            let weight = best.portfolio.weight(asset.id);
            if weight > 0.0 {
                writeln!(
                    f,
                    "  {:<8} {:<20} {:>8}",
                    asset.symbol,
                    asset.category,
                    format_percentage(weight)
                )?;
            }
        }
        let categories = best
            .portfolio
            .category_weights(self.catalog)
            .into_iter()
            .map(|(category, w)| format!("{category} {}", format_percentage(w)))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "  By category: {categories}")?;
        if let Some(last) = self.report.best_mean_path.last() {
            writeln!(f, "  Mean growth over the horizon: {}", format_growth(*last))?;
        }
        Ok(())
    }
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_regime(f)?;
        self.write_allocation(f)?;
        self.write_ranking(f)?;
        self.write_best(f)
    }
}

/// Serialize the full report to `path`. The format follows the extension:
/// `.yaml`/`.yml` or `.json`.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => {
            serde_saphyr::to_string(report).wrap_err("failed to serialize report as YAML")?
        }
        Some("json") => {
            serde_json::to_string_pretty(report).wrap_err("failed to serialize report as JSON")?
        }
        _ => bail!(
            "unsupported report format for {} (expected .yaml, .yml or .json)",
            path.display()
        ),
    };
    atomic_write(path, &content)
        .wrap_err_with(|| format!("failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{SAMPLE_SCENARIO, Scenario, ScenarioFile};
    use macroalloc_core::pipeline::run;
    use tempfile::tempdir;

    fn sample_run() -> (Scenario, RunReport) {
        let scenario = ScenarioFile::from_yaml(SAMPLE_SCENARIO)
            .unwrap()
            .into_scenario()
            .unwrap();
        let report = run(&scenario.inputs, &scenario.config).unwrap();
        (scenario, report)
    }

    #[test]
    fn test_text_report_sections() {
        let (scenario, report) = sample_run();
        let text = ReportView::new(&report, &scenario.inputs, 3).to_string();

        assert!(text.starts_with("Current regime: Boom"));
        assert!(text.contains("Regimes (k=2):"));
        assert!(text.contains("Unemployment"));
        assert!(text.contains("Strategy: Growth (regime default)"));
        assert!(text.contains("Top 3 of"));
        assert!(text.contains("Best portfolio"));
        assert!(text.contains("By category: Bonds"));

        let rows = text
            .lines()
            .skip_while(|l| !l.contains("Rank"))
            .skip(1)
            .take_while(|l| !l.is_empty())
            .count();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_write_json_and_yaml() {
        let (_, report) = sample_run();
        let dir = tempdir().unwrap();

        let json_path = dir.path().join("report.json");
        write_report(&json_path, &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(
            value["ranked"].as_array().unwrap().len(),
            report.ranked.len()
        );
        assert_eq!(value["classification"]["regime"], "Boom");

        let yaml_path = dir.path().join("report.yml");
        write_report(&yaml_path, &report).unwrap();
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.contains("classification:"));
        assert!(!dir.path().join("report.yml.tmp").exists());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let (_, report) = sample_run();
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let err = write_report(&path, &report).unwrap_err();
        assert!(err.to_string().contains("unsupported report format"));
        assert!(!path.exists());
    }
}
