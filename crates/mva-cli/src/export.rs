//! `export`: evaluate a response expression and write the histogram
//! container.

use anyhow::{Context, Result};

use mva_core::config::AnalysisConfig;
use mva_data::{export_histograms, EventTable};
use mva_root::SelectionExpr;

/// Compile a response expression and check it only uses feature branches,
/// so scoring any table built from the configured schema cannot fail.
pub(crate) fn compile_response(text: &str, features: &[String]) -> Result<SelectionExpr> {
    let expr = SelectionExpr::compile(text)
        .with_context(|| format!("invalid response expression '{text}'"))?;
    for b in &expr.branches {
        if !features.contains(b) {
            anyhow::bail!("response expression uses '{b}', which is not a configured feature");
        }
    }
    Ok(expr)
}

/// Evaluate a pre-validated response expression over a table.
pub(crate) fn score_table(expr: &SelectionExpr, table: &EventTable) -> Vec<f64> {
    let cols: Vec<&[f64]> = expr
        .branches
        .iter()
        .filter_map(|b| table.feature_column(b))
        .collect();
    if cols.len() != expr.branches.len() {
        // Unreachable for validated expressions; score everything as 0.
        return vec![0.0; table.len()];
    }
    expr.eval_columns(&cols, table.len())
}

pub fn run(cfg: &AnalysisConfig, response: &str, range: (f64, f64)) -> Result<()> {
    if !(range.1 > range.0) {
        anyhow::bail!("histogram range is empty: ({}, {})", range.0, range.1);
    }
    let expr = compile_response(response, &cfg.features)?;

    let score = |t: &EventTable| score_table(&expr, t);
    let container =
        export_histograms(cfg, range, &score).context("histogram export failed")?;
    let path = container
        .write_to(&cfg.root_dir)
        .with_context(|| format!("failed to write container under {}", cfg.root_dir.display()))?;

    tracing::info!(path = %path.display(), histograms = container.histograms.len(), "container written");
    println!("{}", path.display());
    Ok(())
}
