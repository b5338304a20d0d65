//! `plot`: render the diagnostic SVGs.
//!
//! Individual plot failures are logged and skipped; a bad feature column
//! must not abort the remaining diagnostics.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use mva_core::config::AnalysisConfig;
use mva_data::{read_trees, rng_from_seed, train_test_split, EventTable};
use mva_viz::{
    render_correlation, render_response, render_variable_grid, FeatureSeries, ResponseSample,
};

use crate::export::{compile_response, score_table};

const PLOT_BINS: usize = 25;

pub fn run(cfg: &AnalysisConfig, response: Option<&str>) -> Result<()> {
    let table = read_trees(cfg).context("failed to build the event table")?;
    if table.is_empty() {
        anyhow::bail!("no events read from {}", cfg.input_dir.display());
    }
    fs::create_dir_all(&cfg.plot_dir)
        .with_context(|| format!("failed to create {}", cfg.plot_dir.display()))?;

    write_plot(&cfg.plot_dir, "variables.svg", render_variables(cfg, &table));
    write_plot(&cfg.plot_dir, "correlation.svg", render_corr(&table));

    match response {
        None => tracing::info!("no --response expression, skipping the response overlay"),
        Some(text) => {
            let expr = compile_response(text, &cfg.features)?;
            let scores = score_table(&expr, &table);
            write_plot(&cfg.plot_dir, "response.svg", render_resp(cfg, &table, &scores));
        }
    }
    Ok(())
}

/// Write one rendered document, downgrading failures to a log line.
fn write_plot(dir: &Path, name: &str, svg: mva_viz::Result<String>) {
    match svg {
        Ok(svg) => {
            let path = dir.join(name);
            match fs::write(&path, svg) {
                Ok(()) => tracing::info!(path = %path.display(), "plot written"),
                Err(e) => tracing::error!(plot = name, error = %e, "plot not written"),
            }
        }
        Err(e) => tracing::error!(plot = name, error = %e, "plot skipped"),
    }
}

fn render_variables(cfg: &AnalysisConfig, table: &EventTable) -> mva_viz::Result<String> {
    let sig = table.select_rows(&table.signal_rows());
    let bkg = table.select_rows(&table.background_rows());
    let series: Vec<FeatureSeries<'_>> = cfg
        .features
        .iter()
        .enumerate()
        .map(|(i, name)| FeatureSeries {
            name,
            signal: &sig.columns[i],
            signal_weights: &sig.mva_weight,
            background: &bkg.columns[i],
            background_weights: &bkg.mva_weight,
        })
        .collect();
    render_variable_grid(&series, PLOT_BINS)
}

fn render_corr(table: &EventTable) -> mva_viz::Result<String> {
    let names: Vec<&str> = table.features.iter().map(String::as_str).collect();
    let cols: Vec<&[f64]> = table.columns.iter().map(Vec::as_slice).collect();
    render_correlation(&names, &cols)
}

fn render_resp(
    cfg: &AnalysisConfig,
    table: &EventTable,
    scores: &[f64],
) -> mva_viz::Result<String> {
    // Split on a table that carries the scores as its only feature, so the
    // train/test rows keep their class labels and weights aligned.
    let mut scored = EventTable::new(vec!["response".to_string()]);
    scored.columns = vec![scores.to_vec()];
    scored.weight = table.weight.clone();
    scored.mva_weight = table.mva_weight.clone();
    scored.process = table.process.clone();
    scored.label = table.label.clone();

    let mut rng = rng_from_seed(cfg.seed);
    let (train, test) = train_test_split(&scored, cfg.test_fraction, &mut rng);
    let train_sig = train.select_rows(&train.signal_rows());
    let train_bkg = train.select_rows(&train.background_rows());
    let test_sig = test.select_rows(&test.signal_rows());
    let test_bkg = test.select_rows(&test.background_rows());

    let sample = |t: &EventTable| -> (Vec<f64>, Vec<f64>) {
        (t.columns[0].clone(), t.mva_weight.clone())
    };
    let (tr_s, tr_sw) = sample(&train_sig);
    let (tr_b, tr_bw) = sample(&train_bkg);
    let (te_s, te_sw) = sample(&test_sig);
    let (te_b, te_bw) = sample(&test_bkg);

    render_response(
        ResponseSample { scores: &tr_s, weights: &tr_sw },
        ResponseSample { scores: &tr_b, weights: &tr_bw },
        ResponseSample { scores: &te_s, weights: &te_sw },
        ResponseSample { scores: &te_b, weights: &te_bw },
        cfg.root_out.bins,
    )
}
