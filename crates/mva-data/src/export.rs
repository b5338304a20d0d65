//! Response-histogram export: one weighted histogram per source tree plus
//! a channel-level data (or pseudo-data) histogram, serialized to a JSON
//! container for the downstream limit-setting step.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Poisson;
use serde::Serialize;

use mva_core::config::{AnalysisConfig, DataMode};

use crate::error::Result;
use crate::histogram::{Binning, WeightedHistogram};
use crate::reader::{self, TreeColumns};
use crate::split::rng_from_seed;
use crate::table::EventTable;

/// Externally supplied classifier scoring function.
pub type ScoreFn<'a> = &'a dyn Fn(&EventTable) -> Vec<f64>;

/// Map a tree name to its output histogram name.
///
/// The leading `Ttree` prefix (and any underscores after it) is replaced
/// by `MVA_<channel>_`. With combine-compatible naming, the systematic
/// suffixes `__plus` and `__minus` become `Up` and `Down`.
pub fn format_hist_name(tree_name: &str, channel: &str, combine: bool) -> String {
    let rest = tree_name.strip_prefix("Ttree").unwrap_or(tree_name);
    let rest = rest.trim_start_matches('_');
    let mut name = format!("MVA_{channel}_{rest}");
    if combine {
        if let Some(base) = name.strip_suffix("__plus") {
            name = format!("{base}Up");
        } else if let Some(base) = name.strip_suffix("__minus") {
            name = format!("{base}Down");
        }
    }
    name
}

/// Real-data tree label for a channel.
fn data_label(channel: &str) -> &'static str {
    if channel == "ee" { "DataEG" } else { "DataMu" }
}

/// Trees that feed the pseudo-data pool: no systematic variations and no
/// real data.
fn in_pseudo_pool(tree_name: &str, channel: &str) -> bool {
    !(tree_name.contains("plus")
        || tree_name.contains("minus")
        || tree_name.ends_with(data_label(channel)))
}

/// One exported histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramRecord {
    /// Channel-qualified histogram name.
    pub name: String,
    /// Number of uniform bins.
    pub n_bins: usize,
    /// Lower range edge.
    pub x_min: f64,
    /// Upper range edge.
    pub x_max: f64,
    /// Per-bin weight sums.
    pub content: Vec<f64>,
    /// Per-bin statistical errors.
    pub errors: Vec<f64>,
}

impl From<&WeightedHistogram> for HistogramRecord {
    fn from(h: &WeightedHistogram) -> Self {
        Self {
            name: h.name.clone(),
            n_bins: h.binning.n_bins,
            x_min: h.binning.x_min,
            x_max: h.binning.x_max,
            content: h.content.clone(),
            errors: h.errors(),
        }
    }
}

/// The serialized export artifact.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramContainer {
    /// Container format version.
    pub schema_version: u32,
    /// Channel label the histograms belong to.
    pub channel: String,
    /// Histograms in deterministic order: inputs in file/tree order, the
    /// channel data histogram last.
    pub histograms: Vec<HistogramRecord>,
}

impl HistogramContainer {
    /// Pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `mva_<channel>.json` under `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("mva_{}.json", self.channel));
        let mut text = self.to_json()?;
        text.push('\n');
        fs::write(&path, text)?;
        Ok(path)
    }
}

/// Evaluate `score` over every tree of every input file and histogram the
/// responses over `range`.
///
/// Per file, duplicate tree names are dropped (first occurrence wins).
/// NaN event weights are counted and warned about, and dropped when the
/// configuration says so. The channel data histogram is empty or a
/// Poisson draw from the aggregated non-systematic, non-data pool.
pub fn export_histograms(
    cfg: &AnalysisConfig,
    range: (f64, f64),
    score: ScoreFn,
) -> Result<HistogramContainer> {
    let selection =
        cfg.selection.as_deref().map(mva_root::SelectionExpr::compile).transpose()?;
    let binning = Binning::new(cfg.root_out.bins, range.0, range.1);
    let combine = cfg.root_out.combine;

    let mut histograms: Vec<WeightedHistogram> = Vec::new();
    let mut pool = WeightedHistogram::new("pool", binning);

    for (_, path) in reader::input_files(&cfg.input_dir)? {
        let file = match mva_root::RootFile::open(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unreadable file, skipping");
                continue;
            }
        };

        let mut seen: HashSet<String> = HashSet::new();
        for tree_name in file.tree_names()? {
            if !seen.insert(tree_name.clone()) {
                tracing::debug!(tree = %tree_name, "duplicate tree name, keeping first");
                continue;
            }

            let cols =
                match reader::read_tree_columns(&file, &tree_name, &cfg.features, selection.as_ref())
                {
                    Ok(Some(c)) => c,
                    Ok(None) => {
                        tracing::debug!(tree = %tree_name, "empty tree, skipping");
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(tree = %tree_name, error = %e, "unreadable tree, skipping");
                        continue;
                    }
                };
            let cols = drop_nan_weights(cols, &tree_name, cfg.root_out.drop_nan);

            let table = columns_to_table(&cfg.features, cols, &tree_name);
            let scores = score(&table);

            let mut hist = WeightedHistogram::new(
                format_hist_name(&tree_name, &cfg.channel, combine),
                binning,
            );
            hist.fill_all(&scores, &table.weight);

            if cfg.root_out.data == DataMode::Poisson && in_pseudo_pool(&tree_name, &cfg.channel)
            {
                pool.add(&hist);
            }
            histograms.push(hist);
        }
    }

    let data_name = if combine {
        format!("MVA_{}_data_obs", cfg.channel)
    } else {
        format!("MVA_{}_DATA", cfg.channel)
    };
    let mut data = WeightedHistogram::new(data_name, binning);
    if cfg.root_out.data == DataMode::Poisson {
        let mut rng = rng_from_seed(cfg.seed);
        poisson_pseudodata(&pool, &mut data, &mut rng);
    }
    histograms.push(data);

    Ok(HistogramContainer {
        schema_version: 1,
        channel: cfg.channel.clone(),
        histograms: histograms.iter().map(HistogramRecord::from).collect(),
    })
}

/// Count (and optionally drop) NaN event weights.
fn drop_nan_weights(cols: TreeColumns, tree_name: &str, drop: bool) -> TreeColumns {
    let n_nan = cols.weight.iter().filter(|w| w.is_nan()).count();
    if n_nan == 0 {
        return cols;
    }
    tracing::warn!(tree = %tree_name, count = n_nan, dropped = drop, "NaN event weights");
    if !drop {
        return cols;
    }
    let mask: Vec<bool> = cols.weight.iter().map(|w| !w.is_nan()).collect();
    let filter = |col: &[f64]| {
        col.iter().zip(&mask).filter_map(|(&v, &k)| k.then_some(v)).collect::<Vec<f64>>()
    };
    TreeColumns {
        columns: cols.columns.iter().map(|c| filter(c)).collect(),
        weight: filter(&cols.weight),
    }
}

/// Wrap one tree's columns as an event table for the scoring seam.
fn columns_to_table(features: &[String], cols: TreeColumns, tree_name: &str) -> EventTable {
    let n = cols.weight.len();
    let mut table = EventTable::new(features.to_vec());
    table.columns = cols.columns;
    table.mva_weight = cols.weight.clone();
    table.weight = cols.weight;
    table.process = vec![tree_name.to_string(); n];
    table.label = vec![0; n];
    table
}

/// Replace each bin of `out` by a Poisson draw with the matching pool
/// bin's magnitude as mean, negated for negative bins. Zero bins stay
/// zero.
fn poisson_pseudodata(pool: &WeightedHistogram, out: &mut WeightedHistogram, rng: &mut StdRng) {
    for (i, &c) in pool.content.iter().enumerate() {
        if c == 0.0 {
            continue;
        }
        let lambda = c.abs();
        let draw = match Poisson::new(lambda) {
            Ok(d) => rng.sample::<f64, _>(d),
            Err(_) => 0.0,
        };
        out.content[i] = draw * c.signum();
        out.sumw2[i] = draw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_mapping_combine() {
        assert_eq!(format_hist_name("Ttree__ProcA__plus", "ee", true), "MVA_ee_ProcAUp");
        assert_eq!(format_hist_name("Ttree__ProcA__minus", "ee", true), "MVA_ee_ProcADown");
        assert_eq!(format_hist_name("Ttree_tZq", "mumu", true), "MVA_mumu_tZq");
    }

    #[test]
    fn name_mapping_without_combine_keeps_suffix() {
        assert_eq!(format_hist_name("Ttree__ProcA__plus", "ee", false), "MVA_ee_ProcA__plus");
    }

    #[test]
    fn pool_membership() {
        assert!(in_pseudo_pool("Ttree_tZq", "ee"));
        assert!(!in_pseudo_pool("Ttree__tZq__plus", "ee"));
        assert!(!in_pseudo_pool("Ttree__tZq__minus", "ee"));
        assert!(!in_pseudo_pool("Ttree_DataEG", "ee"));
        // a data tree for the other channel still counts for this one
        assert!(in_pseudo_pool("Ttree_DataEG", "mumu"));
        assert!(!in_pseudo_pool("Ttree_DataMu", "mumu"));
    }

    #[test]
    fn pseudodata_preserves_sign_and_zero_bins() {
        let binning = Binning::new(3, 0.0, 1.0);
        let mut pool = WeightedHistogram::new("pool", binning);
        pool.content = vec![50.0, 0.0, -40.0];
        let mut out = WeightedHistogram::new("data", binning);
        let mut rng = rng_from_seed(Some(11));
        poisson_pseudodata(&pool, &mut out, &mut rng);
        assert!(out.content[0] >= 0.0);
        assert_eq!(out.content[1], 0.0);
        assert!(out.content[2] <= 0.0);
    }

    #[test]
    fn pseudodata_is_seed_deterministic() {
        let binning = Binning::new(2, 0.0, 1.0);
        let mut pool = WeightedHistogram::new("pool", binning);
        pool.content = vec![100.0, 25.0];
        let mut a = WeightedHistogram::new("a", binning);
        let mut b = WeightedHistogram::new("b", binning);
        poisson_pseudodata(&pool, &mut a, &mut rng_from_seed(Some(3)));
        poisson_pseudodata(&pool, &mut b, &mut rng_from_seed(Some(3)));
        assert_eq!(a.content, b.content);
    }
}
