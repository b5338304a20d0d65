//! Per-process tree reading and training-table assembly.

use std::fs;
use std::path::{Path, PathBuf};

use mva_core::config::AnalysisConfig;
use mva_root::{RootFile, SelectionExpr};

use crate::error::{DataError, Result};
use crate::table::EventTable;
use crate::weights;

/// Branch holding the per-event weight in every input tree.
pub const WEIGHT_BRANCH: &str = "EvtWeight";

const FILE_PREFIX: &str = "histofile_";
const FILE_SUFFIX: &str = ".root";

/// Feature columns and weights of one tree after selection.
pub(crate) struct TreeColumns {
    pub columns: Vec<Vec<f64>>,
    pub weight: Vec<f64>,
}

/// Input files under `dir` named `histofile_<process>.root`, sorted by
/// file name. Returns `(process, path)` pairs.
pub(crate) fn input_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| {
        DataError::Input(format!("cannot read input dir {}: {e}", dir.display()))
    })? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_prefix(FILE_PREFIX).and_then(|s| s.strip_suffix(FILE_SUFFIX))
        {
            out.push((stem.to_string(), entry.path()));
        }
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(out)
}

/// Read one tree's feature columns and weights, applying the selection.
///
/// `Ok(None)` means the tree holds no entries (or none pass the
/// selection); any `Err` is the caller's to downgrade to a skip.
pub(crate) fn read_tree_columns(
    file: &RootFile,
    tree_name: &str,
    features: &[String],
    selection: Option<&SelectionExpr>,
) -> Result<Option<TreeColumns>> {
    let tree = file.get_tree(tree_name)?;
    if tree.entries == 0 {
        return Ok(None);
    }

    let mut columns = Vec::with_capacity(features.len());
    for f in features {
        columns.push(file.branch_f64(&tree, f)?);
    }
    let weight = file.branch_f64(&tree, WEIGHT_BRANCH)?;
    let n = weight.len();

    let keep: Option<Vec<bool>> = match selection {
        None => None,
        Some(sel) => {
            // Reuse feature columns already in memory; read the rest.
            let mut sel_cols: Vec<Vec<f64>> = Vec::with_capacity(sel.branches.len());
            for b in &sel.branches {
                match features.iter().position(|f| f == b) {
                    Some(i) => sel_cols.push(columns[i].clone()),
                    None => sel_cols.push(file.branch_f64(&tree, b)?),
                }
            }
            let refs: Vec<&[f64]> = sel_cols.iter().map(Vec::as_slice).collect();
            Some(sel.eval_columns(&refs, n).iter().map(|&v| v > 0.0).collect())
        }
    };

    let (columns, weight) = match keep {
        None => (columns, weight),
        Some(mask) => {
            let filter = |col: &[f64]| {
                col.iter()
                    .zip(&mask)
                    .filter_map(|(&v, &k)| k.then_some(v))
                    .collect::<Vec<f64>>()
            };
            (columns.iter().map(|c| filter(c)).collect(), filter(&weight))
        }
    };

    if weight.is_empty() {
        return Ok(None);
    }
    Ok(Some(TreeColumns { columns, weight }))
}

/// Build the combined labeled training table from all recognized processes.
///
/// Signal rows come first. When `equalise_signal` is set, the adjusted
/// signal and background weight sums are balanced before concatenation.
pub fn read_trees(cfg: &AnalysisConfig) -> Result<EventTable> {
    let selection = cfg.selection.as_deref().map(SelectionExpr::compile).transpose()?;

    let mut signal = EventTable::new(cfg.features.clone());
    let mut background = EventTable::new(cfg.features.clone());

    for (process, path) in input_files(&cfg.input_dir)? {
        let is_signal = cfg.signals.iter().any(|s| *s == process);
        let is_background = cfg.backgrounds.iter().any(|b| *b == process);
        if !is_signal && !is_background {
            tracing::debug!(%process, "process not configured, skipping");
            continue;
        }

        let file = match RootFile::open(&path) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(%process, error = %e, "unreadable file, skipping");
                continue;
            }
        };

        let tree_name = format!("Ttree_{process}");
        let cols = match read_tree_columns(&file, &tree_name, &cfg.features, selection.as_ref()) {
            Ok(Some(c)) => c,
            Ok(None) => {
                tracing::debug!(%process, "no events after selection, skipping");
                continue;
            }
            Err(e) => {
                tracing::debug!(%process, error = %e, "unreadable tree, skipping");
                continue;
            }
        };

        let mut mva_weight = cols.weight.clone();
        weights::apply_treatment(&mut mva_weight, cfg.negative_weight_treatment)?;

        let n = cols.weight.len();
        let raw_sum: f64 = cols.weight.iter().sum();
        tracing::info!(%process, events = n, weight_sum = raw_sum, "loaded process");

        let target = if is_signal { &mut signal } else { &mut background };
        for (dst, src) in target.columns.iter_mut().zip(cols.columns) {
            dst.extend(src);
        }
        target.weight.extend(cols.weight);
        target.mva_weight.extend(mva_weight);
        target.process.extend(std::iter::repeat(process.clone()).take(n));
        target.label.extend(std::iter::repeat(u8::from(is_signal)).take(n));
    }

    if cfg.equalise_signal {
        weights::balance_weights(&mut signal.mva_weight, &mut background.mva_weight)?;
    }

    signal.append(background)?;
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use mva_root::SynthFile;

    use super::*;

    #[test]
    fn input_files_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("mva-data-inputs-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in ["histofile_tt.root", "histofile_tZq.root", "notes.txt", "other.root"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        let found = input_files(&dir).unwrap();
        let procs: Vec<&str> = found.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(procs, vec!["tZq", "tt"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn selection_filters_rows() {
        let mut f = SynthFile::new();
        f.tree("Ttree_tt")
            .branch_f64("pt", &[10.0, 30.0, 50.0])
            .branch_f64(WEIGHT_BRANCH, &[1.0, 2.0, 3.0]);
        let file = mva_root::RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();

        let sel = SelectionExpr::compile("pt > 20").unwrap();
        let cols = read_tree_columns(&file, "Ttree_tt", &["pt".to_string()], Some(&sel))
            .unwrap()
            .unwrap();
        assert_eq!(cols.columns[0], vec![30.0, 50.0]);
        assert_eq!(cols.weight, vec![2.0, 3.0]);
    }

    #[test]
    fn empty_after_selection_is_none() {
        let mut f = SynthFile::new();
        f.tree("Ttree_tt").branch_f64("pt", &[1.0]).branch_f64(WEIGHT_BRANCH, &[1.0]);
        let file = mva_root::RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();

        let sel = SelectionExpr::compile("pt > 100").unwrap();
        let got = read_tree_columns(&file, "Ttree_tt", &["pt".to_string()], Some(&sel)).unwrap();
        assert!(got.is_none());
    }
}
