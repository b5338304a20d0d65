//! End-to-end table assembly and histogram export over synthetic inputs.

use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;

use mva_core::config::AnalysisConfig;
use mva_data::{export_histograms, read_trees, EventTable};
use mva_root::SynthFile;

fn tmp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mva-data-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_inputs(dir: &PathBuf) {
    // Signal: weights sum 15.
    let mut sig = SynthFile::new();
    sig.tree("Ttree_tZq")
        .branch_f64("x", &[0.1, 0.9])
        .branch_f64("EvtWeight", &[10.0, 5.0]);
    sig.write_to(dir.join("histofile_tZq.root")).unwrap();

    // Background: weights sum 16, plus a systematic variation, a duplicate
    // nominal tree, and a data tree.
    let mut bkg = SynthFile::new();
    bkg.tree("Ttree_tt")
        .branch_f64("x", &[0.2, 0.8])
        .branch_f64("EvtWeight", &[8.0, 8.0]);
    bkg.tree("Ttree__tt__plus")
        .branch_f64("x", &[0.2, 0.8])
        .branch_f64("EvtWeight", &[9.0, 9.0]);
    bkg.tree("Ttree_tt")
        .branch_f64("x", &[0.5])
        .branch_f64("EvtWeight", &[100.0]);
    bkg.tree("Ttree_DataEG")
        .branch_f64("x", &[0.3])
        .branch_f64("EvtWeight", &[1.0]);
    bkg.write_to(dir.join("histofile_tt.root")).unwrap();

    // A file for a process the config does not know.
    let mut other = SynthFile::new();
    other.tree("Ttree_zz").branch_f64("x", &[0.5]).branch_f64("EvtWeight", &[1.0]);
    other.write_to(dir.join("histofile_zz.root")).unwrap();
}

fn config(dir: &PathBuf, extra: &str) -> AnalysisConfig {
    let text = format!(
        "input_dir: {}\nfeatures: [x]\nsignals: [tZq]\nbackgrounds: [tt]\nchannel: ee\nseed: 9\n{extra}",
        dir.display()
    );
    AnalysisConfig::from_yaml(&text).unwrap()
}

#[test]
fn read_trees_labels_and_equalises() {
    let dir = tmp_dir("read");
    write_inputs(&dir);
    let cfg = config(&dir, "");

    let table = read_trees(&cfg).unwrap();
    assert_eq!(table.len(), 4);
    // signal rows first
    assert_eq!(table.label, vec![1, 1, 0, 0]);
    assert_eq!(table.process, vec!["tZq", "tZq", "tt", "tt"]);
    // raw weights untouched
    assert_eq!(table.weight, vec![10.0, 5.0, 8.0, 8.0]);
    // equalise-signal balanced the adjusted sums: {10,5} vs {8,8}
    let sig_sum: f64 = table.mva_weight[..2].iter().sum();
    let bkg_sum: f64 = table.mva_weight[2..].iter().sum();
    assert_relative_eq!(sig_sum, bkg_sum, max_relative = 1e-12);
    assert!(sig_sum >= 15.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn read_trees_without_equalise_keeps_sums() {
    let dir = tmp_dir("raw");
    write_inputs(&dir);
    let cfg = config(&dir, "equalise_signal: false\n");

    let table = read_trees(&cfg).unwrap();
    assert_eq!(table.mva_weight, table.weight);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn export_dedupes_and_names_histograms() {
    let dir = tmp_dir("export");
    write_inputs(&dir);
    let cfg = config(&dir, "");

    let score = |t: &EventTable| t.feature_column("x").unwrap().to_vec();
    let container = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();

    let names: Vec<&str> =
        container.histograms.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "MVA_ee_tZq",
            "MVA_ee_tt",
            "MVA_ee_ttUp",
            "MVA_ee_DataEG",
            "MVA_ee_zz",
            "MVA_ee_data_obs",
        ]
    );

    // The duplicate Ttree_tt (weight 100) was ignored: first wins.
    let tt = &container.histograms[1];
    assert_relative_eq!(tt.content.iter().sum::<f64>(), 16.0, max_relative = 1e-12);

    // Default data mode is empty.
    let data = container.histograms.last().unwrap();
    assert!(data.content.iter().all(|&c| c == 0.0));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn export_poisson_pseudodata_draws_from_pool() {
    let dir = tmp_dir("poisson");
    write_inputs(&dir);
    let cfg = config(&dir, "root_out:\n  data: poisson\n  bins: 4\n");

    let score = |t: &EventTable| t.feature_column("x").unwrap().to_vec();
    let container = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();

    let data = container.histograms.last().unwrap();
    assert_eq!(data.name, "MVA_ee_data_obs");
    assert_eq!(data.n_bins, 4);
    // Pool bins carry tens of weight; a Poisson draw is positive with
    // overwhelming probability and integer-valued.
    let total: f64 = data.content.iter().sum();
    assert!(total > 0.0);
    assert!(data.content.iter().all(|c| c.fract() == 0.0));

    // Same seed, same draw.
    let again = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();
    assert_eq!(again.histograms.last().unwrap().content, data.content);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn nan_weights_kept_by_default_and_dropped_on_request() {
    let dir = tmp_dir("nan");
    let mut f = SynthFile::new();
    f.tree("Ttree_tZq")
        .branch_f64("x", &[0.1, 0.5, 0.9])
        .branch_f64("EvtWeight", &[1.0, f64::NAN, 2.0]);
    f.write_to(dir.join("histofile_tZq.root")).unwrap();

    let score = |t: &EventTable| t.feature_column("x").unwrap().to_vec();

    // Default: the NaN-weight row stays and poisons its bin.
    let cfg = config(&dir, "root_out:\n  bins: 4\n");
    let kept = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();
    let h = &kept.histograms[0];
    assert_eq!(h.name, "MVA_ee_tZq");
    assert!(h.content[2].is_nan());
    assert_eq!(h.content[0], 1.0);
    assert_eq!(h.content[3], 2.0);

    // drop_nan removes the row from weights and feature columns alike.
    let cfg = config(&dir, "root_out:\n  bins: 4\n  drop_nan: true\n");
    let dropped = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();
    let h = &dropped.histograms[0];
    assert!(h.content.iter().all(|c| c.is_finite()));
    assert_eq!(h.content, vec![1.0, 0.0, 0.0, 2.0]);
    assert_relative_eq!(h.content.iter().sum::<f64>(), 3.0, max_relative = 1e-12);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn container_round_trips_to_json() {
    let dir = tmp_dir("json");
    write_inputs(&dir);
    let cfg = config(&dir, "");

    let score = |t: &EventTable| t.feature_column("x").unwrap().to_vec();
    let container = export_histograms(&cfg, (0.0, 1.0), &score).unwrap();

    let out_dir = dir.join("out");
    let path = container.write_to(&out_dir).unwrap();
    assert_eq!(path.file_name().unwrap(), "mva_ee.json");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed["schema_version"], 1);
    assert_eq!(parsed["channel"], "ee");
    assert_eq!(parsed["histograms"].as_array().unwrap().len(), 6);

    fs::remove_dir_all(&dir).unwrap();
}
