//! End-to-end reads of builder-generated files.

use approx::assert_relative_eq;

use mva_root::{LeafKind, RootFile, SynthFile};

#[test]
fn single_tree_round_trip() {
    let weights = vec![1.0, -0.5, 2.25, 0.75];
    let pt = vec![31.0, 48.5, 17.25, 99.0];

    let mut f = SynthFile::new();
    f.tree("Ttree_ProcA")
        .branch_f64("EvtWeight", &weights)
        .branch_f64("pt_lead", &pt);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    assert_eq!(file.tree_names().unwrap(), vec!["Ttree_ProcA"]);

    let tree = file.get_tree("Ttree_ProcA").unwrap();
    assert_eq!(tree.entries, 4);
    assert_eq!(tree.branch_names(), vec!["EvtWeight", "pt_lead"]);

    assert_eq!(file.branch_f64(&tree, "EvtWeight").unwrap(), weights);
    assert_eq!(file.branch_f64(&tree, "pt_lead").unwrap(), pt);
}

#[test]
fn multi_basket_branches() {
    let values: Vec<f64> = (0..100).map(|i| i as f64 * 0.5 - 10.0).collect();

    let mut f = SynthFile::new();
    f.tree("events").branch_f64("x", &values).baskets(7);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    let tree = file.get_tree("events").unwrap();
    assert_eq!(tree.branch("x").unwrap().n_baskets, 7);
    assert_eq!(file.branch_f64(&tree, "x").unwrap(), values);
}

#[test]
fn compressed_payloads() {
    let values: Vec<f64> = (0..500).map(|i| (i % 13) as f64).collect();

    let mut f = SynthFile::new();
    f.compressed(true);
    f.tree("events").branch_f64("njet", &values).baskets(3);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    let tree = file.get_tree("events").unwrap();
    assert_eq!(file.branch_f64(&tree, "njet").unwrap(), values);
}

#[test]
fn f32_leaves_widen_on_read() {
    let values = vec![1.5, -2.25, 1024.0];

    let mut f = SynthFile::new();
    f.tree("t").branch_f32("met", &values);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    let tree = file.get_tree("t").unwrap();
    assert_eq!(tree.branch("met").unwrap().leaf, LeafKind::F32);
    let col = file.branch_f64(&tree, "met").unwrap();
    for (got, want) in col.iter().zip(&values) {
        assert_relative_eq!(got, want);
    }
}

#[test]
fn integer_leaves() {
    let values = vec![4.0, 5.0, 6.0, 2.0];

    let mut f = SynthFile::new();
    f.tree("t")
        .branch("njet", LeafKind::I32, &values)
        .branch("event_id", LeafKind::I64, &values);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    let tree = file.get_tree("t").unwrap();
    assert_eq!(file.branch_f64(&tree, "njet").unwrap(), values);
    assert_eq!(file.branch_f64(&tree, "event_id").unwrap(), values);
}

#[test]
fn duplicate_tree_names_keep_file_order() {
    let mut f = SynthFile::new();
    f.tree("Ttree_Proc").branch_f64("EvtWeight", &[1.0]);
    f.tree("Ttree_Proc").branch_f64("EvtWeight", &[2.0, 3.0]);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    assert_eq!(file.tree_names().unwrap(), vec!["Ttree_Proc", "Ttree_Proc"]);

    // Lookup by name resolves to the first occurrence.
    let tree = file.get_tree("Ttree_Proc").unwrap();
    assert_eq!(tree.entries, 1);
    assert_eq!(file.branch_f64(&tree, "EvtWeight").unwrap(), vec![1.0]);
}

#[test]
fn empty_tree_reads_as_zero_entries() {
    let mut f = SynthFile::new();
    f.tree("empty").branch_f64("EvtWeight", &[]);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    let tree = file.get_tree("empty").unwrap();
    assert_eq!(tree.entries, 0);
    assert!(file.branch_f64(&tree, "EvtWeight").unwrap().is_empty());
}

#[test]
fn missing_tree_and_branch_errors() {
    let mut f = SynthFile::new();
    f.tree("t").branch_f64("x", &[1.0]);

    let file = RootFile::from_bytes(f.to_bytes().unwrap()).unwrap();
    assert!(file.get_tree("nope").is_err());
    let tree = file.get_tree("t").unwrap();
    assert!(file.branch_f64(&tree, "nope").is_err());
}

#[test]
fn open_from_disk_via_mmap() {
    let dir = std::env::temp_dir().join(format!(
        "mva-root-test-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("histofile_ProcA.root");

    let mut f = SynthFile::new();
    f.tree("Ttree_ProcA").branch_f64("EvtWeight", &[1.0, 2.0]);
    f.write_to(&path).unwrap();

    let file = RootFile::open(&path).unwrap();
    let tree = file.get_tree("Ttree_ProcA").unwrap();
    assert_eq!(file.branch_f64(&tree, "EvtWeight").unwrap(), vec![1.0, 2.0]);

    std::fs::remove_dir_all(&dir).unwrap();
}
