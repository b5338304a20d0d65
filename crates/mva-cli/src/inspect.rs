//! `inspect`: list the trees and branches of the input files.

use std::fs;

use anyhow::{Context, Result};

use mva_core::config::AnalysisConfig;
use mva_root::RootFile;

pub fn run(cfg: &AnalysisConfig) -> Result<()> {
    let mut paths: Vec<_> = fs::read_dir(&cfg.input_dir)
        .with_context(|| format!("failed to read input dir {}", cfg.input_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "root"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        anyhow::bail!("no .root files under {}", cfg.input_dir.display());
    }

    for path in paths {
        println!("{}", path.display());
        let file = match RootFile::open(&path) {
            Ok(f) => f,
            Err(e) => {
                println!("  (unreadable: {e})");
                continue;
            }
        };
        for key in file.list_keys()? {
            if key.class_name != "TTree" {
                println!("  {} [{}]", key.name, key.class_name);
                continue;
            }
            match file.get_tree(&key.name) {
                Ok(tree) => {
                    println!("  {} [TTree] {} entries", tree.name, tree.entries);
                    for b in &tree.branches {
                        println!("    {} ({:?})", b.name, b.leaf);
                    }
                }
                Err(e) => println!("  {} [TTree] (unparseable: {e})", key.name),
            }
        }
    }
    Ok(())
}
