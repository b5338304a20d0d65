//! # mva-root
//!
//! Native ROOT file reader for mvaprep.
//!
//! Reads flat TTrees from `.root` files without Python or external ROOT
//! libraries: file header, key records, zlib/LZ4/ZSTD/XZ compression blocks,
//! TTree streamer metadata, and scalar branch columns. Also carries the
//! expression engine used for selection predicates and response scores, and
//! a synthetic file builder for fixtures.
//!
//! ## Example
//!
//! ```no_run
//! use mva_root::RootFile;
//!
//! let f = RootFile::open("histofile_tZq.root").unwrap();
//! let tree = f.get_tree("Ttree_tZq").unwrap();
//! let pt: Vec<f64> = f.branch_f64(&tree, "pt_lead").unwrap();
//! println!("{} entries", pt.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decompress;
pub mod error;
pub mod expr;
pub mod file;
pub mod key;
pub mod rbuffer;
pub mod synth;
pub mod tree;

pub use error::{Result, RootError};
pub use expr::SelectionExpr;
pub use file::RootFile;
pub use key::KeyInfo;
pub use synth::SynthFile;
pub use tree::{BranchInfo, LeafKind, Tree};
