//! # mva-data
//!
//! Training-table assembly and histogram export for mvaprep.
//!
//! Reads per-process event trees into one labeled [`EventTable`], applies
//! the configured negative-weight treatment and signal/background weight
//! balancing, splits into train/test samples, and exports classifier
//! response histograms (with combine-compatible naming and optional
//! Poisson pseudo-data) to a JSON container.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod export;
pub mod histogram;
pub mod reader;
pub mod split;
pub mod table;
pub mod weights;

pub use error::{DataError, Result};
pub use export::{export_histograms, format_hist_name, HistogramContainer, HistogramRecord, ScoreFn};
pub use histogram::{Binning, WeightedHistogram};
pub use reader::{read_trees, WEIGHT_BRANCH};
pub use split::{rng_from_seed, train_test_split};
pub use table::EventTable;
pub use weights::{apply_treatment, balance_weights};
