//! # mva-core
//!
//! Shared foundation for the mvaprep workspace: the common error type and
//! the analysis configuration model.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;

pub use config::{AnalysisConfig, DataMode, RootOut, WeightTreatment};
pub use error::{Error, Result};
