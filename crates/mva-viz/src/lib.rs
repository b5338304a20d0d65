//! # mva-viz
//!
//! SVG diagnostic plots for mvaprep: per-feature signal/background
//! comparisons, a feature correlation heat-map, and the train/test
//! classifier-response overlay. Rendering is self-contained; documents
//! are returned as SVG text for the caller to write.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canvas;
pub mod color;
pub mod error;
pub mod plots;

pub use canvas::{Anchor, Canvas, TextStyle};
pub use color::Color;
pub use error::{RenderError, Result};
pub use plots::correlation::{pearson_matrix, render_correlation};
pub use plots::response::{render_response, ResponseSample};
pub use plots::variables::{render_variable_grid, FeatureSeries};
