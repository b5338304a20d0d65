//! Analysis configuration (YAML) parsing + semantic validation.
//!
//! A single YAML file (or stdin) drives the whole batch run: input
//! location, feature list, process partition, weighting policy, and the
//! histogram-export options. Defaults are overlaid by user-supplied values
//! and the struct is immutable after load.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// How negative event weights are treated when building the training table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightTreatment {
    /// Keep negative weights as-is.
    #[default]
    Passthrough,
    /// Take the absolute value of every weight.
    Abs,
    /// Take the absolute value, then rescale so the per-process weight sum
    /// is restored to its original value. Fails for processes whose
    /// original sum is not positive.
    Reweight,
}

/// What the channel-level (pseudo-)data histogram should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// An empty histogram.
    #[default]
    Empty,
    /// A Poisson-fluctuated draw from the summed simulation histograms.
    Poisson,
}

/// Histogram-export sub-options (`root_out` block).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RootOut {
    /// Use combine-compatible histogram names (`Up`/`Down` suffixes,
    /// `data_obs`). When false, THETA-style names are kept.
    pub combine: bool,
    /// Drop events whose weight is NaN instead of keeping them.
    pub drop_nan: bool,
    /// Channel-level data histogram mode.
    pub data: DataMode,
    /// Number of uniform response bins.
    pub bins: usize,
}

impl Default for RootOut {
    fn default() -> Self {
        Self { combine: true, drop_nan: false, data: DataMode::Empty, bins: 20 }
    }
}

/// Full configuration for one batch run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Directory containing `histofile_<process>.root` inputs.
    pub input_dir: PathBuf,
    /// Branch names used as classifier features.
    pub features: Vec<String>,
    /// Process names considered signal.
    pub signals: Vec<String>,
    /// Process names considered background.
    pub backgrounds: Vec<String>,
    /// Optional selection expression applied to every read tree.
    #[serde(default)]
    pub selection: Option<String>,
    /// RNG seed for splitting and pseudo-data. Entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Channel label used in output histogram names.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Output directory for diagnostic plots.
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,
    /// Output directory for the histogram container.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Output directory for classifier artifacts (external training step).
    #[serde(default = "default_mva_dir")]
    pub mva_dir: PathBuf,
    /// Fraction of events held out as the test sample.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Scale signal/background weight sums to match after treatment.
    #[serde(default = "default_true")]
    pub equalise_signal: bool,
    /// Negative event-weight policy.
    #[serde(default)]
    pub negative_weight_treatment: WeightTreatment,
    /// Preprocessor names for the external training step. Parsed and
    /// passed through; never executed here.
    #[serde(default)]
    pub preprocessors: Vec<String>,
    /// Histogram-export options.
    #[serde(default)]
    pub root_out: RootOut,
}

fn default_channel() -> String {
    "all".to_string()
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("plots/")
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("root/")
}

fn default_mva_dir() -> PathBuf {
    PathBuf::from("mva/")
}

fn default_test_fraction() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

impl AnalysisConfig {
    /// Parse a configuration from YAML text and validate it.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: AnalysisConfig = serde_yaml_ng::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a configuration from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Load a configuration from any reader (used for `--stdin`).
    pub fn from_reader(mut r: impl Read) -> Result<Self> {
        let mut text = String::new();
        r.read_to_string(&mut text)?;
        Self::from_yaml(&text)
    }

    /// Semantic checks that serde cannot express.
    fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(Error::Validation("'features' must not be empty".into()));
        }
        if self.signals.is_empty() {
            return Err(Error::Validation("'signals' must not be empty".into()));
        }
        if self.backgrounds.is_empty() {
            return Err(Error::Validation("'backgrounds' must not be empty".into()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::Validation(format!(
                "'test_fraction' must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.root_out.bins == 0 {
            return Err(Error::Validation("'root_out.bins' must be at least 1".into()));
        }
        if let Some(dup) = self.signals.iter().find(|s| self.backgrounds.contains(s)) {
            return Err(Error::Validation(format!(
                "process '{dup}' listed as both signal and background"
            )));
        }
        for p in &self.preprocessors {
            tracing::warn!(preprocessor = %p, "preprocessor is recorded but not executed here");
        }
        Ok(())
    }
}
