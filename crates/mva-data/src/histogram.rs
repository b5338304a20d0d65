//! Weighted histograms with per-bin statistical errors.

/// Uniform binning over a closed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    /// Number of bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
}

impl Binning {
    /// Uniform binning with `n_bins` bins over `[x_min, x_max]`.
    pub fn new(n_bins: usize, x_min: f64, x_max: f64) -> Self {
        Self { n_bins, x_min, x_max }
    }

    /// Bin index for `x`, or `None` when out of range. The upper edge
    /// falls into the last bin.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !x.is_finite() || x < self.x_min || x > self.x_max {
            return None;
        }
        if x == self.x_max {
            return Some(self.n_bins - 1);
        }
        let width = (self.x_max - self.x_min) / self.n_bins as f64;
        Some(((x - self.x_min) / width) as usize)
    }
}

/// A named weighted histogram: content is the weight sum per bin, the
/// statistical error is `sqrt` of the summed squared weights.
#[derive(Debug, Clone)]
pub struct WeightedHistogram {
    /// Histogram name (already channel-qualified for exports).
    pub name: String,
    /// Bin layout.
    pub binning: Binning,
    /// Per-bin weight sums.
    pub content: Vec<f64>,
    /// Per-bin sums of squared weights.
    pub sumw2: Vec<f64>,
}

impl WeightedHistogram {
    /// An empty histogram.
    pub fn new(name: impl Into<String>, binning: Binning) -> Self {
        Self {
            name: name.into(),
            binning,
            content: vec![0.0; binning.n_bins],
            sumw2: vec![0.0; binning.n_bins],
        }
    }

    /// Add one weighted entry; out-of-range values are discarded.
    pub fn fill(&mut self, x: f64, w: f64) {
        if let Some(i) = self.binning.bin_index(x) {
            self.content[i] += w;
            self.sumw2[i] += w * w;
        }
    }

    /// Fill from parallel value/weight slices.
    pub fn fill_all(&mut self, xs: &[f64], ws: &[f64]) {
        for (&x, &w) in xs.iter().zip(ws) {
            self.fill(x, w);
        }
    }

    /// Per-bin statistical errors.
    pub fn errors(&self) -> Vec<f64> {
        self.sumw2.iter().map(|s| s.sqrt()).collect()
    }

    /// Total weight in range.
    pub fn integral(&self) -> f64 {
        self.content.iter().sum()
    }

    /// Bin-wise sum of another histogram with the same binning.
    pub fn add(&mut self, other: &WeightedHistogram) {
        debug_assert_eq!(self.binning, other.binning);
        for (c, o) in self.content.iter_mut().zip(&other.content) {
            *c += o;
        }
        for (s, o) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *s += o;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn bin_edges() {
        let b = Binning::new(4, 0.0, 1.0);
        assert_eq!(b.bin_index(0.0), Some(0));
        assert_eq!(b.bin_index(0.24), Some(0));
        assert_eq!(b.bin_index(0.25), Some(1));
        assert_eq!(b.bin_index(1.0), Some(3));
        assert_eq!(b.bin_index(-0.1), None);
        assert_eq!(b.bin_index(1.1), None);
        assert_eq!(b.bin_index(f64::NAN), None);
    }

    #[test]
    fn contents_are_weight_sums_and_errors_sqrt_sumw2() {
        let mut h = WeightedHistogram::new("h", Binning::new(2, 0.0, 1.0));
        h.fill(0.1, 2.0);
        h.fill(0.2, 3.0);
        h.fill(0.9, -1.0);
        assert_eq!(h.content, vec![5.0, -1.0]);
        let e = h.errors();
        assert_relative_eq!(e[0], (4.0f64 + 9.0).sqrt(), max_relative = 1e-12);
        assert_relative_eq!(e[1], 1.0, max_relative = 1e-12);
    }

    #[test]
    fn add_accumulates_bins() {
        let binning = Binning::new(2, 0.0, 1.0);
        let mut a = WeightedHistogram::new("a", binning);
        let mut b = WeightedHistogram::new("b", binning);
        a.fill(0.1, 1.0);
        b.fill(0.1, 2.0);
        b.fill(0.7, 4.0);
        a.add(&b);
        assert_eq!(a.content, vec![3.0, 4.0]);
        assert_eq!(a.sumw2, vec![5.0, 16.0]);
        assert_relative_eq!(a.integral(), 7.0);
    }
}
