//! Diagnostic plot renderers.

pub mod correlation;
pub mod response;
pub mod variables;

/// A normalized weighted histogram prepared for drawing.
pub(crate) struct PlotHist {
    pub x_min: f64,
    pub x_max: f64,
    /// Per-bin fraction of the total weight.
    pub density: Vec<f64>,
    /// Per-bin statistical error on the fraction.
    pub err: Vec<f64>,
}

/// Histogram `values` weighted by `weights` over `range`, normalized so
/// the bin fractions sum to 1. A zero total weight yields all-zero bins.
pub(crate) fn weighted_density(
    values: &[f64],
    weights: &[f64],
    bins: usize,
    range: (f64, f64),
) -> PlotHist {
    let (x_min, x_max) = range;
    let width = (x_max - x_min) / bins as f64;
    let mut sumw = vec![0.0; bins];
    let mut sumw2 = vec![0.0; bins];
    for (&x, &w) in values.iter().zip(weights) {
        if !x.is_finite() || x < x_min || x > x_max {
            continue;
        }
        let i = if x == x_max { bins - 1 } else { ((x - x_min) / width) as usize };
        sumw[i] += w;
        sumw2[i] += w * w;
    }
    let total: f64 = sumw.iter().sum();
    let norm = if total != 0.0 { total } else { 1.0 };
    PlotHist {
        x_min,
        x_max,
        density: sumw.iter().map(|s| s / norm).collect(),
        err: sumw2.iter().map(|s| s.sqrt() / norm).collect(),
    }
}

/// Finite min/max over several slices, padded when degenerate.
pub(crate) fn combined_range(slices: &[&[f64]]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in slices {
        for &v in *s {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
    }
    if lo > hi {
        return None;
    }
    if lo == hi {
        return Some((lo - 0.5, hi + 0.5));
    }
    Some((lo, hi))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn density_sums_to_one() {
        let h = weighted_density(&[0.1, 0.2, 0.9], &[1.0, 3.0, 2.0], 4, (0.0, 1.0));
        assert_relative_eq!(h.density.iter().sum::<f64>(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(h.density[0], 4.0 / 6.0, max_relative = 1e-12);
    }

    #[test]
    fn zero_weight_is_flat() {
        let h = weighted_density(&[0.5], &[0.0], 2, (0.0, 1.0));
        assert!(h.density.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn range_padding() {
        assert_eq!(combined_range(&[&[2.0, 2.0]]), Some((1.5, 2.5)));
        assert_eq!(combined_range(&[&[1.0], &[3.0]]), Some((1.0, 3.0)));
        assert_eq!(combined_range(&[&[]]), None);
        assert_eq!(combined_range(&[&[f64::NAN]]), None);
    }
}
