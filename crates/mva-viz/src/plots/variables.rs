//! Per-feature signal/background comparison grid.

use crate::canvas::{Anchor, Canvas, TextStyle};
use crate::color::{BACKGROUND, GRID, SIGNAL};
use crate::error::{RenderError, Result};
use crate::plots::{combined_range, weighted_density, PlotHist};

/// One feature's values and weights, split by class.
pub struct FeatureSeries<'a> {
    /// Feature name (panel title).
    pub name: &'a str,
    /// Signal values.
    pub signal: &'a [f64],
    /// Signal weights, parallel to `signal`.
    pub signal_weights: &'a [f64],
    /// Background values.
    pub background: &'a [f64],
    /// Background weights, parallel to `background`.
    pub background_weights: &'a [f64],
}

const PANEL_W: f64 = 220.0;
const PANEL_H: f64 = 170.0;
const MARGIN: f64 = 34.0;
const GAP: f64 = 18.0;

/// Render one normalized comparison histogram per feature on a grid.
pub fn render_variable_grid(features: &[FeatureSeries<'_>], bins: usize) -> Result<String> {
    if features.is_empty() {
        return Err(RenderError::EmptyInput("no features to plot".into()));
    }
    let bins = bins.max(1);

    let cols = (features.len() as f64).sqrt().ceil() as usize;
    let rows = features.len().div_ceil(cols);
    let width = MARGIN * 2.0 + cols as f64 * PANEL_W + (cols - 1) as f64 * GAP;
    let height = MARGIN * 2.0 + rows as f64 * PANEL_H + (rows - 1) as f64 * GAP;
    let mut c = Canvas::new(width, height);

    for (i, feat) in features.iter().enumerate() {
        let col = i % cols;
        let row = i / cols;
        let x0 = MARGIN + col as f64 * (PANEL_W + GAP);
        let y0 = MARGIN + row as f64 * (PANEL_H + GAP);
        draw_panel(&mut c, feat, bins, x0, y0)?;
    }

    // Shared legend in the top margin.
    let legend = TextStyle { size: 10.0, ..TextStyle::default() };
    c.rect(MARGIN, 8.0, 10.0, 10.0, Some(SIGNAL.with_alpha(0.4)), Some(SIGNAL));
    c.text(MARGIN + 14.0, 17.0, "signal", &legend);
    c.rect(MARGIN + 70.0, 8.0, 10.0, 10.0, Some(BACKGROUND.with_alpha(0.4)), Some(BACKGROUND));
    c.text(MARGIN + 84.0, 17.0, "background", &legend);

    Ok(c.finish())
}

fn draw_panel(c: &mut Canvas, feat: &FeatureSeries<'_>, bins: usize, x0: f64, y0: f64) -> Result<()> {
    let range = combined_range(&[feat.signal, feat.background]).ok_or_else(|| {
        RenderError::EmptyInput(format!("feature '{}' has no finite values", feat.name))
    })?;

    let sig = weighted_density(feat.signal, feat.signal_weights, bins, range);
    let bkg = weighted_density(feat.background, feat.background_weights, bins, range);
    let y_max = sig
        .density
        .iter()
        .chain(&bkg.density)
        .fold(0.0f64, |m, &d| m.max(d))
        .max(1e-12);

    let title = TextStyle { size: 11.0, anchor: Anchor::Middle, bold: true, ..TextStyle::default() };
    c.text(x0 + PANEL_W / 2.0, y0 - 4.0, feat.name, &title);

    // Frame.
    c.rect(x0, y0, PANEL_W, PANEL_H, None, Some(GRID));

    draw_steps(c, &sig, x0, y0, y_max, SIGNAL);
    draw_steps(c, &bkg, x0, y0, y_max, BACKGROUND);

    // Range labels under the x axis.
    let label = TextStyle { size: 8.0, anchor: Anchor::Middle, ..TextStyle::default() };
    c.text(x0, y0 + PANEL_H + 11.0, &short(range.0), &label);
    c.text(x0 + PANEL_W, y0 + PANEL_H + 11.0, &short(range.1), &label);
    Ok(())
}

/// Filled step outline of a normalized histogram inside one panel.
fn draw_steps(
    c: &mut Canvas,
    hist: &PlotHist,
    x0: f64,
    y0: f64,
    y_max: f64,
    color: crate::color::Color,
) {
    let bins = hist.density.len();
    let bw = PANEL_W / bins as f64;
    let y_of = |d: f64| y0 + PANEL_H - (d / (y_max * 1.1)) * PANEL_H;

    let mut pts = Vec::with_capacity(bins * 2 + 2);
    pts.push((x0, y0 + PANEL_H));
    for (i, &d) in hist.density.iter().enumerate() {
        let y = y_of(d);
        pts.push((x0 + i as f64 * bw, y));
        pts.push((x0 + (i + 1) as f64 * bw, y));
    }
    pts.push((x0 + PANEL_W, y0 + PANEL_H));

    c.polygon(&pts, color.with_alpha(0.35));
    c.polyline(&pts[1..pts.len() - 1], color, 1.2);
}

fn short(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e6 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_contains_titles_and_legend() {
        let features = [
            FeatureSeries {
                name: "pt_lead",
                signal: &[1.0, 2.0, 3.0],
                signal_weights: &[1.0, 1.0, 1.0],
                background: &[2.0, 4.0],
                background_weights: &[1.0, 2.0],
            },
            FeatureSeries {
                name: "eta_lead",
                signal: &[-1.0, 0.0],
                signal_weights: &[1.0, 1.0],
                background: &[0.5, 1.5],
                background_weights: &[1.0, 1.0],
            },
        ];
        let svg = render_variable_grid(&features, 10).unwrap();
        assert!(svg.contains("pt_lead"));
        assert!(svg.contains("eta_lead"));
        assert!(svg.contains("signal"));
        assert!(svg.contains("background"));
    }

    #[test]
    fn no_features_is_an_error() {
        assert!(render_variable_grid(&[], 10).is_err());
    }

    #[test]
    fn all_nan_feature_is_an_error() {
        let features = [FeatureSeries {
            name: "bad",
            signal: &[f64::NAN],
            signal_weights: &[1.0],
            background: &[],
            background_weights: &[],
        }];
        assert!(render_variable_grid(&features, 5).is_err());
    }
}
