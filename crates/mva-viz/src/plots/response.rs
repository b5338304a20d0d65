//! Train/test classifier-response overlay.
//!
//! Test samples are drawn as filled normalized histograms; train samples
//! as points at bin centers with statistical error bars, so over-training
//! shows up as train points leaving the filled test distribution.

use crate::canvas::{Anchor, Canvas, TextStyle};
use crate::color::{BACKGROUND, GRID, SIGNAL};
use crate::error::{RenderError, Result};
use crate::plots::{combined_range, weighted_density, PlotHist};

/// Scores and weights of one class in one sample.
pub struct ResponseSample<'a> {
    /// Classifier responses.
    pub scores: &'a [f64],
    /// Event weights, parallel to `scores`.
    pub weights: &'a [f64],
}

const PLOT_W: f64 = 420.0;
const PLOT_H: f64 = 300.0;
const MARGIN_L: f64 = 50.0;
const MARGIN_R: f64 = 20.0;
const MARGIN_T: f64 = 30.0;
const MARGIN_B: f64 = 40.0;

/// Render the response overlay.
pub fn render_response(
    train_signal: ResponseSample<'_>,
    train_background: ResponseSample<'_>,
    test_signal: ResponseSample<'_>,
    test_background: ResponseSample<'_>,
    bins: usize,
) -> Result<String> {
    let bins = bins.max(1);
    let range = combined_range(&[
        train_signal.scores,
        train_background.scores,
        test_signal.scores,
        test_background.scores,
    ])
    .ok_or_else(|| RenderError::EmptyInput("no finite response scores".into()))?;

    let hists = [
        weighted_density(test_signal.scores, test_signal.weights, bins, range),
        weighted_density(test_background.scores, test_background.weights, bins, range),
        weighted_density(train_signal.scores, train_signal.weights, bins, range),
        weighted_density(train_background.scores, train_background.weights, bins, range),
    ];
    let y_max = hists
        .iter()
        .flat_map(|h| h.density.iter())
        .fold(0.0f64, |m, &d| m.max(d))
        .max(1e-12)
        * 1.15;

    let mut c = Canvas::new(MARGIN_L + PLOT_W + MARGIN_R, MARGIN_T + PLOT_H + MARGIN_B);
    let frame = Frame { range, y_max };

    c.rect(MARGIN_L, MARGIN_T, PLOT_W, PLOT_H, None, Some(GRID));

    draw_filled(&mut c, &frame, &hists[0], SIGNAL);
    draw_filled(&mut c, &frame, &hists[1], BACKGROUND);
    draw_points(&mut c, &frame, &hists[2], SIGNAL);
    draw_points(&mut c, &frame, &hists[3], BACKGROUND);

    let title =
        TextStyle { size: 12.0, anchor: Anchor::Middle, bold: true, ..TextStyle::default() };
    c.text(MARGIN_L + PLOT_W / 2.0, 18.0, "Classifier response", &title);

    let axis = TextStyle { size: 9.0, anchor: Anchor::Middle, ..TextStyle::default() };
    for t in crate::canvas::ticks(range.0, range.1, 6) {
        let x = frame.x_of(t);
        c.line(x, MARGIN_T + PLOT_H, x, MARGIN_T + PLOT_H + 4.0, crate::color::INK, 1.0);
        c.text(x, MARGIN_T + PLOT_H + 15.0, &format!("{t:.2}"), &axis);
    }

    let legend = TextStyle { size: 10.0, ..TextStyle::default() };
    let lx = MARGIN_L + 8.0;
    c.rect(lx, MARGIN_T + 8.0, 10.0, 10.0, Some(SIGNAL.with_alpha(0.35)), Some(SIGNAL));
    c.text(lx + 14.0, MARGIN_T + 17.0, "signal (test)", &legend);
    c.rect(lx, MARGIN_T + 24.0, 10.0, 10.0, Some(BACKGROUND.with_alpha(0.35)), Some(BACKGROUND));
    c.text(lx + 14.0, MARGIN_T + 33.0, "background (test)", &legend);
    c.circle(lx + 5.0, MARGIN_T + 45.0, 2.5, SIGNAL);
    c.text(lx + 14.0, MARGIN_T + 49.0, "signal / background (train)", &legend);

    Ok(c.finish())
}

struct Frame {
    range: (f64, f64),
    y_max: f64,
}

impl Frame {
    fn x_of(&self, v: f64) -> f64 {
        MARGIN_L + (v - self.range.0) / (self.range.1 - self.range.0) * PLOT_W
    }

    fn y_of(&self, d: f64) -> f64 {
        MARGIN_T + PLOT_H - (d / self.y_max) * PLOT_H
    }
}

fn draw_filled(c: &mut Canvas, f: &Frame, hist: &PlotHist, color: crate::color::Color) {
    let bins = hist.density.len();
    let bw = (hist.x_max - hist.x_min) / bins as f64;
    let mut pts = Vec::with_capacity(bins * 2 + 2);
    pts.push((f.x_of(hist.x_min), f.y_of(0.0)));
    for (i, &d) in hist.density.iter().enumerate() {
        let y = f.y_of(d);
        pts.push((f.x_of(hist.x_min + i as f64 * bw), y));
        pts.push((f.x_of(hist.x_min + (i + 1) as f64 * bw), y));
    }
    pts.push((f.x_of(hist.x_max), f.y_of(0.0)));
    c.polygon(&pts, color.with_alpha(0.35));
    c.polyline(&pts[1..pts.len() - 1], color, 1.2);
}

fn draw_points(c: &mut Canvas, f: &Frame, hist: &PlotHist, color: crate::color::Color) {
    let bins = hist.density.len();
    let bw = (hist.x_max - hist.x_min) / bins as f64;
    for i in 0..bins {
        let d = hist.density[i];
        if d == 0.0 && hist.err[i] == 0.0 {
            continue;
        }
        let x = f.x_of(hist.x_min + (i as f64 + 0.5) * bw);
        c.error_bar(x, f.y_of(d - hist.err[i]), f.y_of(d + hist.err[i]), 3.0, color);
        c.circle(x, f.y_of(d), 2.5, color);
    }
}
