//! Feature correlation matrix heat-map.

use crate::canvas::{Anchor, Canvas, TextStyle};
use crate::color::{diverging, Color, INK};
use crate::error::{RenderError, Result};

const CELL: f64 = 34.0;
const LABEL_SPACE: f64 = 90.0;
const MARGIN: f64 = 14.0;

/// Pearson correlation matrix of equally long columns.
///
/// A zero-variance column correlates 0 with everything and 1 with itself.
pub fn pearson_matrix(columns: &[&[f64]]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let n = columns.first().map_or(0, |c| c.len());
    let means: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>() / n.max(1) as f64).collect();
    let sds: Vec<f64> = columns
        .iter()
        .zip(&means)
        .map(|(c, m)| c.iter().map(|v| (v - m) * (v - m)).sum::<f64>().sqrt())
        .collect();

    let mut out = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..k {
            if i == j {
                out[i][j] = 1.0;
                continue;
            }
            if sds[i] == 0.0 || sds[j] == 0.0 {
                continue;
            }
            let cov: f64 = columns[i]
                .iter()
                .zip(columns[j])
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum();
            out[i][j] = cov / (sds[i] * sds[j]);
        }
    }
    out
}

/// Render the correlation heat-map with labels on both axes and the
/// coefficient printed in each cell.
pub fn render_correlation(names: &[&str], columns: &[&[f64]]) -> Result<String> {
    if names.is_empty() || names.len() != columns.len() {
        return Err(RenderError::EmptyInput(format!(
            "{} names for {} columns",
            names.len(),
            columns.len()
        )));
    }
    let n = columns[0].len();
    if n == 0 || columns.iter().any(|c| c.len() != n) {
        return Err(RenderError::EmptyInput("columns empty or of unequal length".into()));
    }

    let corr = pearson_matrix(columns);
    let k = names.len();
    let grid = k as f64 * CELL;
    let mut c = Canvas::new(
        MARGIN + LABEL_SPACE + grid + MARGIN,
        MARGIN + grid + LABEL_SPACE + MARGIN,
    );
    let x0 = MARGIN + LABEL_SPACE;
    let y0 = MARGIN;

    let value_style = TextStyle { size: 8.0, anchor: Anchor::Middle, ..TextStyle::default() };
    let label_style = TextStyle { size: 9.0, anchor: Anchor::End, ..TextStyle::default() };

    for (i, row) in corr.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            let cx = x0 + j as f64 * CELL;
            let cy = y0 + i as f64 * CELL;
            c.rect(cx, cy, CELL, CELL, Some(diverging(v)), Some(Color::rgb(255, 255, 255)));
            let ink = if v.abs() > 0.6 { Color::rgb(255, 255, 255) } else { INK };
            let style = TextStyle { color: ink, ..value_style.clone() };
            c.text(cx + CELL / 2.0, cy + CELL / 2.0 + 3.0, &format!("{v:.2}"), &style);
        }
        // y label
        c.text(x0 - 6.0, y0 + i as f64 * CELL + CELL / 2.0 + 3.0, names[i], &label_style);
    }
    for (j, name) in names.iter().enumerate() {
        // x labels below, rotated to fit
        c.text_rotated(
            x0 + j as f64 * CELL + CELL / 2.0,
            y0 + grid + 10.0,
            name,
            &label_style,
            -45.0,
        );
    }

    Ok(c.finish())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn perfect_correlations() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0]; // = 2a
        let d = [4.0, 3.0, 2.0, 1.0]; // = -a + 5
        let m = pearson_matrix(&[&a, &b, &d]);
        assert_relative_eq!(m[0][1], 1.0, max_relative = 1e-12);
        assert_relative_eq!(m[0][2], -1.0, max_relative = 1e-12);
        assert_relative_eq!(m[1][1], 1.0, max_relative = 1e-12);
    }

    #[test]
    fn constant_column_correlates_zero() {
        let a = [1.0, 2.0, 3.0];
        let flat = [5.0, 5.0, 5.0];
        let m = pearson_matrix(&[&a, &flat]);
        assert_eq!(m[0][1], 0.0);
        assert_eq!(m[1][1], 1.0);
    }

    #[test]
    fn heatmap_carries_labels_and_values() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 1.0, 2.0];
        let svg = render_correlation(&["pt", "eta"], &[&a, &b]).unwrap();
        assert!(svg.contains("pt"));
        assert!(svg.contains("eta"));
        assert!(svg.contains("1.00")); // diagonal
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = [1.0, 2.0];
        assert!(render_correlation(&["x"], &[]).is_err());
        assert!(render_correlation(&["x", "y"], &[&a, &a[..1]]).is_err());
    }
}
