//! Minimal immediate-mode SVG canvas.
//!
//! Elements are written straight into the document body; `finish` wraps
//! them in the `<svg>` envelope with a white background.

use std::fmt::Write;

use crate::color::Color;

/// Text anchoring along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Left-aligned.
    Start,
    /// Centered.
    Middle,
    /// Right-aligned.
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Text appearance.
#[derive(Debug, Clone)]
pub struct TextStyle {
    /// Font size in points.
    pub size: f64,
    /// Fill color.
    pub color: Color,
    /// Horizontal anchor.
    pub anchor: Anchor,
    /// Bold weight.
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self { size: 10.0, color: crate::color::INK, anchor: Anchor::Start, bold: false }
    }
}

/// An SVG document under construction. Coordinates in points.
pub struct Canvas {
    /// Document width.
    pub width: f64,
    /// Document height.
    pub height: f64,
    body: String,
}

impl Canvas {
    /// A blank canvas.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, body: String::with_capacity(16 * 1024) }
    }

    /// Filled rectangle with optional stroke.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Option<Color>, stroke: Option<Color>) {
        let _ = write!(
            self.body,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#
        );
        match fill {
            Some(c) => {
                let _ = write!(self.body, r#" fill="{}""#, c.to_svg());
            }
            None => self.body.push_str(r#" fill="none""#),
        }
        if let Some(c) = stroke {
            let _ = write!(self.body, r#" stroke="{}" stroke-width="1""#, c.to_svg());
        }
        self.body.push_str(" />\n");
    }

    /// Straight line.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color, width: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-width="{width:.2}" />"#,
            color.to_svg()
        );
    }

    /// Open polyline.
    pub fn polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        self.poly("polyline", points, None, Some((color, width)));
    }

    /// Closed filled polygon.
    pub fn polygon(&mut self, points: &[(f64, f64)], fill: Color) {
        self.poly("polygon", points, Some(fill), None);
    }

    fn poly(
        &mut self,
        tag: &str,
        points: &[(f64, f64)],
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    ) {
        let _ = write!(self.body, r#"<{tag} points=""#);
        for (i, (x, y)) in points.iter().enumerate() {
            if i > 0 {
                self.body.push(' ');
            }
            let _ = write!(self.body, "{x:.2},{y:.2}");
        }
        self.body.push('"');
        match fill {
            Some(c) => {
                let _ = write!(self.body, r#" fill="{}""#, c.to_svg());
            }
            None => self.body.push_str(r#" fill="none""#),
        }
        if let Some((c, w)) = stroke {
            let _ = write!(self.body, r#" stroke="{}" stroke-width="{w:.2}""#, c.to_svg());
        }
        self.body.push_str(" />\n");
    }

    /// Filled circle.
    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: Color) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}" />"#,
            fill.to_svg()
        );
    }

    /// Text at `(x, y)` (baseline).
    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.text_inner(x, y, content, style, None);
    }

    /// Text rotated by `angle` degrees around its anchor point.
    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: f64) {
        self.text_inner(x, y, content, style, Some(angle));
    }

    fn text_inner(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: Option<f64>) {
        let _ = write!(
            self.body,
            r#"<text x="{x:.2}" y="{y:.2}" font-family="sans-serif" font-size="{:.1}" fill="{}" text-anchor="{}""#,
            style.size,
            style.color.to_svg(),
            style.anchor.as_str()
        );
        if style.bold {
            self.body.push_str(r#" font-weight="bold""#);
        }
        if let Some(a) = angle {
            let _ = write!(self.body, r#" transform="rotate({a:.1},{x:.2},{y:.2})""#);
        }
        self.body.push('>');
        for ch in content.chars() {
            match ch {
                '<' => self.body.push_str("&lt;"),
                '>' => self.body.push_str("&gt;"),
                '&' => self.body.push_str("&amp;"),
                '"' => self.body.push_str("&quot;"),
                _ => self.body.push(ch),
            }
        }
        self.body.push_str("</text>\n");
    }

    /// Vertical error bar with horizontal caps.
    pub fn error_bar(&mut self, x: f64, y_lo: f64, y_hi: f64, cap: f64, color: Color) {
        self.line(x, y_lo, x, y_hi, color, 1.0);
        if cap > 0.0 {
            let half = cap / 2.0;
            self.line(x - half, y_lo, x + half, y_lo, color, 1.0);
            self.line(x - half, y_hi, x + half, y_hi, color, 1.0);
        }
    }

    /// Produce the complete SVG document.
    pub fn finish(&self) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                "\n",
                r#"<rect width="{w}" height="{h}" fill="white" />"#,
                "\n{body}</svg>\n"
            ),
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

/// Round tick positions covering `[min, max]` with about `n` steps.
pub fn ticks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if !(max > min) || n == 0 {
        return vec![min];
    }
    let raw_step = (max - min) / n as f64;
    let mag = 10f64.powf(raw_step.abs().log10().floor());
    let norm = raw_step / mag;
    let step = if norm < 1.5 {
        mag
    } else if norm < 3.0 {
        2.0 * mag
    } else if norm < 7.0 {
        5.0 * mag
    } else {
        10.0 * mag
    };
    let start = (min / step).ceil() * step;
    let mut out = Vec::new();
    let mut t = start;
    while t <= max + step * 1e-9 {
        out.push(t);
        t += step;
    }
    out
}
