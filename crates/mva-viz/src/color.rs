//! Colors and the diverging colormap used by the correlation heat-map.

use std::fmt;

/// An sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Opacity in `[0, 1]`.
    pub a: f64,
}

impl Color {
    /// Opaque color from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rrggbb`; malformed components fall back to zero.
    pub fn hex(s: &str) -> Self {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() < 6 {
            return Self::rgb(0, 0, 0);
        }
        let c = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).unwrap_or(0);
        Self::rgb(c(0), c(2), c(4))
    }

    /// The same color with a different opacity.
    pub const fn with_alpha(mut self, a: f64) -> Self {
        self.a = a;
        self
    }

    /// SVG fill/stroke attribute value.
    pub fn to_svg(&self) -> String {
        if (self.a - 1.0).abs() < 1e-6 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
        }
    }

    /// Linear interpolation (for colormaps).
    pub fn lerp(a: Color, b: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: (a.r as f64 * (1.0 - t) + b.r as f64 * t).round() as u8,
            g: (a.g as f64 * (1.0 - t) + b.g as f64 * t).round() as u8,
            b: (a.b as f64 * (1.0 - t) + b.b as f64 * t).round() as u8,
            a: a.a * (1.0 - t) + b.a * t,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_svg())
    }
}

/// Signal series color.
pub const SIGNAL: Color = Color::rgb(0x00, 0x72, 0xb2);
/// Background series color.
pub const BACKGROUND: Color = Color::rgb(0xd5, 0x5e, 0x00);
/// Axis/label color.
pub const INK: Color = Color::rgb(0x20, 0x20, 0x20);
/// Grid-line color.
pub const GRID: Color = Color::rgb(0xd8, 0xd8, 0xd8);

/// Diverging colormap for correlations: -1 → blue, 0 → white, +1 → red.
pub fn diverging(val: f64) -> Color {
    let v = val.clamp(-1.0, 1.0);
    let white = Color::rgb(255, 255, 255);
    if v < 0.0 {
        Color::lerp(white, Color::hex("#2166ac"), -v)
    } else {
        Color::lerp(white, Color::hex("#b2182b"), v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::hex("#1d4ed8");
        assert_eq!((c.r, c.g, c.b), (0x1d, 0x4e, 0xd8));
        assert_eq!(c.to_svg(), "#1d4ed8");
    }

    #[test]
    fn alpha_rendering() {
        assert_eq!(Color::rgb(10, 20, 30).with_alpha(0.5).to_svg(), "rgba(10,20,30,0.500)");
    }

    #[test]
    fn diverging_extremes() {
        assert_eq!(diverging(0.0), Color::rgb(255, 255, 255));
        let blue = diverging(-1.0);
        let red = diverging(1.0);
        assert!(blue.b > blue.r);
        assert!(red.r > red.b);
    }
}
