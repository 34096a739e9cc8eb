//! Header gradient math. Everything here is pure and operates on `#rrggbb`
//! strings so results can be dropped straight into inline styles.

use crate::core::catalog::{Station, StationTint};
use crate::core::config::{DEFAULT_HEADER_COLORS, FOX_BASE_GRADIENT};

/// Two hex colors forming the header gradient (start, end).
pub type ColorPair = [String; 2];

/// Luma above which white header text stops being legible.
pub const WHITE_TEXT_LUMA_CEILING: f64 = 120.0;
/// Extra darkening applied to the second stop when both stops collapse.
const COLLAPSED_STOP_FACTOR: f64 = 0.85;
const FALLBACK_HEX: &str = "#1e3a8a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Accepts `#abc`, `abc`, `#aabbcc` or `aabbcc` (surrounding whitespace ignored).
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let clean = raw.trim().trim_start_matches('#');
        let full: String = if clean.len() == 3 {
            clean.chars().flat_map(|ch| [ch, ch]).collect()
        } else {
            clean.to_string()
        };
        if full.len() != 6 || !full.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(&full[idx..idx + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn luma(self) -> f64 {
        perceived_luma(f64::from(self.r), f64::from(self.g), f64::from(self.b))
    }

    pub fn distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    fn from_channels(r: f64, g: f64, b: f64, quantize: fn(f64) -> f64) -> Self {
        let c = |v: f64| quantize(v).clamp(0.0, 255.0) as u8;
        Self::new(c(r), c(g), c(b))
    }
}

/// Rec. 709 weights on the 0–255 scale.
pub fn perceived_luma(r: f64, g: f64, b: f64) -> f64 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Splits a `"#aaa,#bbb"` station color field, defaulting each missing half.
pub fn parse_color_csv(csv: &str) -> ColorPair {
    let mut parts = csv.split(',').map(str::trim);
    let first = parts
        .next()
        .filter(|part| !part.is_empty())
        .unwrap_or(DEFAULT_HEADER_COLORS[0]);
    let second = parts
        .next()
        .filter(|part| !part.is_empty())
        .unwrap_or(DEFAULT_HEADER_COLORS[1]);
    [first.to_string(), second.to_string()]
}

pub fn default_header_colors() -> ColorPair {
    [
        DEFAULT_HEADER_COLORS[0].to_string(),
        DEFAULT_HEADER_COLORS[1].to_string(),
    ]
}

/// Scales a color down until its luma sits at the white-text ceiling.
/// Channels are rounded down so the ceiling still holds after quantization.
pub fn darken_for_white_text(hex: &str) -> String {
    let Some(rgb) = Rgb::parse_hex(hex) else {
        return FALLBACK_HEX.to_string();
    };
    let luma = rgb.luma();
    if luma <= WHITE_TEXT_LUMA_CEILING {
        return rgb.to_hex();
    }
    let factor = WHITE_TEXT_LUMA_CEILING / luma;
    Rgb::from_channels(
        f64::from(rgb.r) * factor,
        f64::from(rgb.g) * factor,
        f64::from(rgb.b) * factor,
        f64::floor,
    )
    .to_hex()
}

/// Slight blue shift so every header reads as part of the same family.
pub fn tint_toward_blue(hex: &str) -> String {
    let Some(rgb) = Rgb::parse_hex(hex) else {
        return FALLBACK_HEX.to_string();
    };
    Rgb::from_channels(
        f64::from(rgb.r) * 0.82,
        f64::from(rgb.g) * 0.9,
        f64::from(rgb.b) * 1.15 + 12.0,
        f64::round,
    )
    .to_hex()
}

/// Label heuristic for Fox affiliates that get the house gradient and a
/// white logo. "Fox 29" is the one affiliate whose artwork already works.
pub fn is_fox_except_29(label: &str) -> bool {
    let text = label.trim().to_lowercase();
    text.contains("fox") && !text.contains("fox 29")
}

/// Header gradient that keeps white overlay text legible.
///
/// `station` is the station currently shown (or previewed); custom logos pass
/// `None`.
pub fn readable_header_gradient(colors: &ColorPair, station: Option<&Station>) -> ColorPair {
    let fox_rule = station
        .map(|s| is_fox_except_29(&s.label) && s.tint != StationTint::Disabled)
        .unwrap_or(false);
    let source: [&str; 2] = if fox_rule {
        FOX_BASE_GRADIENT
    } else {
        [colors[0].as_str(), colors[1].as_str()]
    };

    let first = darken_for_white_text(&tint_toward_blue(source[0]));
    let second = darken_for_white_text(&tint_toward_blue(source[1]));
    if first.eq_ignore_ascii_case(&second) {
        let rgb = Rgb::parse_hex(&second).unwrap_or(Rgb::new(30, 58, 138));
        let darker = Rgb::from_channels(
            f64::from(rgb.r) * COLLAPSED_STOP_FACTOR,
            f64::from(rgb.g) * COLLAPSED_STOP_FACTOR,
            f64::from(rgb.b) * COLLAPSED_STOP_FACTOR,
            f64::round,
        );
        return [first, darker.to_hex()];
    }
    [first, second]
}

/// CSS value for the header background.
pub fn gradient_css(colors: &ColorPair) -> String {
    format!(
        "linear-gradient(135deg, {} 0%, {} 100%)",
        colors[0], colors[1]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(label: &str, tint: StationTint) -> Station {
        Station {
            label: label.into(),
            url: "https://example.invalid/logo.svg".into(),
            colors: default_header_colors(),
            tint,
        }
    }

    fn pair(a: &str, b: &str) -> ColorPair {
        [a.to_string(), b.to_string()]
    }

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(Rgb::parse_hex("#fff"), Some(Rgb::new(255, 255, 255)));
        assert_eq!(Rgb::parse_hex(" 1e3a8a "), Some(Rgb::new(30, 58, 138)));
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn csv_pairs_default_missing_halves() {
        assert_eq!(parse_color_csv("#111, #222"), pair("#111", "#222"));
        assert_eq!(parse_color_csv("#111"), pair("#111", "#3b82f6"));
        assert_eq!(parse_color_csv(""), default_header_colors());
    }

    #[test]
    fn darken_leaves_dark_colors_alone() {
        assert_eq!(darken_for_white_text("#102030"), "#102030");
        assert_eq!(darken_for_white_text("nonsense"), "#1e3a8a");
    }

    #[test]
    fn gradient_respects_ceiling_and_stays_a_gradient() {
        let samples = [
            "#ffffff", "#000000", "#ffff00", "#00ff00", "#ff0000", "#0000ff", "#808080", "#fedcba",
            "#123", "#7f7f7f", "#00ffff", "#c0ffee",
        ];
        for a in samples {
            for b in samples {
                let out = readable_header_gradient(&pair(a, b), None);
                for stop in &out {
                    let luma = Rgb::parse_hex(stop).expect("hex output").luma();
                    assert!(
                        luma <= WHITE_TEXT_LUMA_CEILING,
                        "{a}/{b} produced {stop} with luma {luma}"
                    );
                }
                assert!(
                    !out[0].eq_ignore_ascii_case(&out[1]),
                    "{a}/{b} collapsed to {out:?}"
                );
            }
        }
    }

    #[test]
    fn fox_affiliates_use_house_gradient() {
        let colors = pair("#ff0000", "#00ff00");
        let fox = station("FOX 7", StationTint::Unset);
        let plain = readable_header_gradient(&pair("#04133b", "#0b2a6e"), None);
        assert_eq!(readable_header_gradient(&colors, Some(&fox)), plain);

        let fox29 = station("Fox 29", StationTint::Unset);
        assert_ne!(readable_header_gradient(&colors, Some(&fox29)), plain);

        let opted_out = station("Fox 7", StationTint::Disabled);
        assert_ne!(readable_header_gradient(&colors, Some(&opted_out)), plain);
    }

    #[test]
    fn fox_heuristic_ignores_case_and_whitespace() {
        assert!(is_fox_except_29("  fox 13 "));
        assert!(!is_fox_except_29("FOX 29"));
        assert!(!is_fox_except_29("CBS 2"));
    }
}
