//! Hex color kit: normalization, HSL conversion, blending, palette mapping.
//!
//! Malformed input never fails — it normalizes to white so the field always
//! renders something.

use std::collections::HashMap;

use super::params::GalaxyPalette;

/// Canonical 6-digit uppercase "#RRGGBB" form. Accepts short 3-digit hex
/// with or without the leading '#'; anything else falls back to "#FFFFFF".
pub fn normalize_hex(hex: &str) -> String {
    let mut value = hex.trim().to_string();
    if !value.starts_with('#') {
        value = format!("#{value}");
    }
    if value.chars().count() == 4 {
        let chars: Vec<char> = value.chars().collect();
        value = format!(
            "#{0}{0}{1}{1}{2}{2}",
            chars[1], chars[2], chars[3]
        );
    }
    if value.chars().count() != 7 {
        return "#FFFFFF".to_string();
    }
    value.to_uppercase()
}

/// RGB channels in 0..=255. Undecodable digits read as 255.
pub fn rgb_components(hex: &str) -> (f64, f64, f64) {
    let normalized = normalize_hex(hex);
    let chars: Vec<char> = normalized.chars().skip(1).collect();
    if chars.len() != 6 {
        return (255.0, 255.0, 255.0);
    }
    let channel = |a: char, b: char| -> f64 {
        let s: String = [a, b].iter().collect();
        u8::from_str_radix(&s, 16).map(f64::from).unwrap_or(255.0)
    };
    (
        channel(chars[0], chars[1]),
        channel(chars[2], chars[3]),
        channel(chars[4], chars[5]),
    )
}

/// RGB as byte channels, for frame buffers.
pub fn rgb8(hex: &str) -> (u8, u8, u8) {
    let (r, g, b) = rgb_components(hex);
    (r as u8, g as u8, b as u8)
}

/// Linear per-channel blend of two hex colors; `ratio` 0 keeps `lhs`.
pub fn blend_hex(lhs: &str, rhs: &str, ratio: f64) -> String {
    let mix = ratio.clamp(0.0, 1.0);
    let left = rgb_components(lhs);
    let right = rgb_components(rhs);
    let r = left.0 + (right.0 - left.0) * mix;
    let g = left.1 + (right.1 - left.1) * mix;
    let b = left.2 + (right.2 - left.2) * mix;
    format!(
        "#{:02X}{:02X}{:02X}",
        r.round() as u8,
        g.round() as u8,
        b.round() as u8
    )
}

/// Pull a color toward gray and shift its lightness; for dimmed layers.
pub fn desaturate(hex: &str, saturation_scale: f64, lightness_adjust: f64) -> (u8, u8, u8) {
    let mut hsl = hex_to_hsl(hex);
    hsl.s = (hsl.s * saturation_scale).clamp(0.0, 1.0);
    hsl.l = (hsl.l + lightness_adjust).clamp(0.0, 1.0);
    rgb8(&hsl_to_hex(hsl))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    /// Degrees, 0..360.
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub fn hex_to_hsl(hex: &str) -> Hsl {
    let (r255, g255, b255) = rgb_components(hex);
    let r = r255 / 255.0;
    let g = g255 / 255.0;
    let b = b255 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) * 0.5;
    let mut h = 0.0;
    let mut s = 0.0;
    if max != min {
        let d = max - min;
        s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        h /= 6.0;
    }
    Hsl { h: h * 360.0, s, l }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

pub fn hsl_to_hex(hsl: Hsl) -> String {
    let h = hsl.h / 360.0;
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);
    format!(
        "#{:02X}{:02X}{:02X}",
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8
    )
}

/// Base→lit correspondence for the seven structural categories, keyed by
/// normalized hex. Looked up by exact match for every generated point.
pub fn build_palette_map(base: &GalaxyPalette, lit: &GalaxyPalette) -> HashMap<String, String> {
    let entries = [
        (&base.core, &lit.core),
        (&base.ridge, &lit.ridge),
        (&base.arm_bright, &lit.arm_bright),
        (&base.arm_edge, &lit.arm_edge),
        (&base.hii, &lit.hii),
        (&base.dust, &lit.dust),
        (&base.outer, &lit.outer),
    ];
    let mut map = HashMap::with_capacity(entries.len());
    for (base_hex, lit_hex) in entries {
        map.insert(normalize_hex(base_hex), normalize_hex(lit_hex));
    }
    map
}
