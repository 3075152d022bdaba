//! Color parsing, color space conversion and interpolation
//!
//! Colors enter as CSS strings (`#rrggbb`, `rgb(r, g, b)` or
//! `rgba(r, g, b, a)`) and are resolved once into an RGB triple. Anything
//! else (CSS variables, named colors) is kept verbatim and passed through.
//! The sRGB/CIE constants below are the published D65 values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default gamma for gamma-space interpolation
pub const DEFAULT_GAMMA: f64 = 2.2;

// sRGB -> XYZ (D65)
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

// XYZ -> sRGB (D65)
const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

/// D65 reference white
const WHITE_POINT: [f64; 3] = [0.95047, 1.0, 1.08883];

const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 7.787;
const LAB_OFFSET: f64 = 16.0 / 116.0;

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn channels(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }

    fn from_channels(c: [f64; 3]) -> Self {
        Self {
            r: to_channel(c[0]),
            g: to_channel(c[1]),
            b: to_channel(c[2]),
        }
    }

    /// Perceptual luminance in [0, 1]
    pub fn luminance(self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// A color as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorSpec {
    Hex(Rgb),
    Rgb(Rgb),
    /// Alpha is carried for display but ignored by color math
    Rgba(Rgb, f64),
    /// Not parseable as RGB; passed through untouched
    Raw(String),
}

impl ColorSpec {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if let Some(body) = trimmed
            .strip_prefix("rgba(")
            .and_then(|b| b.strip_suffix(')'))
        {
            if let Some((rgb, alpha)) = parse_channels(body) {
                return ColorSpec::Rgba(rgb, alpha.unwrap_or(1.0));
            }
        } else if let Some(body) = trimmed
            .strip_prefix("rgb(")
            .and_then(|b| b.strip_suffix(')'))
        {
            if let Some((rgb, None)) = parse_channels(body) {
                return ColorSpec::Rgb(rgb);
            }
        } else {
            let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
            if let Some(rgb) = parse_hex(hex) {
                return ColorSpec::Hex(rgb);
            }
        }

        ColorSpec::Raw(s.to_string())
    }

    /// The resolved RGB triple, if the color was parseable
    pub fn rgb(&self) -> Option<Rgb> {
        match self {
            ColorSpec::Hex(rgb) | ColorSpec::Rgb(rgb) | ColorSpec::Rgba(rgb, _) => Some(*rgb),
            ColorSpec::Raw(_) => None,
        }
    }
}

fn parse_channels(body: &str) -> Option<(Rgb, Option<f64>)> {
    let mut parts = body.split(',').map(str::trim);
    let r = parts.next()?.parse().ok()?;
    let g = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    let alpha = match parts.next() {
        Some(a) => Some(a.parse::<f64>().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((Rgb::new(r, g, b), alpha))
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpec::Hex(rgb) => f.write_str(&rgb.to_hex()),
            ColorSpec::Rgb(c) => write!(f, "rgb({}, {}, {})", c.r, c.g, c.b),
            ColorSpec::Rgba(c, a) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, a),
            ColorSpec::Raw(s) => f.write_str(s),
        }
    }
}

impl From<String> for ColorSpec {
    fn from(s: String) -> Self {
        ColorSpec::parse(&s)
    }
}

impl From<&str> for ColorSpec {
    fn from(s: &str) -> Self {
        ColorSpec::parse(s)
    }
}

impl From<ColorSpec> for String {
    fn from(color: ColorSpec) -> Self {
        color.to_string()
    }
}

/// Hex form for color pickers; unparseable colors become white
pub fn rgba_to_hex(color: &ColorSpec) -> String {
    color
        .rgb()
        .map(Rgb::to_hex)
        .unwrap_or_else(|| "#ffffff".to_string())
}

/// Color space used to blend between two thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Rgb,
    Gamma,
    #[default]
    Hsl,
    Lab,
}

/// Per-channel linear blend
pub fn interpolate_rgb(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let (a, b) = (from.channels(), to.channels());
    Rgb::from_channels([0, 1, 2].map(|i| lerp(a[i], b[i], t)))
}

/// Blend in linear-light space, then re-encode with the same gamma
pub fn interpolate_gamma(from: Rgb, to: Rgb, t: f64, gamma: f64) -> Rgb {
    let (a, b) = (from.channels(), to.channels());
    Rgb::from_channels([0, 1, 2].map(|i| {
        let linear = (a[i] / 255.0).powf(gamma) * (1.0 - t) + (b[i] / 255.0).powf(gamma) * t;
        linear.powf(1.0 / gamma) * 255.0
    }))
}

/// Hue in degrees, saturation and lightness in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let [r, g, b] = rgb.channels().map(|c| c / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        ((g - b) / d + if g < b { 6.0 } else { 0.0 }) * 60.0
    } else if max == g {
        ((b - r) / d + 2.0) * 60.0
    } else {
        ((r - g) / d + 4.0) * 60.0
    };

    Hsl { h, s, l }
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let Hsl { h, s, l } = hsl;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Rgb::from_channels([(r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0])
}

/// Blend two hues along the shorter arc, result in [0, 360)
pub fn lerp_hue(from: f64, to: f64, t: f64) -> f64 {
    let diff = to - from;
    let diff = if diff.abs() > 180.0 {
        if diff > 0.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    } else {
        diff
    };

    let mut h = from + diff * t;
    if h < 0.0 {
        h += 360.0;
    }
    if h >= 360.0 {
        h -= 360.0;
    }
    h
}

pub fn interpolate_hsl(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let a = rgb_to_hsl(from);
    let b = rgb_to_hsl(to);

    hsl_to_rgb(Hsl {
        h: lerp_hue(a.h, b.h, t),
        s: lerp(a.s, b.s, t),
        l: lerp(a.l, b.l, t),
    })
}

/// CIE L*a*b* color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

fn srgb_decode(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn srgb_encode(c: f64) -> f64 {
    if c > 0.0031308 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

fn lab_forward(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + LAB_OFFSET
    }
}

fn lab_inverse(f: f64) -> f64 {
    let cubed = f.powi(3);
    if cubed > LAB_EPSILON {
        cubed
    } else {
        (f - LAB_OFFSET) / LAB_KAPPA
    }
}

fn mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    m.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

pub fn rgb_to_lab(rgb: Rgb) -> Lab {
    let linear = rgb.channels().map(|c| srgb_decode(c / 255.0));
    let xyz = mul(&RGB_TO_XYZ, linear);
    let [fx, fy, fz] = [0, 1, 2].map(|i| lab_forward(xyz[i] / WHITE_POINT[i]));

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

pub fn lab_to_rgb(lab: Lab) -> Rgb {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = lab.a / 500.0 + fy;
    let fz = fy - lab.b / 200.0;

    let f = [fx, fy, fz];
    let xyz = [0, 1, 2].map(|i| lab_inverse(f[i]) * WHITE_POINT[i]);
    let linear = mul(&XYZ_TO_RGB, xyz);

    Rgb::from_channels(linear.map(|c| srgb_encode(c) * 255.0))
}

pub fn interpolate_lab(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let a = rgb_to_lab(from);
    let b = rgb_to_lab(to);

    lab_to_rgb(Lab {
        l: lerp(a.l, b.l, t),
        a: lerp(a.a, b.a, t),
        b: lerp(a.b, b.b, t),
    })
}

/// Blend two resolved colors with the given method
pub fn blend(from: Rgb, to: Rgb, t: f64, method: InterpolationMethod) -> Rgb {
    match method {
        InterpolationMethod::Rgb => interpolate_rgb(from, to, t),
        InterpolationMethod::Gamma => interpolate_gamma(from, to, t, DEFAULT_GAMMA),
        InterpolationMethod::Hsl => interpolate_hsl(from, to, t),
        InterpolationMethod::Lab => interpolate_lab(from, to, t),
    }
}

/// Blend two configured colors.
///
/// Falls back to `from` unchanged when either side is not an RGB color.
pub fn interpolate_color(
    from: &ColorSpec,
    to: &ColorSpec,
    t: f64,
    method: InterpolationMethod,
) -> ColorSpec {
    match (from.rgb(), to.rgb()) {
        (Some(a), Some(b)) => ColorSpec::Rgb(blend(a, b, t, method)),
        _ => from.clone(),
    }
}
