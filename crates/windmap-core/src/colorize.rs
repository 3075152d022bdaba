//! Cell speed → background and text color

use crate::color::{interpolate_color, ColorSpec, InterpolationMethod};
use crate::grid::{Cell, Grid};
use crate::palette::ThresholdPalette;
use serde::Serialize;

/// Background for cells without a speed; not part of any palette
pub const DISABLED_COLOR: &str = "var(--disabled-color, #f0f0f0)";

/// Text color token used when the background cannot be analysed
pub const THEME_TEXT_COLOR: &str = "var(--primary-text-color)";

/// Text color with enough contrast against a background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "&'static str")]
pub enum TextColor {
    Black,
    White,
    ThemeDefault,
}

impl TextColor {
    pub fn as_css(self) -> &'static str {
        match self {
            TextColor::Black => "#000000",
            TextColor::White => "#ffffff",
            TextColor::ThemeDefault => THEME_TEXT_COLOR,
        }
    }
}

impl From<TextColor> for &'static str {
    fn from(color: TextColor) -> Self {
        color.as_css()
    }
}

/// Color for a speed under the given palette.
///
/// Without interpolation the color of the highest threshold at or below
/// `speed` is used; speeds under the first threshold still get its color.
/// With interpolation, speeds between two thresholds are blended and speeds
/// outside the palette range clamp to the end colors.
pub fn color_for_speed(
    speed: Option<f64>,
    palette: &ThresholdPalette,
    interpolate: bool,
    method: InterpolationMethod,
) -> ColorSpec {
    let Some(speed) = speed else {
        return ColorSpec::Raw(DISABLED_COLOR.to_string());
    };
    let thresholds = palette.thresholds();

    if !interpolate {
        return thresholds
            .iter()
            .take_while(|t| speed >= t.value)
            .last()
            .unwrap_or(palette.first())
            .color
            .clone();
    }

    if speed <= palette.first().value {
        return palette.first().color.clone();
    }
    if speed >= palette.last().value {
        return palette.last().color.clone();
    }

    for pair in thresholds.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        if speed >= lower.value && speed < upper.value {
            if speed == lower.value {
                return lower.color.clone();
            }
            let t = (speed - lower.value) / (upper.value - lower.value);
            return interpolate_color(&lower.color, &upper.color, t, method);
        }
    }

    palette.last().color.clone()
}

/// Black text on light backgrounds, white on dark ones
pub fn contrast_text_color(background: &ColorSpec) -> TextColor {
    match background.rgb() {
        Some(rgb) if rgb.luminance() > 0.5 => TextColor::Black,
        Some(_) => TextColor::White,
        None => TextColor::ThemeDefault,
    }
}

/// Resolved colors of one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellStyle {
    pub background: ColorSpec,
    pub text: TextColor,
}

/// Palette plus blend settings, applied cell by cell
#[derive(Debug, Clone)]
pub struct Colorizer {
    palette: ThresholdPalette,
    interpolate: bool,
    method: InterpolationMethod,
}

impl Colorizer {
    pub fn new(palette: ThresholdPalette, interpolate: bool, method: InterpolationMethod) -> Self {
        Self {
            palette,
            interpolate,
            method,
        }
    }

    pub fn palette(&self) -> &ThresholdPalette {
        &self.palette
    }

    pub fn color_for(&self, speed: Option<f64>) -> ColorSpec {
        color_for_speed(speed, &self.palette, self.interpolate, self.method)
    }

    pub fn style(&self, cell: &Cell) -> CellStyle {
        if !cell.has_data {
            return CellStyle {
                background: ColorSpec::Raw(DISABLED_COLOR.to_string()),
                text: TextColor::ThemeDefault,
            };
        }
        let background = self.color_for(cell.speed);
        let text = contrast_text_color(&background);
        CellStyle { background, text }
    }

    /// Styles laid out like `grid.rows[..].cells[..]`
    pub fn style_grid(&self, grid: &Grid) -> Vec<Vec<CellStyle>> {
        grid.rows
            .iter()
            .map(|row| row.cells.iter().map(|cell| self.style(cell)).collect())
            .collect()
    }
}
