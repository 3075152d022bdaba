//! Speed → color threshold palettes
//!
//! Default palettes follow the Beaufort scale (force 0 to 12) with one table
//! per unit system. All tables share the same colors so a heatmap reads the
//! same whatever unit the sensor reports in.

use crate::color::{ColorSpec, Rgb};
use serde::{Deserialize, Serialize};

/// Palette error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("threshold palette must contain at least one entry")]
    Empty,

    #[error("threshold value must be a finite number")]
    NonFiniteValue,
}

pub type PaletteResult<T> = Result<T, PaletteError>;

/// One palette breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub color: ColorSpec,
}

impl Threshold {
    pub fn new(value: f64, color: impl Into<ColorSpec>) -> Self {
        Self {
            value,
            color: color.into(),
        }
    }
}

const BEAUFORT_COLORS: [Rgb; 13] = [
    Rgb::new(187, 222, 251), // 0 calm
    Rgb::new(144, 202, 249), // 1 light air
    Rgb::new(100, 181, 246), // 2 light breeze
    Rgb::new(66, 165, 245),  // 3 gentle breeze
    Rgb::new(30, 136, 229),  // 4 moderate breeze
    Rgb::new(192, 202, 81),  // 5 fresh breeze
    Rgb::new(225, 213, 60),  // 6 strong breeze
    Rgb::new(255, 213, 79),  // 7 near gale
    Rgb::new(255, 183, 77),  // 8 gale
    Rgb::new(239, 108, 0),   // 9 strong gale
    Rgb::new(244, 81, 30),   // 10 storm
    Rgb::new(229, 57, 53),   // 11 violent storm
    Rgb::new(183, 28, 28),   // 12 hurricane force
];

const BEAUFORT_MPH: [f64; 13] = [
    0.0, 1.0, 4.0, 8.0, 13.0, 19.0, 25.0, 32.0, 39.0, 47.0, 55.0, 64.0, 73.0,
];
const BEAUFORT_MS: [f64; 13] = [
    0.0, 0.3, 1.6, 3.4, 5.5, 8.0, 10.8, 13.9, 17.2, 20.8, 24.5, 28.5, 32.7,
];
const BEAUFORT_KMH: [f64; 13] = [
    0.0, 1.0, 6.0, 12.0, 20.0, 29.0, 39.0, 50.0, 62.0, 75.0, 89.0, 103.0, 118.0,
];
const BEAUFORT_KTS: [f64; 13] = [
    0.0, 1.0, 4.0, 7.0, 11.0, 17.0, 22.0, 28.0, 34.0, 41.0, 48.0, 56.0, 64.0,
];

/// Wind speed unit system, as far as palette selection is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedUnit {
    MilesPerHour,
    MetersPerSecond,
    KilometersPerHour,
    Knots,
}

impl SpeedUnit {
    /// Recognize a unit label; unknown or missing labels mean mph
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return SpeedUnit::MilesPerHour;
        };
        match label.trim().to_lowercase().as_str() {
            "m/s" | "mps" => SpeedUnit::MetersPerSecond,
            "km/h" | "kph" | "kmh" => SpeedUnit::KilometersPerHour,
            "kn" | "kt" | "kts" | "knot" | "knots" => SpeedUnit::Knots,
            _ => SpeedUnit::MilesPerHour,
        }
    }

    fn beaufort_values(self) -> &'static [f64; 13] {
        match self {
            SpeedUnit::MilesPerHour => &BEAUFORT_MPH,
            SpeedUnit::MetersPerSecond => &BEAUFORT_MS,
            SpeedUnit::KilometersPerHour => &BEAUFORT_KMH,
            SpeedUnit::Knots => &BEAUFORT_KTS,
        }
    }
}

/// Beaufort palette for a unit label
pub fn default_thresholds_for_unit(unit: Option<&str>) -> Vec<Threshold> {
    SpeedUnit::from_label(unit)
        .beaufort_values()
        .iter()
        .zip(BEAUFORT_COLORS)
        .map(|(&value, rgb)| Threshold {
            value,
            color: ColorSpec::Rgba(rgb, 1.0),
        })
        .collect()
}

/// Sort thresholds ascending by value, in place
pub fn sort_thresholds(thresholds: &mut [Threshold]) {
    thresholds.sort_by(|a, b| a.value.total_cmp(&b.value));
}

/// A non-empty threshold list sorted ascending by value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdPalette {
    thresholds: Vec<Threshold>,
}

impl ThresholdPalette {
    pub fn new(mut thresholds: Vec<Threshold>) -> PaletteResult<Self> {
        if thresholds.is_empty() {
            return Err(PaletteError::Empty);
        }
        if thresholds.iter().any(|t| !t.value.is_finite()) {
            return Err(PaletteError::NonFiniteValue);
        }
        sort_thresholds(&mut thresholds);
        Ok(Self { thresholds })
    }

    pub fn for_unit(unit: Option<&str>) -> Self {
        Self {
            thresholds: default_thresholds_for_unit(unit),
        }
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn first(&self) -> &Threshold {
        &self.thresholds[0]
    }

    pub fn last(&self) -> &Threshold {
        &self.thresholds[self.thresholds.len() - 1]
    }

    /// Gradient stops and tick labels for a legend bar
    pub fn legend(&self) -> Legend {
        let scale = self.last().value.max(75.0);
        let stops = self
            .thresholds
            .iter()
            .map(|t| LegendStop {
                color: t.color.clone(),
                percent: (t.value / scale * 100.0).clamp(0.0, 100.0),
            })
            .collect();

        let mut values: Vec<f64> = Vec::new();
        for i in [0, 3, 6, 9, self.thresholds.len() - 1] {
            if let Some(t) = self.thresholds.get(i) {
                if !values.contains(&t.value) {
                    values.push(t.value);
                }
            }
        }
        let last = values.len() - 1;
        let labels = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if i == last {
                    format!("{}+", v)
                } else {
                    v.to_string()
                }
            })
            .collect();

        Legend { stops, labels }
    }
}

impl Default for ThresholdPalette {
    fn default() -> Self {
        Self::for_unit(None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendStop {
    pub color: ColorSpec,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub stops: Vec<LegendStop>,
    pub labels: Vec<String>,
}
