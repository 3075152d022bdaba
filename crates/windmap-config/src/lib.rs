//! Heatmap configuration intake
//!
//! `CardConfig` mirrors the user-facing TOML with every field optional.
//! `CardConfig::validate` is the one place defaults are applied and values
//! are checked; everything downstream works on `HeatmapSettings`.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use windmap_core::{
    Colorizer, DataSource, DirectionFormat, IntervalHours, InterpolationMethod, PaletteError,
    StatisticType, Threshold, ThresholdPalette, TimeFormat, MAX_DAYS,
};

pub const DEFAULT_TITLE: &str = "Wind Speed History";
pub const DEFAULT_DAYS: u32 = 7;
pub const DEFAULT_REFRESH_SECS: u64 = 300;
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'entity' is required (wind speed sensor)")]
    MissingEntity,
    #[error("time_interval must be one of: 1, 2, 3, 4, 6, 8, 12, 24 (got {0})")]
    InvalidInterval(u32),
    #[error("days must be between 1 and {MAX_DAYS} (got {0})")]
    InvalidDays(u32),
    #[error("refresh_interval must be at least one second")]
    InvalidRefreshInterval,
    #[error("timezone must be 'local', 'UTC' or an offset like '+02:00' (got {0:?})")]
    InvalidTimezone(String),
    #[error("color_thresholds: {0}")]
    Palette(#[from] PaletteError),
}

/// Heatmap options as written by the user
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardConfig {
    pub entity: Option<String>,
    pub direction_entity: Option<String>,
    pub title: Option<String>,
    pub days: Option<u32>,
    pub time_interval: Option<u32>,
    pub time_format: Option<TimeFormat>,
    pub unit: Option<String>,
    pub color_thresholds: Option<Vec<Threshold>>,
    pub show_direction: Option<bool>,
    pub direction_format: Option<DirectionFormat>,
    /// Seconds between refreshes of the current view
    pub refresh_interval: Option<u64>,
    pub interpolate_colors: Option<bool>,
    pub color_interpolation: Option<InterpolationMethod>,
    pub data_source: Option<DataSource>,
    pub statistic_type: Option<StatisticType>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub card: CardConfig,
    pub server: Option<ServerConfig>,
}

impl AppConfig {
    /// Load configuration from WINDMAP_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WINDMAP_CONFIG").unwrap_or_else(|_| "windmap.toml".to_string());
        Self::load_from(path)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }
}

/// Time zone that defines local days and hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timezone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Timezone {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Timezone::Local);
        }
        let offset = if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            FixedOffset::east_opt(0)
        } else {
            trimmed.parse::<FixedOffset>().ok()
        };
        offset
            .map(Timezone::Fixed)
            .ok_or_else(|| ConfigError::InvalidTimezone(s.to_string()))
    }
}

/// Validated heatmap settings
#[derive(Debug, Clone)]
pub struct HeatmapSettings {
    pub entity: String,
    pub direction_entity: Option<String>,
    pub title: String,
    pub days: u32,
    pub interval: IntervalHours,
    pub time_format: TimeFormat,
    pub unit: Option<String>,
    pub palette: ThresholdPalette,
    /// Thresholds came from the user rather than a unit default
    pub custom_thresholds: bool,
    thresholds_from_unit: bool,
    pub show_direction: bool,
    pub direction_format: DirectionFormat,
    pub refresh_interval: Duration,
    pub interpolate_colors: bool,
    pub color_interpolation: InterpolationMethod,
    pub data_source: DataSource,
    pub statistic_type: StatisticType,
    pub timezone: Timezone,
}

impl CardConfig {
    /// Check every option once and fill in defaults
    pub fn validate(&self) -> Result<HeatmapSettings, ConfigError> {
        let entity = self
            .entity
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingEntity)?
            .to_string();

        let interval = match self.time_interval {
            Some(hours) => {
                IntervalHours::try_from(hours).map_err(|_| ConfigError::InvalidInterval(hours))?
            }
            None => IntervalHours::default(),
        };

        let days = self.days.unwrap_or(DEFAULT_DAYS);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(ConfigError::InvalidDays(days));
        }

        let refresh_secs = self.refresh_interval.unwrap_or(DEFAULT_REFRESH_SECS);
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }

        let timezone = match &self.timezone {
            Some(tz) => Timezone::parse(tz)?,
            None => Timezone::Local,
        };

        let unit = self
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let custom = self.color_thresholds.as_ref().filter(|t| !t.is_empty());
        let palette = match custom {
            Some(thresholds) => ThresholdPalette::new(thresholds.clone())?,
            None => ThresholdPalette::for_unit(unit.as_deref()),
        };

        Ok(HeatmapSettings {
            entity,
            direction_entity: self
                .direction_entity
                .clone()
                .filter(|e| !e.trim().is_empty()),
            title: self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            days,
            interval,
            time_format: self.time_format.unwrap_or_default(),
            custom_thresholds: custom.is_some(),
            thresholds_from_unit: unit.is_some(),
            unit,
            palette,
            show_direction: self.show_direction.unwrap_or(true),
            direction_format: self.direction_format.unwrap_or_default(),
            refresh_interval: Duration::from_secs(refresh_secs),
            interpolate_colors: self.interpolate_colors.unwrap_or(false),
            color_interpolation: self.color_interpolation.unwrap_or_default(),
            data_source: self.data_source.unwrap_or_default(),
            statistic_type: self.statistic_type.unwrap_or_default(),
            timezone,
        })
    }
}

impl HeatmapSettings {
    /// Direction entity to fetch, if direction display is on
    pub fn active_direction_entity(&self) -> Option<&str> {
        self.direction_entity
            .as_deref()
            .filter(|_| self.show_direction)
    }

    /// Unit label for display, falling back to mph
    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().unwrap_or("mph")
    }

    pub fn colorizer(&self) -> Colorizer {
        Colorizer::new(
            self.palette.clone(),
            self.interpolate_colors,
            self.color_interpolation,
        )
    }

    /// Switch to the default palette of a unit reported by the sensor.
    ///
    /// Only the first detection counts, and custom thresholds are never
    /// replaced. Returns whether the palette changed.
    pub fn apply_detected_unit(&mut self, unit: &str) -> bool {
        let unit = unit.trim();
        if self.custom_thresholds || self.thresholds_from_unit || unit.is_empty() {
            return false;
        }
        self.palette = ThresholdPalette::for_unit(Some(unit));
        self.unit = Some(unit.to_string());
        self.thresholds_from_unit = true;
        tracing::info!(unit, "auto-selected default thresholds");
        true
    }
}
