//! JSON shape of a rendered heatmap

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use windmap_config::{HeatmapSettings, Timezone};
use windmap_core::{
    format_direction, ColorSpec, GridAggregator, HeatmapData, Legend, Stats, TextColor,
};
use windmap_fetch::{FetchWindow, SeriesPair, ViewOffset};

#[derive(Debug, Clone, Serialize)]
pub struct CellView {
    pub date: NaiveDate,
    pub speed: Option<f64>,
    pub direction: Option<f64>,
    pub direction_label: String,
    pub has_data: bool,
    pub is_partial: bool,
    pub background: ColorSpec,
    pub text: TextColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub hour: u32,
    pub label: String,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapView {
    pub title: String,
    pub unit: String,
    pub offset: i64,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub rows: Vec<RowView>,
    pub stats: Stats,
    pub legend: Legend,
}

fn aggregate_in<Tz: TimeZone>(
    tz: Tz,
    settings: &HeatmapSettings,
    series: &SeriesPair,
    window: &FetchWindow,
) -> HeatmapData {
    GridAggregator::new(tz, settings.interval, settings.days, settings.time_format).aggregate(
        &series.speed,
        &series.direction,
        &window.start,
        window.partial,
    )
}

/// Aggregate in the configured time zone
pub fn aggregate(settings: &HeatmapSettings, series: &SeriesPair, window: &FetchWindow) -> HeatmapData {
    match settings.timezone {
        Timezone::Local => aggregate_in(chrono::Local, settings, series, window),
        Timezone::Fixed(offset) => aggregate_in(offset, settings, series, window),
    }
}

impl HeatmapView {
    pub fn build(
        settings: &HeatmapSettings,
        data: &HeatmapData,
        window: &FetchWindow,
        offset: ViewOffset,
    ) -> Self {
        let colorizer = settings.colorizer();
        let direction_format = settings.direction_format;
        let show_direction = settings.show_direction;

        let rows = data
            .grid
            .rows
            .iter()
            .map(|row| RowView {
                hour: row.hour,
                label: row.label.clone(),
                cells: row
                    .cells
                    .iter()
                    .map(|cell| {
                        let style = colorizer.style(cell);
                        let direction = cell.direction.filter(|_| show_direction);
                        CellView {
                            date: cell.date,
                            speed: cell.speed,
                            direction,
                            direction_label: format_direction(direction, direction_format),
                            has_data: cell.has_data,
                            is_partial: cell.is_partial,
                            background: style.background,
                            text: style.text,
                        }
                    })
                    .collect(),
            })
            .collect();

        HeatmapView {
            title: settings.title.clone(),
            unit: settings.unit_label().to_string(),
            offset: offset.days(),
            first_day: window.first_day,
            last_day: window.last_day,
            rows,
            stats: data.stats,
            legend: colorizer.palette().legend(),
        }
    }
}
