//! Sensor payloads -> chart series and popup text.
//!
//! The sensor API is trusted for ordering: history arrives oldest first and
//! current readings arrive most recent first. Nothing here re-sorts.

use chrono::{Local, TimeZone};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use wrm_core::reading::{RawReading, SensorSeries, SeriesKind, SeriesPoint};
use wrm_utils::dates;

/// Placeholder shown when no reading matches a parameter.
pub const NOT_AVAILABLE: &str = "N/A";

/// `(epoch milliseconds, value)`; serializes as `[ms, value]`.
pub type ChartPoint = (i64, f64);

/// Convert history points to chart points, reading offset-less timestamps
/// as local time.
pub fn to_chart_series(points: &[SeriesPoint]) -> Vec<ChartPoint> {
    to_chart_series_in(points, &Local)
}

/// Convert history points to chart points in source order. Points without a
/// parseable timestamp or a finite value are skipped.
pub fn to_chart_series_in<Tz: TimeZone>(points: &[SeriesPoint], tz: &Tz) -> Vec<ChartPoint> {
    points
        .iter()
        .filter_map(|point| {
            let millis = point
                .timestamp
                .as_deref()
                .and_then(|dt| dates::to_epoch_millis_in(dt, tz));
            let value = point.value.filter(|v| v.is_finite());
            match (millis, value) {
                (Some(millis), Some(value)) => Some((millis, value)),
                _ => {
                    debug!("Skipping chart point {:?}", point);
                    None
                }
            }
        })
        .collect()
}

/// "value unit" for the first reading whose label contains `parameter`,
/// or [`NOT_AVAILABLE`]. Matching is by substring so label variants such as
/// "Stream Discharge (ML/d)" and "Stream Discharge Rate" both match
/// "Stream Discharge".
pub fn latest_value_for(readings: &[RawReading], parameter: &str) -> String {
    let Some(reading) = readings
        .iter()
        .find(|reading| reading.parameter_label.contains(parameter))
    else {
        return NOT_AVAILABLE.to_string();
    };
    match (reading.value, reading.units.as_deref().map(str::trim)) {
        (Some(value), Some(units)) if !units.is_empty() => format!("{} {}", value, units),
        (Some(value), _) => value.to_string(),
        (None, _) => NOT_AVAILABLE.to_string(),
    }
}

/// Local date-time of the first reading, or an empty string.
pub fn latest_updated(readings: &[RawReading]) -> String {
    latest_updated_in(readings, &Local)
}

/// Date-time of the first reading formatted in `tz`, or an empty string when
/// there are no readings or the first one has no parseable timestamp.
pub fn latest_updated_in<Tz: TimeZone>(readings: &[RawReading], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    readings
        .first()
        .and_then(|reading| reading.timestamp.as_deref())
        .and_then(|dt| dates::parse_timestamp_in(dt, tz))
        .map(|dt| dates::format_in(&dt, tz))
        .unwrap_or_default()
}

/// Parameter label fragments shown in a station popup.
pub const FLOW_PARAMETER: &str = "Stream Discharge";
pub const LEVEL_PARAMETER: &str = "Stream Water Level";
pub const OXYGEN_PARAMETER: &str = "Dissolved Oxygen";
pub const CONDUCTIVITY_PARAMETER: &str = "Conductivity";

/// The text lines of a station popup.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupSummary {
    pub flow: String,
    pub water_level: String,
    pub dissolved_oxygen: String,
    pub conductivity: String,
    pub updated: String,
}

pub fn popup_summary(readings: &[RawReading]) -> PopupSummary {
    popup_summary_in(readings, &Local)
}

pub fn popup_summary_in<Tz: TimeZone>(readings: &[RawReading], tz: &Tz) -> PopupSummary
where
    Tz::Offset: Display,
{
    PopupSummary {
        flow: latest_value_for(readings, FLOW_PARAMETER),
        water_level: latest_value_for(readings, LEVEL_PARAMETER),
        dissolved_oxygen: latest_value_for(readings, OXYGEN_PARAMETER),
        conductivity: latest_value_for(readings, CONDUCTIVITY_PARAMETER),
        updated: latest_updated_in(readings, tz),
    }
}

/// One chart of the station detail panel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub title: String,
    pub axis_title: String,
    pub unit: String,
    pub data: Vec<ChartPoint>,
}

impl ChartSeries {
    /// A chart with no data yet (still loading, or the fetch failed).
    pub fn empty(kind: SeriesKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            axis_title: kind.axis_title().to_string(),
            unit: kind.unit().to_string(),
            data: Vec::new(),
        }
    }

    pub fn from_series(series: &SensorSeries) -> Self {
        Self {
            data: to_chart_series(&series.points),
            ..Self::empty(series.kind)
        }
    }
}

/// The detail panel for one station: flow, dissolved oxygen and
/// conductivity charts, in that order.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationPanel {
    pub station_name: String,
    pub charts: Vec<ChartSeries>,
}

impl StationPanel {
    /// Build the panel from whatever series `lookup` has for each kind.
    pub fn new<F>(station_name: &str, lookup: F) -> Self
    where
        F: Fn(SeriesKind) -> Option<SensorSeries>,
    {
        let charts = SeriesKind::ALL
            .iter()
            .map(|&kind| match lookup(kind) {
                Some(series) => ChartSeries::from_series(&series),
                None => ChartSeries::empty(kind),
            })
            .collect();
        Self {
            station_name: station_name.to_string(),
            charts,
        }
    }
}
