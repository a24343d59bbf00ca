//! Station join: reference records + status/detail feed -> station views.

use crate::feed::StationFeed;
use crate::station::{StationRecord, StationView};
use log::debug;

/// Parse a coordinate from the reference dataset. Returns `None` for text
/// that is not a number or parses to a non-finite value.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Join the reference stations with a status or detail feed by station name.
///
/// Output keeps the input order. Stations whose latitude or longitude does
/// not parse to a finite number are left out. Stations missing from the
/// feed are inactive. Two stations sharing a name share one feed entry.
pub fn join_stations(stations: &[StationRecord], feed: &StationFeed) -> Vec<StationView> {
    let lookup = feed.by_name();
    stations
        .iter()
        .filter_map(|station| {
            let (Some(latitude), Some(longitude)) = (
                parse_coordinate(&station.latitude),
                parse_coordinate(&station.longitude),
            ) else {
                debug!(
                    "Dropping station {} ({}): unusable coordinates ({}, {})",
                    station.name, station.id, station.latitude, station.longitude
                );
                return None;
            };
            let entry = lookup.get(station.name.as_str());
            let is_active = entry.is_some_and(|entry| entry.is_active());
            let display_label = entry
                .and_then(|entry| entry.display_label())
                .unwrap_or(station.name.as_str())
                .to_string();
            Some(StationView {
                id: station.id.clone(),
                name: station.name.clone(),
                display_label,
                latitude,
                longitude,
                is_active,
            })
        })
        .collect()
}

/// The stations that support on-demand sensor fetches.
pub fn active_stations(views: &[StationView]) -> impl Iterator<Item = &StationView> {
    views.iter().filter(|view| view.is_active)
}
