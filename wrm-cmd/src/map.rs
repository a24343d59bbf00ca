//! Map overlay, station markers and full map snapshots.

use crate::datasets::{fetch_manager, load_boundary, load_views, write_output};
use crate::{ApiArgs, StationArgs};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use wrm_core::join::active_stations;
use wrm_core::station::{StationView, Viewport};
use wrm_data::mask::build_mask;
use wrm_data::series::{popup_summary, PopupSummary};

/// Everything the map draws, in one document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSnapshot {
    pub viewport: Viewport,
    /// Mask overlay feature; absent when the boundary is unavailable
    pub mask: Option<Value>,
    pub stations: Vec<StationView>,
    /// Popup text by station name, for active stations whose readings loaded
    pub popups: BTreeMap<String, PopupSummary>,
}

/// Build the mask overlay for a boundary file.
pub fn run_mask(boundary_path: &str, output: Option<&str>) -> anyhow::Result<()> {
    let boundary = load_boundary(boundary_path);
    let Some(mask) = build_mask(boundary.as_ref()) else {
        anyhow::bail!("{} has no Polygon or MultiPolygon rings", boundary_path);
    };
    info!("Mask built with {} boundary rings", mask.holes().len());
    write_output(output, &serde_json::to_string_pretty(&mask.to_feature())?)
}

/// Join the station datasets and write the station views.
pub fn run_stations(
    stations: &StationArgs,
    active_only: bool,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let mut views = load_views(stations)?;
    if active_only {
        views.retain(|view| view.is_active);
    }
    write_output(output, &serde_json::to_string_pretty(&views)?)
}

/// Compose viewport, mask, stations and popups. Readings for every active
/// station are fetched concurrently; stations whose fetch fails simply have
/// no popup.
pub async fn run_snapshot(
    boundary_path: &str,
    stations: &StationArgs,
    api: &ApiArgs,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let views = load_views(stations)?;
    let mask = build_mask(load_boundary(boundary_path).as_ref());
    if mask.is_none() {
        warn!("No boundary mask; the map will render without an overlay");
    }

    let manager = fetch_manager(api);
    let tasks: Vec<_> = active_stations(&views)
        .map(|view| (view.id.clone(), manager.spawn_readings(view.clone())))
        .collect();
    for (station_id, task) in tasks {
        match task.await {
            Ok(outcome) => debug!("Readings for {}: {:?}", station_id, outcome),
            Err(e) => warn!("Readings task for {} did not finish: {}", station_id, e),
        }
    }

    let popups: BTreeMap<String, PopupSummary> = active_stations(&views)
        .filter_map(|view| {
            manager
                .readings(&view.name)
                .map(|readings| (view.name.clone(), popup_summary(&readings)))
        })
        .collect();
    info!(
        "Snapshot: {} stations, {} popups, mask {}",
        views.len(),
        popups.len(),
        if mask.is_some() { "present" } else { "absent" }
    );

    let snapshot = MapSnapshot {
        viewport: Viewport::WIMMERA,
        mask: mask.map(|mask| mask.to_feature()),
        stations: views,
        popups,
    };
    write_output(output, &serde_json::to_string_pretty(&snapshot)?)
}
