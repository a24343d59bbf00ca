//! Loading the static datasets and writing command output.

use crate::{ApiArgs, StationArgs};
use anyhow::Context;
use log::{debug, info, warn};
use serde_json::Value;
use wrm_core::api::HttpSensorSource;
use wrm_core::cache::FetchManager;
use wrm_core::feed::StationFeed;
use wrm_core::join::join_stations;
use wrm_core::station::{StationRecord, StationView, Viewport};

/// Load the station reference dataset. Missing required fields are fatal.
pub fn load_stations(path: &str) -> anyhow::Result<Vec<StationRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read station dataset {}", path))?;
    StationRecord::parse_station_json(&json)
        .with_context(|| format!("Failed to parse station dataset {}", path))
}

/// Load a status or detail feed. Without a feed every station is inactive.
pub fn load_feed(path: Option<&str>) -> anyhow::Result<StationFeed> {
    let Some(path) = path else {
        warn!("No status feed given; all stations will be inactive");
        return Ok(StationFeed::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read station feed {}", path))?;
    StationFeed::parse_feed_json(&json)
        .with_context(|| format!("Failed to parse station feed {}", path))
}

/// Load the boundary GeoJSON. A boundary that cannot be read or parsed
/// leaves the map without a mask rather than failing the command.
pub fn load_boundary(path: &str) -> Option<Value> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to read boundary {}: {}", path, e);
            return None;
        }
    };
    match serde_json::from_str(&json) {
        Ok(boundary) => Some(boundary),
        Err(e) => {
            warn!("Failed to parse boundary {}: {}", path, e);
            None
        }
    }
}

/// Load both station datasets and join them.
pub fn load_views(args: &StationArgs) -> anyhow::Result<Vec<StationView>> {
    let stations = load_stations(&args.stations)?;
    let feed = load_feed(args.feed.as_deref())?;
    let views = join_stations(&stations, &feed);
    let outside = outside_viewport(&views, &Viewport::WIMMERA);
    if outside > 0 {
        warn!("{} stations lie outside the map viewport", outside);
    }
    info!(
        "Joined {} of {} stations ({} active)",
        views.len(),
        stations.len(),
        views.iter().filter(|view| view.is_active).count()
    );
    Ok(views)
}

/// Count stations the locked map view cannot show.
pub fn outside_viewport(views: &[StationView], viewport: &Viewport) -> usize {
    views
        .iter()
        .filter(|view| !viewport.contains(view.latitude, view.longitude))
        .inspect(|view| debug!("{} ({}) is outside the viewport", view.name, view.id))
        .count()
}

/// Find a station by id, falling back to name.
pub fn find_station<'a>(views: &'a [StationView], key: &str) -> Option<&'a StationView> {
    views
        .iter()
        .find(|view| view.id == key)
        .or_else(|| views.iter().find(|view| view.name == key))
}

pub fn fetch_manager(api: &ApiArgs) -> FetchManager<HttpSensorSource> {
    info!("Using sensor API at {}", api.api_base);
    FetchManager::new(HttpSensorSource::new(reqwest::Client::new(), &api.api_base))
}

/// Write to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&str>, contents: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path))?;
            info!("Wrote {}", path);
        }
        None => println!("{}", contents),
    }
    Ok(())
}
