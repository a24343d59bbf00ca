//! On-demand sensor fetches for a single station.

use crate::datasets::{fetch_manager, find_station, load_views, write_output};
use crate::{ApiArgs, StationArgs};
use anyhow::Context;
use log::{info, warn};
use wrm_core::cache::FetchOutcome;
use wrm_core::reading::SeriesKind;
use wrm_core::station::StationView;
use wrm_data::series::{popup_summary, StationPanel};

fn select_station(stations: &StationArgs, key: &str) -> anyhow::Result<StationView> {
    let views = load_views(stations)?;
    let Some(view) = find_station(&views, key) else {
        anyhow::bail!("Station {} not found (or has unusable coordinates)", key);
    };
    if !view.is_active {
        anyhow::bail!("Station {} ({}) is inactive; no readings to fetch", view.name, view.id);
    }
    Ok(view.clone())
}

/// Fetch current readings for a station and print its popup.
pub async fn run_readings(
    stations: &StationArgs,
    api: &ApiArgs,
    key: &str,
) -> anyhow::Result<()> {
    let view = select_station(stations, key)?;
    let manager = fetch_manager(api);
    let outcome = manager.fetch_station_readings(&view).await;
    info!("Readings for {}: {:?}", view.id, outcome);

    println!("{}", view.display_label);
    match manager.readings(&view.name) {
        Some(readings) => {
            let summary = popup_summary(&readings);
            println!("  Flow:               {}", summary.flow);
            println!("  Water level:        {}", summary.water_level);
            println!("  Dissolved oxygen:   {}", summary.dissolved_oxygen);
            println!("  Conductivity:       {}", summary.conductivity);
            println!("  Updated:            {}", summary.updated);
        }
        None => println!("  Loading..."),
    }
    Ok(())
}

/// Fetch the three panel series for a station and write the chart data.
pub async fn run_panel(
    stations: &StationArgs,
    api: &ApiArgs,
    key: &str,
    output: Option<&str>,
    csv_path: Option<&str>,
) -> anyhow::Result<()> {
    let view = select_station(stations, key)?;
    let manager = fetch_manager(api);
    let outcomes = manager.load_panel(&view).await;
    for (kind, outcome) in SeriesKind::ALL.iter().zip(outcomes) {
        if outcome != FetchOutcome::Stored {
            warn!("{} for {} unavailable ({:?})", kind, view.id, outcome);
        }
    }

    let panel = StationPanel::new(&view.name, |kind| manager.series(&view.id, kind));
    if let Some(path) = csv_path {
        write_panel_csv(&panel, path)?;
    }
    write_output(output, &serde_json::to_string_pretty(&panel)?)
}

/// Write chart points as `series,epoch_ms,value,unit` rows.
pub fn write_panel_csv(panel: &StationPanel, path: &str) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path))?;
    writer.write_record(["series", "epoch_ms", "value", "unit"])?;
    let mut rows = 0usize;
    for chart in &panel.charts {
        for (millis, value) in &chart.data {
            writer.write_record([
                chart.kind.endpoint().to_string(),
                millis.to_string(),
                value.to_string(),
                chart.unit.clone(),
            ])?;
            rows += 1;
        }
    }
    writer.flush()?;
    info!("{} chart points written to {}", rows, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrm_data::series::ChartSeries;

    #[test]
    fn test_write_panel_csv() {
        let panel = StationPanel {
            station_name: "Creek A".to_string(),
            charts: vec![
                ChartSeries {
                    data: vec![(1714521600000, 1.5), (1714522500000, 2.0)],
                    ..ChartSeries::empty(SeriesKind::Flow)
                },
                ChartSeries::empty(SeriesKind::Oxygen),
            ],
        };
        let path = std::env::temp_dir().join(format!("wrm-panel-{}.csv", std::process::id()));
        let path_str = path.to_str().unwrap();
        write_panel_csv(&panel, path_str).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            written,
            "series,epoch_ms,value,unit\nflow,1714521600000,1.5,ML/d\nflow,1714522500000,2,ML/d\n"
        );
    }
}
