//! Command implementations for WRM CLI.
//!
//! Provides subcommands for building the map overlay, joining station
//! datasets and fetching sensor readings and history from the sensor API.

use clap::{Args, Subcommand};

pub mod datasets;
pub mod map;
pub mod sensor;

/// Station reference data plus the status/detail feed to join it with.
#[derive(Args, Debug, Clone)]
pub struct StationArgs {
    /// Path to the station reference dataset (JSON array)
    #[arg(short = 's', long)]
    pub stations: String,

    /// Path to a status or detail feed (`{ "stations": [...] }`).
    /// Without one every station is inactive.
    #[arg(short = 'f', long)]
    pub feed: Option<String>,
}

/// Remote sensor API settings.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Base URL of the sensor API
    #[arg(long, env = "WRM_API_BASE")]
    pub api_base: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the boundary mask overlay (GeoJSON Feature) from a boundary FeatureCollection
    Mask {
        /// Path to the boundary GeoJSON FeatureCollection
        #[arg(short = 'b', long)]
        boundary: String,

        /// Output path (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Join station reference data with a status/detail feed
    Stations {
        #[command(flatten)]
        stations: StationArgs,

        /// Only list active stations
        #[arg(long)]
        active_only: bool,

        /// Output path (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Fetch current readings for one station and print its popup summary
    Readings {
        #[command(flatten)]
        stations: StationArgs,

        #[command(flatten)]
        api: ApiArgs,

        /// Station id or name
        #[arg(long)]
        station: String,
    },

    /// Fetch flow, dissolved oxygen and conductivity history for one station
    Panel {
        #[command(flatten)]
        stations: StationArgs,

        #[command(flatten)]
        api: ApiArgs,

        /// Station id or name
        #[arg(long)]
        station: String,

        /// Output path for the panel JSON (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Also write the chart points as CSV
        #[arg(long)]
        csv: Option<String>,
    },

    /// Compose the full map state: viewport, mask, stations and popups
    Snapshot {
        /// Path to the boundary GeoJSON FeatureCollection
        #[arg(short = 'b', long)]
        boundary: String,

        #[command(flatten)]
        stations: StationArgs,

        #[command(flatten)]
        api: ApiArgs,

        /// Output path (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<String>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Mask { boundary, output } => map::run_mask(&boundary, output.as_deref()),
        Command::Stations {
            stations,
            active_only,
            output,
        } => map::run_stations(&stations, active_only, output.as_deref()),
        Command::Readings {
            stations,
            api,
            station,
        } => sensor::run_readings(&stations, &api, &station).await,
        Command::Panel {
            stations,
            api,
            station,
            output,
            csv,
        } => {
            sensor::run_panel(&stations, &api, &station, output.as_deref(), csv.as_deref()).await
        }
        Command::Snapshot {
            boundary,
            stations,
            api,
            output,
        } => map::run_snapshot(&boundary, &stations, &api, output.as_deref()).await,
    }
}
