use serde::{Deserialize, Deserializer, Serialize};

/// A monitoring station as it appears in the static reference dataset.
///
/// Coordinates are kept as the raw text from the dataset; they are parsed
/// (and possibly rejected) by [`crate::join::join_stations`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    /// Station identifier used for sensor API calls (e.g. "415200")
    #[serde(rename = "station")]
    pub id: String,
    /// Station name; the join key against status/detail feeds
    #[serde(rename = "station_name")]
    pub name: String,
    #[serde(rename = "station_latitude", deserialize_with = "coordinate_text")]
    pub latitude: String,
    #[serde(rename = "station_longitude", deserialize_with = "coordinate_text")]
    pub longitude: String,
}

impl StationRecord {
    /// Parse the station reference dataset (a JSON array of records).
    ///
    /// Unknown fields are ignored. A record missing any of the four required
    /// fields fails the whole parse.
    pub fn parse_station_json(json: &str) -> serde_json::Result<Vec<StationRecord>> {
        serde_json::from_str(json)
    }
}

/// Accept coordinates written either as strings or as bare JSON numbers.
fn coordinate_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Text(String),
        Number(f64),
    }

    Ok(match Coordinate::deserialize(deserializer)? {
        Coordinate::Text(s) => s,
        Coordinate::Number(n) => n.to_string(),
    })
}

/// A station composed from the reference record and its feed entry,
/// ready to be drawn as a map marker.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub id: String,
    pub name: String,
    /// Human-readable label from the detail feed, or the raw name
    pub display_label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
}

/// A fixed latitude/longitude rectangle the map is locked to.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// (latitude, longitude)
    pub south_west: (f64, f64),
    /// (latitude, longitude)
    pub north_east: (f64, f64),
}

impl Viewport {
    /// The Wimmera catchment view.
    pub const WIMMERA: Viewport = Viewport {
        south_west: (-37.36809668716929, 140.96378317173532),
        north_east: (-35.65680550597246, 143.36396129024806),
    };

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south_west.0..=self.north_east.0).contains(&latitude)
            && (self.south_west.1..=self.north_east.1).contains(&longitude)
    }
}
