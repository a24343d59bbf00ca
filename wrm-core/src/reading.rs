use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One current reading from `GET {base}/api/station/{id}`.
///
/// The API returns one of these per parameter the station reports,
/// most recent first.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RawReading {
    /// e.g. "Stream Discharge (ML/d)"
    #[serde(rename = "parameterLabel", default)]
    pub parameter_label: String,
    #[serde(rename = "v", default, deserialize_with = "loose_value")]
    pub value: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(rename = "dt", default)]
    pub timestamp: Option<String>,
}

/// One point of a historical series from `GET {base}/api/{kind}/{id}`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(rename = "dt", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "v", default, deserialize_with = "loose_value")]
    pub value: Option<f64>,
}

/// Accept `v` as a number or numeric text. Anything else, including
/// non-finite values, reads as missing so one bad record does not fail
/// the whole payload.
fn loose_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

/// The historical series the station detail panel charts.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Flow,
    Oxygen,
    Conductivity,
}

impl SeriesKind {
    /// Panel order.
    pub const ALL: [SeriesKind; 3] = [
        SeriesKind::Flow,
        SeriesKind::Oxygen,
        SeriesKind::Conductivity,
    ];

    /// Path segment of the history endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            SeriesKind::Flow => "flow",
            SeriesKind::Oxygen => "oxygen",
            SeriesKind::Conductivity => "conductivity",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SeriesKind::Flow => "Flow Rate (ML/d)",
            SeriesKind::Oxygen => "Dissolved Oxygen (mg/L)",
            SeriesKind::Conductivity => "Conductivity (µS/cm)",
        }
    }

    pub fn axis_title(&self) -> &'static str {
        match self {
            SeriesKind::Flow => "Flow",
            SeriesKind::Oxygen => "DO",
            SeriesKind::Conductivity => "Conductivity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SeriesKind::Flow => "ML/d",
            SeriesKind::Oxygen => "mg/L",
            SeriesKind::Conductivity => "µS/cm",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// A fetched historical series for one (station, parameter) pair.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SensorSeries {
    pub station_id: String,
    pub kind: SeriesKind,
    pub points: Vec<SeriesPoint>,
}

impl SensorSeries {
    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }
}
