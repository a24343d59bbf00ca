//! Boundary mask: a world-sized polygon with the boundary's outer rings cut
//! out as holes. Filled with the even-odd rule it hides everything outside
//! the boundary.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `[longitude, latitude, ...]`, kept exactly as the boundary gives it.
pub type Position = Vec<f64>;

/// A closed linear ring.
pub type Ring = Vec<Position>;

/// The full-globe rectangle every mask starts with.
pub fn world_ring() -> Ring {
    vec![
        vec![-180.0, -90.0],
        vec![180.0, -90.0],
        vec![180.0, 90.0],
        vec![-180.0, 90.0],
        vec![-180.0, -90.0],
    ]
}

/// `[world_ring, hole_1, ..., hole_n]`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MaskPolygon {
    pub rings: Vec<Ring>,
}

impl MaskPolygon {
    /// The boundary rings, in the order they were found.
    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or_default()
    }

    /// GeoJSON Feature for the map overlay.
    pub fn to_feature(&self) -> Value {
        json!({
            "type": "Feature",
            "properties": { "fillRule": "evenodd" },
            "geometry": {
                "type": "Polygon",
                "coordinates": self.rings,
            },
        })
    }
}

fn parse_ring(value: &Value) -> Option<Ring> {
    match serde_json::from_value::<Ring>(value.clone()) {
        Ok(ring) => Some(ring),
        Err(e) => {
            debug!("Skipping malformed boundary ring: {}", e);
            None
        }
    }
}

/// Outer rings of every `Polygon` and `MultiPolygon` feature in a
/// FeatureCollection, in feature order. Inner rings and other geometry
/// types are ignored.
pub fn outer_rings(boundary: &Value) -> Vec<Ring> {
    let Some(features) = boundary["features"].as_array() else {
        return Vec::new();
    };
    let mut rings = Vec::new();
    for feature in features {
        let geometry = &feature["geometry"];
        let coordinates = &geometry["coordinates"];
        match geometry["type"].as_str() {
            Some("Polygon") => {
                if let Some(ring) = coordinates.get(0).and_then(parse_ring) {
                    rings.push(ring);
                }
            }
            Some("MultiPolygon") => {
                let polygons = coordinates.as_array().map(Vec::as_slice).unwrap_or_default();
                rings.extend(
                    polygons
                        .iter()
                        .filter_map(|polygon| polygon.get(0).and_then(parse_ring)),
                );
            }
            _ => {}
        }
    }
    rings
}

/// Build the mask for a boundary, or `None` when the boundary is not loaded
/// or has no usable polygon rings. Rings pass through unvalidated.
pub fn build_mask(boundary: Option<&Value>) -> Option<MaskPolygon> {
    let holes = outer_rings(boundary?);
    if holes.is_empty() {
        return None;
    }
    let mut rings = Vec::with_capacity(holes.len() + 1);
    rings.push(world_ring());
    rings.extend(holes);
    Some(MaskPolygon { rings })
}
