//! Data processing for the river monitoring map.
//!
//! This crate turns loaded datasets and fetched sensor payloads into forms
//! the map and its charts draw directly: the boundary mask overlay, chart
//! series and popup text.

pub mod mask;
pub mod series;
