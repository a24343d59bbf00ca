//! Core types for the Wimmera river monitoring map.
//!
//! Station reference data, status/detail feeds and the name-keyed join that
//! turns them into map-ready station views. With the `api` feature, also the
//! remote sensor API client and the per-session fetch cache.

pub mod feed;
pub mod join;
pub mod reading;
pub mod station;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod cache;
#[cfg(feature = "api")]
pub mod error;
