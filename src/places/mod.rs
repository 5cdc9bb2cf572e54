//! Places search client
//!
//! This module is split into several submodules:
//! - `client`: HTTP wrapper around the external places API, query routing
//!   and response normalization
//! - `cache`: time- and size-bounded cache for normalized results
//! - `rate_limit`: per-user request quota enforcement

pub mod cache;
pub mod client;
pub mod rate_limit;

pub use cache::{cache_key, SearchCache};
pub use client::{
    map_query_to_category, normalize_places, parse_place, OpeningHours, Place, PlacesClient,
    SearchError,
};
pub use rate_limit::RateLimiter;
