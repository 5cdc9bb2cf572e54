//! Configuration loaded from the environment
//!
//! Required variables fail startup with a descriptive error; everything else
//! has a sensible default. API tuning constants (endpoints, field mask, rate
//! limits, cache bounds) live here next to the settings they belong to.

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

/// Places API host (RapidAPI proxy for Google Places v2).
pub const API_HOST: &str = "google-map-places-new-v2.p.rapidapi.com";
/// Endpoint for category-constrained nearby search.
pub const NEARBY_SEARCH_ENDPOINT: &str = "/v1/places:searchNearby";
/// Endpoint for free-text search.
pub const TEXT_SEARCH_ENDPOINT: &str = "/v1/places:searchText";

/// Field mask limiting the response payload to the fields we normalize.
pub const FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.location,\
     places.rating,places.websiteUri,places.nationalPhoneNumber,\
     places.currentOpeningHours,places.photos";

/// Default search radius in meters.
pub const DEFAULT_RADIUS_M: f64 = 1000.0;
/// Upper bound on results requested per API call.
pub const MAX_RESULT_COUNT: u32 = 20;

/// Per-user search quota within one rate-limit window.
pub const RATE_LIMIT_REQUESTS: u32 = 5;
/// Rate-limit window length.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// How long cached search results stay valid.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);
/// Maximum number of cached searches before LRU eviction.
pub const CACHE_CAPACITY: usize = 100;

/// Per-call HTTP timeout.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Application settings sourced from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub rapidapi_key: String,
    pub database_path: String,
    pub debug: bool,
    pub log_level: String,
    pub admin_chat_id: Option<i64>,
}

impl Config {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup function.
    ///
    /// Keeps the parsing logic testable without mutating process-wide
    /// environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let rapidapi_key = lookup("RAPIDAPI_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("RAPIDAPI_KEY must be set"))?;

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| "data/city_expert.db".to_string());

        let debug = lookup("DEBUG")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let admin_chat_id = match lookup("ADMIN_CHAT_ID") {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| anyhow!("ADMIN_CHAT_ID must be a numeric chat id, got '{raw}'"))?,
            ),
            None => None,
        };

        Ok(Self {
            telegram_bot_token,
            rapidapi_key,
            database_path,
            debug,
            log_level,
            admin_chat_id,
        })
    }
}

/// Request headers for the places API.
pub fn api_headers(api_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("X-RapidAPI-Key", api_key.to_string()),
        ("X-RapidAPI-Host", API_HOST.to_string()),
        ("Content-Type", "application/json".to_string()),
        ("X-Goog-FieldMask", FIELD_MASK.to_string()),
    ]
}
