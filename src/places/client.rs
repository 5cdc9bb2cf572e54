//! Places API client: request routing, caching, rate limiting, normalization
//!
//! Wraps the RapidAPI Google Places v2 endpoints. Search order is rate-limit
//! check, cache lookup, then network. Anything that goes wrong past the rate
//! limit degrades to an empty result list; only the rate limit is surfaced as
//! a typed error.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{
    api_headers, API_HOST, CACHE_CAPACITY, CACHE_TTL, HTTP_TIMEOUT, MAX_RESULT_COUNT,
    NEARBY_SEARCH_ENDPOINT, RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW, TEXT_SEARCH_ENDPOINT,
};

use super::cache::{cache_key, SearchCache};
use super::rate_limit::RateLimiter;

const LANGUAGE_CODE: &str = "en";

/// Normalized point-of-interest record returned by the search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub photos: Vec<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub opening_hours: Option<OpeningHours>,
}

/// Subset of the opening-hours blob we keep after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub open_now: bool,
}

/// The one failure `search` reports to the caller; everything else degrades
/// to an empty result list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search quota exceeded, retry in a minute")]
    RateLimited,
}

/// Client for the external places API. Owns the HTTP client, the search
/// cache, and the per-user rate limiter; shared across handler tasks.
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: String,
    cache: Mutex<SearchCache>,
    limiter: RateLimiter,
}

impl PlacesClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            cache: Mutex::new(SearchCache::new(CACHE_CAPACITY, CACHE_TTL)),
            limiter: RateLimiter::new(RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW),
        })
    }

    /// Search for places matching `query`, optionally around a location.
    ///
    /// Identical (query, lat, lon) requests within the cache TTL are served
    /// from the cache without touching the network. Per-user quota violations
    /// return [`SearchError::RateLimited`] before any network activity.
    pub async fn search(
        &self,
        query: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius: f64,
        user_id: Option<i64>,
    ) -> Result<Vec<Place>, SearchError> {
        if latitude.is_none() || longitude.is_none() {
            warn!(query, "No location provided; searching without location constraint");
        }

        if let Some(user_id) = user_id {
            if !self.limiter.check(user_id) {
                warn!(user_id, "Search quota exceeded");
                return Err(SearchError::RateLimited);
            }
        }

        let key = cache_key(query, latitude, longitude);
        if let Some(results) = self.cache.lock().unwrap().get(key) {
            info!(query, results = results.len(), "Serving cached search results");
            return Ok(results);
        }

        let (endpoint, payload) = match map_query_to_category(query) {
            Some(category) => {
                debug!(query, category, "Routing query to nearby search");
                (
                    NEARBY_SEARCH_ENDPOINT,
                    nearby_payload(category, latitude, longitude, radius),
                )
            }
            None => {
                debug!(query, "Routing query to free-text search");
                (
                    TEXT_SEARCH_ENDPOINT,
                    text_payload(query, latitude, longitude, radius),
                )
            }
        };

        match self.fetch(endpoint, &payload).await {
            Ok(results) => {
                info!(query, results = results.len(), "Search completed");
                self.cache.lock().unwrap().insert(key, results.clone());
                Ok(results)
            }
            Err(err) => {
                error!(query, error = %err, "Search failed; returning empty result list");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch(&self, endpoint: &str, payload: &Value) -> Result<Vec<Place>> {
        let url = format!("https://{API_HOST}{endpoint}");
        debug!(%url, "Sending places API request");

        let mut request = self.http.post(&url).json(payload);
        for (name, value) in api_headers(&self.api_key) {
            request = request.header(name, value);
        }

        let response = request.send().await.context("Places API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(anyhow!("Places API returned status {status}: {preview}"));
        }

        let data: Value = response
            .json()
            .await
            .context("Failed to decode places API response")?;

        if let Some(api_error) = data.get("error") {
            return Err(anyhow!("Places API reported an error: {api_error}"));
        }

        Ok(normalize_places(&data))
    }
}

/// Map a free-text query to a place-type category when it matches the fixed
/// vocabulary; `None` falls through to free-text search.
pub fn map_query_to_category(query: &str) -> Option<&'static str> {
    const VOCABULARY: &[(&str, &str)] = &[
        ("restaurant", "restaurant"),
        ("cafe", "cafe"),
        ("coffee", "cafe"),
        ("bar", "bar"),
        ("pub", "bar"),
        ("shop", "store"),
        ("store", "store"),
        ("pharmacy", "pharmacy"),
        ("bank", "bank"),
        ("hospital", "hospital"),
        ("hotel", "hotel"),
        ("cinema", "movie_theater"),
        ("movie", "movie_theater"),
        ("park", "park"),
        ("museum", "museum"),
        ("theater", "performing_arts_theater"),
        ("theatre", "performing_arts_theater"),
        ("attraction", "tourist_attraction"),
        ("attractions", "tourist_attraction"),
        ("sight", "tourist_attraction"),
    ];

    let lowered = query.to_lowercase();
    VOCABULARY
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, category)| *category)
}

/// Request body for the category-constrained nearby search.
pub fn nearby_payload(
    category: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: f64,
) -> Value {
    let mut payload = json!({
        "languageCode": LANGUAGE_CODE,
        "maxResultCount": MAX_RESULT_COUNT,
        "rankPreference": "DISTANCE",
        "includedTypes": [category],
    });

    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        payload["locationRestriction"] = json!({
            "circle": {
                "center": { "latitude": latitude, "longitude": longitude },
                "radius": radius,
            }
        });
    }

    payload
}

/// Request body for the free-text search.
pub fn text_payload(
    query: &str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: f64,
) -> Value {
    let mut payload = json!({
        "textQuery": query,
        "languageCode": LANGUAGE_CODE,
        "maxResultCount": MAX_RESULT_COUNT,
    });

    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        payload["locationBias"] = json!({
            "circle": {
                "center": { "latitude": latitude, "longitude": longitude },
                "radius": radius,
            }
        });
    }

    payload
}

/// Normalize the `places` array of an API response. Malformed entries are
/// skipped and logged; they never fail the batch.
pub fn normalize_places(data: &Value) -> Vec<Place> {
    let Some(entries) = data.get("places").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_place(entry) {
            Some(place) => results.push(place),
            None => warn!(entry = %entry, "Skipping malformed place entry"),
        }
    }
    results
}

/// Parse one API place entry into the flat [`Place`] record.
///
/// Entries that are not objects, or that carry neither a display name nor a
/// formatted address, count as malformed and yield `None`. Everything else
/// gets placeholder defaults for missing fields.
pub fn parse_place(entry: &Value) -> Option<Place> {
    let obj = entry.as_object()?;

    let name = obj
        .get("displayName")
        .and_then(|display| display.get("text"))
        .and_then(Value::as_str);
    let address = obj.get("formattedAddress").and_then(Value::as_str);

    if name.is_none() && address.is_none() {
        return None;
    }

    let location = obj.get("location");
    let latitude = location
        .and_then(|loc| loc.get("latitude"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let longitude = location
        .and_then(|loc| loc.get("longitude"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let photos = obj
        .get("photos")
        .and_then(Value::as_array)
        .map(|photos| {
            photos
                .iter()
                .filter_map(|photo| photo.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let opening_hours = obj.get("currentOpeningHours").map(|hours| OpeningHours {
        open_now: hours.get("openNow").and_then(Value::as_bool).unwrap_or(false),
    });

    Some(Place {
        name: name.unwrap_or("No name").to_string(),
        address: address.unwrap_or("Address unavailable").to_string(),
        latitude,
        longitude,
        rating: obj.get("rating").and_then(Value::as_f64),
        photos,
        website: obj
            .get("websiteUri")
            .and_then(Value::as_str)
            .map(str::to_string),
        phone: obj
            .get("nationalPhoneNumber")
            .and_then(Value::as_str)
            .map(str::to_string),
        opening_hours,
    })
}
