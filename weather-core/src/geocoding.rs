//! City search and reverse geocoding backed by Nominatim (OpenStreetMap).
//!
//! Forward lookups are cached per normalized query and spaced by a
//! [`RateLimiter`] as required by the Nominatim usage policy. Failures never
//! reach the caller: a failed search yields no suggestions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::GeocodingSettings,
    location::ReverseGeocoder,
    model::{CityPrediction, Coordinate},
    search::PlaceSuggester,
    throttle::RateLimiter,
};

const RESULT_LIMIT: &str = "5";
const CITY_TYPES: [&str; 5] = ["city", "town", "village", "municipality", "administrative"];

#[derive(Debug, Default, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lon: Value,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "class", default)]
    class: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    /// First of city, town, village, municipality that is present, even if blank.
    fn locality(&self) -> Option<&str> {
        [&self.city, &self.town, &self.village, &self.municipality]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .next()
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    address: Option<NominatimAddress>,
}

/// Lenient coordinate parse: Nominatim sends strings, anything unusable becomes 0.0.
fn parse_coordinate(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

impl NominatimPlace {
    fn into_prediction(self) -> Option<CityPrediction> {
        let address = self.address.unwrap_or_default();

        let display_name = address
            .locality()
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.display_name.split(',').next().unwrap_or_default().trim().to_string()
            });
        let country = address.country.clone().unwrap_or_default();
        let state = address.state.clone().or_else(|| address.region.clone()).unwrap_or_default();
        let lat = parse_coordinate(&self.lat);
        let lon = parse_coordinate(&self.lon);

        let is_city = CITY_TYPES.contains(&self.kind.as_str())
            || self.class.as_deref() == Some("place")
            || !display_name.is_empty();

        if display_name.is_empty() || lat == 0.0 || lon == 0.0 || !is_city {
            return None;
        }

        Some(CityPrediction { display_name, country, state, lat, lon })
    }
}

/// Maps raw search results to predictions, dropping invalid and duplicate places.
fn to_predictions(places: Vec<NominatimPlace>) -> Vec<CityPrediction> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter_map(NominatimPlace::into_prediction)
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

fn cache_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Nominatim client with an in-memory query cache and request spacing.
#[derive(Debug)]
pub struct GeocodingClient {
    http: Client,
    base_url: String,
    limiter: RateLimiter,
    cache: Mutex<HashMap<String, Vec<CityPrediction>>>,
}

impl GeocodingClient {
    pub fn new(settings: &GeocodingSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.timeout())
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(settings.min_request_interval()),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// City suggestions for `query`. Served from cache when the normalized
    /// query was seen before; empty on any failure.
    pub async fn city_predictions(&self, query: &str) -> Vec<CityPrediction> {
        let key = cache_key(query);
        if let Some(cached) = self.cache.lock().get(&key) {
            tracing::debug!("Geocoding cache hit for {:?}", key);
            return cached.clone();
        }

        match self.search(query).await {
            Ok(Some(predictions)) => {
                tracing::debug!("Geocoding {:?} returned {} predictions", key, predictions.len());
                self.cache.lock().insert(key, predictions.clone());
                predictions
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Geocoding request for {:?} failed: {}", key, e);
                Vec::new()
            }
        }
    }

    /// `Ok(None)` for responses that carry no usable results and must not be cached.
    async fn search(&self, query: &str) -> Result<Option<Vec<CityPrediction>>, reqwest::Error> {
        self.limiter.acquire().await;

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", RESULT_LIMIT),
                ("addressdetails", "1"),
                ("extratags", "1"),
                ("namedetails", "1"),
                ("accept-language", "en"),
            ])
            .header(header::ACCEPT, "application/json")
            .header(header::ACCEPT_LANGUAGE, "en")
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => {
                tracing::warn!("Geocoding returned 403 Forbidden, rate limited or blocked");
                return Ok(None);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Geocoding returned 429 Too Many Requests");
                return Ok(None);
            }
            other => {
                tracing::warn!("Geocoding returned HTTP {}", other);
                return Ok(None);
            }
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            tracing::debug!("Geocoding returned an empty body");
            return Ok(None);
        }

        match serde_json::from_str::<Vec<NominatimPlace>>(&body) {
            Ok(places) => Ok(Some(to_predictions(places))),
            Err(e) => {
                tracing::warn!("Geocoding response parse error: {}", e);
                Ok(None)
            }
        }
    }

    /// Locality name for a coordinate, `None` on failure or when the place has no locality.
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String> {
        self.limiter.acquire().await;

        let response = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .header(header::ACCEPT, "application/json")
            .header(header::ACCEPT_LANGUAGE, "en")
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimReverse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let locality = body.address?.locality()?.trim().to_string();
        if locality.is_empty() {
            return None;
        }
        tracing::info!("Reverse geocoded to: {}", locality);
        Some(locality)
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.lock().len()
    }
}

#[async_trait]
impl PlaceSuggester for GeocodingClient {
    async fn suggest(&self, query: &str) -> Vec<CityPrediction> {
        self.city_predictions(query).await
    }
}

#[async_trait]
impl ReverseGeocoder for GeocodingClient {
    async fn locality(&self, coordinate: Coordinate) -> Option<String> {
        self.reverse_geocode(coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places(json: Value) -> Vec<NominatimPlace> {
        serde_json::from_value(json).expect("valid nominatim json")
    }

    #[test]
    fn city_record_maps_to_prediction() {
        let result = to_predictions(places(serde_json::json!([{
            "display_name": "Paris, Île-de-France, Metropolitan France, France",
            "lat": "48.8588897",
            "lon": "2.3200410",
            "type": "city",
            "address": { "city": "Paris", "country": "France" }
        }])));

        assert_eq!(
            result,
            vec![CityPrediction {
                display_name: "Paris".into(),
                country: "France".into(),
                state: String::new(),
                lat: 48.8588897,
                lon: 2.3200410,
            }]
        );
    }

    #[test]
    fn locality_falls_back_through_town_village_and_display_name() {
        let result = to_predictions(places(serde_json::json!([
            { "display_name": "x", "lat": "1", "lon": "1", "type": "town",
              "address": { "town": "Bath", "region": "England" } },
            { "display_name": "x", "lat": "2", "lon": "2", "type": "village",
              "address": { "village": "Mousehole", "state": "Cornwall", "region": "South West" } },
            { "display_name": " Hamlet , County, Land", "lat": "3", "lon": "3", "type": "hamlet" }
        ])));

        let names: Vec<_> = result.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["Bath", "Mousehole", "Hamlet"]);
        assert_eq!(result[0].state, "England");
        assert_eq!(result[1].state, "Cornwall");
    }

    #[test]
    fn blank_city_does_not_fall_back_to_town() {
        let result = to_predictions(places(serde_json::json!([
            { "display_name": "Somewhere, Land", "lat": "1", "lon": "1", "type": "city",
              "address": { "city": "", "town": "Elsewhere" } }
        ])));

        assert!(result.is_empty());
    }

    #[test]
    fn zero_or_unparsable_coordinates_are_dropped() {
        let result = to_predictions(places(serde_json::json!([
            { "display_name": "Null Island", "lat": "0", "lon": "5", "type": "city" },
            { "display_name": "Nowhere", "lat": "12.5", "lon": "0", "type": "city" },
            { "display_name": "Garbled", "lat": "north", "lon": "7", "type": "city" },
            { "display_name": "Numeric", "lat": 10.5, "lon": 20.25, "type": "city" }
        ])));

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].display_name, "Numeric");
        assert_eq!(result[0].lat, 10.5);
    }

    #[test]
    fn empty_display_name_is_dropped() {
        let result = to_predictions(places(serde_json::json!([
            { "display_name": "", "lat": "1", "lon": "1", "type": "city", "class": "place" }
        ])));
        assert!(result.is_empty());
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let result = to_predictions(places(serde_json::json!([
            { "display_name": "Springfield", "lat": "39.8", "lon": "-89.6", "type": "city",
              "address": { "city": "Springfield", "state": "Illinois", "country": "United States" } },
            { "display_name": "Springfield", "lat": "37.2", "lon": "-93.3", "type": "city",
              "address": { "city": "Springfield", "state": "Missouri", "country": "United States" } },
            { "display_name": "Springfield", "lat": "39.7", "lon": "-89.7", "type": "administrative",
              "address": { "city": "Springfield", "state": "Illinois", "country": "United States" } }
        ])));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].state, "Illinois");
        assert_eq!(result[0].lat, 39.8);
        assert_eq!(result[1].state, "Missouri");
    }

    #[test]
    fn cache_key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(cache_key("  LoNdon "), "london");
        assert_eq!(cache_key("london"), cache_key("LONDON\t"));
    }
}
