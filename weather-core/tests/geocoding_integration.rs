//! Integration tests for GeocodingClient using wiremock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use weather_core::config::GeocodingSettings;
use weather_core::{Coordinate, GeocodingClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn settings(server: &MockServer, interval_ms: u64) -> GeocodingSettings {
    GeocodingSettings {
        base_url: server.uri(),
        user_agent: "WeatherApp/1.0".into(),
        min_request_interval_ms: interval_ms,
        timeout_secs: 5,
    }
}

fn paris() -> serde_json::Value {
    serde_json::json!([
        {
            "display_name": "Paris, Île-de-France, Metropolitan France, France",
            "lat": "48.8588897",
            "lon": "2.3200410",
            "class": "boundary",
            "type": "administrative",
            "address": { "city": "Paris", "state": "Île-de-France", "country": "France" }
        },
        {
            "display_name": "Paris, Lamar County, Texas, United States",
            "lat": "33.6617962",
            "lon": "-95.555513",
            "class": "place",
            "type": "town",
            "address": { "city": "Paris", "state": "Texas", "country": "United States" }
        }
    ])
}

/// Records when each request arrived.
#[derive(Clone, Default)]
struct ArrivalLog(Arc<Mutex<Vec<Instant>>>);

impl Respond for ArrivalLog {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.0.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200).set_body_json(paris())
    }
}

#[tokio::test]
async fn test_search_sends_expected_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Paris"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "5"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("extratags", "1"))
        .and(query_param("namedetails", "1"))
        .and(query_param("accept-language", "en"))
        .and(header("user-agent", "WeatherApp/1.0"))
        .and(header("accept", "application/json"))
        .and(header("accept-language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();
    let predictions = client.city_predictions("Paris").await;

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].display_name, "Paris");
    assert_eq!(predictions[0].state, "Île-de-France");
    assert_eq!(predictions[1].country, "United States");
}

#[tokio::test]
async fn test_cached_query_skips_network_for_case_and_whitespace_variants() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();

    let first = client.city_predictions("Paris").await;
    for variant in ["paris", "  PARIS ", "pArIs\t"] {
        assert_eq!(client.city_predictions(variant).await, first);
    }
    assert_eq!(client.cached_queries(), 1);
}

#[tokio::test]
async fn test_clear_cache_forces_new_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();

    client.city_predictions("Paris").await;
    client.clear_cache();
    assert_eq!(client.cached_queries(), 0);
    client.city_predictions("Paris").await;
}

#[tokio::test]
async fn test_requests_are_spaced_by_min_interval() {
    let mock_server = MockServer::start().await;
    let arrivals = ArrivalLog::default();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(arrivals.clone())
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 1000)).unwrap();

    client.city_predictions("Paris").await;
    client.city_predictions("Lyon").await;

    let log = arrivals.0.lock().unwrap().clone();
    assert_eq!(log.len(), 2);
    assert!(log[1] - log[0] >= Duration::from_millis(1000));
}

#[tokio::test]
async fn test_rate_limited_responses_return_empty_and_are_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();

    assert!(client.city_predictions("Blocked").await.is_empty());
    assert!(client.city_predictions("Blocked").await.is_empty());
    assert!(client.city_predictions("Busy").await.is_empty());
    assert_eq!(client.cached_queries(), 0);
}

#[tokio::test]
async fn test_server_error_and_malformed_bodies_return_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("q", "Broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("q", "Garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("q", "Silent"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();

    assert!(client.city_predictions("Broken").await.is_empty());
    assert!(client.city_predictions("Garbled").await.is_empty());
    assert!(client.city_predictions("Silent").await.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_returns_empty() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = GeocodingClient::new(&GeocodingSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        min_request_interval_ms: 0,
        ..Default::default()
    })
    .unwrap();

    assert!(client.city_predictions("Paris").await.is_empty());
}

#[tokio::test]
async fn test_reverse_geocode_picks_locality() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "51.5074"))
        .and(query_param("lon", "-0.1278"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "London, Greater London, England, United Kingdom",
            "address": { "city": "London", "state": "England", "country": "United Kingdom" }
        })))
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();
    let name = client.reverse_geocode(Coordinate::new(51.5074, -0.1278)).await;

    assert_eq!(name.as_deref(), Some("London"));
}

#[tokio::test]
async fn test_reverse_geocode_without_locality_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "Atlantic Ocean",
            "address": { "city": " ", "country": "" }
        })))
        .mount(&mock_server)
        .await;

    let client = GeocodingClient::new(&settings(&mock_server, 0)).unwrap();

    assert!(client.reverse_geocode(Coordinate::new(30.0, -40.0)).await.is_none());
}
