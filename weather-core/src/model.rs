use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A city suggestion produced by forward geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityPrediction {
    pub display_name: String,
    pub country: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

impl CityPrediction {
    /// Identity used for de-duplication: two predictions with the same name,
    /// state and country are the same place.
    pub fn dedup_key(&self) -> (String, String, String) {
        (self.display_name.clone(), self.state.clone(), self.country.clone())
    }

    /// "Paris, Île-de-France, France", skipping empty parts.
    pub fn label(&self) -> String {
        [self.display_name.as_str(), self.state.as_str(), self.country.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A device-reported position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Forecast response of `GET /v1/forecast.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherModel {
    pub current: CurrentConditions,
    pub forecast: Forecast,
    pub location: PlaceInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub condition: Condition,
    pub humidity: u8,
    pub uv: f64,
    pub wind_kph: f64,
    pub pressure_mb: f64,
    pub vis_km: f64,
    pub dewpoint_c: f64,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub is_day: Option<u8>,
    #[serde(default)]
    pub wind_dir: Option<String>,
    #[serde(default)]
    pub precip_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day: DaySummary,
    pub astro: Astro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub daily_will_it_rain: u8,
    #[serde(default)]
    pub daily_chance_of_rain: Option<u8>,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

impl WeatherModel {
    pub fn today(&self) -> Option<&ForecastDay> {
        self.forecast.forecastday.first()
    }
}

/// State of an asynchronous request.
///
/// Every request moves `Idle | Success | Error -> Loading -> Success | Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Success(_) | RequestState::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RequestState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            RequestState::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Progress of resolving the device position to a city name.
///
/// `is_loading` and `error` are never set at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationState {
    pub is_loading: bool,
    pub city_name: Option<String>,
    pub error: Option<String>,
}

impl LocationState {
    pub fn loading() -> Self {
        Self { is_loading: true, city_name: None, error: None }
    }

    pub fn resolved(city_name: Option<String>) -> Self {
        Self { is_loading: false, city_name, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { is_loading: false, city_name: None, error: Some(message.into()) }
    }
}

/// Search box model driven by the suggestion pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuggestionState {
    pub query: String,
    pub suggestions: Vec<CityPrediction>,
    pub is_loading: bool,
    pub visible: bool,
    /// False once the text was filled in programmatically (e.g. by a selection).
    pub user_typing: bool,
}
