//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - City autocomplete against Nominatim, cached and rate limited
//! - Forecast retrieval from weatherapi.com with a typed request state
//! - Resolution of the device position into a city name
//! - Configuration & the error taxonomy shown to users
//!
//! It is used by `weather-cli`, but any front end can drive the same
//! pipeline through [`WeatherApp`] and the watch streams it exposes.

pub mod app;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod location;
pub mod model;
pub mod provider;
pub mod retry;
pub mod search;
pub mod session;
pub mod throttle;

pub use app::WeatherApp;
pub use config::Config;
pub use error::{ConfigError, LocationError, WeatherError};
pub use geocoding::GeocodingClient;
pub use location::{FixedLocationProvider, LocationProvider, LocationResolver, ReverseGeocoder};
pub use model::{CityPrediction, Coordinate, LocationState, RequestState, SuggestionState, WeatherModel};
pub use provider::{WeatherApiProvider, WeatherProvider};
pub use search::{InputOrigin, PlaceSuggester, SearchController};
pub use session::{WeatherSession, WeatherState};
