//! Error taxonomy of the pipeline.
//!
//! Display strings double as the user-facing messages that end up in
//! [`RequestState::Error`](crate::RequestState) and
//! [`LocationState::error`](crate::LocationState).

use std::error::Error as _;

use thiserror::Error;

/// Failures of device location resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location is turned off. Please enable GPS or location services.")]
    ServiceDisabled,
    #[error("Unable to get your location. Please try again.")]
    Unavailable,
    #[error("{0}")]
    Other(String),
}

impl LocationError {
    /// Wraps an arbitrary failure, falling back to a generic message when it has none.
    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            LocationError::Other("Unknown error occurred".to_string())
        } else {
            LocationError::Other(message)
        }
    }
}

/// Failures of a forecast fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("Empty response body")]
    EmptyBody,
    #[error("No place found with name \"{0}\".")]
    NotFound(String),
    #[error("API Error: {body} (Code: {code})")]
    Api { code: u16, body: String },
    #[error("Request timed out. Please check your internet connection.")]
    Timeout,
    #[error("No internet connection or unstable network.")]
    NoConnection,
    #[error("Network error: {0}")]
    Unknown(String),
}

impl WeatherError {
    /// Maps a transport-level failure of the HTTP client.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else if err.is_connect() || has_io_source(err) {
            WeatherError::NoConnection
        } else {
            WeatherError::Unknown(err.to_string())
        }
    }

    /// Narrows an `Api` error whose body talks about the location into
    /// `NotFound`. Other variants pass through.
    pub fn classify_for_place(self, place: &str) -> Self {
        match self {
            WeatherError::Api { body, .. } if mentions_place_problem(&body) => {
                WeatherError::NotFound(place.to_string())
            }
            other => other,
        }
    }
}

fn mentions_place_problem(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["location", "not found", "invalid"].iter().any(|needle| lower.contains(needle))
}

fn has_io_source(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<std::io::Error>() {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Configuration load/save failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine platform config directory")]
    NoConfigDir,
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize configuration to TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}
