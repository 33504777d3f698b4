//! Resolution of the device position into a city name.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    error::LocationError,
    model::{Coordinate, LocationState},
    session::WeatherSession,
};

/// Power/accuracy trade-off requested for a position fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerAccuracy {
    High,
    #[default]
    Balanced,
    LowPower,
}

/// Platform positioning capability.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    fn is_gps_enabled(&self) -> bool;

    fn is_network_enabled(&self) -> bool;

    fn is_enabled(&self) -> bool {
        self.is_gps_enabled() || self.is_network_enabled()
    }

    /// One-shot position fix. `Ok(None)` when no position could be obtained.
    async fn current_position(
        &self,
        accuracy: PowerAccuracy,
    ) -> Result<Option<Coordinate>, LocationError>;
}

/// Maps a coordinate to a locality (city/town) name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    async fn locality(&self, coordinate: Coordinate) -> Option<String>;
}

/// Reports a configured coordinate as a network-derived position.
/// Without a coordinate, every source counts as disabled.
#[derive(Debug, Clone, Default)]
pub struct FixedLocationProvider {
    coordinate: Option<Coordinate>,
}

impl FixedLocationProvider {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    fn is_gps_enabled(&self) -> bool {
        false
    }

    fn is_network_enabled(&self) -> bool {
        self.coordinate.is_some()
    }

    async fn current_position(
        &self,
        _accuracy: PowerAccuracy,
    ) -> Result<Option<Coordinate>, LocationError> {
        Ok(self.coordinate)
    }
}

/// Drives `LocationState` through `Loading -> resolved | failed` and hands
/// a resolved city to the weather session.
#[derive(Debug)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
    session: Option<Arc<WeatherSession>>,
    state: watch::Sender<LocationState>,
    last_city: Mutex<Option<String>>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        let (state, _) = watch::channel(LocationState::default());
        Self { provider, geocoder, session: None, state, last_city: Mutex::new(None) }
    }

    /// Fetch weather for every city this resolver resolves.
    pub fn with_session(mut self, session: Arc<WeatherSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LocationState {
        self.state.borrow().clone()
    }

    /// Last successfully resolved city; survives later resolution attempts.
    pub fn city_name(&self) -> Option<String> {
        self.last_city.lock().clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Resolves the current position to a city name. When a city is found
    /// and a session is attached, its weather fetch completes before this returns.
    pub async fn resolve_current_location(&self) -> LocationState {
        self.state.send_replace(LocationState::loading());

        if !self.provider.is_enabled() {
            tracing::info!("Location providers disabled, skipping resolution");
            return self.publish(LocationState::failed(LocationError::ServiceDisabled.to_string()));
        }

        self.clear_error();

        let coordinate = match self.provider.current_position(PowerAccuracy::Balanced).await {
            Ok(Some(coordinate)) => coordinate,
            Ok(None) => {
                return self.publish(LocationState::failed(LocationError::Unavailable.to_string()));
            }
            Err(e) => {
                tracing::warn!("Location fix failed: {}", e);
                return self.publish(LocationState::failed(LocationError::other(e.to_string()).to_string()));
            }
        };

        tracing::debug!("Got location: {}, {}", coordinate.latitude, coordinate.longitude);

        let city = self
            .geocoder
            .locality(coordinate)
            .await
            .filter(|name| !name.trim().is_empty());

        let resolved = self.publish(LocationState::resolved(city.clone()));

        if let Some(city) = city {
            *self.last_city.lock() = Some(city.clone());
            if let Some(session) = &self.session {
                session.fetch(&city).await;
            }
        }

        resolved
    }

    /// Re-runs resolution after a failure once a location source is enabled again.
    pub async fn retry_if_enabled(&self) -> Option<LocationState> {
        if self.state.borrow().error.is_none() || !self.provider.is_enabled() {
            return None;
        }
        Some(self.resolve_current_location().await)
    }

    fn publish(&self, state: LocationState) -> LocationState {
        self.state.send_replace(state.clone());
        state
    }
}
