//! Root of the pipeline: the weather request state machine.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    model::{RequestState, WeatherModel},
    provider::WeatherProvider,
};

pub type WeatherState = RequestState<WeatherModel>;

/// Holds the state of the current forecast request and publishes every
/// transition to subscribers.
#[derive(Debug)]
pub struct WeatherSession {
    provider: Arc<dyn WeatherProvider>,
    api_key: String,
    forecast_days: u8,
    state: watch::Sender<WeatherState>,
    last_place: Mutex<Option<String>>,
}

impl WeatherSession {
    pub fn new(provider: Arc<dyn WeatherProvider>, api_key: impl Into<String>, forecast_days: u8) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            provider,
            api_key: api_key.into(),
            forecast_days,
            state,
            last_place: Mutex::new(None),
        }
    }

    /// Latest-value stream of the request state.
    pub fn subscribe(&self) -> watch::Receiver<WeatherState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> WeatherState {
        self.state.borrow().clone()
    }

    /// Place name of the most recent `fetch`, successful or not.
    pub fn last_place(&self) -> Option<String> {
        self.last_place.lock().clone()
    }

    pub fn forecast_days(&self) -> u8 {
        self.forecast_days
    }

    /// Fetches the forecast for `name`, moving through `Loading` into
    /// `Success` or `Error`. Returns the terminal state.
    pub async fn fetch(&self, name: &str) -> WeatherState {
        *self.last_place.lock() = Some(name.to_string());
        self.state.send_replace(RequestState::Loading);

        let next = match self.provider.fetch_weather(&self.api_key, name, self.forecast_days).await {
            Ok(model) => {
                tracing::info!(
                    "Weather for {:?}: {}, {}",
                    name,
                    model.location.name,
                    model.current.condition.text
                );
                RequestState::Success(model)
            }
            Err(e) => {
                let e = e.classify_for_place(name);
                tracing::warn!("Weather fetch for {:?} failed: {}", name, e);
                RequestState::Error(e.to_string())
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    /// Repeats the last fetch. `None` when nothing was fetched yet.
    pub async fn refresh(&self) -> Option<WeatherState> {
        let place = self.last_place()?;
        tracing::debug!("Refreshing weather for {:?}", place);
        Some(self.fetch(&place).await)
    }
}
