use anyhow::{Result, anyhow};
use std::sync::Arc;

use crate::{
    Config, GeocodingClient, LocationResolver, SearchController, WeatherSession, WeatherState,
    location::{FixedLocationProvider, LocationProvider},
    model::Coordinate,
    provider::provider_from_settings,
};

/// The wired pipeline: one session shared by the location resolver and the
/// search controller.
#[derive(Debug)]
pub struct WeatherApp {
    config: Config,
    geocoder: Arc<GeocodingClient>,
    session: Arc<WeatherSession>,
    resolver: LocationResolver,
    search: SearchController,
}

impl WeatherApp {
    /// Build the pipeline, using the `[location]` coordinate as the device position.
    pub fn from_config(config: Config) -> Result<Self> {
        let provider = Arc::new(FixedLocationProvider::new(config.location.coordinate()));
        Self::with_location_provider(config, provider)
    }

    /// Like [`from_config`](Self::from_config), but with an explicit coordinate.
    pub fn with_coordinate(config: Config, coordinate: Coordinate) -> Result<Self> {
        let provider = Arc::new(FixedLocationProvider::new(Some(coordinate)));
        Self::with_location_provider(config, provider)
    }

    pub fn with_location_provider(config: Config, location: Arc<dyn LocationProvider>) -> Result<Self> {
        let api_key = config.api_key().map(str::to_string).ok_or_else(|| {
            anyhow!(
                "No weatherapi.com API key configured.\n\
                 Hint: run `weather configure` or set ${}.",
                crate::config::API_KEY_ENV
            )
        })?;

        let geocoder = Arc::new(GeocodingClient::new(&config.geocoding)?);
        let provider = Arc::new(provider_from_settings(&config.weather)?);
        let session = Arc::new(WeatherSession::new(provider, api_key, config.weather.forecast_days));

        let resolver = LocationResolver::new(location, geocoder.clone()).with_session(session.clone());
        let search = SearchController::new(geocoder.clone(), config.search.clone())
            .with_session(session.clone());

        tracing::debug!("Weather pipeline initialized");

        Ok(Self { config, geocoder, session, resolver, search })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geocoder(&self) -> &GeocodingClient {
        &self.geocoder
    }

    pub fn session(&self) -> &WeatherSession {
        &self.session
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    /// The "my location" action: puts the last resolved city into the search
    /// input and fetches its weather. `None` until a city has been resolved.
    pub async fn use_current_location(&self) -> Option<WeatherState> {
        let city = self.resolver.city_name()?;
        tracing::debug!("Using current location {:?}", city);
        self.search.select_place(&city).await
    }
}
