use async_trait::async_trait;
use std::fmt::Debug;

use crate::{config::WeatherSettings, error::WeatherError, model::WeatherModel, retry::RetryConfig};

pub mod weatherapi;

pub use weatherapi::WeatherApiProvider;

/// Source of current conditions plus a multi-day forecast for a place name.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_weather(
        &self,
        api_key: &str,
        place: &str,
        forecast_days: u8,
    ) -> Result<WeatherModel, WeatherError>;
}

/// Construct the weatherapi.com provider from the `[weather]` settings.
pub fn provider_from_settings(settings: &WeatherSettings) -> anyhow::Result<WeatherApiProvider> {
    let retry = RetryConfig::new(
        settings.max_retries,
        settings.retry_delay_ms,
        settings.retry_delay_ms.saturating_mul(8),
    );
    let provider = WeatherApiProvider::new(&settings.base_url, settings.timeout(), retry)?;
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_default_settings_builds() {
        let provider = provider_from_settings(&WeatherSettings::default());
        assert!(provider.is_ok());
    }

    #[test]
    fn provider_uses_configured_retry_policy() {
        let settings = WeatherSettings { max_retries: 3, retry_delay_ms: 100, ..Default::default() };
        let provider = provider_from_settings(&settings).expect("provider");
        assert_eq!(provider.retry(), &RetryConfig::new(3, 100, 800));
    }
}
