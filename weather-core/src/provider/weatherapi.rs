use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::WeatherError,
    model::WeatherModel,
    retry::{RetryConfig, send_with_retry},
};

use super::WeatherProvider;

/// weatherapi.com forecast client (`GET /v1/forecast.json`).
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    base_url: String,
    http: Client,
    retry: RetryConfig,
}

impl WeatherApiProvider {
    /// `timeout` bounds both connecting and the whole request.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().connect_timeout(timeout).timeout(timeout).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http, retry })
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    fn forecast_url(&self) -> String {
        format!("{}/v1/forecast.json", self.base_url)
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch_weather(
        &self,
        api_key: &str,
        place: &str,
        forecast_days: u8,
    ) -> Result<WeatherModel, WeatherError> {
        let url = self.forecast_url();
        let days = forecast_days.to_string();

        tracing::debug!("Fetching {}-day forecast for {:?}", forecast_days, place);

        let res = send_with_retry(&self.retry, || {
            self.http
                .get(&url)
                .query(&[("key", api_key), ("q", place), ("days", days.as_str())])
                .send()
        })
        .await
        .map_err(|e| {
            tracing::warn!("Forecast request for {:?} failed: {}", place, e);
            WeatherError::from_transport(&e)
        })?;

        let status = res.status();

        if !status.is_success() {
            let body = match res.text().await {
                Ok(text) if !text.is_empty() => text,
                _ => "Unknown error".to_string(),
            };
            tracing::warn!("Forecast request failed with status {}: {}", status, truncate_body(&body));
            return Err(WeatherError::Api { code: status.as_u16(), body });
        }

        let body = res.text().await.map_err(|e| WeatherError::from_transport(&e))?;
        if body.trim().is_empty() {
            return Err(WeatherError::EmptyBody);
        }

        let parsed: Option<WeatherModel> = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Failed to parse forecast JSON: {}", e);
            WeatherError::Unknown(format!("Failed to parse forecast response: {e}"))
        })?;

        parsed.ok_or(WeatherError::EmptyBody)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
