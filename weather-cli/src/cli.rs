use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode, Select, Text};
use weather_core::{Config, Coordinate, InputOrigin, RequestState, WeatherApp, WeatherState};

use crate::render;

/// Upper bound for waiting on suggestions, covering debounce, rate limiting and the request.
const SUGGESTION_WAIT: Duration = Duration::from_secs(40);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Number of forecast days to request (overrides the config file).
    #[arg(long, global = true)]
    pub days: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weatherapi.com API key and an optional default location.
    Configure,

    /// Show weather for a place name.
    Show {
        /// Place name, e.g. "London" or "Paris, France".
        place: String,
    },

    /// Show weather for the current position (configured, or given by flags).
    Here {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Search for a city with autocomplete, then show its weather.
    Search {
        /// Initial search text; prompted for when absent.
        query: Option<String>,
    },
}

impl Cli {
    pub async fn run(self, mut config: Config) -> anyhow::Result<()> {
        if let Some(days) = self.days {
            config.weather.forecast_days = days;
        }

        match self.command {
            Command::Configure => configure(config),
            Command::Show { place } => {
                let app = WeatherApp::from_config(config)?;
                let state = app.session().fetch(&place).await;
                print_state(state)
            }
            Command::Here { lat, lon } => {
                let app = match lat.zip(lon) {
                    Some((lat, lon)) => WeatherApp::with_coordinate(config, Coordinate::new(lat, lon))?,
                    None => WeatherApp::from_config(config)?,
                };
                here(&app).await
            }
            Command::Search { query } => {
                let app = WeatherApp::from_config(config)?;
                search(&app, query).await
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("weatherapi.com API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let set_location = Confirm::new("Set a default location for `weather here`?")
        .with_default(config.location.coordinate().is_some())
        .prompt()?;

    if set_location {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a number, e.g. 51.5074")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a number, e.g. -0.1278")
            .prompt()?;
        config.location.latitude = Some(latitude);
        config.location.longitude = Some(longitude);
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn here(app: &WeatherApp) -> anyhow::Result<()> {
    let location = app.resolver().resolve_current_location().await;

    if let Some(error) = location.error {
        bail!(error);
    }

    match location.city_name {
        Some(city) => {
            tracing::debug!("Resolved current location to {}", city);
            print_state(app.session().state())
        }
        None => bail!("Could not determine a city for your position."),
    }
}

async fn search(app: &WeatherApp, query: Option<String>) -> anyhow::Result<()> {
    let query = match query {
        Some(q) => q,
        None => Text::new("Search any location:").prompt()?,
    };

    let controller = app.search();
    let mut updates = controller.subscribe();
    controller.on_query_changed(&query, InputOrigin::User);

    let state = tokio::time::timeout(SUGGESTION_WAIT, updates.wait_for(|s| !s.is_loading))
        .await
        .context("Timed out waiting for suggestions")?
        .map_err(|_| anyhow!("Search was cancelled"))?
        .clone();

    if state.suggestions.is_empty() {
        println!("No suggestions for {:?}, searching as typed.", query.trim());
        let fetched = controller.submit().await.ok_or_else(|| anyhow!("Nothing to search for"))?;
        return print_state(fetched);
    }

    let mut options: Vec<String> = state.suggestions.iter().map(render::suggestion).collect();
    options.push(format!("Search for {:?} as typed", query.trim()));

    let picked = Select::new("Pick a place:", options).raw_prompt()?;

    let fetched = match state.suggestions.get(picked.index) {
        Some(prediction) => controller.select_suggestion(prediction).await,
        None => controller.submit().await,
    };

    print_state(fetched.ok_or_else(|| anyhow!("Nothing to search for"))?)
}

fn print_state(state: WeatherState) -> anyhow::Result<()> {
    match state {
        RequestState::Success(model) => {
            println!("{}", render::weather(&model));
            Ok(())
        }
        RequestState::Error(message) => bail!(message),
        RequestState::Idle | RequestState::Loading => bail!("No weather data available"),
    }
}
