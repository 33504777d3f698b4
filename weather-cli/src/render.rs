//! Human-friendly terminal output.

use std::fmt;

use weather_core::{CityPrediction, WeatherModel};

pub fn weather(model: &WeatherModel) -> String {
    Report(model).to_string()
}

/// Full forecast view of one place.
struct Report<'a>(&'a WeatherModel);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.0;
        let current = &model.current;

        writeln!(f, "{}, {}", model.location.name, model.location.country)?;
        if let Some(localtime) = &model.location.localtime {
            writeln!(f, "Local time: {localtime}")?;
        }
        writeln!(f)?;

        writeln!(f, "{:.0}°  {}", current.temp_c, current.condition.text)?;
        if let Some(today) = model.today() {
            writeln!(f, "{:.0}° / {:.0}°", today.day.maxtemp_c, today.day.mintemp_c)?;
        }
        writeln!(f, "Feels like: {:.0}°", current.feelslike_c)?;

        if let Some(today) = model.today() {
            writeln!(f, "Sunrise: {}   Sunset: {}", today.astro.sunrise, today.astro.sunset)?;
        }

        writeln!(f)?;
        writeln!(f, "Forecast")?;
        for day in &model.forecast.forecastday {
            let rain = match (day.day.daily_will_it_rain > 0, day.day.daily_chance_of_rain) {
                (false, _) => String::new(),
                (true, Some(chance)) => format!("  rain {chance}%"),
                (true, None) => "  rain likely".to_string(),
            };
            writeln!(
                f,
                "  {}  {:>4.0}° / {:>3.0}°  {}{}",
                day.date.format("%a %d %b"),
                day.day.maxtemp_c,
                day.day.mintemp_c,
                day.day.condition.text,
                rain
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Details")?;
        writeln!(f, "  UV index:   {}", current.uv)?;
        writeln!(f, "  Humidity:   {}%", current.humidity)?;
        match &current.wind_dir {
            Some(dir) => writeln!(f, "  Wind:       {} km/h {}", current.wind_kph, dir)?,
            None => writeln!(f, "  Wind:       {} km/h", current.wind_kph)?,
        }
        writeln!(f, "  Dew point:  {}°", current.dewpoint_c)?;
        writeln!(f, "  Pressure:   {:.0} mb", current.pressure_mb)?;
        write!(f, "  Visibility: {} km", current.vis_km)
    }
}

pub fn suggestion(prediction: &CityPrediction) -> String {
    format!("{}  ({:.4}, {:.4})", prediction.label(), prediction.lat, prediction.lon)
}
