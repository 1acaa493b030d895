use std::{fmt, time::Duration};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::itinerary::City;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherIcon {
    Sun,
    #[default]
    Cloud,
    Snow,
    Rain,
}

impl WeatherIcon {
    /// Maps a WMO weather interpretation code onto the four display icons.
    /// Thunderstorms (95 and up) and unlisted codes fall back to cloud.
    pub fn from_wmo_code(code: u16) -> Self {
        match code {
            0 => Self::Sun,
            1..=3 => Self::Cloud,
            51..=67 | 80..=82 => Self::Rain,
            71..=77 => Self::Snow,
            _ => Self::Cloud,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Sun => "☀",
            Self::Cloud => "☁",
            Self::Snow => "❄",
            Self::Rain => "☂",
        }
    }
}

impl fmt::Display for WeatherIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sun => "sun",
            Self::Cloud => "cloud",
            Self::Snow => "snow",
            Self::Rain => "rain",
        };
        f.write_str(name)
    }
}

/// Clothing advice for a day, keyed off the places in its title.
pub fn clothing_suggestion(title: &str) -> &'static str {
    if title.contains("Karuizawa") {
        "Big temperature swings and snow in the mountains. Layer thermal underwear and wool under a long down coat. Non-slip snow boots and gloves are a must."
    } else if title.contains("Odaiba") || title.contains("Yokohama") {
        "Sea wind makes it feel colder. Bring a windproof jacket and a scarf."
    } else {
        "Tokyo winters are dry and cold. Dress warmly and keep your skin moisturised."
    }
}

/// Place name handed to the forecast prompt for a day.
pub fn search_location(title: &str) -> &'static str {
    if title.contains("Karuizawa") {
        "Karuizawa"
    } else if title.contains("Yokohama") {
        "Yokohama"
    } else if title.contains("Odaiba") {
        "Odaiba Tokyo"
    } else {
        "Tokyo"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveWeather {
    pub city: String,
    pub temperature: f64,
    pub condition_code: u16,
    pub humidity: f64,
}

impl LiveWeather {
    pub fn icon(&self) -> WeatherIcon {
        WeatherIcon::from_wmo_code(self.condition_code)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u16,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(settings: &crate::settings::Weather) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn current(&self, city: &City) -> Result<LiveWeather, WeatherError> {
        let url = format!("{}/v1/forecast", self.base_url);
        debug!(city = %city.name, %url, "fetching current weather");

        let response: ForecastResponse = self
            .http
            .get(&url)
            .query(&[
                ("latitude", city.lat.to_string()),
                ("longitude", city.lon.to_string()),
                ("current_weather", "true".to_string()),
                ("relative_humidity_2m", "true".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(LiveWeather {
            city: city.name.clone(),
            temperature: response.current_weather.temperature,
            condition_code: response.current_weather.weathercode,
            humidity: response.current_weather.relative_humidity_2m.unwrap_or_default(),
        })
    }

    /// Fetches every city concurrently. Cities whose request fails are
    /// logged and left out.
    pub async fn current_all(&self, cities: &[City]) -> Vec<LiveWeather> {
        let results = join_all(cities.iter().map(|city| self.current(city))).await;

        cities
            .iter()
            .zip(results)
            .filter_map(|(city, result)| match result {
                Ok(weather) => Some(weather),
                Err(err) => {
                    warn!(city = %city.name, error = %err, "failed to fetch live weather");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmo_codes_map_to_icons() {
        assert_eq!(WeatherIcon::from_wmo_code(0), WeatherIcon::Sun);
        assert_eq!(WeatherIcon::from_wmo_code(2), WeatherIcon::Cloud);
        assert_eq!(WeatherIcon::from_wmo_code(45), WeatherIcon::Cloud);
        assert_eq!(WeatherIcon::from_wmo_code(51), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::from_wmo_code(67), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::from_wmo_code(73), WeatherIcon::Snow);
        assert_eq!(WeatherIcon::from_wmo_code(77), WeatherIcon::Snow);
        assert_eq!(WeatherIcon::from_wmo_code(81), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::from_wmo_code(85), WeatherIcon::Cloud);
        assert_eq!(WeatherIcon::from_wmo_code(95), WeatherIcon::Cloud);
        assert_eq!(WeatherIcon::from_wmo_code(99), WeatherIcon::Cloud);
    }

    #[test]
    fn live_weather_icon_uses_condition_code() {
        let weather = LiveWeather {
            city: "Karuizawa".to_string(),
            temperature: -4.5,
            condition_code: 73,
            humidity: 80.0,
        };
        assert_eq!(weather.icon(), WeatherIcon::Snow);
    }

    #[test]
    fn current_weather_payload_decodes_without_humidity() {
        let payload = r#"{"latitude":35.7,"current_weather":{"temperature":3.2,"weathercode":1,"windspeed":7.4}}"#;
        let response: ForecastResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.current_weather.weathercode, 1);
        assert_eq!(response.current_weather.relative_humidity_2m, None);
    }

    #[test]
    fn suggestions_follow_the_day_title() {
        assert!(clothing_suggestion("Snow day in Karuizawa").contains("snow boots"));
        assert!(clothing_suggestion("Yokohama harbour").contains("windproof"));
        assert!(clothing_suggestion("Art and Odaiba").contains("windproof"));
        assert!(clothing_suggestion("Yomiuriland").contains("Tokyo"));

        assert_eq!(search_location("Old Karuizawa stroll"), "Karuizawa");
        assert_eq!(search_location("Digital art and Odaiba"), "Odaiba Tokyo");
        assert_eq!(search_location("Departure"), "Tokyo");
    }

    #[test]
    fn icons_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&WeatherIcon::Snow).unwrap(), "\"snow\"");
        assert_eq!(WeatherIcon::Rain.to_string(), "rain");
    }
}
