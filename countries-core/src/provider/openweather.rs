use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{error::FetchError, model::Weather};

use super::{WeatherProvider, status_error, trim_base};

const SERVICE: &str = "OpenWeather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url,
            api_key,
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

pub(crate) fn parse_current(body: &str) -> Result<Weather, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|source| FetchError::Decode {
            service: SERVICE,
            source,
        })?;

    let observation_time = DateTime::<Utc>::from_timestamp(parsed.dt, 0).unwrap_or_else(Utc::now);

    let (condition, icon) = match parsed.weather.into_iter().next() {
        Some(w) => (w.description, w.icon),
        None => ("Unknown".to_string(), None),
    };

    Ok(Weather {
        location_name: parsed.name,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        condition,
        icon,
        observation_time,
    })
}

/// A 404 means the provider has no location by that name.
pub(crate) fn lookup_error(city: &str, status: StatusCode, body: &str) -> FetchError {
    if status == StatusCode::NOT_FOUND {
        FetchError::NotRecognized {
            what: "Location",
            key: city.to_string(),
        }
    } else {
        status_error(SERVICE, status, body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<Weather, FetchError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            FetchError::Config(
                "No OpenWeather API key configured.\n\
                 Hint: run `countries configure` or set OPENWEATHER_API_KEY."
                    .to_string(),
            )
        })?;

        let url = format!("{}/weather", trim_base(&self.base_url));
        tracing::debug!(%url, city, "fetching current weather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("units", "metric"), ("appid", api_key)])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(lookup_error(city, status, &body));
        }

        parse_current(&body)
    }
}
