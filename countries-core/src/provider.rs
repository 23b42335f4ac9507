use crate::{
    Config,
    error::FetchError,
    model::{Country, Record, Weather},
    provider::{
        openweather::OpenWeatherProvider, restcountries::RestCountriesProvider,
        supabase::{SupabasePlatform, UnconfiguredPlatform},
    },
    session::Session,
};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::fmt::Debug;

pub mod openweather;
pub mod restcountries;
pub mod supabase;

/// Source of country records.
#[async_trait]
pub trait CountriesProvider: Send + Sync + Debug {
    async fn all_countries(&self) -> Result<Vec<Country>, FetchError>;

    /// `Ok(None)` when the code is unknown to the directory.
    async fn country_by_code(&self, code: &str) -> Result<Option<Country>, FetchError>;
}

/// Source of current weather conditions keyed by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<Weather, FetchError>;
}

/// Hosted authentication + table storage.
#[async_trait]
pub trait DataPlatform: Send + Sync + Debug {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, FetchError>;

    async fn sign_out(&self, session: &Session) -> Result<(), FetchError>;

    /// All rows of `table` matching every `(column, value)` equality filter.
    /// Without a session the request runs with the anonymous key.
    async fn select(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        session: Option<&Session>,
    ) -> Result<Vec<Record>, FetchError>;

    /// Returns the stored rows as the platform echoes them back.
    async fn insert(
        &self,
        table: &str,
        record: Record,
        session: &Session,
    ) -> Result<Vec<Record>, FetchError>;

    async fn delete(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        session: &Session,
    ) -> Result<(), FetchError>;
}

/// The three remote collaborators the application talks to.
#[derive(Debug)]
pub struct Services {
    pub countries: Box<dyn CountriesProvider>,
    pub weather: Box<dyn WeatherProvider>,
    pub platform: Box<dyn DataPlatform>,
}

/// Construct the HTTP-backed services from config.
///
/// Missing credentials are not an error here: the weather provider and the
/// platform report them per request so the rest of the application keeps
/// working.
pub fn services_from_config(config: &Config) -> Services {
    let countries = RestCountriesProvider::new(config.countries.base_url.clone());
    let weather =
        OpenWeatherProvider::new(config.weather.base_url.clone(), config.weather.api_key.clone());

    let platform: Box<dyn DataPlatform> =
        match (config.platform.url.as_deref(), config.platform.anon_key.as_deref()) {
            (Some(url), Some(key)) => {
                Box::new(SupabasePlatform::new(url.to_owned(), key.to_owned()))
            }
            _ => Box::new(UnconfiguredPlatform),
        };

    Services {
        countries: Box::new(countries),
        weather: Box::new(weather),
        platform,
    }
}

/// Read the body and fail on a non-2xx status. 401/403 become
/// [`FetchError::Unauthorized`].
pub(crate) async fn read_success_body(
    res: Response,
    service: &'static str,
) -> Result<String, FetchError> {
    let status = res.status();
    let body = res.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    Err(status_error(service, status, &body))
}

pub(crate) fn status_error(service: &'static str, status: StatusCode, body: &str) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let body = truncate_body(body);
            FetchError::Unauthorized(format!("{service} answered {status}: {body}"))
        }
        _ => FetchError::Status {
            service,
            status: status.as_u16(),
            body: truncate_body(body),
        },
    }
}

pub(crate) fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
