use crate::{model::Country, route::Route};

/// A fetch the current view needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchAllCountries,
    FetchCountry(String),
    FetchWeather(String),
    FetchTestData,
    FetchProtectedData,
    FetchFavorites,
}

/// Decides which fetch follows a navigation: exactly one on entering a view
/// or on a change of its key, none when staying put.
#[derive(Debug, Default)]
pub struct ViewController {
    current: Option<Route>,
    weather_city: Option<String>,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Route> {
        self.current.as_ref()
    }

    /// Record the navigation and return the fetch it triggers.
    pub fn enter(&mut self, route: &Route) -> Option<Effect> {
        if self.current.as_ref() == Some(route) {
            return None;
        }
        self.current = Some(route.clone());
        self.weather_city = None;

        match route {
            Route::Home | Route::Countries => Some(Effect::FetchAllCountries),
            Route::CountryDetail(code) => Some(Effect::FetchCountry(code.clone())),
            Route::Test => Some(Effect::FetchTestData),
            Route::Protected => Some(Effect::FetchProtectedData),
            Route::Favorites => Some(Effect::FetchFavorites),
            Route::Login | Route::NotFound(_) => None,
        }
    }

    /// The manual "try again" of the list view.
    pub fn retry(&self) -> Option<Effect> {
        match &self.current {
            Some(route) if route.is_country_list() => Some(Effect::FetchAllCountries),
            _ => None,
        }
    }

    /// The detail view's weather panel keys on the capital of the loaded
    /// country; a new capital means one new fetch.
    pub fn country_loaded(&mut self, country: Option<&Country>) -> Option<Effect> {
        if !matches!(self.current, Some(Route::CountryDetail(_))) {
            return None;
        }
        let city = country?.primary_capital()?.to_string();
        if self.weather_city.as_deref() == Some(city.as_str()) {
            return None;
        }
        self.weather_city = Some(city.clone());
        Some(Effect::FetchWeather(city))
    }
}
