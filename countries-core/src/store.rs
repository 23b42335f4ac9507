//! The application's resource slices and the operations that fill them.
//!
//! Each operation converts every provider failure into slice state; none of
//! them return an error to the caller.

use crate::{
    error::{FailureKind, SliceError},
    model::{Country, Favorite, Record, Weather},
    provider::{CountriesProvider, DataPlatform, WeatherProvider},
    session::Session,
    slice::{ResourceSlice, Settlement},
};

/// Identifies one slice, e.g. to abandon it when leaving its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceId {
    Countries,
    SelectedCountry,
    Weather,
    TestData,
    ProtectedData,
    Favorites,
}

#[derive(Debug)]
pub struct Store {
    pub countries: ResourceSlice<Vec<Country>>,
    pub selected_country: ResourceSlice<Country>,
    pub weather: ResourceSlice<Weather>,
    pub test_data: ResourceSlice<Vec<Record>>,
    pub protected_data: ResourceSlice<Vec<Record>>,
    pub favorites: ResourceSlice<Vec<Favorite>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            countries: ResourceSlice::new("countries"),
            selected_country: ResourceSlice::new("selected_country"),
            weather: ResourceSlice::new("weather"),
            test_data: ResourceSlice::new("test_data"),
            protected_data: ResourceSlice::new("protected_data"),
            favorites: ResourceSlice::new("favorites"),
        }
    }

    pub async fn fetch_all_countries(&self, provider: &dyn CountriesProvider) -> Settlement {
        self.countries
            .dispatch(async {
                provider
                    .all_countries()
                    .await
                    .map(Some)
                    .map_err(|e| SliceError::from_fetch("Failed to load countries", &e))
            })
            .await
    }

    /// An unknown code settles with no data rather than an error.
    pub async fn fetch_country_by_code(
        &self,
        provider: &dyn CountriesProvider,
        code: &str,
    ) -> Settlement {
        self.selected_country
            .dispatch(async {
                provider
                    .country_by_code(code)
                    .await
                    .map_err(|e| {
                        SliceError::from_fetch(&format!("Failed to load country {code}"), &e)
                    })
            })
            .await
    }

    pub async fn fetch_weather(&self, provider: &dyn WeatherProvider, city: &str) -> Settlement {
        let city = city.trim();
        self.weather
            .dispatch(async {
                if city.is_empty() {
                    return Err(SliceError::new(FailureKind::NotRecognized, "No city provided"));
                }
                provider
                    .current_weather(city)
                    .await
                    .map(Some)
                    .map_err(|e| {
                        SliceError::from_fetch(&format!("Failed to load weather for {city}"), &e)
                    })
            })
            .await
    }

    pub async fn fetch_test_data(&self, platform: &dyn DataPlatform, table: &str) -> Settlement {
        self.test_data
            .dispatch(async {
                platform
                    .select(table, &[], None)
                    .await
                    .map(Some)
                    .map_err(|e| SliceError::from_fetch("Failed to load test data", &e))
            })
            .await
    }

    pub async fn fetch_protected_data(
        &self,
        platform: &dyn DataPlatform,
        table: &str,
        session: Option<&Session>,
    ) -> Settlement {
        self.protected_data
            .dispatch(async {
                let session = session.ok_or_else(sign_in_required)?;
                platform
                    .select(table, &[], Some(session))
                    .await
                    .map(Some)
                    .map_err(|e| SliceError::from_fetch("Failed to load protected data", &e))
            })
            .await
    }

    pub async fn fetch_favorites(
        &self,
        platform: &dyn DataPlatform,
        table: &str,
        session: Option<&Session>,
    ) -> Settlement {
        self.favorites
            .dispatch(async {
                let session = session.ok_or_else(sign_in_required)?;
                let rows = platform
                    .select(table, &[("user_id", session.user_id.as_str())], Some(session))
                    .await
                    .map_err(|e| SliceError::from_fetch("Failed to load favorites", &e))?;
                decode_favorites(rows).map(Some)
            })
            .await
    }

    pub fn abandon(&self, id: SliceId) {
        match id {
            SliceId::Countries => self.countries.abandon(),
            SliceId::SelectedCountry => self.selected_country.abandon(),
            SliceId::Weather => self.weather.abandon(),
            SliceId::TestData => self.test_data.abandon(),
            SliceId::ProtectedData => self.protected_data.abandon(),
            SliceId::Favorites => self.favorites.abandon(),
        }
    }
}

fn sign_in_required() -> SliceError {
    SliceError::new(FailureKind::Unauthorized, "Sign in to see this page")
}

fn decode_favorites(rows: Vec<Record>) -> Result<Vec<Favorite>, SliceError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| {
                SliceError::new(FailureKind::Decode, format!("Failed to read favorite: {e}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{Listing, tests::numbered};
    use crate::testing::{FakeCountries, FakePlatform, FakeWeather, session};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn fetch_all_fills_the_list() {
        let store = Store::new();
        let provider = FakeCountries::with(numbered(250));

        assert_eq!(store.fetch_all_countries(&provider).await, Settlement::Applied);

        let state = store.countries.snapshot();
        let countries = state.data.expect("countries loaded");
        assert_eq!(countries.len(), 250);
        assert!(!state.loading);

        let page = Listing::default().visible(&countries);
        assert_eq!(page.pages, 21);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_old_list() {
        let store = Store::new();
        let provider = FakeCountries::with(numbered(3));
        store.fetch_all_countries(&provider).await;

        provider.fail_next("connection refused");
        store.fetch_all_countries(&provider).await;

        let state = store.countries.snapshot();
        assert_eq!(state.data.map(|c| c.len()), Some(3));
        assert!(!state.loading);
        let msg = state.error.expect("error").message;
        assert!(msg.starts_with("Failed to load countries"), "{msg}");
    }

    #[tokio::test]
    async fn unknown_code_resolves_without_data() {
        let store = Store::new();
        let provider = FakeCountries::with(numbered(3));

        store.fetch_country_by_code(&provider, "XXX").await;

        let state = store.selected_country.snapshot();
        assert!(state.data.is_none());
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn unrecognized_city_is_distinguished() {
        let store = Store::new();
        let weather = FakeWeather::knowing(&["Helsinki"]);

        store.fetch_weather(&weather, "Atlantis").await;
        let err = store.weather.snapshot().error.expect("error");
        assert!(err.is_not_recognized());
        assert_eq!(err.message, "Location not recognized: Atlantis");

        weather.fail_next("timeout");
        store.fetch_weather(&weather, "Helsinki").await;
        let err = store.weather.snapshot().error.expect("error");
        assert_eq!(err.kind, FailureKind::Transport);
        assert!(err.message.starts_with("Failed to load weather for Helsinki"));
    }

    #[tokio::test]
    async fn blank_city_never_reaches_provider() {
        let store = Store::new();
        let weather = FakeWeather::knowing(&["Helsinki"]);

        store.fetch_weather(&weather, "  ").await;

        assert_eq!(store.weather.snapshot().error_message(), Some("No city provided"));
        assert_eq!(weather.calls(), 0);
    }

    #[tokio::test]
    async fn rapid_refetches_are_not_deduplicated_but_fenced() {
        let store = Store::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let provider = FakeCountries::with(numbered(5)).gated(release_rx);

        let first = store.fetch_all_countries(&provider);
        let second = store.fetch_all_countries(&provider);
        let release = async {
            tokio::task::yield_now().await;
            release_tx.send(()).ok();
        };
        let (a, b, ()) = tokio::join!(first, second, release);

        assert_eq!(provider.calls(), 2);
        assert_eq!((a, b), (Settlement::Stale, Settlement::Applied));
        assert_eq!(store.countries.snapshot().data.map(|c| c.len()), Some(5));
    }

    #[tokio::test]
    async fn protected_data_needs_a_session() {
        let store = Store::new();
        let platform = FakePlatform::default();

        store.fetch_protected_data(&platform, "protected_data", None).await;
        let err = store.protected_data.snapshot().error.expect("error");
        assert_eq!(err.kind, FailureKind::Unauthorized);
        assert_eq!(platform.selects(), 0);

        store.fetch_protected_data(&platform, "protected_data", Some(&session())).await;
        assert_eq!(store.protected_data.snapshot().data, Some(Vec::new()));
    }

    #[tokio::test]
    async fn favorites_are_read_for_the_signed_in_user() {
        let store = Store::new();
        let platform = FakePlatform::default();
        let me = session();
        platform.seed(
            "favorites",
            serde_json::json!({
                "id": 1,
                "user_id": me.user_id,
                "country_code": "FIN",
                "country_name": "Finland"
            }),
        );
        platform.seed(
            "favorites",
            serde_json::json!({
                "id": 2,
                "user_id": "someone-else",
                "country_code": "SWE",
                "country_name": "Sweden"
            }),
        );

        store.fetch_favorites(&platform, "favorites", Some(&me)).await;

        let favorites = store.favorites.snapshot().data.expect("favorites");
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].country_code, "FIN");
    }

    #[tokio::test]
    async fn malformed_favorite_rows_are_a_decode_error() {
        let store = Store::new();
        let platform = FakePlatform::default();
        let me = session();
        platform.seed("favorites", serde_json::json!({ "user_id": me.user_id, "oops": true }));

        store.fetch_favorites(&platform, "favorites", Some(&me)).await;

        let err = store.favorites.snapshot().error.expect("error");
        assert_eq!(err.kind, FailureKind::Decode);
    }
}
