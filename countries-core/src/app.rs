//! Navigation-driven orchestration: the gate decides what may be shown,
//! the controller decides what to fetch, the store holds the results.

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::{
    Config,
    controller::{Effect, ViewController},
    error::FetchError,
    listing::Listing,
    model::{Favorite, Record},
    provider::Services,
    route::{GateDecision, Route, gate},
    session::Session,
    slice::Settlement,
    store::{SliceId, Store},
    view,
};

/// Names of the platform tables behind the data views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub test: String,
    pub protected: String,
    pub favorites: String,
}

impl From<&Config> for Tables {
    fn from(config: &Config) -> Self {
        Self {
            test: config.platform.test_table.clone(),
            protected: config.platform.protected_table.clone(),
            favorites: config.platform.favorites_table.clone(),
        }
    }
}

/// Result of adding or removing a favorite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteChange {
    Added(String),
    AlreadyPresent(String),
    Removed(String),
    NotPresent(String),
}

#[derive(Debug)]
pub struct App {
    services: Services,
    store: Store,
    controller: ViewController,
    listing: Listing,
    tables: Tables,
    session: Option<Session>,
    route: Route,
}

impl App {
    pub fn new(services: Services, config: &Config) -> Self {
        Self {
            services,
            store: Store::new(),
            controller: ViewController::new(),
            listing: Listing::new(config.listing.page_size),
            tables: Tables::from(config),
            session: None,
            route: Route::Home,
        }
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    /// Go to `path` and run the fetches the destination needs.
    /// Returns the route actually shown, which differs after a redirect.
    pub async fn navigate(&mut self, path: &str) -> GateDecision {
        let decision = gate(Route::parse(path), self.session.is_some());
        if let GateDecision::Redirect(to) = &decision {
            tracing::info!(from = path, to = %to, "redirected");
        }
        let target = decision.route().clone();

        if target != self.route {
            // Late answers for the view being left must not land in state.
            for id in owned_slices(&self.route) {
                self.store.abandon(*id);
            }
            // Weather belongs to one capital; never show the previous one.
            if matches!(target, Route::CountryDetail(_)) {
                self.store.weather.clear();
            }
        }
        self.route = target;

        if let Some(effect) = self.controller.enter(&self.route) {
            self.run(effect).await;
        }
        decision
    }

    /// Re-run the country list fetch after a failure.
    pub async fn retry(&mut self) {
        if let Some(effect) = self.controller.retry() {
            self.run(effect).await;
        }
    }

    pub fn search(&mut self, query: &str) {
        self.listing.set_query(query);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.listing.set_page(page);
    }

    async fn run(&mut self, effect: Effect) {
        tracing::debug!(?effect, "running effect");
        let services = &self.services;
        let session = self.session.as_ref();

        match effect {
            Effect::FetchAllCountries => {
                self.store.fetch_all_countries(services.countries.as_ref()).await;
            }
            Effect::FetchCountry(code) => {
                let settled =
                    self.store.fetch_country_by_code(services.countries.as_ref(), &code).await;
                let selected = self.store.selected_country.snapshot();
                // A rejected fetch keeps the previous country; its capital is not ours.
                if settled != Settlement::Applied || selected.error.is_some() {
                    return;
                }
                if let Some(Effect::FetchWeather(city)) =
                    self.controller.country_loaded(selected.data.as_ref())
                {
                    self.store.fetch_weather(services.weather.as_ref(), &city).await;
                }
            }
            Effect::FetchWeather(city) => {
                self.store.fetch_weather(services.weather.as_ref(), &city).await;
            }
            Effect::FetchTestData => {
                self.store.fetch_test_data(services.platform.as_ref(), &self.tables.test).await;
            }
            Effect::FetchProtectedData => {
                self.store
                    .fetch_protected_data(
                        services.platform.as_ref(),
                        &self.tables.protected,
                        session,
                    )
                    .await;
            }
            Effect::FetchFavorites => {
                self.store
                    .fetch_favorites(services.platform.as_ref(), &self.tables.favorites, session)
                    .await;
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, FetchError> {
        let session = self.services.platform.sign_in(email, password).await?;
        tracing::info!(email = %session.email, "signed in");
        Ok(&*self.session.insert(session))
    }

    /// Drops the local session even if the platform call fails.
    pub async fn sign_out(&mut self) -> Result<(), FetchError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.store.protected_data.clear();
        self.store.favorites.clear();

        let result = self.services.platform.sign_out(&session).await;
        if self.route.requires_session() {
            self.navigate(&Route::Login.to_string()).await;
        }
        result
    }

    fn require_session(&self) -> Result<&Session, FetchError> {
        self.session
            .as_ref()
            .ok_or_else(|| FetchError::Unauthorized("Sign in first".to_string()))
    }

    /// Insert a row into the protected table, then reload it.
    pub async fn create_protected_entry(&mut self, record: Record) -> Result<(), FetchError> {
        let session = self.require_session()?;
        self.services.platform.insert(&self.tables.protected, record, session).await?;
        self.refresh_protected().await;
        Ok(())
    }

    async fn refresh_protected(&self) {
        self.store
            .fetch_protected_data(
                self.services.platform.as_ref(),
                &self.tables.protected,
                self.session.as_ref(),
            )
            .await;
    }

    async fn refresh_favorites(&self) {
        self.store
            .fetch_favorites(
                self.services.platform.as_ref(),
                &self.tables.favorites,
                self.session.as_ref(),
            )
            .await;
    }

    async fn current_favorites(&self, session: &Session) -> Result<Vec<Favorite>, FetchError> {
        let rows = self
            .services
            .platform
            .select(&self.tables.favorites, &[("user_id", session.user_id.as_str())], Some(session))
            .await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row))
                    .map_err(|source| FetchError::Decode {
                        service: "platform",
                        source,
                    })
            })
            .collect()
    }

    /// Save `code` as a favorite of the signed-in user.
    pub async fn add_favorite(&mut self, code: &str) -> Result<FavoriteChange, FetchError> {
        let session = self.require_session()?;
        let code = code.trim().to_uppercase();

        let existing = self.current_favorites(session).await?;
        if existing.iter().any(|f| f.country_code.eq_ignore_ascii_case(&code)) {
            return Ok(FavoriteChange::AlreadyPresent(code));
        }

        let country = self
            .services
            .countries
            .country_by_code(&code)
            .await?
            .ok_or_else(|| FetchError::NotRecognized {
                what: "Country code",
                key: code.clone(),
            })?;

        let favorite = Favorite {
            id: None,
            user_id: session.user_id.clone(),
            country_code: country.cca3.clone(),
            country_name: country.name.common.clone(),
            created_at: None,
        };
        let record = match serde_json::to_value(&favorite) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Record::new(),
            Err(source) => return Err(FetchError::Decode {
                service: "platform",
                source,
            }),
        };
        self.services.platform.insert(&self.tables.favorites, record, session).await?;
        tracing::info!(code = %country.cca3, "favorite added");

        self.refresh_favorites().await;
        Ok(FavoriteChange::Added(country.name.common))
    }

    pub async fn remove_favorite(&mut self, code: &str) -> Result<FavoriteChange, FetchError> {
        let session = self.require_session()?;
        let code = code.trim().to_uppercase();

        let existing = self.current_favorites(session).await?;
        let found = existing.iter().find(|f| f.country_code.eq_ignore_ascii_case(&code));
        let Some(found) = found else {
            return Ok(FavoriteChange::NotPresent(code));
        };

        self.services
            .platform
            .delete(
                &self.tables.favorites,
                &[
                    ("user_id", session.user_id.as_str()),
                    ("country_code", found.country_code.as_str()),
                ],
                session,
            )
            .await?;
        tracing::info!(code = %found.country_code, "favorite removed");

        let name = found.country_name.clone();
        self.refresh_favorites().await;
        Ok(FavoriteChange::Removed(name))
    }

    pub fn render(&self) -> String {
        self.render_at(Local::now())
    }

    pub fn render_at(&self, now: DateTime<Local>) -> String {
        let body = match &self.route {
            Route::Home | Route::Countries => {
                view::country_list(&self.store.countries.snapshot(), &self.listing)
            }
            Route::CountryDetail(_) => view::country_detail(
                &self.store.selected_country.snapshot(),
                &self.store.weather.snapshot(),
            ),
            Route::Test => view::test_data(&self.store.test_data.snapshot(), now),
            Route::Protected => view::protected_data(&self.store.protected_data.snapshot()),
            Route::Favorites => view::favorites(&self.store.favorites.snapshot()),
            Route::Login => view::login(self.session.as_ref()),
            Route::NotFound(path) => view::not_found(path),
        };
        format!("{}\n\n{}", view::navigation(self.session.as_ref()), body)
    }
}

/// Slices whose in-flight requests belong to the view at `route`.
fn owned_slices(route: &Route) -> &'static [SliceId] {
    match route {
        Route::Home | Route::Countries => &[SliceId::Countries],
        Route::CountryDetail(_) => &[SliceId::SelectedCountry, SliceId::Weather],
        Route::Test => &[SliceId::TestData],
        Route::Protected => &[SliceId::ProtectedData],
        Route::Favorites => &[SliceId::Favorites],
        Route::Login | Route::NotFound(_) => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::tests::{country, numbered};
    use crate::testing::{FakeCountries, FakePlatform, FakeWeather};
    use crate::view::{COUNTRY_NOT_FOUND, NO_PROTECTED_DATA, TRY_AGAIN};
    use serde_json::json;

    struct Harness {
        app: App,
        countries: FakeCountries,
        weather: FakeWeather,
        platform: FakePlatform,
    }

    fn harness(list: Vec<crate::model::Country>, cities: &[&str]) -> Harness {
        let countries = FakeCountries::with(list);
        let weather = FakeWeather::knowing(cities);
        let platform = FakePlatform::default();
        let services = Services {
            countries: Box::new(countries.clone()),
            weather: Box::new(weather.clone()),
            platform: Box::new(platform.clone()),
        };
        let app = App::new(services, &Config::default());
        Harness {
            app,
            countries,
            weather,
            platform,
        }
    }

    fn with_capital(common: &str, cca3: &str, capital: &str) -> crate::model::Country {
        let mut c = country(common, cca3);
        c.capital = vec![capital.to_string()];
        c
    }

    #[tokio::test]
    async fn list_view_renders_first_page_of_250() {
        let mut h = harness(numbered(250), &[]);

        let decision = h.app.navigate("/countries").await;

        assert_eq!(decision, GateDecision::Render(Route::Countries));
        let text = h.app.render();
        assert_eq!(text.matches("See more:").count(), 12);
        assert!(text.contains("Page 1 of 21"));
        assert_eq!(h.countries.calls(), 1);
    }

    #[tokio::test]
    async fn every_entry_into_the_list_refetches() {
        let mut h = harness(numbered(3), &[]);

        h.app.navigate("/").await;
        h.app.navigate("/countries").await;
        h.app.navigate("/countries").await;
        h.app.navigate("/test").await;
        h.app.navigate("/countries").await;

        assert_eq!(h.countries.calls(), 3);
    }

    #[tokio::test]
    async fn retry_after_failure_loads_the_list() {
        let mut h = harness(numbered(3), &[]);
        h.countries.fail_next("connection refused");

        h.app.navigate("/countries").await;
        assert!(h.app.render().contains(TRY_AGAIN));

        h.app.retry().await;
        let text = h.app.render();
        assert!(!text.contains(TRY_AGAIN));
        assert!(text.contains("Country 002"));
    }

    #[tokio::test]
    async fn search_narrows_and_resets_paging() {
        let mut h = harness(numbered(60), &[]);
        h.app.navigate("/countries").await;
        h.app.go_to_page(5);

        h.app.search("country 01");

        assert_eq!(h.app.listing().page(), 1);
        let text = h.app.render();
        assert!(text.contains("Page 1 of 1 (10 countries)"));
    }

    #[tokio::test]
    async fn unknown_code_shows_not_found_notice() {
        let mut h = harness(numbered(3), &[]);

        h.app.navigate("/countries/XXX").await;

        assert!(h.app.render().contains(COUNTRY_NOT_FOUND));
        assert_eq!(h.weather.calls(), 0);
    }

    #[tokio::test]
    async fn detail_loads_capital_weather() {
        let mut h = harness(vec![with_capital("Finland", "FIN", "Helsinki")], &["Helsinki"]);

        h.app.navigate("/countries/FIN").await;

        let text = h.app.render();
        assert!(text.contains("Country code: FIN"));
        assert!(text.contains("Conditions:  clear sky"));
        assert_eq!(h.weather.calls(), 1);
    }

    #[tokio::test]
    async fn unrecognized_capital_still_renders_detail() {
        let mut h = harness(vec![with_capital("Atlantis", "ATL", "Poseidonia")], &["Helsinki"]);

        h.app.navigate("/countries/ATL").await;

        let text = h.app.render();
        assert!(text.contains("Location not recognized: Poseidonia"));
        assert!(text.contains("Country code: ATL"));
        assert!(text.contains("Population:"));
    }

    #[tokio::test]
    async fn failed_detail_fetch_issues_no_weather_request() {
        let mut h = harness(
            vec![
                with_capital("Finland", "FIN", "Helsinki"),
                with_capital("Sweden", "SWE", "Stockholm"),
            ],
            &["Helsinki", "Stockholm"],
        );
        h.app.navigate("/countries/FIN").await;
        assert_eq!(h.weather.calls(), 1);

        h.countries.fail_next("connection refused");
        h.app.navigate("/countries/SWE").await;

        let selected = h.app.store().selected_country.snapshot();
        assert!(selected.error.is_some());
        assert_eq!(h.weather.calls(), 1);
        assert!(h.app.store().weather.snapshot().data.is_none());
        assert!(h.app.render().contains("Error: Failed to load country SWE"));
    }

    #[tokio::test]
    async fn switching_country_drops_previous_weather() {
        let mut h = harness(
            vec![with_capital("Finland", "FIN", "Helsinki"), country("Antarctica", "ATA")],
            &["Helsinki"],
        );

        h.app.navigate("/countries/FIN").await;
        assert!(h.app.store().weather.snapshot().data.is_some());

        h.app.navigate("/countries/ATA").await;
        assert!(h.app.store().weather.snapshot().data.is_none());
        assert!(h.app.render().contains(view::NO_WEATHER_INFO));
    }

    #[tokio::test]
    async fn protected_routes_redirect_to_login() {
        let mut h = harness(Vec::new(), &[]);

        let decision = h.app.navigate("/favorites").await;

        assert_eq!(decision, GateDecision::Redirect(Route::Login));
        assert_eq!(h.app.route(), &Route::Login);
        assert_eq!(h.platform.selects(), 0);
    }

    #[tokio::test]
    async fn login_page_sends_signed_in_user_home() {
        let mut h = harness(numbered(2), &[]);
        h.app.sign_in("ada@example.com", "secret").await.expect("sign in");

        let decision = h.app.navigate("/login").await;
        assert_eq!(decision, GateDecision::Redirect(Route::Home));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let mut h = harness(Vec::new(), &[]);
        let err = h.app.sign_in("ada@example.com", "nope").await.unwrap_err();

        assert!(matches!(err, FetchError::Unauthorized(_)));
        assert!(h.app.session().is_none());
    }

    #[tokio::test]
    async fn protected_entries_are_created_then_listed() {
        let mut h = harness(Vec::new(), &[]);
        h.app.sign_in("ada@example.com", "secret").await.expect("sign in");
        h.app.navigate("/protected").await;
        assert!(h.app.render().contains(NO_PROTECTED_DATA));

        let Value::Object(record) = json!({ "title": "first note" }) else { unreachable!() };
        h.app.create_protected_entry(record).await.expect("insert");

        let text = h.app.render();
        assert!(text.contains("first note"));
        assert_eq!(h.platform.rows("protected_data").len(), 1);
    }

    #[tokio::test]
    async fn favorites_add_is_idempotent_and_removable() {
        let mut h = harness(vec![with_capital("Finland", "FIN", "Helsinki")], &[]);
        h.app.sign_in("ada@example.com", "secret").await.expect("sign in");
        h.app.navigate("/favorites").await;

        let added = h.app.add_favorite("fin").await.expect("add");
        assert_eq!(added, FavoriteChange::Added("Finland".into()));
        assert!(h.app.render().contains("Finland [FIN]"));

        let again = h.app.add_favorite("FIN").await.expect("add again");
        assert_eq!(again, FavoriteChange::AlreadyPresent("FIN".into()));
        assert_eq!(h.platform.rows("favorites").len(), 1);

        let removed = h.app.remove_favorite("FIN").await.expect("remove");
        assert_eq!(removed, FavoriteChange::Removed("Finland".into()));
        assert!(h.platform.rows("favorites").is_empty());

        let missing = h.app.remove_favorite("FIN").await.expect("remove again");
        assert_eq!(missing, FavoriteChange::NotPresent("FIN".into()));
    }

    #[tokio::test]
    async fn favorite_for_unknown_code_is_rejected() {
        let mut h = harness(numbered(2), &[]);
        h.app.sign_in("ada@example.com", "secret").await.expect("sign in");

        let err = h.app.add_favorite("XXX").await.unwrap_err();
        assert_eq!(err.to_string(), "Country code not recognized: XXX");
    }

    #[tokio::test]
    async fn favorites_need_a_session() {
        let mut h = harness(numbered(2), &[]);
        let err = h.app.add_favorite("C01").await.unwrap_err();
        assert!(matches!(err, FetchError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sign_out_leaves_protected_view() {
        let mut h = harness(Vec::new(), &[]);
        h.app.sign_in("ada@example.com", "secret").await.expect("sign in");
        h.app.navigate("/favorites").await;

        h.app.sign_out().await.expect("sign out");

        assert!(h.app.session().is_none());
        assert_eq!(h.app.route(), &Route::Login);
        assert!(h.app.render().contains("Login"));
    }

    #[tokio::test]
    async fn test_view_shows_public_rows() {
        let mut h = harness(Vec::new(), &[]);
        h.platform.seed("test_data", json!({ "id": 1, "name": "John Doe" }));

        h.app.navigate("/test").await;

        let text = h.app.render();
        assert!(text.contains("Status: Connected"));
        assert!(text.contains("John Doe"));
    }

    #[tokio::test]
    async fn unknown_path_renders_not_found() {
        let mut h = harness(Vec::new(), &[]);
        h.app.navigate("/nowhere").await;
        assert!(h.app.render().contains("Nothing here: /nowhere"));
    }
}
