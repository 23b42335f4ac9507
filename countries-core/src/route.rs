use std::fmt;

/// Client-visible locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Countries,
    CountryDetail(String),
    Test,
    Protected,
    Favorites,
    Login,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["countries"] => Route::Countries,
            ["countries", code] => Route::CountryDetail((*code).to_string()),
            ["test"] => Route::Test,
            ["protected"] => Route::Protected,
            ["favorites"] => Route::Favorites,
            ["login"] => Route::Login,
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Protected | Route::Favorites)
    }

    /// Home and `/countries` both show the country list.
    pub fn is_country_list(&self) -> bool {
        matches!(self, Route::Home | Route::Countries)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Countries => f.write_str("/countries"),
            Route::CountryDetail(code) => write!(f, "/countries/{code}"),
            Route::Test => f.write_str("/test"),
            Route::Protected => f.write_str("/protected"),
            Route::Favorites => f.write_str("/favorites"),
            Route::Login => f.write_str("/login"),
            Route::NotFound(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render(Route),
    Redirect(Route),
}

impl GateDecision {
    pub fn route(&self) -> &Route {
        match self {
            GateDecision::Render(r) | GateDecision::Redirect(r) => r,
        }
    }
}

/// Protected routes need a session; signed-in users skip the login page.
pub fn gate(route: Route, signed_in: bool) -> GateDecision {
    match route {
        r if r.requires_session() && !signed_in => GateDecision::Redirect(Route::Login),
        Route::Login if signed_in => GateDecision::Redirect(Route::Home),
        r => GateDecision::Render(r),
    }
}
