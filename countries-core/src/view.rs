//! Text rendering of each screen from slice snapshots.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::{
    listing::Listing,
    model::{Country, Favorite, Record, Weather},
    session::Session,
    slice::ResourceState,
    table,
};

pub const NO_COUNTRY_FOUND: &str = "No Country found";
pub const COUNTRY_NOT_FOUND: &str = "Country not found";
pub const NO_WEATHER_INFO: &str = "No weather information available";
pub const NO_PROTECTED_DATA: &str = "No protected data available, please create some.";
pub const TRY_AGAIN: &str = "[Try Again]";

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn navigation(session: Option<&Session>) -> String {
    let mut items = vec![
        "Home".to_string(),
        "Test".to_string(),
        "Countries".to_string(),
        "Protected Data".to_string(),
    ];
    match session {
        Some(s) => {
            items.push("Favorites".to_string());
            items.push(format!("Logout ({})", s.email));
        }
        None => items.push("Login".to_string()),
    }
    items.join(" | ")
}

pub fn country_card(country: &Country) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", country.name.common, country.cca3);
    let _ = writeln!(out, "  Population: {}", country.population);
    let _ = writeln!(out, "  Capital:    {}", country.capital.join(", "));
    let _ = writeln!(out, "  Language:   {}", country.first_language().unwrap_or(""));
    let _ = writeln!(out, "  Region:     {}", country.region);
    let _ = writeln!(out, "  See more:   /countries/{}", country.cca3);
    out
}

pub fn country_list(state: &ResourceState<Vec<Country>>, listing: &Listing) -> String {
    if state.loading {
        return "Loading countries...\n".to_string();
    }
    if let Some(err) = &state.error {
        return format!("Error: {err}\n{TRY_AGAIN}\n");
    }

    let countries = state.data.as_deref().unwrap_or_default();
    let page = listing.visible(countries);

    let mut out = String::new();
    if !listing.query().trim().is_empty() {
        let _ = writeln!(out, "Search: {}", listing.query());
    }
    if page.is_empty() {
        let _ = writeln!(out, "{NO_COUNTRY_FOUND}");
    }
    for country in &page.items {
        out.push_str(&country_card(country));
        out.push('\n');
    }
    if page.pages > 0 {
        let _ = writeln!(out, "Page {} of {} ({} countries)", page.page, page.pages, page.matches);
    }
    out
}

pub fn weather_panel(state: &ResourceState<Weather>) -> String {
    if state.loading {
        return "Loading weather...\n".to_string();
    }
    if let Some(err) = &state.error {
        return format!("Weather: {err}\n");
    }
    let Some(w) = &state.data else {
        return format!("{NO_WEATHER_INFO}\n");
    };

    let mut out = String::new();
    let _ = writeln!(out, "Feels like:  {}°C", w.feels_like_c);
    let _ = writeln!(out, "Humidity:    {}%", w.humidity_pct);
    let _ = writeln!(out, "Temperature: {}°C", w.temperature_c);
    let _ = writeln!(out, "Wind:        {} m/s", w.wind_speed_mps);
    let _ = writeln!(out, "Conditions:  {}", w.condition);
    out
}

pub fn country_detail(
    selected: &ResourceState<Country>,
    weather: &ResourceState<Weather>,
) -> String {
    if selected.loading {
        return "Loading...\n".to_string();
    }
    if let Some(err) = &selected.error {
        return format!("Error: {err}\n");
    }
    let Some(country) = &selected.data else {
        return format!("{COUNTRY_NOT_FOUND}\n");
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", country.name.common);
    let _ = writeln!(out, "{}", "=".repeat(country.name.common.chars().count()));
    if !country.flags.png.is_empty() {
        let _ = writeln!(out, "Flag: {}", country.flags.png);
    }
    out.push('\n');

    if country.primary_capital().is_some() {
        out.push_str(&weather_panel(weather));
    } else {
        let _ = writeln!(out, "{NO_WEATHER_INFO}");
    }
    out.push('\n');

    let capitals = if country.capital.is_empty() {
        "N/A".to_string()
    } else {
        country.capital.join(", ")
    };
    let population = if country.population > 0 {
        group_thousands(country.population)
    } else {
        "N/A".to_string()
    };

    let _ = writeln!(out, "Name:         {}", country.name.official);
    let _ = writeln!(out, "Country code: {}", country.cca3);
    let _ = writeln!(out, "Capital:      {capitals}");
    let _ = writeln!(out, "Region:       {}", country.region);
    let _ = writeln!(out, "Sub Region:   {}", country.subregion.as_deref().unwrap_or(""));
    let _ = writeln!(out, "Population:   {population}");
    if !country.languages.is_empty() {
        let langs: Vec<&str> = country.languages.values().map(String::as_str).collect();
        let _ = writeln!(out, "Languages:    {}", langs.join(", "));
    }
    if !country.currencies.is_empty() {
        let currencies: Vec<String> = country
            .currencies
            .values()
            .map(|c| format!("{} ({})", c.name, c.symbol.as_deref().unwrap_or("")))
            .collect();
        let _ = writeln!(out, "Currencies:   {}", currencies.join(", "));
    }
    out
}

pub fn test_data(state: &ResourceState<Vec<Record>>, now: DateTime<Local>) -> String {
    if state.loading {
        return "Loading...\n".to_string();
    }
    if let Some(err) = &state.error {
        return format!("Error: {err}\n");
    }

    let mut out = String::from("Test Data\n");
    let _ = writeln!(out, "Status: Connected | Last Updated: {}", now.format("%Y-%m-%d %H:%M:%S"));
    if let Some(rows) = &state.data {
        out.push_str(&table::render(rows));
    }
    out
}

pub fn protected_data(state: &ResourceState<Vec<Record>>) -> String {
    if state.loading {
        return "Loading...\n".to_string();
    }
    if let Some(err) = &state.error {
        return format!("Error: {err}\n");
    }

    let mut out =
        String::from("Protected Test Data - This data is only accessible to Authenticated Users\n");
    match state.data.as_deref() {
        Some(rows) if !rows.is_empty() => out.push_str(&table::render(rows)),
        _ => {
            let _ = writeln!(out, "{NO_PROTECTED_DATA}");
        }
    }
    out
}

pub fn favorites(state: &ResourceState<Vec<Favorite>>) -> String {
    if state.loading {
        return "Loading favorites...\n".to_string();
    }
    if let Some(err) = &state.error {
        return format!("Error: {err}\n");
    }

    let favorites = state.data.as_deref().unwrap_or_default();
    if favorites.is_empty() {
        return "No favorites yet.\n".to_string();
    }

    let mut out = String::from("Favorites\n");
    for fav in favorites {
        let code = &fav.country_code;
        let _ = writeln!(out, "  {} [{code}]  /countries/{code}", fav.country_name);
    }
    out
}

pub fn login(session: Option<&Session>) -> String {
    match session {
        Some(s) => format!("Signed in as {}\n", s.email),
        None => "Sign in with your email and password.\n".to_string(),
    }
}

pub fn not_found(path: &str) -> String {
    format!("Nothing here: {path}\n")
}
