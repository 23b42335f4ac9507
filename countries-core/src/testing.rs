//! In-memory providers for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::{
    error::FetchError,
    model::{Country, Record, Weather},
    provider::{CountriesProvider, DataPlatform, WeatherProvider},
    session::Session,
};

pub(crate) fn session() -> Session {
    Session {
        access_token: "token".into(),
        user_id: "user-1".into(),
        email: "ada@example.com".into(),
        expires_at: None,
    }
}

pub(crate) fn weather_in(city: &str) -> Weather {
    Weather {
        location_name: city.to_string(),
        temperature_c: 21.5,
        feels_like_c: 20.0,
        humidity_pct: 40,
        wind_speed_mps: 3.1,
        condition: "clear sky".into(),
        icon: Some("01d".into()),
        observation_time: Utc::now(),
    }
}

/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeCountries {
    countries: Vec<Country>,
    fail_next: Arc<Mutex<Option<String>>>,
    gate: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeCountries {
    pub(crate) fn with(countries: Vec<Country>) -> Self {
        Self {
            countries,
            ..Default::default()
        }
    }

    /// The first call waits until `release` fires; later calls answer at once.
    pub(crate) fn gated(self, release: oneshot::Receiver<()>) -> Self {
        *self.gate.lock().unwrap() = Some(release);
        self
    }

    pub(crate) fn fail_next(&self, msg: &str) {
        *self.fail_next.lock().unwrap() = Some(msg.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T>(&self, value: T) -> Result<T, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.await.ok();
        }
        let failure = self.fail_next.lock().unwrap().take();
        match failure {
            Some(msg) => Err(FetchError::Transport(msg)),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl CountriesProvider for FakeCountries {
    async fn all_countries(&self) -> Result<Vec<Country>, FetchError> {
        self.answer(self.countries.clone()).await
    }

    async fn country_by_code(&self, code: &str) -> Result<Option<Country>, FetchError> {
        let found = self.countries.iter().find(|c| c.cca3.eq_ignore_ascii_case(code)).cloned();
        self.answer(found).await
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeWeather {
    known: Vec<String>,
    fail_next: Arc<Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeWeather {
    pub(crate) fn knowing(cities: &[&str]) -> Self {
        Self {
            known: cities.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn fail_next(&self, msg: &str) {
        *self.fail_next.lock().unwrap() = Some(msg.to_string());
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current_weather(&self, city: &str) -> Result<Weather, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.fail_next.lock().unwrap().take() {
            return Err(FetchError::Transport(msg));
        }
        if self.known.iter().any(|c| c == city) {
            Ok(weather_in(city))
        } else {
            Err(FetchError::NotRecognized {
                what: "Location",
                key: city.to_string(),
            })
        }
    }
}

/// Accepts `ada@example.com` / `secret`; `protected_data` needs a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakePlatform {
    tables: Arc<Mutex<HashMap<String, Vec<Record>>>>,
    next_id: Arc<AtomicUsize>,
    selects: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub(crate) fn seed(&self, table: &str, row: Value) {
        let Value::Object(record) = row else { panic!("rows must be objects") };
        self.tables.lock().unwrap().entry(table.to_string()).or_default().push(record);
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub(crate) fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }
}

fn row_matches(record: &Record, filters: &[(&str, &str)]) -> bool {
    filters.iter().all(|(col, want)| match record.get(*col) {
        Some(Value::String(s)) => s == want,
        Some(other) => other.to_string() == *want,
        None => false,
    })
}

#[async_trait]
impl DataPlatform for FakePlatform {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, FetchError> {
        if email == "ada@example.com" && password == "secret" {
            Ok(session())
        } else {
            Err(FetchError::Unauthorized("Invalid login credentials".into()))
        }
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), FetchError> {
        Ok(())
    }

    async fn select(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        session: Option<&Session>,
    ) -> Result<Vec<Record>, FetchError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        if table == "protected_data" && session.is_none() {
            return Err(FetchError::Unauthorized("JWT required".into()));
        }
        Ok(self.rows(table).into_iter().filter(|r| row_matches(r, filters)).collect())
    }

    async fn insert(
        &self,
        table: &str,
        mut record: Record,
        _session: &Session,
    ) -> Result<Vec<Record>, FetchError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 100;
        record.insert("id".into(), Value::from(id));
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(vec![record])
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        _session: &Session,
    ) -> Result<(), FetchError> {
        if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
            rows.retain(|r| !row_matches(r, filters));
        }
        Ok(())
    }
}
