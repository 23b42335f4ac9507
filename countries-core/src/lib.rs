//! Core library for the `countries` explorer.
//!
//! This crate defines:
//! - Clients for the countries directory, the weather provider and the
//!   hosted auth/data platform
//! - Resource slices tracking loading/error/data for each remote resource
//! - Filtering, pagination and the generic record table
//! - Routes, the session gate and the text views
//!
//! It is used by `countries-cli`, but the [`App`] can drive any front end.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod listing;
pub mod model;
pub mod provider;
pub mod route;
pub mod session;
pub mod slice;
pub mod store;
pub mod table;
pub mod view;

#[cfg(test)]
mod testing;

pub use app::{App, FavoriteChange};
pub use config::Config;
pub use error::{FailureKind, FetchError, SliceError};
pub use model::{Country, Favorite, Record, Weather};
pub use provider::{
    CountriesProvider, DataPlatform, Services, WeatherProvider, services_from_config,
};
pub use route::{GateDecision, Route};
pub use session::{Session, SessionStore};
pub use slice::{ResourceSlice, ResourceState, Settlement};
