use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{error::FetchError, model::Country};

use super::{CountriesProvider, read_success_body, status_error, trim_base};

const SERVICE: &str = "restcountries";

/// `/all` requires an explicit field list.
const LIST_FIELDS: &str =
    "name,cca3,capital,region,subregion,population,flags,languages,currencies";

#[derive(Debug, Clone)]
pub struct RestCountriesProvider {
    base_url: String,
    http: Client,
}

impl RestCountriesProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: Client::new(),
        }
    }
}

/// `/alpha/{code}` answers with an array, or with a bare object when a
/// field filter is applied.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Country>),
    One(Box<Country>),
}

pub(crate) fn parse_countries(body: &str) -> Result<Vec<Country>, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        service: SERVICE,
        source,
    })
}

pub(crate) fn parse_single(body: &str) -> Result<Option<Country>, FetchError> {
    let parsed: OneOrMany = serde_json::from_str(body)
        .map_err(|source| FetchError::Decode {
            service: SERVICE,
            source,
        })?;

    Ok(match parsed {
        OneOrMany::Many(list) => list.into_iter().next(),
        OneOrMany::One(country) => Some(*country),
    })
}

/// Alpha codes are short and alphanumeric; anything else can't match.
fn is_plausible_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 3 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

#[async_trait]
impl CountriesProvider for RestCountriesProvider {
    async fn all_countries(&self) -> Result<Vec<Country>, FetchError> {
        let url = format!("{}/all", trim_base(&self.base_url));
        tracing::debug!(%url, "fetching all countries");

        let res = self.http.get(&url).query(&[("fields", LIST_FIELDS)]).send().await?;
        let body = read_success_body(res, SERVICE).await?;

        parse_countries(&body)
    }

    async fn country_by_code(&self, code: &str) -> Result<Option<Country>, FetchError> {
        let code = code.trim();
        if !is_plausible_code(code) {
            tracing::debug!(code, "skipping lookup for malformed country code");
            return Ok(None);
        }

        let url = format!("{}/alpha/{}", trim_base(&self.base_url), code);
        tracing::debug!(%url, "fetching country");

        let res = self.http.get(&url).send().await?;
        let status = res.status();

        // Unknown codes come back as 404, malformed ones as 400.
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            let body = res.text().await?;
            return Err(status_error(SERVICE, status, &body));
        }

        let body = res.text().await?;
        parse_single(&body)
    }
}
