use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::{error::FetchError, model::Record, session::Session};

use super::{DataPlatform, read_success_body, status_error, trim_base};

const SERVICE: &str = "platform";

/// Supabase-style project: GoTrue for auth, PostgREST for tables.
#[derive(Debug, Clone)]
pub struct SupabasePlatform {
    url: String,
    anon_key: String,
    http: Client,
}

impl SupabasePlatform {
    pub fn new(url: String, anon_key: String) -> Self {
        Self {
            url,
            anon_key,
            http: Client::new(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", trim_base(&self.url), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", trim_base(&self.url), table)
    }

    /// Every request carries the project key; the bearer is the user's token
    /// when signed in, the anonymous key otherwise.
    fn authorize(&self, req: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let bearer = session.map_or(self.anon_key.as_str(), |s| s.access_token.as_str());
        req.header("apikey", &self.anon_key).bearer_auth(bearer)
    }
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

pub(crate) fn parse_token(body: &str, email: &str) -> Result<Session, FetchError> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|source| FetchError::Decode {
            service: SERVICE,
            source,
        })?;

    Ok(Session {
        access_token: parsed.access_token,
        user_id: parsed.user.id,
        email: parsed.user.email.unwrap_or_else(|| email.to_string()),
        expires_at: parsed.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
    })
}

/// Wrong credentials come back as 400 with a description.
pub(crate) fn sign_in_error(status: StatusCode, body: &str) -> FetchError {
    if status == StatusCode::BAD_REQUEST {
        let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
        let reason = parsed
            .error_description
            .or(parsed.msg)
            .unwrap_or_else(|| "Invalid login credentials".to_string());
        return FetchError::Unauthorized(reason);
    }
    status_error(SERVICE, status, body)
}

pub(crate) fn parse_rows(body: &str) -> Result<Vec<Record>, FetchError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        service: SERVICE,
        source,
    })
}

fn eq_filters(filters: &[(&str, &str)]) -> Vec<(String, String)> {
    filters.iter().map(|(col, val)| ((*col).to_string(), format!("eq.{val}"))).collect()
}

#[async_trait]
impl DataPlatform for SupabasePlatform {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, FetchError> {
        tracing::info!(email, "signing in");

        let res = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(sign_in_error(status, &body));
        }

        parse_token(&body, email)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), FetchError> {
        tracing::info!(email = %session.email, "signing out");

        let req = self.http.post(self.auth_url("logout"));
        let res = self.authorize(req, Some(session)).send().await?;
        // An already revoked token is as good as signed out.
        if res.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        read_success_body(res, SERVICE).await.map(|_| ())
    }

    async fn select(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        session: Option<&Session>,
    ) -> Result<Vec<Record>, FetchError> {
        tracing::debug!(table, signed_in = session.is_some(), "selecting rows");

        let req = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", "*")])
            .query(&eq_filters(filters));
        let res = self.authorize(req, session).send().await?;
        let body = read_success_body(res, SERVICE).await?;

        parse_rows(&body)
    }

    async fn insert(
        &self,
        table: &str,
        record: Record,
        session: &Session,
    ) -> Result<Vec<Record>, FetchError> {
        tracing::debug!(table, "inserting row");

        let req = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&[record]);
        let res = self.authorize(req, Some(session)).send().await?;
        let body = read_success_body(res, SERVICE).await?;

        parse_rows(&body)
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        session: &Session,
    ) -> Result<(), FetchError> {
        if filters.is_empty() {
            return Err(FetchError::Config(format!(
                "Refusing to delete from `{table}` without a filter"
            )));
        }
        tracing::debug!(table, "deleting rows");

        let req = self.http.delete(self.rest_url(table)).query(&eq_filters(filters));
        let res = self.authorize(req, Some(session)).send().await?;
        read_success_body(res, SERVICE).await.map(|_| ())
    }
}

/// Stand-in used until a platform URL and key are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPlatform;

impl UnconfiguredPlatform {
    fn error() -> FetchError {
        FetchError::Config(
            "No data platform configured.\n\
             Hint: run `countries configure` or set SUPABASE_URL and SUPABASE_ANON_KEY."
                .to_string(),
        )
    }
}

#[async_trait]
impl DataPlatform for UnconfiguredPlatform {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session, FetchError> {
        Err(Self::error())
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), FetchError> {
        Err(Self::error())
    }

    async fn select(
        &self,
        _table: &str,
        _filters: &[(&str, &str)],
        _session: Option<&Session>,
    ) -> Result<Vec<Record>, FetchError> {
        Err(Self::error())
    }

    async fn insert(
        &self,
        _table: &str,
        _record: Record,
        _session: &Session,
    ) -> Result<Vec<Record>, FetchError> {
        Err(Self::error())
    }

    async fn delete(
        &self,
        _table: &str,
        _filters: &[(&str, &str)],
        _session: &Session,
    ) -> Result<(), FetchError> {
        Err(Self::error())
    }
}
