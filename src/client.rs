//! This module provides a client to connect to a planner server over its JSON HTTP API
//!
//! The session is an opaque cookie: the server sets it on login/signup, and the underlying
//! cookie store re-sends it on every call. This crate never looks inside it.

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::record::DayRecord;
use crate::traits::{Credentials, PlannerSource, UserId};

/// A planner source that fetches its data from a remote server
pub struct RemoteServer {
    base_url: Url,
    http: reqwest::Client,
}

impl RemoteServer {
    /// Create a client. This does not start a connection nor a session
    pub fn new<S: AsRef<str>>(base_url: S) -> Result<Self, SourceError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|err| SourceError::Transport(format!("Invalid server URL: {}", err)))?;

        // A single reqwest client for the whole life of this source: the cookie store
        // it owns is what carries the session across calls
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(crate::config::user_agent())
            .build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|err| SourceError::Transport(format!("Invalid API path {:?}: {}", path, err)))
    }

    fn day_url(&self, date: NaiveDate) -> Result<Url, SourceError> {
        // NaiveDate displays as ISO `YYYY-MM-DD`, which is exactly the path segment the API wants
        self.api_url(&format!("api/day/{}", date))
    }

    /// Interpret an authentication reply (signup or login).
    ///
    /// Servers are inconsistent here: some report failures with a 4xx status, some with a
    /// 200 whose body carries an `error` key. Both mean the same thing for the caller.
    async fn auth_reply(response: reqwest::Response) -> Result<Value, SourceError> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        let error_message = body
            .get("error")
            .and_then(|e| e.as_str())
            .map(|e| e.to_string());

        if status.is_success() && error_message.is_none() {
            return Ok(body);
        }

        if status.is_client_error() || error_message.is_some() {
            let message = error_message.unwrap_or_else(|| format!("Rejected with HTTP status {}", status));
            Err(SourceError::Auth(message))
        } else {
            Err(SourceError::Transport(format!("Unexpected HTTP status code {}", status)))
        }
    }
}

#[async_trait]
impl PlannerSource for RemoteServer {
    async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, SourceError> {
        let response = self
            .http
            .post(self.api_url("api/signup")?)
            .json(credentials)
            .send()
            .await?;

        let body = Self::auth_reply(response).await?;
        // Some server variants reply {"user_id": N}, others {"id": N}
        let id = body
            .get("user_id")
            .or_else(|| body.get("id"))
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SourceError::Transport(format!("No user id in signup reply: {}", body)))?;

        log::info!("Signed up as user {}", id);
        Ok(UserId(id))
    }

    async fn log_in(&self, credentials: &Credentials) -> Result<(), SourceError> {
        let response = self
            .http
            .post(self.api_url("api/login")?)
            .json(credentials)
            .send()
            .await?;

        Self::auth_reply(response).await?;
        log::info!("Logged in as {}", credentials.email);
        Ok(())
    }

    async fn log_out(&self) -> Result<(), SourceError> {
        let response = self.http.post(self.api_url("api/logout")?).send().await?;

        if response.status().is_success() == false {
            return Err(SourceError::Transport(format!(
                "Unexpected HTTP status code {} on logout",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, SourceError> {
        let response = self.http.get(self.day_url(date)?).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(SourceError::Unauthorized),
            // A never-saved day is a valid, empty day
            StatusCode::NOT_FOUND => return Ok(None),
            status if status.is_success() == false => {
                return Err(SourceError::Transport(format!("Unexpected HTTP status code {}", status)));
            }
            _ => {}
        }

        let body: Value = response.json().await?;
        // Legacy servers report an expired session with a 200 and an "error" body
        if body.get("error").is_some() {
            return Err(SourceError::Unauthorized);
        }

        let mut record: DayRecord = serde_json::from_value(body)
            .map_err(|err| SourceError::Transport(format!("Malformed day record: {}", err)))?;
        if record.date != date {
            log::warn!("Server returned day {} when asked for {}", record.date, date);
            record.date = date;
        }
        Ok(Some(record))
    }

    async fn save_day(&self, date: NaiveDate, record: &DayRecord) -> Result<(), SourceError> {
        // The date in the path is authoritative, keep the body consistent with it
        let mut payload = record.clone();
        payload.date = date;

        let response = self
            .http
            .post(self.day_url(date)?)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(SourceError::Unauthorized),
            status if status.is_success() == false => {
                return Err(SourceError::Transport(format!("Unexpected HTTP status code {}", status)));
            }
            _ => {}
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
            return Err(SourceError::Transport(format!("Server refused the save: {}", error)));
        }

        log::debug!("Saved day {}", date);
        Ok(())
    }
}
