//! Thin HTTP client for a Sheets-values-style REST API.
//!
//! Three endpoints, bearer-token auth:
//! - `GET  {base}/v4/spreadsheets/{id}/values/{range}`
//! - `PUT  {base}/v4/spreadsheets/{id}/values/{range}?valueInputOption=RAW`
//! - `POST {base}/v4/spreadsheets/{id}/values/{range}:append?valueInputOption=RAW`
//!
//! The base URL is configurable so tests and self-hosted deployments can
//! point at their own endpoint.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value as Cell};

use tandem_core::config::SheetSettings;
use tandem_core::ConfigError;

use crate::error::SheetError;

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Cell>>,
}

pub struct SheetClient {
    agent: ureq::Agent,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

impl SheetClient {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        }
    }

    /// Build a client from config settings, resolving the token. Fails fast
    /// when no credentials can be found.
    pub fn from_settings(settings: &SheetSettings) -> Result<Self, ConfigError> {
        let token = settings.resolve_token()?;
        Ok(Self::new(
            settings.base_url.clone(),
            settings.spreadsheet_id.clone(),
            token,
        ))
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Fetch a range. An entirely empty range comes back as no rows.
    pub fn get_values(&self, range: &str) -> Result<Vec<Vec<Cell>>, SheetError> {
        let response = self
            .agent
            .get(&self.values_url(range))
            .set("Authorization", &self.bearer())
            .call()
            .map_err(Box::new)?;
        let payload: ValuesResponse = response.into_json()?;
        Ok(payload.values)
    }

    /// Overwrite a range with the given rows.
    pub fn update_values(&self, range: &str, rows: Vec<Vec<Cell>>) -> Result<(), SheetError> {
        self.agent
            .put(&self.values_url(range))
            .query("valueInputOption", "RAW")
            .set("Authorization", &self.bearer())
            .send_json(json!({ "range": range, "values": rows }))
            .map_err(Box::new)?;
        Ok(())
    }

    /// Append rows after the last used row of the range's table.
    pub fn append_values(&self, range: &str, rows: Vec<Vec<Cell>>) -> Result<(), SheetError> {
        let url = format!("{}:append", self.values_url(range));
        self.agent
            .post(&url)
            .query("valueInputOption", "RAW")
            .set("Authorization", &self.bearer())
            .send_json(json!({ "values": rows }))
            .map_err(Box::new)?;
        Ok(())
    }
}

impl std::fmt::Debug for SheetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token.
        f.debug_struct("SheetClient")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}
