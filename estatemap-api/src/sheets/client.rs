//! Google Sheets v4 REST client (read-only).

use estatemap_core::{ConfigError, FetchError, RawRow};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::info;

use super::auth::TokenSource;
use crate::config::SheetsConfig;

/// Authenticated client for one spreadsheet. Expensive to build; build once.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl SheetsClient {
    /// Load credentials and construct the HTTP client.
    pub async fn new(config: &SheetsConfig) -> Result<Self, ConfigError> {
        let key = config.credentials.load().await?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::invalid("http_client", "reqwest", e.to_string()))?;
        let tokens = TokenSource::new(http.clone(), &key)?;

        info!(
            client_email = %key.client_email,
            credentials = config.credentials.describe(),
            spreadsheet_id = %config.spreadsheet_id,
            "sheets client initialized"
        );

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            tokens,
        })
    }

    pub fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}?valueRenderOption=UNFORMATTED_VALUE",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    /// All rows of `range`, cells rendered to strings.
    pub async fn values(&self, range: &str) -> Result<Vec<RawRow>, FetchError> {
        let body = self.get_json(&self.values_url(range)).await?;
        parse_values(&body)
    }

    /// Spreadsheet title; a cheap authenticated round trip.
    pub async fn spreadsheet_title(&self) -> Result<String, FetchError> {
        let url = format!(
            "{}/v4/spreadsheets/{}?fields=properties.title",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        );
        let body = self.get_json(&url).await?;
        body.pointer("/properties/title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::upstream_format("spreadsheet metadata has no title"))
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| FetchError::unavailable(format!("sheets request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::upstream_format(format!("response is not JSON: {}", e)))
    }
}

/// 400 means the request itself (usually the range) was wrong; everything
/// else is treated as the source being unavailable.
pub fn status_error(status: StatusCode, body: &str) -> FetchError {
    let detail: String = body.chars().take(200).collect();
    if status == StatusCode::BAD_REQUEST {
        FetchError::upstream_format(format!("sheets rejected request ({}): {}", status, detail))
    } else {
        FetchError::unavailable(format!("sheets returned {}: {}", status, detail))
    }
}

/// Extract rows from a `values.get` response body.
///
/// A missing `values` member is an empty range, not an error.
pub fn parse_values(body: &Value) -> Result<Vec<RawRow>, FetchError> {
    let object = body
        .as_object()
        .ok_or_else(|| FetchError::upstream_format("response body is not an object"))?;

    let rows = match object.get("values") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(FetchError::upstream_format("values is not an array")),
    };

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(cells) => Ok(cells.iter().map(cell_to_string).collect::<RawRow>()),
            _ => Err(FetchError::upstream_format(format!(
                "row {} is not an array",
                index
            ))),
        })
        .collect()
}

/// Render one unformatted cell. Integral numbers drop the fractional part.
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}
