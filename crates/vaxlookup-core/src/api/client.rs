//! Client for a PostgREST (Supabase-style) vaccine database.
//!
//! Implements [`DataSource`] with plain `GET`/`HEAD` requests against
//! `/rest/v1/<table>`, embedding child tables through PostgREST's resource
//! embedding and reading exact counts from `Content-Range`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::try_join;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::SourceError;
use crate::models::{RecentVaccine, VaccineCounts, VaccineDetails, VaccineSummary};
use crate::source::DataSource;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix of the PostgREST API under the project URL.
const REST_PATH: &str = "rest/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Columns of the list projection. Leaves out URLs and timestamps to keep the
/// payload small.
const SUMMARY_COLUMNS: &str =
    "id,name,manufacturer,fda_approved_date,childhood_schedule_date,description";

/// Full vaccine row with both child tables embedded under their JSON names.
const DETAIL_COLUMNS: &str =
    "*,clinicalTrials:clinical_trials(*),adverseEffects:adverse_effects(*)";

/// API client for the vaccine database.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Create a client for the project at `base_url`. When `api_key` is set
    /// it is sent both as `apikey` and as a bearer token on every request.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = api_key {
            headers.insert(
                "apikey",
                header::HeaderValue::from_str(key).context("API key is not a valid header")?,
            );
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", key))
                    .context("API key is not a valid header")?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{}/{}", self.base_url, REST_PATH, table)
        } else {
            format!("{}/{}/{}?{}", self.base_url, REST_PATH, table, query)
        }
    }

    /// Send a request, retrying 429 responses with exponential backoff.
    /// Any other non-success status becomes a `SourceError`.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response, SourceError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;
            let status = response.status();

            if status.is_success() {
                debug!(url = url, status = status.as_u16(), "Request succeeded");
                return Ok(response);
            }

            if status.as_u16() != 429 {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::from_status(status, &body));
            }

            // Rate limited
            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(SourceError::RateLimited);
            }
            warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self.send(url, || self.client.get(url)).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    /// Exact row count of `table`, read from the `Content-Range` header of a
    /// `HEAD` request.
    async fn count(&self, table: &str) -> Result<u64, SourceError> {
        let url = self.table_url(table, "select=*");
        let response = self
            .send(&url, || {
                self.client
                    .head(&url)
                    .header("Prefer", "count=exact")
                    .header(header::RANGE, "0-0")
            })
            .await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                SourceError::InvalidResponse(format!("No Content-Range in count of {}", table))
            })?;

        parse_content_range_total(range).ok_or_else(|| {
            SourceError::InvalidResponse(format!(
                "Unparseable Content-Range for {}: {}",
                table, range
            ))
        })
    }
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
/// Returns `None` when the total is unknown (`*`) or malformed.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl DataSource for RestClient {
    async fn fetch_summaries(&self) -> Result<Vec<VaccineSummary>, SourceError> {
        let url = self.table_url("vaccines", &format!("select={}&order=name", SUMMARY_COLUMNS));
        self.get(&url).await
    }

    async fn fetch_details(&self, id: i64) -> Result<Option<VaccineDetails>, SourceError> {
        let url = self.table_url(
            "vaccines",
            &format!("select={}&id=eq.{}", DETAIL_COLUMNS, id),
        );
        let rows: Vec<VaccineDetails> = self.get(&url).await?;
        if rows.len() > 1 {
            warn!(id, rows = rows.len(), "Multiple vaccines share one id, using the first");
        }
        Ok(rows.into_iter().next())
    }

    async fn fetch_counts(&self) -> Result<VaccineCounts, SourceError> {
        let (vaccines, clinical_trials, adverse_effects) = try_join!(
            self.count("vaccines"),
            self.count("clinical_trials"),
            self.count("adverse_effects"),
        )?;
        Ok(VaccineCounts {
            vaccines,
            clinical_trials,
            adverse_effects,
        })
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RecentVaccine>, SourceError> {
        let url = self.table_url(
            "vaccines",
            &format!("select=name,created_at&order=created_at.desc&limit={}", limit),
        );
        self.get(&url).await
    }
}
