// Booking site client
// Catalog listing, shelter detail pages and the booked-dates feed behind one async trait

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::catalog::CatalogRow;
use crate::place_id::PlaceId;

pub const DEFAULT_BASE_URL: &str = "https://book.naturstyrelsen.dk";
const PLACES_PATH: &str = "/includes/branding_files/shelterbooking/includes/inc_ajaxbookingplaces.asp";
const BOOKINGS_PATH: &str =
    "/includes/branding_files/shelterbooking/includes/inc_ajaxgetbookingsforsingleplace.asp";
const SEARCH_PAGE_PATH: &str = "/soeg/?s1=3012";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Client error: {0}")]
    ClientError(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ApiError::NetworkError(e.to_string())
        }
    }
}

// Fixed delays between successive remote calls; never adaptive, never retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    pub catalog_page_ms: u64,
    pub detail_page_ms: u64,
    pub availability_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            catalog_page_ms: 150,
            detail_page_ms: 50,
            availability_ms: 250,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            catalog_page_ms: 0,
            detail_page_ms: 0,
            availability_ms: 0,
        }
    }
}

pub async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub api_timeout_ms: u64,
    pub page_timeout_ms: u64,
    pub page_size: u32,
    pub max_pages: u32,
    pub warm_up_session: bool,
    pub pacing: Pacing,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            accept_language: "da-DK,da;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            api_timeout_ms: 30_000,
            page_timeout_ms: 15_000,
            page_size: 200,
            max_pages: 500,
            warm_up_session: true,
            pacing: Pacing::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    // Canonical URL of a shelter detail page
    pub fn place_url(&self, uri: &str) -> String {
        format!("{}/sted/{}/", self.base_url(), uri)
    }
}

// Remote collaborators of a search run. Calls are awaited one at a time by the caller.
#[async_trait]
pub trait ShelterApi: Send + Sync {
    // One page of the catalog listing (1-based). An empty or short page ends paging.
    async fn fetch_catalog_page(&self, page: u32, page_size: u32) -> Result<Vec<CatalogRow>, ApiError>;

    // Raw HTML of a shelter detail page
    async fn fetch_detail_page(&self, url: &str) -> Result<String, ApiError>;

    // ISO dates already booked for a place, as seen from `anchor`
    async fn fetch_booked_dates(
        &self,
        place_id: PlaceId,
        anchor: NaiveDate,
    ) -> Result<HashSet<String>, ApiError>;
}

#[derive(Debug, Deserialize)]
struct PlacesPage {
    #[serde(rename = "BookingPlacesList", default)]
    rows: Option<Vec<Value>>,
}

// Rows are decoded one by one so a malformed row cannot sink its page. It is kept as an
// empty row to preserve the page length that paging relies on.
fn catalog_rows(values: Vec<Value>) -> Vec<CatalogRow> {
    values
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                debug!("Ignoring malformed catalog row: {}", e);
                CatalogRow::default()
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct BookingsPage {
    #[serde(rename = "BookingDates", default)]
    dates: Option<Vec<Value>>,
}

// Booked dates arrive as strings, occasionally as numbers; empty entries are dropped
fn booked_date_set(values: Vec<Value>) -> HashSet<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

// `/sted/` pages need the trailing slash, the site answers 404 without it
pub fn normalize_place_url(base_url: &str, url: &str) -> String {
    let sted_prefix = format!("{}/sted/", base_url.trim_end_matches('/'));
    if url.starts_with(&sted_prefix) && !url.ends_with('/') {
        format!("{url}/")
    } else {
        url.to_string()
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::ApiResponseError {
            status_code: status.as_u16(),
            message: format!(
                "{} for {}",
                status.canonical_reason().unwrap_or("Unexpected status"),
                response.url()
            ),
        })
    }
}

pub struct BookingSiteClient {
    client: Client,
    config: ClientConfig,
}

impl BookingSiteClient {
    // Browser-like session with a cookie jar; warm-up failures are ignored
    pub async fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let referer = format!("{}{}", config.base_url(), SEARCH_PAGE_PATH);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.1"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| ApiError::ClientError(e.to_string()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&referer).map_err(|e| ApiError::ClientError(e.to_string()))?,
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .build()
            .map_err(|e| ApiError::ClientError(e.to_string()))?;

        let api = Self { client, config };
        if api.config.warm_up_session {
            api.warm_up().await;
        }
        Ok(api)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn warm_up(&self) {
        let urls = [
            format!("{}/", self.config.base_url()),
            format!("{}{}", self.config.base_url(), SEARCH_PAGE_PATH),
        ];
        for url in urls {
            if let Err(e) = self
                .client
                .get(&url)
                .timeout(Duration::from_millis(self.config.page_timeout_ms))
                .send()
                .await
            {
                debug!("Session warm-up request to {} failed: {}", url, e);
            }
        }
    }

    // The ASP endpoints sometimes label JSON as text/html, so decode from the body text
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;
        let body = check_status(response)?.text().await?;
        serde_json::from_str(body.trim())
            .map_err(|e| ApiError::DecodeError(format!("{url}: {e}")))
    }
}

#[async_trait]
impl ShelterApi for BookingSiteClient {
    async fn fetch_catalog_page(&self, page: u32, page_size: u32) -> Result<Vec<CatalogRow>, ApiError> {
        let query = [
            ("pid", "0".to_string()),
            ("p", page.to_string()),
            ("r", "50000".to_string()),
            ("ps", page_size.to_string()),
            ("t", "1".to_string()),
        ];
        let page: PlacesPage = self.get_json(PLACES_PATH, &query).await?;
        Ok(catalog_rows(page.rows.unwrap_or_default()))
    }

    async fn fetch_detail_page(&self, url: &str) -> Result<String, ApiError> {
        let url = normalize_place_url(self.config.base_url(), url);
        let timeout = Duration::from_millis(self.config.page_timeout_ms);

        let mut response = self.client.get(&url).timeout(timeout).send().await?;
        if response.status() == StatusCode::NOT_FOUND && !url.ends_with('/') {
            debug!("404 for {}, retrying with trailing slash", url);
            response = self
                .client
                .get(format!("{url}/"))
                .timeout(timeout)
                .send()
                .await?;
        }

        Ok(check_status(response)?.text().await?)
    }

    async fn fetch_booked_dates(
        &self,
        place_id: PlaceId,
        anchor: NaiveDate,
    ) -> Result<HashSet<String>, ApiError> {
        let query = [
            ("i", place_id.to_string()),
            ("d", anchor.format("%Y%m%d").to_string()),
        ];
        let page: BookingsPage = self.get_json(BOOKINGS_PATH, &query).await?;
        Ok(booked_date_set(page.dates.unwrap_or_default()))
    }
}

// In-memory stand-in for the booking site, recording every call it receives
#[cfg(test)]
pub mod mock_api {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, Default, Clone)]
    pub struct MockCalls {
        pub catalog_pages: Vec<u32>,
        pub detail_pages: Vec<String>,
        pub booked_dates: Vec<(PlaceId, NaiveDate)>,
    }

    impl MockCalls {
        pub fn network_calls(&self) -> usize {
            self.catalog_pages.len() + self.detail_pages.len() + self.booked_dates.len()
        }
    }

    #[derive(Default)]
    pub struct MockShelterApi {
        pages: Vec<Vec<CatalogRow>>,
        detail_pages: HashMap<String, Option<String>>,
        booked: HashMap<PlaceId, Option<Vec<String>>>,
        calls: Mutex<MockCalls>,
    }

    impl MockShelterApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, rows: Vec<CatalogRow>) -> Self {
            self.pages.push(rows);
            self
        }

        pub fn with_detail_page(mut self, url: &str, html: &str) -> Self {
            self.detail_pages
                .insert(url.to_string(), Some(html.to_string()));
            self
        }

        pub fn with_failing_detail_page(mut self, url: &str) -> Self {
            self.detail_pages.insert(url.to_string(), None);
            self
        }

        pub fn with_booked_dates(mut self, place_id: PlaceId, dates: &[&str]) -> Self {
            self.booked.insert(
                place_id,
                Some(dates.iter().map(|d| d.to_string()).collect()),
            );
            self
        }

        pub fn with_failing_booked_dates(mut self, place_id: PlaceId) -> Self {
            self.booked.insert(place_id, None);
            self
        }

        pub fn calls(&self) -> MockCalls {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ShelterApi for MockShelterApi {
        async fn fetch_catalog_page(
            &self,
            page: u32,
            _page_size: u32,
        ) -> Result<Vec<CatalogRow>, ApiError> {
            self.calls.lock().catalog_pages.push(page);
            Ok(self
                .pages
                .get(page.saturating_sub(1) as usize)
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_detail_page(&self, url: &str) -> Result<String, ApiError> {
            self.calls.lock().detail_pages.push(url.to_string());
            match self.detail_pages.get(url) {
                Some(Some(html)) => Ok(html.clone()),
                Some(None) => Err(ApiError::NetworkError("connection reset".to_string())),
                None => Err(ApiError::ApiResponseError {
                    status_code: 404,
                    message: "Not Found".to_string(),
                }),
            }
        }

        async fn fetch_booked_dates(
            &self,
            place_id: PlaceId,
            anchor: NaiveDate,
        ) -> Result<HashSet<String>, ApiError> {
            self.calls.lock().booked_dates.push((place_id, anchor));
            match self.booked.get(&place_id) {
                Some(Some(dates)) => Ok(dates.iter().cloned().collect()),
                Some(None) => Err(ApiError::ApiResponseError {
                    status_code: 500,
                    message: "Internal Server Error".to_string(),
                }),
                None => Ok(HashSet::new()),
            }
        }
    }
}
