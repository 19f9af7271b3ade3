// src/api/client.rs
//! HTTP client for the Pixabay search API.
//!
//! Handles request construction, rate limiting, timeouts and retries.
//! Response bodies are handed to [`super::parser`]; this module never
//! interprets hits itself.

use super::rate_limit::RequestLimiter;
use crate::constants::{PIXABAY_API_URL, PIXABAY_MAX_PER_PAGE, PIXABAY_MIN_PER_PAGE};
use crate::error::AppError;
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::model::Candidate;
use crate::query::SearchQuery;
use crate::types::{ApiKey, ImageType, ValidatedUrl};
use reqwest::{header, Client, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Connection settings for [`PixabayHttpClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Two-letter language code used to interpret the query.
    pub language: String,
    pub safe_search: bool,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: PIXABAY_API_URL.to_string(),
            language: "fr".to_string(),
            safe_search: true,
            request_timeout: crate::constants::DEFAULT_REQUEST_TIMEOUT,
            download_timeout: crate::constants::DEFAULT_DOWNLOAD_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// A thin wrapper around reqwest Client for search and image download requests.
#[derive(Clone)]
pub struct PixabayHttpClient {
    client: Client,
    api_key: ApiKey,
    settings: ClientSettings,
    limiter: Arc<RequestLimiter>,
}

impl PixabayHttpClient {
    /// Creates a client sharing `limiter` with every other user of the service.
    pub fn new(
        api_key: ApiKey,
        settings: ClientSettings,
        limiter: Arc<RequestLimiter>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("cardpix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key,
            settings,
            limiter,
        })
    }

    /// Builds the search URL. Pure, so it can be checked without a network.
    pub fn search_url(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
        page_size: u32,
    ) -> Result<Url, AppError> {
        let per_page = page_size.clamp(PIXABAY_MIN_PER_PAGE, PIXABAY_MAX_PER_PAGE);
        Url::parse_with_params(
            &self.settings.base_url,
            &[
                ("key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("image_type", image_type.as_param()),
                ("lang", self.settings.language.as_str()),
                ("safesearch", if self.settings.safe_search { "true" } else { "false" }),
                ("per_page", per_page.to_string().as_str()),
            ],
        )
        .map_err(|e| AppError::MissingConfiguration(format!("Invalid API base URL: {}", e)))
    }

    /// Makes one rate-limited GET request.
    async fn get(&self, url: Url, timeout: Duration) -> Result<Response, AppError> {
        self.limiter.acquire().await;
        self.client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("no response within {:?}", timeout))
                } else {
                    AppError::NetworkFailure(e)
                }
            })
    }

    /// Sends one search request without retrying.
    async fn search_once(&self, url: &Url) -> Result<Vec<Candidate>, AppError> {
        let response = self.get(url.clone(), self.settings.request_timeout).await?;
        let response = check_status(response).await?;
        let api_response = extract_response_text(response).await?;
        super::parser::parse_search_response(api_response)
    }

    /// Downloads the bytes behind an image URL, returning them with the
    /// reported content type.
    pub async fn fetch_bytes(&self, url: &ValidatedUrl) -> Result<(Vec<u8>, String), AppError> {
        log::debug!("Downloading {}", url);
        retry_with_backoff(
            move || async move {
                let response = self
                    .get(url.as_url().clone(), self.settings.download_timeout)
                    .await?;
                let response = check_status(response).await?;
                let content_type = response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let bytes = response.bytes().await?;
                Ok((bytes.to_vec(), content_type))
            },
            self.settings.retry,
        )
        .await
    }
}

#[async_trait::async_trait]
impl super::ImageSearch for PixabayHttpClient {
    async fn search(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
        page_size: u32,
    ) -> Result<Vec<Candidate>, AppError> {
        let url = self.search_url(query, image_type, page_size)?;
        log::debug!("GET search q='{}' image_type={}", query, image_type);

        let url = &url;
        let mut candidates =
            retry_with_backoff(move || self.search_once(url), self.settings.retry).await?;

        if candidates.is_empty() {
            return Err(AppError::NoResults {
                query: query.as_str().to_string(),
            });
        }
        // The API's minimum page size can exceed what was asked for.
        candidates.truncate(page_size.max(1) as usize);
        Ok(candidates)
    }
}

/// Turns a non-success response into the matching error.
async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let throttled = status == reqwest::StatusCode::TOO_MANY_REQUESTS;
    let retry_after = parse_retry_after(response.headers(), throttled);
    let body = response.text().await.unwrap_or_default();
    let message = super::parser::preview(body.trim());
    log::debug!("Search API error {}: {}", status, message);
    Err(AppError::from_status(status.as_u16(), message, retry_after))
}

/// Reads a `Retry-After` header given in seconds.
///
/// On a throttled response Pixabay also reports `X-RateLimit-Reset`
/// (seconds until the window resets), which is used when `Retry-After` is
/// absent. That header is ignored on other statuses.
pub fn parse_retry_after(headers: &header::HeaderMap, throttled: bool) -> Option<Duration> {
    let names: &[&str] = if throttled {
        &[header::RETRY_AFTER.as_str(), "x-ratelimit-reset"]
    } else {
        &[header::RETRY_AFTER.as_str()]
    };
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = redact_key(response.url());
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}

/// Renders a URL with its `key` parameter masked.
fn redact_key(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        return redacted.to_string();
    }
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImageSearch;
    use crate::error::SearchErrorCode;
    use crate::query::QueryBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> PixabayHttpClient {
        PixabayHttpClient::new(
            ApiKey::new("12345678-abcdef").unwrap(),
            ClientSettings::default(),
            Arc::new(RequestLimiter::unlimited()),
        )
        .unwrap()
    }

    #[test]
    fn search_url_carries_all_parameters() {
        let query = QueryBuilder::default().build("chat noir").unwrap();
        let url = client().search_url(&query, ImageType::Illustration, 5).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("pixabay.com"));
        assert_eq!(params["key"], "12345678-abcdef");
        assert_eq!(params["q"], "chat noir");
        assert_eq!(params["image_type"], "illustration");
        assert_eq!(params["lang"], "fr");
        assert_eq!(params["safesearch"], "true");
        assert_eq!(params["per_page"], "5");
    }

    #[test]
    fn per_page_is_clamped_to_api_bounds() {
        let query = QueryBuilder::default().build("chat").unwrap();
        let url = client().search_url(&query, ImageType::Photo, 1).unwrap();
        assert!(url.query().unwrap().contains("per_page=3"));
        let url = client().search_url(&query, ImageType::Photo, 500).unwrap();
        assert!(url.query().unwrap().contains("per_page=200"));
    }

    #[test]
    fn retry_after_header_is_honoured() {
        let mut headers = header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers, true), None);
        headers.insert("x-ratelimit-reset", header::HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers, true), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after(&headers, false), None);
        headers.insert(header::RETRY_AFTER, header::HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after(&headers, true), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(&headers, false), Some(Duration::from_secs(3)));
    }

    #[test]
    fn api_key_is_redacted_from_urls() {
        let url = Url::parse("https://pixabay.com/api/?key=secret123&q=chat").unwrap();
        let shown = redact_key(&url);
        assert!(!shown.contains("secret123"));
        assert!(shown.contains("q=chat"));
    }

    const HITS_BODY: &str = r#"{"totalHits":1,"hits":[{"id":7,"type":"photo","tags":"cat",
        "previewURL":"https://cdn.pixabay.com/c_150.jpg",
        "webformatURL":"https://pixabay.com/get/c_640.jpg","user":"anna"}]}"#;

    /// Local HTTP server answering every request with the same canned
    /// response after `delay`. Returns its base URL and a request counter.
    async fn stub_server(
        status: u16,
        body: &'static str,
        delay: Duration,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let mut head = Vec::new();
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}/api/", addr), requests)
    }

    fn stub_client(base_url: String, request_timeout: Duration) -> PixabayHttpClient {
        PixabayHttpClient::new(
            ApiKey::new("12345678-abcdef").unwrap(),
            ClientSettings {
                base_url,
                request_timeout,
                retry: RetryPolicy {
                    max_attempts: 3,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(5),
                },
                ..ClientSettings::default()
            },
            Arc::new(RequestLimiter::unlimited()),
        )
        .unwrap()
    }

    async fn search_stub(
        status: u16,
        body: &'static str,
        delay: Duration,
    ) -> (Result<Vec<Candidate>, AppError>, usize) {
        let (base_url, requests) = stub_server(status, body, delay).await;
        let client = stub_client(base_url, Duration::from_millis(200));
        let query = QueryBuilder::default().build("chat").unwrap();
        let result = client.search(&query, ImageType::Photo, 3).await;
        (result, requests.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn successful_search_over_http() {
        let (result, requests) = search_stub(200, HITS_BODY, Duration::ZERO).await;
        let candidates = result.unwrap();
        assert_eq!(requests, 1);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].remote_id, 7);
        assert_eq!(candidates[0].attribution, "Image by anna on Pixabay");

        let (result, _) = search_stub(200, r#"{"totalHits":0,"hits":[]}"#, Duration::ZERO).await;
        assert!(matches!(result, Err(AppError::NoResults { .. })));
    }

    #[tokio::test]
    async fn throttling_is_retried_then_reported() {
        let (result, requests) = search_stub(429, "[ERROR 429] too many", Duration::ZERO).await;
        assert!(matches!(
            result,
            Err(AppError::RateLimitExceeded { attempts: 3 })
        ));
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn rejected_key_is_not_retried() {
        let (result, requests) = search_stub(401, "[ERROR 401] unauthorized", Duration::ZERO).await;
        assert!(matches!(result, Err(AppError::Auth { .. })));
        assert_eq!(requests, 1);

        let (result, requests) =
            search_stub(400, "[ERROR 400] \"key\" is invalid", Duration::ZERO).await;
        assert!(matches!(result, Err(AppError::Auth { .. })));
        assert_eq!(requests, 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let (result, requests) = search_stub(503, "unavailable", Duration::ZERO).await;
        assert!(matches!(
            result,
            Err(AppError::SearchService {
                code: SearchErrorCode::ServerError(503),
                ..
            })
        ));
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn slow_responses_time_out_and_are_retried() {
        let (result, requests) = search_stub(200, HITS_BODY, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(AppError::Timeout(_))), "{:?}", result);
        assert_eq!(requests, 3);
    }

    #[tokio::test]
    async fn response_metadata_hides_the_key() {
        let (base_url, _) = stub_server(200, HITS_BODY, Duration::ZERO).await;
        let client = stub_client(base_url, Duration::from_secs(2));
        let query = QueryBuilder::default().build("chat").unwrap();
        let url = client.search_url(&query, ImageType::Photo, 3).unwrap();

        let response = client.get(url, Duration::from_secs(2)).await.unwrap();
        let api_response = extract_response_text(response).await.unwrap();
        assert_eq!(api_response.status, reqwest::StatusCode::OK);
        assert!(!api_response.url.contains("12345678-abcdef"));
        assert!(api_response.url.contains("q=chat"));
    }
}
