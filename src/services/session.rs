// src/services/session.rs

//! Retrying HTTP session.
//!
//! One place builds the HTTP client and owns the request policy: retry with
//! exponential backoff on transient statuses, a redirect cap, optional basic
//! credentials and cookies, and an optional post-request wait to keep the
//! crawl polite. Failures come out as the classified [`AppError`] variants,
//! so callers match on conditions instead of inspecting strings.

use std::error::Error as _;
use std::io::ErrorKind;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, Response, StatusCode, redirect};
use serde_json::Value;

use crate::config::SessionConfig;
use crate::error::{AppError, Result, status_line};

/// Statuses worth retrying: rate limiting, server-side hiccups and the
/// Cloudflare timeout family.
const RETRY_AFTER_STATUS: [u16; 9] = [413, 429, 500, 502, 503, 504, 520, 522, 524];

fn is_retryable(status: u16) -> bool {
    RETRY_AFTER_STATUS.contains(&status)
}

/// HTTP session with retry, redirect and rate-limit policy applied to every
/// request.
pub struct RequestSession {
    client: Client,
    config: SessionConfig,
}

impl RequestSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookies) = &config.cookies {
            let value = HeaderValue::from_str(cookies)
                .map_err(|e| AppError::config(format!("Invalid cookie header: {e}")))?;
            headers.insert(header::COOKIE, value);
        }

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .cookie_store(true)
            .default_headers(headers);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    /// Fetch `url`, retrying transient statuses with exponential backoff.
    ///
    /// A response with an error status becomes a classified error; HTTP 400
    /// carrying the WordPress invalid-page body becomes
    /// [`AppError::InvalidPage`] so pagination loops can end cleanly.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let mut tries: usize = 0;
        loop {
            tries += 1;
            let response = match self.send(url).await {
                Ok(response) => response,
                Err(err) => return Err(classify_transport_error(err, url)),
            };

            let status = response.status();
            if is_retryable(status.as_u16()) && tries <= self.config.max_retries {
                log::debug!(
                    "Got status {} from {url}, retrying (try {tries})",
                    status.as_u16()
                );
                tokio::time::sleep(self.backoff_delay(tries)).await;
                continue;
            }

            if status.is_redirection() || status.as_u16() >= 400 {
                return Err(self.status_error(response, url, tries).await);
            }

            self.rate_limit().await;
            return Ok(response);
        }
    }

    async fn send(&self, url: &str) -> reqwest::Result<Response> {
        let mut request = self.client.get(url);
        if let Some(auth) = &self.config.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        request.send().await
    }

    /// Turn an error response into the matching classified error, logging it
    /// the way the status deserves (404s are routine, the rest are not).
    async fn status_error(&self, response: Response, url: &str, tries: usize) -> AppError {
        let status = response.status();
        let code = status.as_u16();

        if status.is_redirection() {
            log::error!("Too many redirects (status code {code}) while fetching {url}");
            return AppError::TooManyRedirects {
                url: url.to_string(),
            };
        }

        if status == StatusCode::BAD_REQUEST && is_json_response(&response) {
            let body: Value = response.json().await.unwrap_or_default();
            let is_invalid_page = body
                .get("code")
                .and_then(Value::as_str)
                .is_some_and(|code| code.contains("invalid_page_number"));
            if is_invalid_page {
                return AppError::InvalidPage;
            }
        }

        let mut message = status_line(code, url);
        if tries > 1 {
            message.push_str(&format!(" after {tries} tries"));
        }
        if code == 404 {
            log::debug!("{message}");
        } else {
            log::error!("{message}");
        }
        AppError::status(code, url)
    }

    /// Delay before retry number `tries + 1`.
    fn backoff_delay(&self, tries: usize) -> Duration {
        let exponent = tries.saturating_sub(1) as i32;
        Duration::from_secs_f64(self.config.backoff_factor * 2f64.powi(exponent))
    }

    /// Optional pause after a successful request. Never applied between
    /// retries, which have their own backoff.
    async fn rate_limit(&self) {
        let Some(wait) = self.config.wait else {
            return;
        };
        let factor = if self.config.random_wait {
            rand::rng().random_range(0.5..1.5)
        } else {
            1.0
        };
        tokio::time::sleep(Duration::from_secs_f64(wait * factor)).await;
    }
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}

/// Map a client-level failure onto the closed error taxonomy.
fn classify_transport_error(err: reqwest::Error, url: &str) -> AppError {
    let url = url.to_string();
    if err.is_redirect() {
        return AppError::TooManyRedirects { url };
    }
    if err.is_timeout() {
        return AppError::ConnectionTimeout { url };
    }
    if err.is_connect() {
        let chain = source_chain(&err);
        if chain.contains("dns error") || chain.contains("failed to lookup") {
            return AppError::CouldNotResolveHost { url };
        }
        if let Some(kind) = find_io_error(&err).map(std::io::Error::kind) {
            match kind {
                ErrorKind::ConnectionRefused => return AppError::ConnectionRefused { url },
                ErrorKind::ConnectionReset => return AppError::ConnectionReset { url },
                ErrorKind::TimedOut => return AppError::ConnectionTimeout { url },
                _ => {}
            }
        }
    }
    AppError::Http(err)
}

/// First `io::Error` in the cause chain, if any.
fn find_io_error(err: &reqwest::Error) -> Option<&std::io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io);
        }
        source = cause.source();
    }
    None
}

/// All messages in the cause chain joined into one haystack.
fn source_chain(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_session(config: SessionConfig) -> RequestSession {
        RequestSession::new(SessionConfig {
            backoff_factor: 0.0,
            ..config
        })
        .unwrap()
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(429));
        assert!(is_retryable(500));
        assert!(is_retryable(503));
        assert!(is_retryable(524));
        assert!(!is_retryable(400));
        assert!(!is_retryable(404));
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let session = RequestSession::new(SessionConfig {
            backoff_factor: 0.5,
            ..SessionConfig::default()
        })
        .unwrap();
        assert_eq!(session.backoff_delay(1), Duration::from_secs_f64(0.5));
        assert_eq!(session.backoff_delay(2), Duration::from_secs_f64(1.0));
        assert_eq!(session.backoff_delay(3), Duration::from_secs_f64(2.0));
    }

    #[tokio::test]
    async fn test_get_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(SessionConfig::default());
        let response = session.get(&format!("{}/ok", server.uri())).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_transient_status_exhausts_retries() {
        let server = MockServer::start().await;
        // max_retries = 5 means six attempts in total.
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(6)
            .mount(&server)
            .await;

        let session = test_session(SessionConfig {
            max_retries: 5,
            ..SessionConfig::default()
        });
        let err = session
            .get(&format!("{}/flaky", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let session = test_session(SessionConfig::default());
        let err = session
            .get(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_page_body_is_end_of_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "rest_post_invalid_page_number",
                "message": "The page number requested is larger than the number of pages available.",
                "data": {"status": 400}
            })))
            .mount(&server)
            .await;

        let session = test_session(SessionConfig::default());
        let err = session
            .get(&format!("{}/wp-json/wp/v2/posts?page=99", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_invalid_page());
    }

    #[tokio::test]
    async fn test_plain_bad_request_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
            .mount(&server)
            .await;

        let session = test_session(SessionConfig::default());
        let err = session
            .get(&format!("{}/bad", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 400, .. }));
    }

    async fn redirect_chain(server: &MockServer, hops: usize) {
        for i in 0..hops {
            let target = if i + 1 == hops {
                format!("{}/final", server.uri())
            } else {
                format!("{}/hop{}", server.uri(), i + 1)
            };
            Mock::given(method("GET"))
                .and(path(format!("/hop{i}")))
                .respond_with(ResponseTemplate::new(301).insert_header("Location", target.as_str()))
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_redirect_chain_over_limit() {
        let server = MockServer::start().await;
        redirect_chain(&server, 5).await;

        let session = test_session(SessionConfig {
            max_redirects: 3,
            ..SessionConfig::default()
        });
        let err = session
            .get(&format!("{}/hop0", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRedirects { .. }));
    }

    #[tokio::test]
    async fn test_redirect_chain_within_limit() {
        let server = MockServer::start().await;
        redirect_chain(&server, 5).await;

        let session = test_session(SessionConfig {
            max_redirects: 5,
            ..SessionConfig::default()
        });
        let response = session.get(&format!("{}/hop0", server.uri())).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        // Grab a free port, then close the listener so nothing answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let session = test_session(SessionConfig::default());
        let err = session
            .get(&format!("http://127.0.0.1:{port}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConnectionRefused { .. }));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_classified() {
        let session = test_session(SessionConfig::default());
        let err = session
            .get("http://nonexistent.invalid/")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CouldNotResolveHost { .. }));
    }
}
