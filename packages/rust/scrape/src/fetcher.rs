//! Plain HTTP page fetcher.

use std::net::IpAddr;
use std::time::Duration;

use promptkit_shared::{PromptKitError, Result};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("promptkit/", env!("CARGO_PKG_VERSION"));

/// Fetches HTML pages over HTTP(S).
pub struct PageFetcher {
    client: Client,
    /// Allow localhost/private IPs (for tests against mock servers).
    allow_localhost: bool,
}

impl PageFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| PromptKitError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs.
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Fetch `url` and return the response body.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_html(&self, url: &Url) -> Result<String> {
        if !self.allow_localhost && is_blocked_target(url) {
            return Err(PromptKitError::Network(format!("{url}: refusing to fetch local target")));
        }

        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PromptKitError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PromptKitError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| PromptKitError::Network(format!("{url}: body read failed: {e}")))
    }
}

/// Non-HTTP schemes and local/private hosts.
fn is_blocked_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    let Some(host) = url.host_str() else {
        return true;
    };

    if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => {
                v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
            }
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
    }

    host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn blocks_local_and_non_http() {
        for raw in [
            "file:///etc/passwd",
            "http://127.0.0.1:8080/",
            "http://10.0.0.1/",
            "http://localhost:3000/",
            "http://[::1]/",
        ] {
            assert!(is_blocked_target(&Url::parse(raw).unwrap()), "{raw}");
        }
        assert!(!is_blocked_target(
            &Url::parse("https://www.facebook.com/ads/library/").unwrap()
        ));
    }

    #[tokio::test]
    async fn default_fetcher_refuses_mock_server() {
        let server = MockServer::start().await;
        let fetcher = PageFetcher::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher.fetch_html(&url).await.is_err());
    }

    #[tokio::test]
    async fn fetches_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ads/library/"))
            .and(query_param("q", "yoga"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5))
            .unwrap()
            .allow_localhost();
        let url = Url::parse(&format!("{}/ads/library/?q=yoga", server.uri())).unwrap();
        let body = fetcher.fetch_html(&url).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5))
            .unwrap()
            .allow_localhost();
        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch_html(&url).await.unwrap_err();
        assert!(matches!(err, PromptKitError::Network(ref m) if m.contains("503")));
    }
}
