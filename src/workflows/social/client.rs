use super::oauth::{self, RequestStamp};
use crate::config::TwitterCredentials;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Debug;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

pub const TWITTER_API_BASE: &str = "https://api.twitter.com/1.1";

/// Standard search returns at most this many statuses per page.
const SEARCH_PAGE_SIZE: usize = 100;
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(16 * 60);
const RATE_LIMIT_HEADER: &str = "x-rate-limit-reset";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("API responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("HTTP runtime unavailable: {0}")]
    Runtime(String),
}

/// Where posts come from. The analysis only needs an identity check and a
/// text search.
pub trait PostSource: Debug {
    /// Screen name of the authenticated account.
    fn verify(&self) -> Result<String, SourceError>;
    fn search(&self, query: &str, count: usize) -> Result<Vec<String>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct Account {
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    statuses: Vec<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: u64,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    retweeted_status: Option<Box<Status>>,
}

impl Status {
    /// Untruncated text; retweets carry the original in `retweeted_status`.
    fn into_text(self) -> Option<String> {
        if let Some(original) = self.retweeted_status {
            if let Some(text) = original.into_text() {
                return Some(text);
            }
        }
        self.full_text.or(self.text)
    }
}

/// How long to sleep after a 429, from the epoch-seconds reset header.
pub(crate) fn rate_limit_wait(reset: Option<&str>, now: i64) -> Duration {
    let Some(reset) = reset.and_then(|value| value.trim().parse::<i64>().ok()) else {
        return DEFAULT_RATE_LIMIT_WAIT;
    };
    let seconds = u64::try_from(reset.saturating_sub(now)).unwrap_or(0) + 1;
    Duration::from_secs(seconds).min(MAX_RATE_LIMIT_WAIT)
}

fn reset_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(RATE_LIMIT_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Local endpoints are never sent through a system proxy.
fn is_loopback(base_url: &str) -> bool {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| {
            url.host_str().map(|host| {
                host == "localhost"
                    || host
                        .parse::<std::net::IpAddr>()
                        .is_ok_and(|ip| ip.is_loopback())
            })
        })
        .unwrap_or(false)
}

/// Blocking Twitter v1.1 client: owns a runtime and drives async reqwest
/// calls to completion so the analysis code stays synchronous.
pub struct TwitterClient {
    http: reqwest::Client,
    runtime: Runtime,
    credentials: TwitterCredentials,
    base_url: String,
    max_rate_limit_waits: u32,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(credentials, timeout, TWITTER_API_BASE)
    }

    pub fn with_base_url(
        credentials: TwitterCredentials,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        let runtime = Runtime::new().map_err(|err| SourceError::Runtime(err.to_string()))?;
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("campervan-insights/", env!("CARGO_PKG_VERSION")));
        if is_loopback(base_url) {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|err| SourceError::Http(err.to_string()))?;
        Ok(Self {
            http,
            runtime,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_rate_limit_waits: 3,
        })
    }

    pub fn max_rate_limit_waits(mut self, waits: u32) -> Self {
        self.max_rate_limit_waits = waits;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut waits = 0;
        loop {
            let header = oauth::authorization_header(
                "GET",
                &url,
                params,
                &self.credentials,
                &RequestStamp::fresh(),
            );
            let target = if params.is_empty() {
                url.clone()
            } else {
                format!("{}?{}", url, oauth::encode_pairs(params))
            };
            debug!(endpoint, "calling Twitter API");
            let response = self
                .http
                .get(&target)
                .header(AUTHORIZATION, header)
                .send()
                .await
                .map_err(|err| SourceError::Http(err.to_string()))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if waits >= self.max_rate_limit_waits {
                    return Err(SourceError::RateLimited {
                        attempts: waits + 1,
                    });
                }
                let wait = rate_limit_wait(
                    reset_header(response.headers()),
                    chrono::Utc::now().timestamp(),
                );
                warn!(endpoint, wait_secs = wait.as_secs(), "rate limited, waiting for reset");
                tokio::time::sleep(wait).await;
                waits += 1;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            return response
                .json::<T>()
                .await
                .map_err(|err| SourceError::Decode(err.to_string()));
        }
    }
}

impl Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PostSource for TwitterClient {
    fn verify(&self) -> Result<String, SourceError> {
        let account: Account = self
            .runtime
            .block_on(self.get_json("account/verify_credentials.json", &[]))?;
        Ok(account.screen_name)
    }

    /// Pages backwards through results with `max_id` until `count` posts are
    /// collected or the search runs dry.
    fn search(&self, query: &str, count: usize) -> Result<Vec<String>, SourceError> {
        let mut texts = Vec::with_capacity(count.min(SEARCH_PAGE_SIZE));
        let mut max_id: Option<u64> = None;

        while texts.len() < count {
            let page_size = (count - texts.len()).min(SEARCH_PAGE_SIZE);
            let mut params = vec![
                ("q".to_string(), query.to_string()),
                ("count".to_string(), page_size.to_string()),
                ("lang".to_string(), "en".to_string()),
                ("tweet_mode".to_string(), "extended".to_string()),
            ];
            if let Some(id) = max_id {
                params.push(("max_id".to_string(), id.to_string()));
            }

            let page: SearchPage = self
                .runtime
                .block_on(self.get_json("search/tweets.json", &params))?;
            let Some(oldest) = page.statuses.iter().map(|status| status.id).min() else {
                break;
            };
            let received = page.statuses.len();
            texts.extend(page.statuses.into_iter().filter_map(Status::into_text));
            debug!(received, total = texts.len(), "search page received");

            if received < page_size || oldest == 0 {
                break;
            }
            max_id = Some(oldest - 1);
        }

        texts.truncate(count);
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn credentials() -> TwitterCredentials {
        TwitterCredentials {
            consumer_key: "key".into(),
            consumer_secret: "very-secret".into(),
            access_token: "token".into(),
            access_token_secret: "token-secret".into(),
        }
    }

    fn reply(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{headers}\r\n{body}",
            body.len()
        )
    }

    fn statuses(ids: std::ops::Range<u64>) -> String {
        let items: Vec<String> = ids
            .map(|id| format!(r#"{{"id": {id}, "full_text": "campervan post {id}"}}"#))
            .collect();
        format!(r#"{{"statuses": [{}]}}"#, items.join(","))
    }

    /// Serves `replies` in order, one connection each, and hands back the
    /// request lines it saw.
    fn serve(replies: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener binds");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().expect("client connects");
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = stream.read(&mut chunk).expect("request readable");
                    if read == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..read]);
                }
                let head = String::from_utf8_lossy(&request);
                seen.push(head.lines().next().unwrap_or_default().to_string());
                stream.write_all(reply.as_bytes()).expect("reply written");
            }
            seen
        });
        (base_url, handle)
    }

    fn client(base_url: &str) -> TwitterClient {
        TwitterClient::with_base_url(credentials(), Duration::from_secs(5), base_url)
            .expect("client builds")
    }

    #[test]
    fn rate_limited_call_is_retried_after_reset() {
        let (base_url, server) = serve(vec![
            reply("429 Too Many Requests", "x-rate-limit-reset: 0\r\n", "{}"),
            reply("200 OK", "", r#"{"screen_name": "fjord_vans"}"#),
        ]);

        let account = client(&base_url).verify().expect("second attempt succeeds");

        assert_eq!(account, "fjord_vans");
        let seen = server.join().expect("server thread");
        assert_eq!(seen.len(), 2);
        assert!(seen
            .iter()
            .all(|line| line.starts_with("GET /account/verify_credentials.json ")));
    }

    #[test]
    fn rate_limit_waits_are_capped() {
        let (base_url, server) = serve(vec![reply(
            "429 Too Many Requests",
            "x-rate-limit-reset: 0\r\n",
            "{}",
        )]);

        let err = client(&base_url)
            .max_rate_limit_waits(0)
            .verify()
            .expect_err("no waits allowed");

        assert!(matches!(err, SourceError::RateLimited { attempts: 1 }), "{err}");
        assert_eq!(server.join().expect("server thread").len(), 1);
    }

    #[test]
    fn error_status_keeps_the_response_body() {
        let body = r#"{"errors": [{"code": 32, "message": "Could not authenticate you."}]}"#;
        let (base_url, server) = serve(vec![reply("401 Unauthorized", "", body)]);

        let err = client(&base_url).verify().expect_err("unauthorized");

        match err {
            SourceError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Could not authenticate you."));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.join().expect("server thread");
    }

    #[test]
    fn search_pages_backwards_until_a_short_page() {
        let (base_url, server) = serve(vec![
            reply("200 OK", "", &statuses(1000..1100)),
            reply("200 OK", "", &statuses(980..1000)),
        ]);

        let texts = client(&base_url)
            .search("campervan rental", 150)
            .expect("search succeeds");

        assert_eq!(texts.len(), 120);
        assert_eq!(texts[0], "campervan post 1000");
        let seen = server.join().expect("server thread");
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("GET /search/tweets.json?"));
        assert!(seen[0].contains("q=campervan%20rental"));
        assert!(seen[0].contains("count=100"));
        assert!(!seen[0].contains("max_id"));
        assert!(seen[1].contains("count=50"));
        assert!(seen[1].contains("max_id=999"));
    }

    #[test]
    fn search_truncates_an_oversized_page() {
        let (base_url, server) = serve(vec![reply("200 OK", "", &statuses(1..9))]);

        let texts = client(&base_url)
            .search("motorhome", 5)
            .expect("search succeeds");

        assert_eq!(texts.len(), 5);
        let seen = server.join().expect("server thread");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("count=5"));
    }

    #[test]
    fn loopback_hosts_are_detected() {
        assert!(is_loopback("http://127.0.0.1:8080"));
        assert!(is_loopback("http://localhost/1.1"));
        assert!(!is_loopback(TWITTER_API_BASE));
        assert!(!is_loopback("not a url"));
    }

    #[test]
    fn wait_runs_until_the_reset_instant() {
        assert_eq!(rate_limit_wait(Some("1700000100"), 1_700_000_000), Duration::from_secs(101));
        assert_eq!(rate_limit_wait(Some("1699999990"), 1_700_000_000), Duration::from_secs(1));
    }

    #[test]
    fn wait_falls_back_and_is_capped() {
        assert_eq!(rate_limit_wait(None, 0), DEFAULT_RATE_LIMIT_WAIT);
        assert_eq!(rate_limit_wait(Some("soon"), 0), DEFAULT_RATE_LIMIT_WAIT);
        assert_eq!(rate_limit_wait(Some("99999"), 0), MAX_RATE_LIMIT_WAIT);
    }

    #[test]
    fn search_page_prefers_full_and_retweeted_text() {
        let raw = r#"{"statuses": [
            {"id": 3, "full_text": "Loved our motorhome week", "text": "Loved our…"},
            {"id": 2, "full_text": "RT @a: trunc…", "retweeted_status": {"id": 1, "full_text": "Original campervan post"}},
            {"id": 1, "text": "legacy text only"}
        ]}"#;
        let page: SearchPage = serde_json::from_str(raw).expect("page parses");
        let texts: Vec<String> = page.statuses.into_iter().filter_map(Status::into_text).collect();
        assert_eq!(
            texts,
            vec![
                "Loved our motorhome week",
                "Original campervan post",
                "legacy text only"
            ]
        );
    }

    #[test]
    fn debug_output_hides_credentials() {
        let client =
            TwitterClient::new(credentials(), Duration::from_secs(5)).expect("client builds");
        let rendered = format!("{client:?}");
        assert!(rendered.contains("api.twitter.com"));
        assert!(!rendered.contains("very-secret"));
    }
}
