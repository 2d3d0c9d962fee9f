//! OAuth 1.0a request signing (HMAC-SHA1).

use crate::config::TwitterCredentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::distr::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LENGTH: usize = 32;

/// RFC 3986 percent-encoding; only unreserved characters pass through.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `k=v&k=v` with both sides encoded, in the given order.
pub fn encode_pairs(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

pub fn timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Per-request values that change on every call.
#[derive(Debug, Clone)]
pub struct RequestStamp {
    pub nonce: String,
    pub timestamp: u64,
}

impl RequestStamp {
    pub fn fresh() -> Self {
        Self {
            nonce: nonce(),
            timestamp: timestamp(),
        }
    }
}

fn oauth_params(credentials: &TwitterCredentials, stamp: &RequestStamp) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".into(), credentials.consumer_key.clone()),
        ("oauth_nonce".into(), stamp.nonce.clone()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), stamp.timestamp.to_string()),
        ("oauth_token".into(), credentials.access_token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ]
}

/// Base64 HMAC-SHA1 over the signature base string of the request.
pub fn signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    credentials: &TwitterCredentials,
    stamp: &RequestStamp,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .cloned()
        .chain(oauth_params(credentials, stamp))
        .map(|(key, value)| (percent_encode(&key), percent_encode(&value)))
        .collect();
    encoded.sort();
    let parameter_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    );
    let key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.access_token_secret)
    );

    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match HmacSha1::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Value for the `Authorization` header.
pub fn authorization_header(
    method: &str,
    url: &str,
    params: &[(String, String)],
    credentials: &TwitterCredentials,
    stamp: &RequestStamp,
) -> String {
    let signature = signature(method, url, params, credentials, stamp);
    let mut fields = oauth_params(credentials, stamp);
    fields.push(("oauth_signature".into(), signature));
    fields.sort();

    let rendered = fields
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {rendered}")
}
