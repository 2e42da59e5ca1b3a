//! Signed URL construction.
//!
//! Every Game API call carries `signature = md5(url + private_key)` as the
//! last query parameter, where `url` is the full URL up to (but excluding)
//! the signature itself. Parameter values are percent-encoded before
//! signing so the server hashes the exact bytes it receives.

use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Accumulates query parameters in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Push only when `value` is non-empty.
    pub fn push_non_empty(&mut self, key: impl Into<String>, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.params.push((key.into(), value.to_string()));
        }
        self
    }

    /// Append every parameter of `other`, keeping its order.
    pub fn extend(&mut self, other: Query) -> &mut Self {
        self.params.extend(other.params);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Render as `k1=v1&k2=v2`, percent-encoded.
    pub fn encode(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_VALUE),
                    utf8_percent_encode(v, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Lowercase hex MD5 of `url` followed by `private_key`.
pub fn signature(url: &str, private_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    hasher.update(private_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append the signature parameter to an already complete URL.
pub fn sign_url(url: &str, private_key: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}signature={}", signature(url, private_key))
}
