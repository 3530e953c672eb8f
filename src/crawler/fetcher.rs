//! Page fetching and legacy text decoding
//!
//! One fetch = one GET through a borrowed pool slot, returning the raw body
//! decoded from the portal's legacy byte encoding. A byte sequence the
//! encoding cannot represent is replaced rather than fatal; the caller is
//! told the decode was lossy so it can log the URL and keep going.

use crate::pool::ProxyLease;
use encoding_rs::Encoding;

/// Outcome of fetching and decoding one page body
#[derive(Debug)]
pub enum FetchOutcome {
    /// Body fetched; `lossy` is true when the decoder had to substitute
    /// replacement characters
    Body { text: String, lossy: bool },

    /// Transport-level failure (timeout, reset, protocol error, bad status)
    Transient { error: String },
}

/// Fetches `url` through the leased endpoint and decodes the body
pub async fn fetch_page(lease: &ProxyLease, url: &str, encoding: &'static Encoding) -> FetchOutcome {
    let response = match lease.client().get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::Transient {
                error: describe_transport_error(&e),
            }
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::Transient {
            error: format!("HTTP {}", status.as_u16()),
        };
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            return FetchOutcome::Transient {
                error: describe_transport_error(&e),
            }
        }
    };

    let (text, lossy) = decode_body(&bytes, encoding);
    FetchOutcome::Body { text, lossy }
}

/// Decodes a raw body, reporting whether any byte sequence was replaced
pub fn decode_body(bytes: &[u8], encoding: &'static Encoding) -> (String, bool) {
    let (text, _, had_errors) = encoding.decode(bytes);
    (text.into_owned(), had_errors)
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    }
}
