//! Cloud Controller v3 response shapes, as returned by `cf curl`.
//!
//! Only the fields the scaleover needs are modelled; everything else in
//! the payload is ignored.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{CfError, CfResult};

/// A paginated list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppResource {
    pub guid: String,
    pub name: String,
    /// `STARTED` or `STOPPED`.
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResource {
    pub instances: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessStat {
    pub index: u32,
    /// `RUNNING`, `STARTING`, `CRASHED`, `DOWN`, ...
    pub state: String,
}

/// A v3 route. `url` is the host joined with its domain, plus any path.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteResource {
    pub url: String,
}

impl RouteResource {
    /// Fully-qualified route, e.g. `app.example.com`.
    pub fn fqdn(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    detail: String,
    #[serde(default)]
    title: String,
}

/// Decode a `cf curl` body, turning a v3 error envelope into an error.
///
/// `cf curl` exits 0 even when the API answers with an error, so the
/// envelope has to be checked before the payload.
pub fn decode<T: DeserializeOwned>(path: &str, body: &str) -> CfResult<T> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(first) = envelope.errors.first()
    {
        let detail = if first.detail.is_empty() {
            first.title.clone()
        } else {
            first.detail.clone()
        };
        return Err(CfError::Api {
            path: path.to_string(),
            detail,
        });
    }

    serde_json::from_str(body).map_err(|source| CfError::Json {
        path: path.to_string(),
        source,
    })
}

/// Percent-encode a query value.
pub fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
