// src/http.rs

//! A narrow HTTP abstraction shared by the resolver and fetchers.
//!
//! The GitHub-facing components only ever need "GET this URL with these query
//! parameters and headers" (plus an optional HEAD for size pre-checks), so they
//! depend on the [`HttpTransport`] trait rather than on a concrete client.
//! [`ReqwestTransport`] is the production implementation.

use crate::errors::{NetworkError, Result};
use reqwest::blocking::Client;
use std::fmt;
use std::io::{Cursor, Read};

/// A response with a lazily-read body.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    headers: Vec<(String, String)>,
    body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Builds a response from parts. Header names are matched case-insensitively.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Box<dyn Read + Send>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Builds a response whose body is already in memory.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self::new(status, headers, Box::new(Cursor::new(body)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `Content-Length` header, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Hands out the body reader, consuming the response.
    pub fn into_body(self) -> Box<dyn Read + Send> {
        self.body
    }

    /// Reads the whole body into memory.
    pub fn bytes(self, url: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut body = self.body;
        body.read_to_end(&mut buf)
            .map_err(|e| NetworkError::Transport {
                url: url.to_string(),
                reason: format!("failed to read response body: {}", e),
            })?;
        Ok(buf)
    }

    /// Reads and deserializes a JSON body.
    pub fn json<T: serde::de::DeserializeOwned>(self, url: &str) -> Result<T> {
        let bytes = self.bytes(url)?;
        serde_json::from_slice(&bytes).map_err(|source| crate::errors::Error::Json {
            context: format!("response from '{}'", url),
            source,
        })
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The only HTTP operations the sync core needs.
///
/// Implementations report transport-level failures (connect, TLS, timeout) as
/// `Err`; every HTTP status, including 4xx/5xx, is an `Ok` response.
pub trait HttpTransport: Send + Sync {
    /// Performs a GET request.
    fn get(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpResponse>;

    /// Performs a HEAD request. Transports without HEAD support return an error,
    /// and callers treat that as "size unknown".
    fn head(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let _ = headers;
        Err(NetworkError::Transport {
            url: url.to_string(),
            reason: "HEAD is not supported by this transport".to_string(),
        }
        .into())
    }
}

/// [`HttpTransport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an already-configured client (default headers, proxy, TLS, timeout).
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn convert(url: &str, result: reqwest::Result<reqwest::blocking::Response>) -> Result<HttpResponse> {
        let response = result.map_err(|e| NetworkError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Ok(HttpResponse::new(status, headers, Box::new(response)))
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, params: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        log::debug!("GET {}", url);
        Self::convert(url, request.send())
    }

    fn head(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        let mut request = self.client.head(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        log::debug!("HEAD {}", url);
        Self::convert(url, request.send())
    }
}
