//! Blocking HTTP transport and reachability probe for the dashboard API.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use tracing::warn;

use crate::features::sync::ConnectivityProbe;
use crate::transport::types::{ReplayRequest, ReplayResponse, TransportError};

/// Something that can deliver a request and hand back the raw response.
///
/// Non-2xx answers are responses, not errors; only failing to exchange
/// anything at all is a `TransportError`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Deliver `request` and return whatever the server answered.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained.
    fn send(&self, request: &ReplayRequest) -> Result<ReplayResponse, TransportError>;
}

/// Blocking HTTP transport for the dashboard API.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport resolving relative URLs against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `url`; queued requests usually carry API-relative
    /// paths such as `/api/dashboard/subjects`.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ReplayRequest) -> Result<ReplayResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::Request(format!("invalid method {}", request.method)))?;

        let mut builder = self.client.request(method, self.resolve(&request.url));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = request.payload()? {
            builder = builder.body(payload);
        }

        let response = builder.send().map_err(classify)?;
        let status = response.status();
        let body = match response.text() {
            Ok(body) => body,
            // A 2xx was delivered even when its body is lost
            Err(e) if status.is_success() => {
                warn!(status = status.as_u16(), "failed to read response body: {e}");
                String::new()
            }
            Err(e) => return Err(TransportError::Body(e.to_string())),
        };

        Ok(ReplayResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() {
        TransportError::Connectivity(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

/// Reachability check against the API host: any HTTP answer, whatever the
/// status, counts as online.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    /// Create a probe that sends `HEAD url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpProbe {
            client,
            url: url.to_string(),
        })
    }
}

impl ConnectivityProbe for HttpProbe {
    fn is_online(&self) -> bool {
        self.client.head(&self.url).send().is_ok()
    }
}
