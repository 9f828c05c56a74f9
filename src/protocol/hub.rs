// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the Wiser controller's local REST API.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::ProtocolError;

/// Header carrying the controller's shared secret.
const SECRET_HEADER: HeaderName = HeaderName::from_static("secret");

/// The brand string the controller answers on its probe endpoint.
pub const BRAND_NAME: &str = "WiserHeat";

// ============================================================================
// HubConfig - Configuration for a controller connection
// ============================================================================

/// Configuration for a Wiser controller connection.
///
/// Holds the connection parameters the transport needs before any call
/// can be made: the controller's address and the shared secret obtained
/// from the hub's setup mode. Building a client without them fails fast.
///
/// # Examples
///
/// ```
/// use wiser_lib::protocol::HubConfig;
/// use std::time::Duration;
///
/// // Simple configuration
/// let config = HubConfig::new("192.168.1.100", "secret-from-hub");
///
/// // With all options
/// let config = HubConfig::new("192.168.1.100", "secret-from-hub")
///     .with_port(8080)
///     .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HubConfig {
    host: String,
    port: u16,
    secret: String,
    timeout: Duration,
}

impl HubConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default request timeout.
    ///
    /// Deliberately well below the default poll interval so a slow
    /// request cannot pile up behind the next scheduled tick.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new configuration for the specified controller.
    ///
    /// # Arguments
    ///
    /// * `host` - The hostname or IP address of the controller
    /// * `secret` - The shared secret from the hub's setup mode
    #[must_use]
    pub fn new(host: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            secret: secret.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the versioned API base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let port_suffix = if self.port == Self::DEFAULT_PORT {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!("http://{}{port_suffix}/data/v2/", self.host)
    }

    /// Creates a [`HubClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or secret is missing, or the HTTP
    /// client cannot be created.
    pub fn into_client(self) -> Result<HubClient, ProtocolError> {
        if self.host.is_empty() {
            return Err(ProtocolError::InvalidAddress("host is required".to_string()));
        }
        if self.secret.is_empty() {
            return Err(ProtocolError::InvalidSecret);
        }

        let base_url = self.base_url();

        let mut headers = HeaderMap::new();
        let secret =
            HeaderValue::from_str(&self.secret).map_err(|_| ProtocolError::InvalidSecret)?;
        headers.insert(SECRET_HEADER, secret);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );

        let client = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(HubClient {
            base_url,
            client,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// HubClient - Authenticated REST client
// ============================================================================

/// Authenticated HTTP client for a Wiser controller.
///
/// All requests carry the shared secret header and JSON content type.
/// Failures are classified into machine-readable kinds so the fetch
/// cycle can distinguish a timed-out or unreachable controller from
/// other transport errors.
///
/// # Examples
///
/// ```no_run
/// use wiser_lib::protocol::HubConfig;
///
/// # async fn example() -> Result<(), wiser_lib::error::ProtocolError> {
/// let client = HubConfig::new("192.168.1.100", "secret").into_client()?;
/// let snapshot = client.get_all().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HubClient {
    /// Returns the versioned API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the full domain snapshot (`GET domain/`).
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProtocolError`] on any transport failure.
    pub async fn get_all(&self) -> Result<Value, ProtocolError> {
        self.get_json("domain/").await
    }

    /// Fetches the controller's brand name (`GET domain/System/BrandName/`).
    ///
    /// Used as a cheap probe of a valid, authenticated connection; a
    /// healthy controller always answers [`BRAND_NAME`].
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProtocolError`] on any transport failure.
    pub async fn get_brand_name(&self) -> Result<String, ProtocolError> {
        self.get_json("domain/System/BrandName/").await
    }

    /// Fetches the controller's network information (`GET network/`).
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProtocolError`] on any transport failure.
    pub async fn get_network(&self) -> Result<Value, ProtocolError> {
        self.get_json("network/").await
    }

    /// Fetches schedule data (`GET schedules/[id]`).
    ///
    /// Without an id, returns every schedule.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProtocolError`] on any transport failure.
    pub async fn get_schedule(&self, schedule_id: Option<i64>) -> Result<Value, ProtocolError> {
        match schedule_id {
            Some(id) => self.get_json(&format!("schedules/{id}/")).await,
            None => self.get_json("schedules/").await,
        }
    }

    /// Issues a write against a room (`PATCH domain/Room/{id}`).
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProtocolError`] on any transport failure.
    pub async fn patch_room(&self, room_id: i64, body: &Value) -> Result<Value, ProtocolError> {
        let url = format!("{}domain/Room/{room_id}", self.base_url);

        tracing::debug!(url = %url, body = %body, "Sending PATCH to controller");

        let response = self
            .client
            .patch(&url)
            .json(body)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response)?;

        let body = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!(body = %body, "Received PATCH response");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        // Some firmware answers PATCH with a non-JSON acknowledgement
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// Performs a GET and decodes the JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ProtocolError> {
        let url = format!("{}{path}", self.base_url);

        tracing::debug!(url = %url, "Sending GET to controller");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = Self::check_status(response)?;

        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    /// Converts non-success statuses into protocol errors.
    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProtocolError> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::AuthenticationFailed);
        }
        if !response.status().is_success() {
            return Err(ProtocolError::ConnectionFailed(format!(
                "HTTP {} - {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response)
    }

    /// Classifies a transport error into a machine-readable kind.
    ///
    /// Timeouts and unreachable hosts get their own kinds so the fetch
    /// cycle can run the gateway reachability check for exactly those.
    fn classify(&self, error: reqwest::Error) -> ProtocolError {
        if error.is_timeout() {
            return ProtocolError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX));
        }

        let mut source = std::error::Error::source(&error);
        while let Some(inner) = source {
            if let Some(io) = inner.downcast_ref::<std::io::Error>()
                && matches!(
                    io.kind(),
                    std::io::ErrorKind::HostUnreachable | std::io::ErrorKind::NetworkUnreachable
                )
            {
                return ProtocolError::HostUnreachable(io.to_string());
            }
            source = inner.source();
        }

        ProtocolError::Http(error)
    }
}
