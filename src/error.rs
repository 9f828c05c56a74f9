// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Wiser library.
//!
//! This module provides a comprehensive error hierarchy for handling failures
//! across the library: value validation, protocol communication, JSON parsing,
//! and missing snapshot data.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when interacting
/// with a Wiser controller.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a controller response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The latest snapshot does not contain the requested entity data.
    ///
    /// Returned by the query layer when no snapshot has been fetched yet,
    /// or the relevant entity list is absent or empty.
    #[error("no {0} in latest data")]
    NoData(&'static str),
}

/// Errors related to value validation and constraints.
///
/// These errors occur when a caller supplies a value outside the allowed
/// domain, such as an out-of-range setpoint or an unknown room reference.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A setpoint temperature is outside the allowed range.
    #[error("setpoint {actual}°C is out of range [{min}, {max}]")]
    SetpointOutOfRange {
        /// Minimum allowed temperature in °C.
        min: f64,
        /// Maximum allowed temperature in °C.
        max: f64,
        /// The actual temperature that was provided.
        actual: f64,
    },

    /// An invalid comparison operator was provided.
    ///
    /// Only `"<"` and `">"` are accepted.
    #[error("invalid comparison operator: {0}")]
    InvalidComparator(String),

    /// No room matched the given id or name.
    #[error("room not found for '{0}'")]
    RoomNotFound(String),
}

/// Errors related to HTTP communication with the controller.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the controller failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The controller's host could not be reached on the network.
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    /// The local network's default gateway is unreachable.
    ///
    /// Refinement of a transport failure: the whole network is down, not
    /// just the controller.
    #[error("network down: default gateway is unreachable")]
    GatewayUnreachable,

    /// The gateway responds but the controller does not.
    #[error("controller is unreachable: {0}")]
    ControllerUnreachable(String),

    /// Invalid address or hostname.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The shared secret is missing or not a valid header value.
    #[error("invalid or missing shared secret")]
    InvalidSecret,

    /// Authentication failed (controller rejected the shared secret).
    #[error("authentication failed")]
    AuthenticationFailed,
}

impl ProtocolError {
    /// Returns `true` for failure kinds that warrant a gateway
    /// reachability check to distinguish "network down" from
    /// "controller down".
    #[must_use]
    pub fn is_reachability_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::HostUnreachable(_))
    }
}

/// Errors related to parsing controller responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::SetpointOutOfRange {
            min: 5.0,
            max: 30.0,
            actual: 42.0,
        };
        assert_eq!(err.to_string(), "setpoint 42°C is out of range [5, 30]");
    }

    #[test]
    fn error_from_value_error() {
        let value_err = ValueError::RoomNotFound("Attic".to_string());
        let err: Error = value_err.into();
        assert!(matches!(err, Error::Value(ValueError::RoomNotFound(_))));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("CloudConnectionStatus".to_string());
        assert_eq!(
            err.to_string(),
            "missing field in response: CloudConnectionStatus"
        );
    }

    #[test]
    fn no_data_display() {
        let err = Error::NoData("Device");
        assert_eq!(err.to_string(), "no Device in latest data");
    }

    #[test]
    fn reachability_failure_kinds() {
        assert!(ProtocolError::Timeout(10_000).is_reachability_failure());
        assert!(ProtocolError::HostUnreachable("10.0.0.9".into()).is_reachability_failure());
        assert!(!ProtocolError::AuthenticationFailed.is_reachability_failure());
        assert!(!ProtocolError::ConnectionFailed("HTTP 500".into()).is_reachability_failure());
    }
}
