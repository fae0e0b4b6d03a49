//! Endpoint resolution for the chat server.
//!
//! Resolves the WebSocket URL the client connects to. The resolution
//! order mirrors typical deployments:
//!
//! 1. Explicit WebSocket URL override
//! 2. Derived from an API base URL (`http` → `ws`, `https` → `wss`)
//! 3. Derived from a deployment origin (same mapping)
//! 4. Local development default (`ws://localhost:5000`)
//!
//! The connection lifecycle never resolves URLs itself; it is handed
//! the resolved string.
//!
//! # Example
//!
//! ```
//! use wirechat::Endpoint;
//!
//! # fn example() -> wirechat::Result<()> {
//! let endpoint = Endpoint::new().with_api_url("https://chat.example.com");
//! assert_eq!(endpoint.ws_url()?, "wss://chat.example.com");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default WebSocket URL for local development.
pub const DEFAULT_WS_URL: &str = "ws://localhost:5000";

/// Default API URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

// ============================================================================
// Endpoint
// ============================================================================

/// Chat server endpoint configuration.
///
/// All fields are optional; an empty `Endpoint` resolves to the local
/// development defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    /// Explicit WebSocket URL override.
    ws_override: Option<String>,

    /// API base URL to derive the WebSocket URL from.
    api_url: Option<String>,

    /// Deployment origin (e.g. the page the client is served from).
    origin: Option<String>,
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Endpoint {
    /// Creates an endpoint with no configuration (local defaults).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit WebSocket URL, bypassing derivation.
    #[inline]
    #[must_use]
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_override = Some(url.into());
        self
    }

    /// Sets the API base URL to derive the WebSocket URL from.
    #[inline]
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the deployment origin as a derivation fallback.
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl Endpoint {
    /// Resolves the WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a configured API URL or origin
    /// cannot be parsed.
    pub fn ws_url(&self) -> Result<String> {
        if let Some(ref url) = self.ws_override {
            return Ok(url.clone());
        }

        if let Some(ref api) = self.api_url {
            return derive_ws_url(api);
        }

        if let Some(ref origin) = self.origin {
            return derive_ws_url(origin);
        }

        Ok(DEFAULT_WS_URL.to_string())
    }

    /// Resolves the API base URL.
    #[inline]
    #[must_use]
    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Validates that both resolved URLs parse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid URL.
    pub fn validate(&self) -> Result<()> {
        let ws = self.ws_url()?;
        Url::parse(&ws).map_err(|e| Error::config(format!("Invalid WebSocket URL {ws}: {e}")))?;

        let api = self.api_url();
        Url::parse(&api).map_err(|e| Error::config(format!("Invalid API URL {api}: {e}")))?;

        Ok(())
    }
}

/// Maps an HTTP(S) base URL to its WebSocket counterpart on the same host.
fn derive_ws_url(base: &str) -> Result<String> {
    let parsed =
        Url::parse(base).map_err(|e| Error::config(format!("Invalid base URL {base}: {e}")))?;

    let scheme = match parsed.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::config(format!(
                "Cannot derive WebSocket URL from scheme: {other}"
            )));
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::config(format!("Base URL has no host: {base}")))?;

    match parsed.port() {
        Some(port) => Ok(format!("{scheme}://{host}:{port}")),
        None => Ok(format!("{scheme}://{host}")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolves_localhost() {
        let endpoint = Endpoint::new();
        assert_eq!(endpoint.ws_url().expect("resolve"), DEFAULT_WS_URL);
        assert_eq!(endpoint.api_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_override_wins() {
        let endpoint = Endpoint::new()
            .with_ws_url("ws://override:9000")
            .with_api_url("https://ignored.example.com");

        assert_eq!(endpoint.ws_url().expect("resolve"), "ws://override:9000");
    }

    #[test]
    fn test_derive_from_http_api() {
        let endpoint = Endpoint::new().with_api_url("http://chat.example.com:8080");
        assert_eq!(
            endpoint.ws_url().expect("resolve"),
            "ws://chat.example.com:8080"
        );
    }

    #[test]
    fn test_derive_from_https_api() {
        let endpoint = Endpoint::new().with_api_url("https://chat.example.com");
        assert_eq!(endpoint.ws_url().expect("resolve"), "wss://chat.example.com");
    }

    #[test]
    fn test_derive_from_origin() {
        let endpoint = Endpoint::new().with_origin("https://app.example.com");
        assert_eq!(endpoint.ws_url().expect("resolve"), "wss://app.example.com");
    }

    #[test]
    fn test_api_url_preferred_over_origin() {
        let endpoint = Endpoint::new()
            .with_api_url("http://api.example.com")
            .with_origin("https://app.example.com");

        assert_eq!(endpoint.ws_url().expect("resolve"), "ws://api.example.com");
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let endpoint = Endpoint::new().with_api_url("not a url");
        assert!(endpoint.ws_url().is_err());
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let endpoint = Endpoint::new().with_api_url("ftp://chat.example.com");
        assert!(endpoint.ws_url().is_err());
    }

    #[test]
    fn test_validate_default() {
        assert!(Endpoint::new().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_override() {
        let endpoint = Endpoint::new().with_ws_url("::not-a-url::");
        assert!(endpoint.validate().is_err());
    }
}
