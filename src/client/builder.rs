//! Client configuration and builder.
//!
//! Provides [`ClientConfig`], the recognized construction options, and a
//! fluent [`ClientBuilder`] for creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use wsmux::Client;
//!
//! # async fn example() -> wsmux::Result<()> {
//! let client = Client::builder()
//!     .uri("wss://example.com/ws/session")
//!     .retry(true)
//!     .retry_delay(1.0)
//!     .build()?;
//!
//! client.start()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::backoff::{DEFAULT_RETRY_DELAY_SECS, MAX_RETRY_DELAY_SECS};
use crate::transport::{Connector, WsConnector};

use super::core::Client;

// ============================================================================
// ClientConfig
// ============================================================================

/// Construction options for a [`Client`].
///
/// Deserializes from `{"uri": ..., "retry": ..., "retry_delay": ...}`;
/// missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target endpoint address (`ws://` or `wss://`).
    ///
    /// A missing URI is reported on the empty channel when a connection is
    /// first needed, not at build time.
    pub uri: Option<String>,

    /// Reconnect automatically after unclean closures.
    pub retry: bool,

    /// Base backoff delay in seconds.
    pub retry_delay: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: None,
            retry: true,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not a valid configuration object
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `retry_delay` is not a positive finite
    /// number or exceeds the [`MAX_RETRY_DELAY_SECS`] ceiling.
    pub fn validate(&self) -> Result<()> {
        if !self.retry_delay.is_finite() || self.retry_delay <= 0.0 {
            return Err(Error::config(format!(
                "retry_delay must be a positive number of seconds, got {}",
                self.retry_delay
            )));
        }
        if self.retry_delay > MAX_RETRY_DELAY_SECS {
            return Err(Error::config(format!(
                "retry_delay must not exceed {MAX_RETRY_DELAY_SECS} seconds, got {}",
                self.retry_delay
            )));
        }
        Ok(())
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct ClientBuilder {
    /// Accumulated options.
    config: ClientConfig,
    /// Transport override.
    connector: Option<Arc<dyn Connector>>,
}

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            connector: None,
        }
    }

    /// Sets the target endpoint.
    #[inline]
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = Some(uri.into());
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn retry(mut self, retry: bool) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the base backoff delay in seconds.
    #[inline]
    #[must_use]
    pub fn retry_delay(mut self, seconds: f64) -> Self {
        self.config.retry_delay = seconds;
        self
    }

    /// Replaces the WebSocket transport.
    ///
    /// Defaults to [`WsConnector`].
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Returns the accumulated configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates the configuration and spawns the client's event loop.
    ///
    /// Must be called from within a Tokio runtime. No connection is made
    /// until [`Client::start`] or [`Client::send`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is out of range.
    pub fn build(self) -> Result<Client> {
        self.config.validate()?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector) as Arc<dyn Connector>);

        Ok(Client::spawn(self.config, connector))
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.uri.is_none());
        assert!(config.retry);
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY_SECS);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ClientConfig::from_json(r#"{"uri":"wss://x"}"#).expect("parse");
        assert_eq!(config.uri.as_deref(), Some("wss://x"));
        assert!(config.retry);
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY_SECS);
    }

    #[test]
    fn test_from_json_all_keys() {
        let config =
            ClientConfig::from_json(r#"{"uri":"ws://h/ws","retry":false,"retry_delay":2.5}"#)
                .expect("parse");
        assert!(!config.retry);
        assert_eq!(config.retry_delay, 2.5);
    }

    #[test]
    fn test_from_json_rejects_bad_delay() {
        let err = ClientConfig::from_json(r#"{"retry_delay":0}"#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = ClientConfig::from_json(r#"{"retry_delay":"soon"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_builder_sets_options() {
        let builder = ClientBuilder::new()
            .uri("wss://x")
            .retry(false)
            .retry_delay(3.0);

        assert_eq!(builder.config().uri.as_deref(), Some("wss://x"));
        assert!(!builder.config().retry);
        assert_eq!(builder.config().retry_delay, 3.0);
    }

    #[test]
    fn test_build_rejects_negative_delay() {
        let err = ClientBuilder::new().retry_delay(-1.0).build().unwrap_err();
        assert!(err.to_string().contains("retry_delay"));
    }

    #[test]
    fn test_rejects_delay_above_ceiling() {
        let err = ClientConfig::from_json(r#"{"uri":"ws://127.0.0.1:1","retry_delay":1e20}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = ClientBuilder::new()
            .uri("ws://127.0.0.1:1")
            .retry_delay(1e20)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must not exceed"));

        let config = ClientConfig {
            retry_delay: MAX_RETRY_DELAY_SECS,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ClientBuilder::new().uri("wss://x");
        let cloned = builder.clone();
        assert_eq!(builder.config(), cloned.config());
    }
}
