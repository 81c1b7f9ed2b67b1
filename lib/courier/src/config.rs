//! Transport and per-call configuration.

use std::time::Duration;

use courier_core::{Cookies, File, FormData, Header, PathParams, QueryParams};

/// Configuration of the hyper transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a single exchange, on top of the client or request
    /// timeout. `None` leaves the deadline to those.
    pub timeout: Option<Duration>,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl TransportConfigBuilder {
    /// Set the exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout: self.timeout.or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}

/// Settings applied to one request by [`Client::send`](crate::Client::send)
/// and [`courier::send`](crate::send).
///
/// Headers, parameters, cookies and form fields replace request values with
/// the same key. A key given several values keeps them all. A JSON body wins over form
/// fields and files.
#[derive(Debug, Default)]
pub struct Config {
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Referer override.
    pub referer: Option<String>,
    /// Headers.
    pub header: Header,
    /// Query parameters.
    pub params: QueryParams,
    /// Cookies.
    pub cookies: Cookies,
    /// Path parameters.
    pub path_params: PathParams,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// JSON body.
    pub json: Option<serde_json::Value>,
    /// Form fields, url-encoded or multipart when files are present.
    pub form_data: FormData,
    /// Files to upload.
    pub files: Vec<File>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_idle_per_host, 32);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn builder_overrides() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(4)
            .build();

        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_idle_per_host, 4);
    }
}
