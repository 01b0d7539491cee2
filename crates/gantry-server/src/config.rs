//! Server configuration.
//!
//! A [`Configuration`] is immutable once built and is handed to
//! [`Server::new`](crate::Server::new) explicitly; there is no process-wide
//! default value. The environment tag and TLS flag are cosmetic (they shape
//! startup logging, never correctness); the timeout knobs are applied to the
//! listening socket's connections.
//!
//! # Example
//!
//! ```rust
//! use gantry_server::Configuration;
//! use std::time::Duration;
//!
//! let config = Configuration::builder()
//!     .host("0.0.0.0")
//!     .port(3000)
//!     .read_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.address(), "0.0.0.0:3000");
//! ```

use std::time::Duration;

/// Default bind host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default idle (keep-alive) timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default request read timeout in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Default response write timeout in seconds.
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Deployment environment tag.
///
/// Affects only cosmetic startup/shutdown behavior, never correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Pre-production staging.
    Staging,
    /// Production.
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        };
        f.write_str(name)
    }
}

/// Immutable server configuration.
///
/// Use [`Configuration::builder()`] to construct instances.
#[derive(Debug, Clone)]
pub struct Configuration {
    environment: Environment,
    tls: bool,
    host: String,
    port: u16,
    idle_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Configuration {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Returns the environment tag.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns whether TLS termination is expected in front of the listener.
    #[must_use]
    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Returns the bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the bind port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the `host:port` address the listener binds.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the URL scheme implied by the TLS flag.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// Returns the idle (keep-alive) timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the request read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the response write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    environment: Environment,
    tls: bool,
    host: String,
    port: u16,
    idle_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl ConfigurationBuilder {
    /// Creates a builder with the default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            tls: false,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
        }
    }

    /// Sets the environment tag.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Marks the listener as TLS-terminated.
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the bind host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the bind port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the idle (keep-alive) timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the request read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the response write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Configuration {
        Configuration {
            environment: self.environment,
            tls: self.tls,
            host: self.host,
            port: self.port,
            idle_timeout: self.idle_timeout,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
