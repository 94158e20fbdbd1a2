//! # Builder for DownloaderConfig
//!
//! Fluent construction of [`DownloaderConfig`] values.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hlsdl_engine::DownloaderConfig;
//!
//! let config = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_user_agent("MyApp/1.0")
//!     .with_header("Referer", "https://example.com/")
//!     .with_proxy("socks5://127.0.0.1:1080")
//!     .build();
//!
//! assert_eq!(config.user_agent, "MyApp/1.0");
//! assert!(!config.use_system_proxy);
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::DownloaderConfig;

/// Builder for creating DownloaderConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DownloaderConfig::default(),
        }
    }

    /// Set the overall timeout for a single HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout (maximum time between receiving data chunks)
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            name.as_ref().parse::<HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.config.headers.insert(name, value);
            }
            _ => warn!(name = name.as_ref(), "Ignoring invalid header"),
        }
        self
    }

    /// Merge headers on top of the current set; entries in `headers` win.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Route every request through an explicit proxy
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self.config.use_system_proxy = false; // Explicit proxy overrides system proxy
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}

impl Default for DownloaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = DownloaderConfigBuilder::new().build();
        assert!(config.timeout.is_zero());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert!(config.follow_redirects);
        assert!(config.use_system_proxy);
        assert!(config.proxy.is_none());
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_builder_customization() {
        let config = DownloaderConfigBuilder::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_read_timeout(Duration::from_secs(45))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_system_proxy(false)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.read_timeout, Duration::from_secs(45));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert!(!config.use_system_proxy);

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_custom_headers_override_defaults() {
        let mut custom = HeaderMap::new();
        custom.insert(reqwest::header::ACCEPT, HeaderValue::from_static("video/*"));
        custom.insert(
            reqwest::header::REFERER,
            HeaderValue::from_static("https://example.com/"),
        );

        let config = DownloaderConfigBuilder::new().with_headers(custom).build();

        assert_eq!(config.headers.get("accept").unwrap(), "video/*");
        assert_eq!(config.headers.get("referer").unwrap(), "https://example.com/");
        // untouched defaults survive the merge
        assert!(config.headers.contains_key("accept-language"));
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let config = DownloaderConfigBuilder::new()
            .with_header("bad header", "value")
            .build();
        assert!(!config.headers.contains_key("bad header"));
    }

    #[test]
    fn test_proxy_disables_system_proxy() {
        let config = DownloaderConfigBuilder::new()
            .with_proxy("http://proxy.example.com:8080")
            .with_system_proxy(true)
            .build();

        assert_eq!(config.proxy.as_deref(), Some("http://proxy.example.com:8080"));
        assert!(!config.use_system_proxy);
    }
}
