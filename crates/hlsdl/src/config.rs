use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// HTTP client options shared by playlist and segment requests.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for a single HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// How long idle pooled connections are kept around
    pub pool_idle_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Headers sent with every request; custom headers override the defaults
    pub headers: HeaderMap,

    /// Explicit proxy URL (http://, https:// or socks5://)
    pub proxy: Option<String>,

    /// Whether to use system proxy settings when no explicit proxy is set
    pub use_system_proxy: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            // Segments can be large, so only stalls are bounded by default.
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    /// Browser-like headers. Accept-Encoding is left to reqwest so that
    /// transparent decompression stays enabled.
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers
    }
}
