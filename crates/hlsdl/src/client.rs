use std::sync::Arc;

use reqwest::{Client, Proxy};
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::{debug, info};

use crate::{DownloadError, DownloaderConfig};

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    let provider = Arc::new(ring::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| DownloadError::TlsError(Box::new(e)))?
        .with_platform_verifier()
        .map_err(|e| DownloadError::TlsError(Box::new(e)))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(16)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    if !config.pool_idle_timeout.is_zero() {
        client_builder = client_builder.pool_idle_timeout(config.pool_idle_timeout);
    }

    if let Some(proxy_url) = &config.proxy {
        let proxy = Proxy::all(proxy_url)
            .map_err(|e| DownloadError::ProxyError(format!("{proxy_url}: {e}")))?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_url, "Using explicitly configured proxy");
    } else if config.use_system_proxy {
        // reqwest picks up system proxy settings unless no_proxy() is called
        debug!("Using system proxy settings");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled");
    }

    client_builder.build().map_err(DownloadError::from)
}
