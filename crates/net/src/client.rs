//! HTTP client wrapper with upstream-friendly defaults

use repomirror_config::NetworkConfig;
use repomirror_errors::{Error, NetworkError};
use reqwest::{Client, Response};
use std::time::Duration;

/// Network client configuration
#[derive(Clone, Debug)]
pub struct NetConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Pool idle timeout
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Optional proxy URL applied to all requests
    pub proxy: Option<String>,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(360),
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("repomirror/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}

impl NetConfig {
    /// Build a `NetConfig` from the network section of the app configuration.
    #[must_use]
    pub fn from_network_config(network: &NetworkConfig) -> Self {
        Self {
            timeout: network.timeout(),
            connect_timeout: network.connect_timeout(),
            proxy: network.proxy.clone(),
            accept_invalid_certs: network.insecure,
            ..Self::default()
        }
    }
}

/// HTTP client for index and artifact fetching
#[derive(Clone, Debug)]
pub struct NetClient {
    client: Client,
}

impl NetClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the TLS backend
    /// fails to initialize.
    pub fn new(config: &NetConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                NetworkError::InvalidUrl(format!("invalid proxy {proxy}: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client })
    }

    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend fails to initialize.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(&NetConfig::default())
    }

    /// Perform a single GET request. No retries happen at this layer;
    /// callers decide whether a failure is worth another attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or times out.
    pub async fn get(&self, url: &str) -> Result<Response, Error> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| convert_reqwest_error(url, &e))
    }

    /// Access the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn convert_reqwest_error(url: &str, error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
        .into()
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string()).into()
    } else {
        NetworkError::DownloadFailed(error.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_config_default() {
        let config = NetConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(360));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("repomirror/"));
        assert!(config.proxy.is_none());
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_net_config_from_network_config() {
        let mut network = NetworkConfig::default();
        network.timeout_secs = 10;
        network.insecure = true;
        let config = NetConfig::from_network_config(&network);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_client_creation() {
        let client = NetClient::with_defaults();
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_rejects_bad_proxy() {
        let config = NetConfig {
            proxy: Some("not a url".to_string()),
            ..NetConfig::default()
        };
        assert!(NetClient::new(&config).is_err());
    }
}
