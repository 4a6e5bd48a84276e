use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("rask-client-logger/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub config: ClientConfig,
    pub endpoint_url: Url,
    pub stats: Arc<ClientStats>,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint_url: Url = config.endpoint.parse().map_err(|e| {
            ClientError::InvalidConfiguration(format!("Invalid endpoint URL: {}", e))
        })?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            endpoint_url,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}
