//! HTTP client for the npm registry with retry logic

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

use crate::api::PackageMetadataResponse;
use crate::RegistryResult;
use sonar_core::error::SonarError;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// HTTP client for npm registry metadata
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL, without trailing slash
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the public npm registry
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(None, RetryConfig::default())
    }

    /// Create registry client with custom configuration
    pub fn with_config(auth: Option<AuthConfig>, retry_config: RetryConfig) -> RegistryResult<Self> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("sonar/", env!("CARGO_PKG_VERSION")));

        if let Some(header) = auth.and_then(|auth| auth.header_value()) {
            let value = header.parse::<reqwest::header::HeaderValue>().map_err(|e| SonarError::Network {
                message: format!("Invalid registry credentials: {}", e),
                source: Some(Box::new(e)),
            })?;
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|e| SonarError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            retry_config,
            base_url: DEFAULT_REGISTRY.to_string(),
        })
    }

    /// Point the client at another registry
    pub fn with_base_url(mut self, base_url: &str) -> RegistryResult<Self> {
        url::Url::parse(base_url).map_err(|e| SonarError::ConfigValidation {
            field: "registry".to_string(),
            reason: format!("'{}' is not a valid URL: {}", base_url, e),
        })?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                // A missing package will not appear on retry
                Err(error) if !error.is_recoverable() => return Err(error),
                Err(error) if attempt >= self.retry_config.max_retries => return Err(error),
                Err(error) => {
                    debug!(attempt, error = %error, "Registry request failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }
    }

    /// Fetch package metadata with retry logic
    pub async fn fetch_metadata(&self, package_name: &str) -> RegistryResult<PackageMetadataResponse> {
        let url = format!("{}/{}", self.base_url, encode_package_name(package_name));

        self.with_retry(|| async {
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.npm.install-v1+json")
                .send()
                .await
                .map_err(|e| SonarError::network(format!("Failed to fetch {}", package_name), e))?;

            match response.status() {
                reqwest::StatusCode::OK => response
                    .json::<PackageMetadataResponse>()
                    .await
                    .map_err(|e| {
                        SonarError::network(format!("Failed to parse metadata for {}", package_name), e)
                    }),
                reqwest::StatusCode::NOT_FOUND => Err(SonarError::PackageNotFound {
                    name: package_name.to_string(),
                }),
                status => Err(SonarError::Network {
                    message: format!("Registry returned status {}: {}", status, package_name),
                    source: None,
                }),
            }
        })
        .await
    }

    /// Latest published version, or the highest version containing the
    /// canary tag. An unpublished package is `Ok(None)`.
    pub async fn resolve_version(
        &self,
        package_name: &str,
        canary: Option<&str>,
    ) -> RegistryResult<Option<String>> {
        let metadata = match self.fetch_metadata(&package_name.to_lowercase()).await {
            Ok(metadata) => metadata,
            Err(SonarError::PackageNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(match canary {
            Some(tag) => metadata.latest_canary(tag),
            None => metadata.latest().map(str::to_string),
        })
    }
}

impl AuthConfig {
    /// Value for the `Authorization` header, bearer token first
    fn header_value(self) -> Option<String> {
        use base64::{engine::general_purpose, Engine as _};

        if let Some(token) = self.token {
            return Some(format!("Bearer {}", token));
        }
        let (username, password) = (self.username?, self.password?);
        Some(format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", username, password))
        ))
    }
}

/// Encode package name for URL: `@org/pkg` becomes `@org%2fpkg`
fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}
