use crate::classify::FailureClass;
use crate::{Error, Result};
use reqwest::header::HeaderMap;
use std::env;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Thin HTTP client for one generation provider.
///
/// This is the unreliable operation the guard layer wraps: it performs a
/// single request and maps non-2xx responses into pre-classified
/// [`Error::Remote`] values so the retry condition can act on them.
#[derive(Debug)]
pub struct ProviderHttpClient {
    client: reqwest::Client,
    base_url: Url,
    provider: String,
    api_key: Option<String>,
}

impl ProviderHttpClient {
    /// Build a client for `provider` rooted at `base_url`.
    ///
    /// The API key is read from `<PROVIDER>_API_KEY` (dashes mapped to
    /// underscores); requests go out unauthenticated when it is unset.
    /// Timeouts and pool sizing are env-overridable with production
    /// defaults.
    pub fn new(provider: &str, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base url '{base_url}': {e}"),
                crate::ErrorContext::new().with_source("provider_http"),
            )
        })?;

        let timeout_secs: u64 = crate::config::env_or("AI_HTTP_TIMEOUT_SECS", 30);
        let pool_max_idle: usize = crate::config::env_or("AI_HTTP_POOL_MAX_IDLE_PER_HOST", 32);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(pool_max_idle)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(Error::Http)?;

        let api_key = Self::api_key_from_env(provider);

        Ok(Self {
            client,
            base_url,
            provider: provider.to_string(),
            api_key,
        })
    }

    fn api_key_from_env(provider: &str) -> Option<String> {
        let var = format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"));
        env::var(var).ok().filter(|k| !k.is_empty())
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid path '{path}': {e}"),
                crate::ErrorContext::new().with_source("provider_http"),
            )
        })
    }

    /// POST a JSON body (create a generation job, start a training run).
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut req = self.client.post(self.url(path)?).json(body);
        req = self.decorate(req);
        let resp = req.send().await.map_err(Error::Http)?;
        self.handle(resp).await
    }

    /// GET a JSON resource (poll job status, fetch a result).
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let mut req = self.client.get(self.url(path)?);
        req = self.decorate(req);
        let resp = req.send().await.map_err(Error::Http)?;
        self.handle(resp).await
    }

    /// Probe `path`; any 2xx counts as healthy, the body is discarded.
    pub async fn health_check(&self, path: &str) -> Result<()> {
        let mut req = self.client.get(self.url(path)?);
        req = self.decorate(req);
        let resp = req.send().await.map_err(Error::Http)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(self.remote_error(resp).await)
        }
    }

    fn decorate(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        // Correlation id; providers may ignore it, applications use it for linkage.
        req.header("x-request-id", Uuid::new_v4().to_string())
    }

    async fn handle(&self, resp: reqwest::Response) -> Result<serde_json::Value> {
        if resp.status().is_success() {
            return resp.json().await.map_err(Error::Http);
        }
        Err(self.remote_error(resp).await)
    }

    async fn remote_error(&self, resp: reqwest::Response) -> Error {
        let status = resp.status().as_u16();
        let retry_after_ms = retry_after_ms(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        let message: String = body.chars().take(512).collect();
        let class = FailureClass::from_http_status(status);
        Error::Remote {
            status,
            class: class.name().to_string(),
            message,
            retryable: class.retryable(),
            retry_after_ms,
        }
    }
}

/// Best-effort parsing of `Retry-After`.
///
/// Only the common `Retry-After: <seconds>` form is supported to avoid new deps.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    let secs: u64 = raw.parse().ok()?;
    Some(secs.saturating_mul(1000))
}
