//! Connectivity probes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Probe errors. Any error means "treat as offline".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe could not run.
    #[error("probe unavailable: {0}")]
    Unavailable(String),

    /// The probe did not answer in time.
    #[error("probe timed out")]
    Timeout,
}

/// Platform connectivity signal.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the remote work source is currently reachable.
    async fn probe(&self) -> Result<bool, ProbeError>;
}

/// Settable probe for tests and for hosts that push connectivity themselves.
///
/// Clones share state. Starts offline.
#[derive(Debug, Clone, Default)]
pub struct ManualProbe {
    online: Arc<AtomicBool>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl ManualProbe {
    /// Create a probe reporting `online`.
    pub fn new(online: bool) -> Self {
        let probe = Self::default();
        probe.set_online(online);
        probe
    }

    /// Change what the probe reports.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make the probe fail until cleared with `None`.
    pub fn set_failure(&self, error: Option<&str>) {
        *self.fail_with.lock().unwrap_or_else(PoisonError::into_inner) = error.map(str::to_string);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualProbe {
    async fn probe(&self) -> Result<bool, ProbeError> {
        let failure = self
            .fail_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match failure {
            Some(error) => Err(ProbeError::Unavailable(error)),
            None => Ok(self.online.load(Ordering::SeqCst)),
        }
    }
}

/// Probe that GETs the server's health endpoint.
///
/// Online means the endpoint answered with a success status.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Probe `{base_url}/health` with the given timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/health", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> Result<bool, ProbeError> {
        match self.client.get(&self.url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            // Connection refused, DNS failure and the like: plainly offline.
            Err(e) if e.is_connect() => {
                tracing::debug!("Health probe could not connect: {}", e);
                Ok(false)
            }
            Err(e) => Err(ProbeError::Unavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_probe_reports_what_it_is_told() {
        let probe = ManualProbe::new(false);
        assert!(!probe.probe().await.unwrap());

        let handle = probe.clone();
        handle.set_online(true);
        assert!(probe.probe().await.unwrap());
    }

    #[tokio::test]
    async fn manual_probe_failure_until_cleared() {
        let probe = ManualProbe::new(true);
        probe.set_failure(Some("radio off"));
        assert!(matches!(
            probe.probe().await,
            Err(ProbeError::Unavailable(_))
        ));

        probe.set_failure(None);
        assert!(probe.probe().await.unwrap());
    }

    #[tokio::test]
    async fn http_probe_against_closed_port_is_not_online() {
        let probe = HttpProbe::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
        assert_eq!(probe.url, "http://127.0.0.1:9/health");
        assert!(!matches!(probe.probe().await, Ok(true)));
    }
}
