//! Probe transport.
//!
//! The [`Prober`] trait is the seam between the monitoring loop and the
//! network: the production implementation issues real HTTP requests, tests
//! substitute scripted outcomes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::EndpointSpec;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/63.0.3239.132 Safari/537.36 http-monitor/0.1";

/// Result of one probe cycle. Consumed immediately by the alert state
/// machine and then discarded.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub success: bool,
    /// HTTP status of the response; `None` when the transport itself failed.
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn ok(status: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status),
            error: None,
        }
    }

    pub fn http_failure(status: u16) -> Self {
        Self {
            success: false,
            status_code: Some(status),
            error: None,
        }
    }

    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: None,
            error: Some(reason.into()),
        }
    }

    /// Status code for alert text, with `-1` standing in for a transport
    /// failure that never produced a response.
    pub fn status_for_alert(&self) -> i32 {
        self.status_code.map(i32::from).unwrap_or(-1)
    }
}

/// Probes one endpoint and reports the outcome. Object-safe and
/// `Send + Sync` for sharing across monitor tasks.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &EndpointSpec) -> ProbeOutcome;
}

/// HTTP prober backed by a shared connection-pooled client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the shared client. No overall request timeout is set here; a
    /// deadline applies only to endpoints that configure `timeout_secs`.
    pub fn build_client() -> Client {
        Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(20)
            .build()
            .expect("Failed to build HTTP client")
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(Self::build_client())
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &EndpointSpec) -> ProbeOutcome {
        // POST only on the exact lowercase string; everything else is a GET.
        let mut req = if endpoint.method == "post" {
            self.client.post(&endpoint.url)
        } else {
            self.client.get(&endpoint.url)
        };

        req = req.header("User-Agent", USER_AGENT);
        if !endpoint.content_type.is_empty() {
            req = req.header("Content-Type", &endpoint.content_type);
        }
        if !endpoint.host.is_empty() {
            req = req.header("Host", &endpoint.host);
        }
        if !endpoint.data.is_empty() {
            req = req.body(endpoint.data.clone());
        }
        if let Some(secs) = endpoint.timeout_secs {
            req = req.timeout(Duration::from_secs(secs));
        }

        match req.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 {
                    debug!(url = %endpoint.url, "Probe ok");
                    ProbeOutcome::ok(status)
                } else {
                    warn!(url = %endpoint.url, status, "Probe returned error status");
                    ProbeOutcome::http_failure(status)
                }
            }
            Err(e) => {
                warn!(url = %endpoint.url, error = %e, "Probe transport error");
                ProbeOutcome::transport_failure(e.to_string())
            }
        }
    }
}
