//! Per-endpoint monitoring loop.
//!
//! One task per configured endpoint: probe, feed the outcome to the alert
//! state machine, push any resulting alert down the channel, sleep for the
//! configured interval. Monitors share nothing with each other; shutdown is
//! observed between cycles, so an in-flight probe is never interrupted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::debug;

use crate::config::EndpointSpec;
use crate::logsink::LogSink;
use crate::monitor::alert::{Alert, AlertDecision, AlertKind, AlertState};
use crate::probe::{ProbeOutcome, Prober};

pub struct JobMonitor {
    endpoint: EndpointSpec,
    state: AlertState,
    prober: Arc<dyn Prober>,
    alert_tx: UnboundedSender<Alert>,
    log: LogSink,
    shutdown: watch::Receiver<bool>,
}

impl JobMonitor {
    pub fn new(
        endpoint: EndpointSpec,
        prober: Arc<dyn Prober>,
        alert_tx: UnboundedSender<Alert>,
        log: LogSink,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            endpoint,
            state: AlertState::new(),
            prober,
            alert_tx,
            log,
            shutdown,
        }
    }

    /// Run until shutdown. An endpoint without a URL is a configured no-op:
    /// the monitor logs once and exits without ever probing.
    pub async fn run(mut self) {
        if self.endpoint.url.is_empty() {
            self.log
                .sys(&format!(
                    "{}: no URL configured, monitor disabled",
                    self.endpoint.description
                ))
                .await;
            return;
        }

        self.log
            .info(&format!(
                "{}: monitoring {} every {}s",
                self.endpoint.description, self.endpoint.url, self.endpoint.interval_secs
            ))
            .await;

        loop {
            self.poll_once().await;

            let interval = Duration::from_secs(self.endpoint.interval_secs);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.shutdown.changed() => {
                    self.log
                        .sys(&format!("{}: monitor stopped", self.endpoint.description))
                        .await;
                    break;
                }
            }
        }
    }

    /// One probe cycle without the sleep. Also the test entry point.
    pub async fn poll_once(&mut self) {
        let outcome = self.prober.probe(&self.endpoint).await;

        if outcome.success {
            self.log
                .trace(&format!("{}: probe ok", self.endpoint.description))
                .await;
        } else {
            self.log
                .warn(&format!(
                    "{}: probe failed, status {}{}",
                    self.endpoint.description,
                    outcome.status_for_alert(),
                    outcome
                        .error
                        .as_deref()
                        .map(|e| format!(" ({})", e))
                        .unwrap_or_default()
                ))
                .await;
        }

        match self.state.apply(&outcome) {
            AlertDecision::Notify(kind) => {
                let alert = self.build_alert(kind, &outcome);
                if self.alert_tx.send(alert).is_err() {
                    debug!(
                        endpoint = %self.endpoint.description,
                        "Alert channel closed, dropping alert"
                    );
                }
            }
            AlertDecision::Silent => {}
        }
    }

    fn build_alert(&self, kind: AlertKind, outcome: &ProbeOutcome) -> Alert {
        let detail = match kind {
            AlertKind::Failure => outcome
                .error
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            AlertKind::Recovery => String::new(),
        };
        Alert::new(
            kind,
            &self.endpoint.description,
            &self.endpoint.url,
            outcome.status_for_alert(),
            detail,
        )
    }
}
