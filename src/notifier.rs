//! Webhook alert delivery.
//!
//! Monitors push [`Alert`]s through an mpsc channel; the [`Notifier`] reads
//! from that channel, logs each alert, and POSTs it to the configured
//! webhook. Delivery failures are logged and swallowed — a lost notification
//! never stops or restarts monitoring.

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::logsink::LogSink;
use crate::monitor::alert::Alert;

/// Acknowledgement body the webhook endpoint replies with.
#[derive(Debug, Deserialize)]
struct WebhookAck {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

pub fn alert_channel() -> (mpsc::UnboundedSender<Alert>, mpsc::UnboundedReceiver<Alert>) {
    mpsc::unbounded_channel()
}

/// Asynchronous alert dispatcher.
///
/// Spawned as a background task; exits once every alert sender is dropped
/// and the channel is drained.
pub struct Notifier {
    rx: mpsc::UnboundedReceiver<Alert>,
    webhook_url: String,
    client: Client,
    log: LogSink,
}

impl Notifier {
    pub fn new(
        rx: mpsc::UnboundedReceiver<Alert>,
        webhook_url: String,
        client: Client,
        log: LogSink,
    ) -> Self {
        Self {
            rx,
            webhook_url,
            client,
            log,
        }
    }

    pub async fn run(mut self) {
        debug!(url = %self.webhook_url, "Alert dispatcher started");
        while let Some(alert) = self.rx.recv().await {
            self.notify(&alert.render()).await;
        }
        debug!("Alert dispatcher shutting down");
    }

    /// Log the message at error severity, then deliver it to the webhook.
    /// Every failure mode ends here; callers never see an error.
    pub async fn notify(&self, message: &str) {
        self.log.error(message).await;

        if self.webhook_url.is_empty() {
            debug!("No webhook configured, alert logged only");
            return;
        }

        let payload = serde_json::json!({
            "msgtype": "text",
            "text": { "content": message },
        });

        let response = match self
            .client
            .post(&self.webhook_url)
            .header("Cache-Control", "no-cache")
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                self.log
                    .error(&format!("webhook delivery failed: {}", e))
                    .await;
                return;
            }
        };

        let ack: WebhookAck = match response.json().await {
            Ok(a) => a,
            Err(e) => {
                self.log
                    .error(&format!("webhook response unreadable: {}", e))
                    .await;
                return;
            }
        };

        if ack.errcode != 0 {
            self.log
                .error(&format!(
                    "webhook rejected alert: errcode {} errmsg {}",
                    ack.errcode, ack.errmsg
                ))
                .await;
        }
    }
}
