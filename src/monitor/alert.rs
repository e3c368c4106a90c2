//! Failure/recovery detection and alert deduplication.
//!
//! Each endpoint carries an [`AlertState`]: a two-state machine (healthy,
//! failing) with a bounded repeat counter. Transitions are edge-triggered
//! except that the first two probes of a failure episode each produce an
//! alert; from the third consecutive failure on, the episode stays silent
//! until a recovery resets it.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logsink::TIME_FORMAT;
use crate::probe::ProbeOutcome;

/// Notifications per failure episode before suppression kicks in, plus one.
/// `notified < MAX_NOTIFICATIONS` allows exactly two failure alerts; the
/// third and later consecutive failures are not re-alerted.
const MAX_NOTIFICATIONS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Failure,
    Recovery,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failure => write!(f, "failure"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

/// An outbound notification describing a failure or recovery event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub description: String,
    pub url: String,
    /// HTTP status of the triggering probe, `-1` on transport failure.
    pub status_code: i32,
    pub detail: String,
}

impl Alert {
    pub fn new(
        kind: AlertKind,
        description: impl Into<String>,
        url: impl Into<String>,
        status_code: i32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            description: description.into(),
            url: url.into(),
            status_code,
            detail: detail.into(),
        }
    }

    /// Human-readable text sent as the webhook message body.
    pub fn render(&self) -> String {
        let timestamp = self.timestamp.with_timezone(&Local).format(TIME_FORMAT);
        match self.kind {
            AlertKind::Failure => format!(
                "{} is failing\nURL: {}\nStatusCode: {}\nError: {}\nTime: {}",
                self.description, self.url, self.status_code, self.detail, timestamp
            ),
            AlertKind::Recovery => format!(
                "{} recovered\nURL: {}\nStatusCode: {}\nTime: {}",
                self.description, self.url, self.status_code, timestamp
            ),
        }
    }
}

/// What the monitor should do with the probe it just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    Notify(AlertKind),
    Silent,
}

/// Per-endpoint alert state. Owned by a single monitor task; never shared.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    failing: bool,
    notified: u32,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_failing(&self) -> bool {
        self.failing
    }

    /// Advance the state machine by one probe outcome.
    pub fn apply(&mut self, outcome: &ProbeOutcome) -> AlertDecision {
        if !outcome.success {
            self.failing = true;
            self.notified = self.notified.saturating_add(1);
            if self.notified < MAX_NOTIFICATIONS {
                AlertDecision::Notify(AlertKind::Failure)
            } else {
                AlertDecision::Silent
            }
        } else if self.failing {
            self.failing = false;
            self.notified = 0;
            AlertDecision::Notify(AlertKind::Recovery)
        } else {
            AlertDecision::Silent
        }
    }
}
