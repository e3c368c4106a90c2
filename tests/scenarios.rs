//! End-to-end probe-sequence scenarios: a scripted prober drives the full
//! monitor → state machine → alert channel → webhook pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use http_monitor::{
    alert_channel, Alert, AlertKind, EndpointSpec, JobMonitor, LogLevel, LogSink, Notifier,
    ProbeOutcome, Prober,
};

struct SequenceProber {
    outcomes: Vec<ProbeOutcome>,
    step: AtomicUsize,
}

impl SequenceProber {
    fn new(outcomes: Vec<ProbeOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes,
            step: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Prober for SequenceProber {
    async fn probe(&self, _endpoint: &EndpointSpec) -> ProbeOutcome {
        let step = self.step.fetch_add(1, Ordering::SeqCst);
        let idx = step.min(self.outcomes.len() - 1);
        self.outcomes[idx].clone()
    }
}

fn endpoint() -> EndpointSpec {
    EndpointSpec {
        description: "main site".into(),
        method: String::new(),
        url: "https://example.com/health".into(),
        host: String::new(),
        content_type: String::new(),
        data: String::new(),
        interval_secs: 5,
        timeout_secs: None,
    }
}

fn buffered_sink() -> (LogSink, tokio::io::DuplexStream) {
    let (writer, reader) = tokio::io::duplex(64 * 1024);
    (LogSink::with_writer(Box::new(writer), LogLevel::Trace), reader)
}

async fn run_sequence(
    outcomes: Vec<ProbeOutcome>,
    num_polls: usize,
) -> (Vec<Alert>, LogSink, tokio::io::DuplexStream) {
    let prober = SequenceProber::new(outcomes);
    let (alert_tx, mut alert_rx) = alert_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (log, reader) = buffered_sink();

    let mut monitor = JobMonitor::new(endpoint(), prober, alert_tx, log.clone(), shutdown_rx);
    for _ in 0..num_polls {
        monitor.poll_once().await;
    }
    drop(monitor);

    let mut alerts = Vec::new();
    while let Ok(alert) = alert_rx.try_recv() {
        alerts.push(alert);
    }
    (alerts, log, reader)
}

fn fail(status: u16) -> ProbeOutcome {
    ProbeOutcome::http_failure(status)
}

fn ok() -> ProbeOutcome {
    ProbeOutcome::ok(200)
}

// interval 5s, endpoint returns 500 three times then 200: failure, failure,
// silent, recovery.
#[tokio::test]
async fn scenario_three_failures_then_recovery() {
    let (alerts, log, reader) =
        run_sequence(vec![fail(500), fail(500), fail(500), ok()], 4).await;

    let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![AlertKind::Failure, AlertKind::Failure, AlertKind::Recovery]
    );
    assert_eq!(alerts[0].status_code, 500);
    assert_eq!(alerts[2].status_code, 200);

    // The suppressed third failure is still probed and logged.
    log.shutdown().await;
    let mut out = String::new();
    let mut reader = reader;
    reader.read_to_string(&mut out).await.unwrap();
    assert_eq!(out.matches("probe failed").count(), 3);
}

#[tokio::test]
async fn scenario_always_healthy_never_alerts() {
    let (alerts, log, _reader) = run_sequence(vec![ok()], 50).await;
    assert!(alerts.is_empty());
    log.shutdown().await;
}

#[tokio::test]
async fn scenario_long_failure_run_caps_at_two_alerts() {
    let (alerts, log, _reader) = run_sequence(vec![fail(500)], 100).await;
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.kind == AlertKind::Failure));
    log.shutdown().await;
}

#[tokio::test]
async fn scenario_flapping_endpoint_realerts_each_episode() {
    let (alerts, log, _reader) = run_sequence(
        vec![fail(500), ok(), fail(502), ok(), fail(503), ok()],
        6,
    )
    .await;

    let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AlertKind::Failure,
            AlertKind::Recovery,
            AlertKind::Failure,
            AlertKind::Recovery,
            AlertKind::Failure,
            AlertKind::Recovery,
        ]
    );
    log.shutdown().await;
}

// Webhook rejects the alert with a non-zero errcode: the notifier logs it
// and the monitor keeps polling unaffected.
#[tokio::test]
async fn scenario_webhook_rejection_does_not_stop_monitoring() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"errcode": 1, "errmsg": "bad token"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let prober = SequenceProber::new(vec![fail(500)]);
    let (alert_tx, alert_rx) = alert_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (log, reader) = buffered_sink();

    let notifier = Notifier::new(
        alert_rx,
        format!("{}/hook", server.uri()),
        reqwest::Client::new(),
        log.clone(),
    );
    let notifier_handle = tokio::spawn(notifier.run());

    let mut monitor = JobMonitor::new(
        endpoint(),
        Arc::clone(&prober) as Arc<dyn Prober>,
        alert_tx.clone(),
        log.clone(),
        shutdown_rx,
    );
    for _ in 0..5 {
        monitor.poll_once().await;
    }
    assert_eq!(prober.step.load(Ordering::SeqCst), 5);

    drop(monitor);
    drop(alert_tx);
    tokio::time::timeout(Duration::from_secs(5), notifier_handle)
        .await
        .expect("notifier should drain and exit")
        .unwrap();

    log.shutdown().await;
    let mut out = String::new();
    let mut reader = reader;
    reader.read_to_string(&mut out).await.unwrap();
    assert_eq!(out.matches("bad token").count(), 2);
}

// Alerts flow all the way to a webhook that accepts them.
#[tokio::test]
async fn scenario_failure_alert_reaches_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"errcode": 0, "errmsg": ""})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (alert_tx, alert_rx) = alert_channel();
    let (log, _reader) = buffered_sink();
    let notifier = Notifier::new(
        alert_rx,
        format!("{}/hook", server.uri()),
        reqwest::Client::new(),
        log.clone(),
    );
    let notifier_handle = tokio::spawn(notifier.run());

    alert_tx
        .send(Alert::new(
            AlertKind::Failure,
            "main site",
            "https://example.com/health",
            500,
            "none",
        ))
        .unwrap();
    drop(alert_tx);

    tokio::time::timeout(Duration::from_secs(5), notifier_handle)
        .await
        .expect("notifier should exit")
        .unwrap();
    log.shutdown().await;
}

// Two monitors with disjoint probe histories keep independent state.
#[tokio::test]
async fn scenario_monitors_are_independent() {
    let failing = SequenceProber::new(vec![fail(500)]);
    let healthy = SequenceProber::new(vec![ok()]);

    let (alert_tx, mut alert_rx) = alert_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (log, _reader) = buffered_sink();

    let mut ep_a = endpoint();
    ep_a.description = "endpoint a".into();
    let mut ep_b = endpoint();
    ep_b.description = "endpoint b".into();

    let mut monitor_a = JobMonitor::new(
        ep_a,
        Arc::clone(&failing) as Arc<dyn Prober>,
        alert_tx.clone(),
        log.clone(),
        shutdown_rx.clone(),
    );
    let mut monitor_b = JobMonitor::new(
        ep_b,
        Arc::clone(&healthy) as Arc<dyn Prober>,
        alert_tx.clone(),
        log.clone(),
        shutdown_rx,
    );

    for _ in 0..4 {
        monitor_a.poll_once().await;
        monitor_b.poll_once().await;
    }

    let mut alerts = Vec::new();
    while let Ok(alert) = alert_rx.try_recv() {
        alerts.push(alert);
    }
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.description == "endpoint a"));
    log.shutdown().await;
}
