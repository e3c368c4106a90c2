use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use http_monitor::config::AppConfig;
use http_monitor::logsink::{LogLevel, LogSink};
use http_monitor::monitor::JobMonitor;
use http_monitor::notifier::{alert_channel, Notifier};
use http_monitor::probe::{HttpProber, Prober};
use http_monitor::signal::shutdown_signal;
use http_monitor::supervisor::Supervisor;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Leak is fine — called once, lives for the program's lifetime.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// HTTP endpoint watchdog — probe endpoints, alert on failure and recovery.
#[derive(Parser)]
#[command(name = "http-monitor", version = version_string(), about)]
struct Cli {
    /// Path to JSON or TOML config file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log severity threshold (sys, fatal, error, warn, info, trace).
    #[arg(long, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    print_summary(&config);

    let log = match &config.log {
        Some(path) => match LogSink::file(path, cli.log_level).await {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to open log file");
                std::process::exit(1);
            }
        },
        None => LogSink::stdout(cli.log_level),
    };

    // Get unhandled faults on the record at the panic site; the supervisor
    // below turns a panicked monitor task into a process exit.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("unhandled panic: {}", info);
        default_hook(info);
    }));

    let client = HttpProber::build_client();
    let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(client.clone()));

    let (alert_tx, alert_rx) = alert_channel();
    let notifier = Notifier::new(alert_rx, config.webhook.clone(), client, log.clone());
    let notifier_handle = tokio::spawn(notifier.run());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut supervisor = Supervisor::new();
    for endpoint in &config.endpoints {
        let monitor = JobMonitor::new(
            endpoint.clone(),
            Arc::clone(&prober),
            alert_tx.clone(),
            log.clone(),
            shutdown_rx.clone(),
        );
        supervisor.spawn(monitor.run());
    }
    log.sys(&format!("started {} monitors", supervisor.len()))
        .await;

    // A panicked monitor leaves its endpoint unwatched; exit rather than
    // run on with partial coverage.
    tokio::select! {
        _ = shutdown_signal(log.clone()) => {}
        fault = supervisor.fault() => {
            log.fatal(&format!("monitor task panicked: {}", fault)).await;
            std::process::exit(1);
        }
    }

    // Monitors first, then the alert channel drains, then the log flushes.
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, supervisor.join_all()).await {
        Ok(faults) => {
            for fault in faults {
                log.error(&format!("monitor task failed: {}", fault)).await;
            }
        }
        Err(_) => {
            log.warn("monitors did not stop within the grace period").await;
        }
    }

    drop(alert_tx);
    match tokio::time::timeout(SHUTDOWN_GRACE, notifier_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log.error(&format!("alert dispatcher failed: {}", e)).await;
        }
        Err(_) => {
            log.warn("alert dispatcher did not drain within the grace period")
                .await;
        }
    }

    log.sys("shutdown complete").await;
    log.shutdown().await;
}

fn print_summary(config: &AppConfig) {
    println!(
        "{} {}",
        style("http-monitor").bold(),
        style(version_string()).dim()
    );
    println!(
        "  {} {}",
        style("webhook:").dim(),
        if config.webhook.is_empty() {
            "(none)"
        } else {
            config.webhook.as_str()
        }
    );
    if let Some(ref path) = config.log {
        println!("  {} {}", style("log:    ").dim(), path.display());
    }
    for (i, ep) in config.endpoints.iter().enumerate() {
        let method = if ep.method == "post" { "POST" } else { "GET" };
        let target = if ep.url.is_empty() {
            "(disabled)"
        } else {
            ep.url.as_str()
        };
        println!(
            "  {} {} {} every {}s",
            style(format!("job {}:", i)).dim(),
            method,
            target,
            ep.interval_secs
        );
    }
    println!();
}
