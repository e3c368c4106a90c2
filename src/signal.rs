//! Process-signal handling.
//!
//! Maps OS termination signals to a single graceful-shutdown event. SIGHUP
//! and SIGQUIT are logged and ignored, matching long-running watchdog
//! behavior behind terminals and process managers.

use crate::logsink::LogSink;

/// Resolves when the process should shut down.
#[cfg(unix)]
pub async fn shutdown_signal(log: LogSink) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                log.sys("received SIGINT, shutting down").await;
                return;
            }
            _ = terminate.recv() => {
                log.sys("received SIGTERM, shutting down").await;
                return;
            }
            _ = hangup.recv() => {
                log.sys("received SIGHUP, ignoring").await;
            }
            _ = quit.recv() => {
                log.sys("received SIGQUIT, ignoring").await;
            }
        }
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal(log: LogSink) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    log.sys("received Ctrl+C, shutting down").await;
}
