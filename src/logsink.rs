//! Asynchronous log pipeline.
//!
//! Producers format records at submission time and push them onto a bounded
//! queue; a single consumer task writes them to the output in FIFO order, so
//! writes are totally ordered without any locking on the producer side. The
//! queue is the system's only backpressure point: when it is full, `submit`
//! waits for space instead of dropping records.

use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Timestamp format used for log lines and alert text.
pub const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const QUEUE_CAPACITY: usize = 1024;

/// Log severity. Lower ordinal means higher priority; a record is written
/// only when its level is at or below the sink's configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Sys = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
    Trace = 5,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Sys,
            1 => Self::Fatal,
            2 => Self::Error,
            3 => Self::Warn,
            4 => Self::Info,
            _ => Self::Trace,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sys => "sys",
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sys" => Ok(Self::Sys),
            "fatal" => Ok(Self::Fatal),
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "trace" | "debug" => Ok(Self::Trace),
            other => Err(format!(
                "unknown log level '{}': expected sys, fatal, error, warn, info, or trace",
                other
            )),
        }
    }
}

enum SinkMsg {
    Record(Vec<u8>),
    Shutdown,
}

/// Cloneable handle to the log pipeline.
///
/// All clones share the same queue, threshold, and consumer task. Call
/// [`LogSink::shutdown`] exactly once at process exit; submissions after
/// shutdown are silently dropped.
#[derive(Clone)]
pub struct LogSink {
    tx: mpsc::Sender<SinkMsg>,
    level: Arc<AtomicU8>,
    closed: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LogSink {
    /// Sink writing to standard output.
    pub fn stdout(level: LogLevel) -> Self {
        Self::with_writer(Box::new(tokio::io::stdout()), level)
    }

    /// Sink appending to a file, creating parent directories as needed.
    pub async fn file(path: &Path, level: LogLevel) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::with_writer(Box::new(file), level))
    }

    /// Sink writing to an arbitrary async writer. Used directly by tests.
    pub fn with_writer(
        mut writer: Box<dyn AsyncWrite + Send + Unpin>,
        level: LogLevel,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<SinkMsg>(QUEUE_CAPACITY);

        let task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    SinkMsg::Record(buf) => {
                        if let Err(e) = writer.write_all(&buf).await {
                            warn!(error = %e, "Log write failed");
                        }
                    }
                    SinkMsg::Shutdown => break,
                }
            }
            if let Err(e) = writer.flush().await {
                warn!(error = %e, "Log flush failed");
            }
            let _ = writer.shutdown().await;
            debug!("Log consumer stopped");
        });

        Self {
            tx,
            level: Arc::new(AtomicU8::new(level as u8)),
            closed: Arc::new(AtomicBool::new(false)),
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Enqueue one record. Records above the threshold are dropped here,
    /// before they ever touch the queue. Waits when the queue is full; after
    /// [`shutdown`](Self::shutdown) this is a no-op and never panics.
    pub async fn submit(&self, level: LogLevel, message: &str) {
        if level > self.level() {
            return;
        }
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let buf = format_record(level, message);
        let _ = self.tx.send(SinkMsg::Record(buf)).await;
    }

    pub async fn sys(&self, message: &str) {
        self.submit(LogLevel::Sys, message).await;
    }

    pub async fn error(&self, message: &str) {
        self.submit(LogLevel::Error, message).await;
    }

    pub async fn warn(&self, message: &str) {
        self.submit(LogLevel::Warn, message).await;
    }

    pub async fn info(&self, message: &str) {
        self.submit(LogLevel::Info, message).await;
    }

    pub async fn trace(&self, message: &str) {
        self.submit(LogLevel::Trace, message).await;
    }

    /// Log at fatal severity and drain the pipeline. The caller decides how
    /// to terminate afterwards; anything submitted later is dropped.
    pub async fn fatal(&self, message: &str) {
        self.submit(LogLevel::Fatal, message).await;
        self.shutdown().await;
    }

    /// Stop accepting records, wait for everything already queued to be
    /// written, then close the output. Idempotent.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(SinkMsg::Shutdown).await;
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

fn format_record(level: LogLevel, message: &str) -> Vec<u8> {
    let timestamp = Local::now().format(TIME_FORMAT);
    let mut buf = Vec::with_capacity(message.len() + 32);
    buf.extend_from_slice(format!("[{}]{} ", level.name(), timestamp).as_bytes());
    buf.extend_from_slice(message.as_bytes());
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
    buf
}
