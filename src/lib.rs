#![forbid(unsafe_code)]

pub mod config;
pub mod logsink;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod signal;
pub mod supervisor;

pub use config::{AppConfig, ConfigError, EndpointSpec};
pub use logsink::{LogLevel, LogSink};
pub use monitor::{Alert, AlertDecision, AlertKind, AlertState, JobMonitor};
pub use notifier::{alert_channel, Notifier};
pub use probe::{HttpProber, ProbeOutcome, Prober};
pub use signal::shutdown_signal;
pub use supervisor::Supervisor;
