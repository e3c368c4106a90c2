pub mod alert;
pub mod job;

pub use alert::{Alert, AlertDecision, AlertKind, AlertState};
pub use job::JobMonitor;
