//! Monitor task supervision.
//!
//! A panicked monitor task would otherwise leave its endpoint silently
//! unwatched while the rest of the process keeps running. The supervisor
//! collects task handles and surfaces the first fault so the caller can log
//! it and terminate instead of limping along.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::{JoinError, JoinHandle};

#[derive(Default)]
pub struct Supervisor {
    tasks: FuturesUnordered<JoinHandle<()>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(future));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolves with the first task fault. Tasks that finish cleanly are
    /// discarded; once every task is done this pends forever, leaving the
    /// caller's other select branches in charge.
    pub async fn fault(&mut self) -> JoinError {
        loop {
            match self.tasks.next().await {
                Some(Ok(())) => continue,
                Some(Err(e)) => return e,
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Join every remaining task, returning the faults encountered.
    pub async fn join_all(&mut self) -> Vec<JoinError> {
        let mut faults = Vec::new();
        while let Some(result) = self.tasks.next().await {
            if let Err(e) = result {
                faults.push(e);
            }
        }
        faults
    }
}
