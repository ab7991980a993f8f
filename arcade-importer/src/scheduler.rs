//! Periodic execution of the configured importers.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{ImportResult, Importer, RunContext};
use crate::errors::ImportError;

/// Runs every importer once per cycle, one task per data source, and sleeps
/// `interval` between cycles.
pub struct ImportScheduler {
    importers: Vec<Arc<dyn Importer>>,
    interval: Duration,
    run_deadline: Option<Duration>,
}

impl ImportScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            importers: Vec::new(),
            interval,
            run_deadline: None,
        }
    }

    pub fn with_run_deadline(mut self, run_deadline: Option<Duration>) -> Self {
        self.run_deadline = run_deadline;
        self
    }

    pub fn add(&mut self, importer: Arc<dyn Importer>) {
        self.importers.push(importer);
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Runs all importers concurrently and waits for every one of them.
    ///
    /// Cancelling `cancel` truncates the running importers; each saves its
    /// progress before returning.
    pub async fn run_cycle(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<Result<ImportResult, ImportError>> {
        let mut tasks = JoinSet::new();
        for importer in &self.importers {
            let importer = Arc::clone(importer);
            let ctx = RunContext::new()
                .with_cancel(cancel.child_token())
                .with_deadline(self.run_deadline.map(|d| Instant::now() + d));
            tasks.spawn(async move { importer.run(&ctx).await });
        }

        let mut results = Vec::with_capacity(self.importers.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    log_result(&result);
                    results.push(result);
                }
                Err(e) => error!(error = %e, "Importer task failed"),
            }
        }
        results
    }

    /// Runs cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            importers = self.importers.len(),
            interval_secs = self.interval.as_secs(),
            "Starting import scheduler"
        );
        loop {
            self.run_cycle(&cancel).await;
            if cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Import scheduler stopped");
    }
}

fn log_result(result: &Result<ImportResult, ImportError>) {
    match result {
        Ok(result) => info!(
            source = %result.source,
            status = ?result.status,
            created = result.created,
            deduplicated = result.deduplicated,
            skipped = result.skipped.len(),
            "Import finished"
        ),
        Err(e @ ImportError::AlreadyRunning(_)) => warn!(error = %e, "Import skipped"),
        Err(e) => error!(error = %e, "Import failed"),
    }
}
