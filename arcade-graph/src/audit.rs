//! The audit trail: recording and querying `accessed` edges.
use std::sync::Arc;

use arcade_repository::AuditRepository;
use arcade_shared::types::{AccessEvent, DataNodeId, UserAccessCount, UserId};
use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::errors::GraphError;

enum AuditCommand {
    Record(AccessEvent),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writer for access events.
///
/// Events are queued on an unbounded channel and appended by one background
/// task in the order they were recorded. Write failures are logged at
/// `error` level and otherwise dropped.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::UnboundedSender<AuditCommand>,
}

impl AuditRecorder {
    /// Spawns the writer task on the current runtime.
    ///
    /// The task stops once every clone of the recorder has been dropped and
    /// the queue is drained.
    pub fn spawn(repository: Arc<dyn AuditRepository>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(repository, rx));
        Self { tx }
    }

    /// Queues an event. Never blocks.
    pub fn record(&self, event: AccessEvent) {
        if let Err(mpsc::error::SendError(AuditCommand::Record(event))) =
            self.tx.send(AuditCommand::Record(event))
        {
            error!(
                user = %event.user,
                data_node = %event.data_node,
                endpoint = %event.endpoint,
                "Audit writer stopped; access not recorded"
            );
        }
    }

    /// Waits until every event recorded before this call has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(AuditCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run_writer(
    repository: Arc<dyn AuditRepository>,
    mut rx: mpsc::UnboundedReceiver<AuditCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            AuditCommand::Record(event) => {
                if let Err(e) = repository.append_access(&event).await {
                    error!(
                        user = %event.user,
                        data_node = %event.data_node,
                        endpoint = %event.endpoint,
                        error = %e,
                        "Failed to record access"
                    );
                }
            }
            AuditCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Read side of the audit log, for compliance reporting.
#[derive(Clone)]
pub struct AuditTrail {
    repository: Arc<dyn AuditRepository>,
}

impl AuditTrail {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Every access to `data_node`, oldest first.
    pub async fn history_for_data_node(
        &self,
        data_node: DataNodeId,
    ) -> Result<Vec<AccessEvent>, GraphError> {
        Ok(self.repository.history_for_data_node(data_node).await?)
    }

    /// Every access by `user`, oldest first.
    pub async fn history_for_user(&self, user: UserId) -> Result<Vec<AccessEvent>, GraphError> {
        Ok(self.repository.history_for_user(user).await?)
    }

    /// Access counts per user.
    pub async fn access_report(&self) -> Result<Vec<UserAccessCount>, GraphError> {
        Ok(self.repository.access_counts().await?)
    }
}
