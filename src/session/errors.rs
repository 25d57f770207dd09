use std::sync::Arc;

use crate::models::SessionRecord;

/// Lifecycle misuse. Surfaced immediately and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a session is already active")]
    AlreadyActive,
    #[error("no active session")]
    NotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SummaryError {
    #[error("cannot summarize a session with no readings")]
    EmptyBuffer,
}

/// Everything `SessionManager::stop` can report.
///
/// `Persist` hands the finalized record back so the caller can retry the
/// store without re-recording the session.
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error("failed to persist session: {source}")]
    Persist {
        record: Arc<SessionRecord>,
        #[source]
        source: anyhow::Error,
    },
}

impl StopError {
    /// The finalized record, if the failure happened after finalization.
    pub fn into_record(self) -> Option<Arc<SessionRecord>> {
        match self {
            StopError::Persist { record, .. } => Some(record),
            _ => None,
        }
    }
}
