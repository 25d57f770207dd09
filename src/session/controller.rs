use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::{Sample, SessionId, SessionRecord};

use super::{
    errors::{SessionError, StopError, SummaryError},
    events::EventState,
    state::{SessionState, SessionStatus},
    store::SessionStore,
    summary::{summarize, SessionSummary},
};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub sample_count: usize,
}

/// Result of a successful `stop`.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub summary: SessionSummary,
    /// Set when the session was persisted.
    pub session_id: Option<SessionId>,
}

/// Owner of the one acquisition session of the process.
///
/// Cloning yields another handle to the same session; the state is shared.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        let started_at = Utc::now();
        self.state.lock().await.begin_session(started_at)?;
        info!("Session started at {}", started_at.to_rfc3339());
        Ok(())
    }

    pub async fn append(&self, sample: Sample) -> Result<(), SessionError> {
        self.state.lock().await.append(sample)
    }

    /// Most recent `max_count` samples of the active session, oldest first.
    /// Empty while idle.
    pub async fn snapshot(&self, max_count: Option<usize>) -> Vec<Sample> {
        self.state.lock().await.snapshot(max_count)
    }

    pub async fn current_state(&self) -> EventState {
        self.state.lock().await.current_event_state()
    }

    pub async fn status(&self) -> StatusSnapshot {
        let guard = self.state.lock().await;
        StatusSnapshot {
            status: guard.status(),
            started_at: guard.active().map(|session| session.started_at),
            sample_count: guard.active().map_or(0, |session| session.buffer.len()),
        }
    }

    /// Summary of the samples recorded so far, leaving the session open.
    pub async fn live_summary(&self) -> Result<SessionSummary, StopError> {
        let guard = self.state.lock().await;
        let session = guard.active().ok_or(SessionError::NotActive)?;
        Ok(summarize(session.buffer.all())?)
    }

    /// Closes the active session and finalizes it.
    ///
    /// The manager is idle once this returns, whatever the outcome. Empty
    /// sessions are never persisted.
    pub async fn stop(&self, persist: bool) -> Result<StopOutcome, StopError> {
        let closed = self.state.lock().await.close()?;
        let sample_count = closed.buffer.len();

        let summary = match summarize(closed.buffer.all()) {
            Ok(summary) => summary,
            Err(SummaryError::EmptyBuffer) => {
                info!("Discarding empty session started at {}", closed.started_at.to_rfc3339());
                return Err(SummaryError::EmptyBuffer.into());
            }
        };

        if !persist {
            info!("Session discarded ({sample_count} readings)");
            return Ok(StopOutcome {
                summary,
                session_id: None,
            });
        }

        let record = Arc::new(SessionRecord {
            summary: summary.clone(),
            samples: closed.buffer.into_samples(),
            created_at: Utc::now(),
            label: None,
        });

        let session_id = self.persist(record).await?;
        info!("Session {session_id} saved ({sample_count} readings)");

        Ok(StopOutcome {
            summary,
            session_id: Some(session_id),
        })
    }

    /// Hands a finalized record to the store. Also the retry path for a
    /// record returned in [`StopError::Persist`].
    pub async fn persist(&self, record: Arc<SessionRecord>) -> Result<SessionId, StopError> {
        match self.store.save_session(Arc::clone(&record)).await {
            Ok(id) => Ok(id),
            Err(source) => {
                error!("Failed to persist session: {source:#}");
                Err(StopError::Persist { record, source })
            }
        }
    }
}
