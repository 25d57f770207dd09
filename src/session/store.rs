use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{SessionId, SessionListing, SessionRecord};

/// Persistence collaborator for finished sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `record` and returns the identifier it was assigned.
    async fn save_session(&self, record: Arc<SessionRecord>) -> Result<SessionId>;

    /// Newest first, without sample data.
    async fn list_sessions(&self) -> Result<Vec<SessionListing>>;

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>>;
}

/// Store that keeps records in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<(SessionId, Arc<SessionRecord>)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SessionId, Arc<SessionRecord>)>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, record: Arc<SessionRecord>) -> Result<SessionId> {
        let id = SessionId::new();
        self.lock().push((id.clone(), record));
        Ok(id)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionListing>> {
        Ok(self
            .lock()
            .iter()
            .rev()
            .map(|(id, record)| SessionListing {
                id: id.clone(),
                created_at: record.created_at,
                label: record.label.clone(),
                summary: record.summary.clone(),
            })
            .collect())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self
            .lock()
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(_, record)| record.as_ref().clone()))
    }
}
