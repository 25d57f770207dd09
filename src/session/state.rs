use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Sample;

use super::{
    buffer::SessionBuffer,
    errors::SessionError,
    events::{EventAggregator, EventState},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
}

/// The session currently being recorded. Exists only between start and stop.
#[derive(Debug)]
pub struct ActiveSession {
    pub started_at: DateTime<Utc>,
    pub buffer: SessionBuffer,
    pub events: EventAggregator,
}

impl ActiveSession {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            buffer: SessionBuffer::new(),
            events: EventAggregator::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    active: Option<ActiveSession>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        if self.active.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::Idle
        }
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn begin_session(&mut self, started_at: DateTime<Utc>) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }
        self.active = Some(ActiveSession::new(started_at));
        Ok(())
    }

    pub fn append(&mut self, sample: Sample) -> Result<(), SessionError> {
        let session = self.active.as_mut().ok_or(SessionError::NotActive)?;
        session.events.observe(&sample);
        session.buffer.append(sample);
        Ok(())
    }

    /// Moves the active session out, returning the state to idle.
    pub fn close(&mut self) -> Result<ActiveSession, SessionError> {
        self.active.take().ok_or(SessionError::NotActive)
    }

    pub fn snapshot(&self, max_count: Option<usize>) -> Vec<Sample> {
        self.active
            .as_ref()
            .map(|session| session.buffer.snapshot(max_count))
            .unwrap_or_default()
    }

    pub fn current_event_state(&self) -> EventState {
        self.active
            .as_ref()
            .map(|session| session.events.current_state())
            .unwrap_or_else(EventState::inactive)
    }
}
