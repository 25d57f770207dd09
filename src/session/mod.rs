//! Session acquisition core: buffering, event aggregation, summaries and the
//! start/append/stop lifecycle.

pub mod buffer;
pub mod controller;
pub mod errors;
pub mod events;
pub mod state;
pub mod store;
pub mod summary;

pub use buffer::SessionBuffer;
pub use controller::{SessionManager, StatusSnapshot, StopOutcome};
pub use errors::{SessionError, StopError, SummaryError};
pub use events::{EventAggregator, EventState};
pub use state::SessionStatus;
pub use store::{MemoryStore, SessionStore};
pub use summary::{summarize, ChannelStats, SessionSummary};
