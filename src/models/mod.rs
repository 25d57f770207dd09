pub mod record;
pub mod sample;

pub use record::{SessionId, SessionListing, SessionRecord};
pub use sample::{Channel, Sample};
