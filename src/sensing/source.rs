use async_trait::async_trait;

use crate::models::Sample;

/// Anything that yields samples for the session manager.
///
/// Implementations return one batch per call (one sample per channel for the
/// bundled sources) and `None` once the stream has ended.
#[async_trait]
pub trait SampleSource: Send {
    async fn produce_next(&mut self) -> Option<Vec<Sample>>;

    /// Short name for log lines.
    fn describe(&self) -> &'static str;
}
