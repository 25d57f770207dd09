use crate::models::Sample;

/// Append-only store for the samples of the active session.
///
/// Insertion order is preserved and nothing is ever rejected on content.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    samples: Vec<Sample>,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copies out the most recent `max_count` samples (all when `None`),
    /// oldest first. The copy is detached from later appends.
    pub fn snapshot(&self, max_count: Option<usize>) -> Vec<Sample> {
        let take = max_count.map_or(self.samples.len(), |n| n.min(self.samples.len()));
        self.samples[self.samples.len() - take..].to_vec()
    }

    pub fn all(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
