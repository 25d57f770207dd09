use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Channel, Sample};

use super::errors::SummaryError;

/// Force statistics for one channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Aggregate statistics over a finalized set of samples.
///
/// Channels without readings are absent from `per_channel` rather than
/// reported as zero force.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    total_readings: usize,
    per_channel: BTreeMap<Channel, ChannelStats>,
    start_time_ms: i64,
    end_time_ms: i64,
}

impl SessionSummary {
    /// Rebuilds a summary from stored parts. Callers are responsible for the
    /// parts being consistent; use [`summarize`] for fresh data.
    pub fn from_parts(
        total_readings: usize,
        per_channel: BTreeMap<Channel, ChannelStats>,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> Self {
        Self {
            total_readings,
            per_channel,
            start_time_ms,
            end_time_ms,
        }
    }

    pub fn total_readings(&self) -> usize {
        self.total_readings
    }

    pub fn per_channel(&self) -> &BTreeMap<Channel, ChannelStats> {
        &self.per_channel
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelStats> {
        self.per_channel.get(&channel)
    }

    pub fn start_time_ms(&self) -> i64 {
        self.start_time_ms
    }

    pub fn end_time_ms(&self) -> i64 {
        self.end_time_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }
}

/// Running statistics over the finite readings of one channel.
#[derive(Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn finish(self) -> Option<ChannelStats> {
        if self.count == 0 {
            return None;
        }
        // Summation rounding can land the mean a hair outside [min, max].
        let mean = (self.sum / self.count as f64).clamp(self.min, self.max);
        Some(ChannelStats {
            count: self.count,
            min: self.min,
            max: self.max,
            mean,
        })
    }
}

/// Computes the summary of `samples`. Arrival order does not matter.
///
/// Non-finite forces count toward `total_readings` but not toward channel
/// statistics; a channel with no finite reading is omitted.
pub fn summarize(samples: &[Sample]) -> Result<SessionSummary, SummaryError> {
    let first = samples.first().ok_or(SummaryError::EmptyBuffer)?;

    let mut start_time_ms = first.timestamp_ms();
    let mut end_time_ms = first.timestamp_ms();
    let mut accumulators: BTreeMap<Channel, Accumulator> = BTreeMap::new();

    for sample in samples {
        start_time_ms = start_time_ms.min(sample.timestamp_ms());
        end_time_ms = end_time_ms.max(sample.timestamp_ms());

        accumulators
            .entry(sample.channel())
            .or_default()
            .push(sample.force_kg());
    }

    let per_channel = accumulators
        .into_iter()
        .filter_map(|(channel, acc)| acc.finish().map(|stats| (channel, stats)))
        .collect();

    Ok(SessionSummary {
        total_readings: samples.len(),
        per_channel,
        start_time_ms,
        end_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(summarize(&[]), Err(SummaryError::EmptyBuffer));
    }

    #[test]
    fn per_channel_statistics() {
        let samples = vec![
            Sample::new(Channel::Left, 0.5, 0, false),
            Sample::new(Channel::Right, 0.4, 0, false),
            Sample::new(Channel::Left, 3.0, 30, true),
            Sample::new(Channel::Right, 2.9, 30, true),
        ];

        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.total_readings(), 4);
        assert_eq!(summary.start_time_ms(), 0);
        assert_eq!(summary.end_time_ms(), 30);

        let left = summary.channel(Channel::Left).unwrap();
        assert_eq!(left.count, 2);
        assert!(approx(left.min, 0.5));
        assert!(approx(left.max, 3.0));
        assert!(approx(left.mean, 1.75));

        let right = summary.channel(Channel::Right).unwrap();
        assert!(approx(right.min, 0.4));
        assert!(approx(right.max, 2.9));
        assert!(approx(right.mean, 1.65));
    }

    #[test]
    fn silent_channel_is_omitted() {
        let samples = vec![
            Sample::new(Channel::Right, 1.0, 10, false),
            Sample::new(Channel::Right, 2.0, 20, false),
        ];

        let summary = summarize(&samples).unwrap();
        assert!(summary.channel(Channel::Left).is_none());
        assert_eq!(summary.per_channel().len(), 1);
    }

    #[test]
    fn time_span_ignores_arrival_order() {
        let samples = vec![
            Sample::new(Channel::Left, 1.0, 500, false),
            Sample::new(Channel::Right, 1.0, 120, false),
            Sample::new(Channel::Left, 1.0, 90, false),
            Sample::new(Channel::Right, 1.0, 700, false),
        ];

        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.start_time_ms(), 90);
        assert_eq!(summary.end_time_ms(), 700);
        assert_eq!(summary.duration_ms(), 610);
    }

    #[test]
    fn mean_stays_within_bounds() {
        let repeated: Vec<Sample> = (0..3)
            .map(|i| Sample::new(Channel::Left, 0.1, i, false))
            .collect();
        let mixed: Vec<Sample> = [0.3, 7.25, 0.0, 1e-3, 42.0, 5.5]
            .iter()
            .enumerate()
            .map(|(i, f)| Sample::new(Channel::ALL[i % 2], *f, i as i64, false))
            .collect();

        for samples in [repeated, mixed] {
            let summary = summarize(&samples).unwrap();
            for stats in summary.per_channel().values() {
                assert!(stats.min <= stats.mean, "{stats:?}");
                assert!(stats.mean <= stats.max, "{stats:?}");
            }
        }
    }

    #[test]
    fn nan_only_channel_is_omitted_but_counted() {
        let samples = vec![
            Sample::new(Channel::Left, f64::NAN, 0, false),
            Sample::new(Channel::Right, 1.0, 0, false),
            Sample::new(Channel::Left, f64::NAN, 10, true),
        ];

        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.total_readings(), 3);
        assert!(summary.channel(Channel::Left).is_none());
        assert_eq!(summary.channel(Channel::Right).unwrap().count, 1);
        assert_eq!(summary.end_time_ms(), 10);
    }

    #[test]
    fn non_finite_forces_are_left_out_of_channel_stats() {
        let samples = vec![
            Sample::new(Channel::Left, 2.0, 0, false),
            Sample::new(Channel::Left, f64::NAN, 5, false),
            Sample::new(Channel::Left, f64::INFINITY, 10, false),
            Sample::new(Channel::Left, 4.0, 15, false),
            Sample::new(Channel::Left, f64::NEG_INFINITY, 20, false),
        ];

        let summary = summarize(&samples).unwrap();
        assert_eq!(summary.total_readings(), 5);

        let left = summary.channel(Channel::Left).unwrap();
        assert_eq!(left.count, 2);
        assert_eq!((left.min, left.max), (2.0, 4.0));
        assert!(approx(left.mean, 3.0));
        assert!(left.min <= left.mean && left.mean <= left.max);
    }

    #[test]
    fn negative_forces_are_kept() {
        let samples = vec![
            Sample::new(Channel::Right, -1.5, 0, false),
            Sample::new(Channel::Right, 0.5, 1, false),
        ];
        let right = *summarize(&samples).unwrap().channel(Channel::Right).unwrap();
        assert_eq!((right.min, right.max), (-1.5, 0.5));
        assert!(approx(right.mean, -0.5));
    }
}
