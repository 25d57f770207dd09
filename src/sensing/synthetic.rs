use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::{Channel, Sample};

use super::source::SampleSource;

/// Shape of the generated signal.
///
/// Every `burst_period_ms` the last `burst_duration_ms` of the period is a
/// burst: higher force and the event flag set on every channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticConfig {
    pub tick_ms: u64,
    pub burst_period_ms: u64,
    pub burst_duration_ms: u64,
    pub baseline_min_kg: f64,
    pub baseline_max_kg: f64,
    pub burst_min_kg: f64,
    pub burst_max_kg: f64,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            burst_period_ms: 5_000,
            burst_duration_ms: 1_000,
            baseline_min_kg: 0.1,
            baseline_max_kg: 1.0,
            burst_min_kg: 2.5,
            burst_max_kg: 4.5,
            seed: None,
        }
    }
}

/// Timer-driven generator producing one sample per channel per tick.
///
/// Timestamps advance by `tick_ms` from the start time regardless of how long
/// the caller takes between polls.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    start_ms: i64,
    ticks: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng,
            start_ms: Utc::now().timestamp_millis(),
            ticks: 0,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.ticks.saturating_mul(self.config.tick_ms)
    }

    fn in_burst(&self, elapsed_ms: u64) -> bool {
        let period = self.config.burst_period_ms;
        if period == 0 || self.config.burst_duration_ms == 0 {
            return false;
        }
        let burst = self.config.burst_duration_ms.min(period);
        elapsed_ms % period >= period - burst
    }

    fn draw(&mut self, low: f64, high: f64) -> f64 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.rng.gen_range(low..=high)
    }

    fn next_batch(&mut self) -> Vec<Sample> {
        let elapsed = self.elapsed_ms();
        let burst = self.in_burst(elapsed);
        let timestamp_ms = self.start_ms.saturating_add(elapsed as i64);

        let (low, high) = if burst {
            (self.config.burst_min_kg, self.config.burst_max_kg)
        } else {
            (self.config.baseline_min_kg, self.config.baseline_max_kg)
        };

        let batch = Channel::ALL
            .into_iter()
            .map(|channel| Sample::new(channel, self.draw(low, high), timestamp_ms, burst))
            .collect();

        self.ticks += 1;
        batch
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    async fn produce_next(&mut self) -> Option<Vec<Sample>> {
        if self.ticks > 0 && self.config.tick_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.tick_ms)).await;
        }

        Some(self.next_batch())
    }

    fn describe(&self) -> &'static str {
        "synthetic"
    }
}
