//! Per-channel event report for a stored session.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::models::{Channel, Sample};

/// Forces below this count toward the low-force share.
const LOW_FORCE_KG: f64 = 5.0;
/// Forces at or above this count toward the high-force share.
const HIGH_FORCE_KG: f64 = 7.0;

/// `(label, max above, mean above, events above)`, most severe first.
const SEVERITY_THRESHOLDS: [(Severity, f64, f64, usize); 4] = [
    (Severity::Critical, 12.0, 8.0, 80),
    (Severity::Severe, 10.0, 7.0, 60),
    (Severity::Moderate, 7.0, 5.0, 40),
    (Severity::Mild, 5.0, 3.0, 20),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }

    fn classify(events: usize, mean: f64, max: f64) -> Self {
        SEVERITY_THRESHOLDS
            .iter()
            .find(|(_, max_above, mean_above, events_above)| {
                max > *max_above || mean > *mean_above || events > *events_above
            })
            .map(|(severity, ..)| *severity)
            .unwrap_or(Self::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcePattern {
    NoEvents,
    Consistent,
    ModerateVariability,
    Bimodal,
    HighlyVariable,
}

impl ForcePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoEvents => "no_events",
            Self::Consistent => "consistent",
            Self::ModerateVariability => "moderate_variability",
            Self::Bimodal => "bimodal",
            Self::HighlyVariable => "highly_variable",
        }
    }

    fn classify(cv: f64, low_share: f64, high_share: f64) -> Self {
        if cv < 0.2 {
            Self::Consistent
        } else if cv < 0.4 {
            Self::ModerateVariability
        } else if low_share > 0.25 && high_share > 0.25 {
            Self::Bimodal
        } else {
            Self::HighlyVariable
        }
    }
}

/// Event statistics for one channel. Shares are fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub events: usize,
    pub event_share: f64,
    pub mean_kg: f64,
    pub median_kg: f64,
    pub std_kg: f64,
    pub max_kg: f64,
    pub cv: f64,
    pub low_share: f64,
    pub high_share: f64,
    pub severity: Severity,
    pub pattern: ForcePattern,
}

impl ChannelReport {
    fn without_events() -> Self {
        Self {
            events: 0,
            event_share: 0.0,
            mean_kg: 0.0,
            median_kg: 0.0,
            std_kg: 0.0,
            max_kg: 0.0,
            cv: 0.0,
            low_share: 0.0,
            high_share: 0.0,
            severity: Severity::Normal,
            pattern: ForcePattern::NoEvents,
        }
    }

    fn from_forces(mut forces: Vec<f64>, readings: usize) -> Self {
        if forces.is_empty() {
            return Self::without_events();
        }

        forces.sort_by(f64::total_cmp);
        let n = forces.len();
        let mean = forces.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (forces[n / 2 - 1] + forces[n / 2]) / 2.0
        } else {
            forces[n / 2]
        };
        let std = if n > 1 {
            let squares: f64 = forces.iter().map(|f| (f - mean).powi(2)).sum();
            (squares / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        let max = forces[n - 1];
        let cv = if mean > 0.0 { std / mean } else { 0.0 };
        let low_share = forces.iter().filter(|f| **f < LOW_FORCE_KG).count() as f64 / n as f64;
        let high_share = forces.iter().filter(|f| **f >= HIGH_FORCE_KG).count() as f64 / n as f64;

        Self {
            events: n,
            event_share: n as f64 / readings as f64,
            mean_kg: mean,
            median_kg: median,
            std_kg: std,
            max_kg: max,
            cv,
            low_share,
            high_share,
            severity: Severity::classify(n, mean, max),
            pattern: ForcePattern::classify(cv, low_share, high_share),
        }
    }
}

/// Builds a report for every channel, including channels with no events.
pub fn event_report(samples: &[Sample]) -> BTreeMap<Channel, ChannelReport> {
    Channel::ALL
        .into_iter()
        .map(|channel| {
            let readings = samples.iter().filter(|s| s.channel() == channel).count();
            let forces = samples
                .iter()
                .filter(|s| s.channel() == channel && s.event_flag() && s.force_kg().is_finite())
                .map(Sample::force_kg)
                .collect();
            (channel, ChannelReport::from_forces(forces, readings))
        })
        .collect()
}

impl fmt::Display for ChannelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.events == 0 {
            return write!(f, "no events");
        }
        write!(
            f,
            "{} events ({:.1}% of readings)  mean={:.2} median={:.2} std={:.2} max={:.2} kg  \
             cv={:.2} low={:.0}% high={:.0}%  severity={} pattern={}",
            self.events,
            self.event_share * 100.0,
            self.mean_kg,
            self.median_kg,
            self.std_kg,
            self.max_kg,
            self.cv,
            self.low_share * 100.0,
            self.high_share * 100.0,
            self.severity.as_str(),
            self.pattern.as_str()
        )
    }
}
