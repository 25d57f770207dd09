use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::{Channel, Sample};

/// Session-level event state derived from the latest flag of every channel.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventState {
    active: bool,
    contributing_channels: BTreeSet<Channel>,
}

impl EventState {
    pub fn inactive() -> Self {
        Self {
            active: false,
            contributing_channels: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn contributing_channels(&self) -> &BTreeSet<Channel> {
        &self.contributing_channels
    }

    /// Display label: the single reporting channel, or `"both"` when every
    /// channel reports at once.
    pub fn label(&self) -> Option<&'static str> {
        match self.contributing_channels.len() {
            0 => None,
            1 => self.contributing_channels.iter().next().map(Channel::as_str),
            n if n == Channel::COUNT => Some("both"),
            _ => Some("multiple"),
        }
    }
}

/// Tracks the most recent event flag per channel (last write wins).
#[derive(Debug, Clone)]
pub struct EventAggregator {
    last_flag: BTreeMap<Channel, bool>,
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventAggregator {
    pub fn new() -> Self {
        Self {
            last_flag: Channel::ALL.into_iter().map(|c| (c, false)).collect(),
        }
    }

    pub fn observe(&mut self, sample: &Sample) {
        self.last_flag.insert(sample.channel(), sample.event_flag());
    }

    pub fn current_state(&self) -> EventState {
        let contributing_channels: BTreeSet<Channel> = self
            .last_flag
            .iter()
            .filter(|(_, flag)| **flag)
            .map(|(channel, _)| *channel)
            .collect();

        EventState {
            active: !contributing_channels.is_empty(),
            contributing_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(channel: Channel, on: bool) -> Sample {
        Sample::new(channel, 1.0, 0, on)
    }

    #[test]
    fn fresh_aggregator_is_inactive() {
        let aggregator = EventAggregator::new();
        assert_eq!(aggregator.current_state(), EventState::inactive());
        assert_eq!(aggregator.current_state().label(), None);
    }

    #[test]
    fn latest_flag_per_channel_wins() {
        let mut aggregator = EventAggregator::new();
        aggregator.observe(&flag(Channel::Left, true));
        aggregator.observe(&flag(Channel::Right, false));
        assert!(aggregator.current_state().is_active());

        aggregator.observe(&flag(Channel::Left, false));
        let state = aggregator.current_state();
        assert!(!state.is_active());
        assert!(state.contributing_channels().is_empty());
    }

    #[test]
    fn silent_channel_does_not_hold_state_active() {
        let mut aggregator = EventAggregator::new();
        aggregator.observe(&flag(Channel::Right, true));
        assert_eq!(aggregator.current_state().label(), Some("right"));

        aggregator.observe(&flag(Channel::Right, false));
        // Left never reported; it counts as inactive.
        assert!(!aggregator.current_state().is_active());
    }

    #[test]
    fn labels_follow_contributing_channels() {
        let mut aggregator = EventAggregator::new();
        aggregator.observe(&flag(Channel::Left, true));
        assert_eq!(aggregator.current_state().label(), Some("left"));

        aggregator.observe(&flag(Channel::Right, true));
        let state = aggregator.current_state();
        assert_eq!(state.label(), Some("both"));
        assert_eq!(
            state.contributing_channels().iter().copied().collect::<Vec<_>>(),
            vec![Channel::Left, Channel::Right]
        );
    }

    #[test]
    fn state_matches_or_of_latest_flags() {
        let sequence = [
            (Channel::Left, true),
            (Channel::Left, false),
            (Channel::Right, true),
            (Channel::Left, true),
            (Channel::Right, false),
            (Channel::Left, false),
            (Channel::Right, true),
        ];

        let mut aggregator = EventAggregator::new();
        let mut latest = BTreeMap::new();
        for (channel, on) in sequence {
            aggregator.observe(&flag(channel, on));
            latest.insert(channel, on);
            let expected = latest.values().any(|v| *v);
            assert_eq!(aggregator.current_state().is_active(), expected);
        }
    }
}
