use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the independent force-sensing inputs.
///
/// Downstream code iterates [`Channel::ALL`] instead of naming variants, so a
/// new input only needs a variant here plus its slot in the frame layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const COUNT: usize = 2;
    pub const ALL: [Channel; Channel::COUNT] = [Channel::Left, Channel::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Left => "left",
            Channel::Right => "right",
        }
    }

    /// Numeric sensor id used by the firmware and by exported files.
    pub fn sensor_id(&self) -> u8 {
        match self {
            Channel::Left => 1,
            Channel::Right => 2,
        }
    }

    pub fn from_sensor_id(id: u8) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.sensor_id() == id)
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .or_else(|| value.parse::<u8>().ok().and_then(Channel::from_sensor_id))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reading from one channel at one instant.
///
/// Fields are private: a sample cannot change after construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    channel: Channel,
    force_kg: f64,
    timestamp_ms: i64,
    event_flag: bool,
}

impl Sample {
    pub fn new(channel: Channel, force_kg: f64, timestamp_ms: i64, event_flag: bool) -> Self {
        Self {
            channel,
            force_kg,
            timestamp_ms,
            event_flag,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn force_kg(&self) -> f64 {
        self.force_kg
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn event_flag(&self) -> bool {
        self.event_flag
    }
}
