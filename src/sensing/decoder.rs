//! Transport frame decoding.
//!
//! A frame is five little-endian `f32` values:
//!
//! ```text
//! slot  0               1               2            3             4
//!       normalizedLeft  normalizedRight forceLeftKg  forceRightKg  eventFlag
//! ```
//!
//! Older firmware reuses slot 1 for a left-only event flag and slot 4 for the
//! right one; [`EventLayout::PerChannel`] reads frames that way.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{Channel, Sample};

pub const FRAME_SLOTS: usize = 5;
pub const FRAME_LEN: usize = FRAME_SLOTS * 4;

/// Float flags at or above this value count as "on".
const EVENT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// Where the event flag(s) live in a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventLayout {
    /// One flag in slot 4, applied to every channel.
    #[default]
    Shared,
    /// Left flag in slot 1, right flag in slot 4.
    PerChannel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    layout: EventLayout,
}

impl FrameDecoder {
    pub fn new(layout: EventLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> EventLayout {
        self.layout
    }

    /// Decodes one frame into a sample per channel, all stamped with
    /// `received_at_ms`.
    pub fn decode(
        &self,
        frame: &[u8],
        received_at_ms: i64,
    ) -> Result<[Sample; Channel::COUNT], DecodeError> {
        if frame.len() != FRAME_LEN {
            return Err(DecodeError::MalformedFrame {
                expected: FRAME_LEN,
                actual: frame.len(),
            });
        }

        Ok(Channel::ALL.map(|channel| {
            let force = read_slot(frame, force_slot(channel));
            let event = read_slot(frame, self.event_slot(channel));
            Sample::new(channel, f64::from(force), received_at_ms, is_event(event))
        }))
    }

    /// [`decode`](Self::decode) stamped with the current wall-clock time.
    pub fn decode_now(&self, frame: &[u8]) -> Result<[Sample; Channel::COUNT], DecodeError> {
        self.decode(frame, Utc::now().timestamp_millis())
    }

    fn event_slot(&self, channel: Channel) -> usize {
        match (self.layout, channel) {
            (EventLayout::Shared, _) => 4,
            (EventLayout::PerChannel, Channel::Left) => 1,
            (EventLayout::PerChannel, Channel::Right) => 4,
        }
    }
}

/// Decodes with the shared-flag layout.
pub fn decode(frame: &[u8], received_at_ms: i64) -> Result<[Sample; Channel::COUNT], DecodeError> {
    FrameDecoder::default().decode(frame, received_at_ms)
}

fn force_slot(channel: Channel) -> usize {
    match channel {
        Channel::Left => 2,
        Channel::Right => 3,
    }
}

fn is_event(value: f32) -> bool {
    value >= EVENT_THRESHOLD
}

// Caller guarantees `frame.len() == FRAME_LEN`.
fn read_slot(frame: &[u8], slot: usize) -> f32 {
    let start = slot * 4;
    f32::from_le_bytes([
        frame[start],
        frame[start + 1],
        frame[start + 2],
        frame[start + 3],
    ])
}

/// Packs slot values into a frame. Used by transport emulators and tests.
pub fn encode_frame(values: [f32; FRAME_SLOTS]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    for (slot, value) in values.iter().enumerate() {
        frame[slot * 4..slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_forces_and_shared_flag() {
        let frame = encode_frame([0.1, 0.2, 3.5, 1.25, 1.0]);
        let [left, right] = decode(&frame, 1_000).unwrap();

        assert_eq!(left.channel(), Channel::Left);
        assert_eq!(right.channel(), Channel::Right);
        assert_eq!(left.force_kg(), 3.5);
        assert_eq!(right.force_kg(), 1.25);
        assert!(left.event_flag());
        assert!(right.event_flag());
    }

    #[test]
    fn samples_share_timestamp_and_differ_only_in_channel_and_force() {
        let frames = [
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [0.9, 0.1, 12.5, 0.75, 1.0],
            [1.0, 1.0, 2.0, 2.0, 0.0],
            [-1.0, 5.0, -0.5, 40.0, 0.49],
        ];

        for (i, values) in frames.into_iter().enumerate() {
            let ts = 1_700_000_000_000 + i as i64;
            let samples = decode(&encode_frame(values), ts).unwrap();
            assert_eq!(samples.len(), 2);
            assert!(samples.iter().all(|s| s.timestamp_ms() == ts));
            assert_eq!(samples[0].event_flag(), samples[1].event_flag());
            assert_ne!(samples[0].channel(), samples[1].channel());
            assert_eq!(samples[0].force_kg(), f64::from(values[2]));
            assert_eq!(samples[1].force_kg(), f64::from(values[3]));
        }
    }

    #[test]
    fn flag_threshold() {
        let off = decode(&encode_frame([0.0, 0.0, 1.0, 1.0, 0.49]), 0).unwrap();
        let on = decode(&encode_frame([0.0, 0.0, 1.0, 1.0, 0.5]), 0).unwrap();
        let nan = decode(&encode_frame([0.0, 0.0, 1.0, 1.0, f32::NAN]), 0).unwrap();
        assert!(!off[0].event_flag());
        assert!(on[0].event_flag());
        assert!(!nan[0].event_flag());
    }

    #[test]
    fn wrong_length_is_malformed() {
        for len in [0usize, 1, 16, 19, 21, 40] {
            let frame = vec![0u8; len];
            assert_eq!(
                decode(&frame, 0),
                Err(DecodeError::MalformedFrame {
                    expected: FRAME_LEN,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn per_channel_layout_reads_independent_flags() {
        let decoder = FrameDecoder::new(EventLayout::PerChannel);
        let frame = encode_frame([0.3, 1.0, 2.0, 0.4, 0.0]);
        let [left, right] = decoder.decode(&frame, 7).unwrap();
        assert!(left.event_flag());
        assert!(!right.event_flag());

        let shared = decode(&frame, 7).unwrap();
        assert!(!shared[0].event_flag());
    }
}
