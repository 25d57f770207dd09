//! Sample sources and the loop that feeds them into a session.

pub mod controller;
pub mod decoder;
pub mod live;
pub mod loop_worker;
pub mod source;
pub mod synthetic;

pub use controller::AcquisitionController;
pub use decoder::{decode, encode_frame, DecodeError, EventLayout, FrameDecoder, FRAME_LEN};
pub use live::{ChannelTransport, FrameTransport, LiveSource};
pub use loop_worker::{acquisition_loop, SharedSource};
pub use source::SampleSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
