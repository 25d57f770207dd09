use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::Sample;

use super::decoder::FrameDecoder;
use super::source::SampleSource;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Delivers raw frames from the device link.
#[async_trait]
pub trait FrameTransport: Send {
    /// Waits for the next frame; `None` once the link is closed.
    async fn next_frame(&mut self) -> Option<Vec<u8>>;
}

/// Transport fed through a channel by whatever owns the device connection.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl ChannelTransport {
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { receiver }
    }

    /// Creates a transport together with the sender the device side writes to.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }
}

/// Source that decodes frames arriving from a [`FrameTransport`].
///
/// Frames that fail to decode are logged and skipped; the stream only ends
/// when the transport closes or [`shutdown_token`](Self::shutdown_token) is
/// cancelled.
pub struct LiveSource<T: FrameTransport> {
    transport: T,
    decoder: FrameDecoder,
    shutdown: CancellationToken,
    dropped_frames: u64,
}

impl<T: FrameTransport> LiveSource<T> {
    pub fn new(transport: T, decoder: FrameDecoder) -> Self {
        Self {
            transport,
            decoder,
            shutdown: CancellationToken::new(),
            dropped_frames: 0,
        }
    }

    /// Token that stops consumption from the transport when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}

#[async_trait]
impl<T: FrameTransport + 'static> SampleSource for LiveSource<T> {
    async fn produce_next(&mut self) -> Option<Vec<Sample>> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    log_info!("live source shut down after {} dropped frames", self.dropped_frames);
                    return None;
                }
                frame = self.transport.next_frame() => frame,
            };

            let Some(frame) = frame else {
                log_info!("transport closed");
                return None;
            };

            match self.decoder.decode_now(&frame) {
                Ok(samples) => {
                    log_debug!("decoded frame: {:?}", samples);
                    return Some(samples.to_vec());
                }
                Err(err) => {
                    self.dropped_frames += 1;
                    log_warn!("dropping frame: {err}");
                }
            }
        }
    }

    fn describe(&self) -> &'static str {
        "live"
    }
}
