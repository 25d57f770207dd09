use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::session::SessionManager;

use super::source::SampleSource;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Shared slot for the source; the loop holds the lock while it runs.
pub type SharedSource = Arc<Mutex<Box<dyn SampleSource>>>;

/// Pulls batches from `source` into the active session until cancelled or the
/// source runs dry.
///
/// A batch is appended in full before cancellation is checked again, so
/// shutdown never splits a frame's channels. The lock guard is released even
/// if the task unwinds, so the owner can reuse the source afterwards.
pub async fn acquisition_loop(
    source: SharedSource,
    manager: SessionManager,
    cancel_token: CancellationToken,
) {
    let mut source = source.lock().await;
    let origin = source.describe();
    let mut appended: u64 = 0;
    log_info!("acquisition loop started ({origin} source)");

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("acquisition loop shutting down after {appended} samples");
                break;
            }
            next = source.produce_next() => {
                let Some(batch) = next else {
                    log_info!("{origin} source ended after {appended} samples");
                    break;
                };

                for sample in batch {
                    if let Err(err) = manager.append(sample).await {
                        log_warn!("stopping acquisition: {err}");
                        return;
                    }
                    appended += 1;
                }
            }
        }
    }
}
