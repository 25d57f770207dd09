use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::{SessionManager, StopError, StopOutcome};

use super::loop_worker::{acquisition_loop, SharedSource};
use super::source::SampleSource;

struct Worker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Couples the session manager to the sample source chosen at construction.
///
/// The source is shared with the acquisition loop for the duration of a
/// session and stays with the controller afterwards, so consecutive sessions
/// use it even when a loop ends abnormally.
pub struct AcquisitionController {
    manager: SessionManager,
    source: SharedSource,
    origin: &'static str,
    worker: Mutex<Option<Worker>>,
}

impl AcquisitionController {
    pub fn new(manager: SessionManager, source: Box<dyn SampleSource>) -> Self {
        Self {
            manager,
            origin: source.describe(),
            source: Arc::new(Mutex::new(source)),
            worker: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub async fn is_acquiring(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Opens a session and starts feeding it from the source.
    pub async fn start(&self) -> Result<()> {
        let mut worker_guard = self.worker.lock().await;
        if let Some(worker) = worker_guard.as_ref() {
            if worker.handle.is_finished() {
                return Err(anyhow!(
                    "{} source has ended; stop the open session before starting another",
                    self.origin
                ));
            }
            return Err(anyhow!("acquisition already running"));
        }

        self.manager.start().await?;

        info!("Starting {} acquisition", self.origin);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(acquisition_loop(
            Arc::clone(&self.source),
            self.manager.clone(),
            cancel_token.clone(),
        ));

        *worker_guard = Some(Worker {
            handle,
            cancel_token,
        });
        Ok(())
    }

    /// Waits for the source to run dry without cancelling it. The session
    /// stays open until [`stop`](Self::stop).
    pub async fn wait_for_source_end(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        join_worker(worker.handle).await;
    }

    /// Stops the acquisition loop, then closes the session.
    ///
    /// Every sample appended before the loop observed cancellation is part of
    /// the finalized session.
    pub async fn stop(&self, persist: bool) -> Result<StopOutcome, StopError> {
        self.stop_sensing().await;
        self.manager.stop(persist).await
    }

    async fn stop_sensing(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };

        worker.cancel_token.cancel();
        join_worker(worker.handle).await;
    }
}

async fn join_worker(handle: JoinHandle<()>) {
    if let Err(err) = handle.await {
        error!("Acquisition loop ended abnormally: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, Sample};
    use crate::sensing::synthetic::{SyntheticConfig, SyntheticSource};
    use crate::session::{MemoryStore, SessionError, SessionStatus, SessionStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedSource {
        batches: Vec<Vec<Sample>>,
    }

    #[async_trait]
    impl SampleSource for FixedSource {
        async fn produce_next(&mut self) -> Option<Vec<Sample>> {
            if self.batches.is_empty() {
                None
            } else {
                Some(self.batches.remove(0))
            }
        }

        fn describe(&self) -> &'static str {
            "fixed"
        }
    }

    fn controller(source: Box<dyn SampleSource>) -> AcquisitionController {
        AcquisitionController::new(SessionManager::new(Arc::new(MemoryStore::new())), source)
    }

    #[tokio::test]
    async fn appends_until_source_ends_and_keeps_session_open() {
        let batches = (0..3)
            .map(|t| {
                Channel::ALL
                    .into_iter()
                    .map(|c| Sample::new(c, 1.0 + t as f64, t * 10, false))
                    .collect()
            })
            .collect();
        let ctl = controller(Box::new(FixedSource { batches }));

        ctl.start().await.unwrap();
        while ctl.is_acquiring().await {
            tokio::task::yield_now().await;
        }

        let status = ctl.manager().status().await;
        assert_eq!(status.status, SessionStatus::Active);
        assert_eq!(status.sample_count, 6);

        let outcome = ctl.stop(true).await.unwrap();
        assert_eq!(outcome.summary.total_readings(), 6);
        assert!(outcome.session_id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_samples_already_appended() {
        let source = SyntheticSource::new(SyntheticConfig {
            seed: Some(1),
            ..SyntheticConfig::default()
        });
        let ctl = controller(Box::new(source));

        ctl.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;

        let seen = ctl.manager().status().await.sample_count;
        assert!(seen > 0);
        assert_eq!(seen % Channel::COUNT, 0);

        let outcome = ctl.stop(false).await.unwrap();
        assert!(outcome.summary.total_readings() >= seen);
        assert_eq!(outcome.summary.total_readings() % Channel::COUNT, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn source_is_reused_across_sessions() {
        let source = SyntheticSource::new(SyntheticConfig {
            seed: Some(3),
            ..SyntheticConfig::default()
        });
        let ctl = controller(Box::new(source));

        for _ in 0..2 {
            ctl.start().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            let outcome = ctl.stop(true).await.unwrap();
            assert!(outcome.summary.total_readings() > 0);
        }

        assert_eq!(ctl.manager().store().list_sessions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let ctl = controller(Box::new(FixedSource { batches: Vec::new() }));
        ctl.start().await.unwrap();
        let err = ctl.start().await.unwrap_err().to_string();
        assert!(
            err == "acquisition already running" || err.contains("stop the open session"),
            "{err}"
        );

        let err = ctl.stop(true).await.unwrap_err();
        assert!(matches!(err, StopError::Summary(_)));
        assert!(matches!(
            ctl.manager().stop(true).await,
            Err(StopError::Session(SessionError::NotActive))
        ));
    }

    #[tokio::test]
    async fn ended_source_asks_for_stop_instead_of_reporting_running() {
        let ctl = controller(Box::new(FixedSource {
            batches: vec![vec![Sample::new(Channel::Left, 1.0, 0, false)]],
        }));
        ctl.start().await.unwrap();
        ctl.wait_for_source_end().await;
        assert!(!ctl.is_acquiring().await);

        // The finished loop has been joined; the session itself is still open.
        assert!(matches!(
            ctl.start().await,
            Err(err) if err.downcast_ref::<SessionError>() == Some(&SessionError::AlreadyActive)
        ));

        let outcome = ctl.stop(true).await.unwrap();
        assert_eq!(outcome.summary.total_readings(), 1);
    }

    #[tokio::test]
    async fn finished_worker_is_reported_as_ended() {
        let ctl = controller(Box::new(FixedSource { batches: Vec::new() }));
        ctl.start().await.unwrap();
        while ctl.is_acquiring().await {
            tokio::task::yield_now().await;
        }

        let err = ctl.start().await.unwrap_err().to_string();
        assert!(err.contains("fixed source has ended"), "{err}");
        assert!(err.contains("stop the open session"), "{err}");
    }

    /// Panics on the first call, then replays its batches.
    struct FlakySource {
        panicked: bool,
        batches: Vec<Vec<Sample>>,
    }

    #[async_trait]
    impl SampleSource for FlakySource {
        async fn produce_next(&mut self) -> Option<Vec<Sample>> {
            if !self.panicked {
                self.panicked = true;
                panic!("sensor glitch");
            }
            if self.batches.is_empty() {
                None
            } else {
                Some(self.batches.remove(0))
            }
        }

        fn describe(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn source_survives_a_panicking_loop() {
        let ctl = controller(Box::new(FlakySource {
            panicked: false,
            batches: vec![vec![
                Sample::new(Channel::Left, 2.0, 0, false),
                Sample::new(Channel::Right, 3.0, 0, true),
            ]],
        }));

        ctl.start().await.unwrap();
        ctl.wait_for_source_end().await;
        assert!(matches!(
            ctl.stop(true).await,
            Err(StopError::Summary(_))
        ));

        ctl.start().await.unwrap();
        ctl.wait_for_source_end().await;
        let outcome = ctl.stop(true).await.unwrap();
        assert_eq!(outcome.summary.total_readings(), 2);
        assert_eq!(ctl.manager().store().list_sessions().await.unwrap().len(), 1);
    }
}
