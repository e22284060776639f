use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::recorder::SessionRecorder;
use super::session::{RecorderStatus, SessionOutcome};
use crate::error::{CaptureError, CaptureResult};
use crate::sensor::{BodyFrame, ColorFrame, SensorSource, SensorStreams};

/// Runs a [`SessionRecorder`] against live sensor streams
///
/// The body stream and the color/depth stream each get their own consumer
/// task. Both funnel into the recorder through one mutex, which serializes
/// enqueue, state transitions and commit. The recording-requested signal is
/// a flag read at the start of every body tick.
pub struct CapturePipeline {
    recorder: Arc<Mutex<SessionRecorder>>,

    /// External "recording requested" signal
    requested: Arc<AtomicBool>,

    /// Whether sensor streams are currently delivering
    sensor_available: Arc<AtomicBool>,

    /// Tracked bodies in the latest body frame
    tracked_bodies: Arc<AtomicUsize>,

    /// Latest color frame for live preview; never touches the recording path
    preview_tx: watch::Sender<Option<Arc<ColorFrame>>>,

    /// Session outcomes as they happen
    outcome_tx: mpsc::UnboundedSender<SessionOutcome>,
    outcome_rx: Mutex<Option<mpsc::UnboundedReceiver<SessionOutcome>>>,

    sensor: Mutex<Option<Box<dyn SensorSource>>>,
    body_task: Mutex<Option<JoinHandle<()>>>,
    frame_task: Mutex<Option<JoinHandle<()>>>,
}

impl CapturePipeline {
    pub fn new(recorder: SessionRecorder) -> Self {
        let (preview_tx, _) = watch::channel(None);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            recorder: Arc::new(Mutex::new(recorder)),
            requested: Arc::new(AtomicBool::new(false)),
            sensor_available: Arc::new(AtomicBool::new(false)),
            tracked_bodies: Arc::new(AtomicUsize::new(0)),
            preview_tx,
            outcome_tx,
            outcome_rx: Mutex::new(Some(outcome_rx)),
            sensor: Mutex::new(None),
            body_task: Mutex::new(None),
            frame_task: Mutex::new(None),
        }
    }

    /// Start a sensor and consume its streams
    pub async fn start_sensor(&self, mut sensor: Box<dyn SensorSource>) -> Result<()> {
        info!("Starting sensor: {}", sensor.name());

        if !sensor.is_available() {
            return Err(CaptureError::SensorUnavailable(sensor.name().to_string()).into());
        }

        let streams = sensor
            .start()
            .await
            .with_context(|| format!("Failed to start sensor {}", sensor.name()))?;

        self.attach(streams).await;

        let mut slot = self.sensor.lock().await;
        *slot = Some(sensor);
        Ok(())
    }

    /// Consume already-open streams (sensor owned elsewhere)
    pub async fn attach(&self, streams: SensorStreams) {
        let SensorStreams {
            mut bodies,
            mut frames,
        } = streams;

        self.sensor_available.store(true, Ordering::SeqCst);

        let recorder = Arc::clone(&self.recorder);
        let requested = Arc::clone(&self.requested);
        let available = Arc::clone(&self.sensor_available);
        let tracked = Arc::clone(&self.tracked_bodies);
        let outcome_tx = self.outcome_tx.clone();

        let body_task = tokio::spawn(async move {
            info!("Body stream consumer started");

            while let Some(frame) = bodies.recv().await {
                tracked.store(frame.tracked_count(), Ordering::SeqCst);
                let want = requested.load(Ordering::SeqCst);

                let mut recorder = recorder.lock().await;
                let result = recorder.on_body_frame(want, &frame);
                handle_tick_result(result, &recorder, &requested, &outcome_tx);
            }

            // Sessions stay open until the request clears; see stop_session
            available.store(false, Ordering::SeqCst);
            tracked.store(0, Ordering::SeqCst);
            warn!("Body stream ended; sensor unavailable");
        });

        let recorder = Arc::clone(&self.recorder);
        let preview_tx = self.preview_tx.clone();

        let frame_task = tokio::spawn(async move {
            info!("Color/depth stream consumer started");

            while let Some(frame) = frames.recv().await {
                if let Some(color) = &frame.color {
                    preview_tx.send_replace(Some(Arc::new(color.clone())));
                }

                let mut recorder = recorder.lock().await;
                recorder.on_multi_frame(frame);
            }

            info!("Color/depth stream ended");
        });

        *self.body_task.lock().await = Some(body_task);
        *self.frame_task.lock().await = Some(frame_task);
    }

    /// Request recording; fails fast when no session could be created
    pub async fn start_session(&self) -> CaptureResult<()> {
        self.recorder.lock().await.check_ready()?;
        if !self.sensor_available() {
            warn!("Recording requested while the sensor is unavailable");
        }
        self.requested.store(true, Ordering::SeqCst);
        info!("Recording requested");
        Ok(())
    }

    /// Clear the recording request
    ///
    /// The session closes on the next body tick. With no sensor delivering
    /// ticks, an empty tick is applied here so an open session still closes.
    pub async fn stop_session(&self) -> CaptureResult<Option<SessionOutcome>> {
        self.requested.store(false, Ordering::SeqCst);
        info!("Recording request cleared");

        if self.sensor_available() {
            return Ok(None);
        }

        let mut recorder = self.recorder.lock().await;
        let result = recorder.on_body_frame(false, &BodyFrame::default());
        match &result {
            Ok(Some(outcome)) => {
                let _ = self.outcome_tx.send(outcome.clone());
            }
            Err(CaptureError::CommitFailed { .. }) => {
                send_last_outcome(&recorder, &self.outcome_tx)
            }
            _ => {}
        }
        result
    }

    /// Record-button behaviour: flip the request; returns the new value
    pub async fn toggle_session(&self) -> CaptureResult<bool> {
        if self.is_requested() {
            self.stop_session().await?;
            Ok(false)
        } else {
            self.start_session().await?;
            Ok(true)
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn sensor_available(&self) -> bool {
        self.sensor_available.load(Ordering::SeqCst)
    }

    pub fn tracked_bodies(&self) -> usize {
        self.tracked_bodies.load(Ordering::SeqCst)
    }

    pub async fn set_phrase(&self, phrase: &str) -> CaptureResult<()> {
        self.recorder.lock().await.set_phrase(phrase)
    }

    /// One-shot: true once after each written session
    pub async fn poll_write_complete(&self) -> bool {
        self.recorder.lock().await.poll_write_complete()
    }

    /// One-shot poll plus the log path of the written session, read together
    pub async fn poll_write_complete_with_log(&self) -> (bool, Option<PathBuf>) {
        self.recorder.lock().await.poll_write_complete_with_log()
    }

    pub async fn current_session_log_path(&self) -> Option<PathBuf> {
        self.recorder
            .lock()
            .await
            .current_session_log_path()
            .map(|p| p.to_path_buf())
    }

    pub async fn status(&self) -> RecorderStatus {
        self.recorder.lock().await.status()
    }

    /// Latest color frame seen, recording or not
    pub fn latest_preview(&self) -> Option<Arc<ColorFrame>> {
        self.preview_tx.borrow().clone()
    }

    pub fn subscribe_preview(&self) -> watch::Receiver<Option<Arc<ColorFrame>>> {
        self.preview_tx.subscribe()
    }

    /// Take the outcome stream; only the first caller gets it
    pub async fn take_outcomes(&self) -> Option<mpsc::UnboundedReceiver<SessionOutcome>> {
        self.outcome_rx.lock().await.take()
    }

    /// Stop the sensor and wait for both consumers to drain
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down capture pipeline");

        if let Some(mut sensor) = self.sensor.lock().await.take() {
            sensor.stop().await.context("Failed to stop sensor")?;
        }

        for handle in [&self.body_task, &self.frame_task] {
            let task = handle.lock().await.take();
            if let Some(task) = task {
                if let Err(e) = task.await {
                    error!("Stream consumer panicked: {}", e);
                }
            }
        }

        self.sensor_available.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Inspect a tick result; activation failures clear the request so they are
/// reported once rather than on every tick
fn handle_tick_result(
    result: CaptureResult<Option<SessionOutcome>>,
    recorder: &SessionRecorder,
    requested: &AtomicBool,
    outcome_tx: &mpsc::UnboundedSender<SessionOutcome>,
) {
    match result {
        Ok(Some(outcome)) => {
            let _ = outcome_tx.send(outcome);
        }
        Ok(None) => {}
        // Logged by the recorder, once per session
        Err(CaptureError::CommitFailed { .. }) => send_last_outcome(recorder, outcome_tx),
        Err(e) => {
            requested.store(false, Ordering::SeqCst);
            error!("Could not start session, recording request cleared: {}", e);
        }
    }
}

/// Forward the `Failed` outcome the recorder kept for a rolled-back commit
fn send_last_outcome(
    recorder: &SessionRecorder,
    outcome_tx: &mpsc::UnboundedSender<SessionOutcome>,
) {
    if let Some(outcome) = recorder.last_outcome() {
        let _ = outcome_tx.send(outcome.clone());
    }
}
