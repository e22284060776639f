use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::buffer::FrameIngestBuffer;
use super::gate::{GateDecision, QualityGate};
use super::session::{ActiveSession, RecorderStatus, SessionOutcome};
use super::state::{Edge, RecordingStateMachine, RunState};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::joints::JointStreamWriter;
use crate::phrase::PhraseContext;
use crate::sensor::{BodyFrame, ColorFrame, DepthFrame, MultiSourceFrame};
use crate::storage::{ColorFrameEncoder, DepthFrameEncoder, SessionDirectoryManager};

/// Owns every piece of per-session state
///
/// Not thread-safe by itself: callers serialize access (the pipeline keeps it
/// behind a single mutex), so enqueue, transitions and drain never interleave.
pub struct SessionRecorder {
    machine: RecordingStateMachine,
    gate: QualityGate,
    buffer: FrameIngestBuffer,
    dirs: SessionDirectoryManager,
    color_encoder: ColorFrameEncoder,
    depth_encoder: DepthFrameEncoder,
    joints: Box<dyn JointStreamWriter>,
    phrase: PhraseContext,
    color_size: (u32, u32),
    depth_size: (u32, u32),
    session: Option<ActiveSession>,
    log_path: Option<PathBuf>,
    last_outcome: Option<SessionOutcome>,
    tracked_bodies: usize,
}

impl SessionRecorder {
    pub fn new(config: &CaptureConfig, joints: Box<dyn JointStreamWriter>) -> CaptureResult<Self> {
        config.validate()?;

        let mut phrase = PhraseContext::new();
        if let Some(initial) = &config.phrase {
            phrase.set(initial.clone())?;
        }

        info!(
            "Session recorder ready: root {}, min {} samples, color {}x{} q{}, depth {}x{} {:?}",
            config.data_root.display(),
            config.min_frames,
            config.color_width,
            config.color_height,
            config.color_quality,
            config.depth_width,
            config.depth_height,
            config.depth_format
        );

        Ok(Self {
            machine: RecordingStateMachine::new(config.guard_policy),
            gate: QualityGate::new(config.min_frames),
            buffer: FrameIngestBuffer::new(),
            dirs: SessionDirectoryManager::new(&config.data_root, config.first_session_id),
            color_encoder: ColorFrameEncoder::new(
                config.color_width,
                config.color_height,
                config.color_quality,
            ),
            depth_encoder: DepthFrameEncoder::new(
                config.depth_width,
                config.depth_height,
                config.depth_format,
                config.depth_quality,
            ),
            joints,
            phrase,
            color_size: (config.color_width, config.color_height),
            depth_size: (config.depth_width, config.depth_height),
            session: None,
            log_path: None,
            last_outcome: None,
            tracked_bodies: 0,
        })
    }

    pub fn state(&self) -> RunState {
        self.machine.state()
    }

    pub fn is_recording(&self) -> bool {
        self.machine.is_recording()
    }

    /// Change the phrase used by the next session
    pub fn set_phrase(&mut self, phrase: &str) -> CaptureResult<()> {
        self.phrase.set(phrase)?;
        info!("Phrase set to '{}'", phrase);
        Ok(())
    }

    pub fn phrase(&self) -> Option<&str> {
        self.phrase.get()
    }

    /// Fail fast if a session could not be created right now
    pub fn check_ready(&self) -> CaptureResult<()> {
        self.phrase.current().map(|_| ())
    }

    pub fn next_session_id(&self) -> Option<u32> {
        self.phrase.get().map(|p| self.dirs.next_candidate(p))
    }

    pub fn tracked_bodies(&self) -> usize {
        self.tracked_bodies
    }

    /// Log of the last written session; `None` while recording or after a
    /// session whose log was deleted
    pub fn current_session_log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn poll_write_complete(&mut self) -> bool {
        let complete = self.machine.poll_write_complete();
        if complete {
            debug!("Write complete acknowledged");
        }
        complete
    }

    /// Write-complete poll paired with the log path of the session it reports
    pub fn poll_write_complete_with_log(&mut self) -> (bool, Option<PathBuf>) {
        let complete = self.poll_write_complete();
        let log_path = if complete { self.log_path.clone() } else { None };
        (complete, log_path)
    }

    /// Handle one body-frame tick
    ///
    /// Evaluates the recording request first, then writes one skeletal
    /// sample per tracked body if a session is open. Returns the outcome when
    /// this tick closed a session.
    pub fn on_body_frame(
        &mut self,
        requested: bool,
        frame: &BodyFrame,
    ) -> CaptureResult<Option<SessionOutcome>> {
        self.tracked_bodies = frame.tracked_count();

        let outcome = match self.machine.evaluate(requested) {
            Edge::Activate => {
                self.activate()?;
                None
            }
            Edge::Deactivate { guard } => Some(self.deactivate(guard)?),
            Edge::None => None,
        };

        if self.machine.is_recording() {
            self.write_samples(frame);
        }

        Ok(outcome)
    }

    /// Handle one color/depth arrival; frames are kept only while recording
    pub fn on_multi_frame(&mut self, frame: MultiSourceFrame) -> bool {
        if !self.machine.is_recording() {
            return false;
        }

        let mut accepted = false;
        if let Some(color) = frame.color {
            accepted |= self.ingest_color(color);
        }
        if let Some(depth) = frame.depth {
            accepted |= self.ingest_depth(depth);
        }
        accepted
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            state: self.machine.state(),
            phrase: self.phrase.get().map(str::to_string),
            session_id: self.session.as_ref().map(|s| s.session_id()),
            next_session_id: self.next_session_id(),
            frames_captured: self.machine.frames_captured(),
            queued_color: self.buffer.color_len(),
            queued_depth: self.buffer.depth_len(),
            tracked_bodies: self.tracked_bodies,
            started_at: self.session.as_ref().map(|s| s.started_at),
            log_path: self.log_path.clone(),
            last_outcome: self.last_outcome.clone(),
        }
    }

    fn activate(&mut self) -> CaptureResult<()> {
        let phrase = self.phrase.current()?.to_string();
        let layout = self.dirs.allocate(&phrase)?;

        self.joints.set_current_phrase(&phrase);
        let log_path = match self.joints.start_new_phrase(&layout) {
            Ok(path) => path,
            Err(e) => {
                self.dirs.release(&layout);
                return Err(e);
            }
        };

        // Anything left over belongs to no session
        self.buffer.clear();
        self.machine.begin_session();
        self.log_path = None;

        info!(
            "Recording session {} for phrase '{}' (log {})",
            layout.session_id,
            phrase,
            log_path.display()
        );

        self.session = Some(ActiveSession::new(layout, log_path));
        Ok(())
    }

    fn deactivate(&mut self, guard: bool) -> CaptureResult<SessionOutcome> {
        let Some(mut session) = self.session.take() else {
            // Recording without a session cannot happen; recover to idle
            self.buffer.clear();
            self.machine.finish_aborted();
            return Err(CaptureError::InvalidConfig(
                "recording state without an open session".to_string(),
            ));
        };
        session.frames_captured = self.machine.frames_captured();

        if !guard {
            let (color, depth) = self.buffer.clear();
            self.drop_session_log(&session);
            self.dirs.release(&session.layout);
            self.machine.finish_aborted();

            info!(
                "Session {} aborted before tracking completed ({} color, {} depth frames dropped)",
                session.session_id(),
                color,
                depth
            );

            return Ok(self.record_outcome(SessionOutcome::Aborted {
                session_id: session.session_id(),
                phrase: session.layout.phrase.clone(),
            }));
        }

        let end_result = self.joints.end_phrase();

        let decision = self.gate.decide(session);
        let outcome = match decision {
            GateDecision::Discard { session } => {
                if let Err(e) = end_result {
                    warn!(
                        "Failed to close skeletal log of session {}: {}",
                        session.session_id(),
                        e
                    );
                }
                let (color, depth) = self.buffer.clear();
                self.drop_session_log(&session);
                self.dirs.release(&session.layout);
                self.machine.finish_written();

                info!(
                    "Session {} discarded: {} samples < {} ({} color, {} depth frames dropped)",
                    session.session_id(),
                    session.frames_captured,
                    self.gate.min_frames(),
                    color,
                    depth
                );

                SessionOutcome::Discarded {
                    session_id: session.session_id(),
                    phrase: session.layout.phrase.clone(),
                    frames_captured: session.frames_captured,
                }
            }
            GateDecision::Commit { session } => {
                let (color, depth) = self.buffer.take();
                let committed = end_result
                    .map_err(|e| CaptureError::CommitFailed {
                        session_id: session.session_id(),
                        frames_written: 0,
                        source: Box::new(e),
                    })
                    .and_then(|_| self.commit(&session, color, depth));

                match committed {
                    Ok((color_files, depth_files)) => {
                        self.dirs.advance(&session.layout);
                        self.log_path = Some(session.log_path.clone());
                        self.machine.finish_written();

                        info!(
                            "Session {} committed: {} color, {} depth files, {} samples",
                            session.session_id(),
                            color_files,
                            depth_files,
                            session.frames_captured
                        );

                        SessionOutcome::Committed {
                            session_id: session.session_id(),
                            phrase: session.layout.phrase.clone(),
                            color_files,
                            depth_files,
                            log_path: session.log_path.clone(),
                        }
                    }
                    Err(e) => {
                        self.roll_back(&session);
                        self.machine.finish_aborted();

                        error!("Session {} commit failed and was rolled back: {}", session.session_id(), e);

                        self.record_outcome(SessionOutcome::Failed {
                            session_id: session.session_id(),
                            phrase: session.layout.phrase.clone(),
                            error: e.to_string(),
                        });
                        return Err(e);
                    }
                }
            }
        };

        Ok(self.record_outcome(outcome))
    }

    /// Drain both queues through the encoders, oldest first
    ///
    /// Each queue is numbered from 1 for this session. Stops at the first
    /// failure; the caller rolls back what was written.
    fn commit(
        &mut self,
        session: &ActiveSession,
        color: VecDeque<ColorFrame>,
        depth: VecDeque<DepthFrame>,
    ) -> CaptureResult<(usize, usize)> {
        let layout = &session.layout;
        let failed = |written: usize, source: CaptureError| CaptureError::CommitFailed {
            session_id: layout.session_id,
            frames_written: written,
            source: Box::new(source),
        };

        self.dirs
            .create_frame_dirs(layout)
            .map_err(|e| failed(0, e))?;

        let mut color_files = 0;
        for (index, frame) in (1..).zip(color) {
            self.color_encoder
                .encode(&frame, layout, index)
                .map_err(|e| failed(color_files, e))?;
            color_files += 1;
        }

        let mut depth_files = 0;
        for (index, frame) in (1..).zip(depth) {
            self.depth_encoder
                .encode(&frame, layout, index)
                .map_err(|e| failed(color_files + depth_files, e))?;
            depth_files += 1;
        }

        Ok((color_files, depth_files))
    }

    fn roll_back(&mut self, session: &ActiveSession) {
        self.buffer.clear();
        if let Err(e) = self.dirs.remove_frame_output(&session.layout) {
            warn!(
                "Partial output of session {} could not be removed: {}",
                session.session_id(),
                e
            );
        }
        self.drop_session_log(session);
        self.dirs.release(&session.layout);
    }

    fn drop_session_log(&mut self, session: &ActiveSession) {
        self.log_path = None;
        if let Err(e) = self.joints.delete_last_sample(&session.layout) {
            warn!(
                "Failed to delete skeletal log of session {}: {}",
                session.session_id(),
                e
            );
        }
    }

    fn record_outcome(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    fn write_samples(&mut self, frame: &BodyFrame) {
        for body in frame.tracked() {
            let line = body.sample_line();
            match self.joints.write_line(&line) {
                Ok(()) => self.machine.record_sample(),
                Err(e) => {
                    if let Some(session) = self.session.as_mut() {
                        if !session.log_failed {
                            session.log_failed = true;
                            error!(
                                "Skeletal log write failed for session {}: {}",
                                session.session_id(),
                                e
                            );
                        }
                    }
                }
            }
        }
    }

    fn ingest_color(&mut self, frame: ColorFrame) -> bool {
        if (frame.width, frame.height) != self.color_size || frame.pixels.len() != frame.expected_len()
        {
            self.note_rejected("color", frame.pixels.len());
            return false;
        }
        self.buffer.push_color(frame);
        true
    }

    fn ingest_depth(&mut self, frame: DepthFrame) -> bool {
        if (frame.width, frame.height) != self.depth_size
            || frame.samples.len() != frame.expected_len()
        {
            self.note_rejected("depth", frame.samples.len());
            return false;
        }
        self.buffer.push_depth(frame);
        true
    }

    fn note_rejected(&mut self, kind: &str, len: usize) {
        if let Some(session) = self.session.as_mut() {
            session.rejected_frames += 1;
            if session.rejected_frames == 1 {
                warn!(
                    "Dropping malformed {} frame ({} elements) in session {}",
                    kind,
                    len,
                    session.session_id()
                );
            }
        }
    }
}
