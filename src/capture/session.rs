use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::state::RunState;
use crate::storage::SessionLayout;

/// A recording window between activation and deactivation
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub layout: SessionLayout,

    /// Skeletal log opened for this session
    pub log_path: PathBuf,

    /// Skeletal samples written while recording
    pub frames_captured: usize,

    pub started_at: DateTime<Utc>,

    /// A skeletal write already failed this session (reported once)
    pub log_failed: bool,

    /// Frames dropped at ingest for wrong dimensions
    pub rejected_frames: usize,
}

impl ActiveSession {
    pub fn new(layout: SessionLayout, log_path: PathBuf) -> Self {
        Self {
            layout,
            log_path,
            frames_captured: 0,
            started_at: Utc::now(),
            log_failed: false,
            rejected_frames: 0,
        }
    }

    pub fn session_id(&self) -> u32 {
        self.layout.session_id
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Frames persisted; the next session gets a new id
    Committed {
        session_id: u32,
        phrase: String,
        color_files: usize,
        depth_files: usize,
        log_path: PathBuf,
    },
    /// Too few skeletal samples; nothing persisted
    Discarded {
        session_id: u32,
        phrase: String,
        frames_captured: usize,
    },
    /// Request cleared before the tracking-completion guard was set
    Aborted { session_id: u32, phrase: String },
    /// Commit failed and was rolled back
    Failed {
        session_id: u32,
        phrase: String,
        error: String,
    },
}

impl SessionOutcome {
    pub fn session_id(&self) -> u32 {
        match self {
            SessionOutcome::Committed { session_id, .. }
            | SessionOutcome::Discarded { session_id, .. }
            | SessionOutcome::Aborted { session_id, .. }
            | SessionOutcome::Failed { session_id, .. } => *session_id,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, SessionOutcome::Committed { .. })
    }
}

/// Snapshot of the recorder for status queries
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub state: RunState,
    pub phrase: Option<String>,

    /// Id of the open session, if recording
    pub session_id: Option<u32>,

    /// Id the next allocation probes from, for the current phrase
    pub next_session_id: Option<u32>,

    pub frames_captured: usize,
    pub queued_color: usize,
    pub queued_depth: usize,

    /// Tracked bodies in the most recent body frame
    pub tracked_bodies: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub log_path: Option<PathBuf>,
    pub last_outcome: Option<SessionOutcome>,
}
