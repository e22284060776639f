use super::session::ActiveSession;

/// Minimum skeletal samples for a session to be kept
pub const DEFAULT_MIN_FRAMES: usize = 25;

/// Commit-or-discard decision for a finished session
#[derive(Debug, Clone)]
pub enum GateDecision {
    Commit { session: ActiveSession },
    Discard { session: ActiveSession },
}

impl GateDecision {
    pub fn session(&self) -> &ActiveSession {
        match self {
            GateDecision::Commit { session } | GateDecision::Discard { session } => session,
        }
    }
}

/// Filters out accidental or too-short recordings before they use storage
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    min_frames: usize,
}

impl QualityGate {
    pub fn new(min_frames: usize) -> Self {
        Self { min_frames }
    }

    pub fn min_frames(&self) -> usize {
        self.min_frames
    }

    pub fn decide(&self, session: ActiveSession) -> GateDecision {
        if session.frames_captured < self.min_frames {
            GateDecision::Discard { session }
        } else {
            GateDecision::Commit { session }
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FRAMES)
    }
}
