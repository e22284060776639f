use serde::{Deserialize, Serialize};

/// Recorder run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotRunning,
    Recording,
    /// A session finished; cleared by the next write-complete poll
    Written,
}

/// When the tracking-completion guard is armed during a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Armed on every tick that sees recording requested, activation included
    #[default]
    WhileRequested,
    /// Armed only once a tracked body contributes a skeletal sample
    TrackedBody,
}

/// Edge produced by evaluating the recording-requested signal on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    /// Requested and no session open
    Activate,
    /// Request cleared while a session was open
    Deactivate { guard: bool },
}

/// Session activation state machine
///
/// Pure state; side effects of each edge belong to the caller. An
/// `Activate` edge only takes effect once the caller confirms it with
/// [`begin_session`](Self::begin_session), so a failed activation leaves the
/// machine untouched.
#[derive(Debug)]
pub struct RecordingStateMachine {
    state: RunState,
    guard: bool,
    frames_captured: usize,
    policy: GuardPolicy,
}

impl RecordingStateMachine {
    pub fn new(policy: GuardPolicy) -> Self {
        Self {
            state: RunState::NotRunning,
            guard: false,
            frames_captured: 0,
            policy,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RunState::Recording
    }

    pub fn frames_captured(&self) -> usize {
        self.frames_captured
    }

    /// Evaluate the signal at the start of a tick
    pub fn evaluate(&mut self, requested: bool) -> Edge {
        match (requested, self.state) {
            (true, RunState::Recording) => {
                if self.policy == GuardPolicy::WhileRequested {
                    self.guard = true;
                }
                Edge::None
            }
            (true, _) => Edge::Activate,
            (false, RunState::Recording) => {
                let guard = self.guard;
                self.guard = false;
                Edge::Deactivate { guard }
            }
            (false, _) => Edge::None,
        }
    }

    /// Confirm an `Activate` edge
    pub fn begin_session(&mut self) {
        self.state = RunState::Recording;
        self.frames_captured = 0;
        self.guard = self.policy == GuardPolicy::WhileRequested;
    }

    /// Count one skeletal sample from a tracked body
    pub fn record_sample(&mut self) {
        if self.state != RunState::Recording {
            return;
        }
        self.frames_captured += 1;
        if self.policy == GuardPolicy::TrackedBody {
            self.guard = true;
        }
    }

    /// Session finalised (committed or discarded by the gate)
    pub fn finish_written(&mut self) {
        self.state = RunState::Written;
        self.guard = false;
    }

    /// Session dropped without reaching the gate, or its commit failed
    pub fn finish_aborted(&mut self) {
        self.state = RunState::NotRunning;
        self.guard = false;
    }

    /// One-shot: true on the first poll after a session was written
    pub fn poll_write_complete(&mut self) -> bool {
        if self.state == RunState::Written {
            self.state = RunState::NotRunning;
            return true;
        }
        false
    }
}
