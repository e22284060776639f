//! Session capture
//!
//! - `state`: activation state machine driven by the recording request
//! - `gate`: commit-or-discard decision on deactivation
//! - `buffer`: color/depth queues for the open session
//! - `recorder`: ties the above to storage and the skeletal log
//! - `pipeline`: runs a recorder against live sensor streams

mod buffer;
mod gate;
mod pipeline;
mod recorder;
mod session;
mod state;

pub use buffer::FrameIngestBuffer;
pub use gate::{GateDecision, QualityGate, DEFAULT_MIN_FRAMES};
pub use pipeline::CapturePipeline;
pub use recorder::SessionRecorder;
pub use session::{ActiveSession, RecorderStatus, SessionOutcome};
pub use state::{Edge, GuardPolicy, RecordingStateMachine, RunState};
