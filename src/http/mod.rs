//! HTTP control surface for the surrounding application
//!
//! - POST /session/start - Request recording
//! - POST /session/stop - Clear the recording request
//! - POST /session/toggle - Record-button toggle
//! - POST /session/write-complete - One-shot write-complete poll
//! - GET /session/status - Recorder status
//! - PUT /phrase - Set the phrase for the next session
//! - GET /preview.jpg - Latest color frame
//! - GET /health - Readiness (disk, sensor, bodies)

mod handlers;
mod routes;
mod state;

pub use handlers::{PhraseRequest, WriteCompleteResponse};
pub use routes::create_router;
pub use state::AppState;
