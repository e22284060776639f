use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};

pub const COLOR_DIR: &str = "color";
pub const DEPTH_DIR: &str = "depth";

/// On-disk location of one session: `<root>/<phrase>/<session_id>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    pub session_id: u32,
    pub phrase: String,
    pub session_dir: PathBuf,
}

impl SessionLayout {
    pub fn color_dir(&self) -> PathBuf {
        self.session_dir.join(COLOR_DIR)
    }

    pub fn depth_dir(&self) -> PathBuf {
        self.session_dir.join(DEPTH_DIR)
    }
}

/// Allocates collision-free session directories under a data root
///
/// Each phrase keeps its own next-candidate id. Allocation probes upward from
/// the candidate and reserves the first id whose directory does not exist
/// with a non-recursive `create_dir`, so an existing session is never reused
/// even if another process created it between probes.
pub struct SessionDirectoryManager {
    root: PathBuf,
    first_id: u32,
    next_ids: HashMap<String, u32>,
}

impl SessionDirectoryManager {
    pub fn new(root: impl Into<PathBuf>, first_id: u32) -> Self {
        Self {
            root: root.into(),
            first_id,
            next_ids: HashMap::new(),
        }
    }

    pub fn phrase_root(&self, phrase: &str) -> PathBuf {
        self.root.join(phrase)
    }

    /// Id that the next allocation for `phrase` will start probing from
    pub fn next_candidate(&self, phrase: &str) -> u32 {
        self.next_ids.get(phrase).copied().unwrap_or(self.first_id)
    }

    /// Reserve the first free session id at or above the candidate
    pub fn allocate(&mut self, phrase: &str) -> CaptureResult<SessionLayout> {
        let phrase_root = self.phrase_root(phrase);
        fs::create_dir_all(&phrase_root).map_err(|e| CaptureError::io(&phrase_root, e))?;

        let mut session_id = self.next_candidate(phrase);
        loop {
            let session_dir = phrase_root.join(session_id.to_string());
            match fs::create_dir(&session_dir) {
                Ok(()) => {
                    info!(
                        "Allocated session {} for phrase '{}' at {}",
                        session_id,
                        phrase,
                        session_dir.display()
                    );
                    return Ok(SessionLayout {
                        session_id,
                        phrase: phrase.to_string(),
                        session_dir,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Session directory {} exists, probing next id", session_dir.display());
                    session_id = session_id.checked_add(1).ok_or_else(|| {
                        CaptureError::io(
                            &phrase_root,
                            std::io::Error::new(ErrorKind::Other, "session ids exhausted"),
                        )
                    })?;
                }
                Err(e) => return Err(CaptureError::io(session_dir, e)),
            }
        }
    }

    /// Create the `color/` and `depth/` children of a session
    pub fn create_frame_dirs(&self, layout: &SessionLayout) -> CaptureResult<()> {
        for dir in [layout.color_dir(), layout.depth_dir()] {
            fs::create_dir_all(&dir).map_err(|e| CaptureError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Mark a session as committed; the next allocation starts after it
    pub fn advance(&mut self, layout: &SessionLayout) {
        let next = layout.session_id.saturating_add(1);
        self.next_ids.insert(layout.phrase.clone(), next);
    }

    /// Give back a session that was not committed
    ///
    /// The directory is removed only when empty; anything left inside keeps
    /// the id reserved and later allocations probe past it.
    pub fn release(&self, layout: &SessionLayout) {
        match fs::remove_dir(&layout.session_dir) {
            Ok(()) => debug!("Released session directory {}", layout.session_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Keeping session directory {} ({}); id {} stays reserved",
                layout.session_dir.display(),
                e,
                layout.session_id
            ),
        }
    }

    /// Delete any frame output written for a session (rollback of a failed commit)
    pub fn remove_frame_output(&self, layout: &SessionLayout) -> CaptureResult<()> {
        for dir in [layout.color_dir(), layout.depth_dir()] {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CaptureError::io(&dir, e)),
            }
        }
        Ok(())
    }
}
