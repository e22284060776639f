//! Skeletal sample log
//!
//! The recorder only relies on the [`JointStreamWriter`] contract; the file
//! layout below is one implementation of it.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::storage::SessionLayout;

/// Append-only sink for skeletal sample lines, one log per session
pub trait JointStreamWriter: Send {
    /// Phrase used to name the next log
    fn set_current_phrase(&mut self, phrase: &str);

    /// Open a new log for a session and return its path
    fn start_new_phrase(&mut self, layout: &SessionLayout) -> CaptureResult<PathBuf>;

    /// Append one sample line; a newline is added
    fn write_line(&mut self, line: &str) -> CaptureResult<()>;

    /// Flush and close the open log
    fn end_phrase(&mut self) -> CaptureResult<()>;

    /// Remove the most recently started log for a session
    fn delete_last_sample(&mut self, layout: &SessionLayout) -> CaptureResult<()>;
}

/// Writes `<session_dir>/<phrase>_<session_id>.txt`
#[derive(Default)]
pub struct FileJointWriter {
    phrase: Option<String>,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    lines_written: usize,
}

impl FileJointWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_path(phrase: &str, layout: &SessionLayout) -> PathBuf {
        layout
            .session_dir
            .join(format!("{}_{}.txt", phrase, layout.session_id))
    }

    fn close(&mut self) -> CaptureResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let path = self.current_path.clone().unwrap_or_default();
            writer.flush().map_err(|e| CaptureError::io(path, e))?;
        }
        Ok(())
    }
}

impl JointStreamWriter for FileJointWriter {
    fn set_current_phrase(&mut self, phrase: &str) {
        self.phrase = Some(phrase.to_string());
    }

    fn start_new_phrase(&mut self, layout: &SessionLayout) -> CaptureResult<PathBuf> {
        self.close()?;

        let phrase = self.phrase.clone().ok_or(CaptureError::MissingPhrase)?;
        let path = Self::log_path(&phrase, layout);
        let file = File::create(&path).map_err(|e| CaptureError::io(&path, e))?;

        info!("Started skeletal log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path.clone());
        self.lines_written = 0;
        Ok(path)
    }

    fn write_line(&mut self, line: &str) -> CaptureResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            debug!("Dropping skeletal sample: no open log");
            return Ok(());
        };

        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| CaptureError::io(self.current_path.clone().unwrap_or_default(), e))?;
        self.lines_written += 1;
        Ok(())
    }

    fn end_phrase(&mut self) -> CaptureResult<()> {
        self.close()?;
        if let Some(path) = &self.current_path {
            info!("Closed skeletal log {} ({} samples)", path.display(), self.lines_written);
        }
        Ok(())
    }

    fn delete_last_sample(&mut self, layout: &SessionLayout) -> CaptureResult<()> {
        // Closing first so buffered lines are not flushed into a deleted file
        self.writer = None;

        let path = match self.current_path.take() {
            Some(path) if path.starts_with(&layout.session_dir) => path,
            _ => {
                let phrase = self.phrase.as_deref().unwrap_or(&layout.phrase);
                Self::log_path(phrase, layout)
            }
        };

        remove_if_present(&path)?;
        self.lines_written = 0;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> CaptureResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Deleted skeletal log {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Skeletal log {} already gone", path.display());
            Ok(())
        }
        Err(e) => Err(CaptureError::io(path, e)),
    }
}
