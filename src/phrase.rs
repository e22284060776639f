use crate::error::{CaptureError, CaptureResult};

/// Label of the phrase currently being signed
///
/// Read once per session at activation; the value is copied into the
/// session, so changing it mid-session only affects the next session.
#[derive(Debug, Clone, Default)]
pub struct PhraseContext {
    current: Option<String>,
}

impl PhraseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, phrase: impl Into<String>) -> CaptureResult<()> {
        let phrase = phrase.into();
        validate_phrase(&phrase)?;
        self.current = Some(phrase);
        Ok(())
    }

    pub fn current(&self) -> CaptureResult<&str> {
        self.current.as_deref().ok_or(CaptureError::MissingPhrase)
    }

    pub fn get(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Phrases become directory and file name components
pub fn validate_phrase(phrase: &str) -> CaptureResult<()> {
    let invalid = phrase.trim().is_empty()
        || phrase == "."
        || phrase == ".."
        || phrase.contains(['/', '\\', '\0']);

    if invalid {
        return Err(CaptureError::InvalidPhrase(phrase.to_string()));
    }
    Ok(())
}
