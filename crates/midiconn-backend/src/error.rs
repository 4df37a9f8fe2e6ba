//! Failure type reported by backend capabilities.

use thiserror::Error;

/// A backend call did not succeed. Carries the backend's own diagnostic text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendFailure {
    message: String,
}

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for BackendFailure {
    fn from(e: midir::InitError) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for BackendFailure {
    fn from(e: midir::PortInfoError) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for BackendFailure {
    fn from(e: midir::SendError) -> Self {
        Self::new(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl<T> From<midir::ConnectError<T>> for BackendFailure {
    fn from(e: midir::ConnectError<T>) -> Self {
        Self::new(e.to_string())
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendFailure>;
