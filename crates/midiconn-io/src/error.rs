//! Error types for MIDI connection handles.

use midiconn_backend::BackendFailure;
use thiserror::Error;

/// `Clone` so a handle can hand the same close outcome to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI port is closed")]
    Closed,

    #[error("MIDI backend error: {0}")]
    Backend(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// The backend's diagnostic text, for backend-reported failures.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Error::Backend(message) => Some(message),
            _ => None,
        }
    }
}

impl From<BackendFailure> for Error {
    fn from(e: BackendFailure) -> Self {
        Error::Backend(e.into_message())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let messages: Vec<String> = [
            Error::Closed,
            Error::Backend("invalid port number 7".to_string()),
            Error::InvalidConfig("queue_size must be at least 1".to_string()),
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        insta::assert_debug_snapshot!(messages, @r#"
        [
            "MIDI port is closed",
            "MIDI backend error: invalid port number 7",
            "Invalid config: queue_size must be at least 1",
        ]
        "#);
    }

    #[test]
    fn test_from_backend_failure() {
        let err: Error = BackendFailure::new("no ports").into();
        assert_eq!(err, Error::Backend("no ports".to_string()));
        assert_eq!(err.backend_message(), Some("no ports"));
        assert_eq!(Error::Closed.backend_message(), None);
    }
}
