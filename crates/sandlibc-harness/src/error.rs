//! Harness errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no fixture JSON files under {}", .0.display())]
    NoFixtures(PathBuf),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("bad input for {function}: {message}")]
    BadInput {
        function: String,
        message: String,
    },
}

impl HarnessError {
    pub(crate) fn bad_input(function: &str, message: impl Into<String>) -> Self {
        Self::BadInput {
            function: function.to_owned(),
            message: message.into(),
        }
    }
}
