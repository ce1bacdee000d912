//! Error types for the worder-wonder library.
//!
//! Three kinds of failure flow through the crate and each has its own type:
//!
//! * [`WonderError`] — **Fatal**: the library cannot be set up at all
//!   (invalid configuration, unreadable or malformed catalog). Returned as
//!   `Err(WonderError)` from constructors and loaders.
//!
//! * [`PipelineError`] — **Rejected transition**: the caller asked the
//!   [`crate::session::ConversionPipeline`] for something its current state
//!   does not allow. The pipeline is left untouched.
//!
//! * [`ErrorKind`] — the category carried by a failed
//!   [`crate::output::ConversionOutcome`]. Conversion failures are values,
//!   never `Err`, so a shell can render them like any other result.

use crate::session::PipelineState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Category of a failed conversion or rejected pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The source file does not exist or is not a regular file.
    NotFound,
    /// The chosen format is not offered for the source, or no formats are.
    UnsupportedFormat,
    /// The external converter ran and reported a failure.
    ExternalToolError,
    /// I/O, permission or environment fault.
    Unexpected,
    /// The operation is not permitted in the pipeline's current state.
    InvalidState,
    /// The external converter did not finish within the configured limit.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::ExternalToolError => "external tool error",
            ErrorKind::Unexpected => "unexpected error",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Fatal errors returned by the worder-wonder library.
#[derive(Debug, Error)]
pub enum WonderError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catalog errors ────────────────────────────────────────────────────
    /// The catalog file could not be read.
    #[error("Failed to read format catalog '{path}': {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON of the expected shape.
    #[error("Format catalog is not valid JSON: {detail}\nExpected an object like {{\".docx\": [\"pdf\", \"txt\"]}}")]
    CatalogParse { detail: String },

    /// The catalog parsed but violates an invariant.
    #[error("Invalid format catalog: {0}")]
    InvalidCatalog(String),
}

/// A pipeline operation was rejected. The pipeline state is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The operation is not permitted in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    /// The requested format is not among the candidates for the selected file.
    #[error("format '{format}' is not available for this file (available: {})", display_list(.available))]
    UnsupportedFormat {
        format: String,
        available: Vec<String>,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidState { .. } => ErrorKind::InvalidState,
            PipelineError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
        }
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display() {
        let e = PipelineError::InvalidState {
            operation: "request a conversion",
            state: PipelineState::Converting,
        };
        let msg = e.to_string();
        assert!(msg.contains("request a conversion"), "got: {msg}");
        assert!(msg.contains("converting"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn unsupported_format_lists_candidates() {
        let e = PipelineError::UnsupportedFormat {
            format: "mp3".into(),
            available: vec!["pdf".into(), "txt".into()],
        };
        assert!(e.to_string().contains("mp3"));
        assert!(e.to_string().contains("pdf, txt"));
        assert_eq!(e.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn unsupported_format_without_candidates() {
        let e = PipelineError::UnsupportedFormat {
            format: "pdf".into(),
            available: vec![],
        };
        assert!(e.to_string().contains("available: none"));
    }

    #[test]
    fn error_kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ExternalToolError).unwrap();
        assert_eq!(json, "\"external_tool_error\"");
    }

    #[test]
    fn catalog_read_display() {
        let e = WonderError::CatalogRead {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.to_string().contains("missing.json"));
    }
}
