//! Result types returned by a conversion.
//!
//! A conversion never returns `Err`: every attempt produces a
//! [`ConversionOutcome`] that a shell renders into a one-line message with
//! [`ConversionOutcome::message`].

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of a single conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// The converted file was written to `output_path`.
    Success { output_path: PathBuf },
    /// Nothing was written; `reason` is human-readable.
    Failure { reason: String, kind: ErrorKind },
}

impl ConversionOutcome {
    pub fn failure(kind: ErrorKind, reason: impl Into<String>) -> Self {
        ConversionOutcome::Failure {
            reason: reason.into(),
            kind,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    /// The failure category, or `None` on success.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionOutcome::Success { .. } => None,
            ConversionOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            ConversionOutcome::Success { output_path } => Some(output_path),
            ConversionOutcome::Failure { .. } => None,
        }
    }

    /// Render the outcome for display next to the file it came from.
    ///
    /// ```
    /// use worder_wonder::ConversionOutcome;
    ///
    /// let ok = ConversionOutcome::Success { output_path: "/docs/report.pdf".into() };
    /// assert_eq!(ok.message("/docs/report.docx"), "Successfully converted 'report.docx' to report.pdf");
    /// ```
    pub fn message(&self, source: impl AsRef<Path>) -> String {
        let name = display_name(source.as_ref());
        match self {
            ConversionOutcome::Success { output_path } => format!(
                "Successfully converted '{}' to {}",
                name,
                display_name(output_path)
            ),
            ConversionOutcome::Failure { reason, .. } => {
                format!("Error converting '{}': {}", name, reason)
            }
        }
    }
}

/// The file-name component of `path`, or the whole path if it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_is_prefixed() {
        let outcome =
            ConversionOutcome::failure(ErrorKind::NotFound, "source file does not exist");
        assert_eq!(
            outcome.message("/tmp/missing.docx"),
            "Error converting 'missing.docx': source file does not exist"
        );
        assert_eq!(outcome.kind(), Some(ErrorKind::NotFound));
        assert!(outcome.output_path().is_none());
    }

    #[test]
    fn success_accessors() {
        let outcome = ConversionOutcome::Success {
            output_path: PathBuf::from("out/report.pdf"),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.kind(), None);
        assert_eq!(outcome.output_path(), Some(Path::new("out/report.pdf")));
    }

    #[test]
    fn json_is_tagged_by_status() {
        let outcome = ConversionOutcome::failure(ErrorKind::Timeout, "took too long");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["reason"], "took too long");
    }

    #[test]
    fn display_name_falls_back_to_path() {
        assert_eq!(display_name(Path::new("/")), "/");
        assert_eq!(display_name(Path::new("a/b.txt")), "b.txt");
    }
}
