//! The external converter capability.
//!
//! The invoker never transforms bytes itself. It hands a
//! [`ConversionRequest`] to an [`ExternalConverter`] and interprets the
//! result. Two implementations ship with the crate:
//!
//! * [`CommandConverter`] — launches a command-line tool as
//!   `<program> [leading args…] convert <source> <format> -o <output>` and
//!   probes it with `<program> [leading args…] --version`.
//! * [`SimulatedConverter`] — writes a short placeholder file. Useful for
//!   demos and when no tool is installed.
//!
//! Tests inject their own implementation through the same trait.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Everything a converter needs for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Existing regular file to read.
    pub source: PathBuf,
    /// Lower-case target format identifier, e.g. `pdf`.
    pub target_format: String,
    /// Where the converter must write its artifact.
    pub output: PathBuf,
}

/// Failure reported by an [`ExternalConverter`].
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The tool ran and reported failure; `diagnostic` is its own message.
    #[error("{diagnostic}")]
    Failed { diagnostic: String },

    /// The tool could not be started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O fault while preparing or writing the conversion.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// A tool or service that performs the byte-level format transformation.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// pipeline through an `Arc` and conversions may run on a worker task.
#[async_trait]
pub trait ExternalConverter: Send + Sync {
    /// Short name for logs and messages.
    fn name(&self) -> &str;

    /// Convert `request.source` into `request.output`.
    ///
    /// Must only return `Ok` once the artifact has been fully written.
    async fn execute(&self, request: &ConversionRequest) -> Result<(), ConverterError>;

    /// True if the converter is installed and usable. Never fails.
    async fn probe(&self) -> bool;
}

/// Launches an external command-line converter.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    leading_args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one conversion, after the leading args.
    pub fn conversion_args(request: &ConversionRequest) -> Vec<OsString> {
        vec![
            OsString::from("convert"),
            request.source.clone().into_os_string(),
            OsString::from(&request.target_format),
            OsString::from("-o"),
            request.output.clone().into_os_string(),
        ]
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ExternalConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn execute(&self, request: &ConversionRequest) -> Result<(), ConverterError> {
        let mut cmd = self.command();
        cmd.args(Self::conversion_args(request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Launching {:?}", cmd.as_std());

        let output = cmd.output().await.map_err(|e| ConverterError::Launch {
            program: self.program.clone(),
            source: e,
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Err(ConverterError::Failed {
            diagnostic: diagnostic_text(&self.program, output.status, &stderr, &stdout),
        })
    }

    async fn probe(&self) -> bool {
        let mut cmd = self.command();
        cmd.arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match cmd.status().await {
            Ok(status) => {
                debug!("{} --version exited with {}", self.program, status);
                status.success()
            }
            Err(e) => {
                debug!("{} could not be launched: {}", self.program, e);
                false
            }
        }
    }
}

/// Pick the most useful failure text: stderr, then stdout, then the status.
fn diagnostic_text(program: &str, status: ExitStatus, stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    match status.code() {
        Some(code) => format!("{program} exited with status {code}"),
        None => format!("{program} was terminated by a signal"),
    }
}

/// Writes a placeholder instead of converting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedConverter;

impl SimulatedConverter {
    pub fn placeholder(source: &Path, target_format: &str) -> String {
        format!(
            "Simulated converted content from {} to {}",
            source.display(),
            target_format
        )
    }
}

#[async_trait]
impl ExternalConverter for SimulatedConverter {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn execute(&self, request: &ConversionRequest) -> Result<(), ConverterError> {
        let body = Self::placeholder(&request.source, &request.target_format);
        tokio::fs::write(&request.output, body)
            .await
            .map_err(|e| ConverterError::Io {
                context: format!("failed to write '{}'", request.output.display()),
                source: e,
            })
    }

    async fn probe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dir: &Path) -> ConversionRequest {
        let source = dir.join("report.docx");
        std::fs::write(&source, b"docx bytes").unwrap();
        ConversionRequest {
            source,
            target_format: "pdf".into(),
            output: dir.join("report.pdf"),
        }
    }

    #[test]
    fn conversion_args_layout() {
        let req = ConversionRequest {
            source: PathBuf::from("/in/a.docx"),
            target_format: "pdf".into(),
            output: PathBuf::from("/out/a.pdf"),
        };
        let args = CommandConverter::conversion_args(&req);
        assert_eq!(
            args,
            vec!["convert", "/in/a.docx", "pdf", "-o", "/out/a.pdf"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn simulated_writes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path());
        SimulatedConverter.execute(&req).await.unwrap();
        let body = std::fs::read_to_string(&req.output).unwrap();
        assert!(body.starts_with("Simulated converted content from"));
        assert!(body.ends_with("to pdf"));
        assert!(SimulatedConverter.probe().await);
    }

    #[tokio::test]
    async fn missing_program_fails_probe_and_launch() {
        let dir = tempfile::tempdir().unwrap();
        let converter = CommandConverter::new("worder-wonder-no-such-tool-7c1f", Vec::new());
        assert!(!converter.probe().await);

        let err = converter.execute(&request(dir.path())).await.unwrap_err();
        assert!(matches!(err, ConverterError::Launch { .. }), "got: {err}");
    }

    #[cfg(unix)]
    fn sh(script: &str) -> CommandConverter {
        CommandConverter::new("sh", vec!["-c".into(), script.into(), "converter".into()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_receives_source_format_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path());
        // $1=convert $2=source $3=format $4=-o $5=output
        let converter = sh(r#"[ "$1" = convert ] && [ "$3" = pdf ] && [ "$4" = -o ] && cp "$2" "$5""#);
        converter.execute(&req).await.unwrap();
        assert_eq!(std::fs::read(&req.output).unwrap(), b"docx bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let converter = sh("echo 'unsupported input' >&2; exit 3");
        let err = converter.execute(&request(dir.path())).await.unwrap_err();
        match err {
            ConverterError::Failed { diagnostic } => assert_eq!(diagnostic, "unsupported input"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_failure_without_output_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let converter = sh("exit 4");
        let err = converter.execute(&request(dir.path())).await.unwrap_err();
        assert_eq!(err.to_string(), "sh exited with status 4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_uses_version_flag() {
        let converter = sh(r#"[ "$1" = --version ]"#);
        assert!(converter.probe().await);
        let converter = sh("exit 1");
        assert!(!converter.probe().await);
    }
}
