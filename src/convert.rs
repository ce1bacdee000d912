//! Conversion entry points.
//!
//! [`ConversionInvoker`] turns `(source, format)` into a
//! [`ConversionOutcome`]. All validation happens here, not in the caller:
//!
//! ```text
//! source ─┬─ 1. Validate   regular file? format usable as an extension?
//!         ├─ 2. Derive     <dir>/<stem>.<format>
//!         ├─ 3. Stage      private temp dir next to the output
//!         ├─ 4. Convert    ExternalConverter::execute (optionally time-limited)
//!         └─ 5. Commit     rename staged artifact onto the output path
//! ```
//!
//! Failures are returned as `ConversionOutcome::Failure` values and leave no
//! file behind: the staging directory is removed whenever the commit step is
//! not reached.

use crate::catalog::normalize_format_id;
use crate::config::ConversionConfig;
use crate::error::ErrorKind;
use crate::output::ConversionOutcome;
use crate::pipeline::converter::{ConversionRequest, ConverterError, ExternalConverter};
use crate::pipeline::input::{self, Staging};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Reason reported for a source that is missing or not a regular file.
pub const SOURCE_NOT_FOUND: &str = "source file does not exist";

/// Validates a source, derives its output path and delegates to an
/// [`ExternalConverter`].
///
/// Cheap to clone: the converter is shared through an `Arc`.
#[derive(Clone)]
pub struct ConversionInvoker {
    converter: Arc<dyn ExternalConverter>,
    timeout: Option<Duration>,
    probe_timeout: Duration,
}

impl fmt::Debug for ConversionInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionInvoker")
            .field("converter", &self.converter.name())
            .field("timeout", &self.timeout)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl ConversionInvoker {
    /// An invoker with no conversion time limit and a 10 s probe limit.
    pub fn new(converter: Arc<dyn ExternalConverter>) -> Self {
        Self {
            converter,
            timeout: None,
            probe_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.converter())
            .with_timeout(config.timeout())
            .with_probe_timeout(config.probe_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn converter_name(&self) -> &str {
        self.converter.name()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Convert `source` to `target_format`, writing next to the source.
    ///
    /// Never panics and never returns `Err`; see [`ConversionOutcome`].
    /// An existing file at the output path is replaced.
    pub async fn convert(
        &self,
        source: impl AsRef<Path>,
        target_format: &str,
    ) -> ConversionOutcome {
        let source = source.as_ref();
        let start = Instant::now();

        // ── Step 1: Validate ─────────────────────────────────────────────
        if !input::is_valid_file(source) {
            warn!("Source not found: {}", source.display());
            return ConversionOutcome::failure(ErrorKind::NotFound, SOURCE_NOT_FOUND);
        }
        let Some(format) = normalize_format_id(target_format) else {
            return ConversionOutcome::failure(
                ErrorKind::UnsupportedFormat,
                format!("'{}' is not a valid target format", target_format),
            );
        };

        // ── Step 2: Derive output path ───────────────────────────────────
        let output_path = input::output_path_for(source, &format);
        info!(
            "Converting {} to {} via {}",
            source.display(),
            format,
            self.converter.name()
        );
        debug!("Output path: {}", output_path.display());

        // ── Step 3: Stage ────────────────────────────────────────────────
        let staging = match Staging::next_to(&output_path) {
            Ok(s) => s,
            Err(e) => {
                return ConversionOutcome::failure(
                    ErrorKind::Unexpected,
                    format!("cannot write next to '{}': {}", output_path.display(), e),
                )
            }
        };

        // ── Step 4: Convert ──────────────────────────────────────────────
        let request = ConversionRequest {
            source: source.to_path_buf(),
            target_format: format.clone(),
            output: staging.artifact().to_path_buf(),
        };
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.converter.execute(&request)).await
            {
                Ok(r) => r,
                Err(_) => {
                    warn!(
                        "{} timed out after {:?} converting {}",
                        self.converter.name(),
                        limit,
                        source.display()
                    );
                    return ConversionOutcome::failure(
                        ErrorKind::Timeout,
                        format!(
                            "{} did not finish within {}s",
                            self.converter.name(),
                            limit.as_secs_f64()
                        ),
                    );
                }
            },
            None => self.converter.execute(&request).await,
        };

        if let Err(e) = result {
            warn!("Conversion of {} failed: {}", source.display(), e);
            return converter_failure(e);
        }
        if !staging.has_artifact() {
            return ConversionOutcome::failure(
                ErrorKind::ExternalToolError,
                format!(
                    "{} reported success but produced no output",
                    self.converter.name()
                ),
            );
        }

        // ── Step 5: Commit ───────────────────────────────────────────────
        if let Err(e) = staging.commit(&output_path) {
            return ConversionOutcome::failure(
                ErrorKind::Unexpected,
                format!("failed to write '{}': {}", output_path.display(), e),
            );
        }

        info!(
            "Wrote {} in {}ms",
            output_path.display(),
            start.elapsed().as_millis()
        );
        ConversionOutcome::Success { output_path }
    }

    /// Synchronous wrapper around [`Self::convert`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn convert_sync(
        &self,
        source: impl AsRef<Path>,
        target_format: &str,
    ) -> ConversionOutcome {
        match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(self.convert(source, target_format)),
            Err(e) => ConversionOutcome::failure(
                ErrorKind::Unexpected,
                format!("failed to create tokio runtime: {}", e),
            ),
        }
    }

    /// Whether the converter is installed and answering.
    ///
    /// Bounded by the probe timeout; any failure reads as `false`.
    pub async fn check_tool_available(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.converter.probe()).await {
            Ok(available) => {
                debug!("{} available: {}", self.converter.name(), available);
                available
            }
            Err(_) => {
                warn!(
                    "{} did not answer the probe within {:?}",
                    self.converter.name(),
                    self.probe_timeout
                );
                false
            }
        }
    }
}

fn converter_failure(err: ConverterError) -> ConversionOutcome {
    let kind = match err {
        ConverterError::Failed { .. } => ErrorKind::ExternalToolError,
        ConverterError::Launch { .. } | ConverterError::Io { .. } => ErrorKind::Unexpected,
    };
    ConversionOutcome::failure(kind, err.to_string())
}
