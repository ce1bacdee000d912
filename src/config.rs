//! Configuration for the conversion backend.
//!
//! Everything that decides *how* a conversion is carried out lives in
//! [`ConversionConfig`], built via [`ConversionConfigBuilder`]. Which formats
//! are offered is a separate concern owned by [`crate::catalog::FormatCatalog`].

use crate::catalog::FormatCatalog;
use crate::error::WonderError;
use crate::pipeline::converter::{CommandConverter, ExternalConverter, SimulatedConverter};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Program launched by the command backend unless overridden.
pub const DEFAULT_PROGRAM: &str = "convertapi-cli";

/// Configuration for the conversion backend.
///
/// # Example
/// ```rust
/// use worder_wonder::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .program("soffice-convert")
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Which converter carries out conversions. Default: [`ConverterBackend::Command`].
    pub backend: ConverterBackend,

    /// Executable for the command backend. Default: `convertapi-cli`.
    ///
    /// Resolved through `PATH` unless it contains a path separator.
    pub program: String,

    /// Arguments inserted before the conversion arguments on every launch,
    /// for wrappers such as `docker run … convertapi-cli`.
    pub leading_args: Vec<String>,

    /// Upper bound on one conversion in seconds; `0` disables it. Default: 300.
    ///
    /// On expiry the child process is killed and the outcome is a
    /// `Timeout` failure.
    pub timeout_secs: u64,

    /// Upper bound on the availability probe in seconds. Default: 10.
    pub probe_timeout_secs: u64,

    /// JSON catalog to use instead of the built-in table.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            backend: ConverterBackend::default(),
            program: DEFAULT_PROGRAM.to_string(),
            leading_args: Vec::new(),
            timeout_secs: 300,
            probe_timeout_secs: 10,
            catalog_path: None,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The conversion time limit, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Instantiate the converter selected by [`Self::backend`].
    pub fn converter(&self) -> Arc<dyn ExternalConverter> {
        match self.backend {
            ConverterBackend::Command => Arc::new(CommandConverter::new(
                self.program.clone(),
                self.leading_args.clone(),
            )),
            ConverterBackend::Simulated => Arc::new(SimulatedConverter),
        }
    }

    /// Load the configured catalog, falling back to the built-in table.
    pub fn catalog(&self) -> Result<FormatCatalog, WonderError> {
        match self.catalog_path {
            Some(ref path) => FormatCatalog::load(path),
            None => Ok(FormatCatalog::builtin()),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn backend(mut self, backend: ConverterBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn simulated(self) -> Self {
        self.backend(ConverterBackend::Simulated)
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.program = program.into();
        self
    }

    pub fn leading_arg(mut self, arg: impl Into<String>) -> Self {
        self.config.leading_args.push(arg.into());
        self
    }

    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.catalog_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, WonderError> {
        let c = &self.config;
        if c.backend == ConverterBackend::Command && c.program.trim().is_empty() {
            return Err(WonderError::InvalidConfig(
                "converter program must not be empty".into(),
            ));
        }
        if c.probe_timeout_secs == 0 {
            return Err(WonderError::InvalidConfig(
                "probe timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Which [`ExternalConverter`] implementation performs conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterBackend {
    /// Launch the external command-line tool. (default)
    #[default]
    Command,
    /// Write a placeholder file instead of converting. Always available.
    Simulated,
}
