//! # worder-wonder
//!
//! Pick a file, choose a target format, hand the work to an external
//! converter, report the result.
//!
//! The crate contains no conversion engine. It owns the contract around one:
//! which formats are offered for which file, how the converter is invoked,
//! what happens to partial output, and which user actions are legal at each
//! step. A GUI, TUI or the bundled CLI drives it through
//! [`ConversionPipeline`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! path
//!  │
//!  ├─ 1. Select   FileExtension → FormatCatalog::lookup → candidate formats
//!  ├─ 2. Choose   one of the candidates
//!  ├─ 3. Convert  ConversionInvoker → ExternalConverter (staged, time-limited)
//!  └─ 4. Report   ConversionOutcome → "Successfully converted …" / "Error converting …"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use worder_wonder::{ConversionConfig, ConversionInvoker, ConversionPipeline, FormatCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let invoker = ConversionInvoker::from_config(&config);
//!     if !invoker.check_tool_available().await {
//!         eprintln!("converter not available; conversions will fail");
//!     }
//!
//!     let mut pipeline = ConversionPipeline::new(Arc::new(FormatCatalog::builtin()), invoker);
//!     pipeline.select_file("report.docx");
//!     println!("formats: {:?}", pipeline.candidate_formats());
//!     pipeline.choose_format("pdf")?;
//!     pipeline.request_conversion().await?;
//!     println!("{}", pipeline.last_message().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `worder-wonder` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{FileExtension, FormatCatalog};
pub use config::{ConversionConfig, ConversionConfigBuilder, ConverterBackend};
pub use convert::ConversionInvoker;
pub use error::{ErrorKind, PipelineError, WonderError};
pub use output::ConversionOutcome;
pub use pipeline::converter::{
    CommandConverter, ConversionRequest, ConverterError, ExternalConverter, SimulatedConverter,
};
pub use session::{ConversionJob, ConversionPipeline, PipelineState, SelectionState};
