//! Building blocks of a single conversion.
//!
//! ```text
//! input ──▶ converter ──▶ input::Staging::commit
//! (validate, derive)  (external tool)   (rename into place)
//! ```
//!
//! 1. [`input`]     — source validation, output-path derivation and the
//!    staging directory that keeps failed conversions from leaving files
//! 2. [`converter`] — the [`converter::ExternalConverter`] capability and
//!    its command-line and simulated implementations
//!
//! [`crate::convert::ConversionInvoker`] strings these together.

pub mod converter;
pub mod input;
