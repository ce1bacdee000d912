//! The per-selection state machine behind a conversion UI.
//!
//! A [`ConversionPipeline`] tracks one file selection at a time and decides
//! which user actions are currently allowed. It has no knowledge of how it
//! is rendered: a shell calls its operations and reads its state back.
//!
//! ```text
//!            select_file            choose_format        request_conversion
//!   Idle ───────────────▶ FileSelected ─────────▶ FormatChosen ─────────▶ Converting
//!                          ▲    │                   ▲      ▲                  │
//!                          └────┘ select_file       │      └──────────────────┘
//!                                                   └─ choose_format   outcome applied
//! ```
//!
//! `select_file` is legal from every state and always lands in
//! `FileSelected`. Rejected operations return a [`PipelineError`] and leave
//! the pipeline exactly as it was.
//!
//! ## Background conversions
//!
//! [`ConversionPipeline::request_conversion`] runs the conversion inline. A
//! shell that must stay responsive can split it instead:
//! [`begin_conversion`](ConversionPipeline::begin_conversion) hands out a
//! [`ConversionJob`] that can be moved to a worker task, and
//! [`finish_conversion`](ConversionPipeline::finish_conversion) applies the
//! result. Until then the pipeline stays in `Converting` and refuses a second
//! conversion.
//!
//! Selecting another file while a job is out leaves `Converting`, but the job
//! still counts as in flight: no new conversion starts until it is handed
//! back, even if its outcome will be discarded.

use crate::catalog::{FileExtension, FormatCatalog};
use crate::convert::ConversionInvoker;
use crate::error::PipelineError;
use crate::output::ConversionOutcome;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the pipeline is in the select → choose → convert flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No file selected yet.
    #[default]
    Idle,
    /// A file is selected; candidate formats resolved (possibly none).
    FileSelected,
    /// A target format has been chosen.
    FormatChosen,
    /// A conversion is in flight.
    Converting,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "no file is selected",
            PipelineState::FileSelected => "no format is chosen",
            PipelineState::FormatChosen => "ready to convert",
            PipelineState::Converting => "converting",
        };
        f.write_str(s)
    }
}

/// The file currently selected and what can be done with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub source_path: PathBuf,
    pub source_extension: Option<FileExtension>,
    pub candidate_formats: Vec<String>,
    pub chosen_format: Option<String>,
}

/// A conversion taken out of the pipeline by
/// [`ConversionPipeline::begin_conversion`].
///
/// `Send + 'static`, so it can be moved onto a worker task. Hand it back
/// with its outcome to [`ConversionPipeline::finish_conversion`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    generation: u64,
    source_path: PathBuf,
    target_format: String,
    invoker: ConversionInvoker,
}

impl ConversionJob {
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_format(&self) -> &str {
        &self.target_format
    }

    /// Run the conversion. Does not touch the pipeline.
    pub async fn run(&self) -> ConversionOutcome {
        self.invoker
            .convert(&self.source_path, &self.target_format)
            .await
    }
}

/// One in-memory select/choose/convert session.
#[derive(Debug)]
pub struct ConversionPipeline {
    catalog: Arc<FormatCatalog>,
    invoker: ConversionInvoker,
    state: PipelineState,
    selection: Option<SelectionState>,
    last_outcome: Option<ConversionOutcome>,
    // Bumped on every selection so a job started for an older file is
    // recognised as stale when it is handed back.
    generation: u64,
    // Generation of the job handed out by `begin_conversion` and not yet
    // returned. Survives `select_file` and `reset`.
    in_flight: Option<u64>,
}

impl ConversionPipeline {
    pub fn new(catalog: Arc<FormatCatalog>, invoker: ConversionInvoker) -> Self {
        Self {
            catalog,
            invoker,
            state: PipelineState::Idle,
            selection: None,
            last_outcome: None,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    pub fn invoker(&self) -> &ConversionInvoker {
        &self.invoker
    }

    /// Formats to offer for the selected file; empty when nothing is
    /// selected or the extension is unknown.
    pub fn candidate_formats(&self) -> &[String] {
        self.selection
            .as_ref()
            .map(|s| s.candidate_formats.as_slice())
            .unwrap_or(&[])
    }

    pub fn chosen_format(&self) -> Option<&str> {
        self.selection.as_ref()?.chosen_format.as_deref()
    }

    /// Outcome of the most recent conversion for the current selection.
    pub fn last_outcome(&self) -> Option<&ConversionOutcome> {
        self.last_outcome.as_ref()
    }

    /// [`Self::last_outcome`] rendered for display.
    pub fn last_message(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        self.last_outcome
            .as_ref()
            .map(|o| o.message(&selection.source_path))
    }

    /// Whether a shell should enable its convert action.
    pub fn can_convert(&self) -> bool {
        self.state == PipelineState::FormatChosen && self.in_flight.is_none()
    }

    /// True while a job from [`Self::begin_conversion`] has not been handed
    /// back, including one made stale by a later selection.
    pub fn conversion_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Select a new source file. Legal in every state.
    ///
    /// Resolves candidate formats from the catalog and clears the chosen
    /// format and last outcome. A job still in flight for the previous
    /// selection is discarded when it is handed back.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> &SelectionState {
        let source_path = path.into();
        let source_extension = FileExtension::from_path(&source_path);
        let candidate_formats = source_extension
            .as_ref()
            .map(|ext| self.catalog.lookup_ext(ext).to_vec())
            .unwrap_or_default();

        if self.state == PipelineState::Converting {
            warn!(
                "New file selected while converting; the running conversion will be discarded"
            );
        }
        debug!(
            "Selected {} ({} candidate formats)",
            source_path.display(),
            candidate_formats.len()
        );

        self.generation += 1;
        self.state = PipelineState::FileSelected;
        self.last_outcome = None;
        self.selection.insert(SelectionState {
            source_path,
            source_extension,
            candidate_formats,
            chosen_format: None,
        })
    }

    /// Choose the target format for the selected file.
    ///
    /// Matching ignores case and a leading dot. Fails with `InvalidState`
    /// when no file is selected or a conversion is running, and with
    /// `UnsupportedFormat` when `format` is not a candidate.
    pub fn choose_format(&mut self, format: &str) -> Result<(), PipelineError> {
        let state = self.state;
        let selection = match (state, self.selection.as_mut()) {
            (PipelineState::FileSelected | PipelineState::FormatChosen, Some(s)) => s,
            _ => {
                return Err(PipelineError::InvalidState {
                    operation: "choose a format",
                    state,
                })
            }
        };

        let wanted = format.trim().trim_start_matches('.');
        let Some(found) = selection
            .candidate_formats
            .iter()
            .find(|c| c.eq_ignore_ascii_case(wanted))
            .cloned()
        else {
            return Err(PipelineError::UnsupportedFormat {
                format: format.to_string(),
                available: selection.candidate_formats.clone(),
            });
        };

        debug!("Chose format {}", found);
        selection.chosen_format = Some(found);
        self.state = PipelineState::FormatChosen;
        Ok(())
    }

    /// Move to `Converting` and hand out the conversion to run.
    ///
    /// Rejected with `InvalidState` unless a format is chosen and no earlier
    /// job is still out.
    pub fn begin_conversion(&mut self) -> Result<ConversionJob, PipelineError> {
        if self.in_flight.is_some() {
            return Err(PipelineError::InvalidState {
                operation: "request a conversion",
                state: PipelineState::Converting,
            });
        }
        let state = self.state;
        let (source_path, target_format) = match (state, self.selection.as_ref()) {
            (PipelineState::FormatChosen, Some(SelectionState {
                source_path,
                chosen_format: Some(format),
                ..
            })) => (source_path.clone(), format.clone()),
            _ => {
                return Err(PipelineError::InvalidState {
                    operation: "request a conversion",
                    state,
                })
            }
        };

        self.state = PipelineState::Converting;
        self.in_flight = Some(self.generation);
        Ok(ConversionJob {
            generation: self.generation,
            source_path,
            target_format,
            invoker: self.invoker.clone(),
        })
    }

    /// Apply the outcome of `job` and return to `FormatChosen`.
    ///
    /// Handing back the outstanding job always releases it, so a new
    /// conversion can start. Rejected with `InvalidState` if `job` is not the
    /// outstanding one or belongs to an earlier selection; the outcome is
    /// then dropped.
    pub fn finish_conversion(
        &mut self,
        job: ConversionJob,
        outcome: ConversionOutcome,
    ) -> Result<&ConversionOutcome, PipelineError> {
        let outstanding = self.in_flight == Some(job.generation);
        if outstanding {
            self.in_flight = None;
        }
        if !outstanding
            || self.state != PipelineState::Converting
            || job.generation != self.generation
        {
            warn!(
                "Discarding stale result for {}",
                job.source_path.display()
            );
            return Err(PipelineError::InvalidState {
                operation: "apply a conversion result",
                state: self.state,
            });
        }

        self.state = PipelineState::FormatChosen;
        let applied = self.last_outcome.insert(outcome);
        Ok(&*applied)
    }

    /// Convert the selected file to the chosen format and wait for it.
    pub async fn request_conversion(&mut self) -> Result<&ConversionOutcome, PipelineError> {
        let job = self.begin_conversion()?;
        let outcome = job.run().await;
        self.finish_conversion(job, outcome)
    }

    /// Forget the selection and return to `Idle`. A job still out is not
    /// cancelled and must be handed back before the next conversion.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = PipelineState::Idle;
        self.selection = None;
        self.last_outcome = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::converter::{
        ConversionRequest, ConverterError, ExternalConverter, SimulatedConverter,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConverter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalConverter for CountingConverter {
        fn name(&self) -> &str {
            "counting"
        }

        async fn execute(&self, request: &ConversionRequest) -> Result<(), ConverterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SimulatedConverter.execute(request).await
        }

        async fn probe(&self) -> bool {
            true
        }
    }

    fn pipeline() -> (ConversionPipeline, Arc<CountingConverter>) {
        let converter = Arc::new(CountingConverter {
            calls: AtomicUsize::new(0),
        });
        let invoker = ConversionInvoker::new(converter.clone());
        (
            ConversionPipeline::new(Arc::new(FormatCatalog::builtin()), invoker),
            converter,
        )
    }

    #[test]
    fn starts_idle() {
        let (p, _) = pipeline();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.selection().is_none());
        assert!(p.candidate_formats().is_empty());
        assert!(!p.can_convert());
        assert!(p.last_message().is_none());
    }

    #[test]
    fn select_resolves_candidates() {
        let (mut p, _) = pipeline();
        let selection = p.select_file("/docs/Report.DOCX");
        assert_eq!(selection.source_extension.as_ref().unwrap().as_str(), ".docx");
        assert_eq!(
            selection.candidate_formats,
            vec!["pdf", "txt", "html", "jpg", "png"]
        );
        assert_eq!(selection.chosen_format, None);
        assert_eq!(p.state(), PipelineState::FileSelected);
    }

    #[test]
    fn unknown_extension_has_no_candidates() {
        let (mut p, _) = pipeline();
        p.select_file("image.bmp");
        assert!(p.candidate_formats().is_empty());
        let err = p.choose_format("pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(p.state(), PipelineState::FileSelected);
        assert!(!p.can_convert());
    }

    #[test]
    fn choose_before_select_is_invalid_state() {
        let (mut p, _) = pipeline();
        let err = p.choose_format("pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[test]
    fn choose_ignores_case_and_dot() {
        let (mut p, _) = pipeline();
        p.select_file("report.docx");
        p.choose_format(".PDF").unwrap();
        assert_eq!(p.chosen_format(), Some("pdf"));
        assert_eq!(p.state(), PipelineState::FormatChosen);
        assert!(p.can_convert());
    }

    #[test]
    fn rejected_choice_keeps_previous_choice() {
        let (mut p, _) = pipeline();
        p.select_file("report.docx");
        p.choose_format("txt").unwrap();
        let err = p.choose_format("mp3").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedFormat { ref format, .. } if format == "mp3"
        ));
        assert_eq!(p.chosen_format(), Some("txt"));
        assert_eq!(p.state(), PipelineState::FormatChosen);
    }

    #[test]
    fn reselecting_clears_choice() {
        let (mut p, _) = pipeline();
        p.select_file("report.docx");
        p.choose_format("pdf").unwrap();
        p.select_file("slides.pptx");
        assert_eq!(p.chosen_format(), None);
        assert_eq!(p.candidate_formats(), ["pdf", "jpg", "png"]);
        assert_eq!(p.state(), PipelineState::FileSelected);
    }

    #[tokio::test]
    async fn request_without_format_is_invalid_state() {
        let (mut p, converter) = pipeline();
        let err = p.request_conversion().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        p.select_file("report.docx");
        let err = p.request_conversion().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn conversion_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, converter) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        let outcome = p.request_conversion().await.unwrap().clone();

        assert_eq!(
            outcome,
            ConversionOutcome::Success {
                output_path: dir.path().join("report.pdf")
            }
        );
        assert_eq!(p.state(), PipelineState::FormatChosen);
        assert_eq!(p.last_outcome(), Some(&outcome));
        assert_eq!(
            p.last_message().unwrap(),
            "Successfully converted 'report.docx' to report.pdf"
        );
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);

        // Reusable: convert again to another format.
        p.choose_format("txt").unwrap();
        assert!(p.request_conversion().await.unwrap().is_success());
        assert_eq!(converter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_conversion_returns_to_format_chosen() {
        let dir = tempfile::tempdir().unwrap();
        let (mut p, converter) = pipeline();
        p.select_file(dir.path().join("gone.docx"));
        p.choose_format("pdf").unwrap();

        let outcome = p.request_conversion().await.unwrap();
        assert_eq!(outcome.kind(), Some(ErrorKind::NotFound));
        assert_eq!(p.state(), PipelineState::FormatChosen);
        assert_eq!(
            p.last_message().unwrap(),
            "Error converting 'gone.docx': source file does not exist"
        );
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reentrant_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, converter) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();

        let job = p.begin_conversion().unwrap();
        assert_eq!(p.state(), PipelineState::Converting);
        assert!(!p.can_convert());

        let err = p.request_conversion().await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidState {
                operation: "request a conversion",
                state: PipelineState::Converting
            }
        );
        assert_eq!(p.choose_format("txt").unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);

        let outcome = job.run().await;
        assert!(p.finish_conversion(job, outcome).unwrap().is_success());
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(p.state(), PipelineState::FormatChosen);
    }

    #[tokio::test]
    async fn job_runs_on_worker_task() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sheet.xlsx");
        std::fs::write(&source, b"xlsx").unwrap();

        let (mut p, _) = pipeline();
        p.select_file(&source);
        p.choose_format("csv").unwrap();
        let job = p.begin_conversion().unwrap();
        assert_eq!(job.target_format(), "csv");
        assert_eq!(job.source_path(), source.as_path());

        let (job, outcome) = tokio::spawn(async move {
            let outcome = job.run().await;
            (job, outcome)
        })
        .await
        .unwrap();

        let applied = p.finish_conversion(job, outcome).unwrap();
        assert_eq!(applied.output_path(), Some(dir.path().join("sheet.csv").as_path()));
    }

    #[tokio::test]
    async fn stale_job_is_discarded_after_reselect() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, _) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        let job = p.begin_conversion().unwrap();

        p.select_file(dir.path().join("other.txt"));
        assert_eq!(p.state(), PipelineState::FileSelected);

        let outcome = job.run().await;
        let err = p.finish_conversion(job, outcome).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(p.last_outcome().is_none());
        assert_eq!(p.state(), PipelineState::FileSelected);
        assert!(!p.conversion_in_flight());
    }

    #[tokio::test]
    async fn reselect_does_not_allow_a_second_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, converter) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        let first = p.begin_conversion().unwrap();

        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        assert_eq!(p.state(), PipelineState::FormatChosen);
        assert!(p.conversion_in_flight());
        assert!(!p.can_convert());

        let err = p.begin_conversion().unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidState {
                operation: "request a conversion",
                state: PipelineState::Converting
            }
        );
        assert_eq!(p.request_conversion().await.unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(p.state(), PipelineState::FormatChosen);
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);

        // The stale job is discarded but releases the pipeline.
        let outcome = first.run().await;
        assert!(p.finish_conversion(first, outcome).is_err());
        assert!(p.last_outcome().is_none());
        assert!(p.can_convert());

        assert!(p.request_conversion().await.unwrap().is_success());
        assert_eq!(converter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn job_handed_back_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, _) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        let job = p.begin_conversion().unwrap();
        let copy = job.clone();

        let outcome = job.run().await;
        p.finish_conversion(job, outcome.clone()).unwrap();
        let err = p.finish_conversion(copy, outcome).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(p.state(), PipelineState::FormatChosen);
    }

    #[tokio::test]
    async fn reset_keeps_job_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, b"docx").unwrap();

        let (mut p, _) = pipeline();
        p.select_file(&source);
        p.choose_format("pdf").unwrap();
        let job = p.begin_conversion().unwrap();

        p.reset();
        p.select_file(&source);
        p.choose_format("txt").unwrap();
        assert!(p.begin_conversion().is_err());

        let outcome = job.run().await;
        assert!(p.finish_conversion(job, outcome).is_err());
        assert!(p.begin_conversion().is_ok());
    }

    #[test]
    fn reset_returns_to_idle() {
        let (mut p, _) = pipeline();
        p.select_file("report.docx");
        p.choose_format("pdf").unwrap();
        p.reset();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(p.selection().is_none());
        assert_eq!(p.chosen_format(), None);
    }

    #[test]
    fn selection_serialises_for_shells() {
        let (mut p, _) = pipeline();
        p.select_file("notes.TXT");
        let json = serde_json::to_value(p.selection().unwrap()).unwrap();
        assert_eq!(json["source_extension"], ".txt");
        assert_eq!(json["candidate_formats"][0], "pdf");
        assert!(json["chosen_format"].is_null());
    }
}
