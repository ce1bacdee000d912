//! Source validation and output-path derivation.
//!
//! The output artifact always lands next to its source: same directory, same
//! stem, new extension. The converter itself writes into a private staging
//! directory in that same directory, so moving the finished artifact into
//! place is a rename on one filesystem, and a failed conversion leaves
//! nothing behind when the [`TempDir`] is dropped.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const STAGING_PREFIX: &str = ".worder-wonder-";

/// True if `path` exists and is a regular file (symlinks are followed).
pub fn is_valid_file(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Replace the extension of `source` with `.{target_format}`.
///
/// ```
/// use std::path::Path;
/// use worder_wonder::pipeline::input::output_path_for;
///
/// assert_eq!(output_path_for(Path::new("/docs/report.docx"), "pdf"), Path::new("/docs/report.pdf"));
/// assert_eq!(output_path_for(Path::new("notes"), "txt"), Path::new("notes.txt"));
/// ```
pub fn output_path_for(source: &Path, target_format: &str) -> PathBuf {
    source.with_extension(target_format)
}

/// Directory that holds `path`; `.` for a bare relative file name.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// A staging area for one conversion, removed on drop.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    artifact: PathBuf,
}

impl Staging {
    /// Create a staging directory next to `output_path`.
    pub fn next_to(output_path: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent_dir(output_path))?;
        let file_name = output_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        let artifact = dir.path().join(file_name);
        debug!("Staging conversion output at {}", artifact.display());
        Ok(Self { dir, artifact })
    }

    /// Where the converter must write its artifact.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// True once the converter has produced a regular file.
    pub fn has_artifact(&self) -> bool {
        self.artifact.is_file()
    }

    /// Move the artifact onto `output_path`, replacing any existing file,
    /// then remove the staging directory.
    ///
    /// Only the rename can fail. Once the artifact is in place a leftover
    /// staging directory is logged, not reported.
    pub fn commit(self, output_path: &Path) -> std::io::Result<()> {
        std::fs::rename(&self.artifact, output_path)?;
        let staging_path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(
                "Could not remove staging directory {}: {}",
                staging_path.display(),
                e
            );
        }
        Ok(())
    }
}
