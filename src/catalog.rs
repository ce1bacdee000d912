//! The format catalog: which target formats are offered for which extension.
//!
//! The catalog is an immutable value. It is built once (from the built-in
//! table, a JSON file, or an explicit list of entries) and shared with every
//! [`crate::session::ConversionPipeline`] through an `Arc`, so tests can
//! inject their own table without touching pipeline code.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   ".docx": ["pdf", "txt", "html"],
//!   "md":    ["html", "pdf"]
//! }
//! ```
//!
//! Keys may omit the leading dot and use any case; they are normalised on
//! load. The order of each list is kept: it is the order a shell shows the
//! choices in.

use crate::error::WonderError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A normalised, lower-cased file extension including its leading dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileExtension(String);

impl FileExtension {
    /// Normalise a raw extension: trim, lower-case, prepend `.` if missing.
    ///
    /// Returns `None` for an empty extension (`""` or `"."`).
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if bare.is_empty() {
            return None;
        }
        Some(Self(format!(".{}", bare.to_lowercase())))
    }

    /// Derive the extension from the file name of `path`.
    ///
    /// Takes the part of the file name after its last `.`. A name without a
    /// dot, with a trailing dot, or consisting only of a leading-dot name
    /// such as `.bashrc` has no extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| Self::new(&ext.to_string_lossy()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The extension without its leading dot.
    pub fn bare(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FileExtension {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or_else(|| format!("empty file extension '{value}'"))
    }
}

impl From<FileExtension> for String {
    fn from(ext: FileExtension) -> Self {
        ext.0
    }
}

/// Default table shipped with the application.
const BUILTIN_ENTRIES: &[(&str, &[&str])] = &[
    (".docx", &["pdf", "txt", "html", "jpg", "png"]),
    (".doc", &["pdf", "txt", "html", "jpg", "png", "docx"]),
    (".pdf", &["docx", "txt", "jpg", "png", "html"]),
    (".jpg", &["png", "pdf", "webp"]),
    (".png", &["jpg", "pdf", "webp"]),
    (".txt", &["pdf", "docx", "html"]),
    (".pptx", &["pdf", "jpg", "png"]),
    (".xlsx", &["pdf", "csv", "html"]),
    (".html", &["pdf", "docx", "txt"]),
];

static BUILTIN: Lazy<FormatCatalog> = Lazy::new(|| FormatCatalog {
    entries: BUILTIN_ENTRIES
        .iter()
        .map(|(ext, formats)| {
            (
                ext.to_string(),
                formats.iter().map(|f| f.to_string()).collect(),
            )
        })
        .collect(),
});

/// Immutable mapping from [`FileExtension`] to an ordered list of target
/// format identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatCatalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatCatalog {
    /// The built-in table (Word, PDF, image, text, slide and sheet formats).
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// A catalog with no entries: every lookup is empty.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a catalog from `(extension, formats)` pairs.
    ///
    /// Extensions and identifiers are normalised to lower case. Rejects empty
    /// extensions, identifiers that are empty or not ASCII alphanumeric,
    /// repeated identifiers within one list, and two keys that normalise to
    /// the same extension.
    pub fn from_entries<I, K, F, S>(entries: I) -> Result<Self, WonderError>
    where
        I: IntoIterator<Item = (K, F)>,
        K: AsRef<str>,
        F: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (raw_ext, raw_formats) in entries {
            let ext = FileExtension::new(raw_ext.as_ref()).ok_or_else(|| {
                WonderError::InvalidCatalog(format!(
                    "empty extension key '{}'",
                    raw_ext.as_ref()
                ))
            })?;

            let mut formats: Vec<String> = Vec::new();
            for raw in raw_formats {
                let id = normalize_format_id(raw.as_ref()).ok_or_else(|| {
                    WonderError::InvalidCatalog(format!(
                        "invalid format identifier '{}' for {}",
                        raw.as_ref(),
                        ext
                    ))
                })?;
                if formats.contains(&id) {
                    return Err(WonderError::InvalidCatalog(format!(
                        "format '{}' listed twice for {}",
                        id, ext
                    )));
                }
                formats.push(id);
            }

            if map.insert(ext.0.clone(), formats).is_some() {
                return Err(WonderError::InvalidCatalog(format!(
                    "extension {} defined more than once",
                    ext
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// Parse a catalog from a JSON object of `extension → [format, …]`.
    pub fn from_json_str(json: &str) -> Result<Self, WonderError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| WonderError::CatalogParse {
                detail: e.to_string(),
            })?;

        let mut pairs: Vec<(String, Vec<String>)> = Vec::with_capacity(raw.len());
        for (ext, value) in raw {
            let formats: Vec<String> =
                serde_json::from_value(value).map_err(|e| WonderError::CatalogParse {
                    detail: format!("entry '{}': {}", ext, e),
                })?;
            pairs.push((ext, formats));
        }
        Self::from_entries(pairs)
    }

    /// Read and parse a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WonderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| WonderError::CatalogRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let catalog = Self::from_json_str(&json)?;
        debug!(
            "Loaded format catalog from {} ({} extensions)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Candidate target formats for `extension`, in display order.
    ///
    /// The leading dot is optional and case is ignored. Unknown and empty
    /// extensions yield an empty slice.
    pub fn lookup(&self, extension: &str) -> &[String] {
        match FileExtension::new(extension) {
            Some(ext) => self.lookup_ext(&ext),
            None => &[],
        }
    }

    pub fn lookup_ext(&self, extension: &FileExtension) -> &[String] {
        self.entries
            .get(extension.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when at least one target format is offered for `extension`.
    pub fn supports(&self, extension: &str) -> bool {
        !self.lookup(extension).is_empty()
    }

    /// All entries, sorted by extension.
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalise a target format identifier; `None` if it cannot be used as a
/// file extension.
pub fn normalize_format_id(raw: &str) -> Option<String> {
    let id = raw.trim().trim_start_matches('.').to_lowercase();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(id)
}
