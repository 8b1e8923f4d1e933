//! Highlights sidecar
//!
//! A `.hlts` file next to a tier's meta record maps a highlight label to
//! the display payloads captured for it (e.g. a rendered plot and its
//! metadata). The file is rewritten whole on every change.

use crate::error::{TierError, TierResult};
use crate::tier::Tier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;

/// One renderable output: MIME bundle plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPayload {
    /// MIME type → content
    pub data: Map<String, Value>,
    /// Free-form rendering hints
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DisplayPayload {
    /// Payload with a single MIME entry
    #[must_use]
    pub fn new(mime: impl Into<String>, content: Value) -> Self {
        let mut data = Map::new();
        data.insert(mime.into(), content);
        Self {
            data,
            metadata: Map::new(),
        }
    }
}

/// Label → payloads, in the order labels were first added
pub type Highlights = IndexMap<String, Vec<DisplayPayload>>;

fn read(path: &Path) -> TierResult<Highlights> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).map_err(|source| TierError::Highlights {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Highlights::new()),
        Err(e) => Err(TierError::io(path, e)),
    }
}

fn write(path: &Path, highlights: &Highlights) -> TierResult<()> {
    let text = serde_json::to_string(highlights).map_err(|source| TierError::Highlights {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| TierError::io(path, e))
}

impl Tier {
    fn sidecar(&self) -> TierResult<&Path> {
        self.highlights_file().ok_or_else(|| TierError::NoRecord {
            kind: self.kind().pretty_type().to_owned(),
        })
    }

    /// All highlights; empty if there is no sidecar
    ///
    /// # Errors
    /// `Highlights` for a malformed sidecar, `Io` otherwise.
    pub fn highlights(&self) -> TierResult<Highlights> {
        match self.highlights_file() {
            Some(path) => read(path),
            None => Ok(Highlights::new()),
        }
    }

    /// Store `payloads` under `label`
    ///
    /// A new label goes last; overwriting keeps the label's position.
    ///
    /// # Errors
    /// `HighlightExists` if `label` exists and `overwrite` is unset,
    /// `NoRecord` for kinds without a sidecar.
    pub fn add_highlight(
        &self,
        label: &str,
        payloads: Vec<DisplayPayload>,
        overwrite: bool,
    ) -> TierResult<()> {
        let path = self.sidecar()?;
        let mut highlights = read(path)?;
        if !overwrite && highlights.contains_key(label) {
            return Err(TierError::HighlightExists {
                path: path.to_path_buf(),
                label: label.to_owned(),
            });
        }
        highlights.insert(label.to_owned(), payloads);
        write(path, &highlights)
    }

    /// Remove `label`
    ///
    /// # Errors
    /// `NoHighlight` if `label` is absent, `NoRecord` for kinds without a
    /// sidecar.
    pub fn remove_highlight(&self, label: &str) -> TierResult<Vec<DisplayPayload>> {
        let path = self.sidecar()?;
        let mut highlights = read(path)?;
        let removed = highlights
            .shift_remove(label)
            .ok_or_else(|| TierError::NoHighlight {
                path: path.to_path_buf(),
                label: label.to_owned(),
            })?;
        write(path, &highlights)?;
        Ok(removed)
    }
}
