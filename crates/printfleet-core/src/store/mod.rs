// ── Inventory store ──
//
// Read once at the start of a run, written once at the end. Writes go to
// a temporary file in the target's directory which is synced and then
// renamed over the original, so a reader sees either the old document or
// the new one, never a torn write.

mod document;
mod merge;

pub use document::{DocumentLayout, InventoryDocument};
pub use merge::merge_patch;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CoreError;

/// The inventory file on disk.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    path: PathBuf,
}

impl InventoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, layout: &DocumentLayout) -> Result<InventoryDocument, CoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::DocumentNotFound {
                    path: self.path.clone(),
                }
            } else {
                CoreError::DocumentRead {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;
        // Exports from spreadsheet tooling sometimes carry a BOM.
        let text = text.trim_start_matches('\u{feff}');
        let root = serde_json::from_str(text).map_err(|e| CoreError::DocumentParse {
            path: self.path.clone(),
            source: e,
        })?;
        InventoryDocument::from_value(root, layout.clone())
    }

    /// Write `document` to a synced temporary file next to the target.
    /// Nothing visible changes until [`StagedWrite::commit`].
    pub fn stage(&self, document: &InventoryDocument) -> Result<StagedWrite, CoreError> {
        let persist_err = |source: std::io::Error| CoreError::Persist {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let text = document
            .to_pretty_json()
            .map_err(|e| persist_err(std::io::Error::other(e)))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(persist_err)?;
        temp.write_all(text.as_bytes()).map_err(persist_err)?;
        temp.as_file().sync_all().map_err(persist_err)?;
        if let Ok(meta) = std::fs::metadata(&self.path) {
            temp.as_file()
                .set_permissions(meta.permissions())
                .map_err(persist_err)?;
        }
        debug!(path = %self.path.display(), temp = %temp.path().display(), bytes = text.len(), "inventory staged");

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }

    /// Stage and commit in one step.
    pub fn persist(&self, document: &InventoryDocument) -> Result<(), CoreError> {
        self.stage(document)?.commit()
    }
}

/// A fully written temporary copy waiting to replace the target. Dropping
/// it without committing deletes the temporary file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically rename the staged file over the target.
    pub fn commit(self) -> Result<(), CoreError> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| CoreError::Persist {
                path: target.clone(),
                source: e.error,
            })?;
        debug!(path = %target.display(), "inventory committed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const ORIGINAL: &str = "{\n  \"Company_Grouped\": [\n    {\"ID\": \"P-1\", \"Type\": \"M404dn\", \"Printer IP\": \"10.0.0.5\"}\n  ]\n}\n";

    fn fixture() -> (tempfile::TempDir, InventoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("printers.json");
        std::fs::write(&path, ORIGINAL).unwrap();
        (dir, InventoryStore::new(path))
    }

    fn updated(store: &InventoryStore) -> InventoryDocument {
        let mut doc = store.load(&DocumentLayout::default()).unwrap();
        let at = doc.entities()[0].location.clone().unwrap();
        doc.apply(&at, &json!({"status": "online"}));
        doc
    }

    #[test]
    fn persist_replaces_the_document() {
        let (_dir, store) = fixture();
        let doc = updated(&store);
        store.persist(&doc).unwrap();

        let reloaded = store.load(&DocumentLayout::default()).unwrap();
        assert_eq!(
            reloaded.root()["Company_Grouped"][0]["printerInfo"]["status"],
            "online"
        );
    }

    #[test]
    fn abandoned_stage_leaves_original_byte_identical() {
        let (dir, store) = fixture();
        let doc = updated(&store);

        let staged = store.stage(&doc).unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        assert_eq!(temp.parent(), Some(dir.path()));
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), ORIGINAL);
    }

    #[test]
    fn failed_rename_reports_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("printers.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let doc = InventoryDocument::from_value(json!([]), DocumentLayout::default()).unwrap();
        let err = InventoryStore::new(&target).persist(&doc).unwrap_err();
        assert!(err.is_persist_failure());
        assert_eq!(std::fs::read_to_string(target.join("keep")).unwrap(), "x");
    }

    #[test]
    fn missing_and_broken_documents() {
        let dir = tempfile::tempdir().unwrap();
        let missing = InventoryStore::new(dir.path().join("nope.json"));
        assert!(matches!(
            missing.load(&DocumentLayout::default()),
            Err(CoreError::DocumentNotFound { .. })
        ));

        let broken_path = dir.path().join("broken.json");
        std::fs::write(&broken_path, "{\"Company_Grouped\": [").unwrap();
        assert!(matches!(
            InventoryStore::new(broken_path).load(&DocumentLayout::default()),
            Err(CoreError::DocumentParse { .. })
        ));
    }

    #[test]
    fn byte_order_mark_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.json");
        std::fs::write(&path, "\u{feff}[]").unwrap();
        assert!(InventoryStore::new(path).load(&DocumentLayout::default()).is_ok());
    }
}
