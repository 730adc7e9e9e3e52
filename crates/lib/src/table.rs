//! JSON table input and output: ticket rows, catalog, review records and the incremental snapshot.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::model::{Catalog, RawMessage, ReviewRecord};

/// Read a JSON array of ticket rows.
pub fn load_tickets(path: &Path) -> Result<Vec<RawMessage>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading tickets from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing tickets from {}", path.display()))
}

/// Read the catalog file (`{"subjects": [...], "responses": [{"title", "content"}]}`).
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog from {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&s)
        .with_context(|| format!("parsing catalog from {}", path.display()))?;
    if catalog.subjects.is_empty() {
        log::warn!("catalog {} has no subjects", path.display());
    }
    Ok(catalog)
}

/// Write the review table as a pretty-printed JSON array.
pub fn write_records(path: &Path, records: &[ReviewRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("serializing review records")?;
    std::fs::write(path, json).with_context(|| format!("writing review table to {}", path.display()))
}

/// Appends one JSON line per record so a failed batch keeps what it produced.
pub struct SnapshotWriter {
    file: std::fs::File,
}

impl SnapshotWriter {
    /// Create (or truncate) the snapshot file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating snapshot {}", path.display()))?;
        Ok(Self { file })
    }

    pub fn append(&mut self, record: &ReviewRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("serializing review record")?;
        writeln!(self.file, "{}", line).context("appending to snapshot")?;
        self.file.flush().context("flushing snapshot")
    }
}
