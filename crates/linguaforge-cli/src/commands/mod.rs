//! CLI subcommands and shared state-file helpers.

pub mod due;
pub mod grade;
pub mod init;
pub mod review;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};

use linguaforge_core::model::Language;
use linguaforge_core::store::{MemoryStore, StoreSnapshot};

/// Load the knowledge-store snapshot from the state file, starting empty when
/// the file does not exist yet.
pub(crate) fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state file: {}", path.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse state file: {}", path.display()))?;
    Ok(MemoryStore::from_snapshot(snapshot))
}

/// Persist the store back to the state file.
pub(crate) fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    let content = serde_json::to_string_pretty(&store.snapshot())?;
    std::fs::write(path, content)
        .with_context(|| format!("failed to write state file: {}", path.display()))?;
    Ok(())
}

pub(crate) fn parse_language(s: &str) -> Result<Language> {
    s.parse::<Language>().map_err(|e| anyhow::anyhow!(e))
}

pub(crate) fn parse_language_opt(s: Option<&str>) -> Result<Option<Language>> {
    s.map(parse_language).transpose()
}
