//! Merge command implementation.

use osmsync_codec::{load_document, save_document};
use osmsync_core::Document;
use std::path::Path;
use tracing::info;

/// Loads both documents and unions them. Primitives present in both keep
/// one entry carrying the union of their histories.
pub fn merge(first: &Path, second: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let mut merged = load_document(first)?;
    let other = load_document(second)?;
    merged.extend_from(&other)?;
    Ok(merged)
}

/// Runs the merge command.
pub fn run(first: &Path, second: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let merged = merge(first, second)?;
    save_document(output, &merged)?;
    info!(primitives = merged.len(), "wrote {}", output.display());
    println!("Merged {} primitives into {}", merged.len(), output.display());
    Ok(())
}
