//! File load/save.

use crate::error::CodecResult;
use crate::formats::{decode_document, decode_osc, encode_document, encode_osc};
use crate::wire::EncodeOptions;
use osmsync_core::Document;
use osmsync_protocol::Osc;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads an `.osm` file.
pub fn load_document(path: impl AsRef<Path>) -> CodecResult<Document> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "loading document");
    decode_document(&bytes)
}

/// Writes an `.osm` file.
pub fn save_document(path: impl AsRef<Path>, doc: &Document) -> CodecResult<()> {
    let path = path.as_ref();
    fs::write(path, encode_document(doc)?)?;
    debug!(path = %path.display(), primitives = doc.len(), "saved document");
    Ok(())
}

/// Reads an `.osc` file.
pub fn load_osc(path: impl AsRef<Path>) -> CodecResult<Osc> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "loading change batch");
    decode_osc(&bytes)
}

/// Writes an `.osc` file.
pub fn save_osc(path: impl AsRef<Path>, osc: &Osc) -> CodecResult<()> {
    let path = path.as_ref();
    fs::write(path, encode_osc(osc, &EncodeOptions::new())?)?;
    debug!(path = %path.display(), primitives = osc.len(), "saved change batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use osmsync_core::{Node, Way};
    use osmsync_protocol::Action;
    use tempfile::tempdir;

    #[test]
    fn document_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.osm");
        let mut doc = Document::new();
        doc.add(Node::node(1, 10.0, 20.0).with_version(1)).unwrap();
        doc.add(Way::way(2, [1, 1]).with_version(1)).unwrap();

        save_document(&path, &doc).unwrap();
        assert_eq!(load_document(&path).unwrap(), doc);
    }

    #[test]
    fn osc_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("changes.osc");
        let mut osc = Osc::new();
        osc.append(Action::Create, Node::node(-1, 0.0, 0.0)).unwrap();
        osc.append(Action::Modify, Node::node(3, 0.0, 1.0).with_version(2))
            .unwrap();

        save_osc(&path, &osc).unwrap();
        assert_eq!(load_osc(&path).unwrap(), osc);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_document(dir.path().join("absent.osm")),
            Err(CodecError::Io { .. })
        ));
    }
}
