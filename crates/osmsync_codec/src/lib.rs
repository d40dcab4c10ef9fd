//! # osmsync codec
//!
//! OSM XML wire codec for osmsync.
//!
//! This crate provides:
//! - A structured XML tree (`XmlNode`) parsed with `quick-xml`
//! - Element mapping for nodes, ways, relations and changesets using the
//!   typed-attribute convention
//! - `osm`, `osmChange`, changeset and `diffResult` documents
//! - Payload options: attribute stripping, changeset injection, bare mode
//! - File load/save
//!
//! ## Usage
//!
//! ```
//! use osmsync_codec::{decode_document, encode_document};
//!
//! let doc = decode_document(br#"<osm><node id="1" version="1" lat="1" lon="2"/></osm>"#).unwrap();
//! assert_eq!(doc.node(1).unwrap().lat(), Some(1.0));
//! let xml = encode_document(&doc).unwrap();
//! assert_eq!(decode_document(&xml).unwrap(), doc);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod formats;
mod tree;
mod wire;

pub use error::{CodecError, CodecResult};
pub use file::{load_document, load_osc, save_document, save_osc};
pub use formats::{
    decode_changeset, decode_changesets, decode_diff_result, decode_document, decode_osc,
    document_from_tree, document_to_tree, encode_changeset, encode_document, encode_osc,
    encode_payload, osc_from_tree, osc_to_tree, GENERATOR, OSM_VERSION,
};
pub use tree::{parse, XmlNode};
pub use wire::{
    decode_changeset_element, decode_primitive, decode_versioned, encode_changeset_element,
    encode_primitive, encode_ref, encode_versioned, EncodeOptions, WireBody, UPLOAD_STRIP,
};
