//! Document-level formats: `osm`, `osmChange`, changesets and `diffResult`.

use crate::error::{CodecError, CodecResult};
use crate::tree::{parse, XmlNode};
use crate::wire::{
    decode_changeset_element, decode_primitive, encode_changeset_element, encode_primitive,
    encode_ref, EncodeOptions,
};
use osmsync_core::{Changeset, Document, Primitive, PrimitiveKind};
use osmsync_protocol::{Ack, Action, Osc};
use tracing::debug;

/// API version written on document roots.
pub const OSM_VERSION: &str = "0.6";

/// Generator written on document roots.
pub const GENERATOR: &str = "osmsync";

fn root(name: &str) -> XmlNode {
    XmlNode::new(name)
        .with_attr("version", OSM_VERSION)
        .with_attr("generator", GENERATOR)
}

/// Builds the `<osm>` tree of a document.
pub fn document_to_tree(doc: &Document, options: &EncodeOptions) -> XmlNode {
    let mut osm = root("osm");
    osm.children
        .extend(doc.iter().map(|p| encode_ref(p, options)));
    osm
}

/// Reads a document from an `<osm>` tree.
///
/// Every node, way and relation goes through [`Document::add`], so
/// repeated ids with different versions merge into one entry. Other
/// elements (`bounds`, `note`, `meta`...) are skipped.
pub fn document_from_tree(root: &XmlNode) -> CodecResult<Document> {
    root.expect_name("osm")?;
    let mut doc = Document::new();
    for element in &root.children {
        if !is_versioned_element(&element.name) {
            continue;
        }
        doc.add(decode_primitive(element)?)?;
    }
    debug!(primitives = doc.len(), "decoded document");
    Ok(doc)
}

/// Encodes a document as `<osm>` XML.
pub fn encode_document(doc: &Document) -> CodecResult<Vec<u8>> {
    document_to_tree(doc, &EncodeOptions::new()).to_xml()
}

/// Decodes `<osm>` XML into a document.
pub fn decode_document(bytes: &[u8]) -> CodecResult<Document> {
    document_from_tree(&parse(bytes)?)
}

/// Builds the `<osmChange>` tree of a change batch. Empty sections are
/// skipped; the rest keep their order.
pub fn osc_to_tree(osc: &Osc, options: &EncodeOptions) -> XmlNode {
    let mut root = root("osmChange");
    for section in osc.non_empty_sections() {
        let section_options = if section.action == Action::Delete {
            options.clone().bare()
        } else {
            options.clone()
        };
        let mut element = XmlNode::new(section.action.as_str());
        element.children.extend(
            section
                .document
                .iter()
                .map(|p| encode_ref(p, &section_options)),
        );
        root.children.push(element);
    }
    root
}

/// Reads a change batch from an `<osmChange>` tree, appending in
/// document order.
pub fn osc_from_tree(root: &XmlNode) -> CodecResult<Osc> {
    root.expect_name("osmChange")?;
    let mut osc = Osc::new();
    for section in &root.children {
        let action = section.name.parse::<Action>().map_err(|_| {
            CodecError::unexpected_element("<create>, <modify> or <delete>", &section.name)
        })?;
        for element in &section.children {
            if !is_versioned_element(&element.name) {
                return Err(CodecError::unexpected_element(
                    "<node>, <way> or <relation>",
                    &element.name,
                ));
            }
            osc.append(action, decode_primitive(element)?)?;
        }
    }
    debug!(primitives = osc.len(), sections = osc.sections().len(), "decoded change batch");
    Ok(osc)
}

/// Encodes a change batch as `<osmChange>` XML.
pub fn encode_osc(osc: &Osc, options: &EncodeOptions) -> CodecResult<Vec<u8>> {
    osc_to_tree(osc, options).to_xml()
}

/// Decodes `<osmChange>` XML.
pub fn decode_osc(bytes: &[u8]) -> CodecResult<Osc> {
    osc_from_tree(&parse(bytes)?)
}

/// Encodes a single primitive wrapped in `<osm>`, as sent to the
/// single-element write endpoints.
pub fn encode_payload(primitive: &Primitive, options: &EncodeOptions) -> CodecResult<Vec<u8>> {
    root("osm")
        .with_child(encode_primitive(primitive, options))
        .to_xml()
}

/// Encodes a changeset wrapped in `<osm>`.
pub fn encode_changeset(changeset: &Changeset) -> CodecResult<Vec<u8>> {
    root("osm")
        .with_child(encode_changeset_element(changeset))
        .to_xml()
}

/// Decodes every `<changeset>` under an `<osm>` root.
pub fn decode_changesets(bytes: &[u8]) -> CodecResult<Vec<Changeset>> {
    let root = parse(bytes)?;
    root.expect_name("osm")?;
    root.children_named("changeset")
        .map(decode_changeset_element)
        .collect()
}

/// Decodes the single `<changeset>` under an `<osm>` root.
pub fn decode_changeset(bytes: &[u8]) -> CodecResult<Changeset> {
    decode_changesets(bytes)?
        .into_iter()
        .next()
        .ok_or_else(|| CodecError::invalid_structure("response holds no changeset"))
}

/// Decodes a `<diffResult>` into per-primitive acknowledgements.
pub fn decode_diff_result(bytes: &[u8]) -> CodecResult<Vec<Ack>> {
    let root = parse(bytes)?;
    root.expect_name("diffResult")?;
    root.children
        .iter()
        .map(|element| -> CodecResult<Ack> {
            let kind = element
                .name
                .parse::<PrimitiveKind>()
                .ok()
                .filter(PrimitiveKind::is_versioned)
                .ok_or_else(|| {
                    CodecError::unexpected_element("<node>, <way> or <relation>", &element.name)
                })?;
            Ok(Ack {
                kind,
                old_id: integer_attr(element, "old_id")?
                    .ok_or_else(|| CodecError::missing_attribute(&element.name, "old_id"))?,
                new_id: integer_attr(element, "new_id")?,
                new_version: integer_attr(element, "new_version")?
                    .map(|v| {
                        u64::try_from(v).map_err(|_| {
                            CodecError::invalid_structure(format!("negative new_version {v}"))
                        })
                    })
                    .transpose()?,
            })
        })
        .collect()
}

fn integer_attr(element: &XmlNode, key: &str) -> CodecResult<Option<i64>> {
    element
        .attr(key)
        .map(|raw| {
            raw.trim().parse::<i64>().map_err(|_| {
                CodecError::Core(osmsync_core::CoreError::invalid_attribute(key, raw))
            })
        })
        .transpose()
}

fn is_versioned_element(name: &str) -> bool {
    matches!(name, "node" | "way" | "relation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_core::{Node, Way};

    const SAMPLE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/>
  <node id="1" version="1" lat="0.5" lon="0.5"/>
  <node id="1" version="2" lat="0.6" lon="0.5"><tag k="name" v="moved"/></node>
  <node id="2" version="1" lat="0.1" lon="0.1"/>
  <way id="10" version="4"><nd ref="1"/><nd ref="2"/></way>
</osm>"#;

    #[test]
    fn repeated_versions_merge_on_decode() {
        let doc = decode_document(SAMPLE).unwrap();
        assert_eq!(doc.len(), 3);
        let node = doc.node(1).unwrap();
        assert_eq!(node.version, Some(2));
        assert_eq!(node.history_versions(), vec![1, 2]);
        assert_eq!(node.revision_at(1).unwrap().body.lat, Some(0.5));
    }

    #[test]
    fn document_survives_encode() {
        let doc = decode_document(SAMPLE).unwrap();
        let again = decode_document(&encode_document(&doc).unwrap()).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn roots_carry_version_and_generator() {
        let text = String::from_utf8(encode_document(&Document::new()).unwrap()).unwrap();
        assert!(text.contains(r#"<osm version="0.6" generator="osmsync"/>"#));
    }

    #[test]
    fn wrong_root_is_rejected() {
        assert!(matches!(
            decode_document(b"<osmChange/>"),
            Err(CodecError::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn osc_sections_keep_document_order() {
        let xml = br#"<osmChange version="0.6">
            <create><node id="-1" lat="1" lon="1"/></create>
            <modify><way id="5" version="2"><nd ref="-1"/></way></modify>
            <create><node id="-2" lat="2" lon="2"/></create>
            <delete><node id="9" version="3"/></delete>
          </osmChange>"#;
        let osc = decode_osc(xml).unwrap();
        let actions: Vec<_> = osc.sections().iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            [Action::Create, Action::Modify, Action::Create, Action::Delete]
        );
        assert_eq!(decode_osc(&encode_osc(&osc, &EncodeOptions::new()).unwrap()).unwrap(), osc);
    }

    #[test]
    fn delete_sections_are_bare() {
        let mut osc = Osc::new();
        osc.append(
            Action::Delete,
            Way::way(3, [1, 2]).with_version(5).with_tag("a", "b"),
        )
        .unwrap();
        osc.append(Action::Create, Node::node(-1, 1.0, 1.0).with_tag("a", "b"))
            .unwrap();
        let tree = osc_to_tree(&osc, &EncodeOptions::upload(42));
        let delete = &tree.children[0];
        assert_eq!(delete.name, "delete");
        assert!(delete.children[0].children.is_empty());
        assert_eq!(delete.children[0].attr("changeset"), Some("42"));
        let create = &tree.children[1];
        assert_eq!(create.children[0].children.len(), 1);
    }

    #[test]
    fn empty_sections_are_not_written() {
        let mut osc = Osc::new();
        osc.push_section(Action::Modify, Document::new());
        let tree = osc_to_tree(&osc, &EncodeOptions::new());
        assert!(tree.children.is_empty());
    }

    #[test]
    fn diff_result_acks() {
        let xml = br#"<diffResult version="0.6">
            <node old_id="-1" new_id="100" new_version="1"/>
            <way old_id="5" new_id="5" new_version="3"/>
            <node old_id="9"/>
          </diffResult>"#;
        let acks = decode_diff_result(xml).unwrap();
        assert_eq!(
            acks,
            [
                Ack::written(PrimitiveKind::Node, -1, 100, 1),
                Ack::written(PrimitiveKind::Way, 5, 5, 3),
                Ack::deleted(PrimitiveKind::Node, 9),
            ]
        );
        assert!(decode_diff_result(br#"<diffResult><node new_id="1"/></diffResult>"#).is_err());
        assert!(
            decode_diff_result(br#"<diffResult><changeset old_id="1"/></diffResult>"#).is_err()
        );
    }

    #[test]
    fn changesets_decode() {
        let xml = br#"<osm><changeset id="7" open="true" min_lat="1.5" min_lon="2" max_lat="3" max_lon="4">
              <tag k="comment" v="x"/></changeset><changeset id="8" open="false"/></osm>"#;
        let all = decode_changesets(xml).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].is_open(), Some(true));
        assert_eq!(all[0].bbox(), Some((1.5, 2.0, 3.0, 4.0)));
        assert_eq!(decode_changeset(xml).unwrap().id, Some(7));
        assert!(decode_changeset(b"<osm/>").is_err());
    }

    #[test]
    fn changeset_encodes_tags() {
        let cs = Changeset::new(Default::default()).with_comment("survey");
        let text = String::from_utf8(encode_changeset(&cs).unwrap()).unwrap();
        assert!(text.contains(r#"<tag k="comment" v="survey"/>"#));
        assert!(!text.contains("id="));
    }
}
