//! XML fixtures and sample documents.

use osmsync_codec::decode_document;
use osmsync_core::{Document, Member, Node, PrimitiveKind, Relation, Way};
use std::path::PathBuf;
use tempfile::TempDir;

/// A small `.osm` document: three nodes (one with two versions), a
/// closed way and a relation.
pub const SAMPLE_OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="fixture">
  <node id="1" version="1" changeset="10" lat="51.5" lon="-0.1" user="ann" uid="7" visible="true"/>
  <node id="1" version="2" changeset="11" lat="51.6" lon="-0.1" user="ann" uid="7" visible="true">
    <tag k="amenity" v="bench"/>
  </node>
  <node id="2" version="1" changeset="10" lat="51.5" lon="-0.2"/>
  <node id="3" version="1" changeset="10" lat="51.4" lon="-0.2"/>
  <way id="20" version="3" changeset="12">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <nd ref="1"/>
    <tag k="landuse" v="grass"/>
  </way>
  <relation id="30" version="1" changeset="12">
    <member type="way" ref="20" role="outer"/>
    <member type="node" ref="2" role=""/>
    <tag k="type" v="multipolygon"/>
  </relation>
</osm>
"#;

/// A change batch with one section of each kind.
pub const SAMPLE_OSC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osmChange version="0.6" generator="fixture">
  <create>
    <node id="-1" lat="51.7" lon="-0.3"><tag k="name" v="new"/></node>
  </create>
  <modify>
    <way id="20" version="3"><nd ref="1"/><nd ref="-1"/><tag k="landuse" v="grass"/></way>
  </modify>
  <delete>
    <node id="3" version="1"/>
  </delete>
</osmChange>
"#;

/// The server answer to uploading [`SAMPLE_OSC`].
pub const SAMPLE_DIFF_RESULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<diffResult version="0.6" generator="fixture">
  <node old_id="-1" new_id="4" new_version="1"/>
  <way old_id="20" new_id="20" new_version="4"/>
  <node old_id="3"/>
</diffResult>
"#;

/// A changeset answer.
pub const SAMPLE_CHANGESET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <changeset id="12" user="ann" uid="7" open="false" min_lat="51.4" min_lon="-0.2" max_lat="51.6" max_lon="-0.1">
    <tag k="comment" v="park outline"/>
  </changeset>
</osm>
"#;

/// Decodes [`SAMPLE_OSM`].
pub fn sample_document() -> Document {
    decode_document(SAMPLE_OSM.as_bytes()).expect("sample document decodes")
}

/// A square of four nodes, a way around it and a relation holding the way,
/// built in code with versions set.
pub fn small_network() -> Document {
    let mut doc = Document::new();
    let corners = [(1, 0.0, 0.0), (2, 0.0, 1.0), (3, 1.0, 1.0), (4, 1.0, 0.0)];
    for (id, lat, lon) in corners {
        doc.add(Node::node(id, lat, lon).with_version(1))
            .expect("node added");
    }
    doc.add(
        Way::way(10, [1, 2, 3, 4, 1])
            .with_version(1)
            .with_tag("building", "yes"),
    )
    .expect("way added");
    doc.add(
        Relation::relation(100, [Member::new(PrimitiveKind::Way, 10, "outer")])
            .with_version(1)
            .with_tag("type", "multipolygon"),
    )
    .expect("relation added");
    doc
}

/// Writes `contents` to `name` inside a fresh temporary directory.
///
/// The directory lives as long as the returned guard.
pub fn write_temp(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    (dir, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_codec::{decode_changeset, decode_diff_result, decode_osc};

    #[test]
    fn fixtures_decode() {
        let doc = sample_document();
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.node(1).unwrap().history_versions(), vec![1, 2]);
        assert!(doc.way(20).unwrap().is_closed());

        let osc = decode_osc(SAMPLE_OSC.as_bytes()).unwrap();
        assert_eq!(osc.len(), 3);
        assert_eq!(decode_diff_result(SAMPLE_DIFF_RESULT.as_bytes()).unwrap().len(), 3);
        assert_eq!(decode_changeset(SAMPLE_CHANGESET.as_bytes()).unwrap().id, Some(12));
    }

    #[test]
    fn small_network_is_consistent() {
        let doc = small_network();
        assert_eq!(doc.len(), 6);
        assert!(doc.relation(100).unwrap().has_member(PrimitiveKind::Way, 10));
        assert_eq!(doc.placeholder_count(), 0);
    }

    #[test]
    fn write_temp_keeps_file_alive() {
        let (_dir, path) = write_temp("x.osm", SAMPLE_OSM);
        assert!(path.exists());
    }
}
