//! Mapping between primitives and XML elements.

use crate::error::{CodecError, CodecResult};
use crate::tree::XmlNode;
use osmsync_core::{
    AttrValue, Attributes, Body, Changeset, CoreError, Member, NodeBody, Primitive, PrimitiveKind,
    PrimitiveRef, RelationBody, Tags, Versioned, WayBody,
};

/// Attributes stripped from write payloads. The server fills these in.
pub const UPLOAD_STRIP: [&str; 5] = ["user", "uid", "visible", "timestamp", "changeset"];

/// How primitives are rendered on encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Attribute names left out of the output.
    pub strip: Vec<String>,
    /// Changeset id written onto every node, way and relation.
    pub changeset: Option<i64>,
    /// Emit only the element and its attributes, without tags or children.
    pub bare: bool,
}

impl EncodeOptions {
    /// Full rendering with every attribute.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a write payload attributed to `changeset`.
    pub fn upload(changeset: i64) -> Self {
        Self {
            strip: UPLOAD_STRIP.iter().map(|k| (*k).to_string()).collect(),
            changeset: Some(changeset),
            bare: false,
        }
    }

    /// Adds attribute names to strip.
    #[must_use]
    pub fn with_strip<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strip.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Injects a changeset id.
    #[must_use]
    pub fn with_changeset(mut self, changeset: i64) -> Self {
        self.changeset = Some(changeset);
        self
    }

    /// Drops tags and children.
    #[must_use]
    pub fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    fn strips(&self, key: &str) -> bool {
        self.strip.iter().any(|k| k == key)
    }
}

/// Payloads that know their XML form.
pub trait WireBody: Body {
    /// Attributes owned by the payload rather than the attribute map.
    const OWNED_ATTRS: &'static [&'static str];

    /// Reads the payload from its element.
    fn read(element: &XmlNode) -> CodecResult<Self>;

    /// Writes payload attributes.
    fn write_attrs(&self, _element: &mut XmlNode) {}

    /// Writes payload children.
    fn write_children(&self, _element: &mut XmlNode) {}
}

impl WireBody for NodeBody {
    const OWNED_ATTRS: &'static [&'static str] = &["lat", "lon"];

    fn read(element: &XmlNode) -> CodecResult<Self> {
        Ok(NodeBody {
            lat: optional_float(element, "lat")?,
            lon: optional_float(element, "lon")?,
        })
    }

    fn write_attrs(&self, element: &mut XmlNode) {
        if let Some(lat) = self.lat {
            element.push_attr("lat", AttrValue::Float(lat));
        }
        if let Some(lon) = self.lon {
            element.push_attr("lon", AttrValue::Float(lon));
        }
    }
}

impl WireBody for WayBody {
    const OWNED_ATTRS: &'static [&'static str] = &[];

    fn read(element: &XmlNode) -> CodecResult<Self> {
        let nds = element
            .children_named("nd")
            .map(|nd| required_integer(nd, "ref"))
            .collect::<CodecResult<_>>()?;
        Ok(WayBody { nds })
    }

    fn write_children(&self, element: &mut XmlNode) {
        element
            .children
            .extend(self.nds.iter().map(|id| XmlNode::new("nd").with_attr("ref", id)));
    }
}

impl WireBody for RelationBody {
    const OWNED_ATTRS: &'static [&'static str] = &[];

    fn read(element: &XmlNode) -> CodecResult<Self> {
        let members = element
            .children_named("member")
            .map(|m| -> CodecResult<Member> {
                let kind = m
                    .required_attr("type")?
                    .parse::<PrimitiveKind>()
                    .map_err(|e| CodecError::invalid_structure(e.to_string()))?;
                Ok(Member::new(
                    kind,
                    required_integer(m, "ref")?,
                    m.attr("role").unwrap_or_default(),
                ))
            })
            .collect::<CodecResult<_>>()?;
        Ok(RelationBody { members })
    }

    fn write_children(&self, element: &mut XmlNode) {
        element.children.extend(self.members.iter().map(|m| {
            XmlNode::new("member")
                .with_attr("type", m.kind)
                .with_attr("ref", m.ref_id)
                .with_attr("role", &m.role)
        }));
    }
}

fn required_integer(element: &XmlNode, key: &str) -> CodecResult<i64> {
    let raw = element.required_attr(key)?;
    raw.trim()
        .parse()
        .map_err(|_| CoreError::invalid_attribute(key, raw).into())
}

fn optional_float(element: &XmlNode, key: &str) -> CodecResult<Option<f64>> {
    element
        .attr(key)
        .map(|raw| -> CodecResult<f64> {
            AttrValue::parse(key, raw)?
                .as_float()
                .ok_or_else(|| CoreError::invalid_attribute(key, raw).into())
        })
        .transpose()
}

fn read_tags(element: &XmlNode) -> CodecResult<Tags> {
    element
        .children_named("tag")
        .map(|tag| -> CodecResult<(String, String)> {
            Ok((
                tag.required_attr("k")?.to_string(),
                tag.required_attr("v")?.to_string(),
            ))
        })
        .collect()
}

fn read_attrs(element: &XmlNode, skip: &[&str]) -> CodecResult<Attributes> {
    let raw = element
        .attrs
        .iter()
        .filter(|(k, _)| k != "id" && k != "version" && !skip.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()));
    Ok(Attributes::from_wire(raw)?)
}

fn write_attrs(element: &mut XmlNode, attrs: &Attributes, options: &EncodeOptions) {
    for (key, value) in attrs {
        if options.strips(key) || (options.changeset.is_some() && key == "changeset") {
            continue;
        }
        element.push_attr(key, value);
    }
    if let Some(changeset) = options.changeset {
        element.push_attr("changeset", changeset);
    }
}

fn write_tags(element: &mut XmlNode, tags: &Tags) {
    element.children.extend(
        tags.iter()
            .map(|(k, v)| XmlNode::new("tag").with_attr("k", k).with_attr("v", v)),
    );
}

/// Decodes a node, way or relation element.
pub fn decode_versioned<B: WireBody>(element: &XmlNode) -> CodecResult<Versioned<B>> {
    element.expect_name(B::KIND.as_str())?;
    let id = required_integer(element, "id")?;
    let version = element
        .attr("version")
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| CoreError::invalid_attribute("version", raw))
        })
        .transpose()?;
    let attrs = read_attrs(element, B::OWNED_ATTRS)?;
    let tags = read_tags(element)?;
    let body = B::read(element)?;
    Ok(Versioned::from_parts(id, version, attrs, tags, body))
}

/// Encodes a node, way or relation element.
pub fn encode_versioned<B: WireBody>(primitive: &Versioned<B>, options: &EncodeOptions) -> XmlNode {
    let mut element = XmlNode::new(B::KIND.as_str()).with_attr("id", primitive.id);
    if let Some(version) = primitive.version {
        element.push_attr("version", version);
    }
    write_attrs(&mut element, &primitive.attrs, options);
    primitive.body.write_attrs(&mut element);
    if !options.bare {
        primitive.body.write_children(&mut element);
        write_tags(&mut element, &primitive.tags);
    }
    element
}

/// Decodes a changeset element.
pub fn decode_changeset_element(element: &XmlNode) -> CodecResult<Changeset> {
    element.expect_name("changeset")?;
    let id = element
        .attr("id")
        .map(|_| required_integer(element, "id"))
        .transpose()?;
    Ok(Changeset {
        id,
        attrs: read_attrs(element, &[])?,
        tags: read_tags(element)?,
    })
}

/// Encodes a changeset element.
pub fn encode_changeset_element(changeset: &Changeset) -> XmlNode {
    let mut element = XmlNode::new("changeset");
    if let Some(id) = changeset.id {
        element.push_attr("id", id);
    }
    write_attrs(&mut element, &changeset.attrs, &EncodeOptions::new());
    write_tags(&mut element, &changeset.tags);
    element
}

/// Decodes any primitive element by name.
pub fn decode_primitive(element: &XmlNode) -> CodecResult<Primitive> {
    match element.name.as_str() {
        "node" => decode_versioned::<NodeBody>(element).map(Primitive::Node),
        "way" => decode_versioned::<WayBody>(element).map(Primitive::Way),
        "relation" => decode_versioned::<RelationBody>(element).map(Primitive::Relation),
        "changeset" => decode_changeset_element(element).map(Primitive::Changeset),
        other => Err(CodecError::unexpected_element(
            "<node>, <way>, <relation> or <changeset>",
            other,
        )),
    }
}

/// Encodes any primitive.
pub fn encode_primitive(primitive: &Primitive, options: &EncodeOptions) -> XmlNode {
    match primitive {
        Primitive::Node(p) => encode_versioned(p, options),
        Primitive::Way(p) => encode_versioned(p, options),
        Primitive::Relation(p) => encode_versioned(p, options),
        Primitive::Changeset(c) => encode_changeset_element(c),
    }
}

/// Encodes a primitive borrowed from a document.
pub fn encode_ref(primitive: PrimitiveRef<'_>, options: &EncodeOptions) -> XmlNode {
    match primitive {
        PrimitiveRef::Node(p) => encode_versioned(p, options),
        PrimitiveRef::Way(p) => encode_versioned(p, options),
        PrimitiveRef::Relation(p) => encode_versioned(p, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;
    use osmsync_core::{Node, Relation, Way};

    #[test]
    fn node_attributes_are_typed() {
        let xml = br#"<node id="12" version="3" changeset="99" uid="4" user="ann"
                        visible="true" lat="51.5" lon="-0.12">
                        <tag k="amenity" v="cafe"/>
                      </node>"#;
        let node: Node = decode_versioned(&parse(xml).unwrap()).unwrap();
        assert_eq!(node.id, 12);
        assert_eq!(node.version, Some(3));
        assert_eq!(node.lat(), Some(51.5));
        assert_eq!(node.lon(), Some(-0.12));
        assert_eq!(node.attrs.changeset(), Some(99));
        assert_eq!(node.attrs.uid(), Some(4));
        assert_eq!(node.attrs.user(), Some("ann"));
        assert_eq!(node.attrs.visible(), Some(true));
        assert!(!node.attrs.contains_key("lat"));
        assert_eq!(node.tags["amenity"], "cafe");
        assert_eq!(node.history_versions(), vec![3]);
    }

    #[test]
    fn bad_integer_attribute_is_rejected() {
        let el = parse(br#"<way id="x"/>"#).unwrap();
        assert!(matches!(
            decode_versioned::<WayBody>(&el),
            Err(CodecError::Core(CoreError::InvalidAttribute { .. }))
        ));
    }

    #[test]
    fn missing_id_is_reported() {
        let el = parse(br#"<relation version="1"/>"#).unwrap();
        assert_eq!(
            decode_versioned::<RelationBody>(&el).unwrap_err(),
            CodecError::missing_attribute("relation", "id")
        );
    }

    #[test]
    fn relation_members_in_order() {
        let xml = br#"<relation id="1" version="2">
              <member type="way" ref="10" role="outer"/>
              <member type="node" ref="3" role=""/>
              <member type="relation" ref="7"/>
            </relation>"#;
        let rel: Relation = decode_versioned(&parse(xml).unwrap()).unwrap();
        assert_eq!(
            rel.members(),
            [
                Member::new(PrimitiveKind::Way, 10, "outer"),
                Member::new(PrimitiveKind::Node, 3, ""),
                Member::new(PrimitiveKind::Relation, 7, ""),
            ]
        );
    }

    #[test]
    fn upload_options_strip_and_inject() {
        let mut way = Way::way(4, [1, 2]).with_version(2).with_tag("highway", "path");
        way.attrs.insert("user", "ann");
        way.attrs.insert("changeset", 10_i64);
        way.attrs.insert("visible", true);

        let el = encode_versioned(&way, &EncodeOptions::upload(77));
        assert_eq!(el.attr("changeset"), Some("77"));
        assert_eq!(el.attr("user"), None);
        assert_eq!(el.attr("visible"), None);
        assert_eq!(el.children_named("nd").count(), 2);
        assert_eq!(el.children_named("tag").count(), 1);

        let bare = encode_versioned(&way, &EncodeOptions::upload(77).bare());
        assert!(bare.children.is_empty());
        assert_eq!(bare.attr("version"), Some("2"));
    }

    #[test]
    fn tags_are_written_in_key_order() {
        let node = Node::node(1, 0.0, 0.0)
            .with_tag("name", "x")
            .with_tag("amenity", "bench");
        let el = encode_versioned(&node, &EncodeOptions::new());
        let keys: Vec<_> = el.children_named("tag").filter_map(|t| t.attr("k")).collect();
        assert_eq!(keys, ["amenity", "name"]);
    }

    #[test]
    fn decode_primitive_dispatches_on_name() {
        let el = parse(br#"<changeset id="5" open="false"><tag k="comment" v="hi"/></changeset>"#)
            .unwrap();
        let Primitive::Changeset(cs) = decode_primitive(&el).unwrap() else {
            panic!("expected changeset");
        };
        assert_eq!(cs.id, Some(5));
        assert_eq!(cs.is_open(), Some(false));
        assert_eq!(cs.tags["comment"], "hi");

        let el = parse(br#"<bounds/>"#).unwrap();
        assert!(matches!(
            decode_primitive(&el),
            Err(CodecError::UnexpectedElement { .. })
        ));
    }
}
