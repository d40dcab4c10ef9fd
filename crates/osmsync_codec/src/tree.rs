//! Structured XML tree.
//!
//! OSM documents are small, attribute-heavy trees without mixed content,
//! so the codec parses into an owned tree first and maps elements from it.

use crate::error::{CodecError, CodecResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::str;

/// An element with its attributes (in document order) and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Element name.
    pub name: String,
    /// Attributes, in document order.
    pub attrs: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Creates an element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push_attr(key, value);
        self
    }

    /// Appends an attribute in place.
    pub fn push_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        self.attrs.push((key.into(), value.to_string()));
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Value of the first attribute named `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a required attribute.
    pub fn required_attr(&self, key: &str) -> CodecResult<&str> {
        self.attr(key)
            .ok_or_else(|| CodecError::missing_attribute(&self.name, key))
    }

    /// Child elements named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Fails unless this element is named `name`.
    pub fn expect_name(&self, name: &str) -> CodecResult<()> {
        if self.name == name {
            Ok(())
        } else {
            Err(CodecError::unexpected_element(
                format!("<{name}>"),
                &self.name,
            ))
        }
    }

    /// Serializes the tree with an XML declaration.
    pub fn to_xml(&self) -> CodecResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_node(&mut writer, self)?;
        Ok(writer.into_inner())
    }

    /// Serializes the tree without a declaration, on one line.
    pub fn to_fragment(&self) -> CodecResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self)?;
        Ok(writer.into_inner())
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> CodecResult<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

fn open_element(e: &BytesStart<'_>) -> CodecResult<XmlNode> {
    let name = str::from_utf8(e.name().as_ref())
        .map_err(|err| CodecError::xml(err.to_string()))?
        .to_string();
    let mut node = XmlNode::new(name);
    for attribute in e.attributes() {
        let attribute = attribute?;
        let key = str::from_utf8(attribute.key.as_ref())
            .map_err(|err| CodecError::xml(err.to_string()))?
            .to_string();
        let value = attribute.unescape_value()?.into_owned();
        node.attrs.push((key, value));
    }
    Ok(node)
}

/// Parses `bytes` into the tree under the root element.
///
/// Text content, comments and processing instructions are dropped.
pub fn parse(bytes: &[u8]) -> CodecResult<XmlNode> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(open_element(&e)?),
            Event::Empty(e) => {
                let node = open_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CodecError::xml("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Eof => {
                return Err(if stack.is_empty() {
                    CodecError::invalid_structure("document has no root element")
                } else {
                    CodecError::xml("unexpected end of input")
                })
            }
            _ => {}
        }
        buf.clear();
    }
}
