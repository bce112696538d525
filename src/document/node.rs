//! Owned XML tree used for in-place editing of the main document part.
//!
//! The tree keeps qualified names (`w:p`, `w:rPr`) and attribute order as found in
//! the source so that untouched content serializes back unchanged.

use crate::error::ReportError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::match_xml_events;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

/// Declaration written in front of every serialized part
pub(crate) const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Elements whose whitespace-only text is significant
const TEXT_ELEMENTS: [&str; 4] = ["w:t", "w:delText", "w:instrText", "w:delInstrText"];

/// A node of the tree
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its qualified name, attributes in source order, and children
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlNode>,
}

impl XmlNode {
    pub(crate) fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    fn write(&self, output: &mut String) {
        match self {
            XmlNode::Element(element) => element.write(output),
            XmlNode::Text(text) => output.push_escaped(text),
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

impl XmlElement {
    pub(crate) fn new(name: &str) -> Self {
        XmlElement {
            name: name.to_owned(),
            ..XmlElement::default()
        }
    }

    /// Builder style attribute setter
    pub(crate) fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder style child appender
    pub(crate) fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder style text appender
    pub(crate) fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_owned()));
        self
    }

    pub(crate) fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub(crate) fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, keeping its position when it already exists
    pub(crate) fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => self.attributes.push((key.to_owned(), value.to_owned())),
        }
    }

    /// Child elements, skipping text nodes
    pub(crate) fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    pub(crate) fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |element| element.is(name))
    }

    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.is(name))
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|element| element.is(name))
    }

    /// Indexes into `children` of the child elements with the given name
    pub(crate) fn positions_of(&self, name: &str) -> Vec<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, node)| node.as_element().map(|element| element.is(name)).unwrap_or(false))
            .map(|(position, _)| position)
            .collect()
    }

    /// Removes every child element with the given name
    pub(crate) fn remove_children(&mut self, name: &str) {
        self.children
            .retain(|node| !node.as_element().map(|element| element.is(name)).unwrap_or(false));
    }

    /// Returns the child with the given name, creating it at its schema position.
    ///
    /// `order` lists the sibling names in the order the schema requires; names not
    /// listed rank after every listed one.
    pub(crate) fn ensure_child(&mut self, name: &str, order: &[&str]) -> &mut XmlElement {
        let position = match self.children.iter().position(|node| node.as_element().map(|element| element.is(name)).unwrap_or(false)) {
            Some(position) => position,
            None => {
                let position = self.schema_position(name, order);
                self.children.insert(position, XmlNode::Element(XmlElement::new(name)));
                position
            }
        };
        match &mut self.children[position] {
            XmlNode::Element(element) => element,
            XmlNode::Text(_) => unreachable!("position always refers to an element"),
        }
    }

    /// Replaces the child with the same name, or inserts it at its schema position
    pub(crate) fn set_child(&mut self, child: XmlElement, order: &[&str]) {
        let existing = self.children
            .iter()
            .position(|node| node.as_element().map(|element| element.is(&child.name)).unwrap_or(false));
        match existing {
            Some(position) => self.children[position] = XmlNode::Element(child),
            None => {
                let position = self.schema_position(&child.name, order);
                self.children.insert(position, XmlNode::Element(child));
            }
        }
    }

    fn schema_position(&self, name: &str, order: &[&str]) -> usize {
        let rank = |candidate: &str| order.iter().position(|known| *known == candidate).unwrap_or(order.len());
        let wanted = rank(name);
        self.children
            .iter()
            .position(|node| node.as_element().map(|element| rank(&element.name) > wanted).unwrap_or(false))
            .unwrap_or(self.children.len())
    }

    /// Whether any descendant (or the element itself) has one of the names
    pub(crate) fn contains_any(&self, names: &[&str]) -> bool {
        names.contains(&self.name.as_str()) || self.elements().any(|element| element.contains_any(names))
    }

    /// Collects descendants with the given name without descending into matches
    pub(crate) fn descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.is(name) {
                found.push(element);
            } else {
                element.descendants(name, found);
            }
        }
    }

    /// Visits descendants with the given name without descending into matches
    pub(crate) fn visit_mut(&mut self, name: &str, visitor: &mut dyn FnMut(&mut XmlElement)) {
        for element in self.elements_mut() {
            if element.is(name) {
                visitor(element);
            } else {
                element.visit_mut(name, visitor);
            }
        }
    }

    /// Serializes the element and its subtree
    pub(crate) fn write(&self, output: &mut String) {
        self.write_open(output);
        if self.children.is_empty() {
            return;
        }
        for child in &self.children {
            child.write(output);
        }
        self.write_close(output);
    }

    /// Writes the start tag; an element without children is closed immediately
    fn write_open(&self, output: &mut String) {
        self.write_tag(output);
        output.push_str(if self.children.is_empty() { "/>" } else { ">" });
    }

    /// Writes the start tag of an element whose content is written separately
    pub(crate) fn write_start(&self, output: &mut String) {
        self.write_tag(output);
        output.push('>');
    }

    fn write_tag(&self, output: &mut String) {
        output.push('<');
        output.push_str(&self.name);
        for (key, value) in &self.attributes {
            output.push(' ');
            output.push_str(key);
            output.push_str("=\"");
            output.push_escaped(value);
            output.push('"');
        }
    }

    pub(crate) fn write_close(&self, output: &mut String) {
        output.push_str("</");
        output.push_str(&self.name);
        output.push('>');
    }

    #[cfg(test)]
    pub(crate) fn to_xml(&self) -> String {
        let mut output = String::new();
        self.write(&mut output);
        output
    }
}

/// Parses a part into its root element.
///
/// Comments, processing instructions and the declaration are dropped.
/// Whitespace-only text is kept only inside text-bearing elements.
///
/// # Arguments
/// * `name` - Part name used in messages
/// * `bytes` - Raw part content
///
/// # Returns
/// The root element
pub(crate) fn parse(name: &str, bytes: &[u8]) -> Result<XmlElement, ReportError> {
    let mut reader = XmlReader::new(bytes);
    // Open elements paired with the text read since their last child
    let mut stack: Vec<(XmlElement, String)> = Vec::new();
    let mut root: Option<XmlElement> = None;
    match_xml_events!(reader => {
        Event::Start(event) => {
            if let Some((parent, text)) = stack.last_mut() {
                flush_text(parent, text);
            }
            stack.push((to_element(&event)?, String::new()));
        }
        Event::End(event) => {
            let (mut element, mut text) = stack.pop()
                .ok_or_else(|| XmlError::UnbalancedElementError(String::from_utf8_lossy(event.name().as_ref()).to_string()))?;
            flush_text(&mut element, &mut text);
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(XmlNode::Element(element)),
                None => {
                    root = Some(element);
                    break;
                }
            }
        }
        Event::Text(event) => {
            if let Some((_, text)) = stack.last_mut() {
                text.push_bytes_text(&event)?;
            }
        }
        Event::GeneralRef(event) => {
            if let Some((_, text)) = stack.last_mut() {
                text.push_bytes_ref(&event)?;
            }
        }
        Event::CData(event) => {
            if let Some((_, text)) = stack.last_mut() {
                text.push_str(&event.xml_content()?);
            }
        }
    });
    let mut root = root.ok_or_else(|| XmlError::MissingRootElementError(name.to_owned()))?;
    drop_insignificant_whitespace(&mut root);
    Ok(root)
}

fn to_element(event: &BytesStart) -> Result<XmlElement, ReportError> {
    let mut element = XmlElement::new(&event.qualified_name()?);
    for attribute in event.attributes() {
        let attribute = attribute?;
        element.attributes.push((attribute.get_key()?, attribute.get_value()?.to_string()));
    }
    Ok(element)
}

fn flush_text(element: &mut XmlElement, text: &mut String) {
    if !text.is_empty() {
        element.children.push(XmlNode::Text(std::mem::take(text)));
    }
}

fn drop_insignificant_whitespace(element: &mut XmlElement) {
    if TEXT_ELEMENTS.contains(&element.name.as_str()) {
        return;
    }
    element.children.retain(|node| match node {
        XmlNode::Text(text) => !text.trim().is_empty(),
        XmlNode::Element(_) => true,
    });
    for child in element.elements_mut() {
        drop_insignificant_whitespace(child);
    }
}
