//! Core types for source-tracked XML parsing.

use cslkit_source_map::Range;

/// An XML document with source location tracking.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// The root element of the document.
    pub root: XmlElement,

    /// Source location of the entire document.
    pub source: Range,
}

/// An XML element with source location tracking.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Source location of the element name.
    pub name_source: Range,

    /// Namespace prefix, if any (e.g., "cs" in `<cs:text>`).
    pub prefix: Option<String>,

    /// Attributes of this element.
    pub attributes: Vec<XmlAttribute>,

    /// Child content of this element.
    pub children: XmlChildren,

    /// Source location of the entire element (start tag through end tag).
    pub source: Range,
}

/// An XML attribute with separate source locations for name and value.
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Source location of the attribute name.
    pub name_source: Range,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,

    /// Source location of the attribute value.
    pub value_source: Range,
}

/// Children of an XML element.
#[derive(Debug, Clone)]
pub enum XmlChildren {
    /// Element contains only child elements.
    Elements(Vec<XmlElement>),

    /// Element contains only text content.
    Text {
        /// The text content (after unescaping XML entities).
        content: String,
        /// Source location of the text.
        source: Range,
    },

    /// Element contains mixed content (text and elements interleaved).
    Mixed(Vec<XmlChild>),

    /// Element is empty.
    Empty,
}

/// A single child in mixed content.
#[derive(Debug, Clone)]
pub enum XmlChild {
    /// A child element.
    Element(XmlElement),

    /// Text content.
    Text {
        /// The text content.
        content: String,
        /// Source location of the text.
        source: Range,
    },
}

impl XmlElement {
    /// Get an attribute value by name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute by name, returning the full attribute with source info.
    pub fn get_attribute_full(&self, name: &str) -> Option<&XmlAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get text content, if this element contains only text.
    pub fn text(&self) -> Option<&str> {
        match &self.children {
            XmlChildren::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Get child elements by name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.all_children()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Get the first child element with the given name.
    pub fn get_child(&self, name: &str) -> Option<&XmlElement> {
        self.all_children().into_iter().find(|e| e.name == name)
    }

    /// Get all child elements (ignoring text in mixed content).
    pub fn all_children(&self) -> Vec<&XmlElement> {
        match &self.children {
            XmlChildren::Elements(elements) => elements.iter().collect(),
            XmlChildren::Mixed(children) => children
                .iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, attributes: Vec<XmlAttribute>) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            name_source: Range::default(),
            prefix: None,
            attributes,
            children: XmlChildren::Empty,
            source: Range::default(),
        }
    }

    #[test]
    fn test_get_attribute() {
        let attr = XmlAttribute {
            name: "name".to_string(),
            name_source: Range::default(),
            prefix: None,
            value: "value".to_string(),
            value_source: Range::default(),
        };
        let el = element("test", vec![attr]);

        assert_eq!(el.get_attribute("name"), Some("value"));
        assert_eq!(el.get_attribute("missing"), None);
    }

    #[test]
    fn test_get_children_filters_by_name() {
        let mut parent = element("parent", vec![]);
        parent.children = XmlChildren::Elements(vec![
            element("a", vec![]),
            element("b", vec![]),
            element("a", vec![]),
        ]);

        assert_eq!(parent.get_children("a").len(), 2);
        assert_eq!(parent.get_child("b").map(|e| e.name.as_str()), Some("b"));
        assert!(parent.get_child("c").is_none());
    }
}
