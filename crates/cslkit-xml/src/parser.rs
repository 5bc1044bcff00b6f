//! XML parser that builds source-tracked element trees.

use crate::{Error, Result, XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement};
use cslkit_source_map::{Range, range_from_offsets};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

/// Parse XML from a string, producing a source-tracked [`XmlDocument`].
///
/// # Example
///
/// ```rust
/// use cslkit_xml::parse;
///
/// let xml = parse("<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// A node being constructed during parsing.
struct BuildNode {
    name: String,
    name_source: Range,
    prefix: Option<String>,
    attributes: Vec<XmlAttribute>,
    /// Byte offset of the `<` character that opened this element.
    start_offset: usize,
    children: Vec<XmlChild>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        // End-tag matching happens in handle_end, against the build stack,
        // so mismatches get a position instead of a bare syntax error.
        reader.config_mut().check_end_names = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.handle_start(e, event_start)?;
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let element = self.handle_end(&end_name)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.handle_empty(e, event_start)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(e, event_start)?;
                }
                Ok(Event::CData(e)) => {
                    let content = String::from_utf8_lossy(e.as_ref()).to_string();
                    let end_offset = self.reader.buffer_position() as usize;
                    let source = range_from_offsets(self.source, event_start, end_offset);
                    if let Some(node) = self.stack.last_mut() {
                        node.children.push(XmlChild::Text { content, source });
                    }
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Syntax {
                        message: e.to_string(),
                        offset: Some(self.reader.error_position() as usize),
                    });
                }
            }
        }

        // Check for unclosed elements
        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.name),
                location: Some(node.name_source.clone()),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        let source = range_from_offsets(self.source, 0, self.source.len());

        Ok(XmlDocument { root, source })
    }

    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(XmlChild::Element(element));
        } else {
            if root.is_some() {
                return Err(Error::MultipleRoots {
                    location: Some(element.source.clone()),
                });
            }
            *root = Some(element);
        }
        Ok(())
    }

    fn handle_start(&mut self, e: BytesStart<'_>, event_start: usize) -> Result<()> {
        let (name, prefix) = split_name(e.name().as_ref());
        let name_start = event_start + 1; // skip '<'
        let name_end = name_start + e.name().as_ref().len();
        let name_source = range_from_offsets(self.source, name_start, name_end);

        let tag_end = self.reader.buffer_position() as usize;
        let attributes = self.parse_attributes(&e, event_start, tag_end)?;

        self.stack.push(BuildNode {
            name,
            name_source,
            prefix,
            attributes,
            start_offset: event_start,
            children: Vec::new(),
        });

        Ok(())
    }

    fn handle_end(&mut self, end_name: &str) -> Result<XmlElement> {
        let end_local = end_name.split(':').next_back().unwrap_or(end_name);

        let node = self.stack.pop().ok_or_else(|| Error::UnexpectedEndTag {
            found: end_name.to_string(),
        })?;

        if node.name != end_local {
            return Err(Error::MismatchedEndTag {
                expected: node.name.clone(),
                found: end_local.to_string(),
                location: Some(node.name_source.clone()),
            });
        }

        let end_offset = self.reader.buffer_position() as usize;
        let source = range_from_offsets(self.source, node.start_offset, end_offset);
        let children = finalize_children(node.children);

        Ok(XmlElement {
            name: node.name,
            name_source: node.name_source,
            prefix: node.prefix,
            attributes: node.attributes,
            children,
            source,
        })
    }

    fn handle_empty(&mut self, e: BytesStart<'_>, event_start: usize) -> Result<XmlElement> {
        let (name, prefix) = split_name(e.name().as_ref());
        let name_start = event_start + 1;
        let name_end = name_start + e.name().as_ref().len();
        let name_source = range_from_offsets(self.source, name_start, name_end);

        let end_offset = self.reader.buffer_position() as usize;
        let attributes = self.parse_attributes(&e, event_start, end_offset)?;
        let source = range_from_offsets(self.source, event_start, end_offset);

        Ok(XmlElement {
            name,
            name_source,
            prefix,
            attributes,
            children: XmlChildren::Empty,
            source,
        })
    }

    fn handle_text(&mut self, e: BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::Syntax {
            message: format!("Invalid text content: {}", err),
            offset: Some(event_start),
        })?;

        let end_offset = self.reader.buffer_position() as usize;
        let source = range_from_offsets(self.source, event_start, end_offset);
        let content = text.into_owned();

        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlChild::Text { content, source });
        }
        Ok(())
    }

    fn parse_attributes(
        &self,
        e: &BytesStart<'_>,
        tag_start: usize,
        tag_end: usize,
    ) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();
        let tag_str = &self.source[tag_start..tag_end.min(self.source.len())];

        for attr_result in e.attributes() {
            let attr = attr_result?;

            let full_name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let (name, prefix) = split_name(attr.key.as_ref());

            let value = attr.unescape_value().map_err(|err| Error::Syntax {
                message: format!("Invalid attribute value: {}", err),
                offset: Some(tag_start),
            })?;

            let (name_source, value_source) =
                self.attribute_positions(tag_str, tag_start, &full_name);

            attributes.push(XmlAttribute {
                name,
                name_source,
                prefix,
                value: value.into_owned(),
                value_source,
            });
        }

        Ok(attributes)
    }

    /// Locate `name="value"` within the start tag to get precise positions.
    ///
    /// Falls back to the whole tag range when the textual search fails
    /// (exotic quoting); positions are for diagnostics only, so an
    /// imprecise range degrades gracefully.
    fn attribute_positions(
        &self,
        tag_str: &str,
        tag_start: usize,
        full_name: &str,
    ) -> (Range, Range) {
        let whole = range_from_offsets(
            self.source,
            tag_start,
            tag_start + tag_str.len(),
        );

        let mut search_from = 0;
        while let Some(rel) = tag_str[search_from..].find(full_name) {
            let name_rel = search_from + rel;
            let before_ok = name_rel == 0
                || tag_str[..name_rel]
                    .chars()
                    .next_back()
                    .is_some_and(|c| c.is_whitespace());
            let after = &tag_str[name_rel + full_name.len()..];
            let trimmed = after.trim_start();
            if before_ok && trimmed.starts_with('=') {
                let name_abs = tag_start + name_rel;
                let name_source =
                    range_from_offsets(self.source, name_abs, name_abs + full_name.len());

                let eq_rel = name_rel + full_name.len() + (after.len() - trimmed.len());
                let after_eq = tag_str[eq_rel + 1..].trim_start();
                let quote = after_eq.chars().next();
                if let Some(q @ ('"' | '\'')) = quote {
                    let value_open =
                        eq_rel + 1 + (tag_str[eq_rel + 1..].len() - after_eq.len());
                    if let Some(close_rel) = after_eq[1..].find(q) {
                        let value_start = tag_start + value_open + 1;
                        let value_end = value_start + close_rel;
                        let value_source =
                            range_from_offsets(self.source, value_start, value_end);
                        return (name_source, value_source);
                    }
                }
                return (name_source.clone(), name_source);
            }
            search_from = name_rel + full_name.len();
        }

        (whole.clone(), whole)
    }
}

/// Split a qualified name into (local, prefix).
fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let full = String::from_utf8_lossy(raw).to_string();
    if let Some(pos) = full.find(':') {
        (full[pos + 1..].to_string(), Some(full[..pos].to_string()))
    } else {
        (full, None)
    }
}

/// Collapse accumulated children into the appropriate [`XmlChildren`] shape.
///
/// Whitespace-only text between child elements is indentation, not content,
/// and is dropped.
fn finalize_children(children: Vec<XmlChild>) -> XmlChildren {
    let has_elements = children
        .iter()
        .any(|c| matches!(c, XmlChild::Element(_)));
    let children: Vec<XmlChild> = if has_elements {
        children
            .into_iter()
            .filter(|c| match c {
                XmlChild::Text { content, .. } => !content.trim().is_empty(),
                XmlChild::Element(_) => true,
            })
            .collect()
    } else {
        children
    };

    if children.is_empty() {
        return XmlChildren::Empty;
    }

    let all_elements = children
        .iter()
        .all(|c| matches!(c, XmlChild::Element(_)));
    if all_elements {
        return XmlChildren::Elements(
            children
                .into_iter()
                .map(|c| match c {
                    XmlChild::Element(e) => e,
                    XmlChild::Text { .. } => unreachable!(),
                })
                .collect(),
        );
    }

    if children.len() == 1 {
        if let XmlChild::Text { content, source } = children.into_iter().next().unwrap() {
            return XmlChildren::Text { content, source };
        }
        unreachable!();
    }

    XmlChildren::Mixed(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let xml = parse("<root><child/></root>").unwrap();
        assert_eq!(xml.root.name, "root");
        assert_eq!(xml.root.all_children().len(), 1);
        assert_eq!(xml.root.all_children()[0].name, "child");
    }

    #[test]
    fn test_parse_attributes() {
        let xml = parse(r#"<style version="1.0" class="in-text"/>"#).unwrap();
        assert_eq!(xml.root.get_attribute("version"), Some("1.0"));
        assert_eq!(xml.root.get_attribute("class"), Some("in-text"));
    }

    #[test]
    fn test_attribute_positions() {
        let source = r#"<style version="1.0"/>"#;
        let xml = parse(source).unwrap();
        let attr = xml.root.get_attribute_full("version").unwrap();
        assert_eq!(
            &source[attr.name_source.start.offset..attr.name_source.end.offset],
            "version"
        );
        assert_eq!(
            &source[attr.value_source.start.offset..attr.value_source.end.offset],
            "1.0"
        );
    }

    #[test]
    fn test_parse_text_content() {
        let xml = parse("<term>edition</term>").unwrap();
        assert_eq!(xml.root.text(), Some("edition"));
    }

    #[test]
    fn test_parse_entity_unescaping() {
        let xml = parse("<term>Smith &amp; Jones</term>").unwrap();
        assert_eq!(xml.root.text(), Some("Smith & Jones"));
    }

    #[test]
    fn test_namespace_prefix_stripped() {
        let xml = parse(r#"<cs:style xmlns:cs="x"></cs:style>"#).unwrap();
        assert_eq!(xml.root.name, "style");
        assert_eq!(xml.root.prefix.as_deref(), Some("cs"));
    }

    #[test]
    fn test_unclosed_element_errors() {
        let err = parse("<root><child>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_mismatched_end_tag_errors() {
        let err = parse("<root><a></b></root>").unwrap_err();
        assert!(matches!(err, Error::MismatchedEndTag { .. }));
    }

    #[test]
    fn test_empty_document_errors() {
        let err = parse("  ").unwrap_err();
        assert!(matches!(err, Error::EmptyDocument));
    }

    #[test]
    fn test_element_source_spans_whole_element() {
        let source = "<root><child/></root>";
        let xml = parse(source).unwrap();
        assert_eq!(xml.root.source.start.offset, 0);
        assert_eq!(xml.root.source.end.offset, source.len());
    }

    #[test]
    fn test_nested_whitespace_skipped() {
        let xml = parse("<a>\n  <b/>\n  <c/>\n</a>").unwrap();
        assert_eq!(xml.root.all_children().len(), 2);
    }
}
