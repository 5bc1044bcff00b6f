//! One-pass CSL style parsing and validation.
//!
//! [`validate_style`] parses style XML into a [`Style`] while accumulating
//! positioned diagnostics in the same traversal. Structural violations are
//! error-severity and make the style unusable for driver construction;
//! recoverable oddities (unknown elements, bad form values) are warnings
//! and parsing continues around them.

use crate::lang::Lang;
use crate::locale::parse_locale_element;
use crate::types::*;
use cslkit_diagnostics::{DiagnosticMessage, DiagnosticMessageBuilder};
use cslkit_source_map::{Range, excerpt_at};
use cslkit_xml::{XmlAttribute, XmlElement};
use std::collections::HashMap;

/// Outcome of validating style XML.
#[derive(Debug)]
pub struct StyleValidation {
    /// The parsed style; `None` when the document was too broken to build.
    pub style: Option<Style>,
    /// All diagnostics found, in source order.
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl StyleValidation {
    /// Whether the style parsed without error-severity diagnostics.
    pub fn is_usable(&self) -> bool {
        self.style.is_some() && !self.diagnostics.iter().any(|d| d.is_error())
    }
}

/// Parse and validate a CSL style in one pass.
///
/// # Example
///
/// ```rust
/// use cslkit_csl::validate_style;
///
/// let outcome = validate_style("<style/>");  // Missing required attributes
/// assert!(!outcome.is_usable());
/// assert!(outcome.diagnostics.iter().any(|d| d.is_error()));
/// ```
pub fn validate_style(source: &str) -> StyleValidation {
    let mut parser = StyleParser {
        source,
        diagnostics: Vec::new(),
    };

    let doc = match cslkit_xml::parse(source) {
        Ok(doc) => doc,
        Err(err) => {
            parser.diagnostics.push(err.to_diagnostic());
            return StyleValidation {
                style: None,
                diagnostics: parser.diagnostics,
            };
        }
    };

    let style = parser.parse_style_element(&doc.root);
    if let Some(style) = &style {
        parser.check_macro_references(style);
    }

    StyleValidation {
        style,
        diagnostics: parser.diagnostics,
    }
}

/// Internal validating parser.
struct StyleParser<'a> {
    source: &'a str,
    diagnostics: Vec<DiagnosticMessage>,
}

impl StyleParser<'_> {
    fn push(&mut self, diag: DiagnosticMessage) {
        self.diagnostics.push(diag);
    }

    fn located(
        &self,
        builder: DiagnosticMessageBuilder,
        location: &Range,
    ) -> DiagnosticMessageBuilder {
        builder
            .with_location(location.clone())
            .with_excerpt(excerpt_at(self.source, location))
    }

    /// Fetch a required attribute, reporting an error when absent.
    fn require_attr<'e>(
        &mut self,
        element: &'e XmlElement,
        attribute: &str,
    ) -> Option<&'e XmlAttribute> {
        let found = element.get_attribute_full(attribute);
        if found.is_none() {
            let diag = self
                .located(
                    DiagnosticMessageBuilder::error("Missing Required Attribute")
                        .with_code("CK-2-2")
                        .problem(format!(
                            "Element <{}> requires attribute '{}'",
                            element.name, attribute
                        ))
                        .add_hint(format!("Add {}=\"...\" to the element?", attribute)),
                    &element.name_source,
                )
                .build();
            self.push(diag);
        }
        found
    }

    fn parse_style_element(&mut self, element: &XmlElement) -> Option<Style> {
        if element.name != "style" {
            let diag = self
                .located(
                    DiagnosticMessageBuilder::error("Invalid Root Element")
                        .with_code("CK-2-1")
                        .problem(format!(
                            "CSL document must have <style> as root, found <{}>",
                            element.name
                        )),
                    &element.name_source,
                )
                .build();
            self.push(diag);
            return None;
        }

        let version = self.require_attr(element, "version").map(|a| {
            (a.value.clone(), a.value_source.clone())
        });

        let class = match self.require_attr(element, "class") {
            None => None,
            Some(attr) => match attr.value.as_str() {
                "in-text" => Some(StyleClass::InText),
                "note" => Some(StyleClass::Note),
                other => {
                    let value_source = attr.value_source.clone();
                    let other = other.to_string();
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::error("Invalid Attribute Value")
                                .with_code("CK-2-3")
                                .problem(format!(
                                    "Invalid value '{}' for attribute 'class' on <style>",
                                    other
                                ))
                                .add_detail("Expected: \"in-text\" or \"note\""),
                            &value_source,
                        )
                        .build();
                    self.push(diag);
                    None
                }
            },
        };

        let default_locale = match element.get_attribute_full("default-locale") {
            None => None,
            Some(attr) => match attr.value.parse::<Lang>() {
                Ok(lang) => Some(lang),
                Err(_) => {
                    let value_source = attr.value_source.clone();
                    let value = attr.value.clone();
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Invalid Language Tag")
                                .with_code("CK-2-10")
                                .problem(format!(
                                    "'{}' is not a valid default-locale tag",
                                    value
                                ))
                                .add_hint("Use a tag like \"en-US\" or \"fr\"?"),
                            &value_source,
                        )
                        .build();
                    self.push(diag);
                    None
                }
            },
        };

        let mut info = None;
        let mut locales = Vec::new();
        let mut macros: HashMap<String, Macro> = HashMap::new();
        let mut citation = None;
        let mut bibliography = None;

        for child in element.all_children() {
            match child.name.as_str() {
                "info" => {
                    info = Some(self.parse_info(child));
                }
                "locale" => {
                    locales.push(parse_locale_element(self.source, child, &mut self.diagnostics));
                }
                "macro" => {
                    if let Some(macro_def) = self.parse_macro(child) {
                        if macros.contains_key(&macro_def.name) {
                            let diag = self
                                .located(
                                    DiagnosticMessageBuilder::error("Duplicate Macro Definition")
                                        .with_code("CK-2-8")
                                        .problem(format!(
                                            "Macro '{}' is already defined",
                                            macro_def.name
                                        )),
                                    &macro_def.source,
                                )
                                .build();
                            self.push(diag);
                        } else {
                            macros.insert(macro_def.name.clone(), macro_def);
                        }
                    }
                }
                "citation" => {
                    citation = self.parse_layout_container(child);
                }
                "bibliography" => {
                    bibliography = self.parse_layout_container(child);
                }
                other => {
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Unexpected Element")
                                .with_code("CK-2-7")
                                .problem(format!(
                                    "Element <{}> is not valid inside <style>",
                                    other
                                )),
                            &child.name_source,
                        )
                        .build();
                    self.push(diag);
                }
            }
        }

        if citation.is_none() {
            let diag = self
                .located(
                    DiagnosticMessageBuilder::error("Missing Required Element")
                        .with_code("CK-2-4")
                        .problem("Element <style> requires child <citation>"),
                    &element.name_source,
                )
                .build();
            self.push(diag);
        }

        // Build the style whenever the pieces exist, even alongside errors,
        // so every diagnostic in the document gets reported in one call.
        let (version, version_source) = version.unwrap_or_default();
        Some(Style {
            version,
            version_source,
            class: class.unwrap_or(StyleClass::InText),
            default_locale,
            info,
            locales,
            macros,
            citation: citation?,
            bibliography,
            source: element.source.clone(),
        })
    }

    fn parse_info(&mut self, element: &XmlElement) -> StyleInfo {
        let mut info = StyleInfo::default();
        for child in element.all_children() {
            match child.name.as_str() {
                "title" => info.title = child.text().map(|s| s.to_string()),
                "id" => info.id = child.text().map(|s| s.to_string()),
                "link" => {
                    let rel = child.get_attribute("rel").unwrap_or_default().to_string();
                    let Some(href) = child.get_attribute("href") else {
                        let diag = self
                            .located(
                                DiagnosticMessageBuilder::warning("Missing Attribute")
                                    .with_code("CK-2-11")
                                    .problem("Element <link> has no 'href' attribute"),
                                &child.name_source,
                            )
                            .build();
                        self.push(diag);
                        continue;
                    };
                    info.links.push(Link {
                        rel,
                        href: href.to_string(),
                    });
                }
                _ => {}
            }
        }
        info
    }

    fn parse_macro(&mut self, element: &XmlElement) -> Option<Macro> {
        let name = self.require_attr(element, "name")?.value.clone();
        let elements = self.parse_elements(element);
        Some(Macro {
            name,
            elements,
            source: element.source.clone(),
        })
    }

    /// Parse `<citation>` or `<bibliography>`: a container holding a
    /// required `<layout>`.
    fn parse_layout_container(&mut self, element: &XmlElement) -> Option<Layout> {
        let Some(layout_el) = element.get_child("layout") else {
            let diag = self
                .located(
                    DiagnosticMessageBuilder::error("Missing Required Element")
                        .with_code("CK-2-5")
                        .problem(format!(
                            "Element <{}> requires child <layout>",
                            element.name
                        )),
                    &element.name_source,
                )
                .build();
            self.push(diag);
            return None;
        };

        let formatting = parse_formatting(layout_el);
        let delimiter = layout_el.get_attribute("delimiter").map(|s| s.to_string());
        let elements = self.parse_elements(layout_el);

        Some(Layout {
            formatting,
            delimiter,
            elements,
            source: layout_el.source.clone(),
        })
    }

    fn parse_elements(&mut self, parent: &XmlElement) -> Vec<Element> {
        let mut elements = Vec::new();
        for child in parent.all_children() {
            if let Some(element) = self.parse_element(child) {
                elements.push(element);
            }
        }
        elements
    }

    fn parse_element(&mut self, element: &XmlElement) -> Option<Element> {
        let element_type = match element.name.as_str() {
            "text" => Some(ElementType::Text(self.parse_text_element(element)?)),
            "group" => Some(ElementType::Group(GroupElement {
                delimiter: element.get_attribute("delimiter").map(|s| s.to_string()),
                elements: self.parse_elements(element),
            })),
            "choose" => Some(ElementType::Choose(self.parse_choose(element))),
            "names" => Some(ElementType::Names(self.parse_names(element)?)),
            "date" => Some(ElementType::Date(self.parse_date(element)?)),
            "label" => Some(ElementType::Label(LabelElement {
                variable: self.require_attr(element, "variable")?.value.clone(),
                form: self.parse_term_form(element),
            })),
            "number" => Some(ElementType::Number(NumberElement {
                variable: self.require_attr(element, "variable")?.value.clone(),
            })),
            other => {
                let diag = self
                    .located(
                        DiagnosticMessageBuilder::warning("Unexpected Element")
                            .with_code("CK-2-7")
                            .problem(format!(
                                "Element <{}> is not a recognized rendering element",
                                other
                            )),
                        &element.name_source,
                    )
                    .build();
                self.push(diag);
                None
            }
        };

        element_type.map(|element_type| Element {
            element_type,
            formatting: parse_formatting(element),
            source: element.source.clone(),
        })
    }

    fn parse_text_element(&mut self, element: &XmlElement) -> Option<TextElement> {
        let source = if let Some(attr) = element.get_attribute("variable") {
            TextSource::Variable {
                name: attr.to_string(),
            }
        } else if let Some(attr) = element.get_attribute("macro") {
            TextSource::Macro {
                name: attr.to_string(),
            }
        } else if let Some(attr) = element.get_attribute("term") {
            TextSource::Term {
                name: attr.to_string(),
                form: self.parse_term_form(element),
                plural: element.get_attribute("plural") == Some("true"),
            }
        } else if let Some(attr) = element.get_attribute("value") {
            TextSource::Value {
                value: attr.to_string(),
            }
        } else {
            let diag = self
                .located(
                    DiagnosticMessageBuilder::error("Missing Text Source")
                        .with_code("CK-2-6")
                        .problem(
                            "Text element must specify a source using variable, macro, term, or value",
                        )
                        .add_hint(
                            "Add one of: variable=\"...\", macro=\"...\", term=\"...\", or value=\"...\"?",
                        ),
                    &element.name_source,
                )
                .build();
            self.push(diag);
            return None;
        };

        Some(TextElement { source })
    }

    fn parse_term_form(&mut self, element: &XmlElement) -> TermForm {
        match element.get_attribute_full("form") {
            None => TermForm::Long,
            Some(attr) => match TermForm::parse(&attr.value) {
                Some(form) => form,
                None => {
                    let value_source = attr.value_source.clone();
                    let value = attr.value.clone();
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Invalid Attribute Value")
                                .with_code("CK-2-12")
                                .problem(format!(
                                    "Invalid value '{}' for attribute 'form' on <{}>",
                                    value, element.name
                                ))
                                .add_detail(
                                    "Expected: long, short, verb, verb-short, or symbol",
                                ),
                            &value_source,
                        )
                        .build();
                    self.push(diag);
                    TermForm::Long
                }
            },
        }
    }

    fn parse_choose(&mut self, element: &XmlElement) -> ChooseElement {
        let mut branches = Vec::new();
        for child in element.all_children() {
            match child.name.as_str() {
                "if" | "else-if" => {
                    let conditions = self.parse_conditions(child);
                    if conditions.is_empty() {
                        let diag = self
                            .located(
                                DiagnosticMessageBuilder::warning("Condition Missing")
                                    .with_code("CK-2-13")
                                    .problem(format!(
                                        "Element <{}> has no recognized condition and will always match",
                                        child.name
                                    )),
                                &child.name_source,
                            )
                            .build();
                        self.push(diag);
                    }
                    branches.push(ChooseBranch {
                        match_type: parse_match_type(child),
                        conditions,
                        elements: self.parse_elements(child),
                    });
                }
                "else" => {
                    branches.push(ChooseBranch {
                        match_type: MatchType::All,
                        conditions: Vec::new(),
                        elements: self.parse_elements(child),
                    });
                }
                other => {
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Unexpected Element")
                                .with_code("CK-2-7")
                                .problem(format!(
                                    "Element <{}> is not valid inside <choose>",
                                    other
                                )),
                            &child.name_source,
                        )
                        .build();
                    self.push(diag);
                }
            }
        }
        ChooseElement { branches }
    }

    fn parse_conditions(&mut self, element: &XmlElement) -> Vec<Condition> {
        let mut conditions = Vec::new();

        if let Some(types) = element.get_attribute("type") {
            conditions.push(Condition::Type(split_tokens(types)));
        }
        if let Some(vars) = element.get_attribute("variable") {
            conditions.push(Condition::Variable(split_tokens(vars)));
        }
        if let Some(attr) = element.get_attribute_full("position") {
            let mut tests = Vec::new();
            for token in split_tokens(&attr.value) {
                match PositionTest::parse(&token) {
                    Some(test) => tests.push(test),
                    None => {
                        let value_source = attr.value_source.clone();
                        let diag = self
                            .located(
                                DiagnosticMessageBuilder::warning("Invalid Attribute Value")
                                    .with_code("CK-2-12")
                                    .problem(format!(
                                        "'{}' is not a valid position test",
                                        token
                                    ))
                                    .add_detail(
                                        "Expected: first, subsequent, ibid, ibid-with-locator, or near-note",
                                    ),
                                &value_source,
                            )
                            .build();
                        self.push(diag);
                    }
                }
            }
            if !tests.is_empty() {
                conditions.push(Condition::Position(tests));
            }
        }

        conditions
    }

    fn parse_names(&mut self, element: &XmlElement) -> Option<NamesElement> {
        let variables = split_tokens(&self.require_attr(element, "variable")?.value);

        let mut delimiter = element.get_attribute("delimiter").map(|s| s.to_string());
        let mut and = None;
        let mut initialize_with = None;
        let mut form = NameForm::Long;
        let mut substitute = Vec::new();

        for child in element.all_children() {
            match child.name.as_str() {
                "name" => {
                    if let Some(d) = child.get_attribute("delimiter") {
                        delimiter = Some(d.to_string());
                    }
                    and = match child.get_attribute("and") {
                        Some("text") => Some(NameAnd::Text),
                        Some("symbol") => Some(NameAnd::Symbol),
                        _ => None,
                    };
                    initialize_with = child
                        .get_attribute("initialize-with")
                        .map(|s| s.to_string());
                    if child.get_attribute("form") == Some("short") {
                        form = NameForm::Short;
                    }
                }
                "substitute" => {
                    substitute = self.parse_elements(child);
                }
                _ => {}
            }
        }

        Some(NamesElement {
            variables,
            delimiter,
            and,
            initialize_with,
            form,
            substitute,
        })
    }

    fn parse_date(&mut self, element: &XmlElement) -> Option<DateElement> {
        let variable = self.require_attr(element, "variable")?.value.clone();

        let mut parts = Vec::new();
        for child in element.get_children("date-part") {
            match child.get_attribute("name") {
                Some("year") => parts.push(DatePartName::Year),
                Some("month") => parts.push(DatePartName::Month),
                Some("day") => parts.push(DatePartName::Day),
                Some(other) => {
                    let other = other.to_string();
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Invalid Attribute Value")
                                .with_code("CK-2-12")
                                .problem(format!("'{}' is not a valid date-part name", other))
                                .add_detail("Expected: year, month, or day"),
                            &child.name_source,
                        )
                        .build();
                    self.push(diag);
                }
                None => {
                    let diag = self
                        .located(
                            DiagnosticMessageBuilder::warning("Missing Attribute")
                                .with_code("CK-2-11")
                                .problem("Element <date-part> has no 'name' attribute"),
                            &child.name_source,
                        )
                        .build();
                    self.push(diag);
                }
            }
        }
        if parts.is_empty() {
            parts.push(DatePartName::Year);
        }

        Some(DateElement { variable, parts })
    }

    /// Check that every macro reference resolves, with a near-miss hint.
    fn check_macro_references(&mut self, style: &Style) {
        let mut refs: Vec<(String, Range)> = Vec::new();
        collect_macro_refs(&style.citation.elements, &mut refs);
        if let Some(bib) = &style.bibliography {
            collect_macro_refs(&bib.elements, &mut refs);
        }
        for macro_def in style.macros.values() {
            collect_macro_refs(&macro_def.elements, &mut refs);
        }

        for (name, location) in refs {
            if style.macros.contains_key(&name) {
                continue;
            }
            let suggestion = find_similar_macro(&name, style);
            let mut builder = self
                .located(
                    DiagnosticMessageBuilder::error("Undefined Macro")
                        .with_code("CK-2-9")
                        .problem(format!("Macro '{}' is not defined", name)),
                    &location,
                );
            if let Some(suggestion) = suggestion {
                builder = builder.add_hint(format!("Did you mean '{}'?", suggestion));
            }
            let diag = builder.build();
            self.push(diag);
        }
    }
}

/// Parse formatting attributes shared by all rendering elements.
fn parse_formatting(element: &XmlElement) -> Formatting {
    Formatting {
        prefix: element.get_attribute("prefix").map(|s| s.to_string()),
        suffix: element.get_attribute("suffix").map(|s| s.to_string()),
        font_style: match element.get_attribute("font-style") {
            Some("italic") | Some("oblique") => Some(FontStyle::Italic),
            Some("normal") => Some(FontStyle::Normal),
            _ => None,
        },
        font_weight: match element.get_attribute("font-weight") {
            Some("bold") => Some(FontWeight::Bold),
            Some("normal") => Some(FontWeight::Normal),
            _ => None,
        },
    }
}

fn parse_match_type(element: &XmlElement) -> MatchType {
    match element.get_attribute("match") {
        Some("any") => MatchType::Any,
        Some("none") => MatchType::None,
        _ => MatchType::All,
    }
}

/// Split a space-separated attribute value into tokens.
fn split_tokens(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|s| s.to_string())
        .collect()
}

/// Collect all macro references with their source locations.
fn collect_macro_refs(elements: &[Element], refs: &mut Vec<(String, Range)>) {
    for element in elements {
        match &element.element_type {
            ElementType::Text(text) => {
                if let TextSource::Macro { name } = &text.source {
                    refs.push((name.clone(), element.source.clone()));
                }
            }
            ElementType::Group(group) => collect_macro_refs(&group.elements, refs),
            ElementType::Choose(choose) => {
                for branch in &choose.branches {
                    collect_macro_refs(&branch.elements, refs);
                }
            }
            ElementType::Names(names) => collect_macro_refs(&names.substitute, refs),
            _ => {}
        }
    }
}

/// Find a defined macro with a name close to the given one.
fn find_similar_macro(name: &str, style: &Style) -> Option<String> {
    style
        .macros
        .keys()
        .map(|candidate| (candidate, levenshtein_distance(name, candidate)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(candidate, _)| candidate.clone())
}

/// Simple Levenshtein distance calculation.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
