//! Locale data: language-tagged term bundles and their validation.
//!
//! Locale files are standalone XML documents that define language-specific
//! terms. [`validate_locale`] parses and validates one in a single pass,
//! reporting positioned diagnostics; recoverable problems (an unknown child
//! element, a term with no content) are warnings and the remaining terms
//! are kept.

use crate::lang::Lang;
use crate::types::TermForm;
use cslkit_diagnostics::{DiagnosticMessage, DiagnosticMessageBuilder};
use cslkit_source_map::{Range, excerpt_at};
use cslkit_xml::XmlElement;

/// A locale: a language tag plus localized terms.
#[derive(Debug, Clone)]
pub struct Locale {
    /// Language code, if declared via `xml:lang`.
    pub lang: Option<Lang>,
    /// Terms defined in this locale.
    pub terms: Vec<Term>,
    /// Source location.
    pub source: Range,
}

/// A term definition.
#[derive(Debug, Clone)]
pub struct Term {
    /// Term name (e.g., "and", "editor").
    pub name: String,
    /// Term form.
    pub form: TermForm,
    /// Single form of the term.
    pub single: Option<String>,
    /// Plural form of the term.
    pub multiple: Option<String>,
    /// Simple value (when single/multiple not used).
    pub value: Option<String>,
    /// Source location.
    pub source: Range,
}

impl Term {
    /// The appropriate value for singular or plural use.
    pub fn text(&self, plural: bool) -> Option<&str> {
        if plural {
            self.multiple
                .as_deref()
                .or(self.value.as_deref())
                .or(self.single.as_deref())
        } else {
            self.single
                .as_deref()
                .or(self.value.as_deref())
                .or(self.multiple.as_deref())
        }
    }
}

impl Locale {
    /// Look up a term by name and form, falling back to the long form when
    /// the requested form is not defined.
    pub fn get_term(&self, name: &str, form: TermForm, plural: bool) -> Option<&str> {
        for term in &self.terms {
            if term.name == name && term.form == form {
                return term.text(plural);
            }
        }

        if form != TermForm::Long {
            for term in &self.terms {
                if term.name == name && term.form == TermForm::Long {
                    return term.text(plural);
                }
            }
        }

        None
    }
}

/// Outcome of validating locale XML.
#[derive(Debug)]
pub struct LocaleValidation {
    /// The parsed locale; `None` when errors prevented parsing.
    pub locale: Option<Locale>,
    /// All diagnostics found, in source order.
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl LocaleValidation {
    /// Whether the locale parsed without error-severity diagnostics.
    pub fn is_usable(&self) -> bool {
        self.locale.is_some() && !self.diagnostics.iter().any(|d| d.is_error())
    }
}

/// Parse and validate locale XML in one pass.
pub fn validate_locale(source: &str) -> LocaleValidation {
    let mut diagnostics = Vec::new();

    let doc = match cslkit_xml::parse(source) {
        Ok(doc) => doc,
        Err(err) => {
            diagnostics.push(err.to_diagnostic());
            return LocaleValidation {
                locale: None,
                diagnostics,
            };
        }
    };

    let root = &doc.root;
    if root.name != "locale" {
        diagnostics.push(
            DiagnosticMessageBuilder::error("Invalid Root Element")
                .with_code("CK-3-1")
                .with_location(root.name_source.clone())
                .with_excerpt(excerpt_at(source, &root.name_source))
                .problem(format!(
                    "Locale document must have <locale> as root, found <{}>",
                    root.name
                ))
                .build(),
        );
        return LocaleValidation {
            locale: None,
            diagnostics,
        };
    }

    let lang = parse_xml_lang(source, root, &mut diagnostics);

    let mut terms = Vec::new();
    for child in root.all_children() {
        match child.name.as_str() {
            "terms" => {
                for term_el in child.all_children() {
                    if term_el.name != "term" {
                        diagnostics.push(
                            DiagnosticMessageBuilder::warning("Unexpected Element")
                                .with_code("CK-3-2")
                                .with_location(term_el.name_source.clone())
                                .with_excerpt(excerpt_at(source, &term_el.name_source))
                                .problem(format!(
                                    "Element <{}> is not valid inside <terms>",
                                    term_el.name
                                ))
                                .build(),
                        );
                        continue;
                    }
                    if let Some(term) = parse_term(source, term_el, &mut diagnostics) {
                        terms.push(term);
                    }
                }
            }
            // Locale style options and date formats are accepted but not
            // modeled; the render engine only consumes terms.
            "style-options" | "date" => {}
            other => {
                diagnostics.push(
                    DiagnosticMessageBuilder::warning("Unexpected Element")
                        .with_code("CK-3-2")
                        .with_location(child.name_source.clone())
                        .with_excerpt(excerpt_at(source, &child.name_source))
                        .problem(format!("Element <{}> is not valid inside <locale>", other))
                        .build(),
                );
            }
        }
    }

    LocaleValidation {
        locale: Some(Locale {
            lang,
            terms,
            source: root.source.clone(),
        }),
        diagnostics,
    }
}

/// Parse a locale from XML that is already known to be valid.
///
/// Convenience for inline `<locale>` overrides inside a style, where the
/// style validator has already reported problems.
pub fn parse_locale_element(
    source: &str,
    element: &XmlElement,
    diagnostics: &mut Vec<DiagnosticMessage>,
) -> Locale {
    let lang = parse_xml_lang(source, element, diagnostics);
    let mut terms = Vec::new();
    for child in element.all_children() {
        if child.name == "terms" {
            for term_el in child.all_children() {
                if term_el.name == "term" {
                    if let Some(term) = parse_term(source, term_el, diagnostics) {
                        terms.push(term);
                    }
                }
            }
        }
    }
    Locale {
        lang,
        terms,
        source: element.source.clone(),
    }
}

fn parse_xml_lang(
    source: &str,
    element: &XmlElement,
    diagnostics: &mut Vec<DiagnosticMessage>,
) -> Option<Lang> {
    let attr = element
        .attributes
        .iter()
        .find(|a| a.name == "lang" && a.prefix.as_deref() == Some("xml"))?;

    match attr.value.parse::<Lang>() {
        Ok(lang) => Some(lang),
        Err(_) => {
            diagnostics.push(
                DiagnosticMessageBuilder::warning("Invalid Language Tag")
                    .with_code("CK-3-3")
                    .with_location(attr.value_source.clone())
                    .with_excerpt(excerpt_at(source, &attr.value_source))
                    .problem(format!("'{}' is not a valid language tag", attr.value))
                    .add_hint("Use a tag like \"en-US\" or \"fr\"?")
                    .build(),
            );
            None
        }
    }
}

fn parse_term(
    source: &str,
    element: &XmlElement,
    diagnostics: &mut Vec<DiagnosticMessage>,
) -> Option<Term> {
    let Some(name_attr) = element.get_attribute_full("name") else {
        diagnostics.push(
            DiagnosticMessageBuilder::error("Missing Required Attribute")
                .with_code("CK-3-4")
                .with_location(element.name_source.clone())
                .with_excerpt(excerpt_at(source, &element.name_source))
                .problem("Element <term> requires attribute 'name'")
                .add_hint("Add name=\"...\" to the element?")
                .build(),
        );
        return None;
    };

    let form = match element.get_attribute_full("form") {
        None => TermForm::Long,
        Some(attr) => match TermForm::parse(&attr.value) {
            Some(form) => form,
            None => {
                diagnostics.push(
                    DiagnosticMessageBuilder::warning("Invalid Attribute Value")
                        .with_code("CK-3-5")
                        .with_location(attr.value_source.clone())
                        .with_excerpt(excerpt_at(source, &attr.value_source))
                        .problem(format!(
                            "Invalid value '{}' for attribute 'form' on <term>",
                            attr.value
                        ))
                        .add_detail("Expected: long, short, verb, verb-short, or symbol")
                        .build(),
                );
                TermForm::Long
            }
        },
    };

    let mut single = None;
    let mut multiple = None;
    let mut value = None;

    let children = element.all_children();
    if children.is_empty() {
        value = element.text().map(|s| s.to_string()).or(Some(String::new()));
    } else {
        for child in children {
            match child.name.as_str() {
                "single" => single = child.text().map(|s| s.to_string()),
                "multiple" => multiple = child.text().map(|s| s.to_string()),
                _ => {}
            }
        }
    }

    Some(Term {
        name: name_attr.value.clone(),
        form,
        single,
        multiple,
        value,
        source: element.source.clone(),
    })
}

/// Metadata extracted from a style module document.
#[derive(Debug, Clone)]
pub struct ModuleMeta {
    /// Module title, if declared.
    pub title: Option<String>,
    /// The parent style this module points at, if dependent.
    pub parent_href: Option<String>,
}

/// Outcome of validating module XML.
#[derive(Debug)]
pub struct ModuleValidation {
    /// Parsed metadata; `None` when errors prevented parsing.
    pub meta: Option<ModuleMeta>,
    /// All diagnostics found, in source order.
    pub diagnostics: Vec<DiagnosticMessage>,
}

/// Parse and validate a fetched style module in one pass.
///
/// Modules are style documents; only their metadata is inspected here, the
/// payload itself stays opaque to the driver.
pub fn validate_module(source: &str) -> ModuleValidation {
    let mut diagnostics = Vec::new();

    let doc = match cslkit_xml::parse(source) {
        Ok(doc) => doc,
        Err(err) => {
            diagnostics.push(err.to_diagnostic());
            return ModuleValidation {
                meta: None,
                diagnostics,
            };
        }
    };

    let root = &doc.root;
    if root.name != "style" {
        diagnostics.push(
            DiagnosticMessageBuilder::error("Invalid Root Element")
                .with_code("CK-3-6")
                .with_location(root.name_source.clone())
                .with_excerpt(excerpt_at(source, &root.name_source))
                .problem(format!(
                    "Module document must have <style> as root, found <{}>",
                    root.name
                ))
                .build(),
        );
        return ModuleValidation {
            meta: None,
            diagnostics,
        };
    }

    let mut title = None;
    let mut parent_href = None;
    if let Some(info) = root.get_child("info") {
        title = info
            .get_child("title")
            .and_then(|t| t.text())
            .map(|s| s.to_string());
        parent_href = info
            .get_children("link")
            .into_iter()
            .find(|l| l.get_attribute("rel") == Some("independent-parent"))
            .and_then(|l| l.get_attribute("href"))
            .map(|s| s.to_string());
    }

    ModuleValidation {
        meta: Some(ModuleMeta { title, parent_href }),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_simple_locale() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<locale xmlns="http://purl.org/net/xbiblio/csl" version="1.0" xml:lang="en-US">
  <terms>
    <term name="and">and</term>
    <term name="et-al">et al.</term>
    <term name="editor">
      <single>editor</single>
      <multiple>editors</multiple>
    </term>
    <term name="and" form="symbol">&amp;</term>
  </terms>
</locale>"#;

        let outcome = validate_locale(xml);
        assert!(outcome.is_usable(), "{:?}", outcome.diagnostics);
        let locale = outcome.locale.unwrap();
        assert_eq!(locale.lang, Some("en-US".parse().unwrap()));
        assert_eq!(locale.terms.len(), 4);

        assert_eq!(locale.get_term("and", TermForm::Long, false), Some("and"));
        assert_eq!(locale.get_term("and", TermForm::Symbol, false), Some("&"));
        assert_eq!(
            locale.get_term("editor", TermForm::Long, true),
            Some("editors")
        );
    }

    #[test]
    fn test_form_falls_back_to_long() {
        let xml = r#"<locale xml:lang="en-US">
  <terms><term name="and">and</term></terms>
</locale>"#;
        let locale = validate_locale(xml).locale.unwrap();
        assert_eq!(
            locale.get_term("and", TermForm::VerbShort, false),
            Some("and")
        );
    }

    #[test]
    fn test_term_missing_name_is_error() {
        let xml = r#"<locale xml:lang="en-US">
  <terms><term>orphan</term></terms>
</locale>"#;
        let outcome = validate_locale(xml);
        assert!(!outcome.is_usable());
        assert!(outcome.diagnostics.iter().any(|d| d.is_error()));
        // The rest of the locale is still parsed
        assert!(outcome.locale.is_some());
    }

    #[test]
    fn test_wrong_root_is_error() {
        let outcome = validate_locale("<style/>");
        assert!(outcome.locale.is_none());
        assert!(outcome.diagnostics[0].is_error());
    }

    #[test]
    fn test_unknown_element_is_warning() {
        let xml = r#"<locale xml:lang="en-US">
  <banana/>
  <terms><term name="and">and</term></terms>
</locale>"#;
        let outcome = validate_locale(xml);
        assert!(outcome.is_usable());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(!outcome.diagnostics[0].is_error());
    }

    #[test]
    fn test_diagnostic_carries_excerpt() {
        let xml = "<locale xml:lang=\"en-US\">\n  <terms><term form=\"nope\" name=\"and\">and</term></terms>\n</locale>";
        let outcome = validate_locale(xml);
        let diag = &outcome.diagnostics[0];
        assert!(diag.excerpt.as_deref().unwrap().contains("form=\"nope\""));
        assert!(diag.location.is_some());
    }

    #[test]
    fn test_validate_module() {
        let xml = r#"<style xmlns="http://purl.org/net/xbiblio/csl" version="1.0">
  <info>
    <title>Journal Variant</title>
    <link href="http://example.com/styles/base-style" rel="independent-parent"/>
  </info>
</style>"#;
        let outcome = validate_module(xml);
        assert!(outcome.diagnostics.is_empty());
        let meta = outcome.meta.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Journal Variant"));
        assert_eq!(
            meta.parent_href.as_deref(),
            Some("http://example.com/styles/base-style")
        );
    }

    #[test]
    fn test_validate_module_wrong_root() {
        let outcome = validate_module("<locale/>");
        assert!(outcome.meta.is_none());
        assert!(outcome.diagnostics[0].is_error());
    }
}
