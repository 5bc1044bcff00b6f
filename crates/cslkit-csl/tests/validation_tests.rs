//! Validation tests against realistic style documents.
//!
//! These exercise the one-pass parse+validate contract: every problem in
//! a document is reported in a single call, positioned against the source.

use cslkit_csl::{ElementType, StyleClass, TermForm, TextSource, validate_locale, validate_style};

// A style modeled on real author-date styles, trimmed to the supported
// element set.
const AUTHOR_DATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0" default-locale="en-US">
  <info>
    <title>Test Author-Date</title>
    <id>http://example.com/styles/test-author-date</id>
    <link href="http://example.com/styles/test-author-date" rel="self"/>
  </info>
  <macro name="author-short">
    <names variable="author">
      <name form="short" and="text"/>
      <substitute><text variable="title"/></substitute>
    </names>
  </macro>
  <macro name="year">
    <date variable="issued"><date-part name="year"/></date>
  </macro>
  <citation>
    <layout prefix="(" suffix=")" delimiter="; ">
      <group delimiter=" ">
        <text macro="author-short"/>
        <text macro="year"/>
      </group>
    </layout>
  </citation>
</style>"#;

#[test]
fn test_author_date_style_parses() {
    let outcome = validate_style(AUTHOR_DATE);
    assert!(outcome.is_usable(), "{:?}", outcome.diagnostics);

    let style = outcome.style.unwrap();
    assert_eq!(style.class, StyleClass::InText);
    assert_eq!(style.macros.len(), 2);
    assert_eq!(style.citation.formatting.prefix.as_deref(), Some("("));
    assert_eq!(style.citation.delimiter.as_deref(), Some("; "));

    let ElementType::Group(group) = &style.citation.elements[0].element_type else {
        panic!("expected group");
    };
    let ElementType::Text(text) = &group.elements[0].element_type else {
        panic!("expected text");
    };
    assert!(matches!(&text.source, TextSource::Macro { name } if name == "author-short"));
}

#[test]
fn test_multiple_problems_reported_in_one_call() {
    let source = r#"<style class="in-text" version="1.0">
  <macro name="a"><text value="x"/></macro>
  <macro name="a"><text value="y"/></macro>
  <citation><layout>
    <text/>
    <text macro="missing"/>
  </layout></citation>
</style>"#;

    let outcome = validate_style(source);
    assert!(!outcome.is_usable());

    let titles: Vec<&str> = outcome
        .diagnostics
        .iter()
        .map(|d| d.title.as_str())
        .collect();
    assert!(titles.contains(&"Duplicate Macro Definition"));
    assert!(titles.contains(&"Missing Text Source"));
    assert!(titles.contains(&"Undefined Macro"));
}

#[test]
fn test_diagnostics_render_as_text() {
    let outcome = validate_style("<locale/>");
    let text = outcome.diagnostics[0].to_text();
    assert!(text.starts_with("Error: Invalid Root Element"));
    assert!(text.contains("CK-2-1"));
}

#[test]
fn test_locale_round_trip_terms() {
    let outcome = validate_locale(
        r#"<?xml version="1.0" encoding="utf-8"?>
<locale xmlns="http://purl.org/net/xbiblio/csl" version="1.0" xml:lang="de-DE">
  <terms>
    <term name="and">und</term>
    <term name="edition">
      <single>Auflage</single>
      <multiple>Auflagen</multiple>
    </term>
  </terms>
</locale>"#,
    );
    assert!(outcome.is_usable(), "{:?}", outcome.diagnostics);

    let locale = outcome.locale.unwrap();
    assert_eq!(locale.lang, Some("de-DE".parse().unwrap()));
    assert_eq!(locale.get_term("edition", TermForm::Long, true), Some("Auflagen"));
}
