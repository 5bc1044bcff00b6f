//! Resource dependency analysis.
//!
//! Rendering is synchronous and cannot suspend to request a missing
//! locale, so every resource a render pass could reach must be known
//! before the fetch batch is issued. For each language in use the entire
//! fallback chain is requested, not just the first hit: a chain entry
//! only discovered missing at render time would be too late to fetch.

use crate::fetch::ResourceId;
use cslkit_csl::{Lang, Style};
use std::collections::BTreeSet;

/// Compute the deduplicated, ordered set of resources a style requires
/// given the languages present among loaded references.
///
/// Pure and idempotent; re-run whenever the active language set changes.
pub fn required_resources(style: &Style, ref_langs: &BTreeSet<Lang>) -> Vec<ResourceId> {
    let default = style.default_lang();
    let mut out: Vec<ResourceId> = Vec::new();
    let mut push = |resource: ResourceId| {
        if !out.contains(&resource) {
            out.push(resource);
        }
    };

    for lang in std::iter::once(&default).chain(ref_langs.iter()) {
        for tag in lang.fallback_chain(&default) {
            push(ResourceId::Locale(tag));
        }
    }

    for module in style.required_modules() {
        push(ResourceId::Module(module));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cslkit_csl::validate_style;

    fn style(default_locale: &str) -> Style {
        let xml = format!(
            r#"<style class="in-text" version="1.0" default-locale="{}">
  <citation><layout><text variable="title"/></layout></citation>
</style>"#,
            default_locale
        );
        validate_style(&xml).style.unwrap()
    }

    fn lang(s: &str) -> Lang {
        s.parse().unwrap()
    }

    #[test]
    fn test_french_reference_full_chain() {
        let style = style("en-US");
        let langs: BTreeSet<Lang> = [lang("fr-FR")].into_iter().collect();

        let resources = required_resources(&style, &langs);
        let expected: BTreeSet<ResourceId> = [
            ResourceId::Locale(lang("fr-FR")),
            ResourceId::Locale(lang("fr")),
            ResourceId::Locale(lang("en-US")),
        ]
        .into_iter()
        .collect();
        assert_eq!(resources.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn test_idempotent_and_deduplicated() {
        let style = style("en-US");
        let langs: BTreeSet<Lang> = [lang("fr-FR"), lang("fr")].into_iter().collect();

        let first = required_resources(&style, &langs);
        let second = required_resources(&style, &langs);
        assert_eq!(first, second);

        let unique: BTreeSet<_> = first.iter().cloned().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn test_default_locale_alone() {
        let style = style("de-AT");
        let resources = required_resources(&style, &BTreeSet::new());
        assert_eq!(
            resources,
            vec![
                ResourceId::Locale(lang("de-AT")),
                ResourceId::Locale(lang("de")),
                ResourceId::Locale(lang("en-US")),
            ]
        );
    }

    #[test]
    fn test_modules_included() {
        let xml = r#"<style class="in-text" version="1.0">
  <info><link href="http://example.com/styles/parent-style" rel="independent-parent"/></info>
  <citation><layout><text variable="title"/></layout></citation>
</style>"#;
        let style = validate_style(xml).style.unwrap();
        let resources = required_resources(&style, &BTreeSet::new());
        assert!(resources.contains(&ResourceId::Module("parent-style".to_string())));
    }
}
