//! The driver's locale cache and term resolution.
//!
//! The cache grows monotonically for the driver's lifetime: fetched
//! locales are stored per language tag and never evicted. Term lookup
//! walks a tag's fallback chain across style overrides first, then cached
//! locale files, then the bundled en-US core terms, degrading to `None`
//! when no chain entry defines the term.

use crate::fetch::ResourceId;
use cslkit_csl::{Lang, Locale, Term, TermForm};
use cslkit_source_map::Range;
use std::collections::HashMap;

/// Core en-US terms bundled with the driver, so a fetcher-less driver
/// still renders English. Kept separate from fetched locales: the en-US
/// locale file is still a fetch candidate, and a fetched copy carries far
/// more terms than this table.
const EN_US_CORE_TERMS: &[(&str, &str, Option<&str>)] = &[
    ("and", "and", None),
    ("et-al", "et al.", None),
    ("ibid", "ibid.", None),
    ("accessed", "accessed", None),
    ("retrieved", "retrieved", None),
    ("from", "from", None),
    ("in", "in", None),
    ("no date", "n.d.", None),
    ("edition", "edition", Some("editions")),
    ("page", "page", Some("pages")),
    ("chapter", "chapter", Some("chapters")),
    ("section", "section", Some("sections")),
    ("volume", "volume", Some("volumes")),
    ("issue", "issue", Some("issues")),
    ("editor", "editor", Some("editors")),
    ("translator", "translator", Some("translators")),
    ("month-01", "January", None),
    ("month-02", "February", None),
    ("month-03", "March", None),
    ("month-04", "April", None),
    ("month-05", "May", None),
    ("month-06", "June", None),
    ("month-07", "July", None),
    ("month-08", "August", None),
    ("month-09", "September", None),
    ("month-10", "October", None),
    ("month-11", "November", None),
    ("month-12", "December", None),
];

/// Build the bundled en-US core locale.
fn builtin_en_us() -> Locale {
    let terms = EN_US_CORE_TERMS
        .iter()
        .map(|(name, single, multiple)| Term {
            name: name.to_string(),
            form: TermForm::Long,
            single: Some(single.to_string()),
            multiple: multiple.map(|m| m.to_string()),
            value: None,
            source: Range::default(),
        })
        .collect();
    Locale {
        lang: Some(Lang::en_us()),
        terms,
        source: Range::default(),
    }
}

/// Locale cache keyed by language tag, plus cached module payloads.
#[derive(Debug)]
pub struct LocaleCache {
    default: Lang,
    /// Fetched locales; entries are added, never evicted.
    locales: HashMap<Lang, Locale>,
    /// Inline `<locale>` overrides from the style; these outrank fetched
    /// locale files.
    style_overrides: Vec<Locale>,
    /// Bundled en-US core terms, the last resort of every chain.
    builtin: Locale,
    modules: HashMap<String, String>,
}

impl LocaleCache {
    /// Create a cache with the bundled en-US fallback and the style's
    /// inline locale overrides.
    pub fn new(default: Lang, style_overrides: Vec<Locale>) -> Self {
        Self {
            default,
            locales: HashMap::new(),
            style_overrides,
            builtin: builtin_en_us(),
            modules: HashMap::new(),
        }
    }

    /// The style's default language.
    pub fn default_lang(&self) -> &Lang {
        &self.default
    }

    /// Whether a fetched locale for this tag is cached.
    pub fn has_locale(&self, lang: &Lang) -> bool {
        self.locales.contains_key(lang)
    }

    /// Whether a module payload is cached under this name.
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Whether the resource is already cached.
    pub fn has_resource(&self, resource: &ResourceId) -> bool {
        match resource {
            ResourceId::Locale(lang) => self.has_locale(lang),
            ResourceId::Module(name) => self.has_module(name),
        }
    }

    /// Store a fetched locale under its tag. Entries are never evicted.
    pub fn store_locale(&mut self, lang: Lang, locale: Locale) {
        self.locales.insert(lang, locale);
    }

    /// Store a fetched module payload under its name.
    pub fn store_module(&mut self, name: String, payload: String) {
        self.modules.insert(name, payload);
    }

    /// A cached module payload.
    pub fn module(&self, name: &str) -> Option<&str> {
        self.modules.get(name).map(|s| s.as_str())
    }

    /// Resolve a term for the given language.
    ///
    /// Style overrides win over fetched locale files: first an override
    /// tagged with a chain language, then an untagged override, then the
    /// cached locale files along the chain, then the bundled en-US core
    /// terms. Returns `None` when the term is absent everywhere, which
    /// renders as empty.
    pub fn get_term(
        &self,
        lang: &Lang,
        name: &str,
        form: TermForm,
        plural: bool,
    ) -> Option<String> {
        let chain = lang.fallback_chain(&self.default);

        for chain_lang in &chain {
            for locale in &self.style_overrides {
                if locale.lang.as_ref() == Some(chain_lang) {
                    if let Some(term) = locale.get_term(name, form, plural) {
                        return Some(term.to_string());
                    }
                }
            }
        }

        for locale in &self.style_overrides {
            if locale.lang.is_none() {
                if let Some(term) = locale.get_term(name, form, plural) {
                    return Some(term.to_string());
                }
            }
        }

        for chain_lang in &chain {
            if let Some(locale) = self.locales.get(chain_lang) {
                if let Some(term) = locale.get_term(name, form, plural) {
                    return Some(term.to_string());
                }
            }
        }

        self.builtin
            .get_term(name, form, plural)
            .map(|term| term.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cslkit_csl::validate_locale;

    fn lang(s: &str) -> Lang {
        s.parse().unwrap()
    }

    fn cache() -> LocaleCache {
        LocaleCache::new(Lang::en_us(), Vec::new())
    }

    #[test]
    fn test_builtin_terms_resolve_without_fetch() {
        let cache = cache();
        // The builtin table is a fallback, not a cached fetch
        assert!(!cache.has_locale(&Lang::en_us()));
        assert_eq!(
            cache.get_term(&Lang::en_us(), "and", TermForm::Long, false),
            Some("and".to_string())
        );
        assert_eq!(
            cache.get_term(&Lang::en_us(), "editor", TermForm::Long, true),
            Some("editors".to_string())
        );
    }

    #[test]
    fn test_chain_falls_back_to_builtin() {
        let cache = cache();
        // No fr locale cached; fr-FR falls through to the builtin root
        assert_eq!(
            cache.get_term(&lang("fr-FR"), "edition", TermForm::Long, false),
            Some("edition".to_string())
        );
    }

    #[test]
    fn test_fetched_locale_wins_over_builtin() {
        let mut cache = cache();
        let fr = validate_locale(
            r#"<locale xml:lang="fr-FR">
  <terms><term name="edition">édition</term></terms>
</locale>"#,
        )
        .locale
        .unwrap();
        cache.store_locale(lang("fr-FR"), fr);
        assert!(cache.has_locale(&lang("fr-FR")));

        assert_eq!(
            cache.get_term(&lang("fr-FR"), "edition", TermForm::Long, false),
            Some("édition".to_string())
        );
        // Terms the fr-FR locale does not define continue down the chain
        assert_eq!(
            cache.get_term(&lang("fr-FR"), "and", TermForm::Long, false),
            Some("and".to_string())
        );
    }

    #[test]
    fn test_mid_chain_gap_continues_to_next_tag() {
        let mut cache = cache();
        // Only the base-language locale arrived; fr-FR itself failed
        let fr = validate_locale(
            r#"<locale xml:lang="fr">
  <terms><term name="edition">édition</term></terms>
</locale>"#,
        )
        .locale
        .unwrap();
        cache.store_locale(lang("fr"), fr);

        assert_eq!(
            cache.get_term(&lang("fr-FR"), "edition", TermForm::Long, false),
            Some("édition".to_string())
        );
    }

    #[test]
    fn test_style_override_outranks_files() {
        let override_locale = validate_locale(
            r#"<locale xml:lang="en-US">
  <terms><term name="ibid">op. cit.</term></terms>
</locale>"#,
        )
        .locale
        .unwrap();
        let cache = LocaleCache::new(Lang::en_us(), vec![override_locale]);

        assert_eq!(
            cache.get_term(&Lang::en_us(), "ibid", TermForm::Long, false),
            Some("op. cit.".to_string())
        );
    }

    #[test]
    fn test_missing_term_is_none() {
        let cache = cache();
        assert_eq!(
            cache.get_term(&Lang::en_us(), "folio", TermForm::Long, false),
            None
        );
    }

    #[test]
    fn test_module_payloads_cached_by_name() {
        let mut cache = cache();
        assert!(!cache.has_module("base-style"));
        cache.store_module("base-style".to_string(), "<style/>".to_string());
        assert!(cache.has_module("base-style"));
        assert_eq!(cache.module("base-style"), Some("<style/>"));
    }
}
