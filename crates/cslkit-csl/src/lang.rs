//! Language tags and locale fallback chains.
//!
//! A [`Lang`] is a parsed BCP 47-ish language tag as CSL uses them: a
//! lowercase language code with an optional uppercase region code
//! (`fr-FR`, `de`, `en-US`). The fallback chain for a tag walks from the
//! most specific form down to the ultimate `en-US` root, and every entry in
//! the chain must be fetched up front because rendering cannot suspend to
//! request a tag it discovers missing mid-pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lang {
    /// Lowercase language code (e.g., "fr").
    language: String,
    /// Uppercase region code, if any (e.g., "FR").
    region: Option<String>,
}

/// Error for unparseable language tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLangTag(pub String);

impl fmt::Display for InvalidLangTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid language tag '{}'", self.0)
    }
}

impl std::error::Error for InvalidLangTag {}

impl Lang {
    /// The ultimate fallback root every chain ends in.
    pub fn en_us() -> Self {
        Lang {
            language: "en".to_string(),
            region: Some("US".to_string()),
        }
    }

    /// The language code without any region.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The region code, if any.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The language-only version of this tag, if this tag carries a region.
    pub fn base(&self) -> Option<Lang> {
        self.region.as_ref().map(|_| Lang {
            language: self.language.clone(),
            region: None,
        })
    }

    /// The ordered, deduplicated fallback chain for this tag.
    ///
    /// Specific tag, then its language-only form, then the style default,
    /// then `en-US`. Every tag in the chain is a fetch candidate, not just
    /// the first hit.
    pub fn fallback_chain(&self, default: &Lang) -> Vec<Lang> {
        let mut chain = Vec::with_capacity(4);
        let mut push = |lang: Lang| {
            if !chain.contains(&lang) {
                chain.push(lang);
            }
        };

        push(self.clone());
        if let Some(base) = self.base() {
            push(base);
        }
        push(default.clone());
        push(Lang::en_us());

        chain
    }
}

impl FromStr for Lang {
    type Err = InvalidLangTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        let language = parts.next().unwrap_or_default();
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(InvalidLangTag(s.to_string()));
        }

        let region = match parts.next() {
            None => None,
            Some(r) if r.chars().all(|c| c.is_ascii_alphanumeric()) && !r.is_empty() => {
                Some(r.to_ascii_uppercase())
            }
            Some(_) => return Err(InvalidLangTag(s.to_string())),
        };

        // Trailing subtags (scripts, variants) are not part of the CSL
        // fallback relation; reject rather than silently truncate.
        if parts.next().is_some() {
            return Err(InvalidLangTag(s.to_string()));
        }

        Ok(Lang {
            language: language.to_ascii_lowercase(),
            region,
        })
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => write!(f, "{}", self.language),
        }
    }
}

impl TryFrom<String> for Lang {
    type Error = InvalidLangTag;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Lang> for String {
    fn from(lang: Lang) -> String {
        lang.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(s: &str) -> Lang {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_roundtrip() {
        assert_eq!(lang("fr-FR").to_string(), "fr-FR");
        assert_eq!(lang("fr-fr").to_string(), "fr-FR");
        assert_eq!(lang("DE").to_string(), "de");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Lang>().is_err());
        assert!("12-US".parse::<Lang>().is_err());
        assert!("en-US-x-custom".parse::<Lang>().is_err());
    }

    #[test]
    fn test_base() {
        assert_eq!(lang("fr-FR").base(), Some(lang("fr")));
        assert_eq!(lang("fr").base(), None);
    }

    #[test]
    fn test_fallback_chain_french() {
        let chain = lang("fr-FR").fallback_chain(&Lang::en_us());
        assert_eq!(chain, vec![lang("fr-FR"), lang("fr"), lang("en-US")]);
    }

    #[test]
    fn test_fallback_chain_dedups_default() {
        let chain = lang("de").fallback_chain(&lang("de"));
        assert_eq!(chain, vec![lang("de"), lang("en-US")]);
    }

    #[test]
    fn test_fallback_chain_non_root_default() {
        let chain = lang("pt-BR").fallback_chain(&lang("de-AT"));
        assert_eq!(
            chain,
            vec![lang("pt-BR"), lang("pt"), lang("de-AT"), lang("en-US")]
        );
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&lang("fr-FR")).unwrap();
        assert_eq!(json, "\"fr-FR\"");
        let back: Lang = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lang("fr-FR"));
    }
}
