//! References in CSL-JSON format and the reference store.
//!
//! Only structural shape is validated here; field semantics are the
//! formatting engine's concern.

use cslkit_csl::Lang;
use hashlink::LinkedHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A bibliographic reference in CSL-JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    /// Unique identifier for this reference.
    /// CSL-JSON allows both string and integer IDs, so we accept both.
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    /// Reference type (e.g., "book", "article-journal", "chapter").
    #[serde(rename = "type", default)]
    pub ref_type: String,

    // Standard CSL variables - text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "container-title", skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(rename = "collection-title", skip_serializing_if = "Option::is_none")]
    pub collection_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "publisher-place", skip_serializing_if = "Option::is_none")]
    pub publisher_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "DOI", skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Language tag of the reference (e.g., "fr-FR"); feeds the resource
    /// dependency analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    // Name variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<Name>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<Vec<Name>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translator: Option<Vec<Name>>,

    // Date variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateVariable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed: Option<DateVariable>,

    // Other fields captured in a map for extensibility
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl Reference {
    /// Get a text variable by CSL name.
    pub fn get_variable(&self, name: &str) -> Option<String> {
        match name {
            "title" => self.title.clone(),
            "container-title" => self.container_title.clone(),
            "collection-title" => self.collection_title.clone(),
            "publisher" => self.publisher.clone(),
            "publisher-place" => self.publisher_place.clone(),
            "edition" => self.edition.as_ref().map(|v| v.as_str()),
            "volume" => self.volume.as_ref().map(|v| v.as_str()),
            "issue" => self.issue.as_ref().map(|v| v.as_str()),
            "page" => self.page.clone(),
            "URL" => self.url.clone(),
            "DOI" => self.doi.clone(),
            "note" => self.note.clone(),
            "language" => self.language.clone(),
            other => match self.other.get(other) {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            },
        }
    }

    /// Get a name variable by CSL name.
    pub fn get_names(&self, name: &str) -> Option<&[Name]> {
        match name {
            "author" => self.author.as_deref(),
            "editor" => self.editor.as_deref(),
            "translator" => self.translator.as_deref(),
            _ => None,
        }
    }

    /// Get a date variable by CSL name.
    pub fn get_date(&self, name: &str) -> Option<&DateVariable> {
        match name {
            "issued" => self.issued.as_ref(),
            "accessed" => self.accessed.as_ref(),
            _ => None,
        }
    }

    /// The reference's language tag, if it parses.
    pub fn lang(&self) -> Option<Lang> {
        self.language.as_ref().and_then(|l| l.parse().ok())
    }
}

/// A string or number value (CSL allows both for some fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(i64),
}

impl StringOrNumber {
    /// Get the value as a string.
    pub fn as_str(&self) -> String {
        match self {
            StringOrNumber::String(s) => s.clone(),
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Deserialize a value that can be either a string or an integer into a String.
fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("expected string or number for id")),
    }
}

/// A name in CSL-JSON format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Name {
    /// Family name (surname).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Given name (first name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,

    /// Non-dropping particle (e.g., "van" in "Vincent van Gogh").
    #[serde(rename = "non-dropping-particle", skip_serializing_if = "Option::is_none")]
    pub non_dropping_particle: Option<String>,

    /// Name suffix (e.g., "Jr.").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Literal name for institutions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

/// A date variable in CSL-JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateVariable {
    /// Date parts: `[[year, month, day], [end_year, ...]]` for ranges.
    /// Values can be integers or strings (CSL-JSON allows both).
    #[serde(rename = "date-parts", skip_serializing_if = "Option::is_none", default)]
    pub date_parts: Option<Vec<Vec<serde_json::Value>>>,

    /// Literal date string (when structured date is not available).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl DateVariable {
    /// The (year, month, day) of the start date, coercing string parts.
    pub fn start_parts(&self) -> Option<(Option<i32>, Option<i32>, Option<i32>)> {
        let parts = self.date_parts.as_ref()?.first()?;
        let coerce = |v: &serde_json::Value| -> Option<i32> {
            match v {
                serde_json::Value::Number(n) => n.as_i64().map(|n| n as i32),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            }
        };
        Some((
            parts.first().and_then(coerce),
            parts.get(1).and_then(coerce),
            parts.get(2).and_then(coerce),
        ))
    }
}

/// Mapping of reference id to reference data, preserving insertion order.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    references: LinkedHashMap<String, Reference>,
}

impl ReferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite references as a batch.
    ///
    /// Within one batch, later entries with a duplicate id overwrite
    /// earlier ones. References not in the batch are untouched.
    pub fn insert_references(&mut self, refs: Vec<Reference>) {
        for reference in refs {
            self.references.insert(reference.id.clone(), reference);
        }
    }

    /// Replace the whole library with the given references.
    pub fn reset_references(&mut self, refs: Vec<Reference>) {
        self.references.clear();
        self.insert_references(refs);
    }

    /// Insert or overwrite a single reference.
    pub fn insert_reference(&mut self, reference: Reference) {
        self.references.insert(reference.id.clone(), reference);
    }

    /// Remove a reference by id. Cites pointing at it become dangling.
    pub fn remove_reference(&mut self, id: &str) {
        self.references.remove(id);
    }

    /// Look up a reference by id.
    pub fn get(&self, id: &str) -> Option<&Reference> {
        self.references.get(id)
    }

    /// Number of stored references.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// The distinct parsed language tags among stored references.
    ///
    /// Unparseable tags are skipped; they cannot participate in the
    /// locale fallback relation.
    pub fn langs_in_use(&self) -> BTreeSet<Lang> {
        self.references
            .values()
            .filter_map(|r| r.lang())
            .collect()
    }
}
