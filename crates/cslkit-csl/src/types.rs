//! Core CSL style types with source tracking.

use crate::lang::Lang;
use cslkit_source_map::Range;
use std::collections::HashMap;

/// A parsed CSL style.
#[derive(Debug, Clone)]
pub struct Style {
    /// CSL version (e.g., "1.0").
    pub version: String,
    /// Version attribute source location.
    pub version_source: Range,

    /// Style class: "in-text" or "note".
    pub class: StyleClass,

    /// Default locale for the style (e.g., "en-US").
    pub default_locale: Option<Lang>,

    /// Style info (title, id, links).
    pub info: Option<StyleInfo>,

    /// Locale overrides defined inline in the style.
    pub locales: Vec<crate::locale::Locale>,

    /// Macro definitions, keyed by name.
    pub macros: HashMap<String, Macro>,

    /// Citation layout.
    pub citation: Layout,

    /// Bibliography layout (optional).
    pub bibliography: Option<Layout>,

    /// Source location of the entire style element.
    pub source: Range,
}

impl Style {
    /// The default locale, falling back to `en-US` when the style does not
    /// declare one.
    pub fn default_lang(&self) -> Lang {
        self.default_locale.clone().unwrap_or_else(Lang::en_us)
    }

    /// Names of external style modules this style depends on.
    ///
    /// Dependent styles reference their parent through an
    /// `independent-parent` info link; the module name is the last path
    /// segment of the link target.
    pub fn required_modules(&self) -> Vec<String> {
        let Some(info) = &self.info else {
            return Vec::new();
        };
        info.links
            .iter()
            .filter(|l| l.rel == "independent-parent")
            .filter_map(|l| {
                l.href
                    .rsplit('/')
                    .find(|seg| !seg.is_empty())
                    .map(|seg| seg.to_string())
            })
            .collect()
    }
}

/// Style class: determines citation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    /// In-text citations (author-date, numeric).
    InText,
    /// Note-based citations (footnotes, endnotes).
    Note,
}

/// Style metadata.
#[derive(Debug, Clone, Default)]
pub struct StyleInfo {
    /// Style title.
    pub title: Option<String>,
    /// Style ID (URI).
    pub id: Option<String>,
    /// Links (self, template, independent-parent, documentation).
    pub links: Vec<Link>,
}

/// An info link.
#[derive(Debug, Clone)]
pub struct Link {
    /// Link relation (e.g., "self", "independent-parent").
    pub rel: String,
    /// Link target.
    pub href: String,
}

/// A macro definition.
#[derive(Debug, Clone)]
pub struct Macro {
    /// Macro name.
    pub name: String,
    /// Elements in this macro.
    pub elements: Vec<Element>,
    /// Source location of the entire macro element.
    pub source: Range,
}

/// A layout (for citation or bibliography).
#[derive(Debug, Clone)]
pub struct Layout {
    /// Formatting for the layout.
    pub formatting: Formatting,
    /// Delimiter between cites/entries.
    pub delimiter: Option<String>,
    /// Elements in the layout.
    pub elements: Vec<Element>,
    /// Source location.
    pub source: Range,
}

/// Formatting attributes shared by all rendering elements.
#[derive(Debug, Clone, Default)]
pub struct Formatting {
    /// Text to prepend.
    pub prefix: Option<String>,
    /// Text to append.
    pub suffix: Option<String>,
    /// Italic rendering.
    pub font_style: Option<FontStyle>,
    /// Bold rendering.
    pub font_weight: Option<FontWeight>,
}

impl Formatting {
    /// Whether this formatting changes anything.
    pub fn is_plain(&self) -> bool {
        self.prefix.is_none()
            && self.suffix.is_none()
            && self.font_style.is_none()
            && self.font_weight.is_none()
    }
}

/// Font style values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

/// Font weight values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// A formatting element.
#[derive(Debug, Clone)]
pub struct Element {
    /// What kind of element this is.
    pub element_type: ElementType,
    /// Formatting attributes.
    pub formatting: Formatting,
    /// Source location.
    pub source: Range,
}

/// The kinds of rendering elements.
#[derive(Debug, Clone)]
pub enum ElementType {
    Text(TextElement),
    Group(GroupElement),
    Choose(ChooseElement),
    Names(NamesElement),
    Date(DateElement),
    Label(LabelElement),
    Number(NumberElement),
}

/// A `<text>` element.
#[derive(Debug, Clone)]
pub struct TextElement {
    /// Where the text comes from.
    pub source: TextSource,
}

/// The source of a `<text>` element's content.
#[derive(Debug, Clone)]
pub enum TextSource {
    /// A reference variable.
    Variable { name: String },
    /// A macro call.
    Macro { name: String },
    /// A locale term.
    Term {
        name: String,
        form: TermForm,
        plural: bool,
    },
    /// A literal value.
    Value { value: String },
}

/// Term form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermForm {
    #[default]
    Long,
    Short,
    Verb,
    VerbShort,
    Symbol,
}

impl TermForm {
    /// Parse a form attribute value.
    pub fn parse(value: &str) -> Option<TermForm> {
        match value {
            "long" => Some(TermForm::Long),
            "short" => Some(TermForm::Short),
            "verb" => Some(TermForm::Verb),
            "verb-short" => Some(TermForm::VerbShort),
            "symbol" => Some(TermForm::Symbol),
            _ => None,
        }
    }
}

/// A `<group>` element.
#[derive(Debug, Clone)]
pub struct GroupElement {
    /// Delimiter between child outputs.
    pub delimiter: Option<String>,
    /// Child elements.
    pub elements: Vec<Element>,
}

/// A `<choose>` element (conditionals).
#[derive(Debug, Clone)]
pub struct ChooseElement {
    /// Branches in order: `<if>`, `<else-if>`..., optional `<else>`.
    pub branches: Vec<ChooseBranch>,
}

/// One branch of a `<choose>`.
#[derive(Debug, Clone)]
pub struct ChooseBranch {
    /// How multiple conditions combine.
    pub match_type: MatchType,
    /// Conditions; empty for `<else>`.
    pub conditions: Vec<Condition>,
    /// Elements rendered when the branch matches.
    pub elements: Vec<Element>,
}

/// How conditions on a branch combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    All,
    Any,
    None,
}

/// A single condition on a `<choose>` branch.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Matches when the reference type is one of these.
    Type(Vec<String>),
    /// Matches when any of these variables is non-empty.
    Variable(Vec<String>),
    /// Matches on the cite's position in the document.
    Position(Vec<PositionTest>),
}

/// Position values testable in a `<choose>` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionTest {
    First,
    Subsequent,
    Ibid,
    IbidWithLocator,
    NearNote,
}

impl PositionTest {
    /// Parse a position attribute token.
    pub fn parse(value: &str) -> Option<PositionTest> {
        match value {
            "first" => Some(PositionTest::First),
            "subsequent" => Some(PositionTest::Subsequent),
            "ibid" => Some(PositionTest::Ibid),
            "ibid-with-locator" => Some(PositionTest::IbidWithLocator),
            "near-note" => Some(PositionTest::NearNote),
            _ => None,
        }
    }
}

/// A `<names>` element, reduced to the options the render engine honors.
#[derive(Debug, Clone)]
pub struct NamesElement {
    /// Variables tried in order until one has names.
    pub variables: Vec<String>,
    /// Delimiter between names.
    pub delimiter: Option<String>,
    /// How to join the final name.
    pub and: Option<NameAnd>,
    /// Initialization string for given names (e.g., ". ").
    pub initialize_with: Option<String>,
    /// Name form.
    pub form: NameForm,
    /// Fallback elements when no variable has names.
    pub substitute: Vec<Element>,
}

/// How the final two names are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAnd {
    /// The locale's "and" term.
    Text,
    /// An ampersand.
    Symbol,
}

/// Name form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameForm {
    #[default]
    Long,
    Short,
}

/// A `<date>` element, rendering year-month-day subsets.
#[derive(Debug, Clone)]
pub struct DateElement {
    /// The date variable to render.
    pub variable: String,
    /// Which parts to render, in order.
    pub parts: Vec<DatePartName>,
}

/// Date part names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartName {
    Year,
    Month,
    Day,
}

/// A `<label>` element.
#[derive(Debug, Clone)]
pub struct LabelElement {
    /// The variable whose term is rendered.
    pub variable: String,
    /// Term form.
    pub form: TermForm,
}

/// A `<number>` element.
#[derive(Debug, Clone)]
pub struct NumberElement {
    /// The numeric variable to render.
    pub variable: String,
}
