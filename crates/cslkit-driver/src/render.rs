//! Synchronous rendering with change tracking.
//!
//! Rendering is a pure function of the style, the locale cache, and
//! snapshots of the two stores. It runs in two passes: the first resolves
//! effective document order and classifies every cite's position (first,
//! subsequent, ibid, ...) because that classification depends on global
//! order, not local cluster content; the second evaluates the citation
//! layout per cluster. Nothing here mutates the inputs.

use crate::cluster::{Cite, Cluster, ClusterNumber, ClusterStore, Locator};
use crate::locales::LocaleCache;
use crate::output::OutputFormat;
use crate::reference::{Name, Reference, ReferenceStore};
use cslkit_csl::{
    Condition, Element, ElementType, Formatting, Lang, MatchType, NameAnd, NameForm,
    PositionTest, Style, TextSource,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Rendered text for a cite whose reference id does not resolve.
const MISSING_REFERENCE_PLACEHOLDER: &str = "???";

/// How many notes back a previous citation still counts as "near".
const NEAR_NOTE_DISTANCE: u32 = 5;

/// The outcome of one full render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    /// Rendered text per cluster id.
    pub built: HashMap<String, String>,
    /// Cluster ids in effective document order.
    pub order: Vec<String>,
    /// Per-cluster change flag: true when the text differs from the
    /// previous render or the cluster is new. Ids present only in the
    /// previous render are simply absent here.
    pub touched: HashMap<String, bool>,
}

/// Build every in-document cluster without computing change flags.
pub(crate) fn build_document(
    style: &Style,
    cache: &LocaleCache,
    references: &ReferenceStore,
    clusters: &ClusterStore,
    format: OutputFormat,
) -> (Vec<String>, HashMap<String, String>) {
    let order = clusters.document_order();
    let positions = classify_positions(&order);

    let mut built = HashMap::with_capacity(order.len());
    let mut ids = Vec::with_capacity(order.len());

    for (cluster_index, (cluster, _number)) in order.iter().enumerate() {
        let text = build_cluster(
            style,
            cache,
            references,
            format,
            cluster,
            &positions[cluster_index],
        );
        ids.push(cluster.id.clone());
        built.insert(cluster.id.clone(), text);
    }

    (ids, built)
}

/// Full render pass with change detection against the previous snapshot.
pub(crate) fn render_document(
    style: &Style,
    cache: &LocaleCache,
    references: &ReferenceStore,
    clusters: &ClusterStore,
    format: OutputFormat,
    previous: Option<&RenderedDocument>,
) -> RenderedDocument {
    let (order, built) = build_document(style, cache, references, clusters, format);

    let mut touched = HashMap::with_capacity(built.len());
    for (id, text) in &built {
        let unchanged = previous
            .map(|prev| prev.built.get(id) == Some(text))
            .unwrap_or(false);
        touched.insert(id.clone(), !unchanged);
    }

    debug!(
        clusters = order.len(),
        touched = touched.values().filter(|t| **t).count(),
        "render pass complete"
    );

    RenderedDocument {
        built,
        order,
        touched,
    }
}

/// Classify the positions of every cite, in effective document order.
///
/// Returns one `Vec<Vec<PositionTest>>` per cluster, one entry per cite.
/// `Ibid` implies `Subsequent`, and `IbidWithLocator` implies both, so
/// condition evaluation is a plain membership test.
fn classify_positions(order: &[(&Cluster, ClusterNumber)]) -> Vec<Vec<Vec<PositionTest>>> {
    let mut seen: HashSet<&str> = HashSet::new();
    // Last note number each reference was cited at.
    let mut last_note: HashMap<&str, u32> = HashMap::new();
    // The immediately preceding cite, when usable for ibid detection:
    // the previous cite within the same cluster, or the sole cite of the
    // previous cluster.
    let mut result = Vec::with_capacity(order.len());

    let mut prev_cluster: Option<&Cluster> = None;

    for &(cluster, number) in order {
        let mut cluster_positions = Vec::with_capacity(cluster.cites.len());

        for (cite_index, cite) in cluster.cites.iter().enumerate() {
            let mut positions = Vec::new();

            let prev_cite: Option<&Cite> = if cite_index > 0 {
                Some(&cluster.cites[cite_index - 1])
            } else {
                prev_cluster.and_then(|prev| {
                    if prev.cites.len() == 1 {
                        prev.cites.first()
                    } else {
                        None
                    }
                })
            };

            if seen.contains(cite.id.as_str()) {
                positions.push(PositionTest::Subsequent);

                if let Some(prev) = prev_cite {
                    if prev.id == cite.id {
                        match ibid_kind(&prev.locators, &cite.locators) {
                            Some(PositionTest::IbidWithLocator) => {
                                positions.push(PositionTest::Ibid);
                                positions.push(PositionTest::IbidWithLocator);
                            }
                            Some(PositionTest::Ibid) => {
                                positions.push(PositionTest::Ibid);
                            }
                            _ => {}
                        }
                    }
                }

                if let (Some(current_note), Some(&previous_note)) =
                    (number.note(), last_note.get(cite.id.as_str()))
                {
                    if current_note.saturating_sub(previous_note) <= NEAR_NOTE_DISTANCE {
                        positions.push(PositionTest::NearNote);
                    }
                }
            } else {
                positions.push(PositionTest::First);
                seen.insert(cite.id.as_str());
            }

            if let Some(note) = number.note() {
                last_note.insert(cite.id.as_str(), note);
            }

            cluster_positions.push(positions);
        }

        prev_cluster = Some(cluster);
        result.push(cluster_positions);
    }

    result
}

/// Decide the ibid flavor from the two cites' locators.
///
/// Same reference as the immediately preceding cite:
/// - neither has a locator, or the locators are identical: plain ibid
/// - the current cite adds or changes a locator: ibid-with-locator
/// - the previous cite had a locator the current one drops: no ibid
fn ibid_kind(previous: &[Locator], current: &[Locator]) -> Option<PositionTest> {
    match (previous.is_empty(), current.is_empty()) {
        (true, true) => Some(PositionTest::Ibid),
        (true, false) => Some(PositionTest::IbidWithLocator),
        (false, false) => {
            if previous == current {
                Some(PositionTest::Ibid)
            } else {
                Some(PositionTest::IbidWithLocator)
            }
        }
        (false, true) => None,
    }
}

/// Per-cite evaluation context.
struct EvalContext<'a> {
    style: &'a Style,
    cache: &'a LocaleCache,
    format: OutputFormat,
    reference: &'a Reference,
    /// Term lookup language: the reference's own language, or the style
    /// default.
    lang: Lang,
    positions: &'a [PositionTest],
    locators: &'a [Locator],
}

impl EvalContext<'_> {
    fn get_term(&self, name: &str, form: cslkit_csl::TermForm, plural: bool) -> Option<String> {
        self.cache.get_term(&self.lang, name, form, plural)
    }
}

/// Render one cluster: evaluate the citation layout per cite, apply cite
/// prefixes/suffixes, join with the layout delimiter.
fn build_cluster(
    style: &Style,
    cache: &LocaleCache,
    references: &ReferenceStore,
    format: OutputFormat,
    cluster: &Cluster,
    positions: &[Vec<PositionTest>],
) -> String {
    let layout = &style.citation;
    let delimiter = layout.delimiter.as_deref().unwrap_or("; ");

    let mut cite_texts = Vec::with_capacity(cluster.cites.len());
    for (cite, cite_positions) in cluster.cites.iter().zip(positions) {
        let body = match references.get(&cite.id) {
            Some(reference) => {
                let ctx = EvalContext {
                    style,
                    cache,
                    format,
                    reference,
                    lang: reference
                        .lang()
                        .unwrap_or_else(|| style.default_lang()),
                    positions: cite_positions,
                    locators: &cite.locators,
                };
                evaluate_elements(&ctx, &layout.elements, layout.delimiter.as_deref().unwrap_or(""))
            }
            None => {
                warn!(ref_id = %cite.id, cluster_id = %cluster.id, "cite references unknown reference, rendering placeholder");
                MISSING_REFERENCE_PLACEHOLDER.to_string()
            }
        };

        let mut text = String::new();
        if let Some(prefix) = &cite.prefix {
            text.push_str(&format.escape(prefix));
        }
        text.push_str(&body);
        if let Some(suffix) = &cite.suffix {
            text.push_str(&format.escape(suffix));
        }
        cite_texts.push(text);
    }

    let joined = cite_texts
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(delimiter);

    apply_formatting(format, &layout.formatting, joined)
}

/// Evaluate a sequence of elements, joining non-empty outputs.
fn evaluate_elements(ctx: &EvalContext, elements: &[Element], delimiter: &str) -> String {
    let outputs: Vec<String> = elements
        .iter()
        .map(|element| evaluate_element(ctx, element))
        .filter(|output| !output.is_empty())
        .collect();
    outputs.join(delimiter)
}

/// Evaluate a single element, applying its formatting when non-empty.
fn evaluate_element(ctx: &EvalContext, element: &Element) -> String {
    let output = match &element.element_type {
        ElementType::Text(text) => evaluate_text(ctx, &text.source),
        ElementType::Group(group) => {
            evaluate_elements(ctx, &group.elements, group.delimiter.as_deref().unwrap_or(""))
        }
        ElementType::Choose(choose) => {
            let mut chosen = String::new();
            for branch in &choose.branches {
                if branch_matches(ctx, &branch.conditions, branch.match_type) {
                    chosen = evaluate_elements(ctx, &branch.elements, "");
                    break;
                }
            }
            chosen
        }
        ElementType::Names(names) => evaluate_names(ctx, names),
        ElementType::Date(date) => evaluate_date(ctx, date),
        ElementType::Label(label) => evaluate_label(ctx, label),
        ElementType::Number(number) => ctx
            .reference
            .get_variable(&number.variable)
            .map(|v| ctx.format.escape(&v))
            .unwrap_or_default(),
    };

    if output.is_empty() {
        output
    } else {
        apply_formatting(ctx.format, &element.formatting, output)
    }
}

fn evaluate_text(ctx: &EvalContext, source: &TextSource) -> String {
    match source {
        TextSource::Variable { name } => {
            if name == "locator" {
                let joined = ctx
                    .locators
                    .iter()
                    .map(|l| l.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.format.escape(&joined)
            } else {
                ctx.reference
                    .get_variable(name)
                    .map(|v| ctx.format.escape(&v))
                    .unwrap_or_default()
            }
        }
        TextSource::Macro { name } => match ctx.style.macros.get(name) {
            Some(macro_def) => evaluate_elements(ctx, &macro_def.elements, ""),
            None => String::new(),
        },
        TextSource::Term { name, form, plural } => ctx
            .get_term(name, *form, *plural)
            .map(|t| ctx.format.escape(&t))
            .unwrap_or_default(),
        TextSource::Value { value } => ctx.format.escape(value),
    }
}

/// Evaluate a `<choose>` branch's conditions.
fn branch_matches(ctx: &EvalContext, conditions: &[Condition], match_type: MatchType) -> bool {
    // An else branch has no conditions and always matches.
    if conditions.is_empty() {
        return true;
    }

    let mut results = conditions.iter().map(|c| condition_matches(ctx, c));
    match match_type {
        MatchType::All => results.all(|r| r),
        MatchType::Any => results.any(|r| r),
        MatchType::None => results.all(|r| !r),
    }
}

fn condition_matches(ctx: &EvalContext, condition: &Condition) -> bool {
    match condition {
        Condition::Type(types) => types.iter().any(|t| t == &ctx.reference.ref_type),
        Condition::Variable(vars) => vars.iter().any(|v| {
            if v == "locator" {
                !ctx.locators.is_empty()
            } else {
                ctx.reference.get_variable(v).is_some()
                    || ctx.reference.get_names(v).is_some_and(|n| !n.is_empty())
                    || ctx.reference.get_date(v).is_some()
            }
        }),
        Condition::Position(tests) => tests.iter().any(|t| ctx.positions.contains(t)),
    }
}

/// Format a name list per the reduced name options.
fn evaluate_names(ctx: &EvalContext, names_el: &cslkit_csl::NamesElement) -> String {
    for variable in &names_el.variables {
        let Some(names) = ctx.reference.get_names(variable) else {
            continue;
        };
        if names.is_empty() {
            continue;
        }

        let delimiter = names_el.delimiter.as_deref().unwrap_or(", ");
        let and_word = names_el.and.map(|a| match a {
            NameAnd::Text => ctx
                .get_term("and", cslkit_csl::TermForm::Long, false)
                .unwrap_or_else(|| "and".to_string()),
            NameAnd::Symbol => "&".to_string(),
        });

        let formatted: Vec<String> = names
            .iter()
            .map(|n| format_single_name(n, names_el.form, names_el.initialize_with.as_deref()))
            .collect();

        let joined = match (formatted.len(), &and_word) {
            (1, _) => formatted[0].clone(),
            (2, Some(and)) => format!("{} {} {}", formatted[0], and, formatted[1]),
            (_, Some(and)) => {
                let last = formatted.len() - 1;
                format!(
                    "{}{}{} {}",
                    formatted[..last].join(delimiter),
                    delimiter,
                    and,
                    formatted[last]
                )
            }
            (_, None) => formatted.join(delimiter),
        };

        return ctx.format.escape(&joined);
    }

    // No variable had names; try the substitute.
    for element in &names_el.substitute {
        let output = evaluate_element(ctx, element);
        if !output.is_empty() {
            return output;
        }
    }

    String::new()
}

/// Format a single name.
fn format_single_name(name: &Name, form: NameForm, initialize_with: Option<&str>) -> String {
    if let Some(literal) = &name.literal {
        return literal.clone();
    }

    let mut family_parts = Vec::new();
    if let Some(ndp) = &name.non_dropping_particle {
        family_parts.push(ndp.clone());
    }
    if let Some(family) = &name.family {
        family_parts.push(family.clone());
    }
    let family = family_parts.join(" ");

    match form {
        NameForm::Short => family,
        NameForm::Long => {
            let given = name.given.as_ref().map(|given| match initialize_with {
                Some(init) => initialize_name(given, init),
                None => given.clone(),
            });
            match (family.is_empty(), given) {
                (false, Some(given)) => {
                    let mut out = format!("{}, {}", family, given);
                    if let Some(suffix) = &name.suffix {
                        out.push_str(", ");
                        out.push_str(suffix);
                    }
                    out
                }
                (false, None) => family,
                (true, Some(given)) => given,
                (true, None) => String::new(),
            }
        }
    }
}

/// Initialize a given name (e.g., "John William" -> "J. W.").
fn initialize_name(given: &str, initialize_with: &str) -> String {
    given
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .map(|c| format!("{}{}", c.to_uppercase(), initialize_with))
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string()
}

/// Render a date variable: year, then month and day when requested.
fn evaluate_date(ctx: &EvalContext, date_el: &cslkit_csl::DateElement) -> String {
    let Some(date) = ctx.reference.get_date(&date_el.variable) else {
        return String::new();
    };

    if let Some(literal) = &date.literal {
        return ctx.format.escape(literal);
    }

    let Some((year, month, day)) = date.start_parts() else {
        return String::new();
    };

    let mut parts = Vec::new();
    for part in &date_el.parts {
        match part {
            cslkit_csl::DatePartName::Year => {
                if let Some(year) = year {
                    parts.push(year.to_string());
                }
            }
            cslkit_csl::DatePartName::Month => {
                if let Some(month) = month {
                    let term_name = format!("month-{:02}", month);
                    let text = ctx
                        .get_term(&term_name, cslkit_csl::TermForm::Long, false)
                        .unwrap_or_else(|| month.to_string());
                    parts.push(text);
                }
            }
            cslkit_csl::DatePartName::Day => {
                if let Some(day) = day {
                    parts.push(day.to_string());
                }
            }
        }
    }

    ctx.format.escape(&parts.join(" "))
}

/// Render a `<label>`: the term for a variable, e.g. "p." for a locator.
fn evaluate_label(ctx: &EvalContext, label_el: &cslkit_csl::LabelElement) -> String {
    let term_name = if label_el.variable == "locator" {
        match ctx.locators.first() {
            Some(locator) => locator.label.clone(),
            None => return String::new(),
        }
    } else {
        label_el.variable.clone()
    };

    ctx.get_term(&term_name, label_el.form, false)
        .map(|t| ctx.format.escape(&t))
        .unwrap_or_default()
}

/// Apply prefix, suffix, and font formatting to already-escaped text.
fn apply_formatting(format: OutputFormat, formatting: &Formatting, text: String) -> String {
    if formatting.is_plain() {
        return text;
    }

    let mut out = text;
    if formatting.font_style == Some(cslkit_csl::FontStyle::Italic) {
        out = format.italic(out);
    }
    if formatting.font_weight == Some(cslkit_csl::FontWeight::Bold) {
        out = format.bold(out);
    }

    let mut wrapped = String::new();
    if let Some(prefix) = &formatting.prefix {
        wrapped.push_str(&format.escape(prefix));
    }
    wrapped.push_str(&out);
    if let Some(suffix) = &formatting.suffix {
        wrapped.push_str(&format.escape(suffix));
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Cite, Cluster, NoteNumber};
    use cslkit_csl::validate_style;

    fn style(xml: &str) -> Style {
        let outcome = validate_style(xml);
        assert!(outcome.is_usable(), "{:?}", outcome.diagnostics);
        outcome.style.unwrap()
    }

    fn reference(json: &str) -> Reference {
        serde_json::from_str(json).unwrap()
    }

    fn simple_cluster(id: &str, ref_id: &str) -> Cluster {
        Cluster {
            id: id.to_string(),
            cites: vec![Cite {
                id: ref_id.to_string(),
                ..Default::default()
            }],
            note: None,
        }
    }

    fn fixture() -> (Style, LocaleCache, ReferenceStore) {
        let style = style(
            r#"<style class="in-text" version="1.0">
  <citation><layout delimiter="; ">
    <group delimiter=", ">
      <names variable="author"><name form="short"/></names>
      <text variable="title" font-style="italic"/>
    </group>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![
            reference(
                r#"{"id": "smith", "type": "book", "title": "A Book",
                    "author": [{"family": "Smith", "given": "John"}]}"#,
            ),
            reference(r#"{"id": "jones", "type": "book", "title": "Other"}"#),
        ]);
        (style, cache, references)
    }

    #[test]
    fn test_build_simple_cluster() {
        let (style, cache, references) = fixture();
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c1", "smith")])
            .unwrap();

        let (order, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(order, vec!["c1".to_string()]);
        assert_eq!(built["c1"], "Smith, A Book");
    }

    #[test]
    fn test_html_format_escapes_and_styles() {
        let (style, cache, mut references) = fixture();
        references.insert_references(vec![reference(
            r#"{"id": "amp", "type": "book", "title": "Ties & Knots"}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c1", "amp")])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Html);
        assert_eq!(built["c1"], "<i>Ties &amp; Knots</i>");
    }

    #[test]
    fn test_dangling_reference_renders_placeholder() {
        let (style, cache, references) = fixture();
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c1", "nobody")])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c1"], MISSING_REFERENCE_PLACEHOLDER);
    }

    #[test]
    fn test_cite_prefix_suffix_concatenated() {
        let (style, cache, references) = fixture();
        let mut clusters = ClusterStore::new();
        let cluster = Cluster {
            id: "c1".to_string(),
            cites: vec![Cite {
                id: "smith".to_string(),
                prefix: Some("see ".to_string()),
                suffix: Some(", passim".to_string()),
                locators: Vec::new(),
            }],
            note: None,
        };
        clusters.init_clusters(vec![cluster]).unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c1"], "see Smith, A Book, passim");
    }

    #[test]
    fn test_touched_flags_settle_on_second_render() {
        let (style, cache, references) = fixture();
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c1", "smith"), simple_cluster("c2", "jones")])
            .unwrap();

        let first = render_document(
            &style,
            &cache,
            &references,
            &clusters,
            OutputFormat::Plain,
            None,
        );
        assert!(first.touched.values().all(|t| *t));

        let second = render_document(
            &style,
            &cache,
            &references,
            &clusters,
            OutputFormat::Plain,
            Some(&first),
        );
        assert!(second.touched.values().all(|t| !*t));
    }

    #[test]
    fn test_removed_cluster_absent_from_render() {
        let (style, cache, references) = fixture();
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c1", "smith"), simple_cluster("c2", "jones")])
            .unwrap();

        let first = render_document(
            &style,
            &cache,
            &references,
            &clusters,
            OutputFormat::Plain,
            None,
        );
        clusters.remove_cluster("c1");
        let second = render_document(
            &style,
            &cache,
            &references,
            &clusters,
            OutputFormat::Plain,
            Some(&first),
        );
        assert!(!second.built.contains_key("c1"));
        assert_eq!(second.order, vec!["c2".to_string()]);
    }

    fn note_cluster(id: &str, ref_id: &str, note: u32, locators: Vec<Locator>) -> Cluster {
        Cluster {
            id: id.to_string(),
            cites: vec![Cite {
                id: ref_id.to_string(),
                locators,
                ..Default::default()
            }],
            note: Some(NoteNumber::Single(note)),
        }
    }

    #[test]
    fn test_position_classification() {
        let a1 = note_cluster("a", "smith", 1, Vec::new());
        let a2 = note_cluster("b", "smith", 2, Vec::new());
        let far = note_cluster("c", "smith", 20, Vec::new());
        let order_store = {
            let mut store = ClusterStore::new();
            store.init_clusters(vec![a1, a2, far]).unwrap();
            store
        };
        let order = order_store.document_order();
        let positions = classify_positions(&order);

        assert_eq!(positions[0][0], vec![PositionTest::First]);
        assert!(positions[1][0].contains(&PositionTest::Subsequent));
        assert!(positions[1][0].contains(&PositionTest::Ibid));
        assert!(positions[1][0].contains(&PositionTest::NearNote));
        // 18 notes later: subsequent but not near, and still ibid because
        // the preceding cluster is a sole cite of the same reference
        assert!(positions[2][0].contains(&PositionTest::Subsequent));
        assert!(!positions[2][0].contains(&PositionTest::NearNote));
    }

    #[test]
    fn test_ibid_with_locator_classification() {
        let first = note_cluster("a", "smith", 1, Vec::new());
        let with_locator = note_cluster(
            "b",
            "smith",
            2,
            vec![Locator {
                label: "page".to_string(),
                value: "12".to_string(),
            }],
        );
        let mut store = ClusterStore::new();
        store.init_clusters(vec![first, with_locator]).unwrap();
        let order = store.document_order();
        let positions = classify_positions(&order);

        assert!(positions[1][0].contains(&PositionTest::IbidWithLocator));
        assert!(positions[1][0].contains(&PositionTest::Ibid));
    }

    #[test]
    fn test_position_condition_renders_ibid_term() {
        let style = style(
            r#"<style class="note" version="1.0">
  <citation><layout>
    <choose>
      <if position="ibid"><text term="ibid"/></if>
      <else><text variable="title"/></else>
    </choose>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(
            r#"{"id": "smith", "type": "book", "title": "A Book"}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![
                note_cluster("a", "smith", 1, Vec::new()),
                note_cluster("b", "smith", 2, Vec::new()),
            ])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["a"], "A Book");
        assert_eq!(built["b"], "ibid.");
    }

    #[test]
    fn test_locator_label_and_value() {
        let style = style(
            r#"<style class="note" version="1.0">
  <citation><layout>
    <group delimiter=" ">
      <text variable="title"/>
      <label variable="locator" form="short"/>
      <text variable="locator"/>
    </group>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(
            r#"{"id": "smith", "type": "book", "title": "A Book"}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![note_cluster(
                "a",
                "smith",
                1,
                vec![Locator {
                    label: "page".to_string(),
                    value: "44".to_string(),
                }],
            )])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        // No short form for "page" in the core terms; falls back to long
        assert_eq!(built["a"], "A Book page 44");
    }

    #[test]
    fn test_names_with_and_term() {
        let style = style(
            r#"<style class="in-text" version="1.0">
  <citation><layout>
    <names variable="author"><name form="short" and="text"/></names>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(
            r#"{"id": "duo", "type": "book",
                "author": [{"family": "Smith"}, {"family": "Jones"}]}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c", "duo")])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c"], "Smith and Jones");
    }

    #[test]
    fn test_date_year_rendering() {
        let style = style(
            r#"<style class="in-text" version="1.0">
  <citation><layout>
    <group delimiter=" ">
      <text variable="title"/>
      <date variable="issued"><date-part name="year"/></date>
    </group>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(
            r#"{"id": "smith", "title": "A Book", "issued": {"date-parts": [[2020, 3, 14]]}}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters
            .init_clusters(vec![simple_cluster("c", "smith")])
            .unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c"], "A Book 2020");
    }

    #[test]
    fn test_macro_expansion() {
        let style = style(
            r#"<style class="in-text" version="1.0">
  <macro name="title-mac"><text variable="title"/></macro>
  <citation><layout><text macro="title-mac"/></layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(r#"{"id": "x", "title": "Via Macro"}"#)]);
        let mut clusters = ClusterStore::new();
        clusters.init_clusters(vec![simple_cluster("c", "x")]).unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c"], "Via Macro");
    }

    #[test]
    fn test_group_drops_empty_children() {
        let style = style(
            r#"<style class="in-text" version="1.0">
  <citation><layout>
    <group delimiter=", ">
      <text variable="title"/>
      <text variable="volume"/>
      <text variable="page"/>
    </group>
  </layout></citation>
</style>"#,
        );
        let cache = LocaleCache::new(Lang::en_us(), Vec::new());
        let mut references = ReferenceStore::new();
        references.insert_references(vec![reference(
            r#"{"id": "x", "title": "Only Title", "page": "9"}"#,
        )]);
        let mut clusters = ClusterStore::new();
        clusters.init_clusters(vec![simple_cluster("c", "x")]).unwrap();

        let (_, built) =
            build_document(&style, &cache, &references, &clusters, OutputFormat::Plain);
        assert_eq!(built["c"], "Only Title, 9");
    }
}
