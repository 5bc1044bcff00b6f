//! Citation clusters and the ordered cluster store.
//!
//! A cluster is one in-text citation occurrence: one or more cites placed
//! at a note position. The store keeps insertion order as the default
//! document order; `set_cluster_order` overrides it with externally
//! supplied note numbering (e.g., to mirror a host document's footnotes).

use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One reference citation within a cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cite {
    /// Reference id; may be dangling.
    pub id: String,

    /// Inline content rendered before the cite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Inline content rendered after the cite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Ordered locators (label, value) attached to this cite.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locators: Vec<Locator>,
}

/// A (label, value) locator pair, e.g. ("page", "12-14").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Locator label (e.g., "page", "chapter").
    pub label: String,
    /// Locator value (e.g., "42-45").
    pub value: String,
}

/// A note position: a single note number, or a (note, index) pair for
/// multiple clusters occupying one footnote.
///
/// Serialized as an integer or a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteNumber {
    /// The only cluster in its note.
    Single(u32),
    /// (note, index-in-note) for clusters sharing a footnote.
    Multi(u32, u32),
}

impl NoteNumber {
    /// The (note, index) pair this position occupies.
    pub fn as_pair(&self) -> (u32, u32) {
        match *self {
            NoteNumber::Single(n) => (n, 0),
            NoteNumber::Multi(n, i) => (n, i),
        }
    }

    /// The note number alone.
    pub fn note(&self) -> u32 {
        self.as_pair().0
    }
}

/// One in-text citation occurrence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique cluster id.
    pub id: String,

    /// Cites in document order within the cluster.
    #[serde(default)]
    pub cites: Vec<Cite>,

    /// Default note position, used when no explicit order is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteNumber>,
}

/// One entry of an explicit cluster ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterPosition {
    /// Cluster id.
    pub id: String,

    /// Note position; absent for in-text references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteNumber>,
}

/// The effective number a cluster renders at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterNumber {
    /// Sequential in-text position.
    InText(u32),
    /// Footnote/endnote position.
    Note(NoteNumber),
}

impl ClusterNumber {
    /// The note number, when this is a note position.
    pub fn note(&self) -> Option<u32> {
        match self {
            ClusterNumber::Note(n) => Some(n.note()),
            ClusterNumber::InText(_) => None,
        }
    }
}

/// Ordered collection of citation clusters.
#[derive(Debug, Default)]
pub struct ClusterStore {
    clusters: Vec<Cluster>,
    order: Option<Vec<ClusterPosition>>,
}

impl ClusterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all content. Insertion order becomes the default document
    /// order; any explicit ordering is discarded.
    pub fn init_clusters(&mut self, clusters: Vec<Cluster>) -> Result<()> {
        validate_note_sequence(clusters.iter().map(|c| (c.id.as_str(), c.note)))?;
        self.clusters = clusters;
        self.order = None;
        Ok(())
    }

    /// Insert a cluster immediately before `before_id`, or append when
    /// `before_id` is absent or unresolved. An existing cluster with the
    /// same id is moved to the new position, identity preserved.
    pub fn insert_cluster(&mut self, cluster: Cluster, before_id: Option<&str>) -> Result<()> {
        let mut clusters = self.clusters.clone();
        clusters.retain(|c| c.id != cluster.id);

        let index = match before_id {
            Some(before) => match clusters.iter().position(|c| c.id == before) {
                Some(index) => index,
                None => {
                    debug!(before_id = before, "insert_cluster: before_id not found, appending");
                    clusters.len()
                }
            },
            None => clusters.len(),
        };
        clusters.insert(index, cluster);

        if self.order.is_none() {
            validate_note_sequence(clusters.iter().map(|c| (c.id.as_str(), c.note)))?;
        }
        self.clusters = clusters;
        Ok(())
    }

    /// Remove a cluster by id. No-op when absent.
    pub fn remove_cluster(&mut self, id: &str) {
        self.clusters.retain(|c| c.id != id);
    }

    /// Identity-preserving update of a cluster by id.
    pub fn replace_cluster(&mut self, cluster: Cluster) -> Result<()> {
        let Some(index) = self.clusters.iter().position(|c| c.id == cluster.id) else {
            return Err(DriverError::UnknownCluster(cluster.id));
        };

        let previous = std::mem::replace(&mut self.clusters[index], cluster);
        if self.order.is_none() {
            if let Err(err) =
                validate_note_sequence(self.clusters.iter().map(|c| (c.id.as_str(), c.note)))
            {
                self.clusters[index] = previous;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Assign explicit external note numbering, overriding insertion order.
    ///
    /// All-or-nothing: a descending or duplicate note position rejects the
    /// whole call, naming the offending ids, and the store is unchanged.
    /// Entries whose id is not in the store are skipped at render time.
    pub fn set_cluster_order(&mut self, positions: &[ClusterPosition]) -> Result<()> {
        validate_note_sequence(positions.iter().map(|p| (p.id.as_str(), p.note)))?;
        for position in positions {
            if !self.contains(&position.id) {
                debug!(id = %position.id, "set_cluster_order: unknown cluster id in ordering");
            }
        }
        self.order = Some(positions.to_vec());
        Ok(())
    }

    /// Whether a cluster with this id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.clusters.iter().any(|c| c.id == id)
    }

    /// Look up a cluster by id.
    pub fn get(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// The explicit ordering, if one is set.
    pub fn explicit_order(&self) -> Option<&[ClusterPosition]> {
        self.order.as_deref()
    }

    /// Number of stored clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Resolve effective document order: the explicit ordering when set,
    /// insertion order otherwise. Clusters named in the explicit ordering
    /// but missing from the store are skipped; stored clusters not named
    /// are not part of the document.
    pub fn document_order(&self) -> Vec<(&Cluster, ClusterNumber)> {
        let mut out = Vec::new();
        let mut intext = 1u32;

        match &self.order {
            Some(entries) => {
                for entry in entries {
                    let Some(cluster) = self.get(&entry.id) else {
                        continue;
                    };
                    let number = match entry.note {
                        Some(note) => ClusterNumber::Note(note),
                        None => {
                            let n = intext;
                            intext += 1;
                            ClusterNumber::InText(n)
                        }
                    };
                    out.push((cluster, number));
                }
            }
            None => {
                for cluster in &self.clusters {
                    let number = match cluster.note {
                        Some(note) => ClusterNumber::Note(note),
                        None => {
                            let n = intext;
                            intext += 1;
                            ClusterNumber::InText(n)
                        }
                    };
                    out.push((cluster, number));
                }
            }
        }

        out
    }
}

/// Check that note positions are strictly ascending, compared as
/// (note, index) pairs, across the note-bearing entries of a sequence.
///
/// Two clusters in one footnote must use explicit `[note, index]` pairs
/// with ascending indices; a repeated bare note number is a duplicate.
fn validate_note_sequence<'a>(
    entries: impl Iterator<Item = (&'a str, Option<NoteNumber>)>,
) -> Result<()> {
    let mut last: Option<(u32, u32)> = None;
    let mut offending = Vec::new();

    for (id, note) in entries {
        let Some(note) = note else { continue };
        let pair = note.as_pair();
        if let Some(last) = last {
            if pair <= last {
                offending.push(id.to_string());
            }
        }
        last = Some(pair);
    }

    if offending.is_empty() {
        Ok(())
    } else {
        Err(DriverError::NonMonotonicOrder { ids: offending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str) -> Cluster {
        Cluster {
            id: id.to_string(),
            cites: vec![Cite {
                id: "ref1".to_string(),
                ..Default::default()
            }],
            note: None,
        }
    }

    fn position(id: &str, note: u32) -> ClusterPosition {
        ClusterPosition {
            id: id.to_string(),
            note: Some(NoteNumber::Single(note)),
        }
    }

    #[test]
    fn test_note_number_serde() {
        let single: NoteNumber = serde_json::from_str("3").unwrap();
        assert_eq!(single, NoteNumber::Single(3));

        let multi: NoteNumber = serde_json::from_str("[3, 1]").unwrap();
        assert_eq!(multi, NoteNumber::Multi(3, 1));

        assert_eq!(serde_json::to_string(&NoteNumber::Single(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&NoteNumber::Multi(3, 1)).unwrap(),
            "[3,1]"
        );
    }

    #[test]
    fn test_insert_before_and_append() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a"), cluster("c")]).unwrap();
        store.insert_cluster(cluster("b"), Some("c")).unwrap();
        store.insert_cluster(cluster("d"), None).unwrap();
        // Unresolved before_id appends
        store.insert_cluster(cluster("e"), Some("zzz")).unwrap();

        let ids: Vec<_> = store
            .document_order()
            .iter()
            .map(|(c, _)| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_insert_existing_id_moves() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a"), cluster("b")]).unwrap();
        store.insert_cluster(cluster("b"), Some("a")).unwrap();

        let ids: Vec<_> = store
            .document_order()
            .iter()
            .map(|(c, _)| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a")]).unwrap();
        store.remove_cluster("missing");
        assert_eq!(store.len(), 1);
        store.remove_cluster("a");
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_unknown_fails() {
        let mut store = ClusterStore::new();
        let err = store.replace_cluster(cluster("ghost")).unwrap_err();
        assert!(matches!(err, DriverError::UnknownCluster(id) if id == "ghost"));
    }

    #[test]
    fn test_set_cluster_order_descending_rejected() {
        let mut store = ClusterStore::new();
        store
            .init_clusters(vec![cluster("a"), cluster("b"), cluster("c")])
            .unwrap();
        store
            .set_cluster_order(&[position("a", 1), position("b", 2)])
            .unwrap();

        let err = store
            .set_cluster_order(&[position("a", 1), position("b", 3), position("c", 2)])
            .unwrap_err();
        let DriverError::NonMonotonicOrder { ids } = err else {
            panic!("expected NonMonotonicOrder");
        };
        assert_eq!(ids, vec!["c".to_string()]);

        // All-or-nothing: previous ordering still in effect
        let order = store.explicit_order().unwrap();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_set_cluster_order_duplicate_rejected() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a"), cluster("b")]).unwrap();
        let err = store
            .set_cluster_order(&[position("a", 2), position("b", 2)])
            .unwrap_err();
        assert!(matches!(err, DriverError::NonMonotonicOrder { .. }));
        assert!(store.explicit_order().is_none());
    }

    #[test]
    fn test_same_note_via_multi_positions() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a"), cluster("b")]).unwrap();
        store
            .set_cluster_order(&[
                ClusterPosition {
                    id: "a".to_string(),
                    note: Some(NoteNumber::Multi(2, 0)),
                },
                ClusterPosition {
                    id: "b".to_string(),
                    note: Some(NoteNumber::Multi(2, 1)),
                },
            ])
            .unwrap();

        let order = store.document_order();
        assert_eq!(order[0].1.note(), Some(2));
        assert_eq!(order[1].1.note(), Some(2));
    }

    #[test]
    fn test_explicit_order_selects_document_members() {
        let mut store = ClusterStore::new();
        store
            .init_clusters(vec![cluster("a"), cluster("b"), cluster("c")])
            .unwrap();
        store
            .set_cluster_order(&[position("c", 1), position("a", 2)])
            .unwrap();

        let ids: Vec<_> = store
            .document_order()
            .iter()
            .map(|(c, _)| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_intext_entries_numbered_sequentially() {
        let mut store = ClusterStore::new();
        store.init_clusters(vec![cluster("a"), cluster("b")]).unwrap();
        let order = store.document_order();
        assert_eq!(order[0].1, ClusterNumber::InText(1));
        assert_eq!(order[1].1, ClusterNumber::InText(2));
    }

    #[test]
    fn test_init_clusters_validates_notes() {
        let mut store = ClusterStore::new();
        let mut a = cluster("a");
        a.note = Some(NoteNumber::Single(5));
        let mut b = cluster("b");
        b.note = Some(NoteNumber::Single(3));
        let err = store.init_clusters(vec![a, b]).unwrap_err();
        assert!(matches!(err, DriverError::NonMonotonicOrder { .. }));
        assert!(store.is_empty());
    }
}
