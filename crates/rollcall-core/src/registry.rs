//! Known-face registry and the roster-driven registry builder.

use std::fmt::Display;

use crate::link;
use crate::types::{Embedding, RosterRow};

/// A reference identity: name plus the embedding of its reference photo.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub name: String,
    pub embedding: Embedding,
}

/// In-memory mapping from name to reference embedding.
///
/// Insertion-ordered and name-unique: inserting an existing name replaces
/// the embedding in place, keeping the original position. The matcher
/// iterates this order, so position stability is part of the matching
/// contract. Built once per run, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct KnownFaceRegistry {
    entries: Vec<KnownFace>,
}

impl KnownFaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by name (last write wins, position retained).
    pub fn insert(&mut self, name: String, embedding: Embedding) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.embedding = embedding,
            None => self.entries.push(KnownFace { name, embedding }),
        }
    }

    /// Entries in insertion order, for the matcher.
    pub fn entries(&self) -> &[KnownFace] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome counters for one registry build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub loaded: usize,
    pub skipped_incomplete: usize,
    pub skipped_bad_link: usize,
    pub skipped_fetch_failed: usize,
    pub skipped_no_face: usize,
}

impl BuildReport {
    /// Total rows dropped, across all reasons.
    pub fn skipped(&self) -> usize {
        self.skipped_incomplete
            + self.skipped_bad_link
            + self.skipped_fetch_failed
            + self.skipped_no_face
    }
}

/// Build a registry from roster rows, in input order.
///
/// `fetch` resolves a file id to raw image bytes; `embed` turns bytes into
/// zero or more face embeddings. Rows with a blank name or link, an
/// unparseable link, a failed fetch, or no embeddable face are skipped with
/// a log record — a bad row never aborts the build. When a reference photo
/// yields several faces, the first embedding wins. Returns whatever subset
/// succeeded; an empty registry is a valid result and the caller decides
/// whether that is fatal.
pub fn build_registry<F, E, FE, EE>(
    rows: &[RosterRow],
    mut fetch: F,
    mut embed: E,
) -> (KnownFaceRegistry, BuildReport)
where
    F: FnMut(&str) -> Result<Vec<u8>, FE>,
    E: FnMut(&[u8]) -> Result<Vec<Embedding>, EE>,
    FE: Display,
    EE: Display,
{
    let mut registry = KnownFaceRegistry::new();
    let mut report = BuildReport::default();

    for (index, row) in rows.iter().enumerate() {
        let name = row.name.trim();
        let image_link = row.image_link.trim();

        if name.is_empty() || image_link.is_empty() {
            tracing::debug!(row = index, "skipping row with blank name or link");
            report.skipped_incomplete += 1;
            continue;
        }

        let Some(file_id) = link::extract_file_id(image_link) else {
            tracing::warn!(row = index, name, link = image_link, "no file id in link");
            report.skipped_bad_link += 1;
            continue;
        };

        let bytes = match fetch(file_id) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(row = index, name, file_id, error = %err, "fetch failed");
                report.skipped_fetch_failed += 1;
                continue;
            }
        };

        let embeddings = match embed(&bytes) {
            Ok(embeddings) => embeddings,
            Err(err) => {
                tracing::warn!(row = index, name, error = %err, "embedding failed");
                report.skipped_no_face += 1;
                continue;
            }
        };

        let Some(embedding) = embeddings.into_iter().next() else {
            tracing::warn!(row = index, name, "no face in reference photo");
            report.skipped_no_face += 1;
            continue;
        };

        registry.insert(name.to_string(), embedding);
        report.loaded += 1;
    }

    (registry, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_A: &str = "https://drive.google.com/file/d/AAAAAAAAAAAAAAAAAAAAAAAAA/view";
    const LINK_B: &str = "https://drive.google.com/file/d/BBBBBBBBBBBBBBBBBBBBBBBBB/view";
    const LINK_C: &str = "https://drive.google.com/open?id=CCCCCCCCCCCCCCCCCCCCCCCCC";

    fn row(name: &str, link: &str) -> RosterRow {
        RosterRow {
            name: name.into(),
            image_link: link.into(),
            ..Default::default()
        }
    }

    fn embedding(v: f32) -> Embedding {
        Embedding { values: vec![v] }
    }

    /// Fetch stub: the returned "bytes" are the file id itself.
    fn fetch_ok(id: &str) -> Result<Vec<u8>, String> {
        Ok(id.as_bytes().to_vec())
    }

    /// Embed stub: one embedding whose value encodes the first byte.
    fn embed_one(bytes: &[u8]) -> Result<Vec<Embedding>, String> {
        Ok(vec![embedding(bytes[0] as f32)])
    }

    #[test]
    fn test_build_loads_valid_rows_in_order() {
        let rows = vec![row("Alice", LINK_A), row("Bob", LINK_B)];
        let (registry, report) = build_registry(&rows, fetch_ok, embed_one);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entries()[0].name, "Alice");
        assert_eq!(registry.entries()[1].name, "Bob");
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn test_duplicate_name_last_write_wins_position_kept() {
        let rows = vec![
            row("Alice", LINK_A),
            row("Bob", LINK_B),
            row("Alice", LINK_C),
        ];
        let (registry, report) = build_registry(&rows, fetch_ok, embed_one);

        assert_eq!(registry.len(), 2);
        // Alice keeps her first position but carries the LAST row's value.
        assert_eq!(registry.entries()[0].name, "Alice");
        assert_eq!(registry.entries()[0].embedding.values[0], b'C' as f32);
        assert_eq!(registry.entries()[1].name, "Bob");
        assert_eq!(report.loaded, 3);
    }

    #[test]
    fn test_blank_link_row_is_skipped() {
        let rows = vec![row("Alice", LINK_A), row("Bob", ""), row("Carol", LINK_C)];
        let (registry, report) = build_registry(&rows, fetch_ok, embed_one);

        assert_eq!(registry.len(), 2);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped_incomplete, 1);
    }

    #[test]
    fn test_blank_name_after_trim_is_skipped() {
        let rows = vec![row("   ", LINK_A)];
        let (registry, report) = build_registry(&rows, fetch_ok, embed_one);
        assert!(registry.is_empty());
        assert_eq!(report.skipped_incomplete, 1);
    }

    #[test]
    fn test_unparseable_link_is_skipped() {
        let rows = vec![row("Alice", "https://example.com/alice.jpg")];
        let (registry, report) = build_registry(&rows, fetch_ok, embed_one);
        assert!(registry.is_empty());
        assert_eq!(report.skipped_bad_link, 1);
    }

    #[test]
    fn test_fetch_failure_does_not_abort_build() {
        let rows = vec![row("Alice", LINK_A), row("Bob", LINK_B)];
        let (registry, report) = build_registry(
            &rows,
            |id: &str| {
                if id.starts_with('A') {
                    Err("permission denied".to_string())
                } else {
                    Ok(id.as_bytes().to_vec())
                }
            },
            embed_one,
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries()[0].name, "Bob");
        assert_eq!(report.skipped_fetch_failed, 1);
    }

    #[test]
    fn test_zero_embeddings_skips_row() {
        let rows = vec![row("Alice", LINK_A)];
        let (registry, report) =
            build_registry(&rows, fetch_ok, |_: &[u8]| Ok::<_, String>(vec![]));
        assert!(registry.is_empty());
        assert_eq!(report.skipped_no_face, 1);
    }

    #[test]
    fn test_first_embedding_wins_with_multiple_faces() {
        let rows = vec![row("Alice", LINK_A)];
        let (registry, _) = build_registry(&rows, fetch_ok, |_: &[u8]| {
            Ok::<_, String>(vec![embedding(1.0), embedding(2.0)])
        });
        assert_eq!(registry.entries()[0].embedding.values[0], 1.0);
    }

    #[test]
    fn test_empty_roster_yields_empty_registry() {
        let (registry, report) = build_registry(&[], fetch_ok, embed_one);
        assert!(registry.is_empty());
        assert_eq!(report.loaded, 0);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn test_registry_insert_replaces_in_place() {
        let mut registry = KnownFaceRegistry::new();
        registry.insert("a".into(), embedding(1.0));
        registry.insert("b".into(), embedding(2.0));
        registry.insert("a".into(), embedding(3.0));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entries()[0].name, "a");
        assert_eq!(registry.entries()[0].embedding.values[0], 3.0);
    }
}
