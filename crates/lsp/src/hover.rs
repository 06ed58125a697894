//! The hover index.
//!
//! Inference produces a list of (range, markup) pairs per successful
//! parse; they are stored keyed by `(uri, version)`. A hover request
//! intersects the cursor with the ranges of the document's current
//! version and answers with the smallest containing range.
//!
//! Entries for superseded versions are not purged: a request against an
//! old version simply misses, and the growth is bounded only by the
//! editing session. Hosts that need a bound can clear per-URI on close.

use crate::parse::HoverEntry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_lsp::lsp_types::{Position, Range, Url};

/// Hover entries per document version, behind a single cell. Only the
/// reactor writes; readers take a snapshot.
#[derive(Default)]
pub struct HoverIndex {
    cell: RwLock<HashMap<(Url, i32), Arc<Vec<HoverEntry>>>>,
}

impl HoverIndex {
    pub fn new() -> HoverIndex {
        HoverIndex::default()
    }

    /// Replace the entries stored for one document version.
    pub fn replace(&self, uri: Url, version: i32, entries: Vec<HoverEntry>) {
        if let Ok(mut map) = self.cell.write() {
            map.insert((uri, version), Arc::new(entries));
        }
    }

    /// Snapshot the entries for one document version.
    pub fn snapshot(&self, uri: &Url, version: i32) -> Option<Arc<Vec<HoverEntry>>> {
        self.cell
            .read()
            .ok()
            .and_then(|map| map.get(&(uri.clone(), version)).cloned())
    }

    /// Answer a hover query against one document version.
    pub fn query(&self, uri: &Url, version: i32, position: Position) -> Option<HoverEntry> {
        let entries = self.snapshot(uri, version)?;
        find_smallest(&entries, position).cloned()
    }

    /// Number of stored (uri, version) keys; used by tests and hosts
    /// observing index growth.
    pub fn len(&self) -> usize {
        self.cell.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn pos_le(a: Position, b: Position) -> bool {
    (a.line, a.character) <= (b.line, b.character)
}

fn contains_position(range: Range, position: Position) -> bool {
    pos_le(range.start, position) && pos_le(position, range.end)
}

/// Whether `outer` contains `inner` (non-strictly).
fn contains_range(outer: Range, inner: Range) -> bool {
    pos_le(outer.start, inner.start) && pos_le(inner.end, outer.end)
}

/// Among the entries whose range contains the cursor, pick the smallest
/// under containment order. The fold replaces the current best whenever it
/// contains the candidate, so of equal ranges the one appearing later in
/// the list wins.
pub fn find_smallest(entries: &[HoverEntry], position: Position) -> Option<&HoverEntry> {
    let mut best: Option<&HoverEntry> = None;
    for entry in entries {
        if !contains_position(entry.range, position) {
            continue;
        }
        best = match best {
            None => Some(entry),
            Some(current) if contains_range(current.range, entry.range) => Some(entry),
            Some(current) => Some(current),
        };
    }
    best
}
