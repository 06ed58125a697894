//! In-memory view of the client's open documents.
//!
//! Sync is incremental: the client sends ranged edits in UTF-16 positions
//! and the VFS splices them into the stored text. A change event without a
//! range replaces the whole document.

use std::collections::HashMap;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

/// One open document at its latest synced version.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub version: i32,
}

#[derive(Debug, Default)]
pub struct Vfs {
    docs: HashMap<Url, Document>,
}

impl Vfs {
    pub fn new() -> Vfs {
        Vfs::default()
    }

    pub fn open(&mut self, uri: Url, version: i32, text: String) {
        self.docs.insert(uri, Document { text, version });
    }

    pub fn close(&mut self, uri: &Url) {
        self.docs.remove(uri);
    }

    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.docs.get(uri)
    }

    /// Apply the edits of one `didChange` notification and return the
    /// resulting document, or `None` for an unknown URI.
    pub fn apply_changes(
        &mut self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Option<Document> {
        let doc = self.docs.get_mut(uri)?;
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = position_to_byte(&doc.text, range.start);
                    let end = position_to_byte(&doc.text, range.end);
                    let (start, end) = (start.min(end), start.max(end));
                    doc.text.replace_range(start..end, &change.text);
                }
                None => doc.text = change.text,
            }
        }
        doc.version = version;
        Some(doc.clone())
    }
}

/// Resolve an LSP position (zero-based line, UTF-16 column) to a byte
/// offset, clamping past-the-end positions to the line or document end.
pub fn position_to_byte(text: &str, position: Position) -> usize {
    let mut line_start = 0usize;
    if position.line > 0 {
        let mut lines_seen = 0u32;
        let mut found = false;
        for (i, c) in text.char_indices() {
            if c == '\n' {
                lines_seen += 1;
                if lines_seen == position.line {
                    line_start = i + 1;
                    found = true;
                    break;
                }
            }
        }
        if !found {
            return text.len();
        }
    }

    let mut units = 0u32;
    for (i, c) in text[line_start..].char_indices() {
        if c == '\n' || units >= position.character {
            return line_start + i;
        }
        units += c.len_utf16() as u32;
    }
    text.len()
}

/// The text of one line, for completion-prefix scanning.
pub fn line_at(text: &str, line: u32) -> Option<&str> {
    text.lines().nth(line as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Range;

    fn uri() -> Url {
        Url::parse("file:///tmp/test.merl").unwrap()
    }

    fn change(sl: u32, sc: u32, el: u32, ec: u32, text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range {
                start: Position::new(sl, sc),
                end: Position::new(el, ec),
            }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_incremental_edit_within_a_line() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "let x = 1 in x".to_string());
        let doc = vfs
            .apply_changes(&uri(), 1, vec![change(0, 8, 0, 9, "42")])
            .unwrap();
        assert_eq!(doc.text, "let x = 42 in x");
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_incremental_edit_across_lines() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "one\ntwo\nthree".to_string());
        let doc = vfs
            .apply_changes(&uri(), 1, vec![change(0, 3, 2, 0, " ")])
            .unwrap();
        assert_eq!(doc.text, "one three");
    }

    #[test]
    fn test_insertion_at_a_point() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "ab\ncd".to_string());
        let doc = vfs
            .apply_changes(&uri(), 1, vec![change(1, 1, 1, 1, "X")])
            .unwrap();
        assert_eq!(doc.text, "ab\ncXd");
    }

    #[test]
    fn test_full_replacement_when_no_range() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "old".to_string());
        let doc = vfs
            .apply_changes(
                &uri(),
                2,
                vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "entirely new".to_string(),
                }],
            )
            .unwrap();
        assert_eq!(doc.text, "entirely new");
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn test_utf16_columns_with_multibyte_text() {
        // 'é' is one UTF-16 unit but two bytes; '𝄞' is two UTF-16 units
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "é𝄞x".to_string());
        // Replace 'x' (after 1 + 2 = 3 UTF-16 units)
        let doc = vfs
            .apply_changes(&uri(), 1, vec![change(0, 3, 0, 4, "y")])
            .unwrap();
        assert_eq!(doc.text, "é𝄞y");
    }

    #[test]
    fn test_positions_clamp_to_line_and_document_end() {
        let text = "ab\ncd";
        assert_eq!(position_to_byte(text, Position::new(0, 99)), 2);
        assert_eq!(position_to_byte(text, Position::new(1, 99)), 5);
        assert_eq!(position_to_byte(text, Position::new(9, 0)), 5);
    }

    #[test]
    fn test_sequential_changes_in_one_notification() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "abc".to_string());
        let doc = vfs
            .apply_changes(
                &uri(),
                1,
                vec![change(0, 0, 0, 1, "X"), change(0, 2, 0, 3, "Z")],
            )
            .unwrap();
        assert_eq!(doc.text, "XbZ");
    }

    #[test]
    fn test_close_forgets_the_document() {
        let mut vfs = Vfs::new();
        vfs.open(uri(), 0, "text".to_string());
        vfs.close(&uri());
        assert!(vfs.get(&uri()).is_none());
        assert!(vfs.apply_changes(&uri(), 1, Vec::new()).is_none());
    }
}
