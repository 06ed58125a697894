//! Completion.
//!
//! The completion prefix is recovered by walking left from the cursor
//! through identifier characters (which include `.` so module-qualified
//! names complete as a unit). Candidates come from four sources,
//! concatenated in a fixed order: reserved words, module names, the
//! host's extra identifiers, and the prelude's qualified bindings.

use merl_core::module::ModuleMap;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind,
};

/// Keywords of the surface language.
pub const RESERVED_WORDS: &[&str] = &[
    "assert", "else", "enum", "fun", "if", "in", "let", "match", "module", "open", "then", "with",
    "Some", "None",
];

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '?'
}

/// The identifier fragment ending at the cursor. `character` counts
/// UTF-16 units, as LSP positions do.
pub fn completion_prefix(line: &str, character: u32) -> String {
    let mut units = 0u32;
    let mut cursor_byte = line.len();
    for (i, c) in line.char_indices() {
        if units >= character {
            cursor_byte = i;
            break;
        }
        units += c.len_utf16() as u32;
    }

    let before = &line[..cursor_byte];
    let start = before
        .char_indices()
        .rev()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    before[start..].to_string()
}

/// Candidate sources for one completion request.
pub struct CompletionSources<'a> {
    pub prelude: &'a ModuleMap,
    pub extern_idents: Vec<String>,
}

/// Render one candidate, carrying the prefix the client filters against.
fn mk_completion_item(
    label: &str,
    kind: CompletionItemKind,
    detail: Option<String>,
    doc: Option<String>,
) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        detail,
        documentation: doc.map(|value| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            })
        }),
        filter_text: Some(label.to_string()),
        insert_text: Some(label.to_string()),
        ..Default::default()
    }
}

/// All candidates matching the prefix, in source order: reserved words,
/// module names, external identifiers, prelude bindings.
pub fn completions(prefix: &str, sources: &CompletionSources<'_>) -> Vec<CompletionItem> {
    let matches = |label: &str| prefix.is_empty() || label.starts_with(prefix);
    let mut items = Vec::new();

    for word in RESERVED_WORDS {
        if matches(word) {
            items.push(mk_completion_item(
                word,
                CompletionItemKind::KEYWORD,
                None,
                None,
            ));
        }
    }

    for name in sources.prelude.module_names() {
        if matches(name) {
            items.push(mk_completion_item(
                name,
                CompletionItemKind::MODULE,
                Some("module".to_string()),
                None,
            ));
        }
    }

    for ident in &sources.extern_idents {
        if matches(ident) {
            items.push(mk_completion_item(
                ident,
                CompletionItemKind::VARIABLE,
                Some("input".to_string()),
                None,
            ));
        }
    }

    for (name, entry) in sources.prelude.qualified_names() {
        if matches(&name) {
            let signature = entry.scheme.to_string();
            items.push(mk_completion_item(
                &name,
                CompletionItemKind::FUNCTION,
                Some(signature.clone()),
                Some(format!("```merl\n{} : {}\n```", name, signature)),
            ));
        }
    }

    items
}
