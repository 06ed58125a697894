//! The parse/infer boundary.
//!
//! Parsing and inference live outside this crate; the LSP core only knows
//! the contract: given the prelude, the host's extra identifiers, the
//! source text, and an input-type validator, the collaborator produces
//! either diagnostics or an elaborated script with hover ranges. The
//! elaborated expression is opaque here; only diagnostics and hover
//! ranges are consumed.

use merl_core::ast::Expr;
use merl_core::module::ModuleMap;
use merl_core::types::{Type, TypeScheme};
use std::sync::Arc;
use std::time::SystemTime;
use tower_lsp::lsp_types::{DiagnosticSeverity, MarkupContent, Range};
use uuid::Uuid;

/// Identity of one parse+infer invocation, handed to the host hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseAttempt {
    pub id: Uuid,
    pub started_at: SystemTime,
}

impl ParseAttempt {
    /// A fresh identity; one per invocation.
    pub fn begin() -> ParseAttempt {
        ParseAttempt {
            id: Uuid::new_v4(),
            started_at: SystemTime::now(),
        }
    }
}

/// One hover region produced by inference: a source range plus the markup
/// shown when the cursor lands inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverEntry {
    pub range: Range,
    pub contents: MarkupContent,
}

/// A diagnostic in the collaborator's vocabulary, converted to the wire
/// form by the diagnostics module.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub range: Range,
    pub message: String,
    pub severity: DiagnosticSeverity,
}

/// A successfully elaborated script.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub expr: Expr,
    pub scheme: TypeScheme,
    pub hovers: Vec<HoverEntry>,
}

pub type ParseResult = Result<ParseOutput, Vec<ParseDiagnostic>>;

/// Host hook: identifiers to concatenate with the script body as formal
/// parameters. `None` entries are positional placeholders and are skipped.
pub type GetIdents = Arc<dyn Fn() -> Vec<Option<String>> + Send + Sync>;

/// Host hook: reject input types the current host context disallows.
pub type ValidateInput = Arc<dyn Fn(&Type) -> Result<(), String> + Send + Sync>;

/// The external parse+infer collaborator.
pub type ParseAndInfer =
    Arc<dyn Fn(&ModuleMap, &[String], &str, &ValidateInput) -> ParseResult + Send + Sync>;

/// Host hook invoked before each parse attempt (metrics, tracing).
pub type BeforeParse = Arc<dyn Fn(&ParseAttempt) + Send + Sync>;

/// Host hook invoked after each parse attempt; may transform the result
/// (e.g. rewrite or suppress diagnostics).
pub type AfterParse = Arc<dyn Fn(&ParseAttempt, ParseResult) -> ParseResult + Send + Sync>;

/// Everything the document pipeline needs to turn source text into
/// diagnostics and hover ranges.
#[derive(Clone)]
pub struct Pipeline {
    pub prelude: ModuleMap,
    pub get_idents: GetIdents,
    pub validate_input: ValidateInput,
    pub parse_and_infer: ParseAndInfer,
    pub before_parse: BeforeParse,
    pub after_parse: AfterParse,
}

impl Pipeline {
    /// A pipeline with no extra identifiers, an accept-everything
    /// validator, and no-op hooks.
    pub fn new(prelude: ModuleMap, parse_and_infer: ParseAndInfer) -> Pipeline {
        Pipeline {
            prelude,
            get_idents: Arc::new(Vec::new),
            validate_input: Arc::new(|_: &Type| Ok(())),
            parse_and_infer,
            before_parse: Arc::new(|_: &ParseAttempt| {}),
            after_parse: Arc::new(|_: &ParseAttempt, result: ParseResult| result),
        }
    }

    /// Run one parse+infer attempt, bracketed by the host hooks.
    pub fn run(&self, source: &str) -> ParseResult {
        let attempt = ParseAttempt::begin();
        (self.before_parse)(&attempt);
        let idents: Vec<String> = (self.get_idents)().into_iter().flatten().collect();
        let result = (self.parse_and_infer)(&self.prelude, &idents, source, &self.validate_input);
        (self.after_parse)(&attempt, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merl_core::ast::Lit;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trivial_output() -> ParseOutput {
        ParseOutput {
            expr: Expr::Lit(Lit::Int(0)),
            scheme: TypeScheme::mono(Type::Int),
            hovers: Vec::new(),
        }
    }

    #[test]
    fn test_hooks_bracket_each_attempt_with_fresh_ids() {
        let before_ids = Arc::new(Mutex::new(Vec::new()));
        let after_count = Arc::new(AtomicUsize::new(0));

        let mut pipeline = Pipeline::new(
            ModuleMap::new(),
            Arc::new(|_: &ModuleMap, _: &[String], _: &str, _: &ValidateInput| Ok(trivial_output())),
        );
        let ids = before_ids.clone();
        pipeline.before_parse = Arc::new(move |attempt: &ParseAttempt| {
            ids.lock().unwrap().push(attempt.id);
        });
        let count = after_count.clone();
        pipeline.after_parse = Arc::new(move |_: &ParseAttempt, result: ParseResult| {
            count.fetch_add(1, Ordering::SeqCst);
            result
        });

        assert!(pipeline.run("1").is_ok());
        assert!(pipeline.run("2").is_ok());

        let ids = before_ids.lock().unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(after_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_after_parse_may_transform_the_result() {
        let mut pipeline = Pipeline::new(
            ModuleMap::new(),
            Arc::new(|_: &ModuleMap, _: &[String], _: &str, _: &ValidateInput| Ok(trivial_output())),
        );
        pipeline.after_parse = Arc::new(|_: &ParseAttempt, _: ParseResult| Err(Vec::new()));
        assert!(pipeline.run("anything").is_err());
    }

    #[test]
    fn test_idents_are_flattened_before_the_parser_sees_them() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_parser = seen.clone();
        let mut pipeline = Pipeline::new(
            ModuleMap::new(),
            Arc::new(move |_: &ModuleMap, idents: &[String], _: &str, _: &ValidateInput| {
                *seen_in_parser.lock().unwrap() = idents.to_vec();
                Ok(trivial_output())
            }),
        );
        pipeline.get_idents =
            Arc::new(|| vec![Some("input0".to_string()), None, Some("input2".to_string())]);

        pipeline.run("x").unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["input0".to_string(), "input2".to_string()]
        );
    }

    #[test]
    fn test_validator_is_handed_through() {
        let mut pipeline = Pipeline::new(
            ModuleMap::new(),
            Arc::new(|_: &ModuleMap, _: &[String], _: &str, validate: &ValidateInput| {
                // A collaborator checking an input type against the host
                match validate(&Type::Time) {
                    Ok(()) => Ok(trivial_output()),
                    Err(msg) => Err(vec![ParseDiagnostic {
                        range: Range::default(),
                        message: msg,
                        severity: DiagnosticSeverity::ERROR,
                    }]),
                }
            }),
        );
        pipeline.validate_input = Arc::new(|ty: &Type| match ty {
            Type::Time => Err("time inputs are not allowed here".to_string()),
            _ => Ok(()),
        });

        let diags = pipeline.run("x").unwrap_err();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "time inputs are not allowed here");
    }
}
