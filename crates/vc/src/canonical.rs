//! Canonical form for content addressing.
//!
//! Two scripts that differ only in comments, bracketing, module sugar, or
//! the names of lexically bound variables must hash identically. The
//! canonical pass strips the transparent wrappers and renames every
//! lexical binder to a positional name. Implicit parameters are left
//! untouched: they are dynamically scoped, so their names are semantics.

use merl_core::ast::{Expr, ExtIdent, Pat, TextChunk};
use std::collections::HashMap;

/// Rewrite an expression into its canonical form.
pub fn canonicalize(expr: &Expr) -> Expr {
    let mut counter = 0u32;
    let renames = HashMap::new();
    canon(expr, &renames, &mut counter)
}

fn fresh(counter: &mut u32) -> String {
    let name = format!("var${}", counter);
    *counter += 1;
    name
}

/// Rename a lexical identifier if it is bound in scope.
fn rename(ident: &ExtIdent, renames: &HashMap<String, String>) -> ExtIdent {
    match ident {
        ExtIdent::Var(name) => match renames.get(name) {
            Some(canonical) => ExtIdent::Var(canonical.clone()),
            None => ident.clone(),
        },
        // Dynamically scoped; never renamed
        ExtIdent::Implicit(_) => ident.clone(),
    }
}

fn canon(expr: &Expr, renames: &HashMap<String, String>, counter: &mut u32) -> Expr {
    match expr {
        // Transparent wrappers disappear entirely
        Expr::CommentAbove(_, inner)
        | Expr::CommentAfter(inner, _)
        | Expr::CommentBelow(inner, _)
        | Expr::Bracketed(inner)
        | Expr::RenameModule(_, _, inner)
        | Expr::OpenModule(_, inner) => canon(inner, renames, counter),

        Expr::Lit(_) | Expr::Empty | Expr::TypeRep(_) | Expr::Enum(_, _) => expr.clone(),

        Expr::Var(pinned, ident) => Expr::Var(*pinned, rename(ident, renames)),

        Expr::InterpolatedText(chunks) => Expr::InterpolatedText(
            chunks
                .iter()
                .map(|c| match c {
                    TextChunk::Str(s) => TextChunk::Str(s.clone()),
                    TextChunk::Expr(e) => TextChunk::Expr(canon(e, renames, counter)),
                })
                .collect(),
        ),

        Expr::Array(items) => {
            Expr::Array(items.iter().map(|e| canon(e, renames, counter)).collect())
        }

        Expr::ArrayComp {
            body,
            sources,
            cond,
        } => {
            let mut scope = renames.clone();
            let mut canon_sources = Vec::with_capacity(sources.len());
            for (name, src) in sources {
                // Each generator sees the binders of the ones before it
                let canon_src = canon(src, &scope, counter);
                let canonical = fresh(counter);
                scope.insert(name.clone(), canonical.clone());
                canon_sources.push((canonical, canon_src));
            }
            Expr::ArrayComp {
                body: Box::new(canon(body, &scope, counter)),
                sources: canon_sources,
                cond: cond.as_ref().map(|c| Box::new(canon(c, &scope, counter))),
            }
        }

        Expr::Op {
            lhs,
            pinned,
            name,
            rhs,
        } => Expr::Op {
            lhs: Box::new(canon(lhs, renames, counter)),
            pinned: *pinned,
            name: name.clone(),
            rhs: Box::new(canon(rhs, renames, counter)),
        },

        Expr::PreOp { pinned, name, expr } => Expr::PreOp {
            pinned: *pinned,
            name: name.clone(),
            expr: Box::new(canon(expr, renames, counter)),
        },

        Expr::App(f, a) => Expr::App(
            Box::new(canon(f, renames, counter)),
            Box::new(canon(a, renames, counter)),
        ),

        Expr::Lam(params, body) => {
            let mut scope = renames.clone();
            let params = params
                .iter()
                .map(|p| match p {
                    Some(ExtIdent::Var(name)) => {
                        let canonical = fresh(counter);
                        scope.insert(name.clone(), canonical.clone());
                        Some(ExtIdent::Var(canonical))
                    }
                    other => other.clone(),
                })
                .collect();
            Expr::Lam(params, Box::new(canon(body, &scope, counter)))
        }

        Expr::Let(ident, bound, body) => {
            let canon_bound = canon(bound, renames, counter);
            match ident {
                ExtIdent::Var(name) => {
                    let canonical = fresh(counter);
                    let mut scope = renames.clone();
                    scope.insert(name.clone(), canonical.clone());
                    Expr::Let(
                        ExtIdent::Var(canonical),
                        Box::new(canon_bound),
                        Box::new(canon(body, &scope, counter)),
                    )
                }
                ExtIdent::Implicit(_) => Expr::Let(
                    ident.clone(),
                    Box::new(canon_bound),
                    Box::new(canon(body, renames, counter)),
                ),
            }
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => Expr::If {
            cond: Box::new(canon(cond, renames, counter)),
            then_branch: Box::new(canon(then_branch, renames, counter)),
            else_branch: Box::new(canon(else_branch, renames, counter)),
        },

        Expr::Tuple(items) => {
            Expr::Tuple(items.iter().map(|e| canon(e, renames, counter)).collect())
        }

        Expr::One(inner) => Expr::One(Box::new(canon(inner, renames, counter))),

        Expr::Assert(cond, body) => Expr::Assert(
            Box::new(canon(cond, renames, counter)),
            Box::new(canon(body, renames, counter)),
        ),

        Expr::Case(scrutinee, arms) => Expr::Case(
            Box::new(canon(scrutinee, renames, counter)),
            arms.iter()
                .map(|(pat, body)| {
                    let mut scope = renames.clone();
                    let pat = canon_pat(pat, &mut scope, counter);
                    (pat, canon(body, &scope, counter))
                })
                .collect(),
        ),
    }
}

fn canon_pat(pat: &Pat, scope: &mut HashMap<String, String>, counter: &mut u32) -> Pat {
    match pat {
        Pat::Var(Some(name)) => {
            let canonical = fresh(counter);
            scope.insert(name.clone(), canonical.clone());
            Pat::Var(Some(canonical))
        }
        Pat::Var(None) | Pat::Lit(_) | Pat::Enum(_, _) | Pat::Empty => pat.clone(),
        Pat::One(inner) => Pat::One(Box::new(canon_pat(inner, scope, counter))),
        Pat::Tuple(items) => Pat::Tuple(
            items
                .iter()
                .map(|p| canon_pat(p, scope, counter))
                .collect(),
        ),
    }
}
