//! Export keyword stripping.
//!
//! Deployed backend code runs in a single flat global namespace, so module
//! export syntax must disappear while the declarations themselves stay. Only
//! the `export` prefix of `export function f…`, `export const/let/var …` and
//! `export class C…` is removed; re-exports and bare export lists have no
//! declaration to keep and are left alone (they never appear in processed
//! sources, whose imports were already inlined).

use anyhow::{Result, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::Statement;
use oxc::parser::Parser;
use oxc::span::{GetSpan, SourceType};

/// Remove the `export` keyword from exported declarations, keeping the
/// declarations intact.
pub fn strip_export_keywords(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        bail!("JavaScript parse error: {}", messages.join("; "));
    }

    // (start of `export`, start of the declaration it prefixes)
    let mut spans = Vec::new();
    for stmt in &ret.program.body {
        let Statement::ExportNamedDeclaration(export) = stmt else {
            continue;
        };
        // `export { a, b }` and `export { a } from '...'` carry no
        // declaration; nothing to keep, nothing to strip.
        let Some(declaration) = &export.declaration else {
            continue;
        };
        spans.push((export.span.start as usize, declaration.span().start as usize));
    }

    let mut code = source.to_string();
    for (export_start, decl_start) in spans.iter().rev() {
        code.replace_range(*export_start..*decl_start, "");
    }
    Ok(code)
}
