//! JavaScript minification that keeps entry-point names intact.
//!
//! The deployment runtime invokes top-level functions by name (`doGet`,
//! trigger handlers, anything called from HTML templates), so those names
//! must survive mangling. Sources are parsed in script mode, where top-level
//! function and `var` declarations bind globals the mangler will not rename.
//!
//! Minification degrades, never fails: any parse error, or a minified result
//! that lost a reserved name, falls back to the original text.

use anyhow::Result;
use oxc::allocator::Allocator;
use oxc::ast::ast::{Statement, VariableDeclarationKind};
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use regex::Regex;

use crate::log;

/// Collect the top-level names that must survive minification: function
/// declarations and `var` bindings at the top level of the program.
pub fn reserved_names(source: &str) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("JavaScript parse error: {}", messages.join("; "));
    }

    let mut names = Vec::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.push(id.name.to_string());
                }
            }
            Statement::VariableDeclaration(decl)
                if decl.kind == VariableDeclarationKind::Var =>
            {
                // Simple `var name = ...` bindings; destructured globals are
                // not an entry-point convention
                for declarator in &decl.declarations {
                    if let Some(ident) = declarator.id.get_binding_identifier() {
                        names.push(ident.name.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    Ok(names)
}

/// Minify JavaScript source code, preserving top-level entry-point names.
///
/// Returns `None` when the source does not parse or when the minified
/// output no longer mentions a reserved name.
pub fn minify_js(source: &str) -> Option<String> {
    let reserved = reserved_names(source).ok()?;

    let allocator = Allocator::default();
    // Script mode: top-level declarations are globals the mangler keeps
    let source_type = SourceType::script();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    for name in &reserved {
        if !mentions_name(&code, name) {
            return None;
        }
    }
    Some(code)
}

/// Minify if possible; on failure log a warning and keep the original.
pub fn minify_or_keep(source: &str, label: &str) -> String {
    match minify_js(source) {
        Some(code) => code,
        None => {
            log!("warn"; "Could not minify {label}, keeping original source");
            source.to_string()
        }
    }
}

/// Whether `code` contains `name` as a whole identifier.
fn mentions_name(code: &str, name: &str) -> bool {
    // The name is escaped, so the pattern always builds; a build failure
    // here must never masquerade as "name absent"
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(name))).unwrap();
    re.is_match(code)
}
