//! ES module import inlining.
//!
//! The target runtime has no module system, so every `import` statement is
//! replaced by a constant declaration bound to a minified self-invoking
//! expression that evaluates the imported module and returns an object of
//! the requested bindings.
//!
//! Two import forms are covered:
//!
//! ```text
//! import Name from './path.js';          // default import
//! import { a, b as c } from './path.js'; // named imports
//! ```
//!
//! Namespace, mixed default+named and bare side-effect imports are left
//! untouched. Import statements are located as AST nodes with byte spans;
//! replacement happens in reverse order of appearance so earlier offsets
//! stay valid.

use std::path::Path;

use anyhow::{Context, Result, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::{ImportDeclarationSpecifier, Statement};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::utils::exec::Cmd;

// ============================================================================
// Bundler capability
// ============================================================================

/// Black-box module bundler: entry source in, dependency-free text out.
///
/// Modeled as a trait so tests can substitute a fake without spawning
/// subprocesses.
pub trait Bundler {
    /// Bundle a synthetic entry module, resolving imports relative to
    /// `resolve_dir`, and return the bundled (minified, ESM) output.
    fn bundle(&self, entry: &str, resolve_dir: &Path) -> Result<String>;
}

/// esbuild CLI adapter: pipes the synthetic entry through stdin in
/// bundle + minify + esm mode, with the importing file's directory as the
/// working directory so relative specifiers resolve correctly.
pub struct EsbuildCli {
    command: Vec<String>,
}

impl EsbuildCli {
    pub fn new(command: &[String]) -> Self {
        Self {
            command: command.to_vec(),
        }
    }
}

impl Bundler for EsbuildCli {
    fn bundle(&self, entry: &str, resolve_dir: &Path) -> Result<String> {
        let output = Cmd::from_slice(&self.command)
            .args([
                "--bundle",
                "--minify",
                "--format=esm",
                "--target=es2020",
                "--loader=js",
                "--sourcefile=virtual-entry.js",
            ])
            .cwd(resolve_dir)
            .stdin(entry)
            .run()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ============================================================================
// Import statement collection
// ============================================================================

/// Bindings requested by one import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportBindings {
    /// `import Name from '...'`
    Default(String),
    /// `import { a, b as c } from '...'` as (imported, local) pairs
    Named(Vec<(String, String)>),
}

/// One covered import statement with its byte span in the source.
#[derive(Debug)]
struct ImportStatement {
    start: usize,
    end: usize,
    source: String,
    bindings: ImportBindings,
}

/// Locate every covered import statement in the source.
fn collect_imports(source: &str) -> Result<Vec<ImportStatement>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        bail!("JavaScript parse error: {}", messages.join("; "));
    }

    let mut imports = Vec::new();
    for stmt in &ret.program.body {
        let Statement::ImportDeclaration(import) = stmt else {
            continue;
        };
        // Bare side-effect import (`import 'x'`)
        let Some(specifiers) = &import.specifiers else {
            continue;
        };
        if specifiers.is_empty() {
            continue;
        }

        let mut default_local = None;
        let mut named = Vec::new();
        let mut covered = true;
        for specifier in specifiers {
            match specifier {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    default_local = Some(s.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    named.push((s.imported.name().to_string(), s.local.name.to_string()));
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => {
                    covered = false;
                }
            }
        }
        // Only the two covered forms are rewritten
        if !covered || (default_local.is_some() && !named.is_empty()) {
            continue;
        }

        let bindings = match default_local {
            Some(local) => ImportBindings::Default(local),
            None => ImportBindings::Named(named),
        };
        imports.push(ImportStatement {
            start: import.span.start as usize,
            end: import.span.end as usize,
            source: import.source.value.to_string(),
            bindings,
        });
    }
    Ok(imports)
}

// ============================================================================
// Inlining
// ============================================================================

/// Replace every covered import statement with a constant declaration bound
/// to a self-invoking expression producing the imported bindings.
///
/// A bundling failure aborts the whole build; there is no partial output.
pub fn inline_imports(source: &str, dir: &Path, bundler: &dyn Bundler) -> Result<String> {
    let imports = collect_imports(source)?;
    let mut code = source.to_string();

    // Reverse order keeps earlier byte offsets valid during replacement
    for import in imports.iter().rev() {
        let entry = synthetic_entry(&import.bindings, &import.source);
        let bundled = bundler
            .bundle(&entry, dir)
            .with_context(|| format!("Failed to bundle import '{}'", import.source))?;
        let iife = rewrite_to_iife(&bundled);

        let replacement = match &import.bindings {
            ImportBindings::Default(local) => {
                format!("const {local} = (function(r) {{ return r.default || r; }})({iife});")
            }
            ImportBindings::Named(pairs) => {
                let locals: Vec<&str> = pairs.iter().map(|(_, local)| local.as_str()).collect();
                format!("const {{ {} }} = {iife};", locals.join(", "))
            }
        };
        code.replace_range(import.start..import.end, &replacement);
    }
    Ok(code)
}

/// Build the one-line entry module re-exporting exactly the requested
/// bindings from the import target.
fn synthetic_entry(bindings: &ImportBindings, source: &str) -> String {
    match bindings {
        ImportBindings::Default(_) => {
            format!("export {{ default as default }} from '{source}';")
        }
        ImportBindings::Named(pairs) => {
            let specs: Vec<String> = pairs
                .iter()
                .map(|(imported, local)| {
                    if imported == local {
                        imported.clone()
                    } else {
                        format!("{imported} as {local}")
                    }
                })
                .collect();
            format!("export {{ {} }} from '{source}';", specs.join(", "))
        }
    }
}

/// Rewrite bundler output into an immediately invoked closure returning an
/// object of the exported bindings.
///
/// The bundler emits minified ESM whose final statement is the export
/// clause; that clause becomes the return object (`default` export keyed as
/// `default`, `as` aliases mapping external name to internal identifier).
fn rewrite_to_iife(bundled: &str) -> String {
    let mut code = bundled.trim().to_string();
    while code.ends_with(';') || code.ends_with('\n') {
        code.pop();
    }

    let Some(idx) = code.rfind("export") else {
        return format!("(() => {{ {code}; return {{}}; }})()");
    };
    let body = &code[..idx];
    let export_stmt = &code[idx..];

    let object = if export_stmt.contains("default") && !export_stmt.contains('{') {
        // `export default <expr>`
        let value = export_stmt
            .trim_start_matches("export")
            .trim()
            .trim_start_matches("default")
            .trim();
        format!("{{ default: {value} }}")
    } else {
        // `export { a, b as c }`
        let inner = export_stmt.trim_start_matches("export").trim();
        let inner = inner.strip_prefix('{').unwrap_or(inner);
        let inner = inner.strip_suffix('}').unwrap_or(inner).trim();
        let props: Vec<String> = inner
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| {
                let part = part.trim();
                match part.split_once(" as ") {
                    Some((internal, external)) => {
                        format!("{}: {}", external.trim(), internal.trim())
                    }
                    None => format!("{part}: {part}"),
                }
            })
            .collect();
        format!("{{ {} }}", props.join(", "))
    };

    let separator = if body.trim().is_empty() || body.trim_end().ends_with(';') {
        ""
    } else {
        ";"
    };
    format!("(() => {{ {body}{separator} return {object}; }})()")
}

// ============================================================================
// Tests
// ============================================================================
