//! JavaScript source processing.
//!
//! Everything the backend pipeline does to a `.js` file lives here:
//! - `imports` - inline ES module imports into self-contained expressions
//! - `exports` - strip module export keywords for the flat global namespace
//! - `minify` - minification that keeps entry-point names intact
//!
//! All source rewriting is structural: files are parsed with the oxc parser
//! and edited by AST node spans, never by pattern-matching the raw text.

pub mod exports;
pub mod imports;
pub mod minify;
