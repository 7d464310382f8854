//! # Introduction
//!
//! `cfront` is the front end of a compiler for a subset of C. It turns raw
//! source bytes into typed symbol tables and statement trees, reporting the
//! first fault it finds with its line and column.
//!
//! ## Pipeline
//!
//! ```text
//! bytes → normalize → pre-lexer → lexer → parser → scopes + AST
//! ```
//!
//! 1. [`source`]: UTF-8 decoding, trigraph replacement, line splicing.
//! 2. [`lexer`]: the pre-lexer state machine and the token classifier. Both
//!    push their output into a sink trait so the dumps can share them.
//! 3. [`parser`]: recursive descent over an on-demand token stream, with
//!    scope tracking and expression typing.
//! 4. [`symbols`]: type symbols, scopes, and the scope stack.
//! 5. [`dump`]: the textual formats printed by the `compiler` binary.
//!
//! ## Supported C subset
//!
//! Types: `char`, `int`, `float`, `void`, `const`, pointers, arrays, structs,
//! typedefs, function types.
//! Control flow: `if/else`, `while`, `do-while`, `for`, `break`, `continue`,
//! `return`.
//! No preprocessor directives are interpreted.

pub mod dump;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod symbols;

pub use parser::{ParseError, Parser, TranslationUnit};

/// Parse a whole source file.
pub fn compile(bytes: &[u8]) -> Result<TranslationUnit, ParseError> {
    Parser::new(bytes).parse_translation_unit()
}
