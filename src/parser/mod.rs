//! C source code parser
//!
//! This module turns the token stream into typed declarations and statement
//! trees:
//! - [`stream`]: on-demand token supply from the lexer
//! - [`parse`]: the [`Parser`] itself, its errors, and the token helpers
//! - [`declarations`], [`statements`], [`expressions`]: the grammar
//! - [`typing`]: expression types and integer constant evaluation
//! - [`ast`]: statement and expression node definitions
//!
//! # Supported C Subset
//!
//! - Types: `char`, `int`, `float`, `void`, `const`, pointers, arrays,
//!   structs, typedefs, function types
//! - Statements: blocks, `if`/`else`, `while`, `do`/`while`, `for`,
//!   `return`, `break`, `continue`, expression statements
//! - Expressions: the full C operator set except the preprocessor
//! - No `switch`, `goto`, unions, enums, or variadic functions
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
pub mod declarations;
pub mod expressions;
pub mod parse;
pub mod statements;
pub mod stream;
pub mod typing;

pub use parse::{ParseError, Parser, TranslationUnit};
pub use stream::{TokenQueue, TokenSource, TokenStream};
