//! Lexical analysis
//!
//! Two push-driven stages sit between the normalized source and the parser:
//! - [`prelexer`]: code points → preprocessing tokens (finite-state machine)
//! - [`lexer`]: preprocessing tokens → classified [`Token`]s
//!
//! Each stage reports to a collaborator trait ([`PpTokenSink`], [`TokenSink`])
//! so the same machinery drives both the parser and the debug dumps.

pub mod lexer;
pub mod literals;
pub mod prelexer;
pub mod token;

pub use lexer::{Lexer, TokenSink};
pub use prelexer::{LexError, PpTokenSink, PreLexer};
pub use token::{Keyword, LiteralKind, Punctuator, SourceLocation, Token, TokenKind, TokenValue};
