//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, token helpers, and the translation-unit entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, token push-back, helper methods
//! - `declarations`: declaration specifiers, declarators, structs, functions
//! - `statements`: statements and loop bookkeeping
//! - `expressions`: expressions with precedence climbing
//! - `typing`: expression types and integer constant evaluation
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! Tokens are pulled on demand from a [`TokenSource`]. Lookahead is done by
//! reading tokens and pushing them back onto an explicit stack; there is no
//! limit on how many tokens may be pushed back.

use crate::lexer::prelexer::LexError;
use crate::lexer::token::{Keyword, Punctuator, SourceLocation, Token, TokenKind};
use crate::parser::ast::LoopId;
use crate::parser::stream::{TokenSource, TokenStream};
use crate::symbols::scope::{Scope, ScopeStack, Variable};
use crate::symbols::types::{TypeRef, TypeSymbol};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// How deep expressions, statements, declarators, and struct bodies may nest
/// in total before parsing stops.
pub const MAX_NESTING: usize = 128;

/// Parser error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{location}: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Lex(err) => &err.message,
            ParseError::Syntax { message, .. } => message,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            ParseError::Lex(err) => err.location,
            ParseError::Syntax { location, .. } => *location,
        }
    }
}

/// The result of parsing one source file
#[derive(Debug)]
pub struct TranslationUnit {
    /// Built-in types
    pub internal: Scope,
    /// File-scope types, variables, and functions
    pub global: Scope,
}

impl TranslationUnit {
    pub fn variable(&self, name: &str) -> Option<Rc<Variable>> {
        self.global.lookup_variable(name)
    }

    pub fn function(&self, name: &str) -> Option<Rc<Variable>> {
        self.global.lookup_function(name)
    }

    pub fn type_named(&self, name: &str) -> Option<TypeRef> {
        self.global.lookup_type(name)
    }
}

/// Shared handles for the fundamental types
#[derive(Debug, Clone)]
pub(crate) struct Builtins {
    pub char_type: TypeRef,
    pub int_type: TypeRef,
    pub float_type: TypeRef,
    pub void_type: TypeRef,
}

impl Builtins {
    fn new() -> Self {
        Self {
            char_type: Rc::new(TypeSymbol::Char),
            int_type: Rc::new(TypeSymbol::Int),
            float_type: Rc::new(TypeSymbol::Float),
            void_type: Rc::new(TypeSymbol::Void),
        }
    }
}

/// Recursive descent parser for the C subset
pub struct Parser {
    source: Box<dyn TokenSource>,
    pushed_back: Vec<Token>,
    pub(crate) scopes: ScopeStack,
    /// Loops enclosing the statement being parsed, innermost last
    pub(crate) loops: Vec<LoopId>,
    next_loop: usize,
    anonymous_structs: usize,
    /// Return type of the function whose body is being parsed
    pub(crate) return_type: Option<TypeRef>,
    pub(crate) builtins: Builtins,
    /// Every function declared so far, by name, wherever it was declared
    pub(crate) linkage: FxHashMap<String, Rc<Variable>>,
    depth: usize,
}

impl Parser {
    /// Parser over raw source bytes.
    pub fn new(bytes: &[u8]) -> Self {
        Self::from_source(Box::new(TokenStream::new(bytes)))
    }

    /// Parser over any token supply.
    pub fn from_source(source: Box<dyn TokenSource>) -> Self {
        let builtins = Builtins::new();
        let mut scopes = ScopeStack::new();

        let internal = scopes.internal_mut();
        internal.add_type("char", builtins.char_type.clone());
        internal.add_type("int", builtins.int_type.clone());
        internal.add_type("float", builtins.float_type.clone());
        internal.add_type("void", builtins.void_type.clone());

        Self {
            source,
            pushed_back: Vec::new(),
            scopes,
            loops: Vec::new(),
            next_loop: 0,
            anonymous_structs: 0,
            return_type: None,
            builtins,
            linkage: FxHashMap::default(),
            depth: 0,
        }
    }

    /// Parse the entire translation unit (top-level declarations)
    pub fn parse_translation_unit(mut self) -> Result<TranslationUnit, ParseError> {
        let mut declarations = 0;
        while !self.peek()?.is_eof() {
            self.parse_external_declaration()?;
            declarations += 1;
        }
        debug!(declarations, "parsed translation unit");

        let (internal, global) = self.scopes.finish();
        Ok(TranslationUnit { internal, global })
    }

    // ===== Token supply =====

    /// Take the next token, from the push-back stack first.
    pub(crate) fn next_token(&mut self) -> Result<Token, ParseError> {
        let token = match self.pushed_back.pop() {
            Some(token) => token,
            None => self.source.next_token()?,
        };

        if token.kind == TokenKind::Invalid {
            return Err(ParseError::syntax(
                format!("invalid token '{}'", token.text),
                token.location,
            ));
        }

        Ok(token)
    }

    /// Return a token so the next call to `next_token` yields it again.
    pub(crate) fn push_back(&mut self, token: Token) {
        self.pushed_back.push(token);
    }

    pub(crate) fn peek(&mut self) -> Result<Token, ParseError> {
        let token = self.next_token()?;
        self.push_back(token.clone());
        Ok(token)
    }

    /// The token after the next one.
    pub(crate) fn peek_second(&mut self) -> Result<Token, ParseError> {
        let first = self.next_token()?;
        let second = self.next_token()?;
        self.push_back(second.clone());
        self.push_back(first);
        Ok(second)
    }

    // ===== Helper methods =====

    /// Run `parse` one nesting level deeper, failing once [`MAX_NESTING`]
    /// levels are open.
    pub(crate) fn nested<T>(
        &mut self,
        what: &str,
        location: SourceLocation,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::syntax(format!("{} nested too deeply", what), location));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn check_punct(&mut self, punctuator: Punctuator) -> Result<bool, ParseError> {
        Ok(self.peek()?.is_punctuator(punctuator))
    }

    /// Consume the next token if it is `punctuator`.
    pub(crate) fn accept_punct(&mut self, punctuator: Punctuator) -> Result<Option<Token>, ParseError> {
        let token = self.next_token()?;
        if token.is_punctuator(punctuator) {
            Ok(Some(token))
        } else {
            self.push_back(token);
            Ok(None)
        }
    }

    pub(crate) fn match_punct(&mut self, punctuator: Punctuator) -> Result<bool, ParseError> {
        Ok(self.accept_punct(punctuator)?.is_some())
    }

    pub(crate) fn accept_keyword(&mut self, keyword: Keyword) -> Result<Option<Token>, ParseError> {
        let token = self.next_token()?;
        if token.is_keyword(keyword) {
            Ok(Some(token))
        } else {
            self.push_back(token);
            Ok(None)
        }
    }

    pub(crate) fn match_keyword(&mut self, keyword: Keyword) -> Result<bool, ParseError> {
        Ok(self.accept_keyword(keyword)?.is_some())
    }

    pub(crate) fn expect_punct(
        &mut self,
        punctuator: Punctuator,
        ctx: &str,
    ) -> Result<Token, ParseError> {
        let token = self.next_token()?;
        if token.is_punctuator(punctuator) {
            Ok(token)
        } else {
            Err(ParseError::syntax(
                format!("Expected '{}' {}, found {}", punctuator.as_str(), ctx, token),
                token.location,
            ))
        }
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<Token, ParseError> {
        self.expect_punct(Punctuator::Semicolon, ctx)
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<Token, ParseError> {
        self.expect_punct(Punctuator::LParen, ctx)
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<Token, ParseError> {
        self.expect_punct(Punctuator::RParen, ctx)
    }

    pub(crate) fn expect_identifier(&mut self, ctx: &str) -> Result<Token, ParseError> {
        let token = self.next_token()?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(ParseError::syntax(
                format!("Expected identifier {}, found {}", ctx, token),
                token.location,
            ))
        }
    }

    // ===== Bookkeeping =====

    pub(crate) fn new_loop_id(&mut self) -> LoopId {
        let id = LoopId(self.next_loop);
        self.next_loop += 1;
        id
    }

    pub(crate) fn anonymous_tag(&mut self) -> String {
        let tag = format!("__anonymous_{}", self.anonymous_structs);
        self.anonymous_structs += 1;
        tag
    }
}
