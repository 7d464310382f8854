//! Token supply for the parser
//!
//! The parser pulls tokens one at a time through [`TokenSource`]. A
//! [`TokenStream`] satisfies each request by stepping the pre-lexer until the
//! lexer has pushed at least one token into its [`TokenQueue`]. Nothing is
//! lexed ahead of demand except the string literals the lexer holds back for
//! concatenation.

use crate::lexer::lexer::{Lexer, TokenSink};
use crate::lexer::prelexer::{LexError, PreLexer};
use crate::lexer::token::{Keyword, LiteralKind, Punctuator, SourceLocation, Token, TokenKind, TokenValue};
use crate::source::normalize;
use std::collections::VecDeque;

/// Pull interface between the lexer and the parser
pub trait TokenSource {
    /// The next token. Once the end of file is reached every further call
    /// returns an end-of-file token.
    fn next_token(&mut self) -> Result<Token, LexError>;
}

/// FIFO of finished tokens
#[derive(Debug, Default)]
pub struct TokenQueue {
    tokens: VecDeque<Token>,
    last_location: SourceLocation,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) {
        self.last_location = token.location;
        self.tokens.push_back(token);
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }
}

impl TokenSink for TokenQueue {
    fn invalid(&mut self, text: &str, location: SourceLocation) {
        self.push(Token::new(TokenKind::Invalid, text, location));
    }

    fn keyword(&mut self, text: &str, keyword: Keyword, location: SourceLocation) {
        self.push(Token::new(TokenKind::Keyword(keyword), text, location));
    }

    fn punctuator(&mut self, text: &str, punctuator: Punctuator, location: SourceLocation) {
        self.push(Token::new(TokenKind::Punctuator(punctuator), text, location));
    }

    fn identifier(&mut self, text: &str, location: SourceLocation) {
        self.push(Token::new(TokenKind::Identifier, text, location));
    }

    fn literal(&mut self, text: &str, kind: LiteralKind, bytes: &[u8], location: SourceLocation) {
        let token = Token::new(TokenKind::Literal(kind), text, location)
            .with_value(TokenValue::from_raw(kind, bytes));
        self.push(token);
    }

    fn literal_array(
        &mut self,
        text: &str,
        _count: usize,
        _kind: LiteralKind,
        bytes: &[u8],
        location: SourceLocation,
    ) {
        let token = Token::new(TokenKind::Literal(LiteralKind::String), text, location)
            .with_value(TokenValue::Bytes(bytes.to_vec()));
        self.push(token);
    }

    fn end_of_file(&mut self, location: SourceLocation) {
        self.push(Token::eof(location));
    }
}

/// A pre-lexed queue can feed the parser directly.
impl TokenSource for TokenQueue {
    fn next_token(&mut self) -> Result<Token, LexError> {
        Ok(self.pop().unwrap_or_else(|| Token::eof(self.last_location)))
    }
}

/// On-demand pipeline: normalizer → pre-lexer → lexer
pub struct TokenStream {
    prelexer: PreLexer,
    lexer: Lexer<TokenQueue>,
    eof: Option<Token>,
}

impl TokenStream {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            prelexer: PreLexer::new(normalize(bytes)),
            lexer: Lexer::new(TokenQueue::new()),
            eof: None,
        }
    }
}

impl TokenSource for TokenStream {
    fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            if let Some(token) = self.lexer.sink_mut().pop() {
                if token.is_eof() {
                    self.eof = Some(token.clone());
                }
                return Ok(token);
            }

            if self.prelexer.is_finished() {
                return Ok(self
                    .eof
                    .clone()
                    .unwrap_or_else(|| Token::eof(SourceLocation::default())));
            }

            self.prelexer.step(&mut self.lexer)?;
        }
    }
}
