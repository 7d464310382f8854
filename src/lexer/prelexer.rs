//! Pre-lexer: code points → preprocessing tokens
//!
//! An explicit finite-state machine over the normalized code point buffer.
//! Each call to [`PreLexer::step`] performs one transition and reports any
//! finished unit to a [`PpTokenSink`]. Comments are folded into whitespace,
//! literals are copied verbatim (escapes are only checked for shape), and
//! punctuators are matched longest-first against the fixed tables in
//! [`super::token`].
//!
//! All errors are fatal. Before one is returned the sink is flushed so that
//! any pending output is resolved first.

use super::token::{SourceLocation, PUNCTUATORS_1, PUNCTUATORS_2, PUNCTUATORS_3, PUNCTUATORS_4};
use crate::source::{CodePoint, END_OF_FILE};
use thiserror::Error;

/// Fatal pre-lexer error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Receiver of preprocessing tokens.
///
/// Implemented by the [`super::lexer::Lexer`] and by the pre-lexer dump.
pub trait PpTokenSink {
    fn whitespace(&mut self, width: usize);
    fn newline(&mut self);
    fn identifier(&mut self, text: &[CodePoint]);
    fn pp_number(&mut self, text: &str);
    fn character_literal(&mut self, text: &[CodePoint]);
    fn string_literal(&mut self, text: &[CodePoint]);
    fn punctuator(&mut self, text: &str);
    fn non_whitespace(&mut self, text: &[CodePoint]);
    fn end_of_file(&mut self);

    /// Called before a fatal error is reported and after end of file.
    fn flush(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Whitespace,
    LineComment,
    BlockComment,
    MatchingIdentifier,
    MatchingPpNumber,
    MatchingCharLiteral,
    MatchingStringLiteral,
    Finished,
}

const SIMPLE_ESCAPES: [char; 11] = ['\'', '"', '?', '\\', 'a', 'b', 'f', 'n', 'r', 't', 'v'];

fn is(cp: CodePoint, ch: char) -> bool {
    cp == ch as CodePoint
}

fn as_ascii(cp: CodePoint) -> Option<char> {
    u8::try_from(cp).ok().filter(u8::is_ascii).map(char::from)
}

fn is_whitespace(cp: CodePoint) -> bool {
    matches!(as_ascii(cp), Some(' ' | '\t' | '\r' | '\x0B' | '\x0C'))
}

fn is_digit(cp: CodePoint) -> bool {
    as_ascii(cp).is_some_and(|c| c.is_ascii_digit())
}

fn is_octal_digit(cp: CodePoint) -> bool {
    as_ascii(cp).is_some_and(|c| ('0'..='7').contains(&c))
}

fn is_hex_digit(cp: CodePoint) -> bool {
    as_ascii(cp).is_some_and(|c| c.is_ascii_hexdigit())
}

fn is_identifier_start(cp: CodePoint) -> bool {
    match as_ascii(cp) {
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => cp != END_OF_FILE,
    }
}

fn is_identifier_continue(cp: CodePoint) -> bool {
    is_identifier_start(cp) || is_digit(cp)
}

/// Finite-state pre-lexer over a normalized buffer
pub struct PreLexer {
    input: Vec<CodePoint>,
    position: usize,
    state: State,
    start: usize,
    start_location: SourceLocation,
    line: usize,
    column: usize,
    last_consumed: Option<CodePoint>,
}

impl PreLexer {
    /// Create a pre-lexer over a buffer produced by [`crate::source::normalize`].
    pub fn new(mut input: Vec<CodePoint>) -> Self {
        if input.last() != Some(&END_OF_FILE) {
            input.push(END_OF_FILE);
        }
        Self {
            input,
            position: 0,
            state: State::Start,
            start: 0,
            start_location: SourceLocation::default(),
            line: 1,
            column: 1,
            last_consumed: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Drive the machine to completion.
    pub fn run<S: PpTokenSink>(&mut self, sink: &mut S) -> Result<(), LexError> {
        while !self.is_finished() {
            self.step(sink)?;
        }
        Ok(())
    }

    /// Perform a single transition.
    pub fn step<S: PpTokenSink>(&mut self, sink: &mut S) -> Result<(), LexError> {
        match self.state {
            State::Start => self.start_state(sink),
            State::Whitespace => {
                self.whitespace_state(sink);
                Ok(())
            }
            State::LineComment => {
                self.line_comment_state(sink);
                Ok(())
            }
            State::BlockComment => self.block_comment_state(sink),
            State::MatchingIdentifier => {
                if is_identifier_continue(self.peek()) {
                    self.advance();
                } else {
                    sink.identifier(&self.input[self.start..self.position]);
                    self.state = State::Start;
                }
                Ok(())
            }
            State::MatchingPpNumber => {
                self.pp_number_state(sink);
                Ok(())
            }
            State::MatchingCharLiteral => self.literal_state(sink, '\''),
            State::MatchingStringLiteral => self.literal_state(sink, '"'),
            State::Finished => Ok(()),
        }
    }

    fn start_state<S: PpTokenSink>(&mut self, sink: &mut S) -> Result<(), LexError> {
        let ch = self.peek();

        if ch == END_OF_FILE {
            // Source that does not end in a newline still closes its last line.
            if self.last_consumed.is_some_and(|last| !is(last, '\n')) {
                sink.newline();
            }
            sink.end_of_file();
            sink.flush();
            self.state = State::Finished;
            return Ok(());
        }

        if is_whitespace(ch) || self.at_comment_start() {
            self.begin_unit();
            self.state = State::Whitespace;
            return Ok(());
        }

        if is(ch, '\n') {
            self.advance();
            sink.newline();
            return Ok(());
        }

        if is(ch, '\'') || is(ch, '"') {
            self.begin_unit();
            self.advance();
            self.state = if is(ch, '\'') {
                State::MatchingCharLiteral
            } else {
                State::MatchingStringLiteral
            };
            return Ok(());
        }

        if is_digit(ch) || (is(ch, '.') && is_digit(self.peek_ahead(1))) {
            self.begin_unit();
            self.advance();
            self.state = State::MatchingPpNumber;
            return Ok(());
        }

        if is_identifier_start(ch) {
            self.begin_unit();
            self.advance();
            self.state = State::MatchingIdentifier;
            return Ok(());
        }

        if let Some(text) = self.match_punctuator() {
            for _ in 0..text.len() {
                self.advance();
            }
            sink.punctuator(&text);
            return Ok(());
        }

        let position = self.position;
        self.advance();
        sink.non_whitespace(&self.input[position..position + 1]);
        Ok(())
    }

    fn whitespace_state<S: PpTokenSink>(&mut self, sink: &mut S) {
        let ch = self.peek();
        if is_whitespace(ch) {
            self.advance();
        } else if is(ch, '/') && is(self.peek_ahead(1), '/') {
            self.advance();
            self.advance();
            self.state = State::LineComment;
        } else if is(ch, '/') && is(self.peek_ahead(1), '*') {
            self.start_location = self.location();
            self.advance();
            self.advance();
            self.state = State::BlockComment;
        } else {
            self.emit_whitespace(sink);
            self.state = State::Start;
        }
    }

    fn line_comment_state<S: PpTokenSink>(&mut self, sink: &mut S) {
        let ch = self.peek();
        if ch == END_OF_FILE || is(ch, '\n') {
            // The newline itself is emitted from the start state.
            self.emit_whitespace(sink);
            self.state = State::Start;
        } else {
            self.advance();
        }
    }

    fn block_comment_state<S: PpTokenSink>(&mut self, sink: &mut S) -> Result<(), LexError> {
        let ch = self.peek();
        if ch == END_OF_FILE {
            return Err(self.fail(sink, "unterminated comment", self.start_location));
        }

        if is(ch, '*') && is(self.peek_ahead(1), '/') {
            self.advance();
            self.advance();
            self.state = State::Whitespace;
        } else if is(ch, '\n') {
            self.emit_whitespace(sink);
            self.advance();
            sink.newline();
            self.start = self.position;
        } else {
            self.advance();
        }
        Ok(())
    }

    fn pp_number_state<S: PpTokenSink>(&mut self, sink: &mut S) {
        let ch = self.peek();
        let sign_follows = is(self.peek_ahead(1), '+') || is(self.peek_ahead(1), '-');

        if (is(ch, 'e') || is(ch, 'E')) && sign_follows {
            self.advance();
            self.advance();
        } else if is_digit(ch) || is(ch, '.') || (as_ascii(ch).is_some() && is_identifier_continue(ch)) {
            self.advance();
        } else {
            let text: String = self.input[self.start..self.position]
                .iter()
                .filter_map(|&cp| as_ascii(cp))
                .collect();
            sink.pp_number(&text);
            self.state = State::Start;
        }
    }

    fn literal_state<S: PpTokenSink>(&mut self, sink: &mut S, quote: char) -> Result<(), LexError> {
        let kind = if quote == '\'' { "character" } else { "string" };
        let ch = self.peek();

        if ch == END_OF_FILE {
            let message = format!("unterminated {} literal", kind);
            return Err(self.fail(sink, message, self.start_location));
        }

        if is(ch, '\n') {
            let message = format!("newline in {} literal", kind);
            return Err(self.fail(sink, message, self.location()));
        }

        if is(ch, quote) {
            self.advance();
            let text = &self.input[self.start..self.position];
            if quote == '\'' {
                sink.character_literal(text);
            } else {
                sink.string_literal(text);
            }
            self.state = State::Start;
            return Ok(());
        }

        if is(ch, '\\') {
            return self.escape_sequence(sink, kind);
        }

        self.advance();
        Ok(())
    }

    /// Check the shape of an escape sequence and step over it.
    fn escape_sequence<S: PpTokenSink>(&mut self, sink: &mut S, kind: &str) -> Result<(), LexError> {
        let location = self.location();
        self.advance();
        let ch = self.peek();

        if ch == END_OF_FILE {
            let message = format!("unterminated {} literal", kind);
            return Err(self.fail(sink, message, self.start_location));
        }
        if is(ch, '\n') {
            let message = format!("newline in {} literal", kind);
            return Err(self.fail(sink, message, location));
        }

        if as_ascii(ch).is_some_and(|c| SIMPLE_ESCAPES.contains(&c)) {
            self.advance();
        } else if is_octal_digit(ch) {
            let mut digits = 0;
            while digits < 3 && is_octal_digit(self.peek()) {
                self.advance();
                digits += 1;
            }
        } else if is(ch, 'x') {
            self.advance();
            if !is_hex_digit(self.peek()) {
                return Err(self.fail(sink, "\\x used with no following hex digits", location));
            }
            while is_hex_digit(self.peek()) {
                self.advance();
            }
        } else {
            let shown = char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER);
            let message = format!("invalid escape sequence '\\{}'", shown);
            return Err(self.fail(sink, message, location));
        }
        Ok(())
    }

    fn match_punctuator(&self) -> Option<String> {
        let tables: [&[&str]; 4] = [&PUNCTUATORS_4, &PUNCTUATORS_3, &PUNCTUATORS_2, &PUNCTUATORS_1];
        for (table, width) in tables.iter().zip([4, 3, 2, 1]) {
            if let Some(window) = self.window(width) {
                if table.contains(&window.as_str()) {
                    return Some(window);
                }
            }
        }
        None
    }

    /// The next `width` code points as text, if they are all ASCII.
    fn window(&self, width: usize) -> Option<String> {
        (0..width).map(|offset| as_ascii(self.peek_ahead(offset))).collect()
    }

    fn at_comment_start(&self) -> bool {
        is(self.peek(), '/') && (is(self.peek_ahead(1), '/') || is(self.peek_ahead(1), '*'))
    }

    fn emit_whitespace<S: PpTokenSink>(&self, sink: &mut S) {
        let width = self.position - self.start;
        if width > 0 {
            sink.whitespace(width);
        }
    }

    fn fail<S: PpTokenSink>(
        &mut self,
        sink: &mut S,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> LexError {
        sink.flush();
        self.state = State::Finished;
        LexError::new(message, location)
    }

    fn begin_unit(&mut self) {
        self.start = self.position;
        self.start_location = self.location();
    }

    fn peek(&self) -> CodePoint {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, n: usize) -> CodePoint {
        self.input
            .get(self.position + n)
            .copied()
            .unwrap_or(END_OF_FILE)
    }

    fn advance(&mut self) {
        let ch = self.peek();
        if ch == END_OF_FILE {
            return;
        }
        self.position += 1;
        self.last_consumed = Some(ch);

        if is(ch, '\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}
