//! Lexer: preprocessing tokens → tokens
//!
//! [`Lexer`] is itself a [`PpTokenSink`]: the pre-lexer pushes units into it
//! and it forwards fully classified tokens to a [`TokenSink`]. Keywords and
//! punctuators are looked up by exact text, pp-numbers and character literals
//! are decoded on arrival.
//!
//! String literals are held back. Adjacent literals, separated only by
//! whitespace or newlines, are joined into one literal array which is emitted
//! when any other unit arrives, at end of file, or on flush.

use super::literals::{decode_char, decode_number, decode_string, CharLiteral, NumberLiteral};
use super::prelexer::PpTokenSink;
use super::token::{Keyword, LiteralKind, Punctuator, SourceLocation};
use crate::source::{to_string, CodePoint};
use tracing::trace;

/// Receiver of classified tokens.
///
/// Implemented by the parser's token queue and by the token dump.
pub trait TokenSink {
    fn invalid(&mut self, text: &str, location: SourceLocation);
    fn keyword(&mut self, text: &str, keyword: Keyword, location: SourceLocation);
    fn punctuator(&mut self, text: &str, punctuator: Punctuator, location: SourceLocation);
    fn identifier(&mut self, text: &str, location: SourceLocation);

    /// A scalar literal. `bytes` is the little-endian encoding of its value.
    fn literal(&mut self, text: &str, kind: LiteralKind, bytes: &[u8], location: SourceLocation);

    /// A literal array of `count` elements; `bytes` omits the terminator.
    fn literal_array(
        &mut self,
        text: &str,
        count: usize,
        kind: LiteralKind,
        bytes: &[u8],
        location: SourceLocation,
    );

    fn end_of_file(&mut self, location: SourceLocation);

    fn flush(&mut self) {}
}

/// A decoded string literal waiting for its neighbours
#[derive(Debug)]
struct PendingString {
    text: String,
    bytes: Vec<u8>,
    location: SourceLocation,
}

/// Token classifier feeding a [`TokenSink`]
pub struct Lexer<S: TokenSink> {
    sink: S,
    line: usize,
    column: usize,
    pending: Vec<PendingString>,
}

impl<S: TokenSink> Lexer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            line: 1,
            column: 1,
            pending: Vec::new(),
        }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    /// Move past a unit of `width` code points.
    fn advance(&mut self, width: usize) {
        self.column += width;
    }

    /// Emit any held-back string literals as one literal array.
    fn flush_strings(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let pieces = std::mem::take(&mut self.pending);
        let location = pieces[0].location;
        let text = pieces
            .iter()
            .map(|piece| piece.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let bytes: Vec<u8> = pieces.into_iter().flat_map(|piece| piece.bytes).collect();

        trace!(%location, length = bytes.len(), "string literal");
        self.sink
            .literal_array(&text, bytes.len() + 1, LiteralKind::String, &bytes, location);
    }
}

impl<S: TokenSink> PpTokenSink for Lexer<S> {
    fn whitespace(&mut self, width: usize) {
        self.advance(width);
    }

    fn newline(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn identifier(&mut self, text: &[CodePoint]) {
        self.flush_strings();
        let location = self.location();
        let text = to_string(text);

        match Keyword::from_text(&text) {
            Some(keyword) => self.sink.keyword(&text, keyword, location),
            None => self.sink.identifier(&text, location),
        }
        self.advance(text.chars().count());
    }

    fn pp_number(&mut self, text: &str) {
        self.flush_strings();
        let location = self.location();

        match decode_number(text) {
            Ok(NumberLiteral::Int(value)) => {
                self.sink
                    .literal(text, LiteralKind::Int, &value.to_le_bytes(), location)
            }
            Ok(NumberLiteral::Float(value)) => {
                self.sink
                    .literal(text, LiteralKind::Float, &value.to_le_bytes(), location)
            }
            Err(reason) => {
                trace!(%location, %reason, "invalid number");
                self.sink.invalid(text, location);
            }
        }
        self.advance(text.chars().count());
    }

    fn character_literal(&mut self, text: &[CodePoint]) {
        self.flush_strings();
        let location = self.location();
        let shown = to_string(text);

        match decode_char(text) {
            Ok(CharLiteral::Char(value)) => {
                self.sink.literal(&shown, LiteralKind::Char, &[value], location)
            }
            Ok(CharLiteral::Int(value)) => {
                self.sink
                    .literal(&shown, LiteralKind::Int, &value.to_le_bytes(), location)
            }
            Err(reason) => {
                trace!(%location, %reason, "invalid character literal");
                self.sink.invalid(&shown, location);
            }
        }
        self.advance(text.len());
    }

    fn string_literal(&mut self, text: &[CodePoint]) {
        let location = self.location();
        let shown = to_string(text);

        match decode_string(text) {
            Ok(bytes) => self.pending.push(PendingString {
                text: shown,
                bytes,
                location,
            }),
            Err(reason) => {
                self.flush_strings();
                trace!(%location, %reason, "invalid string literal");
                self.sink.invalid(&shown, location);
            }
        }
        self.advance(text.len());
    }

    fn punctuator(&mut self, text: &str) {
        self.flush_strings();
        let location = self.location();

        match Punctuator::from_text(text) {
            Some(punctuator) => self.sink.punctuator(text, punctuator, location),
            None => self.sink.invalid(text, location),
        }
        self.advance(text.len());
    }

    fn non_whitespace(&mut self, text: &[CodePoint]) {
        self.flush_strings();
        let location = self.location();
        self.sink.invalid(&to_string(text), location);
        self.advance(text.len());
    }

    fn end_of_file(&mut self) {
        self.flush_strings();
        let location = self.location();
        self.sink.end_of_file(location);
    }

    fn flush(&mut self) {
        self.flush_strings();
        self.sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::prelexer::PreLexer;
    use crate::source::normalize;

    #[derive(Default)]
    struct Collector {
        tokens: Vec<String>,
    }

    impl TokenSink for Collector {
        fn invalid(&mut self, text: &str, location: SourceLocation) {
            self.tokens.push(format!("{} invalid {}", location, text));
        }
        fn keyword(&mut self, text: &str, keyword: Keyword, location: SourceLocation) {
            self.tokens.push(format!("{} keyword {:?} {}", location, keyword, text));
        }
        fn punctuator(&mut self, text: &str, punctuator: Punctuator, location: SourceLocation) {
            self.tokens
                .push(format!("{} punctuator {:?} {}", location, punctuator, text));
        }
        fn identifier(&mut self, text: &str, location: SourceLocation) {
            self.tokens.push(format!("{} identifier {}", location, text));
        }
        fn literal(&mut self, text: &str, kind: LiteralKind, bytes: &[u8], location: SourceLocation) {
            self.tokens
                .push(format!("{} literal {:?} {} {:?}", location, kind, text, bytes));
        }
        fn literal_array(
            &mut self,
            text: &str,
            count: usize,
            _kind: LiteralKind,
            bytes: &[u8],
            location: SourceLocation,
        ) {
            self.tokens.push(format!(
                "{} array {} {} {}",
                location,
                count,
                text,
                String::from_utf8_lossy(bytes)
            ));
        }
        fn end_of_file(&mut self, location: SourceLocation) {
            self.tokens.push(format!("{} eof", location));
        }
    }

    fn lex(source: &str) -> Vec<String> {
        let mut lexer = Lexer::new(Collector::default());
        PreLexer::new(normalize(source.as_bytes()))
            .run(&mut lexer)
            .unwrap();
        lexer.into_sink().tokens
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            lex("int value;"),
            vec![
                "1:1 keyword Int int",
                "1:5 identifier value",
                "1:10 punctuator Semicolon ;",
                "2:1 eof",
            ]
        );
    }

    #[test]
    fn test_string_concatenation() {
        let tokens = lex("\"ab\" \"cd\";");
        assert_eq!(tokens[0], "1:1 array 5 \"ab\" \"cd\" abcd");
        assert_eq!(tokens[1], "1:10 punctuator Semicolon ;");
    }

    #[test]
    fn test_concatenation_across_lines_and_comments() {
        let tokens = lex("\"a\" /* x */\n  \"b\"");
        assert_eq!(tokens[0], "1:1 array 3 \"a\" \"b\" ab");
        assert_eq!(tokens[1], "3:1 eof");
    }

    #[test]
    fn test_strings_flush_before_other_tokens() {
        let tokens = lex("\"a\" x \"b\"");
        assert_eq!(tokens[0], "1:1 array 2 \"a\" a");
        assert_eq!(tokens[1], "1:5 identifier x");
        assert_eq!(tokens[2], "1:7 array 2 \"b\" b");
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = lex("0x1A 3.5");
        assert_eq!(tokens[0], "1:1 literal Int 0x1A [26, 0, 0, 0]");
        assert_eq!(
            tokens[1],
            format!("1:6 literal Float 3.5 {:?}", 3.5f64.to_le_bytes())
        );
    }

    #[test]
    fn test_invalid_literals() {
        assert_eq!(lex("99999999999999")[0], "1:1 invalid 99999999999999");
        assert_eq!(lex("''")[0], "1:1 invalid ''");
        assert_eq!(lex("'ab'")[0], "1:1 invalid 'ab'");
        assert_eq!(lex("a $")[1], "1:3 invalid $");
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(lex("'a'")[0], "1:1 literal Char 'a' [97]");
        assert_eq!(lex(r"'\n'")[0], "1:1 literal Char '\\n' [10]");
        assert_eq!(lex("'é'")[0], "1:1 literal Int 'é' [233, 0, 0, 0]");
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = lex("a\n  b  c\n");
        assert_eq!(tokens[0], "1:1 identifier a");
        assert_eq!(tokens[1], "2:3 identifier b");
        assert_eq!(tokens[2], "2:6 identifier c");
        assert_eq!(tokens[3], "3:1 eof");
    }

    #[test]
    fn test_digraph_keeps_source_text() {
        assert_eq!(lex("<:")[0], "1:1 punctuator LBracket <:");
    }
}
