//! Token definitions shared by the lexer, the parser, and the dumps
//!
//! A [`Token`] is a fully classified lexical unit: its [`TokenKind`], the
//! source text it was produced from, where it starts, and its decoded
//! [`TokenValue`].

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// C keywords. All of C89 is recognized; the parser accepts a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Int,
    Long,
    Register,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
}

const KEYWORDS: [(&str, Keyword); 32] = [
    ("auto", Keyword::Auto),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("char", Keyword::Char),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("do", Keyword::Do),
    ("double", Keyword::Double),
    ("else", Keyword::Else),
    ("enum", Keyword::Enum),
    ("extern", Keyword::Extern),
    ("float", Keyword::Float),
    ("for", Keyword::For),
    ("goto", Keyword::Goto),
    ("if", Keyword::If),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("register", Keyword::Register),
    ("return", Keyword::Return),
    ("short", Keyword::Short),
    ("signed", Keyword::Signed),
    ("sizeof", Keyword::Sizeof),
    ("static", Keyword::Static),
    ("struct", Keyword::Struct),
    ("switch", Keyword::Switch),
    ("typedef", Keyword::Typedef),
    ("union", Keyword::Union),
    ("unsigned", Keyword::Unsigned),
    ("void", Keyword::Void),
    ("volatile", Keyword::Volatile),
    ("while", Keyword::While),
];

impl Keyword {
    /// Look up a keyword by its exact spelling.
    pub fn from_text(text: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == text)
            .map(|&(_, keyword)| keyword)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|&(spelling, _)| spelling)
            .unwrap_or("")
    }
}

/// Punctuators. Digraph spellings map onto the kind of their primary spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punctuator {
    LBracket,     // [
    RBracket,     // ]
    LParen,       // (
    RParen,       // )
    LBrace,       // {
    RBrace,       // }
    Dot,          // .
    Arrow,        // ->
    PlusPlus,     // ++
    MinusMinus,   // --
    Amp,          // &
    Star,         // *
    Plus,         // +
    Minus,        // -
    Tilde,        // ~
    Bang,         // !
    Slash,        // /
    Percent,      // %
    LtLt,         // <<
    GtGt,         // >>
    Lt,           // <
    Gt,           // >
    Le,           // <=
    Ge,           // >=
    EqEq,         // ==
    NotEq,        // !=
    Caret,        // ^
    Pipe,         // |
    AndAnd,       // &&
    OrOr,         // ||
    Question,     // ?
    Colon,        // :
    Semicolon,    // ;
    Ellipsis,     // ...
    Eq,           // =
    StarEq,       // *=
    SlashEq,      // /=
    PercentEq,    // %=
    PlusEq,       // +=
    MinusEq,      // -=
    LtLtEq,       // <<=
    GtGtEq,       // >>=
    AmpEq,        // &=
    CaretEq,      // ^=
    PipeEq,       // |=
    Comma,        // ,
    Hash,         // #
    HashHash,     // ##
}

/// Punctuator spellings grouped by length, longest first. The pre-lexer
/// tries each window size in this order and the first hit wins.
pub const PUNCTUATORS_4: [&str; 1] = ["%:%:"];
pub const PUNCTUATORS_3: [&str; 3] = ["<<=", ">>=", "..."];
pub const PUNCTUATORS_2: [&str; 25] = [
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=", "/=", "%=", "+=", "-=",
    "&=", "^=", "|=", "##", "<:", ":>", "<%", "%>", "%:",
];
pub const PUNCTUATORS_1: [&str; 25] = [
    "[", "]", "(", ")", "{", "}", ".", "&", "*", "+", "-", "~", "!", "/", "%", "<", ">", "^", "|",
    "?", ":", ";", "=", ",", "#",
];

impl Punctuator {
    /// Look up a punctuator by its spelling, digraphs included.
    pub fn from_text(text: &str) -> Option<Punctuator> {
        use Punctuator::*;
        let punctuator = match text {
            "[" | "<:" => LBracket,
            "]" | ":>" => RBracket,
            "(" => LParen,
            ")" => RParen,
            "{" | "<%" => LBrace,
            "}" | "%>" => RBrace,
            "." => Dot,
            "->" => Arrow,
            "++" => PlusPlus,
            "--" => MinusMinus,
            "&" => Amp,
            "*" => Star,
            "+" => Plus,
            "-" => Minus,
            "~" => Tilde,
            "!" => Bang,
            "/" => Slash,
            "%" => Percent,
            "<<" => LtLt,
            ">>" => GtGt,
            "<" => Lt,
            ">" => Gt,
            "<=" => Le,
            ">=" => Ge,
            "==" => EqEq,
            "!=" => NotEq,
            "^" => Caret,
            "|" => Pipe,
            "&&" => AndAnd,
            "||" => OrOr,
            "?" => Question,
            ":" => Colon,
            ";" => Semicolon,
            "..." => Ellipsis,
            "=" => Eq,
            "*=" => StarEq,
            "/=" => SlashEq,
            "%=" => PercentEq,
            "+=" => PlusEq,
            "-=" => MinusEq,
            "<<=" => LtLtEq,
            ">>=" => GtGtEq,
            "&=" => AmpEq,
            "^=" => CaretEq,
            "|=" => PipeEq,
            "," => Comma,
            "#" | "%:" => Hash,
            "##" | "%:%:" => HashHash,
            _ => return None,
        };
        Some(punctuator)
    }

    /// The primary spelling.
    pub fn as_str(self) -> &'static str {
        use Punctuator::*;
        match self {
            LBracket => "[",
            RBracket => "]",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Dot => ".",
            Arrow => "->",
            PlusPlus => "++",
            MinusMinus => "--",
            Amp => "&",
            Star => "*",
            Plus => "+",
            Minus => "-",
            Tilde => "~",
            Bang => "!",
            Slash => "/",
            Percent => "%",
            LtLt => "<<",
            GtGt => ">>",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            EqEq => "==",
            NotEq => "!=",
            Caret => "^",
            Pipe => "|",
            AndAnd => "&&",
            OrOr => "||",
            Question => "?",
            Colon => ":",
            Semicolon => ";",
            Ellipsis => "...",
            Eq => "=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            PlusEq => "+=",
            MinusEq => "-=",
            LtLtEq => "<<=",
            GtGtEq => ">>=",
            AmpEq => "&=",
            CaretEq => "^=",
            PipeEq => "|=",
            Comma => ",",
            Hash => "#",
            HashHash => "##",
        }
    }
}

/// The fundamental type of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Char,
    Int,
    Float,
    String,
}

impl LiteralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LiteralKind::Char => "char",
            LiteralKind::Int => "int",
            LiteralKind::Float => "float",
            LiteralKind::String => "char",
        }
    }
}

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Punctuator(Punctuator),
    Identifier,
    Literal(LiteralKind),
    Invalid,
    Eof,
}

/// Decoded value of a token
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
    #[default]
    None,
    Integer(i32),
    Float(f64),
    CodePoint(u32),
    Bytes(Vec<u8>),
}

impl TokenValue {
    /// Rebuild a value from the raw little-endian bytes the lexer hands to
    /// its sink.
    pub fn from_raw(kind: LiteralKind, bytes: &[u8]) -> TokenValue {
        match kind {
            LiteralKind::Char => bytes
                .first()
                .map(|&b| TokenValue::CodePoint(u32::from(b)))
                .unwrap_or_default(),
            LiteralKind::Int => <[u8; 4]>::try_from(bytes)
                .map(|raw| TokenValue::Integer(i32::from_le_bytes(raw)))
                .unwrap_or_default(),
            LiteralKind::Float => <[u8; 8]>::try_from(bytes)
                .map(|raw| TokenValue::Float(f64::from_le_bytes(raw)))
                .unwrap_or_default(),
            LiteralKind::String => TokenValue::Bytes(bytes.to_vec()),
        }
    }
}

/// A classified token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
    pub value: TokenValue,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            value: TokenValue::None,
        }
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = value;
        self
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, "", location)
    }

    pub fn is_punctuator(&self, punctuator: Punctuator) -> bool {
        self.kind == TokenKind::Punctuator(punctuator)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Keyword(_) | TokenKind::Punctuator(_) => write!(f, "'{}'", self.text),
            TokenKind::Identifier => write!(f, "identifier '{}'", self.text),
            TokenKind::Literal(LiteralKind::String) => write!(f, "string literal {}", self.text),
            TokenKind::Literal(kind) => write!(f, "{} literal {}", kind.as_str(), self.text),
            TokenKind::Invalid => write!(f, "invalid token '{}'", self.text),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Keyword::from_text("while"), Some(Keyword::While));
        assert_eq!(Keyword::from_text("While"), None);
        assert_eq!(Keyword::Typedef.as_str(), "typedef");
    }

    #[test]
    fn test_every_table_entry_is_a_punctuator() {
        let tables = PUNCTUATORS_4
            .iter()
            .chain(PUNCTUATORS_3.iter())
            .chain(PUNCTUATORS_2.iter())
            .chain(PUNCTUATORS_1.iter());
        for text in tables {
            assert!(Punctuator::from_text(text).is_some(), "missing {}", text);
        }
    }

    #[test]
    fn test_digraphs_share_kinds() {
        assert_eq!(Punctuator::from_text("<:"), Some(Punctuator::LBracket));
        assert_eq!(Punctuator::from_text("%>"), Some(Punctuator::RBrace));
        assert_eq!(Punctuator::from_text("%:%:"), Some(Punctuator::HashHash));
    }

    #[test]
    fn test_value_from_raw() {
        assert_eq!(
            TokenValue::from_raw(LiteralKind::Int, &42i32.to_le_bytes()),
            TokenValue::Integer(42)
        );
        assert_eq!(
            TokenValue::from_raw(LiteralKind::Char, &[0x61]),
            TokenValue::CodePoint(0x61)
        );
        assert_eq!(
            TokenValue::from_raw(LiteralKind::Float, &2.5f64.to_le_bytes()),
            TokenValue::Float(2.5)
        );
    }

    #[test]
    fn test_token_display() {
        let loc = SourceLocation::new(1, 1);
        assert_eq!(
            Token::new(TokenKind::Identifier, "x", loc).to_string(),
            "identifier 'x'"
        );
        assert_eq!(Token::eof(loc).to_string(), "end of file");
    }
}
