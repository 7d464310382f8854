//! Textual dumps of each pipeline stage
//!
//! These back the `--pp-tokens`, `--tokens`, and `--symbols` flags of the
//! binary and the golden comparisons in the integration tests. Every line is
//! newline-terminated and the spacing is fixed.
//!
//! - [`PpTokenDump`]: `<kind> <length> <text>` per preprocessing token
//! - [`TokenDump`]: `<line>-<column>: <category> <subcategory> <text>` per
//!   token, with the raw bytes of literals appended in hex
//! - [`dump_symbols`]: one block per scope, nested scopes after their owner

use crate::lexer::lexer::{Lexer, TokenSink};
use crate::lexer::prelexer::{LexError, PpTokenSink, PreLexer};
use crate::lexer::token::{Keyword, LiteralKind, Punctuator, SourceLocation};
use crate::parser::ast::{Statement, StatementKind};
use crate::parser::parse::TranslationUnit;
use crate::source::{normalize, to_string, CodePoint};
use crate::symbols::scope::{Scope, ScopeKind};
use crate::symbols::types::TypeSymbol;

/// Width of the separator rule above each scope block
const RULE_WIDTH: usize = 40;

/// Collects the pre-lexer's output as dump lines.
#[derive(Debug, Default)]
pub struct PpTokenDump {
    lines: Vec<String>,
}

impl PpTokenDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        join_lines(self.lines)
    }

    fn unit(&mut self, kind: &str, text: &str) {
        self.lines
            .push(format!("{} {} {}", kind, text.chars().count(), text));
    }
}

impl PpTokenSink for PpTokenDump {
    fn whitespace(&mut self, width: usize) {
        self.lines.push(format!("whitespace-sequence {}", width));
    }

    fn newline(&mut self) {
        self.lines.push("new-line".to_string());
    }

    fn identifier(&mut self, text: &[CodePoint]) {
        self.unit("identifier", &to_string(text));
    }

    fn pp_number(&mut self, text: &str) {
        self.unit("pp-number", text);
    }

    fn character_literal(&mut self, text: &[CodePoint]) {
        self.unit("character-literal", &to_string(text));
    }

    fn string_literal(&mut self, text: &[CodePoint]) {
        self.unit("string-literal", &to_string(text));
    }

    fn punctuator(&mut self, text: &str) {
        self.unit("punctuator", text);
    }

    fn non_whitespace(&mut self, text: &[CodePoint]) {
        self.unit("non-whitespace-character", &to_string(text));
    }

    fn end_of_file(&mut self) {
        self.lines.push("eof".to_string());
    }
}

/// Collects the lexer's output as dump lines.
#[derive(Debug, Default)]
pub struct TokenDump {
    lines: Vec<String>,
}

impl TokenDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        join_lines(self.lines)
    }

    fn line(&mut self, location: SourceLocation, category: &str, subcategory: &str, text: &str) {
        self.lines.push(format!(
            "{}-{}: {} {} {}",
            location.line, location.column, category, subcategory, text
        ));
    }

    fn literal_line(&mut self, location: SourceLocation, subcategory: &str, text: &str, bytes: &[u8]) {
        let mut line = format!("{}-{}: literal {} {}", location.line, location.column, subcategory, text);
        for byte in bytes {
            line.push_str(&format!(" {:02x}", byte));
        }
        self.lines.push(line);
    }
}

impl TokenSink for TokenDump {
    fn invalid(&mut self, text: &str, location: SourceLocation) {
        self.line(location, "invalid", "Invalid", text);
    }

    fn keyword(&mut self, text: &str, keyword: Keyword, location: SourceLocation) {
        self.line(location, "keyword", &format!("{:?}", keyword), text);
    }

    fn punctuator(&mut self, text: &str, punctuator: Punctuator, location: SourceLocation) {
        self.line(location, "punctuator", &format!("{:?}", punctuator), text);
    }

    fn identifier(&mut self, text: &str, location: SourceLocation) {
        self.line(location, "identifier", "Identifier", text);
    }

    fn literal(&mut self, text: &str, kind: LiteralKind, bytes: &[u8], location: SourceLocation) {
        self.literal_line(location, kind.as_str(), text, bytes);
    }

    fn literal_array(
        &mut self,
        text: &str,
        count: usize,
        kind: LiteralKind,
        bytes: &[u8],
        location: SourceLocation,
    ) {
        let subcategory = format!("array of {} {}", count, kind.as_str());
        self.literal_line(location, &subcategory, text, bytes);
    }

    fn end_of_file(&mut self, location: SourceLocation) {
        self.lines
            .push(format!("{}-{}: eof Eof", location.line, location.column));
    }
}

/// Run the pre-lexer alone over `bytes`.
pub fn dump_pp_tokens(bytes: &[u8]) -> Result<String, LexError> {
    let mut dump = PpTokenDump::new();
    PreLexer::new(normalize(bytes)).run(&mut dump)?;
    Ok(dump.finish())
}

/// Run the pre-lexer and lexer over `bytes`.
pub fn dump_tokens(bytes: &[u8]) -> Result<String, LexError> {
    let mut lexer = Lexer::new(TokenDump::new());
    PreLexer::new(normalize(bytes)).run(&mut lexer)?;
    Ok(lexer.into_sink().finish())
}

/// Render every scope of a parsed translation unit.
pub fn dump_symbols(unit: &TranslationUnit) -> String {
    let mut lines = Vec::new();
    scope_block(&mut lines, &unit.internal, 0);
    scope_block(&mut lines, &unit.global, 1);

    for function in unit.global.functions_sorted() {
        let Some(signature) = function.ty.as_function() else {
            continue;
        };
        let Some(body) = signature.body() else {
            continue;
        };
        scope_block(&mut lines, &signature.params(), 2);
        statement_scopes(&mut lines, &body, 3);
    }

    join_lines(lines)
}

fn scope_block(lines: &mut Vec<String>, scope: &Scope, depth: usize) {
    let indent = "  ".repeat(depth);
    let ordered = matches!(scope.kind(), ScopeKind::Parameters | ScopeKind::Structure);

    lines.push(format!("{}{}", indent, "-".repeat(RULE_WIDTH)));
    lines.push(format!("{}{} scope", indent, scope.kind()));

    lines.push(format!("{}types:", indent));
    for (name, ty) in scope.types_sorted() {
        // A typedef is listed with what it stands for.
        let shown = match &**ty {
            TypeSymbol::Typedef { target, .. } => target.qualified_name(),
            other => other.qualified_name(),
        };
        lines.push(format!("{}  {}: {}", indent, name, shown));
    }

    lines.push(format!("{}variables:", indent));
    let mut variables: Vec<_> = scope.variables().collect();
    if !ordered {
        variables.sort_by(|a, b| a.name.cmp(&b.name));
    }
    for variable in variables {
        lines.push(format!("{}  {}: {}", indent, variable.name, variable.ty));
    }

    lines.push(format!("{}functions:", indent));
    for function in scope.functions_sorted() {
        lines.push(format!("{}  {}: {}", indent, function.name, function.ty));
    }

    // Struct members follow the scope that declares the struct.
    for (_, ty) in scope.types_sorted() {
        if let TypeSymbol::Struct(s) = &**ty {
            if s.is_complete() {
                scope_block(lines, &s.members(), depth + 1);
            }
        }
    }
}

/// Dump the scopes opened by `statement` and everything nested in it.
fn statement_scopes(lines: &mut Vec<String>, statement: &Statement, depth: usize) {
    let depth = match &statement.kind {
        StatementKind::Compound { scope, .. } | StatementKind::For { scope, .. } => {
            scope_block(lines, scope, depth);
            depth + 1
        }
        _ => depth,
    };
    for child in statement.sub_statements() {
        statement_scopes(lines, child, depth);
    }
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    #[test]
    fn test_pp_token_dump() {
        let dump = dump_pp_tokens(b"int  x1;").unwrap();
        assert_eq!(
            dump,
            "identifier 3 int\n\
             whitespace-sequence 2\n\
             identifier 2 x1\n\
             punctuator 1 ;\n\
             new-line\n\
             eof\n"
        );
    }

    #[test]
    fn test_pp_token_dump_garbage_and_literals() {
        let dump = dump_pp_tokens(b"@ 'a' \"s\" 1.5e3\n").unwrap();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "non-whitespace-character 1 @");
        assert_eq!(lines[2], "character-literal 3 'a'");
        assert_eq!(lines[4], "string-literal 3 \"s\"");
        assert_eq!(lines[6], "pp-number 5 1.5e3");
    }

    #[test]
    fn test_token_dump() {
        let dump = dump_tokens(b"int x = 42;").unwrap();
        assert_eq!(
            dump,
            "1-1: keyword Int int\n\
             1-5: identifier Identifier x\n\
             1-7: punctuator Eq =\n\
             1-9: literal int 42 2a 00 00 00\n\
             1-11: punctuator Semicolon ;\n\
             2-1: eof Eof\n"
        );
    }

    #[test]
    fn test_token_dump_string_array() {
        let dump = dump_tokens(b"\"ab\" \"c\"").unwrap();
        let first = dump.lines().next().unwrap();
        assert_eq!(first, "1-1: literal array of 4 char \"ab\" \"c\" 61 62 63");
    }

    #[test]
    fn test_token_dump_invalid() {
        let dump = dump_tokens(b"09 `").unwrap();
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "1-1: invalid Invalid 09");
        assert_eq!(lines[1], "1-4: invalid Invalid `");
    }

    #[test]
    fn test_symbol_dump_layout() {
        let source = "typedef int number; struct p { int x; }; number n; int f(int a) { int b; return a; }";
        let unit = Parser::new(source.as_bytes()).parse_translation_unit().unwrap();
        let dump = dump_symbols(&unit);
        let lines: Vec<_> = dump.lines().collect();

        let rule = "-".repeat(RULE_WIDTH);
        assert_eq!(lines[0], rule);
        assert_eq!(lines[1], "internal scope");

        let global = lines.iter().position(|l| *l == "  global scope").unwrap();
        assert_eq!(lines[global - 1], format!("  {}", rule));
        assert!(lines.contains(&"    number: int"));
        assert!(lines.contains(&"    struct p: struct p"));
        assert!(lines.contains(&"    n: int"));
        assert!(lines.contains(&"    f: function (int) returning int"));

        assert!(lines.contains(&"    structure scope"));
        assert!(lines.contains(&"      x: int"));
        assert!(lines.contains(&"    parameters scope"));
        assert!(lines.contains(&"      a: int"));
        assert!(lines.contains(&"      block scope"));
        assert!(lines.contains(&"        b: int"));
    }
}
