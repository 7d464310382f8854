// End-to-end tests through the public library API

use cfront::dump::{dump_pp_tokens, dump_symbols, dump_tokens};
use cfront::lexer::token::{
    LiteralKind, Token, TokenKind, TokenValue, PUNCTUATORS_1, PUNCTUATORS_2, PUNCTUATORS_3,
    PUNCTUATORS_4,
};
use cfront::parser::ast::{BinaryOp, ExprKind, StatementKind};
use cfront::parser::{TokenSource, TokenStream};
use cfront::source::{normalize, CodePoint, END_OF_FILE};
use cfront::{compile, ParseError};
use pretty_assertions::assert_eq;

fn tokens(source: &str) -> Vec<Token> {
    let mut stream = TokenStream::new(source.as_bytes());
    let mut out = Vec::new();
    loop {
        let token = stream.next_token().expect("lexing failed");
        if token.is_eof() {
            return out;
        }
        out.push(token);
    }
}

fn single_token(source: &str) -> Token {
    let mut all = tokens(source);
    assert_eq!(all.len(), 1, "expected one token from {:?}", source);
    all.remove(0)
}

fn compile_error(source: &str) -> ParseError {
    match compile(source.as_bytes()) {
        Ok(_) => panic!("expected an error for {:?}", source),
        Err(err) => err,
    }
}

#[test]
fn test_normalization_is_identity_on_plain_text() {
    let source = "int main(void) {\n    return 'x' + \"q?\" [0];\n}\n";
    let mut expected: Vec<CodePoint> = source.bytes().map(CodePoint::from).collect();
    expected.push(END_OF_FILE);
    assert_eq!(normalize(source.as_bytes()), expected);
}

#[test]
fn test_normalization_decodes_utf8() {
    let normalized = normalize("é".as_bytes());
    assert_eq!(normalized, vec![0xE9, END_OF_FILE]);
}

#[test]
fn test_normalization_trigraphs_and_splices() {
    let normalized = normalize(b"a??(b\\\nc");
    let text: String = normalized[..normalized.len() - 1]
        .iter()
        .filter_map(|&c| char::from_u32(c))
        .collect();
    assert_eq!(text, "a[bc");
}

#[test]
fn test_every_punctuator_lexes_whole() {
    let tables = PUNCTUATORS_4
        .iter()
        .chain(PUNCTUATORS_3.iter())
        .chain(PUNCTUATORS_2.iter())
        .chain(PUNCTUATORS_1.iter());

    for text in tables {
        let dump = dump_pp_tokens(format!("{} ", text).as_bytes()).unwrap();
        let first = dump.lines().next().unwrap();
        assert_eq!(first, format!("punctuator {} {}", text.len(), text));
    }
}

#[test]
fn test_maximal_munch_prefers_longest() {
    let texts: Vec<_> = tokens("a<<=b->c...").into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["a", "<<=", "b", "->", "c", "..."]);
}

#[test]
fn test_numeric_literals() {
    assert_eq!(single_token("0x1A").value, TokenValue::Integer(26));
    assert_eq!(single_token("010").value, TokenValue::Integer(8));
    assert_eq!(single_token("42").value, TokenValue::Integer(42));

    match single_token("3.14").value {
        TokenValue::Float(value) => assert!((value - 3.14).abs() < 1e-9),
        other => panic!("expected a float, got {:?}", other),
    }
    assert_eq!(single_token("1e3").value, TokenValue::Float(1000.0));

    assert_eq!(single_token("99999999999999").kind, TokenKind::Invalid);
}

#[test]
fn test_string_concatenation() {
    let token = single_token("\"ab\" \"cd\"");
    assert_eq!(token.kind, TokenKind::Literal(LiteralKind::String));
    assert_eq!(token.value, TokenValue::Bytes(b"abcd".to_vec()));

    let dump = dump_tokens(b"\"ab\" \"cd\"").unwrap();
    assert!(dump.starts_with("1-1: literal array of 5 char \"ab\" \"cd\" 61 62 63 64\n"));
}

#[test]
fn test_character_literals() {
    let a = single_token("'a'");
    assert_eq!(a.kind, TokenKind::Literal(LiteralKind::Char));
    assert_eq!(a.value, TokenValue::CodePoint(0x61));
    assert_eq!(single_token("'\\n'").value, TokenValue::CodePoint(0x0A));

    assert_eq!(single_token("''").kind, TokenKind::Invalid);
    assert_eq!(single_token("'ab'").kind, TokenKind::Invalid);
}

#[test]
fn test_invalid_token_stops_parse() {
    let err = compile_error("int x = 99999999999999;");
    assert_eq!(err.to_string(), "1:9: invalid token '99999999999999'");
}

#[test]
fn test_lex_errors_are_fatal() {
    let err = compile_error("int x; /* never closed");
    assert!(matches!(err, ParseError::Lex(_)), "{:?}", err);
    assert!(dump_pp_tokens(b"\"open\n").is_err());
}

#[test]
fn test_block_variable_not_visible_after_block() {
    let err = compile_error("int f(void) { { int y; y = 1; } return y; }");
    assert_eq!(err.message(), "undeclared identifier 'y'");
}

#[test]
fn test_struct_incomplete_until_closed() {
    let err = compile_error("struct s { int a; struct s inner; };");
    assert!(err.message().contains("incomplete type"), "{}", err);

    // A pointer to the struct being defined is fine.
    assert!(compile(b"struct node { int value; struct node *next; };").is_ok());
}

#[test]
fn test_recursive_function() {
    let source = "int fact(int n) { if (n < 2) return 1; return n * fact(n - 1); }";
    let unit = compile(source.as_bytes()).unwrap();
    let fact = unit.function("fact").unwrap();
    assert_eq!(fact.ty.to_string(), "function (int) returning int");
    assert!(fact.ty.as_function().unwrap().has_body());
}

#[test]
fn test_initializer_precedence() {
    let unit = compile(b"int x = 1 + 2 * 3;").unwrap();
    let x = unit.variable("x").unwrap();
    assert_eq!(x.ty.to_string(), "int");
    assert_eq!(x.initializer.len(), 1);

    let root = &x.initializer[0];
    let ExprKind::Binary { op, lhs, rhs } = &root.kind else {
        panic!("expected a binary node, got {}", root);
    };
    assert_eq!(*op, BinaryOp::Add);
    assert_eq!(lhs.to_string(), "1");
    let ExprKind::Binary { op: inner, .. } = &rhs.kind else {
        panic!("expected a binary node, got {}", rhs);
    };
    assert_eq!(*inner, BinaryOp::Mul);
    assert_eq!(root.to_string(), "(+ 1 (* 2 3))");
}

#[test]
fn test_loop_statements_resolve_targets() {
    let source = "void f(void) { int i; for (i = 0; i < 3; i++) { if (i) continue; break; } }";
    let unit = compile(source.as_bytes()).unwrap();
    let f = unit.function("f").unwrap();
    let signature = f.ty.as_function().unwrap();
    let body = signature.body().unwrap();

    let StatementKind::Compound { statements, .. } = &body.kind else {
        panic!("function body is not a block");
    };
    let for_loop = &statements[1];
    let id = for_loop.loop_id().unwrap();
    assert!(body.find_loop(id).is_some());
}

#[test]
fn test_break_outside_loop() {
    let err = compile_error("void f(void) { break; }");
    assert_eq!(err.message(), "break statement not within loop");
    assert_eq!(err.location().line, 1);
}

#[test]
fn test_symbol_dump_of_program() {
    let source = "\
typedef struct point { int x; int y; } point;
point origin;
int dot(point *a, point *b) {
    int sum;
    sum = a->x * b->x + a->y * b->y;
    return sum;
}
";
    let unit = compile(source.as_bytes()).unwrap();
    let dump = dump_symbols(&unit);
    let lines: Vec<_> = dump.lines().collect();

    assert!(lines.contains(&"    origin: struct point"));
    assert!(lines.contains(&"    point: struct point"));
    assert!(lines.contains(&"    dot: function (pointer to struct point, pointer to struct point) returning int"));
    assert!(lines.contains(&"      sum: int"));

    // Parameters keep declaration order.
    let a = lines.iter().position(|l| *l == "      a: pointer to struct point").unwrap();
    let b = lines.iter().position(|l| *l == "      b: pointer to struct point").unwrap();
    assert!(a < b);
}
