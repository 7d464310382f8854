//! Literal decoding
//!
//! Classification of pp-numbers into integer or floating literals, and
//! resolution of escape sequences inside character and string literals.
//! Every function returns `Err(message)` for text that does not form a valid
//! literal; the lexer turns that into an invalid token.

use crate::source::CodePoint;

/// A decoded numeric literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberLiteral {
    Int(i32),
    Float(f64),
}

/// A decoded character literal. ASCII code points stay `char`-typed, larger
/// ones widen to `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharLiteral {
    Char(u8),
    Int(i32),
}

const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Classify and decode a pp-number.
pub fn decode_number(text: &str) -> Result<NumberLiteral, String> {
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid hexadecimal literal '{}'", text));
        }
        return parse_integer(text, digits, 16);
    }

    if text.contains(['.', 'e', 'E']) {
        let body = text.strip_suffix(['f', 'F']).unwrap_or(text);
        return body
            .parse::<f64>()
            .map(NumberLiteral::Float)
            .map_err(|_| format!("invalid floating literal '{}'", text));
    }

    if text.len() > 1 && text.starts_with('0') {
        if !text.chars().all(|c| ('0'..='7').contains(&c)) {
            return Err(format!("invalid digit in octal literal '{}'", text));
        }
        return parse_integer(text, &text[1..], 8);
    }

    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid integer literal '{}'", text));
    }
    parse_integer(text, text, 10)
}

fn parse_integer(text: &str, digits: &str, radix: u32) -> Result<NumberLiteral, String> {
    u64::from_str_radix(digits, radix)
        .ok()
        .and_then(|value| i32::try_from(value).ok())
        .map(NumberLiteral::Int)
        .ok_or_else(|| format!("integer literal '{}' is out of range", text))
}

/// One element of a literal body after escape resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    /// A source character or simple escape: a code point.
    CodePoint(u32),
    /// An octal or hexadecimal escape: a raw numeric value.
    Numeric(u32),
}

impl Piece {
    fn value(self) -> u32 {
        match self {
            Piece::CodePoint(value) | Piece::Numeric(value) => value,
        }
    }
}

fn digit_value(cp: CodePoint, radix: u32) -> Option<u32> {
    char::from_u32(cp).and_then(|c| c.to_digit(radix))
}

/// Resolve escape sequences in the body of a literal (quotes removed).
fn resolve_escapes(body: &[CodePoint]) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut i = 0;

    while i < body.len() {
        let cp = body[i];
        i += 1;
        if cp != '\\' as u32 {
            pieces.push(Piece::CodePoint(cp));
            continue;
        }

        let escaped = body.get(i).copied().ok_or("incomplete escape sequence")?;
        i += 1;

        let simple = match char::from_u32(escaped) {
            Some('\'') => Some(0x27),
            Some('"') => Some(0x22),
            Some('?') => Some(0x3F),
            Some('\\') => Some(0x5C),
            Some('a') => Some(0x07),
            Some('b') => Some(0x08),
            Some('f') => Some(0x0C),
            Some('n') => Some(0x0A),
            Some('r') => Some(0x0D),
            Some('t') => Some(0x09),
            Some('v') => Some(0x0B),
            _ => None,
        };
        if let Some(value) = simple {
            pieces.push(Piece::CodePoint(value));
            continue;
        }

        if let Some(first) = digit_value(escaped, 8) {
            let mut value = first;
            let mut digits = 1;
            while digits < 3 {
                match body.get(i).and_then(|&cp| digit_value(cp, 8)) {
                    Some(digit) => {
                        value = value * 8 + digit;
                        i += 1;
                        digits += 1;
                    }
                    None => break,
                }
            }
            pieces.push(Piece::Numeric(value));
            continue;
        }

        if escaped == 'x' as u32 {
            let mut value: u32 = 0;
            let mut digits = 0;
            while let Some(digit) = body.get(i).and_then(|&cp| digit_value(cp, 16)) {
                value = value
                    .checked_mul(16)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or("hex escape sequence out of range")?;
                i += 1;
                digits += 1;
            }
            if digits == 0 {
                return Err("\\x used with no following hex digits".to_string());
            }
            pieces.push(Piece::Numeric(value));
            continue;
        }

        return Err("invalid escape sequence".to_string());
    }

    Ok(pieces)
}

/// Strip the surrounding quotes of a literal's raw text.
fn body(text: &[CodePoint]) -> &[CodePoint] {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        &[]
    }
}

/// Decode a character literal (`'x'`, quotes included).
pub fn decode_char(text: &[CodePoint]) -> Result<CharLiteral, String> {
    let pieces = resolve_escapes(body(text))?;
    let value = match pieces.as_slice() {
        [] => return Err("empty character literal".to_string()),
        [piece] => piece.value(),
        _ => return Err("multi-character character literal".to_string()),
    };

    match value {
        0..=0x7F => Ok(CharLiteral::Char(value as u8)),
        0x80..=MAX_CODE_POINT => Ok(CharLiteral::Int(value as i32)),
        _ => Err("character literal out of range".to_string()),
    }
}

/// Decode a string literal (`"..."`, quotes included) into bytes, without a
/// terminator. Source characters are UTF-8 encoded; numeric escapes must fit
/// in one byte.
pub fn decode_string(text: &[CodePoint]) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    for piece in resolve_escapes(body(text))? {
        match piece {
            Piece::Numeric(value) => {
                let byte = u8::try_from(value).map_err(|_| "escape sequence out of range".to_string())?;
                bytes.push(byte);
            }
            Piece::CodePoint(value) => {
                let ch = char::from_u32(value).ok_or("invalid code point in string literal")?;
                let mut buffer = [0; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
            }
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(text: &str) -> Vec<CodePoint> {
        text.chars().map(|c| c as CodePoint).collect()
    }

    #[test]
    fn test_integer_bases() {
        assert_eq!(decode_number("0x1A"), Ok(NumberLiteral::Int(26)));
        assert_eq!(decode_number("0X1a"), Ok(NumberLiteral::Int(26)));
        assert_eq!(decode_number("010"), Ok(NumberLiteral::Int(8)));
        assert_eq!(decode_number("42"), Ok(NumberLiteral::Int(42)));
        assert_eq!(decode_number("0"), Ok(NumberLiteral::Int(0)));
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(decode_number("2147483647"), Ok(NumberLiteral::Int(i32::MAX)));
        assert!(decode_number("2147483648").is_err());
        assert!(decode_number("99999999999999").is_err());
        assert!(decode_number("0xFFFFFFFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_invalid_digits() {
        assert!(decode_number("09").is_err());
        assert!(decode_number("0x").is_err());
        assert!(decode_number("0xZ1").is_err());
        assert!(decode_number("12abc").is_err());
    }

    #[test]
    fn test_floats() {
        match decode_number("3.14") {
            Ok(NumberLiteral::Float(value)) => assert!((value - 3.14).abs() < 1e-12),
            other => panic!("expected float, got {:?}", other),
        }
        assert_eq!(decode_number("1e3"), Ok(NumberLiteral::Float(1000.0)));
        assert_eq!(decode_number(".5"), Ok(NumberLiteral::Float(0.5)));
        assert_eq!(decode_number("2.5f"), Ok(NumberLiteral::Float(2.5)));
        assert!(decode_number("1.2.3").is_err());
        assert!(decode_number("1e").is_err());
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(decode_char(&cps("'a'")), Ok(CharLiteral::Char(0x61)));
        assert_eq!(decode_char(&cps(r"'\n'")), Ok(CharLiteral::Char(0x0A)));
        assert_eq!(decode_char(&cps(r"'\0'")), Ok(CharLiteral::Char(0)));
        assert_eq!(decode_char(&cps(r"'\x41'")), Ok(CharLiteral::Char(0x41)));
        assert_eq!(decode_char(&cps(r"'\101'")), Ok(CharLiteral::Char(0x41)));
        assert_eq!(decode_char(&cps("'é'")), Ok(CharLiteral::Int(0xE9)));
    }

    #[test]
    fn test_bad_char_literals() {
        assert!(decode_char(&cps("''")).is_err());
        assert!(decode_char(&cps("'ab'")).is_err());
        assert!(decode_char(&cps(r"'\x110000'")).is_err());
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(decode_string(&cps(r#""ab\tc""#)), Ok(b"ab\tc".to_vec()));
        assert_eq!(decode_string(&cps(r#""\x41\102""#)), Ok(b"AB".to_vec()));
        assert_eq!(decode_string(&cps("\"é\"")), Ok(vec![0xC3, 0xA9]));
        assert_eq!(decode_string(&cps("\"\"")), Ok(vec![]));
        assert!(decode_string(&cps(r#""\x100""#)).is_err());
    }

    #[test]
    fn test_octal_escape_stops_after_three_digits() {
        assert_eq!(decode_string(&cps(r#""\1234""#)), Ok(vec![0o123, b'4']));
    }
}
