//! Source normalization
//!
//! Turns raw source bytes into the code point stream consumed by the
//! pre-lexer. Three passes run in order, each rewriting the same buffer in
//! place with a read cursor that never falls behind the write cursor:
//!
//! 1. [`decode_utf8`]: bytes → code points (best effort, not validated)
//! 2. [`replace_trigraphs`]: `??x` sequences → single punctuation characters
//! 3. [`splice_lines`]: backslash-newline pairs are deleted
//!
//! The buffer always ends with [`END_OF_FILE`].

use tracing::debug;

/// One logical source character.
///
/// Kept as a plain integer rather than `char` because best-effort decoding
/// can produce values that are not Unicode scalar values.
pub type CodePoint = u32;

/// Sentinel terminating every normalized buffer. Never a decodable value.
pub const END_OF_FILE: CodePoint = u32::MAX;

const TRIGRAPHS: [(CodePoint, CodePoint); 9] = [
    ('=' as u32, '#' as u32),
    ('/' as u32, '\\' as u32),
    ('\'' as u32, '^' as u32),
    ('(' as u32, '[' as u32),
    (')' as u32, ']' as u32),
    ('!' as u32, '|' as u32),
    ('<' as u32, '{' as u32),
    ('>' as u32, '}' as u32),
    ('-' as u32, '~' as u32),
];

const QUESTION: CodePoint = '?' as u32;
const BACKSLASH: CodePoint = '\\' as u32;
const NEWLINE: CodePoint = '\n' as u32;

/// Run all three normalization passes over `bytes`.
pub fn normalize(bytes: &[u8]) -> Vec<CodePoint> {
    let mut buffer: Vec<CodePoint> = bytes.iter().map(|&b| CodePoint::from(b)).collect();
    buffer.push(END_OF_FILE);

    decode_utf8(&mut buffer);
    replace_trigraphs(&mut buffer);
    splice_lines(&mut buffer);

    debug!(
        bytes = bytes.len(),
        code_points = buffer.len() - 1,
        "normalized source"
    );
    buffer
}

/// Decode UTF-8 sequences held one byte per slot.
///
/// The lead byte alone decides the sequence length. Continuation bytes are
/// masked without checking their tag bits, and a byte that cannot start a
/// sequence is passed through as its own value.
pub fn decode_utf8(buffer: &mut Vec<CodePoint>) {
    let mut read = 0;
    let mut write = 0;

    while buffer[read] != END_OF_FILE {
        let lead = buffer[read];
        let (extra, initial) = match lead {
            0x00..=0x7F => (0, lead),
            0xC0..=0xDF => (1, lead & 0x1F),
            0xE0..=0xEF => (2, lead & 0x0F),
            0xF0..=0xF7 => (3, lead & 0x07),
            _ => (0, lead),
        };
        read += 1;

        let mut value = initial;
        for _ in 0..extra {
            if buffer[read] == END_OF_FILE {
                break;
            }
            value = (value << 6) | (buffer[read] & 0x3F);
            read += 1;
        }

        buffer[write] = value;
        write += 1;
    }

    buffer[write] = END_OF_FILE;
    buffer.truncate(write + 1);
}

/// Replace trigraph sequences, greedily from the left, never overlapping.
pub fn replace_trigraphs(buffer: &mut Vec<CodePoint>) {
    let mut read = 0;
    let mut write = 0;

    while buffer[read] != END_OF_FILE {
        if buffer[read] == QUESTION && buffer[read + 1] == QUESTION {
            let third = buffer[read + 2];
            if let Some(&(_, replacement)) = TRIGRAPHS.iter().find(|(key, _)| *key == third) {
                buffer[write] = replacement;
                write += 1;
                read += 3;
                continue;
            }
        }

        buffer[write] = buffer[read];
        write += 1;
        read += 1;
    }

    buffer[write] = END_OF_FILE;
    buffer.truncate(write + 1);
}

/// Delete every backslash that is immediately followed by a newline.
pub fn splice_lines(buffer: &mut Vec<CodePoint>) {
    let mut read = 0;
    let mut write = 0;

    while buffer[read] != END_OF_FILE {
        if buffer[read] == BACKSLASH && buffer[read + 1] == NEWLINE {
            read += 2;
            continue;
        }

        buffer[write] = buffer[read];
        write += 1;
        read += 1;
    }

    buffer[write] = END_OF_FILE;
    buffer.truncate(write + 1);
}

/// Render a slice of code points as a `String`, replacing values that are
/// not Unicode scalar values.
pub fn to_string(code_points: &[CodePoint]) -> String {
    code_points
        .iter()
        .map(|&cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
