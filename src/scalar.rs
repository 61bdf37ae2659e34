//! Codec for YAML flow scalars as they appear after a `key:` on one line.
//!
//! A scalar decodes into a value, the quoting style used in the source, and a
//! verbatim suffix (trailing whitespace and `# ...` comment). Re-encoding with
//! the same style reproduces the original bytes, so rewritten fields keep the
//! author's formatting. When a value cannot be represented in the requested
//! style, encoding falls back to double quotes, the most expressive style.
use thiserror::Error;

/// Quoting style of a scalar in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

/// One decoded scalar: value, quoting style, and the verbatim trailing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub style: Style,
    pub suffix: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty scalar")]
    Empty,
    #[error("unterminated quoted scalar")]
    UnterminatedQuote,
    #[error("unknown escape sequence \\{0}")]
    UnknownEscape(char),
    #[error("truncated escape sequence")]
    TruncatedEscape,
    #[error("invalid hexadecimal digit {0:?} in an escape sequence")]
    InvalidHexDigit(char),
    #[error("escape sequence U+{0:08X} is not a Unicode code point")]
    InvalidCodePoint(u32),
}

/// Decode a raw scalar, trying double-quoted, single-quoted, then plain.
pub fn decode(raw: &str) -> Result<Scalar, DecodeError> {
    let body = raw.trim_start();
    match body.chars().next() {
        Some('"') => decode_double(&body[1..]),
        Some('\'') => decode_single(&body[1..]),
        Some(_) => decode_plain(body),
        None => Err(DecodeError::Empty),
    }
}

fn decode_double(body: &str) -> Result<Scalar, DecodeError> {
    let mut value = String::new();
    let mut chars = body.chars();
    loop {
        match chars.next() {
            None => return Err(DecodeError::UnterminatedQuote),
            Some('"') => break,
            Some('\\') => match chars.next() {
                None => return Err(DecodeError::TruncatedEscape),
                Some('x') => value.push(read_hex(&mut chars, 2)?),
                Some('u') => value.push(read_hex(&mut chars, 4)?),
                Some('U') => value.push(read_hex(&mut chars, 8)?),
                Some(escape) => {
                    value.push(unescape(escape).ok_or(DecodeError::UnknownEscape(escape))?);
                }
            },
            Some(other) => value.push(other),
        }
    }
    Ok(Scalar {
        value,
        style: Style::DoubleQuoted,
        suffix: chars.as_str().to_string(),
    })
}

fn decode_single(body: &str) -> Result<Scalar, DecodeError> {
    let mut value = String::new();
    let mut chars = body.chars();
    loop {
        match chars.next() {
            None => return Err(DecodeError::UnterminatedQuote),
            // A doubled quote is a literal quote; anything else after a
            // single quote ends the scalar and starts the suffix.
            Some('\'') => match chars.next() {
                Some('\'') => value.push('\''),
                Some(first) => {
                    let mut suffix = String::from(first);
                    suffix.push_str(chars.as_str());
                    return Ok(Scalar {
                        value,
                        style: Style::SingleQuoted,
                        suffix,
                    });
                }
                None => {
                    return Ok(Scalar {
                        value,
                        style: Style::SingleQuoted,
                        suffix: String::new(),
                    })
                }
            },
            Some(other) => value.push(other),
        }
    }
}

fn decode_plain(body: &str) -> Result<Scalar, DecodeError> {
    let content = match body.find('#') {
        Some(position) => &body[..position],
        None => body,
    };
    let value = content.trim_end();
    if value.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(Scalar {
        value: value.to_string(),
        style: Style::Plain,
        suffix: body[value.len()..].to_string(),
    })
}

fn read_hex(chars: &mut std::str::Chars<'_>, digits: u32) -> Result<char, DecodeError> {
    let mut code_point: u32 = 0;
    for _ in 0..digits {
        let digit = chars.next().ok_or(DecodeError::TruncatedEscape)?;
        let value = digit
            .to_digit(16)
            .ok_or(DecodeError::InvalidHexDigit(digit))?;
        code_point = code_point * 16 + value;
    }
    char::from_u32(code_point).ok_or(DecodeError::InvalidCodePoint(code_point))
}

fn unescape(escape: char) -> Option<char> {
    Some(match escape {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' => '\t',
        'n' => '\n',
        'v' => '\x0B',
        'f' => '\x0C',
        'r' => '\r',
        'e' => '\x1B',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_double(character: char) -> Option<&'static str> {
    Some(match character {
        '\0' => "\\0",
        '\x07' => "\\a",
        '\x08' => "\\b",
        '\t' => "\\t",
        '\n' => "\\n",
        '\x0B' => "\\v",
        '\x0C' => "\\f",
        '\r' => "\\r",
        '\x1B' => "\\e",
        '"' => "\\\"",
        '\\' => "\\\\",
        '\u{85}' => "\\N",
        '\u{A0}' => "\\_",
        '\u{2028}' => "\\L",
        '\u{2029}' => "\\P",
        _ => return None,
    })
}

// Printable ranges YAML allows verbatim. Line-oriented characters such as
// '\n' and '\r' are excluded on purpose.
fn is_safe_printable(character: char) -> bool {
    matches!(character,
        '\x20'..='\x7E'
            | '\u{A0}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}')
}

fn effective_style(value: &str, requested: Style) -> Style {
    if !value.chars().all(is_safe_printable) {
        return Style::DoubleQuoted;
    }
    if requested == Style::Plain && plain_would_change_meaning(value) {
        return Style::DoubleQuoted;
    }
    requested
}

// A plain scalar must not start with whitespace or a quote, end with
// whitespace, or contain '#' or ':'.
fn plain_would_change_meaning(value: &str) -> bool {
    value
        .chars()
        .next()
        .is_some_and(|first| first.is_whitespace() || first == '\'' || first == '"')
        || value.chars().next_back().is_some_and(char::is_whitespace)
        || value.contains(['#', ':'])
}

impl Scalar {
    /// Re-encode the scalar, upgrading to double quotes when the requested
    /// style cannot represent the value.
    pub fn encode(&self) -> String {
        match effective_style(&self.value, self.style) {
            Style::Plain => format!("{}{}", self.value, self.suffix),
            Style::SingleQuoted => {
                format!("'{}'{}", self.value.replace('\'', "''"), self.suffix)
            }
            Style::DoubleQuoted => {
                let mut output = String::with_capacity(self.value.len() + 2);
                output.push('"');
                for character in self.value.chars() {
                    if let Some(escape) = escape_double(character) {
                        output.push_str(escape);
                    } else if is_safe_printable(character) {
                        output.push(character);
                    } else {
                        output.push_str(&format!("\\U{:08X}", character as u32));
                    }
                }
                output.push('"');
                output.push_str(&self.suffix);
                output
            }
        }
    }
}
