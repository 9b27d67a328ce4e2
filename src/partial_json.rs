//! Best-effort decoding of truncated JSON
//!
//! Tool-call arguments arrive as an append-only character stream, so the
//! text seen mid-stream is usually a prefix of a JSON document. [`decode`]
//! closes any open strings, arrays and objects at the truncation point and
//! returns what has been seen so far. Values that cannot be known yet are
//! dropped rather than guessed:
//!
//! - an object key without a complete value is omitted
//! - a number or literal touching the end of input is omitted (`[1, 2`
//!   might still become `[1, 23]`, and `12` might still become `123`)
//! - a dangling escape sequence inside a string is omitted
//!
//! Input that is not a prefix of any JSON document is rejected, as is
//! nesting deeper than [`MAX_DEPTH`].

#[cfg(test)]
mod proptests;

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest container nesting accepted, matching `serde_json`'s limit
pub const MAX_DEPTH: usize = 128;

/// Errors from [`decode`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartialJsonError {
    #[error("no JSON value in input")]
    Empty,
    #[error("input ends before any closable value")]
    Incomplete,
    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },
    #[error("invalid number at offset {offset}")]
    InvalidNumber { offset: usize },
    #[error("trailing characters at offset {offset}")]
    Trailing { offset: usize },
    #[error("nesting deeper than 128 levels at offset {offset}")]
    TooDeep { offset: usize },
}

/// Decode a possibly-truncated JSON fragment.
pub fn decode(fragment: &str) -> Result<Value, PartialJsonError> {
    let mut parser = Parser::new(fragment);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(PartialJsonError::Empty);
    }

    let value = parser
        .parse_value(0)?
        .ok_or(PartialJsonError::Incomplete)?;

    parser.skip_whitespace();
    if parser.at_end() {
        Ok(value)
    } else {
        Err(PartialJsonError::Trailing { offset: parser.pos })
    }
}

/// A string body and whether its closing quote was seen
struct ScannedString {
    text: String,
    closed: bool,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\n' | '\r' | '\t')) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, found: char) -> PartialJsonError {
        PartialJsonError::Unexpected {
            found,
            offset: self.pos,
        }
    }

    /// Parse one value. `Ok(None)` means the input ended before anything
    /// worth keeping at this position.
    fn parse_value(&mut self, depth: usize) -> Result<Option<Value>, PartialJsonError> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        match c {
            '{' => self.parse_object(depth).map(Some),
            '[' => self.parse_array(depth).map(Some),
            '"' => {
                let scanned = self.parse_string()?;
                Ok(Some(Value::String(scanned.text)))
            }
            't' => self.parse_literal("true", Value::Bool(true)),
            'f' => self.parse_literal("false", Value::Bool(false)),
            'n' => self.parse_literal("null", Value::Null),
            '-' | '0'..='9' => self.parse_number(),
            other => Err(self.unexpected(other)),
        }
    }

    fn enter(&self, depth: usize) -> Result<(), PartialJsonError> {
        if depth >= MAX_DEPTH {
            return Err(PartialJsonError::TooDeep { offset: self.pos });
        }
        Ok(())
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, PartialJsonError> {
        self.enter(depth)?;
        self.bump(); // '{'
        let mut map = Map::new();

        self.skip_whitespace();
        match self.peek() {
            None => return Ok(Value::Object(map)),
            Some('}') => {
                self.bump();
                return Ok(Value::Object(map));
            }
            Some(_) => {}
        }

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Value::Object(map)),
                Some('"') => {}
                Some(other) => return Err(self.unexpected(other)),
            }

            let key = self.parse_string()?;
            if !key.closed {
                return Ok(Value::Object(map));
            }

            self.skip_whitespace();
            match self.bump() {
                None => return Ok(Value::Object(map)),
                Some(':') => {}
                Some(other) => {
                    self.pos -= 1;
                    return Err(self.unexpected(other));
                }
            }

            match self.parse_value(depth + 1)? {
                Some(value) => {
                    map.insert(key.text, value);
                }
                None => return Ok(Value::Object(map)),
            }

            self.skip_whitespace();
            match self.bump() {
                None => return Ok(Value::Object(map)),
                Some(',') => {}
                Some('}') => return Ok(Value::Object(map)),
                Some(other) => {
                    self.pos -= 1;
                    return Err(self.unexpected(other));
                }
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, PartialJsonError> {
        self.enter(depth)?;
        self.bump(); // '['
        let mut items = Vec::new();

        self.skip_whitespace();
        match self.peek() {
            None => return Ok(Value::Array(items)),
            Some(']') => {
                self.bump();
                return Ok(Value::Array(items));
            }
            Some(_) => {}
        }

        loop {
            self.skip_whitespace();
            if let Some(c @ (',' | ']')) = self.peek() {
                return Err(self.unexpected(c));
            }

            match self.parse_value(depth + 1)? {
                Some(value) => items.push(value),
                None => return Ok(Value::Array(items)),
            }

            self.skip_whitespace();
            match self.bump() {
                None => return Ok(Value::Array(items)),
                Some(',') => {}
                Some(']') => return Ok(Value::Array(items)),
                Some(other) => {
                    self.pos -= 1;
                    return Err(self.unexpected(other));
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<ScannedString, PartialJsonError> {
        self.bump(); // opening quote
        let mut text = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Ok(ScannedString {
                    text,
                    closed: false,
                });
            };

            match c {
                '"' => return Ok(ScannedString { text, closed: true }),
                '\\' => {
                    let escape_start = self.pos - 1;
                    match self.parse_escape(escape_start)? {
                        Some(decoded) => text.push(decoded),
                        None => {
                            return Ok(ScannedString {
                                text,
                                closed: false,
                            })
                        }
                    }
                }
                c if u32::from(c) < 0x20 => {
                    self.pos -= 1;
                    return Err(self.unexpected(c));
                }
                c => text.push(c),
            }
        }
    }

    /// Decode the escape after a backslash. `Ok(None)` when input ends
    /// before the escape is complete.
    fn parse_escape(&mut self, start: usize) -> Result<Option<char>, PartialJsonError> {
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let decoded = match c {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => return self.parse_unicode_escape(start),
            _ => return Err(PartialJsonError::InvalidEscape { offset: start }),
        };
        Ok(Some(decoded))
    }

    fn parse_unicode_escape(&mut self, start: usize) -> Result<Option<char>, PartialJsonError> {
        let Some(high) = self.read_hex4(start)? else {
            return Ok(None);
        };

        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high)
                .map(Some)
                .ok_or(PartialJsonError::InvalidEscape { offset: start });
        }

        // High surrogate: a low surrogate escape must follow.
        match self.bump() {
            None => return Ok(None),
            Some('\\') => {}
            Some(_) => return Err(PartialJsonError::InvalidEscape { offset: start }),
        }
        match self.bump() {
            None => return Ok(None),
            Some('u') => {}
            Some(_) => return Err(PartialJsonError::InvalidEscape { offset: start }),
        }
        let Some(low) = self.read_hex4(start)? else {
            return Ok(None);
        };
        if !(0xDC00..0xE000).contains(&low) {
            return Err(PartialJsonError::InvalidEscape { offset: start });
        }

        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(combined)
            .map(Some)
            .ok_or(PartialJsonError::InvalidEscape { offset: start })
    }

    fn read_hex4(&mut self, start: usize) -> Result<Option<u32>, PartialJsonError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(c) = self.bump() else {
                return Ok(None);
            };
            let digit = c
                .to_digit(16)
                .ok_or(PartialJsonError::InvalidEscape { offset: start })?;
            value = value * 16 + digit;
        }
        Ok(Some(value))
    }

    /// A literal cut off by the end of input is dropped at any depth.
    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Option<Value>, PartialJsonError> {
        for expected in word.chars() {
            match self.peek() {
                None => return Ok(None),
                Some(c) if c == expected => self.pos += 1,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(Some(value))
    }

    /// A number touching the end of input is dropped at any depth: the
    /// digits seen so far may be the start of a longer number.
    fn parse_number(&mut self) -> Result<Option<Value>, PartialJsonError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some('0'..='9' | '-' | '+' | '.' | 'e' | 'E')
        ) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if self.at_end() {
            return Ok(None);
        }

        serde_json::from_str::<Number>(&text)
            .map(|number| Some(Value::Number(number)))
            .map_err(|_| PartialJsonError::InvalidNumber { offset: start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_documents() {
        assert_eq!(decode(r#"{"q":"cat"}"#).unwrap(), json!({"q": "cat"}));
        assert_eq!(decode("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(decode("  true ").unwrap(), json!(true));
        assert_eq!(decode("-12.5e3 ").unwrap(), json!(-12.5e3));
        assert_eq!(decode(r#""a\nb""#).unwrap(), json!("a\nb"));
    }

    #[test]
    fn test_dangling_string_value_is_closed() {
        assert_eq!(decode(r#"{"q":"ca"#).unwrap(), json!({"q": "ca"}));
        assert_eq!(decode(r#"{"q":""#).unwrap(), json!({"q": ""}));
        assert_eq!(decode(r#""hel"#).unwrap(), json!("hel"));
    }

    #[test]
    fn test_incomplete_keys_are_dropped() {
        assert_eq!(decode("{").unwrap(), json!({}));
        assert_eq!(decode(r#"{"q"#).unwrap(), json!({}));
        assert_eq!(decode(r#"{"q""#).unwrap(), json!({}));
        assert_eq!(decode(r#"{"q":"#).unwrap(), json!({}));
        assert_eq!(decode(r#"{"a":1,"b"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_numbers_at_the_edge_are_dropped() {
        assert_eq!(decode(r#"{"a":12"#).unwrap(), json!({}));
        assert_eq!(decode(r#"{"a":12,"#).unwrap(), json!({"a": 12}));
        assert_eq!(decode("[1, 2").unwrap(), json!([1]));
        assert_eq!(decode("12"), Err(PartialJsonError::Incomplete));
        assert_eq!(decode("12 ").unwrap(), json!(12));
    }

    #[test]
    fn test_truncated_literals_are_dropped() {
        assert_eq!(decode(r#"{"ok":tr"#).unwrap(), json!({}));
        assert_eq!(decode("[true, nu").unwrap(), json!([true]));
        assert_eq!(decode("tr"), Err(PartialJsonError::Incomplete));
    }

    #[test]
    fn test_nested_containers_are_closed() {
        assert_eq!(
            decode(r#"{"a":{"b":[1,{"c":"x"#).unwrap(),
            json!({"a": {"b": [1, {"c": "x"}]}})
        );
        assert_eq!(decode(r#"{"a":["#).unwrap(), json!({"a": []}));
    }

    #[test]
    fn test_dangling_escapes() {
        assert_eq!(decode(r#""ab\"#).unwrap(), json!("ab"));
        assert_eq!(decode(r#""ab\u00"#).unwrap(), json!("ab"));
        assert_eq!(decode(r#""ét"#).unwrap(), json!("ét"));
        assert_eq!(decode(r#""😀""#).unwrap(), json!("😀"));
        assert_eq!(decode(r#""\ud83d\u"#).unwrap(), json!(""));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(200_000);
        assert_eq!(
            decode(&deep),
            Err(PartialJsonError::TooDeep { offset: MAX_DEPTH })
        );

        let at_limit = "[".repeat(MAX_DEPTH);
        assert!(decode(&at_limit).is_ok());
        let over_limit = format!("{}{{\"a\":", "[".repeat(MAX_DEPTH));
        assert!(matches!(
            decode(&over_limit),
            Err(PartialJsonError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_rejects_non_prefixes() {
        assert_eq!(decode(""), Err(PartialJsonError::Empty));
        assert_eq!(decode("   "), Err(PartialJsonError::Empty));
        assert!(matches!(
            decode(r#"{"a" 1}"#),
            Err(PartialJsonError::Unexpected { found: '1', .. })
        ));
        assert!(decode("{]").is_err());
        assert!(decode("[1,,2]").is_err());
        assert!(decode("tx").is_err());
        assert!(decode(r#""\q""#).is_err());
        assert!(matches!(
            decode(r#"{"a":1}x"#),
            Err(PartialJsonError::Trailing { .. })
        ));
        assert!(matches!(
            decode("1-2 "),
            Err(PartialJsonError::InvalidNumber { .. })
        ));
        assert!(decode(r#"{"a":1,}"#).is_err());
    }
}
