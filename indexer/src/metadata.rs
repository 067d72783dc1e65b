use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum MetadataError {
    #[error("no `export const metadata` declaration found")]
    MissingDeclaration,
    #[error("invalid metadata literal at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("metadata does not declare a title")]
    MissingTitle,
}

/// Metadata declared by a documentation page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: String,
    pub fields: Map<String, Value>,
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"export\s+const\s+metadata(?:\s*:\s*[A-Za-z_$][\w$.]*)?\s*=\s*")
            .expect("metadata declaration pattern is valid")
    })
}

/// Finds the `export const metadata = { ... }` declaration in `source` and
/// parses its object literal.
pub fn extract_metadata(source: &str) -> Result<PageMetadata, MetadataError> {
    let declaration = declaration_pattern()
        .find(source)
        .ok_or(MetadataError::MissingDeclaration)?;

    let mut parser = LiteralParser::new(source, declaration.end());
    let fields = parser.parse_object(0)?;
    let title = title_from(&fields).ok_or(MetadataError::MissingTitle)?;

    Ok(PageMetadata { title, fields })
}

/// Parses a standalone relaxed object literal (unquoted keys, trailing commas,
/// comments, single quoted strings).
pub fn parse_object_literal(literal: &str) -> Result<Map<String, Value>, MetadataError> {
    let mut parser = LiteralParser::new(literal, 0);
    let fields = parser.parse_object(0)?;
    parser.skip_trivia()?;
    if parser.peek() == Some(';') {
        parser.pos += 1;
        parser.skip_trivia()?;
    }
    match parser.peek() {
        None => Ok(fields),
        Some(c) => parser.error(format!("unexpected trailing character '{c}'")),
    }
}

// Next.js also accepts `title: { default, template, absolute }`.
fn title_from(fields: &Map<String, Value>) -> Option<String> {
    let non_empty = |s: &&str| !s.trim().is_empty();
    match fields.get("title")? {
        Value::String(title) => Some(title.as_str()).filter(non_empty).map(str::to_string),
        Value::Object(title) => ["absolute", "default"]
            .iter()
            .find_map(|key| title.get(*key).and_then(Value::as_str).filter(non_empty))
            .map(str::to_string),
        _ => None,
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, MetadataError> {
        Err(error_at(self.pos, message))
    }

    fn skip_trivia(&mut self) -> Result<(), MetadataError> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return self.error("unterminated block comment"),
                }
            } else if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), MetadataError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => self.error(format!("expected '{expected}', found '{c}'")),
            None => self.error(format!("expected '{expected}', found end of input")),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, MetadataError> {
        if depth > MAX_DEPTH {
            return self.error("literal is nested too deeply");
        }

        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(depth).map(Value::Object),
            Some('[') => self.parse_array(depth),
            Some(quote @ ('"' | '\'' | '`')) => self.parse_string(quote).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                match self.parse_identifier() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    // JSON has no non-finite numbers
                    "null" | "undefined" | "Infinity" | "NaN" => Ok(Value::Null),
                    other => Err(error_at(start, format!("unsupported expression `{other}`"))),
                }
            }
            Some(c) => self.error(format!("unexpected character '{c}'")),
            None => self.error("unexpected end of input"),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Map<String, Value>, MetadataError> {
        self.expect('{')?;
        let mut fields = Map::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(fields);
                }
                None => return self.error("unterminated object literal"),
                _ => {}
            }

            let key = self.parse_key()?;
            self.expect(':')?;
            let value = self.parse_value(depth + 1)?;
            fields.insert(key, value);

            self.skip_trivia()?;
            let separator = self.pos;
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(fields),
                Some(c) => {
                    return Err(error_at(separator, format!("expected ',' or '}}', found '{c}'")));
                }
                None => return self.error("unterminated object literal"),
            }
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, MetadataError> {
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                None => return self.error("unterminated array literal"),
                _ => {}
            }

            items.push(self.parse_value(depth + 1)?);

            self.skip_trivia()?;
            let separator = self.pos;
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(c) => {
                    return Err(error_at(separator, format!("expected ',' or ']', found '{c}'")));
                }
                None => return self.error("unterminated array literal"),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, MetadataError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote),
            Some(c) if is_ident_start(c) => Ok(self.parse_identifier().to_string()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(self.src[start..self.pos].to_string())
            }
            Some(c) => self.error(format!("unexpected character '{c}' in property name")),
            None => self.error("unexpected end of input"),
        }
    }

    fn parse_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn parse_string(&mut self, quote: char) -> Result<String, MetadataError> {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut out = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Err(error_at(start, "unterminated string"));
            };
            match c {
                c if c == quote => return Ok(out),
                '\\' => self.parse_escape(&mut out)?,
                '$' if quote == '`' && self.peek() == Some('{') => {
                    return self.error("template literal interpolation is not supported");
                }
                '\n' | '\r' if quote != '`' => return Err(error_at(start, "unterminated string")),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), MetadataError> {
        let Some(c) = self.bump() else {
            return self.error("unterminated escape sequence");
        };

        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.pos += 1;
                }
            }
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(self.char_from(code)?);
            }
            'u' => {
                let code = self.unicode_escape()?;
                out.push(self.char_from(code)?);
            }
            other => out.push(other),
        }

        Ok(())
    }

    fn unicode_escape(&mut self) -> Result<u32, MetadataError> {
        if self.peek() == Some('{') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let code = u32::from_str_radix(&self.src[start..self.pos], 16)
                .map_err(|_| error_at(start, "invalid unicode escape"))?;
            if self.peek() != Some('}') {
                return self.error("unterminated unicode escape");
            }
            self.pos += 1;
            return Ok(code);
        }

        let high = self.hex_digits(4)?;
        if !(0xD800..0xDC00).contains(&high) || !self.src[self.pos..].starts_with("\\u") {
            return Ok(high);
        }

        self.pos += 2;
        let low = self.hex_digits(4)?;
        if !(0xDC00..0xE000).contains(&low) {
            return self.error("invalid surrogate pair");
        }
        Ok(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, MetadataError> {
        let end = self.pos + count;
        let digits = self
            .src
            .get(self.pos..end)
            .filter(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| error_at(self.pos, "invalid hexadecimal escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| error_at(self.pos, "invalid hexadecimal escape"))?;
        self.pos = end;
        Ok(code)
    }

    fn char_from(&self, code: u32) -> Result<char, MetadataError> {
        char::from_u32(code).ok_or_else(|| error_at(self.pos, format!("invalid code point {code:#x}")))
    }

    fn parse_number(&mut self) -> Result<Value, MetadataError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.pos += 1;
                true
            }
            Some('+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        let rest = &self.src[self.pos..];
        if rest.starts_with("Infinity") || rest.starts_with("NaN") {
            return match self.parse_identifier() {
                "Infinity" | "NaN" => Ok(Value::Null),
                other => Err(error_at(start, format!("unsupported expression `{other}`"))),
            };
        }

        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.pos += 1;
            }
            let digits: Vec<u32> = self.src[digits_start..self.pos]
                .chars()
                .filter_map(|c| c.to_digit(16))
                .collect();
            if digits.is_empty() {
                return Err(error_at(start, "invalid hexadecimal number"));
            }
            return Ok(hex_value(&digits, negative));
        }

        let body_start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => self.pos += 1,
                '.' => {
                    is_float = true;
                    self.pos += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }

        let mut literal: String = self.src[body_start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if negative {
            literal.insert(0, '-');
        }

        if !is_float {
            if let Ok(integer) = literal.parse::<i64>() {
                return Ok(Value::from(integer));
            }
        }

        if !is_float && !negative {
            if let Ok(integer) = literal.parse::<u64>() {
                return Ok(Value::from(integer));
            }
        }

        let float: f64 = literal
            .parse()
            .map_err(|_| error_at(start, format!("invalid number `{}`", &self.src[start..self.pos])))?;
        Ok(float_value(float))
    }
}

// Hex literals wider than 64 bits lose precision, as they do in JavaScript.
fn hex_value(digits: &[u32], negative: bool) -> Value {
    let exact = digits
        .iter()
        .try_fold(0u64, |acc, digit| acc.checked_mul(16)?.checked_add(u64::from(*digit)));

    match exact {
        Some(magnitude) if !negative => Value::from(magnitude),
        Some(magnitude) if magnitude <= i64::MAX as u64 => Value::from(-(magnitude as i64)),
        Some(magnitude) if magnitude == i64::MIN.unsigned_abs() => Value::from(i64::MIN),
        _ => {
            let magnitude = digits
                .iter()
                .fold(0f64, |acc, digit| acc * 16.0 + f64::from(*digit));
            float_value(if negative { -magnitude } else { magnitude })
        }
    }
}

fn float_value(float: f64) -> Value {
    Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null)
}

fn error_at(offset: usize, message: impl Into<String>) -> MetadataError {
    MetadataError::Parse {
        offset,
        message: message.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}
