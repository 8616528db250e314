//! Splits expression text into tokens.
//!
//! The tokenizer is lazy: each call to `next` scans exactly one token. After a syntax error it
//! yields `None`.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::SyntaxError;

const DELIMITERS: &[char] = &['/', '|', '&', '^', '!', '(', ')', '?'];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Slash,
    Pipe,
    Amp,
    Caret,
    Bang,
    Open,
    Close,
    Question,
    /// Iterator text, trailing whitespace trimmed.
    Text(String),
    /// Content of a quoted literal.
    Literal(String),
}

pub(crate) struct Tokenizer<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self { source, chars: source.chars().peekable(), failed: false }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.source)
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn scan(&mut self) -> Option<Result<Token, SyntaxError>> {
        self.skip_whitespace();
        let c = *self.chars.peek()?;
        let single = match c {
            '/' => Some(Token::Slash),
            '|' => Some(Token::Pipe),
            '&' => Some(Token::Amp),
            '^' => Some(Token::Caret),
            '!' => Some(Token::Bang),
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            '?' => Some(Token::Question),
            _ => None,
        };
        if let Some(token) = single {
            self.chars.next();
            return Some(Ok(token));
        }
        Some(match c {
            '"' => {
                self.chars.next();
                self.single_line().map(Token::Literal)
            }
            '@' if self.starts_multi_line() => {
                self.chars.next();
                self.chars.next();
                self.multi_line().map(Token::Literal)
            }
            _ => self.text(),
        })
    }

    fn starts_multi_line(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next() == Some('@') && ahead.next() == Some('"')
    }

    /// `"..."` with backslash escapes; the opening quote is already consumed.
    fn single_line(&mut self) -> Result<String, SyntaxError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\r' | '\n') => {
                    return Err(self.error("newline in single-line string literal"));
                }
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        match self.chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some('n') => out.push_str("\r\n"),
            Some('r') => {
                let mut ahead = self.chars.clone();
                if ahead.next() == Some('\\') && ahead.next() == Some('n') {
                    self.chars.next();
                    self.chars.next();
                    out.push_str("\r\n");
                } else {
                    out.push('\r');
                }
            }
            Some('x') => {
                let digits: String = (0..4).filter_map(|_| self.chars.next()).collect();
                let decoded = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(format!("invalid \\x escape '\\x{digits}'")))?;
                out.push(decoded);
            }
            Some(other) => return Err(self.error(format!("unrecognized escape '\\{other}'"))),
            None => return Err(self.error("unterminated string literal")),
        }
        Ok(())
    }

    /// `@"..."`: doubled quotes are literal, line breaks are normalized to CRLF.
    fn multi_line(&mut self) -> Result<String, SyntaxError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated multi-line string literal")),
                Some('"') => {
                    if self.chars.next_if_eq(&'"').is_some() {
                        out.push('"');
                    } else {
                        return Ok(out);
                    }
                }
                Some('\r') => {
                    if self.chars.next_if_eq(&'\n').is_none() {
                        return Err(self.error("carriage return without line feed in literal"));
                    }
                    out.push_str("\r\n");
                }
                Some('\n') => out.push_str("\r\n"),
                Some(c) => out.push(c),
            }
        }
    }

    /// Everything up to the next unescaped delimiter. A `=` or `=:type:` prefix directly
    /// followed by a quoted literal absorbs the literal.
    fn text(&mut self) -> Result<Token, SyntaxError> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if DELIMITERS.contains(&c) {
                break;
            }
            if c == '"' && is_value_prefix(&out) {
                self.chars.next();
                out.push_str(&self.single_line()?);
                return Ok(Token::Text(out));
            }
            if c == '@' && is_value_prefix(&out) && self.starts_multi_line() {
                self.chars.next();
                self.chars.next();
                out.push_str(&self.multi_line()?);
                return Ok(Token::Text(out));
            }
            self.chars.next();
            if c == '\\'
                && let Some(&escaped) = self.chars.peek()
                && DELIMITERS.contains(&escaped)
            {
                self.chars.next();
                out.push(escaped);
                continue;
            }
            out.push(c);
        }
        out.truncate(out.trim_end().len());
        Ok(Token::Text(out))
    }
}

fn is_value_prefix(text: &str) -> bool {
    text == "="
        || (text.len() > 2
            && text.starts_with("=:")
            && text.ends_with(':')
            && !text[2..text.len() - 1].contains(':'))
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let token = self.scan();
        if matches!(token, Some(Err(_))) {
            self.failed = true;
        }
        token
    }
}
