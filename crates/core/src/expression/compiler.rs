//! Compiles a token stream into an iterator group tree.

use fancy_regex::Regex;

use super::matches::ResultType;
use super::tokenizer::{Token, Tokenizer};
use crate::error::SyntaxError;

/// Set-algebra connector between two iterator chains of the same group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    Or,
    And,
    Xor,
    Not,
}

#[derive(Clone, Debug)]
pub(crate) enum Step {
    Root,
    Children,
    Descendants,
    Parent,
    Reference,
    PreviousNode,
    NextNode,
    DistinctValues,
    DistinctNames,
    OlderSibling,
    YoungerSibling,
    Range { start: Option<usize>, end: Option<usize> },
    Modulo(usize),
    SiblingOffset(i64),
    ElderRelative(String),
    NamedAncestor(String),
    Named(String),
    NamedRegex(Regex),
    ValueEquals(String),
    TypedValue { alias: String, literal: String },
    ValueRegex(Regex),
    Numbered(usize),
    Group(Group),
}

#[derive(Clone, Debug)]
pub(crate) struct Logical {
    pub(crate) op: LogicalOp,
    pub(crate) chain: Vec<Step>,
}

/// A parenthesized (or the outermost) chain plus its logical connectors.
#[derive(Clone, Debug, Default)]
pub(crate) struct Group {
    pub(crate) chain: Vec<Step>,
    pub(crate) logicals: Vec<Logical>,
}

impl Group {
    fn current_chain(&mut self) -> &mut Vec<Step> {
        match self.logicals.last_mut() {
            Some(logical) => &mut logical.chain,
            None => &mut self.chain,
        }
    }

    fn awaiting_rhs(&self) -> bool {
        self.logicals.last().is_some_and(|logical| logical.chain.is_empty())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Program {
    pub(crate) root: Group,
    pub(crate) reference: bool,
    pub(crate) result_type: ResultType,
    pub(crate) convert: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Previous {
    /// Start of the expression, of a group or of a logical chain.
    Start,
    Slash,
    /// A `/` that directly followed another and already stands for an empty-name step.
    DoubleSlash,
    Iterator,
}

struct Compiler<'a> {
    source: &'a str,
    /// Open groups; the outermost group is at the bottom.
    stack: Vec<Group>,
    previous: Previous,
}

pub(crate) fn compile(source: &str) -> Result<Program, SyntaxError> {
    let (reference, body) = match source.strip_prefix('@') {
        Some(rest) if !rest.starts_with('"') => (true, rest),
        _ => (false, source),
    };
    Compiler { source, stack: vec![Group::default()], previous: Previous::Start }
        .run(reference, body)
}

impl Compiler<'_> {
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.source)
    }

    fn current(&mut self) -> &mut Group {
        // The outermost group is never popped.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_step(&mut self, step: Step) {
        self.current().current_chain().push(step);
        self.previous = Previous::Iterator;
    }

    /// A `/` directly before a group boundary, an operator or the end selects empty names.
    fn close_slash(&mut self) {
        if self.previous == Previous::Slash {
            self.push_step(Step::Named(String::new()));
        }
    }

    fn run(mut self, reference: bool, body: &str) -> Result<Program, SyntaxError> {
        let mut tokens = Tokenizer::new(body);
        let mut result_type = ResultType::Node;
        let mut convert = None;

        while let Some(token) = tokens.next() {
            match token? {
                Token::Slash => {
                    self.previous = if self.previous == Previous::Slash {
                        self.push_step(Step::Named(String::new()));
                        Previous::DoubleSlash
                    } else {
                        Previous::Slash
                    };
                }
                Token::Open => {
                    self.close_slash();
                    self.stack.push(Group::default());
                    self.previous = Previous::Start;
                }
                Token::Close => {
                    self.close_slash();
                    if self.current().awaiting_rhs() {
                        return Err(self.error("logical operator before ')'"));
                    }
                    if self.stack.len() == 1 {
                        return Err(self.error("unmatched ')'"));
                    }
                    let group = self.stack.pop().unwrap_or_default();
                    self.push_step(Step::Group(group));
                }
                Token::Pipe => self.logical(LogicalOp::Or)?,
                Token::Amp => self.logical(LogicalOp::And)?,
                Token::Caret => self.logical(LogicalOp::Xor)?,
                Token::Bang => self.logical(LogicalOp::Not)?,
                Token::Question => {
                    self.close_slash();
                    if self.current().awaiting_rhs() {
                        return Err(self.error("logical operator before '?'"));
                    }
                    if let Some(token) = tokens.next() {
                        let Token::Text(text) = token? else {
                            return Err(self.error("expected a result type after '?'"));
                        };
                        (result_type, convert) = self.result_type(&text)?;
                    }
                    if tokens.next().is_some() {
                        return Err(self.error("result type must be the last segment"));
                    }
                }
                Token::Text(text) => {
                    self.expect_lead_in()?;
                    let step = self.parse_step(&text)?;
                    self.push_step(step);
                }
                Token::Literal(text) => {
                    self.expect_lead_in()?;
                    self.push_step(Step::Named(text));
                }
            }
        }

        self.close_slash();
        if self.current().awaiting_rhs() {
            return Err(self.error("logical operator at end of expression"));
        }
        if self.stack.len() > 1 {
            return Err(self.error("unterminated group"));
        }
        let root = self.stack.pop().unwrap_or_default();
        Ok(Program { root, reference, result_type, convert })
    }

    fn expect_lead_in(&self) -> Result<(), SyntaxError> {
        match self.previous {
            Previous::Iterator => Err(self.error("missing '/' before iterator")),
            Previous::Start | Previous::Slash | Previous::DoubleSlash => Ok(()),
        }
    }

    fn logical(&mut self, op: LogicalOp) -> Result<(), SyntaxError> {
        self.close_slash();
        if self.current().awaiting_rhs() {
            return Err(self.error("consecutive logical operators"));
        }
        self.current().logicals.push(Logical { op, chain: Vec::new() });
        self.previous = Previous::Start;
        Ok(())
    }

    fn result_type(&self, text: &str) -> Result<(ResultType, Option<String>), SyntaxError> {
        let (kind, convert) = match text.split_once('.') {
            Some((kind, convert)) if !convert.is_empty() => (kind, Some(convert.to_owned())),
            Some(_) => return Err(self.error("missing conversion type after '.'")),
            None => (text, None),
        };
        let result_type = match kind {
            "name" => ResultType::Name,
            "value" => ResultType::Value,
            "node" => ResultType::Node,
            "count" => ResultType::Count,
            other => return Err(self.error(format!("unknown result type '{other}'"))),
        };
        Ok((result_type, convert))
    }

    fn parse_step(&self, text: &str) -> Result<Step, SyntaxError> {
        let step = match text {
            ".." => Step::Root,
            "*" => Step::Children,
            "**" => Step::Descendants,
            "." => Step::Parent,
            "#" => Step::Reference,
            "<" => Step::PreviousNode,
            ">" => Step::NextNode,
            "=$" => Step::DistinctValues,
            "$" => Step::DistinctNames,
            "++" => Step::OlderSibling,
            "--" => Step::YoungerSibling,
            _ if text.starts_with('[') => self.range(text)?,
            _ if text.starts_with('%') => self.modulo(&text[1..])?,
            _ if text.starts_with('=') => self.value_match(&text[1..])?,
            _ if text.starts_with("..") => Step::NamedAncestor(text[2..].to_owned()),
            _ if text.len() > 1 && text.starts_with('@') => Step::ElderRelative(text[1..].to_owned()),
            _ => {
                if let Some(offset) = signed_offset(text) {
                    Step::SiblingOffset(offset)
                } else if let Some(pattern) = text.strip_prefix(":regex:") {
                    Step::NamedRegex(self.regex(pattern)?)
                } else if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    let index = text
                        .parse()
                        .map_err(|_| self.error(format!("child index '{text}' is out of range")))?;
                    Step::Numbered(index)
                } else {
                    Step::Named(text.to_owned())
                }
            }
        };
        Ok(step)
    }

    fn range(&self, text: &str) -> Result<Step, SyntaxError> {
        let malformed = || self.error(format!("malformed range '{text}'"));
        let inner = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')).ok_or_else(malformed)?;
        let (start, end) = inner.split_once(',').ok_or_else(malformed)?;
        let bound = |part: &str| -> Result<Option<usize>, SyntaxError> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse().map(Some).map_err(|_| malformed())
        };
        let (start, end) = (bound(start)?, bound(end)?);
        if let (Some(start), Some(end)) = (start, end)
            && end <= start
        {
            return Err(self.error(format!("range end must exceed start in '{text}'")));
        }
        Ok(Step::Range { start, end })
    }

    fn modulo(&self, text: &str) -> Result<Step, SyntaxError> {
        match text.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Step::Modulo(n)),
            _ => Err(self.error(format!("modulo needs a positive integer, got '{text}'"))),
        }
    }

    fn value_match(&self, text: &str) -> Result<Step, SyntaxError> {
        if let Some(typed) = text.strip_prefix(':')
            && let Some((alias, literal)) = typed.split_once(':')
            && !alias.is_empty()
        {
            if alias == "regex" {
                return Ok(Step::ValueRegex(self.regex(literal)?));
            }
            return Ok(Step::TypedValue { alias: alias.to_owned(), literal: literal.to_owned() });
        }
        Ok(Step::ValueEquals(text.to_owned()))
    }

    fn regex(&self, pattern: &str) -> Result<Regex, SyntaxError> {
        Regex::new(pattern).map_err(|error| self.error(format!("invalid regex '{pattern}': {error}")))
    }
}

/// `+n` / `-n` with digits only.
fn signed_offset(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('+').or_else(|| text.strip_prefix('-'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: i64 = digits.parse().ok()?;
    Some(if text.starts_with('-') { -magnitude } else { magnitude })
}
