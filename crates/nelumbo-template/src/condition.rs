//! Evaluation of `{% if %}` conditions.
//!
//! A condition is tokenized into literals, identifiers, operators and
//! parentheses, identifiers are resolved against the data context, and the
//! result is evaluated by a small recursive-descent parser. Nothing in a
//! condition is ever executed as code.
//!
//! Supported syntax, loosest binding first:
//!
//! - `a or b`, `a || b`
//! - `a and b`, `a && b`
//! - `not a`, `!a`
//! - `a == b`, `a === b`, `a != b`, `a !== b`, `a < b`, `a > b`, `a <= b`, `a >= b`
//! - string literals in single or double quotes, numbers, `true`, `false`,
//!   `null`/`none`, dotted identifiers and parentheses
//!
//! Failures are reported as [`ConditionError`] and rendered inline by the
//! caller.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::context::ContextValue;
use crate::expression::ExpressionEvaluator;

/// Why a condition could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedQuote(usize),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
}

impl Operator {
    fn parse(symbol: &str) -> Result<Self, ConditionError> {
        Ok(match symbol {
            "==" => Self::Eq,
            "===" => Self::StrictEq,
            "!=" | "<>" => Self::Ne,
            "!==" => Self::StrictNe,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "&&" => Self::And,
            "||" => Self::Or,
            "!" => Self::Not,
            other => return Err(ConditionError::UnknownOperator(other.to_string())),
        })
    }

    const fn is_comparison(self) -> bool {
        !matches!(self, Self::And | Self::Or | Self::Not)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(ContextValue),
    Identifier(String),
    Op(Operator),
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{}", v.dump()),
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Op(op) => write!(f, "{op:?}"),
            Self::Open => write!(f, "("),
            Self::Close => write!(f, ")"),
        }
    }
}

const OPERATOR_CHARS: &[char] = &['<', '>', '!', '=', '|', '&'];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn tokenize(condition: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = condition.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            for (_, next) in chars.by_ref() {
                if next == c {
                    closed = true;
                    break;
                }
                literal.push(next);
            }
            if !closed {
                return Err(ConditionError::UnterminatedQuote(start));
            }
            tokens.push(Token::Literal(ContextValue::String(literal)));
        } else if c == '(' {
            chars.next();
            tokens.push(Token::Open);
        } else if c == ')' {
            chars.next();
            tokens.push(Token::Close);
        } else if OPERATOR_CHARS.contains(&c) {
            let mut symbol = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if !OPERATOR_CHARS.contains(&next) {
                    break;
                }
                symbol.push(next);
                chars.next();
            }
            tokens.extend(split_operators(&symbol)?);
        } else if is_word_char(c) {
            let mut word = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if !is_word_char(next) {
                    break;
                }
                word.push(next);
                chars.next();
            }
            tokens.push(classify_word(word));
        } else {
            return Err(ConditionError::UnexpectedToken(c.to_string()));
        }
    }
    Ok(tokens)
}

/// Splits an operator run such as `!!` or `==!` into operators, treating
/// trailing `!` characters as negations.
fn split_operators(symbol: &str) -> Result<Vec<Token>, ConditionError> {
    if let Ok(op) = Operator::parse(symbol) {
        return Ok(vec![Token::Op(op)]);
    }
    let head = symbol.trim_end_matches('!');
    if head.len() == symbol.len() {
        return Err(ConditionError::UnknownOperator(symbol.to_string()));
    }
    let mut tokens = Vec::new();
    if !head.is_empty() {
        tokens.push(Token::Op(Operator::parse(head)?));
    }
    for _ in head.len()..symbol.len() {
        tokens.push(Token::Op(Operator::Not));
    }
    Ok(tokens)
}

fn classify_word(word: String) -> Token {
    match word.to_ascii_lowercase().as_str() {
        "and" => Token::Op(Operator::And),
        "or" => Token::Op(Operator::Or),
        "not" => Token::Op(Operator::Not),
        "true" => Token::Literal(ContextValue::Bool(true)),
        "false" => Token::Literal(ContextValue::Bool(false)),
        "null" | "none" => Token::Literal(ContextValue::None),
        _ => {
            if let Ok(i) = word.parse::<i64>() {
                Token::Literal(ContextValue::Integer(i))
            } else if let Ok(f) = word.parse::<f64>() {
                Token::Literal(ContextValue::Float(f))
            } else {
                Token::Identifier(word)
            }
        }
    }
}

struct Parser<'t, 'c> {
    tokens: &'t [Token],
    pos: usize,
    evaluator: &'t ExpressionEvaluator<'c>,
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, wanted: Operator) -> bool {
        if self.peek() == Some(&Token::Op(wanted)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<ContextValue, ConditionError> {
        let mut left = self.and()?;
        while self.eat_op(Operator::Or) {
            let right = self.and()?;
            left = ContextValue::Bool(left.is_truthy() || right.is_truthy());
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<ContextValue, ConditionError> {
        let mut left = self.not()?;
        while self.eat_op(Operator::And) {
            let right = self.not()?;
            left = ContextValue::Bool(left.is_truthy() && right.is_truthy());
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<ContextValue, ConditionError> {
        if self.eat_op(Operator::Not) {
            let value = self.not()?;
            return Ok(ContextValue::Bool(!value.is_truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<ContextValue, ConditionError> {
        let left = self.primary()?;
        let op = match self.peek() {
            Some(Token::Op(op)) if op.is_comparison() => *op,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.primary()?;
        Ok(ContextValue::Bool(compare(op, &left, &right)))
    }

    fn primary(&mut self) -> Result<ContextValue, ConditionError> {
        let token = self.peek().cloned().ok_or(ConditionError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Literal(value) => Ok(value),
            Token::Identifier(path) => Ok(self.evaluator.reference(&path).to_value()),
            Token::Open => {
                let value = self.or()?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(other) => Err(ConditionError::UnexpectedToken(other.to_string())),
                    None => Err(ConditionError::UnexpectedEnd),
                }
            }
            other => Err(ConditionError::UnexpectedToken(other.to_string())),
        }
    }
}

fn loose_eq(left: &ContextValue, right: &ContextValue) -> bool {
    match (left, right) {
        (ContextValue::Bool(_) | ContextValue::None, _)
        | (_, ContextValue::Bool(_) | ContextValue::None) => {
            left.is_truthy() == right.is_truthy()
        }
        _ => match (left.as_float(), right.as_float()) {
            #[allow(clippy::float_cmp)]
            (Some(a), Some(b)) => a == b,
            _ => left.to_display_string() == right.to_display_string(),
        },
    }
}

fn strict_eq(left: &ContextValue, right: &ContextValue) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right) && left == right
}

fn ordering(left: &ContextValue, right: &ContextValue) -> Option<Ordering> {
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.to_display_string().cmp(&right.to_display_string())),
    }
}

fn compare(op: Operator, left: &ContextValue, right: &ContextValue) -> bool {
    match op {
        Operator::Eq => loose_eq(left, right),
        Operator::StrictEq => strict_eq(left, right),
        Operator::Ne => !loose_eq(left, right),
        Operator::StrictNe => !strict_eq(left, right),
        Operator::Lt => ordering(left, right) == Some(Ordering::Less),
        Operator::Gt => ordering(left, right) == Some(Ordering::Greater),
        Operator::Le => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        Operator::Ge => matches!(
            ordering(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::And | Operator::Or | Operator::Not => false,
    }
}

/// Evaluates a condition against the evaluator's data context.
///
/// Identifiers that do not resolve evaluate to null, which is falsy.
pub fn evaluate(condition: &str, evaluator: &ExpressionEvaluator<'_>) -> Result<bool, ConditionError> {
    let tokens = tokenize(condition)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        evaluator,
    };
    let value = parser.or()?;
    if let Some(extra) = parser.peek() {
        return Err(ConditionError::UnexpectedToken(extra.to_string()));
    }
    Ok(value.is_truthy())
}

/// The inline text rendered in place of a condition that failed to evaluate.
pub fn error_text(condition: &str) -> String {
    format!("Error parsing condition \"{condition}\"")
}
