use std::fmt;
use crate::error::{Result, SimulationError};

/// The value of an evaluated formula. Arithmetic produces an integer, comparisons produce a boolean
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// Unwraps an arithmetic result, rejecting `formula` if it was a comparison
    pub fn into_integer(self, formula: &str) -> Result<i64> {
        match self {
            Value::Integer(value) => Ok(value),
            Value::Boolean(_) => Err(SimulationError::rejected(formula, "expected an arithmetic expression, found a comparison")),
        }
    }

    /// Unwraps a comparison result, rejecting `formula` if it was arithmetic
    pub fn into_boolean(self, formula: &str) -> Result<bool> {
        match self {
            Value::Boolean(value) => Ok(value),
            Value::Integer(_) => Err(SimulationError::rejected(formula, "expected a comparison, found an arithmetic expression")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Comparison {
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl Comparison {
    fn apply(self, left: i64, right: i64) -> bool {
        match self {
            Comparison::Less => left < right,
            Comparison::Greater => left > right,
            Comparison::LessEqual => left <= right,
            Comparison::GreaterEqual => left >= right,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Token {
    Integer(i64),
    Plus,
    Minus,
    Star,
    LeftParen,
    RightParen,
    Comparison(Comparison),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(value) => write!(f, "{value}"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::LeftParen => write!(f, "`(`"),
            Token::RightParen => write!(f, "`)`"),
            Token::Comparison(Comparison::Less) => write!(f, "`<`"),
            Token::Comparison(Comparison::Greater) => write!(f, "`>`"),
            Token::Comparison(Comparison::LessEqual) => write!(f, "`<=`"),
            Token::Comparison(Comparison::GreaterEqual) => write!(f, "`>=`"),
        }
    }
}

/// Splits a formula into tokens. Anything which can't start a token of the grammar is rejected
/// here, so the parser only ever sees permitted syntax
fn tokenise(formula: &str) -> Result<Vec<Token>> {
    let bytes = formula.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let token = match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let literal = &formula[start..i];
                let value = literal.parse::<i64>()
                    .map_err(|_| SimulationError::rejected(formula, format!("integer literal {literal} is out of range")))?;
                tokens.push(Token::Integer(value));
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'(' => Token::LeftParen,
            b')' => Token::RightParen,
            c @ (b'<' | b'>') => {
                let or_equal = bytes.get(i + 1) == Some(&b'=');
                if or_equal {
                    i += 1;
                }
                Token::Comparison(match (c, or_equal) {
                    (b'<', false) => Comparison::Less,
                    (b'<', true) => Comparison::LessEqual,
                    (_, false) => Comparison::Greater,
                    (_, true) => Comparison::GreaterEqual,
                })
            }
            b'/' | b'%' => return Err(SimulationError::rejected(formula, "division is not permitted")),
            b'=' | b'!' => return Err(SimulationError::rejected(formula, "equality tests are not permitted")),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                return Err(SimulationError::rejected(formula, "identifiers are not permitted, substitute bound variables first"));
            }
            _ => {
                // Only ASCII has been consumed so far, so `i` is on a char boundary
                let unexpected = formula[i..].chars().next().unwrap_or_default();
                return Err(SimulationError::rejected(formula, format!("unexpected character {unexpected:?}")));
            }
        };
        tokens.push(token);
        i += 1;
    }
    Ok(tokens)
}

/// How many parentheses and unary minuses may be nested inside each other
pub const MAX_NESTING: usize = 256;

/// Recursive descent over the grammar
///
/// ```text
/// comparison := sum (("<" | ">" | "<=" | ">=") sum)*
/// sum        := product (("+" | "-") product)*
/// product    := unary ("*" unary)*
/// unary      := "-" unary | primary
/// primary    := integer | "(" comparison ")"
/// ```
struct Parser<'a> {
    formula: &'a str,
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn reject(&self, reason: impl Into<String>) -> SimulationError {
        SimulationError::rejected(self.formula, reason)
    }

    /// Runs one level of nested parsing, rejecting formulas nested deeper than [`MAX_NESTING`]
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.reject("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn integer(&self, value: Value) -> Result<i64> {
        value.into_integer(self.formula)
    }

    fn comparison(&mut self) -> Result<Value> {
        let first = self.sum()?;
        let mut left = match self.peek() {
            Some(Token::Comparison(_)) => self.integer(first)?,
            _ => return Ok(first),
        };
        let mut holds = true;
        while let Some(Token::Comparison(comparison)) = self.peek() {
            self.position += 1;
            let right = self.sum()?;
            let right = self.integer(right)?;
            // A failed link makes the chain false, but the rest is still parsed so it gets validated
            holds = holds && comparison.apply(left, right);
            left = right;
        }
        Ok(Value::Boolean(holds))
    }

    fn sum(&mut self) -> Result<Value> {
        let mut value = self.product()?;
        loop {
            let subtract = match self.peek() {
                Some(Token::Plus) => false,
                Some(Token::Minus) => true,
                _ => return Ok(value),
            };
            self.position += 1;
            let left = self.integer(value)?;
            let right = self.product()?;
            let right = self.integer(right)?;
            let result = if subtract { left.checked_sub(right) } else { left.checked_add(right) };
            value = Value::Integer(result.ok_or_else(|| self.reject("arithmetic overflow"))?);
        }
    }

    fn product(&mut self) -> Result<Value> {
        let mut value = self.unary()?;
        while self.peek() == Some(Token::Star) {
            self.position += 1;
            let left = self.integer(value)?;
            let right = self.unary()?;
            let right = self.integer(right)?;
            value = Value::Integer(left.checked_mul(right).ok_or_else(|| self.reject("arithmetic overflow"))?);
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Value> {
        if self.peek() == Some(Token::Minus) {
            self.position += 1;
            let operand = self.nested(Self::unary)?;
            let operand = self.integer(operand)?;
            return operand.checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| self.reject("arithmetic overflow"));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value> {
        match self.advance() {
            Some(Token::Integer(value)) => Ok(Value::Integer(value)),
            Some(Token::LeftParen) => {
                let inner = self.nested(Self::comparison)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    Some(token) => Err(self.reject(format!("expected `)`, found {token}"))),
                    None => Err(self.reject("unbalanced parenthesis")),
                }
            }
            Some(token) => Err(self.reject(format!("unexpected {token}"))),
            None => Err(self.reject("unexpected end of expression")),
        }
    }
}

/// Evaluates a formula containing only integer literals, parentheses, unary minus, `+`, `-`, `*`
/// and the comparisons `<`, `>`, `<=`, `>=`
///
/// This never hands the formula to anything more general than the parser above: any syntax outside
/// the grammar, such as division, equality, or identifiers, is a `RejectedExpression`. Variables
/// must already have been substituted, see [`crate::formula::Formula`]
///
/// Comparisons chain, so `a < b <= c` holds when both `a < b` and `b <= c` hold
///
/// # Arguments
///
/// * `formula`: The formula to evaluate
///
/// returns: Result<Value, SimulationError>
///
/// # Examples
///
/// ```
/// use tracelib::eval::{evaluate, Value};
/// assert_eq!(evaluate("2 + (-5)").unwrap(), Value::Integer(-3));
/// assert_eq!(evaluate("1 < 2 <= 2").unwrap(), Value::Boolean(true));
/// assert!(evaluate("10/2").is_err());
/// ```
pub fn evaluate(formula: &str) -> Result<Value> {
    let tokens = tokenise(formula)?;
    if tokens.is_empty() {
        return Err(SimulationError::rejected(formula, "empty expression"));
    }
    let mut parser = Parser { formula, tokens, position: 0, depth: 0 };
    let value = parser.comparison()?;
    match parser.peek() {
        Some(token) => Err(parser.reject(format!("unexpected {token} after the end of the expression"))),
        None => Ok(value),
    }
}
