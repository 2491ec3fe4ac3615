use thiserror::Error;

use crate::expr::lexer::{LexError, Token, tokenize};

/// Parse and evaluation errors for condition expressions. The condition
/// evaluator catches these and falls back to `true`; they never cross the
/// engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("trailing input after expression")]
    TrailingInput,
}

/// A literal value in the condition grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Str(String),
    Array(Vec<String>),
}

impl Value {
    /// JS-flavored truthiness: empty strings and empty arrays are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(flag) => *flag,
            Value::Str(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
        }
    }
}

/// Expression AST for substituted conditions. All leaves are literals; the
/// substitution pass has already replaced every field placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn evaluate(&self) -> bool {
        self.value().truthy()
    }

    fn value(&self) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Not(inner) => Value::Bool(!inner.evaluate()),
            Expr::And(left, right) => Value::Bool(left.evaluate() && right.evaluate()),
            Expr::Or(left, right) => Value::Bool(left.evaluate() || right.evaluate()),
            // Strict equality: values of different shapes are never equal.
            Expr::Eq(left, right) => Value::Bool(left.value() == right.value()),
            Expr::Ne(left, right) => Value::Bool(left.value() != right.value()),
        }
    }
}

/// Recursive-descent parser over the condition grammar:
///
/// ```text
/// expr     := or
/// or       := and ( '||' and )*
/// and      := equality ( '&&' equality )*
/// equality := unary ( ('===' | '!==') unary )*
/// unary    := '!' unary | primary
/// primary  := string | bool | array | '(' expr ')'
/// array    := '[' ( string ( ',' string )* )? ']'
/// ```
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExprError::TrailingInput);
    }
    Ok(expr)
}

/// Parse and evaluate in one step.
pub fn evaluate_str(input: &str) -> Result<bool, ExprError> {
    Ok(parse(input)?.evaluate())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExprError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            if self.eat(&Token::Eq) {
                let right = self.unary()?;
                left = Expr::Eq(Box::new(left), Box::new(right));
            } else if self.eat(&Token::Ne) {
                let right = self.unary()?;
                left = Expr::Ne(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next()? {
            Token::Str(text) => Ok(Expr::Literal(Value::Str(text))),
            Token::Bool(flag) => Ok(Expr::Literal(Value::Bool(flag))),
            Token::LParen => {
                let inner = self.or_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.unexpected());
                }
                Ok(inner)
            }
            Token::LBracket => self.array(),
            other => Err(ExprError::UnexpectedToken(other)),
        }
    }

    fn array(&mut self) -> Result<Expr, ExprError> {
        let mut items = Vec::new();
        if self.eat(&Token::RBracket) {
            return Ok(Expr::Literal(Value::Array(items)));
        }
        loop {
            match self.next()? {
                Token::Str(text) => items.push(text),
                other => return Err(ExprError::UnexpectedToken(other)),
            }
            if self.eat(&Token::RBracket) {
                return Ok(Expr::Literal(Value::Array(items)));
            }
            if !self.eat(&Token::Comma) {
                return Err(self.unexpected());
            }
        }
    }

    fn unexpected(&self) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::UnexpectedToken(token.clone()),
            None => ExprError::UnexpectedEnd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_equality_is_strict() {
        assert_eq!(evaluate_str(r#""a" === "a""#), Ok(true));
        assert_eq!(evaluate_str(r#""a" === "b""#), Ok(false));
        assert_eq!(evaluate_str(r#""a" !== "b""#), Ok(true));
    }

    #[test]
    fn cross_shape_equality_is_false() {
        assert_eq!(evaluate_str(r#"["a"] === "a""#), Ok(false));
        assert_eq!(evaluate_str(r#"["a"] !== "a""#), Ok(true));
        assert_eq!(evaluate_str(r#"true === "true""#), Ok(false));
    }

    #[test]
    fn array_literals_compare_elementwise() {
        assert_eq!(evaluate_str(r#"["a","b"] === ["a","b"]"#), Ok(true));
        assert_eq!(evaluate_str(r#"["a","b"] === ["b","a"]"#), Ok(false));
        assert_eq!(evaluate_str("[] === []"), Ok(true));
    }

    #[test]
    fn logical_operators_follow_precedence() {
        assert_eq!(evaluate_str("true || false && false"), Ok(true));
        assert_eq!(evaluate_str("(true || false) && false"), Ok(false));
        assert_eq!(evaluate_str("!false && true"), Ok(true));
    }

    #[test]
    fn bare_values_use_truthiness() {
        assert_eq!(evaluate_str(r#""x""#), Ok(true));
        assert_eq!(evaluate_str(r#""""#), Ok(false));
        assert_eq!(evaluate_str("[]"), Ok(false));
        assert_eq!(evaluate_str(r#"!"""#), Ok(true));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(evaluate_str("").is_err());
        assert!(evaluate_str("()").is_err());
        assert!(evaluate_str(r#""a" ==="#).is_err());
        assert!(evaluate_str(r#""a" "b""#).is_err());
        assert!(evaluate_str("[true]").is_err());
    }
}
