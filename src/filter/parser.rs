use serde_json::Value;

use crate::error::FilterError;

use super::lexer::{Spanned, Token};
use super::{CompareOp, Comparison, Expr};

/// Recursive-descent parser; placeholders are bound from `args` in order.
pub(crate) struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    args: &'a [Value],
    next_arg: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Spanned>, args: &'a [Value]) -> Self {
        Parser {
            tokens,
            pos: 0,
            args,
            next_arg: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, FilterError> {
        let placeholders = self
            .tokens
            .iter()
            .filter(|t| t.token == Token::Placeholder)
            .count();
        if placeholders != self.args.len() {
            return Err(FilterError::ArgumentCount {
                placeholders,
                arguments: self.args.len(),
            });
        }

        let expr = self.parse_or()?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(FilterError::Syntax {
                offset: extra.offset,
                message: "unexpected trailing input".to_string(),
            });
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            let close = self.advance().ok_or(FilterError::UnexpectedEnd)?;
            if close.token != Token::RParen {
                return Err(FilterError::Syntax {
                    offset: close.offset,
                    message: "expected `)`".to_string(),
                });
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, FilterError> {
        let left = self.advance().ok_or(FilterError::UnexpectedEnd)?;
        let field = match left.token {
            Token::Ident(name) => name,
            Token::Literal(_) | Token::Placeholder => {
                return Err(match self.peek() {
                    Some(Token::Op(_)) => FilterError::LeftOperandNotIdentifier,
                    _ => FilterError::NotAComparison,
                });
            }
            _ => {
                return Err(FilterError::Syntax {
                    offset: left.offset,
                    message: "expected an attribute name".to_string(),
                })
            }
        };

        let op = match self.advance() {
            Some(Spanned {
                token: Token::Op(symbol),
                ..
            }) => CompareOp::from_symbol(symbol)
                .ok_or_else(|| FilterError::UnsupportedOperator(symbol.to_string()))?,
            Some(Spanned { offset, .. }) => {
                return Err(FilterError::Syntax {
                    offset,
                    message: "expected a comparison operator".to_string(),
                })
            }
            None => return Err(FilterError::NotAComparison),
        };

        let right = self.advance().ok_or(FilterError::UnexpectedEnd)?;
        let value = match right.token {
            Token::Literal(value) => value,
            Token::Placeholder => self.bind()?,
            Token::Ident(name) => {
                return Err(FilterError::UnsupportedOperand(format!("identifier `{}`", name)))
            }
            _ => {
                return Err(FilterError::Syntax {
                    offset: right.offset,
                    message: "expected a literal or `?`".to_string(),
                })
            }
        };

        Ok(Expr::Compare(Comparison {
            field: field.to_lowercase(),
            op,
            value,
        }))
    }

    fn bind(&mut self) -> Result<Value, FilterError> {
        let arg = self
            .args
            .get(self.next_arg)
            .ok_or(FilterError::UnexpectedEnd)?;
        self.next_arg += 1;
        bind_argument(arg)
    }
}

/// Arguments bind as typed literals. A string the caller wrapped in double
/// quotes is unwrapped once.
fn bind_argument(arg: &Value) -> Result<Value, FilterError> {
    match arg {
        Value::String(s) => {
            let unquoted = s
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .filter(|_| s.len() >= 2);
            Ok(Value::String(unquoted.unwrap_or(s).to_string()))
        }
        Value::Number(_) | Value::Bool(_) => Ok(arg.clone()),
        Value::Null => Err(FilterError::UnsupportedOperand("null".to_string())),
        Value::Array(_) => Err(FilterError::UnsupportedOperand("array".to_string())),
        Value::Object(_) => Err(FilterError::UnsupportedOperand("object".to_string())),
    }
}
