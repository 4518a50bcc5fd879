//! Filter expressions for `find`.
//!
//! A small boolean language over record attributes:
//!
//! ```text
//! Age >= ? AND Star = ?
//! (Age > 30 OR Score < 5.5) AND NOT Id = "u1"
//! ```
//!
//! Attribute names are matched case-insensitively against storage names;
//! dotted names reach into embedded records. `?` placeholders bind the
//! supplied arguments in order. The compiled [`Expr`] is backend-neutral:
//! the memory backend evaluates it directly and the MongoDB backend lowers
//! it to a query document.

mod eval;
mod lexer;
mod parser;

use std::fmt;

use serde_json::Value;

use crate::error::FilterError;

/// Comparison operators accepted by the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    pub const ALL: [CompareOp; 5] = [
        CompareOp::Eq,
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Gte,
        CompareOp::Lte,
    ];

    /// Canonical symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }

    /// `=` and `==` both mean equality. Anything else, `!=` included, is
    /// not an operator of the language.
    pub fn from_symbol(symbol: &str) -> Option<CompareOp> {
        match symbol {
            "=" | "==" => Some(CompareOp::Eq),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Gte),
            "<=" => Some(CompareOp::Lte),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `field op value` with the value already bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Lowercased storage path.
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Comparison),
}

impl Expr {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Expr {
        Expr::Compare(Comparison {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

/// Compiles `expr` with positional `args`.
///
/// A blank expression matches everything and yields `None`; its arguments
/// are ignored.
pub fn compile(expr: &str, args: &[Value]) -> Result<Option<Expr>, FilterError> {
    if expr.trim().is_empty() {
        return Ok(None);
    }
    let tokens = lexer::tokenize(expr)?;
    parser::Parser::new(tokens, args).parse().map(Some)
}
