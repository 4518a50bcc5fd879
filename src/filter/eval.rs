use std::cmp::Ordering;

use serde_json::Value;

use crate::document::get_path;

use super::{CompareOp, Comparison, Expr};

impl Expr {
    /// Evaluates the expression against a stored document.
    ///
    /// Comparisons follow document-store semantics: a missing attribute or
    /// a value of another type never matches, and an array attribute
    /// matches when any element does.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Expr::And(left, right) => left.matches(doc) && right.matches(doc),
            Expr::Or(left, right) => left.matches(doc) || right.matches(doc),
            Expr::Not(inner) => !inner.matches(doc),
            Expr::Compare(comparison) => comparison.matches(doc),
        }
    }
}

impl Comparison {
    fn matches(&self, doc: &Value) -> bool {
        match get_path(doc, &self.field) {
            None => false,
            Some(Value::Array(items)) => items.iter().any(|item| self.test(item)),
            Some(value) => self.test(value),
        }
    }

    fn test(&self, stored: &Value) -> bool {
        let Some(ordering) = compare(stored, &self.value) else {
            return false;
        };
        match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

fn compare(stored: &Value, wanted: &Value) -> Option<Ordering> {
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return Some(a.cmp(&b));
            }
            if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                return Some(a.cmp(&b));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
