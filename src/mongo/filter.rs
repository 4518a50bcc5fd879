//! Lowering of filter expressions to MongoDB query documents.
//!
//! `NOT` is pushed down to the comparisons (De Morgan), where it becomes
//! `$not`. Chains of the same connective collapse into one `$and`/`$or`.

use std::mem::discriminant;

use mongodb::bson::{self, Bson, Document};

use crate::error::{StorageError, StorageResult};
use crate::filter::{CompareOp, Comparison, Expr};

/// Query operator for a comparison.
pub fn operator_token(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "$eq",
        CompareOp::Gt => "$gt",
        CompareOp::Lt => "$lt",
        CompareOp::Gte => "$gte",
        CompareOp::Lte => "$lte",
    }
}

pub fn operator_from_token(token: &str) -> Option<CompareOp> {
    CompareOp::ALL
        .into_iter()
        .find(|op| operator_token(*op) == token)
}

/// Builds the query document for `expr`.
pub fn lower(expr: &Expr) -> StorageResult<Document> {
    lower_with(expr, false)
}

fn lower_with(expr: &Expr, negated: bool) -> StorageResult<Document> {
    match (expr, negated) {
        (Expr::Not(inner), _) => lower_with(inner, !negated),
        (Expr::And(..), false) | (Expr::Or(..), true) => junction("$and", expr, negated),
        (Expr::Or(..), false) | (Expr::And(..), true) => junction("$or", expr, negated),
        (Expr::Compare(comparison), _) => compare(comparison, negated),
    }
}

fn junction(op: &str, expr: &Expr, negated: bool) -> StorageResult<Document> {
    let mut parts = Vec::new();
    operands(expr, &mut parts);
    let clauses = parts
        .into_iter()
        .map(|part| lower_with(part, negated).map(Bson::Document))
        .collect::<StorageResult<Vec<_>>>()?;

    let mut doc = Document::new();
    doc.insert(op, clauses);
    Ok(doc)
}

/// Operands of a run of the same connective, left to right.
fn operands<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::And(left, right) | Expr::Or(left, right) => {
            for side in [left.as_ref(), right.as_ref()] {
                if discriminant(side) == discriminant(expr) {
                    operands(side, out);
                } else {
                    out.push(side);
                }
            }
        }
        other => out.push(other),
    }
}

fn compare(comparison: &Comparison, negated: bool) -> StorageResult<Document> {
    let value = bson::to_bson(&comparison.value).map_err(StorageError::serialization)?;
    let mut condition = Document::new();
    condition.insert(operator_token(comparison.op), value);
    if negated {
        let mut not = Document::new();
        not.insert("$not", condition);
        condition = not;
    }

    let mut doc = Document::new();
    doc.insert(comparison.field.clone(), condition);
    Ok(doc)
}
