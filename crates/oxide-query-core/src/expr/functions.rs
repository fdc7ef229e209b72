//! SQL functions and aggregates.

use std::sync::Arc;

use super::{Expr, Expression, Operand};
use crate::types::{Float64, Int64, Numeric, PersistentType, Text, ValueKind};

fn call<K: ValueKind>(
    name: &'static str,
    distinct: bool,
    args: Vec<Expr>,
    ty: PersistentType<K>,
) -> Expression<K> {
    Expression::new(
        Expr::Function {
            name,
            distinct,
            args,
        },
        Arc::new(ty),
    )
}

/// `COUNT(*)`.
#[must_use]
pub fn count_all() -> Expression<Int64> {
    Expression::new(Expr::CountStar, Arc::new(PersistentType::new(Int64)))
}

/// `COUNT(expr)`: number of non-NULL values.
#[must_use]
pub fn count<K: ValueKind>(expr: &Expression<K>) -> Expression<Int64> {
    call("COUNT", false, vec![expr.expr.clone()], PersistentType::new(Int64))
}

/// `COUNT(DISTINCT expr)`.
#[must_use]
pub fn count_distinct<K: ValueKind>(expr: &Expression<K>) -> Expression<Int64> {
    call("COUNT", true, vec![expr.expr.clone()], PersistentType::new(Int64))
}

/// `SUM(expr)`; NULL over an empty group.
#[must_use]
pub fn sum<K: Numeric>(expr: &Expression<K>) -> Expression<K> {
    call("SUM", false, vec![expr.expr.clone()], expr.ty.with_nullable(true))
}

/// `AVG(expr)`; NULL over an empty group.
#[must_use]
pub fn avg<K: Numeric>(expr: &Expression<K>) -> Expression<Float64> {
    call("AVG", false, vec![expr.expr.clone()], PersistentType::nullable(Float64))
}

/// `MIN(expr)`; NULL over an empty group.
#[must_use]
pub fn min<K: ValueKind>(expr: &Expression<K>) -> Expression<K> {
    call("MIN", false, vec![expr.expr.clone()], expr.ty.with_nullable(true))
}

/// `MAX(expr)`; NULL over an empty group.
#[must_use]
pub fn max<K: ValueKind>(expr: &Expression<K>) -> Expression<K> {
    call("MAX", false, vec![expr.expr.clone()], expr.ty.with_nullable(true))
}

/// `ABS(expr)`.
#[must_use]
pub fn abs<K: Numeric>(expr: &Expression<K>) -> Expression<K> {
    call("ABS", false, vec![expr.expr.clone()], (*expr.ty).clone())
}

/// `LOWER(expr)`.
#[must_use]
pub fn lower(expr: &Expression<Text>) -> Expression<Text> {
    call("LOWER", false, vec![expr.expr.clone()], (*expr.ty).clone())
}

/// `UPPER(expr)`.
#[must_use]
pub fn upper(expr: &Expression<Text>) -> Expression<Text> {
    call("UPPER", false, vec![expr.expr.clone()], (*expr.ty).clone())
}

/// `LENGTH(expr)` in characters.
#[must_use]
pub fn length(expr: &Expression<Text>) -> Expression<Int64> {
    call(
        "LENGTH",
        false,
        vec![expr.expr.clone()],
        PersistentType::new(Int64).with_nullable(expr.is_nullable()),
    )
}

/// `COALESCE(expr, fallback)`; NULL only if both sides can be.
#[must_use]
pub fn coalesce<K: ValueKind>(
    expr: &Expression<K>,
    fallback: impl Into<Operand<K>>,
) -> Expression<K> {
    let fallback = fallback.into();
    let nullable = expr.is_nullable() && fallback.is_nullable();
    let args = vec![expr.expr.clone(), fallback.into_expr(&expr.ty)];
    call("COALESCE", false, args, expr.ty.with_nullable(nullable))
}

/// `CAST(expr AS type)`, declared as `target`.
#[must_use]
pub fn cast<K: ValueKind, T: ValueKind>(expr: &Expression<K>, target: T) -> Expression<T> {
    let ty = target.declared_type();
    let nullable = expr.is_nullable();
    let descriptor = PersistentType::new(target).with_nullable(nullable);
    Expression::new(
        Expr::Cast {
            expr: Box::new(expr.expr.clone()),
            ty,
        },
        Arc::new(descriptor),
    )
}
