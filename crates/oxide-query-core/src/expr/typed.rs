//! Typed expressions, operands, placeholders and predicates.

use std::ops::{Add, Div, Mul, Rem, Sub};
use std::sync::Arc;

use super::{combine, BinaryOp, BindExpr, CompareOp, Expr, LogicalOp, ParamId};
use crate::dialect::validate_identifier;
use crate::error::SchemaError;
use crate::query::Select;
use crate::schema::{Column, ColumnKey, SetId};
use crate::types::{
    Blob, Bool, Date, DateTime, DecimalKind, Float32, Float64, Int16, Int32, Int64, Int8,
    Numeric, PersistentType, Text, Time, Timestamp, TypeRef, UuidKind, ValueKind,
};

/// An expression producing values of kind `K`.
///
/// Comparison methods accept anything convertible to an [`Operand`]: another
/// expression or column of the same kind, a [`Param`] placeholder, or a plain
/// value, which is bound using this expression's descriptor.
#[derive(Debug, Clone)]
pub struct Expression<K: ValueKind> {
    pub(crate) expr: Expr,
    pub(crate) ty: Arc<PersistentType<K>>,
}

impl<K: ValueKind> Expression<K> {
    pub(crate) const fn new(expr: Expr, ty: Arc<PersistentType<K>>) -> Self {
        Self { expr, ty }
    }

    /// Returns the descriptor of the produced values.
    #[must_use]
    pub fn descriptor(&self) -> &PersistentType<K> {
        &self.ty
    }

    /// Returns whether the expression can evaluate to NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.ty.is_nullable()
    }

    fn operand(&self, operand: impl Into<Operand<K>>) -> Box<Expr> {
        Box::new(operand.into().into_expr(&self.ty))
    }

    fn compare(&self, op: CompareOp, rhs: impl Into<Operand<K>>) -> Predicate {
        Predicate::new(Expr::Compare {
            op,
            lhs: Box::new(self.expr.clone()),
            rhs: self.operand(rhs),
        })
    }

    /// Creates an equality predicate.
    #[must_use]
    pub fn eq(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::Eq, rhs)
    }

    /// Creates an inequality predicate.
    #[must_use]
    pub fn not_eq(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::NotEq, rhs)
    }

    /// Creates a less-than predicate.
    #[must_use]
    pub fn lt(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::Lt, rhs)
    }

    /// Creates a less-than-or-equal predicate.
    #[must_use]
    pub fn lt_eq(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::LtEq, rhs)
    }

    /// Creates a greater-than predicate.
    #[must_use]
    pub fn gt(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::Gt, rhs)
    }

    /// Creates a greater-than-or-equal predicate.
    #[must_use]
    pub fn gt_eq(&self, rhs: impl Into<Operand<K>>) -> Predicate {
        self.compare(CompareOp::GtEq, rhs)
    }

    /// Creates an `IS NULL` predicate.
    #[must_use]
    pub fn is_null(&self) -> Predicate {
        Predicate::new(Expr::IsNull {
            negated: false,
            expr: Box::new(self.expr.clone()),
        })
    }

    /// Creates an `IS NOT NULL` predicate.
    #[must_use]
    pub fn is_not_null(&self) -> Predicate {
        Predicate::new(Expr::IsNull {
            negated: true,
            expr: Box::new(self.expr.clone()),
        })
    }

    fn between_impl(
        &self,
        negated: bool,
        low: impl Into<Operand<K>>,
        high: impl Into<Operand<K>>,
    ) -> Predicate {
        Predicate::new(Expr::Between {
            negated,
            expr: Box::new(self.expr.clone()),
            low: self.operand(low),
            high: self.operand(high),
        })
    }

    /// Creates a `BETWEEN` predicate (inclusive on both ends).
    #[must_use]
    pub fn between(&self, low: impl Into<Operand<K>>, high: impl Into<Operand<K>>) -> Predicate {
        self.between_impl(false, low, high)
    }

    /// Creates a `NOT BETWEEN` predicate.
    #[must_use]
    pub fn not_between(
        &self,
        low: impl Into<Operand<K>>,
        high: impl Into<Operand<K>>,
    ) -> Predicate {
        self.between_impl(true, low, high)
    }

    fn in_list_impl<I, O>(&self, negated: bool, values: I) -> Predicate
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand<K>>,
    {
        Predicate::new(Expr::InList {
            negated,
            expr: Box::new(self.expr.clone()),
            list: values
                .into_iter()
                .map(|v| v.into().into_expr(&self.ty))
                .collect(),
        })
    }

    /// Creates an `IN (...)` predicate. An empty list is always false.
    #[must_use]
    pub fn in_list<I, O>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand<K>>,
    {
        self.in_list_impl(false, values)
    }

    /// Creates a `NOT IN (...)` predicate. An empty list is always true.
    #[must_use]
    pub fn not_in_list<I, O>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand<K>>,
    {
        self.in_list_impl(true, values)
    }

    /// Creates an `IN (SELECT ...)` predicate.
    #[must_use]
    pub fn in_query(&self, query: Select) -> Predicate {
        Predicate::new(Expr::InQuery {
            negated: false,
            expr: Box::new(self.expr.clone()),
            query: Box::new(query),
        })
    }

    /// Creates a `NOT IN (SELECT ...)` predicate.
    #[must_use]
    pub fn not_in_query(&self, query: Select) -> Predicate {
        Predicate::new(Expr::InQuery {
            negated: true,
            expr: Box::new(self.expr.clone()),
            query: Box::new(query),
        })
    }

    /// Gives the expression a result label.
    pub fn labelled(&self, label: &str) -> Result<Projection<K>, SchemaError> {
        Projection::new(label, self)
    }

    fn binary(&self, op: BinaryOp, rhs: impl Into<Operand<K>>) -> Self {
        let rhs = rhs.into();
        let nullable = self.ty.is_nullable() || rhs.is_nullable();
        Self::new(
            Expr::Binary {
                op,
                lhs: Box::new(self.expr.clone()),
                rhs: Box::new(rhs.into_expr(&self.ty)),
            },
            Arc::new(self.ty.with_nullable(nullable)),
        )
    }
}

impl Expression<Text> {
    fn like_impl(&self, negated: bool, pattern: impl Into<Operand<Text>>) -> Predicate {
        Predicate::new(Expr::Like {
            negated,
            expr: Box::new(self.expr.clone()),
            pattern: self.operand(pattern),
            escape: None,
        })
    }

    /// Creates a `LIKE` predicate.
    #[must_use]
    pub fn like(&self, pattern: impl Into<Operand<Text>>) -> Predicate {
        self.like_impl(false, pattern)
    }

    /// Creates a `NOT LIKE` predicate.
    #[must_use]
    pub fn not_like(&self, pattern: impl Into<Operand<Text>>) -> Predicate {
        self.like_impl(true, pattern)
    }

    /// Creates a `LIKE ... ESCAPE ...` predicate.
    #[must_use]
    pub fn like_escape(&self, pattern: impl Into<Operand<Text>>, escape: char) -> Predicate {
        Predicate::new(Expr::Like {
            negated: false,
            expr: Box::new(self.expr.clone()),
            pattern: self.operand(pattern),
            escape: Some(self.operand(escape.to_string())),
        })
    }

    /// String concatenation (`||`).
    #[must_use]
    pub fn concat(&self, rhs: impl Into<Operand<Text>>) -> Self {
        self.binary(BinaryOp::Concat, rhs)
    }
}

impl Expression<Bool> {
    /// Uses a boolean expression directly as a predicate.
    #[must_use]
    pub fn as_predicate(&self) -> Predicate {
        Predicate::new(self.expr.clone())
    }
}

macro_rules! arithmetic {
    ($($trait:ident :: $method:ident => $op:ident),+ $(,)?) => {
        $(
            impl<K: Numeric, R: Into<Operand<K>>> $trait<R> for Expression<K> {
                type Output = Expression<K>;

                fn $method(self, rhs: R) -> Expression<K> {
                    self.binary(BinaryOp::$op, rhs)
                }
            }

            impl<K: Numeric, R: Into<Operand<K>>> $trait<R> for &Expression<K> {
                type Output = Expression<K>;

                fn $method(self, rhs: R) -> Expression<K> {
                    self.binary(BinaryOp::$op, rhs)
                }
            }

            impl<K: Numeric, R: Into<Operand<K>>> $trait<R> for &Column<K> {
                type Output = Expression<K>;

                fn $method(self, rhs: R) -> Expression<K> {
                    self.expr().binary(BinaryOp::$op, rhs)
                }
            }
        )+
    };
}

arithmetic!(
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Rem,
);

enum OperandInner<K: ValueKind> {
    Expr { expr: Expr, nullable: bool },
    Value(Option<K::Value>),
}

/// Right-hand side of a comparison or assignment.
pub struct Operand<K: ValueKind> {
    inner: OperandInner<K>,
}

impl<K: ValueKind> Operand<K> {
    /// A plain value, bound as a parameter.
    #[must_use]
    pub const fn value(value: K::Value) -> Self {
        Self {
            inner: OperandInner::Value(Some(value)),
        }
    }

    /// A NULL value, bound as a parameter.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            inner: OperandInner::Value(None),
        }
    }

    const fn expr(expr: Expr, nullable: bool) -> Self {
        Self {
            inner: OperandInner::Expr { expr, nullable },
        }
    }

    pub(crate) const fn is_nullable(&self) -> bool {
        match &self.inner {
            OperandInner::Expr { nullable, .. } => *nullable,
            OperandInner::Value(value) => value.is_none(),
        }
    }

    /// Converts to an expression node, encoding plain values with `ty`.
    pub(crate) fn into_expr(self, ty: &Arc<PersistentType<K>>) -> Expr {
        match self.inner {
            OperandInner::Expr { expr, .. } => expr,
            OperandInner::Value(value) => {
                let preset = ty.bind_value(value.as_ref());
                let ty: TypeRef = Arc::clone(ty) as TypeRef;
                Expr::Bind(BindExpr {
                    id: None,
                    ty,
                    preset: Some(preset),
                })
            }
        }
    }

    /// Converts to an expression node, encoding plain values with a
    /// nullable default descriptor of `K`.
    pub(crate) fn into_untyped(self) -> Expr {
        self.into_expr(&Arc::new(PersistentType::nullable(K::default())))
    }
}

impl<K: ValueKind> From<Expression<K>> for Operand<K> {
    fn from(e: Expression<K>) -> Self {
        let nullable = e.is_nullable();
        Self::expr(e.expr, nullable)
    }
}

impl<K: ValueKind> From<&Expression<K>> for Operand<K> {
    fn from(e: &Expression<K>) -> Self {
        Self::expr(e.expr.clone(), e.is_nullable())
    }
}

impl<K: ValueKind> From<Column<K>> for Operand<K> {
    fn from(c: Column<K>) -> Self {
        Self::from(c.expr())
    }
}

impl<K: ValueKind> From<&Column<K>> for Operand<K> {
    fn from(c: &Column<K>) -> Self {
        Self::from(c.expr())
    }
}

impl<K: ValueKind> From<Param<K>> for Operand<K> {
    fn from(p: Param<K>) -> Self {
        Self::from(&p)
    }
}

impl<K: ValueKind> From<&Param<K>> for Operand<K> {
    fn from(p: &Param<K>) -> Self {
        Self::expr(p.to_expr(), p.ty.is_nullable())
    }
}

impl<K: ValueKind> From<&Projection<K>> for Operand<K> {
    fn from(p: &Projection<K>) -> Self {
        Self::expr(Expr::Label(Arc::clone(&p.key.name)), p.ty.is_nullable())
    }
}

impl<K: ValueKind> From<Option<K::Value>> for Operand<K> {
    fn from(value: Option<K::Value>) -> Self {
        Self {
            inner: OperandInner::Value(value),
        }
    }
}

macro_rules! value_operand {
    ($($kind:ty => $value:ty),+ $(,)?) => {
        $(
            impl From<$value> for Operand<$kind> {
                fn from(value: $value) -> Self {
                    Self::value(value)
                }
            }
        )+
    };
}

value_operand!(
    Int8 => i8,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    Float32 => f32,
    Float64 => f64,
    Bool => bool,
    Text => String,
    Blob => Vec<u8>,
    DecimalKind => rust_decimal::Decimal,
    UuidKind => uuid::Uuid,
    Date => chrono::NaiveDate,
    Time => chrono::NaiveTime,
    DateTime => chrono::NaiveDateTime,
    Timestamp => chrono::DateTime<chrono::Utc>,
);

impl From<&str> for Operand<Text> {
    fn from(value: &str) -> Self {
        Self::value(value.to_owned())
    }
}

impl From<&[u8]> for Operand<Blob> {
    fn from(value: &[u8]) -> Self {
        Self::value(value.to_vec())
    }
}

/// A bind placeholder whose value is supplied at execution time.
///
/// The same token may appear several times in one statement; binding it
/// sets every position it was rendered at.
#[derive(Debug, Clone)]
pub struct Param<K: ValueKind> {
    id: ParamId,
    ty: Arc<PersistentType<K>>,
}

impl<K: ValueKind> Param<K> {
    /// Creates a non-nullable placeholder.
    #[must_use]
    pub fn new(kind: K) -> Self {
        Self::with_type(Arc::new(PersistentType::new(kind)))
    }

    /// Creates a nullable placeholder.
    #[must_use]
    pub fn nullable(kind: K) -> Self {
        Self::with_type(Arc::new(PersistentType::nullable(kind)))
    }

    pub(crate) fn with_type(ty: Arc<PersistentType<K>>) -> Self {
        Self {
            id: ParamId::next(),
            ty,
        }
    }

    /// Returns the placeholder token.
    #[must_use]
    pub const fn id(&self) -> ParamId {
        self.id
    }

    /// Returns the descriptor bound values are encoded with.
    #[must_use]
    pub fn descriptor(&self) -> &PersistentType<K> {
        &self.ty
    }

    pub(crate) fn to_expr(&self) -> Expr {
        Expr::Bind(BindExpr {
            id: Some(self.id),
            ty: Arc::clone(&self.ty) as TypeRef,
            preset: None,
        })
    }
}

/// A boolean condition.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub(crate) expr: Expr,
}

impl Predicate {
    pub(crate) const fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Combines with another predicate using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(combine(LogicalOp::And, self.expr, other.expr))
    }

    /// Combines with another predicate using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::new(combine(LogicalOp::Or, self.expr, other.expr))
    }

    /// Negates the predicate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(self.expr.negate())
    }

    /// AND of every predicate; true when empty.
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Self {
        Self::fold(LogicalOp::And, predicates)
    }

    /// OR of every predicate; false when empty.
    pub fn any(predicates: impl IntoIterator<Item = Self>) -> Self {
        Self::fold(LogicalOp::Or, predicates)
    }

    fn fold(op: LogicalOp, predicates: impl IntoIterator<Item = Self>) -> Self {
        let mut iter = predicates.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Expr::Logical {
                op,
                operands: Vec::new(),
            });
        };
        Self::new(iter.fold(first.expr, |acc, p| combine(op, acc, p.expr)))
    }

    /// Creates an `EXISTS (SELECT ...)` predicate.
    #[must_use]
    pub fn exists(query: Select) -> Self {
        Self::new(Expr::Exists {
            negated: false,
            query: Box::new(query),
        })
    }

    /// Creates a `NOT EXISTS (SELECT ...)` predicate.
    #[must_use]
    pub fn not_exists(query: Select) -> Self {
        Self::new(Expr::Exists {
            negated: true,
            query: Box::new(query),
        })
    }
}

/// An expression selected under its own label.
///
/// Projections carry their own identity so a result row can be decoded by
/// reference to the projection, just like a column.
#[derive(Debug, Clone)]
pub struct Projection<K: ValueKind> {
    pub(crate) key: ColumnKey,
    pub(crate) expr: Expr,
    pub(crate) ty: Arc<PersistentType<K>>,
}

impl<K: ValueKind> Projection<K> {
    /// Labels an expression.
    pub fn new(label: &str, expr: &Expression<K>) -> Result<Self, SchemaError> {
        validate_identifier(label)?;
        Ok(Self {
            key: ColumnKey::new(SetId::next(), label),
            expr: expr.expr.clone(),
            ty: Arc::clone(&expr.ty),
        })
    }

    /// Returns the result label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.key.name
    }
}

/// Something whose value can be read back from a result row.
pub trait Selectable<K: ValueKind> {
    /// Identity matched against the result columns of a seed.
    fn result_key(&self) -> &ColumnKey;

    /// Descriptor used to decode the value.
    fn descriptor(&self) -> &PersistentType<K>;

    /// Name used in error messages.
    fn display_name(&self) -> String {
        self.result_key().name().to_owned()
    }
}

impl<K: ValueKind> Selectable<K> for Column<K> {
    fn result_key(&self) -> &ColumnKey {
        self.column_ref().key()
    }

    fn descriptor(&self) -> &PersistentType<K> {
        &self.expr().ty
    }

    fn display_name(&self) -> String {
        self.to_string()
    }
}

impl<K: ValueKind> Selectable<K> for Projection<K> {
    fn result_key(&self) -> &ColumnKey {
        &self.key
    }

    fn descriptor(&self) -> &PersistentType<K> {
        &self.ty
    }
}
