//! Expression tree.
//!
//! Every SQL fragment this crate can emit is a variant of the closed [`Expr`]
//! enum, so rendering and placeholder registration are exhaustive matches.
//! The typed surface in [`typed`] wraps these nodes with the descriptor of
//! the value they produce.

mod functions;
mod typed;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ConversionError;
use crate::query::Select;
use crate::render::RenderCtx;
use crate::schema::ColumnRef;
use crate::types::TypeRef;
use crate::value::SqlValue;

pub use functions::{
    abs, avg, cast, coalesce, count, count_all, count_distinct, length, lower, max, min, sum,
    upper,
};
pub use typed::{Expression, Operand, Param, Predicate, Projection, Selectable};

/// Token identifying one bind placeholder across renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Boolean combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    const fn separator(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    /// Value of the combinator over zero operands.
    const fn identity(self) -> &'static str {
        match self {
            Self::And => "TRUE",
            Self::Or => "FALSE",
        }
    }
}

/// Arithmetic and string operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
}

impl BinaryOp {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Concat => "||",
        }
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
            Self::Concat => 7,
        }
    }
}

/// A bind placeholder: an explicit [`Param`] token or a value preset by the
/// query itself.
#[derive(Debug, Clone)]
pub(crate) struct BindExpr {
    pub(crate) id: Option<ParamId>,
    pub(crate) ty: TypeRef,
    pub(crate) preset: Option<Result<SqlValue, ConversionError>>,
}

const ATOM: u8 = 10;
const PREDICATE: u8 = 4;

/// An untyped expression node.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Column(ColumnRef),
    /// Unqualified reference to a result label.
    Label(std::sync::Arc<str>),
    Bind(BindExpr),
    Keyword(&'static str),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Like {
        negated: bool,
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
    },
    IsNull {
        negated: bool,
        expr: Box<Expr>,
    },
    Between {
        negated: bool,
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        negated: bool,
        expr: Box<Expr>,
        list: Vec<Expr>,
    },
    InQuery {
        negated: bool,
        expr: Box<Expr>,
        query: Box<Select>,
    },
    Exists {
        negated: bool,
        query: Box<Select>,
    },
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Function {
        name: &'static str,
        distinct: bool,
        args: Vec<Expr>,
    },
    CountStar,
    Cast {
        expr: Box<Expr>,
        ty: &'static str,
    },
    Subquery(Box<Select>),
}

impl Expr {
    /// Binding strength; operands weaker than their context get parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Self::Logical {
                op: LogicalOp::Or, ..
            } => 1,
            Self::Logical {
                op: LogicalOp::And,
                ..
            } => 2,
            Self::Not(_) | Self::Exists { negated: true, .. } => 3,
            Self::Compare { .. }
            | Self::Like { .. }
            | Self::IsNull { .. }
            | Self::Between { .. }
            | Self::InList { .. }
            | Self::InQuery { .. } => PREDICATE,
            Self::Binary { op, .. } => op.precedence(),
            _ => ATOM,
        }
    }

    /// Logically negates the node, flipping negatable predicates in place.
    pub(crate) fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            Self::Like {
                negated,
                expr,
                pattern,
                escape,
            } => Self::Like {
                negated: !negated,
                expr,
                pattern,
                escape,
            },
            Self::IsNull { negated, expr } => Self::IsNull {
                negated: !negated,
                expr,
            },
            Self::Between {
                negated,
                expr,
                low,
                high,
            } => Self::Between {
                negated: !negated,
                expr,
                low,
                high,
            },
            Self::InList {
                negated,
                expr,
                list,
            } => Self::InList {
                negated: !negated,
                expr,
                list,
            },
            Self::InQuery {
                negated,
                expr,
                query,
            } => Self::InQuery {
                negated: !negated,
                expr,
                query,
            },
            Self::Exists { negated, query } => Self::Exists {
                negated: !negated,
                query,
            },
            other => Self::Not(Box::new(other)),
        }
    }

    /// Appends the node to `out`, registering placeholders in `ctx`.
    pub(crate) fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        match self {
            Self::Column(column) => {
                ctx.check_scope(column);
                ctx.qualified(out, column.qualifier(), column.name());
            }
            Self::Label(label) => ctx.identifier(out, label),
            Self::Bind(bind) => ctx.placeholder(out, bind.id, &bind.ty, bind.preset.as_ref()),
            Self::Keyword(keyword) => out.push_str(keyword),
            Self::Compare { op, lhs, rhs } => {
                lhs.render_within(PREDICATE, ctx, out);
                out.push(' ');
                out.push_str(op.as_sql());
                out.push(' ');
                rhs.render_within(PREDICATE, ctx, out);
            }
            Self::Like {
                negated,
                expr,
                pattern,
                escape,
            } => {
                expr.render_within(PREDICATE, ctx, out);
                out.push_str(if *negated { " NOT LIKE " } else { " LIKE " });
                pattern.render_within(PREDICATE, ctx, out);
                if let Some(escape) = escape {
                    out.push_str(" ESCAPE ");
                    escape.render_within(PREDICATE, ctx, out);
                }
            }
            Self::IsNull { negated, expr } => {
                expr.render_within(PREDICATE, ctx, out);
                out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::Between {
                negated,
                expr,
                low,
                high,
            } => {
                expr.render_within(PREDICATE, ctx, out);
                out.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                low.render_within(PREDICATE, ctx, out);
                out.push_str(" AND ");
                high.render_within(PREDICATE, ctx, out);
            }
            Self::InList {
                negated,
                expr,
                list,
            } => {
                if list.is_empty() {
                    // Nothing is a member of the empty set.
                    out.push_str(if *negated { "TRUE" } else { "FALSE" });
                    return;
                }
                expr.render_within(PREDICATE, ctx, out);
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(ctx, out);
                }
                out.push(')');
            }
            Self::InQuery {
                negated,
                expr,
                query,
            } => {
                expr.render_within(PREDICATE, ctx, out);
                out.push_str(if *negated { " NOT IN " } else { " IN " });
                query.render_nested(ctx, out);
            }
            Self::Exists { negated, query } => {
                out.push_str(if *negated { "NOT EXISTS " } else { "EXISTS " });
                query.render_nested(ctx, out);
            }
            Self::Logical { op, operands } => {
                if operands.is_empty() {
                    out.push_str(op.identity());
                    return;
                }
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        out.push_str(op.separator());
                    }
                    let nested = matches!(operand, Self::Logical { op: inner, .. } if inner != op);
                    if nested {
                        out.push('(');
                        operand.render(ctx, out);
                        out.push(')');
                    } else {
                        operand.render(ctx, out);
                    }
                }
            }
            Self::Not(inner) => {
                out.push_str("NOT ");
                inner.render_within(ATOM - 1, ctx, out);
            }
            Self::Binary { op, lhs, rhs } => {
                let precedence = op.precedence();
                lhs.render_within(precedence - 1, ctx, out);
                out.push(' ');
                out.push_str(op.as_sql());
                out.push(' ');
                rhs.render_within(precedence, ctx, out);
            }
            Self::Function {
                name,
                distinct,
                args,
            } => {
                out.push_str(name);
                out.push('(');
                if *distinct {
                    out.push_str("DISTINCT ");
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.render(ctx, out);
                }
                out.push(')');
            }
            Self::CountStar => out.push_str("COUNT(*)"),
            Self::Cast { expr, ty } => {
                out.push_str("CAST(");
                expr.render(ctx, out);
                out.push_str(" AS ");
                out.push_str(ty);
                out.push(')');
            }
            Self::Subquery(query) => query.render_nested(ctx, out),
        }
    }

    /// Calls `f` for every column the node references, without entering
    /// nested queries.
    pub(crate) fn for_each_column(&self, f: &mut dyn FnMut(&ColumnRef)) {
        match self {
            Self::Column(column) => f(column),
            Self::Label(_)
            | Self::Bind(_)
            | Self::Keyword(_)
            | Self::CountStar
            | Self::Exists { .. }
            | Self::Subquery(_) => {}
            Self::Compare { lhs, rhs, .. } | Self::Binary { lhs, rhs, .. } => {
                lhs.for_each_column(f);
                rhs.for_each_column(f);
            }
            Self::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                expr.for_each_column(f);
                pattern.for_each_column(f);
                if let Some(escape) = escape {
                    escape.for_each_column(f);
                }
            }
            Self::IsNull { expr, .. }
            | Self::InQuery { expr, .. }
            | Self::Not(expr)
            | Self::Cast { expr, .. } => expr.for_each_column(f),
            Self::Between {
                expr, low, high, ..
            } => {
                expr.for_each_column(f);
                low.for_each_column(f);
                high.for_each_column(f);
            }
            Self::InList { expr, list, .. } => {
                expr.for_each_column(f);
                for item in list {
                    item.for_each_column(f);
                }
            }
            Self::Logical { operands, .. } | Self::Function { args: operands, .. } => {
                for operand in operands {
                    operand.for_each_column(f);
                }
            }
        }
    }

    /// Renders the node, parenthesised when it binds no tighter than `level`.
    fn render_within(&self, level: u8, ctx: &mut RenderCtx<'_>, out: &mut String) {
        if self.precedence() <= level {
            out.push('(');
            self.render(ctx, out);
            out.push(')');
        } else {
            self.render(ctx, out);
        }
    }
}

/// Combines two predicates, merging operands of the same combinator.
pub(crate) fn combine(op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
    let mut operands = Vec::new();
    push_flat(op, lhs, &mut operands);
    push_flat(op, rhs, &mut operands);
    Expr::Logical { op, operands }
}

fn push_flat(op: LogicalOp, expr: Expr, operands: &mut Vec<Expr>) {
    match expr {
        Expr::Logical {
            op: inner,
            operands: nested,
        } if inner == op => operands.extend(nested),
        other => operands.push(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::render::RenderOptions;
    use crate::types::{Int64, PersistentType};

    fn keyword(k: &'static str) -> Expr {
        Expr::Keyword(k)
    }

    fn cmp(lhs: &'static str, rhs: &'static str) -> Expr {
        Expr::Compare {
            op: CompareOp::Eq,
            lhs: Box::new(keyword(lhs)),
            rhs: Box::new(keyword(rhs)),
        }
    }

    fn render(expr: &Expr) -> String {
        let options = RenderOptions::default();
        let mut ctx = RenderCtx::new(&options);
        let mut out = String::new();
        expr.render(&mut ctx, &mut out);
        out
    }

    #[test]
    fn test_and_chain_flattens_either_association() {
        let left = combine(
            LogicalOp::And,
            combine(LogicalOp::And, cmp("a", "1"), cmp("b", "2")),
            cmp("c", "3"),
        );
        let right = combine(
            LogicalOp::And,
            cmp("a", "1"),
            combine(LogicalOp::And, cmp("b", "2"), cmp("c", "3")),
        );
        assert_eq!(render(&left), "a = 1 AND b = 2 AND c = 3");
        assert_eq!(render(&left), render(&right));
    }

    #[test]
    fn test_mixed_combinators_get_parentheses() {
        let or = combine(LogicalOp::Or, cmp("a", "1"), cmp("b", "2"));
        let and = combine(LogicalOp::And, or, cmp("c", "3"));
        assert_eq!(render(&and), "(a = 1 OR b = 2) AND c = 3");

        let outer = combine(LogicalOp::Or, and, cmp("d", "4"));
        assert_eq!(render(&outer), "((a = 1 OR b = 2) AND c = 3) OR d = 4");
    }

    #[test]
    fn test_combinator_inside_comparison() {
        let or = combine(LogicalOp::Or, keyword("x"), keyword("y"));
        let expr = Expr::Compare {
            op: CompareOp::Eq,
            lhs: Box::new(or),
            rhs: Box::new(keyword("FALSE")),
        };
        assert_eq!(render(&expr), "(x OR y) = FALSE");
    }

    #[test]
    fn test_not_wraps_compound_operands() {
        let and = combine(LogicalOp::And, cmp("a", "1"), cmp("b", "2"));
        assert_eq!(render(&and.negate()), "NOT (a = 1 AND b = 2)");
        assert_eq!(render(&cmp("a", "1").negate()), "NOT (a = 1)");
        assert_eq!(render(&keyword("flag").negate().negate()), "flag");
    }

    #[test]
    fn test_empty_membership() {
        let member = Expr::InList {
            negated: false,
            expr: Box::new(keyword("a")),
            list: Vec::new(),
        };
        assert_eq!(render(&member), "FALSE");
        assert_eq!(render(&member.negate()), "TRUE");
    }

    #[test]
    fn test_binary_associativity() {
        let sub = |lhs, rhs| Expr::Binary {
            op: BinaryOp::Sub,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        let left = sub(sub(keyword("a"), keyword("b")), keyword("c"));
        let right = sub(keyword("a"), sub(keyword("b"), keyword("c")));
        assert_eq!(render(&left), "a - b - c");
        assert_eq!(render(&right), "a - (b - c)");

        let mul = Expr::Binary {
            op: BinaryOp::Mul,
            lhs: Box::new(sub(keyword("a"), keyword("b"))),
            rhs: Box::new(keyword("c")),
        };
        assert_eq!(render(&mul), "(a - b) * c");
    }

    #[test]
    fn test_bind_registers_placeholder() {
        let ty: TypeRef = Arc::new(PersistentType::new(Int64));
        let expr = Expr::Between {
            negated: true,
            expr: Box::new(keyword("n")),
            low: Box::new(Expr::Bind(BindExpr {
                id: None,
                ty: Arc::clone(&ty),
                preset: Some(Ok(SqlValue::Integer(1))),
            })),
            high: Box::new(Expr::Bind(BindExpr {
                id: Some(ParamId::next()),
                ty,
                preset: None,
            })),
        };
        let options = RenderOptions::default();
        let mut ctx = RenderCtx::new(&options);
        let mut out = String::new();
        expr.render(&mut ctx, &mut out);
        assert_eq!(out, "n NOT BETWEEN ? AND ?");
        assert_eq!(ctx.param_count(), 2);
    }
}
