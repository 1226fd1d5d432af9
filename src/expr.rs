use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of an expression node that the resolver can annotate with a
/// lexical distance.
///
/// Ids are handed out from a process‑wide counter, so nodes parsed in
/// different runs (e.g. successive REPL lines) never collide in the
/// interpreter's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal; integral lexemes such as `"3"` are still `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Null,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `name <- value`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// `object.name <- value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    Literal(LiteralValue),

    /// Short‑circuiting `AND` / `OR`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix operator expression: `a + b`, `x <= y`, `a <> b`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Prefix `NOT` or `-`.
    Unary { operator: Token, right: Box<Expr> },

    /// Function, method or class call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `THIS` inside a method.
    This { id: ExprId, keyword: Token },

    /// `SUPER.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `object[i1, i2, ...]`
    GetIndex {
        object: Box<Expr>,
        /// The closing `]` token, retained for error reporting.
        brackets: Token,
        indices: Vec<Expr>,
    },

    /// `{ v1, v2, ... }`
    List(Vec<Expr>),

    /// `object[i1, i2, ...] <- value`
    SetIndex {
        object: Box<Expr>,
        brackets: Token,
        indices: Vec<Expr>,
        value: Box<Expr>,
    },
}

impl Expr {
    pub fn variable(name: Token) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }

    pub fn assign(name: Token, value: Expr) -> Self {
        Expr::Assign {
            id: ExprId::fresh(),
            name,
            value: Box::new(value),
        }
    }
}
