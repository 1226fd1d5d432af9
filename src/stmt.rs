use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A `FUNCTION ... ENDFUNCTION` declaration, shared between the AST and every
/// runtime function value created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `CLASS name [INHERITS superclass] ... ENDCLASS`
    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    Expression(Expr),

    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    If {
        /// The `IF` keyword, for condition diagnostics.
        keyword: Token,
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },

    While {
        condition: Expr,
        body: Vec<Stmt>,
    },

    /// `FOR VAR name <- start TO end DO ... ENDFOR`, desugared by the parser.
    For {
        variable: Token,
        /// `Stmt::Var` declaring `variable`.
        initializer: Box<Stmt>,
        /// `variable <= end`
        condition: Expr,
        /// `variable <- variable + 1`
        increment: Expr,
        body: Vec<Stmt>,
    },

    Output(Expr),
}
