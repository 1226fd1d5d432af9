//! Static resolver pass for the **pseudocode** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `THIS` / `SUPER` / `RETURN`).
//! 3. Record, for *each* variable occurrence, whether it's a local (and at what
//!    distance) or a global, so the interpreter never falls back to dynamic
//!    lookup that would see a later shadowing local.
//!
//! Scopes are pushed exactly where the interpreter creates environments:
//!
//! | Construct              | Scopes                                   |
//! |------------------------|------------------------------------------|
//! | program                | one outermost scope holding the builtins |
//! | function / method body | parameters + body                        |
//! | class                  | `SUPER` (only with a superclass), `THIS` |
//! | `IF` / `ELSE` branch   | one per branch                           |
//! | `WHILE` body           | one                                      |
//! | `FOR`                  | loop variable, then one for the body     |

use crate::builtins;
use crate::error::PseudoError;
use crate::expr::{Expr, ExprId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Lexical-address table: resolved expression → number of environments
/// between its use and its binding.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `RETURN`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Constructor,
}

/// What kind of class body are we in?  Used to validate `THIS` / `SUPER`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances into a [`Locals`] table.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    locals: Locals,
    errors: Vec<PseudoError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements inside the outermost (global) scope.
    pub fn resolve(mut self, statements: &[Stmt]) -> (Locals, Vec<PseudoError>) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.begin_scope();

        if let Some(globals) = self.scopes.last_mut() {
            for builtin in builtins::BUILTINS.iter() {
                globals.insert(builtin.name.to_string(), true);
            }
        }

        self.resolve_statements(statements);
        self.end_scope();

        info!(
            "Resolved {} local reference(s) with {} error(s)",
            self.locals.len(),
            self.errors.len()
        );

        (self.locals, self.errors)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    /// Resolve a block body inside its own scope.
    fn resolve_body(&mut self, statements: &[Stmt]) {
        self.begin_scope();
        self.resolve_statements(statements);
        self.end_scope();
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", std::mem::discriminant(stmt));

        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name);
                self.define(name);

                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                if let Some(superclass) = superclass {
                    if let Expr::Variable {
                        name: super_name, ..
                    } = superclass
                    {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class cannot inherit from itself");
                        }
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass);

                    self.begin_scope();
                    self.bind_keyword("SUPER");
                }

                self.begin_scope();
                self.bind_keyword("THIS");

                for method in methods {
                    let kind = if method.name.lexeme == name.lexeme {
                        FunctionType::Constructor
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, kind);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }

            Stmt::Function(declaration) => {
                // name is visible *inside* its own body (recursion)
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from outside a function");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Constructor {
                        self.error(keyword, "Cannot return a value from a constructor");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Expression(expr) | Stmt::Output(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_expr(condition);
                self.resolve_body(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_body(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_body(body);
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
                ..
            } => {
                // loop-variable scope, then one body scope per iteration
                self.begin_scope();
                self.resolve_stmt(initializer);
                self.resolve_expr(condition);
                self.resolve_expr(increment);
                self.resolve_body(body);
                self.end_scope();
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Cannot read local variable in its own initializer");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'THIS' outside of a class");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Cannot use 'SUPER' outside of a class");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Cannot use 'SUPER' in a class with no super class");
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }

            Expr::GetIndex {
                object, indices, ..
            } => {
                self.resolve_expr(object);
                for index in indices {
                    self.resolve_expr(index);
                }
            }

            Expr::List(values) => {
                for value in values {
                    self.resolve_expr(value);
                }
            }

            Expr::SetIndex {
                object,
                indices,
                value,
                ..
            } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
                for index in indices {
                    self.resolve_expr(index);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind_keyword(&mut self, keyword: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(keyword.to_string(), true);
        }
    }

    fn declare(&mut self, name: &Token) {
        let duplicate: bool = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
            None => false,
        };

        if duplicate {
            self.error(
                name,
                "Variable with this name is already declared in this scope",
            );
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(PseudoError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at distance `d`, or leave it out of
    /// the table (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at distance {}", name.lexeme, distance);
                self.locals.insert(id, distance);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
