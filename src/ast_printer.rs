use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};

/// Renders the AST in parenthesised prefix form, one top-level statement
/// per line.  Used by `--emit ast` and by the parser tests.
///
/// ```text
/// VAR x <- 1 + 2      →  (var x (+ 1.0 2.0))
/// OUTPUT a[i, 0]      →  (output (index a i 0.0))
/// ```
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(" < ");
                    s.push_str(&Self::print(superclass));
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::print_function(method));
                }
                s.push(')');
                s
            }

            Stmt::Function(declaration) => Self::print_function(declaration),

            Stmt::Return { value: Some(v), .. } => format!("(return {})", Self::print(v)),

            Stmt::Return { value: None, .. } => "(return)".into(),

            Stmt::Expression(expr) => format!("(expr {})", Self::print(expr)),

            Stmt::Var {
                name,
                initializer: Some(init),
            } => format!("(var {} {})", name.lexeme, Self::print(init)),

            Stmt::Var {
                name,
                initializer: None,
            } => format!("(var {})", name.lexeme),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let mut s = format!(
                    "(if {} (then{})",
                    Self::print(condition),
                    Self::print_body(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    s.push_str(&format!(" (else{})", Self::print_body(else_branch)));
                }
                s.push(')');
                s
            }

            Stmt::While { condition, body } => format!(
                "(while {}{})",
                Self::print(condition),
                Self::print_body(body)
            ),

            Stmt::For {
                variable,
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {}{})",
                variable.lexeme,
                Self::print_stmt(initializer),
                Self::print(condition),
                Self::print(increment),
                Self::print_body(body)
            ),

            Stmt::Output(expr) => format!("(output {})", Self::print(expr)),
        }
    }

    fn print_function(declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect();

        format!(
            "(fun {} ({}){})",
            declaration.name.lexeme,
            params.join(" "),
            Self::print_body(&declaration.body)
        )
    }

    /// Space-prefixed statements, so an empty body renders as nothing.
    fn print_body(body: &[Stmt]) -> String {
        body.iter()
            .map(|stmt| format!(" {}", Self::print_stmt(stmt)))
            .collect()
    }

    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "TRUE".into(),

                LiteralValue::False => "FALSE".into(),

                LiteralValue::Null => "NULL".into(),

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(<- {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::print_list("call", Some(callee.as_ref()), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This { .. } => "THIS".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::GetIndex {
                object, indices, ..
            } => Self::print_list("index", Some(object.as_ref()), indices),

            Expr::List(values) => Self::print_list("list", None, values),

            Expr::SetIndex {
                object,
                indices,
                value,
                ..
            } => {
                let mut s = Self::print_list("set-index", Some(object.as_ref()), indices);
                s.pop();
                s.push(' ');
                s.push_str(&Self::print(value));
                s.push(')');
                s
            }
        }
    }

    fn print_list(head: &str, first: Option<&Expr>, rest: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for expr in first.into_iter().chain(rest) {
            s.push(' ');
            s.push_str(&Self::print(expr));
        }
        s.push(')');
        s
    }
}
