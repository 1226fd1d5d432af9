#[cfg(test)]
mod resolver_tests {
    use pseudo::error::PseudoError;
    use pseudo::expr::{Expr, ExprId};
    use pseudo::parser::Parser;
    use pseudo::resolver::{Locals, Resolver};
    use pseudo::scanner::Scanner;
    use pseudo::stmt::Stmt;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, _) = Scanner::new(source, "test.pseudo").scan_tokens();
        let (statements, errors) = Parser::new(tokens).parse();
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        statements
    }

    fn resolve(source: &str) -> (Vec<Stmt>, Locals, Vec<PseudoError>) {
        let statements = parse(source);
        let (locals, errors) = Resolver::new().resolve(&statements);
        (statements, locals, errors)
    }

    fn messages(source: &str) -> Vec<String> {
        resolve(source).2.iter().map(|e| e.message()).collect()
    }

    /// Every `Variable` reference to `name`, in source order.
    fn references(statements: &[Stmt], name: &str) -> Vec<ExprId> {
        let mut found = Vec::new();
        for stmt in statements {
            visit_stmt(stmt, name, &mut found);
        }
        found
    }

    fn visit_stmt(stmt: &Stmt, name: &str, found: &mut Vec<ExprId>) {
        match stmt {
            Stmt::Output(expr) | Stmt::Expression(expr) => visit_expr(expr, name, found),
            Stmt::Var {
                initializer: Some(expr),
                ..
            } => visit_expr(expr, name, found),
            Stmt::Function(decl) => decl.body.iter().for_each(|s| visit_stmt(s, name, found)),
            Stmt::While { condition, body } => {
                visit_expr(condition, name, found);
                body.iter().for_each(|s| visit_stmt(s, name, found));
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.iter().for_each(|s| visit_stmt(s, name, found));
                if let Some(branch) = else_branch {
                    branch.iter().for_each(|s| visit_stmt(s, name, found));
                }
            }
            Stmt::Return {
                value: Some(expr), ..
            } => visit_expr(expr, name, found),
            _ => {}
        }
    }

    fn visit_expr(expr: &Expr, name: &str, found: &mut Vec<ExprId>) {
        match expr {
            Expr::Variable { id, name: token } if token.lexeme == name => found.push(*id),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                visit_expr(left, name, found);
                visit_expr(right, name, found);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                visit_expr(callee, name, found);
                arguments.iter().for_each(|a| visit_expr(a, name, found));
            }
            Expr::Grouping(inner) => visit_expr(inner, name, found),
            _ => {}
        }
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let source = "VAR x <- 1\n\
                      WHILE TRUE AND FALSE DO\n\
                        VAR x <- 2\n\
                        OUTPUT x\n\
                      ENDWHILE\n\
                      OUTPUT x";
        let (statements, locals, errors) = resolve(source);
        assert!(errors.is_empty());

        let ids = references(&statements, "x");
        assert_eq!(ids.len(), 2);

        // inner reference binds to the loop body's own scope
        assert_eq!(locals.get(&ids[0]), Some(&0));
        // outer reference binds to the outermost scope again
        assert_eq!(locals.get(&ids[1]), Some(&0));
    }

    #[test]
    fn test_distance_counts_enclosing_scopes() {
        let source = "VAR x <- 1\n\
                      FUNCTION f(a)\n\
                        WHILE a AND TRUE DO\n\
                          OUTPUT x + a\n\
                        ENDWHILE\n\
                      ENDFUNCTION";
        let (statements, locals, errors) = resolve(source);
        assert!(errors.is_empty());

        let x = references(&statements, "x");
        let a = references(&statements, "a");

        // body scope → function scope → outermost scope
        assert_eq!(locals.get(&x[0]), Some(&2));
        // WHILE condition sits in the function scope, body one level deeper
        assert_eq!(locals.get(&a[0]), Some(&0));
        assert_eq!(locals.get(&a[1]), Some(&1));
    }

    #[test]
    fn test_unknown_names_are_global() {
        let (statements, locals, errors) = resolve("OUTPUT later");
        assert!(errors.is_empty());

        let ids = references(&statements, "later");
        assert_eq!(locals.get(&ids[0]), None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let statements = parse("VAR y <- 1\nFUNCTION g()\n OUTPUT y\nENDFUNCTION");

        let (first, _) = Resolver::new().resolve(&statements);
        let (second, _) = Resolver::new().resolve(&statements);

        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_declaration() {
        assert_eq!(
            messages("FUNCTION f()\n VAR a\n VAR a\nENDFUNCTION"),
            vec!["Variable with this name is already declared in this scope"]
        );
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            messages("FUNCTION f()\n VAR a <- a\nENDFUNCTION"),
            vec!["Cannot read local variable in its own initializer"]
        );
    }

    #[test]
    fn test_misplaced_keywords() {
        assert_eq!(
            messages("RETURN 1"),
            vec!["Cannot return from outside a function"]
        );
        assert_eq!(
            messages("OUTPUT THIS"),
            vec!["Cannot use 'THIS' outside of a class"]
        );
        assert_eq!(
            messages("OUTPUT SUPER.m"),
            vec!["Cannot use 'SUPER' outside of a class"]
        );
        assert_eq!(
            messages("CLASS A\n FUNCTION m()\n RETURN SUPER.m\n ENDFUNCTION\nENDCLASS"),
            vec!["Cannot use 'SUPER' in a class with no super class"]
        );
    }

    #[test]
    fn test_constructor_cannot_return_value() {
        assert_eq!(
            messages("CLASS A\n FUNCTION A()\n RETURN 1\n ENDFUNCTION\nENDCLASS"),
            vec!["Cannot return a value from a constructor"]
        );
        // a bare RETURN is fine
        assert!(messages("CLASS A\n FUNCTION A()\n RETURN\n ENDFUNCTION\nENDCLASS").is_empty());
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        assert_eq!(
            messages("CLASS A INHERITS A\nENDCLASS"),
            vec!["A class cannot inherit from itself"]
        );
    }

    #[test]
    fn test_errors_are_accumulated() {
        let errors = resolve("RETURN\nOUTPUT THIS").2;

        let lines: Vec<Option<usize>> = errors.iter().map(|e| e.line()).collect();
        assert_eq!(lines, vec![Some(1), Some(2)]);
        assert!(errors[0].to_string().starts_with("File: test.pseudo, Line: 1, Where: RETURN"));
    }
}
