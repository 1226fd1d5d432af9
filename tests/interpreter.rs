#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    use pseudo::error::PseudoError;
    use pseudo::interpreter::Interpreter;
    use pseudo::session::{Report, Session, Status};
    use pretty_assertions::assert_eq;

    /// In-memory program output that stays readable after the interpreter
    /// takes ownership of its writer.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session_with_input(input: &str) -> (Session, SharedBuffer) {
        let output = SharedBuffer::default();
        let interpreter = Interpreter::with_io(
            Box::new(output.clone()),
            Box::new(Cursor::new(input.as_bytes().to_vec())),
        );

        (Session::with_interpreter(interpreter), output)
    }

    fn run_with_input(source: &str, input: &str) -> (String, Report) {
        let (mut session, output) = session_with_input(input);
        let report = session.run(source, "test.pseudo");

        (output.contents(), report)
    }

    fn run(source: &str) -> (String, Report) {
        run_with_input(source, "")
    }

    /// Output of a program that must succeed.
    fn output_of(source: &str) -> String {
        let (output, report) = run(source);
        assert!(
            report.is_success(),
            "program failed: {:?}",
            report.diagnostics
        );
        output
    }

    /// The single runtime error message of a failing program.
    fn runtime_error(source: &str) -> String {
        let (_, report) = run(source);
        assert_eq!(report.status, Status::RuntimeError);
        assert_eq!(report.diagnostics.len(), 1);
        report.diagnostics[0].message()
    }

    // ─────────────────────────── end to end ───────────────────────────

    #[test]
    fn test_simple_program_succeeds() {
        let (output, report) = run("VAR x <- 1\nOUTPUT x + 2");

        assert_eq!(output, "3\n");
        assert_eq!(report.status, Status::Success);
        assert_eq!(report.status.exit_code(), 0);
    }

    #[test]
    fn test_syntax_error_exits_65() {
        let (output, report) = run("VAR x <- 1 +");

        assert_eq!(output, "");
        assert_eq!(report.status, Status::StaticError);
        assert_eq!(report.status.exit_code(), 65);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_undefined_variable_exits_70() {
        let (_, report) = run("OUTPUT y");

        assert_eq!(report.status, Status::RuntimeError);
        assert_eq!(report.status.exit_code(), 70);
        assert_eq!(
            report.diagnostics[0].to_string(),
            "File: test.pseudo, Line: 1, Where: y, Message: Undefined variable 'y'."
        );
    }

    #[test]
    fn test_two_syntax_errors_reported_together() {
        let (_, report) = run("OUTPUT (1 +\nVAR ok <- 1\nOUTPUT *\nOUTPUT ok");

        assert_eq!(report.status, Status::StaticError);
        let lines: Vec<Option<usize>> = report.diagnostics.iter().map(|e| e.line()).collect();
        assert_eq!(lines, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_lexical_errors_stop_before_parsing() {
        let (_, report) = run("OUTPUT 1 $\nOUTPUT (\nOUTPUT 2 #");

        assert_eq!(report.status, Status::StaticError);
        let messages: Vec<String> = report.diagnostics.iter().map(|e| e.message()).collect();
        assert_eq!(
            messages,
            vec!["Unexpected character '$'", "Unexpected character '#'"]
        );
    }

    #[test]
    fn test_resolution_errors_prevent_execution() {
        let (output, report) = run("OUTPUT 1\nRETURN 2");

        assert_eq!(output, "");
        assert_eq!(report.status, Status::StaticError);
    }

    #[test]
    fn test_first_runtime_error_aborts_run() {
        let (output, report) = run("OUTPUT 1\nOUTPUT missing\nOUTPUT 2");

        assert_eq!(output, "1\n");
        assert_eq!(report.status, Status::RuntimeError);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_globals_persist_across_runs() {
        let (mut session, output) = session_with_input("");

        assert!(session.run("VAR x <- 41", "INTERPRETER").is_success());
        assert!(session
            .run("FUNCTION next()\n RETURN x + 1\nENDFUNCTION", "INTERPRETER")
            .is_success());
        assert!(session.run("OUTPUT next()", "INTERPRETER").is_success());
        // an error on one line does not poison the next
        assert!(!session.run("OUTPUT nope", "INTERPRETER").is_success());
        assert!(session.run("OUTPUT x", "INTERPRETER").is_success());

        assert_eq!(output.contents(), "42\n41\n");
    }

    // ─────────────────────────── scoping ───────────────────────────

    #[test]
    fn test_closure_captures_each_loop_iteration() {
        let source = r#"
VAR fns <- {}
FOR VAR i <- 1 TO 3 DO
  FUNCTION show()
    RETURN i
  ENDFUNCTION
  fns <- APPEND(fns, show)
ENDFOR
VAR first <- fns[0]
VAR last <- fns[2]
OUTPUT first()
OUTPUT last()
"#;

        assert_eq!(output_of(source), "1\n3\n");
    }

    #[test]
    fn test_loop_variable_is_scoped_to_loop() {
        assert_eq!(
            output_of("FOR VAR i <- 1 TO 3 DO\n OUTPUT i\nENDFOR"),
            "1\n2\n3\n"
        );
        assert_eq!(
            runtime_error("FOR VAR i <- 1 TO 2 DO\nENDFOR\nOUTPUT i"),
            "Undefined variable 'i'"
        );
        // an empty range never runs the body
        assert_eq!(output_of("FOR VAR i <- 5 TO 1 DO\n OUTPUT i\nENDFOR"), "");
    }

    #[test]
    fn test_shadowing_restores_outer_binding() {
        let source = r#"
VAR x <- "outer"
IF TRUE AND TRUE THEN
  VAR x <- "inner"
  OUTPUT x
ENDIF
OUTPUT x
"#;

        assert_eq!(output_of(source), "inner\nouter\n");
    }

    #[test]
    fn test_function_sees_declaration_scope_not_call_scope() {
        let source = r#"
VAR a <- "global"
FUNCTION outer()
  FUNCTION show()
    OUTPUT a
  ENDFUNCTION
  show()
  VAR a <- "local"
  show()
ENDFUNCTION
outer()
"#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_closure_counter() {
        let source = r#"
FUNCTION makeCounter()
  VAR count <- 0
  FUNCTION increment()
    count <- count + 1
    RETURN count
  ENDFUNCTION
  RETURN increment
ENDFUNCTION
VAR counter <- makeCounter()
counter()
OUTPUT counter()
"#;

        assert_eq!(output_of(source), "2\n");
    }

    #[test]
    fn test_recursion_and_early_return() {
        let source = r#"
FUNCTION fib(n)
  IF n < 2 OR FALSE THEN
    RETURN n
  ENDIF
  RETURN fib(n - 1) + fib(n - 2)
ENDFUNCTION
OUTPUT fib(10)
"#;

        assert_eq!(output_of(source), "55\n");
    }

    #[test]
    fn test_return_from_inside_loops() {
        let source = r#"
FUNCTION find(list, wanted)
  FOR VAR i <- 0 TO LENGTH(list) - 1 DO
    WHILE TRUE DO
      IF list[i] = wanted AND TRUE THEN
        RETURN i
      ENDIF
      RETURN NULL
    ENDWHILE
  ENDFOR
ENDFUNCTION
OUTPUT find({4, 5, 6}, 4)
OUTPUT find({4, 5, 6}, 9)
"#;

        assert_eq!(output_of(source), "0\nNULL\n");
    }

    // ─────────────────────────── operators ───────────────────────────

    #[test]
    fn test_arithmetic_and_stringification() {
        assert_eq!(
            output_of("OUTPUT 7 / 2\nOUTPUT 2 * 3 - 10\nOUTPUT -(1.5)\nOUTPUT \"ab\" + \"cd\""),
            "3.5\n-4\n-1.5\nabcd\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        let source = r#"
OUTPUT NULL OR "fallback"
OUTPUT 0 AND "zero is truthy"
OUTPUT FALSE AND never_evaluated
OUTPUT NOT ""
OUTPUT NOT NULL
"#;

        assert_eq!(
            output_of(source),
            "fallback\nzero is truthy\nFALSE\nFALSE\nTRUE\n"
        );
    }

    #[test]
    fn test_equality_without_coercion() {
        let source = r#"
OUTPUT 1 = "1"
OUTPUT {1, {2}} = {1, {2}}
OUTPUT NULL = NULL
OUTPUT 2 <> 3
OUTPUT TRUE = 1
OUTPUT STR = STR
"#;

        assert_eq!(output_of(source), "FALSE\nTRUE\nTRUE\nTRUE\nFALSE\nTRUE\n");
    }

    #[test]
    fn test_operand_type_errors() {
        assert_eq!(runtime_error("OUTPUT \"a\" - 1"), "Operands must be numbers");
        assert_eq!(runtime_error("OUTPUT 1 < \"2\""), "Operands must be numbers");
        assert_eq!(
            runtime_error("OUTPUT 1 + \"a\""),
            "Operands must be two numbers, two strings or two lists"
        );
        assert_eq!(runtime_error("OUTPUT -\"a\""), "Operand must be a number");
        assert_eq!(runtime_error("OUTPUT 1 / 0"), "Division by zero");
    }

    #[test]
    fn test_if_condition_checks() {
        let (_, report) = run("IF 1 < 2 THEN\n OUTPUT 1\nENDIF");
        assert_eq!(report.status, Status::StaticError);
        assert_eq!(
            report.diagnostics[0].message(),
            "Expect logical expression as condition"
        );

        assert_eq!(
            output_of("IF 1 < 2 AND 2 < 1 THEN\n OUTPUT 1\nELSE\n OUTPUT 2\nENDIF"),
            "2\n"
        );
    }

    // ─────────────────────────── calls ───────────────────────────

    #[test]
    fn test_arity_is_exact() {
        assert_eq!(
            runtime_error("FUNCTION f(a)\nENDFUNCTION\nf(1, 2)"),
            "Expected 1 arguments, but got 2 arguments"
        );
        assert_eq!(
            runtime_error("OUTPUT LENGTH()"),
            "Expected 1 arguments, but got 0 arguments"
        );
    }

    #[test]
    fn test_only_callables_can_be_called() {
        assert_eq!(
            runtime_error("VAR x <- 3\nx()"),
            "Can only call functions and classes"
        );
    }

    #[test]
    fn test_function_without_return_yields_null() {
        assert_eq!(
            output_of("FUNCTION f()\nENDFUNCTION\nOUTPUT f()\nOUTPUT f"),
            "NULL\n<FUNCTION f>\n"
        );
    }

    // ─────────────────────────── classes ───────────────────────────

    #[test]
    fn test_constructor_fields_and_methods() {
        let source = r#"
CLASS Point
  FUNCTION Point(x, y)
    THIS.x <- x
    THIS.y <- y
    RETURN
  ENDFUNCTION
  FUNCTION sum()
    RETURN THIS.x + THIS.y
  ENDFUNCTION
ENDCLASS
VAR p <- Point(2, 3)
OUTPUT p.sum()
OUTPUT p
OUTPUT Point
VAR again <- p.Point(7, 8)
OUTPUT again = p
OUTPUT p.x
"#;

        assert_eq!(
            output_of(source),
            "5\n<CLASS Point> instance\n<CLASS Point>\nTRUE\n7\n"
        );
    }

    #[test]
    fn test_bound_method_keeps_instance() {
        let source = r#"
CLASS Greeter
  FUNCTION Greeter(name)
    THIS.name <- name
  ENDFUNCTION
  FUNCTION greet()
    OUTPUT "Hello, " + THIS.name
  ENDFUNCTION
ENDCLASS
VAR method <- Greeter("Ada").greet
method()
"#;

        assert_eq!(output_of(source), "Hello, Ada\n");
    }

    #[test]
    fn test_super_dispatch_through_deep_chain() {
        let source = r#"
CLASS A
  FUNCTION describe()
    RETURN "A"
  ENDFUNCTION
ENDCLASS
CLASS B INHERITS A
  FUNCTION describe()
    RETURN "B>" + SUPER.describe()
  ENDFUNCTION
ENDCLASS
CLASS C INHERITS B
  FUNCTION describe()
    RETURN "C>" + SUPER.describe()
  ENDFUNCTION
ENDCLASS
CLASS D INHERITS C
ENDCLASS
OUTPUT D().describe()
OUTPUT C().describe()
OUTPUT B().describe()
"#;

        assert_eq!(output_of(source), "C>B>A\nC>B>A\nB>A\n");
    }

    #[test]
    fn test_class_errors() {
        assert_eq!(
            runtime_error("VAR NotAClass <- 1\nCLASS A INHERITS NotAClass\nENDCLASS"),
            "Super class must be a class"
        );
        assert_eq!(
            runtime_error("CLASS A\nENDCLASS\nOUTPUT A().missing"),
            "Undefined property 'missing'"
        );
        assert_eq!(
            runtime_error("VAR n <- 1\nOUTPUT n.field"),
            "Only instances have properties"
        );
        assert_eq!(
            runtime_error("CLASS A\nENDCLASS\nVAR a <- A()\na()"),
            "Can only call functions and classes"
        );
    }

    // ─────────────────────────── lists ───────────────────────────

    #[test]
    fn test_lists_alias_on_assignment() {
        let source = r#"
VAR a <- {1, 2}
VAR b <- a
b[0] <- 9
OUTPUT a
VAR c <- APPEND(a, 3)
c[1] <- 0
OUTPUT a
OUTPUT c
OUTPUT {1} + {2, 3}
"#;

        assert_eq!(output_of(source), "{9, 2}\n{9, 2}\n{9, 0, 3}\n{1, 2, 3}\n");
    }

    #[test]
    fn test_nested_indexing() {
        let source = r#"
VAR grid <- {{1, 2}, {3, 4}}
OUTPUT grid[1, 0]
OUTPUT grid[1][1]
grid[0, 1] <- 7
OUTPUT grid
OUTPUT LENGTH(grid) + LENGTH("héllo")
OUTPUT {}
"#;

        assert_eq!(output_of(source), "3\n4\n{{1, 7}, {3, 4}}\n7\n{}\n");
    }

    #[test]
    fn test_index_errors() {
        assert_eq!(
            runtime_error("VAR l <- {1}\nOUTPUT l[1]"),
            "Index not in range. length: '1', Index: '1'"
        );
        assert_eq!(
            runtime_error("VAR l <- {1}\nVAR half <- 0.5\nOUTPUT l[half]"),
            "Index not integer '0.5'"
        );
        assert_eq!(
            runtime_error("VAR s <- \"text\"\nOUTPUT s[0]"),
            "Only lists can be indexed"
        );
    }

    // ─────────────────────────── builtins ───────────────────────────

    #[test]
    fn test_slice_and_remove() {
        assert_eq!(
            output_of("OUTPUT SLICE({1, 2, 3}, 0, 2)\nOUTPUT REMOVE({1, 2, 3}, 1)"),
            "{1, 2}\n{1, 3}\n"
        );
        assert_eq!(
            runtime_error("OUTPUT REMOVE({1, 2, 3}, 5)"),
            "Index not in range. length: '3', Index: '5'"
        );
        assert_eq!(
            runtime_error("OUTPUT SLICE({1, 2, 3}, 0, 3)"),
            "Index not in range. length: '3', Index: '3'"
        );
    }

    #[test]
    fn test_builtins_copy_nested_lists() {
        let source = r#"
VAR inner <- {1}
VAR outer <- APPEND({inner}, 2)
inner[0] <- 5
OUTPUT outer
"#;

        assert_eq!(output_of(source), "{{1}, 2}\n");
    }

    #[test]
    fn test_str_stringification() {
        let source = r#"
OUTPUT STR(4.0) + "|" + STR(4.5) + "|" + STR(NULL) + "|" + STR(TRUE)
OUTPUT STR({1, "a", FALSE})
OUTPUT STR(LENGTH)
"#;

        assert_eq!(
            output_of(source),
            "4|4.5|NULL|TRUE\n{1, a, FALSE}\n<BUILTIN LENGTH>\n"
        );
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(
            output_of("OUTPUT ROUND(2.5)\nOUTPUT ROUND(3.5)\nOUTPUT ROUND(-1.4)\nOUTPUT ROUND(2.6)"),
            "2\n4\n-1\n3\n"
        );
    }

    #[test]
    fn test_builtin_type_errors() {
        assert_eq!(runtime_error("OUTPUT ROUND(\"x\")"), "Can only round numbers");
        assert_eq!(runtime_error("OUTPUT APPEND(1, 2)"), "Can only append to a list");
        assert_eq!(
            runtime_error("OUTPUT LENGTH(3)"),
            "Can only get length of a list or string"
        );
        assert_eq!(
            runtime_error("OUTPUT SLICE({1}, \"a\", \"b\")"),
            "Start and End indices must be numbers"
        );
        assert_eq!(runtime_error("OUTPUT INPUT(1)"), "Input prompt must be a string");
    }

    #[test]
    fn test_input_reads_lines() {
        let source = "VAR name <- INPUT(\"Name? \")\nVAR age <- INPUT(\"Age? \")\nOUTPUT name + \"/\" + age";
        let (output, report) = run_with_input(source, "Ada\r\n36\n");

        assert!(report.is_success());
        assert_eq!(output, "Name? Age? Ada/36\n");
    }

    #[test]
    fn test_input_at_end_of_stream() {
        assert_eq!(
            runtime_error("OUTPUT INPUT(\"> \")"),
            "Unexpected end of input"
        );
    }

    // ─────────────────────────── limits ───────────────────────────

    /// Deep recursion in a debug build needs more native stack than the
    /// default test thread has.
    fn on_large_stack<T, F>(job: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(job)
            .expect("failed to spawn interpreter thread")
            .join()
            .expect("interpreter thread panicked")
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let (status, message, line) = on_large_stack(|| {
            let (_, report) = run("FUNCTION f()\n  RETURN f()\nENDFUNCTION\nf()");
            let message = report.diagnostics.first().map(|e| e.message());
            let line = report.diagnostics.first().and_then(|e| e.line());
            (report.status, message, line)
        });

        assert_eq!(status, Status::RuntimeError);
        assert_eq!(status.exit_code(), 70);
        assert_eq!(message.as_deref(), Some("Stack overflow"));
        assert_eq!(line, Some(2));
    }

    #[test]
    fn test_session_recovers_after_stack_overflow() {
        let (first, second, printed) = on_large_stack(|| {
            let (mut session, output) = session_with_input("");
            let define = "FUNCTION depth(n)\n  IF n = 0 OR FALSE THEN\n    RETURN 0\n  ENDIF\n  RETURN 1 + depth(n - 1)\nENDFUNCTION";

            assert!(session.run(define, "INTERPRETER").is_success());
            let first = session.run("OUTPUT depth(5000)", "INTERPRETER").status;
            // every frame of the failed run was released
            let second = session.run("OUTPUT depth(900)", "INTERPRETER").status;

            (first, second, output.contents())
        });

        assert_eq!(first, Status::RuntimeError);
        assert_eq!(second, Status::Success);
        assert_eq!(printed, "900\n");
    }

    #[test]
    fn test_negative_zero_keeps_its_sign() {
        assert_eq!(output_of("OUTPUT -0\nOUTPUT 0 * -1\nOUTPUT STR(-0)"), "-0\n-0\n-0\n");
        assert_eq!(output_of("OUTPUT -0 = 0"), "TRUE\n");
    }

    #[test]
    fn test_list_containing_itself() {
        let source = r#"
VAR a <- {1, 2}
a[0] <- a
OUTPUT a
VAR b <- APPEND(a, 3)
OUTPUT b
OUTPUT a
OUTPUT b[0] = b
"#;

        assert_eq!(
            output_of(source),
            "{{...}, 2}\n{{...}, 2, 3}\n{{...}, 2}\nTRUE\n"
        );
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_is_reported_without_location() {
        let interpreter = Interpreter::with_io(
            Box::new(ClosedPipe),
            Box::new(Cursor::new(Vec::new())),
        );
        let report = Session::with_interpreter(interpreter).run("OUTPUT 1", "test.pseudo");

        assert_eq!(report.status, Status::RuntimeError);
        assert!(matches!(report.diagnostics[0], PseudoError::Io(_)));
        assert_eq!(report.diagnostics[0].message(), "output closed");
        assert_eq!(report.diagnostics[0].line(), None);
    }
}
