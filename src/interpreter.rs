//! Tree-walking evaluator for the pseudocode language.
//!
//! The interpreter owns the global environment (seeded with the builtins),
//! a cursor to the environment currently executing, and the lexical-address
//! table produced by the resolver.  Every block entry swaps the cursor to a
//! fresh child environment and restores it on exit, error or not, so the
//! runtime chain always mirrors the resolver's scope stack.
//!
//! Statement execution yields a [`Flow`]; `RETURN` travels as
//! [`Flow::Return`] and never through the error channel.  The first runtime
//! error aborts the run.
//!
//! # Logging policy
//!
//! | Level  | What is logged                                   |
//! |--------|--------------------------------------------------|
//! | `info` | run start / end, declarations, function returns  |
//! | `debug`| every statement and expression node evaluated    |

use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::builtins::BUILTINS;
use crate::callable::{Callable, Class, Function, Instance};
use crate::environment::{EnvRef, Environment};
use crate::error::{PseudoError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::resolver::Locals;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{PseudoList, Value};

/// Deepest nesting of user function calls before a call fails.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    depth: usize,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter wired to the process's stdout and stdin.
    pub fn new() -> Self {
        Self::with_io(
            Box::new(io::stdout()),
            Box::new(BufReader::new(io::stdin())),
        )
    }

    /// Interpreter writing `OUTPUT` to `output` and reading `INPUT` from `input`.
    pub fn with_io(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(std::cell::RefCell::new(Environment::new()));

        for builtin in BUILTINS.iter() {
            debug!("Defining builtin '{}'", builtin.name);
            globals
                .borrow_mut()
                .define(builtin.name, Value::Callable(Callable::Builtin(builtin)));
        }

        Self {
            environment: globals.clone(),
            globals,
            locals: Locals::new(),
            depth: 0,
            output,
            input,
        }
    }

    /// Install the resolver's lexical addresses.  Tables from earlier runs
    /// stay, so functions defined on previous REPL lines keep working.
    pub fn resolve_locals(&mut self, locals: Locals) {
        debug!("Installing {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Run a program, stopping at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                self.environment = self.globals.clone();
                return Err(e);
            }
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Function::new(declaration.clone(), self.environment.clone(), false);

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );

                info!(
                    "Function '{}' defined with {} parameter(s)",
                    declaration.name.lexeme,
                    declaration.params.len()
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Returning {}", value.kind());
                Ok(Flow::Return(value))
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Output(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed {}", value.kind());
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };

                debug!("Defining variable '{}' as {}", name.lexeme, value.kind());
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::If {
                keyword,
                condition,
                then_branch,
                else_branch,
            } => {
                if !matches!(condition, Expr::Logical { .. }) {
                    return Err(PseudoError::runtime(
                        keyword,
                        "Expect logical expression as condition",
                    ));
                }

                if self.evaluate(condition)?.is_truthy() {
                    debug!("IF condition truthy; executing THEN branch");
                    let environment: EnvRef = Environment::child(&self.environment);
                    self.execute_block(then_branch, environment)
                } else if let Some(else_branch) = else_branch {
                    debug!("IF condition falsy; executing ELSE branch");
                    let environment: EnvRef = Environment::child(&self.environment);
                    self.execute_block(else_branch, environment)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    let environment: EnvRef = Environment::child(&self.environment);

                    if let Flow::Return(value) = self.execute_block(body, environment)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                variable,
                initializer,
                condition,
                increment,
                body,
            } => self.execute_for(variable, initializer, condition, increment, body),
        }
    }

    /// Execute `statements` with `environment` as the current scope,
    /// restoring the previous scope afterwards.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        self.in_environment(environment, |interpreter| {
            for stmt in statements {
                if let Flow::Return(value) = interpreter.execute(stmt)? {
                    return Ok(Flow::Return(value));
                }
            }

            Ok(Flow::Normal)
        })
    }

    fn in_environment<T>(
        &mut self,
        environment: EnvRef,
        run: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);
        let result: Result<T> = run(self);
        self.environment = previous;
        result
    }

    /// Run one function body as a nested call frame.  Past
    /// [`MAX_CALL_DEPTH`] frames the call fails at `paren` instead.
    pub(crate) fn in_call<T>(
        &mut self,
        paren: &Token,
        run: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit {} reached", MAX_CALL_DEPTH);
            return Err(PseudoError::runtime(paren, "Stack overflow"));
        }

        self.depth += 1;
        let result: Result<T> = run(self);
        self.depth -= 1;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Flow> {
        debug!("Declaring class '{}'", name.lexeme);
        self.environment.borrow_mut().define(&name.lexeme, Value::Null);

        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let token: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(PseudoError::runtime(token, "Super class must be a class"));
                }
            },
            None => None,
        };

        let enclosing: EnvRef = self.environment.clone();

        if let Some(superclass) = &superclass {
            let environment: EnvRef = Environment::child(&enclosing);
            environment.borrow_mut().define(
                "SUPER",
                Value::Callable(Callable::Class(superclass.clone())),
            );
            self.environment = environment;
        }

        let methods = methods
            .iter()
            .map(|method| {
                let is_constructor: bool = method.name.lexeme == name.lexeme;
                let function =
                    Function::new(method.clone(), self.environment.clone(), is_constructor);
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(name.lexeme.clone(), superclass, methods);

        self.environment = enclosing;
        self.environment
            .borrow_mut()
            .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;

        info!("Class '{}' defined", name.lexeme);
        Ok(Flow::Normal)
    }

    /// Each iteration runs in its own copy of the loop variable, so closures
    /// created in the body keep the value of their own iteration.
    fn execute_for(
        &mut self,
        variable: &Token,
        initializer: &Stmt,
        condition: &Expr,
        increment: &Expr,
        body: &[Stmt],
    ) -> Result<Flow> {
        let enclosing: EnvRef = self.environment.clone();
        let mut iteration: EnvRef = Environment::child(&enclosing);

        self.in_environment(iteration.clone(), |interpreter| {
            interpreter.execute(initializer)
        })?;

        loop {
            let proceed: bool = self
                .in_environment(iteration.clone(), |interpreter| interpreter.evaluate(condition))?
                .is_truthy();

            if !proceed {
                break;
            }

            let environment: EnvRef = Environment::child(&iteration);
            if let Flow::Return(value) = self.execute_block(body, environment)? {
                return Ok(Flow::Return(value));
            }

            let current: Value = iteration
                .borrow()
                .lookup(&variable.lexeme)
                .unwrap_or(Value::Null);

            let next: EnvRef = Environment::child(&enclosing);
            next.borrow_mut().define(&variable.lexeme, current);
            iteration = next;

            self.in_environment(iteration.clone(), |interpreter| {
                interpreter.evaluate(increment)
            })?;
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Null => Value::Null,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, *distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value.kind(), name.lexeme);
                Ok(value)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let decided: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(PseudoError::runtime(operator, "Operand must be a number")),
                    },
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(PseudoError::runtime(
                        paren,
                        "Can only call functions and classes",
                    ));
                };

                let Some(arity) = callable.arity() else {
                    return Err(PseudoError::runtime(
                        paren,
                        "Can only call functions and classes",
                    ));
                };

                if values.len() != arity {
                    return Err(PseudoError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments, but got {} arguments",
                            arity,
                            values.len()
                        ),
                    ));
                }

                debug!("Calling {} with {} argument(s)", callable, values.len());
                callable.call(self, values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Callable(Callable::Instance(instance)) => Instance::get(&instance, name),
                _ => Err(PseudoError::runtime(name, "Only instances have properties")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Callable(Callable::Instance(instance)) = self.evaluate(object)? else {
                    return Err(PseudoError::runtime(name, "Only instances have properties"));
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => {
                let distance: usize = *self.locals.get(id).ok_or_else(|| {
                    PseudoError::runtime(keyword, "Cannot use 'SUPER' outside of a class")
                })?;

                let superclass: Value = Environment::get_at(&self.environment, distance, keyword)?;
                let this_token: Token = Token::synthetic(TokenType::THIS, "THIS", keyword);
                let object: Value = Environment::get_at(
                    &self.environment,
                    distance.saturating_sub(1),
                    &this_token,
                )?;

                let (
                    Value::Callable(Callable::Class(superclass)),
                    Value::Callable(Callable::Instance(instance)),
                ) = (superclass, object)
                else {
                    return Err(PseudoError::runtime(
                        keyword,
                        "Cannot use 'SUPER' outside of a class",
                    ));
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Callable(Callable::Function(found.bind(instance)))),
                    None => Err(PseudoError::runtime(
                        method,
                        format!("Undefined property '{}'", method.lexeme),
                    )),
                }
            }

            Expr::GetIndex {
                object,
                brackets,
                indices,
            } => {
                let Value::List(list) = self.evaluate(object)? else {
                    return Err(PseudoError::runtime(brackets, "Only lists can be indexed"));
                };

                let indices: Vec<Value> = self.evaluate_all(indices)?;
                list.index(brackets, &indices)
            }

            Expr::List(values) => {
                let values: Vec<Value> = self.evaluate_all(values)?;
                Ok(Value::List(PseudoList::new(values)))
            }

            Expr::SetIndex {
                object,
                brackets,
                indices,
                value,
            } => {
                let Value::List(list) = self.evaluate(object)? else {
                    return Err(PseudoError::runtime(brackets, "Only lists can be indexed"));
                };

                let indices: Vec<Value> = self.evaluate_all(indices)?;
                let value: Value = self.evaluate(value)?;
                list.set(brackets, &indices, value.clone())?;
                Ok(value)
            }
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>> {
        exprs.iter().map(|expr| self.evaluate(expr)).collect()
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => Environment::get_at(&self.environment, *distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Program I/O used by the INPUT builtin
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn write_prompt(&mut self, prompt: &str) -> Result<()> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    /// One line from the input source without its terminator; `None` at end
    /// of input.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();

        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use Value::{Bool, Number};

    match operator.token_type {
        TokenType::EQUAL => return Ok(Bool(left == right)),
        TokenType::NOT_EQUAL => return Ok(Bool(left != right)),
        TokenType::PLUS => {
            return match (left, right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (Value::List(a), Value::List(b)) => Ok(Value::List(a.concat(&b))),
                _ => Err(PseudoError::runtime(
                    operator,
                    "Operands must be two numbers, two strings or two lists",
                )),
            }
        }
        _ => {}
    }

    let (Number(a), Number(b)) = (left, right) else {
        return Err(PseudoError::runtime(operator, "Operands must be numbers"));
    };

    match operator.token_type {
        TokenType::MINUS => Ok(Number(a - b)),
        TokenType::STAR => Ok(Number(a * b)),
        TokenType::SLASH if b == 0.0 => Err(PseudoError::runtime(operator, "Division by zero")),
        TokenType::SLASH => Ok(Number(a / b)),
        TokenType::GREATER => Ok(Bool(a > b)),
        TokenType::GREATER_EQUAL => Ok(Bool(a >= b)),
        TokenType::LESS => Ok(Bool(a < b)),
        TokenType::LESS_EQUAL => Ok(Bool(a <= b)),
        _ => Err(PseudoError::runtime(operator, "Invalid binary operator")),
    }
}
