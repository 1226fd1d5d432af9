//! Callable runtime values: user functions, classes, instances and builtins.
//!
//! Closures are plain [`EnvRef`] handles, so a function, every method bound
//! from it and any frame still running it all share one environment record.

use crate::builtins::Builtin;
use crate::environment::{EnvRef, Environment};
use crate::error::{PseudoError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;
use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<RefCell<Instance>>),
    Builtin(&'static Builtin),
}

impl Callable {
    /// Number of arguments a call must supply; `None` when the value cannot
    /// be called at all.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Callable::Function(function) => Some(function.arity()),
            Callable::Class(class) => Some(class.arity()),
            Callable::Instance(_) => None,
            Callable::Builtin(builtin) => Some(builtin.arity),
        }
    }

    /// Invoke with already-evaluated arguments; `paren` locates errors.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments, paren),
            Callable::Class(class) => Class::instantiate(class, interpreter, arguments, paren),
            Callable::Builtin(builtin) => {
                debug!("Calling builtin '{}'", builtin.name);
                (builtin.function)(interpreter, &arguments, paren)
            }
            Callable::Instance(_) => Err(PseudoError::runtime(
                paren,
                "Can only call functions and classes",
            )),
        }
    }
}

/// Functions, classes and instances compare by identity, builtins by name.
impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Instance(a), Callable::Instance(b)) => Rc::ptr_eq(a, b),
            (Callable::Builtin(a), Callable::Builtin(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => {
                write!(f, "<FUNCTION {}>", function.declaration.name.lexeme)
            }
            Callable::Class(class) => write!(f, "<CLASS {}>", class.name),
            Callable::Instance(instance) => {
                write!(f, "<CLASS {}> instance", instance.borrow().class.name)
            }
            Callable::Builtin(builtin) => write!(f, "<BUILTIN {}>", builtin.name),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions
// ─────────────────────────────────────────────────────────────────────────────

pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    pub is_constructor: bool,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_constructor: bool) -> Self {
        Function {
            declaration,
            closure,
            is_constructor,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Re-close this method over a fresh environment defining `THIS`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Rc<Function> {
        let environment: EnvRef = Environment::child(&self.closure);

        environment
            .borrow_mut()
            .define("THIS", Value::Callable(Callable::Instance(instance)));

        Rc::new(Function::new(
            self.declaration.clone(),
            environment,
            self.is_constructor,
        ))
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        let name: &str = &self.declaration.name.lexeme;
        debug!("Calling function '{}' with {} argument(s)", name, arguments.len());

        let environment: EnvRef = Environment::child(&self.closure);

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        let flow: Flow = interpreter.in_call(paren, |interpreter| {
            interpreter.execute_block(&self.declaration.body, environment)
        })?;

        if self.is_constructor {
            return self.closure.borrow().lookup("THIS").ok_or_else(|| {
                PseudoError::runtime(paren, "Undefined variable 'THIS'")
            });
        }

        let value: Value = match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Null,
        };

        info!("Function '{}' returned {}", name, value.kind());

        Ok(value)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.arity())
            .field("is_constructor", &self.is_constructor)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Class {
            name,
            superclass,
            methods,
        }
    }

    /// Look `name` up on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// The method named like the class, if any.
    pub fn constructor(&self) -> Option<Rc<Function>> {
        self.methods.get(&self.name).cloned()
    }

    pub fn arity(&self) -> usize {
        self.constructor().map_or(0, |constructor| constructor.arity())
    }

    fn instantiate(
        class: &Rc<Class>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance: Rc<RefCell<Instance>> = Rc::new(RefCell::new(Instance::new(class.clone())));

        if let Some(constructor) = class.constructor() {
            constructor
                .bind(instance.clone())
                .call(interpreter, arguments, paren)?;
        }

        Ok(Value::Callable(Callable::Instance(instance)))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| &superclass.name),
            )
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property read: own fields first, then methods bound to `this`.
    pub fn get(this: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value> {
        let instance = this.borrow();

        if let Some(value) = instance.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        match instance.class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(
                method.bind(this.clone()),
            ))),
            None => Err(PseudoError::runtime(
                name,
                format!("Undefined property '{}'", name.lexeme),
            )),
        }
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
