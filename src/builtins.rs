//! Native functions seeded into the global environment.
//!
//! Every builtin has a fixed arity (checked by the caller before dispatch)
//! and checks its argument kinds itself, failing with a runtime error at the
//! call's closing parenthesis.

use crate::error::{PseudoError, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{PseudoList, Value};
use log::debug;

pub type BuiltinFn = fn(&mut Interpreter, &[Value], &Token) -> Result<Value>;

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub function: BuiltinFn,
}

pub static BUILTINS: [Builtin; 7] = [
    Builtin {
        name: "ROUND",
        arity: 1,
        function: round,
    },
    Builtin {
        name: "STR",
        arity: 1,
        function: stringify,
    },
    Builtin {
        name: "APPEND",
        arity: 2,
        function: append,
    },
    Builtin {
        name: "REMOVE",
        arity: 2,
        function: remove,
    },
    Builtin {
        name: "LENGTH",
        arity: 1,
        function: length,
    },
    Builtin {
        name: "SLICE",
        arity: 3,
        function: slice,
    },
    Builtin {
        name: "INPUT",
        arity: 1,
        function: input,
    },
];

/// Round half to even.
fn round(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    match args {
        [Value::Number(n)] => Ok(Value::Number(n.round_ties_even())),
        _ => Err(PseudoError::runtime(paren, "Can only round numbers")),
    }
}

fn stringify(_: &mut Interpreter, args: &[Value], _: &Token) -> Result<Value> {
    Ok(Value::Str(
        args.first().map(Value::to_string).unwrap_or_default(),
    ))
}

fn append(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    let [Value::List(list), value] = args else {
        return Err(PseudoError::runtime(paren, "Can only append to a list"));
    };

    let copy: PseudoList = list.deep_copy();
    copy.push(value.clone());

    Ok(Value::List(copy))
}

fn remove(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    let [Value::List(list), index] = args else {
        return Err(PseudoError::runtime(
            paren,
            "Can only remove elements from a list",
        ));
    };

    let copy: PseudoList = list.deep_copy();
    let position: usize = copy.check_index(paren, index)?;
    let removed: Value = copy.remove(position);
    debug!("REMOVE dropped {} at {}", removed.kind(), position);

    Ok(Value::List(copy))
}

fn length(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    match args {
        [Value::List(list)] => Ok(Value::Number(list.len() as f64)),
        [Value::Str(s)] => Ok(Value::Number(s.chars().count() as f64)),
        _ => Err(PseudoError::runtime(
            paren,
            "Can only get length of a list or string",
        )),
    }
}

/// Half-open `start..end`; both bounds must be valid indices of the list.
fn slice(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    let [Value::List(list), start, end] = args else {
        return Err(PseudoError::runtime(paren, "Can only slice a list"));
    };

    if !matches!(start, Value::Number(_)) || !matches!(end, Value::Number(_)) {
        return Err(PseudoError::runtime(
            paren,
            "Start and End indices must be numbers",
        ));
    }

    let start: usize = list.check_index(paren, start)?;
    let end: usize = list.check_index(paren, end)?;

    Ok(Value::List(list.deep_copy().slice(start, end)))
}

fn input(interpreter: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value> {
    let [Value::Str(prompt)] = args else {
        return Err(PseudoError::runtime(paren, "Input prompt must be a string"));
    };

    interpreter.write_prompt(prompt)?;

    match interpreter.read_line()? {
        Some(line) => Ok(Value::Str(line)),
        None => Err(PseudoError::runtime(paren, "Unexpected end of input")),
    }
}
