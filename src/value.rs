use crate::callable::Callable;
use crate::error::{PseudoError, Result};
use crate::token::Token;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type ListCell = RefCell<Vec<Value>>;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(PseudoList),
    Callable(Callable),
}

impl Value {
    /// `NULL` and `FALSE` are falsy, everything else (including `0` and `""`)
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Short name of the value's kind, used in `--log` traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Callable(_) => "callable",
        }
    }
}

/// Equality without coercion: values of different kinds are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::Number(n) => write_number(f, *n),
            Value::Str(s) => f.write_str(s),
            Value::List(list) => write!(f, "{}", list),
            Value::Callable(callable) => write!(f, "{}", callable),
        }
    }
}

/// Integral numbers print without a fractional part (`4`, not `4.0`).
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == 0.0 && n.is_sign_negative() {
        f.write_str("-0")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buffer = itoa::Buffer::new();
        f.write_str(buffer.format(n as i64))
    } else {
        write!(f, "{}", n)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lists
// ─────────────────────────────────────────────────────────────────────────────

/// Shared, mutable, variable-length list.  Cloning the handle aliases the
/// same storage; [`PseudoList::deep_copy`] makes an independent list.
#[derive(Debug, Clone, Default)]
pub struct PseudoList(Rc<RefCell<Vec<Value>>>);

impl PseudoList {
    pub fn new(values: Vec<Value>) -> Self {
        PseudoList(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the elements; nested lists stay aliased.
    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Copy of this list in which every nested list is copied too.  A list
    /// reachable from itself is copied once, so the copy has the same shape.
    pub fn deep_copy(&self) -> Self {
        self.copy_into(&mut HashMap::new())
    }

    fn copy_into(&self, copies: &mut HashMap<*const ListCell, PseudoList>) -> Self {
        if let Some(copy) = copies.get(&Rc::as_ptr(&self.0)) {
            return copy.clone();
        }

        let copy = PseudoList::default();
        copies.insert(Rc::as_ptr(&self.0), copy.clone());

        for value in self.0.borrow().iter() {
            let value: Value = match value {
                Value::List(inner) => Value::List(inner.copy_into(copies)),
                other => other.clone(),
            };
            copy.push(value);
        }

        copy
    }

    /// New list holding the elements of `self` followed by those of `other`.
    pub fn concat(&self, other: &PseudoList) -> Self {
        let mut values: Vec<Value> = self.values();
        values.extend(other.values());
        PseudoList::new(values)
    }

    /// Validate `index` against this list and convert it to a position.
    pub fn check_index(&self, brackets: &Token, index: &Value) -> Result<usize> {
        let n: f64 = match index {
            Value::Number(n) if n.fract() == 0.0 => *n,
            other => {
                return Err(PseudoError::runtime(
                    brackets,
                    format!("Index not integer '{}'", other),
                ))
            }
        };

        let len: usize = self.len();

        if n < 0.0 || n >= len as f64 {
            return Err(PseudoError::runtime(
                brackets,
                format!(
                    "Index not in range. length: '{}', Index: '{}'",
                    len,
                    Value::Number(n)
                ),
            ));
        }

        Ok(n as usize)
    }

    /// Consume `indices` left to right, descending into nested lists.
    pub fn index(&self, brackets: &Token, indices: &[Value]) -> Result<Value> {
        let Some((first, rest)) = indices.split_first() else {
            return Ok(Value::List(self.clone()));
        };

        let position: usize = self.check_index(brackets, first)?;
        let value: Value = self.0.borrow()[position].clone();

        if rest.is_empty() {
            return Ok(value);
        }

        match value {
            Value::List(inner) => inner.index(brackets, rest),
            _ => Err(PseudoError::runtime(brackets, "Only lists can be indexed")),
        }
    }

    /// Store `value` at the element addressed by `indices`.
    pub fn set(&self, brackets: &Token, indices: &[Value], value: Value) -> Result<()> {
        let Some((first, rest)) = indices.split_first() else {
            return Err(PseudoError::runtime(brackets, "Expect index value"));
        };

        let position: usize = self.check_index(brackets, first)?;

        if rest.is_empty() {
            self.0.borrow_mut()[position] = value;
            return Ok(());
        }

        let inner: Value = self.0.borrow()[position].clone();

        match inner {
            Value::List(inner) => inner.set(brackets, rest, value),
            _ => Err(PseudoError::runtime(brackets, "Only lists can be indexed")),
        }
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn remove(&self, position: usize) -> Value {
        self.0.borrow_mut().remove(position)
    }

    /// Copy of the half-open range `start..end`; empty when `start > end`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let values = self.0.borrow();
        let end: usize = end.min(values.len());

        if start >= end {
            return PseudoList::default();
        }

        PseudoList::new(values[start..end].to_vec())
    }
}

impl PartialEq for PseudoList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Display for PseudoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, self, &mut Vec::new())
    }
}

/// A list already being printed further up shows as `{...}`.
fn write_list(
    f: &mut fmt::Formatter<'_>,
    list: &PseudoList,
    open: &mut Vec<*const ListCell>,
) -> fmt::Result {
    let this: *const ListCell = Rc::as_ptr(&list.0);

    if open.contains(&this) {
        return f.write_str("{...}");
    }

    open.push(this);
    f.write_str("{")?;

    for (i, value) in list.0.borrow().iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }

        match value {
            Value::List(inner) => write_list(f, inner, open)?,
            other => write!(f, "{}", other)?,
        }
    }

    open.pop();
    f.write_str("}")
}
