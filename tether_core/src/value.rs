use std::fmt;

use crate::memory::ArenaHandle;
use crate::symbol::{intern_number, lookup, Symbol};

/// Address of one arena cell.
pub type CellRef = ArenaHandle<Value>;

/// Runtime value.
///
/// `Pointer` and `Boxed` share a representation. `Pointer` is what taking an
/// address yields and what a cell holds when it aliases another cell;
/// `Boxed` is a pointer that was stored into a cell as an ordinary value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    String(Symbol),
    Pointer(CellRef),
    Boxed(CellRef),
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(Symbol::from(text))
    }

    /// A Number is falsey only at zero, a Bool when false; everything else
    /// is truthy.
    pub fn is_falsey(&self) -> bool {
        match self {
            Value::Number(number) => *number == 0.0,
            Value::Bool(flag) => !flag,
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// The name this value denotes when used as a symbol or label,
    /// interning a number's text on first use.
    pub fn as_name(&self) -> Option<Symbol> {
        match self {
            Value::String(symbol) => Some(symbol.clone()),
            Value::Number(number) => Some(intern_number(*number)),
            _ => None,
        }
    }

    /// Like [`Value::as_name`], but a number whose text was never interned
    /// yields `None`: it cannot be a label or a bound name.
    pub fn known_name(&self) -> Option<Symbol> {
        match self {
            Value::String(symbol) => Some(symbol.clone()),
            Value::Number(number) => lookup(&number.to_string()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Pointer(_) => "pointer",
            Value::Boxed(_) => "boxed pointer",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Boxed(a), Value::Boxed(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(number) => write!(f, "{number}"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::String(symbol) => f.write_str(symbol.as_str()),
            Value::Pointer(cell) => write!(f, "<pointer {}>", cell.index()),
            Value::Boxed(cell) => write!(f, "<boxed {}>", cell.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Arena;

    #[test]
    fn equality_never_crosses_tags() {
        let mut arena: Arena<Value> = Arena::with_capacity(2);
        let cell = arena.allocate(Value::Number(0.0)).expect("room");
        assert_ne!(Value::Number(1.0), Value::Bool(true));
        assert_ne!(Value::string("1"), Value::Number(1.0));
        assert_ne!(Value::Pointer(cell), Value::Boxed(cell));
        assert_eq!(Value::Pointer(cell), Value::Pointer(cell));
    }

    #[test]
    fn strings_compare_by_interned_handle() {
        assert_eq!(Value::string("label"), Value::string("label"));
        assert_ne!(Value::string("label"), Value::string("labels"));
    }

    #[test]
    fn falsey_rule() {
        assert!(Value::Number(0.0).is_falsey());
        assert!(!Value::Number(-2.0).is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::string("").is_falsey());
    }

    #[test]
    fn numbers_render_compactly() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Value::Number(1.0).as_name(), Some(Symbol::from("1")));
        assert_eq!(Value::Number(1.0).known_name(), Some(Symbol::from("1")));
        assert_eq!(Value::Number(86420.125).known_name(), None);
        assert_eq!(Value::Bool(true).known_name(), None);
    }
}
