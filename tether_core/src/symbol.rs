//==================================================
// File: symbol.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Process-wide string interning for Tether
// Objective: Provide Symbol handles compared by identity and intern()
//==================================================

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Append-only pool shared by every compiler and VM in the process.
static POOL: Lazy<RwLock<HashSet<Arc<str>>>> = Lazy::new(|| RwLock::new(HashSet::new()));

/// Handle to an interned string.
///
/// Two symbols are equal only when they point at the same pool entry; since
/// the pool deduplicates, that coincides with equal text.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn addr(&self) -> *const u8 {
        self.0.as_ptr()
    }
}

/// Intern `text`, returning the shared handle for it.
pub fn intern(text: &str) -> Symbol {
    if let Some(existing) = POOL.read().get(text) {
        return Symbol(existing.clone());
    }
    let mut pool = POOL.write();
    // Another writer may have won the race between the two locks.
    if let Some(existing) = pool.get(text) {
        return Symbol(existing.clone());
    }
    let entry: Arc<str> = Arc::from(text);
    pool.insert(entry.clone());
    Symbol(entry)
}

/// The existing handle for `text`, without adding it to the pool.
pub fn lookup(text: &str) -> Option<Symbol> {
    POOL.read().get(text).cloned().map(Symbol)
}

/// Intern the canonical text of a number, used when numbers act as names.
pub fn intern_number(number: f64) -> Symbol {
    intern(&number.to_string())
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        intern(value)
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", &*self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_shares_one_entry() {
        let a = intern("counter");
        let b = intern(&String::from("counter"));
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_ne!(a, intern("other"));
    }

    #[test]
    fn numbers_intern_without_trailing_fraction() {
        assert_eq!(intern_number(3.0).as_str(), "3");
        assert_eq!(intern_number(2.5).as_str(), "2.5");
        assert_eq!(intern_number(-1.0), intern("-1"));
    }

    #[test]
    fn lookup_never_inserts() {
        assert_eq!(lookup("symbol-lookup-absent"), None);
        assert_eq!(lookup("symbol-lookup-absent"), None);
        let present = intern("symbol-lookup-present");
        assert_eq!(lookup("symbol-lookup-present"), Some(present));
    }
}

//==================================================
// End of file
//==================================================
