//! Interned identifiers.
//!
//! Binder name hints and top-level names are compared constantly during
//! elaboration (named-implicit matching, scope lookup by name) and cloned
//! into every closure and spine entry that mentions them. A plain `String`
//! makes both of those O(n); this module gives every distinct spelling a
//! single heap allocation and O(1) equality via pointer comparison, falling
//! back to a byte comparison only for the rare interner miss.
//!
//! Unlike the multi-threaded interner this is adapted from, elaboration here
//! is strictly single-threaded (see the concurrency model in SPEC_FULL.md
//! §5), so a thread-local table is enough: no `ThreadedRodeo`, no lock.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

thread_local! {
    static INTERNER: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// An interned name. Cloning is a refcount bump; equality is a pointer
/// comparison in the common case (same interner, same string).
#[derive(Clone, Eq)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn intern(s: &str) -> Self {
        INTERNER.with(|interner| {
            let mut interner = interner.borrow_mut();
            if let Some(existing) = interner.get(s) {
                return Symbol(existing.clone());
            }
            let rc: Rc<str> = Rc::from(s);
            interner.insert(rc.clone());
            Symbol(rc)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::intern(&s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_equal_strings_to_the_same_allocation() {
        let a = Symbol::intern("foo");
        let b = Symbol::intern("foo");
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_are_not_equal() {
        assert_ne!(Symbol::intern("foo"), Symbol::intern("bar"));
    }

    #[test]
    fn as_str_roundtrips() {
        assert_eq!(Symbol::intern("hello").as_str(), "hello");
    }
}
