//! The metavariable store and the top-level definition table.
//!
//! Elaboration is strictly single-threaded (SPEC_FULL.md §5), so both
//! tables are a plain `RefCell`, not the `Arc<RwLock<_>>` a concurrent
//! elaborator would need — there is exactly one writer and it never holds
//! a borrow across a call that could re-enter.
//!
//! A meta is solved at most once: `solve` panics if called on an
//! already-solved entry. Unification never revisits a solved meta, only
//! ever reads through it via `force`, so this is an invariant violation
//! rather than a recoverable condition.

use crate::core::{Env, MetaVar, Tm, Value};
use crate::symbol::Symbol;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum MetaEntry {
    Unsolved { ty: Value },
    Solved { value: Value, term: Rc<Tm> },
}

pub struct MetaContext {
    metas: RefCell<Vec<MetaEntry>>,
    top: RefCell<HashMap<Symbol, (Option<Rc<Tm>>, Env)>>,
    top_types: RefCell<HashMap<Symbol, Value>>,
}

impl MetaContext {
    pub fn new() -> Self {
        MetaContext {
            metas: RefCell::new(Vec::new()),
            top: RefCell::new(HashMap::new()),
            top_types: RefCell::new(HashMap::new()),
        }
    }

    pub fn fresh_meta(&self, ty: Value) -> MetaVar {
        let mut metas = self.metas.borrow_mut();
        let id = MetaVar(metas.len());
        metas.push(MetaEntry::Unsolved { ty });
        id
    }

    pub fn lookup(&self, m: MetaVar) -> MetaEntry {
        self.metas.borrow()[m.0].clone()
    }

    pub fn meta_type(&self, m: MetaVar) -> Value {
        match self.lookup(m) {
            MetaEntry::Unsolved { ty } => ty,
            MetaEntry::Solved { .. } => {
                unreachable!("meta_type queried on an already-solved meta `{}`", m)
            }
        }
    }

    pub fn is_solved(&self, m: MetaVar) -> bool {
        matches!(self.metas.borrow()[m.0], MetaEntry::Solved { .. })
    }

    pub fn solve(&self, m: MetaVar, value: Value, term: Tm) {
        let mut metas = self.metas.borrow_mut();
        match &metas[m.0] {
            MetaEntry::Solved { .. } => {
                unreachable!("meta `{}` solved twice", m)
            }
            MetaEntry::Unsolved { .. } => {
                tracing::debug!(meta = %m, "solving metavariable");
                metas[m.0] = MetaEntry::Solved { value, term: Rc::new(term) };
            }
        }
    }

    pub fn register_top(&self, name: Symbol, def: Rc<Tm>, env: Env) {
        self.top.borrow_mut().insert(name, (Some(def), env));
    }

    pub fn register_assumed(&self, name: Symbol) {
        self.top.borrow_mut().insert(name, (None, Env::new()));
    }

    pub fn has_top(&self, name: &Symbol) -> bool {
        self.top.borrow().contains_key(name)
    }

    pub fn lookup_top(&self, name: &Symbol) -> Option<(Option<Rc<Tm>>, Env)> {
        self.top.borrow().get(name).cloned()
    }

    pub fn register_top_type(&self, name: Symbol, ty: Value) {
        self.top_types.borrow_mut().insert(name, ty);
    }

    pub fn lookup_top_type(&self, name: &Symbol) -> Option<Value> {
        self.top_types.borrow().get(name).cloned()
    }

    /// Every unsolved metavariable, for end-of-program reporting.
    pub fn unsolved(&self) -> Vec<MetaVar> {
        self.metas
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                MetaEntry::Unsolved { .. } => Some(MetaVar(i)),
                MetaEntry::Solved { .. } => None,
            })
            .collect()
    }
}

impl Default for MetaContext {
    fn default() -> Self {
        Self::new()
    }
}
