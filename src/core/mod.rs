//! Core syntax: the elaborator's output, checked and fully scope-resolved.
//!
//! Bound variables are de Bruijn indices here (`Ix`), counted from the
//! nearest binder outward — this is what makes a `Tm` closed under
//! substitution-free weakening, which `eval` relies on.

pub mod eval;
pub mod value;

use crate::symbol::Symbol;
use crate::syntax::Icit;
use std::rc::Rc;

pub use value::{Closure, Env, Lvl, Spine, SpineEntry, Value};

/// A metavariable identifier. Indexes into `MetaContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaVar(pub usize);

impl std::fmt::Display for MetaVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// A de Bruijn index: counts binders from the innermost outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ix(pub usize);

/// Core term, the elaborator's checked output.
///
/// `Meta` and `InsertedMeta` are both "a metavariable occurs here"; they
/// differ in how their spine of local variables is determined.
/// `InsertedMeta` is what elaboration inserts when it invents a fresh
/// metavariable at a point in a local context: walking `bds` fetches the
/// exact local variables in scope at that point, without the elaborator
/// needing to build the spine by hand.
#[derive(Debug, Clone)]
pub enum Tm {
    Var(Ix),
    Lam(Symbol, Icit, Rc<Tm>),
    App(Rc<Tm>, Rc<Tm>, Icit),
    Universe,
    Pi(Symbol, Rc<Tm>, Icit, Rc<Tm>),
    Let(Symbol, Rc<Tm>, Rc<Tm>, Rc<Tm>),
    Meta(MetaVar),
    InsertedMeta(MetaVar, Rc<[BoundState]>),
    /// A top-level name, kept distinct from `Var` so printing and conversion
    /// can treat it as a potential unfolding site rather than a bound
    /// variable with no defining equation.
    TopLevel(Symbol),
}

/// Whether a local context entry is a bound lambda/Pi variable (and so
/// belongs in a freshly-inserted metavariable's spine) or a `let`-bound
/// definition (which does not, since it already has a value in `Env`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundState {
    Bound,
    Defined,
}
