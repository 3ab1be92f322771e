//! Semantic values: the output of evaluation, the input to quoting.
//!
//! Every neutral carries both a spine of *unevaluated* arguments (for fast
//! approximate conversion, see `convert`) and, transitively through its
//! head, the means to unfold fully on demand. That's the "glued" in glued
//! evaluation: a value never pre-commits to how unfolded it is.

use super::{MetaVar, Tm};
use crate::symbol::Symbol;
use crate::syntax::Icit;
use std::rc::Rc;

/// A de Bruijn level: counts binders from the outermost inward. Levels are
/// stable under weakening (extending the context with a new binder doesn't
/// change any existing value's level), which is why semantic values use
/// them instead of indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lvl(pub usize);

impl Lvl {
    /// Convert to the de Bruijn index seen by a term under `ctx_len` binders.
    pub fn to_ix(self, ctx_len: usize) -> super::Ix {
        super::Ix(ctx_len - self.0 - 1)
    }
}

/// One link in a runtime environment's cons list: a value and the rest of
/// the environment it was extended from.
#[derive(Debug)]
struct EnvNode {
    val: Value,
    rest: Option<Rc<EnvNode>>,
}

/// A runtime environment: the value bound to each variable in scope, as a
/// persistent cons list rather than a `Vec`. Extending conses a new node onto
/// the front and shares the rest by `Rc`, so a closure captured under a deep
/// binder holds an O(1) pointer into its ancestor environment instead of a
/// copy of it — extending an environment must never be O(depth).
#[derive(Debug, Clone, Default)]
pub struct Env {
    head: Option<Rc<EnvNode>>,
    len: usize,
}

impl Env {
    pub fn new() -> Self {
        Env { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn extend(&self, v: Value) -> Env {
        Env {
            head: Some(Rc::new(EnvNode { val: v, rest: self.head.clone() })),
            len: self.len + 1,
        }
    }

    /// The value bound to de Bruijn index `ix`, counting from the innermost
    /// (most recently extended) binder. Walks `ix.0` cons cells.
    pub fn lookup(&self, ix: super::Ix) -> &Value {
        let mut node = self.head.as_deref().expect("de Bruijn index out of bounds");
        for _ in 0..ix.0 {
            node = node.rest.as_deref().expect("de Bruijn index out of bounds");
        }
        &node.val
    }

    /// The value bound at position `pos` counting from the outermost
    /// (first-extended) binder — the order `Ctx`'s bound-state list uses
    /// when an `InsertedMeta`'s spine is rebuilt from local scope.
    pub fn lookup_from_start(&self, pos: usize) -> &Value {
        self.lookup(super::Ix(self.len - 1 - pos))
    }
}

/// A deferred substitution: a closed term plus the environment it closes
/// over, not yet evaluated under the argument it will eventually bind.
#[derive(Debug, Clone)]
pub struct Closure {
    pub env: Env,
    pub body: Rc<Tm>,
}

impl Closure {
    pub fn new(env: Env, body: Rc<Tm>) -> Self {
        Closure { env, body }
    }
}

/// One argument applied to a neutral's head, not yet reduced.
#[derive(Debug, Clone)]
pub struct SpineEntry {
    pub arg: Value,
    pub icit: Icit,
}

pub type Spine = Vec<SpineEntry>;

/// A semantic value produced by `eval`.
///
/// `Value` is deliberately *not* `Eq`/`Hash`-derivable: two values with
/// different spine representations can still be convertible, and deciding
/// that is `convert`'s whole job, not a structural accident.
#[derive(Debug, Clone)]
pub enum Value {
    /// A rigid variable (bound by a lambda/Pi still in scope) applied to a
    /// spine of arguments. Never reduces further: there is no equation to
    /// unfold a bound variable by.
    RigidNeutral(Lvl, Spine),
    /// An unsolved metavariable applied to a spine. May become any value
    /// once the metavariable is solved; `force` re-checks at the point of
    /// use.
    FlexibleNeutral(MetaVar, Spine),
    /// A top-level name applied to a spine, together with a lazily-forced
    /// unfolding. The cache is only populated by `force_full`; approximate
    /// conversion checking compares the spine without ever computing it.
    /// `def` is `None` for an `assume`d postulate, which has no equation to
    /// unfold by and so stays opaque under `force_full` too.
    TopNeutral(Symbol, Spine, Rc<std::cell::RefCell<Option<Value>>>, Option<Rc<Tm>>, Env),
    Lambda(Symbol, Icit, Closure),
    Pi(Symbol, Rc<Value>, Icit, Closure),
    Universe,
}

impl Value {
    pub fn rigid(lvl: Lvl) -> Self {
        Value::RigidNeutral(lvl, Vec::new())
    }

    pub fn flex(m: MetaVar) -> Self {
        Value::FlexibleNeutral(m, Vec::new())
    }

    pub fn top(name: Symbol, def: Rc<Tm>, env: Env) -> Self {
        Value::TopNeutral(name, Vec::new(), Rc::new(std::cell::RefCell::new(None)), Some(def), env)
    }

    /// An assumed (postulated) top-level constant: opaque, never unfolds.
    pub fn assumed(name: Symbol) -> Self {
        Value::TopNeutral(name, Vec::new(), Rc::new(std::cell::RefCell::new(None)), None, Env::new())
    }
}
