//! Evaluation, forcing, and quoting.
//!
//! Two forcing strategies and two quoting strategies, paired up:
//! - `force` only chases solved metavariables; it never unfolds a
//!   top-level definition. This is what approximate conversion checking
//!   uses, and it's why approximate checking is fast — most neutrals never
//!   get unfolded at all.
//! - `force_full` additionally unfolds top-level definitions (caching the
//!   result behind the `RefCell` in `Value::TopNeutral` so repeated forcing
//!   doesn't redo the work). Full conversion and `[normalize]` reporting use
//!   this.

use super::value::{Closure, Env, Spine, SpineEntry};
use super::{BoundState, Lvl, MetaVar, Tm, Value};
use crate::metacontext::{MetaContext, MetaEntry};
use std::rc::Rc;

pub fn eval(mcx: &MetaContext, env: &Env, tm: &Tm) -> Value {
    match tm {
        Tm::Var(ix) => env.lookup(*ix).clone(),
        Tm::Lam(name, icit, body) => {
            Value::Lambda(name.clone(), *icit, Closure::new(env.clone(), body.clone()))
        }
        Tm::App(f, a, icit) => {
            let vf = eval(mcx, env, f);
            let va = eval(mcx, env, a);
            apply(mcx, vf, va, *icit)
        }
        Tm::Universe => Value::Universe,
        Tm::Pi(name, dom, icit, cod) => {
            let vdom = eval(mcx, env, dom);
            Value::Pi(name.clone(), Rc::new(vdom), *icit, Closure::new(env.clone(), cod.clone()))
        }
        Tm::Let(_, _, value, body) => {
            let v = eval(mcx, env, value);
            eval(mcx, &env.extend(v), body)
        }
        Tm::Meta(m) => force(mcx, Value::flex(*m)),
        Tm::InsertedMeta(m, bds) => {
            let mut spine = Vec::new();
            for (i, bd) in bds.iter().enumerate() {
                if *bd == BoundState::Bound {
                    spine.push(SpineEntry {
                        arg: env.lookup_from_start(i).clone(),
                        icit: crate::syntax::Icit::Expl,
                    });
                }
            }
            force(mcx, apply_spine(mcx, Value::flex(*m), spine))
        }
        Tm::TopLevel(name) => match mcx.lookup_top(name) {
            Some((Some(def), top_env)) => Value::top(name.clone(), def, top_env),
            Some((None, _)) => Value::assumed(name.clone()),
            None => unreachable!("unresolved top-level reference `{}` escaped elaboration", name),
        },
    }
}

fn apply_spine(mcx: &MetaContext, head: Value, spine: Spine) -> Value {
    spine.into_iter().fold(head, |acc, e| apply(mcx, acc, e.arg, e.icit))
}

pub fn apply(mcx: &MetaContext, f: Value, arg: Value, icit: crate::syntax::Icit) -> Value {
    match f {
        Value::Lambda(_, _, clos) => apply_closure(mcx, &clos, arg),
        Value::RigidNeutral(lvl, mut spine) => {
            spine.push(SpineEntry { arg, icit });
            Value::RigidNeutral(lvl, spine)
        }
        Value::FlexibleNeutral(m, mut spine) => {
            spine.push(SpineEntry { arg, icit });
            Value::FlexibleNeutral(m, spine)
        }
        Value::TopNeutral(name, mut spine, cache, def, env) => {
            spine.push(SpineEntry { arg, icit });
            Value::TopNeutral(name, spine, cache, def, env)
        }
        other => unreachable!("applying a non-function value: {:?}", other),
    }
}

pub fn apply_closure(mcx: &MetaContext, clos: &Closure, arg: Value) -> Value {
    eval(mcx, &clos.env.extend(arg), &clos.body)
}

/// Resolve solved metavariables at the head of `v`. Does not unfold
/// top-level definitions.
pub fn force(mcx: &MetaContext, v: Value) -> Value {
    match v {
        Value::FlexibleNeutral(m, spine) => match mcx.lookup(m) {
            MetaEntry::Solved { value, .. } => force(mcx, apply_spine(mcx, value, spine)),
            MetaEntry::Unsolved { .. } => Value::FlexibleNeutral(m, spine),
        },
        other => other,
    }
}

/// Like `force`, but also unfolds top-level definitions (memoized) and
/// recurses through anything that unfolding exposes.
pub fn force_full(mcx: &MetaContext, v: Value) -> Value {
    match force(mcx, v) {
        Value::TopNeutral(name, spine, _, None, _) => Value::TopNeutral(
            name,
            spine,
            Rc::new(std::cell::RefCell::new(None)),
            None,
            Env::new(),
        ),
        Value::TopNeutral(_, spine, cache, Some(def), top_env) => {
            let unfolded = {
                let cached = cache.borrow().clone();
                match cached {
                    Some(v) => v,
                    None => {
                        let v = eval(mcx, &top_env, &def);
                        *cache.borrow_mut() = Some(v.clone());
                        v
                    }
                }
            };
            force_full(mcx, apply_spine(mcx, unfolded, spine))
        }
        other => other,
    }
}

/// Convert a semantic value back into a core term at context length `lvl`.
///
/// `full` selects whether to recursively `force_full` before quoting each
/// subterm (used to print true normal forms) or just `force` (used when
/// quoting a metavariable solution, where unfolding top-level definitions
/// into the solution would defeat the point of having them).
pub fn quote(mcx: &MetaContext, lvl: Lvl, v: Value, full: bool) -> Tm {
    let v = if full { force_full(mcx, v) } else { force(mcx, v) };
    match v {
        Value::RigidNeutral(head_lvl, spine) => {
            quote_spine(mcx, lvl, Tm::Var(head_lvl.to_ix(lvl.0)), spine, full)
        }
        Value::FlexibleNeutral(m, spine) => quote_spine(mcx, lvl, Tm::Meta(m), spine, full),
        Value::TopNeutral(name, spine, ..) => {
            quote_spine(mcx, lvl, Tm::TopLevel(name), spine, full)
        }
        Value::Lambda(name, icit, clos) => {
            let body_val = apply_closure(mcx, &clos, Value::rigid(lvl));
            Tm::Lam(name, icit, Rc::new(quote(mcx, Lvl(lvl.0 + 1), body_val, full)))
        }
        Value::Pi(name, dom, icit, clos) => {
            let dom_tm = quote(mcx, lvl, (*dom).clone(), full);
            let body_val = apply_closure(mcx, &clos, Value::rigid(lvl));
            let cod_tm = quote(mcx, Lvl(lvl.0 + 1), body_val, full);
            Tm::Pi(name, Rc::new(dom_tm), icit, Rc::new(cod_tm))
        }
        Value::Universe => Tm::Universe,
    }
}

fn quote_spine(mcx: &MetaContext, lvl: Lvl, head: Tm, spine: Spine, full: bool) -> Tm {
    spine.into_iter().fold(head, |acc, e| {
        let arg_tm = quote(mcx, lvl, e.arg, full);
        Tm::App(Rc::new(acc), Rc::new(arg_tm), e.icit)
    })
}

/// Normal form of a closed term, for `[normalize]` reporting.
pub fn normal_form(mcx: &MetaContext, env: &Env, tm: &Tm) -> Tm {
    let v = eval(mcx, env, tm);
    quote(mcx, Lvl(env.len()), v, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::Ix;
    use crate::metacontext::MetaContext;
    use crate::symbol::Symbol;

    fn id_term() -> Tm {
        // \x. x
        Tm::Lam(Symbol::intern("x"), crate::syntax::Icit::Expl, Rc::new(Tm::Var(Ix(0))))
    }

    #[test]
    fn evaluating_identity_applied_to_universe_yields_universe() {
        let mcx = MetaContext::new();
        let env = Env::new();
        let f = eval(&mcx, &env, &id_term());
        let result = apply(&mcx, f, Value::Universe, crate::syntax::Icit::Expl);
        assert!(matches!(result, Value::Universe));
    }

    #[test]
    fn quote_eval_roundtrips_on_identity() {
        let mcx = MetaContext::new();
        let env = Env::new();
        let v = eval(&mcx, &env, &id_term());
        let back = quote(&mcx, Lvl(0), v, true);
        match back {
            Tm::Lam(_, _, body) => assert!(matches!(*body, Tm::Var(Ix(0)))),
            _ => panic!("expected a lambda"),
        }
    }

    #[test]
    fn pi_quoting_reuses_the_bound_variable_in_domain_and_codomain() {
        let mcx = MetaContext::new();
        let env = Env::new();
        let name = Symbol::intern("A");
        // (A : U) -> A
        let pi = Tm::Pi(name.clone(), Rc::new(Tm::Universe), crate::syntax::Icit::Expl, Rc::new(Tm::Var(Ix(0))));
        let v = eval(&mcx, &env, &pi);
        let back = quote(&mcx, Lvl(0), v, true);
        match back {
            Tm::Pi(_, dom, _, cod) => {
                assert!(matches!(*dom, Tm::Universe));
                assert!(matches!(*cod, Tm::Var(Ix(0))));
            }
            _ => panic!("expected a pi type"),
        }
    }
}
