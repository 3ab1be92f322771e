//! Conversion checking: deciding whether two values denote the same term
//! up to beta/eta and metavariable solutions.
//!
//! Runs in two modes. Approximate mode (`force`, no top-level unfolding)
//! is tried first and is cheap: most conversion checks during elaboration
//! are between terms that never needed a definition unfolded to see they
//! match. When approximate mode reports a mismatch, that's not yet
//! conclusive — the mismatch might be exactly at a top-level name that
//! would unfold to something convertible — so the whole check is retried
//! in full mode (`force_full`), which unfolds everything.

use crate::core::eval::{apply, apply_closure, force, force_full};
use crate::core::{Lvl, Spine, Value};
use crate::metacontext::MetaContext;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Approx,
    Full,
}

fn force_mode(mcx: &MetaContext, mode: Mode, v: Value) -> Value {
    match mode {
        Mode::Approx => force(mcx, v),
        Mode::Full => force_full(mcx, v),
    }
}

/// Top-level entry point: approximate first, full on mismatch.
///
/// `force_full` skips the approximate pass entirely and goes straight to
/// full (unfolding) mode — the `stt.toml` `[elaborate] force_full_convert`
/// debugging knob, for isolating whether a reported mismatch is genuine or
/// an artifact of approximate mode not unfolding far enough.
pub fn convert(mcx: &MetaContext, lvl: Lvl, a: &Value, b: &Value, force_full: bool) -> bool {
    if !force_full {
        if conv(mcx, lvl, Mode::Approx, a.clone(), b.clone()) {
            return true;
        }
        tracing::trace!(at = lvl.0, "approximate conversion failed, retrying in full mode");
    }
    conv(mcx, lvl, Mode::Full, a.clone(), b.clone())
}

fn conv(mcx: &MetaContext, lvl: Lvl, mode: Mode, a: Value, b: Value) -> bool {
    let a = force_mode(mcx, mode, a);
    let b = force_mode(mcx, mode, b);
    match (a, b) {
        (Value::Universe, Value::Universe) => true,

        (Value::Pi(_, d1, i1, c1), Value::Pi(_, d2, i2, c2)) => {
            i1 == i2
                && conv(mcx, lvl, mode, (*d1).clone(), (*d2).clone())
                && {
                    let var = Value::rigid(lvl);
                    let b1 = apply_closure(mcx, &c1, var.clone());
                    let b2 = apply_closure(mcx, &c2, var);
                    conv(mcx, Lvl(lvl.0 + 1), mode, b1, b2)
                }
        }

        (Value::Lambda(_, i1, c1), Value::Lambda(_, i2, c2)) if i1 == i2 => {
            let var = Value::rigid(lvl);
            let b1 = apply_closure(mcx, &c1, var.clone());
            let b2 = apply_closure(mcx, &c2, var);
            conv(mcx, Lvl(lvl.0 + 1), mode, b1, b2)
        }

        // eta: a lambda is convertible to anything that behaves the same
        // way when applied to a fresh variable.
        (Value::Lambda(_, icit, c), other) => {
            let var = Value::rigid(lvl);
            let lhs = apply_closure(mcx, &c, var.clone());
            let rhs = apply(mcx, other, var, icit);
            conv(mcx, Lvl(lvl.0 + 1), mode, lhs, rhs)
        }
        (other, Value::Lambda(_, icit, c)) => {
            let var = Value::rigid(lvl);
            let lhs = apply(mcx, other, var.clone(), icit);
            let rhs = apply_closure(mcx, &c, var);
            conv(mcx, Lvl(lvl.0 + 1), mode, lhs, rhs)
        }

        (Value::RigidNeutral(l1, s1), Value::RigidNeutral(l2, s2)) => {
            l1 == l2 && conv_spine(mcx, lvl, mode, s1, s2)
        }
        (Value::FlexibleNeutral(m1, s1), Value::FlexibleNeutral(m2, s2)) => {
            m1 == m2 && conv_spine(mcx, lvl, mode, s1, s2)
        }
        (Value::TopNeutral(n1, s1, ..), Value::TopNeutral(n2, s2, ..)) => {
            n1 == n2 && conv_spine(mcx, lvl, mode, s1, s2)
        }

        _ => false,
    }
}

fn conv_spine(mcx: &MetaContext, lvl: Lvl, mode: Mode, s1: Spine, s2: Spine) -> bool {
    s1.len() == s2.len()
        && s1.into_iter().zip(s2).all(|(e1, e2)| {
            e1.icit == e2.icit && conv(mcx, lvl, mode, e1.arg, e2.arg)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::eval::eval;
    use crate::core::{Env, Ix, Tm};
    use crate::symbol::Symbol;
    use crate::syntax::Icit;
    use std::rc::Rc;

    fn id_term() -> Tm {
        Tm::Lam(Symbol::intern("x"), Icit::Expl, Rc::new(Tm::Var(Ix(0))))
    }

    #[test]
    fn universe_converts_with_itself() {
        let mcx = MetaContext::new();
        assert!(convert(&mcx, Lvl(0), &Value::Universe, &Value::Universe, false));
    }

    #[test]
    fn identity_function_is_convertible_with_its_eta_expansion() {
        let mcx = MetaContext::new();
        let env = Env::new();
        let id_val = eval(&mcx, &env, &id_term());
        // eta-expansion of `id`: \x. id x
        let eta = Tm::Lam(
            Symbol::intern("x"),
            Icit::Expl,
            Rc::new(Tm::App(Rc::new(id_term()), Rc::new(Tm::Var(Ix(0))), Icit::Expl)),
        );
        let eta_val = eval(&mcx, &env, &eta);
        assert!(convert(&mcx, Lvl(0), &id_val, &eta_val, false));
    }

    #[test]
    fn distinct_rigid_variables_are_not_convertible() {
        let mcx = MetaContext::new();
        assert!(!convert(&mcx, Lvl(2), &Value::rigid(Lvl(0)), &Value::rigid(Lvl(1)), false));
    }

    #[test]
    fn pi_types_compare_domain_and_codomain() {
        let mcx = MetaContext::new();
        let env = Env::new();
        let a = Tm::Pi(Symbol::intern("x"), Rc::new(Tm::Universe), Icit::Expl, Rc::new(Tm::Universe));
        let b = a.clone();
        assert!(convert(&mcx, Lvl(0), &eval(&mcx, &env, &a), &eval(&mcx, &env, &b), false));
    }
}
