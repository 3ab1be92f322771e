//! Pattern unification: solving a metavariable applied to a spine of
//! distinct bound variables against a value it must equal.
//!
//! This only ever needs to solve the "Miller pattern" fragment: a flexible
//! neutral `?m x1 x2 .. xn` where every `xi` is a distinct rigid variable.
//! Anything outside that fragment is left unsolved and reported as a
//! postponed/unsolved constraint rather than guessed at.

use crate::core::eval::force;
use crate::core::{Lvl, MetaVar, Spine, Tm, Value};
use crate::metacontext::MetaContext;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum UnifyError {
    /// The spine applied to the metavariable contains something other than
    /// a distinct bound variable, so this isn't a solvable pattern.
    NotAPattern,
    /// The solution would need to mention the metavariable being solved.
    Occurs(MetaVar),
    /// The solution would need to mention a variable bound after the point
    /// the metavariable was created.
    EscapingVariable(Lvl),
    /// Two rigid-headed values disagree and can't be unified by solving a
    /// meta at all.
    Rigid,
}

/// Maps levels visible to the solution (the metavariable's invocation
/// spine) to the levels they'll have inside the solved closed term.
struct PartialRenaming {
    /// Number of variables in the solution's own local scope.
    dom: usize,
    /// Number of variables in the scope the solved value was found in.
    cod: usize,
    ren: HashMap<Lvl, Lvl>,
}

/// Check that `spine` is a valid pattern spine and build the renaming from
/// the scope the metavariable is invoked in to the closed solution scope.
/// Nonlinear spines (a variable occurring more than once) bind the last
/// occurrence seen, silently shadowing earlier ones.
fn invert(mcx: &MetaContext, cod: usize, spine: &Spine) -> Result<PartialRenaming, UnifyError> {
    let mut ren = HashMap::new();
    for (i, entry) in spine.iter().enumerate() {
        match force(mcx, entry.arg.clone()) {
            Value::RigidNeutral(lvl, s) if s.is_empty() => {
                ren.insert(lvl, Lvl(i));
            }
            _ => return Err(UnifyError::NotAPattern),
        }
    }
    Ok(PartialRenaming { dom: spine.len(), cod, ren })
}

/// Quote `v` into a term valid under the metavariable's own scope, failing
/// if it mentions `m` itself (occurs check) or a variable not covered by
/// the renaming (one bound after the metavariable was created, and not
/// part of its invocation spine).
///
/// `mode` selects whether solved metas are chased with plain `force`
/// (`Mode::Approx`) or with `force_full`, which also unfolds top-level
/// definitions (`Mode::Full`). `solve` tries `Approx` first and only
/// re-walks in `Full` mode if that hits an escaping variable — the same
/// "approximate first, full fallback" shape as `unify`/`convert`.
fn rename(
    mcx: &MetaContext,
    m: MetaVar,
    pren: &PartialRenaming,
    mode: Mode,
    v: Value,
) -> Result<Tm, UnifyError> {
    match force_mode(mcx, mode, v) {
        Value::FlexibleNeutral(m2, spine) => {
            if m2 == m {
                return Err(UnifyError::Occurs(m));
            }
            rename_spine(mcx, m, pren, mode, Tm::Meta(m2), spine)
        }
        Value::RigidNeutral(lvl, spine) => match pren.ren.get(&lvl) {
            None => Err(UnifyError::EscapingVariable(lvl)),
            Some(mapped) => {
                let ix = mapped.to_ix(pren.dom);
                rename_spine(mcx, m, pren, mode, Tm::Var(ix), spine)
            }
        },
        Value::TopNeutral(name, spine, ..) => {
            rename_spine(mcx, m, pren, mode, Tm::TopLevel(name), spine)
        }
        Value::Lambda(name, icit, clos) => {
            let body_val = crate::core::eval::apply_closure(
                mcx,
                &clos,
                Value::rigid(Lvl(pren.cod)),
            );
            let inner = bump(pren);
            let body = rename(mcx, m, &inner, mode, body_val)?;
            Ok(Tm::Lam(name, icit, std::rc::Rc::new(body)))
        }
        Value::Pi(name, dom, icit, clos) => {
            let dom_tm = rename(mcx, m, pren, mode, (*dom).clone())?;
            let body_val = crate::core::eval::apply_closure(
                mcx,
                &clos,
                Value::rigid(Lvl(pren.cod)),
            );
            let inner = bump(pren);
            let cod_tm = rename(mcx, m, &inner, mode, body_val)?;
            Ok(Tm::Pi(name, std::rc::Rc::new(dom_tm), icit, std::rc::Rc::new(cod_tm)))
        }
        Value::Universe => Ok(Tm::Universe),
    }
}

fn bump(pren: &PartialRenaming) -> PartialRenaming {
    let mut ren = pren.ren.clone();
    ren.insert(Lvl(pren.cod), Lvl(pren.dom));
    PartialRenaming { dom: pren.dom + 1, cod: pren.cod + 1, ren }
}

fn rename_spine(
    mcx: &MetaContext,
    m: MetaVar,
    pren: &PartialRenaming,
    mode: Mode,
    head: Tm,
    spine: Spine,
) -> Result<Tm, UnifyError> {
    let mut acc = head;
    for entry in spine {
        let arg_tm = rename(mcx, m, pren, mode, entry.arg)?;
        acc = Tm::App(std::rc::Rc::new(acc), std::rc::Rc::new(arg_tm), entry.icit);
    }
    Ok(acc)
}

/// Wrap a closed term in `dom` lambdas, one per pattern variable, innermost
/// binder first — i.e. the lambda for spine index 0 ends up outermost.
fn lambdas(dom: usize, body: Tm) -> Tm {
    (0..dom).rev().fold(body, |acc, i| {
        Tm::Lam(crate::symbol::Symbol::intern(&format!("x{}", i)), crate::syntax::Icit::Expl, std::rc::Rc::new(acc))
    })
}

/// Solve `m spine = rhs`.
///
/// The renaming-quote walk runs in approximate mode first. A scope error
/// there isn't conclusive: the escaping variable might only appear under a
/// top-level name that, once unfolded, doesn't mention it at all — so on
/// `EscapingVariable` the whole walk is retried once with solved-meta *and*
/// top-level unfolding enabled before being reported as a real failure.
pub fn solve(mcx: &MetaContext, lvl: Lvl, m: MetaVar, spine: &Spine, rhs: Value) -> Result<(), UnifyError> {
    let pren = invert(mcx, lvl.0, spine)?;
    let body = match rename(mcx, m, &pren, Mode::Approx, rhs.clone()) {
        Ok(body) => body,
        Err(UnifyError::EscapingVariable(_)) => {
            tracing::trace!(meta = %m, "renaming hit an escaping variable, retrying with full unfolding");
            rename(mcx, m, &pren, Mode::Full, rhs)?
        }
        Err(e) => return Err(e),
    };
    let solved_term = lambdas(pren.dom, body);
    let value = crate::core::eval::eval(mcx, &crate::core::Env::new(), &solved_term);
    mcx.solve(m, value, solved_term);
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Approx,
    Full,
}

fn force_mode(mcx: &MetaContext, mode: Mode, v: Value) -> Value {
    match mode {
        Mode::Approx => force(mcx, v),
        Mode::Full => crate::core::eval::force_full(mcx, v),
    }
}

/// Unify two values, solving metavariables as needed.
///
/// Tried first in approximate mode (no top-level unfolding), same as
/// `convert::convert` — most unification happens between terms that were
/// never going to need a definition unfolded to see they match. A rigid
/// mismatch in approximate mode isn't conclusive by itself: the two large
/// Church-numeral terms in the unification-stress scenario only agree
/// after `add`/`mul` are unfolded thousands of layers deep, so a mismatch
/// there retries the whole comparison in full mode before being reported
/// as a real conflict.
///
/// `force_full` skips the approximate pass entirely — the `stt.toml`
/// `[elaborate] force_full_convert` debugging knob, mirroring
/// `convert::convert`'s.
pub fn unify(mcx: &MetaContext, lvl: Lvl, a: Value, b: Value, force_full: bool) -> Result<(), UnifyError> {
    if !force_full {
        match unify_mode(mcx, lvl, Mode::Approx, a.clone(), b.clone()) {
            Ok(()) => return Ok(()),
            Err(UnifyError::Rigid) => {
                tracing::trace!(at = lvl.0, "approximate unification failed, retrying in full mode");
            }
            Err(e) => return Err(e),
        }
    }
    unify_mode(mcx, lvl, Mode::Full, a, b)
}

fn unify_mode(mcx: &MetaContext, lvl: Lvl, mode: Mode, a: Value, b: Value) -> Result<(), UnifyError> {
    let a = force_mode(mcx, mode, a);
    let b = force_mode(mcx, mode, b);
    match (a, b) {
        (Value::Universe, Value::Universe) => Ok(()),
        // Both sides flexible: same meta means the spines must agree (no
        // solving needed, there's nothing new to learn); different metas
        // can't be resolved by aliasing one to the other without picking a
        // direction arbitrarily, so this fails rather than postpones.
        (Value::FlexibleNeutral(m1, s1), Value::FlexibleNeutral(m2, s2)) if m1 == m2 => {
            unify_spine(mcx, lvl, mode, s1, s2)
        }
        (Value::FlexibleNeutral(_, _), Value::FlexibleNeutral(_, _)) => Err(UnifyError::Rigid),
        (Value::FlexibleNeutral(m, spine), other) | (other, Value::FlexibleNeutral(m, spine)) => {
            solve(mcx, lvl, m, &spine, other)
        }
        (Value::Pi(_, d1, i1, c1), Value::Pi(_, d2, i2, c2)) if i1 == i2 => {
            unify_mode(mcx, lvl, mode, (*d1).clone(), (*d2).clone())?;
            let var = Value::rigid(lvl);
            let b1 = crate::core::eval::apply_closure(mcx, &c1, var.clone());
            let b2 = crate::core::eval::apply_closure(mcx, &c2, var);
            unify_mode(mcx, Lvl(lvl.0 + 1), mode, b1, b2)
        }
        (Value::Lambda(_, i1, c1), Value::Lambda(_, i2, c2)) if i1 == i2 => {
            let var = Value::rigid(lvl);
            let b1 = crate::core::eval::apply_closure(mcx, &c1, var.clone());
            let b2 = crate::core::eval::apply_closure(mcx, &c2, var);
            unify_mode(mcx, Lvl(lvl.0 + 1), mode, b1, b2)
        }
        (Value::Lambda(_, icit, c), other) | (other, Value::Lambda(_, icit, c)) => {
            let var = Value::rigid(lvl);
            let lhs = crate::core::eval::apply_closure(mcx, &c, var.clone());
            let rhs = crate::core::eval::apply(mcx, other, var, icit);
            unify_mode(mcx, Lvl(lvl.0 + 1), mode, lhs, rhs)
        }
        (Value::RigidNeutral(l1, s1), Value::RigidNeutral(l2, s2)) if l1 == l2 => {
            unify_spine(mcx, lvl, mode, s1, s2)
        }
        (Value::TopNeutral(n1, s1, ..), Value::TopNeutral(n2, s2, ..)) if n1 == n2 => {
            unify_spine(mcx, lvl, mode, s1, s2)
        }
        _ => Err(UnifyError::Rigid),
    }
}

fn unify_spine(mcx: &MetaContext, lvl: Lvl, mode: Mode, s1: Spine, s2: Spine) -> Result<(), UnifyError> {
    if s1.len() != s2.len() {
        return Err(UnifyError::Rigid);
    }
    for (e1, e2) in s1.into_iter().zip(s2) {
        if e1.icit != e2.icit {
            return Err(UnifyError::Rigid);
        }
        unify_mode(mcx, lvl, mode, e1.arg, e2.arg)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solving_identity_pattern_meta() {
        let mcx = MetaContext::new();
        let m = mcx.fresh_meta(Value::Universe);
        // ?m x =?= x, at lvl 1 (one bound variable x in scope)
        let spine = vec![crate::core::SpineEntry { arg: Value::rigid(Lvl(0)), icit: crate::syntax::Icit::Expl }];
        solve(&mcx, Lvl(1), m, &spine, Value::rigid(Lvl(0))).unwrap();
        assert!(mcx.is_solved(m));
        // The solution applied back to x should convert with x.
        let solved_val = match mcx.lookup(m) {
            crate::metacontext::MetaEntry::Solved { value, .. } => value,
            _ => panic!(),
        };
        let applied = crate::core::eval::apply(&mcx, solved_val, Value::rigid(Lvl(0)), crate::syntax::Icit::Expl);
        assert!(crate::convert::convert(&mcx, Lvl(1), &applied, &Value::rigid(Lvl(0)), false));
    }

    #[test]
    fn non_pattern_spine_is_rejected() {
        let mcx = MetaContext::new();
        let spine = vec![crate::core::SpineEntry { arg: Value::Universe, icit: crate::syntax::Icit::Expl }];
        assert_eq!(invert(&mcx, 1, &spine).err(), Some(UnifyError::NotAPattern));
    }

    #[test]
    fn occurs_check_rejects_self_referential_solution() {
        let mcx = MetaContext::new();
        let m = mcx.fresh_meta(Value::Universe);
        let spine: Spine = vec![];
        let self_ref = Value::flex(m);
        assert_eq!(solve(&mcx, Lvl(0), m, &spine, self_ref), Err(UnifyError::Occurs(m)));
    }

    #[test]
    fn same_meta_both_sides_compares_spines_instead_of_solving() {
        let mcx = MetaContext::new();
        let m = mcx.fresh_meta(Value::Universe);
        // ?m x =?= ?m x: same head, same spine, nothing to solve.
        let spine = vec![crate::core::SpineEntry { arg: Value::rigid(Lvl(0)), icit: crate::syntax::Icit::Expl }];
        unify(&mcx, Lvl(1), Value::FlexibleNeutral(m, spine.clone()), Value::FlexibleNeutral(m, spine), false)
            .unwrap();
        assert!(!mcx.is_solved(m));
    }

    #[test]
    fn solve_retries_renaming_in_full_mode_when_unfolding_drops_the_escaping_variable() {
        let mcx = MetaContext::new();
        let const_u = crate::symbol::Symbol::intern("const_u");
        // const_u := \x. U, registered as a top-level definition.
        let def = Tm::Lam(crate::symbol::Symbol::intern("x"), crate::syntax::Icit::Expl, std::rc::Rc::new(Tm::Universe));
        mcx.register_top(const_u.clone(), std::rc::Rc::new(def.clone()), crate::core::Env::new());

        let m = mcx.fresh_meta(Value::Universe);
        // ?m x =?= const_u y, at lvl 1 (x bound, y escaping at lvl 5).
        let spine = vec![crate::core::SpineEntry { arg: Value::rigid(Lvl(0)), icit: crate::syntax::Icit::Expl }];
        let top_val = Value::top(const_u, std::rc::Rc::new(def), crate::core::Env::new());
        let rhs = crate::core::eval::apply(&mcx, top_val, Value::rigid(Lvl(5)), crate::syntax::Icit::Expl);

        // Approximate mode alone would see the escaping `y` in the spine and
        // fail; unfolding `const_u` makes it disappear entirely, so the
        // retry must succeed.
        solve(&mcx, Lvl(1), m, &spine, rhs).unwrap();
        assert!(mcx.is_solved(m));
    }

    #[test]
    fn two_distinct_unsolved_metas_fail_rather_than_alias() {
        let mcx = MetaContext::new();
        let m1 = mcx.fresh_meta(Value::Universe);
        let m2 = mcx.fresh_meta(Value::Universe);
        let err = unify(&mcx, Lvl(0), Value::flex(m1), Value::flex(m2), false).unwrap_err();
        assert_eq!(err, UnifyError::Rigid);
        assert!(!mcx.is_solved(m1));
        assert!(!mcx.is_solved(m2));
    }
}
