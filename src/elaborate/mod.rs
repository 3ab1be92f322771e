//! Bidirectional elaboration: `Raw` syntax in, checked `Tm` core syntax
//! (plus its semantic type) out.
//!
//! The two entry points are `infer` (synthesize a type) and `check` (verify
//! against an expected type); which one a given piece of syntax needs is
//! decided by the usual bidirectional discipline — lambdas and holes are
//! check-only constructs, applications and variables are infer-only,
//! everything else works either way by falling back to infer-then-unify.

use crate::core::eval::{apply, apply_closure, eval, force, quote};
use crate::core::{BoundState, Env, Ix, Lvl, Tm, Value};
use crate::errors::ElabError;
use crate::metacontext::MetaContext;
use crate::symbol::Symbol;
use crate::syntax::{Decl, Icit, Named, Program, Raw, RawArg, Span, Tag};
use crate::unify;
use std::rc::Rc;

/// The local typing context threaded through `infer`/`check`. `env`,
/// `types`, and `bds` are always the same length: one entry per local
/// binder, outermost (lowest `Lvl`) first.
#[derive(Clone)]
pub struct Ctx {
    pub env: Env,
    pub types: Vec<(Symbol, Value)>,
    pub bds: Vec<BoundState>,
}

impl Ctx {
    pub fn empty() -> Self {
        Ctx { env: Env::new(), types: Vec::new(), bds: Vec::new() }
    }

    pub fn lvl(&self) -> Lvl {
        Lvl(self.env.len())
    }

    /// Extend with a bound (lambda/Pi) variable: it belongs in the spine of
    /// any metavariable freshly created under this context.
    pub fn bind(&self, name: Symbol, ty: Value) -> Ctx {
        let mut c = self.clone();
        c.env = c.env.extend(Value::rigid(self.lvl()));
        c.types.push((name, ty));
        c.bds.push(BoundState::Bound);
        c
    }

    /// Extend with a `let`-bound definition: already has a value, so it is
    /// left out of fresh metavariables' spines.
    pub fn define(&self, name: Symbol, ty: Value, val: Value) -> Ctx {
        let mut c = self.clone();
        c.env = c.env.extend(val);
        c.types.push((name, ty));
        c.bds.push(BoundState::Defined);
        c
    }

    fn lookup_local(&self, name: &Symbol) -> Option<(Ix, Value)> {
        self.types.iter().rev().enumerate().find_map(|(depth_from_top, (n, ty))| {
            if n == name {
                Some((Ix(depth_from_top), ty.clone()))
            } else {
                None
            }
        })
    }
}

/// Holds the metavariable store and the top-level name tables; one per
/// elaborated program.
pub struct Elaborator {
    pub mcx: MetaContext,
    /// When set, every conversion/unification check skips the approximate
    /// (no-unfolding) pass and goes straight to full mode. A debugging knob
    /// for isolating whether a reported mismatch is real or an artifact of
    /// approximate mode giving up too early; wired from `stt.toml`'s
    /// `[elaborate] force_full_convert`.
    pub force_full_convert: bool,
}

impl Elaborator {
    pub fn new() -> Self {
        Elaborator { mcx: MetaContext::new(), force_full_convert: false }
    }

    pub fn with_force_full_convert(force_full_convert: bool) -> Self {
        Elaborator { mcx: MetaContext::new(), force_full_convert }
    }
}

impl Default for Elaborator {
    fn default() -> Self {
        Self::new()
    }
}

fn fresh_meta_term(elab: &Elaborator, ctx: &Ctx, ty: Value) -> Tm {
    let m = elab.mcx.fresh_meta(ty);
    Tm::InsertedMeta(m, Rc::from(ctx.bds.clone()))
}

fn fresh_meta_value(elab: &Elaborator, ctx: &Ctx, ty: Value) -> (Tm, Value) {
    let tm = fresh_meta_term(elab, ctx, ty);
    let val = eval(&elab.mcx, &ctx.env, &tm);
    (tm, val)
}

fn unify_types(elab: &Elaborator, lvl: Lvl, expected: &Value, found: &Value) -> Result<(), unify::UnifyError> {
    match unify::unify(&elab.mcx, lvl, expected.clone(), found.clone(), elab.force_full_convert) {
        Ok(()) => Ok(()),
        Err(e) => {
            if crate::convert::convert(&elab.mcx, lvl, expected, found, elab.force_full_convert) {
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

fn describe(elab: &Elaborator, lvl: Lvl, v: &Value) -> String {
    crate::pretty::print_tm(&quote(&elab.mcx, lvl, v.clone(), true))
}

/// Insert fresh implicit-argument applications until `ty` is no longer an
/// implicit-domain Pi type. This is what lets `f : {A} -> A -> A` be
/// applied as `f x` instead of requiring `f {_} x` everywhere.
fn insert_implicits(elab: &Elaborator, ctx: &Ctx, mut tm: Tm, mut ty: Value) -> (Tm, Value) {
    loop {
        match force(&elab.mcx, ty.clone()) {
            Value::Pi(_, dom, Icit::Impl, clos) => {
                let (m_tm, m_val) = fresh_meta_value(elab, ctx, (*dom).clone());
                tm = Tm::App(Rc::new(tm), Rc::new(m_tm), Icit::Impl);
                ty = apply_closure(&elab.mcx, &clos, m_val);
            }
            other => return (tm, other),
        }
    }
}

/// `infer`, but without the trailing implicit-insertion pass — used where
/// the caller needs to inspect the immediately-inferred type itself (an
/// explicit or named-implicit application head, or a `Raw::Suppress`).
fn infer_bare(elab: &Elaborator, ctx: &Ctx, raw: &Raw) -> Result<(Tm, Value), ElabError> {
    match raw {
        Raw::Var(span, name) => infer_var(elab, ctx, *span, name),
        Raw::Universe(_) => Ok((Tm::Universe, Value::Universe)),
        Raw::Hole(_) => {
            let (ty_tm, _) = fresh_meta_value(elab, ctx, Value::Universe);
            let ty_val = eval(&elab.mcx, &ctx.env, &ty_tm);
            Ok(fresh_meta_value(elab, ctx, ty_val))
        }
        Raw::Let(span, name, ty_opt, value, body) => {
            infer_let(elab, ctx, *span, name, ty_opt.as_deref(), value, body)
        }
        Raw::Lam(span, name, ann, icit, body) => infer_lam(elab, ctx, *span, name, ann.as_deref(), *icit, body),
        Raw::Pi(span, name, dom, icit, cod) => infer_pi(elab, ctx, *span, name, dom, *icit, cod),
        Raw::App(span, f, arg) => infer_app(elab, ctx, *span, f, arg),
        Raw::Suppress(_, inner) => infer_bare(elab, ctx, inner),
    }
}

pub fn infer(elab: &Elaborator, ctx: &Ctx, raw: &Raw) -> Result<(Tm, Value), ElabError> {
    if let Raw::Suppress(_, inner) = raw {
        return infer_bare(elab, ctx, inner);
    }
    let (tm, ty) = infer_bare(elab, ctx, raw)?;
    Ok(insert_implicits(elab, ctx, tm, ty))
}

fn infer_var(elab: &Elaborator, ctx: &Ctx, span: Span, name: &Symbol) -> Result<(Tm, Value), ElabError> {
    if let Some((ix, ty)) = ctx.lookup_local(name) {
        return Ok((Tm::Var(ix), ty));
    }
    if let Some(ty) = elab.mcx.lookup_top_type(name) {
        return Ok((Tm::TopLevel(name.clone()), ty));
    }
    Err(ElabError::UnboundVariable { span, name: name.clone() })
}

fn infer_let(
    elab: &Elaborator,
    ctx: &Ctx,
    span: Span,
    name: &Symbol,
    ty_opt: Option<&Raw>,
    value: &Raw,
    body: &Raw,
) -> Result<(Tm, Value), ElabError> {
    let (value_tm, value_ty, ty_tm) = match ty_opt {
        Some(ty_raw) => {
            let ty_tm = check(elab, ctx, ty_raw, &Value::Universe)?;
            let ty_val = eval(&elab.mcx, &ctx.env, &ty_tm);
            let value_tm = check(elab, ctx, value, &ty_val)?;
            (value_tm, ty_val, ty_tm)
        }
        None => {
            let (value_tm, value_ty) = infer(elab, ctx, value)?;
            let ty_tm = quote(&elab.mcx, ctx.lvl(), value_ty.clone(), false);
            (value_tm, value_ty, ty_tm)
        }
    };
    let value_val = eval(&elab.mcx, &ctx.env, &value_tm);
    let new_ctx = ctx.define(name.clone(), value_ty, value_val);
    let (body_tm, body_ty) = infer(elab, &new_ctx, body)?;
    let _ = span;
    Ok((
        Tm::Let(name.clone(), Rc::new(ty_tm), Rc::new(value_tm), Rc::new(body_tm)),
        body_ty,
    ))
}

fn infer_lam(
    elab: &Elaborator,
    ctx: &Ctx,
    _span: Span,
    name: &Symbol,
    ann: Option<&Raw>,
    icit: Icit,
    body: &Raw,
) -> Result<(Tm, Value), ElabError> {
    let dom_val = match ann {
        Some(a) => {
            let a_tm = check(elab, ctx, a, &Value::Universe)?;
            eval(&elab.mcx, &ctx.env, &a_tm)
        }
        None => fresh_meta_value(elab, ctx, Value::Universe).1,
    };
    let new_ctx = ctx.bind(name.clone(), dom_val.clone());
    let (body_tm, body_ty) = infer(elab, &new_ctx, body)?;
    let dom_tm = quote(&elab.mcx, ctx.lvl(), dom_val, false);
    let cod_tm = quote(&elab.mcx, new_ctx.lvl(), body_ty, false);
    let pi_val = eval(
        &elab.mcx,
        &ctx.env,
        &Tm::Pi(name.clone(), Rc::new(dom_tm), icit, Rc::new(cod_tm)),
    );
    Ok((Tm::Lam(name.clone(), icit, Rc::new(body_tm)), pi_val))
}

fn infer_pi(
    elab: &Elaborator,
    ctx: &Ctx,
    _span: Span,
    name: &Symbol,
    dom: &Raw,
    icit: Icit,
    cod: &Raw,
) -> Result<(Tm, Value), ElabError> {
    let dom_tm = check(elab, ctx, dom, &Value::Universe)?;
    let dom_val = eval(&elab.mcx, &ctx.env, &dom_tm);
    let new_ctx = ctx.bind(name.clone(), dom_val);
    let cod_tm = check(elab, &new_ctx, cod, &Value::Universe)?;
    Ok((Tm::Pi(name.clone(), Rc::new(dom_tm), icit, Rc::new(cod_tm)), Value::Universe))
}

/// Given a value that should behave as a Pi type but was found to still be
/// an unsolved metavariable, invent one: `?dom : U`, bind it, `?cod : U`
/// under the binder, and unify the original meta against the resulting Pi.
fn demand_pi(elab: &Elaborator, ctx: &Ctx, ty: Value, icit: Icit) -> Result<(Value, crate::core::Closure), ElabError> {
    match force(&elab.mcx, ty.clone()) {
        Value::Pi(_, dom, found_icit, clos) if found_icit == icit => Ok(((*dom).clone(), clos)),
        Value::Pi(_, _, found_icit, _) => Err(ElabError::NotAFunctionType {
            span: Span::start(),
            found_desc: format!("a {:?}-argument function type where a {:?} one was expected", found_icit, icit),
        }),
        Value::FlexibleNeutral(..) => {
            let dom_val = fresh_meta_value(elab, ctx, Value::Universe).1;
            let new_ctx = ctx.bind(Symbol::intern("_"), dom_val.clone());
            let cod_tm = fresh_meta_term(elab, &new_ctx, Value::Universe);
            let clos = crate::core::Closure::new(ctx.env.clone(), Rc::new(cod_tm));
            let pi_val = Value::Pi(Symbol::intern("_"), Rc::new(dom_val.clone()), icit, clos.clone());
            unify_types(elab, ctx.lvl(), &ty, &pi_val)
                .map_err(|e| ElabError::UnifyFailure { span: Span::start(), reason: e })?;
            Ok((dom_val, clos))
        }
        other => Err(ElabError::NotAFunctionType { span: Span::start(), found_desc: describe(elab, ctx.lvl(), &other) }),
    }
}

fn infer_app(elab: &Elaborator, ctx: &Ctx, span: Span, f: &Raw, arg: &RawArg) -> Result<(Tm, Value), ElabError> {
    match arg {
        RawArg::Expl(a_raw) => {
            let (f_tm, f_ty) = infer(elab, ctx, f)?;
            let (dom, clos) = demand_pi(elab, ctx, f_ty, Icit::Expl)?;
            let a_tm = check(elab, ctx, a_raw, &dom)?;
            let a_val = eval(&elab.mcx, &ctx.env, &a_tm);
            let res_ty = apply_closure(&elab.mcx, &clos, a_val);
            Ok((Tm::App(Rc::new(f_tm), Rc::new(a_tm), Icit::Expl), res_ty))
        }
        RawArg::Impl(a_raw) => {
            let (f_tm, f_ty) = infer_bare(elab, ctx, f)?;
            let (dom, clos) = demand_pi(elab, ctx, f_ty, Icit::Impl)?;
            let a_tm = check(elab, ctx, a_raw, &dom)?;
            let a_val = eval(&elab.mcx, &ctx.env, &a_tm);
            let res_ty = apply_closure(&elab.mcx, &clos, a_val);
            Ok((Tm::App(Rc::new(f_tm), Rc::new(a_tm), Icit::Impl), res_ty))
        }
        RawArg::Named(Named { name, arg }) => {
            let (mut f_tm, mut f_ty) = infer_bare(elab, ctx, f)?;
            loop {
                match force(&elab.mcx, f_ty.clone()) {
                    Value::Pi(pname, dom, Icit::Impl, clos) if &pname == name => {
                        let a_tm = check(elab, ctx, arg, &dom)?;
                        let a_val = eval(&elab.mcx, &ctx.env, &a_tm);
                        let res_ty = apply_closure(&elab.mcx, &clos, a_val);
                        return Ok((Tm::App(Rc::new(f_tm), Rc::new(a_tm), Icit::Impl), res_ty));
                    }
                    Value::Pi(_, dom, Icit::Impl, clos) => {
                        let (m_tm, m_val) = fresh_meta_value(elab, ctx, (*dom).clone());
                        f_tm = Tm::App(Rc::new(f_tm), Rc::new(m_tm), Icit::Impl);
                        f_ty = apply_closure(&elab.mcx, &clos, m_val);
                    }
                    _ => return Err(ElabError::NoNamedImplicit { span, name: name.clone() }),
                }
            }
        }
    }
}

pub fn check(elab: &Elaborator, ctx: &Ctx, raw: &Raw, expected: &Value) -> Result<Tm, ElabError> {
    match (raw, force(&elab.mcx, expected.clone())) {
        (Raw::Hole(_), expected_ty) => Ok(fresh_meta_term(elab, ctx, expected_ty)),

        (Raw::Lam(_, name, ann, icit, body), Value::Pi(_, dom, pi_icit, clos)) if *icit == pi_icit => {
            if let Some(ann_raw) = ann {
                let ann_tm = check(elab, ctx, ann_raw, &Value::Universe)?;
                let ann_val = eval(&elab.mcx, &ctx.env, &ann_tm);
                unify_types(elab, ctx.lvl(), &dom, &ann_val)
                    .map_err(|e| ElabError::UnifyFailure { span: raw.span(), reason: e })?;
            }
            let new_ctx = ctx.bind(name.clone(), (*dom).clone());
            let body_expected = apply_closure(&elab.mcx, &clos, Value::rigid(ctx.lvl()));
            let body_tm = check(elab, &new_ctx, body, &body_expected)?;
            Ok(Tm::Lam(name.clone(), *icit, Rc::new(body_tm)))
        }

        // Implicit insertion on the checking side: an implicit Pi can be
        // checked against with anything that isn't itself an implicit
        // lambda, by inserting the binder ourselves.
        (raw, Value::Pi(pname, dom, Icit::Impl, clos)) if !matches!(raw, Raw::Lam(_, _, _, Icit::Impl, _)) => {
            let new_ctx = ctx.bind(pname.clone(), (*dom).clone());
            let body_expected = apply_closure(&elab.mcx, &clos, Value::rigid(ctx.lvl()));
            let body_tm = check(elab, &new_ctx, raw, &body_expected)?;
            Ok(Tm::Lam(pname, Icit::Impl, Rc::new(body_tm)))
        }

        (Raw::Let(span, name, ty_opt, value, body), expected_ty) => {
            let (value_tm, value_ty, ty_tm) = match ty_opt {
                Some(ty_raw) => {
                    let ty_tm = check(elab, ctx, ty_raw, &Value::Universe)?;
                    let ty_val = eval(&elab.mcx, &ctx.env, &ty_tm);
                    let value_tm = check(elab, ctx, value, &ty_val)?;
                    (value_tm, ty_val, ty_tm)
                }
                None => {
                    let (value_tm, value_ty) = infer(elab, ctx, value)?;
                    let ty_tm = quote(&elab.mcx, ctx.lvl(), value_ty.clone(), false);
                    (value_tm, value_ty, ty_tm)
                }
            };
            let value_val = eval(&elab.mcx, &ctx.env, &value_tm);
            let new_ctx = ctx.define(name.clone(), value_ty, value_val);
            let body_tm = check(elab, &new_ctx, body, &expected_ty)?;
            let _ = span;
            Ok(Tm::Let(name.clone(), Rc::new(ty_tm), Rc::new(value_tm), Rc::new(body_tm)))
        }

        (raw, expected_ty) => {
            let (tm, inferred_ty) = infer(elab, ctx, raw)?;
            unify_types(elab, ctx.lvl(), &expected_ty, &inferred_ty).map_err(|_| ElabError::Mismatch {
                span: raw.span(),
                expected_desc: describe(elab, ctx.lvl(), &expected_ty),
                found_desc: describe(elab, ctx.lvl(), &inferred_ty),
            })?;
            Ok(tm)
        }
    }
}

/// The result of elaborating one declaration, for the `[elaborate]` /
/// `[normalize]` tags to report back to the driver's caller.
pub struct DeclReport {
    pub name: Symbol,
    pub elaborated: Option<String>,
    pub normal_form: Option<String>,
}

/// Elaborate an entire program, stopping at the first error — this
/// implementation has no error-recovery/resume machinery, so later
/// declarations are never attempted once an earlier one fails.
pub fn drive_program(elab: &Elaborator, program: &Program) -> Result<Vec<DeclReport>, ElabError> {
    let mut reports = Vec::new();
    for decl in &program.decls {
        let span = tracing::debug_span!("elaborate_decl", name = %decl.name());
        let _enter = span.enter();
        reports.push(drive_decl(elab, decl)?);
    }
    Ok(reports)
}

fn drive_decl(elab: &Elaborator, decl: &Decl) -> Result<DeclReport, ElabError> {
    match decl {
        Decl::Assume { span, name, ty } => {
            if elab.mcx.has_top(name) {
                return Err(ElabError::DuplicateTopLevel { span: *span, name: name.clone() });
            }
            let ty_tm = check(elab, &Ctx::empty(), ty, &Value::Universe)?;
            let ty_val = eval(&elab.mcx, &Env::new(), &ty_tm);
            check_fully_solved(elab, *span)?;
            elab.mcx.register_top_type(name.clone(), ty_val);
            elab.mcx.register_assumed(name.clone());
            Ok(DeclReport { name: name.clone(), elaborated: None, normal_form: None })
        }
        Decl::Define { span, name, ty, body, tags } => {
            if elab.mcx.has_top(name) {
                return Err(ElabError::DuplicateTopLevel { span: *span, name: name.clone() });
            }
            let (body_tm, body_ty) = match ty {
                Some(ty_raw) => {
                    let ty_tm = check(elab, &Ctx::empty(), ty_raw, &Value::Universe)?;
                    let ty_val = eval(&elab.mcx, &Env::new(), &ty_tm);
                    let body_tm = check(elab, &Ctx::empty(), body, &ty_val)?;
                    (body_tm, ty_val)
                }
                None => infer(elab, &Ctx::empty(), body)?,
            };
            check_fully_solved(elab, *span)?;

            let body_rc = Rc::new(body_tm);
            elab.mcx.register_top_type(name.clone(), body_ty.clone());
            elab.mcx.register_top(name.clone(), body_rc.clone(), Env::new());

            let elaborated = if tags.contains(&Tag::Elaborate) {
                tracing::debug!(decl = %name, "reporting elaborated term");
                Some(crate::pretty::print_tm(&body_rc))
            } else {
                None
            };
            let normal_form = if tags.contains(&Tag::Normalize) {
                let nf = crate::core::eval::normal_form(&elab.mcx, &Env::new(), &body_rc);
                tracing::debug!(decl = %name, "reporting normal form");
                Some(crate::pretty::print_tm(&nf))
            } else {
                None
            };
            Ok(DeclReport { name: name.clone(), elaborated, normal_form })
        }
    }
}

fn check_fully_solved(elab: &Elaborator, span: Span) -> Result<(), ElabError> {
    let unsolved = elab.mcx.unsolved();
    if unsolved.is_empty() {
        Ok(())
    } else {
        Err(ElabError::UnsolvedMetas { span, metas: unsolved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Parser;

    fn elaborate_src(src: &str) -> Result<Vec<DeclReport>, ElabError> {
        let mut parser = Parser::new(src).unwrap();
        let program = parser.parse_program().unwrap();
        let elab = Elaborator::new();
        drive_program(&elab, &program)
    }

    #[test]
    fn identity_function_elaborates() {
        let reports = elaborate_src("id : {A : U} -> A -> A = \\{A} x. x;").unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn applying_identity_to_universe_typechecks() {
        elaborate_src(
            "id : {A : U} -> A -> A = \\{A} x. x;\n\
             test : U = id U;",
        )
        .unwrap();
    }

    #[test]
    fn unbound_variable_is_rejected() {
        let err = elaborate_src("bad : U = nope;").unwrap_err();
        assert!(matches!(err, ElabError::UnboundVariable { .. }));
    }

    #[test]
    fn duplicate_top_level_definition_is_rejected() {
        let err = elaborate_src("a : U = U;\na : U = U;").unwrap_err();
        assert!(matches!(err, ElabError::DuplicateTopLevel { .. }));
    }

    #[test]
    fn assume_introduces_an_opaque_constant() {
        elaborate_src("assume Nat : U;\nn : U = Nat;").unwrap();
    }

    #[test]
    fn let_binding_typechecks_body() {
        elaborate_src("test : U = let x : U = U; x;").unwrap();
    }

    #[test]
    fn implicit_argument_can_be_supplied_by_name() {
        elaborate_src(
            "const : {A : U} -> {B : U} -> A -> B -> A = \\{A} {B} x y. x;\n\
             test : U = const {B = U} U U;",
        )
        .unwrap();
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let err = elaborate_src(
            "assume Nat : U;\nassume Bool : U;\nassume zero : Nat;\nbad : Bool = zero;",
        )
        .unwrap_err();
        assert!(matches!(err, ElabError::Mismatch { .. }));
    }
}
