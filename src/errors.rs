//! Elaboration-time errors.
//!
//! Like the rest of this crate, no `thiserror`/`anyhow`: a plain enum with
//! a hand-written `Display` and an empty `std::error::Error` impl, matching
//! how this codebase's other error types are built.

use crate::core::MetaVar;
use crate::symbol::Symbol;
use crate::syntax::Span;
use crate::unify::UnifyError;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ElabError {
    UnboundVariable { span: Span, name: Symbol },
    /// Two types failed to unify while checking or inferring at `span`.
    Mismatch { span: Span, expected_desc: String, found_desc: String },
    /// Unification hit something outside the pattern fragment it can
    /// solve; reported as a hard failure rather than postponed, since this
    /// implementation has no constraint-postponement machinery.
    UnifyFailure { span: Span, reason: UnifyError },
    /// `check` was asked to check a term against a non-function type at an
    /// application, or a lambda against a non-Pi type.
    NotAFunctionType { span: Span, found_desc: String },
    /// A named implicit argument `{name = t}` didn't match any binder name
    /// visible in the function's (possibly partially-applied) Pi spine.
    NoNamedImplicit { span: Span, name: Symbol },
    /// `name` was declared with `assume` or `=` more than once at the top
    /// level.
    DuplicateTopLevel { span: Span, name: Symbol },
    /// One or more metavariables were never solved by the end of
    /// elaborating a declaration.
    UnsolvedMetas { span: Span, metas: Vec<MetaVar> },
}

impl fmt::Display for ElabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElabError::UnboundVariable { span, name } => {
                write!(f, "{}: unbound variable `{}`", span, name)
            }
            ElabError::Mismatch { span, expected_desc, found_desc } => {
                write!(f, "{}: type mismatch\n  expected: {}\n  found:    {}", span, expected_desc, found_desc)
            }
            ElabError::UnifyFailure { span, reason } => {
                write!(f, "{}: failed to unify ({:?})", span, reason)
            }
            ElabError::NotAFunctionType { span, found_desc } => {
                write!(f, "{}: expected a function type, found {}", span, found_desc)
            }
            ElabError::NoNamedImplicit { span, name } => {
                write!(f, "{}: no implicit argument named `{}` here", span, name)
            }
            ElabError::DuplicateTopLevel { span, name } => {
                write!(f, "{}: `{}` is already defined at the top level", span, name)
            }
            ElabError::UnsolvedMetas { span, metas } => {
                write!(f, "{}: unsolved metavariables: {:?}", span, metas)
            }
        }
    }
}

impl std::error::Error for ElabError {}

/// Aggregates a lex/parse/elaborate error for the top-level driver, which
/// can fail at any of those three stages before it ever gets to run one.
#[derive(Debug, Clone)]
pub enum DriverError {
    Parse(crate::syntax::ParseError),
    Elab(ElabError),
    Config(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Parse(e) => write!(f, "parse error: {}", e),
            DriverError::Elab(e) => write!(f, "{}", e),
            DriverError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<crate::syntax::ParseError> for DriverError {
    fn from(e: crate::syntax::ParseError) -> Self {
        DriverError::Parse(e)
    }
}

impl From<ElabError> for DriverError {
    fn from(e: ElabError) -> Self {
        DriverError::Elab(e)
    }
}
