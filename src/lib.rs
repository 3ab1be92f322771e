//! A minimal dependent type theory elaborator.
//!
//! Pipeline: [`syntax`] lexes and parses source text into [`syntax::Raw`],
//! [`elaborate`] bidirectionally checks it against [`core`]'s semantic
//! values (via [`core::eval`]), solving metavariables in [`metacontext`]
//! through [`unify`] and deciding definitional equality through [`convert`].
//! [`pretty`] turns the checked [`core::Tm`] back into readable text for
//! `[elaborate]`/`[normalize]` reporting, and [`config`] reads the optional
//! `stt.toml` project manifest.

pub mod config;
pub mod convert;
pub mod core;
pub mod elaborate;
pub mod errors;
pub mod metacontext;
pub mod pretty;
pub mod repl;
pub mod symbol;
pub mod syntax;
pub mod unify;

use errors::DriverError;
use std::path::Path;

/// Elaborate one source file's full program, returning a report per
/// declaration. This is the entry point both `main` and the integration
/// tests use.
pub fn elaborate_file(path: &Path) -> Result<Vec<elaborate::DeclReport>, DriverError> {
    elaborate_file_with_config(path, &config::Config::default())
}

pub fn elaborate_source(src: &str) -> Result<Vec<elaborate::DeclReport>, DriverError> {
    elaborate_source_with_config(src, &config::Config::default())
}

/// Like [`elaborate_file`], but honors `cfg`'s `[elaborate]` section (the
/// `force_full_convert` debugging knob) instead of always using the default
/// elaborator.
pub fn elaborate_file_with_config(
    path: &Path,
    cfg: &config::Config,
) -> Result<Vec<elaborate::DeclReport>, DriverError> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| DriverError::Config(format!("reading {}: {}", path.display(), e)))?;
    elaborate_source_with_config(&src, cfg)
}

/// Like [`elaborate_source`], but honors `cfg`'s `[elaborate]` section (the
/// `force_full_convert` debugging knob) instead of always using the default
/// elaborator.
pub fn elaborate_source_with_config(
    src: &str,
    cfg: &config::Config,
) -> Result<Vec<elaborate::DeclReport>, DriverError> {
    let mut parser = syntax::Parser::new(src)?;
    let program = parser.parse_program()?;
    let elab = elaborate::Elaborator::with_force_full_convert(cfg.elaborate.force_full_convert);
    let reports = elaborate::drive_program(&elab, &program)?;
    Ok(reports)
}
