//! A minimal Scheme-like front end demonstrating `dynacore`'s `Language`
//! plug-in surface: [`scanner::LispScanner`] and [`parser::LispParser`]
//! implement `IScanner`/`IParser`, [`lang::SchemeLanguage`] ties them
//! together with a decorator pipeline, and [`interp`] tree-walks the
//! decorated result.
//!
//! ```
//! use dynacore::language::{IParser, Language};
//! use dynacore::state::{CompilerOptions, CompilerState};
//! use dynacore::binding::TopLevel;
//! use dynacore::{operator::Value, state};
//!
//! let _guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
//! let top_level = TopLevel::new();
//! let lang = dynalisp::lang::SchemeLanguage::new(&top_level);
//! let mut parser = lang.create_parser(lang.create_scanner());
//! let (mut ast, root) = parser.parse("(+ 1 2 3)", "demo.scm").unwrap();
//! ast.set_scope(root, dynacore::ast::scope::LexicalScope::root());
//! let root = lang.decorate(&mut ast, root, dynacore::language::DecoratorType::Interpreted);
//!
//! let result = dynalisp::interp::run(&ast, root).unwrap();
//! assert!(matches!(result, Value::Long(6)));
//! ```

pub mod interp;
pub mod lang;
pub mod parser;
pub mod scanner;

use dynacore::binding::TopLevel;
use dynacore::error::{CompileError, RuntimeError};
use dynacore::language::{DecoratorType, IParser, Language};
use dynacore::operator::Value;
use std::sync::Arc;
use thiserror::Error;

/// Either stage of running a source string can fail; `main.rs` and tests
/// collapse both into one error to report.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Scan, parse, decorate, and interpret one source string end to end,
/// against a fresh top-level namespace.
pub fn run(source: &str, source_name: &str) -> Result<Value, RunError> {
    let top_level: Arc<TopLevel> = TopLevel::new();
    let lang = lang::SchemeLanguage::new(&top_level);
    let mut parser = lang.create_parser(lang.create_scanner());
    let (mut ast, root) = parser.parse(source, source_name)?;
    ast.set_scope(root, dynacore::ast::scope::LexicalScope::root());
    let root = lang.decorate(&mut ast, root, DecoratorType::Interpreted);
    Ok(interp::run(&ast, root)?)
}
