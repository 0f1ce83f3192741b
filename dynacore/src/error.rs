//! Error taxonomy (spec.md 7): compile-time exceptions, internal errors, and
//! the runtime exceptions propagated out of interpreted evaluation.
//!
//! Shaped after the teacher's own `error.rs` (`SourceError` / `WithSource`),
//! but built on `thiserror` rather than the now-legacy `failure` crate, to
//! match how the rest of this workspace (and the broader retrieval pack)
//! expresses typed errors.

use crate::diagnostics::FilePosition;
use crate::types::TypeRef;
use serde::Serialize;
use std::fmt::{self, Debug};
use thiserror::Error;

/// An error that can render itself against a slice of the offending source.
pub trait SourceError: Debug + Send + Sync {
    fn fmt_msg(&self, f: &mut fmt::Formatter<'_>, spanned_src: &str) -> fmt::Result;
}

/// Unrecoverable issues that abort the current compilation outright, as
/// opposed to [`CompileError`]s, which are collected and compilation
/// continues where possible.
#[derive(Debug, Error, Serialize)]
pub enum CompileTimeException {
    #[error("no TopLevel environment is active for this thread")]
    MissingTopLevel,
    #[error("function template requires both a list and a dict parameter, which is unsupported: {0}")]
    ConflictingParameterKinds(String),
    #[error("internal compiler error: {0}")]
    Internal(String),
}

/// User-facing compile errors (spec.md 7): syntax, type mismatch, ambiguous
/// overload, read-only redefinition, wrong arity. These are collected via
/// [`crate::diagnostics::MessageSink`] rather than propagated individually,
/// but are also useful as a standalone `Result` error type for APIs that
/// report a single failure (e.g. `FunctionTemplate` construction).
#[derive(Debug, Error, Serialize)]
pub enum CompileError {
    /// A front end's `IScanner`/`IParser` failed to make sense of the
    /// source text (spec.md 7's "syntax" user error).
    #[error("syntax error: {0}")]
    SyntaxError(String),
    #[error("cannot convert `{from}` to `{to}`")]
    CannotConvertType {
        #[serde(skip)]
        from: TypeRef,
        #[serde(skip)]
        to: TypeRef,
    },
    #[error("too many positional arguments")]
    TooManyArguments,
    #[error("too few arguments")]
    TooFewArguments,
    #[error("cannot combine a list parameter and a dict parameter in one function")]
    ConflictingParameterKinds,
    #[error("ambiguous operator overload")]
    AmbiguousOverload,
    #[error("no applicable operator overload")]
    CannotApplyOperator,
}

// `TypeRef` doesn't implement `Serialize` (its identity is a raw pointer);
// `CompileError` variants that carry one skip it and rely on `Display` via
// `thiserror`'s `#[error]` for user-facing text instead.
impl Serialize for TypeRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Runtime errors raised while interpreting a decorated tree (spec.md 7,
/// `interp::evaluate`). Grounded in the teacher's `RuntimeError` (empty
/// input/stack, too-many-cycles) generalized to the dynamic-language
/// vocabulary this platform targets.
#[derive(Debug, Error, Serialize)]
pub enum RuntimeError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("cannot apply operator to these operand types")]
    CantApplyOperator,
    #[error("ambiguous operator overload call")]
    AmbiguousCall,
    #[error("exceeded the maximum number of evaluation steps")]
    TooManyCycles,
    #[error("attempted to write to a read-only variable `{0}`")]
    ReadOnlyVariable(String),
    #[error("value is not callable: {0}")]
    NotCallable(String),
    #[error("argument count mismatch: {0}")]
    ArityMismatch(String),
}

impl SourceError for RuntimeError {
    fn fmt_msg(&self, f: &mut fmt::Formatter<'_>, spanned_src: &str) -> fmt::Result {
        write!(f, "{} (at `{}`)", self, spanned_src)
    }
}

/// Wraps a [`SourceError`] together with the position and source slice that
/// produced it, so it can format itself without external context.
#[derive(Debug, Serialize)]
pub struct SourceErrorWrapper<E: SourceError> {
    error: E,
    position: FilePosition,
    spanned_source: String,
}

impl<E: SourceError> SourceErrorWrapper<E> {
    pub fn new(error: E, position: FilePosition, spanned_source: impl Into<String>) -> Self {
        Self {
            error,
            position,
            spanned_source: spanned_source.into(),
        }
    }

    pub fn error(&self) -> &E {
        &self.error
    }

    pub fn position(&self) -> FilePosition {
        self.position
    }
}

impl<E: SourceError> fmt::Display for SourceErrorWrapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.position.line)?;
        self.error.fmt_msg(f, &self.spanned_source)
    }
}

/// A collection of [`SourceErrorWrapper`]s, plus the full source they refer
/// to, so each can be rendered with its surrounding context on request.
#[derive(Debug, Serialize)]
pub struct WithSource<E: SourceError> {
    errors: Vec<SourceErrorWrapper<E>>,
    source: String,
}

impl<E: SourceError> WithSource<E> {
    pub fn new(
        errors: impl IntoIterator<Item = SourceErrorWrapper<E>>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            source: source.into(),
        }
    }

    pub fn errors(&self) -> &[SourceErrorWrapper<E>] {
        &self.errors
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<E: SourceError> fmt::Display for WithSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}
