//! Diagnostic plumbing (spec.md 6.2): severities, the core diagnostic code
//! set, and the message sink that accumulates them during a compilation.

use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The core diagnostic codes a `dynacore`-based compiler can emit. A host
/// `Language` is free to add its own codes to its own enum; these are the
/// ones the platform itself raises.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCode {
    CannotConvertType,
    VariableAssignedToSelf,
    ReadOnlyVariableAssigned,
    WrongOperatorArity,
    CannotApplyOperator2,
    AmbiguousCall,
    ExpectedValue,
    InternalCompilerError,
}

impl DiagnosticCode {
    pub fn default_severity(self) -> Severity {
        use DiagnosticCode::*;
        match self {
            VariableAssignedToSelf => Severity::Warning,
            CannotConvertType
            | ReadOnlyVariableAssigned
            | WrongOperatorArity
            | CannotApplyOperator2
            | AmbiguousCall
            | ExpectedValue
            | InternalCompilerError => Severity::Error,
        }
    }

    fn format(self, args: &[String]) -> String {
        use DiagnosticCode::*;
        match self {
            CannotConvertType => format!(
                "cannot convert type `{}` to `{}`",
                args.get(0).map(String::as_str).unwrap_or("?"),
                args.get(1).map(String::as_str).unwrap_or("?"),
            ),
            VariableAssignedToSelf => {
                "variable is assigned to itself".to_string()
            }
            ReadOnlyVariableAssigned => format!(
                "cannot assign to read-only variable `{}`",
                args.get(0).map(String::as_str).unwrap_or("?"),
            ),
            WrongOperatorArity => format!(
                "operator `{}` called with the wrong number of operands",
                args.get(0).map(String::as_str).unwrap_or("?"),
            ),
            CannotApplyOperator2 => format!(
                "cannot apply operator `{}` to operands of type `{}` and `{}`",
                args.get(0).map(String::as_str).unwrap_or("?"),
                args.get(1).map(String::as_str).unwrap_or("?"),
                args.get(2).map(String::as_str).unwrap_or("?"),
            ),
            AmbiguousCall => format!(
                "ambiguous call to operator overload `{}`",
                args.get(0).map(String::as_str).unwrap_or("?"),
            ),
            ExpectedValue => "expected a value-producing expression here".to_string(),
            InternalCompilerError => format!(
                "internal compiler error: {}",
                args.get(0).map(String::as_str).unwrap_or("?"),
            ),
        }
    }

    /// Render a concrete message, promoting warnings to errors when the
    /// caller's policy asks for it.
    pub fn to_message(
        self,
        treat_warnings_as_errors: bool,
        source_name: impl Into<String>,
        position: FilePosition,
        args: &[String],
    ) -> OutputMessage {
        let mut severity = self.default_severity();
        if treat_warnings_as_errors && severity == Severity::Warning {
            severity = Severity::Error;
        }
        OutputMessage {
            severity,
            code: self,
            message: self.format(args),
            source_name: source_name.into(),
            position,
        }
    }
}

/// Source position, shared by diagnostics and AST nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePosition {
    pub line: u32,
    pub column: u32,
}

impl FilePosition {
    pub const START: FilePosition = FilePosition { line: 1, column: 1 };
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputMessage {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub source_name: String,
    pub position: FilePosition,
}

impl fmt::Display for OutputMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {}:{}:{}: {}",
            self.severity, self.source_name, self.position.line, self.position.column, self.message
        )
    }
}

/// Accumulates diagnostics for a single compilation. Not thread-safe by
/// itself; lives behind the thread-local [`crate::state::CompilerState`].
#[derive(Debug, Default)]
pub struct MessageSink {
    messages: Vec<OutputMessage>,
}

impl MessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: OutputMessage) {
        log::debug!("{}", message);
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[OutputMessage] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &OutputMessage> {
        self.messages.iter().filter(|m| m.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_promotes_when_policy_set() {
        let msg = DiagnosticCode::VariableAssignedToSelf.to_message(
            true,
            "test.scm",
            FilePosition::START,
            &[],
        );
        assert_eq!(msg.severity, Severity::Error);
    }

    #[test]
    fn warning_stays_warning_by_default() {
        let msg = DiagnosticCode::VariableAssignedToSelf.to_message(
            false,
            "test.scm",
            FilePosition::START,
            &[],
        );
        assert_eq!(msg.severity, Severity::Warning);
    }

    #[test]
    fn sink_tracks_errors() {
        let mut sink = MessageSink::new();
        assert!(!sink.has_errors());
        sink.push(DiagnosticCode::ExpectedValue.to_message(
            false,
            "test.scm",
            FilePosition::START,
            &[],
        ));
        assert!(sink.has_errors());
    }
}
