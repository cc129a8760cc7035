use std::fmt;

use thiserror::Error;

use crate::path::Path;
use crate::span::Span;

/// The compiler's error taxonomy. Each variant carries every
/// span needed to explain itself; nothing here is recovered from locally —
/// the driver collects these into a `Diagnostic` and abandons the model
/// being compiled.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unclosed tag at end of input")]
    UnclosedTag { span: Span },

    #[error("mismatched braces in tag")]
    MismatchedBraces { span: Span },

    #[error("empty identifier in tag")]
    EmptyIdentifier { span: Span },

    #[error("illegal character {found:?} in identifier")]
    IllegalCharacter { found: char, span: Span },

    #[error("section open {open} does not match close {close}")]
    MismatchedSection {
        open: Path,
        open_span: Span,
        close: Path,
        close_span: Span,
    },

    #[error("block {0:?} may not be nested inside a section or inverted section")]
    BlockOutsideParent(String, Span),

    #[error("duplicate block name {name:?} in parent template")]
    DuplicateBlock { name: String, span: Span },

    #[error("partial resolution exceeded depth limit of {limit} while including {name:?}")]
    PartialDepthExceeded {
        name: String,
        limit: usize,
        span: Span,
    },

    #[error("invalid path-mapping rule: prefix {prefix:?} never matches any referenced path")]
    InvalidPathMapping { prefix: String },

    #[error("unknown name {path} in current context")]
    UnknownName { path: Path, span: Span },

    #[error("{path} has type {found}, which is not formattable")]
    NotFormattable {
        path: Path,
        found: String,
        span: Span,
    },

    #[error("lambda {path} invoked with the wrong arity")]
    WrongArity { path: Path, span: Span },

    #[error("unknown partial {name:?}")]
    UnknownPartial { name: String, span: Span },

    #[error("template resource not found: {path:?}")]
    ResourceNotFound { path: String },

    #[error("failed to decode {path:?} as {charset}")]
    DecodingFailure { path: String, charset: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// The spans relevant to this error, in the order they should be
    /// reported. Most errors carry exactly one; `MismatchedSection` reports
    /// both the open and close tag so the mismatch is visible at a glance.
    pub fn spans(&self) -> Vec<&Span> {
        use CompileError::*;
        match self {
            UnclosedTag { span }
            | MismatchedBraces { span }
            | EmptyIdentifier { span }
            | IllegalCharacter { span, .. }
            | UnknownName { span, .. }
            | NotFormattable { span, .. }
            | WrongArity { span, .. }
            | UnknownPartial { span, .. }
            | DuplicateBlock { span, .. }
            | PartialDepthExceeded { span, .. } => vec![span],
            BlockOutsideParent(_, span) => vec![span],
            MismatchedSection {
                open_span,
                close_span,
                ..
            } => vec![open_span, close_span],
            InvalidPathMapping { .. } | ResourceNotFound { .. } | DecodingFailure { .. } => {
                Vec::new()
            }
            Internal(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single reportable line of compiler output: `"<severity>: <file>:<line>:<col>: <message>"`.
/// This is the stable, human-readable output contract; there is
/// deliberately no machine-readable variant.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub spans: Vec<Span>,
    pub model: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, spans: Vec<Span>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            spans,
            model: None,
        }
    }

    pub fn warning(message: impl Into<String>, spans: Vec<Span>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            spans,
            model: None,
        }
    }

    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(err: &CompileError) -> Self {
        let spans = err.spans().into_iter().cloned().collect();
        Diagnostic::error(err.to_string(), spans)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.spans.first() {
            Some(span) => write!(f, "{}: {}: {}", self.severity, span, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Runtime contract errors raised by *generated* code, as opposed to the
/// compiler itself.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer compiled for charset {expected} cannot write to a sink declaring {actual}")]
    UnsupportedCharset { expected: String, actual: String },

    #[error("no registered renderer could process this model")]
    BrokenRenderer,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fmt(#[from] fmt::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_includes_span() {
        let span = Span::new("hello.mustache", 1, 5);
        let diag = Diagnostic::error("unknown name", vec![span.clone()]);
        assert_eq!("error: hello.mustache:1:5: unknown name", diag.to_string());
    }

    #[test]
    fn diagnostic_display_without_span() {
        let diag = Diagnostic::warning("delimiter change is not supported", vec![]);
        assert_eq!(
            "warning: delimiter change is not supported",
            diag.to_string()
        );
    }

    #[test]
    fn mismatched_section_reports_both_spans() {
        let open = Path::keys(vec!["one".into()]);
        let close = Path::keys(vec!["two".into()]);
        let err = CompileError::MismatchedSection {
            open,
            open_span: Span::new("t", 1, 1),
            close,
            close_span: Span::new("t", 3, 1),
        };
        assert_eq!(2, err.spans().len());
    }
}
