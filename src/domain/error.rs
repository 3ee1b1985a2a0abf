//! Domain error types.

use crate::domain::ohlcv::SeriesError;

/// An unrecognized character sequence in DSL source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lex error at line {line}, column {column}: {message}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn display_with_context(&self, input: &str) -> String {
        with_caret(input, self.line, self.column, &self.to_string())
    }
}

/// A parse error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        with_caret(input, self.line, self.column, &self.to_string())
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            position: err.position,
            line: err.line,
            column: err.column,
        }
    }
}

fn with_caret(input: &str, line: usize, column: usize, err: &str) -> String {
    let source_line = input.lines().nth(line.saturating_sub(1)).unwrap_or("");
    let caret = " ".repeat(column.saturating_sub(1)) + "^";
    format!("{source_line}\n{caret}\n{err}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    UndefinedVariable,
    UnknownFunction,
    WrongArity,
    InvalidIndex,
    InsufficientHistory,
    InvalidArgument,
    TypeMismatch,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedVariable,
            format!("undefined variable: {name}"),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function: {name}"),
        )
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::TypeMismatch, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }
}

/// Top-level error type for quantflow.
#[derive(Debug, thiserror::Error)]
pub enum QuantflowError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<&QuantflowError> for std::process::ExitCode {
    fn from(err: &QuantflowError) -> Self {
        let code: u8 = match err {
            QuantflowError::Io(_) | QuantflowError::Json(_) => 1,
            QuantflowError::ConfigParse { .. }
            | QuantflowError::ConfigMissing { .. }
            | QuantflowError::ConfigInvalid { .. } => 2,
            QuantflowError::Data { .. }
            | QuantflowError::NoData { .. }
            | QuantflowError::Series(_) => 3,
            QuantflowError::Lex(_) | QuantflowError::Parse(_) => 4,
            QuantflowError::Eval(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError {
            message: "unexpected end of input".into(),
            position: 7,
            line: 1,
            column: 8,
        };
        assert_eq!(
            err.to_string(),
            "parse error at line 1, column 8: unexpected end of input"
        );
    }

    #[test]
    fn parse_error_context_points_at_column() {
        let err = ParseError {
            message: "unexpected end of input".into(),
            position: 7,
            line: 1,
            column: 8,
        };
        let rendered = err.display_with_context("close >");
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("close >"));
        assert_eq!(lines.next(), Some("       ^"));
    }

    #[test]
    fn context_uses_the_error_line() {
        let err = LexError {
            message: "unexpected character '@'".into(),
            position: 8,
            line: 2,
            column: 3,
        };
        let rendered = err.display_with_context("x := 1\ny @ 2");
        assert!(rendered.starts_with("y @ 2\n  ^\n"));
    }

    #[test]
    fn lex_error_converts_to_parse_error() {
        let lex = LexError {
            message: "unterminated string".into(),
            position: 4,
            line: 1,
            column: 5,
        };
        let parse: ParseError = lex.into();
        assert_eq!(parse.position, 4);
        assert_eq!(parse.message, "unterminated string");
    }

    #[test]
    fn undefined_variable_names_the_variable() {
        let err = EvalError::undefined_variable("threshold");
        assert_eq!(err.kind, EvalErrorKind::UndefinedVariable);
        assert!(err.to_string().contains("threshold"));
    }
}
