//! Parse and single-point execution entry points.
//!
//! `parse_dsl` never fails: lex and parse errors come back as messages so a
//! validating caller can show them. `execute` fails loud; a live decision must
//! not proceed on a silently wrong value.

use crate::domain::ast::Program;
use crate::domain::context::ExecutionContext;
use crate::domain::error::{EvalError, EvalErrorKind};
use crate::domain::eval::evaluate_program;
use crate::domain::ohlcv::Series;
use crate::domain::lexer::tokenize;
use crate::domain::parser::parse_tokens;
use crate::domain::value::{Value, Variables};
use serde::Serialize;
use tracing::debug;

pub const EMPTY_CODE: &str = "Empty code provided";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub ast: Option<Program>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        self.ast.is_some() && self.errors.is_empty()
    }

    fn failed(message: String) -> Self {
        Self {
            ast: None,
            errors: vec![message],
            warnings: Vec::new(),
        }
    }
}

pub fn parse_dsl(code: &str) -> ParseOutcome {
    if code.trim().is_empty() {
        return ParseOutcome::failed(EMPTY_CODE.to_string());
    }

    let tokens = match tokenize(code) {
        Ok(tokens) => tokens,
        Err(e) => return ParseOutcome::failed(e.to_string()),
    };

    match parse_tokens(tokens) {
        Ok(parsed) => {
            debug!(
                statements = parsed.program.statements().len(),
                warnings = parsed.warnings.len(),
                "parsed strategy source"
            );
            ParseOutcome {
                ast: Some(parsed.program),
                errors: Vec::new(),
                warnings: parsed
                    .warnings
                    .into_iter()
                    .map(|w| {
                        format!(
                            "line {}, column {}: {}",
                            w.position.line, w.position.column, w.message
                        )
                    })
                    .collect(),
            }
        }
        Err(e) => ParseOutcome::failed(e.to_string()),
    }
}

/// Evaluate `program` once at the last candle of `series`.
pub fn execute(
    program: &Program,
    series: &Series,
    variables: Variables,
) -> Result<Value, EvalError> {
    if series.is_empty() {
        return Err(EvalError::new(
            EvalErrorKind::InvalidIndex,
            "no candle data to evaluate against",
        ));
    }
    let mut ctx = ExecutionContext::at_latest(series, variables);
    evaluate_program(program, &mut ctx)
}
