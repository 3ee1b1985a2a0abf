//! Tree-walking evaluator.
//!
//! Evaluates AST nodes against an [`ExecutionContext`].
//!
//! # Evaluation Semantics
//!
//! - Children are evaluated left to right; `and`/`or` always evaluate both sides
//! - Price fields read `series[current_index]`
//! - Indicators run over `series[0..=current_index]` and read their value at the
//!   current index; an undefined value is [`EvalErrorKind::InsufficientHistory`]
//! - `expr[n]` evaluates `expr` with the index moved back `n` candles
//! - Division by zero follows float semantics (`inf`, `NaN`) and is not an error

use crate::domain::ast::{BinaryOperator, Node, Program, UnaryOperator};
use crate::domain::builtin::{Builtin, Signature};
use crate::domain::context::ExecutionContext;
use crate::domain::error::{EvalError, EvalErrorKind};
use crate::domain::indicator;
use crate::domain::ohlcv::{PriceField, field_values};
use crate::domain::value::Value;
use std::cmp::Ordering;

/// Evaluate every statement of `program` in order; the result is the value of
/// the last one.
pub fn evaluate_program(
    program: &Program,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Value, EvalError> {
    let mut result = Value::Na;
    for statement in program.statements() {
        result = evaluate(statement, ctx)?;
    }
    Ok(result)
}

pub fn evaluate(node: &Node, ctx: &mut ExecutionContext<'_>) -> Result<Value, EvalError> {
    match node {
        Node::NumberLiteral { value } => Ok(Value::Number(*value)),
        Node::StringLiteral { value } => Ok(Value::Str(value.clone())),
        Node::BoolLiteral { value } => Ok(Value::Bool(*value)),
        Node::Identifier { name } => ctx.lookup(name),
        Node::PriceField { field } => Ok(Value::Number(ctx.current_candle()?.field(*field))),
        Node::BinaryOp {
            operator,
            left,
            right,
        } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            apply_binary(*operator, left, right)
        }
        Node::UnaryOp { operator, operand } => {
            let operand = evaluate(operand, ctx)?;
            apply_unary(*operator, operand)
        }
        Node::FunctionCall { name, args } => call_function(name, args, ctx),
        Node::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, ctx)?.is_truthy() {
                evaluate(then, ctx)
            } else {
                match otherwise {
                    Some(branch) => evaluate(branch, ctx),
                    None => Ok(Value::Na),
                }
            }
        }
        Node::Assignment {
            identifier,
            expression,
        } => {
            let value = evaluate(expression, ctx)?;
            ctx.bind(identifier, value.clone());
            Ok(value)
        }
        Node::BuyCondition { condition } => Ok(if evaluate(condition, ctx)?.is_truthy() {
            Value::Bool(true)
        } else {
            Value::Na
        }),
        Node::SellCondition { condition } => Ok(if evaluate(condition, ctx)?.is_truthy() {
            Value::Bool(false)
        } else {
            Value::Na
        }),
        Node::Strategy { rules, .. } => {
            let mut buy = false;
            let mut sell = false;
            for rule in rules {
                match evaluate(rule, ctx)? {
                    Value::Bool(true) => buy = true,
                    Value::Bool(false) => sell = true,
                    _ => {}
                }
            }
            Ok(match (buy, sell) {
                (true, false) => Value::Bool(true),
                (false, true) => Value::Bool(false),
                _ => Value::Na,
            })
        }
        Node::IndexAccess { object, index } => {
            let offset = history_offset(&evaluate(index, ctx)?)?;
            let current = ctx.current_index();
            if offset > current {
                return Err(EvalError::new(
                    EvalErrorKind::InvalidIndex,
                    format!("index [{offset}] reaches before the first candle (current index {current})"),
                ));
            }
            ctx.set_index(current - offset);
            let result = evaluate(object, ctx);
            ctx.set_index(current);
            result
        }
    }
}

fn history_offset(value: &Value) -> Result<usize, EvalError> {
    match value {
        Value::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        Value::Number(n) => Err(EvalError::new(
            EvalErrorKind::InvalidIndex,
            format!("history index must be a non-negative integer, got {n}"),
        )),
        other => Err(EvalError::type_mismatch(format!(
            "history index must be a number, got {}",
            other.type_name()
        ))),
    }
}

fn apply_unary(operator: UnaryOperator, operand: Value) -> Result<Value, EvalError> {
    match operator {
        UnaryOperator::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOperator::Neg => match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            Value::Na => Ok(Value::Na),
            other => Err(EvalError::type_mismatch(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

fn apply_binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    match operator {
        BinaryOperator::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOperator::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOperator::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOperator::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOperator::Gt => compare(operator, &left, &right, |o| o == Ordering::Greater),
        BinaryOperator::Ge => compare(operator, &left, &right, |o| o != Ordering::Less),
        BinaryOperator::Lt => compare(operator, &left, &right, |o| o == Ordering::Less),
        BinaryOperator::Le => compare(operator, &left, &right, |o| o != Ordering::Greater),
        BinaryOperator::Add => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            _ => arithmetic(operator, &left, &right, |a, b| a + b),
        },
        BinaryOperator::Sub => arithmetic(operator, &left, &right, |a, b| a - b),
        BinaryOperator::Mul => arithmetic(operator, &left, &right, |a, b| a * b),
        BinaryOperator::Div => arithmetic(operator, &left, &right, |a, b| a / b),
        BinaryOperator::Mod => arithmetic(operator, &left, &right, |a, b| a % b),
        BinaryOperator::Pow => arithmetic(operator, &left, &right, f64::powf),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Na, Value::Na) => true,
        _ => false,
    }
}

fn compare(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::Na, _) | (_, Value::Na) => None,
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(operator, left, right)),
    };
    // Na and NaN are unordered: every relational test is false.
    Ok(Value::Bool(ordering.is_some_and(test)))
}

fn arithmetic(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
        (Value::Na, _) | (_, Value::Na) => Ok(Value::Na),
        _ => Err(mismatch(operator, left, right)),
    }
}

fn mismatch(operator: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "cannot apply '{}' to {} and {}",
        operator.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn call_function(
    name: &str,
    args: &[Node],
    ctx: &mut ExecutionContext<'_>,
) -> Result<Value, EvalError> {
    let builtin = Builtin::from_name(name).ok_or_else(|| EvalError::unknown_function(name))?;

    let arity = builtin.arity();
    if args.len() != arity {
        let noun = if arity == 1 { "argument" } else { "arguments" };
        return Err(EvalError::new(
            EvalErrorKind::WrongArity,
            format!(
                "{name} requires {arity} {noun}: {}, got {}",
                builtin.parameters(),
                args.len()
            ),
        ));
    }

    match builtin.signature() {
        Signature::SourcePeriod => {
            let field = source_field(name, &args[0])?;
            let period = period_argument(name, evaluate(&args[1], ctx)?)?;
            let history = ctx.history()?;
            let compute = source_indicator(builtin).ok_or_else(|| EvalError::unknown_function(name))?;
            let series = compute(&field_values(history, field), period);
            current_value(name, &series, ctx.current_index())
        }
        Signature::CandlePeriod => {
            evaluate(&args[0], ctx)?;
            let period = period_argument(name, evaluate(&args[1], ctx)?)?;
            let history = ctx.history()?;
            let series = indicator::atr(history, period);
            current_value(name, &series, ctx.current_index())
        }
        Signature::Scalar(_) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx)?);
            }
            apply_scalar(builtin, name, &values)
        }
    }
}

fn source_indicator(builtin: Builtin) -> Option<fn(&[f64], usize) -> Vec<f64>> {
    match builtin {
        Builtin::Sma => Some(indicator::sma),
        Builtin::Ema => Some(indicator::ema),
        Builtin::Wma => Some(indicator::wma),
        Builtin::Rsi => Some(indicator::rsi),
        Builtin::Stdev => Some(indicator::stdev),
        Builtin::Roc => Some(indicator::roc),
        _ => None,
    }
}

fn source_field(name: &str, source: &Node) -> Result<PriceField, EvalError> {
    match source {
        Node::PriceField { field } => Ok(*field),
        _ => Err(EvalError::invalid_argument(format!(
            "{name}: source must be a price field (open, high, low, close, volume)"
        ))),
    }
}

fn period_argument(name: &str, value: Value) -> Result<usize, EvalError> {
    match value {
        Value::Number(n) if n.is_finite() && n >= 1.0 && n.fract() == 0.0 => Ok(n as usize),
        other => Err(EvalError::invalid_argument(format!(
            "{name}: period must be a positive integer, got {other}"
        ))),
    }
}

fn current_value(name: &str, series: &[f64], index: usize) -> Result<Value, EvalError> {
    match series.last() {
        Some(value) if !value.is_nan() => Ok(Value::Number(*value)),
        _ => Err(EvalError::new(
            EvalErrorKind::InsufficientHistory,
            format!("{name} is undefined at index {index}: not enough history"),
        )),
    }
}

fn apply_scalar(builtin: Builtin, name: &str, values: &[Value]) -> Result<Value, EvalError> {
    if values.iter().any(|v| *v == Value::Na) {
        return Ok(match builtin {
            Builtin::Crossover | Builtin::Crossunder => Value::Bool(false),
            _ => Value::Na,
        });
    }

    let mut numbers = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Number(n) => numbers.push(*n),
            other => {
                return Err(EvalError::type_mismatch(format!(
                    "{name} expects numbers, got {}",
                    other.type_name()
                )));
            }
        }
    }

    match (builtin, numbers.as_slice()) {
        (Builtin::Abs, [x]) => Ok(Value::Number(x.abs())),
        (Builtin::Max, [a, b]) => Ok(Value::Number(a.max(*b))),
        (Builtin::Min, [a, b]) => Ok(Value::Number(a.min(*b))),
        (Builtin::Crossover, [a, b]) => Ok(Value::Bool(indicator::crossover(*a, *b))),
        (Builtin::Crossunder, [a, b]) => Ok(Value::Bool(indicator::crossunder(*a, *b))),
        _ => Err(EvalError::unknown_function(name)),
    }
}
