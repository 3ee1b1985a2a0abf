mod common;

use common::*;
use quantflow::domain::backtest::{execute_backtest, run_backtest};
use quantflow::domain::error::{EvalErrorKind, QuantflowError};
use quantflow::domain::execution::{EMPTY_CODE, execute, parse_dsl};
use quantflow::domain::parser::parse;
use quantflow::domain::value::{Value, Variables};

fn eval_str(code: &str) -> Value {
    let program = parse(code).unwrap();
    execute(&program, &sample_series(), Variables::new()).unwrap()
}

mod language {
    use super::*;

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Number(14.0));
        assert_eq!(eval_str("(2 + 3) * 4"), Value::Number(20.0));
        assert_eq!(eval_str("2 ^ 3 ^ 2"), Value::Number(512.0));
    }

    #[test]
    fn comparison_on_latest_candle() {
        assert_eq!(eval_str("close > 105"), Value::Bool(true));
        assert_eq!(eval_str("close[4] > 105"), Value::Bool(false));
    }

    #[test]
    fn conditional_without_else_is_na() {
        assert_eq!(eval_str("if close < 100 then 1"), Value::Na);
        assert_eq!(eval_str("if close > 100 then 1 else 2"), Value::Number(1.0));
    }

    #[test]
    fn assignments_feed_the_final_expression() {
        let value = eval_str("fast := sma(close, 2)\nslow := sma(close, 4)\nfast > slow");
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn namespaced_builtins() {
        assert_eq!(eval_str("math.abs(-3)"), Value::Number(3.0));
        assert_eq!(
            eval_str("ta.sma(close, 3) == sma(close, 3)"),
            Value::Bool(true)
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let code = "x := ema(close, 3)\nif x > close[1] and not (close < 100) then x else -x";
        let first = parse(code).unwrap();
        for _ in 0..10 {
            assert_eq!(parse(code).unwrap(), first);
        }
    }
}

mod parse_api {
    use super::*;

    #[test]
    fn empty_code_is_reported() {
        for code in ["", "   \n\t"] {
            let outcome = parse_dsl(code);
            assert!(outcome.ast.is_none());
            assert_eq!(outcome.errors, vec![EMPTY_CODE.to_string()]);
        }
    }

    #[test]
    fn syntax_error_is_reported_not_raised() {
        let outcome = parse_dsl("close >");
        assert!(outcome.ast.is_none());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("line 1"));
    }

    #[test]
    fn lex_and_parse_errors_are_distinguished() {
        assert!(parse_dsl("close @ 5").errors[0].starts_with("lex error"));
        assert!(parse_dsl("close >").errors[0].starts_with("parse error"));
    }

    #[test]
    fn runaway_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let chain = vec!["close"; 5_000].join(" - ");
        for code in [parens, chain, format!("{}1", "not ".repeat(10_000))] {
            let outcome = parse_dsl(&code);
            assert!(outcome.ast.is_none());
            assert!(outcome.errors[0].contains("nested too deeply"));
        }
    }

    #[test]
    fn parenthesized_inner_conditional_is_not_ambiguous() {
        assert!(parse_dsl("if a then (if b then 1 else 2)").warnings.is_empty());
        assert_eq!(parse_dsl("if a then if b then 1 else 2").warnings.len(), 1);
    }

    #[test]
    fn ast_json_shape() {
        let outcome = parse_dsl("if close > 1 then 2 else 3");
        assert!(outcome.is_ok());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ast"]["type"], "Conditional");
        assert_eq!(json["ast"]["condition"]["type"], "BinaryOp");
        assert_eq!(json["ast"]["condition"]["operator"], ">");
        assert_eq!(json["ast"]["condition"]["left"]["field"], "close");
        assert_eq!(json["ast"]["else"]["value"], 3.0);
        assert_eq!(json["errors"].as_array().map(Vec::len), Some(0));
    }
}

mod evaluation_errors {
    use super::*;

    fn eval_err(code: &str) -> EvalErrorKind {
        let program = parse(code).unwrap();
        execute(&program, &sample_series(), Variables::new())
            .unwrap_err()
            .kind
    }

    #[test]
    fn undefined_variable() {
        assert_eq!(eval_err("threshold > 1"), EvalErrorKind::UndefinedVariable);
    }

    #[test]
    fn supplied_variable_resolves() {
        let program = parse("close > threshold").unwrap();
        let mut vars = Variables::new();
        vars.insert("threshold".into(), Value::Number(120.0));
        assert_eq!(
            execute(&program, &sample_series(), vars).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn unknown_function_and_arity() {
        assert_eq!(eval_err("frobnicate(close)"), EvalErrorKind::UnknownFunction);
        assert_eq!(eval_err("sma(close)"), EvalErrorKind::WrongArity);
    }

    #[test]
    fn index_beyond_history() {
        assert_eq!(eval_err("close[5]"), EvalErrorKind::InvalidIndex);
    }

    #[test]
    fn indicator_without_history() {
        assert_eq!(eval_err("sma(close, 10)"), EvalErrorKind::InsufficientHistory);
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        assert_eq!(eval_str("1 / 0"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn empty_series_fails() {
        let program = parse("close").unwrap();
        let err = execute(&program, &Series::default(), Variables::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::InvalidIndex);
    }
}

mod backtest {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn per_candle_results() {
        let program = parse("close > 105").unwrap();
        let results = execute_backtest(&program, &sample_series(), Variables::new());
        let expected: Vec<Option<Value>> = [false, true, true, true, true]
            .into_iter()
            .map(|b| Some(Value::Bool(b)))
            .collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn warmup_steps_are_skipped_not_fatal() {
        let program = parse("sma(close, 3)").unwrap();
        let results = execute_backtest(&program, &sample_series(), Variables::new());
        assert_eq!(results.len(), 5);
        assert!(results[0].is_none());
        assert!(results[1].is_none());
        let value = results[2].as_ref().and_then(Value::as_number).unwrap();
        approx::assert_relative_eq!(value, 316.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn oversized_period_skips_every_step() {
        let program = parse("rsi(close, 10^30) > 50 or wma(close, 10^10) > 0").unwrap();
        let results = execute_backtest(&program, &sample_series(), Variables::new());
        assert_eq!(results, vec![None; 5]);
    }

    #[test]
    fn variables_persist_across_steps() {
        let program = parse("count := count + 1\ncount").unwrap();
        let mut vars = Variables::new();
        vars.insert("count".into(), Value::Number(0.0));
        let run = run_backtest(&program, &sample_series(), vars, None);
        assert_eq!(run.values().last(), Some(&Some(Value::Number(5.0))));
        assert_eq!(run.variables.get("count"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let program = parse("ema(close, 3) > sma(close, 2) or rsi(close, 2) > 50").unwrap();
        let series = generate_series(60, 100.0);
        let first = execute_backtest(&program, &series, Variables::new());
        let second = execute_backtest(&program, &series, Variables::new());
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_before_start() {
        let program = parse("close").unwrap();
        let cancel = AtomicBool::new(true);
        let run = run_backtest(&program, &sample_series(), Variables::new(), Some(&cancel));
        assert!(run.cancelled);
        assert!(run.steps.is_empty());
    }
}

mod signals {
    use super::*;
    use quantflow::domain::position::{Position, Side};
    use quantflow::domain::strategy::{Action, execute_strategy};
    use std::collections::HashMap;

    #[test]
    fn buy_flat_and_sell_open() {
        let program = parse("close > 105").unwrap();
        let mut candles = HashMap::new();
        candles.insert("UP".to_string(), sample_series());
        candles.insert("DOWN".to_string(), series_from_closes(&[110.0, 100.0]));

        let mut positions = HashMap::new();
        positions.insert(
            "DOWN".to_string(),
            Position {
                symbol: "DOWN".into(),
                size: 4.0,
                side: Side::Long,
                entry_price: 108.0,
            },
        );

        let signals = execute_strategy(&program, &candles, &positions);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].symbol, "DOWN");
        assert_eq!(signals[0].action, Action::Sell);
        assert_eq!(signals[0].quantity, 4.0);
        assert_eq!(signals[1].symbol, "UP");
        assert_eq!(signals[1].action, Action::Buy);
        assert_eq!(signals[1].timestamp, 5000);
    }
}

mod universe {
    use super::*;
    use quantflow::domain::universe::load_universe;

    #[test]
    fn skips_failing_and_empty_symbols() {
        let port = MockDataPort::new()
            .with_series("AAA", sample_series())
            .with_series("EMPTY", Series::default())
            .with_error("BAD", "feed down");
        let symbols = vec!["AAA".to_string(), "EMPTY".to_string(), "BAD".to_string()];

        let universe = load_universe(&port, &symbols).unwrap();
        assert_eq!(universe.symbols(), vec!["AAA"]);
        assert_eq!(universe.skipped.len(), 2);
    }

    #[test]
    fn nothing_loaded_is_an_error() {
        let port = MockDataPort::new().with_error("BAD", "feed down");
        let result = load_universe(&port, &["BAD".to_string()]);
        assert!(matches!(result, Err(QuantflowError::NoData { .. })));
    }
}

mod indicator_properties {
    use proptest::prelude::*;
    use quantflow::domain::indicator::{rsi, sma};

    proptest! {
        #[test]
        fn sma_is_window_mean(
            values in prop::collection::vec(1.0f64..1000.0, 1..60),
            period in 1usize..20,
        ) {
            let result = sma(&values, period);
            prop_assert_eq!(result.len(), values.len());
            for (i, v) in result.iter().enumerate() {
                if i + 1 < period {
                    prop_assert!(v.is_nan());
                } else {
                    let window = &values[i + 1 - period..=i];
                    let mean = window.iter().sum::<f64>() / period as f64;
                    prop_assert!((v - mean).abs() < 1e-6);
                }
            }
        }

        #[test]
        fn rsi_is_bounded(
            values in prop::collection::vec(1.0f64..1000.0, 2..80),
            period in 1usize..15,
        ) {
            for v in rsi(&values, period) {
                prop_assert!(v.is_nan() || (0.0..=100.0).contains(&v));
            }
        }
    }
}
