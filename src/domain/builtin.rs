//! Builtin function table.
//!
//! Every builtin answers to a bare name and a namespaced one (`sma` and
//! `ta.sma`, `abs` and `math.abs`). The lexer treats all of them as keywords.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sma,
    Ema,
    Wma,
    Rsi,
    Atr,
    Stdev,
    Roc,
    Crossover,
    Crossunder,
    Abs,
    Max,
    Min,
}

/// How a builtin consumes its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// `(source, period)` over a price field of the candle history.
    SourcePeriod,
    /// `(source, period)` over full candles; the source is evaluated but
    /// true range always reads high, low and close.
    CandlePeriod,
    /// Plain numeric arguments.
    Scalar(usize),
}

impl Builtin {
    pub const ALL: [Builtin; 12] = [
        Builtin::Sma,
        Builtin::Ema,
        Builtin::Wma,
        Builtin::Rsi,
        Builtin::Atr,
        Builtin::Stdev,
        Builtin::Roc,
        Builtin::Crossover,
        Builtin::Crossunder,
        Builtin::Abs,
        Builtin::Max,
        Builtin::Min,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name
            .strip_prefix("ta.")
            .or_else(|| name.strip_prefix("math."))
            .unwrap_or(name);
        let builtin = Self::ALL.into_iter().find(|b| b.name() == bare)?;
        match name.split_once('.') {
            None => Some(builtin),
            Some((namespace, _)) if namespace == builtin.namespace() => Some(builtin),
            Some(_) => None,
        }
    }

    /// Bare name, without namespace.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sma => "sma",
            Builtin::Ema => "ema",
            Builtin::Wma => "wma",
            Builtin::Rsi => "rsi",
            Builtin::Atr => "atr",
            Builtin::Stdev => "stdev",
            Builtin::Roc => "roc",
            Builtin::Crossover => "crossover",
            Builtin::Crossunder => "crossunder",
            Builtin::Abs => "abs",
            Builtin::Max => "max",
            Builtin::Min => "min",
        }
    }

    pub fn namespace(self) -> &'static str {
        match self {
            Builtin::Abs | Builtin::Max | Builtin::Min => "math",
            _ => "ta",
        }
    }

    pub fn signature(self) -> Signature {
        match self {
            Builtin::Sma
            | Builtin::Ema
            | Builtin::Wma
            | Builtin::Rsi
            | Builtin::Stdev
            | Builtin::Roc => Signature::SourcePeriod,
            Builtin::Atr => Signature::CandlePeriod,
            Builtin::Crossover | Builtin::Crossunder | Builtin::Max | Builtin::Min => {
                Signature::Scalar(2)
            }
            Builtin::Abs => Signature::Scalar(1),
        }
    }

    pub fn arity(self) -> usize {
        match self.signature() {
            Signature::SourcePeriod | Signature::CandlePeriod => 2,
            Signature::Scalar(n) => n,
        }
    }

    /// Argument names, for arity error messages.
    pub fn parameters(self) -> &'static str {
        match self.signature() {
            Signature::SourcePeriod | Signature::CandlePeriod => "source, period",
            Signature::Scalar(1) => "value",
            Signature::Scalar(_) => match self {
                Builtin::Crossover | Builtin::Crossunder => "series1, series2",
                _ => "value1, value2",
            },
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.name())
    }
}
