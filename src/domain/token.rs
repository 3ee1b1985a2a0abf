//! Tokens produced by the lexer and consumed by the parser.

use crate::domain::builtin::Builtin;
use crate::domain::ohlcv::PriceField;
use std::fmt;

/// Location of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Identifier(String),
    Keyword(Keyword),
    Operator(Operator),
    Punctuation(Punctuation),
    /// Statement separator; suppressed inside parentheses and brackets.
    Newline,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    If,
    Then,
    Else,
    True,
    False,
    Strategy,
    Buy,
    Sell,
    Price(PriceField),
    Function(Builtin),
}

impl Keyword {
    /// Reserved words, including price fields and builtin function names.
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "if" => Keyword::If,
            "then" => Keyword::Then,
            "else" => Keyword::Else,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "strategy" => Keyword::Strategy,
            "buy" => Keyword::Buy,
            "sell" => Keyword::Sell,
            _ => {
                if let Some(field) = PriceField::from_name(word) {
                    Keyword::Price(field)
                } else {
                    Keyword::Function(Builtin::from_name(word)?)
                }
            }
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    EqualEqual,
    NotEqual,
    /// `:=` or a lone `=`.
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Str(s) => write!(f, "string \"{s}\""),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Keyword(_) => write!(f, "keyword"),
            TokenKind::Operator(_) => write!(f, "operator"),
            TokenKind::Punctuation(_) => write!(f, "punctuation"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

impl Token {
    /// Human-readable description used in parse error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Newline | TokenKind::Eof => self.kind.to_string(),
            _ => format!("'{}'", self.lexeme),
        }
    }
}
