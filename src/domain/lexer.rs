//! DSL lexer.
//!
//! Turns source text into a token stream. Comments (`// ...`) and horizontal
//! whitespace are dropped. Newlines become [`TokenKind::Newline`] except inside
//! parentheses or brackets, where an expression may span several lines.
//!
//! Dotted names such as `ta.sma` or `math.abs` lex as a single word; there is
//! no member-access syntax.

use crate::domain::error::LexError;
use crate::domain::token::{Keyword, Operator, Position, Punctuation, Token, TokenKind};

struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    nesting: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
            nesting: 0,
            tokens: Vec::new(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn error(&self, start: Position, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: start.offset,
            line: start.line,
            column: start.column,
        }
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let lexeme = self.input[start.offset..self.offset].to_string();
        self.tokens.push(Token {
            kind,
            lexeme,
            position: start,
        });
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_number(&mut self, start: Position) -> Result<(), LexError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[start.offset..self.offset];
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error(start, format!("invalid number: {text}")))?;
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn read_string(&mut self, quote: char, start: Position) -> Result<(), LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escape_start = self.position();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(c) => {
                            return Err(
                                self.error(escape_start, format!("invalid escape sequence: \\{c}"))
                            );
                        }
                        None => return Err(self.error(start, "unterminated string")),
                    }
                }
                Some('\n') | None => return Err(self.error(start, "unterminated string")),
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn is_word_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_word_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    fn read_word(&mut self, start: Position) {
        loop {
            while self.peek().is_some_and(Self::is_word_char) {
                self.advance();
            }
            let dotted = self.peek() == Some('.')
                && self.peek_second().is_some_and(Self::is_word_start);
            if !dotted {
                break;
            }
            self.advance();
        }
        let word = &self.input[start.offset..self.offset];
        let kind = match Keyword::from_word(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word.to_string()),
        };
        self.push(kind, start);
    }

    /// Two-character operators are tried before their one-character prefixes.
    fn read_operator(&mut self, start: Position) -> Result<(), LexError> {
        const TWO_CHAR: [(&str, Operator); 5] = [
            (">=", Operator::GreaterEqual),
            ("<=", Operator::LessEqual),
            ("==", Operator::EqualEqual),
            ("!=", Operator::NotEqual),
            (":=", Operator::Assign),
        ];
        for (text, op) in TWO_CHAR {
            if self.remaining().starts_with(text) {
                self.advance();
                self.advance();
                self.push(TokenKind::Operator(op), start);
                return Ok(());
            }
        }

        let Some(ch) = self.advance() else {
            return Err(self.error(start, "unexpected end of input"));
        };
        let kind = match ch {
            '+' => TokenKind::Operator(Operator::Plus),
            '-' => TokenKind::Operator(Operator::Minus),
            '*' => TokenKind::Operator(Operator::Star),
            '/' => TokenKind::Operator(Operator::Slash),
            '%' => TokenKind::Operator(Operator::Percent),
            '^' => TokenKind::Operator(Operator::Caret),
            '>' => TokenKind::Operator(Operator::Greater),
            '<' => TokenKind::Operator(Operator::Less),
            '=' => TokenKind::Operator(Operator::Assign),
            '(' => {
                self.nesting += 1;
                TokenKind::Punctuation(Punctuation::LeftParen)
            }
            '[' => {
                self.nesting += 1;
                TokenKind::Punctuation(Punctuation::LeftBracket)
            }
            ')' => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::Punctuation(Punctuation::RightParen)
            }
            ']' => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::Punctuation(Punctuation::RightBracket)
            }
            ',' => TokenKind::Punctuation(Punctuation::Comma),
            other => return Err(self.error(start, format!("unexpected character '{other}'"))),
        };
        self.push(kind, start);
        Ok(())
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.peek() {
            let start = self.position();
            match ch {
                '\n' => {
                    self.advance();
                    if self.nesting == 0 {
                        self.push(TokenKind::Newline, start);
                    }
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                '/' if self.peek_second() == Some('/') => self.skip_comment(),
                c if c.is_ascii_digit() => self.read_number(start)?,
                '"' | '\'' => self.read_string(ch, start)?,
                c if Self::is_word_start(c) => self.read_word(start),
                _ => self.read_operator(start)?,
            }
        }
        let end = self.position();
        self.push(TokenKind::Eof, end);
        Ok(self.tokens)
    }
}

/// Tokenize DSL source. The stream always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::builtin::Builtin;
    use crate::domain::ohlcv::PriceField;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("42 3.14"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.14),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        let err = tokenize("5.").unwrap_err();
        assert!(err.message.contains("unexpected character '.'"));
    }

    #[test]
    fn strings_both_quotes() {
        assert_eq!(
            kinds(r#""hello world" 'it\'s'"#),
            vec![
                TokenKind::Str("hello world".into()),
                TokenKind::Str("it's".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!(err.position, 0);
    }

    #[test]
    fn multi_char_operators_win() {
        assert_eq!(
            kinds(">= > == = := != <= <"),
            vec![
                TokenKind::Operator(Operator::GreaterEqual),
                TokenKind::Operator(Operator::Greater),
                TokenKind::Operator(Operator::EqualEqual),
                TokenKind::Operator(Operator::Assign),
                TokenKind::Operator(Operator::Assign),
                TokenKind::Operator(Operator::NotEqual),
                TokenKind::Operator(Operator::LessEqual),
                TokenKind::Operator(Operator::Less),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_before_identifiers() {
        assert_eq!(
            kinds("if close and x"),
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Keyword(Keyword::Price(PriceField::Close)),
                TokenKind::Keyword(Keyword::And),
                TokenKind::Identifier("x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("closed android"),
            vec![
                TokenKind::Identifier("closed".into()),
                TokenKind::Identifier("android".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn dotted_names_are_single_tokens() {
        let tokens = tokenize("ta.sma(close, 20) math.abs strategy.entry").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Function(Builtin::Sma)));
        assert_eq!(tokens[0].lexeme, "ta.sma");
        assert_eq!(
            tokens[6].kind,
            TokenKind::Keyword(Keyword::Function(Builtin::Abs))
        );
        assert_eq!(tokens[7].kind, TokenKind::Identifier("strategy.entry".into()));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x // the rest is ignored\ny"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Newline,
                TokenKind::Identifier("y".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn division_is_not_a_comment() {
        assert_eq!(
            kinds("4 / 2"),
            vec![
                TokenKind::Number(4.0),
                TokenKind::Operator(Operator::Slash),
                TokenKind::Number(2.0),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_parens_are_suppressed() {
        assert_eq!(
            kinds("max(1,\n 2)\n"),
            vec![
                TokenKind::Keyword(Keyword::Function(Builtin::Max)),
                TokenKind::Punctuation(Punctuation::LeftParen),
                TokenKind::Number(1.0),
                TokenKind::Punctuation(Punctuation::Comma),
                TokenKind::Number(2.0),
                TokenKind::Punctuation(Punctuation::RightParen),
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = tokenize("x := 1\n  y").unwrap();
        let y = tokens.iter().find(|t| t.lexeme == "y").unwrap();
        assert_eq!(y.position.line, 2);
        assert_eq!(y.position.column, 3);
        assert_eq!(y.position.offset, 9);
    }

    #[test]
    fn unrecognized_character() {
        let err = tokenize("close @ 5").unwrap_err();
        assert_eq!(err.message, "unexpected character '@'");
        assert_eq!(err.column, 7);
    }

    #[test]
    fn lone_bang_is_rejected() {
        assert!(tokenize("!x").is_err());
    }
}
