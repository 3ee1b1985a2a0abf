//! DSL parser.
//!
//! Recursive descent over the token stream. Precedence, loosest first:
//!
//! ```text
//! expression     := conditional | assignment | or
//! conditional    := "if" expression "then" expression ("else" expression)?
//! assignment     := IDENT (":=" | "=") expression
//! or             := and ("or" and)*
//! and            := equality ("and" equality)*
//! equality       := relational (("==" | "!=") relational)*
//! relational     := additive ((">" | ">=" | "<" | "<=") additive)*
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := power (("*" | "/" | "%") power)*
//! power          := unary ("^" power)?
//! unary          := ("-" | "not") unary | postfix
//! postfix        := primary ("[" expression "]")*
//! primary        := NUMBER | STRING | "true" | "false" | PRICE
//!                 | NAME "(" arguments? ")" | IDENT | "(" expression ")"
//! ```
//!
//! A program is a newline-separated list of statements. A statement is a
//! `strategy("name")` block, a standalone `if <cond> then buy|sell` rule, or an
//! expression.
//!
//! Nesting depth and operator chains are bounded so that neither parsing nor
//! evaluating the resulting tree can exhaust the stack.

use crate::domain::ast::{BinaryOperator, Node, Program, UnaryOperator};
use crate::domain::error::ParseError;
use crate::domain::lexer::tokenize;
use crate::domain::token::{Keyword, Operator, Position, Punctuation, Token, TokenKind};
use tracing::warn;

/// A non-fatal note about how the parser resolved the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub message: String,
    pub position: Position,
}

/// A successfully parsed program together with any ambiguity warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: Program,
    pub warnings: Vec<ParseWarning>,
}

/// Deepest allowed nesting of parentheses, conditionals, assignments and
/// prefix operators.
const MAX_NESTING: usize = 64;

/// Deepest allowed syntax tree; evaluation recurses once per level.
const MAX_TREE_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    warnings: Vec<ParseWarning>,
}

enum IfTail {
    Buy,
    Sell,
    /// `nested_if`: the branch after `then` starts with a bare `if`.
    Expression { then: Node, nested_if: bool },
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                position,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            warnings: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_next_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error_at(token: &Token, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: token.position.offset,
            line: token.position.line,
            column: token.position.column,
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        Self::error_at(
            token,
            format!("expected {}, found {}", expected, token.describe()),
        )
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == keyword)
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, name: &str) -> Result<(), ParseError> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{name}'")))
        }
    }

    fn check_punct(&self, punct: Punctuation) -> bool {
        matches!(self.peek_kind(), TokenKind::Punctuation(p) if *p == punct)
    }

    fn expect_punct(&mut self, punct: Punctuation, name: &str) -> Result<(), ParseError> {
        if self.check_punct(punct) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{name}'")))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
            match self.peek_kind() {
                TokenKind::Newline => self.skip_newlines(),
                TokenKind::Eof => {}
                _ => {
                    return Err(self.unexpected("end of line"));
                }
            }
        }
        if statements.is_empty() {
            return Err(Self::error_at(self.peek(), "program contains no statements"));
        }
        Ok(Program::from_statements(statements))
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        let start = self.peek().clone();
        let statement = self.parse_statement_inner()?;
        if statement.depth() > MAX_TREE_DEPTH {
            return Err(Self::error_at(&start, "expression nested too deeply"));
        }
        Ok(statement)
    }

    fn parse_statement_inner(&mut self) -> Result<Node, ParseError> {
        if self.check_keyword(Keyword::Strategy) {
            return self.parse_strategy();
        }
        if self.check_keyword(Keyword::If) {
            return match self.parse_if()? {
                (condition, IfTail::Buy) => Ok(Node::BuyCondition {
                    condition: Box::new(condition),
                }),
                (condition, IfTail::Sell) => Ok(Node::SellCondition {
                    condition: Box::new(condition),
                }),
                (condition, IfTail::Expression { then, nested_if }) => {
                    self.finish_conditional(condition, then, nested_if)
                }
            };
        }
        self.parse_expression()
    }

    fn parse_strategy(&mut self) -> Result<Node, ParseError> {
        self.expect_keyword(Keyword::Strategy, "strategy")?;
        self.expect_punct(Punctuation::LeftParen, "(")?;
        let name = match self.peek_kind().clone() {
            TokenKind::Str(name) => {
                self.advance();
                name
            }
            _ => return Err(self.unexpected("strategy name string")),
        };
        self.expect_punct(Punctuation::RightParen, ")")?;

        let mut rules = Vec::new();
        loop {
            let saved = self.pos;
            let warnings_before = self.warnings.len();
            self.skip_newlines();
            if !self.check_keyword(Keyword::If) {
                self.pos = saved;
                break;
            }
            match self.parse_if()? {
                (condition, IfTail::Buy) => rules.push(Node::BuyCondition {
                    condition: Box::new(condition),
                }),
                (condition, IfTail::Sell) => rules.push(Node::SellCondition {
                    condition: Box::new(condition),
                }),
                (_, IfTail::Expression { .. }) => {
                    // A plain conditional ends the rule list; re-parse it as its own statement.
                    self.pos = saved;
                    self.warnings.truncate(warnings_before);
                    break;
                }
            }
        }
        Ok(Node::Strategy { name, rules })
    }

    /// Parses `if <cond> then` and whatever follows `then`.
    fn parse_if(&mut self) -> Result<(Node, IfTail), ParseError> {
        self.expect_keyword(Keyword::If, "if")?;
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Then, "then")?;
        if self.consume_keyword(Keyword::Buy) {
            return Ok((condition, IfTail::Buy));
        }
        if self.consume_keyword(Keyword::Sell) {
            return Ok((condition, IfTail::Sell));
        }
        let nested_if = self.check_keyword(Keyword::If);
        let then = self.parse_expression()?;
        Ok((condition, IfTail::Expression { then, nested_if }))
    }

    fn finish_conditional(
        &mut self,
        condition: Node,
        then: Node,
        nested_if: bool,
    ) -> Result<Node, ParseError> {
        let next = self.peek().clone();
        let otherwise = if self.consume_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        // `if a then if b then x else y`: the inner `if` already took the `else`.
        // A parenthesized inner conditional is unambiguous.
        if otherwise.is_none() && nested_if {
            if let Node::Conditional {
                otherwise: Some(_), ..
            } = &then
            {
                self.warn(
                    &next,
                    "ambiguous dangling 'else'; bound to the nearest 'if'",
                );
            }
        }

        Ok(Node::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise,
        })
    }

    fn warn(&mut self, token: &Token, message: &str) {
        warn!(
            line = token.position.line,
            column = token.position.column,
            "{message}"
        );
        self.warnings.push(ParseWarning {
            message: message.to_string(),
            position: token.position,
        });
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(Self::error_at(self.peek(), "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.enter()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Track the depth of a left-associative chain as `right` joins `left`.
    /// `depth` starts as `None` and is filled on the first join.
    fn deepen(
        &self,
        depth: &mut Option<usize>,
        left: &Node,
        right: &Node,
    ) -> Result<(), ParseError> {
        let joined = depth.unwrap_or_else(|| left.depth()).max(right.depth()) + 1;
        if joined > MAX_TREE_DEPTH {
            return Err(Self::error_at(self.peek(), "expression nested too deeply"));
        }
        *depth = Some(joined);
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.nested(Self::parse_expression_inner)
    }

    fn parse_expression_inner(&mut self) -> Result<Node, ParseError> {
        if self.check_keyword(Keyword::If) {
            let if_token = self.peek().clone();
            return match self.parse_if()? {
                (condition, IfTail::Expression { then, nested_if }) => {
                    self.finish_conditional(condition, then, nested_if)
                }
                _ => Err(Self::error_at(
                    &if_token,
                    "buy/sell rules are only allowed as statements",
                )),
            };
        }

        let is_assignment = matches!(self.peek_kind(), TokenKind::Identifier(_))
            && matches!(
                self.peek_next_kind(),
                Some(TokenKind::Operator(Operator::Assign))
            );
        if is_assignment {
            if let TokenKind::Identifier(identifier) = self.advance().kind {
                self.advance();
                let expression = self.parse_expression()?;
                return Ok(Node::Assignment {
                    identifier,
                    expression: Box::new(expression),
                });
            }
        }

        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and()?;
        let mut depth = None;
        while self.consume_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_equality()?;
        let mut depth = None;
        while self.consume_keyword(Keyword::And) {
            let right = self.parse_equality()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn match_operator(&mut self, table: &[(Operator, BinaryOperator)]) -> Option<BinaryOperator> {
        let TokenKind::Operator(op) = self.peek_kind() else {
            return None;
        };
        let found = table.iter().find(|(o, _)| o == op).map(|(_, b)| *b)?;
        self.advance();
        Some(found)
    }

    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        const OPS: [(Operator, BinaryOperator); 2] = [
            (Operator::EqualEqual, BinaryOperator::Eq),
            (Operator::NotEqual, BinaryOperator::Ne),
        ];
        let mut left = self.parse_relational()?;
        let mut depth = None;
        while let Some(op) = self.match_operator(&OPS) {
            let right = self.parse_relational()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Node, ParseError> {
        const OPS: [(Operator, BinaryOperator); 4] = [
            (Operator::Greater, BinaryOperator::Gt),
            (Operator::GreaterEqual, BinaryOperator::Ge),
            (Operator::Less, BinaryOperator::Lt),
            (Operator::LessEqual, BinaryOperator::Le),
        ];
        let mut left = self.parse_additive()?;
        let mut depth = None;
        while let Some(op) = self.match_operator(&OPS) {
            let right = self.parse_additive()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        const OPS: [(Operator, BinaryOperator); 2] = [
            (Operator::Plus, BinaryOperator::Add),
            (Operator::Minus, BinaryOperator::Sub),
        ];
        let mut left = self.parse_multiplicative()?;
        let mut depth = None;
        while let Some(op) = self.match_operator(&OPS) {
            let right = self.parse_multiplicative()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ParseError> {
        const OPS: [(Operator, BinaryOperator); 3] = [
            (Operator::Star, BinaryOperator::Mul),
            (Operator::Slash, BinaryOperator::Div),
            (Operator::Percent, BinaryOperator::Mod),
        ];
        let mut left = self.parse_power()?;
        let mut depth = None;
        while let Some(op) = self.match_operator(&OPS) {
            let right = self.parse_power()?;
            self.deepen(&mut depth, &left, &right)?;
            left = Node::binary(op, left, right);
        }
        Ok(left)
    }

    /// Right-associative: `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_unary()?;
        if self.match_operator(&[(Operator::Caret, BinaryOperator::Pow)]).is_some() {
            let exponent = self.nested(Self::parse_power)?;
            return Ok(Node::binary(BinaryOperator::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if matches!(self.peek_kind(), TokenKind::Operator(Operator::Minus)) {
            self.advance();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Node::unary(UnaryOperator::Neg, operand));
        }
        if self.consume_keyword(Keyword::Not) {
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Node::unary(UnaryOperator::Not, operand));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;
        let mut depth = None;
        while self.check_punct(Punctuation::LeftBracket) {
            self.advance();
            let index = self.parse_expression()?;
            self.expect_punct(Punctuation::RightBracket, "]")?;
            self.deepen(&mut depth, &node, &index)?;
            node = Node::IndexAccess {
                object: Box::new(node),
                index: Box::new(index),
            };
        }
        Ok(node)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect_punct(Punctuation::LeftParen, "(")?;
        let mut args = Vec::new();
        if self.check_punct(Punctuation::RightParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.check_punct(Punctuation::Comma) {
                self.advance();
                continue;
            }
            self.expect_punct(Punctuation::RightParen, ")")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.peek().clone();
        match token.kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Node::NumberLiteral { value })
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Node::StringLiteral { value })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Node::BoolLiteral { value: true })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Node::BoolLiteral { value: false })
            }
            TokenKind::Keyword(Keyword::Price(field)) => {
                self.advance();
                Ok(Node::PriceField { field })
            }
            TokenKind::Keyword(Keyword::Function(_)) => {
                self.advance();
                if !self.check_punct(Punctuation::LeftParen) {
                    return Err(self.unexpected(&format!("'(' after '{}'", token.lexeme)));
                }
                let args = self.parse_arguments()?;
                Ok(Node::FunctionCall {
                    name: token.lexeme,
                    args,
                })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check_punct(Punctuation::LeftParen) {
                    let args = self.parse_arguments()?;
                    return Ok(Node::FunctionCall { name, args });
                }
                Ok(Node::Identifier { name })
            }
            TokenKind::Punctuation(Punctuation::LeftParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_punct(Punctuation::RightParen, ")")?;
                Ok(inner)
            }
            TokenKind::Eof => Err(Self::error_at(&token, "unexpected end of input")),
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Parse an already-lexed token stream.
pub fn parse_tokens(tokens: Vec<Token>) -> Result<Parsed, ParseError> {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    Ok(Parsed {
        program,
        warnings: parser.warnings,
    })
}

/// Lex and parse DSL source, keeping any ambiguity warnings.
pub fn parse_with_warnings(input: &str) -> Result<Parsed, ParseError> {
    let tokens = tokenize(input)?;
    parse_tokens(tokens)
}

/// Lex and parse DSL source into a program.
pub fn parse(input: &str) -> Result<Program, ParseError> {
    parse_with_warnings(input).map(|parsed| parsed.program)
}
