//! AST for the strategy DSL.
//!
//! Nodes own their children exclusively and are never mutated after the
//! parser builds them, so a parsed [`Program`] can be shared read-only across
//! any number of evaluations.

use crate::domain::ohlcv::PriceField;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    NumberLiteral {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    BoolLiteral {
        value: bool,
    },
    Identifier {
        name: String,
    },
    PriceField {
        field: PriceField,
    },
    BinaryOp {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    FunctionCall {
        name: String,
        args: Vec<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        #[serde(rename = "else")]
        otherwise: Option<Box<Node>>,
    },
    Assignment {
        identifier: String,
        expression: Box<Node>,
    },
    BuyCondition {
        condition: Box<Node>,
    },
    SellCondition {
        condition: Box<Node>,
    },
    /// `strategy("name")` followed by buy/sell rules. Every rule is a
    /// `BuyCondition` or `SellCondition`.
    Strategy {
        name: String,
        rules: Vec<Node>,
    },
    IndexAccess {
        object: Box<Node>,
        index: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "^")]
    Pow,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "not")]
    Not,
}

/// A parsed program: one expression, or a sequence of statements evaluated
/// in order with the last value as the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Program {
    Expression(Node),
    Statements(Vec<Node>),
}

impl Program {
    pub fn from_statements(mut statements: Vec<Node>) -> Self {
        if statements.len() == 1 {
            Program::Expression(statements.remove(0))
        } else {
            Program::Statements(statements)
        }
    }

    pub fn statements(&self) -> &[Node] {
        match self {
            Program::Expression(node) => std::slice::from_ref(node),
            Program::Statements(nodes) => nodes,
        }
    }

    /// True when the program declares a `strategy(...)` block or buy/sell rules.
    pub fn has_rules(&self) -> bool {
        self.statements().iter().any(|node| {
            matches!(
                node,
                Node::Strategy { .. } | Node::BuyCondition { .. } | Node::SellCondition { .. }
            )
        })
    }
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "^",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Neg => f.write_str("-"),
            UnaryOperator::Not => f.write_str("not"),
        }
    }
}

impl Node {
    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::NumberLiteral { .. }
            | Node::StringLiteral { .. }
            | Node::BoolLiteral { .. }
            | Node::Identifier { .. }
            | Node::PriceField { .. } => Vec::new(),
            Node::BinaryOp { left, right, .. } => vec![&**left, &**right],
            Node::UnaryOp { operand, .. } => vec![&**operand],
            Node::FunctionCall { args, .. } => args.iter().collect(),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let mut children = vec![&**condition, &**then];
                children.extend(otherwise.as_deref());
                children
            }
            Node::Assignment { expression, .. } => vec![&**expression],
            Node::BuyCondition { condition } | Node::SellCondition { condition } => {
                vec![&**condition]
            }
            Node::Strategy { rules, .. } => rules.iter().collect(),
            Node::IndexAccess { object, index } => vec![&**object, &**index],
        }
    }

    /// Levels in the tree rooted here; a leaf has depth 1. Walks iteratively.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// Convenience constructors, mostly for tests and callers building ASTs by hand.
impl Node {
    pub fn number(value: f64) -> Self {
        Node::NumberLiteral { value }
    }

    pub fn ident(name: &str) -> Self {
        Node::Identifier {
            name: name.to_string(),
        }
    }

    pub fn price(field: PriceField) -> Self {
        Node::PriceField { field }
    }

    pub fn binary(operator: BinaryOperator, left: Node, right: Node) -> Self {
        Node::BinaryOp {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(operator: UnaryOperator, operand: Node) -> Self {
        Node::UnaryOp {
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: &str, args: Vec<Node>) -> Self {
        Node::FunctionCall {
            name: name.to_string(),
            args,
        }
    }
}
