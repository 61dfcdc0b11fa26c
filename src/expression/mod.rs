//! Arithmetic expression trees
//!
//! The symbolic regression search evolves these trees. They are parsed from
//! the text of a fitted regression expression, evaluated over numeric
//! samples with protected operators and printed back to text.
//!
//! # Example
//!
//! ```
//! use pardep::expression::ExpressionTree;
//!
//! let tree = ExpressionTree::parse_collecting("2.0 * size_VALUE + (1.0)").unwrap();
//! assert_eq!(tree.evaluate(&[3.0]), 7.0);
//! ```

mod node;
mod parser;
mod simplify;

pub use node::{BinaryOp, Node, UnaryOp, DIVISION_EPSILON};

use parser::{Parser, Variables};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("Unexpected token '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {function} takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),
}

pub type Result<T> = std::result::Result<T, ExpressionError>;

/// A rooted expression over a fixed list of named variables
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionTree {
    root: Node,
    variables: Vec<String>,
}

impl ExpressionTree {
    pub fn new(root: Node, variables: Vec<String>) -> Self {
        Self { root, variables }
    }

    /// Parse text whose identifiers must all be among `variables`
    pub fn parse(text: &str, variables: &[String]) -> Result<Self> {
        let (root, _) = Parser::new(text, Variables::Fixed(variables))?.parse()?;
        Ok(Self::new(root, variables.to_vec()))
    }

    /// Parse text, taking its identifiers as variables in first-seen order
    pub fn parse_collecting(text: &str) -> Result<Self> {
        let (root, collected) = Parser::new(text, Variables::Collect(Vec::new()))?.parse()?;
        Ok(Self::new(root, collected.unwrap_or_default()))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate on one row of values aligned with `variables()`
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        self.root.evaluate(row)
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn simplify(&self) -> Self {
        Self::new(simplify::simplify(&self.root), self.variables.clone())
    }
}

impl fmt::Display for ExpressionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, &self.root, &self.variables, true)
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, vars: &[String], top: bool) -> fmt::Result {
    match node {
        Node::Const(c) => {
            let text = crate::stoex::format_number(*c);
            if *c < 0.0 && !top {
                write!(f, "({})", text)
            } else {
                write!(f, "{}", text)
            }
        }
        Node::Var(i) => match vars.get(*i) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "x{}", i),
        },
        Node::Unary(op, child) => match op.function_name() {
            Some(name) => {
                write!(f, "{}(", name)?;
                write_node(f, child, vars, true)?;
                write!(f, ")")
            }
            None => {
                write!(f, "-(")?;
                write_node(f, child, vars, true)?;
                write!(f, ")")
            }
        },
        Node::Binary(op, left, right) => {
            if !top {
                write!(f, "(")?;
            }
            write_node(f, left, vars, false)?;
            write!(f, " {} ", op.symbol())?;
            write_node(f, right, vars, false)?;
            if !top {
                write!(f, ")")?;
            }
            Ok(())
        }
    }
}
