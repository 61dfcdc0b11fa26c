use serde::{Deserialize, Serialize};

/// Two-argument operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    /// Protected application: division by ~0 yields 1
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b.abs() < DIVISION_EPSILON {
                    1.0
                } else {
                    a / b
                }
            }
            BinaryOp::Pow => a.powf(b),
        }
    }
}

/// One-argument operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Log,
    Log10,
    Exp,
    Sqrt,
    Sin,
    Cos,
    Tan,
}

impl UnaryOp {
    /// Function name used in text form, `None` for prefix negation
    pub fn function_name(self) -> Option<&'static str> {
        match self {
            UnaryOp::Neg => None,
            UnaryOp::Log => Some("log"),
            UnaryOp::Log10 => Some("log10"),
            UnaryOp::Exp => Some("exp"),
            UnaryOp::Sqrt => Some("sqrt"),
            UnaryOp::Sin => Some("sin"),
            UnaryOp::Cos => Some("cos"),
            UnaryOp::Tan => Some("tan"),
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "log" | "ln" => Some(UnaryOp::Log),
            "log10" => Some(UnaryOp::Log10),
            "exp" => Some(UnaryOp::Exp),
            "sqrt" => Some(UnaryOp::Sqrt),
            "sin" => Some(UnaryOp::Sin),
            "cos" => Some(UnaryOp::Cos),
            "tan" => Some(UnaryOp::Tan),
            _ => None,
        }
    }

    /// Protected application: logarithms of `|x|` (0 at 0), square root of `|x|`
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Log => {
                if x == 0.0 {
                    0.0
                } else {
                    x.abs().ln()
                }
            }
            UnaryOp::Log10 => {
                if x == 0.0 {
                    0.0
                } else {
                    x.abs().log10()
                }
            }
            UnaryOp::Exp => x.exp(),
            UnaryOp::Sqrt => x.abs().sqrt(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
        }
    }
}

/// Denominators closer to zero than this make division return 1
pub const DIVISION_EPSILON: f64 = 1e-10;

/// A node of an expression tree
///
/// Variables are indices into the owning tree's variable list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Const(f64),
    Var(usize),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

impl Node {
    pub fn unary(op: UnaryOp, child: Node) -> Self {
        Node::Unary(op, Box::new(child))
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary(op, Box::new(left), Box::new(right))
    }

    /// Evaluate with protected operators; out-of-range variables read as 0
    pub fn evaluate(&self, vars: &[f64]) -> f64 {
        match self {
            Node::Const(c) => *c,
            Node::Var(i) => vars.get(*i).copied().unwrap_or(0.0),
            Node::Unary(op, child) => op.apply(child.evaluate(vars)),
            Node::Binary(op, left, right) => op.apply(left.evaluate(vars), right.evaluate(vars)),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Node::Const(_) | Node::Var(_) => 1,
            Node::Unary(_, child) => 1 + child.node_count(),
            Node::Binary(_, left, right) => 1 + left.node_count() + right.node_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Const(_) | Node::Var(_) => 1,
            Node::Unary(_, child) => 1 + child.depth(),
            Node::Binary(_, left, right) => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Const(_) | Node::Var(_))
    }

    /// Whether no variable occurs below this node
    pub fn is_constant(&self) -> bool {
        match self {
            Node::Const(_) => true,
            Node::Var(_) => false,
            Node::Unary(_, child) => child.is_constant(),
            Node::Binary(_, left, right) => left.is_constant() && right.is_constant(),
        }
    }

    /// Subtree at a preorder index
    pub fn subtree(&self, index: usize) -> Option<&Node> {
        if index == 0 {
            return Some(self);
        }
        match self {
            Node::Const(_) | Node::Var(_) => None,
            Node::Unary(_, child) => child.subtree(index - 1),
            Node::Binary(_, left, right) => {
                let left_count = left.node_count();
                if index <= left_count {
                    left.subtree(index - 1)
                } else {
                    right.subtree(index - 1 - left_count)
                }
            }
        }
    }

    /// Mutable subtree at a preorder index
    pub fn subtree_mut(&mut self, index: usize) -> Option<&mut Node> {
        if index == 0 {
            return Some(self);
        }
        match self {
            Node::Const(_) | Node::Var(_) => None,
            Node::Unary(_, child) => child.subtree_mut(index - 1),
            Node::Binary(_, left, right) => {
                let left_count = left.node_count();
                if index <= left_count {
                    left.subtree_mut(index - 1)
                } else {
                    right.subtree_mut(index - 1 - left_count)
                }
            }
        }
    }

    /// Replace the subtree at a preorder index, returning false if out of range
    pub fn replace_subtree(&mut self, index: usize, replacement: Node) -> bool {
        match self.subtree_mut(index) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        }
    }
}
