use super::node::{BinaryOp, Node, UnaryOp};

/// Bottom-up algebraic simplification
///
/// Folds constant subtrees, drops neutral elements and applies the rewrite
/// rules `log(exp(x)) -> x` and `sqrt(x ^ 2) -> x`. The result is not
/// guaranteed to evaluate identically under the protected operators, so
/// callers compare errors before keeping it.
pub fn simplify(node: &Node) -> Node {
    match node {
        Node::Const(_) | Node::Var(_) => node.clone(),
        Node::Unary(op, child) => simplify_unary(*op, simplify(child)),
        Node::Binary(op, left, right) => simplify_binary(*op, simplify(left), simplify(right)),
    }
}

fn fold(value: f64, fallback: impl FnOnce() -> Node) -> Node {
    if value.is_finite() {
        Node::Const(value)
    } else {
        fallback()
    }
}

fn simplify_unary(op: UnaryOp, child: Node) -> Node {
    match (op, child) {
        (op, Node::Const(c)) => fold(op.apply(c), || Node::unary(op, Node::Const(c))),
        (UnaryOp::Neg, Node::Unary(UnaryOp::Neg, inner)) => *inner,
        (UnaryOp::Log, Node::Unary(UnaryOp::Exp, inner)) => *inner,
        (UnaryOp::Sqrt, Node::Binary(BinaryOp::Pow, base, exponent))
            if *exponent == Node::Const(2.0) =>
        {
            *base
        }
        (op, child) => Node::unary(op, child),
    }
}

fn simplify_binary(op: BinaryOp, left: Node, right: Node) -> Node {
    use BinaryOp::{Add, Div, Mul, Pow, Sub};

    if let (Node::Const(a), Node::Const(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        return fold(op.apply(a, b), || {
            Node::binary(op, Node::Const(a), Node::Const(b))
        });
    }

    let is = |node: &Node, value: f64| matches!(node, Node::Const(c) if *c == value);

    match op {
        Add if is(&left, 0.0) => right,
        Add | Sub if is(&right, 0.0) => left,
        Sub if left == right => Node::Const(0.0),
        Mul if is(&left, 1.0) => right,
        Mul | Div if is(&right, 1.0) => left,
        Mul if is(&left, 0.0) || is(&right, 0.0) => Node::Const(0.0),
        Pow if is(&right, 1.0) => left,
        Pow if is(&right, 0.0) => Node::Const(1.0),
        _ => Node::binary(op, left, right),
    }
}
