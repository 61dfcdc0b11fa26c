// Recursive-descent parser for arithmetic expressions
//
// Grammar:
//   expr    := term (('+' | '-') term)*
//   term    := unary (('*' | '/') unary)*
//   unary   := '-' unary | power
//   power   := primary ('^' unary)?
//   primary := number | ident | ident '(' args ')' | '(' expr ')'

use super::node::{BinaryOp, Node, UnaryOp};
use super::{ExpressionError, Result};

/// Nesting limit, keeps hostile input from exhausting the stack
const MAX_NESTING: usize = 200;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Symbol(char),
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            input,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c.is_ascii_digit() || c == '.' {
                tokens.push((self.number(pos)?, pos));
            } else if c.is_alphabetic() || c == '_' {
                tokens.push((self.ident(pos), pos));
            } else if "+-*/^(),".contains(c) {
                self.chars.next();
                tokens.push((Token::Symbol(c), pos));
            } else {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: c,
                    position: pos,
                });
            }
        }
        Ok(tokens)
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let mut end = start;
        let mut prev = ' ';
        while let Some(&(pos, c)) = self.chars.peek() {
            let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                prev = c;
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.input[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExpressionError::InvalidNumber(text.to_string()))
    }

    fn ident(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Ident(self.input[start..end].to_string())
    }
}

/// How identifiers map to variable indices
pub(super) enum Variables<'v> {
    /// Only the listed names are accepted
    Fixed(&'v [String]),
    /// New names are appended in first-seen order
    Collect(Vec<String>),
}

impl Variables<'_> {
    fn resolve(&mut self, name: &str) -> Result<usize> {
        match self {
            Variables::Fixed(names) => names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| ExpressionError::UnknownVariable(name.to_string())),
            Variables::Collect(names) => match names.iter().position(|n| n == name) {
                Some(i) => Ok(i),
                None => {
                    names.push(name.to_string());
                    Ok(names.len() - 1)
                }
            },
        }
    }
}

pub(super) struct Parser<'v> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
    variables: Variables<'v>,
}

impl<'v> Parser<'v> {
    pub(super) fn new(input: &str, variables: Variables<'v>) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
            depth: 0,
            variables,
        })
    }

    /// Parse the whole input, returning the root and the variable names
    pub(super) fn parse(mut self) -> Result<(Node, Option<Vec<String>>)> {
        let root = self.expr()?;
        if let Some((token, position)) = self.tokens.get(self.pos) {
            return Err(ExpressionError::UnexpectedToken {
                found: describe(token),
                position: *position,
            });
        }
        let collected = match self.variables {
            Variables::Collect(names) => Some(names),
            Variables::Fixed(_) => None,
        };
        Ok((root, collected))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<(Token, usize)> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, symbol: char) -> Result<()> {
        let (token, position) = self.next()?;
        if token == Token::Symbol(symbol) {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken {
                found: describe(&token),
                position,
            })
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExpressionError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Node> {
        self.enter()?;
        let mut node = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinaryOp::Add
            } else if self.eat('-') {
                BinaryOp::Sub
            } else {
                break;
            };
            node = Node::binary(op, node, self.term()?);
        }
        self.depth -= 1;
        Ok(node)
    }

    fn term(&mut self) -> Result<Node> {
        let mut node = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinaryOp::Mul
            } else if self.eat('/') {
                BinaryOp::Div
            } else {
                break;
            };
            node = Node::binary(op, node, self.unary()?);
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Node> {
        if self.eat('-') {
            self.enter()?;
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(match operand {
                Node::Const(c) => Node::Const(-c),
                other => Node::unary(UnaryOp::Neg, other),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Node> {
        let base = self.primary()?;
        if self.eat('^') {
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(Node::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node> {
        let (token, position) = self.next()?;
        match token {
            Token::Number(n) => Ok(Node::Const(n)),
            Token::Symbol('(') => {
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.eat('(') {
                    self.call(&name)
                } else {
                    Ok(Node::Var(self.variables.resolve(&name)?))
                }
            }
            other => Err(ExpressionError::UnexpectedToken {
                found: describe(&other),
                position,
            }),
        }
    }

    fn call(&mut self, name: &str) -> Result<Node> {
        let mut args = Vec::new();
        if !self.eat(')') {
            loop {
                args.push(self.expr()?);
                if self.eat(')') {
                    break;
                }
                self.expect(',')?;
            }
        }

        let arity_error = |expected: usize, found: usize| ExpressionError::Arity {
            function: name.to_string(),
            expected,
            found,
        };

        if name.eq_ignore_ascii_case("pow") {
            let found = args.len();
            let mut it = args.into_iter();
            return match (it.next(), it.next(), it.next()) {
                (Some(base), Some(exponent), None) => {
                    Ok(Node::binary(BinaryOp::Pow, base, exponent))
                }
                _ => Err(arity_error(2, found)),
            };
        }

        let op = UnaryOp::from_function_name(name)
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;
        let found = args.len();
        let mut it = args.into_iter();
        match (it.next(), it.next()) {
            (Some(arg), None) => Ok(Node::unary(op, arg)),
            _ => Err(arity_error(1, found)),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => n.to_string(),
        Token::Ident(s) => s.clone(),
        Token::Symbol(c) => c.to_string(),
    }
}
