//! Expression engine for selections and response scores over branch columns.
//!
//! Supports arithmetic (`+ - * /`), comparisons (`== != < <= > >=`),
//! boolean operators (`&& || !`), and the functions `abs`, `sqrt`, `log`,
//! `exp`, `pow`, `min`, `max`. Identifiers refer to branch names; truth is
//! "> 0", as in ROOT selection strings.

use crate::error::{Result, RootError};

/// A compiled expression together with the branch names it references.
#[derive(Debug, Clone)]
pub struct SelectionExpr {
    node: Node,
    /// Branch names referenced, ordered by first occurrence.
    pub branches: Vec<String>,
}

#[derive(Debug, Clone)]
enum Node {
    Const(f64),
    Branch(usize),
    Neg(Box<Node>),
    Not(Box<Node>),
    Bin(Op, Box<Node>, Box<Node>),
    Fun1(Fun1, Box<Node>),
    Fun2(Fun2, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Op {
    /// Left binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => 3,
            Op::Add | Op::Sub => 4,
            Op::Mul | Op::Div => 5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Fun1 {
    Abs,
    Sqrt,
    Log,
    Exp,
}

#[derive(Debug, Clone, Copy)]
enum Fun2 {
    Pow,
    Min,
    Max,
}

impl SelectionExpr {
    /// Parse and compile an expression string.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = lex(input)?;
        let mut p = Parser { tokens: &tokens, pos: 0, branches: Vec::new() };
        let node = p.expression(0)?;
        if p.pos != p.tokens.len() {
            return Err(RootError::Expression(format!(
                "trailing input after expression: {:?}",
                p.tokens[p.pos]
            )));
        }
        Ok(Self { node, branches: p.branches })
    }

    /// Evaluate for one row; `values` is ordered like `branches`.
    pub fn eval_row(&self, values: &[f64]) -> f64 {
        eval(&self.node, values)
    }

    /// Evaluate over whole columns; `columns` is ordered like `branches`
    /// and all slices must have equal length. A constant expression with
    /// no branches produces `n_rows` copies of its value.
    pub fn eval_columns(&self, columns: &[&[f64]], n_rows: usize) -> Vec<f64> {
        if columns.is_empty() {
            return vec![eval(&self.node, &[]); n_rows];
        }
        let n = columns[0].len();
        let mut row = vec![0.0; columns.len()];
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            for (j, col) in columns.iter().enumerate() {
                row[j] = col[i];
            }
            out.push(eval(&self.node, &row));
        }
        out
    }
}

fn truth(v: f64) -> bool {
    v > 0.0
}

fn bool_f(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

fn eval(node: &Node, vals: &[f64]) -> f64 {
    match node {
        Node::Const(c) => *c,
        Node::Branch(i) => vals[*i],
        Node::Neg(a) => -eval(a, vals),
        Node::Not(a) => bool_f(!truth(eval(a, vals))),
        Node::Bin(op, a, b) => {
            let (x, y) = (eval(a, vals), eval(b, vals));
            match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
                Op::Eq => bool_f((x - y).abs() < f64::EPSILON),
                Op::Ne => bool_f((x - y).abs() >= f64::EPSILON),
                Op::Lt => bool_f(x < y),
                Op::Le => bool_f(x <= y),
                Op::Gt => bool_f(x > y),
                Op::Ge => bool_f(x >= y),
                Op::And => bool_f(truth(x) && truth(y)),
                Op::Or => bool_f(truth(x) || truth(y)),
            }
        }
        Node::Fun1(f, a) => {
            let x = eval(a, vals);
            match f {
                Fun1::Abs => x.abs(),
                Fun1::Sqrt => x.sqrt(),
                Fun1::Log => x.ln(),
                Fun1::Exp => x.exp(),
            }
        }
        Node::Fun2(f, a, b) => {
            let (x, y) = (eval(a, vals), eval(b, vals));
            match f {
                Fun2::Pow => x.powf(y),
                Fun2::Min => x.min(y),
                Fun2::Max => x.max(y),
            }
        }
    }
}

// ── Lexer ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(Op),
    Bang,
    LParen,
    RParen,
    Comma,
}

fn lex(input: &str) -> Result<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            _ if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op(Op::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(Op::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op(Op::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(Op::Div));
                i += 1;
            }
            '&' | '|' | '=' | '<' | '>' | '!' => {
                let next = bytes.get(i + 1).map(|&b| b as char);
                let (tok, len) = match (c, next) {
                    ('&', Some('&')) => (Token::Op(Op::And), 2),
                    ('|', Some('|')) => (Token::Op(Op::Or), 2),
                    ('=', Some('=')) => (Token::Op(Op::Eq), 2),
                    ('!', Some('=')) => (Token::Op(Op::Ne), 2),
                    ('<', Some('=')) => (Token::Op(Op::Le), 2),
                    ('>', Some('=')) => (Token::Op(Op::Ge), 2),
                    ('<', _) => (Token::Op(Op::Lt), 1),
                    ('>', _) => (Token::Op(Op::Gt), 1),
                    ('!', _) => (Token::Bang, 1),
                    _ => {
                        return Err(RootError::Expression(format!(
                            "unexpected character '{c}' at position {i}"
                        )));
                    }
                };
                tokens.push(tok);
                i += len;
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < bytes.len() {
                    let d = bytes[i] as char;
                    let exp_sign = (d == '+' || d == '-')
                        && i > start
                        && matches!(bytes[i - 1] as char, 'e' | 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exp_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &input[start..i];
                let n: f64 = text
                    .parse()
                    .map_err(|_| RootError::Expression(format!("invalid number '{text}'")))?;
                tokens.push(Token::Num(n));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            _ => {
                return Err(RootError::Expression(format!(
                    "unexpected character '{c}' at position {i}"
                )));
            }
        }
    }

    Ok(tokens)
}

// ── Parser (precedence climbing) ───────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    branches: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, want: &Token) -> Result<()> {
        match self.bump() {
            Some(ref t) if t == want => Ok(()),
            other => Err(RootError::Expression(format!("expected {want:?}, got {other:?}"))),
        }
    }

    fn branch_index(&mut self, name: &str) -> usize {
        match self.branches.iter().position(|b| b == name) {
            Some(i) => i,
            None => {
                self.branches.push(name.to_string());
                self.branches.len() - 1
            }
        }
    }

    fn expression(&mut self, min_prec: u8) -> Result<Node> {
        let mut lhs = self.prefix()?;
        while let Some(&Token::Op(op)) = self.peek() {
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.bump();
            let rhs = self.expression(prec)?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Node> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Node::Const(n)),
            Some(Token::Op(Op::Sub)) => Ok(Node::Neg(Box::new(self.prefix()?))),
            Some(Token::Bang) => Ok(Node::Not(Box::new(self.prefix()?))),
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.bump();
                    self.call(&name)
                } else {
                    Ok(Node::Branch(self.branch_index(&name)))
                }
            }
            other => Err(RootError::Expression(format!(
                "expected a value, branch, or '(', got {other:?}"
            ))),
        }
    }

    fn call(&mut self, name: &str) -> Result<Node> {
        let mut args = vec![self.expression(0)?];
        while self.peek() == Some(&Token::Comma) {
            self.bump();
            args.push(self.expression(0)?);
        }
        self.expect(&Token::RParen)?;

        let arity_err = |want: usize| {
            RootError::Expression(format!("{name}() takes {want} argument(s)"))
        };

        match name {
            "abs" | "sqrt" | "log" | "exp" => {
                if args.len() != 1 {
                    return Err(arity_err(1));
                }
                let f = match name {
                    "abs" => Fun1::Abs,
                    "sqrt" => Fun1::Sqrt,
                    "log" => Fun1::Log,
                    _ => Fun1::Exp,
                };
                Ok(Node::Fun1(f, Box::new(args.pop().unwrap())))
            }
            "pow" | "min" | "max" => {
                if args.len() != 2 {
                    return Err(arity_err(2));
                }
                let b = args.pop().unwrap();
                let a = args.pop().unwrap();
                let f = match name {
                    "pow" => Fun2::Pow,
                    "min" => Fun2::Min,
                    _ => Fun2::Max,
                };
                Ok(Node::Fun2(f, Box::new(a), Box::new(b)))
            }
            _ => Err(RootError::Expression(format!("unknown function '{name}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_precedence() {
        let e = SelectionExpr::compile("2 + 3 * 4").unwrap();
        assert!(e.branches.is_empty());
        assert_eq!(e.eval_row(&[]), 14.0);
    }

    #[test]
    fn branch_collection_in_order() {
        let e = SelectionExpr::compile("pt_lead * EvtWeight + pt_lead").unwrap();
        assert_eq!(e.branches, vec!["pt_lead", "EvtWeight"]);
        assert_eq!(e.eval_row(&[10.0, 0.5]), 15.0);
    }

    #[test]
    fn selection_semantics() {
        let e = SelectionExpr::compile("njet >= 4 && pt > 25.0").unwrap();
        assert_eq!(e.eval_row(&[4.0, 30.0]), 1.0);
        assert_eq!(e.eval_row(&[3.0, 30.0]), 0.0);
        assert_eq!(e.eval_row(&[4.0, 25.0]), 0.0);
    }

    #[test]
    fn or_and_not() {
        let e = SelectionExpr::compile("x > 5 || y < 2").unwrap();
        assert_eq!(e.eval_row(&[6.0, 3.0]), 1.0);
        assert_eq!(e.eval_row(&[3.0, 1.0]), 1.0);
        assert_eq!(e.eval_row(&[3.0, 3.0]), 0.0);

        let e = SelectionExpr::compile("!(x > 3)").unwrap();
        assert_eq!(e.eval_row(&[2.0]), 1.0);
        assert_eq!(e.eval_row(&[5.0]), 0.0);
    }

    #[test]
    fn functions() {
        let e = SelectionExpr::compile("sqrt(pow(x, 2) + pow(y, 2))").unwrap();
        assert!((e.eval_row(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(SelectionExpr::compile("max(a, b)").unwrap().eval_row(&[1.0, 7.0]), 7.0);
        assert_eq!(SelectionExpr::compile("abs(x)").unwrap().eval_row(&[-2.5]), 2.5);
    }

    #[test]
    fn unary_minus_binds_tight() {
        let e = SelectionExpr::compile("-x + 1").unwrap();
        assert_eq!(e.eval_row(&[5.0]), -4.0);
    }

    #[test]
    fn column_evaluation() {
        let e = SelectionExpr::compile("a + b").unwrap();
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert_eq!(e.eval_columns(&[&a, &b], 3), vec![11.0, 22.0, 33.0]);
    }

    #[test]
    fn constant_expression_broadcasts() {
        let e = SelectionExpr::compile("1").unwrap();
        assert_eq!(e.eval_columns(&[], 4), vec![1.0; 4]);
    }

    #[test]
    fn scientific_notation() {
        let e = SelectionExpr::compile("1.5e2 + 3.0E-1").unwrap();
        assert!((e.eval_row(&[]) - 150.3).abs() < 1e-12);
    }

    #[test]
    fn errors_name_the_problem() {
        assert!(SelectionExpr::compile("foo(1)").unwrap_err().to_string().contains("foo"));
        assert!(SelectionExpr::compile("1 +").is_err());
        assert!(SelectionExpr::compile("pow(1)").is_err());
        assert!(SelectionExpr::compile("a $ b").is_err());
    }
}
