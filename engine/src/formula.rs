use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::EffectiveStats;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("formula '{source_text}' at {pos}: {message}")]
pub struct FormulaError {
    pub source_text: String,
    pub pos: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    User,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Var {
    Power,
    Defense,
    Chakra,
    /// Current health.
    Health,
    MaxHealth,
    Accuracy,
    Dodge,
}

impl Var {
    fn parse(name: &str) -> Option<Var> {
        match name {
            "power" => Some(Var::Power),
            "defense" => Some(Var::Defense),
            "chakra" => Some(Var::Chakra),
            "health" | "current_health" | "currentHealth" => Some(Var::Health),
            "max_health" | "maxHealth" => Some(Var::MaxHealth),
            "accuracy" => Some(Var::Accuracy),
            "dodge" => Some(Var::Dodge),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Var::Power => "power",
            Var::Defense => "defense",
            Var::Chakra => "chakra",
            Var::Health => "health",
            Var::MaxHealth => "max_health",
            Var::Accuracy => "accuracy",
            Var::Dodge => "dodge",
        }
    }

    fn read(self, stats: &EffectiveStats) -> f64 {
        let v = match self {
            Var::Power => stats.power,
            Var::Defense => stats.defense,
            Var::Chakra => stats.chakra,
            Var::Health => stats.health,
            Var::MaxHealth => stats.max_health,
            Var::Accuracy => stats.accuracy,
            Var::Dodge => stats.dodge,
        };
        v as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Max,
    Min,
    Floor,
    Pow,
}

impl Func {
    fn parse(name: &str) -> Option<Func> {
        match name {
            "max" => Some(Func::Max),
            "min" => Some(Func::Min),
            "floor" => Some(Func::Floor),
            "pow" => Some(Func::Pow),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Max => "max",
            Func::Min => "min",
            Func::Floor => "floor",
            Func::Pow => "pow",
        }
    }

    fn arity_ok(self, n: usize) -> bool {
        match self {
            Func::Max | Func::Min => n >= 1,
            Func::Floor => n == 1,
            Func::Pow => n == 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Formula {
    Const(f64),
    Operand(Side, Var),
    Neg(Box<Formula>),
    Binary(BinOp, Box<Formula>, Box<Formula>),
    Call(Func, Vec<Formula>),
}

/// The two stat blocks a formula may reference.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub user: &'a EffectiveStats,
    pub target: &'a EffectiveStats,
}

impl<'a> Scope<'a> {
    pub fn new(user: &'a EffectiveStats, target: &'a EffectiveStats) -> Self {
        Self { user, target }
    }

    /// Self-referential scope used for damage and healing over time.
    pub fn holder(stats: &'a EffectiveStats) -> Self {
        Self { user: stats, target: stats }
    }
}

impl Formula {
    pub fn constant(value: f64) -> Self {
        Formula::Const(value)
    }

    pub fn eval(&self, scope: &Scope<'_>) -> f64 {
        match self {
            Formula::Const(v) => *v,
            Formula::Operand(Side::User, var) => var.read(scope.user),
            Formula::Operand(Side::Target, var) => var.read(scope.target),
            Formula::Neg(inner) => -inner.eval(scope),
            Formula::Binary(op, lhs, rhs) => {
                let a = lhs.eval(scope);
                let b = rhs.eval(scope);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            a
                        } else {
                            a / b
                        }
                    }
                }
            }
            Formula::Call(func, args) => {
                let vals: Vec<f64> = args.iter().map(|a| a.eval(scope)).collect();
                match func {
                    Func::Max => vals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    Func::Min => vals.iter().copied().fold(f64::INFINITY, f64::min),
                    Func::Floor => vals.first().copied().unwrap_or(0.0).floor(),
                    Func::Pow => {
                        let base = vals.first().copied().unwrap_or(0.0);
                        let exp = vals.get(1).copied().unwrap_or(1.0);
                        base.powf(exp)
                    }
                }
            }
        }
    }

    /// Evaluate and floor to an integer; non-finite results become 0.
    pub fn eval_floor(&self, scope: &Scope<'_>) -> i64 {
        let v = self.eval(scope);
        if v.is_finite() { v.floor() as i64 } else { 0 }
    }

    fn precedence(&self) -> u8 {
        match self {
            Formula::Binary(op, _, _) => op.precedence(),
            Formula::Neg(_) => 3,
            _ => 4,
        }
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { src: s, tokens: tokenize(s)?, at: 0 };
        let formula = parser.expr()?;
        if let Some(tok) = parser.tokens.get(parser.at) {
            return Err(parser.error(tok.pos, "unexpected trailing input"));
        }
        Ok(formula)
    }
}

impl TryFrom<String> for Formula {
    type Error = FormulaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Formula> for String {
    fn from(value: Formula) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Const(v) => write!(f, "{}", v),
            Formula::Operand(side, var) => {
                let side = match side {
                    Side::User => "user",
                    Side::Target => "target",
                };
                write!(f, "{}.{}", side, var.name())
            }
            Formula::Neg(inner) => {
                if inner.precedence() < 3 {
                    write!(f, "-({})", inner)
                } else {
                    write!(f, "-{}", inner)
                }
            }
            Formula::Binary(op, lhs, rhs) => {
                let p = op.precedence();
                if lhs.precedence() < p {
                    write!(f, "({})", lhs)?;
                } else {
                    write!(f, "{}", lhs)?;
                }
                write!(f, " {} ", op.symbol())?;
                // Left-associative: an equal-precedence right operand needs parens.
                if rhs.precedence() <= p {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
            Formula::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, FormulaError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_ascii_digit() || (c == '.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())) {
            while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            let text = &src[start..i];
            let value = text.parse::<f64>().map_err(|_| FormulaError {
                source_text: src.to_string(),
                pos: start,
                message: format!("bad number '{}'", text),
            })?;
            out.push(Token { kind: TokenKind::Num(value), pos: start });
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            out.push(Token { kind: TokenKind::Ident(src[start..i].to_string()), pos: start });
            continue;
        }
        let kind = match c {
            '+' | '-' | '*' | '/' => TokenKind::Op(c),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            other => {
                return Err(FormulaError {
                    source_text: src.to_string(),
                    pos: start,
                    message: format!("unexpected character '{}'", other),
                });
            }
        };
        out.push(Token { kind, pos: start });
        i += 1;
    }
    Ok(out)
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    at: usize,
}

impl Parser<'_> {
    fn error(&self, pos: usize, message: &str) -> FormulaError {
        FormulaError { source_text: self.src.to_string(), pos, message: message.to_string() }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.at).map(|t| &t.kind)
    }

    fn end_pos(&self) -> usize {
        self.src.len()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.at).cloned();
        if tok.is_some() {
            self.at += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(TokenKind::Op(c @ ('+' | '-'))) = self.peek() {
            let op = if *c == '+' { BinOp::Add } else { BinOp::Sub };
            self.at += 1;
            let rhs = self.term()?;
            lhs = Formula::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(TokenKind::Op(c @ ('*' | '/'))) = self.peek() {
            let op = if *c == '*' { BinOp::Mul } else { BinOp::Div };
            self.at += 1;
            let rhs = self.unary()?;
            lhs = Formula::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        if let Some(TokenKind::Op('-')) = self.peek() {
            self.at += 1;
            let inner = self.unary()?;
            return Ok(match inner {
                Formula::Const(v) => Formula::Const(-v),
                other => Formula::Neg(Box::new(other)),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Formula, FormulaError> {
        let Some(tok) = self.next() else {
            return Err(self.error(self.end_pos(), "unexpected end of formula"));
        };
        match tok.kind {
            TokenKind::Num(v) => Ok(Formula::Const(v)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    _ => Err(self.error(tok.pos, "unclosed parenthesis")),
                }
            }
            TokenKind::Ident(name) => {
                if let Some((side, var)) = name.split_once('.') {
                    let side = match side {
                        "user" => Side::User,
                        "target" => Side::Target,
                        _ => return Err(self.error(tok.pos, "operands must start with user. or target.")),
                    };
                    let var = Var::parse(var)
                        .ok_or_else(|| self.error(tok.pos, &format!("unknown stat '{}'", var)))?;
                    return Ok(Formula::Operand(side, var));
                }
                let func = Func::parse(&name)
                    .ok_or_else(|| self.error(tok.pos, &format!("unknown name '{}'", name)))?;
                match self.next() {
                    Some(Token { kind: TokenKind::LParen, .. }) => {}
                    _ => return Err(self.error(tok.pos, "expected '(' after function name")),
                }
                let mut args = Vec::new();
                if let Some(TokenKind::RParen) = self.peek() {
                    self.at += 1;
                } else {
                    loop {
                        args.push(self.expr()?);
                        match self.next() {
                            Some(Token { kind: TokenKind::Comma, .. }) => continue,
                            Some(Token { kind: TokenKind::RParen, .. }) => break,
                            _ => return Err(self.error(tok.pos, "expected ',' or ')'")),
                        }
                    }
                }
                if !func.arity_ok(args.len()) {
                    return Err(self.error(tok.pos, &format!("wrong argument count for {}", func.name())));
                }
                Ok(Formula::Call(func, args))
            }
            _ => Err(self.error(tok.pos, "expected a number, operand or '('")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(power: i64, defense: i64) -> EffectiveStats {
        EffectiveStats {
            power,
            defense,
            chakra: 10,
            max_health: 1000,
            health: 400,
            accuracy: 100,
            dodge: 1,
        }
    }

    #[test]
    fn precedence_and_associativity() {
        let f: Formula = "10 - 4 - 3".parse().unwrap();
        let s = stats(1, 1);
        assert_eq!(f.eval(&Scope::holder(&s)), 3.0);
        let g: Formula = "2 + 3 * 4".parse().unwrap();
        assert_eq!(g.eval(&Scope::holder(&s)), 14.0);
    }

    #[test]
    fn divide_by_zero_divides_by_one() {
        let f: Formula = "100 / target.defense".parse().unwrap();
        let u = stats(1, 1);
        let t = stats(1, 0);
        assert_eq!(f.eval(&Scope::new(&u, &t)), 100.0);
    }

    #[test]
    fn functions_and_unary_minus() {
        let f: Formula = "max(1, -(user.power - 50), min(3, 2))".parse().unwrap();
        let s = stats(10, 1);
        assert_eq!(f.eval(&Scope::holder(&s)), 40.0);
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("user.luck * 2".parse::<Formula>().is_err());
        assert!("eval(1)".parse::<Formula>().is_err());
        assert!("(1 + 2".parse::<Formula>().is_err());
        assert!("1 +".parse::<Formula>().is_err());
    }
}
