//! A small recursive-descent parser for [`Expr`] and the handful of PRISM
//! statement forms this crate's sketch reader accepts. Hand-rolled rather
//! than built on a parser-combinator crate, since no example in this
//! corpus's dependency stack pulls one in for a grammar this small.

use crate::error::{Result, SynthesisError};

use super::expr::{BinOp, Expr, UnOp};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Sym(&'static str),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|e| SynthesisError::parse(format!("invalid number '{}': {}", text, e)))?;
            tokens.push(Token::Num(value));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token::Ident(text));
            continue;
        }
        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let sym = match two.as_str() {
            "<=" => Some("<="),
            ">=" => Some(">="),
            "!=" => Some("!="),
            "->" => Some("->"),
            _ => None,
        };
        if let Some(sym) = sym {
            tokens.push(Token::Sym(sym));
            i += 2;
            continue;
        }
        let sym = match c {
            '(' => "(",
            ')' => ")",
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            '<' => "<",
            '>' => ">",
            '=' => "=",
            '&' => "&",
            '|' => "|",
            '!' => "!",
            ':' => ":",
            '\'' => "'",
            ',' => ",",
            _ => {
                return Err(SynthesisError::parse(format!(
                    "unexpected character '{}' in expression",
                    c
                )))
            }
        };
        tokens.push(Token::Sym(sym));
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_sym(&mut self, sym: &str) -> Result<()> {
        match self.next() {
            Some(Token::Sym(s)) if s == sym => Ok(()),
            other => Err(SynthesisError::parse(format!(
                "expected '{}', found {:?}",
                sym, other
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Sym("|"))) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Bin(Box::new(lhs), BinOp::Or, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        while matches!(self.peek(), Some(Token::Sym("&"))) {
            self.next();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Bin(Box::new(lhs), BinOp::And, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Sym("<")) => Some(BinOp::Lt),
            Some(Token::Sym("<=")) => Some(BinOp::Le),
            Some(Token::Sym(">")) => Some(BinOp::Gt),
            Some(Token::Sym(">=")) => Some(BinOp::Ge),
            Some(Token::Sym("=")) => Some(BinOp::Eq),
            Some(Token::Sym("!=")) => Some(BinOp::Ne),
            _ => None,
        };
        match op {
            Some(op) => {
                self.next();
                let rhs = self.parse_additive()?;
                Ok(Expr::Bin(Box::new(lhs), op, Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Sym("+")) => BinOp::Add,
                Some(Token::Sym("-")) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Sym("*")) => BinOp::Mul,
                Some(Token::Sym("/")) => BinOp::Div,
                _ => break,
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::Bin(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Sym("-")) => {
                self.next();
                Ok(Expr::Un(UnOp::Neg, Box::new(self.parse_unary()?)))
            }
            Some(Token::Sym("!")) => {
                self.next();
                Ok(Expr::Un(UnOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => {
                if name == "true" {
                    Ok(Expr::Num(1.0))
                } else if name == "false" {
                    Ok(Expr::Num(0.0))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::Sym("(")) => {
                let expr = self.parse_or()?;
                self.eat_sym(")")?;
                Ok(expr)
            }
            other => Err(SynthesisError::parse(format!(
                "expected expression, found {:?}",
                other
            ))),
        }
    }
}

/// Parses a standalone expression (a guard, probability, reward value, or
/// label definition).
pub fn parse_expr(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(SynthesisError::parse(format!(
            "trailing input after expression '{}'",
            input
        )));
    }
    Ok(expr)
}

/// One `var' = expr` assignment inside an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub var: String,
    pub value: Expr,
}

/// One `probability : assign & assign & ...` term of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTerm {
    pub probability: Expr,
    pub assigns: Vec<Assign>,
}

/// Parses the right-hand side of a command: `p:u&u + p:u + ...` or a bare
/// `u&u` (implicit probability 1).
pub fn parse_update(input: &str) -> Result<Vec<UpdateTerm>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut terms = Vec::new();
    loop {
        let term = parse_update_term(&mut parser)?;
        terms.push(term);
        if matches!(parser.peek(), Some(Token::Sym("+"))) {
            parser.next();
            continue;
        }
        break;
    }
    if parser.pos != parser.tokens.len() {
        return Err(SynthesisError::parse(format!(
            "trailing input after update '{}'",
            input
        )));
    }
    Ok(terms)
}

fn parse_update_term(parser: &mut Parser) -> Result<UpdateTerm> {
    // Look ahead for a ':' before the next '+' at depth 0 to decide whether
    // an explicit probability was given.
    let checkpoint = parser.pos;
    let mut depth = 0i32;
    let mut has_colon = false;
    let mut j = parser.pos;
    while j < parser.tokens.len() {
        match &parser.tokens[j] {
            Token::Sym("(") => depth += 1,
            Token::Sym(")") => depth -= 1,
            Token::Sym(":") if depth == 0 => {
                has_colon = true;
                break;
            }
            Token::Sym("+") if depth == 0 => break,
            _ => {}
        }
        j += 1;
    }

    let probability = if has_colon {
        let prob = parser.parse_additive()?;
        parser.eat_sym(":")?;
        prob
    } else {
        parser.pos = checkpoint;
        Expr::Num(1.0)
    };

    let assigns = parse_assigns(parser)?;
    Ok(UpdateTerm { probability, assigns })
}

fn parse_assigns(parser: &mut Parser) -> Result<Vec<Assign>> {
    // bare `true` update (no variable changes)
    if let Some(Token::Ident(name)) = parser.peek() {
        if name == "true" && !matches!(parser.tokens.get(parser.pos + 1), Some(Token::Sym("'"))) {
            parser.next();
            return Ok(Vec::new());
        }
    }

    let mut assigns = Vec::new();
    loop {
        let var = match parser.next() {
            Some(Token::Ident(name)) => name,
            other => {
                return Err(SynthesisError::parse(format!(
                    "expected variable name in update, found {:?}",
                    other
                )))
            }
        };
        parser.eat_sym("'")?;
        parser.eat_sym("=")?;
        let value = parser.parse_additive()?;
        assigns.push(Assign { var, value });
        if matches!(parser.peek(), Some(Token::Sym("&"))) {
            parser.next();
            continue;
        }
        break;
    }
    Ok(assigns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_single_deterministic_term() {
        let terms = parse_update("x'=x+1").unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].assigns.len(), 1);
        assert_eq!(terms[0].assigns[0].var, "x");
    }

    #[test]
    fn test_parse_update_probabilistic_terms() {
        let terms = parse_update("0.5:x'=0 + 0.5:x'=1").unwrap();
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn test_parse_update_multiple_assigns_in_one_term() {
        let terms = parse_update("x'=x+1 & y'=0").unwrap();
        assert_eq!(terms[0].assigns.len(), 2);
    }

    #[test]
    fn test_parse_update_true_noop() {
        let terms = parse_update("true").unwrap();
        assert_eq!(terms.len(), 1);
        assert!(terms[0].assigns.is_empty());
    }
}
