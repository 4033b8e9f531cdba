//! A minimal integer/boolean expression language, used for guards, updates,
//! probabilities, labels and rewards in the PRISM-subset sketch reader.
//!
//! PRISM itself supports a much richer expression language; this crate
//! only needs enough to evaluate the guards/updates of the bounded-integer
//! sketches this domain uses, so the grammar is deliberately small.
//! Booleans are represented as `0.0`/`1.0`.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, SynthesisError};

/// A variable environment: the current value of every declared variable
/// (and, during command-variant construction, the literal values
/// substituted in for fixed hole options).
pub type Env = HashMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// An expression tree over numeric literals, variables, and the operators
/// above.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Un(UnOp, Box<Expr>),
    Bin(Box<Expr>, BinOp, Box<Expr>),
}

impl Expr {
    /// Evaluates this expression against `env`. Unknown identifiers are a
    /// parse-time bug (the sketch reader resolves every identifier against
    /// declared variables, holes and constants before this is ever called),
    /// so this returns a [`SynthesisError::ModelCheckerFailure`] rather than
    /// silently defaulting, to surface the bug instead of masking it.
    pub fn eval(&self, env: &Env) -> Result<f64> {
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var(name) => env.get(name).copied().ok_or_else(|| {
                SynthesisError::model_checker_failure(format!("unbound identifier '{}'", name))
            }),
            Expr::Un(op, inner) => {
                let value = inner.eval(env)?;
                Ok(match op {
                    UnOp::Neg => -value,
                    UnOp::Not => bool_of(value == 0.0),
                })
            }
            Expr::Bin(lhs, op, rhs) => {
                let l = lhs.eval(env)?;
                let r = rhs.eval(env)?;
                Ok(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Lt => bool_of(l < r),
                    BinOp::Le => bool_of(l <= r),
                    BinOp::Gt => bool_of(l > r),
                    BinOp::Ge => bool_of(l >= r),
                    BinOp::Eq => bool_of(l == r),
                    BinOp::Ne => bool_of(l != r),
                    BinOp::And => bool_of(l != 0.0 && r != 0.0),
                    BinOp::Or => bool_of(l != 0.0 || r != 0.0),
                })
            }
        }
    }

    /// Returns every free variable name occurring in this expression, in
    /// first-occurrence order with duplicates removed. Used to find which
    /// holes a guard/update references when building colored command
    /// variants.
    pub fn identifiers(&self) -> Vec<String> {
        let mut seen = Vec::new();
        self.collect_identifiers(&mut seen);
        seen
    }

    fn collect_identifiers(&self, seen: &mut Vec<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(name) => {
                if !seen.contains(name) {
                    seen.push(name.clone());
                }
            }
            Expr::Un(_, inner) => inner.collect_identifiers(seen),
            Expr::Bin(lhs, _, rhs) => {
                lhs.collect_identifiers(seen);
                rhs.collect_identifiers(seen);
            }
        }
    }

    /// Returns a copy of this expression with every occurrence of the
    /// variable `name` replaced by the literal `value` — used to bake a
    /// hole's chosen option into a command variant at coloring time.
    pub fn substitute(&self, name: &str, value: f64) -> Expr {
        match self {
            Expr::Num(n) => Expr::Num(*n),
            Expr::Var(var) if var == name => Expr::Num(value),
            Expr::Var(var) => Expr::Var(var.clone()),
            Expr::Un(op, inner) => Expr::Un(*op, Box::new(inner.substitute(name, value))),
            Expr::Bin(lhs, op, rhs) => Expr::Bin(
                Box::new(lhs.substitute(name, value)),
                *op,
                Box::new(rhs.substitute(name, value)),
            ),
        }
    }
}

fn bool_of(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Un(UnOp::Neg, inner) => write!(f, "-({})", inner),
            Expr::Un(UnOp::Not, inner) => write!(f, "!({})", inner),
            Expr::Bin(lhs, op, rhs) => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Lt => "<",
                    BinOp::Le => "<=",
                    BinOp::Gt => ">",
                    BinOp::Ge => ">=",
                    BinOp::Eq => "=",
                    BinOp::Ne => "!=",
                    BinOp::And => "&",
                    BinOp::Or => "|",
                };
                write!(f, "({} {} {})", lhs, sym, rhs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::parser::parse_expr;

    #[test]
    fn test_eval_arithmetic() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        let env = Env::new();
        assert_eq!(expr.eval(&env).unwrap(), 7.0);
    }

    #[test]
    fn test_eval_comparison_and_logic() {
        let mut env = Env::new();
        env.insert("x".into(), 3.0);
        let expr = parse_expr("x >= 2 & x < 10").unwrap();
        assert_eq!(expr.eval(&env).unwrap(), 1.0);
    }

    #[test]
    fn test_substitute_hole_to_literal() {
        let expr = parse_expr("x + h").unwrap();
        let substituted = expr.substitute("h", 5.0);
        let mut env = Env::new();
        env.insert("x".into(), 1.0);
        assert_eq!(substituted.eval(&env).unwrap(), 6.0);
    }

    #[test]
    fn test_identifiers_deduplicated() {
        let expr = parse_expr("x + x - y").unwrap();
        assert_eq!(expr.identifiers(), vec!["x".to_string(), "y".to_string()]);
    }
}
