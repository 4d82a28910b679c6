//! Symbolic expressions and equations emitted by component templates.
//!
//! Templates never solve anything; they append [`Equation`]s built from
//! [`Expr`] trees to the network pool. The [`eval`] submodule can evaluate
//! residuals for diagnostics and tests.

pub mod eval;

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::circuit::{ClockId, InputId, VarId};

pub use eval::{EvalContext, Value};

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric constant.
    Constant(f64),
    /// A solver unknown.
    Var(VarId),
    /// An external input signal.
    Input(InputId),
    /// A discrete clock (time of its last reset).
    Clock(ClockId),
    /// Simulation time.
    Time,
    /// Time derivative, supplied by the solver's variable model.
    Der(Box<Expr>),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Elementwise selection: `cond > 0.5 ? then : otherwise`.
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Exp,
    Ln,
    Sin,
    Sign,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    /// 1.0 where `left > right`, else 0.0
    Gt,
    /// 1.0 where `left >= right`, else 0.0
    Ge,
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    pub fn var(id: VarId) -> Self {
        Expr::Var(id)
    }

    fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Time derivative of this expression.
    pub fn der(self) -> Self {
        Expr::Der(Box::new(self))
    }

    pub fn exp(self) -> Self {
        Self::unary(UnaryOp::Exp, self)
    }

    pub fn ln(self) -> Self {
        Self::unary(UnaryOp::Ln, self)
    }

    pub fn sin(self) -> Self {
        Self::unary(UnaryOp::Sin, self)
    }

    pub fn sign(self) -> Self {
        Self::unary(UnaryOp::Sign, self)
    }

    pub fn min(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Min, self, other.into())
    }

    pub fn max(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Max, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Gt, self, other.into())
    }

    pub fn ge(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ge, self, other.into())
    }

    /// Elementwise `if cond then a else b`.
    pub fn if_else(cond: Expr, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then: Box::new(then.into()),
            otherwise: Box::new(otherwise.into()),
        }
    }

    /// True if the expression reads the given unknown.
    pub fn references(&self, id: VarId) -> bool {
        match self {
            Expr::Var(v) => *v == id,
            Expr::Constant(_) | Expr::Input(_) | Expr::Clock(_) | Expr::Time => false,
            Expr::Der(inner) => inner.references(id),
            Expr::Unary { operand, .. } => operand.references(id),
            Expr::Binary { left, right, .. } => left.references(id) || right.references(id),
            Expr::If {
                cond,
                then,
                otherwise,
            } => cond.references(id) || then.references(id) || otherwise.references(id),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(value)
    }
}

impl From<VarId> for Expr {
    fn from(id: VarId) -> Self {
        Expr::Var(id)
    }
}

impl<T: Into<Expr>> Add<T> for Expr {
    type Output = Expr;
    fn add(self, rhs: T) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs.into())
    }
}

impl<T: Into<Expr>> Sub<T> for Expr {
    type Output = Expr;
    fn sub(self, rhs: T) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs.into())
    }
}

impl<T: Into<Expr>> Mul<T> for Expr {
    type Output = Expr;
    fn mul(self, rhs: T) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs.into())
    }
}

impl<T: Into<Expr>> Div<T> for Expr {
    type Output = Expr;
    fn div(self, rhs: T) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs.into())
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

impl Add<Expr> for f64 {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Constant(self) + rhs
    }
}

impl Sub<Expr> for f64 {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Constant(self) - rhs
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Constant(self) * rhs
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{}", v),
            Expr::Var(id) => write!(f, "{}", id),
            Expr::Input(id) => write!(f, "{}", id),
            Expr::Clock(id) => write!(f, "{}", id),
            Expr::Time => write!(f, "time"),
            Expr::Der(inner) => write!(f, "der({})", inner),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::Exp => write!(f, "exp({})", operand),
                UnaryOp::Ln => write!(f, "ln({})", operand),
                UnaryOp::Sin => write!(f, "sin({})", operand),
                UnaryOp::Sign => write!(f, "sign({})", operand),
            },
            Expr::Binary { op, left, right } => match op {
                BinaryOp::Add => write!(f, "({} + {})", left, right),
                BinaryOp::Sub => write!(f, "({} - {})", left, right),
                BinaryOp::Mul => write!(f, "{} * {}", left, right),
                BinaryOp::Div => write!(f, "{} / {}", left, right),
                BinaryOp::Min => write!(f, "min({}, {})", left, right),
                BinaryOp::Max => write!(f, "max({}, {})", left, right),
                BinaryOp::Gt => write!(f, "({} > {})", left, right),
                BinaryOp::Ge => write!(f, "({} >= {})", left, right),
            },
            Expr::If {
                cond,
                then,
                otherwise,
            } => write!(f, "(if {} then {} else {})", cond, then, otherwise),
        }
    }
}

/// A residual equation `lhs = rhs`, elementwise for array shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// `lhs - rhs`, zero when the equation holds.
    pub fn residual(&self) -> Expr {
        self.lhs.clone() - self.rhs.clone()
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_building() {
        let v = Expr::var(VarId(0));
        let i = Expr::var(VarId(1));
        let eq = Equation::new(i, v / 100.0);
        assert_eq!(eq.to_string(), "x1 = x0 / 100");
    }

    #[test]
    fn test_references() {
        let e = (Expr::var(VarId(3)) * 2.0).der().exp();
        assert!(e.references(VarId(3)));
        assert!(!e.references(VarId(4)));
    }

    #[test]
    fn test_display_nested() {
        let e = Expr::if_else(Expr::Time.ge(1.0), 5.0, 0.0);
        assert_eq!(e.to_string(), "(if (time >= 1) then 5 else 0)");
    }
}
