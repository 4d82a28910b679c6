//! Expression evaluation.
//!
//! Values are real or complex sequences; a length-1 value broadcasts against
//! any length. Comparisons, `min`/`max`, `sign` and `if` conditions look at
//! the real part of complex operands.

use std::collections::HashMap;

use num_complex::Complex64;

use super::{BinaryOp, Expr, UnaryOp};
use crate::circuit::{ControlId, InputId, VarId};
use crate::error::{KirchhoffError, Result};
use crate::hybrid::DiscreteState;

/// A real or complex value sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Value {
    /// A single real value.
    pub fn scalar(value: f64) -> Self {
        Value::Real(vec![value])
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Real(v) => v.len(),
            Value::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Value::Complex(_))
    }

    /// The real values, if this is a real sequence.
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Value::Real(v) => Some(v),
            Value::Complex(_) => None,
        }
    }

    /// Real part of element `k`, broadcasting single values.
    pub fn re(&self, k: usize) -> f64 {
        match self {
            Value::Real(v) => v[at(v.len(), k)],
            Value::Complex(v) => v[at(v.len(), k)].re,
        }
    }

    /// Largest element magnitude.
    pub fn max_abs(&self) -> f64 {
        match self {
            Value::Real(v) => v.iter().fold(0.0, |m, x| m.max(x.abs())),
            Value::Complex(v) => v.iter().fold(0.0, |m, z| m.max(z.norm())),
        }
    }

    fn to_complex(&self) -> Vec<Complex64> {
        match self {
            Value::Real(v) => v.iter().map(|x| Complex64::new(*x, 0.0)).collect(),
            Value::Complex(v) => v.clone(),
        }
    }

    fn map(self, fr: impl Fn(f64) -> f64, fc: impl Fn(Complex64) -> Complex64) -> Value {
        match self {
            Value::Real(v) => Value::Real(v.into_iter().map(fr).collect()),
            Value::Complex(v) => Value::Complex(v.into_iter().map(fc).collect()),
        }
    }

    fn zip(
        &self,
        other: &Value,
        fr: impl Fn(f64, f64) -> f64,
        fc: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> Result<Value> {
        let len = broadcast_len(self.len(), other.len())?;
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Ok(Value::Real(
                (0..len)
                    .map(|k| fr(a[at(a.len(), k)], b[at(b.len(), k)]))
                    .collect(),
            )),
            _ => {
                let a = self.to_complex();
                let b = other.to_complex();
                Ok(Value::Complex(
                    (0..len)
                        .map(|k| fc(a[at(a.len(), k)], b[at(b.len(), k)]))
                        .collect(),
                ))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Real(values)
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Self {
        Value::Complex(vec![value])
    }
}

impl From<Vec<Complex64>> for Value {
    fn from(values: Vec<Complex64>) -> Self {
        Value::Complex(values)
    }
}

fn at(len: usize, k: usize) -> usize {
    if len == 1 {
        0
    } else {
        k
    }
}

fn broadcast_len(a: usize, b: usize) -> Result<usize> {
    match (a, b) {
        _ if a == b => Ok(a),
        (1, _) => Ok(b),
        (_, 1) => Ok(a),
        _ => Err(KirchhoffError::evaluation(format!(
            "cannot combine values of length {} and {}",
            a, b
        ))),
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn truth(x: bool) -> f64 {
    if x {
        1.0
    } else {
        0.0
    }
}

fn apply_unary(op: UnaryOp, x: Value) -> Value {
    match op {
        UnaryOp::Neg => x.map(|a| -a, |z| -z),
        UnaryOp::Exp => x.map(f64::exp, |z| z.exp()),
        UnaryOp::Ln => x.map(f64::ln, |z| z.ln()),
        UnaryOp::Sin => x.map(f64::sin, |z| z.sin()),
        UnaryOp::Sign => x.map(sign, |z| Complex64::new(sign(z.re), 0.0)),
    }
}

fn apply_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinaryOp::Add => a.zip(b, |x, y| x + y, |x, y| x + y),
        BinaryOp::Sub => a.zip(b, |x, y| x - y, |x, y| x - y),
        BinaryOp::Mul => a.zip(b, |x, y| x * y, |x, y| x * y),
        BinaryOp::Div => a.zip(b, |x, y| x / y, |x, y| x / y),
        BinaryOp::Min => a.zip(b, f64::min, |x, y| if x.re <= y.re { x } else { y }),
        BinaryOp::Max => a.zip(b, f64::max, |x, y| if x.re >= y.re { x } else { y }),
        BinaryOp::Gt => a.zip(
            b,
            |x, y| truth(x > y),
            |x, y| Complex64::new(truth(x.re > y.re), 0.0),
        ),
        BinaryOp::Ge => a.zip(
            b,
            |x, y| truth(x >= y),
            |x, y| Complex64::new(truth(x.re >= y.re), 0.0),
        ),
    }
}

fn select(cond: &Value, then: &Value, otherwise: &Value) -> Result<Value> {
    let len = broadcast_len(cond.len(), broadcast_len(then.len(), otherwise.len())?)?;
    if then.is_complex() || otherwise.is_complex() {
        let a = then.to_complex();
        let b = otherwise.to_complex();
        Ok(Value::Complex(
            (0..len)
                .map(|k| {
                    if cond.re(k) > 0.5 {
                        a[at(a.len(), k)]
                    } else {
                        b[at(b.len(), k)]
                    }
                })
                .collect(),
        ))
    } else {
        Ok(Value::Real(
            (0..len)
                .map(|k| if cond.re(k) > 0.5 { then.re(k) } else { otherwise.re(k) })
                .collect(),
        ))
    }
}

/// Bindings for evaluating expressions at one instant.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Simulation time
    pub time: f64,
    values: HashMap<VarId, Value>,
    derivatives: HashMap<VarId, Value>,
    inputs: HashMap<InputId, Value>,
    controls: HashMap<ControlId, bool>,
    /// Active modes and clocks of all hybrid components
    pub discrete: DiscreteState,
}

impl EvalContext {
    /// Create a context around the given discrete state.
    pub fn new(discrete: DiscreteState) -> Self {
        Self {
            discrete,
            ..Self::default()
        }
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_value(&mut self, id: VarId, value: impl Into<Value>) {
        self.values.insert(id, value.into());
    }

    pub fn set_derivative(&mut self, id: VarId, value: impl Into<Value>) {
        self.derivatives.insert(id, value.into());
    }

    pub fn set_input(&mut self, id: InputId, value: impl Into<Value>) {
        self.inputs.insert(id, value.into());
    }

    pub fn set_control(&mut self, id: ControlId, value: bool) {
        self.controls.insert(id, value);
    }

    pub fn value(&self, id: VarId) -> Result<&Value> {
        self.values
            .get(&id)
            .ok_or_else(|| KirchhoffError::UnboundVariable { name: id.to_string() })
    }

    pub fn derivative(&self, id: VarId) -> Result<&Value> {
        self.derivatives.get(&id).ok_or_else(|| KirchhoffError::UnboundVariable {
            name: format!("der({})", id),
        })
    }

    pub fn input(&self, id: InputId) -> Result<&Value> {
        self.inputs
            .get(&id)
            .ok_or_else(|| KirchhoffError::UnboundVariable { name: id.to_string() })
    }

    pub fn control(&self, id: ControlId) -> Result<bool> {
        self.controls
            .get(&id)
            .copied()
            .ok_or_else(|| KirchhoffError::UnboundVariable { name: id.to_string() })
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Constant(c) => Ok(Value::scalar(*c)),
            Expr::Var(id) => self.value(*id).cloned(),
            Expr::Input(id) => self.input(*id).cloned(),
            Expr::Clock(id) => self
                .discrete
                .clock(*id)
                .map(Value::scalar)
                .ok_or_else(|| KirchhoffError::UnboundVariable { name: id.to_string() }),
            Expr::Time => Ok(Value::scalar(self.time)),
            Expr::Der(inner) => self.eval_derivative(inner),
            Expr::Unary { op, operand } => Ok(apply_unary(*op, self.eval(operand)?)),
            Expr::Binary { op, left, right } => {
                apply_binary(*op, &self.eval(left)?, &self.eval(right)?)
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => select(&self.eval(cond)?, &self.eval(then)?, &self.eval(otherwise)?),
        }
    }

    /// Evaluate an expression and return the real part of its first element.
    pub fn eval_real(&self, expr: &Expr) -> Result<f64> {
        let value = self.eval(expr)?;
        if value.is_empty() {
            return Err(KirchhoffError::evaluation("empty value"));
        }
        Ok(value.re(0))
    }

    /// Evaluate the time derivative of an expression.
    ///
    /// Inputs and clocks are piecewise constant between events.
    pub fn eval_derivative(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Constant(_) | Expr::Input(_) | Expr::Clock(_) => Ok(Value::scalar(0.0)),
            Expr::Var(id) => self.derivative(*id).cloned(),
            Expr::Time => Ok(Value::scalar(1.0)),
            Expr::Der(_) => Err(KirchhoffError::evaluation(
                "second derivatives are not supported",
            )),
            Expr::Unary { op, operand } => {
                let d = self.eval_derivative(operand)?;
                match op {
                    UnaryOp::Neg => Ok(apply_unary(UnaryOp::Neg, d)),
                    UnaryOp::Exp => apply_binary(BinaryOp::Mul, &self.eval(expr)?, &d),
                    UnaryOp::Ln => apply_binary(BinaryOp::Div, &d, &self.eval(operand)?),
                    UnaryOp::Sin => {
                        let cos = self.eval(operand)?.map(f64::cos, |z| z.cos());
                        apply_binary(BinaryOp::Mul, &cos, &d)
                    }
                    UnaryOp::Sign => Ok(Value::scalar(0.0)),
                }
            }
            Expr::Binary { op, left, right } => {
                let da = self.eval_derivative(left)?;
                let db = self.eval_derivative(right)?;
                match op {
                    BinaryOp::Add => apply_binary(BinaryOp::Add, &da, &db),
                    BinaryOp::Sub => apply_binary(BinaryOp::Sub, &da, &db),
                    BinaryOp::Mul => {
                        let a = self.eval(left)?;
                        let b = self.eval(right)?;
                        let lhs = apply_binary(BinaryOp::Mul, &da, &b)?;
                        let rhs = apply_binary(BinaryOp::Mul, &a, &db)?;
                        apply_binary(BinaryOp::Add, &lhs, &rhs)
                    }
                    BinaryOp::Div => {
                        let a = self.eval(left)?;
                        let b = self.eval(right)?;
                        let num = apply_binary(
                            BinaryOp::Sub,
                            &apply_binary(BinaryOp::Mul, &da, &b)?,
                            &apply_binary(BinaryOp::Mul, &a, &db)?,
                        )?;
                        apply_binary(BinaryOp::Div, &num, &apply_binary(BinaryOp::Mul, &b, &b)?)
                    }
                    BinaryOp::Min => {
                        let pick_left =
                            apply_binary(BinaryOp::Ge, &self.eval(right)?, &self.eval(left)?)?;
                        select(&pick_left, &da, &db)
                    }
                    BinaryOp::Max => {
                        let pick_left =
                            apply_binary(BinaryOp::Ge, &self.eval(left)?, &self.eval(right)?)?;
                        select(&pick_left, &da, &db)
                    }
                    BinaryOp::Gt | BinaryOp::Ge => Ok(Value::scalar(0.0)),
                }
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => select(
                &self.eval(cond)?,
                &self.eval_derivative(then)?,
                &self.eval_derivative(otherwise)?,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_arithmetic() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), 10.0);
        let e = Expr::var(VarId(0)) / 4.0 + 1.0;
        assert_relative_eq!(ctx.eval_real(&e).unwrap(), 3.5);
    }

    #[test]
    fn test_array_broadcast() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), vec![1.0, 2.0, 3.0]);
        let v = ctx.eval(&(Expr::var(VarId(0)) * 2.0)).unwrap();
        assert_eq!(v, Value::Real(vec![2.0, 4.0, 6.0]));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), vec![1.0, 2.0, 3.0]);
        ctx.set_value(VarId(1), vec![1.0, 2.0]);
        assert!(ctx.eval(&(Expr::var(VarId(0)) + Expr::var(VarId(1)))).is_err());
    }

    #[test]
    fn test_complex_promotion() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), Complex64::new(1.0, 1.0));
        let v = ctx.eval(&(Expr::var(VarId(0)) * 2.0)).unwrap();
        assert_eq!(v, Value::Complex(vec![Complex64::new(2.0, 2.0)]));
    }

    #[test]
    fn test_derivative_product_rule() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), 3.0);
        ctx.set_derivative(VarId(0), 2.0);
        // d/dt (x * x) = 2 x x'
        let e = (Expr::var(VarId(0)) * Expr::var(VarId(0))).der();
        assert_relative_eq!(ctx.eval_real(&e).unwrap(), 12.0);
    }

    #[test]
    fn test_if_selects_elementwise() {
        let mut ctx = EvalContext::default();
        ctx.set_value(VarId(0), vec![-1.0, 1.0]);
        let e = Expr::if_else(Expr::var(VarId(0)).gt(0.0), 10.0, 20.0);
        assert_eq!(ctx.eval(&e).unwrap(), Value::Real(vec![20.0, 10.0]));
    }

    #[test]
    fn test_unbound_variable() {
        let ctx = EvalContext::default();
        let err = ctx.eval(&Expr::var(VarId(9))).unwrap_err();
        assert!(matches!(err, KirchhoffError::UnboundVariable { .. }));
    }
}
