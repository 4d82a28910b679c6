//! Template parameters.
//!
//! A parameter is a constant, a time-varying external signal, or a value
//! linked to a heat port temperature. Reading one never has side effects, so
//! the solver may evaluate equations as often as it likes.

use std::fmt;

use crate::circuit::{ComponentId, InputId, VarId};
use crate::error::{KirchhoffError, Result};
use crate::expr::{EvalContext, Expr};

/// A template parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Constant(f64),
    Signal(InputId),
    Temperature(VarId),
}

impl Param {
    pub fn to_expr(&self) -> Expr {
        match self {
            Param::Constant(v) => Expr::Constant(*v),
            Param::Signal(id) => Expr::Input(*id),
            Param::Temperature(id) => Expr::Var(*id),
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Param::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Only known at evaluation time.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Param::Constant(_))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Constant(value)
    }
}

impl From<InputId> for Param {
    fn from(id: InputId) -> Self {
        Param::Signal(id)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}

/// A strict-positivity requirement on a dynamic parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCheck {
    pub component: ComponentId,
    pub param: String,
    pub expr: Expr,
}

impl ParamCheck {
    /// Evaluate the check; `Ok(Some(..))` describes a violation.
    pub fn evaluate(&self, component_name: &str, ctx: &EvalContext) -> Result<Option<KirchhoffError>> {
        let value = ctx.eval(&self.expr)?;
        let worst = (0..value.len()).map(|k| value.re(k)).fold(f64::INFINITY, f64::min);
        if worst > 0.0 {
            return Ok(None);
        }
        Ok(Some(KirchhoffError::InvalidParameter {
            component: component_name.to_string(),
            param: self.param.clone(),
            message: format!("must be strictly positive, got {} at t={}", worst, ctx.time),
        }))
    }
}
