//! Coupled inductors and the electro-mechanical converter.

use crate::circuit::{Circuit, Flange, NodeRef};
use crate::error::Result;
use crate::expr::{Equation, Expr};
use crate::params::Param;

use super::Instance;

/// Two coupled inductors.
///
/// ```text
/// v1 = L1 * der(i1) + M * der(i2)
/// v2 = M * der(i1) + L2 * der(i2)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub l1: Param,
    pub l2: Param,
    pub m: Param,
}

impl Transformer {
    pub fn new(l1: impl Into<Param>, l2: impl Into<Param>, m: impl Into<Param>) -> Self {
        Self {
            l1: l1.into(),
            l2: l2.into(),
            m: m.into(),
        }
    }

    /// Build from primary (`p1`, `n1`) and secondary (`p2`, `n2`) terminals.
    pub fn build(
        &self,
        circuit: &mut Circuit,
        name: &str,
        p1: NodeRef,
        n1: NodeRef,
        p2: NodeRef,
        n2: NodeRef,
    ) -> Result<Instance> {
        let id = circuit.begin_component(name, "Transformer")?;
        circuit.require_positive(id, "L1", &self.l1);
        circuit.require_positive(id, "L2", &self.l2);
        let primary = circuit.make_branch(id, &p1, &n1)?;
        let secondary = circuit.make_branch(id, &p2, &n2)?;

        let di1 = primary.i().der();
        let di2 = secondary.i().der();
        circuit.add_equation(
            id,
            Equation::new(
                primary.v(),
                self.l1.to_expr() * di1.clone() + self.m.to_expr() * di2.clone(),
            ),
        );
        circuit.add_equation(
            id,
            Equation::new(secondary.v(), self.m.to_expr() * di1 + self.l2.to_expr() * di2),
        );
        Ok(Instance::new(id, vec![primary, secondary]))
    }
}

/// Electro-mechanical converter between a branch and a rotational flange.
///
/// `v = k * der(phi)` and `tau = -k * i`. The flange angle is owned by the
/// mechanical network; the torque is defined here.
#[derive(Debug, Clone, PartialEq)]
pub struct Emf {
    /// Transformation coefficient (N.m/A)
    pub k: f64,
    pub flange: Flange,
}

impl Emf {
    pub fn new(k: f64, flange: Flange) -> Self {
        Self { k, flange }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Emf")?;
        let branch = circuit.make_branch(id, &p, &n)?;
        circuit.add_equation(
            id,
            Equation::new(branch.v(), self.k * Expr::Var(self.flange.angle).der()),
        );
        circuit.add_equation(
            id,
            Equation::new(Expr::Var(self.flange.torque), -(self.k * branch.i())),
        );
        Ok(Instance::new(id, vec![branch]))
    }
}
