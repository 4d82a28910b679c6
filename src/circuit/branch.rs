//! Branch constraint emitter.
//!
//! A branch is created between two node references: its voltage is tied to
//! the potential difference and its current enters the conservation sums of
//! both nodes with opposite signs. Literal nodes supply their constant but
//! receive no contribution.

use super::graph::Circuit;
use super::shape::resolve_shape;
use super::types::{Branch, ComponentId, HeatPort, NodeRef, UnknownRole};
use crate::error::{KirchhoffError, Result, ShapeConflict};
use crate::expr::{Equation, Expr};

fn difference(n1: &NodeRef, n2: &NodeRef) -> Expr {
    match (n1, n2) {
        (_, NodeRef::Literal(v)) if *v == 0.0 => n1.potential(),
        (NodeRef::Literal(v), _) if *v == 0.0 => -n2.potential(),
        _ => n1.potential() - n2.potential(),
    }
}

impl Circuit {
    /// Create a branch between `n1` and `n2`.
    ///
    /// Emits `v = potential(n1) - potential(n2)` and adds `+i` to the
    /// outgoing current of `n1` and `-i` to that of `n2`.
    pub fn make_branch(&mut self, component: ComponentId, n1: &NodeRef, n2: &NodeRef) -> Result<Branch> {
        let shape = resolve_shape(&[*n1, *n2])
            .map_err(|e| KirchhoffError::shape_mismatch(self.component_name(component), e))?;

        let (v_name, i_name) = self.branch_names(component);
        let voltage = self.new_unknown(v_name, shape, None, UnknownRole::Branch);
        let current = self.new_unknown(i_name, shape, None, UnknownRole::Branch);

        self.add_equation(component, Equation::new(Expr::Var(voltage), difference(n1, n2)));
        self.contribute(n1, 1.0, current);
        self.contribute(n2, -1.0, current);

        let branch = Branch {
            voltage,
            current,
            shape,
        };
        self.record_branch(component, branch);
        Ok(branch)
    }

    /// Create a branch and, if a heat port is given, emit `power = v * i`.
    ///
    /// The port must have exactly the branch shape; complex branches cannot
    /// dissipate into a heat port.
    pub fn make_branch_with_heat_port(
        &mut self,
        component: ComponentId,
        n1: &NodeRef,
        n2: &NodeRef,
        heat_port: Option<&HeatPort>,
    ) -> Result<Branch> {
        let branch = self.make_branch(component, n1, n2)?;
        if let Some(port) = heat_port {
            if branch.shape.is_complex() || port.shape != branch.shape {
                return Err(KirchhoffError::shape_mismatch(
                    self.component_name(component),
                    ShapeConflict {
                        expected: branch.shape,
                        found: port.shape,
                    },
                ));
            }
            self.add_equation(component, Equation::new(Expr::Var(port.power), branch.v() * branch.i()));
        }
        Ok(branch)
    }

    fn branch_names(&self, component: ComponentId) -> (String, String) {
        let name = self.component_name(component);
        match self.component(component).map(|c| c.branches.len()).unwrap_or(0) {
            0 => (format!("{}.v", name), format!("{}.i", name)),
            k => (format!("{}.v{}", name, k + 1), format!("{}.i{}", name, k + 1)),
        }
    }
}
