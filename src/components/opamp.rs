//! Ideal operational amplifier.
//!
//! The input port is a nullator (`v_in = 0`, `i_in = 0`) and the output port
//! a norator: its voltage and current are left entirely to the surrounding
//! network, which must contain feedback for the system to be well posed.

use crate::circuit::{Circuit, NodeRef};
use crate::error::Result;
use crate::expr::Equation;

use super::Instance;

/// An ideal op-amp.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdealOpAmp;

impl IdealOpAmp {
    /// Four-pin form: input port (`in_p`, `in_n`), output port (`out_p`, `out_n`).
    pub fn build(
        &self,
        circuit: &mut Circuit,
        name: &str,
        in_p: NodeRef,
        in_n: NodeRef,
        out_p: NodeRef,
        out_n: NodeRef,
    ) -> Result<Instance> {
        let id = circuit.begin_component(name, "IdealOpAmp")?;
        let input = circuit.make_branch(id, &in_p, &in_n)?;
        let output = circuit.make_branch(id, &out_p, &out_n)?;
        circuit.add_equation(id, Equation::new(input.v(), 0.0));
        circuit.add_equation(id, Equation::new(input.i(), 0.0));
        Ok(Instance::new(id, vec![input, output]))
    }

    /// Three-pin form with the output referenced to ground.
    pub fn build_grounded(
        &self,
        circuit: &mut Circuit,
        name: &str,
        in_p: NodeRef,
        in_n: NodeRef,
        out: NodeRef,
    ) -> Result<Instance> {
        self.build(circuit, name, in_p, in_n, out, NodeRef::GROUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Resistor;
    use crate::expr::Expr;

    fn nullator(circuit: &Circuit, inst: &Instance) -> Vec<String> {
        let ctx = circuit.context();
        circuit
            .component_equations(inst.component, &ctx.discrete)
            .iter()
            .filter(|eq| eq.rhs == Expr::Constant(0.0))
            .map(|eq| eq.to_string())
            .collect()
    }

    #[test]
    fn test_input_port_is_nullator() {
        let mut circuit = Circuit::new();
        let inp = circuit.new_scalar(Some("inp"), None);
        let inn = circuit.new_scalar(Some("inn"), None);
        let out = circuit.new_scalar(Some("out"), None);
        let inst = IdealOpAmp.build_grounded(&mut circuit, "OP1", inp, inn, out).unwrap();
        let input = inst.branches[0];

        let expected = vec![format!("{} = 0", input.voltage), format!("{} = 0", input.current)];
        assert_eq!(nullator(&circuit, &inst), expected);
    }

    #[test]
    fn test_input_equations_ignore_output_loading() {
        let mut unloaded = Circuit::new();
        let inp = unloaded.new_scalar(Some("inp"), None);
        let inn = unloaded.new_scalar(Some("inn"), None);
        let out = unloaded.new_scalar(Some("out"), None);
        let bare = IdealOpAmp.build_grounded(&mut unloaded, "OP1", inp, inn, out).unwrap();

        let mut loaded = Circuit::new();
        let inp = loaded.new_scalar(Some("inp"), None);
        let inn = loaded.new_scalar(Some("inn"), None);
        let out = loaded.new_scalar(Some("out"), None);
        let op = IdealOpAmp.build_grounded(&mut loaded, "OP1", inp, inn, out).unwrap();
        Resistor::new(10e3).build(&mut loaded, "Rf", out, inn).unwrap();
        Resistor::new(1e3).build(&mut loaded, "Rg", inn, NodeRef::GROUND).unwrap();
        Resistor::new(47.0).build(&mut loaded, "RL", out, NodeRef::GROUND).unwrap();

        assert_eq!(nullator(&unloaded, &bare), nullator(&loaded, &op));
    }

    #[test]
    fn test_output_port_is_unconstrained() {
        let mut circuit = Circuit::new();
        let inp = circuit.new_scalar(None, None);
        let out = circuit.new_scalar(None, None);
        let inst = IdealOpAmp
            .build_grounded(&mut circuit, "OP1", inp, NodeRef::GROUND, out)
            .unwrap();
        let output = inst.branches[1];
        let ctx = circuit.context();
        let constrained = circuit
            .component_equations(inst.component, &ctx.discrete)
            .iter()
            .filter(|eq| eq.lhs == output.i() || eq.rhs.references(output.current))
            .count();
        assert_eq!(constrained, 0);
    }
}
