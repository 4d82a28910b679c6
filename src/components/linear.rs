//! Linear passive components: Resistor, Conductor, Capacitor, Inductor, Short.
//!
//! All of them are vectorizable: array or complex node references give
//! branches of the resolved shape and the equations hold elementwise.

use crate::circuit::{Circuit, HeatPort, NodeRef};
use crate::error::Result;
use crate::expr::{Equation, Expr};
use crate::params::Param;

use super::Instance;

/// A resistor, optionally temperature dependent.
///
/// `v = R_eff * i` with `R_eff = R * (1 + alpha * (T - T_ref))` when a
/// temperature or heat port is supplied, else `R_eff = R`. Zero and negative
/// constant resistances are accepted with a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub resistance: Param,
    /// Temperature coefficient (1/K)
    pub alpha: f64,
    /// Reference temperature, the network default when `None`
    pub t_ref: Option<f64>,
    /// Operating temperature when no heat port is attached
    pub temperature: Option<Param>,
    pub heat_port: Option<HeatPort>,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(resistance: impl Into<Param>) -> Self {
        Self {
            resistance: resistance.into(),
            alpha: 0.0,
            t_ref: None,
            temperature: None,
            heat_port: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_reference_temperature(mut self, t_ref: f64) -> Self {
        self.t_ref = Some(t_ref);
        self
    }

    pub fn with_temperature(mut self, temperature: impl Into<Param>) -> Self {
        self.temperature = Some(temperature.into());
        self
    }

    /// Dissipate into a heat port and read its temperature.
    pub fn with_heat_port(mut self, port: HeatPort) -> Self {
        self.heat_port = Some(port);
        self
    }

    fn operating_temperature(&self) -> Option<Param> {
        self.heat_port
            .map(|p| Param::Temperature(p.temperature))
            .or(self.temperature)
    }

    /// Effective resistance as an expression.
    pub fn effective_resistance(&self, t_ref: f64) -> Expr {
        let r = self.resistance.to_expr();
        match self.operating_temperature() {
            Some(t) if self.alpha != 0.0 => r * (1.0 + self.alpha * (t.to_expr() - t_ref)),
            _ => r,
        }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Resistor")?;
        if let Some(r) = self.resistance.as_constant().filter(|r| *r <= 0.0) {
            circuit.warn_degenerate(id, "R", r);
        }
        let branch = circuit.make_branch_with_heat_port(id, &p, &n, self.heat_port.as_ref())?;
        let t_ref = self.t_ref.unwrap_or(circuit.config().reference_temperature);
        circuit.add_equation(
            id,
            Equation::new(branch.v(), self.effective_resistance(t_ref) * branch.i()),
        );
        Ok(Instance::new(id, vec![branch]))
    }
}

/// A conductor, `i = G * v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conductor {
    pub conductance: Param,
}

impl Conductor {
    pub fn new(conductance: impl Into<Param>) -> Self {
        Self {
            conductance: conductance.into(),
        }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Conductor")?;
        let branch = circuit.make_branch(id, &p, &n)?;
        circuit.add_equation(id, Equation::new(branch.i(), self.conductance.to_expr() * branch.v()));
        Ok(Instance::new(id, vec![branch]))
    }
}

/// A capacitor, `i = C * der(v)`.
///
/// A signal-valued capacitance must stay strictly positive; this is checked
/// at evaluation time by [`Circuit::check_parameters`].
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    pub capacitance: Param,
    /// Initial voltage
    pub v0: Option<f64>,
}

impl Capacitor {
    pub fn new(capacitance: impl Into<Param>) -> Self {
        Self {
            capacitance: capacitance.into(),
            v0: None,
        }
    }

    pub fn with_initial_voltage(mut self, v0: f64) -> Self {
        self.v0 = Some(v0);
        self
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Capacitor")?;
        circuit.require_positive(id, "C", &self.capacitance);
        let branch = circuit.make_branch(id, &p, &n)?;
        if let Some(v0) = self.v0 {
            circuit.set_initial(branch.voltage, v0);
        }
        circuit.add_equation(
            id,
            Equation::new(branch.i(), self.capacitance.to_expr() * branch.v().der()),
        );
        Ok(Instance::new(id, vec![branch]))
    }
}

/// An inductor, `v = L * der(i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    pub inductance: Param,
    /// Initial current
    pub i0: Option<f64>,
}

impl Inductor {
    pub fn new(inductance: impl Into<Param>) -> Self {
        Self {
            inductance: inductance.into(),
            i0: None,
        }
    }

    pub fn with_initial_current(mut self, i0: f64) -> Self {
        self.i0 = Some(i0);
        self
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Inductor")?;
        circuit.require_positive(id, "L", &self.inductance);
        let branch = circuit.make_branch(id, &p, &n)?;
        if let Some(i0) = self.i0 {
            circuit.set_initial(branch.current, i0);
        }
        circuit.add_equation(
            id,
            Equation::new(branch.v(), self.inductance.to_expr() * branch.i().der()),
        );
        Ok(Instance::new(id, vec![branch]))
    }
}

/// A short circuit, `v = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Short;

impl Short {
    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Short")?;
        let branch = circuit.make_branch(id, &p, &n)?;
        circuit.add_equation(id, Equation::new(branch.v(), 0.0));
        Ok(Instance::new(id, vec![branch]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{InputId, Shape};
    use crate::error::KirchhoffError;
    use crate::expr::Value;
    use approx::assert_relative_eq;

    #[test]
    fn test_resistor_residual() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(Some("a"), None);
        let r = Resistor::new(100.0).build(&mut circuit, "R1", a, NodeRef::GROUND).unwrap();
        let branch = r.branches[0];

        let mut ctx = circuit.context();
        ctx.set_value(a.var().unwrap(), 5.0);
        ctx.set_value(branch.voltage, 5.0);
        ctx.set_value(branch.current, 0.05);
        for residual in circuit.residuals_of(r.component, &ctx).unwrap() {
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rcl_loop_conserves_current() {
        // a --R-- b --L-- GND, b --C-- GND: KCL at a and b must sum to zero
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(Some("a"), None);
        let b = circuit.new_scalar(Some("b"), None);
        let src = Resistor::new(1.0).build(&mut circuit, "R0", a, NodeRef::GROUND).unwrap();
        let r = Resistor::new(10.0).build(&mut circuit, "R1", a, b).unwrap();
        let l = Inductor::new(1e-3).build(&mut circuit, "L1", b, NodeRef::GROUND).unwrap();
        let c = Capacitor::new(1e-6).build(&mut circuit, "C1", b, NodeRef::GROUND).unwrap();

        let mut ctx = circuit.context();
        // i_R0 + i_R1 = 0 at a, -i_R1 + i_L + i_C = 0 at b
        ctx.set_value(src.branches[0].current, -0.3);
        ctx.set_value(r.branches[0].current, 0.3);
        ctx.set_value(l.branches[0].current, 0.1);
        ctx.set_value(c.branches[0].current, 0.2);

        let equations = circuit.node_equations();
        assert_eq!(equations.len(), 2);
        for (_, eq) in equations {
            assert_relative_eq!(ctx.eval(&eq.residual()).unwrap().max_abs(), 0.0, epsilon = 1e-12);
        }
    }

    /// R0 from `a` to ground, R1 from `a` to `b`, L1 and C1 from `b` to ground.
    fn rcl_loop(circuit: &mut Circuit, a: NodeRef, b: NodeRef) -> [Instance; 4] {
        [
            Resistor::new(1.0).build(circuit, "R0", a, NodeRef::GROUND).unwrap(),
            Resistor::new(10.0).build(circuit, "R1", a, b).unwrap(),
            Inductor::new(1e-3).build(circuit, "L1", b, NodeRef::GROUND).unwrap(),
            Capacitor::new(1e-6).build(circuit, "C1", b, NodeRef::GROUND).unwrap(),
        ]
    }

    #[test]
    fn test_array_rcl_loop_conserves_current() {
        let mut circuit = Circuit::new();
        let a = circuit.new_array(3, Some("a"), None);
        let b = circuit.new_array(3, Some("b"), None);
        let [r0, r1, l, c] = rcl_loop(&mut circuit, a, b);
        for inst in [&r0, &r1, &l, &c] {
            assert_eq!(inst.branches[0].shape, Shape::Array(3));
        }

        let i_r1 = [0.3, -0.1, 0.2];
        let i_l = [0.1, 0.05, 0.5];
        let mut ctx = circuit.context();
        ctx.set_value(r0.branches[0].current, i_r1.iter().map(|x| -x).collect::<Vec<_>>());
        ctx.set_value(r1.branches[0].current, i_r1.to_vec());
        ctx.set_value(l.branches[0].current, i_l.to_vec());
        ctx.set_value(
            c.branches[0].current,
            i_r1.iter().zip(&i_l).map(|(r, l)| r - l).collect::<Vec<_>>(),
        );

        let equations = circuit.node_equations();
        assert_eq!(equations.len(), 2);
        for (_, eq) in &equations {
            let residual = ctx.eval(&eq.residual()).unwrap();
            assert_eq!(residual.len(), 3);
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-12);
        }

        // Breaking conservation in one phase shows up in that element only
        ctx.set_value(l.branches[0].current, vec![0.1, 0.05, 0.6]);
        let (_, at_b) = &equations[1];
        let residual = ctx.eval(&at_b.residual()).unwrap();
        assert_relative_eq!(residual.re(0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(residual.re(2).abs(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_rcl_loop_conserves_current() {
        use num_complex::Complex64;

        let mut circuit = Circuit::new();
        let a = circuit.new_complex_array(2, Some("a"), None);
        let b = circuit.new_complex_array(2, Some("b"), None);
        let [r0, r1, l, c] = rcl_loop(&mut circuit, a, b);
        assert_eq!(c.branches[0].shape, Shape::Complex(2));

        let i_r1 = [Complex64::new(1.0, 0.5), Complex64::new(-0.2, 0.3)];
        let i_l = [Complex64::new(0.4, -1.0), Complex64::new(0.1, 0.1)];
        let mut ctx = circuit.context();
        ctx.set_value(r0.branches[0].current, i_r1.iter().map(|z| -z).collect::<Vec<_>>());
        ctx.set_value(r1.branches[0].current, i_r1.to_vec());
        ctx.set_value(l.branches[0].current, i_l.to_vec());
        ctx.set_value(
            c.branches[0].current,
            i_r1.iter().zip(&i_l).map(|(r, l)| r - l).collect::<Vec<_>>(),
        );

        let equations = circuit.node_equations();
        assert_eq!(equations.len(), 2);
        for (_, eq) in equations {
            let residual = ctx.eval(&eq.residual()).unwrap();
            assert!(matches!(residual, Value::Complex(ref z) if z.len() == 2));
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_array_resistor_matches_scalar_resistors() {
        let va = [1.0, 2.0, 3.0];
        let vb = [0.5, -1.0, 4.0];
        let iv = [0.01, 0.2, -0.3];

        let mut arrays = Circuit::new();
        let a = arrays.new_array(3, Some("a"), None);
        let b = arrays.new_array(3, Some("b"), None);
        let wide = Resistor::new(10.0).build(&mut arrays, "R", a, b).unwrap();
        let mut ctx = arrays.context();
        ctx.set_value(a.var().unwrap(), va.to_vec());
        ctx.set_value(b.var().unwrap(), vb.to_vec());
        ctx.set_value(wide.branches[0].voltage, vec![0.5, 3.0, -1.0]);
        ctx.set_value(wide.branches[0].current, iv.to_vec());
        let wide_residuals = arrays.residuals_of(wide.component, &ctx).unwrap();
        assert_eq!(wide.branches[0].shape, Shape::Array(3));

        for k in 0..3 {
            let mut scalars = Circuit::new();
            let a = scalars.new_scalar(None, None);
            let b = scalars.new_scalar(None, None);
            let r = Resistor::new(10.0).build(&mut scalars, "R", a, b).unwrap();
            let mut ctx = scalars.context();
            ctx.set_value(a.var().unwrap(), va[k]);
            ctx.set_value(b.var().unwrap(), vb[k]);
            ctx.set_value(r.branches[0].voltage, [0.5, 3.0, -1.0][k]);
            ctx.set_value(r.branches[0].current, iv[k]);
            let residuals = scalars.residuals_of(r.component, &ctx).unwrap();

            assert_eq!(residuals.len(), wide_residuals.len());
            for (scalar, wide) in residuals.iter().zip(&wide_residuals) {
                assert_relative_eq!(scalar.re(0), wide.re(k), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_temperature_dependent_resistance() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let port = circuit.new_heat_port("hp", Shape::Scalar);
        let r = Resistor::new(100.0)
            .with_alpha(0.004)
            .with_reference_temperature(300.0)
            .with_heat_port(port);
        assert_eq!(r.operating_temperature(), Some(Param::Temperature(port.temperature)));

        let mut ctx = circuit.context();
        ctx.set_value(port.temperature, 350.0);
        let r_eff = ctx.eval_real(&r.effective_resistance(300.0)).unwrap();
        assert_relative_eq!(r_eff, 100.0 * (1.0 + 0.004 * 50.0), epsilon = 1e-9);

        let inst = r.build(&mut circuit, "R1", a, NodeRef::GROUND).unwrap();
        // v definition, power, constitutive law
        assert_eq!(circuit.component_equations(inst.component, &ctx.discrete).len(), 3);
    }

    #[test]
    fn test_negative_resistance_is_accepted() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        assert!(Resistor::new(-5.0).build(&mut circuit, "R1", a, NodeRef::GROUND).is_ok());
        assert!(Resistor::new(0.0).build(&mut circuit, "R2", a, NodeRef::GROUND).is_ok());
    }

    #[test]
    fn test_capacitor_uses_derivative() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let c = Capacitor::new(1e-6)
            .with_initial_voltage(2.0)
            .build(&mut circuit, "C1", a, NodeRef::GROUND)
            .unwrap();
        let branch = c.branches[0];
        assert_eq!(circuit.unknown(branch.voltage).unwrap().initial, Some(2.0));

        let mut ctx = circuit.context();
        ctx.set_value(a.var().unwrap(), 2.0);
        ctx.set_value(branch.voltage, 2.0);
        ctx.set_derivative(branch.voltage, 1000.0);
        ctx.set_value(branch.current, 1e-3);
        for residual in circuit.residuals_of(c.component, &ctx).unwrap() {
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_signal_inductance_is_checked() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let l_signal = circuit.new_input("l", Shape::Scalar);
        Inductor::new(l_signal).build(&mut circuit, "L1", a, NodeRef::GROUND).unwrap();
        assert_eq!(circuit.checks().len(), 1);

        let mut ctx = circuit.context();
        ctx.set_input(InputId(0), 0.0);
        let findings = circuit.check_parameters(&ctx).unwrap();
        assert!(matches!(
            findings.as_slice(),
            [KirchhoffError::InvalidParameter { component, param, .. }] if component == "L1" && param == "L"
        ));
    }

    #[test]
    fn test_complex_resistor() {
        use num_complex::Complex64;

        let mut circuit = Circuit::new();
        let z = circuit.new_complex(Some("z"), None);
        let r = Resistor::new(2.0).build(&mut circuit, "R1", z, NodeRef::GROUND).unwrap();
        let branch = r.branches[0];
        assert_eq!(branch.shape, Shape::Complex(1));

        let mut ctx = circuit.context();
        ctx.set_value(z.var().unwrap(), Complex64::new(2.0, 4.0));
        ctx.set_value(branch.voltage, Complex64::new(2.0, 4.0));
        ctx.set_value(branch.current, Complex64::new(1.0, 2.0));
        for residual in circuit.residuals_of(r.component, &ctx).unwrap() {
            assert!(matches!(residual, Value::Complex(_)));
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_short_and_conductor() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let s = Short.build(&mut circuit, "S1", a, NodeRef::GROUND).unwrap();
        let g = Conductor::new(0.5).build(&mut circuit, "G1", a, NodeRef::GROUND).unwrap();
        assert_eq!(s.branches.len(), 1);

        let mut ctx = circuit.context();
        ctx.set_value(g.branches[0].voltage, 4.0);
        ctx.set_value(g.branches[0].current, 2.0);
        let law = circuit.component_equations(g.component, &ctx.discrete)[1].residual();
        assert_relative_eq!(ctx.eval_real(&law).unwrap(), 0.0);
    }
}
