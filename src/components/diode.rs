//! Diode and Zener diode models.
//!
//! Uses the Shockley equation with a parallel leakage resistance:
//!   i = Ids * (exp(v / Vt) - 1) + v / R
//!
//! Above `v = Maxexp * Vt` the exponential is replaced by its tangent line
//! at that point, which keeps the current finite for large forward voltages
//! and leaves the characteristic continuously differentiable.

use crate::circuit::{Circuit, HeatPort, NodeRef};
use crate::dsl::ModelDef;
use crate::error::Result;
use crate::expr::{Equation, Expr};
use crate::{BOLTZMANN, ELECTRON_CHARGE};

use super::Instance;

/// `exp(x)` for `x <= maxexp`, its tangent at `maxexp` beyond.
pub fn exlin(x: f64, maxexp: f64) -> f64 {
    if x > maxexp {
        maxexp.exp() * (1.0 + x - maxexp)
    } else {
        x.exp()
    }
}

/// Derivative of [`exlin`].
pub fn exlin_slope(x: f64, maxexp: f64) -> f64 {
    x.min(maxexp).exp()
}

/// Symbolic form of [`exlin`].
pub fn exlin_expr(x: Expr, maxexp: f64) -> Expr {
    Expr::if_else(
        x.clone().gt(maxexp),
        maxexp.exp() * (1.0 + x.clone() - maxexp),
        x.exp(),
    )
}

/// Parameters for a diode model.
#[derive(Debug, Clone, PartialEq)]
pub struct DiodeParams {
    /// Saturation current (A)
    pub ids: f64,
    /// Voltage equivalent of temperature (V)
    pub vt: f64,
    /// Exponent at which the characteristic becomes linear
    pub maxexp: f64,
    /// Parallel ohmic resistance (Ohm)
    pub r: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self {
            ids: 1e-6,
            vt: 0.04,
            maxexp: 15.0,
            r: 1e8,
        }
    }
}

impl DiodeParams {
    /// Create parameters from a model definition.
    pub fn from_model(model: &ModelDef) -> Self {
        let mut params = Self::default();
        if let Some(&ids) = model.params.get("ids") {
            params.ids = ids;
        }
        if let Some(&vt) = model.params.get("vt") {
            params.vt = vt;
        }
        if let Some(&maxexp) = model.params.get("maxexp") {
            params.maxexp = maxexp;
        }
        if let Some(&r) = model.params.get("r") {
            params.r = r;
        }
        params
    }

    /// Diode current at a given voltage.
    pub fn current(&self, v: f64) -> f64 {
        self.ids * (exlin(v / self.vt, self.maxexp) - 1.0) + v / self.r
    }

    /// Small-signal conductance (di/dv) at a given voltage.
    pub fn conductance(&self, v: f64) -> f64 {
        self.ids / self.vt * exlin_slope(v / self.vt, self.maxexp) + 1.0 / self.r
    }

    /// Voltage above which the characteristic is linear.
    pub fn linear_threshold(&self) -> f64 {
        self.maxexp * self.vt
    }

    fn current_expr(&self, v: Expr) -> Expr {
        self.ids * (exlin_expr(v.clone() / self.vt, self.maxexp) - 1.0) + v / self.r
    }
}

/// Temperature behaviour of a heated diode.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalParams {
    /// Emission coefficient
    pub n: f64,
    /// Parameter measurement temperature (K)
    pub tnom: f64,
    /// Saturation current temperature exponent
    pub xti: f64,
    /// Activation energy (eV)
    pub eg: f64,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            n: 1.0,
            tnom: crate::DEFAULT_REFERENCE_TEMPERATURE,
            xti: 3.0,
            eg: 1.11,
        }
    }
}

impl ThermalParams {
    pub fn from_model(model: &ModelDef) -> Self {
        let mut params = Self::default();
        if let Some(&n) = model.params.get("n") {
            params.n = n;
        }
        if let Some(&tnom) = model.params.get("tnom") {
            params.tnom = tnom;
        }
        if let Some(&xti) = model.params.get("xti") {
            params.xti = xti;
        }
        if let Some(&eg) = model.params.get("eg") {
            params.eg = eg;
        }
        params
    }

    /// Thermal voltage `k*T/q`.
    pub fn thermal_voltage(temperature: f64) -> f64 {
        BOLTZMANN * temperature / ELECTRON_CHARGE
    }

    /// Saturation current at `temperature`, given its value at `tnom`.
    pub fn saturation_current(&self, ids: f64, temperature: f64) -> f64 {
        let ratio = temperature / self.tnom;
        let n_vt = self.n * Self::thermal_voltage(temperature);
        ids * ratio.powf(self.xti / self.n) * ((ratio - 1.0) * self.eg / n_vt).exp()
    }

    fn current_expr(&self, diode: &DiodeParams, v: Expr, temperature: Expr) -> Expr {
        let n_vt = (self.n * BOLTZMANN / ELECTRON_CHARGE) * temperature.clone();
        let ratio = temperature / self.tnom;
        let ids_t = diode.ids
            * ((self.xti / self.n) * ratio.clone().ln()).exp()
            * ((ratio - 1.0) * self.eg / n_vt.clone()).exp();
        ids_t * (exlin_expr(v.clone() / n_vt, diode.maxexp) - 1.0) + v / diode.r
    }
}

/// A diode, optionally dissipating into a heat port.
///
/// With a heat port the thermal voltage and saturation current follow the
/// port temperature and `vt` is ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diode {
    pub params: DiodeParams,
    pub thermal: ThermalParams,
    pub heat_port: Option<HeatPort>,
}

impl Diode {
    pub fn new(params: DiodeParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn with_heat_port(mut self, port: HeatPort, thermal: ThermalParams) -> Self {
        self.heat_port = Some(port);
        self.thermal = thermal;
        self
    }

    /// Build between `anode` and `cathode`.
    pub fn build(&self, circuit: &mut Circuit, name: &str, anode: NodeRef, cathode: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "Diode")?;
        let branch = circuit.make_branch_with_heat_port(id, &anode, &cathode, self.heat_port.as_ref())?;
        let current = match &self.heat_port {
            Some(port) => self
                .thermal
                .current_expr(&self.params, branch.v(), Expr::Var(port.temperature)),
            None => self.params.current_expr(branch.v()),
        };
        circuit.add_equation(id, Equation::new(branch.i(), current));
        Ok(Instance::new(id, vec![branch]))
    }
}

/// Parameters for the reverse breakdown of a Zener diode.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownParams {
    /// Breakdown voltage (V)
    pub bv: f64,
    /// Breakdown saturation current (A)
    pub ibv: f64,
    /// Breakdown emission coefficient
    pub nbv: f64,
}

impl Default for BreakdownParams {
    fn default() -> Self {
        Self {
            bv: 5.1,
            ibv: 0.7,
            nbv: 0.74,
        }
    }
}

/// A Zener diode: the diode characteristic plus a reverse breakdown branch
/// `-Ibv * exp(-(v + Bv) / (Nbv * Vt))`, linearised the same way below
/// `v + Bv = -Maxexp * Nbv * Vt`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZDiode {
    pub params: DiodeParams,
    pub breakdown: BreakdownParams,
}

impl ZDiode {
    pub fn new(params: DiodeParams, breakdown: BreakdownParams) -> Self {
        Self { params, breakdown }
    }

    pub fn from_model(model: &ModelDef) -> Self {
        let mut breakdown = BreakdownParams::default();
        if let Some(&bv) = model.params.get("bv") {
            breakdown.bv = bv;
        }
        if let Some(&ibv) = model.params.get("ibv") {
            breakdown.ibv = ibv;
        }
        if let Some(&nbv) = model.params.get("nbv") {
            breakdown.nbv = nbv;
        }
        Self::new(DiodeParams::from_model(model), breakdown)
    }

    fn breakdown_scale(&self) -> f64 {
        self.breakdown.nbv * self.params.vt
    }

    /// Zener current at a given voltage.
    pub fn current(&self, v: f64) -> f64 {
        let x = -(v + self.breakdown.bv) / self.breakdown_scale();
        self.params.current(v) - self.breakdown.ibv * exlin(x, self.params.maxexp)
    }

    /// Small-signal conductance (di/dv) at a given voltage.
    pub fn conductance(&self, v: f64) -> f64 {
        let x = -(v + self.breakdown.bv) / self.breakdown_scale();
        self.params.conductance(v) + self.breakdown.ibv / self.breakdown_scale() * exlin_slope(x, self.params.maxexp)
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, anode: NodeRef, cathode: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "ZDiode")?;
        let branch = circuit.make_branch(id, &anode, &cathode)?;
        let x = -(branch.v() + self.breakdown.bv) / self.breakdown_scale();
        let current =
            self.params.current_expr(branch.v()) - self.breakdown.ibv * exlin_expr(x, self.params.maxexp);
        circuit.add_equation(id, Equation::new(branch.i(), current));
        Ok(Instance::new(id, vec![branch]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn test_continuity_at_linear_threshold() {
        let params = DiodeParams {
            ids: 1e-6,
            vt: 0.04,
            maxexp: 15.0,
            r: 1e8,
        };
        let v0 = params.linear_threshold();
        assert_relative_eq!(v0, 0.6, epsilon = 1e-12);

        let h = 1e-9;
        let below = params.current(v0 - h);
        let above = params.current(v0 + h);
        assert_relative_eq!(below, above, max_relative = 1e-6);

        let slope_below = params.conductance(v0 - h);
        let slope_above = params.conductance(v0 + h);
        assert_relative_eq!(slope_below, slope_above, max_relative = 1e-6);

        // Finite differences agree with the analytic slope on both sides
        let fd_below = (params.current(v0 - h) - params.current(v0 - 2.0 * h)) / h;
        let fd_above = (params.current(v0 + 2.0 * h) - params.current(v0 + h)) / h;
        assert_relative_eq!(fd_below, slope_below, max_relative = 1e-4);
        assert_relative_eq!(fd_above, slope_above, max_relative = 1e-4);
    }

    #[test]
    fn test_linear_region_stays_finite() {
        let params = DiodeParams::default();
        let i = params.current(100.0);
        assert!(i.is_finite());
        assert!(i > params.current(10.0));
    }

    #[test]
    fn test_symbolic_matches_numeric() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let d = Diode::default().build(&mut circuit, "D1", a, NodeRef::GROUND).unwrap();
        let branch = d.branches[0];
        let params = DiodeParams::default();

        for v in [-1.0, 0.0, 0.3, 0.6, 0.9, 5.0] {
            let mut ctx = circuit.context();
            ctx.set_value(branch.voltage, v);
            ctx.set_value(branch.current, params.current(v));
            let law = circuit.component_equations(d.component, &ctx.discrete)[1].residual();
            assert_relative_eq!(ctx.eval_real(&law).unwrap(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_heated_diode_at_nominal_temperature() {
        let thermal = ThermalParams::default();
        let ids = thermal.saturation_current(1e-6, thermal.tnom);
        assert_relative_eq!(ids, 1e-6, max_relative = 1e-12);
        assert!(thermal.saturation_current(1e-6, thermal.tnom + 20.0) > 1e-6);

        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let port = circuit.new_heat_port("hp", Shape::Scalar);
        let d = Diode::default()
            .with_heat_port(port, thermal.clone())
            .build(&mut circuit, "D1", a, NodeRef::GROUND)
            .unwrap();
        let branch = d.branches[0];

        let v = 0.3;
        let vt = ThermalParams::thermal_voltage(thermal.tnom);
        let expected = 1e-6 * ((v / vt).exp() - 1.0) + v / 1e8;
        let mut ctx = circuit.context();
        ctx.set_value(port.temperature, thermal.tnom);
        ctx.set_value(branch.voltage, v);
        ctx.set_value(branch.current, expected);
        ctx.set_value(port.power, v * expected);
        ctx.set_value(a.var().unwrap(), v);
        for residual in circuit.residuals_of(d.component, &ctx).unwrap() {
            assert_relative_eq!(residual.max_abs(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zener_breakdown() {
        let z = ZDiode::default();
        // Forward bias behaves like the plain diode
        assert_relative_eq!(z.current(0.3), z.params.current(0.3), max_relative = 1e-9);
        // Past the breakdown voltage the reverse current is large
        assert!(z.current(-5.5) < -0.1);
        // Deep breakdown stays finite
        assert!(z.current(-50.0).is_finite());
    }

    #[test]
    fn test_zener_breakdown_continuity() {
        let z = ZDiode::default();
        let v0 = -z.breakdown.bv - z.params.maxexp * z.breakdown_scale();
        let h = 1e-9;
        assert_relative_eq!(z.current(v0 - h), z.current(v0 + h), max_relative = 1e-6);

        let slope_below = z.conductance(v0 - h);
        let slope_above = z.conductance(v0 + h);
        assert_relative_eq!(slope_below, slope_above, max_relative = 1e-6);

        // Finite differences on both sides agree with the analytic slope
        let h = 1e-7;
        let fd_below = (z.current(v0 - h) - z.current(v0 - 2.0 * h)) / h;
        let fd_above = (z.current(v0 + 2.0 * h) - z.current(v0 + h)) / h;
        assert_relative_eq!(fd_below, slope_below, max_relative = 1e-4);
        assert_relative_eq!(fd_above, slope_above, max_relative = 1e-4);
        assert_relative_eq!(fd_below, fd_above, max_relative = 1e-4);
    }
}
