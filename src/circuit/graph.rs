//! The network pool: unknowns, equations, conservation sums and events.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::config::CircuitConfig;
use super::types::{
    Branch, ClockId, ComponentId, ControlId, EventId, Flange, HeatPort, InputId, ModeId, NodeRef,
    Shape, UnknownInfo, UnknownRole, VarId,
};
use crate::error::{KirchhoffError, Result};
use crate::expr::{Equation, EvalContext, Expr, Value};
use crate::hybrid::{
    Commit, DiscreteState, Effect, EventRegistry, MachineKind, Mode, ModeMachine, Trigger,
};
use crate::params::{Param, ParamCheck};

/// Record of one instantiated component.
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub id: ComponentId,
    pub name: String,
    pub kind: &'static str,
    pub branches: Vec<Branch>,
    pub modes: Vec<ModeId>,
}

/// An always-active equation or a set of equations selected by a mode.
#[derive(Debug, Clone, PartialEq)]
pub enum EquationBlock {
    Fixed(Equation),
    Modal {
        mode: ModeId,
        cases: Vec<(Mode, Vec<Equation>)>,
    },
}

impl EquationBlock {
    /// Equations active under the given discrete state.
    pub fn active(&self, state: &DiscreteState) -> Vec<&Equation> {
        match self {
            EquationBlock::Fixed(eq) => vec![eq],
            EquationBlock::Modal { mode, cases } => {
                let current = state.mode(*mode);
                cases
                    .iter()
                    .find(|(m, _)| Some(*m) == current)
                    .map(|(_, eqs)| eqs.iter().collect())
                    .unwrap_or_default()
            }
        }
    }
}

/// Scalar-element counts of unknowns and equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub unknowns: usize,
    pub equations: usize,
}

impl Balance {
    pub fn is_balanced(&self) -> bool {
        self.unknowns == self.equations
    }
}

/// A lumped network under assembly.
///
/// Components append to it; nothing is ever removed. Conservation sums are
/// kept per node in node order, so the resulting equation set does not
/// depend on the order in which components were instantiated.
#[derive(Debug, Default)]
pub struct Circuit {
    config: CircuitConfig,
    unknowns: Vec<UnknownInfo>,
    inputs: Vec<(String, Shape)>,
    controls: Vec<(String, bool)>,
    clocks: Vec<ComponentId>,
    machines: Vec<ModeMachine>,
    components: Vec<ComponentRecord>,
    component_names: HashMap<String, ComponentId>,
    node_names: BTreeMap<String, NodeRef>,
    blocks: Vec<(ComponentId, EquationBlock)>,
    conservation: BTreeMap<VarId, Vec<(f64, VarId)>>,
    checks: Vec<ParamCheck>,
    events: EventRegistry,
}

impl Circuit {
    /// Create an empty network with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty network with custom configuration.
    pub fn with_config(config: CircuitConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    // ============ Unknown creation ============

    /// Allocate an unknown.
    pub fn new_unknown(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        initial: Option<f64>,
        role: UnknownRole,
    ) -> VarId {
        let id = VarId(self.unknowns.len());
        self.unknowns.push(UnknownInfo {
            name: name.into(),
            shape,
            initial,
            role,
        });
        id
    }

    /// Seed the initial value of an unknown.
    pub fn set_initial(&mut self, id: VarId, value: f64) {
        if let Some(info) = self.unknowns.get_mut(id.0) {
            info.initial = Some(value);
        }
    }

    fn new_node(&mut self, name: Option<&str>, shape: Shape, initial: Option<f64>) -> NodeRef {
        let label = name.map(str::to_string).unwrap_or_else(|| format!("n{}", self.unknowns.len()));
        let id = self.new_unknown(label.clone(), shape, initial, UnknownRole::Node);
        let node = match shape {
            Shape::Scalar => NodeRef::Scalar(id),
            Shape::Array(n) => NodeRef::Array(id, n),
            Shape::Complex(n) => NodeRef::Complex(id, n),
        };
        self.conservation.entry(id).or_default();
        if name.is_some() {
            self.node_names.insert(label, node);
        }
        node
    }

    /// A scalar node potential.
    pub fn new_scalar(&mut self, name: Option<&str>, initial: Option<f64>) -> NodeRef {
        self.new_node(name, Shape::Scalar, initial)
    }

    /// An array of `len` node potentials.
    pub fn new_array(&mut self, len: usize, name: Option<&str>, initial: Option<f64>) -> NodeRef {
        self.new_node(name, Shape::Array(len), initial)
    }

    /// A phasor node potential.
    pub fn new_complex(&mut self, name: Option<&str>, initial: Option<f64>) -> NodeRef {
        self.new_node(name, Shape::Complex(1), initial)
    }

    /// An array of `len` phasor node potentials.
    pub fn new_complex_array(&mut self, len: usize, name: Option<&str>, initial: Option<f64>) -> NodeRef {
        self.new_node(name, Shape::Complex(len), initial)
    }

    /// An external real input signal.
    pub fn new_input(&mut self, name: impl Into<String>, shape: Shape) -> InputId {
        let id = InputId(self.inputs.len());
        self.inputs.push((name.into(), shape));
        id
    }

    /// An external boolean control, off at t=0.
    pub fn new_control(&mut self, name: impl Into<String>) -> ControlId {
        self.new_control_with_initial(name, false)
    }

    /// An external boolean control with a known value at t=0.
    ///
    /// Switches driven by it start in the mode that matches this value.
    pub fn new_control_with_initial(&mut self, name: impl Into<String>, initial: bool) -> ControlId {
        let id = ControlId(self.controls.len());
        self.controls.push((name.into(), initial));
        id
    }

    /// Value of a control at t=0; false for an unknown id.
    pub fn control_initial(&self, id: ControlId) -> bool {
        self.controls.get(id.0).map(|(_, on)| *on).unwrap_or(false)
    }

    /// A heat port whose temperature is owned by an external thermal network.
    pub fn new_heat_port(&mut self, name: &str, shape: Shape) -> HeatPort {
        let power = self.new_unknown(format!("{}.power", name), shape, None, UnknownRole::Coupling);
        let temperature = self.new_unknown(
            format!("{}.T", name),
            shape,
            Some(self.config.reference_temperature),
            UnknownRole::External,
        );
        HeatPort {
            power,
            temperature,
            shape,
        }
    }

    /// A rotational flange whose angle is owned by an external mechanical network.
    pub fn new_flange(&mut self, name: &str) -> Flange {
        let angle = self.new_unknown(format!("{}.phi", name), Shape::Scalar, None, UnknownRole::External);
        let torque = self.new_unknown(format!("{}.tau", name), Shape::Scalar, None, UnknownRole::Coupling);
        Flange { angle, torque }
    }

    // ============ Component assembly ============

    /// Start a component instance. Names must be unique.
    pub fn begin_component(&mut self, name: &str, kind: &'static str) -> Result<ComponentId> {
        if self.component_names.contains_key(name) {
            return Err(KirchhoffError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        let id = ComponentId(self.components.len());
        self.components.push(ComponentRecord {
            id,
            name: name.to_string(),
            kind,
            branches: Vec::new(),
            modes: Vec::new(),
        });
        self.component_names.insert(name.to_string(), id);
        log::debug!("instantiating {} '{}' as {}", kind, name, id);
        Ok(id)
    }

    pub(crate) fn record_branch(&mut self, component: ComponentId, branch: Branch) {
        if let Some(record) = self.components.get_mut(component.0) {
            record.branches.push(branch);
        }
    }

    /// Append an always-active equation.
    pub fn add_equation(&mut self, component: ComponentId, equation: Equation) {
        self.blocks.push((component, EquationBlock::Fixed(equation)));
    }

    /// Append equations selected by a mode variable.
    pub fn add_modal(&mut self, component: ComponentId, mode: ModeId, cases: Vec<(Mode, Vec<Equation>)>) {
        self.blocks.push((component, EquationBlock::Modal { mode, cases }));
    }

    /// Add `sign * current` to the outgoing current sum of `node`.
    /// Literal nodes take no contribution.
    pub fn contribute(&mut self, node: &NodeRef, sign: f64, current: VarId) {
        if let Some(var) = node.var() {
            self.conservation.entry(var).or_default().push((sign, current));
        }
    }

    /// Declare a discrete mode variable owned by a component.
    pub fn new_mode(&mut self, component: ComponentId, kind: MachineKind, initial: Mode) -> ModeId {
        let id = ModeId(self.machines.len());
        self.machines.push(ModeMachine {
            component,
            kind,
            initial,
        });
        if let Some(record) = self.components.get_mut(component.0) {
            record.modes.push(id);
        }
        id
    }

    /// Declare a discrete clock owned by a component.
    pub fn new_clock(&mut self, component: ComponentId) -> ClockId {
        let id = ClockId(self.clocks.len());
        self.clocks.push(component);
        id
    }

    pub fn register_event(&mut self, component: ComponentId, trigger: Trigger, effect: Effect) -> EventId {
        self.events.register(component, trigger, effect)
    }

    /// Require a dynamic parameter to stay strictly positive.
    ///
    /// Constants are not checked: zero and negative constant values are legal.
    pub fn require_positive(&mut self, component: ComponentId, param: &str, value: &Param) {
        if value.is_dynamic() {
            self.checks.push(ParamCheck {
                component,
                param: param.to_string(),
                expr: value.to_expr(),
            });
        }
    }

    /// Warn about a degenerate constant parameter.
    pub fn warn_degenerate(&self, component: ComponentId, param: &str, value: f64) {
        if self.config.warn_degenerate {
            log::warn!(
                "component '{}' has {} = {}; the network may be singular",
                self.component_name(component),
                param,
                value
            );
        }
    }

    // ============ Queries ============

    pub fn unknowns(&self) -> &[UnknownInfo] {
        &self.unknowns
    }

    pub fn unknown(&self, id: VarId) -> Option<&UnknownInfo> {
        self.unknowns.get(id.0)
    }

    pub fn components(&self) -> &[ComponentRecord] {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> Option<&ComponentRecord> {
        self.components.get(id.0)
    }

    /// Name of a component, `"?"` for an unknown id.
    pub fn component_name(&self, id: ComponentId) -> &str {
        self.components.get(id.0).map(|c| c.name.as_str()).unwrap_or("?")
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.component_names.get(name).copied()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeRef> {
        self.node_names.get(name).copied()
    }

    pub fn named_nodes(&self) -> impl Iterator<Item = (&str, NodeRef)> {
        self.node_names.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn inputs(&self) -> impl Iterator<Item = (InputId, &str, Shape)> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(k, (name, shape))| (InputId(k), name.as_str(), *shape))
    }

    pub fn controls(&self) -> impl Iterator<Item = (ControlId, &str)> {
        self.controls
            .iter()
            .enumerate()
            .map(|(k, (name, _))| (ControlId(k), name.as_str()))
    }

    pub fn machines(&self) -> &[ModeMachine] {
        &self.machines
    }

    pub fn blocks(&self) -> impl Iterator<Item = (ComponentId, &EquationBlock)> {
        self.blocks.iter().map(|(c, b)| (*c, b))
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn checks(&self) -> &[ParamCheck] {
        &self.checks
    }

    /// Outgoing current terms recorded at each node.
    pub fn conservation(&self) -> impl Iterator<Item = (VarId, &[(f64, VarId)])> {
        self.conservation.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Kirchhoff's current law `0 = sum(+-i)` for every node with contributions.
    pub fn node_equations(&self) -> Vec<(VarId, Equation)> {
        self.conservation
            .iter()
            .filter_map(|(node, terms)| {
                let mut terms = terms.iter();
                let (sign, first) = terms.next()?;
                let start = if *sign < 0.0 {
                    -Expr::Var(*first)
                } else {
                    Expr::Var(*first)
                };
                let sum = terms.fold(start, |acc, (sign, current)| {
                    if *sign < 0.0 {
                        acc - Expr::Var(*current)
                    } else {
                        acc + Expr::Var(*current)
                    }
                });
                Some((*node, Equation::new(0.0, sum)))
            })
            .collect()
    }

    /// Discrete state with every mode at its initial value and clocks at zero.
    pub fn initial_discrete(&self) -> DiscreteState {
        DiscreteState::new(
            self.machines.iter().map(|m| m.initial).collect(),
            vec![0.0; self.clocks.len()],
        )
    }

    /// An evaluation context in the initial discrete state, with every
    /// control at its initial value.
    pub fn context(&self) -> EvalContext {
        let mut ctx = EvalContext::new(self.initial_discrete());
        for (k, (_, on)) in self.controls.iter().enumerate() {
            ctx.set_control(ControlId(k), *on);
        }
        ctx
    }

    /// Active equations of one component.
    pub fn component_equations(&self, component: ComponentId, state: &DiscreteState) -> Vec<&Equation> {
        self.blocks
            .iter()
            .filter(|(c, _)| *c == component)
            .flat_map(|(_, block)| block.active(state))
            .collect()
    }

    /// The full active equation set: component equations followed by node equations.
    pub fn active_equations(&self, state: &DiscreteState) -> Vec<Equation> {
        let mut equations: Vec<Equation> = self
            .blocks
            .iter()
            .flat_map(|(_, block)| block.active(state))
            .cloned()
            .collect();
        equations.extend(self.node_equations().into_iter().map(|(_, eq)| eq));
        equations
    }

    /// Residuals of one component's active equations.
    pub fn residuals_of(&self, component: ComponentId, ctx: &EvalContext) -> Result<Vec<Value>> {
        self.component_equations(component, &ctx.discrete)
            .into_iter()
            .map(|eq| ctx.eval(&eq.residual()))
            .collect()
    }

    /// Residuals of the whole active equation set.
    pub fn residuals(&self, ctx: &EvalContext) -> Result<Vec<Value>> {
        self.active_equations(&ctx.discrete)
            .iter()
            .map(|eq| ctx.eval(&eq.residual()))
            .collect()
    }

    /// Evaluate all parameter checks, logging and returning the violations.
    pub fn check_parameters(&self, ctx: &EvalContext) -> Result<Vec<KirchhoffError>> {
        let mut findings = Vec::new();
        for check in &self.checks {
            if let Some(finding) = check.evaluate(self.component_name(check.component), ctx)? {
                log::warn!("{}", finding);
                findings.push(finding);
            }
        }
        Ok(findings)
    }

    /// Apply the events reported by the solver for one evaluation.
    pub fn handle_events(&self, fired: &[EventId], ctx: &mut EvalContext) -> Result<Vec<Commit>> {
        self.events
            .dispatch(fired, ctx, |c| self.component_name(c).to_string())
    }

    /// Number of elements an expression evaluates to.
    pub fn expr_len(&self, expr: &Expr) -> usize {
        match expr {
            Expr::Var(id) => self.unknown(*id).map(|u| u.shape.len()).unwrap_or(1),
            Expr::Input(id) => self.inputs.get(id.0).map(|(_, s)| s.len()).unwrap_or(1),
            Expr::Constant(_) | Expr::Clock(_) | Expr::Time => 1,
            Expr::Der(inner) => self.expr_len(inner),
            Expr::Unary { operand, .. } => self.expr_len(operand),
            Expr::Binary { left, right, .. } => self.expr_len(left).max(self.expr_len(right)),
            Expr::If {
                cond,
                then,
                otherwise,
            } => self
                .expr_len(cond)
                .max(self.expr_len(then))
                .max(self.expr_len(otherwise)),
        }
    }

    /// Number of scalar equations an equation stands for.
    pub fn equation_len(&self, equation: &Equation) -> usize {
        self.expr_len(&equation.lhs).max(self.expr_len(&equation.rhs))
    }

    /// Scalar-element unknown and equation counts in the initial discrete state.
    ///
    /// External unknowns (heat port temperatures, flange angles) are not
    /// counted; another domain supplies their equations.
    pub fn balance(&self) -> Balance {
        let unknowns = self
            .unknowns
            .iter()
            .filter(|u| u.role != UnknownRole::External)
            .map(|u| u.shape.len())
            .sum();
        let equations = self
            .active_equations(&self.initial_discrete())
            .iter()
            .map(|eq| self.equation_len(eq))
            .sum();
        Balance { unknowns, equations }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (component, block) in &self.blocks {
            let name = self.component_name(*component);
            match block {
                EquationBlock::Fixed(eq) => writeln!(f, "{}: {}", name, eq)?,
                EquationBlock::Modal { mode, cases } => {
                    let kind = self.machines.get(mode.0).map(|m| m.kind);
                    for (m, eqs) in cases {
                        let label = kind.map(|k| k.mode_name(*m)).unwrap_or("?");
                        for eq in eqs {
                            writeln!(f, "{}: [{} {}] {}", name, mode, label, eq)?;
                        }
                    }
                }
            }
        }
        for (node, eq) in self.node_equations() {
            let name = self.unknown(node).map(|u| u.name.as_str()).unwrap_or("?");
            writeln!(f, "KCL {}: {}", name, eq)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_component_rejected() {
        let mut circuit = Circuit::new();
        circuit.begin_component("R1", "Resistor").unwrap();
        let err = circuit.begin_component("R1", "Resistor").unwrap_err();
        assert!(matches!(err, KirchhoffError::DuplicateComponent { .. }));
    }

    #[test]
    fn test_named_nodes_are_found() {
        let mut circuit = Circuit::new();
        let a = circuit.new_array(3, Some("a"), None);
        assert_eq!(circuit.find_node("a"), Some(a));
        assert_eq!(a.shape(), Some(Shape::Array(3)));
        assert_eq!(circuit.find_node("b"), None);
    }

    #[test]
    fn test_node_equation_signs() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(Some("a"), None);
        let i1 = circuit.new_unknown("i1", Shape::Scalar, None, UnknownRole::Branch);
        let i2 = circuit.new_unknown("i2", Shape::Scalar, None, UnknownRole::Branch);
        circuit.contribute(&a, 1.0, i1);
        circuit.contribute(&a, -1.0, i2);
        circuit.contribute(&NodeRef::GROUND, 1.0, i2);

        let equations = circuit.node_equations();
        assert_eq!(equations.len(), 1);
        assert_eq!(equations[0].1.to_string(), "0 = (x1 - x2)");
    }

    #[test]
    fn test_heat_port_temperature_is_external() {
        let mut circuit = Circuit::new();
        let port = circuit.new_heat_port("hp", Shape::Scalar);
        assert_eq!(circuit.unknown(port.temperature).map(|u| u.role), Some(UnknownRole::External));
        assert_eq!(circuit.unknown(port.power).map(|u| u.role), Some(UnknownRole::Coupling));
    }
}
