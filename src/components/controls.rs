//! Ideal switches: opener, closer and commuting switch.
//!
//! A closed contact obeys `v = Ron * i`, an open one `i = Goff * v`. The
//! active equation is chosen by the switch's mode variable, which follows the
//! edges of its control.

use crate::circuit::{Circuit, NodeRef};
use crate::error::Result;
use crate::hybrid::{Control, Edge, Effect, MachineKind, Mode, Transition};

use super::{closed_equation, control_initially_on, open_equation, require_scalar, switch_limits, Instance};

/// Which control state opens the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// Opens while the control is on
    Opener,
    /// Closes while the control is on
    Closer,
}

impl SwitchKind {
    /// Control edge that opens the contact.
    pub fn open_edge(&self) -> Edge {
        match self {
            SwitchKind::Opener => Edge::Rising,
            SwitchKind::Closer => Edge::Falling,
        }
    }

    /// Control edge that closes the contact.
    pub fn close_edge(&self) -> Edge {
        match self {
            SwitchKind::Opener => Edge::Falling,
            SwitchKind::Closer => Edge::Rising,
        }
    }

    /// Mode matching the control state at t=0.
    pub fn initial_mode(&self, control_on: bool) -> Mode {
        match (self, control_on) {
            (SwitchKind::Opener, false) | (SwitchKind::Closer, true) => Mode::Closed,
            (SwitchKind::Opener, true) | (SwitchKind::Closer, false) => Mode::Open,
        }
    }
}

/// An ideal opening or closing switch.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealSwitch {
    pub kind: SwitchKind,
    pub control: Control,
    /// Closed resistance, the network default when `None`
    pub ron: Option<f64>,
    /// Open conductance, the network default when `None`
    pub goff: Option<f64>,
}

impl IdealSwitch {
    pub fn opener(control: Control) -> Self {
        Self {
            kind: SwitchKind::Opener,
            control,
            ron: None,
            goff: None,
        }
    }

    pub fn closer(control: Control) -> Self {
        Self {
            kind: SwitchKind::Closer,
            ..Self::opener(control)
        }
    }

    pub fn with_limits(mut self, ron: f64, goff: f64) -> Self {
        self.ron = Some(ron);
        self.goff = Some(goff);
        self
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "IdealSwitch")?;
        require_scalar(circuit, id, &[p, n])?;
        let (ron, goff) = switch_limits(circuit, self.ron, self.goff);
        let branch = circuit.make_branch(id, &p, &n)?;

        let initial = self.kind.initial_mode(control_initially_on(circuit, &self.control));
        let mode = circuit.new_mode(id, MachineKind::Switch, initial);
        circuit.add_modal(
            id,
            mode,
            vec![
                (Mode::Closed, vec![closed_equation(&branch, ron)]),
                (Mode::Open, vec![open_equation(&branch, goff)]),
            ],
        );

        let opening = circuit.register_event(
            id,
            self.control.trigger(self.kind.open_edge()),
            Effect::Transition(Transition::new(mode, Mode::Closed, Mode::Open)),
        );
        let closing = circuit.register_event(
            id,
            self.control.trigger(self.kind.close_edge()),
            Effect::Transition(Transition::new(mode, Mode::Open, Mode::Closed)),
        );

        Ok(Instance::new(id, vec![branch])
            .with_mode(mode)
            .with_events(vec![opening, closing]))
    }
}

/// A switch connecting `p` to `n1` while its control is off and to `n2`
/// while it is on.
///
/// Mode `Open` is the p-n1 position, `Closed` the p-n2 position.
#[derive(Debug, Clone, PartialEq)]
pub struct CommutingSwitch {
    pub control: Control,
    pub ron: Option<f64>,
    pub goff: Option<f64>,
}

impl CommutingSwitch {
    pub fn new(control: Control) -> Self {
        Self {
            control,
            ron: None,
            goff: None,
        }
    }

    pub fn with_limits(mut self, ron: f64, goff: f64) -> Self {
        self.ron = Some(ron);
        self.goff = Some(goff);
        self
    }

    pub fn build(
        &self,
        circuit: &mut Circuit,
        name: &str,
        p: NodeRef,
        n1: NodeRef,
        n2: NodeRef,
    ) -> Result<Instance> {
        let id = circuit.begin_component(name, "CommutingSwitch")?;
        require_scalar(circuit, id, &[p, n1, n2])?;
        let (ron, goff) = switch_limits(circuit, self.ron, self.goff);
        let first = circuit.make_branch(id, &p, &n1)?;
        let second = circuit.make_branch(id, &p, &n2)?;

        let initial = if control_initially_on(circuit, &self.control) {
            Mode::Closed
        } else {
            Mode::Open
        };
        let mode = circuit.new_mode(id, MachineKind::CommutingSwitch, initial);
        circuit.add_modal(
            id,
            mode,
            vec![
                (
                    Mode::Open,
                    vec![closed_equation(&first, ron), open_equation(&second, goff)],
                ),
                (
                    Mode::Closed,
                    vec![open_equation(&first, goff), closed_equation(&second, ron)],
                ),
            ],
        );

        let to_second = circuit.register_event(
            id,
            self.control.trigger(Edge::Rising),
            Effect::Transition(Transition::new(mode, Mode::Open, Mode::Closed)),
        );
        let to_first = circuit.register_event(
            id,
            self.control.trigger(Edge::Falling),
            Effect::Transition(Transition::new(mode, Mode::Closed, Mode::Open)),
        );

        Ok(Instance::new(id, vec![first, second])
            .with_mode(mode)
            .with_events(vec![to_second, to_first]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ControlId, Shape};
    use crate::error::KirchhoffError;
    use crate::expr::Expr;
    use approx::assert_relative_eq;

    fn switch_circuit(kind: SwitchKind) -> (Circuit, Instance, ControlId) {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(Some("a"), None);
        let control = circuit.new_control("open");
        let switch = IdealSwitch {
            kind,
            ..IdealSwitch::opener(Control::Input(control))
        };
        let inst = switch.build(&mut circuit, "S1", a, NodeRef::GROUND).unwrap();
        (circuit, inst, control)
    }

    #[test]
    fn test_opener_cycle() {
        let (circuit, inst, control) = switch_circuit(SwitchKind::Opener);
        let mode = inst.mode.unwrap();
        let mut ctx = circuit.context();
        assert_eq!(ctx.discrete.mode(mode), Some(Mode::Closed));

        ctx.set_control(control, true);
        circuit.handle_events(&[inst.events[0]], &mut ctx).unwrap();
        assert_eq!(ctx.discrete.mode(mode), Some(Mode::Open));

        // A second opening edge is not enabled from the open mode
        assert!(circuit.handle_events(&[inst.events[0]], &mut ctx).unwrap().is_empty());

        ctx.set_control(control, false);
        circuit.handle_events(&[inst.events[1]], &mut ctx).unwrap();
        assert_eq!(ctx.discrete.mode(mode), Some(Mode::Closed));
    }

    #[test]
    fn test_closer_starts_open() {
        let (circuit, inst, _) = switch_circuit(SwitchKind::Closer);
        let ctx = circuit.context();
        assert_eq!(ctx.discrete.mode(inst.mode.unwrap()), Some(Mode::Open));
    }

    #[test]
    fn test_initial_mode_follows_initial_control() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(Some("a"), None);
        let b = circuit.new_scalar(Some("b"), None);
        let on = circuit.new_control_with_initial("on", true);
        let opener = IdealSwitch::opener(Control::Input(on))
            .build(&mut circuit, "S1", a, NodeRef::GROUND)
            .unwrap();
        let closer = IdealSwitch::closer(Control::Input(on))
            .build(&mut circuit, "S2", a, b)
            .unwrap();

        let mut ctx = circuit.context();
        assert!(ctx.control(on).unwrap());
        assert_eq!(ctx.discrete.mode(opener.mode.unwrap()), Some(Mode::Open));
        assert_eq!(ctx.discrete.mode(closer.mode.unwrap()), Some(Mode::Closed));

        // The first falling edge closes the opener
        ctx.set_control(on, false);
        circuit.handle_events(&[opener.events[1]], &mut ctx).unwrap();
        assert_eq!(ctx.discrete.mode(opener.mode.unwrap()), Some(Mode::Closed));
    }

    #[test]
    fn test_active_equation_follows_mode() {
        let (circuit, inst, control) = switch_circuit(SwitchKind::Opener);
        let branch = inst.branches[0];
        let mut ctx = circuit.context();
        ctx.set_value(branch.voltage, 1e-5);
        ctx.set_value(branch.current, 1.0);
        // closed: v = Ron * i with the default Ron
        let law = circuit.component_equations(inst.component, &ctx.discrete)[1].residual();
        assert_relative_eq!(ctx.eval_real(&law).unwrap(), 0.0, epsilon = 1e-15);

        ctx.set_control(control, true);
        circuit.handle_events(&[inst.events[0]], &mut ctx).unwrap();
        ctx.set_value(branch.voltage, 10.0);
        ctx.set_value(branch.current, 1e-4);
        let law = circuit.component_equations(inst.component, &ctx.discrete)[1].residual();
        assert_relative_eq!(ctx.eval_real(&law).unwrap(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_switch_is_not_vectorizable() {
        let mut circuit = Circuit::new();
        let a = circuit.new_array(3, None, None);
        let control = circuit.new_control("c");
        let err = IdealSwitch::opener(Control::Input(control))
            .build(&mut circuit, "S1", a, NodeRef::GROUND)
            .unwrap_err();
        assert!(matches!(
            err,
            KirchhoffError::NotVectorizable {
                shape: Shape::Array(3),
                ..
            }
        ));
    }

    #[test]
    fn test_level_controlled_switch() {
        let mut circuit = Circuit::new();
        let a = circuit.new_scalar(None, None);
        let signal = circuit.new_input("u", Shape::Scalar);
        let control = Control::Level {
            signal: Expr::Input(signal),
            level: 0.5,
        };
        let inst = IdealSwitch::closer(control)
            .build(&mut circuit, "S1", a, NodeRef::GROUND)
            .unwrap();
        let mut ctx = circuit.context();
        ctx.set_input(signal, 1.0);
        circuit.handle_events(&[inst.events[1]], &mut ctx).unwrap();
        assert_eq!(ctx.discrete.mode(inst.mode.unwrap()), Some(Mode::Closed));
    }

    #[test]
    fn test_commuting_switch_positions() {
        let mut circuit = Circuit::new();
        let p = circuit.new_scalar(Some("p"), None);
        let n1 = circuit.new_scalar(Some("n1"), None);
        let n2 = circuit.new_scalar(Some("n2"), None);
        let control = circuit.new_control("sel");
        let inst = CommutingSwitch::new(Control::Input(control))
            .with_limits(0.0, 0.0)
            .build(&mut circuit, "SW1", p, n1, n2)
            .unwrap();
        let (first, second) = (inst.branches[0], inst.branches[1]);

        // p-n1 position: first branch shorted, second branch carries nothing
        let mut ctx = circuit.context();
        ctx.set_value(first.voltage, 0.0);
        ctx.set_value(first.current, 2.0);
        ctx.set_value(second.voltage, 3.0);
        ctx.set_value(second.current, 0.0);
        let active = circuit.component_equations(inst.component, &ctx.discrete);
        assert_eq!(active.len(), 4);
        for eq in &active[2..] {
            assert_relative_eq!(ctx.eval_real(&eq.residual()).unwrap(), 0.0);
        }

        ctx.set_control(control, true);
        circuit.handle_events(&[inst.events[0]], &mut ctx).unwrap();
        assert_eq!(ctx.discrete.mode(inst.mode.unwrap()), Some(Mode::Closed));
        assert_eq!(circuit.machines()[0].kind.mode_name(Mode::Closed), "p-n2");
    }

    #[test]
    fn test_commuting_switch_starts_on_second_position() {
        let mut circuit = Circuit::new();
        let p = circuit.new_scalar(Some("p"), None);
        let n1 = circuit.new_scalar(Some("n1"), None);
        let n2 = circuit.new_scalar(Some("n2"), None);
        let control = circuit.new_control_with_initial("sel", true);
        let inst = CommutingSwitch::new(Control::Input(control))
            .build(&mut circuit, "SW1", p, n1, n2)
            .unwrap();
        let state = circuit.initial_discrete();
        assert_eq!(state.mode(inst.mode.unwrap()), Some(Mode::Closed));
    }
}
