//! Switches with an arc model.
//!
//! Opening the contact does not interrupt the current at once. The switch
//! first enters an arcing state in which the contact voltage ramps up with
//! the time since the opening event:
//!
//! ```text
//! v = min(V0 + dVdt * (t - t_open), Vmax) * sign(i)
//! ```
//!
//! The arc quenches when the current reaches zero. A contact that carries no
//! current when it opens goes straight to the open state. Re-entering the
//! arcing state restarts the ramp.

use crate::circuit::{Circuit, NodeRef};
use crate::error::Result;
use crate::expr::{Equation, Expr};
use crate::hybrid::{Control, Direction, Effect, Guard, MachineKind, Mode, Transition, Trigger};

use super::controls::SwitchKind;
use super::{closed_equation, control_initially_on, open_equation, require_scalar, switch_limits, Instance};

/// Arc parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcParams {
    /// Arc voltage at opening (V)
    pub v0: f64,
    /// Arc voltage slope (V/s)
    pub dvdt: f64,
    /// Maximum arc voltage (V)
    pub vmax: f64,
}

impl Default for ArcParams {
    fn default() -> Self {
        Self {
            v0: 30.0,
            dvdt: 10e3,
            vmax: 60.0,
        }
    }
}

impl ArcParams {
    /// Arc voltage magnitude after `elapsed` seconds of arcing.
    pub fn arc_voltage(&self, elapsed: f64) -> f64 {
        (self.v0 + self.dvdt * elapsed).min(self.vmax)
    }
}

/// An opener or closer whose opening passes through an arcing state.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcSwitch {
    pub kind: SwitchKind,
    pub control: Control,
    pub arc: ArcParams,
    pub ron: Option<f64>,
    pub goff: Option<f64>,
}

impl ArcSwitch {
    pub fn opener(control: Control) -> Self {
        Self {
            kind: SwitchKind::Opener,
            control,
            arc: ArcParams::default(),
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

    pub fn with_arc(mut self, arc: ArcParams) -> Self {
        self.arc = arc;
        self
    }

    pub fn with_limits(mut self, ron: f64, goff: f64) -> Self {
        self.ron = Some(ron);
        self.goff = Some(goff);
        self
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "ArcSwitch")?;
        require_scalar(circuit, id, &[p, n])?;
        let (ron, goff) = switch_limits(circuit, self.ron, self.goff);
        let branch = circuit.make_branch(id, &p, &n)?;

        let initial = self.kind.initial_mode(control_initially_on(circuit, &self.control));
        let mode = circuit.new_mode(id, MachineKind::ArcSwitch, initial);
        let clock = circuit.new_clock(id);

        let ramp = (self.arc.v0 + self.arc.dvdt * (Expr::Time - Expr::Clock(clock))).min(self.arc.vmax);
        circuit.add_modal(
            id,
            mode,
            vec![
                (Mode::Closed, vec![closed_equation(&branch, ron)]),
                (Mode::Arcing, vec![Equation::new(branch.v(), ramp * branch.i().sign())]),
                (Mode::Open, vec![open_equation(&branch, goff)]),
            ],
        );

        let open_trigger = self.control.trigger(self.kind.open_edge());
        let close_trigger = self.control.trigger(self.kind.close_edge());
        let events = vec![
            circuit.register_event(
                id,
                open_trigger.clone(),
                Effect::Transition(
                    Transition::new(mode, Mode::Closed, Mode::Arcing)
                        .when(Guard::Nonzero(branch.i()))
                        .resetting(clock),
                ),
            ),
            circuit.register_event(
                id,
                Trigger::Crossing {
                    expr: branch.i(),
                    direction: Direction::Either,
                },
                Effect::Transition(Transition::new(mode, Mode::Arcing, Mode::Open)),
            ),
            circuit.register_event(
                id,
                close_trigger.clone(),
                Effect::Transition(Transition::new(mode, Mode::Open, Mode::Closed)),
            ),
            circuit.register_event(
                id,
                close_trigger,
                Effect::Transition(Transition::new(mode, Mode::Arcing, Mode::Closed)),
            ),
            // No current to sustain an arc
            circuit.register_event(
                id,
                open_trigger,
                Effect::Transition(Transition::new(mode, Mode::Closed, Mode::Open).when(Guard::Zero(branch.i()))),
            ),
        ];

        Ok(Instance::new(id, vec![branch])
            .with_mode(mode)
            .with_clock(clock)
            .with_events(events))
    }
}
