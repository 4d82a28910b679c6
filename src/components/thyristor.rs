//! Ideal valves: thyristor, GTO thyristor and ideal diode.
//!
//! All three share the same two equation sets, shifted by the knee voltage:
//!
//! ```text
//! conducting: v - Vknee = Ron * (i - Goff * Vknee)
//! blocking:   i = Goff * v
//! ```
//!
//! Both lines meet at `(Vknee, Goff * Vknee)`. A valve starts blocking. It
//! only turns off when its current falls through zero, except a GTO which
//! also turns off on the falling edge of `fire`. Current zero takes
//! precedence over any firing event in the same evaluation.

use crate::circuit::{Branch, Circuit, ComponentId, EventId, ModeId, NodeRef};
use crate::error::Result;
use crate::expr::Equation;
use crate::hybrid::{Control, Direction, Edge, Effect, Guard, MachineKind, Mode, Transition, Trigger};

use super::{require_scalar, switch_limits, Instance};

const CURRENT_ZERO_PRIORITY: u8 = 1;

/// Valve parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValveParams {
    /// Forward threshold voltage (V)
    pub vknee: f64,
    pub ron: Option<f64>,
    pub goff: Option<f64>,
}

impl ValveParams {
    pub fn with_knee(mut self, vknee: f64) -> Self {
        self.vknee = vknee;
        self
    }

    pub fn with_limits(mut self, ron: f64, goff: f64) -> Self {
        self.ron = Some(ron);
        self.goff = Some(goff);
        self
    }
}

/// Emit the modal equations and the current-zero turn-off of a valve.
fn build_valve(
    circuit: &mut Circuit,
    id: ComponentId,
    branch: &Branch,
    params: &ValveParams,
    kind: MachineKind,
) -> (ModeId, EventId) {
    let (ron, goff) = switch_limits(circuit, params.ron, params.goff);
    let vknee = params.vknee;

    let mode = circuit.new_mode(id, kind, Mode::Open);
    circuit.add_modal(
        id,
        mode,
        vec![
            (
                Mode::Closed,
                vec![Equation::new(branch.v() - vknee, ron * (branch.i() - goff * vknee))],
            ),
            (Mode::Open, vec![Equation::new(branch.i(), goff * branch.v())]),
        ],
    );

    let current_zero = circuit.register_event(
        id,
        Trigger::Crossing {
            expr: branch.i(),
            direction: Direction::Down,
        },
        Effect::Transition(
            Transition::new(mode, Mode::Closed, Mode::Open).with_priority(CURRENT_ZERO_PRIORITY),
        ),
    );
    (mode, current_zero)
}

/// A thyristor fired by `fire`; with `gto` set it can also be turned off.
#[derive(Debug, Clone, PartialEq)]
pub struct Thyristor {
    pub fire: Control,
    pub params: ValveParams,
    /// Gate turn-off: the falling edge of `fire` blocks the valve
    pub gto: bool,
}

impl Thyristor {
    pub fn new(fire: Control) -> Self {
        Self {
            fire,
            params: ValveParams::default(),
            gto: false,
        }
    }

    pub fn gto(fire: Control) -> Self {
        Self {
            gto: true,
            ..Self::new(fire)
        }
    }

    pub fn with_params(mut self, params: ValveParams) -> Self {
        self.params = params;
        self
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, anode: NodeRef, cathode: NodeRef) -> Result<Instance> {
        let (label, kind) = if self.gto {
            ("GtoThyristor", MachineKind::Gto)
        } else {
            ("Thyristor", MachineKind::Thyristor)
        };
        let id = circuit.begin_component(name, label)?;
        require_scalar(circuit, id, &[anode, cathode])?;
        let branch = circuit.make_branch(id, &anode, &cathode)?;
        let (mode, current_zero) = build_valve(circuit, id, &branch, &self.params, kind);
        let vknee = self.params.vknee;

        // Fired while forward biased past the knee
        let fired = circuit.register_event(
            id,
            self.fire.trigger(Edge::Rising),
            Effect::Transition(
                Transition::new(mode, Mode::Open, Mode::Closed).when(Guard::AtLeast(branch.v(), vknee)),
            ),
        );
        // Forward voltage reaches the knee while fired
        let knee = circuit.register_event(
            id,
            Trigger::Crossing {
                expr: branch.v() - vknee,
                direction: Direction::Up,
            },
            Effect::Transition(Transition::new(mode, Mode::Open, Mode::Closed).when(self.fire.is_on())),
        );

        let mut events = vec![fired, knee, current_zero];
        if self.gto {
            events.push(circuit.register_event(
                id,
                self.fire.trigger(Edge::Falling),
                Effect::Transition(Transition::new(mode, Mode::Closed, Mode::Open)),
            ));
        }

        Ok(Instance::new(id, vec![branch])
            .with_mode(mode)
            .with_events(events))
    }
}

/// An ideal diode: conducts once the voltage rises through the knee and
/// blocks again when the current falls through zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdealDiode {
    pub params: ValveParams,
}

impl IdealDiode {
    pub fn new(params: ValveParams) -> Self {
        Self { params }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, anode: NodeRef, cathode: NodeRef) -> Result<Instance> {
        let id = circuit.begin_component(name, "IdealDiode")?;
        require_scalar(circuit, id, &[anode, cathode])?;
        let branch = circuit.make_branch(id, &anode, &cathode)?;
        let (mode, current_zero) = build_valve(circuit, id, &branch, &self.params, MachineKind::IdealDiode);

        let knee = circuit.register_event(
            id,
            Trigger::Crossing {
                expr: branch.v() - self.params.vknee,
                direction: Direction::Up,
            },
            Effect::Transition(Transition::new(mode, Mode::Open, Mode::Closed)),
        );

        Ok(Instance::new(id, vec![branch])
            .with_mode(mode)
            .with_events(vec![knee, current_zero]))
    }
}
