//! Voltage and current sources.
//!
//! A source sets its branch voltage (or current) to a waveform: a constant,
//! an external signal, a sine or a step. Current flows from `p` through the
//! source to `n`.

use std::f64::consts::PI;
use std::fmt;

use crate::circuit::{Circuit, InputId, NodeRef};
use crate::error::Result;
use crate::expr::{Equation, Expr};
use crate::hybrid::{Effect, Trigger};

use super::{require_scalar, Instance};

/// Source waveform.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Constant(f64),
    /// An external input signal
    Signal(InputId),
    /// `offset + amplitude * sin(2*pi*frequency*(t - start) + phase)` from
    /// `start` on, `offset` before
    Sine {
        amplitude: f64,
        frequency: f64,
        phase: f64,
        offset: f64,
        start: f64,
    },
    /// `offset` before `start`, `offset + height` from `start` on
    Step { height: f64, offset: f64, start: f64 },
}

impl Waveform {
    pub fn sine(amplitude: f64, frequency: f64) -> Self {
        Waveform::Sine {
            amplitude,
            frequency,
            phase: 0.0,
            offset: 0.0,
            start: 0.0,
        }
    }

    pub fn step(height: f64, start: f64) -> Self {
        Waveform::Step {
            height,
            offset: 0.0,
            start,
        }
    }

    /// Waveform as an expression of time and inputs.
    pub fn to_expr(&self) -> Expr {
        match *self {
            Waveform::Constant(value) => Expr::Constant(value),
            Waveform::Signal(id) => Expr::Input(id),
            Waveform::Sine {
                amplitude,
                frequency,
                phase,
                offset,
                start,
            } => Expr::if_else(
                Expr::Time.ge(start),
                offset + amplitude * (2.0 * PI * frequency * (Expr::Time - start) + phase).sin(),
                offset,
            ),
            Waveform::Step {
                height,
                offset,
                start,
            } => Expr::if_else(Expr::Time.ge(start), offset + height, offset),
        }
    }

    /// Value at time `t`, `None` for external signals.
    pub fn value_at(&self, t: f64) -> Option<f64> {
        match *self {
            Waveform::Constant(value) => Some(value),
            Waveform::Signal(_) => None,
            Waveform::Sine {
                amplitude,
                frequency,
                phase,
                offset,
                start,
            } => Some(if t < start {
                offset
            } else {
                offset + amplitude * (2.0 * PI * frequency * (t - start) + phase).sin()
            }),
            Waveform::Step {
                height,
                offset,
                start,
            } => Some(if t < start { offset } else { offset + height }),
        }
    }

    /// Step waveforms register a single discrete event and cannot be
    /// instantiated on array nodes.
    pub fn is_vectorizable(&self) -> bool {
        !matches!(self, Waveform::Step { .. })
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Constant(value) => write!(f, "{}", value),
            Waveform::Signal(id) => write!(f, "signal {}", id),
            Waveform::Sine {
                amplitude,
                frequency,
                ..
            } => write!(f, "sine {} @ {} Hz", amplitude, frequency),
            Waveform::Step { height, start, .. } => write!(f, "step {} @ t={}", height, start),
        }
    }
}

fn build_source(
    circuit: &mut Circuit,
    name: &str,
    kind: &'static str,
    waveform: &Waveform,
    p: NodeRef,
    n: NodeRef,
    drives_current: bool,
) -> Result<Instance> {
    let id = circuit.begin_component(name, kind)?;
    if !waveform.is_vectorizable() {
        require_scalar(circuit, id, &[p, n])?;
    }
    let branch = circuit.make_branch(id, &p, &n)?;
    let driven = if drives_current { branch.i() } else { branch.v() };
    circuit.add_equation(id, Equation::new(driven, waveform.to_expr()));

    let mut instance = Instance::new(id, vec![branch]);
    if let Waveform::Step { start, .. } = *waveform {
        let restart = circuit.register_event(id, Trigger::Time(start), Effect::Restart);
        instance = instance.with_events(vec![restart]);
    }
    Ok(instance)
}

/// An ideal voltage source, `v = waveform(t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageSource {
    pub waveform: Waveform,
}

impl VoltageSource {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        build_source(circuit, name, "VoltageSource", &self.waveform, p, n, false)
    }
}

/// An ideal current source, `i = waveform(t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSource {
    pub waveform: Waveform,
}

impl CurrentSource {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform }
    }

    pub fn build(&self, circuit: &mut Circuit, name: &str, p: NodeRef, n: NodeRef) -> Result<Instance> {
        build_source(circuit, name, "CurrentSource", &self.waveform, p, n, true)
    }
}
