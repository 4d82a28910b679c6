//! Discrete modes and the discrete state store.

use std::fmt;

use crate::circuit::{ClockId, ComponentId, ModeId};

/// The active equation set of a hybrid component.
///
/// Thyristors and ideal diodes use `Closed` for conducting and `Open` for
/// blocking. Commuting switches use `Open` for the p-n1 position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Open,
    Closed,
    Arcing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Open => write!(f, "open"),
            Mode::Closed => write!(f, "closed"),
            Mode::Arcing => write!(f, "arcing"),
        }
    }
}

/// Family of state machine a mode variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    Switch,
    CommutingSwitch,
    Thyristor,
    Gto,
    IdealDiode,
    ArcSwitch,
}

impl MachineKind {
    /// Modes this machine can be in.
    pub fn modes(&self) -> &'static [Mode] {
        match self {
            MachineKind::ArcSwitch => &[Mode::Closed, Mode::Arcing, Mode::Open],
            _ => &[Mode::Closed, Mode::Open],
        }
    }

    /// Device-specific name of a mode.
    pub fn mode_name(&self, mode: Mode) -> &'static str {
        match (self, mode) {
            (MachineKind::Thyristor | MachineKind::Gto | MachineKind::IdealDiode, Mode::Closed) => {
                "conducting"
            }
            (MachineKind::Thyristor | MachineKind::Gto | MachineKind::IdealDiode, Mode::Open) => {
                "blocking"
            }
            (MachineKind::CommutingSwitch, Mode::Open) => "p-n1",
            (MachineKind::CommutingSwitch, Mode::Closed) => "p-n2",
            (_, Mode::Open) => "open",
            (_, Mode::Closed) => "closed",
            (_, Mode::Arcing) => "arcing",
        }
    }
}

/// Declaration of one discrete mode variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeMachine {
    pub component: ComponentId,
    pub kind: MachineKind,
    pub initial: Mode,
}

/// Current values of all mode variables and clocks.
///
/// Only event dispatch writes to it; templates read it through modal
/// equation blocks and clock expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscreteState {
    modes: Vec<Mode>,
    clocks: Vec<f64>,
}

impl DiscreteState {
    pub fn new(modes: Vec<Mode>, clocks: Vec<f64>) -> Self {
        Self { modes, clocks }
    }

    pub fn mode(&self, id: ModeId) -> Option<Mode> {
        self.modes.get(id.0).copied()
    }

    /// Force a mode. Returns false for an unknown id.
    pub fn set_mode(&mut self, id: ModeId, mode: Mode) -> bool {
        match self.modes.get_mut(id.0) {
            Some(slot) => {
                *slot = mode;
                true
            }
            None => false,
        }
    }

    pub fn clock(&self, id: ClockId) -> Option<f64> {
        self.clocks.get(id.0).copied()
    }

    /// Restart a clock at `time`. Returns false for an unknown id.
    pub fn reset_clock(&mut self, id: ClockId, time: f64) -> bool {
        match self.clocks.get_mut(id.0) {
            Some(slot) => {
                *slot = time;
                true
            }
            None => false,
        }
    }
}
