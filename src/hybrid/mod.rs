//! Hybrid mode control for switching devices.
//!
//! Each hybrid component owns one [`Mode`] variable (and, for arcing
//! switches, a clock). Its equations are declared per mode; events declared
//! through [`EventRegistry`] move the variable between modes. Exactly one
//! mode is active at any instant.

mod events;
mod mode;

pub use events::{
    Commit, Control, Direction, Edge, Effect, Event, EventRegistry, Guard, Transition, Trigger,
};
pub use mode::{DiscreteState, MachineKind, Mode, ModeMachine};
