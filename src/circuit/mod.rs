//! Network representation and assembly.
//!
//! A [`Circuit`] is the append-only pool that component templates write to:
//! unknowns, equations, per-node current sums, discrete modes and events.
//! [`resolve_shape`] decides the shape of new branch variables and
//! [`Circuit::make_branch`] wires them to their nodes. [`Circuit::from_ast`]
//! assembles a whole network from a parsed netlist.

mod branch;
mod config;
mod graph;
mod netlist;
mod shape;
mod types;
mod validate;

pub use config::CircuitConfig;
pub use graph::{Balance, Circuit, ComponentRecord, EquationBlock};
pub use netlist::Bindings;
pub use shape::{combine_shapes, resolve_shape};
pub use types::*;
pub use validate::validate_circuit;
