//! # Kirchhoff
//!
//! Acausal equation templates for lumped electrical networks.
//!
//! Components do not compute anything. Each one appends branch constraints
//! and constitutive equations to a shared equation pool; a separate DAE
//! solver (not part of this crate) integrates the pool and reports zero
//! crossings back through [`Circuit::handle_events`].
//!
//! This library provides:
//! - Node values that are real scalars, real arrays (multiphase) or complex
//!   phasors, with automatic shape resolution when they meet
//! - Branch creation with Kirchhoff current-law bookkeeping
//! - Templates for passive, nonlinear, ideal and switching components
//! - Discrete mode machines for switches, thyristors and arcing contacts
//! - A SPICE-like netlist DSL
//!
//! ## Architecture
//!
//! - [`circuit`] - Network pool, shape resolution, branch emitter, validation
//! - [`components`] - Component equation templates
//! - [`hybrid`] - Modes, events and atomic event dispatch
//! - [`expr`] - Symbolic expressions, equations and residual evaluation
//! - [`params`] - Constant, signal and temperature-linked parameters
//! - [`dsl`] - Netlist parser
//!
//! ## Usage
//!
//! ```
//! use kirchhoff::circuit::{Circuit, NodeRef};
//! use kirchhoff::components::{Capacitor, Resistor, VoltageSource, Waveform};
//!
//! let mut circuit = Circuit::new();
//! let a = circuit.new_scalar(Some("a"), None);
//! let b = circuit.new_scalar(Some("b"), None);
//! VoltageSource::new(Waveform::sine(1.0, 50.0)).build(&mut circuit, "V1", a, NodeRef::GROUND)?;
//! Resistor::new(1e3).build(&mut circuit, "R1", a, b)?;
//! Capacitor::new(1e-6).build(&mut circuit, "C1", b, NodeRef::GROUND)?;
//! assert!(circuit.balance().is_balanced());
//! # Ok::<(), kirchhoff::KirchhoffError>(())
//! ```
//!
//! The same network as a netlist:
//!
//! ```text
//! V1 a 0 SINE amp=1 freq=50
//! R1 a b 1k
//! C1 b 0 1u
//! ```

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod expr;
pub mod hybrid;
pub mod params;

// Re-export main types for convenience
pub use circuit::{validate_circuit, Circuit, CircuitConfig, NodeRef, Shape};
pub use error::{KirchhoffError, Result};
pub use expr::{Equation, EvalContext, Expr};
pub use params::Param;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Elementary charge (C)
pub const ELECTRON_CHARGE: f64 = 1.602176634e-19;

/// Default reference temperature (K)
pub const DEFAULT_REFERENCE_TEMPERATURE: f64 = 300.15;

/// Default closed resistance of ideal switching devices (Ohm)
pub const DEFAULT_RON: f64 = 1e-5;

/// Default open conductance of ideal switching devices (S)
pub const DEFAULT_GOFF: f64 = 1e-5;
