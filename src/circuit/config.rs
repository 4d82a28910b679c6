//! Assembly configuration.

use crate::{DEFAULT_GOFF, DEFAULT_REFERENCE_TEMPERATURE, DEFAULT_RON};

/// Configuration for network assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitConfig {
    /// Reference temperature for temperature-dependent parameters (K).
    pub reference_temperature: f64,
    /// Closed-state resistance of ideal switching devices (Ohm).
    pub ron: f64,
    /// Open-state conductance of ideal switching devices (S).
    pub goff: f64,
    /// Log a warning for zero or negative constant resistances.
    pub warn_degenerate: bool,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            reference_temperature: DEFAULT_REFERENCE_TEMPERATURE,
            ron: DEFAULT_RON,
            goff: DEFAULT_GOFF,
            warn_degenerate: true,
        }
    }
}

impl CircuitConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference temperature (in kelvin).
    pub fn with_reference_temperature(mut self, kelvin: f64) -> Self {
        self.reference_temperature = kelvin;
        self
    }

    /// Set the default on-resistance and off-conductance of switches.
    ///
    /// Smaller values are closer to ideal but make the equations stiffer:
    /// - 1e-5 (default): suitable for most networks
    /// - 1e-8: near-ideal, may need a tighter solver tolerance
    pub fn with_switch_limits(mut self, ron: f64, goff: f64) -> Self {
        self.ron = ron;
        self.goff = goff;
        self
    }

    /// Enable or disable warnings about degenerate constant parameters.
    pub fn with_degenerate_warnings(mut self, enabled: bool) -> Self {
        self.warn_degenerate = enabled;
        self
    }
}
