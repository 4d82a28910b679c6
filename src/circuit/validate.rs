//! Network validation.

use crate::error::{KirchhoffError, Result};

use super::graph::{Circuit, EquationBlock};

/// Validate an assembled network.
///
/// Checks:
/// - The network has at least one component
/// - Every node receives at least one branch current
/// - Every mode of a modal block defines the same number of equations
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components().is_empty() {
        return Err(KirchhoffError::InvalidTopology {
            message: "Circuit has no components".to_string(),
        });
    }

    for (node, terms) in circuit.conservation() {
        if terms.is_empty() {
            let name = circuit
                .unknown(node)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| node.to_string());
            return Err(KirchhoffError::FloatingNode { node: name });
        }
    }

    for (component, block) in circuit.blocks() {
        if let EquationBlock::Modal { mode, cases } = block {
            let counts: Vec<usize> = cases
                .iter()
                .map(|(_, eqs)| eqs.iter().map(|eq| circuit.equation_len(eq)).sum())
                .collect();
            if counts.windows(2).any(|w| w[0] != w[1]) {
                return Err(KirchhoffError::InvalidTopology {
                    message: format!(
                        "component '{}' defines {:?} equations across the modes of {}",
                        circuit.component_name(component),
                        counts,
                        mode
                    ),
                });
            }
        }
    }

    let balance = circuit.balance();
    if !balance.is_balanced() {
        log::warn!(
            "network has {} unknowns but {} equations",
            balance.unknowns,
            balance.equations
        );
    }

    Ok(())
}
