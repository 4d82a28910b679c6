//! Building a network from a parsed netlist.

use std::collections::HashMap;

use super::config::CircuitConfig;
use super::graph::Circuit;
use super::types::{ControlId, Flange, HeatPort, InputId, NodeRef, Shape};
use crate::components::Component;
use crate::dsl::{is_ground, CircuitAst, ComponentType, ModelDef};
use crate::error::{KirchhoffError, Result};

/// Names declared by netlist directives, as component definitions see them.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub inputs: HashMap<String, InputId>,
    pub controls: HashMap<String, ControlId>,
    pub heat_ports: HashMap<String, HeatPort>,
    pub flanges: HashMap<String, Flange>,
}

fn declare_node(circuit: &mut Circuit, name: &str, shape: Shape, initial: Option<f64>) -> NodeRef {
    match shape {
        Shape::Scalar => circuit.new_scalar(Some(name), initial),
        Shape::Array(n) => circuit.new_array(n, Some(name), initial),
        Shape::Complex(n) => circuit.new_complex_array(n, Some(name), initial),
    }
}

impl Circuit {
    /// Assemble a network from a parsed netlist.
    ///
    /// Declared nodes are created first, then every pin name that was never
    /// declared becomes a scalar node, then the components are instantiated
    /// in source order.
    pub fn from_ast(ast: &CircuitAst, config: CircuitConfig) -> Result<Self> {
        let mut circuit = Circuit::with_config(config);
        let mut bindings = Bindings::default();

        for decl in &ast.nodes {
            declare_node(&mut circuit, &decl.name, decl.shape, decl.initial);
        }
        for name in ast.implicit_nodes() {
            circuit.new_scalar(Some(name), None);
        }
        for decl in &ast.inputs {
            let id = circuit.new_input(decl.name.clone(), decl.shape);
            bindings.inputs.insert(decl.name.clone(), id);
        }
        for decl in &ast.controls {
            let id = circuit.new_control_with_initial(decl.name.clone(), decl.initial);
            bindings.controls.insert(decl.name.clone(), id);
        }
        for decl in &ast.heat_ports {
            let port = circuit.new_heat_port(&decl.name, decl.shape);
            bindings.heat_ports.insert(decl.name.clone(), port);
        }
        for decl in &ast.flanges {
            let flange = circuit.new_flange(&decl.name);
            bindings.flanges.insert(decl.name.clone(), flange);
        }

        for def in &ast.components {
            let model = match def.component_type {
                ComponentType::Diode
                | ComponentType::ZDiode
                | ComponentType::ArcOpener
                | ComponentType::ArcCloser => lookup_model(ast, def.reference.as_deref(), &def.name)?,
                _ => None,
            };
            let component = Component::from_def(def, model, &bindings)?;

            let pins = def
                .nodes
                .iter()
                .map(|name| {
                    if is_ground(name) {
                        Ok(NodeRef::GROUND)
                    } else {
                        circuit
                            .find_node(name)
                            .ok_or_else(|| KirchhoffError::NodeNotFound { node: name.clone() })
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            component.build(&mut circuit, &def.name, &pins)?;
        }

        log::info!(
            "assembled {} components, {} unknowns, {} events",
            circuit.components().len(),
            circuit.unknowns().len(),
            circuit.events().len()
        );
        Ok(circuit)
    }
}

fn lookup_model<'a>(ast: &'a CircuitAst, name: Option<&str>, component: &str) -> Result<Option<&'a ModelDef>> {
    match name {
        Some(name) => ast
            .models
            .get(name)
            .map(Some)
            .ok_or_else(|| KirchhoffError::UndefinedModel {
                model: name.to_string(),
                component: component.to_string(),
            }),
        None => Ok(None),
    }
}
