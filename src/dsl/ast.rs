//! Abstract Syntax Tree types for the netlist DSL.

use std::collections::HashMap;

use crate::circuit::Shape;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct CircuitAst {
    /// All component instances, in source order
    pub components: Vec<ComponentDef>,
    /// Model definitions
    pub models: HashMap<String, ModelDef>,
    /// Explicitly declared nodes
    pub nodes: Vec<NodeDecl>,
    /// External real input signals
    pub inputs: Vec<PortDecl>,
    /// External boolean controls
    pub controls: Vec<ControlDecl>,
    /// Heat ports
    pub heat_ports: Vec<PortDecl>,
    /// Mechanical flanges
    pub flanges: Vec<PortDecl>,
}

impl CircuitAst {
    /// Create a new empty netlist AST.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names referenced as component pins but never declared, in order of
    /// first appearance. Ground aliases are excluded.
    pub fn implicit_nodes(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for def in &self.components {
            for node in &def.nodes {
                let declared = self.nodes.iter().any(|n| &n.name == node);
                if !is_ground(node) && !declared && !seen.contains(&node.as_str()) {
                    seen.push(node);
                }
            }
        }
        seen
    }
}

/// True for the ground aliases `0` and `GND`.
pub fn is_ground(name: &str) -> bool {
    name == "0" || name.eq_ignore_ascii_case("GND")
}

/// A `.node` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub name: String,
    pub shape: Shape,
    /// Initial potential
    pub initial: Option<f64>,
    pub line: usize,
}

/// A `.control` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDecl {
    pub name: String,
    /// Value at t=0
    pub initial: bool,
    pub line: usize,
}

/// An `.input`, `.heatport` or `.flange` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub name: String,
    pub shape: Shape,
    pub line: usize,
}

/// A `key=value` parameter. Values are numbers or names of declared
/// inputs, controls, heat ports or flanges.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Name(String),
}

/// A component definition from the DSL.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    pub component_type: ComponentType,
    /// Unique component name
    pub name: String,
    /// Connected node names
    pub nodes: Vec<String>,
    /// Positional value (resistance, capacitance, source amplitude, ...)
    pub value: Option<f64>,
    /// Positional name after the pins: a model, an input signal or a
    /// waveform keyword depending on the component
    pub reference: Option<String>,
    /// `key=value` parameters, keys lowercased
    pub params: HashMap<String, ParamValue>,
    /// Source line number for error reporting
    pub line: usize,
}

/// Component types supported by the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Resistor,
    Conductor,
    Capacitor,
    Inductor,
    Short,
    Transformer,
    Emf,
    Diode,
    ZDiode,
    IdealDiode,
    OpAmp,
    VoltageSource,
    CurrentSource,
    /// Switch that opens while its control is on
    Opener,
    /// Switch that closes while its control is on
    Closer,
    CommutingSwitch,
    ArcOpener,
    ArcCloser,
    Thyristor,
    Gto,
}

/// Multi-letter prefixes, longest first so `ARCO1` is not read as something shorter.
const KEYWORDS: &[(&str, ComponentType)] = &[
    ("SHORT", ComponentType::Short),
    ("ARCO", ComponentType::ArcOpener),
    ("ARCC", ComponentType::ArcCloser),
    ("XFMR", ComponentType::Transformer),
    ("SWO", ComponentType::Opener),
    ("SWC", ComponentType::Closer),
    ("SWX", ComponentType::CommutingSwitch),
    ("THY", ComponentType::Thyristor),
    ("GTO", ComponentType::Gto),
    ("EMF", ComponentType::Emf),
    ("ZD", ComponentType::ZDiode),
    ("DI", ComponentType::IdealDiode),
    ("OP", ComponentType::OpAmp),
];

impl ComponentType {
    /// Parse a component type from its single-letter DSL prefix.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'R' => Some(Self::Resistor),
            'G' => Some(Self::Conductor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'D' => Some(Self::Diode),
            'V' => Some(Self::VoltageSource),
            'I' => Some(Self::CurrentSource),
            _ => None,
        }
    }

    /// Parse a component type from an exact keyword (`THY T1 a k ...`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let upper = keyword.to_ascii_uppercase();
        KEYWORDS.iter().find(|(k, _)| *k == upper).map(|(_, t)| *t)
    }

    /// Parse a component type from a multi-letter name prefix (`THY1 a k ...`).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        KEYWORDS
            .iter()
            .find(|(k, _)| upper.starts_with(k))
            .map(|(_, t)| *t)
            .or_else(|| name.chars().next().and_then(Self::from_prefix))
    }

    /// Accepted number of nodes, as `(min, max)`.
    pub fn node_count(&self) -> (usize, usize) {
        match self {
            Self::Transformer => (4, 4),
            Self::CommutingSwitch => (3, 3),
            Self::OpAmp => (3, 4),
            _ => (2, 2),
        }
    }
}

/// A model definition (diode or Zener parameters).
#[derive(Debug, Clone)]
pub struct ModelDef {
    pub name: String,
    pub model_type: ModelType,
    /// Model parameters, keys lowercased
    pub params: HashMap<String, f64>,
    /// Source line number
    pub line: usize,
}

/// Model types for parameterized components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Diode,
    ZDiode,
    /// Arc parameters for ARCO/ARCC switches
    Arc,
}

impl ModelType {
    /// Parse a model type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "D" | "DIODE" => Some(Self::Diode),
            "ZD" | "ZENER" => Some(Self::ZDiode),
            "ARC" => Some(Self::Arc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_before_prefix() {
        assert_eq!(ComponentType::from_name("GTO1"), Some(ComponentType::Gto));
        assert_eq!(ComponentType::from_name("G1"), Some(ComponentType::Conductor));
        assert_eq!(ComponentType::from_name("DI2"), Some(ComponentType::IdealDiode));
        assert_eq!(ComponentType::from_name("D2"), Some(ComponentType::Diode));
        assert_eq!(ComponentType::from_name("ARCC3"), Some(ComponentType::ArcCloser));
        assert_eq!(ComponentType::from_name("Q1"), None);
    }

    #[test]
    fn test_exact_keyword() {
        assert_eq!(ComponentType::from_keyword("thy"), Some(ComponentType::Thyristor));
        assert_eq!(ComponentType::from_keyword("THY1"), None);
    }

    #[test]
    fn test_ground_aliases() {
        assert!(is_ground("0"));
        assert!(is_ground("gnd"));
        assert!(!is_ground("n0"));
    }
}
