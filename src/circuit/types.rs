//! Core types for network assembly.

use std::fmt;

use crate::expr::Expr;

/// A solver-tracked unknown (node potential, branch voltage or current, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// An external real-valued input signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId(pub usize);

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// An external boolean control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub usize);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A discrete mode variable owned by one hybrid component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(pub usize);

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// A discrete real variable holding the time of the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockId(pub usize);

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A unique identifier for a component instance in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A registered discrete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub usize);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// The shape of a potential or branch variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A single real value
    Scalar,
    /// A fixed-length sequence of real values (multiphase networks)
    Array(usize),
    /// A sequence of phasors
    Complex(usize),
}

impl Shape {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Array(n) | Shape::Complex(n) => *n,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Shape::Complex(_))
    }

    /// True for a single real value.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Array(n) => write!(f, "array[{}]", n),
            Shape::Complex(n) => write!(f, "complex[{}]", n),
        }
    }
}

/// Identifies an electrical potential.
///
/// A [`NodeRef::Literal`] carries no solver state: it supplies its constant
/// wherever a potential is read and never receives equations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef {
    /// A scalar unknown
    Scalar(VarId),
    /// An array unknown of the given length
    Array(VarId, usize),
    /// A complex unknown of the given length
    Complex(VarId, usize),
    /// A fixed real potential
    Literal(f64),
}

impl NodeRef {
    /// The ground reference.
    pub const GROUND: NodeRef = NodeRef::Literal(0.0);

    /// Shape of the potential, `None` for literals (which never constrain shape).
    pub fn shape(&self) -> Option<Shape> {
        match self {
            NodeRef::Scalar(_) => Some(Shape::Scalar),
            NodeRef::Array(_, n) => Some(Shape::Array(*n)),
            NodeRef::Complex(_, n) => Some(Shape::Complex(*n)),
            NodeRef::Literal(_) => None,
        }
    }

    /// The underlying unknown, if any.
    pub fn var(&self) -> Option<VarId> {
        match self {
            NodeRef::Scalar(v) | NodeRef::Array(v, _) | NodeRef::Complex(v, _) => Some(*v),
            NodeRef::Literal(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, NodeRef::Literal(_))
    }

    /// The potential as an expression.
    pub fn potential(&self) -> Expr {
        match self {
            NodeRef::Literal(value) => Expr::Constant(*value),
            NodeRef::Scalar(v) | NodeRef::Array(v, _) | NodeRef::Complex(v, _) => Expr::Var(*v),
        }
    }
}

impl From<f64> for NodeRef {
    fn from(value: f64) -> Self {
        NodeRef::Literal(value)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Literal(value) if *value == 0.0 => write!(f, "GND"),
            NodeRef::Literal(value) => write!(f, "{}", value),
            NodeRef::Scalar(v) | NodeRef::Array(v, _) | NodeRef::Complex(v, _) => write!(f, "{}", v),
        }
    }
}

/// A (voltage, current) pair for one two-terminal connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub voltage: VarId,
    pub current: VarId,
    pub shape: Shape,
}

impl Branch {
    pub fn v(&self) -> Expr {
        Expr::Var(self.voltage)
    }

    pub fn i(&self) -> Expr {
        Expr::Var(self.current)
    }
}

/// Coupling point between an electrical component and a thermal node.
///
/// `power` is defined by the owning component; `temperature` is external state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatPort {
    pub power: VarId,
    pub temperature: VarId,
    pub shape: Shape,
}

/// Rotational flange of a mechanical network.
///
/// `angle` is external state; `torque` is defined by the attached converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flange {
    pub angle: VarId,
    pub torque: VarId,
}

/// How an unknown came to exist, used for balance accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownRole {
    /// Node potential, determined by conservation
    Node,
    /// Branch voltage or current
    Branch,
    /// Quantity defined by a component equation (heat power, flange torque)
    Coupling,
    /// Owned by another domain; no equation here defines it
    External,
}

/// Bookkeeping for one unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownInfo {
    pub name: String,
    pub shape: Shape,
    pub initial: Option<f64>,
    pub role: UnknownRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_has_no_shape() {
        assert_eq!(NodeRef::GROUND.shape(), None);
        assert_eq!(NodeRef::from(1.5).var(), None);
        assert_eq!(NodeRef::Array(VarId(2), 3).shape(), Some(Shape::Array(3)));
    }

    #[test]
    fn test_literal_potential_is_constant() {
        assert_eq!(NodeRef::Literal(2.0).potential(), Expr::Constant(2.0));
        assert_eq!(NodeRef::Scalar(VarId(4)).potential(), Expr::Var(VarId(4)));
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeRef::GROUND.to_string(), "GND");
        assert_eq!(Shape::Complex(2).to_string(), "complex[2]");
        assert_eq!(ComponentId(3).to_string(), "C3");
    }
}
