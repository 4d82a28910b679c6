//! Error types for the kirchhoff network assembler.
//!
//! This module provides a unified error type [`KirchhoffError`] that covers
//! all error conditions that can occur during netlist parsing, network
//! assembly, event dispatch and residual evaluation.

use thiserror::Error;

use crate::circuit::Shape;

/// Result type alias using [`KirchhoffError`].
pub type Result<T> = std::result::Result<T, KirchhoffError>;

/// Two node references that must share a shape do not.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot combine {expected} with {found}")]
pub struct ShapeConflict {
    pub expected: Shape,
    pub found: Shape,
}

/// Unified error type for all kirchhoff operations.
#[derive(Error, Debug)]
pub enum KirchhoffError {
    // ============ Netlist Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid component definition
    #[error("Invalid component '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    /// Unknown component type
    #[error("Unknown component type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    /// Invalid parameter value. Also used for runtime findings on signal
    /// parameters, which are reported as warnings rather than returned.
    #[error("Invalid parameter '{param}' for component '{component}': {message}")]
    InvalidParameter {
        component: String,
        param: String,
        message: String,
    },

    /// Undefined model reference
    #[error("Undefined model '{model}' referenced by component '{component}'")]
    UndefinedModel { model: String, component: String },

    // ============ Assembly Errors ============
    /// Node references of one connection resolve to incompatible shapes
    #[error("Shape mismatch in component '{component}': {source}")]
    ShapeMismatch {
        component: String,
        #[source]
        source: ShapeConflict,
    },

    /// A hybrid or event-registering template was given array or complex nodes
    #[error("Component '{component}' is not vectorizable and needs scalar real nodes, got {shape}")]
    NotVectorizable { component: String, shape: Shape },

    /// Node not found in the network
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// Node that no branch current reaches
    #[error("Floating node '{node}' detected - no branch is connected to it")]
    FloatingNode { node: String },

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Duplicate model name
    #[error("Duplicate model name '{name}'")]
    DuplicateModel { name: String },

    /// Invalid network topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Event Errors ============
    /// Contradictory transitions requested for one component in one evaluation
    #[error("Event ordering violation in component '{component}': {message}")]
    EventOrderingViolation { component: String, message: String },

    /// An event id the registry never issued
    #[error("Unknown event E{id}")]
    UnknownEvent { id: usize },

    // ============ Evaluation Errors ============
    /// A variable has no value bound in the evaluation context
    #[error("No value bound for {name}")]
    UnboundVariable { name: String },

    /// Expression evaluation failed
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl KirchhoffError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid component error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach a component name to a shape conflict
    pub fn shape_mismatch(component: impl Into<String>, source: ShapeConflict) -> Self {
        Self::ShapeMismatch {
            component: component.into(),
            source,
        }
    }

    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_names_component() {
        let err = KirchhoffError::shape_mismatch(
            "R7",
            ShapeConflict {
                expected: Shape::Array(3),
                found: Shape::Array(4),
            },
        );
        let text = err.to_string();
        assert!(text.contains("R7"));
        assert!(text.contains("array[3]"));
        assert!(text.contains("array[4]"));
    }
}
