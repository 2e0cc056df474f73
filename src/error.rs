//! Error types for symcir.
//!
//! [`CircuitError`] covers everything that can go wrong while reading a
//! netlist, mutating a circuit, running an analysis or restoring a session.
//! Failures inside the symbolic backend arrive as [`SolverError`] and are
//! wrapped unchanged.

use thiserror::Error;

use crate::components::Component;
use crate::symbolic::SolverError;

/// Result type alias using [`CircuitError`].
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Unified error type for all symcir operations.
#[derive(Error, Debug)]
pub enum CircuitError {
    // ============ Netlist Parsing Errors ============
    /// Malformed netlist line
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Line names a component the netlist format does not know
    #[error("Unknown component type '{component_type}' at line {line}")]
    UnknownComponentType { component_type: String, line: usize },

    /// Numeric field that is not a number with an optional SI suffix
    #[error("Invalid value '{text}' at line {line}")]
    InvalidValue { text: String, line: usize },

    /// Current-controlled source refers to a missing or non-short controller
    #[error("Component '{name}' at line {line}: controller '{controller}' {message}")]
    UnresolvedController {
        name: String,
        controller: String,
        line: usize,
        message: String,
    },

    // ============ Circuit Container Errors ============
    /// Component name is not a valid identifier
    #[error("Invalid component name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Node name not found in circuit
    #[error("Node '{node}' not found in circuit")]
    NodeNotFound { node: String },

    /// Node index outside the node list
    #[error("Node index {index} is out of range")]
    InvalidNode { index: usize },

    /// Component name not found in circuit
    #[error("Component '{name}' not found in circuit")]
    ComponentNotFound { name: String },

    /// Component index outside the component list
    #[error("Component index {index} is out of range")]
    InvalidComponentIndex { index: usize },

    /// Controlling reference of a dependent source is unusable
    #[error("Invalid controller for '{name}': {message}")]
    InvalidController { name: String, message: String },

    /// Another component still depends on the one being removed
    #[error("Component '{name}' is still used by '{dependent}'")]
    ComponentInUse { name: String, dependent: String },

    /// A component still references the node being removed
    #[error("Node '{node}' is still used by '{user}'")]
    NodeInUse { node: String, user: String },

    /// Attempt to remove the ground node
    #[error("The ground node cannot be removed")]
    GroundRemoval,

    /// Node map for a merge does not send ground to ground
    #[error("Ground must map to ground when merging circuits")]
    GroundMapping,

    /// Operation needs at least one component
    #[error("Circuit has no components")]
    EmptyCircuit,

    // ============ Analysis Errors ============
    /// Component is not an independent source
    #[error("'{name}' is not an independent source")]
    NotIndependentSource { name: String },

    /// Extra element is not a passive component
    #[error("'{name}' is not a passive element (R, L or C)")]
    NotPassive { name: String },

    /// Component is not a dependent source
    #[error("'{name}' is not a dependent source")]
    NotDependentSource { name: String },

    /// Input and null lists do not fit together
    #[error("Invalid nulling request: {message}")]
    InvalidNulling { message: String },

    /// Probe nodes for an impedance measurement are unusable
    #[error("Invalid probe: {message}")]
    InvalidProbe { message: String },

    // ============ Solver and Evaluation Errors ============
    /// Failure reported by the symbolic backend
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Solver time limit that is negative, NaN or too large
    #[error("Invalid timeout {seconds} s")]
    InvalidTimeout { seconds: f64 },

    /// Numeric evaluation of an expression failed
    #[error("Cannot evaluate '{expression}': {message}")]
    Evaluation { expression: String, message: String },

    /// Function variable refers to itself
    #[error("Variable '{name}' is defined in terms of itself")]
    RecursiveDefinition { name: String },

    /// Invalid variable registry entry
    #[error("Invalid variable '{name}': {message}")]
    InvalidVariable { name: String, message: String },

    // ============ Persistence Errors ============
    /// Session document has an unsupported version
    #[error("Unsupported session version {found} (expected {expected})")]
    SessionVersion { found: u32, expected: u32 },

    /// Session content is structurally invalid
    #[error("Invalid session: {message}")]
    InvalidSession { message: String },

    /// Session JSON could not be read or written
    #[error("Session format error: {0}")]
    Json(#[from] serde_json::Error),

    // ============ I/O Errors ============
    /// Error reading a file
    #[error("Failed to read '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a file
    #[error("Failed to write '{path}': {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl CircuitError {
    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid controller error
    pub fn invalid_controller(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidController {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// A component the circuit refused, handed back to the caller.
#[derive(Error, Debug)]
#[error("Component '{}' rejected: {}", .component.name(), .error)]
pub struct Rejected {
    pub component: Component,
    pub error: CircuitError,
}

impl From<Rejected> for CircuitError {
    fn from(rejected: Rejected) -> Self {
        rejected.error
    }
}
