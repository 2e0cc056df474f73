//! Independent AC voltage and current sources.
//!
//! A source's value symbol stands for its phasor. The numeric magnitude and
//! phase only matter when a result is evaluated through the variable
//! registry, where the symbol is defined as `mag*exp(j*pi*phase/180)`.

use super::TwoTerminal;
use crate::circuit::NodeId;

/// Registry definition of a phasor with the given magnitude and phase (degrees).
pub fn phasor_expression(magnitude: f64, phase: f64) -> String {
    format!("{:?}*exp(j*pi*({:?})/180)", magnitude, phase)
}

/// An independent AC voltage source.
///
/// Enforces: V+ - V- = value.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageSource {
    pub base: TwoTerminal,
    pub magnitude: f64,
    /// Phase in degrees
    pub phase: f64,
}

impl VoltageSource {
    /// Create a new voltage source.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], magnitude: f64, phase: f64) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            magnitude,
            phase,
        }
    }

    pub fn phasor(&self) -> String {
        phasor_expression(self.magnitude, self.phase)
    }
}

/// An independent AC current source.
///
/// The value flows from the positive terminal through the source to the
/// negative terminal, the same direction as the branch current.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSource {
    pub base: TwoTerminal,
    pub magnitude: f64,
    /// Phase in degrees
    pub phase: f64,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], magnitude: f64, phase: f64) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            magnitude,
            phase,
        }
    }

    pub fn phasor(&self) -> String {
        phasor_expression(self.magnitude, self.phase)
    }
}
