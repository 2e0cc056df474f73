//! Passive elements: Resistor, Capacitor, Inductor, and the ideal short.

use super::TwoTerminal;
use crate::circuit::NodeId;

/// A resistor with impedance `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub base: TwoTerminal,
    /// Resistance in ohms (used only for numeric evaluation)
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            resistance,
        }
    }

    pub fn impedance(&self) -> String {
        self.base.value_symbol.clone()
    }

    pub fn admittance(&self) -> String {
        format!("1/{}", self.base.value_symbol)
    }
}

/// A capacitor with impedance `1/(s*C)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    pub base: TwoTerminal,
    /// Capacitance in farads
    pub capacitance: f64,
}

impl Capacitor {
    /// Create a new capacitor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], capacitance: f64) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            capacitance,
        }
    }

    pub fn impedance(&self) -> String {
        format!("1/(s*{})", self.base.value_symbol)
    }

    pub fn admittance(&self) -> String {
        format!("s*{}", self.base.value_symbol)
    }
}

/// An inductor with impedance `s*L`.
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    pub base: TwoTerminal,
    /// Inductance in henries
    pub inductance: f64,
}

impl Inductor {
    /// Create a new inductor.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], inductance: f64) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            inductance,
        }
    }

    pub fn impedance(&self) -> String {
        format!("s*{}", self.base.value_symbol)
    }

    pub fn admittance(&self) -> String {
        format!("1/(s*{})", self.base.value_symbol)
    }
}

/// Zero-volt branch. Doubles as the ammeter that current-controlled
/// sources read their controlling current from.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuit {
    pub base: TwoTerminal,
}

impl ShortCircuit {
    /// Create a new short circuit.
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2]) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impedances() {
        let nodes = [NodeId(1), NodeId::GROUND];
        assert_eq!(Resistor::new("R1", nodes, 1e3).impedance(), "R1");
        assert_eq!(Capacitor::new("C1", nodes, 1e-9).impedance(), "1/(s*C1)");
        assert_eq!(Capacitor::new("C1", nodes, 1e-9).admittance(), "s*C1");
        assert_eq!(Inductor::new("L1", nodes, 1e-3).impedance(), "s*L1");
    }

    #[test]
    fn test_symbols_follow_name() {
        let r = Resistor::new("R7", [NodeId(1), NodeId(2)], 10.0);
        assert_eq!(r.base.value_symbol, "R7");
        assert_eq!(r.base.current_symbol, "i_R7");
    }
}
