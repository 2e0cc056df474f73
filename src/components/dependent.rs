//! Linear dependent sources.
//!
//! Voltage-controlled sources sense the voltage between two controlling
//! nodes. Current-controlled sources follow the Spice ammeter convention and
//! sense the current through a [`ShortCircuit`](super::ShortCircuit) named by
//! index. A current-controlled source without a controller is switched off.

use serde::{Deserialize, Serialize};

use super::TwoTerminal;
use crate::circuit::{ComponentId, NodeId};

/// Gain of a dependent source: a numeric value plus its symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    /// Coefficient symbol, unique within the circuit (e.g. `mu3`)
    pub symbol: String,
    pub value: f64,
}

impl Gain {
    pub fn new(symbol: impl Into<String>, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            value,
        }
    }
}

/// Voltage-controlled voltage source: V+ - V- = mu * (Vc+ - Vc-).
#[derive(Debug, Clone, PartialEq)]
pub struct Vcvs {
    pub base: TwoTerminal,
    pub gain: Gain,
    /// [controlling positive, controlling negative]
    pub control: [NodeId; 2],
}

impl Vcvs {
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], control: [NodeId; 2], gain: Gain) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            gain,
            control,
        }
    }
}

/// Voltage-controlled current source: i = gm * (Vc+ - Vc-).
#[derive(Debug, Clone, PartialEq)]
pub struct Vccs {
    pub base: TwoTerminal,
    pub gain: Gain,
    /// [controlling positive, controlling negative]
    pub control: [NodeId; 2],
}

impl Vccs {
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2], control: [NodeId; 2], gain: Gain) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            gain,
            control,
        }
    }
}

/// Current-controlled current source: i = beta * i(controller).
#[derive(Debug, Clone, PartialEq)]
pub struct Cccs {
    pub base: TwoTerminal,
    pub gain: Gain,
    pub controller: Option<ComponentId>,
}

impl Cccs {
    pub fn new(
        name: impl Into<String>,
        nodes: [NodeId; 2],
        controller: Option<ComponentId>,
        gain: Gain,
    ) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            gain,
            controller,
        }
    }
}

/// Current-controlled voltage source: V+ - V- = rm * i(controller).
#[derive(Debug, Clone, PartialEq)]
pub struct Ccvs {
    pub base: TwoTerminal,
    pub gain: Gain,
    pub controller: Option<ComponentId>,
}

impl Ccvs {
    pub fn new(
        name: impl Into<String>,
        nodes: [NodeId; 2],
        controller: Option<ComponentId>,
        gain: Gain,
    ) -> Self {
        Self {
            base: TwoTerminal::new(name, nodes),
            gain,
            controller,
        }
    }
}
