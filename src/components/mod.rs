//! Component models for symbolic circuit analysis.
//!
//! This module provides models for all supported circuit components:
//! - Passive: Resistor, Capacitor, Inductor, ShortCircuit
//! - Independent sources: AC Voltage Source, AC Current Source
//! - Dependent sources: VCVS, CCCS, VCCS, CCVS
//!
//! Every component is a two-terminal element. It contributes its branch
//! current to the KCL equations of its terminal nodes and adds its own
//! constitutive ("auxiliary") equations to the system.

mod dependent;
mod passive;
mod sources;

pub use dependent::{Cccs, Ccvs, Gain, Vccs, Vcvs};
pub use passive::{Capacitor, Inductor, Resistor, ShortCircuit};
pub use sources::{phasor_expression, CurrentSource, VoltageSource};

use serde::{Deserialize, Serialize};

use crate::circuit::{Circuit, ComponentId, EquationSet, NodeId};
use crate::error::Result;
use crate::vars::{Variable, VariableRegistry, VariableValue};

/// Prefix of every branch current symbol.
pub const CURRENT_PREFIX: &str = "i_";

/// Terminal number of the positive terminal.
pub const POSITIVE: usize = 1;

/// Terminal number of the negative terminal.
pub const NEGATIVE: usize = 2;

/// Component kinds. The discriminant is the persisted type tag and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComponentType {
    Resistor = 0,
    Capacitor = 1,
    Inductor = 2,
    ShortCircuit = 3,
    VoltageSource = 4,
    CurrentSource = 5,
    Vcvs = 6,
    Cccs = 7,
    Vccs = 8,
    Ccvs = 9,
}

impl ComponentType {
    pub const ALL: [ComponentType; 10] = [
        Self::Resistor,
        Self::Capacitor,
        Self::Inductor,
        Self::ShortCircuit,
        Self::VoltageSource,
        Self::CurrentSource,
        Self::Vcvs,
        Self::Cccs,
        Self::Vccs,
        Self::Ccvs,
    ];

    /// Persisted numeric tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a persisted numeric tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Netlist type letter. The short circuit is written as a zero volt source.
    pub fn letter(self) -> char {
        match self {
            Self::Resistor => 'R',
            Self::Capacitor => 'C',
            Self::Inductor => 'L',
            Self::ShortCircuit | Self::VoltageSource => 'V',
            Self::CurrentSource => 'I',
            Self::Vcvs => 'E',
            Self::Cccs => 'F',
            Self::Vccs => 'G',
            Self::Ccvs => 'H',
        }
    }

    /// Parse a component type from its netlist letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'R' => Some(Self::Resistor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'V' => Some(Self::VoltageSource),
            'I' => Some(Self::CurrentSource),
            'E' => Some(Self::Vcvs),
            'F' => Some(Self::Cccs),
            'G' => Some(Self::Vccs),
            'H' => Some(Self::Ccvs),
            _ => None,
        }
    }

    pub fn is_passive(self) -> bool {
        matches!(self, Self::Resistor | Self::Capacitor | Self::Inductor)
    }

    pub fn is_independent_source(self) -> bool {
        matches!(self, Self::VoltageSource | Self::CurrentSource)
    }

    pub fn is_dependent_source(self) -> bool {
        matches!(self, Self::Vcvs | Self::Cccs | Self::Vccs | Self::Ccvs)
    }

    pub fn is_current_controlled(self) -> bool {
        matches!(self, Self::Cccs | Self::Ccvs)
    }

    /// Dependent sources whose output is a voltage across their terminals.
    pub fn has_voltage_output(self) -> bool {
        matches!(self, Self::Vcvs | Self::Ccvs)
    }

    /// Prefix of the gain coefficient symbol for dependent sources.
    pub fn coefficient_prefix(self) -> Option<&'static str> {
        match self {
            Self::Vcvs => Some("mu"),
            Self::Cccs => Some("beta"),
            Self::Vccs => Some("gm"),
            Self::Ccvs => Some("rm"),
            _ => None,
        }
    }
}

/// Fields shared by every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoTerminal {
    /// Unique component name
    pub name: String,
    /// Symbol standing for the component's value in equations
    pub value_symbol: String,
    /// Symbol of the branch current
    pub current_symbol: String,
    /// [positive, negative]
    pub nodes: [NodeId; 2],
}

impl TwoTerminal {
    pub fn new(name: impl Into<String>, nodes: [NodeId; 2]) -> Self {
        let name = name.into();
        Self {
            value_symbol: name.clone(),
            current_symbol: format!("{}{}", CURRENT_PREFIX, name),
            name,
            nodes,
        }
    }

    /// Give the component a new name and re-derive its symbols from it.
    pub fn rename(&mut self, name: impl Into<String>) {
        *self = Self::new(name, self.nodes);
    }
}

/// A circuit component.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Resistor(Resistor),
    Capacitor(Capacitor),
    Inductor(Inductor),
    ShortCircuit(ShortCircuit),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Vcvs(Vcvs),
    Cccs(Cccs),
    Vccs(Vccs),
    Ccvs(Ccvs),
}

impl Component {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Component::Resistor(_) => ComponentType::Resistor,
            Component::Capacitor(_) => ComponentType::Capacitor,
            Component::Inductor(_) => ComponentType::Inductor,
            Component::ShortCircuit(_) => ComponentType::ShortCircuit,
            Component::VoltageSource(_) => ComponentType::VoltageSource,
            Component::CurrentSource(_) => ComponentType::CurrentSource,
            Component::Vcvs(_) => ComponentType::Vcvs,
            Component::Cccs(_) => ComponentType::Cccs,
            Component::Vccs(_) => ComponentType::Vccs,
            Component::Ccvs(_) => ComponentType::Ccvs,
        }
    }

    pub fn base(&self) -> &TwoTerminal {
        match self {
            Component::Resistor(c) => &c.base,
            Component::Capacitor(c) => &c.base,
            Component::Inductor(c) => &c.base,
            Component::ShortCircuit(c) => &c.base,
            Component::VoltageSource(c) => &c.base,
            Component::CurrentSource(c) => &c.base,
            Component::Vcvs(c) => &c.base,
            Component::Cccs(c) => &c.base,
            Component::Vccs(c) => &c.base,
            Component::Ccvs(c) => &c.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut TwoTerminal {
        match self {
            Component::Resistor(c) => &mut c.base,
            Component::Capacitor(c) => &mut c.base,
            Component::Inductor(c) => &mut c.base,
            Component::ShortCircuit(c) => &mut c.base,
            Component::VoltageSource(c) => &mut c.base,
            Component::CurrentSource(c) => &mut c.base,
            Component::Vcvs(c) => &mut c.base,
            Component::Cccs(c) => &mut c.base,
            Component::Vccs(c) => &mut c.base,
            Component::Ccvs(c) => &mut c.base,
        }
    }

    /// Get the component name.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn value_symbol(&self) -> &str {
        &self.base().value_symbol
    }

    pub fn current_symbol(&self) -> &str {
        &self.base().current_symbol
    }

    /// [positive, negative] terminal nodes.
    pub fn nodes(&self) -> [NodeId; 2] {
        self.base().nodes
    }

    pub fn terminal_count(&self) -> usize {
        2
    }

    /// Node on terminal `index` ([`POSITIVE`] or [`NEGATIVE`]).
    pub fn terminal(&self, index: usize) -> Option<NodeId> {
        match index {
            POSITIVE => Some(self.nodes()[0]),
            NEGATIVE => Some(self.nodes()[1]),
            _ => None,
        }
    }

    /// Reconnect terminal `index`. Returns false for an invalid terminal number.
    pub fn set_terminal(&mut self, index: usize, node: NodeId) -> bool {
        let slot = match index {
            POSITIVE => 0,
            NEGATIVE => 1,
            _ => return false,
        };
        self.base_mut().nodes[slot] = node;
        true
    }

    /// Rename the component; value and current symbols follow the name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.base_mut().rename(name);
    }

    pub fn gain(&self) -> Option<&Gain> {
        match self {
            Component::Vcvs(c) => Some(&c.gain),
            Component::Cccs(c) => Some(&c.gain),
            Component::Vccs(c) => Some(&c.gain),
            Component::Ccvs(c) => Some(&c.gain),
            _ => None,
        }
    }

    pub fn gain_mut(&mut self) -> Option<&mut Gain> {
        match self {
            Component::Vcvs(c) => Some(&mut c.gain),
            Component::Cccs(c) => Some(&mut c.gain),
            Component::Vccs(c) => Some(&mut c.gain),
            Component::Ccvs(c) => Some(&mut c.gain),
            _ => None,
        }
    }

    /// Controlling nodes of a voltage-controlled source.
    pub fn control_nodes(&self) -> Option<[NodeId; 2]> {
        match self {
            Component::Vcvs(c) => Some(c.control),
            Component::Vccs(c) => Some(c.control),
            _ => None,
        }
    }

    /// Controlling short circuit of a current-controlled source, if set.
    pub fn controller(&self) -> Option<ComponentId> {
        match self {
            Component::Cccs(c) => c.controller,
            Component::Ccvs(c) => c.controller,
            _ => None,
        }
    }

    /// Replace the controller. Returns false if this is not a current-controlled source.
    pub fn set_controller(&mut self, controller: Option<ComponentId>) -> bool {
        match self {
            Component::Cccs(c) => c.controller = controller,
            Component::Ccvs(c) => c.controller = controller,
            _ => return false,
        }
        true
    }

    /// Numeric value of a passive element.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Component::Resistor(c) => Some(c.resistance),
            Component::Capacitor(c) => Some(c.capacitance),
            Component::Inductor(c) => Some(c.inductance),
            _ => None,
        }
    }

    /// Impedance text of a passive element.
    pub fn impedance(&self) -> Option<String> {
        match self {
            Component::Resistor(c) => Some(c.impedance()),
            Component::Capacitor(c) => Some(c.impedance()),
            Component::Inductor(c) => Some(c.impedance()),
            _ => None,
        }
    }

    /// Admittance text of a passive element.
    pub fn admittance(&self) -> Option<String> {
        match self {
            Component::Resistor(c) => Some(c.admittance()),
            Component::Capacitor(c) => Some(c.admittance()),
            Component::Inductor(c) => Some(c.admittance()),
            _ => None,
        }
    }

    /// Apply `f` to every node reference: terminals and controlling nodes.
    pub(crate) fn map_nodes(&mut self, f: impl Fn(NodeId) -> NodeId) {
        let base = self.base_mut();
        base.nodes = [f(base.nodes[0]), f(base.nodes[1])];
        match self {
            Component::Vcvs(c) => c.control = [f(c.control[0]), f(c.control[1])],
            Component::Vccs(c) => c.control = [f(c.control[0]), f(c.control[1])],
            _ => {}
        }
    }

    /// Independent copy re-pointed through an old-to-new node map, with its
    /// controller index shifted by `component_offset`.
    pub fn remapped(&self, node_map: &[NodeId], component_offset: usize) -> Component {
        let mut copy = self.clone();
        copy.map_nodes(|n| node_map.get(n.0).copied().unwrap_or(n));
        if let Some(ComponentId(index)) = copy.controller() {
            copy.set_controller(Some(ComponentId(index + component_offset)));
        }
        copy
    }

    /// True if this component cannot exist without component `id`.
    pub fn requires_component(&self, id: ComponentId) -> bool {
        self.controller() == Some(id)
    }

    /// True if a controlling reference points at `node`. Terminals are
    /// checked separately by the circuit.
    pub fn requires_node(&self, node: NodeId) -> bool {
        self.control_nodes().is_some_and(|nodes| nodes.contains(&node))
    }

    /// Append this component's constitutive equations and unknowns.
    pub fn aux_equations(&self, circuit: &Circuit, set: &mut EquationSet) -> Result<()> {
        let base = self.base();
        let value = base.value_symbol.as_str();
        let current = base.current_symbol.as_str();
        let across = voltage_between(circuit, base.nodes)?;

        match self {
            Component::Resistor(_) | Component::Capacitor(_) | Component::Inductor(_) => {
                let impedance = self.impedance().unwrap_or_default();
                if impedance.contains('/') {
                    let admittance = self.admittance().unwrap_or_default();
                    set.push(current, format!("({})*({})", across, admittance));
                } else {
                    set.push(format!("({})*({})", current, impedance), across);
                }
            }
            Component::ShortCircuit(_) => set.push(across, "0"),
            Component::VoltageSource(_) => set.push(across, value),
            Component::CurrentSource(_) => set.push(value, current),
            Component::Vcvs(c) => {
                let sensed = voltage_between(circuit, c.control)?;
                set.push(value, format!("{}*({})", c.gain.symbol, sensed));
                set.push(across, value);
            }
            Component::Vccs(c) => {
                let sensed = voltage_between(circuit, c.control)?;
                set.push(value, format!("{}*({})", c.gain.symbol, sensed));
                set.push(value, current);
            }
            Component::Cccs(c) => {
                set.push(value, controlled_value(circuit, &c.gain, c.controller)?);
                set.push(value, current);
            }
            Component::Ccvs(c) => {
                set.push(value, controlled_value(circuit, &c.gain, c.controller)?);
                set.push(across, value);
            }
        }

        set.push_unknown(current);
        if self.component_type().is_dependent_source() {
            set.push_unknown(value);
        }
        Ok(())
    }

    /// Register the symbols this component introduces.
    pub fn parser_variables(&self, registry: &mut VariableRegistry) {
        let base = self.base();
        registry.insert(Variable::new(
            &base.current_symbol,
            VariableValue::Number(0.0),
            false,
        ));

        match self {
            Component::Resistor(_) | Component::Capacitor(_) | Component::Inductor(_) => {
                let value = self.numeric_value().unwrap_or_default();
                registry.insert(Variable::new(
                    &base.value_symbol,
                    VariableValue::Number(value),
                    true,
                ));
            }
            Component::ShortCircuit(_) => {}
            Component::VoltageSource(c) => {
                registry.insert(Variable::new(
                    &base.value_symbol,
                    VariableValue::Function(c.phasor()),
                    false,
                ));
            }
            Component::CurrentSource(c) => {
                registry.insert(Variable::new(
                    &base.value_symbol,
                    VariableValue::Function(c.phasor()),
                    false,
                ));
            }
            Component::Vcvs(_) | Component::Cccs(_) | Component::Vccs(_) | Component::Ccvs(_) => {
                if let Some(gain) = self.gain() {
                    registry.insert(Variable::new(
                        &gain.symbol,
                        VariableValue::Number(gain.value),
                        true,
                    ));
                }
                registry.insert(Variable::new(
                    &base.value_symbol,
                    VariableValue::Number(0.0),
                    false,
                ));
            }
        }
    }
}

/// `NVa - NVb` for a node pair.
fn voltage_between(circuit: &Circuit, nodes: [NodeId; 2]) -> Result<String> {
    Ok(format!(
        "{} - {}",
        circuit.node_name(nodes[0])?,
        circuit.node_name(nodes[1])?
    ))
}

/// Right-hand side of a current-controlled source's value equation.
fn controlled_value(circuit: &Circuit, gain: &Gain, controller: Option<ComponentId>) -> Result<String> {
    match controller {
        Some(id) => Ok(format!(
            "{}*({})",
            gain.symbol,
            circuit.component(id)?.current_symbol()
        )),
        None => Ok("0".to_string()),
    }
}
