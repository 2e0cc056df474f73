//! Versioned JSON persistence of a circuit and its variable registry.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::graph::Circuit;
use super::types::{ComponentId, NodeId, GROUND_NAME, NODE_PREFIX};
use crate::components::{
    Capacitor, Cccs, Ccvs, Component, ComponentType, CurrentSource, Gain, Inductor, Resistor,
    ShortCircuit, TwoTerminal, Vccs, Vcvs, VoltageSource,
};
use crate::error::{CircuitError, Result};
use crate::symbolic::expr::is_valid_name;
use crate::vars::{Variable, VariableRegistry};

/// Current session format version.
pub const SESSION_VERSION: u32 = 1;

/// Stored form of one component. `type` is the numeric [`ComponentType`] tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(rename = "type")]
    pub type_tag: u8,
    #[serde(flatten)]
    pub base: TwoTerminal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<Gain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<[NodeId; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<ComponentId>,
}

impl From<&Component> for ComponentRecord {
    fn from(component: &Component) -> Self {
        let mut record = ComponentRecord {
            type_tag: component.component_type().tag(),
            base: component.base().clone(),
            value: component.numeric_value(),
            magnitude: None,
            phase: None,
            gain: component.gain().cloned(),
            control: component.control_nodes(),
            controller: component.controller(),
        };
        match component {
            Component::VoltageSource(c) => {
                record.magnitude = Some(c.magnitude);
                record.phase = Some(c.phase);
            }
            Component::CurrentSource(c) => {
                record.magnitude = Some(c.magnitude);
                record.phase = Some(c.phase);
            }
            _ => {}
        }
        record
    }
}

impl ComponentRecord {
    fn missing(&self, field: &str) -> CircuitError {
        CircuitError::InvalidSession {
            message: format!("component '{}' has no {}", self.base.name, field),
        }
    }

    /// Rebuild the component. Its symbols must be the ones derived from its name.
    pub fn into_component(self) -> Result<Component> {
        let component_type =
            ComponentType::from_tag(self.type_tag).ok_or_else(|| CircuitError::InvalidSession {
                message: format!("unknown component type tag {}", self.type_tag),
            })?;
        if self.base != TwoTerminal::new(self.base.name.clone(), self.base.nodes) {
            return Err(CircuitError::InvalidSession {
                message: format!(
                    "symbols '{}' and '{}' do not belong to component '{}'",
                    self.base.value_symbol, self.base.current_symbol, self.base.name
                ),
            });
        }

        let value = || self.value.ok_or_else(|| self.missing("value"));
        let magnitude = || self.magnitude.ok_or_else(|| self.missing("magnitude"));
        let phase = || Ok::<f64, CircuitError>(self.phase.unwrap_or(0.0));
        let gain = || self.gain.clone().ok_or_else(|| self.missing("gain"));
        let control = || self.control.ok_or_else(|| self.missing("controlling nodes"));

        let base = self.base.clone();
        let component = match component_type {
            ComponentType::Resistor => Component::Resistor(Resistor {
                base,
                resistance: value()?,
            }),
            ComponentType::Capacitor => Component::Capacitor(Capacitor {
                base,
                capacitance: value()?,
            }),
            ComponentType::Inductor => Component::Inductor(Inductor {
                base,
                inductance: value()?,
            }),
            ComponentType::ShortCircuit => Component::ShortCircuit(ShortCircuit { base }),
            ComponentType::VoltageSource => Component::VoltageSource(VoltageSource {
                base,
                magnitude: magnitude()?,
                phase: phase()?,
            }),
            ComponentType::CurrentSource => Component::CurrentSource(CurrentSource {
                base,
                magnitude: magnitude()?,
                phase: phase()?,
            }),
            ComponentType::Vcvs => Component::Vcvs(Vcvs {
                base,
                gain: gain()?,
                control: control()?,
            }),
            ComponentType::Vccs => Component::Vccs(Vccs {
                base,
                gain: gain()?,
                control: control()?,
            }),
            ComponentType::Cccs => Component::Cccs(Cccs {
                base,
                gain: gain()?,
                controller: self.controller,
            }),
            ComponentType::Ccvs => Component::Ccvs(Ccvs {
                base,
                gain: gain()?,
                controller: self.controller,
            }),
        };
        Ok(component)
    }
}

/// Stored form of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub title: String,
    pub coeff_counter: u32,
    pub nodes: Vec<String>,
    pub components: Vec<ComponentRecord>,
}

impl From<&Circuit> for CircuitRecord {
    fn from(circuit: &Circuit) -> Self {
        Self {
            title: circuit.title.clone(),
            coeff_counter: circuit.coeff_counter,
            nodes: circuit.nodes.clone(),
            components: circuit.components.iter().map(ComponentRecord::from).collect(),
        }
    }
}

impl TryFrom<CircuitRecord> for Circuit {
    type Error = CircuitError;

    fn try_from(record: CircuitRecord) -> Result<Self> {
        // Node names first: component indices are validated against them.
        if record.nodes.first().map(String::as_str) != Some(GROUND_NAME) {
            return Err(CircuitError::InvalidSession {
                message: format!("first node must be {}", GROUND_NAME),
            });
        }
        for (i, name) in record.nodes.iter().enumerate() {
            if record.nodes[..i].contains(name) {
                return Err(CircuitError::InvalidSession {
                    message: format!("duplicate node '{}'", name),
                });
            }
            let usable = name.len() > NODE_PREFIX.len()
                && name.starts_with(NODE_PREFIX)
                && is_valid_name(name);
            if i > 0 && !usable {
                return Err(CircuitError::InvalidSession {
                    message: format!("invalid node name '{}'", name),
                });
            }
        }

        let components = record
            .components
            .into_iter()
            .map(ComponentRecord::into_component)
            .collect::<Result<Vec<_>>>()?;

        let circuit = Circuit {
            title: record.title,
            coeff_counter: record.coeff_counter,
            nodes: record.nodes,
            components,
        };
        circuit.check_invariants()?;
        check_coefficients(&circuit)?;
        Ok(circuit)
    }
}

/// Gain symbols must be distinct, and none may be one that
/// [`Circuit::unique_coeff_name`] would still hand out.
fn check_coefficients(circuit: &Circuit) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();
    for gain in circuit.components.iter().filter_map(Component::gain) {
        if seen.contains(&gain.symbol.as_str()) {
            return Err(CircuitError::InvalidSession {
                message: format!("gain symbol '{}' used twice", gain.symbol),
            });
        }
        seen.push(&gain.symbol);

        let head = gain.symbol.trim_end_matches(|c: char| c.is_ascii_digit());
        let is_generated = ComponentType::ALL
            .iter()
            .any(|t| t.coefficient_prefix() == Some(head));
        if let (true, Ok(number)) = (is_generated, gain.symbol[head.len()..].parse::<u64>()) {
            if number > u64::from(circuit.coeff_counter) {
                return Err(CircuitError::InvalidSession {
                    message: format!(
                        "gain symbol '{}' is ahead of coefficient counter {}",
                        gain.symbol, circuit.coeff_counter
                    ),
                });
            }
        }
    }
    Ok(())
}

/// A saved working session: circuit plus variable registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub version: u32,
    pub circuit: CircuitRecord,
    pub variables: Vec<Variable>,
}

impl Session {
    /// Capture the current state.
    pub fn new(circuit: &Circuit, registry: &VariableRegistry) -> Self {
        Self {
            version: SESSION_VERSION,
            circuit: CircuitRecord::from(circuit),
            variables: registry.iter().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let session: Session = serde_json::from_str(text)?;
        if session.version != SESSION_VERSION {
            return Err(CircuitError::SessionVersion {
                found: session.version,
                expected: SESSION_VERSION,
            });
        }
        Ok(session)
    }

    /// Turn the stored records back into live objects.
    pub fn restore(self) -> Result<(Circuit, VariableRegistry)> {
        let circuit = Circuit::try_from(self.circuit)?;
        let registry = VariableRegistry::from_variables(self.variables)?;
        Ok((circuit, registry))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        fs::write(path, text).map_err(|source| CircuitError::FileWriteError {
            path: path.display().to_string(),
            source,
        })?;
        debug!("session written to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CircuitError::FileReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}
