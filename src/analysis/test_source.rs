//! Unit test source used to probe impedances and loop gains.

use crate::circuit::{Circuit, NodeId};
use crate::components::{Component, ComponentType, Resistor, VoltageSource};
use crate::error::Result;

/// A 1∠0° voltage source in series with 1 Ω, inserted between two nodes:
///
/// ```text
///   pos    I -->    neg
///    o--(+ -)--/\/\--o
///        VT     RT
/// ```
///
/// `VT` runs from `pos` to a fresh node, `RT` from that node to `neg`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSource {
    /// The node between `VT` and `RT`
    pub node: NodeId,
    /// Name of `VT`
    pub source: String,
    /// Name of `RT`
    pub resistor: String,
    /// Value symbol of `VT`
    pub value_symbol: String,
    /// Branch current symbol of `VT`
    pub current_symbol: String,
}

impl TestSource {
    /// Insert a test source between `pos` and `neg`.
    pub fn insert(circuit: &mut Circuit, pos: NodeId, neg: NodeId) -> Result<Self> {
        circuit.node_name(pos)?;
        circuit.node_name(neg)?;

        let node = circuit.create_node();
        let source_name = circuit.unique_component_name(ComponentType::VoltageSource);
        let source = circuit.add_component(Component::VoltageSource(VoltageSource::new(
            source_name,
            [pos, node],
            1.0,
            0.0,
        )))?;
        let resistor_name = circuit.unique_component_name(ComponentType::Resistor);
        circuit.add_component(Component::Resistor(Resistor::new(
            resistor_name.clone(),
            [node, neg],
            1.0,
        )))?;

        let source = circuit.component(source)?;
        Ok(Self {
            node,
            source: source.name().to_string(),
            resistor: resistor_name,
            value_symbol: source.value_symbol().to_string(),
            current_symbol: source.current_symbol().to_string(),
        })
    }
}
