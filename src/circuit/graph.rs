//! Circuit container: ordered nodes and components.

use log::{debug, trace, warn};

use super::equations::EquationSet;
use super::types::{
    shift_after_move, shift_after_removal, ComponentId, NodeId, GROUND_NAME, NODE_PREFIX,
};
use crate::components::{Component, ComponentType};
use crate::error::{CircuitError, Rejected, Result};
use crate::symbolic::expr::is_valid_name;
use crate::vars::{Variable, VariableRegistry, VariableValue};

/// Check that `name` can be used as a component name.
///
/// Names start with an uppercase ASCII letter, continue with letters, digits
/// or underscores and must not use the node voltage prefix.
pub fn validate_component_name(name: &str) -> Result<()> {
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(CircuitError::invalid_name(
            name,
            "must start with an uppercase letter",
        ));
    }
    if !is_valid_name(name) {
        return Err(CircuitError::invalid_name(
            name,
            "may only contain letters, digits and '_'",
        ));
    }
    if name.starts_with(NODE_PREFIX) {
        return Err(CircuitError::invalid_name(
            name,
            format!("the prefix '{}' is reserved for nodes", NODE_PREFIX),
        ));
    }
    Ok(())
}

/// A linear circuit: title, named nodes and components.
///
/// Node 0 is ground (`NV0`) and is always present. Components refer to nodes
/// and to each other by position; every mutation that shifts positions
/// updates all references before it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    /// Title line of the netlist
    pub title: String,

    /// Last number handed out by [`Circuit::unique_coeff_name`]
    pub(crate) coeff_counter: u32,

    /// Node voltage symbols, ground first
    pub(crate) nodes: Vec<String>,

    /// All components, in declaration order
    pub(crate) components: Vec<Component>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit containing only the ground node.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            coeff_counter: 0,
            nodes: vec![GROUND_NAME.to_string()],
            components: Vec::new(),
        }
    }

    /// Create an empty circuit with a title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::new()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn coeff_counter(&self) -> u32 {
        self.coeff_counter
    }

    /// Node voltage symbols, ground first.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Get the name of a node.
    pub fn node_name(&self, node: NodeId) -> Result<&str> {
        self.nodes
            .get(node.0)
            .map(String::as_str)
            .ok_or(CircuitError::InvalidNode { index: node.0 })
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component> {
        self.components
            .get(id.0)
            .ok_or(CircuitError::InvalidComponentIndex { index: id.0 })
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component> {
        self.components
            .get_mut(id.0)
            .ok_or(CircuitError::InvalidComponentIndex { index: id.0 })
    }

    /// Find a component by name.
    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|c| c.name() == name)
            .map(ComponentId)
    }

    /// Find a node by its full symbol (e.g. `NV3`).
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n == name).map(NodeId)
    }

    /// Positions of all independent sources.
    pub fn independent_sources(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.component_type().is_independent_source())
            .map(|(i, _)| ComponentId(i))
            .collect()
    }

    /// Append a new node with an unused `NV<n>` name.
    pub fn create_node(&mut self) -> NodeId {
        let mut i = self.nodes.len() + 1;
        loop {
            let name = format!("{}{}", NODE_PREFIX, i);
            if self.find_node(&name).is_none() {
                self.nodes.push(name);
                return NodeId(self.nodes.len() - 1);
            }
            i += 1;
        }
    }

    /// Look up the node for a raw netlist name, creating it if needed.
    ///
    /// `0` and `GND` (any case) are ground; any other name `x` becomes `NVx`.
    pub fn find_add_node(&mut self, raw: &str) -> NodeId {
        if raw == "0" || raw.eq_ignore_ascii_case("GND") {
            return NodeId::GROUND;
        }
        let name = format!("{}{}", NODE_PREFIX, raw);
        match self.find_node(&name) {
            Some(id) => id,
            None => {
                self.nodes.push(name);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Remove an unused node. Higher node indices shift down by one.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node.is_ground() {
            return Err(CircuitError::GroundRemoval);
        }
        let name = self.node_name(node)?.to_string();
        if let Some(user) = self
            .components
            .iter()
            .find(|c| c.nodes().contains(&node) || c.requires_node(node))
        {
            warn!("refusing to remove node {}: used by {}", name, user.name());
            return Err(CircuitError::NodeInUse {
                node: name,
                user: user.name().to_string(),
            });
        }

        self.nodes.remove(node.0);
        for component in &mut self.components {
            component.map_nodes(|n| NodeId(shift_after_removal(n.0, node.0)));
        }
        Ok(())
    }

    /// Check a new component against this circuit's invariants.
    fn validate_component(&self, component: &Component) -> Result<()> {
        if self.find_component(component.name()).is_some() {
            return Err(CircuitError::DuplicateComponent {
                name: component.name().to_string(),
            });
        }
        self.validate_references(component)
    }

    /// Name, node, gain and controller checks shared by insertion and loading.
    fn validate_references(&self, component: &Component) -> Result<()> {
        validate_component_name(component.name())?;

        let nodes = component.nodes();
        let control = component.control_nodes().unwrap_or(nodes);
        for node in nodes.iter().chain(control.iter()) {
            self.node_name(*node)?;
        }

        if let Some(gain) = component.gain() {
            if !is_valid_name(&gain.symbol) {
                return Err(CircuitError::invalid_controller(
                    component.name(),
                    format!("invalid gain symbol '{}'", gain.symbol),
                ));
            }
        }

        if let Some(id) = component.controller() {
            let controller = self.component(id).map_err(|_| {
                CircuitError::invalid_controller(
                    component.name(),
                    format!("no component at index {}", id.0),
                )
            })?;
            if controller.component_type() != ComponentType::ShortCircuit {
                return Err(CircuitError::invalid_controller(
                    component.name(),
                    format!("'{}' is not a short circuit", controller.name()),
                ));
            }
        }
        Ok(())
    }

    /// Re-check every invariant of a circuit assembled from stored parts.
    pub(crate) fn check_invariants(&self) -> Result<()> {
        for (index, component) in self.components.iter().enumerate() {
            if self.find_component(component.name()) != Some(ComponentId(index)) {
                return Err(CircuitError::DuplicateComponent {
                    name: component.name().to_string(),
                });
            }
            self.validate_references(component)?;
        }
        Ok(())
    }

    /// Add a component at the end of the list.
    ///
    /// On failure the component is handed back inside [`Rejected`].
    pub fn add_component(&mut self, component: Component) -> std::result::Result<ComponentId, Rejected> {
        if let Err(error) = self.validate_component(&component) {
            warn!("rejected component {}: {}", component.name(), error);
            return Err(Rejected { component, error });
        }
        trace!("added {}", component.name());
        self.components.push(component);
        Ok(ComponentId(self.components.len() - 1))
    }

    /// Remove a component nothing depends on and return it.
    ///
    /// Controller indices above the removed position shift down by one.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<Component> {
        let name = self.component(id)?.name().to_string();
        if let Some(dependent) = self.components.iter().find(|c| c.requires_component(id)) {
            warn!("refusing to remove {}: used by {}", name, dependent.name());
            return Err(CircuitError::ComponentInUse {
                name,
                dependent: dependent.name().to_string(),
            });
        }

        let removed = self.components.remove(id.0);
        for component in &mut self.components {
            if let Some(ComponentId(index)) = component.controller() {
                component.set_controller(Some(ComponentId(shift_after_removal(index, id.0))));
            }
        }
        Ok(removed)
    }

    /// Remove a component and drop it.
    pub fn delete_component(&mut self, id: ComponentId) -> Result<()> {
        self.remove_component(id).map(|_| ())
    }

    /// Move the component at `from` to position `to`.
    pub fn move_component(&mut self, from: ComponentId, to: ComponentId) -> Result<()> {
        self.component(from)?;
        self.component(to)?;
        if from == to {
            return Ok(());
        }
        let component = self.components.remove(from.0);
        self.components.insert(to.0, component);
        for component in &mut self.components {
            if let Some(ComponentId(index)) = component.controller() {
                component.set_controller(Some(ComponentId(shift_after_move(index, from.0, to.0))));
            }
        }
        Ok(())
    }

    /// An unused name for a new component of the given type.
    pub fn unique_component_name(&self, component_type: ComponentType) -> String {
        let letter = component_type.letter();
        let mut i = self.components.len() + 1;
        loop {
            let name = format!("{}{}", letter, i);
            if self.find_component(&name).is_none() {
                return name;
            }
            i += 1;
        }
    }

    /// A fresh coefficient symbol such as `mu3`. Numbers are never reused.
    pub fn unique_coeff_name(&mut self, prefix: &str) -> String {
        self.coeff_counter += 1;
        format!("{}{}", prefix, self.coeff_counter)
    }

    /// Merge `other` into this circuit.
    ///
    /// `node_map[i]` names the node of this circuit that node `i` of `other`
    /// connects to. Ground must map to ground; missing entries get fresh
    /// nodes and are filled in. Merged components receive fresh names and
    /// coefficient symbols.
    pub fn insert(&mut self, other: &Circuit, node_map: &mut Vec<Option<NodeId>>) -> Result<()> {
        node_map.resize(other.node_count(), None);
        match node_map[0] {
            Some(node) if !node.is_ground() => return Err(CircuitError::GroundMapping),
            _ => node_map[0] = Some(NodeId::GROUND),
        }
        for node in node_map.iter().flatten() {
            self.node_name(*node)?;
        }

        let resolved: Vec<NodeId> = node_map
            .iter_mut()
            .map(|entry| *entry.get_or_insert_with(|| self.create_node()))
            .collect();

        let offset = self.components.len();
        for component in &other.components {
            let mut copy = component.remapped(&resolved, offset);
            copy.rename(self.unique_component_name(copy.component_type()));
            if let Some(prefix) = copy.component_type().coefficient_prefix() {
                let symbol = self.unique_coeff_name(prefix);
                if let Some(gain) = copy.gain_mut() {
                    gain.symbol = symbol;
                }
            }
            self.components.push(copy);
        }
        debug!(
            "merged {} components from '{}'",
            other.component_count(),
            other.title
        );
        Ok(())
    }

    /// Register node voltages and component symbols in `registry`.
    pub fn build_variable_list(&self, registry: &mut VariableRegistry) {
        for node in &self.nodes {
            registry.insert(Variable::new(node, VariableValue::Number(0.0), false));
        }
        for component in &self.components {
            component.parser_variables(registry);
        }
    }

    /// Whether the circuit can be described by linear equations.
    ///
    /// Every component kind is linear, so this always holds.
    pub fn is_linear(&self) -> bool {
        true
    }

    /// Build KCL plus auxiliary equations. Unknowns are the branch currents
    /// (and dependent source values) followed by every node voltage.
    pub fn generate_equations(&self) -> Result<EquationSet> {
        if self.components.is_empty() {
            return Err(CircuitError::EmptyCircuit);
        }

        let mut set = EquationSet::new();
        set.push(GROUND_NAME, "0");

        for (index, name) in self.nodes.iter().enumerate().skip(1) {
            let node = NodeId(index);
            let mut sum = String::new();
            for component in &self.components {
                let [positive, negative] = component.nodes();
                if negative == node {
                    sum.push_str(&format!(" + ({})", component.current_symbol()));
                }
                if positive == node {
                    sum.push_str(&format!(" - ({})", component.current_symbol()));
                }
            }
            if sum.is_empty() {
                debug!("node {} touches no component, no KCL equation", name);
                continue;
            }
            set.push(sum.trim_start(), "0");
        }

        for component in &self.components {
            component.aux_equations(self, &mut set)?;
        }
        for node in &self.nodes {
            set.push_unknown(node.as_str());
        }

        debug!(
            "generated {} equations in {} unknowns",
            set.len(),
            set.unknowns().len()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cccs, Gain, Resistor, ShortCircuit, VoltageSource};

    fn resistor(name: &str, a: NodeId, b: NodeId) -> Component {
        Component::Resistor(Resistor::new(name, [a, b], 1e3))
    }

    #[test]
    fn test_new_circuit_has_ground() {
        let c = Circuit::new();
        assert_eq!(c.nodes(), &["NV0".to_string()]);
        assert_eq!(c.find_node("NV0"), Some(NodeId::GROUND));
    }

    #[test]
    fn test_find_add_node() {
        let mut c = Circuit::new();
        let a = c.find_add_node("1");
        assert_eq!(a, NodeId(1));
        assert_eq!(c.find_add_node("1"), a);
        assert_eq!(c.find_add_node("gnd"), NodeId::GROUND);
        assert_eq!(c.find_add_node("0"), NodeId::GROUND);
        assert_eq!(c.node_name(a).unwrap(), "NV1");
    }

    #[test]
    fn test_create_node_skips_used_names() {
        let mut c = Circuit::new();
        c.find_add_node("3");
        // Two nodes, so the first candidate is NV3, which is taken.
        let n = c.create_node();
        assert_eq!(c.node_name(n).unwrap(), "NV4");
    }

    #[test]
    fn test_add_component_rejects() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        c.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap();

        let dup = c.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap_err();
        assert!(matches!(dup.error, CircuitError::DuplicateComponent { .. }));
        assert_eq!(dup.component.name(), "R1");

        let bad_node = c.add_component(resistor("R2", NodeId(7), NodeId::GROUND)).unwrap_err();
        assert!(matches!(bad_node.error, CircuitError::InvalidNode { index: 7 }));

        for name in ["r3", "NV9", "R-3", ""] {
            let err = c.add_component(resistor(name, n1, NodeId::GROUND)).unwrap_err();
            assert!(matches!(err.error, CircuitError::InvalidName { .. }), "{}", name);
        }
        assert_eq!(c.component_count(), 1);
    }

    #[test]
    fn test_controller_must_be_short() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        let r = c.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap();
        let f = Component::Cccs(Cccs::new("F1", [n1, NodeId::GROUND], Some(r), Gain::new("beta1", 1.0)));
        let err = c.add_component(f).unwrap_err();
        assert!(matches!(err.error, CircuitError::InvalidController { .. }));
    }

    #[test]
    fn test_remove_component_dependency_and_shift() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        c.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap();
        let v = c
            .add_component(Component::ShortCircuit(ShortCircuit::new("V1", [n1, NodeId::GROUND])))
            .unwrap();
        let f = c
            .add_component(Component::Cccs(Cccs::new(
                "F1",
                [n1, NodeId::GROUND],
                Some(v),
                Gain::new("beta1", 1.0),
            )))
            .unwrap();

        assert!(matches!(
            c.delete_component(v),
            Err(CircuitError::ComponentInUse { .. })
        ));

        c.delete_component(ComponentId(0)).unwrap();
        let f = ComponentId(f.0 - 1);
        assert_eq!(c.component(f).unwrap().controller(), Some(ComponentId(0)));

        c.delete_component(f).unwrap();
        c.delete_component(ComponentId(0)).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_remove_node() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        let n2 = c.find_add_node("2");
        let n3 = c.find_add_node("3");
        c.add_component(resistor("R1", n3, NodeId::GROUND)).unwrap();

        assert!(matches!(c.remove_node(NodeId::GROUND), Err(CircuitError::GroundRemoval)));
        assert!(matches!(c.remove_node(n3), Err(CircuitError::NodeInUse { .. })));

        c.remove_node(n2).unwrap();
        c.remove_node(n1).unwrap();
        assert_eq!(c.components()[0].nodes(), [NodeId(1), NodeId::GROUND]);
        assert_eq!(c.node_name(NodeId(1)).unwrap(), "NV3");
    }

    #[test]
    fn test_move_component_adjusts_controllers() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        let v = c
            .add_component(Component::ShortCircuit(ShortCircuit::new("V1", [n1, NodeId::GROUND])))
            .unwrap();
        c.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap();
        c.add_component(Component::Cccs(Cccs::new(
            "F1",
            [n1, NodeId::GROUND],
            Some(v),
            Gain::new("beta1", 1.0),
        )))
        .unwrap();

        c.move_component(ComponentId(0), ComponentId(2)).unwrap();
        let names: Vec<_> = c.components().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["R1", "F1", "V1"]);
        assert_eq!(c.components()[1].controller(), Some(ComponentId(2)));
    }

    #[test]
    fn test_unique_names() {
        let mut c = Circuit::new();
        let n1 = c.find_add_node("1");
        c.add_component(resistor("R2", n1, NodeId::GROUND)).unwrap();
        assert_eq!(c.unique_component_name(ComponentType::Resistor), "R3");
        assert_eq!(c.unique_component_name(ComponentType::ShortCircuit), "V2");
        assert_eq!(c.unique_coeff_name("mu"), "mu1");
        assert_eq!(c.unique_coeff_name("gm"), "gm2");
    }

    #[test]
    fn test_insert_merges_with_fresh_names() {
        let mut sub = Circuit::with_title("sub");
        let a = sub.find_add_node("a");
        let b = sub.find_add_node("b");
        sub.add_component(resistor("R1", a, b)).unwrap();
        sub.add_component(resistor("R2", b, NodeId::GROUND)).unwrap();

        let mut main = Circuit::new();
        let n1 = main.find_add_node("1");
        main.add_component(resistor("R1", n1, NodeId::GROUND)).unwrap();

        let mut map = vec![None, Some(n1)];
        main.insert(&sub, &mut map).unwrap();
        assert_eq!(map.len(), 3);
        let fresh = map[2].unwrap();
        assert_eq!(main.node_count(), 3);
        assert_eq!(main.component_count(), 3);
        assert_eq!(main.components()[1].nodes(), [n1, fresh]);
        assert_eq!(main.components()[2].nodes(), [fresh, NodeId::GROUND]);
        assert_ne!(main.components()[1].name(), "R1");
        assert_ne!(main.components()[1].name(), main.components()[2].name());
    }

    #[test]
    fn test_insert_requires_ground_to_ground() {
        let mut sub = Circuit::new();
        let a = sub.find_add_node("a");
        sub.add_component(resistor("R1", a, NodeId::GROUND)).unwrap();
        let mut main = Circuit::new();
        let n1 = main.find_add_node("1");
        let mut map = vec![Some(n1)];
        assert!(matches!(main.insert(&sub, &mut map), Err(CircuitError::GroundMapping)));
        assert_eq!(main.node_count(), 2);
    }

    #[test]
    fn test_generate_equations() {
        let mut c = Circuit::new();
        let a = c.find_add_node("A");
        let b = c.find_add_node("B");
        c.add_component(Component::VoltageSource(VoltageSource::new("V1", [a, NodeId::GROUND], 1.0, 0.0)))
            .unwrap();
        c.add_component(resistor("R1", a, b)).unwrap();
        c.add_component(resistor("R2", b, NodeId::GROUND)).unwrap();

        let set = c.generate_equations().unwrap();
        let text: Vec<String> = set.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "NV0 = 0",
                "- (i_V1) - (i_R1) = 0",
                "+ (i_R1) - (i_R2) = 0",
                "NVA - NV0 = V1",
                "(i_R1)*(R1) = NVA - NVB",
                "(i_R2)*(R2) = NVB - NV0",
            ]
        );
        assert_eq!(
            set.unknowns(),
            &["i_V1", "i_R1", "i_R2", "NV0", "NVA", "NVB"]
        );
    }

    #[test]
    fn test_generate_equations_empty() {
        assert!(matches!(
            Circuit::new().generate_equations(),
            Err(CircuitError::EmptyCircuit)
        ));
    }
}
