//! Parser for Spice netlists.

use log::{debug, warn};

use super::lexer::{parse_value, Lexer, Token, TokenKind};
use super::ParsedNetlist;
use crate::circuit::{Circuit, ComponentId, NodeId, NODE_PREFIX};
use crate::components::{
    Capacitor, Cccs, Ccvs, Component, ComponentType, CurrentSource, Gain, Inductor, Resistor,
    ShortCircuit, Vccs, Vcvs, VoltageSource,
};
use crate::error::{CircuitError, Result};
use crate::symbolic::expr::is_valid_name;

/// A current-controlled source waiting for its controller to be looked up.
#[derive(Debug)]
struct PendingController {
    name: String,
    controller: String,
    line: usize,
}

/// Parser for netlists.
///
/// Errors in a component line are recorded as diagnostics and the line is
/// skipped; parsing never stops early except at `.END`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    circuit: Circuit,
    diagnostics: Vec<CircuitError>,
    pending: Vec<PendingController>,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            circuit: Circuit::new(),
            diagnostics: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Parse the entire netlist.
    pub fn parse(mut self) -> ParsedNetlist {
        if self.current.kind == TokenKind::Title {
            self.circuit.title = self.current.text.clone();
            self.advance();
        }

        loop {
            match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Newline | TokenKind::Title => self.advance(),
                TokenKind::Directive => {
                    if self.current.text.eq_ignore_ascii_case(".END") {
                        break;
                    }
                    debug!(
                        "line {}: ignoring directive {}",
                        self.current.line, self.current.text
                    );
                    self.advance();
                }
                TokenKind::Word => {
                    let words = self.statement();
                    if let Err(error) = self.parse_component(&words) {
                        self.report(error);
                    }
                }
            }
        }

        self.resolve_controllers();
        self.remove_unused_nodes();
        debug!(
            "parsed '{}': {} nodes, {} components, {} diagnostics",
            self.circuit.title,
            self.circuit.node_count(),
            self.circuit.component_count(),
            self.diagnostics.len()
        );
        ParsedNetlist {
            circuit: self.circuit,
            diagnostics: self.diagnostics,
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Collect the words of the current statement, consuming its newline.
    fn statement(&mut self) -> Vec<Token> {
        let mut words = Vec::new();
        while self.current.kind == TokenKind::Word {
            words.push(self.current.clone());
            self.advance();
        }
        if self.current.kind == TokenKind::Newline {
            self.advance();
        }
        words
    }

    fn report(&mut self, error: CircuitError) {
        warn!("{}", error);
        self.diagnostics.push(error);
    }

    fn parse_component(&mut self, words: &[Token]) -> Result<()> {
        let Some(first) = words.first() else {
            return Ok(());
        };
        let line = first.line;
        let name = first.text.to_ascii_uppercase();
        let letter = name.chars().next().unwrap_or(' ');
        let component_type =
            ComponentType::from_letter(letter).ok_or_else(|| CircuitError::UnknownComponentType {
                component_type: letter.to_string(),
                line,
            })?;
        let fields = Fields {
            name: &name,
            line,
            words: &words[1..],
        };

        let mut controller = None;
        let component = match component_type {
            ComponentType::Resistor | ComponentType::Capacitor | ComponentType::Inductor => {
                let (pos, neg) = (fields.node(0)?, fields.node(1)?);
                let value = fields.value(2, "value")?;
                fields.ignore_from(3);
                let nodes = self.nodes(pos, neg);
                match component_type {
                    ComponentType::Resistor => Component::Resistor(Resistor::new(name, nodes, value)),
                    ComponentType::Capacitor => Component::Capacitor(Capacitor::new(name, nodes, value)),
                    _ => Component::Inductor(Inductor::new(name, nodes, value)),
                }
            }
            ComponentType::VoltageSource | ComponentType::CurrentSource => {
                let (pos, neg) = (fields.node(0)?, fields.node(1)?);
                let (magnitude, phase) = fields.source_spec(2)?;
                let nodes = self.nodes(pos, neg);
                if component_type == ComponentType::CurrentSource {
                    Component::CurrentSource(CurrentSource::new(name, nodes, magnitude, phase))
                } else if magnitude == 0.0 {
                    debug!("line {}: {} has zero magnitude, using a short circuit", line, name);
                    Component::ShortCircuit(ShortCircuit::new(name, nodes))
                } else {
                    Component::VoltageSource(VoltageSource::new(name, nodes, magnitude, phase))
                }
            }
            ComponentType::Vcvs | ComponentType::Vccs => {
                let (pos, neg) = (fields.node(0)?, fields.node(1)?);
                let (control_pos, control_neg) = (fields.node(2)?, fields.node(3)?);
                let value = fields.value(4, "gain")?;
                fields.ignore_from(5);
                let nodes = self.nodes(pos, neg);
                let control = self.nodes(control_pos, control_neg);
                let gain = Gain::new(self.coefficient(component_type), value);
                if component_type == ComponentType::Vcvs {
                    Component::Vcvs(Vcvs::new(name, nodes, control, gain))
                } else {
                    Component::Vccs(Vccs::new(name, nodes, control, gain))
                }
            }
            ComponentType::Cccs | ComponentType::Ccvs => {
                let (pos, neg) = (fields.node(0)?, fields.node(1)?);
                controller = Some(fields.word(2, "controlling source")?.to_ascii_uppercase());
                let value = fields.value(3, "gain")?;
                fields.ignore_from(4);
                let nodes = self.nodes(pos, neg);
                let gain = Gain::new(self.coefficient(component_type), value);
                if component_type == ComponentType::Cccs {
                    Component::Cccs(Cccs::new(name, nodes, None, gain))
                } else {
                    Component::Ccvs(Ccvs::new(name, nodes, None, gain))
                }
            }
            ComponentType::ShortCircuit => {
                return Err(CircuitError::UnknownComponentType {
                    component_type: letter.to_string(),
                    line,
                })
            }
        };

        let name = component.name().to_string();
        self.circuit.add_component(component)?;
        if let Some(controller) = controller {
            self.pending.push(PendingController {
                name,
                controller,
                line,
            });
        }
        Ok(())
    }

    fn nodes(&mut self, pos: &str, neg: &str) -> [NodeId; 2] {
        [self.circuit.find_add_node(pos), self.circuit.find_add_node(neg)]
    }

    fn coefficient(&mut self, component_type: ComponentType) -> String {
        let prefix = component_type.coefficient_prefix().unwrap_or("k");
        self.circuit.unique_coeff_name(prefix)
    }

    /// Attach controllers now that every component is known. Sources whose
    /// controller is missing or not a short circuit are reported and removed.
    fn resolve_controllers(&mut self) {
        let mut failed = Vec::new();
        for pending in std::mem::take(&mut self.pending) {
            match self.lookup_controller(&pending) {
                Ok(controller) => {
                    let dependent = self.circuit.find_component(&pending.name);
                    if let Some(component) =
                        dependent.and_then(|id| self.circuit.component_mut(id).ok())
                    {
                        component.set_controller(Some(controller));
                    }
                }
                Err(error) => {
                    self.report(error);
                    failed.push(pending.name);
                }
            }
        }

        for name in failed {
            if let Some(id) = self.circuit.find_component(&name) {
                if let Err(error) = self.circuit.delete_component(id) {
                    self.report(error);
                }
            }
        }
    }

    /// Drop nodes that only skipped lines or removed sources referred to.
    fn remove_unused_nodes(&mut self) {
        for index in (1..self.circuit.node_count()).rev() {
            let node = NodeId(index);
            let used = self
                .circuit
                .components()
                .iter()
                .any(|c| c.nodes().contains(&node) || c.requires_node(node));
            if used {
                continue;
            }
            debug!(
                "dropping unused node {}",
                self.circuit.node_name(node).unwrap_or("?")
            );
            if let Err(error) = self.circuit.remove_node(node) {
                self.report(error);
            }
        }
    }

    fn lookup_controller(&self, pending: &PendingController) -> Result<ComponentId> {
        let unresolved = |message: &str| CircuitError::UnresolvedController {
            name: pending.name.clone(),
            controller: pending.controller.clone(),
            line: pending.line,
            message: message.to_string(),
        };
        let id = self
            .circuit
            .find_component(&pending.controller)
            .ok_or_else(|| unresolved("does not exist"))?;
        let controller = self.circuit.component(id)?;
        if controller.component_type() != ComponentType::ShortCircuit {
            return Err(unresolved("is not a zero volt source"));
        }
        Ok(id)
    }
}

/// Positional fields of one component statement, after the name.
struct Fields<'w> {
    name: &'w str,
    line: usize,
    words: &'w [Token],
}

impl<'w> Fields<'w> {
    fn word(&self, index: usize, what: &str) -> Result<&'w str> {
        self.words
            .get(index)
            .map(|t| t.text.as_str())
            .ok_or_else(|| CircuitError::parse(self.line, format!("{}: missing {}", self.name, what)))
    }

    fn node(&self, index: usize) -> Result<&'w str> {
        let text = self.word(index, "node")?;
        if text == "0" || text.eq_ignore_ascii_case("GND") {
            return Ok(text);
        }
        if !is_valid_name(&format!("{}{}", NODE_PREFIX, text)) {
            return Err(CircuitError::parse(
                self.line,
                format!("{}: invalid node name '{}'", self.name, text),
            ));
        }
        Ok(text)
    }

    fn value(&self, index: usize, what: &str) -> Result<f64> {
        let text = self.word(index, what)?;
        parse_value(text).ok_or_else(|| CircuitError::InvalidValue {
            text: text.to_string(),
            line: self.line,
        })
    }

    /// `[DC v] [AC mag [phase]]` or a bare `mag [phase]`, starting at `index`.
    /// The AC part wins when both are given.
    fn source_spec(&self, index: usize) -> Result<(f64, f64)> {
        let rest = self.words.get(index..).unwrap_or(&[]);
        let keyword = |k: &str| rest.iter().position(|t| t.text.eq_ignore_ascii_case(k));
        let start = match (keyword("AC"), keyword("DC")) {
            (Some(ac), _) => index + ac + 1,
            (None, Some(dc)) => index + dc + 1,
            (None, None) => index,
        };
        let magnitude = self.value(start, "magnitude")?;
        let phase = match self.words.get(start + 1) {
            Some(t) if !t.text.eq_ignore_ascii_case("DC") && !t.text.eq_ignore_ascii_case("AC") => {
                self.value(start + 1, "phase")?
            }
            _ => 0.0,
        };
        Ok((magnitude, phase))
    }

    fn ignore_from(&self, index: usize) {
        if self.words.len() > index {
            debug!(
                "line {}: {} ignoring extra fields after position {}",
                self.line, self.name, index
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::parse;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_divider() {
        let parsed = parse("Divider\nV1 in 0 AC 1 0\nR1 in out 1k\nR2 out 0 2k\n.END\n");
        assert!(parsed.diagnostics.is_empty());
        let c = &parsed.circuit;
        assert_eq!(c.title, "Divider");
        assert_eq!(c.nodes(), &["NV0", "NVin", "NVout"]);
        assert_eq!(c.component_count(), 3);
        assert_eq!(c.components()[1].numeric_value(), Some(1000.0));
        assert_eq!(c.components()[2].nodes(), [NodeId(2), NodeId::GROUND]);
    }

    #[test]
    fn test_zero_volt_source_is_short() {
        let parsed = parse("t\nV1 1 0 AC 0 0\n");
        let c = &parsed.circuit;
        assert_eq!(c.components()[0].component_type(), ComponentType::ShortCircuit);
        assert_eq!(c.components()[0].name(), "V1");
        assert_eq!(c.node_name(c.components()[0].nodes()[0]).unwrap(), "NV1");
        assert!(c.components()[0].nodes()[1].is_ground());
    }

    #[test]
    fn test_source_forms() {
        let parsed = parse("t\nv1 1 0 AC 2 90\nI1 0 1 DC 0 AC 3\nV2 2 0 5\n");
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let c = &parsed.circuit;
        match &c.components()[0] {
            Component::VoltageSource(v) => {
                assert_eq!(v.base.name, "V1");
                assert_relative_eq!(v.magnitude, 2.0);
                assert_relative_eq!(v.phase, 90.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &c.components()[1] {
            Component::CurrentSource(i) => {
                assert_relative_eq!(i.magnitude, 3.0);
                assert_relative_eq!(i.phase, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(c.components()[2].component_type(), ComponentType::VoltageSource);
    }

    #[test]
    fn test_dependent_sources() {
        let netlist = "amp\n\
            F1 2 0 VSENSE 50\n\
            VSENSE 1 3 0\n\
            E1 4 0 1 0 10\n\
            G1 4 0 2 0 1m\n\
            H1 5 0 VSENSE 100\n";
        let parsed = parse(netlist);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let c = &parsed.circuit;
        let vsense = c.find_component("VSENSE").unwrap();
        let f1 = c.component(c.find_component("F1").unwrap()).unwrap();
        assert_eq!(f1.controller(), Some(vsense));
        assert_eq!(f1.gain().unwrap().symbol, "beta1");
        let e1 = c.component(c.find_component("E1").unwrap()).unwrap();
        assert_eq!(e1.gain().unwrap().symbol, "mu2");
        let g1 = c.component(c.find_component("G1").unwrap()).unwrap();
        assert_relative_eq!(g1.gain().unwrap().value, 1e-3);
        let h1 = c.component(c.find_component("H1").unwrap()).unwrap();
        assert_eq!(h1.controller(), Some(vsense));
    }

    #[test]
    fn test_unresolved_controller_removed() {
        let parsed = parse("t\nR1 1 0 1k\nF1 1 0 VX 2\nV1 1 0 AC 1\nH1 1 0 V1 3\n");
        let c = &parsed.circuit;
        assert_eq!(c.component_count(), 2);
        assert!(c.find_component("F1").is_none());
        assert!(c.find_component("H1").is_none());
        assert_eq!(parsed.diagnostics.len(), 2);
        assert!(parsed
            .diagnostics
            .iter()
            .all(|d| matches!(d, CircuitError::UnresolvedController { .. })));
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let parsed = parse("t\nQ1 1 2 3\nR1 1 0 abc\nR2 1\nR3 1 0 1k\nR3 1 0 2k\nR4 a-b 0 1\n");
        let c = &parsed.circuit;
        assert_eq!(c.component_count(), 1);
        assert_eq!(parsed.diagnostics.len(), 5);
        assert!(matches!(
            parsed.diagnostics[0],
            CircuitError::UnknownComponentType { line: 2, .. }
        ));
        assert!(matches!(
            parsed.diagnostics[1],
            CircuitError::InvalidValue { line: 3, .. }
        ));
        assert!(matches!(parsed.diagnostics[2], CircuitError::ParseError { line: 4, .. }));
        assert!(matches!(
            parsed.diagnostics[3],
            CircuitError::DuplicateComponent { .. }
        ));
        assert!(matches!(parsed.diagnostics[4], CircuitError::ParseError { line: 7, .. }));
    }

    #[test]
    fn test_nodes_of_skipped_lines_are_dropped() {
        let parsed = parse("t\nV1 1 0 AC 1\nR1 1 2 1k\nR2 2 0 1k\nR1 3 0 1k\nF1 4 2 VX 2\nR3 5 x\n");
        assert_eq!(parsed.diagnostics.len(), 3);
        let c = &parsed.circuit;
        assert_eq!(c.nodes(), &["NV0", "NV1", "NV2"]);
        assert_eq!(c.component_count(), 3);
        assert_eq!(c.components()[2].nodes(), [NodeId(2), NodeId::GROUND]);
    }

    #[test]
    fn test_stops_at_end_and_handles_gnd() {
        let parsed = parse("t\nR1 1 GND 1k\n.end\nR2 1 0 1k\n");
        assert_eq!(parsed.circuit.component_count(), 1);
        assert!(parsed.circuit.components()[0].nodes()[1].is_ground());
    }

    #[test]
    fn test_capacitor_suffix() {
        let parsed = parse("t\nC1 1 2 4.7U\n");
        assert_relative_eq!(parsed.circuit.components()[0].numeric_value().unwrap(), 4.7e-6);
    }
}
