//! Symbolic analyses built on top of the equation generator.
//!
//! Every analysis follows the same pattern: validate the request, copy the
//! circuit, mutate the copy (remove or short an element, insert a
//! [`TestSource`], ...), add equations that switch the other independent
//! sources off, then solve and evaluate the requested expression. The
//! borrowed circuit is never modified and a failed step returns an error
//! without partial results.
//!
//! # Example
//!
//! ```
//! use symcir::analysis::Analyzer;
//! use symcir::netlist;
//! use symcir::symbolic::EliminationSolver;
//!
//! let parsed = netlist::parse("divider\nV1 A 0 AC 1 0\nR1 A B 1k\nR2 B 0 1k\n");
//! let solver = EliminationSolver::new();
//! let analyzer = Analyzer::new(&parsed.circuit, &solver);
//! assert_eq!(analyzer.evaluate("NVB/NVA").unwrap(), "R2/(R1 + R2)");
//! ```

mod test_source;

pub use test_source::TestSource;

use log::debug;

use crate::circuit::{Circuit, ComponentId, EquationSet, NodeId};
use crate::components::{Component, ComponentType, ShortCircuit, POSITIVE};
use crate::error::{CircuitError, Result};
use crate::symbolic::SymbolicSolver;

/// Extra Element Theorem parameters for a passive element with impedance Z:
///
/// `H = Hinf * (1 + Zn/Z) / (1 + Zd/Z) = H0 * (1 + Z/Zn) / (1 + Z/Zd)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EetParameters {
    /// Transfer function with the element shorted
    pub h0: String,
    /// Transfer function with the element removed
    pub h_inf: String,
    /// Driving point impedance at the element's port, input off
    pub zd: String,
    /// Impedance at the element's port with the output nulled
    pub zn: String,
}

/// Feedback theorem parameters for a dependent source:
///
/// `H = H0 * (1 + Tn) / (1 + T) = Hinf * (1 + 1/Tn) / (1 + 1/T)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackParameters {
    /// Transfer function with the controlling signal nulled
    pub h0: String,
    /// Transfer function with the dependent source's output nulled
    pub h_inf: String,
    /// Loop gain, input off
    pub t: String,
    /// Null loop gain, output nulled
    pub tn: String,
}

/// Runs analyses on a circuit with an injected solver.
pub struct Analyzer<'a> {
    circuit: &'a Circuit,
    solver: &'a dyn SymbolicSolver,
}

impl<'a> Analyzer<'a> {
    pub fn new(circuit: &'a Circuit, solver: &'a dyn SymbolicSolver) -> Self {
        Self { circuit, solver }
    }

    pub fn circuit(&self) -> &Circuit {
        self.circuit
    }

    /// Solve the circuit with all sources as parameters and evaluate `function`.
    pub fn evaluate(&self, function: &str) -> Result<String> {
        self.check_circuit()?;
        self.solve(self.circuit, function, &EquationSet::new(), &[])
    }

    /// Transfer function with N injected inputs and N-1 nulled signals.
    ///
    /// Independent sources not in `inputs` are switched off. Each entry of
    /// `nulls` is forced to zero and the values of all inputs except the
    /// last become unknowns, so `function` is expressed in terms of the last
    /// input only.
    pub fn evaluate_nulled(
        &self,
        function: &str,
        inputs: &[ComponentId],
        nulls: &[&str],
    ) -> Result<String> {
        self.check_circuit()?;
        if inputs.len() != nulls.len() + 1 {
            return Err(CircuitError::InvalidNulling {
                message: format!(
                    "{} inputs need {} nulled signals, got {}",
                    inputs.len(),
                    inputs.len().saturating_sub(1),
                    nulls.len()
                ),
            });
        }

        let mut names = Vec::with_capacity(inputs.len());
        for &input in inputs {
            let source = self.independent_source(input)?;
            if names.contains(&source.name()) {
                return Err(CircuitError::InvalidNulling {
                    message: format!("'{}' is listed twice", source.name()),
                });
            }
            names.push(source.name());
        }

        let mut aux = EquationSet::new();
        for component in self.circuit.components() {
            if component.component_type().is_independent_source()
                && !names.contains(&component.name())
            {
                aux.pin_to_zero(component.value_symbol());
            }
        }
        for null in nulls {
            aux.push(*null, "0");
        }
        let extra: Vec<String> = inputs[..nulls.len()]
            .iter()
            .map(|&id| self.circuit.component(id).map(|c| c.value_symbol().to_string()))
            .collect::<Result<_>>()?;

        self.solve(self.circuit, function, &aux, &extra)
    }

    /// Impedance seen between `pos` and `neg`.
    ///
    /// Independent sources connected directly across the probe nodes are
    /// removed, all others are switched off, and a unit test source is
    /// inserted between the nodes.
    pub fn input_impedance(&self, pos: NodeId, neg: NodeId) -> Result<String> {
        self.check_circuit()?;
        self.circuit.node_name(pos)?;
        self.circuit.node_name(neg)?;
        if pos == neg {
            return Err(CircuitError::InvalidProbe {
                message: "both probe terminals are the same node".to_string(),
            });
        }

        let mut c = self.circuit.clone();
        for index in (0..c.component_count()).rev() {
            let id = ComponentId(index);
            let component = c.component(id)?;
            let nodes = component.nodes();
            if component.component_type().is_independent_source()
                && (nodes == [pos, neg] || nodes == [neg, pos])
            {
                debug!("removing {} across the probe nodes", component.name());
                c.delete_component(id)?;
            }
        }
        if c.is_empty() {
            return Err(CircuitError::EmptyCircuit);
        }

        let aux = sources_off(&c, None);
        let test = TestSource::insert(&mut c, pos, neg)?;
        let function = port_impedance(&c, pos, neg, &test)?;
        self.solve(&c, &function, &aux, &[])
    }

    /// Extra Element Theorem parameters of the passive `element` for the
    /// transfer function `output / input`.
    pub fn apply_eet(
        &self,
        input: ComponentId,
        output: &str,
        element: ComponentId,
    ) -> Result<EetParameters> {
        self.check_circuit()?;
        let input_name = self.independent_source(input)?.name().to_string();
        let input_symbol = self.circuit.component(input)?.value_symbol().to_string();
        let extra = self.circuit.component(element)?;
        if !extra.component_type().is_passive() {
            return Err(CircuitError::NotPassive {
                name: extra.name().to_string(),
            });
        }
        let [node1, node2] = extra.nodes();
        let transfer = format!("({})/({})", output, input_symbol);

        let mut c = self.circuit.clone();
        c.delete_component(element)?;
        let aux = sources_off(&c, Some(&input_name));

        debug!("EET: element {} removed", extra.name());
        let h_inf = self.solve(&c, &transfer, &aux, &[])?;

        debug!("EET: element {} shorted", extra.name());
        let short_name = c.unique_component_name(ComponentType::ShortCircuit);
        let short = c.add_component(Component::ShortCircuit(ShortCircuit::new(
            short_name,
            [node1, node2],
        )))?;
        let h0 = self.solve(&c, &transfer, &aux, &[])?;
        c.delete_component(short)?;

        let test = TestSource::insert(&mut c, node1, node2)?;
        let impedance = port_impedance(&c, node1, node2, &test)?;

        debug!("EET: driving point impedance");
        let mut input_off = aux.clone();
        input_off.pin_to_zero(&input_symbol);
        let zd = self.solve(&c, &impedance, &input_off, &[])?;

        debug!("EET: null driving point impedance");
        let mut nulled = aux;
        nulled.push(output, "0");
        let zn = self.solve(&c, &impedance, &nulled, &[test.value_symbol])?;

        Ok(EetParameters { h0, h_inf, zd, zn })
    }

    /// Feedback theorem parameters of `dependent` for the transfer function
    /// `output / input`.
    ///
    /// A test source is placed in series with a voltage-output source or in
    /// parallel with a current-output source. The signal entering the test
    /// source is `sigX`, the dependent source's contribution is `sigY`.
    pub fn feedback_parameters(
        &self,
        input: ComponentId,
        output: &str,
        dependent: ComponentId,
    ) -> Result<FeedbackParameters> {
        self.check_circuit()?;
        let input_name = self.independent_source(input)?.name().to_string();
        let input_symbol = self.circuit.component(input)?.value_symbol().to_string();
        let dep = self.circuit.component(dependent)?;
        let dep_type = dep.component_type();
        if !dep_type.is_dependent_source() {
            return Err(CircuitError::NotDependentSource {
                name: dep.name().to_string(),
            });
        }

        let mut c = self.circuit.clone();
        let aux = sources_off(&c, Some(&input_name));
        let (test, sig_x, sig_y) = if dep_type.has_voltage_output() {
            setup_series_test(&mut c, dependent)?
        } else {
            setup_parallel_test(&mut c, dependent)?
        };
        debug!("feedback: sigX = {}, sigY = {}", sig_x, sig_y);

        let transfer = format!("({})/({})", output, input_symbol);
        let loop_gain = format!("({})/({})", sig_y, sig_x);
        let test_value = [test.value_symbol];

        let mut x_nulled = aux.clone();
        x_nulled.push(sig_x.as_str(), "0");
        let h0 = self.solve(&c, &transfer, &x_nulled, &test_value)?;

        let mut y_nulled = aux.clone();
        y_nulled.push(sig_y.as_str(), "0");
        let h_inf = self.solve(&c, &transfer, &y_nulled, &test_value)?;

        let mut input_off = aux.clone();
        input_off.pin_to_zero(&input_symbol);
        let t = self.solve(&c, &loop_gain, &input_off, &[])?;

        let mut output_nulled = aux;
        output_nulled.push(output, "0");
        let tn = self.solve(&c, &loop_gain, &output_nulled, &test_value)?;

        Ok(FeedbackParameters { h0, h_inf, t, tn })
    }

    fn check_circuit(&self) -> Result<()> {
        if self.circuit.is_empty() {
            return Err(CircuitError::EmptyCircuit);
        }
        Ok(())
    }

    fn independent_source(&self, id: ComponentId) -> Result<&'a Component> {
        let component = self.circuit.component(id)?;
        if !component.component_type().is_independent_source() {
            return Err(CircuitError::NotIndependentSource {
                name: component.name().to_string(),
            });
        }
        Ok(component)
    }

    /// Build the circuit equations plus `aux`, solve, and evaluate `function`.
    fn solve(
        &self,
        circuit: &Circuit,
        function: &str,
        aux: &EquationSet,
        extra_unknowns: &[String],
    ) -> Result<String> {
        let mut set = circuit.generate_equations()?;
        set.extend(aux.clone());
        for unknown in extra_unknowns {
            set.push_unknown(unknown.as_str());
        }
        let solution = self.solver.solve_equations(&set)?;
        let result = self.solver.evaluate(function, &solution)?;
        debug!("{} = {}", function, result);
        Ok(result)
    }
}

/// `value = 0` for every independent source except `keep`.
fn sources_off(circuit: &Circuit, keep: Option<&str>) -> EquationSet {
    let mut set = EquationSet::new();
    for component in circuit.components() {
        if component.component_type().is_independent_source() && Some(component.name()) != keep {
            set.pin_to_zero(component.value_symbol());
        }
    }
    set
}

/// `(V(pos) - V(neg)) / (-i_test)`.
fn port_impedance(circuit: &Circuit, pos: NodeId, neg: NodeId, test: &TestSource) -> Result<String> {
    Ok(format!(
        "({} - {})/(-({}))",
        circuit.node_name(pos)?,
        circuit.node_name(neg)?,
        test.current_symbol
    ))
}

/// Break the output of a voltage-output source with a series test source.
fn setup_series_test(
    circuit: &mut Circuit,
    dependent: ComponentId,
) -> Result<(TestSource, String, String)> {
    let [orig_pos, neg] = circuit.component(dependent)?.nodes();
    let value = circuit.component(dependent)?.value_symbol().to_string();

    let node = circuit.create_node();
    circuit.component_mut(dependent)?.set_terminal(POSITIVE, node);
    let test = TestSource::insert(circuit, node, orig_pos)?;

    let sig_x = format!(
        "{} - {}",
        circuit.node_name(orig_pos)?,
        circuit.node_name(neg)?
    );
    let sig_y = format!("-({})", value);
    Ok((test, sig_x, sig_y))
}

/// Load the output of a current-output source with a parallel test source.
fn setup_parallel_test(
    circuit: &mut Circuit,
    dependent: ComponentId,
) -> Result<(TestSource, String, String)> {
    let [pos, neg] = circuit.component(dependent)?.nodes();
    let current = circuit.component(dependent)?.current_symbol().to_string();

    let test = TestSource::insert(circuit, pos, neg)?;
    let sig_x = format!("{} + {}", current, test.current_symbol);
    let sig_y = format!("-({})", current);
    Ok((test, sig_x, sig_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;
    use crate::symbolic::EliminationSolver;

    fn circuit(text: &str) -> Circuit {
        let parsed = netlist::parse(text);
        assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
        parsed.circuit
    }

    fn id(c: &Circuit, name: &str) -> ComponentId {
        c.find_component(name).unwrap()
    }

    const DIVIDER: &str = "divider\nV1 A 0 AC 1 0\nR1 A B 1k\nR2 B 0 1k\n";

    #[test]
    fn test_evaluate_divider() {
        let c = circuit(DIVIDER);
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        assert_eq!(analyzer.evaluate("NVB/NVA").unwrap(), "R2/(R1 + R2)");
        assert_eq!(analyzer.evaluate("i_R1").unwrap(), "V1/(R1 + R2)");
    }

    #[test]
    fn test_evaluate_empty() {
        let c = Circuit::new();
        let solver = EliminationSolver::new();
        assert!(matches!(
            Analyzer::new(&c, &solver).evaluate("NV0"),
            Err(CircuitError::EmptyCircuit)
        ));
    }

    #[test]
    fn test_input_impedance() {
        let c = circuit(DIVIDER);
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        let a = c.find_node("NVA").unwrap();
        let b = c.find_node("NVB").unwrap();
        assert_eq!(analyzer.input_impedance(a, NodeId::GROUND).unwrap(), "R1 + R2");
        // Seen from B, the source shorts R1 to ground.
        assert_eq!(
            analyzer.input_impedance(b, NodeId::GROUND).unwrap(),
            "R1*R2/(R1 + R2)"
        );
        assert!(matches!(
            analyzer.input_impedance(a, a),
            Err(CircuitError::InvalidProbe { .. })
        ));
        assert_eq!(c, circuit(DIVIDER));
    }

    #[test]
    fn test_input_impedance_capacitor() {
        let c = circuit("rc\nR1 A 0 1k\nC1 A 0 1n\n");
        let solver = EliminationSolver::new();
        let a = c.find_node("NVA").unwrap();
        let z = Analyzer::new(&c, &solver).input_impedance(a, NodeId::GROUND).unwrap();
        assert_eq!(z, "R1/(C1*R1*s + 1)");
    }

    #[test]
    fn test_evaluate_nulled() {
        // Two sources driving a resistive summing node.
        let c = circuit("sum\nV1 A 0 AC 1\nV2 B 0 AC 1\nR1 A C 1\nR2 B C 1\nR3 C 0 1\n");
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        let (v1, v2) = (id(&c, "V1"), id(&c, "V2"));

        // Single input: V2 switched off.
        let single = analyzer.evaluate_nulled("NVC/V1", &[v1], &[]).unwrap();
        assert_eq!(single, "R2*R3/(R1*R2 + R1*R3 + R2*R3)");

        // Nulling NVC with V1 solved for: NVC is zero regardless of V2.
        let nulled = analyzer.evaluate_nulled("NVC/V2", &[v1, v2], &["NVC"]).unwrap();
        assert_eq!(nulled, "0");

        assert!(matches!(
            analyzer.evaluate_nulled("NVC", &[v1, v2], &[]),
            Err(CircuitError::InvalidNulling { .. })
        ));
        assert!(matches!(
            analyzer.evaluate_nulled("NVC", &[v1, v1], &["NVA"]),
            Err(CircuitError::InvalidNulling { .. })
        ));
        assert!(matches!(
            analyzer.evaluate_nulled("NVC", &[id(&c, "R1")], &[]),
            Err(CircuitError::NotIndependentSource { .. })
        ));
    }

    #[test]
    fn test_eet_divider() {
        let c = circuit(DIVIDER);
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        let eet = analyzer.apply_eet(id(&c, "V1"), "NVB", id(&c, "R2")).unwrap();
        assert_eq!(eet.h_inf, "1");
        assert_eq!(eet.h0, "0");
        assert_eq!(eet.zd, "R1");
        assert_eq!(eet.zn, "0");
    }

    #[test]
    fn test_eet_rejects_source_without_mutation() {
        let c = circuit(DIVIDER);
        let before = c.clone();
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        assert!(matches!(
            analyzer.apply_eet(id(&c, "V1"), "NVB", id(&c, "V1")),
            Err(CircuitError::NotPassive { .. })
        ));
        assert!(matches!(
            analyzer.apply_eet(id(&c, "R1"), "NVB", id(&c, "R2")),
            Err(CircuitError::NotIndependentSource { .. })
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn test_feedback_vcvs() {
        // E1 amplifies (IN - FB); R1/R2 feed the output back, R3 feeds the input forward.
        let c = circuit("amp\nV1 IN 0 AC 1\nE1 A 0 IN FB 10\nR1 A FB 1k\nR2 FB 0 1k\nR3 IN FB 1k\n");
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        let fb = analyzer
            .feedback_parameters(id(&c, "V1"), "NVFB", id(&c, "E1"))
            .unwrap();
        assert_eq!(fb.h0, "R1*R2/(R1*R2 + R1*R3 + R2*R3)");
        assert_eq!(fb.h_inf, "1");
        assert_eq!(fb.t, "R2*R3*mu1/(R1*R2 + R1*R3 + R2*R3)");
        assert_eq!(fb.tn, "R3*mu1/R1");
        assert_eq!(c.component_count(), 5);
    }

    #[test]
    fn test_feedback_rejects_passive() {
        let c = circuit(DIVIDER);
        let solver = EliminationSolver::new();
        assert!(matches!(
            Analyzer::new(&c, &solver).feedback_parameters(id(&c, "V1"), "NVB", id(&c, "R1")),
            Err(CircuitError::NotDependentSource { .. })
        ));
    }

    #[test]
    fn test_feedback_vccs() {
        // Transconductor loaded by R1, output fed back to its own input.
        let c = circuit("gm\nI1 0 A AC 1\nR1 A 0 1\nG1 0 A 0 A 1m\n");
        let solver = EliminationSolver::new();
        let analyzer = Analyzer::new(&c, &solver);
        let fb = analyzer
            .feedback_parameters(id(&c, "I1"), "NVA", id(&c, "G1"))
            .unwrap();
        assert_eq!(fb.h0, "R1");
        assert_eq!(fb.h_inf, "0");
        assert_eq!(fb.t, "R1*gm1");
        assert_eq!(fb.tn, "0");
    }
}
