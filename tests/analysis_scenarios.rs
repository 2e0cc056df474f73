use std::f64::consts::PI;

use approx::assert_relative_eq;
use symcir::analysis::Analyzer;
use symcir::circuit::{Circuit, NodeId, Session};
use symcir::components::ComponentType;
use symcir::error::CircuitError;
use symcir::netlist;
use symcir::symbolic::{EliminationSolver, SolverError, SymbolicSolver};
use symcir::vars::VariableRegistry;

const DIVIDER: &str = "divider
V1 in 0 AC 1 0
R1 in out 1k
R2 out 0 1k
.end
";

const RC: &str = "low pass
V1 in 0 AC 1
R1 in out 1k
C1 out 0 1u
";

fn load(text: &str) -> Circuit {
    let parsed = netlist::parse(text);
    assert!(parsed.is_clean(), "{:?}", parsed.diagnostics);
    parsed.circuit
}

fn node(circuit: &Circuit, raw: &str) -> NodeId {
    circuit.find_node(&format!("NV{}", raw)).unwrap()
}

#[test]
fn test_divider_transfer_function() {
    let circuit = load(DIVIDER);
    assert!(circuit.is_linear());
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);

    assert_eq!(analyzer.evaluate("NVout/NVin").unwrap(), "R2/(R1 + R2)");
    assert_eq!(analyzer.evaluate("i_R2").unwrap(), "V1/(R1 + R2)");
}

#[test]
fn test_skipped_line_does_not_block_analysis() {
    let parsed = netlist::parse("t\nV1 1 0 AC 1\nR1 1 2 1k\nR2 2 0 1k\nR1 3 0 1k\n");
    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(parsed.circuit.find_node("NV3").is_none());

    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&parsed.circuit, &solver);
    assert_eq!(analyzer.evaluate("NV2/NV1").unwrap(), "R2/(R1 + R2)");
}

#[test]
fn test_floating_node_only_fails_when_asked_for() {
    let mut circuit = load(DIVIDER);
    let floating = circuit.create_node();
    let name = circuit.node_name(floating).unwrap().to_string();
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);

    assert_eq!(analyzer.evaluate("NVout/NVin").unwrap(), "R2/(R1 + R2)");
    match analyzer.evaluate(&name).unwrap_err() {
        CircuitError::Solver(SolverError::Underdetermined { unknowns }) => {
            assert_eq!(unknowns, vec![name]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rc_transfer_function_at_corner() {
    let circuit = load(RC);
    let solver = EliminationSolver::new();
    let h = Analyzer::new(&circuit, &solver).evaluate("NVout/NVin").unwrap();
    assert_eq!(h, "1/(C1*R1*s + 1)");

    let mut registry = VariableRegistry::new();
    circuit.build_variable_list(&mut registry);
    registry.set_frequency(1.0 / (2.0 * PI * 1e3 * 1e-6));
    let value = registry.evaluate(&h).unwrap();
    assert_relative_eq!(value.norm(), 1.0 / 2f64.sqrt(), epsilon = 1e-9);
    assert_relative_eq!(value.arg().to_degrees(), -45.0, epsilon = 1e-9);
}

#[test]
fn test_divider_magnitude_from_registry() {
    let circuit = load(DIVIDER);
    let mut registry = VariableRegistry::new();
    circuit.build_variable_list(&mut registry);

    let value = registry.evaluate("R2/(R1 + R2)").unwrap();
    assert_relative_eq!(value.re, 0.5, epsilon = 1e-12);
    assert_relative_eq!(value.im, 0.0, epsilon = 1e-12);
}

#[test]
fn test_input_impedance_is_repeatable() {
    let circuit = load(DIVIDER);
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);
    let (input, ground) = (node(&circuit, "in"), NodeId::GROUND);

    let first = analyzer.input_impedance(input, ground).unwrap();
    let second = analyzer.input_impedance(input, ground).unwrap();
    assert_eq!(first, "R1 + R2");
    assert_eq!(first, second);
    assert_eq!(circuit, load(DIVIDER));
}

#[test]
fn test_eet_on_source_leaves_circuit_untouched() {
    let circuit = load(DIVIDER);
    let before = circuit.clone();
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);
    let v1 = circuit.find_component("V1").unwrap();

    let error = analyzer.apply_eet(v1, "NVout", v1).unwrap_err();
    assert!(matches!(error, CircuitError::NotPassive { .. }));
    assert_eq!(circuit, before);
}

#[test]
fn test_eet_divider_parameters() {
    let circuit = load(DIVIDER);
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);
    let v1 = circuit.find_component("V1").unwrap();
    let r2 = circuit.find_component("R2").unwrap();

    let eet = analyzer.apply_eet(v1, "NVout", r2).unwrap();
    assert_eq!(eet.h_inf, "1");
    assert_eq!(eet.h0, "0");
    assert_eq!(eet.zd, "R1");
    assert_eq!(eet.zn, "0");
}

#[test]
fn test_eet_lead_network_recombines() {
    let circuit = load(
        "lead
V1 in 0 AC 1
R1 in out 1k
C1 in out 1n
R2 out 0 1k
",
    );
    let solver = EliminationSolver::new();
    let analyzer = Analyzer::new(&circuit, &solver);
    let v1 = circuit.find_component("V1").unwrap();
    let c1 = circuit.find_component("C1").unwrap();

    let direct = analyzer.evaluate("NVout/V1").unwrap();
    assert_eq!(direct, "(C1*R1*R2*s + R2)/(C1*R1*R2*s + R1 + R2)");

    let eet = analyzer.apply_eet(v1, "NVout", c1).unwrap();
    assert_eq!(eet.h_inf, "R2/(R1 + R2)");
    assert_eq!(eet.h0, "1");
    assert_eq!(eet.zd, "R1*R2/(R1 + R2)");
    assert_eq!(eet.zn, "R1");

    let z = circuit.component(c1).unwrap().impedance().unwrap();
    let from_h_inf = format!(
        "({})*(1 + ({})/({z}))/(1 + ({})/({z}))",
        eet.h_inf, eet.zn, eet.zd
    );
    let from_h0 = format!(
        "({})*(1 + ({z})/({}))/(1 + ({z})/({}))",
        eet.h0, eet.zn, eet.zd
    );
    assert_eq!(solver.simplify(&from_h_inf).unwrap(), direct);
    assert_eq!(solver.simplify(&from_h0).unwrap(), direct);
}

#[test]
fn test_zero_volt_source_becomes_short() {
    let circuit = load("ammeter\nV1 1 0 AC 0 0\nR1 1 0 1k\n");
    let v1 = circuit.find_component("V1").unwrap();
    assert_eq!(
        circuit.component(v1).unwrap().component_type(),
        ComponentType::ShortCircuit
    );
}

#[test]
fn test_controller_outlives_dependent_source() {
    let mut circuit = load(
        "cccs
V1 A 0 AC 1
VS A B AC 0 0
R1 B 0 1k
F1 0 B VS 2
",
    );
    let vs = circuit.find_component("VS").unwrap();
    let error = circuit.delete_component(vs).unwrap_err();
    assert!(matches!(error, CircuitError::ComponentInUse { .. }));

    let f1 = circuit.find_component("F1").unwrap();
    circuit.delete_component(f1).unwrap();
    let vs = circuit.find_component("VS").unwrap();
    circuit.delete_component(vs).unwrap();
    assert_eq!(circuit.component_count(), 2);
}

#[test]
fn test_netlist_round_trip() {
    let circuit = load(
        "mixed
V1 in 0 AC 2 90
I1 0 x AC 1m
R1 in x 4.7k
C1 x 0 4.7U
L1 x y 10m
E1 y 0 x 0 10
VS y z AC 0 0
H1 z 0 VS 50
",
    );
    let text = netlist::write(&circuit).unwrap();
    let reread = load(&text);
    assert_eq!(reread, circuit);
    assert_eq!(netlist::write(&reread).unwrap(), text);
}

#[test]
fn test_session_round_trip() {
    let circuit = load(RC);
    let mut registry = VariableRegistry::new();
    circuit.build_variable_list(&mut registry);
    registry.set_frequency(50.0);

    let json = Session::new(&circuit, &registry).to_json().unwrap();
    let (restored, restored_registry) = Session::from_json(&json).unwrap().restore().unwrap();

    assert_eq!(restored, circuit);
    assert_relative_eq!(restored_registry.frequency(), 50.0);
    assert_eq!(restored_registry.len(), registry.len());
    let value = restored_registry.evaluate("C1").unwrap();
    assert_relative_eq!(value.re, 1e-6, max_relative = 1e-12);
}
