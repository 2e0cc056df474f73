use proptest::prelude::*;
use symcir::circuit::{Circuit, NodeId};
use symcir::components::{Capacitor, Component, ComponentType, Inductor, Resistor};
use symcir::netlist::{self, parse_value};

fn arbitrary_passive_type() -> impl Strategy<Value = ComponentType> {
    prop_oneof![
        Just(ComponentType::Resistor),
        Just(ComponentType::Capacitor),
        Just(ComponentType::Inductor),
    ]
}

fn suffix_scale() -> impl Strategy<Value = (&'static str, f64)> {
    prop_oneof![
        Just(("", 1.0)),
        Just(("p", 1e-12)),
        Just(("n", 1e-9)),
        Just(("u", 1e-6)),
        Just(("m", 1e-3)),
        Just(("k", 1e3)),
        Just(("MEG", 1e6)),
        Just(("G", 1e9)),
    ]
}

proptest! {

#[test]
fn prop_unique_names_never_collide(
    types in prop::collection::vec(arbitrary_passive_type(), 1..30)
) {
    let mut circuit = Circuit::new();
    let a = circuit.find_add_node("A");
    for component_type in types {
        let name = circuit.unique_component_name(component_type);
        prop_assert!(circuit.find_component(&name).is_none());
        prop_assert!(name.starts_with(component_type.letter()));
        let nodes = [a, NodeId::GROUND];
        let component = match component_type {
            ComponentType::Capacitor => Component::Capacitor(Capacitor::new(name, nodes, 1e-9)),
            ComponentType::Inductor => Component::Inductor(Inductor::new(name, nodes, 1e-3)),
            _ => Component::Resistor(Resistor::new(name, nodes, 1e3)),
        };
        prop_assert!(circuit.add_component(component).is_ok());
    }
}

#[test]
fn prop_resistor_chain_survives_round_trip(
    values in prop::collection::vec(1e-3_f64..1e9_f64, 1..12)
) {
    let mut text = String::from("chain\n");
    for (i, value) in values.iter().enumerate() {
        text.push_str(&format!("R{} n{} n{} {}\n", i + 1, i, i + 1, value));
    }
    let parsed = netlist::parse(&text);
    prop_assert!(parsed.is_clean());
    prop_assert_eq!(parsed.circuit.component_count(), values.len());

    let written = netlist::write(&parsed.circuit).unwrap();
    let reread = netlist::parse(&written);
    prop_assert_eq!(reread.circuit, parsed.circuit);
}

#[test]
fn prop_suffix_scales_value(
    mantissa in 1u32..100_000,
    (suffix, scale) in suffix_scale()
) {
    let value = parse_value(&format!("{}{}", mantissa, suffix)).unwrap();
    let expected = mantissa as f64 * scale;
    prop_assert!((value - expected).abs() <= expected * 1e-12);
}

}
