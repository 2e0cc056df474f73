//! Netlist export.

use crate::circuit::{Circuit, NodeId, NODE_PREFIX};
use crate::components::Component;
use crate::error::Result;

/// Render `circuit` as a netlist that [`parse`](super::parse) reads back.
///
/// Layout: title, `*`, one line per component, `*`, `.END`. Node names are
/// written without their `NV` prefix and ground as `0`.
pub fn write(circuit: &Circuit) -> Result<String> {
    let mut out = String::new();
    out.push_str(&circuit.title);
    out.push_str("\n*\n");
    for component in circuit.components() {
        out.push_str(&component_line(circuit, component)?);
        out.push('\n');
    }
    out.push_str("*\n.END\n");
    Ok(out)
}

fn node(circuit: &Circuit, id: NodeId) -> Result<String> {
    if id.is_ground() {
        return Ok("0".to_string());
    }
    let name = circuit.node_name(id)?;
    Ok(name.strip_prefix(NODE_PREFIX).unwrap_or(name).to_string())
}

fn component_line(circuit: &Circuit, component: &Component) -> Result<String> {
    let [pos, neg] = component.nodes();
    let head = format!(
        "{} {} {}",
        component.name(),
        node(circuit, pos)?,
        node(circuit, neg)?
    );

    let line = match component {
        Component::Resistor(_) | Component::Capacitor(_) | Component::Inductor(_) => {
            format!("{} {}", head, component.numeric_value().unwrap_or_default())
        }
        Component::ShortCircuit(_) => format!("{} AC 0 0", head),
        Component::VoltageSource(v) => format!("{} AC {} {}", head, v.magnitude, v.phase),
        Component::CurrentSource(i) => format!("{} AC {} {}", head, i.magnitude, i.phase),
        Component::Vcvs(_) | Component::Vccs(_) => {
            let control = component.control_nodes().unwrap_or([NodeId::GROUND; 2]);
            format!(
                "{} {} {} {}",
                head,
                node(circuit, control[0])?,
                node(circuit, control[1])?,
                component.gain().map(|g| g.value).unwrap_or_default()
            )
        }
        Component::Cccs(_) | Component::Ccvs(_) => {
            let gain = component.gain().map(|g| g.value).unwrap_or_default();
            match component.controller() {
                Some(id) => format!("{} {} {}", head, circuit.component(id)?.name(), gain),
                // A switched-off source has nothing to name; keep it visible.
                None => format!("* {} {} (no controlling source)", head, gain),
            }
        }
    };
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::parse;

    #[test]
    fn test_write_layout() {
        let parsed = parse("Filter\nV1 in 0 AC 1 0\nR1 in out 1k\nC1 out 0 4.7u\n");
        let text = write(&parsed.circuit).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Filter");
        assert_eq!(lines[1], "*");
        assert_eq!(lines[2], "V1 in 0 AC 1 0");
        assert_eq!(lines[3], "R1 in out 1000");
        assert!(lines[4].starts_with("C1 out 0 "));
        assert_eq!(&lines[5..], &["*", ".END"]);
    }

    #[test]
    fn test_write_dependent_sources() {
        let parsed = parse("t\nVS 1 2 0\nF1 3 0 VS 50\nE1 3 0 1 0 10\nR1 2 0 1\nR2 3 0 1\n");
        assert!(parsed.diagnostics.is_empty());
        let text = write(&parsed.circuit).unwrap();
        assert!(text.contains("VS 1 2 AC 0 0\n"));
        assert!(text.contains("F1 3 0 VS 50\n"));
        assert!(text.contains("E1 3 0 1 0 10\n"));
    }

    #[test]
    fn test_round_trip_connectivity() {
        let source = "t\nV1 a 0 AC 2 30\nR1 a b 1k\nVS b c 0\nH1 d 0 VS 5\nG1 d 0 a c 2m\nL1 c 0 1m\nI1 0 d AC 1\n";
        let first = parse(source).circuit;
        let second = parse(&write(&first).unwrap()).circuit;
        assert_eq!(first, second);
    }
}
