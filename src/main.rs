//! symcir - symbolic linear circuit analysis
//!
//! Reads a Spice netlist and prints closed-form results.
//!
//! # Usage
//!
//! ```bash
//! symcir amp.cir tf "NVout/NVin" --frequency 1000
//! symcir amp.cir zin in 0
//! symcir amp.cir eet --input V1 --output NVout --element C1
//! symcir amp.cir feedback --input V1 --output NVout --source E1
//! RUST_LOG=debug symcir amp.cir equations
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::info;
use symcir::{
    analysis::Analyzer,
    circuit::{Circuit, ComponentId, NodeId, Session},
    error::{CircuitError, Result},
    netlist,
    symbolic::{EliminationSolver, SolverConfig},
    vars::VariableRegistry,
};

/// Symbolic analysis of linear circuits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the Spice netlist
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Also evaluate results numerically at this frequency in Hz
    #[arg(short, long, global = true)]
    frequency: Option<f64>,

    /// Give up on a single solve after this many seconds
    #[arg(short, long, global = true)]
    timeout: Option<f64>,

    /// Save the circuit and its variables to this session file
    #[arg(long, global = true, value_name = "PATH")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer function, with every source as a parameter
    Tf {
        /// Expression to evaluate, e.g. "NVout/NVin"
        function: String,
    },
    /// Transfer function with N inputs and N-1 nulled signals
    Null {
        /// Expression to evaluate
        function: String,
        /// Independent source names; the last one drives the result
        #[arg(short, long = "input", required = true)]
        inputs: Vec<String>,
        /// Signals forced to zero, one fewer than inputs
        #[arg(short, long = "null")]
        nulls: Vec<String>,
    },
    /// Impedance between two nodes
    Zin {
        /// Positive node, as written in the netlist
        pos: String,
        /// Negative node, as written in the netlist
        neg: String,
    },
    /// Extra Element Theorem parameters
    Eet {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        /// Passive element treated as the extra element
        #[arg(short, long)]
        element: String,
    },
    /// Feedback theorem parameters
    Feedback {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: String,
        /// Dependent source carrying the feedback
        #[arg(short, long)]
        source: String,
    },
    /// Print the circuit equations
    Equations,
    /// Print the circuit as a netlist
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the user-visible variables
    Vars,
}

fn timeout(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| CircuitError::InvalidTimeout { seconds })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    // Bad lines are logged by the parser and skipped
    let parsed = netlist::parse_file(&args.netlist)?;
    let circuit = parsed.circuit;
    info!(
        "loaded '{}': {} components, {} nodes",
        circuit.title,
        circuit.component_count(),
        circuit.node_count()
    );

    let mut registry = VariableRegistry::new();
    circuit.build_variable_list(&mut registry);
    if let Some(hz) = args.frequency {
        registry.set_frequency(hz);
    }

    let mut config = SolverConfig::new();
    if let Some(seconds) = args.timeout {
        config = config.with_timeout(timeout(seconds)?);
    }
    let solver = EliminationSolver::with_config(config);
    let analyzer = Analyzer::new(&circuit, &solver);

    let results: Vec<(&str, String)> = match &args.command {
        Command::Tf { function } => vec![("H", analyzer.evaluate(function)?)],
        Command::Null {
            function,
            inputs,
            nulls,
        } => {
            let inputs = inputs
                .iter()
                .map(|name| component(&circuit, name))
                .collect::<Result<Vec<_>>>()?;
            let nulls: Vec<&str> = nulls.iter().map(String::as_str).collect();
            vec![("H", analyzer.evaluate_nulled(function, &inputs, &nulls)?)]
        }
        Command::Zin { pos, neg } => {
            let (pos, neg) = (node(&circuit, pos)?, node(&circuit, neg)?);
            vec![("Zin", analyzer.input_impedance(pos, neg)?)]
        }
        Command::Eet {
            input,
            output,
            element,
        } => {
            let eet = analyzer.apply_eet(
                component(&circuit, input)?,
                output,
                component(&circuit, element)?,
            )?;
            vec![("H0", eet.h0), ("Hinf", eet.h_inf), ("Zd", eet.zd), ("Zn", eet.zn)]
        }
        Command::Feedback {
            input,
            output,
            source,
        } => {
            let fb = analyzer.feedback_parameters(
                component(&circuit, input)?,
                output,
                component(&circuit, source)?,
            )?;
            vec![("H0", fb.h0), ("Hinf", fb.h_inf), ("T", fb.t), ("Tn", fb.tn)]
        }
        Command::Equations => {
            println!("{}", circuit.generate_equations()?);
            Vec::new()
        }
        Command::Export { output } => {
            match output {
                Some(path) => netlist::write_file(&circuit, path)?,
                None => print!("{}", netlist::write(&circuit)?),
            }
            Vec::new()
        }
        Command::Vars => {
            for var in registry.visible() {
                println!("{} = {}", var.name, var.value);
            }
            Vec::new()
        }
    };

    for (label, expression) in &results {
        println!("{} = {}", label, expression);
        if args.frequency.is_some() {
            let value = registry.evaluate(expression)?;
            println!(
                "    |{}| = {:.6e}, arg = {:.3} deg",
                label,
                value.norm(),
                value.arg().to_degrees()
            );
        }
    }

    if let Some(path) = &args.session {
        Session::new(&circuit, &registry).save(path)?;
        info!("session saved to {}", path.display());
    }

    Ok(())
}

/// Resolve a node as written in the netlist (`0`, `GND` or a bare name).
fn node(circuit: &Circuit, raw: &str) -> Result<NodeId> {
    if raw == "0" || raw.eq_ignore_ascii_case("GND") {
        return Ok(NodeId::GROUND);
    }
    let name = format!("{}{}", symcir::circuit::NODE_PREFIX, raw);
    circuit
        .find_node(&name)
        .ok_or(CircuitError::NodeNotFound { node: raw.to_string() })
}

/// Resolve a component by name; netlist names are upper-case.
fn component(circuit: &Circuit, name: &str) -> Result<ComponentId> {
    circuit
        .find_component(&name.to_ascii_uppercase())
        .ok_or_else(|| CircuitError::ComponentNotFound {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_rejects_unusable_values() {
        assert_eq!(timeout(1.5).unwrap(), Duration::from_millis(1500));
        for seconds in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                timeout(seconds),
                Err(CircuitError::InvalidTimeout { .. })
            ));
        }
    }
}
