//! # symcir
//!
//! Symbolic analysis of linear electrical circuits.
//!
//! This library provides:
//! - A Spice netlist reader and writer
//! - A circuit container with dependency-checked mutation
//! - Equation generation (KCL plus per-component constitutive equations)
//! - Closed-form transfer functions, input impedances, Extra Element
//!   Theorem and feedback theorem parameters
//! - A variable registry for numeric evaluation of symbolic results
//!
//! ## Architecture
//!
//! - [`netlist`] - Parser and writer for Spice netlists
//! - [`circuit`] - Nodes, components, equations and session persistence
//! - [`components`] - Component models (R, C, L, sources, dependent sources)
//! - [`analysis`] - Analyses that solve modified copies of a circuit
//! - [`symbolic`] - Solver interface and the built-in elimination solver
//! - [`vars`] - Variable registry and complex evaluation
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! symcir divider.cir tf "NVout/NVin" --frequency 1000
//! symcir divider.cir zin in 0
//! ```
//!
//! ### Library
//!
//! ```
//! use symcir::analysis::Analyzer;
//! use symcir::symbolic::EliminationSolver;
//!
//! let parsed = symcir::netlist::parse("RC\nV1 in 0 AC 1\nR1 in out 1k\nC1 out 0 1u\n");
//! let solver = EliminationSolver::new();
//! let h = Analyzer::new(&parsed.circuit, &solver).evaluate("NVout/NVin").unwrap();
//! assert_eq!(h, "1/(C1*R1*s + 1)");
//! ```
//!
//! ## Method
//!
//! Every component is a two-terminal element with a branch current symbol
//! `i_<name>` and a value symbol `<name>`. Node voltages are named `NV<node>`
//! with ground fixed as `NV0`. The equation set holds one KCL equation per
//! connected node and each component's constitutive equations; impedances
//! are written in the Laplace variable `s`.

pub mod analysis;
pub mod circuit;
pub mod components;
pub mod error;
pub mod netlist;
pub mod symbolic;
pub mod vars;

// Re-export main types for convenience
pub use analysis::Analyzer;
pub use circuit::Circuit;
pub use error::{CircuitError, Result};
pub use symbolic::{EliminationSolver, SymbolicSolver};
pub use vars::VariableRegistry;

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuit;
