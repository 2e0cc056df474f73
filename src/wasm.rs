//! WASM bindings for symcir.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuit } from 'symcir';
//!
//! await init();
//!
//! const circuit = new WasmCircuit(`divider
//! V1 in 0 AC 1 0
//! R1 in out 1k
//! R2 out 0 1k
//! `);
//!
//! circuit.transfer_function("NVout/NVin");  // "R2/(R1 + R2)"
//! circuit.input_impedance("in", "0");       // "R1 + R2"
//! circuit.magnitude("R2/(R1 + R2)", 1000);  // 0.5
//! ```

use wasm_bindgen::prelude::*;

use crate::analysis::Analyzer;
use crate::circuit::{Circuit, NodeId, NODE_PREFIX};
use crate::error::CircuitError;
use crate::netlist;
use crate::symbolic::EliminationSolver;
use crate::vars::VariableRegistry;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(error: CircuitError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// A parsed circuit with the built-in solver.
#[wasm_bindgen]
pub struct WasmCircuit {
    circuit: Circuit,
    registry: VariableRegistry,
    diagnostics: Vec<String>,
    solver: EliminationSolver,
}

#[wasm_bindgen]
impl WasmCircuit {
    /// Read a netlist. Lines that cannot be used are listed by `diagnostics()`.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist_text: &str) -> Result<WasmCircuit, JsValue> {
        let parsed = netlist::parse(netlist_text);
        if parsed.circuit.is_empty() {
            return Err(js_error(CircuitError::EmptyCircuit));
        }
        let mut registry = VariableRegistry::new();
        parsed.circuit.build_variable_list(&mut registry);
        Ok(WasmCircuit {
            diagnostics: parsed.diagnostics.iter().map(|d| d.to_string()).collect(),
            circuit: parsed.circuit,
            registry,
            solver: EliminationSolver::new(),
        })
    }

    /// Messages for netlist lines that were skipped.
    #[wasm_bindgen]
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn title(&self) -> String {
        self.circuit.title.clone()
    }

    /// Closed-form value of `function`, e.g. `"NVout/NVin"`.
    #[wasm_bindgen]
    pub fn transfer_function(&self, function: &str) -> Result<String, JsValue> {
        Analyzer::new(&self.circuit, &self.solver)
            .evaluate(function)
            .map_err(js_error)
    }

    /// Impedance between two nodes given by their netlist names.
    #[wasm_bindgen]
    pub fn input_impedance(&self, pos: &str, neg: &str) -> Result<String, JsValue> {
        let pos = self.node(pos).map_err(js_error)?;
        let neg = self.node(neg).map_err(js_error)?;
        Analyzer::new(&self.circuit, &self.solver)
            .input_impedance(pos, neg)
            .map_err(js_error)
    }

    /// Magnitude of `expression` at `frequency` Hz.
    #[wasm_bindgen]
    pub fn magnitude(&mut self, expression: &str, frequency: f64) -> Result<f64, JsValue> {
        // JS callers can pass NaN or Infinity
        if !frequency.is_finite() {
            return Err(js_error(CircuitError::WasmError {
                message: format!("frequency must be finite, got {}", frequency),
            }));
        }
        self.registry.set_frequency(frequency);
        self.registry
            .evaluate(expression)
            .map(|value| value.norm())
            .map_err(js_error)
    }

    /// The circuit as a netlist.
    #[wasm_bindgen]
    pub fn to_netlist(&self) -> Result<String, JsValue> {
        netlist::write(&self.circuit).map_err(js_error)
    }
}

impl WasmCircuit {
    fn node(&self, raw: &str) -> Result<NodeId, CircuitError> {
        if raw == "0" || raw.eq_ignore_ascii_case("GND") {
            return Ok(NodeId::GROUND);
        }
        self.circuit
            .find_node(&format!("{}{}", NODE_PREFIX, raw))
            .ok_or_else(|| CircuitError::NodeNotFound {
                node: raw.to_string(),
            })
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
