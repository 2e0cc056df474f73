//! Circuit graph representation.
//!
//! The [`Circuit`] struct holds the ordered nodes and components of a linear
//! circuit and turns them into an [`EquationSet`] for the symbolic solver.
//! [`session`] stores a circuit together with its variable registry.

mod equations;
mod graph;
pub mod session;
mod types;

pub use equations::{Equation, EquationSet};
pub use graph::{validate_component_name, Circuit};
pub use session::{CircuitRecord, ComponentRecord, Session};
pub use types::*;
