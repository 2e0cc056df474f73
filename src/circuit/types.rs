//! Core types for circuit representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every node voltage symbol.
pub const NODE_PREFIX: &str = "NV";

/// Symbol of the ground node voltage.
pub const GROUND_NAME: &str = "NV0";

/// Position of a node in the circuit's node list.
/// Node 0 is always ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The ground node (always index 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

/// Position of a component in the circuit's component list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Index update applied to every holder after a list element moves or disappears.
pub(crate) fn shift_after_removal(index: usize, removed: usize) -> usize {
    if index > removed {
        index - 1
    } else {
        index
    }
}

/// Index update for moving the element at `from` to position `to`.
pub(crate) fn shift_after_move(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}
