//! Equation sets handed to the symbolic solver.

use std::fmt;

/// One equation, `lhs = rhs`, as solver text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub lhs: String,
    pub rhs: String,
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// Ordered equations plus the ordered list of unknowns to solve for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquationSet {
    equations: Vec<Equation>,
    unknowns: Vec<String>,
}

impl EquationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `lhs = rhs`.
    pub fn push(&mut self, lhs: impl Into<String>, rhs: impl Into<String>) {
        self.equations.push(Equation {
            lhs: lhs.into(),
            rhs: rhs.into(),
        });
    }

    pub fn push_unknown(&mut self, name: impl Into<String>) {
        self.unknowns.push(name.into());
    }

    /// Force `name` to zero and solve for it. Used to switch sources off and
    /// to null signals, keeping the system square.
    pub fn pin_to_zero(&mut self, name: &str) {
        self.push(name, "0");
        self.push_unknown(name);
    }

    /// Append all equations and unknowns of `other`.
    pub fn extend(&mut self, other: EquationSet) {
        self.equations.extend(other.equations);
        self.unknowns.extend(other.unknowns);
    }

    /// Remove the last equation whose left-hand side is `lhs`.
    pub fn remove_last_with_lhs(&mut self, lhs: &str) -> Option<Equation> {
        let index = self.equations.iter().rposition(|eq| eq.lhs == lhs)?;
        Some(self.equations.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Equation> {
        self.equations.iter()
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    /// Left-hand sides, in order.
    pub fn lhs(&self) -> impl Iterator<Item = &str> {
        self.equations.iter().map(|eq| eq.lhs.as_str())
    }

    /// Right-hand sides, in order.
    pub fn rhs(&self) -> impl Iterator<Item = &str> {
        self.equations.iter().map(|eq| eq.rhs.as_str())
    }

    pub fn unknowns(&self) -> &[String] {
        &self.unknowns
    }

    pub fn has_unknown(&self, name: &str) -> bool {
        self.unknowns.iter().any(|u| u == name)
    }

    /// Number of equations.
    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }
}

impl fmt::Display for EquationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for eq in &self.equations {
            writeln!(f, "{}", eq)?;
        }
        write!(f, "unknowns: {}", self.unknowns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_to_zero_adds_unknown() {
        let mut set = EquationSet::new();
        set.pin_to_zero("V1");
        assert_eq!(set.len(), 1);
        assert_eq!(set.equations()[0].to_string(), "V1 = 0");
        assert!(set.has_unknown("V1"));
    }

    #[test]
    fn test_remove_last_with_lhs() {
        let mut set = EquationSet::new();
        set.push("NV1", "0");
        set.push("x", "1");
        set.push("NV1", "2");
        let removed = set.remove_last_with_lhs("NV1").unwrap();
        assert_eq!(removed.rhs, "2");
        assert_eq!(set.lhs().collect::<Vec<_>>(), vec!["NV1", "x"]);
        assert!(set.remove_last_with_lhs("y").is_none());
    }
}
