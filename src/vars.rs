//! Variable registry.
//!
//! Every symbol that can appear in a result (node voltages, branch currents,
//! component values, gain coefficients, the frequency variables) gets an
//! entry holding either a number or a function of other entries. The
//! registry evaluates result expressions numerically at the frequency `f`.
//!
//! The first three entries are always `f` (Hz), `w = 2*pi*f` and `s = j*w`.

use std::f64::consts::PI;
use std::fmt;

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, Result};
use crate::symbolic::expr::{self, is_valid_name, Expr};

/// Frequency in Hz.
pub const FREQUENCY: &str = "f";

/// Angular frequency.
pub const OMEGA: &str = "w";

/// Laplace variable.
pub const LAPLACE: &str = "s";

/// Names with a fixed meaning in expressions.
const RESERVED: [&str; 2] = ["j", "pi"];

/// Content of a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableValue {
    Number(f64),
    /// Expression in terms of other entries
    Function(String),
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Number(value) => write!(f, "{}", value),
            VariableValue::Function(definition) => write!(f, "{}", definition),
        }
    }
}

/// A named registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: VariableValue,
    /// Shown to the user (component values, coefficients, `f`)
    pub visible: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: VariableValue, visible: bool) -> Self {
        Self {
            name: name.into(),
            value,
            visible,
        }
    }
}

/// Ordered symbol table with numeric evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableRegistry {
    /// Create a registry holding only the frequency variables.
    pub fn new() -> Self {
        Self {
            variables: vec![
                Variable::new(FREQUENCY, VariableValue::Number(0.0), true),
                Variable::new(OMEGA, VariableValue::Function("2*pi*f".to_string()), false),
                Variable::new(LAPLACE, VariableValue::Function("j*w".to_string()), false),
            ],
        }
    }

    /// Rebuild a registry from stored entries. Frequency variables that are
    /// missing from `variables` keep their defaults.
    pub fn from_variables(variables: impl IntoIterator<Item = Variable>) -> Result<Self> {
        let mut registry = Self::new();
        for variable in variables {
            if variable.name == FREQUENCY && !matches!(variable.value, VariableValue::Number(_)) {
                return Err(CircuitError::InvalidVariable {
                    name: variable.name,
                    message: "frequency must be a number".to_string(),
                });
            }
            registry.insert(variable);
        }
        Ok(registry)
    }

    /// Add an entry, replacing any entry of the same name.
    pub fn insert(&mut self, variable: Variable) {
        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    fn check_assignable(name: &str) -> Result<()> {
        if !is_valid_name(name) || RESERVED.contains(&name) {
            return Err(CircuitError::InvalidVariable {
                name: name.to_string(),
                message: "not an assignable name".to_string(),
            });
        }
        Ok(())
    }

    fn visibility_of(&self, name: &str) -> bool {
        self.get(name).map_or(true, |v| v.visible)
    }

    /// Give `name` a numeric value.
    pub fn set_number(&mut self, name: &str, value: f64) -> Result<()> {
        Self::check_assignable(name)?;
        let visible = self.visibility_of(name);
        self.insert(Variable::new(name, VariableValue::Number(value), visible));
        Ok(())
    }

    /// Define `name` as a function of other entries.
    pub fn set_function(&mut self, name: &str, definition: &str) -> Result<()> {
        Self::check_assignable(name)?;
        if name == FREQUENCY {
            return Err(CircuitError::InvalidVariable {
                name: name.to_string(),
                message: "frequency must be a number".to_string(),
            });
        }
        expr::parse(definition).map_err(|e| CircuitError::InvalidVariable {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let visible = self.visibility_of(name);
        self.insert(Variable::new(
            name,
            VariableValue::Function(definition.to_string()),
            visible,
        ));
        Ok(())
    }

    /// Remove an entry. The frequency variables cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<Variable> {
        if [FREQUENCY, OMEGA, LAPLACE].contains(&name) {
            return Err(CircuitError::InvalidVariable {
                name: name.to_string(),
                message: "frequency variables cannot be removed".to_string(),
            });
        }
        let index = self
            .variables
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| CircuitError::InvalidVariable {
                name: name.to_string(),
                message: "no such variable".to_string(),
            })?;
        Ok(self.variables.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Entries meant for display.
    pub fn visible(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.visible)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Current analysis frequency in Hz.
    pub fn frequency(&self) -> f64 {
        match self.get(FREQUENCY).map(|v| &v.value) {
            Some(VariableValue::Number(f)) => *f,
            _ => 0.0,
        }
    }

    pub fn set_frequency(&mut self, hz: f64) {
        self.insert(Variable::new(FREQUENCY, VariableValue::Number(hz), true));
    }

    /// Evaluate an expression numerically.
    pub fn evaluate(&self, text: &str) -> Result<Complex64> {
        let parsed = expr::parse(text)?;
        let mut stack = Vec::new();
        self.eval(&parsed, text, &mut stack)
    }

    /// Numeric value of a single entry.
    pub fn evaluate_variable(&self, name: &str) -> Result<Complex64> {
        let mut stack = Vec::new();
        self.eval_symbol(name, name, &mut stack)
    }

    fn eval_symbol(&self, name: &str, source: &str, stack: &mut Vec<String>) -> Result<Complex64> {
        match name {
            "j" => return Ok(Complex64::i()),
            "pi" => return Ok(Complex64::new(PI, 0.0)),
            _ => {}
        }
        let variable = self
            .get(name)
            .ok_or_else(|| CircuitError::evaluation(source, format!("unknown symbol '{}'", name)))?;
        match &variable.value {
            VariableValue::Number(value) => Ok(Complex64::new(*value, 0.0)),
            VariableValue::Function(definition) => {
                if stack.iter().any(|n| n == name) {
                    debug!("recursion through {:?}", stack);
                    return Err(CircuitError::RecursiveDefinition {
                        name: name.to_string(),
                    });
                }
                stack.push(name.to_string());
                let parsed = expr::parse(definition)?;
                let value = self.eval(&parsed, definition, stack);
                stack.pop();
                value
            }
        }
    }

    fn eval(&self, expr: &Expr, source: &str, stack: &mut Vec<String>) -> Result<Complex64> {
        let value = match expr {
            Expr::Number(text) => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| CircuitError::evaluation(source, format!("bad number '{}'", text)))?;
                Complex64::new(value, 0.0)
            }
            Expr::Symbol(name) => self.eval_symbol(name, source, stack)?,
            Expr::Neg(inner) => -self.eval(inner, source, stack)?,
            Expr::Add(a, b) => self.eval(a, source, stack)? + self.eval(b, source, stack)?,
            Expr::Sub(a, b) => self.eval(a, source, stack)? - self.eval(b, source, stack)?,
            Expr::Mul(a, b) => self.eval(a, source, stack)? * self.eval(b, source, stack)?,
            Expr::Div(a, b) => {
                let numerator = self.eval(a, source, stack)?;
                let denominator = self.eval(b, source, stack)?;
                if denominator == Complex64::new(0.0, 0.0) {
                    return Err(CircuitError::evaluation(source, "division by zero"));
                }
                numerator / denominator
            }
            Expr::Pow(a, b) => {
                let base = self.eval(a, source, stack)?;
                let exponent = self.eval(b, source, stack)?;
                if exponent.im == 0.0 && exponent.re.fract() == 0.0 && exponent.re.abs() <= i32::MAX as f64 {
                    base.powi(exponent.re as i32)
                } else {
                    base.powc(exponent)
                }
            }
            Expr::Call(name, args) => {
                if args.len() != 1 {
                    return Err(CircuitError::evaluation(
                        source,
                        format!("{}() takes one argument", name),
                    ));
                }
                let x = self.eval(&args[0], source, stack)?;
                match name.as_str() {
                    "sqrt" => x.sqrt(),
                    "exp" => x.exp(),
                    "ln" => x.ln(),
                    "sin" => x.sin(),
                    "cos" => x.cos(),
                    "abs" => Complex64::new(x.norm(), 0.0),
                    "arg" => Complex64::new(x.arg(), 0.0),
                    "re" => Complex64::new(x.re, 0.0),
                    "im" => Complex64::new(x.im, 0.0),
                    other => {
                        return Err(CircuitError::evaluation(
                            source,
                            format!("unknown function '{}'", other),
                        ))
                    }
                }
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frequency_variables_first() {
        let registry = VariableRegistry::new();
        let names: Vec<_> = registry.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["f", "w", "s"]);
        assert_eq!(registry.visible().count(), 1);
    }

    #[test]
    fn test_laplace_variable() {
        let mut registry = VariableRegistry::new();
        registry.set_frequency(1000.0);
        let s = registry.evaluate_variable("s").unwrap();
        assert_relative_eq!(s.re, 0.0);
        assert_relative_eq!(s.im, 2.0 * PI * 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_divider_value() {
        let mut registry = VariableRegistry::new();
        registry.set_number("R1", 1000.0).unwrap();
        registry.set_number("R2", 3000.0).unwrap();
        let h = registry.evaluate("R2/(R1 + R2)").unwrap();
        assert_relative_eq!(h.re, 0.75);
        assert_relative_eq!(h.im, 0.0);
    }

    #[test]
    fn test_phasor_function() {
        let mut registry = VariableRegistry::new();
        registry.set_function("V1", "2*exp(j*pi*(90)/180)").unwrap();
        let v = registry.evaluate("V1").unwrap();
        assert_relative_eq!(v.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recursion_detected() {
        let mut registry = VariableRegistry::new();
        registry.set_function("a", "b + 1").unwrap();
        registry.set_function("b", "2*a").unwrap();
        assert!(matches!(
            registry.evaluate("a"),
            Err(CircuitError::RecursiveDefinition { .. })
        ));
    }

    #[test]
    fn test_repeated_reference_is_not_recursion() {
        let mut registry = VariableRegistry::new();
        registry.set_number("x", 2.0).unwrap();
        registry.set_function("y", "x*x").unwrap();
        let v = registry.evaluate("y + y").unwrap();
        assert_relative_eq!(v.re, 8.0);
    }

    #[test]
    fn test_errors() {
        let mut registry = VariableRegistry::new();
        assert!(registry.evaluate("unknown_symbol").is_err());
        assert!(registry.evaluate("1/0").is_err());
        assert!(registry.set_number("pi", 3.0).is_err());
        assert!(registry.set_function("f", "2").is_err());
        assert!(registry.set_function("g", "2 +").is_err());
        assert!(registry.remove("s").is_err());
        registry.set_number("x", 1.0).unwrap();
        assert_eq!(registry.remove("x").unwrap().name, "x");
    }

    #[test]
    fn test_from_variables_keeps_frequency_first() {
        let registry = VariableRegistry::from_variables(vec![
            Variable::new("R1", VariableValue::Number(10.0), true),
            Variable::new("f", VariableValue::Number(50.0), true),
        ])
        .unwrap();
        assert_eq!(registry.iter().next().map(|v| v.name.as_str()), Some("f"));
        assert_relative_eq!(registry.frequency(), 50.0);
        assert_eq!(registry.len(), 4);
    }
}
