//! Reference backend: fraction-free Gauss-Jordan elimination.
//!
//! Equations are cleared of denominators and eliminated over integer
//! polynomials (Bareiss). Each entry stays a minor of the original system, so
//! intermediate results grow no larger than the determinant, and the single
//! gcd per unknown happens when the solution is read off.

use std::collections::HashMap;

use log::{debug, trace};

use super::expr::{self, Expr};
use super::poly::{gcd, Poly};
use super::rational::RationalFunction;
use super::{SolutionSet, SolverConfig, SolverError, SymbolicSolver};
use crate::circuit::EquationSet;

/// Solves systems that are linear in their unknowns with exact arithmetic.
///
/// Every symbol that is not an unknown is treated as an independent
/// parameter, so results are rational functions of component values,
/// gain coefficients and `s`.
#[derive(Debug, Clone, Default)]
pub struct EliminationSolver {
    config: SolverConfig,
}

impl EliminationSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

/// `sum(coeffs[i] * unknown_i) + constant`.
#[derive(Debug, Clone)]
struct LinearForm {
    coeffs: HashMap<usize, RationalFunction>,
    constant: RationalFunction,
}

impl LinearForm {
    fn constant(value: RationalFunction) -> Self {
        Self {
            coeffs: HashMap::new(),
            constant: value,
        }
    }

    fn unknown(index: usize) -> Self {
        let mut coeffs = HashMap::new();
        coeffs.insert(index, RationalFunction::one());
        Self {
            coeffs,
            constant: RationalFunction::zero(),
        }
    }

    fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    fn add(mut self, other: LinearForm) -> Result<Self, SolverError> {
        for (index, coeff) in other.coeffs {
            let sum = match self.coeffs.get(&index) {
                Some(existing) => existing.add(&coeff)?,
                None => coeff,
            };
            if sum.is_zero() {
                self.coeffs.remove(&index);
            } else {
                self.coeffs.insert(index, sum);
            }
        }
        self.constant = self.constant.add(&other.constant)?;
        Ok(self)
    }

    fn neg(mut self) -> Result<Self, SolverError> {
        for coeff in self.coeffs.values_mut() {
            *coeff = coeff.neg()?;
        }
        self.constant = self.constant.neg()?;
        Ok(self)
    }

    fn scale(mut self, factor: &RationalFunction) -> Result<Self, SolverError> {
        if factor.is_zero() {
            return Ok(Self::constant(RationalFunction::zero()));
        }
        for coeff in self.coeffs.values_mut() {
            *coeff = coeff.mul(factor)?;
        }
        self.constant = self.constant.mul(factor)?;
        Ok(self)
    }
}

/// Symbol interpretation while converting an expression.
struct Context<'a> {
    unknowns: &'a HashMap<String, usize>,
    substitutions: &'a HashMap<String, RationalFunction>,
    source: &'a str,
}

impl Context<'_> {
    fn non_linear(&self) -> SolverError {
        SolverError::NonLinear {
            equation: self.source.to_string(),
        }
    }

    fn linearize(&self, expr: &Expr) -> Result<LinearForm, SolverError> {
        match expr {
            Expr::Number(text) => Ok(LinearForm::constant(RationalFunction::from_decimal(text)?)),
            Expr::Symbol(name) => {
                if let Some(&index) = self.unknowns.get(name) {
                    Ok(LinearForm::unknown(index))
                } else if let Some(value) = self.substitutions.get(name) {
                    Ok(LinearForm::constant(value.clone()))
                } else {
                    Ok(LinearForm::constant(RationalFunction::var(name)))
                }
            }
            Expr::Neg(inner) => self.linearize(inner)?.neg(),
            Expr::Add(a, b) => self.linearize(a)?.add(self.linearize(b)?),
            Expr::Sub(a, b) => self.linearize(a)?.add(self.linearize(b)?.neg()?),
            Expr::Mul(a, b) => {
                let lhs = self.linearize(a)?;
                let rhs = self.linearize(b)?;
                if lhs.is_constant() {
                    rhs.scale(&lhs.constant)
                } else if rhs.is_constant() {
                    lhs.scale(&rhs.constant)
                } else {
                    Err(self.non_linear())
                }
            }
            Expr::Div(a, b) => {
                let divisor = self.linearize(b)?;
                if !divisor.is_constant() {
                    return Err(self.non_linear());
                }
                let inverse = RationalFunction::one().div(&divisor.constant)?;
                self.linearize(a)?.scale(&inverse)
            }
            Expr::Pow(a, b) => {
                let exponent = self.linearize(b)?;
                let exponent = exponent
                    .is_constant()
                    .then(|| exponent.constant.as_integer())
                    .flatten()
                    .ok_or_else(|| SolverError::UnsupportedExponent {
                        expression: expr.to_string(),
                    })?;
                let base = self.linearize(a)?;
                if base.is_constant() {
                    Ok(LinearForm::constant(base.constant.pow(exponent)?))
                } else if exponent == 1 {
                    Ok(base)
                } else {
                    Err(self.non_linear())
                }
            }
            Expr::Call(name, _) => Err(SolverError::UnsupportedFunction { name: name.clone() }),
        }
    }

    fn rational(&self, expr: &Expr) -> Result<RationalFunction, SolverError> {
        let form = self.linearize(expr)?;
        if !form.is_constant() {
            return Err(self.non_linear());
        }
        Ok(form.constant)
    }
}

/// One row of the augmented matrix: `sum(coeffs[i] * x_i) + constant = 0`.
#[derive(Debug, Clone)]
struct Row {
    coeffs: Vec<Poly>,
    constant: Poly,
    source: String,
}

impl Row {
    /// Clear the denominators of a linear form so every entry is a polynomial.
    fn from_form(form: LinearForm, n: usize, source: String) -> Result<Self, SolverError> {
        let mut lcm = Poly::one();
        for value in form.coeffs.values().chain(std::iter::once(&form.constant)) {
            let den = value.denominator();
            if *den == lcm || den.as_constant() == Some(1) {
                continue;
            }
            let g = gcd(&lcm, den)?;
            lcm = lcm.mul(&exact(den, &g)?)?;
        }
        let clear = |value: &RationalFunction| -> Result<Poly, SolverError> {
            Ok(value.numerator().mul(&exact(&lcm, value.denominator())?)?)
        };

        let mut coeffs = vec![Poly::zero(); n];
        for (index, coeff) in &form.coeffs {
            coeffs[*index] = clear(coeff)?;
        }
        let constant = clear(&form.constant)?;
        Ok(Self {
            coeffs,
            constant,
            source,
        })
    }

    /// Fraction-free update: `(pivot * self - factor * pivot_row) / previous`.
    fn eliminate(
        &mut self,
        col: usize,
        pivot_row: &Row,
        pivot: &Poly,
        previous: &Poly,
    ) -> Result<(), SolverError> {
        let factor = std::mem::take(&mut self.coeffs[col]);
        let update = |value: &Poly, other: &Poly| -> Result<Poly, SolverError> {
            let mut next = if value.is_zero() {
                Poly::zero()
            } else {
                value.mul(pivot)?
            };
            if !factor.is_zero() && !other.is_zero() {
                next = next.sub(&factor.mul(other)?)?;
            }
            exact(&next, previous)
        };
        for (c, value) in self.coeffs.iter_mut().enumerate() {
            if c == col || (value.is_zero() && (factor.is_zero() || pivot_row.coeffs[c].is_zero())) {
                continue;
            }
            *value = update(value, &pivot_row.coeffs[c])?;
        }
        self.constant = update(&self.constant, &pivot_row.constant)?;
        Ok(())
    }
}

/// `value / divisor` where the division is known to leave no remainder.
fn exact(value: &Poly, divisor: &Poly) -> Result<Poly, SolverError> {
    if divisor.as_constant() == Some(1) || value.is_zero() {
        return Ok(value.clone());
    }
    value
        .div_exact(divisor)?
        .ok_or_else(|| SolverError::InexactDivision {
            dividend: value.to_string(),
            divisor: divisor.to_string(),
        })
}

/// Next pivot by the Markowitz rule: fewest other entries in its row and
/// column, then the smallest entry, then the earliest column and row.
fn choose_pivot(rows: &[Row], used: &[bool], pivoted: &[bool]) -> Option<(usize, usize)> {
    let open_rows: Vec<usize> = (0..rows.len()).filter(|&r| !used[r]).collect();
    let open_cols: Vec<usize> = (0..pivoted.len()).filter(|&c| !pivoted[c]).collect();

    let row_counts: Vec<usize> = rows
        .iter()
        .map(|row| open_cols.iter().filter(|&&c| !row.coeffs[c].is_zero()).count())
        .collect();
    let col_counts: Vec<usize> = (0..pivoted.len())
        .map(|c| open_rows.iter().filter(|&&r| !rows[r].coeffs[c].is_zero()).count())
        .collect();

    let mut best: Option<((usize, usize, usize, usize), (usize, usize))> = None;
    for &c in &open_cols {
        for &r in &open_rows {
            let entry = &rows[r].coeffs[c];
            if entry.is_zero() {
                continue;
            }
            let key = (
                (row_counts[r] - 1) * (col_counts[c] - 1),
                entry.term_count(),
                c,
                r,
            );
            if best.as_ref().map_or(true, |(k, _)| key < *k) {
                best = Some((key, (r, c)));
            }
        }
    }
    best.map(|(_, at)| at)
}

impl SymbolicSolver for EliminationSolver {
    fn solve_equations(&self, equations: &EquationSet) -> Result<SolutionSet, SolverError> {
        let budget = self.config.start();

        let unknown_names = equations.unknowns();
        let mut unknowns = HashMap::with_capacity(unknown_names.len());
        for (index, name) in unknown_names.iter().enumerate() {
            if unknowns.insert(name.clone(), index).is_some() {
                return Err(SolverError::DuplicateUnknown { name: name.clone() });
            }
        }
        let n = unknown_names.len();
        let no_substitutions = HashMap::new();

        let mut rows = Vec::with_capacity(equations.len());
        for equation in equations.iter() {
            let source = equation.to_string();
            trace!("{}", source);
            let ctx = Context {
                unknowns: &unknowns,
                substitutions: &no_substitutions,
                source: &source,
            };
            let lhs = ctx.linearize(&expr::parse(&equation.lhs)?)?;
            let rhs = ctx.linearize(&expr::parse(&equation.rhs)?)?;
            rows.push(Row::from_form(lhs.add(rhs.neg()?)?, n, source)?);
            budget.check()?;
        }

        debug!(
            "eliminating {} equations in {} unknowns",
            rows.len(),
            n
        );

        // Fraction-free Gauss-Jordan: every entry stays a polynomial and the
        // division by the previous pivot is exact.
        let mut used = vec![false; rows.len()];
        let mut pivots: Vec<Option<usize>> = vec![None; n];
        let mut pivoted = vec![false; n];
        let mut previous = Poly::one();

        while let Some((p, col)) = choose_pivot(&rows, &used, &pivoted) {
            budget.check()?;
            used[p] = true;
            pivoted[col] = true;
            pivots[col] = Some(p);

            let pivot_row = rows[p].clone();
            let pivot = pivot_row.coeffs[col].clone();
            trace!("pivot on {} in '{}'", unknown_names[col], pivot_row.source);
            for (r, row) in rows.iter_mut().enumerate() {
                if r == p {
                    continue;
                }
                budget.check()?;
                row.eliminate(col, &pivot_row, &pivot, &previous)?;
            }
            previous = pivot;
        }

        for (r, row) in rows.iter().enumerate() {
            if !used[r] && !row.constant.is_zero() {
                return Err(SolverError::Inconsistent {
                    equation: row.source.clone(),
                });
            }
        }

        let free: Vec<usize> = (0..n).filter(|&c| pivots[c].is_none()).collect();
        let mut solution = SolutionSet::new();
        for (col, pivot) in pivots.iter().enumerate() {
            let name = &unknown_names[col];
            let Some(p) = pivot else {
                solution.mark_undetermined(name.clone());
                continue;
            };
            let row = &rows[*p];
            if free.iter().any(|&f| !row.coeffs[f].is_zero()) {
                solution.mark_undetermined(name.clone());
                continue;
            }
            let value = RationalFunction::new(row.constant.neg()?, row.coeffs[col].clone())?;
            solution.insert(name.clone(), value.to_string());
        }
        if !solution.undetermined().is_empty() {
            debug!("undetermined unknowns: {:?}", solution.undetermined());
        }
        Ok(solution)
    }

    fn evaluate(&self, expression: &str, solution: &SolutionSet) -> Result<String, SolverError> {
        let parsed = expr::parse(expression)?;
        let empty = HashMap::new();

        let undetermined: Vec<String> = parsed
            .symbols()
            .into_iter()
            .filter(|name| solution.is_undetermined(name))
            .collect();
        if !undetermined.is_empty() {
            return Err(SolverError::Underdetermined {
                unknowns: undetermined,
            });
        }

        let mut substitutions = HashMap::new();
        for name in parsed.symbols() {
            if let Some(text) = solution.get(&name) {
                let ctx = Context {
                    unknowns: &empty,
                    substitutions: &HashMap::new(),
                    source: text,
                };
                let value = ctx.rational(&expr::parse(text)?)?;
                substitutions.insert(name, value);
            }
        }

        let ctx = Context {
            unknowns: &empty,
            substitutions: &substitutions,
            source: expression,
        };
        Ok(ctx.rational(&parsed)?.to_string())
    }

    fn simplify(&self, expression: &str) -> Result<String, SolverError> {
        let ctx = Context {
            unknowns: &HashMap::new(),
            substitutions: &HashMap::new(),
            source: expression,
        };
        Ok(ctx.rational(&expr::parse(expression)?)?.to_string())
    }
}
