//! Sparse multivariate polynomials with exact integer coefficients.
//!
//! Terms are kept in a graded lexicographic order: higher total degree first,
//! then by exponent of the alphabetically earliest variable. The leading term
//! is the last key of the term map.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::SolverError;

/// Coefficient arithmetic left the `i128` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

impl From<Overflow> for SolverError {
    fn from(_: Overflow) -> Self {
        SolverError::Overflow
    }
}

type Coeff = i128;

fn checked(value: Option<Coeff>) -> Result<Coeff, Overflow> {
    value.ok_or(Overflow)
}

/// Non-negative greatest common divisor of two integers.
pub fn integer_gcd(a: Coeff, b: Coeff) -> Result<Coeff, Overflow> {
    let (mut x, mut y) = (a.unsigned_abs(), b.unsigned_abs());
    while y != 0 {
        let t = x % y;
        x = y;
        y = t;
    }
    Coeff::try_from(x).map_err(|_| Overflow)
}

/// Product of variables raised to positive powers, sorted by variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Monomial(Vec<(String, u32)>);

impl Monomial {
    pub fn one() -> Self {
        Self(Vec::new())
    }

    pub fn var(name: &str, exponent: u32) -> Self {
        if exponent == 0 {
            Self::one()
        } else {
            Self(vec![(name.to_string(), exponent)])
        }
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn degree(&self) -> u32 {
        self.0.iter().map(|(_, e)| *e).sum()
    }

    pub fn exponent(&self, var: &str) -> u32 {
        self.0
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, e)| *e)
            .unwrap_or(0)
    }

    /// Number of distinct variables.
    pub fn factor_count(&self) -> usize {
        self.0.len()
    }

    fn mul(&self, other: &Monomial) -> Monomial {
        let mut out = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, ea) = &self.0[i];
            let (b, eb) = &other.0[j];
            match a.cmp(b) {
                Ordering::Less => {
                    out.push((a.clone(), *ea));
                    i += 1;
                }
                Ordering::Greater => {
                    out.push((b.clone(), *eb));
                    j += 1;
                }
                Ordering::Equal => {
                    out.push((a.clone(), ea + eb));
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.0[i..]);
        out.extend_from_slice(&other.0[j..]);
        Monomial(out)
    }

    /// `self / other`, or `None` if some exponent of `other` is larger.
    fn div(&self, other: &Monomial) -> Option<Monomial> {
        let mut out = Vec::with_capacity(self.0.len());
        let mut j = 0;
        for (name, e) in &self.0 {
            if j < other.0.len() && other.0[j].0 < *name {
                return None;
            }
            if j < other.0.len() && other.0[j].0 == *name {
                let d = other.0[j].1;
                j += 1;
                match e.cmp(&d) {
                    Ordering::Less => return None,
                    Ordering::Equal => continue,
                    Ordering::Greater => out.push((name.clone(), e - d)),
                }
            } else {
                out.push((name.clone(), *e));
            }
        }
        if j < other.0.len() {
            return None;
        }
        Some(Monomial(out))
    }

    fn without(&self, var: &str) -> Monomial {
        Monomial(self.0.iter().filter(|(n, _)| n != var).cloned().collect())
    }

    fn lex_cmp(&self, other: &Monomial) -> Ordering {
        let (mut i, mut j) = (0, 0);
        loop {
            match (self.0.get(i), other.0.get(j)) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some((a, ea)), Some((b, eb))) => match a.cmp(b) {
                    Ordering::Equal if ea == eb => {
                        i += 1;
                        j += 1;
                    }
                    Ordering::Equal => return ea.cmp(eb),
                    // `self` carries the earlier variable, `other` has it at power 0
                    Ordering::Less => return Ordering::Greater,
                    Ordering::Greater => return Ordering::Less,
                },
            }
        }
    }
}

impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.degree()
            .cmp(&other.degree())
            .then_with(|| self.lex_cmp(other))
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, e)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            if *e == 1 {
                write!(f, "{}", name)?;
            } else {
                write!(f, "{}^{}", name, e)?;
            }
        }
        Ok(())
    }
}

/// Polynomial with integer coefficients. Zero coefficients are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, Coeff>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(1)
    }

    pub fn constant(value: Coeff) -> Self {
        Self::term(Monomial::one(), value)
    }

    pub fn var(name: &str) -> Self {
        Self::term(Monomial::var(name, 1), 1)
    }

    pub fn term(monomial: Monomial, coeff: Coeff) -> Self {
        let mut terms = BTreeMap::new();
        if coeff != 0 {
            terms.insert(monomial, coeff);
        }
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value of a constant polynomial.
    pub fn as_constant(&self) -> Option<Coeff> {
        match self.terms.len() {
            0 => Some(0),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_one())
                .map(|(_, c)| *c),
            _ => None,
        }
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Leading monomial and coefficient.
    pub fn leading(&self) -> Option<(&Monomial, Coeff)> {
        self.terms.iter().next_back().map(|(m, c)| (m, *c))
    }

    /// Single term of a monomial polynomial.
    pub fn single_term(&self) -> Option<(&Monomial, Coeff)> {
        if self.terms.len() == 1 {
            self.leading()
        } else {
            None
        }
    }

    fn add_term(&mut self, monomial: Monomial, coeff: Coeff) -> Result<(), Overflow> {
        if coeff == 0 {
            return Ok(());
        }
        let entry = self.terms.entry(monomial).or_insert(0);
        *entry = checked(entry.checked_add(coeff))?;
        if *entry == 0 {
            self.terms.retain(|_, c| *c != 0);
        }
        Ok(())
    }

    pub fn add(&self, other: &Poly) -> Result<Poly, Overflow> {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), *c)?;
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Poly) -> Result<Poly, Overflow> {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), checked(c.checked_neg())?)?;
        }
        Ok(out)
    }

    pub fn neg(&self) -> Result<Poly, Overflow> {
        let mut terms = BTreeMap::new();
        for (m, c) in &self.terms {
            terms.insert(m.clone(), checked(c.checked_neg())?);
        }
        Ok(Poly { terms })
    }

    fn mul_term(&self, monomial: &Monomial, coeff: Coeff) -> Result<Poly, Overflow> {
        let mut terms = BTreeMap::new();
        if coeff == 0 {
            return Ok(Poly { terms });
        }
        for (m, c) in &self.terms {
            terms.insert(m.mul(monomial), checked(c.checked_mul(coeff))?);
        }
        Ok(Poly { terms })
    }

    pub fn mul(&self, other: &Poly) -> Result<Poly, Overflow> {
        let mut out = Poly::zero();
        for (m, c) in &other.terms {
            for (n, d) in &self.terms {
                out.add_term(n.mul(m), checked(d.checked_mul(*c))?)?;
            }
        }
        Ok(out)
    }

    pub fn pow(&self, mut exponent: u32) -> Result<Poly, Overflow> {
        let mut base = self.clone();
        let mut out = Poly::one();
        while exponent > 0 {
            if exponent & 1 == 1 {
                out = out.mul(&base)?;
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.mul(&base)?;
            }
        }
        Ok(out)
    }

    /// Exact quotient `self / divisor`, or `None` when the division leaves a remainder.
    pub fn div_exact(&self, divisor: &Poly) -> Result<Option<Poly>, Overflow> {
        let Some((lead_m, lead_c)) = divisor.leading() else {
            return Ok(None);
        };
        let lead_m = lead_m.clone();
        let mut rem = self.clone();
        let mut quotient = Poly::zero();
        while let Some((m, c)) = rem.leading() {
            let Some(qm) = m.div(&lead_m) else {
                return Ok(None);
            };
            if checked(c.checked_rem(lead_c))? != 0 {
                return Ok(None);
            }
            let qc = checked(c.checked_div(lead_c))?;
            rem = rem.sub(&divisor.mul_term(&qm, qc)?)?;
            quotient.add_term(qm, qc)?;
        }
        Ok(Some(quotient))
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.terms
            .keys()
            .flat_map(|m| m.0.iter().map(|(n, _)| n.clone()))
            .collect()
    }

    pub fn degree_in(&self, var: &str) -> u32 {
        self.terms.keys().map(|m| m.exponent(var)).max().unwrap_or(0)
    }

    /// Coefficients of `self` viewed as a polynomial in `var`.
    fn coefficients_in(&self, var: &str) -> Result<BTreeMap<u32, Poly>, Overflow> {
        let mut out: BTreeMap<u32, Poly> = BTreeMap::new();
        for (m, c) in &self.terms {
            out.entry(m.exponent(var))
                .or_default()
                .add_term(m.without(var), *c)?;
        }
        Ok(out)
    }

    fn leading_coefficient_in(&self, var: &str) -> Result<Poly, Overflow> {
        let degree = self.degree_in(var);
        let mut out = Poly::zero();
        for (m, c) in &self.terms {
            if m.exponent(var) == degree {
                out.add_term(m.without(var), *c)?;
            }
        }
        Ok(out)
    }

    /// Gcd of all integer coefficients, always positive for non-zero polynomials.
    fn integer_content(&self) -> Result<Coeff, Overflow> {
        let mut g = 0;
        for c in self.terms.values() {
            g = integer_gcd(g, *c)?;
            if g == 1 {
                break;
            }
        }
        Ok(g)
    }

    fn content_in(&self, var: &str) -> Result<Poly, Overflow> {
        let mut g = Poly::zero();
        for coeff in self.coefficients_in(var)?.values() {
            g = gcd(&g, coeff)?;
            if g.as_constant() == Some(1) {
                break;
            }
        }
        Ok(g)
    }

    fn primitive_in(&self, var: &str) -> Result<Poly, Overflow> {
        let content = self.content_in(var)?;
        Ok(self.div_exact(&content)?.unwrap_or_else(|| self.clone()))
    }

    /// Sign-normalized copy whose leading coefficient is positive.
    pub fn normalized(&self) -> Result<Poly, Overflow> {
        match self.leading() {
            Some((_, c)) if c < 0 => self.neg(),
            _ => Ok(self.clone()),
        }
    }
}

/// Gcd of the single term `coeff * monomial` and `p`: the integer gcd times
/// each variable of `monomial` at the lowest power found in every term of `p`.
fn term_gcd(monomial: &Monomial, coeff: Coeff, p: &Poly) -> Result<Poly, Overflow> {
    let g = integer_gcd(coeff, p.integer_content()?)?;
    let mut factors = Vec::new();
    for (name, e) in &monomial.0 {
        let lowest = p
            .terms
            .keys()
            .map(|m| m.exponent(name))
            .min()
            .unwrap_or(0)
            .min(*e);
        if lowest > 0 {
            factors.push((name.clone(), lowest));
        }
    }
    Ok(Poly::term(Monomial(factors), g))
}

/// Pseudo-remainder of `a` by `b` with respect to `var`.
fn pseudo_remainder(a: &Poly, b: &Poly, var: &str) -> Result<Poly, Overflow> {
    let db = b.degree_in(var);
    let lb = b.leading_coefficient_in(var)?;
    let mut r = a.clone();
    while !r.is_zero() {
        let dr = r.degree_in(var);
        if dr < db {
            break;
        }
        let lr = r.leading_coefficient_in(var)?;
        let shift = Poly::term(Monomial::var(var, dr - db), 1);
        r = lb.mul(&r)?.sub(&lr.mul(&shift)?.mul(b)?)?;
    }
    Ok(r)
}

/// Greatest common divisor, normalized to a positive leading coefficient.
///
/// Recursive primitive remainder sequence over the alphabetically first
/// variable shared by both operands.
pub fn gcd(a: &Poly, b: &Poly) -> Result<Poly, Overflow> {
    if a.is_zero() {
        return b.normalized();
    }
    if b.is_zero() {
        return a.normalized();
    }
    if let Some((m, c)) = a.single_term() {
        return term_gcd(m, c, b);
    }
    if let Some((m, c)) = b.single_term() {
        return term_gcd(m, c, a);
    }

    let shared = a.variables();
    let shared: Option<String> = b
        .variables()
        .into_iter()
        .find(|v| shared.contains(v));

    let Some(var) = shared else {
        // A common factor can only use variables present in both.
        let g = integer_gcd(a.integer_content()?, b.integer_content()?)?;
        return Ok(Poly::constant(g));
    };

    let ca = a.content_in(&var)?;
    let cb = b.content_in(&var)?;
    let content = gcd(&ca, &cb)?;

    let (Some(mut p), Some(mut q)) = (a.div_exact(&ca)?, b.div_exact(&cb)?) else {
        return Ok(content);
    };
    if p.degree_in(&var) < q.degree_in(&var) {
        std::mem::swap(&mut p, &mut q);
    }

    loop {
        let r = pseudo_remainder(&p, &q, &var)?;
        if r.is_zero() {
            break;
        }
        if r.degree_in(&var) == 0 {
            return content.normalized();
        }
        p = q;
        q = r.primitive_in(&var)?;
    }

    content.mul(&q.primitive_in(&var)?)?.normalized()
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, (m, c)) in self.terms.iter().rev().enumerate() {
            let magnitude = c.unsigned_abs();
            match (i, *c < 0) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            if m.is_one() {
                write!(f, "{}", magnitude)?;
            } else if magnitude == 1 {
                write!(f, "{}", m)?;
            } else {
                write!(f, "{}*{}", magnitude, m)?;
            }
        }
        Ok(())
    }
}
