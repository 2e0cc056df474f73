//! Rational functions over [`Poly`], kept in lowest terms.

use std::fmt;

use super::poly::{gcd, Poly};
use super::SolverError;

/// Quotient of two polynomials.
///
/// Canonical form: numerator and denominator share no common factor, the
/// denominator's leading coefficient is positive and zero is `0/1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalFunction {
    num: Poly,
    den: Poly,
}

impl RationalFunction {
    pub fn zero() -> Self {
        Self::from_poly(Poly::zero())
    }

    pub fn one() -> Self {
        Self::from_poly(Poly::one())
    }

    pub fn from_poly(num: Poly) -> Self {
        Self {
            num,
            den: Poly::one(),
        }
    }

    pub fn var(name: &str) -> Self {
        Self::from_poly(Poly::var(name))
    }

    /// Build `num / den` and reduce it.
    pub fn new(num: Poly, den: Poly) -> Result<Self, SolverError> {
        if den.is_zero() {
            return Err(SolverError::DivisionByZero);
        }
        if num.is_zero() {
            return Ok(Self::zero());
        }
        let g = gcd(&num, &den)?;
        let (mut num, mut den) = match (num.div_exact(&g)?, den.div_exact(&g)?) {
            (Some(n), Some(d)) => (n, d),
            _ => (num, den),
        };
        if matches!(den.leading(), Some((_, c)) if c < 0) {
            num = num.neg()?;
            den = den.neg()?;
        }
        Ok(Self { num, den })
    }

    /// Exact value of a decimal literal such as `4.7e-6`.
    pub fn from_decimal(text: &str) -> Result<Self, SolverError> {
        let invalid = || SolverError::InvalidNumber {
            text: text.to_string(),
        };
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => (
                &text[..pos],
                text[pos + 1..].parse::<i32>().map_err(|_| invalid())?,
            ),
            None => (text, 0),
        };
        let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{}{}", whole, frac);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: i128 = digits.parse().map_err(|_| invalid())?;
        let digits_after_point = i32::try_from(frac.len()).map_err(|_| invalid())?;
        let scale = exponent.checked_sub(digits_after_point).ok_or_else(invalid)?;
        let power = 10i128
            .checked_pow(scale.unsigned_abs())
            .ok_or_else(invalid)?;
        if scale >= 0 {
            let value = value.checked_mul(power).ok_or_else(invalid)?;
            Ok(Self::from_poly(Poly::constant(value)))
        } else {
            Self::new(Poly::constant(value), Poly::constant(power))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> &Poly {
        &self.den
    }

    /// Integer value, if the function is an integer constant.
    pub fn as_integer(&self) -> Option<i128> {
        if self.den == Poly::one() {
            self.num.as_constant()
        } else {
            None
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self, SolverError> {
        if self.den == other.den {
            return Self::new(self.num.add(&other.num)?, self.den.clone());
        }
        let num = self.num.mul(&other.den)?.add(&other.num.mul(&self.den)?)?;
        Self::new(num, self.den.mul(&other.den)?)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, SolverError> {
        self.add(&other.neg()?)
    }

    pub fn neg(&self) -> Result<Self, SolverError> {
        Ok(Self {
            num: self.num.neg()?,
            den: self.den.clone(),
        })
    }

    pub fn mul(&self, other: &Self) -> Result<Self, SolverError> {
        if self.is_zero() || other.is_zero() {
            return Ok(Self::zero());
        }
        // Both operands are reduced, so cancelling across them keeps the
        // product reduced without a gcd of the full products.
        let g1 = gcd(&self.num, &other.den)?;
        let g2 = gcd(&other.num, &self.den)?;
        let parts = (
            self.num.div_exact(&g1)?,
            other.den.div_exact(&g1)?,
            other.num.div_exact(&g2)?,
            self.den.div_exact(&g2)?,
        );
        let (Some(n1), Some(d2), Some(n2), Some(d1)) = parts else {
            return Self::new(self.num.mul(&other.num)?, self.den.mul(&other.den)?);
        };
        Self::signed(n1.mul(&n2)?, d1.mul(&d2)?)
    }

    pub fn div(&self, other: &Self) -> Result<Self, SolverError> {
        if other.is_zero() {
            return Err(SolverError::DivisionByZero);
        }
        let inverse = Self::signed(other.den.clone(), other.num.clone())?;
        self.mul(&inverse)
    }

    /// `num / den` for operands already free of common factors.
    fn signed(num: Poly, den: Poly) -> Result<Self, SolverError> {
        if den.is_zero() {
            return Err(SolverError::DivisionByZero);
        }
        if num.is_zero() {
            return Ok(Self::zero());
        }
        if matches!(den.leading(), Some((_, c)) if c < 0) {
            return Ok(Self {
                num: num.neg()?,
                den: den.neg()?,
            });
        }
        Ok(Self { num, den })
    }

    pub fn pow(&self, exponent: i128) -> Result<Self, SolverError> {
        let magnitude = u32::try_from(exponent.unsigned_abs()).map_err(|_| SolverError::Overflow)?;
        let raised = Self {
            num: self.num.pow(magnitude)?,
            den: self.den.pow(magnitude)?,
        };
        if exponent < 0 {
            Self::one().div(&raised)
        } else {
            Ok(raised)
        }
    }
}

/// Denominators that print without parentheses after `/`.
fn is_bare_factor(p: &Poly) -> bool {
    match p.single_term() {
        Some((m, 1)) => m.factor_count() == 1 && m.degree() == 1,
        Some((m, c)) => m.is_one() && c > 0,
        None => false,
    }
}

impl fmt::Display for RationalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == Poly::one() {
            return write!(f, "{}", self.num);
        }
        if self.num.term_count() > 1 {
            write!(f, "({})", self.num)?;
        } else {
            write!(f, "{}", self.num)?;
        }
        if is_bare_factor(&self.den) {
            write!(f, "/{}", self.den)
        } else {
            write!(f, "/({})", self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> RationalFunction {
        RationalFunction::var(name)
    }

    #[test]
    fn test_divider_form() {
        let sum = v("R1").add(&v("R2")).unwrap();
        let h = v("R2").div(&sum).unwrap();
        assert_eq!(h.to_string(), "R2/(R1 + R2)");
    }

    #[test]
    fn test_common_factor_cancels() {
        // (V1*R2/(R1 + R2)) / V1
        let sum = v("R1").add(&v("R2")).unwrap();
        let out = v("V1").mul(&v("R2")).unwrap().div(&sum).unwrap();
        assert_eq!(out.div(&v("V1")).unwrap(), v("R2").div(&sum).unwrap());
    }

    #[test]
    fn test_denominator_sign() {
        let h = v("a").div(&v("b").neg().unwrap()).unwrap();
        assert_eq!(h.to_string(), "-a/b");
    }

    #[test]
    fn test_product_denominator_parenthesized() {
        let h = RationalFunction::one()
            .div(&v("s").mul(&v("C1")).unwrap())
            .unwrap();
        assert_eq!(h.to_string(), "1/(C1*s)");
    }

    #[test]
    fn test_decimal_literals() {
        let x = RationalFunction::from_decimal("4.7e-6").unwrap();
        let expected = RationalFunction::new(Poly::constant(47), Poly::constant(10_000_000)).unwrap();
        assert_eq!(x, expected);
        assert_eq!(RationalFunction::from_decimal("2e3").unwrap().as_integer(), Some(2000));
        assert!(RationalFunction::from_decimal("1e").is_err());
        assert_eq!(
            RationalFunction::from_decimal("1.5e-2147483648"),
            Err(SolverError::InvalidNumber {
                text: "1.5e-2147483648".to_string()
            })
        );
    }

    #[test]
    fn test_cross_cancelling_product() {
        // (x/(x + y)) * ((x + y)/(2*x)) = 1/2
        let sum = v("x").add(&v("y")).unwrap();
        let a = v("x").div(&sum).unwrap();
        let b = sum.div(&v("x").mul(&RationalFunction::from_poly(Poly::constant(2))).unwrap()).unwrap();
        assert_eq!(a.mul(&b).unwrap().to_string(), "1/2");
        assert_eq!(a.div(&a).unwrap(), RationalFunction::one());
        assert_eq!(v("a").div(&v("b").neg().unwrap()).unwrap().to_string(), "-a/b");
    }

    #[test]
    fn test_negative_power() {
        let x = v("x").pow(-2).unwrap();
        assert_eq!(x.to_string(), "1/(x^2)");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            v("x").div(&RationalFunction::zero()),
            Err(SolverError::DivisionByZero)
        );
    }
}
