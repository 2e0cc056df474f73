//! Expression grammar shared by the solver backend and the variable registry.
//!
//! ```text
//! expr    = term { ('+' | '-') term }
//! term    = unary { ('*' | '/') unary }
//! unary   = ('+' | '-') unary | power
//! power   = atom [ '^' unary ]
//! atom    = number | name [ '(' expr { ',' expr } ')' ] | '(' expr ')'
//! number  = digit+ ['.' digit*] [('e' | 'E') ['+' | '-'] digit+]
//! name    = (letter | '_') { letter | digit | '_' }
//! ```

use std::collections::BTreeSet;
use std::fmt;

use super::SolverError;

/// Parsed algebraic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written so exact backends can read it.
    Number(String),
    Symbol(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Binding strength used when printing.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Pow(..) => 4,
            Expr::Number(_) | Expr::Symbol(_) | Expr::Call(..) => 5,
        }
    }

    /// All symbol names referenced by the expression (function names excluded).
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) => inner.collect_symbols(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(text) | Expr::Symbol(text) => write!(f, "{}", text),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                write_operand(f, inner, inner.precedence() < 3)
            }
            Expr::Add(a, b) => {
                write_operand(f, a, false)?;
                write!(f, " + ")?;
                write_operand(f, b, false)
            }
            Expr::Sub(a, b) => {
                write_operand(f, a, false)?;
                write!(f, " - ")?;
                write_operand(f, b, b.precedence() <= 1)
            }
            Expr::Mul(a, b) => {
                write_operand(f, a, a.precedence() < 2)?;
                write!(f, "*")?;
                write_operand(f, b, b.precedence() < 2)
            }
            Expr::Div(a, b) => {
                write_operand(f, a, a.precedence() < 2)?;
                write!(f, "/")?;
                write_operand(f, b, b.precedence() <= 2)
            }
            Expr::Pow(a, b) => {
                write_operand(f, a, a.precedence() < 5)?;
                write!(f, "^")?;
                write_operand(f, b, b.precedence() < 3)
            }
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    OpenParen,
    CloseParen,
    Comma,
}

/// Returns true if `name` is usable as a symbol in the grammar above.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, SolverError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;
        let token = match ch {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            c if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let mut text = String::new();
                while i < chars.len() && chars[i].is_ascii_digit() {
                    text.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    text.push('.');
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        text.push(chars[i]);
                        i += 1;
                    }
                }
                // Exponent only when digits follow, so "2e" stays a product-free error.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        text.extend(&chars[i..j]);
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            text.push(chars[i]);
                            i += 1;
                        }
                    }
                }
                tokens.push((start, Token::Number(text)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    text.push(chars[i]);
                    i += 1;
                }
                tokens.push((start, Token::Name(text)));
                continue;
            }
            other => {
                return Err(SolverError::syntax(
                    input,
                    format!("unexpected character '{}' at offset {}", other, start),
                ));
            }
        };
        tokens.push((start, token));
        i += 1;
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    input: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> SolverError {
        SolverError::syntax(self.input, message)
    }

    fn expect(&mut self, expected: Token) -> Result<(), SolverError> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(self.error(format!("expected {:?}, got {:?}", expected, t))),
            None => Err(self.error(format!("expected {:?}, got end of input", expected))),
        }
    }

    fn expression(&mut self) -> Result<Expr, SolverError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, SolverError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, SolverError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, SolverError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, SolverError> {
        match self.next() {
            Some(Token::Number(text)) => Ok(Expr::Number(text)),
            Some(Token::Name(name)) => {
                if self.peek() != Some(&Token::OpenParen) {
                    return Ok(Expr::Symbol(name));
                }
                self.pos += 1;
                let mut args = vec![self.expression()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expression()?);
                }
                self.expect(Token::CloseParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(Token::OpenParen) => {
                let inner = self.expression()?;
                self.expect(Token::CloseParen)?;
                Ok(inner)
            }
            Some(t) => Err(self.error(format!("unexpected token {:?}", t))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}

/// Parse an expression string.
pub fn parse(input: &str) -> Result<Expr, SolverError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(SolverError::syntax(input, "empty expression"));
    }
    let mut parser = ExprParser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        let offset = parser.tokens[parser.pos].0;
        return Err(parser.error(format!("trailing input at offset {}", offset)));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let e = parse("a + b*c^2").unwrap();
        assert_eq!(e.to_string(), "a + b*c^2");
        let e = parse("(a + b)*c").unwrap();
        assert_eq!(e.to_string(), "(a + b)*c");
        let e = parse("a - (b - c)").unwrap();
        assert_eq!(e.to_string(), "a - (b - c)");
    }

    #[test]
    fn test_unary_binds_tighter_than_product() {
        let e = parse("-a/b").unwrap();
        assert!(matches!(e, Expr::Div(ref lhs, _) if matches!(**lhs, Expr::Neg(_))));
        let e = parse("-a^2").unwrap();
        assert!(matches!(e, Expr::Neg(_)));
    }

    #[test]
    fn test_leading_plus() {
        let e = parse("+ (i_V1) - (i_R1)").unwrap();
        assert_eq!(e.to_string(), "i_V1 - i_R1");
    }

    #[test]
    fn test_numbers_and_calls() {
        let e = parse("4.7e-6*sqrt(x, 2)").unwrap();
        match e {
            Expr::Mul(a, b) => {
                assert_eq!(*a, Expr::Number("4.7e-6".to_string()));
                assert!(matches!(*b, Expr::Call(ref n, ref args) if n == "sqrt" && args.len() == 2));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_symbols() {
        let e = parse("NV1 - NV2 + exp(s*C1)").unwrap();
        let names: Vec<_> = e.symbols().into_iter().collect();
        assert_eq!(names, vec!["C1", "NV1", "NV2", "s"]);
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a $ b").is_err());
        assert!(parse("a b").is_err());
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("R1"));
        assert!(is_valid_name("i_R1"));
        assert!(!is_valid_name("1R"));
        assert!(!is_valid_name("R-1"));
        assert!(!is_valid_name(""));
    }
}
