//! Spice netlist import and export.
//!
//! # Format
//!
//! ```text
//! netlist    = title_line { line }
//! line       = comment | directive | component | continuation | empty
//! comment    = '*' { any_char }
//! directive  = '.' word            ; ".END" stops parsing, others are ignored
//! continuation = '+' { field }     ; appended to the previous component line
//! component  = name field { field }
//! ```
//!
//! A `;` starts a comment that runs to the end of the line. Fields are
//! separated by whitespace or commas. The first letter of the name selects
//! the component type (case-insensitive; names are upper-cased):
//!
//! | Type | Description | Syntax |
//! |------|-------------|--------|
//! | R | Resistor | `R<name> <n+> <n-> <value>` |
//! | C | Capacitor | `C<name> <n+> <n-> <value>` |
//! | L | Inductor | `L<name> <n+> <n-> <value>` |
//! | V | AC voltage source | `V<name> <n+> <n-> [AC\|DC] <mag> [<phase>]` |
//! | I | AC current source | `I<name> <n+> <n-> [AC\|DC] <mag> [<phase>]` |
//! | E | VCVS | `E<name> <n+> <n-> <nc+> <nc-> <gain>` |
//! | F | CCCS | `F<name> <n+> <n-> <Vctrl> <gain>` |
//! | G | VCCS | `G<name> <n+> <n-> <nc+> <nc-> <gain>` |
//! | H | CCVS | `H<name> <n+> <n-> <Vctrl> <gain>` |
//!
//! A voltage source with zero magnitude is a short circuit (ammeter) and can
//! be named as `Vctrl`. Values accept the suffixes of [`parse_value`].
//! Nodes `0` and `GND` are ground; any other node `x` becomes `NVx`.
//!
//! # Example
//!
//! ```text
//! RC low-pass
//! V1   in   0    AC 1 0
//! R1   in   out  10k
//! C1   out  0    100n
//! .END
//! ```

mod lexer;
mod parser;
mod writer;

pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;
pub use writer::write;

use std::fs;
use std::path::Path;

use crate::circuit::Circuit;
use crate::error::{CircuitError, Result};

/// Result of reading a netlist: the circuit built from every line that was
/// understood, plus one diagnostic per line that was skipped.
#[derive(Debug)]
pub struct ParsedNetlist {
    pub circuit: Circuit,
    pub diagnostics: Vec<CircuitError>,
}

impl ParsedNetlist {
    /// True if every line was understood.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse netlist text. Bad lines become diagnostics, they never fail the parse.
pub fn parse(input: &str) -> ParsedNetlist {
    Parser::new(Lexer::new(input)).parse()
}

/// Parse a netlist file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedNetlist> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CircuitError::FileReadError {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse(&content))
}

/// Write `circuit` to a netlist file.
pub fn write_file(circuit: &Circuit, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = write(circuit)?;
    fs::write(path, text).map_err(|source| CircuitError::FileWriteError {
        path: path.display().to_string(),
        source,
    })
}
