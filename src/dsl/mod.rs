//! Netlist DSL for describing networks.
//!
//! A SPICE-inspired, line-oriented language. Every component line is
//! instantiated through the same templates as the Rust API.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist     = { line }
//! line        = comment | directive | component | empty
//! comment     = ('#' | ';' | '*') { any_char }
//! directive   = '.' directive_name { argument }
//! component   = type name node+ [value] [reference] { key '=' (number | identifier) }
//!
//! directive_name = "node" | "input" | "control" | "heatport" | "flange" | "model"
//! node        = identifier | "0" | "GND"
//! value       = number [unit_suffix]
//! reference   = identifier          (model, input signal or waveform keyword)
//!
//! number      = ['-'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! identifier  = (letter | '_') { letter | digit | '_' }
//! ```
//!
//! # Component Types
//!
//! Single-letter prefixes, or a keyword either prefixing the name (`THY1`)
//! or standing before it (`THY T1`). Keywords win over single letters, so
//! `GTO1` is a GTO and `DI1` an ideal diode.
//!
//! | Type | Description | Syntax |
//! |------|-------------|--------|
//! | R | Resistor | `R<name> <p> <n> <value or input> [alpha= tref= temp= heat=]` |
//! | G | Conductor | `G<name> <p> <n> <value or input>` |
//! | C | Capacitor | `C<name> <p> <n> <value or input> [ic=]` |
//! | L | Inductor | `L<name> <p> <n> <value or input> [ic=]` |
//! | D | Diode | `D<name> <anode> <cathode> [model] [heat=]` |
//! | V, I | Sources | `V<name> <p> <n> <value> \| <input> \| SINE .. \| STEP ..` |
//! | ZD | Zener diode | `ZD<name> <anode> <cathode> [model]` |
//! | DI | Ideal diode | `DI<name> <anode> <cathode> [vknee= ron= goff=]` |
//! | OP | Ideal op-amp | `OP<name> <in+> <in-> <out> [<out->]` |
//! | SWO, SWC | Opener, closer | `SWO<name> <p> <n> control=<c>` |
//! | SWX | Commuting switch | `SWX<name> <p> <n1> <n2> control=<c>` |
//! | ARCO, ARCC | Switch with arc | `ARCO<name> <p> <n> control=<c> [v0= dvdt= vmax=]` |
//! | THY, GTO | Thyristor | `THY<name> <anode> <cathode> fire=<c> [vknee=]` |
//! | XFMR | Transformer | `XFMR<name> <p1> <n1> <p2> <n2> l1= l2= m=` |
//! | EMF | EMF converter | `EMF<name> <p> <n> <k> flange=<f>` |
//! | SHORT | Short | `SHORT<name> <p> <n>` |
//!
//! Switch controls may also be level crossings: `signal=<input> level=<x>`.
//!
//! # Directives
//!
//! | Directive | Syntax |
//! |-----------|--------|
//! | .node | `.node <name>[n] [complex] [init=<v>]` |
//! | .input | `.input <name>[n]` |
//! | .control | `.control <name> [init=0\|1]` |
//! | .heatport | `.heatport <name>[n]` |
//! | .flange | `.flange <name>` |
//! | .model | `.model <name> D\|ZD\|ARC (<key>=<value> ...)` |
//!
//! # Example
//!
//! ```text
//! * Phase-controlled rectifier
//! .input vin
//! .control fire
//!
//! V1   in  0  vin
//! THY1 in  out fire=fire vknee=0.7
//! R1   out 0   10
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer);
    parser.parse()
}

/// Parse a netlist file.
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::KirchhoffError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
