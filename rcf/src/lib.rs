//! Parser for the routing constraint file written by
//! `quartus_cdb --back_annotate=routing`. Only the RO inverter fanin lines
//! matter; everything else in the file is skipped.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use rorewire_lcell::{PortMap, RoArray};

mod parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// An RO inverter fanin line without a `route_port = DATAx` clause.
    MissingRoutePort,
    /// A `DATAx` input with no known LUT mask encoding.
    UnknownPort(char),
    OscOutOfRange(usize),
    StageOutOfRange(usize),
}

#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "parse error in line {}: ", self.line)?;
        match self.kind {
            ParseErrorKind::MissingRoutePort => write!(f, "missing `route_port` clause"),
            ParseErrorKind::UnknownPort(c) => write!(f, "unknown input port DATA{c}"),
            ParseErrorKind::OscOutOfRange(osc) => write!(f, "oscillator {osc} out of range"),
            ParseErrorKind::StageOutOfRange(stage) => write!(f, "stage {stage} out of range"),
        }
    }
}

impl Error for ParseError {}

/// Extracts the routed input port of every RO inverter mentioned in the
/// routing constraints. Inverters the file never mentions stay unassigned;
/// when one appears more than once, the last route wins.
pub fn parse(s: &str, array: RoArray) -> Result<PortMap, ParseError> {
    parser::parse(s, array)
}
