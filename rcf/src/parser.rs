use std::sync::LazyLock;

use regex::Regex;
use rorewire_lcell::{InputPort, PortMap, RoArray};

use crate::{ParseError, ParseErrorKind};

static RE_DEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dest = \( RO:generate_RO\[([0-9]+)\]\.ro_inst\|inv\[([0-9]+)\]").unwrap()
});
static RE_PORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"route_port = DATA(\w)").unwrap());

pub fn parse(s: &str, array: RoArray) -> Result<PortMap, ParseError> {
    let mut map = PortMap::new(array);
    for (idx, line) in s.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let Some(dest) = RE_DEST.captures(line) else {
            continue;
        };
        let osc: usize = dest[1].parse().unwrap();
        let stage: usize = dest[2].parse().unwrap();
        if osc >= array.oscillators {
            return Err(ParseError {
                kind: ParseErrorKind::OscOutOfRange(osc),
                line: line_no,
            });
        }
        if stage < 1 || stage > array.stages {
            return Err(ParseError {
                kind: ParseErrorKind::StageOutOfRange(stage),
                line: line_no,
            });
        }
        let Some(port) = RE_PORT.captures(line) else {
            return Err(ParseError {
                kind: ParseErrorKind::MissingRoutePort,
                line: line_no,
            });
        };
        let letter = port[1].chars().next().unwrap();
        let Some(port) = InputPort::from_letter(letter) else {
            return Err(ParseError {
                kind: ParseErrorKind::UnknownPort(letter),
                line: line_no,
            });
        };
        map.set(osc, stage, port);
    }
    Ok(map)
}
