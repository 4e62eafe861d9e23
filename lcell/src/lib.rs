use std::fmt::{self, Display, Formatter};

mod rewire;

pub use rewire::{PlanError, Rewire, plan};

/// Logical data input of an `LCCOMB_SII` cell that a ring oscillator
/// inverter can be routed through. Only ports with a known LUT mask
/// encoding are representable; back-annotated RO arrays never use the
/// others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputPort {
    A,
    C,
    D,
    E,
    F,
}

impl InputPort {
    pub fn from_letter(c: char) -> Option<InputPort> {
        match c {
            'A' => Some(InputPort::A),
            'C' => Some(InputPort::C),
            'D' => Some(InputPort::D),
            'E' => Some(InputPort::E),
            'F' => Some(InputPort::F),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            InputPort::A => 'A',
            InputPort::C => 'C',
            InputPort::D => 'D',
            InputPort::E => 'E',
            InputPort::F => 'F',
        }
    }
}

impl Display for InputPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The four 16-bit truth table masks of an `LCCOMB_SII` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LutMasks {
    pub f0: u16,
    pub f1: u16,
    pub f2: u16,
    pub f3: u16,
}

impl LutMasks {
    pub fn slot(self, idx: usize) -> u16 {
        match idx {
            0 => self.f0,
            1 => self.f1,
            2 => self.f2,
            3 => self.f3,
            _ => panic!("no LUT mask slot {idx}"),
        }
    }
}

/// Which half of the two-inverter combinational cell holds the inverter.
/// Odd stages sit in the top half, even stages in the bottom half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellHalf {
    Top,
    Bottom,
}

impl CellHalf {
    pub fn name(self) -> &'static str {
        match self {
            CellHalf::Top => "top",
            CellHalf::Bottom => "bottom",
        }
    }
}

impl Display for CellHalf {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chip planner operation mode of the cell. Chain cells are fractured into
/// two independent halves; the end-of-ring cell runs in normal mode with
/// all four masks backing its single inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Fractured,
    Normal,
}

impl OpMode {
    pub fn name(self) -> &'static str {
        match self {
            OpMode::Fractured => "fractured",
            OpMode::Normal => "normal",
        }
    }
}

impl Display for OpMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Chain(CellHalf),
    End,
}

impl CellRole {
    pub fn op_mode(self) -> OpMode {
        match self {
            CellRole::Chain(_) => OpMode::Fractured,
            CellRole::End => OpMode::Normal,
        }
    }

    /// Mask slots whose value the inverter actually controls. The top half
    /// drives f0/f2, the bottom half f1/f3, an end-of-ring cell all four.
    pub fn owned_masks(self) -> [bool; 4] {
        match self {
            CellRole::Chain(CellHalf::Top) => [true, false, true, false],
            CellRole::Chain(CellHalf::Bottom) => [false, true, false, true],
            CellRole::End => [true, true, true, true],
        }
    }
}

/// Geometry of the oscillator array: every oscillator is a chain of
/// `stages` inverters, stages are numbered from 1, and the last stage feeds
/// back into the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoArray {
    pub oscillators: usize,
    pub stages: usize,
}

impl RoArray {
    pub fn new(oscillators: usize, stages: usize) -> RoArray {
        assert!(oscillators > 0, "empty oscillator array");
        assert!(stages > 0, "oscillator with no stages");
        RoArray {
            oscillators,
            stages,
        }
    }

    pub fn inverters(&self) -> usize {
        self.oscillators * self.stages
    }

    pub fn half(&self, stage: usize) -> CellHalf {
        if stage % 2 == 1 {
            CellHalf::Top
        } else {
            CellHalf::Bottom
        }
    }

    pub fn role(&self, stage: usize) -> CellRole {
        if stage == self.stages {
            CellRole::End
        } else {
            CellRole::Chain(self.half(stage))
        }
    }

    /// Stage whose COMBOUT drives this stage's input; stage 1 closes the
    /// ring from the last stage.
    pub fn feeder(&self, stage: usize) -> usize {
        if stage == 1 { self.stages } else { stage - 1 }
    }
}

/// Currently routed input port of every inverter in the array, as
/// discovered from the back-annotated routing constraints. `None` until a
/// route for the inverter has been seen.
#[derive(Debug, Clone)]
pub struct PortMap {
    array: RoArray,
    ports: Vec<Option<InputPort>>,
}

impl PortMap {
    pub fn new(array: RoArray) -> PortMap {
        PortMap {
            array,
            ports: vec![None; array.inverters()],
        }
    }

    pub fn array(&self) -> RoArray {
        self.array
    }

    fn index(&self, osc: usize, stage: usize) -> usize {
        assert!(osc < self.array.oscillators, "oscillator {osc} out of range");
        assert!(
            stage >= 1 && stage <= self.array.stages,
            "stage {stage} out of range"
        );
        osc * self.array.stages + (stage - 1)
    }

    pub fn get(&self, osc: usize, stage: usize) -> Option<InputPort> {
        self.ports[self.index(osc, stage)]
    }

    pub fn set(&mut self, osc: usize, stage: usize, port: InputPort) {
        let idx = self.index(osc, stage);
        self.ports[idx] = Some(port);
    }

    pub fn assigned(&self) -> usize {
        self.ports.iter().filter(|p| p.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Option<InputPort>)> + '_ {
        let stages = self.array.stages;
        self.ports
            .iter()
            .enumerate()
            .map(move |(i, &p)| (i / stages, i % stages + 1, p))
    }
}

/// Masks implementing an inverter fed from the given port in one half of a
/// fractured cell. The cell keeps all four mask properties even though only
/// one half's pair is in use; Quartus mirrors the active pair into the
/// other half's slots.
pub fn chain_masks(port: InputPort) -> LutMasks {
    match port {
        InputPort::A => LutMasks {
            f0: 0xAAAA,
            f1: 0xAAAA,
            f2: 0xAAAA,
            f3: 0xAAAA,
        },
        InputPort::C => LutMasks {
            f0: 0xF0F0,
            f1: 0xF0F0,
            f2: 0xF0F0,
            f3: 0xF0F0,
        },
        InputPort::D => LutMasks {
            f0: 0xFF00,
            f1: 0xFF00,
            f2: 0xFF00,
            f3: 0xFF00,
        },
        InputPort::E | InputPort::F => LutMasks {
            f0: 0x0000,
            f1: 0x0000,
            f2: 0xFFFF,
            f3: 0xFFFF,
        },
    }
}

/// Masks for the single inverter of an end-of-ring cell in normal mode.
/// Only the shared inputs E and F have a known normal-mode encoding.
pub fn end_masks(port: InputPort) -> Option<LutMasks> {
    match port {
        InputPort::E => Some(LutMasks {
            f0: 0x0000,
            f1: 0xFFFF,
            f2: 0x0000,
            f3: 0xFFFF,
        }),
        InputPort::F => Some(LutMasks {
            f0: 0x0000,
            f1: 0x0000,
            f2: 0xFFFF,
            f3: 0xFFFF,
        }),
        InputPort::A | InputPort::C | InputPort::D => None,
    }
}

#[test]
fn test_ports() {
    assert_eq!(InputPort::from_letter('E'), Some(InputPort::E));
    assert_eq!(InputPort::from_letter('B'), None);
    assert_eq!(InputPort::from_letter('G'), None);
    assert_eq!(InputPort::D.letter(), 'D');
    assert_eq!(InputPort::F.to_string(), "F");
}

#[test]
fn test_masks() {
    assert_eq!(chain_masks(InputPort::A).f0, 0xAAAA);
    assert_eq!(chain_masks(InputPort::C).f2, 0xF0F0);
    assert_eq!(chain_masks(InputPort::D).f3, 0xFF00);
    assert_eq!(
        chain_masks(InputPort::E),
        LutMasks {
            f0: 0x0000,
            f1: 0x0000,
            f2: 0xFFFF,
            f3: 0xFFFF,
        }
    );
    assert_eq!(chain_masks(InputPort::E), chain_masks(InputPort::F));
    assert_eq!(
        end_masks(InputPort::E),
        Some(LutMasks {
            f0: 0x0000,
            f1: 0xFFFF,
            f2: 0x0000,
            f3: 0xFFFF,
        })
    );
    assert_eq!(end_masks(InputPort::D), None);
}

#[test]
fn test_array() {
    let array = RoArray::new(4, 9);
    assert_eq!(array.inverters(), 36);
    assert_eq!(array.half(1), CellHalf::Top);
    assert_eq!(array.half(2), CellHalf::Bottom);
    assert_eq!(array.role(3), CellRole::Chain(CellHalf::Top));
    assert_eq!(array.role(9), CellRole::End);
    assert_eq!(array.feeder(5), 4);
    assert_eq!(array.feeder(1), 9);
    assert_eq!(CellRole::Chain(CellHalf::Top).owned_masks(), [
        true, false, true, false
    ]);
    assert_eq!(CellRole::Chain(CellHalf::Bottom).owned_masks(), [
        false, true, false, true
    ]);
    assert_eq!(CellRole::End.op_mode(), OpMode::Normal);
}

#[test]
fn test_port_map() {
    let mut map = PortMap::new(RoArray::new(2, 3));
    assert_eq!(map.assigned(), 0);
    map.set(1, 3, InputPort::E);
    map.set(0, 1, InputPort::A);
    map.set(0, 1, InputPort::C);
    assert_eq!(map.get(0, 1), Some(InputPort::C));
    assert_eq!(map.get(0, 2), None);
    assert_eq!(map.get(1, 3), Some(InputPort::E));
    assert_eq!(map.assigned(), 2);
    let all: Vec<_> = map.iter().collect();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0], (0, 1, Some(InputPort::C)));
    assert_eq!(all[5], (1, 3, Some(InputPort::E)));
}
