use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::{
    CellHalf, CellRole, InputPort, LutMasks, OpMode, PortMap, chain_masks, end_masks,
};

/// One inverter whose input has to move to a different port, with
/// everything the chip planner commands need to know about the cell.
#[derive(Debug, Clone, Copy)]
pub struct Rewire {
    pub osc: usize,
    pub stage: usize,
    /// Stage whose COMBOUT feeds this inverter.
    pub feeder: usize,
    pub old_port: InputPort,
    pub new_port: InputPort,
    pub op_mode: OpMode,
    pub half: CellHalf,
    pub owned: [bool; 4],
    pub old_masks: LutMasks,
    pub new_masks: LutMasks,
}

impl Rewire {
    /// Mask slots that actually have to be rewritten, in command order.
    pub fn mask_updates(&self) -> Vec<(usize, u16)> {
        (0..4)
            .filter(|&i| self.owned[i] && self.old_masks.slot(i) != self.new_masks.slot(i))
            .map(|i| (i, self.new_masks.slot(i)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// The routing constraints never mentioned this inverter.
    MissingRoute { osc: usize, stage: usize },
    /// An end-of-ring cell is routed from a port with no normal-mode masks.
    UnsupportedEndPort {
        osc: usize,
        stage: usize,
        port: InputPort,
    },
    /// The target port has no normal-mode masks, and an end-of-ring cell
    /// needs rewiring.
    UnsupportedEndTarget { port: InputPort },
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            PlanError::MissingRoute { osc, stage } => {
                write!(f, "no route found for RO[{osc}] inv[{stage}]")
            }
            PlanError::UnsupportedEndPort { osc, stage, port } => {
                write!(
                    f,
                    "RO[{osc}] inv[{stage}] is an end-of-ring cell routed from DATA{port}, which has no normal-mode masks"
                )
            }
            PlanError::UnsupportedEndTarget { port } => {
                write!(f, "target port DATA{port} has no normal-mode masks")
            }
        }
    }
}

impl Error for PlanError {}

/// Walks the whole array and decides, for every inverter not already routed
/// through `target`, which connection moves and which mask slots change.
/// The result is in oscillator-major, stage-ascending order.
pub fn plan(map: &PortMap, target: InputPort) -> Result<Vec<Rewire>, PlanError> {
    let array = map.array();
    let mut res = vec![];
    for osc in 0..array.oscillators {
        for stage in 1..=array.stages {
            let Some(old_port) = map.get(osc, stage) else {
                return Err(PlanError::MissingRoute { osc, stage });
            };
            if old_port == target {
                continue;
            }
            let role = array.role(stage);
            let (old_masks, new_masks) = match role {
                CellRole::Chain(_) => (chain_masks(old_port), chain_masks(target)),
                CellRole::End => {
                    let old = end_masks(old_port).ok_or(PlanError::UnsupportedEndPort {
                        osc,
                        stage,
                        port: old_port,
                    })?;
                    let new =
                        end_masks(target).ok_or(PlanError::UnsupportedEndTarget { port: target })?;
                    (old, new)
                }
            };
            res.push(Rewire {
                osc,
                stage,
                feeder: array.feeder(stage),
                old_port,
                new_port: target,
                op_mode: role.op_mode(),
                half: array.half(stage),
                owned: role.owned_masks(),
                old_masks,
                new_masks,
            });
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::RoArray;

    fn filled_map() -> PortMap {
        // One oscillator of three stages: top chain cell on A, bottom chain
        // cell already on F, end cell on E.
        let mut map = PortMap::new(RoArray::new(1, 3));
        map.set(0, 1, InputPort::A);
        map.set(0, 2, InputPort::F);
        map.set(0, 3, InputPort::E);
        map
    }

    #[test]
    fn plan_small_array() {
        let rewires = plan(&filled_map(), InputPort::F).unwrap();
        assert_eq!(rewires.len(), 2);

        let first = &rewires[0];
        assert_eq!((first.osc, first.stage, first.feeder), (0, 1, 3));
        assert_eq!(first.old_port, InputPort::A);
        assert_eq!(first.new_port, InputPort::F);
        assert_eq!(first.op_mode, OpMode::Fractured);
        assert_eq!(first.half, CellHalf::Top);
        assert_eq!(first.old_masks, chain_masks(InputPort::A));
        // Top half owns f0/f2: AAAA -> 0000 and AAAA -> FFFF.
        assert_eq!(first.mask_updates(), vec![(0, 0x0000), (2, 0xFFFF)]);

        let last = &rewires[1];
        assert_eq!((last.osc, last.stage, last.feeder), (0, 3, 2));
        assert_eq!(last.op_mode, OpMode::Normal);
        assert_eq!(last.half, CellHalf::Top);
        assert_eq!(last.owned, [true, true, true, true]);
        // E -> F in normal mode flips f1 and f2.
        assert_eq!(last.mask_updates(), vec![(1, 0x0000), (2, 0xFFFF)]);
    }

    #[test]
    fn plan_nothing_to_do() {
        let mut map = PortMap::new(RoArray::new(2, 3));
        for osc in 0..2 {
            for stage in 1..=3 {
                map.set(osc, stage, InputPort::F);
            }
        }
        assert_eq!(plan(&map, InputPort::F).unwrap().len(), 0);
    }

    #[test]
    fn plan_bottom_half_updates() {
        let mut map = filled_map();
        map.set(0, 2, InputPort::D);
        let rewires = plan(&map, InputPort::F).unwrap();
        let bottom = rewires.iter().find(|r| r.stage == 2).unwrap();
        assert_eq!(bottom.half, CellHalf::Bottom);
        assert_eq!(bottom.owned, [false, true, false, true]);
        // Bottom half owns f1/f3: FF00 -> 0000 and FF00 -> FFFF.
        assert_eq!(bottom.mask_updates(), vec![(1, 0x0000), (3, 0xFFFF)]);
    }

    #[test]
    fn plan_missing_route() {
        let mut map = PortMap::new(RoArray::new(1, 3));
        map.set(0, 1, InputPort::A);
        map.set(0, 3, InputPort::E);
        assert_matches!(
            plan(&map, InputPort::F),
            Err(PlanError::MissingRoute { osc: 0, stage: 2 })
        );
    }

    #[test]
    fn plan_unsupported_end_port() {
        let mut map = filled_map();
        map.set(0, 3, InputPort::D);
        assert_matches!(
            plan(&map, InputPort::F),
            Err(PlanError::UnsupportedEndPort {
                osc: 0,
                stage: 3,
                port: InputPort::D,
            })
        );
    }

    #[test]
    fn plan_unsupported_end_target() {
        let err = plan(&filled_map(), InputPort::C).unwrap_err();
        assert_matches!(err, PlanError::UnsupportedEndTarget { port: InputPort::C });
        assert_eq!(
            err.to_string(),
            "target port DATAC has no normal-mode masks"
        );
    }
}
