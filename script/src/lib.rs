//! Chip planner Tcl emission. The generated script edits the routed
//! netlist in place: for every planned rewire it creates the connection on
//! the new input port, removes the old one, and rewrites the LUT mask
//! slots the inverter owns, then runs the netlist check and saves.

use std::io::{self, Write};

use rorewire_lcell::{InputPort, LutMasks, Rewire};

pub const NODE_TYPE: &str = "LCCOMB_SII";
const SRC_PORT: &str = "COMBOUT";
const LUT_MASK_NAMES: [&str; 4] = ["F0 LUT Mask", "F1 LUT Mask", "F2 LUT Mask", "F3 LUT Mask"];

const MARKER_SAVE_OK: &str = "check_netlist_and_save: SUCCESS";
const MARKER_SAVE_FAIL: &str = "check_netlist_and_save: FAIL";
const MARKER_SET_FAILURES: &str = "Not all set operations were successful";

/// Full netlist path of one RO inverter, with Tcl-safe bracket escaping.
pub fn inv_node(top: &str, osc: usize, stage: usize) -> String {
    format!("|{top}|RO:generate_RO\\[{osc}\\].ro_inst|inv\\[{stage}\\]")
}

struct Fanin<'a> {
    dst_port: InputPort,
    src_node: &'a str,
}

fn write_record(
    f: &mut dyn Write,
    node: &str,
    rw: &Rewire,
    masks: LutMasks,
    fanins: &[Fanin<'_>],
) -> io::Result<()> {
    writeln!(f, "set node_properties [ node_properties_record #auto \\")?;
    writeln!(f, "\t-node_name {node} \\")?;
    writeln!(f, "\t-node_type {NODE_TYPE} \\")?;
    writeln!(f, "\t-op_mode {} \\", rw.op_mode)?;
    writeln!(f, "\t-position {} \\", rw.half)?;
    writeln!(f, "\t-f0_lut_mask {:04X} \\", masks.f0)?;
    writeln!(f, "\t-f1_lut_mask {:04X} \\", masks.f1)?;
    writeln!(f, "\t-f2_lut_mask {:04X} \\", masks.f2)?;
    writeln!(f, "\t-f3_lut_mask {:04X} \\", masks.f3)?;
    writeln!(f, "\t-fanins [ list \\")?;
    for fanin in fanins {
        writeln!(
            f,
            "\t\t[ fanin_record #auto -dst {{-port_type DATA{} -lit_index 0}} -src {{-node_name {} -port_type {SRC_PORT} -lit_index 0}} -delay_chain_setting -1 ] \\",
            fanin.dst_port, fanin.src_node,
        )?;
    }
    writeln!(f, "\t] \\")?;
    writeln!(f, "]")?;
    writeln!(f)?;
    Ok(())
}

fn write_result_check(f: &mut dyn Write) -> io::Result<()> {
    writeln!(f, "if {{ $result == 0 }} {{")?;
    writeln!(f, "set had_failure 1")?;
    writeln!(
        f,
        "puts \"Use the following information to evaluate how to apply this change.\""
    )?;
    writeln!(f, "dump_node $node_properties")?;
    writeln!(f, "}}")?;
    writeln!(f, "remove_all_record_instances")?;
    Ok(())
}

/// Cell state after the first `upto` mask slots took their new values.
fn masks_after(rw: &Rewire, upto: usize) -> LutMasks {
    let mut masks = rw.old_masks;
    if upto > 0 {
        masks.f0 = rw.new_masks.f0;
    }
    if upto > 1 {
        masks.f1 = rw.new_masks.f1;
    }
    if upto > 2 {
        masks.f2 = rw.new_masks.f2;
    }
    masks
}

fn write_rewire(f: &mut dyn Write, top: &str, rw: &Rewire) -> io::Result<()> {
    let node = inv_node(top, rw.osc, rw.stage);
    let feeder = inv_node(top, rw.osc, rw.feeder);

    // Connect the feeder to the new port first; the cell must never be
    // left without a live input.
    writeln!(f)?;
    writeln!(
        f,
        "#### Create input port {} connection for RO[{}] inv[{}] ####",
        rw.new_port, rw.osc, rw.stage
    )?;
    writeln!(f)?;
    write_record(f, &node, rw, rw.old_masks, &[Fanin {
        dst_port: rw.old_port,
        src_node: &feeder,
    }])?;
    writeln!(
        f,
        "set result [ make_ape_connection_wrapper $node_properties {node} DATA{} 0 {feeder} {SRC_PORT} 0 -1 ]",
        rw.new_port,
    )?;
    write_result_check(f)?;

    writeln!(f)?;
    writeln!(
        f,
        "#### Remove port {} connection from RO[{}] inv[{}] ####",
        rw.old_port, rw.osc, rw.stage
    )?;
    writeln!(f)?;
    write_record(f, &node, rw, rw.old_masks, &[
        Fanin {
            dst_port: rw.old_port,
            src_node: &feeder,
        },
        Fanin {
            dst_port: rw.new_port,
            src_node: &feeder,
        },
    ])?;
    writeln!(
        f,
        "set result [ remove_ape_connection_wrapper $node_properties {node} DATA{} 0 ]",
        rw.old_port,
    )?;
    write_result_check(f)?;

    for (slot, value) in rw.mask_updates() {
        // Each record mirrors the netlist state after the commands before
        // it: lower slots already carry their new values.
        writeln!(f)?;
        writeln!(
            f,
            "#### Change the \"{}\" on RO[{}] inv[{}] ####",
            LUT_MASK_NAMES[slot], rw.osc, rw.stage
        )?;
        writeln!(f)?;
        write_record(f, &node, rw, masks_after(rw, slot), &[Fanin {
            dst_port: rw.new_port,
            src_node: &feeder,
        }])?;
        writeln!(
            f,
            "set result [ set_lutmask_wrapper $node_properties {node} \"{}\" {value:04X} ]",
            LUT_MASK_NAMES[slot],
        )?;
        write_result_check(f)?;
    }
    Ok(())
}

/// Writes the whole chip planner script. `top` is the top-level entity the
/// inverter paths hang off (normally the revision name). The prologue and
/// the netlist-check epilogue are emitted even for an empty plan.
pub fn write_script(
    f: &mut dyn Write,
    project: &str,
    top: &str,
    rewires: &[Rewire],
) -> io::Result<()> {
    writeln!(f, "package require ::quartus::chip_planner")?;
    writeln!(f, "package require ::quartus::project")?;
    writeln!(f, "load_chip_planner_utility_commands")?;
    writeln!(f, "project_open {project} -revision {top}")?;
    writeln!(f, "read_netlist")?;
    writeln!(f, "set had_failure 0")?;

    for rw in rewires {
        write_rewire(f, top, rw)?;
    }

    writeln!(f)?;
    writeln!(f, "puts \"\"")?;
    writeln!(f, "set drc_result [check_netlist_and_save]")?;
    writeln!(f, "if {{ $drc_result == 1 }} {{")?;
    writeln!(f, "puts \"{MARKER_SAVE_OK}\"")?;
    writeln!(f, "}} else {{")?;
    writeln!(f, "puts \"{MARKER_SAVE_FAIL}\"")?;
    writeln!(f, "}}")?;
    writeln!(f, "if {{ $had_failure == 1 }} {{")?;
    writeln!(f, "puts \"{MARKER_SET_FAILURES}\"")?;
    writeln!(f, "}}")?;
    writeln!(f, "project_close")?;
    Ok(())
}

/// What the executed script reported about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TclOutcome {
    pub netlist_saved: bool,
    pub had_failure: bool,
}

impl TclOutcome {
    /// Recovers the outcome from the tool's captured stdout. `None` means
    /// the script never reached its netlist-check epilogue.
    pub fn scan(output: &str) -> Option<TclOutcome> {
        let mut netlist_saved = None;
        let mut had_failure = false;
        for line in output.lines() {
            if line.contains(MARKER_SAVE_OK) {
                netlist_saved = Some(true);
            } else if line.contains(MARKER_SAVE_FAIL) {
                netlist_saved = Some(false);
            } else if line.contains(MARKER_SET_FAILURES) {
                had_failure = true;
            }
        }
        Some(TclOutcome {
            netlist_saved: netlist_saved?,
            had_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use rorewire_lcell::{InputPort, PortMap, RoArray, plan};

    use super::*;

    fn emit(map: &PortMap, target: InputPort) -> String {
        let rewires = plan(map, target).unwrap();
        let mut buf = Vec::new();
        write_script(&mut buf, "ROarray_v3", "ROarray_v3", &rewires).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_inv_node() {
        assert_eq!(
            inv_node("ROarray_v3", 12, 3),
            "|ROarray_v3|RO:generate_RO\\[12\\].ro_inst|inv\\[3\\]"
        );
    }

    #[test]
    fn empty_plan_still_checks_netlist() {
        let mut map = PortMap::new(RoArray::new(1, 3));
        for stage in 1..=3 {
            map.set(0, stage, InputPort::F);
        }
        let script = emit(&map, InputPort::F);
        assert!(script.starts_with("package require ::quartus::chip_planner\n"));
        assert!(script.contains("project_open ROarray_v3 -revision ROarray_v3\n"));
        assert!(script.contains("set drc_result [check_netlist_and_save]"));
        assert!(script.ends_with("project_close\n"));
        assert!(!script.contains("make_ape_connection_wrapper"));
    }

    #[test]
    fn chain_rewire_commands() {
        let mut map = PortMap::new(RoArray::new(1, 3));
        map.set(0, 1, InputPort::A);
        map.set(0, 2, InputPort::F);
        map.set(0, 3, InputPort::F);
        let script = emit(&map, InputPort::F);

        // Stage 1 is fed from the end of the ring.
        let node = "|ROarray_v3|RO:generate_RO\\[0\\].ro_inst|inv\\[1\\]";
        let feeder = "|ROarray_v3|RO:generate_RO\\[0\\].ro_inst|inv\\[3\\]";
        assert!(script.contains(&format!(
            "set result [ make_ape_connection_wrapper $node_properties {node} DATAF 0 {feeder} COMBOUT 0 -1 ]"
        )));
        assert!(script.contains(&format!(
            "set result [ remove_ape_connection_wrapper $node_properties {node} DATAA 0 ]"
        )));
        assert!(script.contains(&format!(
            "\t\t[ fanin_record #auto -dst {{-port_type DATAA -lit_index 0}} -src {{-node_name {feeder} -port_type COMBOUT -lit_index 0}} -delay_chain_setting -1 ] \\"
        )));
        // Top half of a fractured cell owns f0 and f2.
        assert!(script.contains(&format!(
            "set result [ set_lutmask_wrapper $node_properties {node} \"F0 LUT Mask\" 0000 ]"
        )));
        assert!(script.contains(&format!(
            "set result [ set_lutmask_wrapper $node_properties {node} \"F2 LUT Mask\" FFFF ]"
        )));
        assert!(!script.contains("\"F1 LUT Mask\""));
        assert!(!script.contains("\"F3 LUT Mask\""));
        assert!(script.contains("-op_mode fractured \\"));
        assert!(script.contains("-position top \\"));
    }

    #[test]
    fn end_rewire_records_are_progressive() {
        let mut map = PortMap::new(RoArray::new(1, 3));
        map.set(0, 1, InputPort::F);
        map.set(0, 2, InputPort::F);
        map.set(0, 3, InputPort::E);
        let script = emit(&map, InputPort::F);

        assert!(script.contains("-op_mode normal \\"));
        // E -> F on an end cell flips f1 and f2.
        let f1_update = script.find("\"F1 LUT Mask\" 0000 ]").unwrap();
        let f2_update = script.find("\"F2 LUT Mask\" FFFF ]").unwrap();
        assert!(f1_update < f2_update);

        // The record accompanying the f2 update already shows f1 rewritten,
        // while f3 still has its old value.
        let record = &script[f1_update..f2_update];
        assert!(record.contains("-f1_lut_mask 0000 \\"));
        assert!(record.contains("-f2_lut_mask 0000 \\"));
        assert!(record.contains("-f3_lut_mask FFFF \\"));
    }

    #[test]
    fn scan_outcomes() {
        assert_eq!(
            TclOutcome::scan("Info: blah\ncheck_netlist_and_save: SUCCESS\n"),
            Some(TclOutcome {
                netlist_saved: true,
                had_failure: false,
            })
        );
        assert_eq!(
            TclOutcome::scan(
                "check_netlist_and_save: FAIL\nNot all set operations were successful\n"
            ),
            Some(TclOutcome {
                netlist_saved: false,
                had_failure: true,
            })
        );
        assert_eq!(TclOutcome::scan("Error: license not found\n"), None);
    }
}
