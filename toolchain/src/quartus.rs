use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use simple_error::bail;

use crate::Toolchain;

const QUARTUS_CDB: &str = "quartus_cdb";

/// Regenerates the routing constraint file from the compiled design:
/// `quartus_cdb <project> --back_annotate=routing`, run in the project
/// directory.
pub fn back_annotate(
    tc: &Toolchain,
    project_dir: &Path,
    project: &str,
) -> Result<(), Box<dyn Error>> {
    let mut cmd = tc.command(QUARTUS_CDB);
    cmd.current_dir(project_dir);
    cmd.stdin(Stdio::null());
    cmd.arg(project);
    cmd.arg("--back_annotate=routing");
    let output = cmd.output()?;
    if !output.status.success() {
        let _ = std::io::stderr().write_all(&output.stdout);
        let _ = std::io::stderr().write_all(&output.stderr);
        bail!("non-zero quartus_cdb status");
    }
    Ok(())
}

/// Runs a chip planner script in batch mode (`quartus_cdb -t <script>`)
/// and hands back everything it printed. A zero exit only means the tool
/// ran the script to completion; what the edits did is reported through
/// the script's own output.
pub fn run_tcl(
    tc: &Toolchain,
    project_dir: &Path,
    script: &Path,
) -> Result<String, Box<dyn Error>> {
    let mut cmd = tc.command(QUARTUS_CDB);
    cmd.current_dir(project_dir);
    cmd.stdin(Stdio::null());
    cmd.arg("-t");
    cmd.arg(script);
    let output = cmd.output()?;
    if !output.status.success() {
        let _ = std::io::stderr().write_all(&output.stdout);
        let _ = std::io::stderr().write_all(&output.stderr);
        bail!("non-zero quartus_cdb status");
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
