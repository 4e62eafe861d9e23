use std::error::Error;
use std::fs::{File, read_to_string};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use rorewire_lcell::{InputPort, RoArray};
use rorewire_script::TclOutcome;
use rorewire_toolchain::Toolchain;
use simple_error::bail;

#[derive(Debug, Parser)]
#[command(
    name = "rorewire",
    about = "Rewire ring oscillator input ports through the Quartus chip planner."
)]
struct Args {
    /// Toolchain description file.
    toolchain: PathBuf,
    /// Quartus project directory.
    project_dir: PathBuf,
    /// Project name.
    project: String,
    /// Revision, when it differs from the project name.
    #[arg(long)]
    revision: Option<String>,
    /// Input port every inverter should end up on.
    #[arg(short = 'p', long, default_value = "F", value_parser = parse_port)]
    target_port: InputPort,
    #[arg(long, default_value = "200")]
    oscillators: usize,
    #[arg(long, default_value = "9")]
    stages: usize,
    /// Routing constraint file [default: <PROJECT_DIR>/<revision>.rcf].
    #[arg(long)]
    rcf: Option<PathBuf>,
    /// Where to write the chip planner script [default: <PROJECT_DIR>/rewire.tcl].
    #[arg(long)]
    script: Option<PathBuf>,
    /// Reuse an existing routing constraint file instead of regenerating it.
    #[arg(long)]
    skip_back_annotate: bool,
    /// Only write the script, do not run it.
    #[arg(long)]
    dry_run: bool,
}

fn parse_port(s: &str) -> Result<InputPort, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => InputPort::from_letter(c.to_ascii_uppercase())
            .ok_or_else(|| format!("no LUT masks known for input port {s}")),
        _ => Err("expected a single port letter".to_string()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let tc = Toolchain::from_file(&args.toolchain)?;
    let revision = args
        .revision
        .clone()
        .unwrap_or_else(|| args.project.clone());
    let array = RoArray::new(args.oscillators, args.stages);

    if !args.skip_back_annotate {
        println!("back-annotating {}", args.project);
        rorewire_toolchain::back_annotate(&tc, &args.project_dir, &args.project)?;
    }

    let rcf_path = args
        .rcf
        .clone()
        .unwrap_or_else(|| args.project_dir.join(format!("{revision}.rcf")));
    let rcf = read_to_string(&rcf_path)?;
    let map = rorewire_rcf::parse(&rcf, array)?;
    println!(
        "{}: routes found for {}/{} inverters",
        rcf_path.display(),
        map.assigned(),
        array.inverters()
    );
    for (port, n) in map.iter().filter_map(|(_, _, p)| p).counts().iter().sorted() {
        println!("  DATA{port}: {n}");
    }

    let rewires = rorewire_lcell::plan(&map, args.target_port)?;
    println!(
        "{} inverters already on DATA{}, {} to rewire",
        array.inverters() - rewires.len(),
        args.target_port,
        rewires.len()
    );

    let script_path = args
        .script
        .clone()
        .unwrap_or_else(|| args.project_dir.join("rewire.tcl"));
    let mut f = BufWriter::new(File::create(&script_path)?);
    rorewire_script::write_script(&mut f, &args.project, &revision, &rewires)?;
    f.flush()?;
    println!("wrote {}", script_path.display());

    if args.dry_run {
        return Ok(());
    }

    println!("applying changes");
    let output = rorewire_toolchain::run_tcl(&tc, &args.project_dir, &script_path)?;
    print!("{output}");
    let Some(outcome) = TclOutcome::scan(&output) else {
        bail!("script never reached the netlist check");
    };
    if outcome.had_failure {
        bail!("not all set operations were successful");
    }
    if !outcome.netlist_saved {
        bail!("netlist check failed, changes not saved");
    }
    println!("netlist saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("F"), Ok(InputPort::F));
        assert_eq!(parse_port("e"), Ok(InputPort::E));
        assert!(parse_port("B").is_err());
        assert!(parse_port("DATAF").is_err());
        assert!(parse_port("").is_err());
    }
}
