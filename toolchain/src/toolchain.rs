use std::collections::HashMap;
use std::error::Error;
use std::fs::read_to_string;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use which::which_in;

/// How to launch the vendor tools: extra environment, and whether to go
/// through wine. Described by a small TOML file so one binary can drive
/// installs living in different places.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Toolchain {
    #[serde(default)]
    pub use_wine: bool,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Toolchain {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let s = read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    pub fn command(&self, cmd: &str) -> Command {
        let mut res: Command;
        if self.use_wine {
            res = Command::new("wine");
            res.arg(cmd);
        } else if let Some(path) = self.env.get("PATH") {
            match which_in(cmd, Some(path), "/") {
                Ok(rcmd) => res = Command::new(rcmd),
                Err(_) => res = Command::new(cmd),
            }
        } else {
            res = Command::new(cmd);
        }
        for (k, v) in self.env.iter() {
            res.env(k, v);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn from_file_minimal() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "use_wine = false").unwrap();
        let tc = Toolchain::from_file(f.path()).unwrap();
        assert!(!tc.use_wine);
        assert!(tc.env.is_empty());
    }

    #[test]
    fn from_file_env() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "use_wine = true").unwrap();
        writeln!(f, "[env]").unwrap();
        writeln!(f, "LM_LICENSE_FILE = \"1800@licsrv\"").unwrap();
        let tc = Toolchain::from_file(f.path()).unwrap();
        assert!(tc.use_wine);
        assert_eq!(tc.env["LM_LICENSE_FILE"], "1800@licsrv");
    }

    #[test]
    fn wine_command() {
        let tc = Toolchain {
            use_wine: true,
            env: HashMap::new(),
        };
        let cmd = tc.command("quartus_cdb");
        assert_eq!(cmd.get_program(), "wine");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["quartus_cdb"]);
    }

    #[test]
    fn plain_command() {
        let tc = Toolchain::default();
        let cmd = tc.command("quartus_cdb");
        assert_eq!(cmd.get_program(), "quartus_cdb");
    }
}
