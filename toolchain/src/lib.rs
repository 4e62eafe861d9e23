mod quartus;
mod toolchain;

pub use quartus::{back_annotate, run_tcl};
pub use toolchain::Toolchain;
