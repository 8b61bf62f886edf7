use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::cpu::CPUPolicy;
use crate::cpu::Implementation;
use crate::cpu::DEFAULT_MAX_CYCLES;
use crate::cpu::DEFAULT_MEMORY_WORDS;

/// RISC-V RV32I five-stage pipeline emulator.
#[derive(Parser, Debug)]
#[command(name = "sim", version)]
pub struct RvSimArgs {
    /// Program image: raw little-endian words loaded at 0, or an ELF32 file.
    pub image: PathBuf,

    /// Specifies the simulator implementation.
    /// P: Pipelined (default)
    /// S: Naive single-cycle
    #[arg(short, long, default_value = "P")]
    pub implementation: BackendArg,

    /// Stop after this many cycles.
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_CYCLES)]
    pub max_cycles: u64,

    /// Memory capacity in 32-bit words.
    #[arg(long, default_value_t = DEFAULT_MEMORY_WORDS)]
    pub memory_words: usize,

    /// Writes a per-cycle CSV trace of the pipeline slots.
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Prints the 64x32 framebuffer after the run.
    #[arg(long)]
    pub screen: bool,

    /// Enables verbose mode, logging every cycle.
    /// Largely used for debugging purposes.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RvSimArgs {
    pub fn policy(&self) -> CPUPolicy {
        CPUPolicy {
            implementation: self.implementation.into(),
            memory_words: self.memory_words,
            max_cycles: self.max_cycles,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackendArg {
    Pipelined,
    SingleCycle,
}

impl FromStr for BackendArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "P" => Ok(BackendArg::Pipelined),
            "S" => Ok(BackendArg::SingleCycle),
            _ => Err(format!(
                "Invalid implementation: '{}'. Expected 'P' or 'S'.",
                s
            )),
        }
    }
}

impl From<BackendArg> for Implementation {
    fn from(val: BackendArg) -> Self {
        match val {
            BackendArg::Pipelined => Implementation::Pipelined,
            BackendArg::SingleCycle => Implementation::SingleCycle,
        }
    }
}
