//! rv32i CPU state

/// Default memory capacity in words (160000 bytes)
pub const DEFAULT_MEMORY_WORDS: usize = 40000;

/// Default cycle limit for a run
pub const DEFAULT_MAX_CYCLES: u64 = 1_000_000;

/// ABI names of the general purpose registers
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1",
    "a2", "a3", "a4", "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

/// CPU state
#[derive(Clone, Copy, Debug)]
pub struct CPUState {
    /// Program counter
    pub pc: u32,
    /// Fetch is gated while a branch or jump drains through the pipeline
    pub stall: bool,
    /// General purpose registers
    pub gpr: RegisterFile,

    /// CPU policy
    pub policy: CPUPolicy,
}

impl CPUState {
    pub fn make(policy: CPUPolicy) -> Self {
        Self { pc: 0, stall: false, gpr: RegisterFile::default(), policy }
    }
}

/// Register file simulation.
/// x0 is hardwired to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegisterFile {
    data: [u32; 32],
}

impl RegisterFile {
    /// Reads a register
    pub fn read(&self, index: u32) -> u32 {
        self.data[index as usize]
    }

    /// Writes to a register; writes to x0 are dropped
    pub fn write(&mut self, index: u32, value: u32) {
        if index != 0 {
            self.data[index as usize] = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.iter().copied()
    }
}

/// Implementation enum
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Implementation {
    SingleCycle,
    #[default]
    Pipelined,
}

/// CPU policy
#[derive(Clone, Copy, Debug)]
pub struct CPUPolicy {
    pub implementation: Implementation,
    /// Memory capacity in words
    pub memory_words: usize,
    /// Upper bound on simulated cycles
    pub max_cycles: u64,
}

impl Default for CPUPolicy {
    fn default() -> Self {
        Self {
            implementation: Implementation::default(),
            memory_words: DEFAULT_MEMORY_WORDS,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_write_then_read() {
        let mut gpr = RegisterFile::default();
        for i in 1..32 {
            gpr.write(i, i * 3);
        }
        for i in 1..32 {
            assert_eq!(gpr.read(i), i * 3);
        }
    }

    #[test]
    fn test_fresh_state() {
        let cpu = CPUState::make(CPUPolicy::default());
        assert_eq!(cpu.pc, 0);
        assert!(!cpu.stall);
        assert!(cpu.gpr.iter().all(|v| v == 0));
        assert_eq!(cpu.policy.memory_words, DEFAULT_MEMORY_WORDS);
    }

    proptest! {
        #[test]
        fn x0_always_reads_zero(value: u32) {
            let mut gpr = RegisterFile::default();
            gpr.write(0, value);
            prop_assert_eq!(gpr.read(0), 0);
        }
    }
}
