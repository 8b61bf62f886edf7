//! Pipelined implementation

use std::convert::Infallible;
use std::io::Read;

use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::error::SimulatorResult;
use crate::instruction::Stage;
use crate::loader;
use crate::memory::ram::Ram;
use crate::memory::StorageInterface;
use crate::pipelined::pipeline::PipelineState;

pub mod pipeline;
pub mod stages;

/// Five-stage pipeline driver
#[derive(Clone, Copy, Debug, Default)]
pub struct Pipeline {
    state: PipelineState,
}

impl Pipeline {
    /// Pipeline registers as of the end of the last cycle
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Advances one clock cycle
    pub fn step(&mut self, cpu: &mut CPUState, mem: &mut impl StorageInterface) {
        let current_state = self.state;
        let mut next_state = PipelineState::default();

        log::debug!(
            "New cycle; PC: {:#010x}; stall: {}; slots: {:x?}",
            cpu.pc,
            cpu.stall,
            current_state.occupancy()
        );

        // Fetch sees the PC as it stood at the end of the last cycle;
        // a redirect from EX only lands after every stage has run
        stages::instruction_fetch(cpu, mem, &mut next_state);
        stages::instruction_decode(cpu, &current_state, &mut next_state);
        let redirect = stages::execute(&current_state, &mut next_state);
        stages::memory_access(mem, &current_state, &mut next_state);
        stages::write_back(cpu, &current_state, &mut next_state);

        if let Some(target) = redirect {
            cpu.pc = target;
        }

        // May roll the PC back on a load-use interlock
        next_state.handle_hazards(cpu);

        // Advance only if nothing above moved the PC this cycle
        if let Some(fetched) = next_state[Stage::Fetch] {
            if fetched.pc == cpu.pc && !cpu.stall {
                cpu.pc = cpu.pc.wrapping_add(4);
            }
        }

        self.state = next_state;
    }

    /// Nothing in flight and nothing to fetch
    pub fn is_idle(&self, cpu: &CPUState, mem: &impl StorageInterface) -> bool {
        self.state.is_empty()
            && !cpu.stall
            && !matches!(mem.try_read_word(cpu.pc), Ok(word) if word != 0)
    }
}

/// Processor state: CPU, memory and pipeline registers
#[derive(Clone, Debug)]
pub struct Processor<M: StorageInterface = Ram> {
    pub cpu: CPUState,
    pub mem: M,
    pipeline: Pipeline,
}

impl Processor<Ram> {
    pub fn make(policy: CPUPolicy) -> Self {
        Self::with_memory(policy, Ram::make(policy.memory_words))
    }
}

impl<M: StorageInterface> Processor<M> {
    pub fn with_memory(policy: CPUPolicy, mem: M) -> Self {
        Self { cpu: CPUState::make(policy), mem, pipeline: Pipeline::default() }
    }

    /// Loads a raw little-endian word image at address 0
    pub fn load_image(&mut self, reader: impl Read) -> SimulatorResult<usize> {
        loader::load_image(&mut self.mem, reader)
    }

    /// Advances one clock cycle
    pub fn step(&mut self) {
        self.pipeline.step(&mut self.cpu, &mut self.mem);
    }

    /// Steps until idle or `max_cycles` elapse; returns the cycles run
    pub fn run(&mut self, max_cycles: u64) -> u64 {
        match self.run_with(max_cycles, |_, _| Ok::<(), Infallible>(())) {
            Ok(cycles) => cycles,
            Err(never) => match never {},
        }
    }

    /// Like `run`, calling `on_cycle` with the cycle count after every step.
    /// Stops early on the first error.
    pub fn run_with<E>(
        &mut self,
        max_cycles: u64,
        mut on_cycle: impl FnMut(&Self, u64) -> Result<(), E>,
    ) -> Result<u64, E> {
        let mut cycles = 0;
        while cycles < max_cycles && !self.is_idle() {
            self.step();
            cycles += 1;
            on_cycle(self, cycles)?;
        }
        Ok(cycles)
    }

    pub fn is_idle(&self) -> bool {
        self.pipeline.is_idle(&self.cpu, &self.mem)
    }

    pub fn pipeline(&self) -> &PipelineState {
        self.pipeline.state()
    }

    pub fn pc(&self) -> u32 {
        self.cpu.pc
    }

    /// Reads a general purpose register
    pub fn register(&self, index: u32) -> u32 {
        self.cpu.gpr.read(index)
    }

    /// Gives up the CPU and memory, dropping anything still in flight
    pub fn into_parts(self) -> (CPUState, M) {
        (self.cpu, self.mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(program: &[u32]) -> Processor {
        let mut processor = Processor::make(CPUPolicy::default());
        for (i, word) in program.iter().enumerate() {
            processor.mem.write_word(i as u32 * 4, *word);
        }
        processor
    }

    #[test]
    fn test_instruction_walks_through_slots() {
        // addi x1, x0, 7
        let mut processor = processor(&[0x0070_0093]);

        processor.step();
        assert_eq!(processor.pipeline()[Stage::Fetch].map(|i| i.pc), Some(0));
        assert_eq!(processor.pc(), 4);

        for stage in &Stage::ALL[1..] {
            processor.step();
            let inst = processor.pipeline()[*stage].unwrap();
            assert_eq!(inst.stage, *stage);
        }
        assert_eq!(processor.register(1), 7);
        // Nothing fetched past the program, so the PC stays put
        assert_eq!(processor.pc(), 4);

        processor.step();
        assert!(processor.pipeline().is_empty());
        assert!(processor.is_idle());
    }

    #[test]
    fn test_fetch_stalls_behind_jump() {
        // jal x0, 8 ; addi x1, x0, 1 ; addi x2, x0, 2
        let mut processor = processor(&[0x0080_006f, 0x0010_0093, 0x0020_0113]);

        processor.step();
        processor.step();
        assert!(processor.cpu.stall);
        assert_eq!(processor.pipeline()[Stage::Fetch], None);

        processor.run(100);
        assert_eq!(processor.register(1), 0);
        assert_eq!(processor.register(2), 2);
        assert_eq!(processor.pc(), 12);
    }

    #[test]
    fn test_run_with_sees_every_cycle() {
        // addi x1, x0, 7 ; addi x2, x1, 1
        let mut processor = processor(&[0x0070_0093, 0x0010_8113]);
        let mut seen = Vec::new();
        let cycles = processor
            .run_with(100, |p, cycle| {
                seen.push((cycle, p.pipeline()[Stage::Fetch].map(|i| i.pc)));
                Ok::<(), ()>(())
            })
            .unwrap();

        assert_eq!(cycles, 7);
        assert_eq!(seen.len(), 7);
        assert_eq!(seen[0], (1, Some(0)));
        assert_eq!(seen[1], (2, Some(4)));
        assert_eq!(processor.register(2), 8);
        assert!(processor.is_idle());
    }

    #[test]
    fn test_run_with_stops_on_error() {
        let mut processor = processor(&[0x0070_0093]);
        let result = processor.run_with(100, |_, cycle| match cycle {
            3 => Err(cycle),
            _ => Ok(()),
        });
        assert_eq!(result, Err(3));
        assert!(!processor.is_idle());
    }

    #[test]
    fn test_unsupported_instruction_is_skipped() {
        // ecall ; addi x1, x0, 3
        let mut processor = processor(&[0x0000_0073, 0x0030_0093]);
        let cycles = processor.run(100);
        assert_eq!(processor.register(1), 3);
        assert_eq!(processor.pc(), 8);
        assert!(cycles < 100);
    }
}
