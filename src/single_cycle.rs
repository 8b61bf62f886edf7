//! Single cycle implementation.
//! Runs one instruction to completion per step; the pipeline
//! has to end up in the same architectural state.

use crate::cpu::CPUState;
use crate::memory::StorageInterface;
use crate::stages_simple::*;

/// Executes the instruction at the PC.
/// Returns false if there is no instruction there.
pub fn step(cpu: &mut CPUState, mem: &mut impl StorageInterface) -> bool {
    let pc = cpu.pc;

    // IF
    let Some(fetched) = instruction_fetch(pc, mem) else {
        return false;
    };

    let mut next_pc = pc.wrapping_add(4);
    // ID
    if let Some(mut inst) = instruction_decode(&fetched, &cpu.gpr) {
        // EX
        if let Some(target) = execute(&mut inst) {
            next_pc = target;
        }
        // MEM
        memory_access(&mut inst, mem);
        // WB
        write_back(&mut inst, &mut cpu.gpr);
    }

    log::debug!("PC: {:#010x} -> {:#010x}", pc, next_pc);
    cpu.pc = next_pc;
    true
}

/// Runs until there is nothing left to execute or `max_steps` elapse.
/// Returns the number of instructions executed.
pub fn run(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    max_steps: u64,
) -> u64 {
    let mut steps = 0;
    while steps < max_steps && step(cpu, mem) {
        steps += 1;
    }
    steps
}
