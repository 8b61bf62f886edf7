//! 5 stages adapted for piplined execution.
//! Each stage reads its input slot from the previous cycle
//! and writes its output slot of the next one.

use super::pipeline::PipelineState;
use crate::cpu::CPUState;
use crate::instruction::Stage;
use crate::memory::StorageInterface;
use crate::stages_simple;

/// IF stage; gated by the stall flag
pub fn instruction_fetch(
    cpu: &CPUState,
    mem: &impl StorageInterface,
    next_state: &mut PipelineState,
) {
    next_state[Stage::Fetch] = match cpu.stall {
        true => None,
        false => stages_simple::instruction_fetch(cpu.pc, mem),
    };
}

/// ID stage
pub fn instruction_decode(
    cpu: &CPUState,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    next_state[Stage::Decode] = current_state[Stage::Fetch]
        .and_then(|inst| stages_simple::instruction_decode(&inst, &cpu.gpr));
}

/// EX stage.
/// Returns the branch or jump target, if any.
pub fn execute(
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) -> Option<u32> {
    let mut inst = current_state[Stage::Decode]?;
    let redirect = stages_simple::execute(&mut inst);
    next_state[Stage::Execute] = Some(inst);
    redirect
}

/// MEM stage
pub fn memory_access(
    mem: &mut impl StorageInterface,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    next_state[Stage::Memory] = current_state[Stage::Execute].map(|mut inst| {
        stages_simple::memory_access(&mut inst, mem);
        inst
    });
}

/// WB stage
pub fn write_back(
    cpu: &mut CPUState,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    next_state[Stage::WriteBack] = current_state[Stage::Memory].map(|mut inst| {
        stages_simple::write_back(&mut inst, &mut cpu.gpr);
        inst
    });
}
