//! Pipeline state
use std::ops::Index;
use std::ops::IndexMut;

use crate::cpu::CPUState;
use crate::instruction::Instruction;
use crate::instruction::Stage;

/// Pipeline state = one slot per stage.
/// Slot `s` holds the instruction that completed stage `s` this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineState {
    slots: [Option<Instruction>; 5],
}

impl Index<Stage> for PipelineState {
    type Output = Option<Instruction>;

    fn index(&self, stage: Stage) -> &Self::Output {
        &self.slots[stage.index()]
    }
}

impl IndexMut<Stage> for PipelineState {
    fn index_mut(&mut self, stage: Stage) -> &mut Self::Output {
        &mut self.slots[stage.index()]
    }
}

impl PipelineState {
    /// No instruction in any slot
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Program counters of the slot occupants, fetch first
    pub fn occupancy(&self) -> [Option<u32>; 5] {
        self.slots.map(|slot| slot.map(|inst| inst.pc))
    }

    /// Resolves hazards after the pipeline has been shifted.
    /// May stall fetch, forward results into the decoded instruction,
    /// or push it back to fetch and roll back the program counter.
    pub fn handle_hazards(&mut self, cpu: &mut CPUState) {
        self.release_control_hazard(cpu);
        let stalled_here = self.stall_control_hazard(cpu);
        if self.interlock_or_forward(cpu) && stalled_here {
            // The instruction went back to fetch; it stalls again
            // once it is decoded for the second time
            cpu.stall = false;
        }
    }

    /// A retired branch or jump has committed its target
    fn release_control_hazard(&self, cpu: &mut CPUState) {
        let retired = self[Stage::WriteBack];
        if cpu.stall && retired.is_some_and(|inst| inst.is_control_flow()) {
            log::debug!("Branch retired; releasing fetch");
            cpu.stall = false;
        }
    }

    /// Holds fetch while a branch or jump is in flight.
    /// Returns true if the stall was raised here.
    fn stall_control_hazard(&mut self, cpu: &mut CPUState) -> bool {
        match self[Stage::Decode] {
            Some(inst) if inst.is_control_flow() => {
                if let Some(dropped) = self[Stage::Fetch].take() {
                    log::debug!("Control hazard; dropping {}", dropped);
                }
                cpu.stall = true;
                true
            }
            _ => false,
        }
    }

    /// Forwards results from later stages into the decoded instruction.
    /// Returns true if a load-use interlock was inserted instead.
    fn interlock_or_forward(&mut self, cpu: &mut CPUState) -> bool {
        let Some(mut inst) = self[Stage::Decode] else {
            return false;
        };
        let (rs1, rs2) = inst.sources();
        if rs1.is_none() && rs2.is_none() {
            return false;
        }

        let mut rs1_found = rs1.is_none();
        let mut rs2_found = rs2.is_none();

        // Nearest producer first: the most recent write wins
        for stage in [Stage::Execute, Stage::Memory, Stage::WriteBack] {
            let Some(producer) = self[stage] else {
                continue;
            };
            let Some(wb_op) = producer.wb_op else {
                continue;
            };
            let dest = Some(wb_op.dest);

            if stage == Stage::Execute
                && producer.is_load()
                && (dest == rs1 || dest == rs2)
            {
                // Loaded data is not ready until MEM: replay the decode
                log::debug!("Load-use interlock on {}", inst);
                cpu.pc = inst.pc;
                inst.stage = Stage::Fetch;
                self[Stage::Fetch] = Some(inst);
                self[Stage::Decode] = None;
                return true;
            }

            if !rs1_found && dest == rs1 {
                inst.rs1_value = wb_op.data;
                rs1_found = true;
            }
            if !rs2_found && dest == rs2 {
                inst.rs2_value = wb_op.data;
                rs2_found = true;
            }

            if rs1_found && rs2_found {
                break;
            }
        }

        self[Stage::Decode] = Some(inst);
        false
    }
}
