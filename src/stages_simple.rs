//! Primitive implementation of 5 stages

use crate::alu::alu;
use crate::alu::op_from_branch_funct;
use crate::alu::op_from_funct;
use crate::alu::op_from_funct_imm;
use crate::bits::sign_extend;
use crate::cpu::RegisterFile;
use crate::instruction::Format;
use crate::instruction::Instruction;
use crate::instruction::MemOp;
use crate::instruction::MemOpKind;
use crate::instruction::Opcode;
use crate::instruction::Stage;
use crate::instruction::WriteBack;
use crate::memory::StorageInterface;

/// IF: Fetch the instruction at `pc`.
/// A zero word means there is nothing to run there.
pub fn instruction_fetch(
    pc: u32,
    mem: &impl StorageInterface,
) -> Option<Instruction> {
    let raw_inst = mem.read_word(pc);
    if raw_inst == 0 {
        return None;
    }
    log::trace!("IF {:#010x}: {:#010x}", pc, raw_inst);
    Some(Instruction::fetched(raw_inst, pc))
}

/// ID: Decode and read registers.
/// Unsupported opcodes are dropped.
pub fn instruction_decode(
    inst: &Instruction,
    gpr: &RegisterFile,
) -> Option<Instruction> {
    let decoded = inst.decode(gpr);
    match &decoded {
        Some(decoded) => log::trace!("ID {}", decoded),
        None => log::warn!(
            "Dropping unsupported instruction {:#010x} at PC={:#010x}",
            inst.raw_inst,
            inst.pc
        ),
    }
    decoded
}

/// EX: Compute results, memory operations and branch targets.
/// Returns the redirected program counter of a taken branch or jump.
pub fn execute(inst: &mut Instruction) -> Option<u32> {
    inst.stage = Stage::Execute;

    let (Some(opcode), Some(format)) = (inst.opcode, inst.format) else {
        return None;
    };
    let attributes = inst.attributes;
    let rd = attributes.rd.unwrap_or(0);
    let funct3 = attributes.funct3.unwrap_or(0);
    let imm = attributes.imm.unwrap_or(0);
    let (rs1, rs2) = (inst.rs1_value, inst.rs2_value);

    log::trace!("EX {}; rs1: {:#010x}; rs2: {:#010x}", inst, rs1, rs2);

    let mut redirect = None;
    match (format, opcode) {
        (Format::R, _) => {
            let funct7 = attributes.funct7.unwrap_or(0);
            if let Some(op) = op_from_funct(funct3, funct7) {
                inst.wb_op = Some(WriteBack { dest: rd, data: alu(op, rs1, rs2) });
            }
        }
        (Format::I, Opcode::OpImm) => {
            if let Some(op) = op_from_funct_imm(funct3, imm) {
                let data = alu(op, rs1, sign_extend(imm, 12));
                inst.wb_op = Some(WriteBack { dest: rd, data });
            }
        }
        (Format::I, Opcode::Load) => {
            let (mask, signed) = match funct3 {
                0b000 => (0xff, true),
                0b001 => (0xffff, true),
                0b010 => (0xffff_ffff, true),
                0b100 => (0xff, false),
                0b101 => (0xffff, false),
                _ => return None,
            };
            inst.mem_op = Some(MemOp {
                kind: MemOpKind::Load,
                address: rs1.wrapping_add(sign_extend(imm, 12)),
                data: 0,
                mask,
                signed,
            });
            inst.wb_op = Some(WriteBack { dest: rd, data: 0 });
        }
        (Format::I, _) => {
            // jalr
            inst.wb_op = Some(WriteBack { dest: rd, data: inst.pc.wrapping_add(4) });
            redirect = Some(rs1.wrapping_add(sign_extend(imm, 12)));
        }
        (Format::S, _) => {
            let (mask, data_mask) = match funct3 {
                0b000 => (0xffff_ff00, 0xff),
                0b001 => (0xffff_0000, 0xffff),
                0b010 => (0x0000_0000, 0xffff_ffff),
                _ => return None,
            };
            inst.mem_op = Some(MemOp {
                kind: MemOpKind::Store,
                address: rs1.wrapping_add(sign_extend(imm, 12)),
                data: rs2 & data_mask,
                mask,
                signed: false,
            });
        }
        (Format::B, _) => {
            let op = op_from_branch_funct(funct3)?;
            if alu(op, rs1, rs2) != 0 {
                redirect = Some(inst.pc.wrapping_add(sign_extend(imm, 12)));
            }
        }
        (Format::J, _) => {
            inst.wb_op = Some(WriteBack { dest: rd, data: inst.pc.wrapping_add(4) });
            redirect = Some(inst.pc.wrapping_add(sign_extend(imm, 20)));
        }
        (Format::U, _) => {
            let upper = sign_extend(imm << 12, 31);
            let data = match opcode {
                Opcode::AuiPc => inst.pc.wrapping_add(upper),
                _ => upper,
            };
            inst.wb_op = Some(WriteBack { dest: rd, data });
        }
    }

    if let Some(target) = redirect {
        log::debug!("{:#010x} redirects to {:#010x}", inst.pc, target);
    }
    redirect
}

/// MEM: Access memory.
/// Sub-word accesses always use the low byte or halfword of the word.
pub fn memory_access(inst: &mut Instruction, mem: &mut impl StorageInterface) {
    inst.stage = Stage::Memory;

    let Some(mem_op) = inst.mem_op else {
        return;
    };
    match mem_op.kind {
        MemOpKind::Load => {
            let mut data = mem.read_word(mem_op.address) & mem_op.mask;
            if mem_op.signed {
                data = sign_extend(data, mem_op.mask.count_ones());
            }
            log::trace!("MEM load {:#010x} -> {:#010x}", mem_op.address, data);
            if let Some(wb_op) = &mut inst.wb_op {
                wb_op.data = data;
            }
        }
        MemOpKind::Store => {
            let old = mem.read_word(mem_op.address);
            let data = (old & mem_op.mask) | mem_op.data;
            log::trace!("MEM store {:#010x} <- {:#010x}", mem_op.address, data);
            mem.write_word(mem_op.address, data);
        }
    }
}

/// WB: Write stuff back to the selected register
pub fn write_back(inst: &mut Instruction, gpr: &mut RegisterFile) {
    inst.stage = Stage::WriteBack;

    if let Some(wb_op) = inst.wb_op {
        // x0 drops the write
        gpr.write(wb_op.dest, wb_op.data);
    }
}
