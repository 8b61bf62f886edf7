//! ALU implementation

/// Performs an atomic ALU operation.
/// Comparisons yield 1 or 0; shifts use the low five bits of `op2`.
pub fn alu(op: ALUOp, op1: u32, op2: u32) -> u32 {
    let shamt = op2 & 0b1_1111;
    match op {
        ALUOp::ADD => op1.wrapping_add(op2),
        ALUOp::SUB => op1.wrapping_sub(op2),
        ALUOp::AND => op1 & op2,
        ALUOp::OR => op1 | op2,
        ALUOp::XOR => op1 ^ op2,
        ALUOp::SLT => ((op1 as i32) < (op2 as i32)) as u32,
        ALUOp::SLTU => (op1 < op2) as u32,
        ALUOp::SLL => op1 << shamt,
        ALUOp::SRL => op1 >> shamt,
        ALUOp::SRA => ((op1 as i32) >> shamt) as u32,
        ALUOp::BEQ => (op1 == op2) as u32,
        ALUOp::BNE => (op1 != op2) as u32,
        ALUOp::BLT => ((op1 as i32) < (op2 as i32)) as u32,
        ALUOp::BGE => ((op1 as i32) >= (op2 as i32)) as u32,
        ALUOp::BLTU => (op1 < op2) as u32,
        ALUOp::BGEU => (op1 >= op2) as u32,
    }
}

/// Selects the operation of a register-register instruction
pub fn op_from_funct(funct3: u32, funct7: u32) -> Option<ALUOp> {
    match (funct3, funct7) {
        (0b000, 0b000_0000) => Some(ALUOp::ADD),
        (0b000, 0b010_0000) => Some(ALUOp::SUB),
        (0b001, 0b000_0000) => Some(ALUOp::SLL),
        (0b010, 0b000_0000) => Some(ALUOp::SLT),
        (0b011, 0b000_0000) => Some(ALUOp::SLTU),
        (0b100, 0b000_0000) => Some(ALUOp::XOR),
        (0b101, 0b000_0000) => Some(ALUOp::SRL),
        (0b101, 0b010_0000) => Some(ALUOp::SRA),
        (0b110, 0b000_0000) => Some(ALUOp::OR),
        (0b111, 0b000_0000) => Some(ALUOp::AND),
        _ => None,
    }
}

/// Selects the operation of a register-immediate instruction.
/// Shifts are told apart by the upper seven immediate bits.
pub fn op_from_funct_imm(funct3: u32, imm: u32) -> Option<ALUOp> {
    match funct3 {
        0b000 => Some(ALUOp::ADD),
        0b010 => Some(ALUOp::SLT),
        0b011 => Some(ALUOp::SLTU),
        0b100 => Some(ALUOp::XOR),
        0b110 => Some(ALUOp::OR),
        0b111 => Some(ALUOp::AND),
        0b001 | 0b101 => op_from_funct(funct3, imm >> 5),
        _ => None,
    }
}

/// Selects the comparison of a conditional branch
pub fn op_from_branch_funct(funct3: u32) -> Option<ALUOp> {
    match funct3 {
        0b000 => Some(ALUOp::BEQ),
        0b001 => Some(ALUOp::BNE),
        0b100 => Some(ALUOp::BLT),
        0b101 => Some(ALUOp::BGE),
        0b110 => Some(ALUOp::BLTU),
        0b111 => Some(ALUOp::BGEU),
        _ => None,
    }
}

/// Set of ALU operations needed for rv32i
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ALUOp {
    // Arithmetic
    ADD,
    SUB,
    // Logical
    AND,
    OR,
    XOR,
    // Set
    SLT,
    SLTU,
    // Shift
    SLL,
    SRL,
    SRA,
    // Branch
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
}
