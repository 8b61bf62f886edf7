//! Decoding helper functions

use super::Attributes;
use super::Format;
use super::Instruction;
use super::Opcode;
use super::Stage;
use crate::bits::extract_bits;
use crate::cpu::RegisterFile;

/// Returns the opcode from a raw instruction,
/// or `None` if it is not part of the supported subset
pub fn raw_to_opcode(raw_inst: u32) -> Option<Opcode> {
    match get_opcode(raw_inst) {
        0b011_0111 => Some(Opcode::Lui),
        0b001_0111 => Some(Opcode::AuiPc),
        0b110_1111 => Some(Opcode::Jal),
        0b110_0111 => Some(Opcode::Jalr),
        0b110_0011 => Some(Opcode::Branch),
        0b000_0011 => Some(Opcode::Load),
        0b010_0011 => Some(Opcode::Store),
        0b011_0011 => Some(Opcode::Op),
        0b001_0011 => Some(Opcode::OpImm),
        _ => None,
    }
}

/// Returns the instruction format from an opcode
pub fn opcode_to_format(opcode: Opcode) -> Format {
    match opcode {
        Opcode::Lui => Format::U,
        Opcode::AuiPc => Format::U,
        Opcode::Jal => Format::J,
        Opcode::Jalr => Format::I,
        Opcode::Branch => Format::B,
        Opcode::Load => Format::I,
        Opcode::Store => Format::S,
        Opcode::Op => Format::R,
        Opcode::OpImm => Format::I,
    }
}

/// Decodes `raw_inst` fetched at `pc`,
/// sampling its source registers from `gpr`
pub fn decode(raw_inst: u32, pc: u32, gpr: &RegisterFile) -> Option<Instruction> {
    let opcode = raw_to_opcode(raw_inst)?;
    let format = opcode_to_format(opcode);
    let attributes = parse(format, raw_inst);

    Some(Instruction {
        raw_inst,
        pc,
        stage: Stage::Decode,
        opcode: Some(opcode),
        format: Some(format),
        attributes,
        rs1_value: attributes.rs1.map_or(0, |r| gpr.read(r)),
        rs2_value: attributes.rs2.map_or(0, |r| gpr.read(r)),
        mem_op: None,
        wb_op: None,
    })
}

/// Extracts the fields a format carries
pub fn parse(format: Format, raw_inst: u32) -> Attributes {
    match format {
        Format::R => parse_format_r(raw_inst),
        Format::I => parse_format_i(raw_inst),
        Format::S => parse_format_s(raw_inst),
        Format::B => parse_format_b(raw_inst),
        Format::U => parse_format_u(raw_inst),
        Format::J => parse_format_j(raw_inst),
    }
}

/// Parses attributes for an R-type instruction
fn parse_format_r(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: Some(get_rs1(raw_inst)),
        rs2: Some(get_rs2(raw_inst)),
        rd: Some(get_rd(raw_inst)),
        funct3: Some(get_funct3(raw_inst)),
        funct7: Some(get_funct7(raw_inst)),
        imm: None,
    }
}

/// Parses attributes for an I-type instruction.
/// Shift amounts and the srli/srai selector stay inside the immediate.
fn parse_format_i(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: Some(get_rs1(raw_inst)),
        rs2: None,
        rd: Some(get_rd(raw_inst)),
        funct3: Some(get_funct3(raw_inst)),
        funct7: None,
        imm: Some(extract_bits(raw_inst, 20, 31)),
    }
}

/// Parses attributes for an S-type instruction
fn parse_format_s(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: Some(get_rs1(raw_inst)),
        rs2: Some(get_rs2(raw_inst)),
        rd: None,
        funct3: Some(get_funct3(raw_inst)),
        funct7: None,
        imm: Some(
            extract_bits(raw_inst, 25, 31) << 5 | extract_bits(raw_inst, 7, 11),
        ),
    }
}

/// Parses attributes for a B-type instruction
fn parse_format_b(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: Some(get_rs1(raw_inst)),
        rs2: Some(get_rs2(raw_inst)),
        rd: None,
        funct3: Some(get_funct3(raw_inst)),
        funct7: None,
        imm: Some(
            (extract_bits(raw_inst, 31, 31) << 11
                | extract_bits(raw_inst, 7, 7) << 10
                | extract_bits(raw_inst, 25, 30) << 4
                | extract_bits(raw_inst, 8, 11))
                << 1,
        ),
    }
}

/// Parses attributes for a U-type instruction
fn parse_format_u(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: None,
        rs2: None,
        rd: Some(get_rd(raw_inst)),
        funct3: None,
        funct7: None,
        imm: Some(extract_bits(raw_inst, 12, 31)),
    }
}

/// Parses attributes for a J-type instruction
fn parse_format_j(raw_inst: u32) -> Attributes {
    Attributes {
        rs1: None,
        rs2: None,
        rd: Some(get_rd(raw_inst)),
        funct3: None,
        funct7: None,
        imm: Some(
            (extract_bits(raw_inst, 31, 31) << 19
                | extract_bits(raw_inst, 12, 19) << 11
                | extract_bits(raw_inst, 20, 20) << 10
                | extract_bits(raw_inst, 21, 30))
                << 1,
        ),
    }
}

/// Extracts opcode from a raw instruction
fn get_opcode(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 0, 6)
}

/// Extracts funct3 from a raw instruction
fn get_funct3(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 12, 14)
}

/// Extracts the rs1 field from a raw instruction
fn get_rs1(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 15, 19)
}

/// Extracts the rs2 field from a raw instruction
fn get_rs2(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 20, 24)
}

/// Extracts the rd field from a raw instruction
fn get_rd(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 7, 11)
}

/// Extracts the funct7 field from a raw instruction
fn get_funct7(raw_inst: u32) -> u32 {
    extract_bits(raw_inst, 25, 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// xN = N
    fn counting_registers() -> RegisterFile {
        let mut gpr = RegisterFile::default();
        for i in 0..32 {
            gpr.write(i, i);
        }
        gpr
    }

    fn decode_ok(raw_inst: u32) -> Instruction {
        decode(raw_inst, 0, &counting_registers()).unwrap()
    }

    #[test]
    fn test_r_type() {
        // sub x1, x2, x3
        let inst = decode_ok(0b0100_0000_0011_0001_0000_0000_1011_0011);
        assert_eq!(inst.opcode, Some(Opcode::Op));
        assert_eq!(inst.format, Some(Format::R));
        assert_eq!(
            inst.attributes,
            Attributes {
                rs1: Some(2),
                rs2: Some(3),
                rd: Some(1),
                funct3: Some(0),
                funct7: Some(0b010_0000),
                imm: None,
            }
        );
        assert_eq!((inst.rs1_value, inst.rs2_value), (2, 3));
        assert_eq!(inst.stage, Stage::Decode);
    }

    #[test]
    fn test_i_type() {
        // xori x30, x20, 60
        let inst = decode_ok(0b0000_0011_1100_1010_0100_1111_0001_0011);
        assert_eq!(inst.format, Some(Format::I));
        assert_eq!(inst.attributes.rs1, Some(20));
        assert_eq!(inst.attributes.rs2, None);
        assert_eq!(inst.attributes.rd, Some(30));
        assert_eq!(inst.attributes.funct3, Some(0b100));
        assert_eq!(inst.attributes.imm, Some(60));
        assert_eq!((inst.rs1_value, inst.rs2_value), (20, 0));

        // lbu x1, 45(x8)
        let inst = decode_ok(0b0000_0010_1101_0100_0100_0000_1000_0011);
        assert_eq!(inst.opcode, Some(Opcode::Load));
        assert_eq!(inst.attributes.rs1, Some(8));
        assert_eq!(inst.attributes.rd, Some(1));
        assert_eq!(inst.attributes.imm, Some(45));
    }

    #[test]
    fn test_s_type() {
        // sh x1, 200(x23)
        let inst = decode_ok(0b0000_1100_0001_1011_1001_0100_0010_0011);
        assert_eq!(inst.format, Some(Format::S));
        assert_eq!(inst.attributes.rs1, Some(23));
        assert_eq!(inst.attributes.rs2, Some(1));
        assert_eq!(inst.attributes.rd, None);
        assert_eq!(inst.attributes.funct3, Some(0b001));
        assert_eq!(inst.attributes.imm, Some(200));
    }

    #[test]
    fn test_b_type() {
        // bge x1, x2, 44
        let inst = decode_ok(0b0000_0010_0010_0000_1101_0110_0110_0011);
        assert_eq!(inst.format, Some(Format::B));
        assert_eq!(inst.attributes.rs1, Some(1));
        assert_eq!(inst.attributes.rs2, Some(2));
        assert_eq!(inst.attributes.funct3, Some(0b101));
        assert_eq!(inst.attributes.imm, Some(44));
    }

    #[test]
    fn test_j_type() {
        // jal x1, 64
        let inst = decode_ok(0b0000_0100_0000_0000_0000_0000_1110_1111);
        assert_eq!(inst.format, Some(Format::J));
        assert_eq!(inst.attributes.rd, Some(1));
        assert_eq!(inst.attributes.imm, Some(64));
        assert_eq!((inst.attributes.rs1, inst.attributes.rs2), (None, None));

        // jal x1, 10940
        let inst = decode_ok(0b0010_1011_1101_0000_0010_0000_1110_1111);
        assert_eq!(inst.attributes.imm, Some(10940));
    }

    #[test]
    fn test_u_type() {
        // auipc x11, 72
        let inst = decode_ok(0b0000_0000_0000_0100_1000_0101_1001_0111);
        assert_eq!(inst.opcode, Some(Opcode::AuiPc));
        assert_eq!(inst.format, Some(Format::U));
        assert_eq!(inst.attributes.rd, Some(11));
        assert_eq!(inst.attributes.imm, Some(72));
    }

    #[test]
    fn test_unsupported_opcodes() {
        // ecall, fence, and a compressed encoding
        for raw_inst in [0x0000_0073, 0x0ff0_000f, 0x0000_4501] {
            assert!(decode(raw_inst, 0, &RegisterFile::default()).is_none());
        }
    }

    #[test]
    fn test_sources_skip_x0() {
        // sw x10, 0x50(x0)
        let inst = decode_ok(0b0000_0100_1010_0000_0010_1000_0010_0011);
        assert_eq!(inst.sources(), (None, Some(10)));
        // lui x1, 1
        let inst = decode_ok(0x0000_10b7);
        assert_eq!(inst.sources(), (None, None));
    }
}
